//! The node registry: the authoritative record of datanode identities,
//! operational states and pipeline membership

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use silo_util::data::Uuid;

use crate::error::ClusterError;
use crate::node::{DatanodeInfo, NodeStatus, OperationalState};
use crate::pipeline::PipelineId;

/// Interface to the authoritative store of datanode state. Mutations are
/// atomic per node; callers must not assume any cross-node ordering.
#[async_trait]
pub trait NodeRegistry: Send + Sync {
	/// All datanodes whose advertised address (IP address or hostname,
	/// depending on cluster configuration) equals the given key
	async fn get_nodes_by_address(&self, address: &str) -> Vec<DatanodeInfo>;

	async fn get_node_status(&self, id: &Uuid) -> Result<NodeStatus, ClusterError>;

	/// Atomically replace the operational state of one node
	async fn set_node_operational_state(
		&self,
		id: &Uuid,
		state: OperationalState,
	) -> Result<(), ClusterError>;

	/// Pipelines the node currently participates in, empty if none are known
	async fn get_pipelines(&self, id: &Uuid) -> Result<HashSet<PipelineId>, ClusterError>;
}

struct NodeEntry {
	info: DatanodeInfo,
	state: OperationalState,
	pipelines: HashSet<PipelineId>,
}

/// Node registry backed by an in-process map, used by single-controller
/// deployments and by tests. Nodes are iterated in the order of their ids,
/// which makes multi-homed address lookups deterministic.
pub struct MemoryNodeRegistry {
	nodes: RwLock<BTreeMap<Uuid, NodeEntry>>,
}

impl MemoryNodeRegistry {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			nodes: RwLock::new(BTreeMap::new()),
		})
	}

	/// Add a datanode to the registry, in service and with no pipelines
	pub fn register_node(&self, info: DatanodeInfo) {
		info!("Registering datanode {} ({})", info.id, info.hostname);
		self.nodes.write().unwrap().insert(
			info.id,
			NodeEntry {
				info,
				state: OperationalState::InService,
				pipelines: HashSet::new(),
			},
		);
	}

	/// Forget a datanode entirely
	pub fn remove_node(&self, id: &Uuid) {
		self.nodes.write().unwrap().remove(id);
	}

	pub fn attach_pipeline(&self, node: &Uuid, pipeline: PipelineId) -> Result<(), ClusterError> {
		let mut nodes = self.nodes.write().unwrap();
		let entry = nodes.get_mut(node).ok_or(ClusterError::NodeNotFound(*node))?;
		entry.pipelines.insert(pipeline);
		Ok(())
	}

	pub fn detach_pipeline(&self, node: &Uuid, pipeline: &PipelineId) -> Result<(), ClusterError> {
		let mut nodes = self.nodes.write().unwrap();
		let entry = nodes.get_mut(node).ok_or(ClusterError::NodeNotFound(*node))?;
		entry.pipelines.remove(pipeline);
		Ok(())
	}
}

#[async_trait]
impl NodeRegistry for MemoryNodeRegistry {
	async fn get_nodes_by_address(&self, address: &str) -> Vec<DatanodeInfo> {
		self.nodes
			.read()
			.unwrap()
			.values()
			.filter(|e| e.info.hostname == address || e.info.ip_addr.to_string() == address)
			.map(|e| e.info.clone())
			.collect()
	}

	async fn get_node_status(&self, id: &Uuid) -> Result<NodeStatus, ClusterError> {
		self.nodes
			.read()
			.unwrap()
			.get(id)
			.map(|e| NodeStatus::new(e.state))
			.ok_or(ClusterError::NodeNotFound(*id))
	}

	async fn set_node_operational_state(
		&self,
		id: &Uuid,
		state: OperationalState,
	) -> Result<(), ClusterError> {
		let mut nodes = self.nodes.write().unwrap();
		let entry = nodes.get_mut(id).ok_or(ClusterError::NodeNotFound(*id))?;
		entry.state = state;
		Ok(())
	}

	async fn get_pipelines(&self, id: &Uuid) -> Result<HashSet<PipelineId>, ClusterError> {
		self.nodes
			.read()
			.unwrap()
			.get(id)
			.map(|e| e.pipelines.clone())
			.ok_or(ClusterError::NodeNotFound(*id))
	}
}
