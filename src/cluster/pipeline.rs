//! Pipelines: replication groups of datanodes serving writes for a set of
//! containers

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use silo_util::data::{gen_uuid, Uuid};

use crate::error::ClusterError;
use crate::registry::MemoryNodeRegistry;

/// Identifier of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PipelineId(pub Uuid);

impl fmt::Display for PipelineId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Lifecycle state of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
	Open,
	Closing,
	Closed,
}

/// A replication group of datanodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
	pub id: PipelineId,
	pub state: PipelineState,
	pub members: Vec<Uuid>,
}

/// Interface to the subsystem that tracks and drives pipeline lifecycles
#[async_trait]
pub trait PipelineManager: Send + Sync {
	async fn get_pipeline(&self, id: &PipelineId) -> Result<Pipeline, ClusterError>;

	/// Close the pipeline and remove it from the cluster. `closed_by_command`
	/// distinguishes an administrative closure from one caused by a node
	/// failure. Closing a pipeline that is already gone is a no-op.
	async fn finalize_and_destroy(
		&self,
		pipeline: &Pipeline,
		closed_by_command: bool,
	) -> Result<(), ClusterError>;
}

/// Interface to the subsystem that tracks container replicas. The admin
/// controller accepts one at construction for future per-container drain
/// tracking but does not call it yet.
#[async_trait]
pub trait ContainerManager: Send + Sync {
	/// Number of container replicas currently hosted on the given node
	async fn container_count(&self, node: &Uuid) -> Result<u64, ClusterError>;
}

/// Pipeline manager backed by an in-process map, used by single-controller
/// deployments and by tests. It keeps the node registry's per-node pipeline
/// sets in sync with the pipelines it tracks.
pub struct MemoryPipelineManager {
	pipelines: RwLock<BTreeMap<PipelineId, Pipeline>>,
	registry: Arc<MemoryNodeRegistry>,
}

impl MemoryPipelineManager {
	pub fn new(registry: Arc<MemoryNodeRegistry>) -> Arc<Self> {
		Arc::new(Self {
			pipelines: RwLock::new(BTreeMap::new()),
			registry,
		})
	}

	/// Create an open pipeline over the given members and attach it to each
	/// of them in the node registry
	pub fn create_pipeline(&self, members: Vec<Uuid>) -> Result<PipelineId, ClusterError> {
		let id = PipelineId(gen_uuid());
		for member in &members {
			self.registry.attach_pipeline(member, id)?;
		}
		self.pipelines.write().unwrap().insert(
			id,
			Pipeline {
				id,
				state: PipelineState::Open,
				members,
			},
		);
		Ok(id)
	}

	/// Move a pipeline to another lifecycle state without destroying it
	pub fn set_pipeline_state(
		&self,
		id: &PipelineId,
		state: PipelineState,
	) -> Result<(), ClusterError> {
		let mut pipelines = self.pipelines.write().unwrap();
		let pipeline = pipelines
			.get_mut(id)
			.ok_or(ClusterError::PipelineNotFound(*id))?;
		pipeline.state = state;
		Ok(())
	}
}

#[async_trait]
impl PipelineManager for MemoryPipelineManager {
	async fn get_pipeline(&self, id: &PipelineId) -> Result<Pipeline, ClusterError> {
		self.pipelines
			.read()
			.unwrap()
			.get(id)
			.cloned()
			.ok_or(ClusterError::PipelineNotFound(*id))
	}

	async fn finalize_and_destroy(
		&self,
		pipeline: &Pipeline,
		closed_by_command: bool,
	) -> Result<(), ClusterError> {
		let removed = self.pipelines.write().unwrap().remove(&pipeline.id);
		match removed {
			Some(p) => {
				info!(
					"Closing pipeline {} (closed by command: {})",
					p.id, closed_by_command
				);
				for member in &p.members {
					// The member may already have left the cluster
					let _ = self.registry.detach_pipeline(member, &p.id);
				}
			}
			None => {
				debug!("Pipeline {} is already closed", pipeline.id);
			}
		}
		Ok(())
	}
}
