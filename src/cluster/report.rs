//! Report messages sent asynchronously by datanodes and cluster subsystems

use serde::{Deserialize, Serialize};

use silo_util::data::Uuid;

use crate::node::NodeStatus;
use crate::pipeline::PipelineId;

/// Per-node summary emitted by the replication manager: how many containers
/// the node holds, and how many of those have enough healthy replicas on the
/// rest of the cluster to survive losing this node's copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReplicationReport {
	pub node: Uuid,
	/// Status of the node at the time the report was built. Consumers that
	/// decide on state transitions must re-read the current status from the
	/// node registry instead of trusting this snapshot.
	pub status: NodeStatus,
	pub containers: u64,
	pub sufficiently_replicated: u64,
}

impl NodeReplicationReport {
	/// True when every container hosted on the node can lose this node's
	/// replica without dropping below its replication target
	pub fn is_fully_replicated(&self) -> bool {
		self.sufficiently_replicated == self.containers
	}
}

/// The set of pipelines a datanode reports participating in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
	pub node: Uuid,
	pub pipelines: Vec<PipelineId>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::node::OperationalState;
	use silo_util::data::gen_uuid;

	#[test]
	fn test_fully_replicated() {
		let mut report = NodeReplicationReport {
			node: gen_uuid(),
			status: NodeStatus::new(OperationalState::Decommissioning),
			containers: 5,
			sufficiently_replicated: 4,
		};
		assert!(!report.is_fully_replicated());
		report.sufficiently_replicated = 5;
		assert!(report.is_fully_replicated());
	}

	#[test]
	fn test_empty_node_is_fully_replicated() {
		let report = NodeReplicationReport {
			node: gen_uuid(),
			status: NodeStatus::new(OperationalState::Decommissioning),
			containers: 0,
			sufficiently_replicated: 0,
		};
		assert!(report.is_fully_replicated());
	}
}
