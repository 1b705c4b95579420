//! Datanode identities and their administrative lifecycle states

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use silo_util::data::Uuid;

/// A named port advertised by a datanode, such as its data transfer or its
/// RPC endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatanodePort {
	pub name: String,
	pub value: u16,
}

impl DatanodePort {
	pub fn new(name: &str, value: u16) -> Self {
		Self {
			name: name.to_string(),
			value,
		}
	}
}

/// Identity of a datanode as recorded in the node registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatanodeInfo {
	pub id: Uuid,
	pub hostname: String,
	pub ip_addr: IpAddr,
	pub ports: Vec<DatanodePort>,
}

impl DatanodeInfo {
	pub fn has_port(&self, value: u16) -> bool {
		self.ports.iter().any(|p| p.value == value)
	}
}

/// Administrative lifecycle state of a datanode. The state is owned by the
/// node registry and only ever changed through the admin transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationalState {
	InService,
	Decommissioning,
	Decommissioned,
	EnteringMaintenance,
	InMaintenance,
}

impl OperationalState {
	pub const ALL: [OperationalState; 5] = [
		OperationalState::InService,
		OperationalState::Decommissioning,
		OperationalState::Decommissioned,
		OperationalState::EnteringMaintenance,
		OperationalState::InMaintenance,
	];
}

/// View of a datanode's operational state, with the predicates the rest of
/// the system keys on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
	pub operational: OperationalState,
}

impl NodeStatus {
	pub fn new(operational: OperationalState) -> Self {
		Self { operational }
	}

	pub fn is_in_service(&self) -> bool {
		self.operational == OperationalState::InService
	}

	/// Leaving the cluster for good, whether or not the drain has finished
	pub fn is_decommission(&self) -> bool {
		matches!(
			self.operational,
			OperationalState::Decommissioning | OperationalState::Decommissioned
		)
	}

	pub fn is_decommissioning(&self) -> bool {
		self.operational == OperationalState::Decommissioning
	}

	/// Going away temporarily, whether or not the drain has finished
	pub fn is_maintenance(&self) -> bool {
		matches!(
			self.operational,
			OperationalState::EnteringMaintenance | OperationalState::InMaintenance
		)
	}

	pub fn is_entering_maintenance(&self) -> bool {
		self.operational == OperationalState::EnteringMaintenance
	}

	pub fn is_in_maintenance(&self) -> bool {
		self.operational == OperationalState::InMaintenance
	}
}
