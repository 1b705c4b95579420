//! Errors surfaced by administrative commands
use err_derive::Error;

use silo_cluster::error::ClusterError;
use silo_cluster::node::OperationalState;
use silo_util::data::Uuid;

use crate::state::AdminCommand;

#[derive(Debug, Error)]
pub enum AdminError {
	/// The given host string could not be matched to exactly one datanode.
	/// This aborts the whole batch it was part of.
	#[error(display = "invalid host string {:?}: {}", host, reason)]
	InvalidHostString { host: String, reason: String },

	/// The requested transition is illegal in the node's current state
	#[error(
		display = "cannot apply {:?} to datanode {} in state {:?}",
		command,
		node,
		state
	)]
	InvalidNodeState {
		node: Uuid,
		state: OperationalState,
		command: AdminCommand,
	},

	#[error(display = "{}", _0)]
	Cluster(#[error(source)] ClusterError),
}

impl AdminError {
	pub(crate) fn invalid_host(host: &str, reason: impl Into<String>) -> Self {
		Self::InvalidHostString {
			host: host.to_string(),
			reason: reason.into(),
		}
	}
}
