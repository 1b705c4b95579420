//! Errors raised when accessing cluster state
use err_derive::Error;

use silo_util::data::Uuid;

use crate::pipeline::PipelineId;

#[derive(Debug, Error)]
pub enum ClusterError {
	#[error(display = "Datanode {} is not registered in the cluster", _0)]
	NodeNotFound(Uuid),

	#[error(display = "Pipeline {} does not exist", _0)]
	PipelineNotFound(PipelineId),

	#[error(display = "IO error: {}", _0)]
	Io(#[error(source)] std::io::Error),
}
