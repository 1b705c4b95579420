//! The event-driven drain gates: the handlers that decide when a node
//! leaving service has actually finished draining.
//!
//! Both gates are side-effect only. They mutate the cluster through the
//! node registry and the pipeline manager and never republish events; any
//! state change they cause flows back through the normal report stream.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use silo_cluster::bus::{EventBus, EventHandler};
use silo_cluster::error::ClusterError;
use silo_cluster::pipeline::{PipelineManager, PipelineState};
use silo_cluster::registry::NodeRegistry;
use silo_cluster::report::{NodeReplicationReport, PipelineReport};
use silo_util::data::Uuid;

use crate::metrics::GateMetrics;
use crate::state::{plan, AdminCommand, Outcome};

/// Closes the open pipelines of nodes that are heading into maintenance.
/// Pipeline closure for decommissioning nodes is expected to be driven by
/// other infrastructure, so this gate only acts on the maintenance states.
pub struct PipelineDrainGate {
	registry: Arc<dyn NodeRegistry>,
	pipelines: Arc<dyn PipelineManager>,
	metrics: GateMetrics,
}

impl PipelineDrainGate {
	pub fn new(registry: Arc<dyn NodeRegistry>, pipelines: Arc<dyn PipelineManager>) -> Arc<Self> {
		Arc::new(Self {
			registry,
			pipelines,
			metrics: GateMetrics::new(),
		})
	}

	async fn close_open_pipelines(&self, report: &PipelineReport) -> Result<(), ClusterError> {
		let status = self.registry.get_node_status(&report.node).await?;
		if !status.is_maintenance() {
			return Ok(());
		}
		for id in &report.pipelines {
			let pipeline = match self.pipelines.get_pipeline(id).await {
				Ok(p) => p,
				Err(e) => {
					warn!(
						"Cannot fetch pipeline {} reported by datanode {}: {}",
						id, report.node, e
					);
					continue;
				}
			};
			if pipeline.state == PipelineState::Open {
				info!(
					"Closing pipeline {} of datanode {} going into maintenance",
					id, report.node
				);
				match self.pipelines.finalize_and_destroy(&pipeline, true).await {
					Ok(()) => self.metrics.pipelines_closed.add(1, &[]),
					Err(e) => warn!("Unable to close pipeline {}: {}", id, e),
				}
			}
		}
		Ok(())
	}
}

#[async_trait]
impl EventHandler<PipelineReport> for PipelineDrainGate {
	async fn handle(&self, report: PipelineReport) {
		if let Err(e) = self.close_open_pipelines(&report).await {
			warn!(
				"Ignoring pipeline report from datanode {}: {}",
				report.node, e
			);
		}
	}
}

/// Advances a draining node to its terminal state once every container it
/// hosts is sufficiently replicated elsewhere and all of its pipelines are
/// closed.
pub struct ReplicationDrainGate {
	registry: Arc<dyn NodeRegistry>,
	metrics: GateMetrics,
}

impl ReplicationDrainGate {
	pub fn new(registry: Arc<dyn NodeRegistry>) -> Arc<Self> {
		Arc::new(Self {
			registry,
			metrics: GateMetrics::new(),
		})
	}

	async fn try_finish_drain(&self, report: &NodeReplicationReport) -> Result<(), ClusterError> {
		// The node's current state decides, not the snapshot in the report:
		// a recommission racing this report must win
		let status = self.registry.get_node_status(&report.node).await?;
		let command = if status.is_decommissioning() {
			AdminCommand::CompleteDecommission
		} else if status.is_entering_maintenance() {
			AdminCommand::CompleteMaintenance
		} else {
			return Ok(());
		};

		if !report.is_fully_replicated() {
			debug!(
				"Datanode {} still has {} of {} containers to re-replicate",
				report.node,
				report.containers - report.sufficiently_replicated,
				report.containers
			);
			return Ok(());
		}
		if !self.pipelines_closed(&report.node).await? {
			debug!("Datanode {} still has pipelines attached", report.node);
			return Ok(());
		}

		if let Outcome::Move(next) = plan(status.operational, command) {
			info!(
				"Datanode {} has finished draining, moving it to {:?}",
				report.node, next
			);
			self.registry
				.set_node_operational_state(&report.node, next)
				.await?;
			self.metrics.nodes_drained.add(1, &[]);
		}
		Ok(())
	}

	/// The pipeline gate only initiates closure and completion is
	/// asynchronous, so the registry's view is checked again here
	async fn pipelines_closed(&self, node: &Uuid) -> Result<bool, ClusterError> {
		Ok(self.registry.get_pipelines(node).await?.is_empty())
	}
}

#[async_trait]
impl EventHandler<NodeReplicationReport> for ReplicationDrainGate {
	async fn handle(&self, report: NodeReplicationReport) {
		if let Err(e) = self.try_finish_drain(&report).await {
			warn!(
				"Discarding replication report for datanode {}: {}",
				report.node, e
			);
		}
	}
}

/// Register both drain gates on their event buses. The returned tasks drain
/// report queues until `must_exit` becomes true.
pub fn register_drain_gates(
	registry: Arc<dyn NodeRegistry>,
	pipelines: Arc<dyn PipelineManager>,
	pipeline_bus: &mut EventBus<PipelineReport>,
	replication_bus: &mut EventBus<NodeReplicationReport>,
	must_exit: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
	vec![
		pipeline_bus.subscribe(
			PipelineDrainGate::new(registry.clone(), pipelines),
			must_exit.clone(),
		),
		replication_bus.subscribe(ReplicationDrainGate::new(registry), must_exit),
	]
}
