//! The synchronous administrative command surface

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use silo_util::config::{default_admin_monitor_interval_secs, Config};
use silo_util::data::Uuid;
use silo_util::time::{msec_to_rfc3339, now_msec};

use silo_cluster::error::ClusterError;
use silo_cluster::pipeline::ContainerManager;
use silo_cluster::registry::NodeRegistry;

use crate::error::AdminError;
use crate::metrics::AdminMetrics;
use crate::resolve::{HostResolver, NameService};
use crate::state::{plan, AdminCommand, Outcome};

/// The administrative lifecycle controller. Commands are serialized by a
/// single controller-wide lock, so the transitions observed by the node
/// registry follow the order in which commands entered the controller.
pub struct AdminController {
	registry: Arc<dyn NodeRegistry>,
	resolver: HostResolver,
	monitor_interval: Duration,
	metrics: AdminMetrics,
	command_lock: Mutex<()>,
	// Reserved for per-container drain tracking
	_containers: Arc<dyn ContainerManager>,
}

impl AdminController {
	/// Build the controller. A non-positive monitor interval in the
	/// configuration is replaced by the default, in place, so that later
	/// readers of the configuration see the repaired value.
	pub fn new(
		config: &mut Config,
		registry: Arc<dyn NodeRegistry>,
		containers: Arc<dyn ContainerManager>,
		names: Arc<dyn NameService>,
	) -> Arc<Self> {
		if config.admin.monitor_interval_secs <= 0 {
			warn!(
				"Invalid admin monitor interval {}s, falling back to the default of {}s",
				config.admin.monitor_interval_secs,
				default_admin_monitor_interval_secs()
			);
			config.admin.monitor_interval_secs = default_admin_monitor_interval_secs();
		}
		let resolver = HostResolver::new(
			registry.clone(),
			names,
			config.use_datanode_hostnames,
		);
		Arc::new(Self {
			registry,
			resolver,
			monitor_interval: Duration::from_secs(config.admin.monitor_interval_secs as u64),
			metrics: AdminMetrics::new(),
			command_lock: Mutex::new(()),
			_containers: containers,
		})
	}

	/// Interval at which drain progress should be re-evaluated
	pub fn monitor_interval(&self) -> Duration {
		self.monitor_interval
	}

	// ---- batch commands ----

	/// Start decommissioning every datanode in the list. The whole list is
	/// resolved up front: one unresolvable host fails the batch before any
	/// node changes state. Nodes that vanish between resolution and the
	/// transition are skipped.
	pub async fn decommission_nodes(&self, hosts: &[String]) -> Result<(), AdminError> {
		let _command = self.command_lock.lock().await;
		for dn in self.resolver.resolve(hosts).await? {
			match self.start_decommission_unlocked(&dn.id).await {
				Ok(()) => (),
				Err(AdminError::Cluster(ClusterError::NodeNotFound(id))) => {
					warn!("Datanode {} is gone from the node registry, skipping it", id);
				}
				Err(e @ AdminError::InvalidNodeState { .. }) => {
					// TODO: collect per-node failures and return them to the
					// caller instead of only logging them here
					error!("Unable to decommission datanode {}: {}", dn.id, e);
				}
				Err(e) => return Err(e),
			}
		}
		Ok(())
	}

	/// Return every datanode in the list to service
	pub async fn recommission_nodes(&self, hosts: &[String]) -> Result<(), AdminError> {
		let _command = self.command_lock.lock().await;
		for dn in self.resolver.resolve(hosts).await? {
			match self.recommission_unlocked(&dn.id).await {
				Ok(()) => (),
				Err(AdminError::Cluster(ClusterError::NodeNotFound(id))) => {
					warn!("Datanode {} is gone from the node registry, skipping it", id);
				}
				Err(e) => return Err(e),
			}
		}
		Ok(())
	}

	/// Put every datanode in the list into maintenance. `end_in_hours` is
	/// only informational for now and drives the log message below.
	pub async fn start_maintenance_nodes(
		&self,
		hosts: &[String],
		end_in_hours: u64,
	) -> Result<(), AdminError> {
		let _command = self.command_lock.lock().await;
		for dn in self.resolver.resolve(hosts).await? {
			match self.start_maintenance_unlocked(&dn.id, end_in_hours).await {
				Ok(()) => (),
				Err(AdminError::Cluster(ClusterError::NodeNotFound(id))) => {
					warn!("Datanode {} is gone from the node registry, skipping it", id);
				}
				Err(e @ AdminError::InvalidNodeState { .. }) => {
					error!("Unable to put datanode {} into maintenance: {}", dn.id, e);
				}
				Err(e) => return Err(e),
			}
		}
		Ok(())
	}

	// ---- single-node commands ----

	pub async fn start_decommission(&self, id: &Uuid) -> Result<(), AdminError> {
		let _command = self.command_lock.lock().await;
		self.start_decommission_unlocked(id).await
	}

	pub async fn recommission(&self, id: &Uuid) -> Result<(), AdminError> {
		let _command = self.command_lock.lock().await;
		self.recommission_unlocked(id).await
	}

	pub async fn start_maintenance(&self, id: &Uuid, end_in_hours: u64) -> Result<(), AdminError> {
		let _command = self.command_lock.lock().await;
		self.start_maintenance_unlocked(id, end_in_hours).await
	}

	// ---- transition plumbing, called with the command lock held ----

	async fn start_decommission_unlocked(&self, id: &Uuid) -> Result<(), AdminError> {
		let status = self.registry.get_node_status(id).await?;
		match plan(status.operational, AdminCommand::StartDecommission) {
			Outcome::Move(next) => {
				info!("Starting decommission of datanode {}", id);
				self.metrics.decommission_requests.add(1, &[]);
				self.registry.set_node_operational_state(id, next).await?;
				Ok(())
			}
			Outcome::Stay => {
				info!(
					"Datanode {} is already decommissioning or decommissioned, nothing to do",
					id
				);
				Ok(())
			}
			Outcome::Reject => Err(AdminError::InvalidNodeState {
				node: *id,
				state: status.operational,
				command: AdminCommand::StartDecommission,
			}),
		}
	}

	async fn recommission_unlocked(&self, id: &Uuid) -> Result<(), AdminError> {
		let status = self.registry.get_node_status(id).await?;
		match plan(status.operational, AdminCommand::Recommission) {
			Outcome::Move(next) => {
				info!("Returning datanode {} to service", id);
				self.metrics.recommission_requests.add(1, &[]);
				self.registry.set_node_operational_state(id, next).await?;
				Ok(())
			}
			Outcome::Stay => {
				info!("Datanode {} is already in service, nothing to do", id);
				Ok(())
			}
			Outcome::Reject => Err(AdminError::InvalidNodeState {
				node: *id,
				state: status.operational,
				command: AdminCommand::Recommission,
			}),
		}
	}

	async fn start_maintenance_unlocked(
		&self,
		id: &Uuid,
		end_in_hours: u64,
	) -> Result<(), AdminError> {
		let status = self.registry.get_node_status(id).await?;
		match plan(status.operational, AdminCommand::StartMaintenance) {
			Outcome::Move(next) => {
				if end_in_hours > 0 {
					let end_msec = now_msec() + end_in_hours * 3600 * 1000;
					info!(
						"Putting datanode {} into maintenance until {}",
						id,
						msec_to_rfc3339(end_msec)
					);
				} else {
					info!(
						"Putting datanode {} into maintenance with no scheduled end",
						id
					);
				}
				self.metrics.maintenance_requests.add(1, &[]);
				self.registry.set_node_operational_state(id, next).await?;
				Ok(())
			}
			Outcome::Stay => {
				// TODO: decide whether a repeated command should move the
				// projected end of the maintenance window
				info!("Datanode {} is already in maintenance, nothing to do", id);
				Ok(())
			}
			Outcome::Reject => Err(AdminError::InvalidNodeState {
				node: *id,
				state: status.operational,
				command: AdminCommand::StartMaintenance,
			}),
		}
	}
}
