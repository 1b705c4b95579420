use opentelemetry::{global, metrics::*};

/// AdminMetrics reference all counters used for admin command metrics
pub struct AdminMetrics {
	pub(crate) decommission_requests: Counter<u64>,
	pub(crate) recommission_requests: Counter<u64>,
	pub(crate) maintenance_requests: Counter<u64>,
}

impl AdminMetrics {
	pub fn new() -> Self {
		let meter = global::meter("silo_admin");
		Self {
			decommission_requests: meter
				.u64_counter("admin.decommission_requests")
				.with_description("Number of datanodes for which decommissioning was started")
				.init(),
			recommission_requests: meter
				.u64_counter("admin.recommission_requests")
				.with_description("Number of datanodes returned to service")
				.init(),
			maintenance_requests: meter
				.u64_counter("admin.maintenance_requests")
				.with_description("Number of datanodes for which maintenance was started")
				.init(),
		}
	}
}

/// GateMetrics reference all counters used for drain gate metrics
pub struct GateMetrics {
	pub(crate) pipelines_closed: Counter<u64>,
	pub(crate) nodes_drained: Counter<u64>,
}

impl GateMetrics {
	pub fn new() -> Self {
		let meter = global::meter("silo_admin/gates");
		Self {
			pipelines_closed: meter
				.u64_counter("admin.gate_pipelines_closed")
				.with_description("Number of open pipelines closed for nodes entering maintenance")
				.init(),
			nodes_drained: meter
				.u64_counter("admin.gate_nodes_drained")
				.with_description("Number of datanodes that reached a terminal drained state")
				.init(),
		}
	}
}
