//! End-to-end drain scenarios wiring the controller, the drain gates and
//! the event bus over the in-memory cluster managers

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use silo_admin::controller::AdminController;
use silo_admin::gates::register_drain_gates;
use silo_admin::resolve::StaticNameService;
use silo_cluster::bus::EventBus;
use silo_cluster::error::ClusterError;
use silo_cluster::node::{DatanodeInfo, DatanodePort, NodeStatus, OperationalState};
use silo_cluster::pipeline::{ContainerManager, MemoryPipelineManager, PipelineManager, PipelineState};
use silo_cluster::registry::{MemoryNodeRegistry, NodeRegistry};
use silo_cluster::report::{NodeReplicationReport, PipelineReport};
use silo_util::config::Config;
use silo_util::data::{gen_uuid, Uuid};

struct NoContainers;

#[async_trait]
impl ContainerManager for NoContainers {
	async fn container_count(&self, _node: &Uuid) -> Result<u64, ClusterError> {
		Ok(0)
	}
}

fn register(registry: &MemoryNodeRegistry, hostname: &str, ip: &str) -> Uuid {
	let dn = DatanodeInfo {
		id: gen_uuid(),
		hostname: hostname.to_string(),
		ip_addr: ip.parse().unwrap(),
		ports: vec![DatanodePort::new("data", 9866)],
	};
	let id = dn.id;
	registry.register_node(dn);
	id
}

fn controller_for(
	registry: &Arc<MemoryNodeRegistry>,
	names: StaticNameService,
) -> Arc<AdminController> {
	let mut config = Config {
		use_datanode_hostnames: false,
		admin: Default::default(),
	};
	AdminController::new(
		&mut config,
		registry.clone(),
		Arc::new(NoContainers),
		Arc::new(names),
	)
}

/// Push the given reports through freshly subscribed gates and wait for
/// them to be fully processed
async fn deliver_reports(
	registry: Arc<MemoryNodeRegistry>,
	pipelines: Arc<MemoryPipelineManager>,
	pipeline_reports: Vec<PipelineReport>,
	replication_reports: Vec<NodeReplicationReport>,
) {
	let (_stop_tx, stop_rx) = watch::channel(false);
	let mut pipeline_bus = EventBus::new();
	let mut replication_bus = EventBus::new();
	let tasks = register_drain_gates(
		registry,
		pipelines,
		&mut pipeline_bus,
		&mut replication_bus,
		stop_rx,
	);
	for report in pipeline_reports {
		pipeline_bus.dispatch(report);
	}
	for report in replication_reports {
		replication_bus.dispatch(report);
	}
	// Dropping the buses closes the queues, so the dispatch tasks exit once
	// every queued report has been handled
	drop(pipeline_bus);
	drop(replication_bus);
	for task in tasks {
		task.await.unwrap();
	}
}

fn replication_report(node: Uuid, containers: u64, sufficient: u64) -> NodeReplicationReport {
	NodeReplicationReport {
		node,
		status: NodeStatus::new(OperationalState::Decommissioning),
		containers,
		sufficiently_replicated: sufficient,
	}
}

async fn state_of(registry: &MemoryNodeRegistry, id: &Uuid) -> OperationalState {
	registry.get_node_status(id).await.unwrap().operational
}

#[tokio::test]
async fn test_decommission_drain_end_to_end() {
	let registry = MemoryNodeRegistry::new();
	let pipelines = MemoryPipelineManager::new(registry.clone());
	let node = register(&registry, "dn1.example.com", "10.0.0.1");
	let p1 = pipelines.create_pipeline(vec![node]).unwrap();

	let names = StaticNameService::new().with("dn1.example.com", "10.0.0.1".parse().unwrap());
	let controller = controller_for(&registry, names);

	controller
		.decommission_nodes(&["10.0.0.1".to_string()])
		.await
		.unwrap();
	assert_eq!(
		state_of(&registry, &node).await,
		OperationalState::Decommissioning
	);

	// A pipeline report from a decommissioning node does not trigger any
	// closure: that is only done for nodes going into maintenance
	deliver_reports(
		registry.clone(),
		pipelines.clone(),
		vec![PipelineReport {
			node,
			pipelines: vec![p1],
		}],
		vec![],
	)
	.await;
	assert_eq!(
		pipelines.get_pipeline(&p1).await.unwrap().state,
		PipelineState::Open
	);

	// Replication has caught up but the pipeline is still attached, so the
	// node must keep draining
	deliver_reports(
		registry.clone(),
		pipelines.clone(),
		vec![],
		vec![replication_report(node, 5, 5)],
	)
	.await;
	assert_eq!(
		state_of(&registry, &node).await,
		OperationalState::Decommissioning
	);

	// The pipeline is torn down independently; the next report completes
	// the drain
	let p1_full = pipelines.get_pipeline(&p1).await.unwrap();
	pipelines.finalize_and_destroy(&p1_full, false).await.unwrap();
	deliver_reports(
		registry.clone(),
		pipelines.clone(),
		vec![],
		vec![replication_report(node, 5, 5)],
	)
	.await;
	assert_eq!(
		state_of(&registry, &node).await,
		OperationalState::Decommissioned
	);
}

#[tokio::test]
async fn test_maintenance_drain_end_to_end() {
	let registry = MemoryNodeRegistry::new();
	let pipelines = MemoryPipelineManager::new(registry.clone());
	let node = register(&registry, "dn2.example.com", "10.0.0.2");
	let p2 = pipelines.create_pipeline(vec![node]).unwrap();
	let p3 = pipelines.create_pipeline(vec![node]).unwrap();
	pipelines
		.set_pipeline_state(&p3, PipelineState::Closed)
		.unwrap();

	let names = StaticNameService::new().with("dn2.example.com", "10.0.0.2".parse().unwrap());
	let controller = controller_for(&registry, names);

	controller
		.start_maintenance_nodes(&["10.0.0.2".to_string()], 8)
		.await
		.unwrap();
	assert_eq!(
		state_of(&registry, &node).await,
		OperationalState::EnteringMaintenance
	);

	// The gate closes the open pipeline and leaves the closed one alone
	deliver_reports(
		registry.clone(),
		pipelines.clone(),
		vec![PipelineReport {
			node,
			pipelines: vec![p2, p3],
		}],
		vec![],
	)
	.await;
	assert!(matches!(
		pipelines.get_pipeline(&p2).await,
		Err(ClusterError::PipelineNotFound(_))
	));
	assert_eq!(
		pipelines.get_pipeline(&p3).await.unwrap().state,
		PipelineState::Closed
	);

	// The closed pipeline is still attached to the node, which holds the
	// drain open
	deliver_reports(
		registry.clone(),
		pipelines.clone(),
		vec![],
		vec![replication_report(node, 2, 2)],
	)
	.await;
	assert_eq!(
		state_of(&registry, &node).await,
		OperationalState::EnteringMaintenance
	);

	// Once it is destroyed as well, the node reaches maintenance
	let p3_full = pipelines.get_pipeline(&p3).await.unwrap();
	pipelines.finalize_and_destroy(&p3_full, false).await.unwrap();
	deliver_reports(
		registry.clone(),
		pipelines.clone(),
		vec![],
		vec![replication_report(node, 2, 2)],
	)
	.await;
	assert_eq!(
		state_of(&registry, &node).await,
		OperationalState::InMaintenance
	);
}

#[tokio::test]
async fn test_recommission_during_drain_wins_over_late_reports() {
	let registry = MemoryNodeRegistry::new();
	let pipelines = MemoryPipelineManager::new(registry.clone());
	let node = register(&registry, "dn3.example.com", "10.0.0.3");

	let names = StaticNameService::new().with("dn3.example.com", "10.0.0.3".parse().unwrap());
	let controller = controller_for(&registry, names);

	controller
		.decommission_nodes(&["10.0.0.3".to_string()])
		.await
		.unwrap();
	controller
		.recommission_nodes(&["10.0.0.3".to_string()])
		.await
		.unwrap();
	assert_eq!(state_of(&registry, &node).await, OperationalState::InService);

	// A report built while the node was draining arrives late and must not
	// move the node anywhere
	deliver_reports(
		registry.clone(),
		pipelines.clone(),
		vec![],
		vec![replication_report(node, 5, 5)],
	)
	.await;
	assert_eq!(state_of(&registry, &node).await, OperationalState::InService);
}
