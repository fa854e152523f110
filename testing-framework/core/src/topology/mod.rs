pub mod launch;
pub mod lifecycle;
pub mod orchestrator;
pub mod readiness;

pub use launch::{NodeLaunch, node_files};
pub use lifecycle::{DynError, LaunchCommand, ServiceLifecycle, ServiceSpec, StartedService};
pub use orchestrator::{
    ClientFactory, HttpClientFactory, OrchestratorSettings, TopologyError, TopologyOrchestrator,
    TrackedNode,
};
pub use readiness::{
    NodeReadinessChecker, PollBudget, ReadinessCheck, ReadinessError, ReadinessRecord, wait_ready,
};
