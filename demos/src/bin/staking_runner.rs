use std::{process, sync::Arc, time::Duration};

use anyhow::{Context as _, Result};
use testnet_config::{
    adjust_timeout,
    genesis::GenesisConfig,
    network::{NetworkDefinition, NetworkManifest, NetworkParams},
};
use testnet_core::topology::{HttpClientFactory, TopologyOrchestrator};
use testnet_demos::{defaults, read_env_any};
use testnet_env as tf_env;
use testnet_runner_docker::{DockerLifecycle, docker_available};
use testnet_workflows::{StakingScenario, WorkflowSettings};
use tracing::{info, warn};

const DOCKER_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    defaults::init_tracing();

    let added_nodes = read_env_any(&["TESTNET_DEMO_ADDED_NODES"], 2_usize);
    info!(added_nodes, "starting staking runner demo");

    if let Err(err) = run_staking_case(added_nodes).await {
        warn!("staking runner demo failed: {err:#}");
        process::exit(1);
    }
}

async fn run_staking_case(added_nodes: usize) -> Result<()> {
    if !docker_available(adjust_timeout(DOCKER_PROBE_TIMEOUT)).await {
        warn!("Docker is unavailable; cannot run staking demo");
        return Ok(());
    }

    let genesis = GenesisConfig::from_env().context("loading genesis stakers")?;
    let scenario = StakingScenario {
        added_nodes,
        ..StakingScenario::default()
    };
    let mut definition = network_definition(&scenario, &genesis)?;
    info!(
        nodes = definition.len(),
        bootstrap = definition.num_bootstrap_nodes(),
        "network definition ready"
    );

    let (lifecycle, _cleanup) = DockerLifecycle::create()
        .await
        .context("preparing docker runner")?;
    info!(
        project = lifecycle.project(),
        network = lifecycle.network(),
        "docker runner ready"
    );
    let orchestrator = Arc::new(TopologyOrchestrator::new(
        Arc::new(lifecycle),
        Arc::new(HttpClientFactory),
    ));

    let topology = scenario
        .run(
            orchestrator,
            &mut definition,
            &genesis,
            WorkflowSettings::default(),
        )
        .await
        .context("running staking scenario failed")?;
    info!(
        nodes = topology.nodes().count(),
        "staking scenario succeeded"
    );
    Ok(())
}

/// A manifest from `TESTNET_NETWORK_MANIFEST` replaces the built-in layout.
fn network_definition(
    scenario: &StakingScenario,
    genesis: &GenesisConfig,
) -> Result<NetworkDefinition> {
    match tf_env::testnet_network_manifest() {
        Some(path) => {
            info!(path = %path.display(), "loading network manifest");
            NetworkManifest::from_path(&path)?
                .into_definition(genesis)
                .with_context(|| format!("building network from {}", path.display()))
        }
        None => scenario
            .definition(NetworkParams::default(), genesis)
            .context("building staking network"),
    }
}
