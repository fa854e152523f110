use testnet_config::{chain::Lane, units::UNIT};
use testnet_core::nodes::PTxStatus;
use testnet_workflows::{
    AcceptanceError, DELEGATOR_NODE, StakeAmounts, StakingScenario, VALIDATOR_NODE,
    WorkflowError, added_node_id,
};
use tests_workflows::{Harness, fake_node_id, settings};

#[tokio::test(start_paused = true)]
async fn validator_balances_follow_fee_arithmetic() {
    let harness = Harness::new();
    let amounts = StakeAmounts::default();
    let topology = harness
        .funded_topology(&amounts)
        .await
        .expect("funded topology");
    let validator = topology.node(VALIDATOR_NODE).expect("validator");

    validator
        .become_validator(&amounts)
        .await
        .expect("validator workflow");

    assert_eq!(
        harness.network.history(validator.p_address()),
        vec![5_000 * UNIT, 2_000 * UNIT]
    );
    assert_eq!(
        harness.network.x_balance(validator.x_address()),
        4_998 * UNIT
    );
}

#[tokio::test(start_paused = true)]
async fn delegator_delegates_to_validator_identity() {
    let harness = Harness::new();
    let amounts = StakeAmounts::default();
    let topology = harness
        .funded_topology(&amounts)
        .await
        .expect("funded topology");
    let validator = topology.node(VALIDATOR_NODE).expect("validator");
    let delegator = topology.node(DELEGATOR_NODE).expect("delegator");

    validator
        .become_validator(&amounts)
        .await
        .expect("validator workflow");
    delegator
        .become_delegator(&amounts, validator.node_id())
        .await
        .expect("delegator workflow");

    let delegations = harness.network.delegations();
    assert_eq!(delegations.len(), 1);
    assert_eq!(delegations[0].node_id, fake_node_id(VALIDATOR_NODE));
    assert_eq!(delegations[0].reward_address, delegator.p_address());
    assert_eq!(delegations[0].stake_amount, amounts.stake);
    assert_eq!(
        harness.network.p_balance(delegator.p_address()),
        2_000 * UNIT
    );
    assert_eq!(
        harness.network.x_balance(delegator.x_address()),
        4_998 * UNIT
    );
}

#[tokio::test(start_paused = true)]
async fn whole_seed_can_be_bonded() {
    let harness = Harness::new();
    let amounts = StakeAmounts {
        stake: 5_000 * UNIT,
        ..StakeAmounts::default()
    };
    let topology = harness
        .funded_topology(&amounts)
        .await
        .expect("funded topology");
    let validator = topology.node(VALIDATOR_NODE).expect("validator");
    let delegator = topology.node(DELEGATOR_NODE).expect("delegator");

    validator
        .become_validator(&amounts)
        .await
        .expect("validator bonds its whole seed");
    delegator
        .become_delegator(&amounts, validator.node_id())
        .await
        .expect("delegator bonds its whole seed");

    assert_eq!(
        harness.network.history(validator.p_address()),
        vec![5_000 * UNIT, 0]
    );
    assert_eq!(harness.network.p_balance(delegator.p_address()), 0);
    assert_eq!(
        harness.network.x_balance(validator.x_address()),
        4_998 * UNIT
    );

    let err = validator
        .return_stake_leftover(&amounts)
        .await
        .expect_err("nothing left to return");
    assert!(matches!(err, WorkflowError::InvalidAmounts { .. }));
}

#[tokio::test(start_paused = true)]
async fn leftover_returns_to_x_lane() {
    let harness = Harness::new();
    let amounts = StakeAmounts::default();
    let topology = harness
        .funded_topology(&amounts)
        .await
        .expect("funded topology");
    let validator = topology.node(VALIDATOR_NODE).expect("validator");

    validator
        .become_validator(&amounts)
        .await
        .expect("validator workflow");
    validator
        .return_stake_leftover(&amounts)
        .await
        .expect("leftover returned");

    assert_eq!(harness.network.p_balance(validator.p_address()), 0);
    assert_eq!(
        harness.network.x_balance(validator.x_address()),
        10_000 * UNIT - 5_000 * UNIT - 2 * UNIT + 5_000 * UNIT - 3_000 * UNIT - 2 * UNIT
    );
}

#[tokio::test(start_paused = true)]
async fn validator_missing_from_set_fails_workflow() {
    let harness = Harness::new();
    harness.network.hide_validators();
    let amounts = StakeAmounts::default();
    let topology = harness
        .funded_topology(&amounts)
        .await
        .expect("funded topology");

    let err = topology
        .node(VALIDATOR_NODE)
        .expect("validator")
        .become_validator(&amounts)
        .await
        .expect_err("validator is never listed");

    assert!(matches!(
        err,
        WorkflowError::ValidatorMissing { ref node_id, .. }
            if *node_id == fake_node_id(VALIDATOR_NODE)
    ));
}

#[tokio::test(start_paused = true)]
async fn dropped_import_stops_workflow_without_extra_polls() {
    let harness = Harness::new();
    let amounts = StakeAmounts::default();
    let topology = harness
        .funded_topology(&amounts)
        .await
        .expect("funded topology");
    harness
        .network
        .script_next_p(vec![PTxStatus::Processing, PTxStatus::Dropped]);

    let err = topology
        .node(VALIDATOR_NODE)
        .expect("validator")
        .become_validator(&amounts)
        .await
        .expect_err("import is dropped");

    // tx-1 and tx-2 fund the nodes, tx-3 is the export, tx-4 the import.
    assert!(matches!(
        err,
        WorkflowError::Acceptance(AcceptanceError::Abandoned { lane: Lane::P, .. })
    ));
    assert_eq!(harness.network.polls("tx-4"), 2);
}

#[tokio::test(start_paused = true)]
async fn full_staking_scenario_runs_to_completion() {
    let mut harness = Harness::new();
    let scenario = StakingScenario::default();

    let topology = scenario
        .run(
            harness.orchestrator.clone(),
            &mut harness.definition,
            &harness.genesis,
            settings(),
        )
        .await
        .expect("scenario");

    let ids = harness.orchestrator.node_ids();
    assert!(ids.contains(&added_node_id(1)));
    assert!(ids.contains(&added_node_id(2)));
    assert_eq!(harness.network.start_calls(), 5 + 2 + scenario.added_nodes);

    let expected_x = scenario.amounts.x_after_leftover();
    for id in [VALIDATOR_NODE, DELEGATOR_NODE] {
        let node = topology.node(id).expect("registered");
        assert_eq!(harness.network.p_balance(node.p_address()), 0);
        assert_eq!(harness.network.x_balance(node.x_address()), expected_x);
    }
}
