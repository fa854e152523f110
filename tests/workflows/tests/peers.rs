use testnet_core::nodes::Peer;
use testnet_workflows::{
    DELEGATOR_NODE, StakeAmounts, VALIDATOR_NODE, WorkflowError, verify_connected_peers,
};
use tests_workflows::{Harness, fake_node_id};

fn peer(ip: &str) -> Peer {
    Peer {
        ip: format!("{ip}:9651"),
        node_id: String::new(),
    }
}

#[tokio::test(start_paused = true)]
async fn peers_must_belong_to_expected_nodes() {
    let harness = Harness::new();
    let topology = harness
        .funded_topology(&StakeAmounts::default())
        .await
        .expect("funded topology");
    let validator = topology.node(VALIDATOR_NODE).expect("validator");
    let delegator = topology.node(DELEGATOR_NODE).expect("delegator");

    harness
        .network
        .set_peers(validator.ip(), vec![peer(&delegator.ip().to_string())]);
    verify_connected_peers(&[validator], &[delegator])
        .await
        .expect("delegator is a known peer");

    harness
        .network
        .set_peers(validator.ip(), vec![peer("10.9.9.9")]);
    let err = verify_connected_peers(&[validator], &[delegator])
        .await
        .expect_err("unknown peer");

    match err {
        WorkflowError::PeerMismatch { peer, known } => {
            assert_eq!(peer, "10.9.9.9");
            assert_eq!(
                known.get(&fake_node_id(DELEGATOR_NODE)),
                Some(&delegator.ip().to_string())
            );
        }
        other => panic!("unexpected error {other:?}"),
    }
}
