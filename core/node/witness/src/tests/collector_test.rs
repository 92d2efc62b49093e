use anchor_config::WitnessConfig;
use anchor_types::{
    activity::{CREATE_TYPE, OFFER_TYPE},
    AnchorData, AnchorStatus, VerifiableCredential,
};
use assert_matches::assert_matches;

use crate::{tests::utils::*, WitnessError};

fn witness_config(system_witnesses: &[&str]) -> WitnessConfig {
    let mut config = WitnessConfig::for_tests();
    config.system_witnesses = system_witnesses.iter().map(|s| s.to_string()).collect();
    config
}

#[tokio::test]
async fn publishes_immediately_without_witnesses() {
    let node = TestNode::start(witness_config(&[])).await;
    let (built, payload) = build_anchor();

    node.collector
        .propose(&built, &payload, Vec::new())
        .await
        .unwrap();

    let record = node.records.get(&built.hashlink.to_string()).await.unwrap();
    assert_eq!(record.status, AnchorStatus::Published);

    // The Create activity carries the witnessed event.
    let creates = node.activities.query_by_type(CREATE_TYPE).await.unwrap();
    assert_eq!(creates.len(), 1);

    // The log received a leaf referencing the batch.
    let mut entries = node
        .log_entries
        .get_log_entries(&node.witness_config.log_url)
        .await
        .unwrap();
    let entry = entries.next().await.unwrap().unwrap();
    let leaf: AnchorData = String::from_utf8(entry.leaf_input)
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(leaf.operation_count, payload.operation_count);
    assert_eq!(leaf.core_index_file_uri, payload.core_index);
}

#[tokio::test]
async fn solicits_and_promotes_once_policy_is_satisfied() {
    let node = TestNode::start(witness_config(&["https://witness.domain3.com"])).await;
    node.policy.set("OutOf(1,system)").await.unwrap();

    let (built, payload) = build_anchor();
    let anchor = built.hashlink.to_string();

    node.collector
        .propose(&built, &payload, vec!["https://witness.domain2.com".to_string()])
        .await
        .unwrap();

    let record = node.records.get(&anchor).await.unwrap();
    assert_eq!(record.status, AnchorStatus::Soliciting);
    assert_eq!(record.witnesses.len(), 2);

    // One offer per solicited witness.
    let offers = node.activities.query_by_type(OFFER_TYPE).await.unwrap();
    assert_eq!(offers.len(), 2);

    // A batch proof alone does not satisfy OutOf(1,system).
    node.collector
        .handle_accept(
            &anchor,
            "https://witness.domain2.com",
            serde_json::json!({ "proofValue": "z-batch" }),
        )
        .await
        .unwrap();
    let record = node.records.get(&anchor).await.unwrap();
    assert_eq!(record.status, AnchorStatus::Soliciting);

    // The system proof tips the policy over.
    node.collector
        .handle_accept(
            &anchor,
            "https://witness.domain3.com",
            serde_json::json!({ "proofValue": "z-system" }),
        )
        .await
        .unwrap();
    let record = node.records.get(&anchor).await.unwrap();
    assert_eq!(record.status, AnchorStatus::Published);

    // The witnessed credential commits to the anchor and carries both
    // the witness proofs and the locally attached VCT proof.
    let witness = record.event.attachment[0].witness.clone().unwrap();
    assert_eq!(
        witness.credential_subject.get("id").unwrap().as_str().unwrap(),
        anchor
    );
    assert_eq!(witness.proof.len(), 3);
}

#[tokio::test]
async fn rejects_proofs_from_unsolicited_witnesses() {
    let node = TestNode::start(witness_config(&["https://witness.domain3.com"])).await;
    node.policy.set("OutOf(1,system)").await.unwrap();

    let (built, payload) = build_anchor();
    node.collector.propose(&built, &payload, Vec::new()).await.unwrap();

    let result = node
        .collector
        .handle_accept(
            &built.hashlink.to_string(),
            "https://stranger.example.com",
            serde_json::json!({ "proofValue": "z-rogue" }),
        )
        .await;
    assert_matches!(result, Err(WitnessError::UnknownWitness { .. }));
}

#[tokio::test]
async fn proofs_are_immutable_once_set() {
    let node = TestNode::start(witness_config(&["https://witness.domain3.com"])).await;
    node.policy.set("OutOf(2,system)").await.unwrap();

    let (built, payload) = build_anchor();
    let anchor = built.hashlink.to_string();
    node.collector.propose(&built, &payload, Vec::new()).await.unwrap();

    node.collector
        .handle_accept(
            &anchor,
            "https://witness.domain3.com",
            serde_json::json!({ "proofValue": "z-first" }),
        )
        .await
        .unwrap();
    node.collector
        .handle_accept(
            &anchor,
            "https://witness.domain3.com",
            serde_json::json!({ "proofValue": "z-second" }),
        )
        .await
        .unwrap();

    let record = node.records.get(&anchor).await.unwrap();
    let proof = record.witnesses[0].proof.clone().unwrap();
    assert_eq!(proof.get("proofValue").unwrap().as_str().unwrap(), "z-first");
}

#[tokio::test]
async fn rejects_after_exhausting_resolicitation_budget() {
    let mut config = witness_config(&["https://witness.domain3.com"]);
    config.max_resolicits = 1;
    config.resolicit_backoff_secs = 0;
    let node = TestNode::start(config).await;
    node.policy.set("OutOf(1,system)").await.unwrap();

    let (built, payload) = build_anchor();
    let anchor = built.hashlink.to_string();
    node.collector.propose(&built, &payload, Vec::new()).await.unwrap();

    // First pass resolicits, second pass exhausts the budget.
    node.collector.loop_iteration().await.unwrap();
    let record = node.records.get(&anchor).await.unwrap();
    assert_eq!(record.status, AnchorStatus::Soliciting);
    assert_eq!(record.resolicits, 1);

    node.collector.loop_iteration().await.unwrap();
    let record = node.records.get(&anchor).await.unwrap();
    assert_eq!(record.status, AnchorStatus::Rejected);
}

#[tokio::test]
async fn late_proof_for_settled_anchor_is_ignored() {
    let node = TestNode::start(witness_config(&[])).await;
    let (built, payload) = build_anchor();
    let anchor = built.hashlink.to_string();

    node.collector.propose(&built, &payload, Vec::new()).await.unwrap();
    let record = node.records.get(&anchor).await.unwrap();
    assert_eq!(record.status, AnchorStatus::Published);

    // The anchor is already published; a stray proof changes nothing.
    node.collector
        .handle_accept(&anchor, "https://witness.domain3.com", serde_json::json!({}))
        .await
        .unwrap();
    let record = node.records.get(&anchor).await.unwrap();
    assert_eq!(record.status, AnchorStatus::Published);
}

#[tokio::test]
async fn archives_published_anchors_past_retention() {
    let mut config = witness_config(&[]);
    config.retention_secs = 0;
    let node = TestNode::start(config).await;

    let (built, payload) = build_anchor();
    let anchor = built.hashlink.to_string();
    node.collector.propose(&built, &payload, Vec::new()).await.unwrap();

    node.collector.loop_iteration().await.unwrap();
    let record = node.records.get(&anchor).await.unwrap();
    assert_eq!(record.status, AnchorStatus::Archived);
}

#[tokio::test]
async fn witnessed_credential_validates_against_linkset() {
    use anchor_linkset::{AnchorLinksetGenerator, Generator};

    let node = TestNode::start(witness_config(&[])).await;
    let (built, payload) = build_anchor();
    node.collector.propose(&built, &payload, Vec::new()).await.unwrap();

    let record = node.records.get(&built.hashlink.to_string()).await.unwrap();
    let witness: VerifiableCredential = record.event.attachment[0].witness.clone().unwrap();

    let generator = AnchorLinksetGenerator::new();
    generator
        .validate_anchor_credential(&witness, &record.linkset_bytes)
        .unwrap();
}
