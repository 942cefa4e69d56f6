//! Integration test: a bounty from funding to payout, as the overlay host
//! would drive it.
//!
//! 1. Fund two issues in one transaction, with a malformed sibling output
//! 2. Admit the valid outputs into the projection
//! 3. Top up one bounty, superseding it with a continuation output
//! 4. Claim the continuation with a solver attribution
//! 5. Move the other bounty at the same amount, then withdraw it
//! 6. Check every query shape against the live records

use std::sync::Arc;

use bitcoin::consensus::serialize;
use bitcoin::{absolute, transaction, Amount, OutPoint, ScriptBuf, Transaction, TxIn, TxOut};
use gitpaid_lookup::{BountyLookupService, LookupQuestion};
use gitpaid_script::{pushdrop, txid_hex};
use gitpaid_topic::{resolve_continuations, BountyTopicManager, ClaimMarker, SpendIntent};
use gitpaid_types::{BountyRecord, BountyStatus, OutputRef, SERVICE_BOUNTY, TOPIC_BOUNTY};
use serde_json::{json, Value};
use tokio::sync::Mutex;

const FUNDER: [u8; 33] = [0x02; 33];

fn bounty(owner: &str, repo: &str, issue: u64, amount: u64) -> ScriptBuf {
    let fields: Vec<Vec<u8>> = [
        owner,
        repo,
        issue.to_string().as_str(),
        amount.to_string().as_str(),
        "02funderkey",
        "",
        "",
    ]
    .iter()
    .map(|f| f.as_bytes().to_vec())
    .collect();
    pushdrop::lock(&fields, &FUNDER).expect("lock")
}

fn tx(inputs: Vec<TxIn>, outputs: Vec<ScriptBuf>) -> Transaction {
    Transaction {
        version: transaction::Version::ONE,
        lock_time: absolute::LockTime::ZERO,
        input: inputs,
        output: outputs
            .into_iter()
            .map(|script_pubkey| TxOut {
                value: Amount::from_sat(1),
                script_pubkey,
            })
            .collect(),
    }
}

/// Input funded from outside the overlay.
fn wallet_input() -> TxIn {
    TxIn::default()
}

fn spend(prev: &Transaction, vout: u32) -> TxIn {
    TxIn {
        previous_output: OutPoint {
            txid: prev.compute_txid(),
            vout,
        },
        script_sig: ScriptBuf::from_bytes(vec![0x00]),
        ..TxIn::default()
    }
}

async fn ask(lookup: &BountyLookupService, query: Value) -> Value {
    lookup
        .lookup(&LookupQuestion::new(SERVICE_BOUNTY, query))
        .await
        .expect("lookup")
        .result()
        .clone()
}

async fn record(lookup: &BountyLookupService, txid: &str, index: u32) -> Option<BountyRecord> {
    let found = ask(
        lookup,
        json!({"type": "findBountyDetails", "value": {"txid": txid, "outputIndex": index}}),
    )
    .await;
    let mut records: Vec<BountyRecord> = serde_json::from_value(found).expect("records");
    assert!(records.len() <= 1);
    records.pop()
}

#[tokio::test]
async fn bounty_lifecycle() {
    let conn = gitpaid_db::open_memory().expect("open db");
    let topic = BountyTopicManager::new();
    let lookup = BountyLookupService::new(Arc::new(Mutex::new(conn)));

    // 1. Funding transaction: issue #1 and #2 of octo/app, plus junk.
    let funding = tx(
        vec![wallet_input()],
        vec![
            bounty("octo", "app", 1, 1_000),
            bounty("octo", "app", 0, 1_000),
            bounty("octo", "app", 2, 400),
        ],
    );
    let admittance = topic
        .identify_admissible_outputs(&serialize(&funding), &[])
        .expect("identify");
    assert_eq!(admittance.outputs_to_admit, vec![0, 2]);
    assert_eq!(admittance.rejected.len(), 1);

    // 2. Host admits each output.
    let funding_txid = txid_hex(&funding);
    for &index in &admittance.outputs_to_admit {
        let script = &funding.output[index as usize].script_pubkey;
        let created = lookup
            .output_admitted(&funding_txid, index, script, TOPIC_BOUNTY)
            .await
            .expect("admit");
        assert!(created);
    }
    let repos = ask(&lookup, json!("findReposWithBounties")).await;
    assert_eq!(
        repos,
        json!([{"repoOwner": "octo", "repoName": "app", "totalBounties": 2, "totalAmount": 1400, "openBounties": 2}])
    );

    // 3. Top up issue #1 to 1500, continuing it at output 0.
    let top_up = tx(vec![spend(&funding, 0)], vec![bounty("octo", "app", 1, 1_500)]);
    let top_up_txid = txid_hex(&top_up);
    let admittance = topic.classify(&top_up, &[0]);
    assert_eq!(admittance.outputs_to_admit, vec![0]);
    assert_eq!(admittance.coins_to_retain, vec![0]);

    let spent = lookup
        .records(&[OutputRef::new(funding_txid.clone(), 0)])
        .await
        .expect("records");
    let continuations = resolve_continuations(&top_up, &spent);
    assert_eq!(continuations.len(), 1);
    assert_eq!(continuations[0].output_index, 0);
    assert_eq!(continuations[0].amount, 1_500);

    lookup
        .output_admitted(&top_up_txid, 0, &top_up.output[0].script_pubkey, TOPIC_BOUNTY)
        .await
        .expect("admit continuation");
    let intent = lookup
        .output_spent(&funding_txid, 0, TOPIC_BOUNTY, Some(&top_up))
        .await
        .expect("spend");
    assert!(matches!(intent, Some(SpendIntent::FundAdd { new_amount: 1_500, .. })));

    // Only the continuation is live; amounts are not merged.
    assert!(record(&lookup, &funding_txid, 0).await.is_none());
    let repos = ask(&lookup, json!("findReposWithBounties")).await;
    assert_eq!(repos[0]["totalBounties"], 2);
    assert_eq!(repos[0]["totalAmount"], 1_900);
    assert_eq!(repos[0]["openBounties"], 2);

    // 4. Claim the continuation.
    let marker = ClaimMarker {
        repo_owner: "octo".into(),
        repo_name: "app".into(),
        issue_number: 1,
        solver: "fixer".into(),
        solver_public_key: "03fixer".into(),
    };
    let claim = tx(
        vec![spend(&top_up, 0)],
        vec![
            pushdrop::lock(&marker.to_fields(), &FUNDER).expect("lock"),
            ScriptBuf::from_bytes(vec![0x51]),
        ],
    );
    let intent = lookup
        .output_spent(&top_up_txid, 0, TOPIC_BOUNTY, Some(&claim))
        .await
        .expect("claim");
    assert!(matches!(intent, Some(SpendIntent::Claim { solver: Some(_), .. })));

    let claimed = record(&lookup, &top_up_txid, 0).await.expect("claimed");
    assert_eq!(claimed.status, BountyStatus::Claimed);
    assert_eq!(claimed.solver.as_deref(), Some("fixer"));
    assert_eq!(claimed.solver_public_key.as_deref(), Some("03fixer"));
    assert_eq!(claimed.claim_txid, Some(txid_hex(&claim)));
    assert!(claimed.updated_at > claimed.created_at);

    // 5. Move issue #2 without changing its amount, then withdraw it.
    let moved = tx(
        vec![spend(&funding, 2)],
        vec![ScriptBuf::from_bytes(vec![0x51]), bounty("octo", "app", 2, 400)],
    );
    let moved_txid = txid_hex(&moved);
    lookup
        .output_admitted(&moved_txid, 1, &moved.output[1].script_pubkey, TOPIC_BOUNTY)
        .await
        .expect("admit moved");
    let intent = lookup
        .output_spent(&funding_txid, 2, TOPIC_BOUNTY, Some(&moved))
        .await
        .expect("move");
    assert_eq!(intent, Some(SpendIntent::Reanchor { continuation_index: 1 }));
    assert!(record(&lookup, &funding_txid, 2).await.is_none());
    assert_eq!(
        record(&lookup, &moved_txid, 1).await.map(|r| r.status),
        Some(BountyStatus::Open)
    );

    let refund = tx(vec![spend(&moved, 1)], vec![ScriptBuf::from_bytes(vec![0x51])]);
    let intent = lookup
        .output_spent(&moved_txid, 1, TOPIC_BOUNTY, Some(&refund))
        .await
        .expect("withdraw");
    assert_eq!(intent, Some(SpendIntent::Withdraw { remainder_index: None }));
    assert_eq!(
        record(&lookup, &moved_txid, 1).await.map(|r| r.status),
        Some(BountyStatus::Cancelled)
    );

    // 6. Every query sees exactly one record per bounty.
    let issue_one = ask(
        &lookup,
        json!({"type": "findByIssue", "value": {"repoOwner": "octo", "repoName": "app", "issueNumber": 1}}),
    )
    .await;
    assert_eq!(issue_one.as_array().map(Vec::len), Some(1));
    assert_eq!(issue_one[0]["txid"], top_up_txid.as_str());

    let all = ask(&lookup, json!("findAllBounties")).await;
    assert_eq!(all.as_array().map(Vec::len), Some(2));

    let by_funder = ask(
        &lookup,
        json!({"type": "findByFunder", "value": {"publicKey": "02funderkey"}}),
    )
    .await;
    assert_eq!(by_funder.as_array().map(Vec::len), Some(2));

    let repos = ask(&lookup, json!("findReposWithBounties")).await;
    assert_eq!(repos[0]["totalBounties"], 2);
    assert_eq!(repos[0]["totalAmount"], 1_900);
    assert_eq!(repos[0]["openBounties"], 0);

    let stats = lookup.stats();
    assert_eq!(stats.admitted, 4);
    assert_eq!(stats.spent, 4);
    assert_eq!(stats.superseded, 2);
    assert_eq!(stats.deleted, 0);
}

#[tokio::test]
async fn events_for_other_topics_are_ignored() {
    let conn = gitpaid_db::open_memory().expect("open db");
    let lookup = BountyLookupService::new(Arc::new(Mutex::new(conn)));
    let funding = tx(vec![wallet_input()], vec![bounty("octo", "app", 1, 10)]);
    let txid = txid_hex(&funding);

    let created = lookup
        .output_admitted(&txid, 0, &funding.output[0].script_pubkey, "tm_uhrp")
        .await
        .expect("admit");
    assert!(!created);

    lookup
        .output_admitted(&txid, 0, &funding.output[0].script_pubkey, TOPIC_BOUNTY)
        .await
        .expect("admit");
    assert_eq!(
        lookup.output_spent(&txid, 0, "tm_uhrp", None).await.expect("spend"),
        None
    );
    assert_eq!(
        lookup.output_deleted(&txid, 0, "tm_uhrp").await.expect("delete"),
        0
    );
    assert_eq!(
        record(&lookup, &txid, 0).await.map(|r| r.status),
        Some(BountyStatus::Open)
    );
}
