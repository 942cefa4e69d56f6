//! Topic manager and output lifecycle command handlers.

use std::sync::Arc;

use gitpaid_script::{decode_transaction_hex, txid_hex, ScriptBuf};
use gitpaid_topic::resolve_continuations;
use gitpaid_types::OutputRef;
use serde_json::Value;
use tracing::debug;

use super::{hex_param, required_index, required_str};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Classify a transaction's outputs for admission.
///
/// Also reports, for every previously tracked coin that spends a stored
/// bounty, which new output continues it.
pub async fn identify_admissible_outputs(state: &Arc<DaemonState>, params: &Value) -> Result {
    let beef = hex_param(params, "beef")?;
    let previous_coins = coin_list(params)?;

    let tx = state.topic.decode_transaction(&beef)?;
    let admittance = state.topic.classify(&tx, &previous_coins);

    let spent: Vec<(u32, OutputRef)> = previous_coins
        .iter()
        .filter_map(|&coin| {
            let prev = tx.input.get(usize::try_from(coin).ok()?)?.previous_output;
            Some((coin, OutputRef::new(prev.txid.to_string(), prev.vout)))
        })
        .collect();
    let outpoints: Vec<OutputRef> = spent.iter().map(|(_, o)| o.clone()).collect();
    let records = state.lookup.records(&outpoints).await?;

    let continuations: Vec<Value> = resolve_continuations(&tx, &records)
        .into_iter()
        .filter_map(|c| {
            let (coin, _) = spent.iter().find(|(_, o)| *o == c.spent)?;
            Some(serde_json::json!({
                "inputIndex": coin,
                "outputIndex": c.output_index,
                "amount": c.amount,
            }))
        })
        .collect();
    debug!(
        txid = %txid_hex(&tx),
        admitted = admittance.outputs_to_admit.len(),
        continuations = continuations.len(),
        "Identified admissible outputs"
    );

    Ok(serde_json::json!({
        "outputsToAdmit": admittance.outputs_to_admit,
        "coinsToRetain": admittance.coins_to_retain,
        "continuations": continuations,
    }))
}

/// An output was admitted by the host.
pub async fn output_admitted(state: &Arc<DaemonState>, params: &Value) -> Result {
    let txid = required_str(params, "txid")?;
    let output_index = required_index(params, "output_index")?;
    let script = ScriptBuf::from_bytes(hex_param(params, "output_script")?);
    let topic = required_str(params, "topic")?;

    let created = state
        .lookup
        .output_admitted(txid, output_index, &script, topic)
        .await?;
    Ok(serde_json::json!({"created": created}))
}

/// A tracked output was spent.
pub async fn output_spent(state: &Arc<DaemonState>, params: &Value) -> Result {
    let txid = required_str(params, "txid")?;
    let output_index = required_index(params, "output_index")?;
    let topic = required_str(params, "topic")?;
    let spending_tx = match params.get("spending_tx").and_then(|v| v.as_str()) {
        Some(hex) => Some(
            decode_transaction_hex(hex)
                .map_err(|e| RpcError::decode_failure(&format!("spending_tx: {e}")))?,
        ),
        None => None,
    };

    let intent = state
        .lookup
        .output_spent(txid, output_index, topic, spending_tx.as_ref())
        .await?;
    Ok(serde_json::json!({"intent": intent}))
}

/// A tracked output was removed from the chain view.
pub async fn output_deleted(state: &Arc<DaemonState>, params: &Value) -> Result {
    let txid = required_str(params, "txid")?;
    let output_index = required_index(params, "output_index")?;
    let topic = required_str(params, "topic")?;

    let deleted = state
        .lookup
        .output_deleted(txid, output_index, topic)
        .await?;
    Ok(serde_json::json!({"deleted": deleted}))
}

fn coin_list(params: &Value) -> std::result::Result<Vec<u32>, RpcError> {
    match params.get("previous_coins") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| RpcError::invalid_params("previous_coins must be input indices"))
            })
            .collect(),
        Some(_) => Err(RpcError::invalid_params("previous_coins must be an array")),
    }
}

#[cfg(test)]
mod tests {
    use crate::rpc::tests::{call, test_state};
    use bitcoin::consensus::encode::serialize_hex;
    use bitcoin::{absolute, transaction, Amount, OutPoint, Transaction, TxIn, TxOut};
    use gitpaid_script::{pushdrop, txid_hex};
    use gitpaid_types::TOPIC_BOUNTY;
    use serde_json::json;

    fn bounty_fields(issue: u64, amount: u64) -> Vec<Vec<u8>> {
        [
            "octocat",
            "hello",
            issue.to_string().as_str(),
            amount.to_string().as_str(),
            "02funder",
            "",
            "",
        ]
        .iter()
        .map(|f| f.as_bytes().to_vec())
        .collect()
    }

    fn tx(inputs: Vec<TxIn>, fields: Vec<Vec<Vec<u8>>>) -> Transaction {
        Transaction {
            version: transaction::Version::ONE,
            lock_time: absolute::LockTime::ZERO,
            input: inputs,
            output: fields
                .iter()
                .map(|f| TxOut {
                    value: Amount::from_sat(1000),
                    script_pubkey: pushdrop::lock(f, &[0x02; 33]).expect("lock"),
                })
                .collect(),
        }
    }

    fn funding_input() -> TxIn {
        TxIn::default()
    }

    fn spending(prev: &Transaction, vout: u32) -> TxIn {
        TxIn {
            previous_output: OutPoint {
                txid: prev.compute_txid(),
                vout,
            },
            ..TxIn::default()
        }
    }

    #[tokio::test]
    async fn test_identify_then_admit() {
        let state = test_state();
        let create = tx(vec![funding_input()], vec![bounty_fields(3, 500), vec![b"junk".to_vec()]]);

        let resp = call(
            &state,
            "identify_admissible_outputs",
            json!({"beef": serialize_hex(&create), "previous_coins": []}),
        )
        .await;
        let result = resp.result.expect("result");
        assert_eq!(result["outputsToAdmit"], json!([0]));
        assert_eq!(result["coinsToRetain"], json!([]));

        let resp = call(
            &state,
            "output_admitted",
            json!({
                "txid": txid_hex(&create),
                "output_index": 0,
                "output_script": create.output[0].script_pubkey.to_hex_string(),
                "topic": TOPIC_BOUNTY,
            }),
        )
        .await;
        assert_eq!(resp.result, Some(json!({"created": true})));
    }

    #[tokio::test]
    async fn test_continuation_reported_for_update() {
        let state = test_state();
        let create = tx(vec![funding_input()], vec![bounty_fields(3, 500)]);
        state
            .lookup
            .output_admitted(&txid_hex(&create), 0, &create.output[0].script_pubkey, TOPIC_BOUNTY)
            .await
            .expect("admit");

        let update = tx(vec![spending(&create, 0)], vec![bounty_fields(3, 800)]);
        let resp = call(
            &state,
            "identify_admissible_outputs",
            json!({"beef": serialize_hex(&update), "previous_coins": [0]}),
        )
        .await;
        let result = resp.result.expect("result");
        assert_eq!(result["outputsToAdmit"], json!([0]));
        assert_eq!(result["coinsToRetain"], json!([0]));
        assert_eq!(
            result["continuations"],
            json!([{"inputIndex": 0, "outputIndex": 0, "amount": 800}])
        );

        let resp = call(
            &state,
            "output_spent",
            json!({
                "txid": txid_hex(&create),
                "output_index": 0,
                "topic": TOPIC_BOUNTY,
                "spending_tx": serialize_hex(&update),
            }),
        )
        .await;
        let result = resp.result.expect("result");
        assert_eq!(result["intent"]["kind"], "fundAdd");
        assert_eq!(result["intent"]["newAmount"], 800);

        let superseded = state
            .lookup
            .records(&[gitpaid_types::OutputRef::new(txid_hex(&create), 0)])
            .await
            .expect("records");
        assert!(superseded.is_empty());
    }

    #[tokio::test]
    async fn test_bad_transaction_is_decode_failure() {
        let state = test_state();
        let resp = call(&state, "identify_admissible_outputs", json!({"beef": "0100"})).await;
        assert_eq!(resp.error.map(|e| e.code), Some(-32031));
        assert_eq!(state.topic.stats().decode_failures, 1);

        let resp = call(&state, "identify_admissible_outputs", json!({"beef": "zz"})).await;
        assert_eq!(resp.error.map(|e| e.code), Some(-32602));
    }

    #[tokio::test]
    async fn test_spent_and_deleted() {
        let state = test_state();
        let create = tx(vec![funding_input()], vec![bounty_fields(9, 10)]);
        state
            .lookup
            .output_admitted(&txid_hex(&create), 0, &create.output[0].script_pubkey, TOPIC_BOUNTY)
            .await
            .expect("admit");

        let params = json!({"txid": txid_hex(&create), "output_index": 0, "topic": TOPIC_BOUNTY});
        let resp = call(&state, "output_spent", params.clone()).await;
        assert_eq!(resp.result.expect("result")["intent"]["kind"], "claim");

        let resp = call(&state, "output_deleted", params.clone()).await;
        assert_eq!(resp.result, Some(json!({"deleted": 1})));
        let resp = call(&state, "output_deleted", params).await;
        assert_eq!(resp.result, Some(json!({"deleted": 0})));
    }

    #[tokio::test]
    async fn test_missing_params() {
        let state = test_state();
        let resp = call(&state, "output_deleted", json!({"txid": "aa"})).await;
        assert_eq!(resp.error.map(|e| e.code), Some(-32602));
    }
}
