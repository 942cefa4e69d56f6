//! Diagnostics command handlers.

use std::sync::Arc;

use serde_json::Value;

use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Counters of both services plus store and token sizes.
pub async fn get_stats(state: &Arc<DaemonState>) -> Result {
    let records = {
        let db = state.db.lock().await;
        gitpaid_db::queries::bounties::count(&db)
            .map_err(|e| RpcError::store_unavailable(&e.to_string()))?
    };
    let outstanding_tokens = state.tokens.lock().await.len();

    Ok(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "node_name": state.config.overlay.node_name,
        "network": state.config.overlay.network,
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "records": records,
        "outstanding_tokens": outstanding_tokens,
        "topic": state.topic.stats(),
        "lookup": state.lookup.stats(),
    }))
}
