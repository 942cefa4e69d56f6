//! Lookup service command handlers.

use std::sync::Arc;

use gitpaid_lookup::LookupQuestion;
use serde_json::Value;

use super::required_str;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Answer a lookup question.
pub async fn lookup(state: &Arc<DaemonState>, params: &Value) -> Result {
    let service = required_str(params, "service")?;
    let query = params.get("query").cloned().unwrap_or(Value::Null);

    let answer = state
        .lookup
        .lookup(&LookupQuestion::new(service, query))
        .await?;
    serde_json::to_value(answer).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Markdown documentation of the topic manager or the lookup service.
pub async fn get_documentation(state: &Arc<DaemonState>, params: &Value) -> Result {
    let documentation = match target(params)? {
        Target::Topic => state.topic.documentation(),
        Target::Lookup => state.lookup.documentation(),
    };
    Ok(serde_json::json!({"documentation": documentation}))
}

/// Metadata of the topic manager or the lookup service.
pub async fn get_metadata(state: &Arc<DaemonState>, params: &Value) -> Result {
    let metadata = match target(params)? {
        Target::Topic => state.topic.metadata(),
        Target::Lookup => state.lookup.metadata(),
    };
    serde_json::to_value(metadata).map_err(|e| RpcError::internal_error(&e.to_string()))
}

enum Target {
    Topic,
    Lookup,
}

fn target(params: &Value) -> std::result::Result<Target, RpcError> {
    match required_str(params, "target")? {
        "topic" => Ok(Target::Topic),
        "lookup" => Ok(Target::Lookup),
        _ => Err(RpcError::invalid_params("target must be topic or lookup")),
    }
}
