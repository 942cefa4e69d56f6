//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category.

pub mod certifier;
pub mod diagnostics;
pub mod lookup;
pub mod topic;

use serde_json::Value;

use crate::rpc::RpcError;

/// A required string parameter.
pub(crate) fn required_str<'a>(params: &'a Value, name: &str) -> Result<&'a str, RpcError> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} required")))
}

/// A required output index parameter.
pub(crate) fn required_index(params: &Value, name: &str) -> Result<u32, RpcError> {
    params
        .get(name)
        .and_then(|v| v.as_u64())
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} must be an output index")))
}

/// Decode a hex parameter.
pub(crate) fn hex_param(params: &Value, name: &str) -> Result<Vec<u8>, RpcError> {
    hex::decode(required_str(params, name)?.trim())
        .map_err(|e| RpcError::invalid_params(&format!("{name} is not hex: {e}")))
}
