//! Certificate issuance token handlers.
//!
//! The web front end issues a token after GitHub authentication; the
//! certificate signer redeems it exactly once to learn whose identity it is
//! attesting.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use super::required_str;
use crate::rpc::RpcError;
use crate::tokens::GitHubProfile;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Issue a single-use signing token for an authenticated GitHub user.
pub async fn issue_signing_token(state: &Arc<DaemonState>, params: &Value) -> Result {
    let github_username = required_str(params, "github_username")?;
    if github_username.trim().is_empty() {
        return Err(RpcError::invalid_params("github_username must not be empty"));
    }
    let github_email = params
        .get("github_email")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let mut tokens = state.tokens.lock().await;
    let token = tokens.issue(GitHubProfile {
        github_username: github_username.to_string(),
        github_email,
    });
    info!(github_username, "Signing token issued");

    Ok(serde_json::json!({
        "token": token,
        "expires_in_secs": tokens.ttl().as_secs(),
    }))
}

/// Redeem a signing token. Fails if it is unknown, used or expired.
pub async fn redeem_signing_token(state: &Arc<DaemonState>, params: &Value) -> Result {
    let token = required_str(params, "token")?;

    let profile = state.tokens.lock().await.redeem(token);
    match profile {
        Some(profile) => {
            debug!(github_username = %profile.github_username, "Signing token redeemed");
            serde_json::to_value(profile).map_err(|e| RpcError::internal_error(&e.to_string()))
        }
        None => Err(RpcError::token_invalid()),
    }
}
