//! # gitpaid-types
//!
//! Shared domain types for the GitPaid bounty overlay.
//!
//! The overlay tracks on-chain outputs that carry a GitHub issue bounty. Every
//! tracked output is projected into one [`BountyRecord`], keyed by its
//! [`OutputRef`] (`txid`, `output_index`). All wire names are camelCase so the
//! JSON matches what the web frontend already consumes.

pub mod bounty;

use serde::{Deserialize, Serialize};

pub use bounty::{BountyRecord, BountyStatus, BountySummary, OutputRef, RepoBountyStats};

/// Topic label the admission filter is registered under.
pub const TOPIC_BOUNTY: &str = "tm_bounty";

/// Service label the lookup service answers to.
pub const SERVICE_BOUNTY: &str = "ls_bounty";

/// Minimum number of PushDrop fields a bounty-creation output must carry.
pub const MIN_BOUNTY_FIELDS: usize = 7;

/// Descriptive metadata a topic manager or lookup service reports to the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetadata {
    pub name: String,
    pub short_description: String,
    pub version: String,
    #[serde(rename = "informationURL", skip_serializing_if = "Option::is_none")]
    pub information_url: Option<String>,
}

/// Current Unix time in milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
