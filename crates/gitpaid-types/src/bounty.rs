//! Bounty projection types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identity of a tracked on-chain output.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRef {
    /// Transaction id in display (big-endian hex) order.
    pub txid: String,
    pub output_index: u32,
}

impl OutputRef {
    pub fn new(txid: impl Into<String>, output_index: u32) -> Self {
        Self {
            txid: txid.into(),
            output_index,
        }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.txid, self.output_index)
    }
}

/// Lifecycle state of a bounty.
///
/// `InProgress` is a declared value that no event handler currently drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum BountyStatus {
    Open,
    InProgress,
    Claimed,
    Cancelled,
}

impl BountyStatus {
    /// Storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in-progress",
            Self::Claimed => "claimed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BountyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string is not one of the four known values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown bounty status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for BountyStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "in-progress" => Ok(Self::InProgress),
            "claimed" => Ok(Self::Claimed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Full bounty record, one per tracked output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BountyRecord {
    /// GitHub repository owner or organization.
    pub repo_owner: String,
    pub repo_name: String,
    pub issue_number: u64,
    pub issue_title: String,
    pub description: String,
    /// Amount in satoshis.
    pub amount: u64,
    /// Public key of whoever funded the bounty.
    pub funder_public_key: String,
    pub txid: String,
    pub output_index: u32,
    pub status: BountyStatus,
    /// GitHub username of the solver. Set together with `solver_public_key`.
    pub solver: Option<String>,
    pub solver_public_key: Option<String>,
    /// Unix milliseconds.
    pub created_at: u64,
    /// Unix milliseconds, strictly increasing on every mutation.
    pub updated_at: u64,
    /// Transaction that claimed the bounty, if any.
    pub claim_txid: Option<String>,
}

impl BountyRecord {
    pub fn output_ref(&self) -> OutputRef {
        OutputRef::new(self.txid.clone(), self.output_index)
    }
}

/// Compact listing shape: no description, funder or solver detail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BountySummary {
    pub repo_owner: String,
    pub repo_name: String,
    pub issue_number: u64,
    pub issue_title: String,
    pub amount: u64,
    pub status: BountyStatus,
    pub txid: String,
    pub output_index: u32,
}

impl From<&BountyRecord> for BountySummary {
    fn from(record: &BountyRecord) -> Self {
        Self {
            repo_owner: record.repo_owner.clone(),
            repo_name: record.repo_name.clone(),
            issue_number: record.issue_number,
            issue_title: record.issue_title.clone(),
            amount: record.amount,
            status: record.status,
            txid: record.txid.clone(),
            output_index: record.output_index,
        }
    }
}

/// Per-repository aggregate over all tracked bounties.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RepoBountyStats {
    pub repo_owner: String,
    pub repo_name: String,
    pub total_bounties: u64,
    pub total_amount: u64,
    pub open_bounties: u64,
}
