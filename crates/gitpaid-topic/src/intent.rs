//! What a transaction spending a tracked bounty output means for the bounty.

use std::cmp::Ordering;

use gitpaid_script::{pushdrop, txid_hex, Transaction};
use gitpaid_types::{BountyRecord, BountyStatus};
use serde::{Deserialize, Serialize};

use crate::continuation::resolve_continuations;
use crate::fields::ClaimMarker;

/// Solver attribution carried by a claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solver {
    pub name: String,
    pub public_key: String,
}

/// Spend intent, derived from the spending transaction's outputs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SpendIntent {
    /// The bounty was paid out.
    Claim {
        solver: Option<Solver>,
        claim_txid: Option<String>,
    },
    /// The funder took the bounty back, possibly leaving a smaller remainder.
    Withdraw { remainder_index: Option<u32> },
    /// More funds were added; the continuation carries the new amount and
    /// supersedes the spent output.
    FundAdd {
        continuation_index: u32,
        new_amount: u64,
    },
    /// The bounty moved to a continuation with the same amount, which
    /// supersedes the spent output.
    Reanchor { continuation_index: u32 },
}

impl SpendIntent {
    /// A claim with no attribution, used when the spending transaction is
    /// not available.
    pub fn unattributed_claim() -> Self {
        Self::Claim {
            solver: None,
            claim_txid: None,
        }
    }

    /// Status the spent record moves to, if any.
    pub fn resulting_status(&self) -> Option<BountyStatus> {
        match self {
            Self::Claim { .. } => Some(BountyStatus::Claimed),
            Self::Withdraw { .. } => Some(BountyStatus::Cancelled),
            Self::FundAdd { .. } | Self::Reanchor { .. } => None,
        }
    }

    /// Output of the spending transaction that now carries the bounty in
    /// place of the spent one. The spent record stops being live.
    pub fn superseded_by(&self) -> Option<u32> {
        match self {
            Self::FundAdd {
                continuation_index, ..
            }
            | Self::Reanchor { continuation_index } => Some(*continuation_index),
            Self::Claim { .. } | Self::Withdraw { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Claim { .. } => "claim",
            Self::Withdraw { .. } => "withdraw",
            Self::FundAdd { .. } => "fundAdd",
            Self::Reanchor { .. } => "reanchor",
        }
    }
}

/// Classify how `spending_tx` treats the bounty in `spent`.
///
/// A claim marker for the same issue wins. Otherwise the continuation amount
/// decides: larger is a fund addition, equal is a re-anchor, smaller or
/// missing is a withdrawal.
pub fn derive_spend_intent(spent: &BountyRecord, spending_tx: &Transaction) -> SpendIntent {
    let marker = spending_tx
        .output
        .iter()
        .filter_map(|output| pushdrop::decode(&output.script_pubkey).ok())
        .filter_map(|decoded| ClaimMarker::parse(&decoded.fields))
        .find(|m| {
            m.repo_owner == spent.repo_owner
                && m.repo_name == spent.repo_name
                && m.issue_number == spent.issue_number
        });
    if let Some(marker) = marker {
        return SpendIntent::Claim {
            solver: Some(Solver {
                name: marker.solver,
                public_key: marker.solver_public_key,
            }),
            claim_txid: Some(txid_hex(spending_tx)),
        };
    }

    let continuation = resolve_continuations(spending_tx, std::slice::from_ref(spent))
        .into_iter()
        .next();
    match continuation {
        Some(c) => match c.amount.cmp(&spent.amount) {
            Ordering::Greater => SpendIntent::FundAdd {
                continuation_index: c.output_index,
                new_amount: c.amount,
            },
            Ordering::Equal => SpendIntent::Reanchor {
                continuation_index: c.output_index,
            },
            Ordering::Less => SpendIntent::Withdraw {
                remainder_index: Some(c.output_index),
            },
        },
        None => SpendIntent::Withdraw {
            remainder_index: None,
        },
    }
}
