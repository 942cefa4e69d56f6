//! Admission filter: decides which outputs of a transaction become tracked
//! bounty state.

use std::sync::atomic::{AtomicU64, Ordering};

use gitpaid_script::{decode_transaction, pushdrop, Script, ScriptError, Transaction};
use gitpaid_types::ServiceMetadata;
use serde::Serialize;
use tracing::{debug, warn};

use crate::docs;
use crate::fields::{BountyFields, FieldError};
use crate::TopicError;

/// Why one output was not admitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("script: {0}")]
    Script(#[from] ScriptError),

    #[error("fields: {0}")]
    Field(#[from] FieldError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedOutput {
    pub output_index: u32,
    pub reason: Rejection,
}

/// Admittance instructions handed back to the overlay host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Admittance {
    /// Output indices of this transaction to start tracking, ascending.
    pub outputs_to_admit: Vec<u32>,
    /// Previously tracked coins to keep tracking.
    pub coins_to_retain: Vec<u32>,
    /// Outputs that failed validation, with reasons. Diagnostic only.
    #[serde(skip)]
    pub rejected: Vec<RejectedOutput>,
}

/// Running admission counters.
#[derive(Debug, Default)]
pub struct AdmissionStats {
    admitted: AtomicU64,
    rejected: AtomicU64,
    updates: AtomicU64,
    decode_failures: AtomicU64,
}

/// Point-in-time copy of [`AdmissionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionCounters {
    pub admitted: u64,
    pub rejected: u64,
    pub updates: u64,
    pub decode_failures: u64,
}

impl AdmissionStats {
    pub fn snapshot(&self) -> AdmissionCounters {
        AdmissionCounters {
            admitted: self.admitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
        }
    }
}

/// Decode a locking script as a bounty-creation output.
pub fn decode_bounty_output(script: &Script) -> Result<BountyFields, Rejection> {
    let decoded = pushdrop::decode(script)?;
    Ok(BountyFields::parse(&decoded.fields)?)
}

/// Topic manager for `tm_bounty`.
#[derive(Debug, Default)]
pub struct BountyTopicManager {
    stats: AdmissionStats,
}

impl BountyTopicManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `beef` (a BEEF envelope or a raw transaction) and classify it.
    ///
    /// An undecodable transaction is the only hard failure.
    pub fn identify_admissible_outputs(
        &self,
        beef: &[u8],
        previous_coins: &[u32],
    ) -> Result<Admittance, TopicError> {
        let tx = self.decode_transaction(beef)?;
        Ok(self.classify(&tx, previous_coins))
    }

    /// Decode a BEEF envelope or raw transaction, counting failures.
    pub fn decode_transaction(&self, beef: &[u8]) -> Result<Transaction, TopicError> {
        decode_transaction(beef).map_err(|e| {
            self.stats.decode_failures.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "Transaction decode failed");
            TopicError::Decode(e)
        })
    }

    /// Pure classification of an already-decoded transaction.
    ///
    /// When any previously tracked coin is spent the transaction is an update
    /// and the tracked set passes through unchanged. Otherwise every output is
    /// validated on its own; a bad output never affects its siblings.
    pub fn classify(&self, tx: &Transaction, previous_coins: &[u32]) -> Admittance {
        if !previous_coins.is_empty() {
            self.stats.updates.fetch_add(1, Ordering::Relaxed);
            debug!(coins = ?previous_coins, "Update transaction, retaining tracked coins");
            return Admittance {
                outputs_to_admit: previous_coins.to_vec(),
                coins_to_retain: previous_coins.to_vec(),
                rejected: Vec::new(),
            };
        }

        let mut admittance = Admittance::default();
        for (output, index) in tx.output.iter().zip(0u32..) {
            match decode_bounty_output(&output.script_pubkey) {
                Ok(fields) => {
                    debug!(
                        output_index = index,
                        repo = %format!("{}/{}", fields.repo_owner, fields.repo_name),
                        issue = fields.issue_number,
                        amount = fields.amount,
                        "Admitting bounty output"
                    );
                    admittance.outputs_to_admit.push(index);
                }
                Err(reason) => {
                    debug!(output_index = index, reason = %reason, "Output not admissible");
                    admittance.rejected.push(RejectedOutput {
                        output_index: index,
                        reason,
                    });
                }
            }
        }

        self.stats
            .admitted
            .fetch_add(admittance.outputs_to_admit.len() as u64, Ordering::Relaxed);
        self.stats
            .rejected
            .fetch_add(admittance.rejected.len() as u64, Ordering::Relaxed);
        admittance
    }

    pub fn stats(&self) -> AdmissionCounters {
        self.stats.snapshot()
    }

    pub fn documentation(&self) -> &'static str {
        docs::TOPIC_DOCUMENTATION
    }

    pub fn metadata(&self) -> ServiceMetadata {
        ServiceMetadata {
            name: "GitHub Bounty Topic Manager".to_string(),
            short_description: "Processes transactions for GitHub issue bounties".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            information_url: None,
        }
    }
}
