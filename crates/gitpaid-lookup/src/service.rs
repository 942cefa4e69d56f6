//! The bounty lookup service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use gitpaid_db::queries::bounties::{self, NewBounty};
use gitpaid_script::{Script, Transaction};
use gitpaid_topic::{decode_bounty_output, derive_spend_intent, SpendIntent};
use gitpaid_types::{now_millis, BountyRecord, OutputRef, ServiceMetadata, SERVICE_BOUNTY, TOPIC_BOUNTY};
use rusqlite::Connection;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::query::{BountyQuery, LookupAnswer, LookupQuestion};
use crate::{docs, LookupError, Result};

#[derive(Debug, Default)]
struct LookupStats {
    admitted: AtomicU64,
    duplicates: AtomicU64,
    spent: AtomicU64,
    superseded: AtomicU64,
    deleted: AtomicU64,
    queries: AtomicU64,
    decode_failures: AtomicU64,
}

/// Point-in-time copy of the service counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupCounters {
    pub admitted: u64,
    pub duplicates: u64,
    pub spent: u64,
    pub superseded: u64,
    pub deleted: u64,
    pub queries: u64,
    pub decode_failures: u64,
}

/// Maintains the bounty projection and answers queries against it.
pub struct BountyLookupService {
    db: Arc<Mutex<Connection>>,
    topic: String,
    service: String,
    stats: LookupStats,
}

impl BountyLookupService {
    /// Service over `db` registered under the default topic and service labels.
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self::with_labels(db, TOPIC_BOUNTY, SERVICE_BOUNTY)
    }

    pub fn with_labels(
        db: Arc<Mutex<Connection>>,
        topic: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            db,
            topic: topic.into(),
            service: service.into(),
            stats: LookupStats::default(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// A new output was admitted under `topic`. Returns `true` when a new
    /// record was created.
    ///
    /// Events for other topics and scripts that do not decode as bounties are
    /// dropped without error.
    pub async fn output_admitted(
        &self,
        txid: &str,
        output_index: u32,
        locking_script: &Script,
        topic: &str,
    ) -> Result<bool> {
        if topic != self.topic {
            return Ok(false);
        }

        let fields = match decode_bounty_output(locking_script) {
            Ok(fields) => fields,
            Err(e) => {
                self.stats.decode_failures.fetch_add(1, Ordering::Relaxed);
                warn!(txid, output_index, error = %e, "Admitted output is not a bounty, dropping");
                return Ok(false);
            }
        };

        let outpoint = OutputRef::new(txid, output_index);
        let bounty = NewBounty {
            repo_owner: fields.repo_owner,
            repo_name: fields.repo_name,
            issue_number: fields.issue_number,
            issue_title: fields.issue_title,
            description: fields.description,
            amount: fields.amount,
            funder_public_key: fields.funder_public_key,
        };

        let db = self.db.lock().await;
        let created = bounties::upsert(&db, &outpoint, &bounty, now_millis())?;
        if created {
            self.stats.admitted.fetch_add(1, Ordering::Relaxed);
            info!(
                outpoint = %outpoint,
                repo = %format!("{}/{}", bounty.repo_owner, bounty.repo_name),
                issue = bounty.issue_number,
                amount = bounty.amount,
                "Bounty recorded"
            );
        } else {
            self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
            debug!(outpoint = %outpoint, "Bounty already tracked, refreshed");
        }
        Ok(created)
    }

    /// A tracked output was spent. Derives the spend intent from
    /// `spending_tx` (an unattributed claim when it is not available) and
    /// applies it. Returns the applied intent, or `None` if the output is not
    /// tracked.
    ///
    /// A fund addition or same-amount move removes the spent record. The
    /// continuation output is admitted as its own record, so exactly one row
    /// stays live for the bounty and amounts are never merged.
    pub async fn output_spent(
        &self,
        txid: &str,
        output_index: u32,
        topic: &str,
        spending_tx: Option<&Transaction>,
    ) -> Result<Option<SpendIntent>> {
        if topic != self.topic {
            return Ok(None);
        }

        let outpoint = OutputRef::new(txid, output_index);
        let db = self.db.lock().await;
        let Some(record) = bounties::get(&db, &outpoint)? else {
            debug!(outpoint = %outpoint, "Spent output not tracked");
            return Ok(None);
        };

        let intent = spending_tx
            .map(|tx| derive_spend_intent(&record, tx))
            .unwrap_or_else(SpendIntent::unattributed_claim);
        let now = now_millis();

        match &intent {
            SpendIntent::Claim { solver, claim_txid } => {
                let solver = solver
                    .as_ref()
                    .map(|s| (s.name.as_str(), s.public_key.as_str()));
                bounties::mark_claimed(&db, &outpoint, solver, claim_txid.as_deref(), now)?;
            }
            SpendIntent::Withdraw { .. } => {
                bounties::set_status(&db, &outpoint, gitpaid_types::BountyStatus::Cancelled, now)?;
            }
            SpendIntent::FundAdd { .. } | SpendIntent::Reanchor { .. } => {
                bounties::delete(&db, &outpoint)?;
                self.stats.superseded.fetch_add(1, Ordering::Relaxed);
                info!(
                    outpoint = %outpoint,
                    continuation_index = ?intent.superseded_by(),
                    amount = record.amount,
                    intent = intent.kind(),
                    "Bounty superseded by continuation output"
                );
            }
        }

        self.stats.spent.fetch_add(1, Ordering::Relaxed);
        info!(outpoint = %outpoint, intent = intent.kind(), "Bounty output spent");
        Ok(Some(intent))
    }

    /// A tracked output was removed (e.g. by a reorg). Returns the number of
    /// records deleted.
    pub async fn output_deleted(&self, txid: &str, output_index: u32, topic: &str) -> Result<usize> {
        if topic != self.topic {
            return Ok(0);
        }

        let outpoint = OutputRef::new(txid, output_index);
        let db = self.db.lock().await;
        let deleted = bounties::delete(&db, &outpoint)?;
        if deleted > 1 {
            warn!(outpoint = %outpoint, deleted, "More than one record for a single output");
        }
        self.stats.deleted.fetch_add(deleted as u64, Ordering::Relaxed);
        debug!(outpoint = %outpoint, deleted, "Bounty output deleted");
        Ok(deleted)
    }

    /// Answer a lookup question.
    ///
    /// Checks run in order: query present (not null, not an empty string),
    /// service label, query shape. No store access happens before all three
    /// pass.
    pub async fn lookup(&self, question: &LookupQuestion) -> Result<LookupAnswer> {
        self.stats.queries.fetch_add(1, Ordering::Relaxed);

        if is_missing(&question.query) {
            return Err(LookupError::MissingQuery);
        }
        if question.service != self.service {
            return Err(LookupError::UnsupportedService {
                service: question.service.clone(),
            });
        }
        let query = BountyQuery::parse(&question.query)?;
        debug!(query = query.name(), "Lookup");

        let db = self.db.lock().await;
        let result = match query {
            BountyQuery::FindAllBounties => serde_json::to_value(bounties::find_all(&db)?)?,
            BountyQuery::FindReposWithBounties => {
                serde_json::to_value(bounties::repos_with_bounties(&db)?)?
            }
            BountyQuery::FindByRepo {
                repo_owner,
                repo_name,
            } => serde_json::to_value(bounties::find_by_repo(&db, &repo_owner, &repo_name)?)?,
            BountyQuery::FindByIssue {
                repo_owner,
                repo_name,
                issue_number,
            } => serde_json::to_value(bounties::find_by_issue(
                &db,
                &repo_owner,
                &repo_name,
                issue_number,
            )?)?,
            BountyQuery::FindByFunder { public_key } => {
                serde_json::to_value(bounties::find_by_funder(&db, &public_key)?)?
            }
            BountyQuery::FindBountyDetails { txid, output_index } => serde_json::to_value(
                bounties::find_details(&db, &OutputRef::new(txid, output_index))?,
            )?,
        };

        Ok(LookupAnswer::Freeform { result })
    }

    /// Stored records for the given outputs, skipping untracked ones.
    pub async fn records(&self, outpoints: &[OutputRef]) -> Result<Vec<BountyRecord>> {
        let db = self.db.lock().await;
        let mut found = Vec::with_capacity(outpoints.len());
        for outpoint in outpoints {
            if let Some(record) = bounties::get(&db, outpoint)? {
                found.push(record);
            }
        }
        Ok(found)
    }

    pub fn stats(&self) -> LookupCounters {
        LookupCounters {
            admitted: self.stats.admitted.load(Ordering::Relaxed),
            duplicates: self.stats.duplicates.load(Ordering::Relaxed),
            spent: self.stats.spent.load(Ordering::Relaxed),
            superseded: self.stats.superseded.load(Ordering::Relaxed),
            deleted: self.stats.deleted.load(Ordering::Relaxed),
            queries: self.stats.queries.load(Ordering::Relaxed),
            decode_failures: self.stats.decode_failures.load(Ordering::Relaxed),
        }
    }

    pub fn documentation(&self) -> &'static str {
        docs::LOOKUP_DOCUMENTATION
    }

    pub fn metadata(&self) -> ServiceMetadata {
        ServiceMetadata {
            name: "GitHub Bounty Lookup Service".to_string(),
            short_description: "Find and manage GitHub issue bounties".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            information_url: None,
        }
    }
}

fn is_missing(query: &serde_json::Value) -> bool {
    match query {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.is_empty(),
        _ => false,
    }
}
