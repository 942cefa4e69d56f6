//! # gitpaid-lookup
//!
//! Projection side of the bounty overlay. Reacts to output admitted, spent and
//! deleted events by maintaining bounty records in the store, and answers
//! read-only lookup queries against them.

pub mod docs;
pub mod query;
pub mod service;

pub use query::{BountyQuery, LookupAnswer, LookupQuestion};
pub use service::{BountyLookupService, LookupCounters};

/// Lookup service errors.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("a valid query must be provided")]
    MissingQuery,

    #[error("lookup service not supported: {service}")]
    UnsupportedService { service: String },

    #[error("unsupported query: {query}")]
    UnsupportedQuery { query: String },

    #[error("record store unavailable: {0}")]
    StoreUnavailable(#[from] gitpaid_db::DbError),

    #[error("result serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LookupError>;
