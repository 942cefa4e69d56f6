//! # gitpaid-topic
//!
//! Admission side of the bounty overlay: which outputs become tracked bounty
//! state, which new output continues a spent bounty, and what a spend means.

pub mod admission;
pub mod continuation;
pub mod docs;
pub mod fields;
pub mod intent;

pub use admission::{
    decode_bounty_output, AdmissionCounters, Admittance, BountyTopicManager, RejectedOutput,
    Rejection,
};
pub use continuation::{resolve_continuations, Continuation};
pub use fields::{BountyFields, ClaimMarker, FieldError};
pub use intent::{derive_spend_intent, Solver, SpendIntent};

/// Topic manager errors.
#[derive(Debug, thiserror::Error)]
pub enum TopicError {
    #[error("transaction decode failed: {0}")]
    Decode(#[from] gitpaid_script::ScriptError),
}
