//! Lookup question parsing and the answer envelope.
//!
//! A query is either a bare token (`"findAllBounties"`,
//! `"findReposWithBounties"`) or a tagged object
//! `{"type": "<shape>", "value": {…}}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::LookupError;

/// A lookup request as delivered by the overlay host.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LookupQuestion {
    pub service: String,
    #[serde(default)]
    pub query: Value,
}

impl LookupQuestion {
    pub fn new(service: impl Into<String>, query: Value) -> Self {
        Self {
            service: service.into(),
            query,
        }
    }
}

/// Every query shape the bounty service answers.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum BountyQuery {
    #[serde(skip)]
    FindAllBounties,
    #[serde(skip)]
    FindReposWithBounties,
    #[serde(rename_all = "camelCase")]
    FindByRepo { repo_owner: String, repo_name: String },
    #[serde(rename_all = "camelCase")]
    FindByIssue {
        repo_owner: String,
        repo_name: String,
        issue_number: u64,
    },
    #[serde(rename_all = "camelCase")]
    FindByFunder { public_key: String },
    #[serde(rename_all = "camelCase")]
    FindBountyDetails { txid: String, output_index: u32 },
}

impl BountyQuery {
    /// Parse a query payload. Anything unrecognized, including a known type
    /// with mistyped fields, is [`LookupError::UnsupportedQuery`].
    pub fn parse(query: &Value) -> Result<Self, LookupError> {
        let unsupported = || LookupError::UnsupportedQuery {
            query: query.to_string(),
        };
        match query {
            Value::String(token) => match token.as_str() {
                "findAllBounties" => Ok(Self::FindAllBounties),
                "findReposWithBounties" => Ok(Self::FindReposWithBounties),
                _ => Err(unsupported()),
            },
            Value::Object(_) => Self::deserialize(query).map_err(|_| unsupported()),
            _ => Err(unsupported()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FindAllBounties => "findAllBounties",
            Self::FindReposWithBounties => "findReposWithBounties",
            Self::FindByRepo { .. } => "findByRepo",
            Self::FindByIssue { .. } => "findByIssue",
            Self::FindByFunder { .. } => "findByFunder",
            Self::FindBountyDetails { .. } => "findBountyDetails",
        }
    }
}

/// Response envelope: `{"type": "freeform", "result": …}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LookupAnswer {
    Freeform { result: Value },
}

impl LookupAnswer {
    pub fn result(&self) -> &Value {
        match self {
            Self::Freeform { result } => result,
        }
    }
}
