//! Positional PushDrop field layouts carried by bounty outputs.
//!
//! ```text
//! bounty:  [0] repoOwner  [1] repoName  [2] issueNumber  [3] amount
//!          [4] funderPublicKey  [5] issueTitle  [6] description
//! claim:   [0] repoOwner  [1] repoName  [2] issueNumber  [3] "claim"
//!          [4] solver  [5] solverPublicKey
//! ```
//!
//! Numbers are decimal text. Title and description may be empty, in which
//! case generated defaults are used.

use gitpaid_types::MIN_BOUNTY_FIELDS;

/// Tag in position 3 that marks a claim output.
pub const CLAIM_TAG: &str = "claim";

/// Why a field list is not a valid bounty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("expected at least 7 fields, found {0}")]
    TooFewFields(usize),

    #[error("repository owner is empty")]
    EmptyRepoOwner,

    #[error("repository name is empty")]
    EmptyRepoName,

    #[error("issue number is not a positive integer: {0:?}")]
    InvalidIssueNumber(String),

    #[error("amount is not a positive integer: {0:?}")]
    InvalidAmount(String),

    #[error("funder public key is empty")]
    EmptyFunderKey,
}

/// A validated bounty-creation field list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BountyFields {
    pub repo_owner: String,
    pub repo_name: String,
    pub issue_number: u64,
    pub amount: u64,
    pub funder_public_key: String,
    pub issue_title: String,
    pub description: String,
}

impl BountyFields {
    pub fn parse(fields: &[Vec<u8>]) -> Result<Self, FieldError> {
        if fields.len() < MIN_BOUNTY_FIELDS {
            return Err(FieldError::TooFewFields(fields.len()));
        }

        if fields[0].is_empty() {
            return Err(FieldError::EmptyRepoOwner);
        }
        if fields[1].is_empty() {
            return Err(FieldError::EmptyRepoName);
        }
        let issue_number =
            positive(&fields[2]).ok_or_else(|| FieldError::InvalidIssueNumber(lossy(&fields[2])))?;
        let amount = positive(&fields[3]).ok_or_else(|| FieldError::InvalidAmount(lossy(&fields[3])))?;
        if fields[4].is_empty() {
            return Err(FieldError::EmptyFunderKey);
        }
        let repo_owner = lossy(&fields[0]);
        let repo_name = lossy(&fields[1]);
        let funder_public_key = lossy(&fields[4]);

        let issue_title = match lossy(&fields[5]) {
            t if t.is_empty() => format!("Issue #{issue_number}"),
            t => t,
        };
        let description = match lossy(&fields[6]) {
            d if d.is_empty() => format!("Bounty for {repo_owner}/{repo_name}#{issue_number}"),
            d => d,
        };

        Ok(Self {
            repo_owner,
            repo_name,
            issue_number,
            amount,
            funder_public_key,
            issue_title,
            description,
        })
    }

    /// Whether this bounty funds the given issue.
    pub fn is_for_issue(&self, repo_owner: &str, repo_name: &str, issue_number: u64) -> bool {
        self.repo_owner == repo_owner && self.repo_name == repo_name && self.issue_number == issue_number
    }

    /// Encode back into the positional layout, e.g. for building outputs.
    pub fn to_fields(&self) -> Vec<Vec<u8>> {
        [
            self.repo_owner.as_str(),
            self.repo_name.as_str(),
            self.issue_number.to_string().as_str(),
            self.amount.to_string().as_str(),
            self.funder_public_key.as_str(),
            self.issue_title.as_str(),
            self.description.as_str(),
        ]
        .iter()
        .map(|f| f.as_bytes().to_vec())
        .collect()
    }
}

/// A solver attribution found in a spending transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimMarker {
    pub repo_owner: String,
    pub repo_name: String,
    pub issue_number: u64,
    pub solver: String,
    pub solver_public_key: String,
}

impl ClaimMarker {
    /// `None` unless the list is exactly a well-formed claim marker.
    pub fn parse(fields: &[Vec<u8>]) -> Option<Self> {
        let [owner, repo, issue, tag, solver, key] = fields else {
            return None;
        };
        if tag.as_slice() != CLAIM_TAG.as_bytes() {
            return None;
        }
        let marker = Self {
            repo_owner: String::from_utf8(owner.clone()).ok()?,
            repo_name: String::from_utf8(repo.clone()).ok()?,
            issue_number: positive(issue)?,
            solver: String::from_utf8(solver.clone()).ok()?,
            solver_public_key: String::from_utf8(key.clone()).ok()?,
        };
        let complete = !marker.repo_owner.is_empty()
            && !marker.repo_name.is_empty()
            && !marker.solver.is_empty()
            && !marker.solver_public_key.is_empty();
        complete.then_some(marker)
    }

    pub fn to_fields(&self) -> Vec<Vec<u8>> {
        [
            self.repo_owner.as_str(),
            self.repo_name.as_str(),
            self.issue_number.to_string().as_str(),
            CLAIM_TAG,
            self.solver.as_str(),
            self.solver_public_key.as_str(),
        ]
        .iter()
        .map(|f| f.as_bytes().to_vec())
        .collect()
    }
}

/// Presence is judged on the raw bytes; invalid UTF-8 becomes U+FFFD.
fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Strict decimal parse, positive and within the signed 64-bit range the
/// record store can hold.
fn positive(bytes: &[u8]) -> Option<u64> {
    let n: u64 = std::str::from_utf8(bytes).ok()?.trim().parse().ok()?;
    (n > 0 && i64::try_from(n).is_ok()).then_some(n)
}
