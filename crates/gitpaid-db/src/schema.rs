//! SQL schema definitions.

/// Schema for the v1 bounty database.
///
/// The primary key doubles as the uniqueness constraint: one chain output maps
/// to at most one record.
pub const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS bounties (
    txid TEXT NOT NULL,
    output_index INTEGER NOT NULL CHECK (output_index >= 0),
    repo_owner TEXT NOT NULL,
    repo_name TEXT NOT NULL,
    issue_number INTEGER NOT NULL CHECK (issue_number > 0),
    issue_title TEXT NOT NULL,
    description TEXT NOT NULL,
    amount INTEGER NOT NULL CHECK (amount > 0),
    funder_public_key TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'open'
        CHECK (status IN ('open', 'in-progress', 'claimed', 'cancelled')),
    solver TEXT,
    solver_public_key TEXT,
    claim_txid TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (txid, output_index),
    CHECK ((solver IS NULL) = (solver_public_key IS NULL))
);

CREATE INDEX IF NOT EXISTS idx_bounties_issue
    ON bounties(repo_owner, repo_name, issue_number);

CREATE INDEX IF NOT EXISTS idx_bounties_funder
    ON bounties(funder_public_key);
"#;
