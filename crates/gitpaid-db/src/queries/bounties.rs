//! Bounty record query functions.
//!
//! Every mutation sets `updated_at = MAX(now, updated_at + 1)` so the timestamp
//! strictly increases even when two events land in the same millisecond.

use gitpaid_types::{BountyRecord, BountyStatus, BountySummary, OutputRef, RepoBountyStats};
use rusqlite::{types::Type, Connection, OptionalExtension, Row};

use crate::{DbError, Result};

/// Descriptive and economic fields of a newly admitted bounty output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBounty {
    pub repo_owner: String,
    pub repo_name: String,
    pub issue_number: u64,
    pub issue_title: String,
    pub description: String,
    pub amount: u64,
    pub funder_public_key: String,
}

const RECORD_COLUMNS: &str = "repo_owner, repo_name, issue_number, issue_title, description,
     amount, funder_public_key, txid, output_index, status, solver, solver_public_key,
     created_at, updated_at, claim_txid";

const SUMMARY_COLUMNS: &str =
    "repo_owner, repo_name, issue_number, issue_title, amount, status, txid, output_index";

const LISTING_ORDER: &str = "ORDER BY created_at, txid, output_index";

fn to_i64(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| DbError::Constraint(format!("{what} {value} out of range")))
}

fn status_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<BountyStatus> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<BountyRecord> {
    Ok(BountyRecord {
        repo_owner: row.get(0)?,
        repo_name: row.get(1)?,
        issue_number: row.get::<_, i64>(2)? as u64,
        issue_title: row.get(3)?,
        description: row.get(4)?,
        amount: row.get::<_, i64>(5)? as u64,
        funder_public_key: row.get(6)?,
        txid: row.get(7)?,
        output_index: row.get::<_, i64>(8)? as u32,
        status: status_at(row, 9)?,
        solver: row.get(10)?,
        solver_public_key: row.get(11)?,
        created_at: row.get::<_, i64>(12)? as u64,
        updated_at: row.get::<_, i64>(13)? as u64,
        claim_txid: row.get(14)?,
    })
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<BountySummary> {
    Ok(BountySummary {
        repo_owner: row.get(0)?,
        repo_name: row.get(1)?,
        issue_number: row.get::<_, i64>(2)? as u64,
        issue_title: row.get(3)?,
        amount: row.get::<_, i64>(4)? as u64,
        status: status_at(row, 5)?,
        txid: row.get(6)?,
        output_index: row.get::<_, i64>(7)? as u32,
    })
}

/// Insert a bounty, or refresh its descriptive fields if the output is
/// already tracked. Lifecycle fields are never reset.
///
/// Returns `true` when a new row was created.
pub fn upsert(conn: &Connection, outpoint: &OutputRef, bounty: &NewBounty, now: u64) -> Result<bool> {
    let issue_number = to_i64(bounty.issue_number, "issue number")?;
    let amount = to_i64(bounty.amount, "amount")?;
    let now = to_i64(now, "timestamp")?;

    let inserted = conn.execute(
        "INSERT INTO bounties
         (txid, output_index, repo_owner, repo_name, issue_number, issue_title,
          description, amount, funder_public_key, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'open', ?10, ?10)
         ON CONFLICT (txid, output_index) DO NOTHING",
        rusqlite::params![
            outpoint.txid,
            outpoint.output_index,
            bounty.repo_owner,
            bounty.repo_name,
            issue_number,
            bounty.issue_title,
            bounty.description,
            amount,
            bounty.funder_public_key,
            now,
        ],
    )?;
    if inserted == 1 {
        return Ok(true);
    }

    conn.execute(
        "UPDATE bounties SET
            repo_owner = ?3, repo_name = ?4, issue_number = ?5, issue_title = ?6,
            description = ?7, amount = ?8, funder_public_key = ?9,
            updated_at = MAX(?10, updated_at + 1)
         WHERE txid = ?1 AND output_index = ?2",
        rusqlite::params![
            outpoint.txid,
            outpoint.output_index,
            bounty.repo_owner,
            bounty.repo_name,
            issue_number,
            bounty.issue_title,
            bounty.description,
            amount,
            bounty.funder_public_key,
            now,
        ],
    )?;
    Ok(false)
}

/// Fetch one record by its output identity.
pub fn get(conn: &Connection, outpoint: &OutputRef) -> Result<Option<BountyRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM bounties WHERE txid = ?1 AND output_index = ?2"
    );
    let record = conn
        .query_row(
            &sql,
            rusqlite::params![outpoint.txid, outpoint.output_index],
            record_from_row,
        )
        .optional()?;
    Ok(record)
}

/// Mark a bounty claimed. Solver name and key are written together.
///
/// Returns the number of rows affected (0 when the output is not tracked).
pub fn mark_claimed(
    conn: &Connection,
    outpoint: &OutputRef,
    solver: Option<(&str, &str)>,
    claim_txid: Option<&str>,
    now: u64,
) -> Result<usize> {
    let (name, key) = match solver {
        Some((name, key)) => (Some(name), Some(key)),
        None => (None, None),
    };
    let updated = conn.execute(
        "UPDATE bounties SET
            status = 'claimed', solver = ?3, solver_public_key = ?4,
            claim_txid = COALESCE(?5, claim_txid),
            updated_at = MAX(?6, updated_at + 1)
         WHERE txid = ?1 AND output_index = ?2",
        rusqlite::params![
            outpoint.txid,
            outpoint.output_index,
            name,
            key,
            claim_txid,
            to_i64(now, "timestamp")?,
        ],
    )?;
    Ok(updated)
}

/// Overwrite the status of a bounty.
pub fn set_status(
    conn: &Connection,
    outpoint: &OutputRef,
    status: BountyStatus,
    now: u64,
) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE bounties SET status = ?3, updated_at = MAX(?4, updated_at + 1)
         WHERE txid = ?1 AND output_index = ?2",
        rusqlite::params![
            outpoint.txid,
            outpoint.output_index,
            status.as_str(),
            to_i64(now, "timestamp")?,
        ],
    )?;
    Ok(updated)
}

/// Remove every record for an output. Returns the count removed.
pub fn delete(conn: &Connection, outpoint: &OutputRef) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM bounties WHERE txid = ?1 AND output_index = ?2",
        rusqlite::params![outpoint.txid, outpoint.output_index],
    )?;
    Ok(deleted)
}

/// All bounties, summary shape.
pub fn find_all(conn: &Connection) -> Result<Vec<BountySummary>> {
    let sql = format!("SELECT {SUMMARY_COLUMNS} FROM bounties {LISTING_ORDER}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], summary_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Bounties of one repository, summary shape.
pub fn find_by_repo(conn: &Connection, repo_owner: &str, repo_name: &str) -> Result<Vec<BountySummary>> {
    let sql = format!(
        "SELECT {SUMMARY_COLUMNS} FROM bounties
         WHERE repo_owner = ?1 AND repo_name = ?2 {LISTING_ORDER}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([repo_owner, repo_name], summary_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Bounties of one issue, full shape.
pub fn find_by_issue(
    conn: &Connection,
    repo_owner: &str,
    repo_name: &str,
    issue_number: u64,
) -> Result<Vec<BountyRecord>> {
    // Out-of-range issue numbers cannot be stored, so nothing matches.
    let Ok(issue_number) = i64::try_from(issue_number) else {
        return Ok(Vec::new());
    };
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM bounties
         WHERE repo_owner = ?1 AND repo_name = ?2 AND issue_number = ?3 {LISTING_ORDER}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            rusqlite::params![repo_owner, repo_name, issue_number],
            record_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Bounties funded by one public key, summary shape.
pub fn find_by_funder(conn: &Connection, funder_public_key: &str) -> Result<Vec<BountySummary>> {
    let sql = format!(
        "SELECT {SUMMARY_COLUMNS} FROM bounties WHERE funder_public_key = ?1 {LISTING_ORDER}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([funder_public_key], summary_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Records for one output identity, full shape. Empty when untracked.
pub fn find_details(conn: &Connection, outpoint: &OutputRef) -> Result<Vec<BountyRecord>> {
    Ok(get(conn, outpoint)?.into_iter().collect())
}

/// Repositories grouped with bounty count, amount sum and open count.
pub fn repos_with_bounties(conn: &Connection) -> Result<Vec<RepoBountyStats>> {
    let mut stmt = conn.prepare(
        "SELECT repo_owner, repo_name, COUNT(*), COALESCE(SUM(amount), 0),
                SUM(CASE WHEN status = 'open' THEN 1 ELSE 0 END)
         FROM bounties
         GROUP BY repo_owner, repo_name
         ORDER BY repo_owner, repo_name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RepoBountyStats {
                repo_owner: row.get(0)?,
                repo_name: row.get(1)?,
                total_bounties: row.get::<_, i64>(2)? as u64,
                total_amount: row.get::<_, i64>(3)? as u64,
                open_bounties: row.get::<_, i64>(4)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Number of tracked records.
pub fn count(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM bounties", [], |row| row.get(0))?;
    Ok(n as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_700_000_000_000;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn bounty(owner: &str, repo: &str, issue: u64, amount: u64) -> NewBounty {
        NewBounty {
            repo_owner: owner.to_string(),
            repo_name: repo.to_string(),
            issue_number: issue,
            issue_title: format!("Issue #{issue}"),
            description: format!("Bounty for {owner}/{repo}#{issue}"),
            amount,
            funder_public_key: "02funder".to_string(),
        }
    }

    fn outpoint(n: u8, index: u32) -> OutputRef {
        OutputRef::new(format!("{n:02x}").repeat(32), index)
    }

    #[test]
    fn test_insert_and_get() {
        let conn = test_db();
        let op = outpoint(1, 0);
        let created = upsert(&conn, &op, &bounty("alice", "repo1", 7, 100), T0).expect("upsert");
        assert!(created);

        let record = get(&conn, &op).expect("get").expect("present");
        assert_eq!(record.repo_owner, "alice");
        assert_eq!(record.issue_number, 7);
        assert_eq!(record.amount, 100);
        assert_eq!(record.status, BountyStatus::Open);
        assert_eq!(record.solver, None);
        assert_eq!(record.solver_public_key, None);
        assert_eq!(record.created_at, T0);
        assert_eq!(record.updated_at, T0);
    }

    #[test]
    fn test_upsert_keeps_single_row_and_lifecycle() {
        let conn = test_db();
        let op = outpoint(1, 0);
        upsert(&conn, &op, &bounty("alice", "repo1", 7, 100), T0).expect("first");
        mark_claimed(&conn, &op, Some(("bob", "03bob")), None, T0).expect("claim");

        let mut again = bounty("alice", "repo1", 7, 100);
        again.issue_title = "Renamed".to_string();
        let created = upsert(&conn, &op, &again, T0).expect("second");
        assert!(!created);
        assert_eq!(count(&conn).expect("count"), 1);

        let record = get(&conn, &op).expect("get").expect("present");
        assert_eq!(record.issue_title, "Renamed");
        assert_eq!(record.status, BountyStatus::Claimed);
        assert_eq!(record.solver.as_deref(), Some("bob"));
        assert_eq!(record.created_at, T0);
        assert!(record.updated_at > T0);
    }

    #[test]
    fn test_mark_claimed_bumps_updated_at_within_same_millisecond() {
        let conn = test_db();
        let op = outpoint(2, 1);
        upsert(&conn, &op, &bounty("alice", "repo1", 1, 10), T0).expect("upsert");

        let updated = mark_claimed(&conn, &op, None, Some("cc"), T0).expect("claim");
        assert_eq!(updated, 1);
        let record = get(&conn, &op).expect("get").expect("present");
        assert_eq!(record.status, BountyStatus::Claimed);
        assert_eq!(record.updated_at, T0 + 1);
        assert_eq!(record.claim_txid.as_deref(), Some("cc"));
        assert_eq!(record.solver, None);
    }

    #[test]
    fn test_mutations_on_missing_row_are_noops() {
        let conn = test_db();
        let op = outpoint(9, 0);
        assert_eq!(mark_claimed(&conn, &op, None, None, T0).expect("claim"), 0);
        assert_eq!(set_status(&conn, &op, BountyStatus::Cancelled, T0).expect("status"), 0);
        assert_eq!(delete(&conn, &op).expect("delete"), 0);
        assert!(find_details(&conn, &op).expect("details").is_empty());
    }

    #[test]
    fn test_set_status_and_delete() {
        let conn = test_db();
        let op = outpoint(3, 0);
        upsert(&conn, &op, &bounty("alice", "repo1", 1, 10), T0).expect("upsert");
        set_status(&conn, &op, BountyStatus::Cancelled, T0 + 50).expect("status");
        let record = get(&conn, &op).expect("get").expect("present");
        assert_eq!(record.status, BountyStatus::Cancelled);
        assert_eq!(record.updated_at, T0 + 50);

        assert_eq!(delete(&conn, &op).expect("delete"), 1);
        assert_eq!(delete(&conn, &op).expect("delete again"), 0);
        assert!(find_all(&conn).expect("all").is_empty());
    }

    #[test]
    fn test_listing_filters() {
        let conn = test_db();
        upsert(&conn, &outpoint(1, 0), &bounty("alice", "repo1", 1, 100), T0).expect("a");
        upsert(&conn, &outpoint(2, 0), &bounty("alice", "repo2", 2, 50), T0 + 1).expect("b");
        let mut other = bounty("carol", "tool", 3, 70);
        other.funder_public_key = "02carol".to_string();
        upsert(&conn, &outpoint(3, 0), &other, T0 + 2).expect("c");

        let all = find_all(&conn).expect("all");
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].repo_name, "repo1");

        let repo = find_by_repo(&conn, "alice", "repo2").expect("repo");
        assert_eq!(repo.len(), 1);
        assert_eq!(repo[0].amount, 50);

        let funder = find_by_funder(&conn, "02carol").expect("funder");
        assert_eq!(funder.len(), 1);
        assert_eq!(funder[0].repo_owner, "carol");

        let issue = find_by_issue(&conn, "alice", "repo1", 1).expect("issue");
        assert_eq!(issue.len(), 1);
        assert_eq!(issue[0].description, "Bounty for alice/repo1#1");
        assert!(find_by_issue(&conn, "alice", "repo1", u64::MAX).expect("issue").is_empty());
    }

    #[test]
    fn test_repo_aggregation() {
        let conn = test_db();
        upsert(&conn, &outpoint(1, 0), &bounty("A", "Repo1", 1, 100), T0).expect("1");
        upsert(&conn, &outpoint(1, 1), &bounty("A", "Repo1", 2, 200), T0).expect("2");
        upsert(&conn, &outpoint(2, 0), &bounty("A", "Repo2", 1, 50), T0).expect("3");
        mark_claimed(&conn, &outpoint(1, 1), None, None, T0).expect("claim");

        let stats = repos_with_bounties(&conn).expect("aggregate");
        assert_eq!(
            stats,
            vec![
                RepoBountyStats {
                    repo_owner: "A".to_string(),
                    repo_name: "Repo1".to_string(),
                    total_bounties: 2,
                    total_amount: 300,
                    open_bounties: 1,
                },
                RepoBountyStats {
                    repo_owner: "A".to_string(),
                    repo_name: "Repo2".to_string(),
                    total_bounties: 1,
                    total_amount: 50,
                    open_bounties: 1,
                },
            ]
        );
    }

    #[test]
    fn test_amount_out_of_range_rejected() {
        let conn = test_db();
        let result = upsert(&conn, &outpoint(1, 0), &bounty("a", "b", 1, u64::MAX), T0);
        assert!(matches!(result, Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_solver_pair_constraint() {
        let conn = test_db();
        let op = outpoint(4, 0);
        upsert(&conn, &op, &bounty("a", "b", 1, 5), T0).expect("upsert");
        let result = conn.execute(
            "UPDATE bounties SET solver = 'x' WHERE txid = ?1",
            [&op.txid],
        );
        assert!(result.is_err(), "solver without key must violate CHECK");
    }
}
