//! Continuation resolution: which output of a spending transaction carries
//! a tracked bounty forward.

use gitpaid_script::{pushdrop, Transaction};
use gitpaid_types::{BountyRecord, OutputRef};
use serde::Serialize;

use crate::fields::BountyFields;

/// A spent bounty output and the new output that continues it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Continuation {
    pub spent: OutputRef,
    pub output_index: u32,
    pub amount: u64,
}

/// Match each spent record to the first unused output of `tx` that is a valid
/// bounty for the same repository issue. Records with no match are omitted.
pub fn resolve_continuations(tx: &Transaction, spent: &[BountyRecord]) -> Vec<Continuation> {
    let candidates: Vec<(u32, BountyFields)> = bounty_outputs(tx).collect();
    let mut used = vec![false; candidates.len()];
    let mut resolved = Vec::new();

    for record in spent {
        let found = candidates.iter().enumerate().find(|(slot, (_, fields))| {
            !used[*slot]
                && fields.is_for_issue(&record.repo_owner, &record.repo_name, record.issue_number)
        });
        if let Some((slot, (index, fields))) = found {
            used[slot] = true;
            resolved.push(Continuation {
                spent: record.output_ref(),
                output_index: *index,
                amount: fields.amount,
            });
        }
    }

    resolved
}

/// Outputs of `tx` that decode to valid bounty fields, with their index.
pub(crate) fn bounty_outputs(tx: &Transaction) -> impl Iterator<Item = (u32, BountyFields)> + '_ {
    tx.output.iter().zip(0u32..).filter_map(|(output, index)| {
        let decoded = pushdrop::decode(&output.script_pubkey).ok()?;
        let fields = BountyFields::parse(&decoded.fields).ok()?;
        Some((index, fields))
    })
}
