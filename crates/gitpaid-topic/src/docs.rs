pub const TOPIC_DOCUMENTATION: &str = r#"# GitHub Bounty Topic Manager

Tracks transaction outputs that fund GitHub issue bounties.

## Transaction types

1. **Bounty Creation**: a new PushDrop output funding an issue.
2. **Fund Addition**: spends a bounty and continues it with a larger amount.
   The continuation replaces the spent output. A continuation with the same
   amount just moves the bounty.
3. **Bounty Claim**: spends a bounty and pays the solver. The spending
   transaction carries a claim marker naming the solver.
4. **Withdrawal**: the funder spends the bounty back, optionally leaving a
   smaller remainder.

## Bounty output fields

| # | Field | Rule |
|---|-------|------|
| 0 | repository owner | non-empty |
| 1 | repository name | non-empty |
| 2 | issue number | positive decimal integer |
| 3 | amount (satoshis) | positive decimal integer |
| 4 | funder public key | non-empty |
| 5 | issue title | optional, defaults to `Issue #<n>` |
| 6 | description | optional |

## Claim marker fields

`[repoOwner, repoName, issueNumber, "claim", solver, solverPublicKey]`
"#;
