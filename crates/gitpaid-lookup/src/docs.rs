pub const LOOKUP_DOCUMENTATION: &str = r#"# GitHub Bounty Lookup Service

Answers queries about GitHub issue bounties tracked by the overlay.

## Queries

1. `findAllBounties`: every bounty, summary shape
2. `findByRepo`: bounties of one repository, summary shape
3. `findByIssue`: bounties of one issue, full detail
4. `findByFunder`: bounties funded by one public key, summary shape
5. `findBountyDetails`: one bounty by output identity, full detail
6. `findReposWithBounties`: repositories with bounty count, total and open count

## Examples

```json
"findAllBounties"
```

```json
{
  "type": "findByRepo",
  "value": { "repoOwner": "bitcoin-sv", "repoName": "bsv-overlay" }
}
```

```json
{
  "type": "findByIssue",
  "value": { "repoOwner": "bitcoin-sv", "repoName": "bsv-overlay", "issueNumber": 42 }
}
```

```json
{
  "type": "findBountyDetails",
  "value": { "txid": "<hex>", "outputIndex": 0 }
}
```

Answers are wrapped as `{"type": "freeform", "result": …}`. An empty list is
a valid answer.
"#;
