//! Integration test crate for the GitPaid overlay.
//!
//! This crate has no library code. It only contains integration tests that
//! exercise the bounty lifecycle across the script, topic, lookup and store
//! crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p gitpaid-integration-tests
//! ```
