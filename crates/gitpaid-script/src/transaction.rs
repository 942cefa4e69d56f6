//! Raw and BEEF transaction decoding.
//!
//! Serialized transactions use the standard consensus encoding, handled by
//! `bitcoin::consensus`. Trailing bytes after a raw transaction are rejected.

use bitcoin::consensus::deserialize;

use crate::{beef, Result, Transaction};

/// Decode a serialized transaction.
pub fn transaction_from_bytes(data: &[u8]) -> Result<Transaction> {
    Ok(deserialize(data)?)
}

/// Decode either a BEEF envelope or a raw transaction, detected by the BEEF
/// magic prefix. For a BEEF the subject transaction is returned.
pub fn decode_transaction(data: &[u8]) -> Result<Transaction> {
    if beef::is_beef(data) {
        beef::subject_transaction(data)
    } else {
        transaction_from_bytes(data)
    }
}

/// [`decode_transaction`] on hex input.
pub fn decode_transaction_hex(s: &str) -> Result<Transaction> {
    decode_transaction(&hex::decode(s.trim())?)
}

/// Transaction id in display order, the form used for outpoint identities.
pub fn txid_hex(tx: &Transaction) -> String {
    tx.compute_txid().to_string()
}
