//! # gitpaid-script
//!
//! Transaction and locking-script decoding for the bounty overlay.
//!
//! The wire codec, txid hashing and script instruction parsing come from the
//! `bitcoin` crate. What lives here is what it does not know about:
//!
//! - [`transaction`] - raw/BEEF detection and decoding helpers
//! - [`beef`] - BEEF envelope parsing (BRC-62, BRC-96, BRC-95)
//! - [`script`] - normalized chunk view of a locking script, minimal pushes
//! - [`pushdrop`] - PushDrop field extraction and construction
//!
//! ## Decoding path
//!
//! ```text
//! BEEF / raw bytes
//!     |
//!     v
//! bitcoin::Transaction  -- inputs, outputs, compute_txid()
//!     |
//!     v
//! Chunk (script.rs)     -- pushes and opcodes of an output's script_pubkey
//!     |
//!     v
//! PushDrop (pushdrop.rs) -- locking key + positional data fields
//! ```

pub mod beef;
pub mod pushdrop;
pub mod script;
pub mod transaction;

pub use bitcoin::{Amount, OutPoint, Script, ScriptBuf, Transaction, TxIn, TxOut, Txid};
pub use pushdrop::PushDrop;
pub use transaction::{decode_transaction, decode_transaction_hex, txid_hex};

/// Errors raised while decoding transactions and scripts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    /// Transaction bytes failed consensus decoding.
    #[error("malformed transaction: {0}")]
    Consensus(String),

    /// Script instructions could not be parsed or built.
    #[error("malformed script: {0}")]
    Script(String),

    /// BEEF envelope is malformed.
    #[error("invalid BEEF: {0}")]
    InvalidBeef(String),

    /// Script does not follow the PushDrop layout.
    #[error("not a PushDrop script: {0}")]
    NotPushDrop(String),

    /// Hex input could not be decoded.
    #[error("invalid hex: {0}")]
    Hex(String),
}

impl From<bitcoin::consensus::encode::Error> for ScriptError {
    fn from(e: bitcoin::consensus::encode::Error) -> Self {
        Self::Consensus(e.to_string())
    }
}

impl From<bitcoin::script::Error> for ScriptError {
    fn from(e: bitcoin::script::Error) -> Self {
        Self::Script(e.to_string())
    }
}

impl From<bitcoin::script::PushBytesError> for ScriptError {
    fn from(e: bitcoin::script::PushBytesError) -> Self {
        Self::Script(e.to_string())
    }
}

impl From<hex::FromHexError> for ScriptError {
    fn from(e: hex::FromHexError) -> Self {
        Self::Hex(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScriptError>;
