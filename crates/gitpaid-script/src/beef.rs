//! BEEF envelope parsing (BRC-62, BRC-96 V2 and BRC-95 atomic wrapper).
//!
//! A BEEF carries a transaction together with its ancestors and the merkle
//! paths (BUMPs) anchoring them. Only the structure is decoded here; proof
//! verification against block headers belongs to the overlay host.
//!
//! ```text
//! [01010101 subject_txid]     optional atomic prefix
//! version        u32 LE       0100BEEF (V1) or 0200BEEF (V2)
//! n_bumps        varint
//!   bump…                     block height, tree height, levels of leaves
//! n_txs          varint
//!   V1: raw_tx, has_bump u8, [bump_index varint]
//!   V2: format u8 (0 raw, 1 raw + bump_index, 2 txid only), payload
//! ```
//!
//! Framing fields and embedded transactions are read with
//! `bitcoin::consensus::Decodable` straight off the byte slice.

use bitcoin::consensus::encode::{Decodable, VarInt};
use bitcoin::{Transaction, Txid};

use crate::{Result, ScriptError};

pub const BEEF_V1: u32 = 0xEFBE_0001;
pub const BEEF_V2: u32 = 0xEFBE_0002;
pub const ATOMIC_BEEF: u32 = 0x0101_0101;

const FLAG_DUPLICATE: u8 = 0x01;

/// One leaf of a BUMP level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BumpLeaf {
    pub offset: u64,
    pub flags: u8,
    /// Absent for duplicate leaves.
    pub hash: Option<[u8; 32]>,
}

/// BSV Unified Merkle Path (BRC-74).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bump {
    pub block_height: u64,
    pub levels: Vec<Vec<BumpLeaf>>,
}

/// A transaction entry inside a BEEF.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeefTx {
    pub txid: Txid,
    /// `None` for V2 txid-only entries.
    pub tx: Option<Transaction>,
    pub bump_index: Option<usize>,
}

/// A decoded BEEF envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Beef {
    pub version: u32,
    /// Txid named by the atomic prefix, if present.
    pub atomic_txid: Option<Txid>,
    pub bumps: Vec<Bump>,
    pub transactions: Vec<BeefTx>,
}

/// Whether `data` starts with a BEEF or atomic BEEF magic.
pub fn is_beef(data: &[u8]) -> bool {
    let Some(prefix) = data.get(..4) else {
        return false;
    };
    let mut magic = [0u8; 4];
    magic.copy_from_slice(prefix);
    matches!(
        u32::from_le_bytes(magic),
        BEEF_V1 | BEEF_V2 | ATOMIC_BEEF
    )
}

fn read<T: Decodable>(reader: &mut &[u8]) -> Result<T> {
    Ok(T::consensus_decode(reader)?)
}

fn read_len(reader: &mut &[u8]) -> Result<usize> {
    let VarInt(n) = read(reader)?;
    usize::try_from(n).map_err(|_| ScriptError::InvalidBeef(format!("length {n} too large")))
}

impl Beef {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = data;

        let mut version: u32 = read(&mut reader)?;
        let mut atomic_txid = None;
        if version == ATOMIC_BEEF {
            atomic_txid = Some(read::<Txid>(&mut reader)?);
            version = read(&mut reader)?;
        }
        if version != BEEF_V1 && version != BEEF_V2 {
            return Err(ScriptError::InvalidBeef(format!(
                "unsupported version {version:#010x}"
            )));
        }

        let n_bumps = read_len(&mut reader)?;
        let mut bumps = Vec::new();
        for _ in 0..n_bumps {
            bumps.push(read_bump(&mut reader)?);
        }

        let n_txs = read_len(&mut reader)?;
        let mut transactions = Vec::new();
        for _ in 0..n_txs {
            let entry = if version == BEEF_V1 {
                read_v1_tx(&mut reader)?
            } else {
                read_v2_tx(&mut reader)?
            };
            if let Some(index) = entry.bump_index {
                if index >= bumps.len() {
                    return Err(ScriptError::InvalidBeef(format!(
                        "bump index {index} out of range ({} bumps)",
                        bumps.len()
                    )));
                }
            }
            transactions.push(entry);
        }

        if !reader.is_empty() {
            return Err(ScriptError::InvalidBeef(format!(
                "{} trailing bytes",
                reader.len()
            )));
        }

        Ok(Self {
            version,
            atomic_txid,
            bumps,
            transactions,
        })
    }

    /// The transaction the envelope is about: the one named by the atomic
    /// prefix, otherwise the last fully serialized transaction.
    pub fn into_subject(self) -> Result<Transaction> {
        let Self {
            atomic_txid,
            transactions,
            ..
        } = self;
        let subject = match atomic_txid {
            Some(txid) => transactions.into_iter().find(|t| t.txid == txid),
            None => transactions.into_iter().rev().find(|t| t.tx.is_some()),
        };
        subject
            .and_then(|t| t.tx)
            .ok_or_else(|| ScriptError::InvalidBeef("no subject transaction".into()))
    }
}

/// Decode a BEEF and return its subject transaction.
pub fn subject_transaction(data: &[u8]) -> Result<Transaction> {
    Beef::from_bytes(data)?.into_subject()
}

fn read_bump(reader: &mut &[u8]) -> Result<Bump> {
    let VarInt(block_height) = read(reader)?;
    let tree_height: u8 = read(reader)?;
    let mut levels = Vec::with_capacity(usize::from(tree_height));
    for _ in 0..tree_height {
        let n_leaves = read_len(reader)?;
        let mut leaves = Vec::new();
        for _ in 0..n_leaves {
            let VarInt(offset) = read(reader)?;
            let flags: u8 = read(reader)?;
            let hash = if flags & FLAG_DUPLICATE == 0 {
                Some(read::<[u8; 32]>(reader)?)
            } else {
                None
            };
            leaves.push(BumpLeaf {
                offset,
                flags,
                hash,
            });
        }
        levels.push(leaves);
    }
    Ok(Bump {
        block_height,
        levels,
    })
}

fn full_entry(tx: Transaction, bump_index: Option<usize>) -> BeefTx {
    BeefTx {
        txid: tx.compute_txid(),
        tx: Some(tx),
        bump_index,
    }
}

fn read_v1_tx(reader: &mut &[u8]) -> Result<BeefTx> {
    let tx: Transaction = read(reader)?;
    let bump_index = match read::<u8>(reader)? {
        0 => None,
        1 => Some(read_len(reader)?),
        other => {
            return Err(ScriptError::InvalidBeef(format!(
                "invalid has-bump flag {other}"
            )))
        }
    };
    Ok(full_entry(tx, bump_index))
}

fn read_v2_tx(reader: &mut &[u8]) -> Result<BeefTx> {
    match read::<u8>(reader)? {
        0 => Ok(full_entry(read(reader)?, None)),
        1 => {
            let bump_index = read_len(reader)?;
            Ok(full_entry(read(reader)?, Some(bump_index)))
        }
        2 => Ok(BeefTx {
            txid: read(reader)?,
            tx: None,
            bump_index: None,
        }),
        other => Err(ScriptError::InvalidBeef(format!(
            "invalid transaction format {other}"
        ))),
    }
}
