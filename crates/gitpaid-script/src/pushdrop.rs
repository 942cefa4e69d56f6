//! PushDrop locking scripts.
//!
//! A PushDrop output pushes arbitrary data fields and immediately drops them,
//! leaving an ordinary P2PK lock. Two layouts exist in the wild:
//!
//! ```text
//! lock-before:  <pubkey> OP_CHECKSIG <f0> <f1> … <fn> OP_2DROP… [OP_DROP]
//! lock-after:   <f0> <f1> … <fn> OP_2DROP… [OP_DROP] <pubkey> OP_CHECKSIG
//! ```

use bitcoin::opcodes::all::{OP_2DROP, OP_CHECKSIG, OP_DROP};
use bitcoin::{Script, ScriptBuf};

use crate::script::{self, Chunk};
use crate::{Result, ScriptError};

/// Decoded PushDrop content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushDrop {
    pub locking_public_key: Vec<u8>,
    pub fields: Vec<Vec<u8>>,
}

fn is_drop(chunk: &Chunk) -> bool {
    chunk.is_op(OP_DROP) || chunk.is_op(OP_2DROP)
}

/// Extract the locking key and data fields from a PushDrop script.
pub fn decode(script: &Script) -> Result<PushDrop> {
    let chunks = script::chunks(script)?;

    match chunks.as_slice() {
        [Chunk::Data(key), checksig, rest @ ..] if !key.is_empty() && checksig.is_op(OP_CHECKSIG) => {
            let fields = collect_fields(rest)?;
            Ok(PushDrop {
                locking_public_key: key.clone(),
                fields,
            })
        }
        [body @ .., Chunk::Data(key), checksig] if !key.is_empty() && checksig.is_op(OP_CHECKSIG) => {
            let fields = collect_fields(body)?;
            Ok(PushDrop {
                locking_public_key: key.clone(),
                fields,
            })
        }
        _ => Err(ScriptError::NotPushDrop(
            "no <pubkey> OP_CHECKSIG lock found".into(),
        )),
    }
}

/// Data pushes up to the first drop opcode. Everything after the first drop
/// must be drops as well.
fn collect_fields(chunks: &[Chunk]) -> Result<Vec<Vec<u8>>> {
    let Some(first_drop) = chunks.iter().position(is_drop) else {
        return Err(ScriptError::NotPushDrop("fields are never dropped".into()));
    };

    let (pushes, drops) = chunks.split_at(first_drop);
    if !drops.iter().all(is_drop) {
        return Err(ScriptError::NotPushDrop(
            "unexpected opcode after drops".into(),
        ));
    }

    pushes
        .iter()
        .map(|chunk| match chunk {
            Chunk::Data(d) => Ok(d.clone()),
            Chunk::Op(op) => Err(ScriptError::NotPushDrop(format!("{op} among fields"))),
        })
        .collect()
}

/// Build a lock-before PushDrop script over `fields`.
pub fn lock(fields: &[Vec<u8>], locking_public_key: &[u8]) -> Result<ScriptBuf> {
    let mut chunks = Vec::with_capacity(fields.len() + 2 + fields.len() / 2 + 1);
    chunks.push(Chunk::Data(locking_public_key.to_vec()));
    chunks.push(Chunk::Op(OP_CHECKSIG));
    chunks.extend(fields.iter().cloned().map(Chunk::Data));
    for _ in 0..fields.len() / 2 {
        chunks.push(Chunk::Op(OP_2DROP));
    }
    if fields.len() % 2 == 1 {
        chunks.push(Chunk::Op(OP_DROP));
    }
    script::from_chunks(&chunks)
}
