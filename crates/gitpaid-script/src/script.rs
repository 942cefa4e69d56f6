//! Normalized chunk view over `bitcoin::Script` instructions.
//!
//! `Script::instructions()` reports `OP_1NEGATE` and `OP_1`..`OP_16` as plain
//! opcodes. PushDrop fields treat them as data, so they are folded into
//! [`Chunk::Data`] here and pushed back minimally by [`from_chunks`].

use bitcoin::opcodes::all::{OP_PUSHNUM_1, OP_PUSHNUM_16, OP_PUSHNUM_NEG1};
use bitcoin::opcodes::Opcode;
use bitcoin::script::{Builder, Instruction, PushBytesBuf};
use bitcoin::{Script, ScriptBuf};

use crate::Result;

/// One parsed script element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Chunk {
    /// Pushed data. Small-integer opcodes decode to their minimal byte value:
    /// `OP_0` is empty, `OP_1NEGATE` is `[0x81]`, `OP_N` is `[N]`.
    Data(Vec<u8>),
    /// Any non-push opcode.
    Op(Opcode),
}

impl Chunk {
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(d) => Some(d),
            Self::Op(_) => None,
        }
    }

    pub fn is_op(&self, opcode: Opcode) -> bool {
        matches!(self, Self::Op(op) if *op == opcode)
    }
}

fn small_int(op: Opcode) -> Option<u8> {
    let code = op.to_u8();
    (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8())
        .contains(&code)
        .then(|| code - OP_PUSHNUM_1.to_u8() + 1)
}

/// Split `script` into chunks. A push whose length runs past the end of the
/// script is an error.
pub fn chunks(script: &Script) -> Result<Vec<Chunk>> {
    script
        .instructions()
        .map(|instruction| {
            Ok(match instruction? {
                Instruction::PushBytes(bytes) => Chunk::Data(bytes.as_bytes().to_vec()),
                Instruction::Op(op) if op == OP_PUSHNUM_NEG1 => Chunk::Data(vec![0x81]),
                Instruction::Op(op) => match small_int(op) {
                    Some(n) => Chunk::Data(vec![n]),
                    None => Chunk::Op(op),
                },
            })
        })
        .collect()
}

/// Build a script from chunks, encoding each data push minimally.
pub fn from_chunks(chunks: &[Chunk]) -> Result<ScriptBuf> {
    let mut builder = Builder::new();
    for chunk in chunks {
        builder = match chunk {
            Chunk::Data(d) => match d.as_slice() {
                [] => builder.push_int(0),
                [n @ 1..=16] => builder.push_int(i64::from(*n)),
                [0x81] => builder.push_int(-1),
                _ => builder.push_slice(PushBytesBuf::try_from(d.clone())?),
            },
            Chunk::Op(op) => builder.push_opcode(*op),
        };
    }
    Ok(builder.into_script())
}

/// Parse a hex-encoded script.
pub fn from_hex(s: &str) -> Result<ScriptBuf> {
    Ok(ScriptBuf::from_bytes(hex::decode(s.trim())?))
}
