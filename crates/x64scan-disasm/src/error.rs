//! Decoding error types.

use thiserror::Error;

use crate::x86_64::opcodes::{EscapeMap, OpcodeMap, UnsupportedClass};

/// A read that would run past the end of the buffer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("read of {needed} byte(s) at offset {offset:#x} with {available} remaining")]
pub struct OutOfBounds {
    /// Cursor position of the failed read.
    pub offset: usize,
    /// Bytes the read required.
    pub needed: usize,
    /// Bytes left in the buffer.
    pub available: usize,
}

/// What went wrong while decoding one instruction.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// A required field (opcode, ModR/M, SIB, displacement or immediate) runs past the buffer end.
    #[error("truncated instruction: need {needed} byte(s), have {available}")]
    OutOfBounds { needed: usize, available: usize },

    /// The opcode selects the 3DNow! or a three-byte escape map.
    #[error("unsupported escape map {0}")]
    UnsupportedEscapeMap(EscapeMap),

    /// No table entry for the opcode in its map.
    #[error("unknown opcode {opcode:#04x} in {map} map")]
    UnknownOpcode { map: OpcodeMap, opcode: u8 },

    /// A legacy prefix (or a second REX) follows the REX prefix.
    #[error("prefix byte {byte:#04x} after REX")]
    MisplacedPrefix { byte: u8 },

    /// The opcode belongs to the x87 or vector instruction space.
    #[error("unsupported {class} instruction {opcode:#04x} in {map} map")]
    UnsupportedInstruction {
        class: UnsupportedClass,
        map: OpcodeMap,
        opcode: u8,
    },

    /// The decoded instruction exceeds the architectural length limit.
    #[error("instruction length {length} exceeds limit of {limit}")]
    InstructionTooLong { length: usize, limit: usize },
}

/// Error record for one failed decode step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at offset {offset:#x}")]
pub struct DecodeError {
    /// Offset of the byte that caused the failure.
    pub offset: usize,
    /// Offset where the failed instruction started.
    pub start: usize,
    /// Error kind.
    pub kind: DecodeErrorKind,
    /// Bytes skipped from `start` before decoding resumes.
    pub bytes_consumed: usize,
}

impl DecodeError {
    /// Creates a new error record.
    pub fn new(kind: DecodeErrorKind, offset: usize, start: usize, bytes_consumed: usize) -> Self {
        Self {
            offset,
            start,
            kind,
            bytes_consumed,
        }
    }

    /// Creates an OutOfBounds record that consumes the remainder of a buffer of `len` bytes.
    pub fn out_of_bounds(err: OutOfBounds, start: usize, len: usize) -> Self {
        Self::new(
            DecodeErrorKind::OutOfBounds {
                needed: err.needed,
                available: err.available,
            },
            err.offset,
            start,
            len.saturating_sub(start).max(1),
        )
    }

    /// Creates an UnknownOpcode record.
    pub fn unknown_opcode(
        map: OpcodeMap,
        opcode: u8,
        offset: usize,
        start: usize,
        consumed: usize,
    ) -> Self {
        Self::new(
            DecodeErrorKind::UnknownOpcode { map, opcode },
            offset,
            start,
            consumed,
        )
    }

    /// Returns true for errors after which no further records follow.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, DecodeErrorKind::OutOfBounds { .. })
    }

    /// Shifts every offset by `delta`, for errors decoded from a sub-slice.
    pub fn rebased(mut self, delta: usize) -> Self {
        self.offset += delta;
        self.start += delta;
        self
    }
}
