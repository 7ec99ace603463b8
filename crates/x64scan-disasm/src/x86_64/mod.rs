//! x86-64 instruction decoder.
//!
//! Handles legacy prefixes, REX, ModR/M and SIB addressing, and the
//! general-purpose and system instructions of the one- and two-byte opcode
//! maps. x87, vector (VEX/EVEX/SSE) and three-byte opcodes are recognized
//! and reported as errors.

mod decoder;
mod modrm;
pub mod opcodes;
mod prefix;

pub use decoder::{decode, Decoder, X86_64Disassembler};
pub use prefix::is_legacy_prefix;
