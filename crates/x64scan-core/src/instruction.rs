//! Decoded instruction record.

use crate::format::OperandFormatter;
use crate::{Operand, PrefixSet};

/// A decoded x86-64 instruction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruction {
    /// Byte offset of the first byte (first prefix, if any) in the input buffer.
    pub offset: usize,
    /// Length in bytes, prefixes included.
    pub length: usize,
    /// Virtual address, when the caller supplied a base address.
    pub address: Option<u64>,
    /// Raw bytes of the instruction.
    pub bytes: Vec<u8>,
    /// Mnemonic string (e.g., "mov", "add", "jne").
    pub mnemonic: String,
    /// Operands (destination first, then sources).
    pub operands: Vec<Operand>,
    /// Prefixes in effect.
    pub prefixes: PrefixSet,
}

impl Instruction {
    /// Creates a new instruction with no operands or prefixes.
    pub fn new(offset: usize, bytes: Vec<u8>, mnemonic: impl Into<String>) -> Self {
        Self {
            offset,
            length: bytes.len(),
            address: None,
            bytes,
            mnemonic: mnemonic.into(),
            operands: Vec::new(),
            prefixes: PrefixSet::default(),
        }
    }

    /// Sets the virtual address.
    pub fn with_address(mut self, address: Option<u64>) -> Self {
        self.address = address;
        self
    }

    /// Sets operands.
    pub fn with_operands(mut self, ops: Vec<Operand>) -> Self {
        self.operands = ops;
        self
    }

    /// Sets the prefixes.
    pub fn with_prefixes(mut self, prefixes: PrefixSet) -> Self {
        self.prefixes = prefixes;
        self
    }

    /// Returns the buffer offset just past this instruction.
    pub fn end_offset(&self) -> usize {
        self.offset + self.length
    }

    /// Returns the virtual address just past this instruction.
    pub fn end_address(&self) -> Option<u64> {
        self.address.map(|a| a.wrapping_add(self.length as u64))
    }

    /// Returns true if any memory operand is RIP-relative.
    pub fn is_rip_relative(&self) -> bool {
        self.operands
            .iter()
            .filter_map(Operand::as_memory)
            .any(|m| m.is_rip_relative())
    }

    /// Resolves the RIP-relative memory operand, if there is one and the
    /// instruction address is known.
    pub fn rip_target(&self) -> Option<u64> {
        let next = self.end_address()?;
        self.operands
            .iter()
            .filter_map(Operand::as_memory)
            .find_map(|m| m.rip_target(next))
    }

    /// Renders every operand with the default formatter.
    pub fn operand_text(&self) -> Vec<String> {
        OperandFormatter::default().format_operands(self)
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&OperandFormatter::default().format_instruction(self))
    }
}
