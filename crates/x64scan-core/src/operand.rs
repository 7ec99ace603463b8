//! Instruction operand types.

use crate::{Register, Segment};

/// An instruction operand.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operand {
    /// Register operand.
    Register(Register),
    /// Immediate value.
    Immediate(Immediate),
    /// Memory reference.
    Memory(MemoryRef),
    /// Branch target relative to the end of the instruction.
    Relative {
        /// Signed displacement as encoded.
        displacement: i64,
        /// Resolved virtual address, known only when a base address was supplied.
        target: Option<u64>,
    },
}

impl Operand {
    /// Creates a register operand.
    pub fn reg(reg: Register) -> Self {
        Self::Register(reg)
    }

    /// Creates a signed immediate operand.
    pub fn imm(value: i128, size: u8) -> Self {
        Self::Immediate(Immediate {
            value,
            size,
            signed: true,
        })
    }

    /// Creates an unsigned immediate operand.
    pub fn imm_unsigned(value: u64, size: u8) -> Self {
        Self::Immediate(Immediate {
            value: value as i128,
            size,
            signed: false,
        })
    }

    /// Creates a relative branch operand.
    pub fn relative(displacement: i64, target: Option<u64>) -> Self {
        Self::Relative {
            displacement,
            target,
        }
    }

    /// Returns the memory reference, if this is a memory operand.
    pub fn as_memory(&self) -> Option<&MemoryRef> {
        match self {
            Self::Memory(mem) => Some(mem),
            _ => None,
        }
    }

    /// Returns the register, if this is a register operand.
    pub fn as_register(&self) -> Option<Register> {
        match self {
            Self::Register(reg) => Some(*reg),
            _ => None,
        }
    }
}

/// Immediate value operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Immediate {
    /// The value (sign-extended to i128 for uniformity).
    pub value: i128,
    /// Encoded size in bits.
    pub size: u8,
    /// Whether this is a signed immediate.
    pub signed: bool,
}

/// Memory reference operand.
///
/// Represents `[base + index*scale + disp]`. A base of `rip`/`eip` marks a
/// RIP-relative reference whose displacement counts from the end of the
/// instruction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryRef {
    /// Base register (if any).
    pub base: Option<Register>,
    /// Index register (if any).
    pub index: Option<Register>,
    /// Scale factor for index (1, 2, 4, or 8).
    pub scale: u8,
    /// Displacement, or the absolute address when there is no base or index.
    pub displacement: i64,
    /// Access size in bytes (0 when the instruction does not access memory, e.g. `lea`).
    pub size: u8,
    /// Segment override.
    pub segment: Option<Segment>,
}

impl MemoryRef {
    /// Creates a memory reference with base and displacement.
    pub fn base_disp(base: Register, displacement: i64, size: u8) -> Self {
        Self::sib(Some(base), None, 1, displacement, size)
    }

    /// Creates a memory reference with just a displacement (absolute address).
    pub fn absolute(address: i64, size: u8) -> Self {
        Self::sib(None, None, 1, address, size)
    }

    /// Creates a full SIB-style memory reference.
    pub fn sib(
        base: Option<Register>,
        index: Option<Register>,
        scale: u8,
        displacement: i64,
        size: u8,
    ) -> Self {
        Self {
            base,
            index,
            scale,
            displacement,
            size,
            segment: None,
        }
    }

    /// Sets the segment override.
    pub fn with_segment(mut self, segment: Option<Segment>) -> Self {
        self.segment = segment;
        self
    }

    /// Sets the access size in bytes.
    pub fn with_size(mut self, size: u8) -> Self {
        self.size = size;
        self
    }

    /// Returns true if the address is computed relative to the instruction pointer.
    pub fn is_rip_relative(&self) -> bool {
        self.base.map(|b| b.is_instruction_pointer()).unwrap_or(false)
    }

    /// Resolves a RIP-relative reference against the address of the next instruction.
    ///
    /// An `eip` base (0x67 prefix) wraps the target to 32 bits.
    pub fn rip_target(&self, next_address: u64) -> Option<u64> {
        let base = self.base.filter(|b| b.is_instruction_pointer())?;
        let target = next_address.wrapping_add(self.displacement as u64);
        if base.size == 32 {
            Some(target & 0xFFFF_FFFF)
        } else {
            Some(target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rip_relative_resolution() {
        let mem = MemoryRef::base_disp(Register::rip(64), 0x1e, 8);
        assert!(mem.is_rip_relative());
        assert_eq!(mem.rip_target(0x1007), Some(0x1025));

        let mem = MemoryRef::base_disp(Register::rip(64), -0x10, 8);
        assert_eq!(mem.rip_target(0x1007), Some(0xff7));
    }

    #[test]
    fn test_eip_relative_wraps_to_32_bits() {
        let mem = MemoryRef::base_disp(Register::rip(32), 0x20, 4);
        assert_eq!(mem.rip_target(0xFFFF_FFF7), Some(0x17));

        let mem = MemoryRef::base_disp(Register::rip(64), 0x20, 4);
        assert_eq!(mem.rip_target(0xFFFF_FFF7), Some(0x1_0000_0017));
    }

    #[test]
    fn test_plain_base_is_not_rip_relative() {
        let mem = MemoryRef::base_disp(Register::gpr(5, 64, false), -8, 8);
        assert!(!mem.is_rip_relative());
        assert_eq!(mem.rip_target(0x1000), None);
    }
}
