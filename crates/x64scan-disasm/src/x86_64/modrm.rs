//! ModR/M and SIB byte decoding.

use x64scan_core::{PrefixSet, Register};

use crate::cursor::ByteCursor;
use crate::error::OutOfBounds;

/// A ModR/M byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModRm(pub u8);

impl ModRm {
    /// Mod field (bits 7-6).
    pub fn mode(self) -> u8 {
        self.0 >> 6
    }

    /// Reg field (bits 5-3), without REX.R.
    pub fn reg(self) -> u8 {
        (self.0 >> 3) & 0x7
    }

    /// R/M field (bits 2-0), without REX.B.
    pub fn rm(self) -> u8 {
        self.0 & 0x7
    }

    /// Returns true if this ModR/M encodes a register operand (mod=11).
    pub fn is_register(self) -> bool {
        self.mode() == 0b11
    }

    /// Returns true if a SIB byte follows.
    pub fn needs_sib(self) -> bool {
        !self.is_register() && self.rm() == 0b100
    }

    /// mod=00, rm=101: RIP-relative with a 32-bit displacement.
    pub fn is_rip_relative(self) -> bool {
        self.mode() == 0b00 && self.rm() == 0b101
    }

    /// Displacement length implied by the mod field.
    pub fn displacement_size(self) -> usize {
        match self.mode() {
            0b01 => 1,
            0b10 => 4,
            0b00 if self.rm() == 0b101 => 4,
            _ => 0,
        }
    }
}

/// A SIB byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sib(pub u8);

impl Sib {
    pub fn scale(self) -> u8 {
        self.0 >> 6
    }

    /// Index field, without REX.X.
    pub fn index(self) -> u8 {
        (self.0 >> 3) & 0x7
    }

    /// Base field, without REX.B.
    pub fn base(self) -> u8 {
        self.0 & 0x7
    }

    /// Returns the actual scale factor (1, 2, 4, or 8).
    pub fn scale_factor(self) -> u8 {
        1 << self.scale()
    }
}

/// Effective address layout, known once ModR/M and SIB are read and before
/// the displacement is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryPlan {
    pub base: Option<Register>,
    pub index: Option<Register>,
    pub scale: u8,
    /// Displacement length in bytes (0, 1 or 4).
    pub displacement_size: usize,
}

/// Register index of the ModR/M.reg operand, extended by REX.R.
pub fn reg_index(modrm: ModRm, prefixes: &PrefixSet) -> u8 {
    modrm.reg() | ((prefixes.rex_r() as u8) << 3)
}

/// Register index of a mod=11 r/m operand, extended by REX.B.
pub fn rm_index(modrm: ModRm, prefixes: &PrefixSet) -> u8 {
    modrm.rm() | ((prefixes.rex_b() as u8) << 3)
}

/// Resolves the base/index/scale of a memory ModR/M operand.
///
/// Registers take the effective address size: 64-bit, or 32-bit under 0x67.
pub fn memory_plan(modrm: ModRm, sib: Option<Sib>, prefixes: &PrefixSet) -> MemoryPlan {
    let address_size = prefixes.address_size();
    let gpr = |index: u8| Register::gpr(index, address_size, true);
    let rex_b = (prefixes.rex_b() as u8) << 3;

    match sib {
        Some(sib) => {
            // Index 100 without REX.X means no index; with REX.X it is r12.
            let index_reg = sib.index() | ((prefixes.rex_x() as u8) << 3);
            let index = (index_reg != 0b100).then(|| gpr(index_reg));
            let scale = if index.is_some() { sib.scale_factor() } else { 1 };

            // Base 101 with mod=00 means no base and a disp32, whatever REX.B says.
            if sib.base() == 0b101 && modrm.mode() == 0b00 {
                MemoryPlan {
                    base: None,
                    index,
                    scale,
                    displacement_size: 4,
                }
            } else {
                MemoryPlan {
                    base: Some(gpr(sib.base() | rex_b)),
                    index,
                    scale,
                    displacement_size: modrm.displacement_size(),
                }
            }
        }
        None if modrm.is_rip_relative() => MemoryPlan {
            base: Some(Register::rip(address_size)),
            index: None,
            scale: 1,
            displacement_size: 4,
        },
        None => MemoryPlan {
            base: Some(gpr(modrm.rm() | rex_b)),
            index: None,
            scale: 1,
            displacement_size: modrm.displacement_size(),
        },
    }
}

/// Reads a sign-extended displacement of `size` bytes (0, 1 or 4).
pub fn read_displacement(cursor: &mut ByteCursor<'_>, size: usize) -> Result<i64, OutOfBounds> {
    match size {
        1 => Ok(cursor.read_i8()? as i64),
        4 => Ok(cursor.read_i32()? as i64),
        _ => Ok(0),
    }
}
