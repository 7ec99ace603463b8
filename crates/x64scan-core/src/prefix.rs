//! Instruction prefix flags.

use crate::register::{x86, Register, RegisterClass};

/// Prefixes in effect for one decoded instruction.
///
/// Each legacy prefix group contributes at most one value. When a byte from
/// the same group appears more than once, the last occurrence wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrefixSet {
    /// Operand size override (0x66)
    pub operand_size: bool,
    /// Address size override (0x67)
    pub address_size: bool,
    /// Segment override (0x26, 0x2E, 0x36, 0x3E, 0x64, 0x65)
    pub segment: Option<Segment>,
    /// LOCK prefix (0xF0)
    pub lock: bool,
    /// Repeat prefix (0xF2, 0xF3)
    pub repeat: RepeatKind,
    /// REX prefix
    pub rex: Option<Rex>,
}

/// Segment override prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Segment {
    CS,
    SS,
    DS,
    ES,
    FS,
    GS,
}

impl Segment {
    /// Maps the 3-bit segment register encoding used by `mov Sreg` forms.
    pub fn from_encoding(value: u8) -> Option<Self> {
        match value & 0x7 {
            0 => Some(Self::ES),
            1 => Some(Self::CS),
            2 => Some(Self::SS),
            3 => Some(Self::DS),
            4 => Some(Self::FS),
            5 => Some(Self::GS),
            _ => None,
        }
    }

    /// Returns the segment register.
    pub fn register(self) -> Register {
        let id = match self {
            Self::CS => x86::CS,
            Self::SS => x86::SS,
            Self::DS => x86::DS,
            Self::ES => x86::ES,
            Self::FS => x86::FS,
            Self::GS => x86::GS,
        };
        Register::new(RegisterClass::Segment, id, 16)
    }

    /// Returns the register name (`fs`, `gs`, ...).
    pub fn name(self) -> &'static str {
        self.register().name()
    }
}

/// Repeat prefix kind.
///
/// 0xF3 is `rep` on most string instructions and `repz` on the comparing
/// ones (`cmps`, `scas`); 0xF2 is always `repnz`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RepeatKind {
    #[default]
    None,
    Rep,
    Repz,
    Repnz,
}

impl RepeatKind {
    /// Returns the assembler keyword, if any.
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Rep => Some("rep"),
            Self::Repz => Some("repz"),
            Self::Repnz => Some("repnz"),
        }
    }
}

/// REX prefix fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rex {
    /// REX.W - 64-bit operand size
    pub w: bool,
    /// REX.R - extends ModR/M reg field
    pub r: bool,
    /// REX.X - extends SIB index field
    pub x: bool,
    /// REX.B - extends ModR/M r/m, SIB base, or opcode reg
    pub b: bool,
}

impl Rex {
    /// Returns true if `byte` is in the REX range (0x40-0x4F).
    pub const fn is_rex(byte: u8) -> bool {
        byte & 0xF0 == 0x40
    }

    /// Parse a REX byte. The fixed `0100` high nibble is not checked here.
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            w: byte & 0x08 != 0,
            r: byte & 0x04 != 0,
            x: byte & 0x02 != 0,
            b: byte & 0x01 != 0,
        }
    }

    /// Returns true if this REX prefix is "empty" (0x40).
    pub fn is_empty(&self) -> bool {
        !self.w && !self.r && !self.x && !self.b
    }
}

impl PrefixSet {
    /// Returns the effective operand size in bits.
    ///
    /// REX.W selects 64 bits and takes precedence over 0x66, which selects
    /// 16 bits. Otherwise the size is 32, or 64 for instructions that default
    /// to 64-bit operands in long mode (push, pop, near branches).
    pub fn operand_size(&self, default_64: bool) -> u16 {
        if self.rex_w() {
            64
        } else if self.operand_size {
            16
        } else if default_64 {
            64
        } else {
            32
        }
    }

    /// Returns the effective address size in bits.
    pub fn address_size(&self) -> u16 {
        if self.address_size {
            32
        } else {
            64
        }
    }

    /// Returns true if a REX prefix is present, even an empty one.
    pub fn has_rex(&self) -> bool {
        self.rex.is_some()
    }

    pub fn rex_w(&self) -> bool {
        self.rex.map(|r| r.w).unwrap_or(false)
    }

    pub fn rex_r(&self) -> bool {
        self.rex.map(|r| r.r).unwrap_or(false)
    }

    pub fn rex_x(&self) -> bool {
        self.rex.map(|r| r.x).unwrap_or(false)
    }

    pub fn rex_b(&self) -> bool {
        self.rex.map(|r| r.b).unwrap_or(false)
    }

    /// Returns true if no prefix of any kind is present.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rex_fields() {
        let rex = Rex::from_byte(0x48);
        assert!(rex.w && !rex.r && !rex.x && !rex.b);
        let rex = Rex::from_byte(0x47);
        assert!(!rex.w && rex.r && rex.x && rex.b);
        assert!(Rex::from_byte(0x40).is_empty());
        assert!(Rex::is_rex(0x4F));
        assert!(!Rex::is_rex(0x50));
    }

    #[test]
    fn test_operand_size_precedence() {
        let mut p = PrefixSet::default();
        assert_eq!(p.operand_size(false), 32);
        assert_eq!(p.operand_size(true), 64);

        p.operand_size = true;
        assert_eq!(p.operand_size(false), 16);
        assert_eq!(p.operand_size(true), 16);

        // REX.W overrides 0x66.
        p.rex = Some(Rex::from_byte(0x48));
        assert_eq!(p.operand_size(false), 64);
    }

    #[test]
    fn test_segment_encoding() {
        assert_eq!(Segment::from_encoding(4), Some(Segment::FS));
        assert_eq!(Segment::from_encoding(6), None);
        assert_eq!(Segment::GS.name(), "gs");
    }
}
