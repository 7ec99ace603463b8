//! x86-64 opcode tables.
//!
//! The tables are plain data: every entry describes a mnemonic and the
//! operand templates to decode, and a single dispatch routine in the decoder
//! interprets them.

use std::fmt;

use x64scan_core::{PrefixSet, RepeatKind, Segment};

/// Opcode map an opcode byte was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeMap {
    /// One-byte opcodes.
    Primary,
    /// Opcodes following 0x0F.
    TwoByte,
}

impl fmt::Display for OpcodeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::TwoByte => f.write_str("0f"),
        }
    }
}

/// Escape maps that are recognized but deliberately not decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EscapeMap {
    /// 0F 0F (AMD 3DNow!)
    ThreeDNow,
    /// 0F 38
    Map0F38,
    /// 0F 3A
    Map0F3A,
}

impl fmt::Display for EscapeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThreeDNow => f.write_str("0f 0f (3DNow!)"),
            Self::Map0F38 => f.write_str("0f 38"),
            Self::Map0F3A => f.write_str("0f 3a"),
        }
    }
}

/// Instruction families outside the decoder's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnsupportedClass {
    /// x87 floating point (D8-DF).
    X87,
    /// MMX/SSE/AVX, including the VEX (C4/C5) and EVEX (62) encodings.
    Vector,
}

impl fmt::Display for UnsupportedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X87 => f.write_str("x87"),
            Self::Vector => f.write_str("vector"),
        }
    }
}

/// Register/memory width of an operand template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
    Dword,
    Qword,
    /// The effective operand size (16, 32 or 64).
    Native,
    /// The effective operand size, capped at 32 (`in`/`out`).
    NativeMax32,
}

impl Width {
    /// Width in bits for the given effective operand size.
    pub fn bits(self, operand_size: u16) -> u16 {
        match self {
            Self::Byte => 8,
            Self::Word => 16,
            Self::Dword => 32,
            Self::Qword => 64,
            Self::Native => operand_size,
            Self::NativeMax32 => operand_size.min(32),
        }
    }
}

/// Immediate field encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateKind {
    /// 8-bit, unsigned.
    Imm8,
    /// 8-bit, sign-extended to the operand size.
    Imm8Sext,
    /// 16-bit, unsigned.
    Imm16,
    /// 16-bit with 0x66, otherwise 32-bit sign-extended to the operand size.
    Imm32,
    /// Full operand size, including a 64-bit immediate under REX.W.
    ImmFull,
}

impl ImmediateKind {
    /// Field length in bytes for the given effective operand size.
    pub fn size(self, operand_size: u16) -> usize {
        match self {
            Self::Imm8 | Self::Imm8Sext => 1,
            Self::Imm16 => 2,
            Self::Imm32 => {
                if operand_size == 16 {
                    2
                } else {
                    4
                }
            }
            Self::ImmFull => (operand_size / 8) as usize,
        }
    }
}

/// Operand template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// Register selected by ModR/M.reg (+REX.R).
    Reg(Width),
    /// Register or memory selected by ModR/M.rm (+REX.B), SIB and displacement.
    Rm(Width),
    /// Memory-only ModR/M operand with no access size (`lea`, descriptor tables).
    Mem,
    /// Register in the low three opcode bits (+REX.B).
    OpcodeReg(Width),
    /// al/ax/eax/rax.
    Acc(Width),
    /// cl, as a shift count.
    Cl,
    /// dx, as an I/O port.
    Dx,
    /// The constant 1 of the shift-by-one forms.
    One,
    /// Segment register selected by ModR/M.reg.
    SegmentReg,
    /// A fixed segment register.
    FixedSegment(Segment),
    /// Immediate field.
    Imm(ImmediateKind),
    /// 8-bit branch displacement.
    Rel8,
    /// 32-bit branch displacement.
    Rel32,
    /// Absolute memory offset (`mov al, [moffs]`).
    Moffs(Width),
}

impl OperandKind {
    /// Returns true if this operand is encoded in a ModR/M byte.
    pub const fn uses_modrm(&self) -> bool {
        matches!(
            self,
            Self::Reg(_) | Self::Rm(_) | Self::Mem | Self::SegmentReg
        )
    }
}

/// Instruction mnemonic, possibly depending on the operand size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Fixed(&'static str),
    /// `cbw`/`cwde`/`cdqe`, `movsw`/`movsd`/`movsq`, ...
    Sized {
        w16: &'static str,
        w32: &'static str,
        w64: &'static str,
    },
}

impl Mnemonic {
    pub fn select(&self, operand_size: u16) -> &'static str {
        match *self {
            Self::Fixed(name) => name,
            Self::Sized { w16, w32, w64 } => match operand_size {
                16 => w16,
                64 => w64,
                _ => w32,
            },
        }
    }
}

/// Opcode table entry describing one instruction form.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeDescriptor {
    /// Mnemonic
    pub mnemonic: Mnemonic,
    /// Operand templates, destination first
    pub operands: &'static [OperandKind],
    /// A ModR/M byte follows the opcode
    pub modrm: bool,
    /// Operand size defaults to 64 bits in long mode
    pub default_64: bool,
    /// F3 selects `repz` rather than `rep` (cmps, scas)
    pub compare_string: bool,
    /// F3 is part of the opcode rather than a repeat prefix (pause, endbr64)
    pub mandatory_rep: bool,
}

impl OpcodeDescriptor {
    pub const fn new(mnemonic: &'static str, operands: &'static [OperandKind]) -> Self {
        Self::with_mnemonic(Mnemonic::Fixed(mnemonic), operands)
    }

    pub const fn sized(
        w16: &'static str,
        w32: &'static str,
        w64: &'static str,
        operands: &'static [OperandKind],
    ) -> Self {
        Self::with_mnemonic(Mnemonic::Sized { w16, w32, w64 }, operands)
    }

    const fn with_mnemonic(mnemonic: Mnemonic, operands: &'static [OperandKind]) -> Self {
        let mut modrm = false;
        let mut i = 0;
        while i < operands.len() {
            if operands[i].uses_modrm() {
                modrm = true;
            }
            i += 1;
        }
        Self {
            mnemonic,
            operands,
            modrm,
            default_64: false,
            compare_string: false,
            mandatory_rep: false,
        }
    }

    /// Marks a ModR/M byte as present even though no operand uses it.
    pub const fn with_modrm(mut self) -> Self {
        self.modrm = true;
        self
    }

    pub const fn with_default_64(mut self) -> Self {
        self.default_64 = true;
        self
    }

    pub const fn with_compare_string(mut self) -> Self {
        self.compare_string = true;
        self
    }

    pub const fn with_mandatory_rep(mut self) -> Self {
        self.mandatory_rep = true;
        self
    }

    pub fn operand_count(&self) -> usize {
        self.operands.len()
    }

    /// Returns true if the ModR/M operand must be a memory reference.
    pub fn memory_only(&self) -> bool {
        self.operands.iter().any(|op| matches!(op, OperandKind::Mem))
    }
}

/// Eight descriptors selected by ModR/M.reg.
pub type GroupTable = [Option<OpcodeDescriptor>; 8];

/// Entry of a 256-slot opcode map.
#[derive(Debug, Clone, Copy)]
pub enum TableEntry {
    /// Not a valid opcode in 64-bit mode.
    Invalid,
    /// A legacy prefix or REX byte. Only seen here when it follows REX.
    Prefix,
    /// A single instruction form.
    Op(OpcodeDescriptor),
    /// Opcode extension: ModR/M.reg selects the form.
    Group(&'static GroupTable),
    /// Opcode extension with different forms for memory and register ModR/M.
    SplitGroup {
        memory: &'static GroupTable,
        register: &'static GroupTable,
    },
    /// 0x0F, leading into the two-byte map.
    TwoByteEscape,
    /// A three-byte or 3DNow! escape. Never decoded.
    Escape(EscapeMap),
    /// x87 or vector opcode space. Never decoded.
    Unsupported(UnsupportedClass),
}

use ImmediateKind::*;
use OperandKind::*;
use Width::*;

const NONE: &[OperandKind] = &[];
const E_G8: &[OperandKind] = &[Rm(Byte), Reg(Byte)];
const E_G: &[OperandKind] = &[Rm(Native), Reg(Native)];
const G_E8: &[OperandKind] = &[Reg(Byte), Rm(Byte)];
const G_E: &[OperandKind] = &[Reg(Native), Rm(Native)];
const AL_IB: &[OperandKind] = &[Acc(Byte), Imm(Imm8)];
const AX_IZ: &[OperandKind] = &[Acc(Native), Imm(Imm32)];
const E8: &[OperandKind] = &[Rm(Byte)];
const EV: &[OperandKind] = &[Rm(Native)];
const EW: &[OperandKind] = &[Rm(Word)];
const EQ: &[OperandKind] = &[Rm(Qword)];
const M: &[OperandKind] = &[Mem];
const E8_IB: &[OperandKind] = &[Rm(Byte), Imm(Imm8)];
const EV_IZ: &[OperandKind] = &[Rm(Native), Imm(Imm32)];
const EV_IBS: &[OperandKind] = &[Rm(Native), Imm(Imm8Sext)];
const EV_IB: &[OperandKind] = &[Rm(Native), Imm(Imm8)];
const JB: &[OperandKind] = &[Rel8];
const JZ: &[OperandKind] = &[Rel32];
const ZV: &[OperandKind] = &[OpcodeReg(Native)];

const ALU: [&str; 8] = ["add", "or", "adc", "sbb", "and", "sub", "xor", "cmp"];
const SHIFTS: [&str; 8] = ["rol", "ror", "rcl", "rcr", "shl", "shr", "sal", "sar"];

const JCC: [&str; 16] = [
    "jo", "jno", "jb", "jae", "je", "jne", "jbe", "ja", "js", "jns", "jp", "jnp", "jl", "jge",
    "jle", "jg",
];
const SETCC: [&str; 16] = [
    "seto", "setno", "setb", "setae", "sete", "setne", "setbe", "seta", "sets", "setns", "setp",
    "setnp", "setl", "setge", "setle", "setg",
];
const CMOVCC: [&str; 16] = [
    "cmovo", "cmovno", "cmovb", "cmovae", "cmove", "cmovne", "cmovbe", "cmova", "cmovs", "cmovns",
    "cmovp", "cmovnp", "cmovl", "cmovge", "cmovle", "cmovg",
];

const fn op(mnemonic: &'static str, operands: &'static [OperandKind]) -> Option<OpcodeDescriptor> {
    Some(OpcodeDescriptor::new(mnemonic, operands))
}

const fn names(mnemonics: [&'static str; 8], operands: &'static [OperandKind]) -> GroupTable {
    let mut table: GroupTable = [None; 8];
    let mut i = 0;
    while i < 8 {
        table[i] = Some(OpcodeDescriptor::new(mnemonics[i], operands).with_modrm());
        i += 1;
    }
    table
}

/// Group 1 (0x80, 0x81, 0x83): ALU r/m, imm.
const GROUP1_EB_IB: GroupTable = names(ALU, E8_IB);
const GROUP1_EV_IZ: GroupTable = names(ALU, EV_IZ);
const GROUP1_EV_IBS: GroupTable = names(ALU, EV_IBS);

/// Group 1A (0x8F).
const GROUP1A: GroupTable = [
    Some(OpcodeDescriptor::new("pop", EV).with_default_64()),
    None,
    None,
    None,
    None,
    None,
    None,
    None,
];

/// Group 2 (shift/rotate: 0xC0-0xC1, 0xD0-0xD3).
const GROUP2_EB_IB: GroupTable = names(SHIFTS, E8_IB);
const GROUP2_EV_IB: GroupTable = names(SHIFTS, EV_IB);
const GROUP2_EB_1: GroupTable = names(SHIFTS, &[Rm(Byte), One]);
const GROUP2_EV_1: GroupTable = names(SHIFTS, &[Rm(Native), One]);
const GROUP2_EB_CL: GroupTable = names(SHIFTS, &[Rm(Byte), Cl]);
const GROUP2_EV_CL: GroupTable = names(SHIFTS, &[Rm(Native), Cl]);

/// Group 3 (0xF6/0xF7: unary ops with r/m).
const GROUP3_EB: GroupTable = [
    op("test", E8_IB),
    op("test", E8_IB),
    op("not", E8),
    op("neg", E8),
    op("mul", E8),
    op("imul", E8),
    op("div", E8),
    op("idiv", E8),
];
const GROUP3_EV: GroupTable = [
    op("test", EV_IZ),
    op("test", EV_IZ),
    op("not", EV),
    op("neg", EV),
    op("mul", EV),
    op("imul", EV),
    op("div", EV),
    op("idiv", EV),
];

/// Group 4 (0xFE).
const GROUP4: GroupTable = [op("inc", E8), op("dec", E8), None, None, None, None, None, None];

/// Group 5 (0xFF). Far forms (/3, /5) are not decoded.
const GROUP5: GroupTable = [
    op("inc", EV),
    op("dec", EV),
    Some(OpcodeDescriptor::new("call", EQ).with_default_64()),
    None,
    Some(OpcodeDescriptor::new("jmp", EQ).with_default_64()),
    None,
    Some(OpcodeDescriptor::new("push", EV).with_default_64()),
    None,
];

/// Group 11 (0xC6/0xC7).
const GROUP11_EB: GroupTable = [op("mov", E8_IB), None, None, None, None, None, None, None];
const GROUP11_EV: GroupTable = [op("mov", EV_IZ), None, None, None, None, None, None, None];

/// Group 6 (0F 00).
const GROUP6: GroupTable = [
    op("sldt", EW),
    op("str", EW),
    op("lldt", EW),
    op("ltr", EW),
    op("verr", EW),
    op("verw", EW),
    None,
    None,
];

/// Group 7 (0F 01). Register forms other than smsw/lmsw select individual
/// system instructions by ModR/M.rm and are not decoded.
const GROUP7_MEM: GroupTable = [
    op("sgdt", M),
    op("sidt", M),
    op("lgdt", M),
    op("lidt", M),
    op("smsw", EW),
    None,
    op("lmsw", EW),
    op("invlpg", M),
];
const GROUP7_REG: GroupTable = [
    None,
    None,
    None,
    None,
    op("smsw", EV),
    None,
    op("lmsw", EW),
    None,
];

/// Group 8 (0F BA): bit test with immediate.
const GROUP8: GroupTable = [
    None,
    None,
    None,
    None,
    op("bt", EV_IB),
    op("bts", EV_IB),
    op("btr", EV_IB),
    op("btc", EV_IB),
];

/// Group 9 (0F C7).
const GROUP9: GroupTable = [
    None,
    Some(OpcodeDescriptor::sized("cmpxchg8b", "cmpxchg8b", "cmpxchg16b", M)),
    None,
    None,
    None,
    None,
    None,
    None,
];

/// Group 15 (0F AE): state save/restore on memory, fences on registers.
const GROUP15_MEM: GroupTable = [
    op("fxsave", M),
    op("fxrstor", M),
    op("ldmxcsr", M),
    op("stmxcsr", M),
    op("xsave", M),
    op("xrstor", M),
    op("xsaveopt", M),
    op("clflush", M),
];
const GROUP15_REG: GroupTable = [
    None,
    None,
    None,
    None,
    None,
    Some(OpcodeDescriptor::new("lfence", NONE).with_modrm()),
    Some(OpcodeDescriptor::new("mfence", NONE).with_modrm()),
    Some(OpcodeDescriptor::new("sfence", NONE).with_modrm()),
];

/// Group 16 (0F 18): prefetch hints; /4-/7 are reserved hint nops.
const GROUP16: GroupTable = [
    op("prefetchnta", M),
    op("prefetcht0", M),
    op("prefetcht1", M),
    op("prefetcht2", M),
    op("nop", EV),
    op("nop", EV),
    op("nop", EV),
    op("nop", EV),
];

/// AMD prefetch group (0F 0D); unassigned extensions alias `prefetch`.
const GROUP_PREFETCH: GroupTable = [
    op("prefetch", M),
    op("prefetchw", M),
    op("prefetchwt1", M),
    op("prefetch", M),
    op("prefetch", M),
    op("prefetch", M),
    op("prefetch", M),
    op("prefetch", M),
];

const fn entry(mnemonic: &'static str, operands: &'static [OperandKind]) -> TableEntry {
    TableEntry::Op(OpcodeDescriptor::new(mnemonic, operands))
}

const fn entry_64(mnemonic: &'static str, operands: &'static [OperandKind]) -> TableEntry {
    TableEntry::Op(OpcodeDescriptor::new(mnemonic, operands).with_default_64())
}

const fn sized(
    w16: &'static str,
    w32: &'static str,
    w64: &'static str,
    operands: &'static [OperandKind],
) -> TableEntry {
    TableEntry::Op(OpcodeDescriptor::sized(w16, w32, w64, operands))
}

/// One-byte opcode map.
pub static PRIMARY_MAP: [TableEntry; 256] = {
    let mut table = [TableEntry::Invalid; 256];

    // ADD, OR, ADC, SBB, AND, SUB, XOR, CMP: six forms each
    let mut i = 0;
    while i < 8 {
        let base = i * 8;
        table[base] = entry(ALU[i], E_G8);
        table[base + 1] = entry(ALU[i], E_G);
        table[base + 2] = entry(ALU[i], G_E8);
        table[base + 3] = entry(ALU[i], G_E);
        table[base + 4] = entry(ALU[i], AL_IB);
        table[base + 5] = entry(ALU[i], AX_IZ);
        i += 1;
    }

    // Legacy prefixes
    table[0x26] = TableEntry::Prefix;
    table[0x2E] = TableEntry::Prefix;
    table[0x36] = TableEntry::Prefix;
    table[0x3E] = TableEntry::Prefix;
    table[0x64] = TableEntry::Prefix;
    table[0x65] = TableEntry::Prefix;
    table[0x66] = TableEntry::Prefix;
    table[0x67] = TableEntry::Prefix;
    table[0xF0] = TableEntry::Prefix;
    table[0xF2] = TableEntry::Prefix;
    table[0xF3] = TableEntry::Prefix;

    table[0x0F] = TableEntry::TwoByteEscape;

    // REX
    let mut i = 0x40;
    while i <= 0x4F {
        table[i] = TableEntry::Prefix;
        i += 1;
    }

    // PUSH/POP r64
    let mut i = 0;
    while i < 8 {
        table[0x50 + i] = entry_64("push", ZV);
        table[0x58 + i] = entry_64("pop", ZV);
        i += 1;
    }

    table[0x62] = TableEntry::Unsupported(UnsupportedClass::Vector);
    table[0x63] = entry("movsxd", &[Reg(Native), Rm(Dword)]);
    table[0x68] = entry_64("push", &[Imm(Imm32)]);
    table[0x69] = entry("imul", &[Reg(Native), Rm(Native), Imm(Imm32)]);
    table[0x6A] = entry_64("push", &[Imm(Imm8Sext)]);
    table[0x6B] = entry("imul", &[Reg(Native), Rm(Native), Imm(Imm8Sext)]);
    table[0x6C] = entry("insb", NONE);
    table[0x6D] = sized("insw", "insd", "insd", NONE);
    table[0x6E] = entry("outsb", NONE);
    table[0x6F] = sized("outsw", "outsd", "outsd", NONE);

    // Jcc rel8
    let mut i = 0;
    while i < 16 {
        table[0x70 + i] = entry(JCC[i], JB);
        i += 1;
    }

    table[0x80] = TableEntry::Group(&GROUP1_EB_IB);
    table[0x81] = TableEntry::Group(&GROUP1_EV_IZ);
    table[0x83] = TableEntry::Group(&GROUP1_EV_IBS);
    table[0x84] = entry("test", E_G8);
    table[0x85] = entry("test", E_G);
    table[0x86] = entry("xchg", E_G8);
    table[0x87] = entry("xchg", E_G);
    table[0x88] = entry("mov", E_G8);
    table[0x89] = entry("mov", E_G);
    table[0x8A] = entry("mov", G_E8);
    table[0x8B] = entry("mov", G_E);
    table[0x8C] = entry("mov", &[Rm(Word), SegmentReg]);
    table[0x8D] = entry("lea", &[Reg(Native), Mem]);
    table[0x8E] = entry("mov", &[SegmentReg, Rm(Word)]);
    table[0x8F] = TableEntry::Group(&GROUP1A);

    table[0x90] = entry("nop", NONE);
    let mut i = 0x91;
    while i <= 0x97 {
        table[i] = entry("xchg", &[OpcodeReg(Native), Acc(Native)]);
        i += 1;
    }
    table[0x98] = sized("cbw", "cwde", "cdqe", NONE);
    table[0x99] = sized("cwd", "cdq", "cqo", NONE);
    table[0x9B] = entry("wait", NONE);
    table[0x9C] = TableEntry::Op(OpcodeDescriptor::sized("pushf", "pushfq", "pushfq", NONE).with_default_64());
    table[0x9D] = TableEntry::Op(OpcodeDescriptor::sized("popf", "popfq", "popfq", NONE).with_default_64());
    table[0x9E] = entry("sahf", NONE);
    table[0x9F] = entry("lahf", NONE);

    table[0xA0] = entry("mov", &[Acc(Byte), Moffs(Byte)]);
    table[0xA1] = entry("mov", &[Acc(Native), Moffs(Native)]);
    table[0xA2] = entry("mov", &[Moffs(Byte), Acc(Byte)]);
    table[0xA3] = entry("mov", &[Moffs(Native), Acc(Native)]);
    table[0xA4] = entry("movsb", NONE);
    table[0xA5] = sized("movsw", "movsd", "movsq", NONE);
    table[0xA6] = TableEntry::Op(OpcodeDescriptor::new("cmpsb", NONE).with_compare_string());
    table[0xA7] = TableEntry::Op(OpcodeDescriptor::sized("cmpsw", "cmpsd", "cmpsq", NONE).with_compare_string());
    table[0xA8] = entry("test", AL_IB);
    table[0xA9] = entry("test", AX_IZ);
    table[0xAA] = entry("stosb", NONE);
    table[0xAB] = sized("stosw", "stosd", "stosq", NONE);
    table[0xAC] = entry("lodsb", NONE);
    table[0xAD] = sized("lodsw", "lodsd", "lodsq", NONE);
    table[0xAE] = TableEntry::Op(OpcodeDescriptor::new("scasb", NONE).with_compare_string());
    table[0xAF] = TableEntry::Op(OpcodeDescriptor::sized("scasw", "scasd", "scasq", NONE).with_compare_string());

    // MOV r, imm
    let mut i = 0;
    while i < 8 {
        table[0xB0 + i] = entry("mov", &[OpcodeReg(Byte), Imm(Imm8)]);
        table[0xB8 + i] = entry("mov", &[OpcodeReg(Native), Imm(ImmFull)]);
        i += 1;
    }

    table[0xC0] = TableEntry::Group(&GROUP2_EB_IB);
    table[0xC1] = TableEntry::Group(&GROUP2_EV_IB);
    table[0xC2] = entry_64("ret", &[Imm(Imm16)]);
    table[0xC3] = entry_64("ret", NONE);
    table[0xC4] = TableEntry::Unsupported(UnsupportedClass::Vector);
    table[0xC5] = TableEntry::Unsupported(UnsupportedClass::Vector);
    table[0xC6] = TableEntry::Group(&GROUP11_EB);
    table[0xC7] = TableEntry::Group(&GROUP11_EV);
    table[0xC8] = entry_64("enter", &[Imm(Imm16), Imm(Imm8)]);
    table[0xC9] = entry_64("leave", NONE);
    table[0xCA] = entry("retf", &[Imm(Imm16)]);
    table[0xCB] = entry("retf", NONE);
    table[0xCC] = entry("int3", NONE);
    table[0xCD] = entry("int", &[Imm(Imm8)]);
    table[0xCF] = sized("iret", "iretd", "iretq", NONE);

    table[0xD0] = TableEntry::Group(&GROUP2_EB_1);
    table[0xD1] = TableEntry::Group(&GROUP2_EV_1);
    table[0xD2] = TableEntry::Group(&GROUP2_EB_CL);
    table[0xD3] = TableEntry::Group(&GROUP2_EV_CL);
    table[0xD7] = entry("xlatb", NONE);

    // x87 escape
    let mut i = 0xD8;
    while i <= 0xDF {
        table[i] = TableEntry::Unsupported(UnsupportedClass::X87);
        i += 1;
    }

    table[0xE0] = entry_64("loopne", JB);
    table[0xE1] = entry_64("loope", JB);
    table[0xE2] = entry_64("loop", JB);
    table[0xE3] = entry_64("jrcxz", JB);
    table[0xE4] = entry("in", &[Acc(Byte), Imm(Imm8)]);
    table[0xE5] = entry("in", &[Acc(NativeMax32), Imm(Imm8)]);
    table[0xE6] = entry("out", &[Imm(Imm8), Acc(Byte)]);
    table[0xE7] = entry("out", &[Imm(Imm8), Acc(NativeMax32)]);
    table[0xE8] = entry_64("call", JZ);
    table[0xE9] = entry_64("jmp", JZ);
    table[0xEB] = entry_64("jmp", JB);
    table[0xEC] = entry("in", &[Acc(Byte), Dx]);
    table[0xED] = entry("in", &[Acc(NativeMax32), Dx]);
    table[0xEE] = entry("out", &[Dx, Acc(Byte)]);
    table[0xEF] = entry("out", &[Dx, Acc(NativeMax32)]);

    table[0xF1] = entry("int1", NONE);
    table[0xF4] = entry("hlt", NONE);
    table[0xF5] = entry("cmc", NONE);
    table[0xF6] = TableEntry::Group(&GROUP3_EB);
    table[0xF7] = TableEntry::Group(&GROUP3_EV);
    table[0xF8] = entry("clc", NONE);
    table[0xF9] = entry("stc", NONE);
    table[0xFA] = entry("cli", NONE);
    table[0xFB] = entry("sti", NONE);
    table[0xFC] = entry("cld", NONE);
    table[0xFD] = entry("std", NONE);
    table[0xFE] = TableEntry::Group(&GROUP4);
    table[0xFF] = TableEntry::Group(&GROUP5);

    table
};

/// Two-byte opcode map (0F xx).
pub static TWO_BYTE_MAP: [TableEntry; 256] = {
    let mut table = [TableEntry::Invalid; 256];

    table[0x00] = TableEntry::Group(&GROUP6);
    table[0x01] = TableEntry::SplitGroup {
        memory: &GROUP7_MEM,
        register: &GROUP7_REG,
    };
    table[0x02] = entry("lar", &[Reg(Native), Rm(Word)]);
    table[0x03] = entry("lsl", &[Reg(Native), Rm(Word)]);
    table[0x05] = entry("syscall", NONE);
    table[0x06] = entry("clts", NONE);
    table[0x07] = sized("sysret", "sysret", "sysretq", NONE);
    table[0x08] = entry("invd", NONE);
    table[0x09] = entry("wbinvd", NONE);
    table[0x0B] = entry("ud2", NONE);
    table[0x0D] = TableEntry::Group(&GROUP_PREFETCH);
    table[0x0E] = TableEntry::Unsupported(UnsupportedClass::Vector);
    table[0x0F] = TableEntry::Escape(EscapeMap::ThreeDNow);

    // SSE moves and conversions
    let mut i = 0x10;
    while i <= 0x17 {
        table[i] = TableEntry::Unsupported(UnsupportedClass::Vector);
        i += 1;
    }
    table[0x18] = TableEntry::Group(&GROUP16);
    let mut i = 0x19;
    while i <= 0x1F {
        table[i] = entry("nop", EV);
        i += 1;
    }
    let mut i = 0x28;
    while i <= 0x2F {
        table[i] = TableEntry::Unsupported(UnsupportedClass::Vector);
        i += 1;
    }

    table[0x30] = entry("wrmsr", NONE);
    table[0x31] = entry("rdtsc", NONE);
    table[0x32] = entry("rdmsr", NONE);
    table[0x33] = entry("rdpmc", NONE);
    table[0x34] = entry("sysenter", NONE);
    table[0x35] = entry("sysexit", NONE);
    table[0x37] = entry("getsec", NONE);
    table[0x38] = TableEntry::Escape(EscapeMap::Map0F38);
    table[0x3A] = TableEntry::Escape(EscapeMap::Map0F3A);

    let mut i = 0;
    while i < 16 {
        table[0x40 + i] = entry(CMOVCC[i], G_E);
        table[0x80 + i] = entry(JCC[i], JZ);
        table[0x90 + i] = entry(SETCC[i], E8);
        i += 1;
    }

    // MMX/SSE arithmetic, shuffles and moves
    let mut i = 0x50;
    while i <= 0x7F {
        table[i] = TableEntry::Unsupported(UnsupportedClass::Vector);
        i += 1;
    }

    table[0xA0] = entry_64("push", &[FixedSegment(Segment::FS)]);
    table[0xA1] = entry_64("pop", &[FixedSegment(Segment::FS)]);
    table[0xA2] = entry("cpuid", NONE);
    table[0xA3] = entry("bt", E_G);
    table[0xA4] = entry("shld", &[Rm(Native), Reg(Native), Imm(Imm8)]);
    table[0xA5] = entry("shld", &[Rm(Native), Reg(Native), Cl]);
    table[0xA8] = entry_64("push", &[FixedSegment(Segment::GS)]);
    table[0xA9] = entry_64("pop", &[FixedSegment(Segment::GS)]);
    table[0xAA] = entry("rsm", NONE);
    table[0xAB] = entry("bts", E_G);
    table[0xAC] = entry("shrd", &[Rm(Native), Reg(Native), Imm(Imm8)]);
    table[0xAD] = entry("shrd", &[Rm(Native), Reg(Native), Cl]);
    table[0xAE] = TableEntry::SplitGroup {
        memory: &GROUP15_MEM,
        register: &GROUP15_REG,
    };
    table[0xAF] = entry("imul", G_E);

    table[0xB0] = entry("cmpxchg", E_G8);
    table[0xB1] = entry("cmpxchg", E_G);
    table[0xB2] = entry("lss", &[Reg(Native), Mem]);
    table[0xB3] = entry("btr", E_G);
    table[0xB4] = entry("lfs", &[Reg(Native), Mem]);
    table[0xB5] = entry("lgs", &[Reg(Native), Mem]);
    table[0xB6] = entry("movzx", &[Reg(Native), Rm(Byte)]);
    table[0xB7] = entry("movzx", &[Reg(Native), Rm(Word)]);
    table[0xB9] = entry("ud1", G_E);
    table[0xBA] = TableEntry::Group(&GROUP8);
    table[0xBB] = entry("btc", E_G);
    table[0xBC] = entry("bsf", G_E);
    table[0xBD] = entry("bsr", G_E);
    table[0xBE] = entry("movsx", &[Reg(Native), Rm(Byte)]);
    table[0xBF] = entry("movsx", &[Reg(Native), Rm(Word)]);

    table[0xC0] = entry("xadd", E_G8);
    table[0xC1] = entry("xadd", E_G);
    let mut i = 0xC2;
    while i <= 0xC6 {
        table[i] = TableEntry::Unsupported(UnsupportedClass::Vector);
        i += 1;
    }
    table[0xC7] = TableEntry::Group(&GROUP9);
    let mut i = 0;
    while i < 8 {
        table[0xC8 + i] = entry("bswap", ZV);
        i += 1;
    }

    let mut i = 0xD0;
    while i <= 0xFE {
        table[i] = TableEntry::Unsupported(UnsupportedClass::Vector);
        i += 1;
    }
    table[0xFF] = entry("ud0", G_E);

    table
};

/// `F3 90`
pub static PAUSE: OpcodeDescriptor = OpcodeDescriptor::new("pause", NONE).with_mandatory_rep();

/// `REX.B 90`: the r8 form of `xchg r, rax`, not a nop.
pub static XCHG_ACC: OpcodeDescriptor = OpcodeDescriptor::new("xchg", &[OpcodeReg(Native), Acc(Native)]);

/// `F3 0F 1E FA`
pub static ENDBR64: OpcodeDescriptor = OpcodeDescriptor::new("endbr64", NONE)
    .with_modrm()
    .with_mandatory_rep();

/// `F3 0F 1E FB`
pub static ENDBR32: OpcodeDescriptor = OpcodeDescriptor::new("endbr32", NONE)
    .with_modrm()
    .with_mandatory_rep();

/// `F3 0F B8`
pub static POPCNT: OpcodeDescriptor = OpcodeDescriptor::new("popcnt", G_E).with_mandatory_rep();

/// `F3 0F BC`, which decodes as `bsf` without the prefix.
pub static TZCNT: OpcodeDescriptor = OpcodeDescriptor::new("tzcnt", G_E).with_mandatory_rep();

/// `F3 0F BD`, which decodes as `bsr` without the prefix.
pub static LZCNT: OpcodeDescriptor = OpcodeDescriptor::new("lzcnt", G_E).with_mandatory_rep();

/// `67 E3`: the counter is `ecx` under a 32-bit address size.
pub static JECXZ: OpcodeDescriptor = OpcodeDescriptor::new("jecxz", JB).with_default_64();

/// Looks up an opcode byte in one of the maps.
pub fn lookup(map: OpcodeMap, opcode: u8) -> &'static TableEntry {
    match map {
        OpcodeMap::Primary => &PRIMARY_MAP[opcode as usize],
        OpcodeMap::TwoByte => &TWO_BYTE_MAP[opcode as usize],
    }
}

/// Encodings whose meaning depends on a prefix or on the exact byte after
/// the opcode, checked before the regular table entry.
///
/// `next` is the byte following the opcode, if any.
pub fn lookup_special(
    map: OpcodeMap,
    opcode: u8,
    prefixes: &PrefixSet,
    next: Option<u8>,
) -> Option<&'static OpcodeDescriptor> {
    match (map, opcode) {
        (OpcodeMap::Primary, 0x90) if prefixes.rex_b() => Some(&XCHG_ACC),
        (OpcodeMap::Primary, 0x90) if prefixes.repeat == RepeatKind::Rep => Some(&PAUSE),
        (OpcodeMap::Primary, 0xE3) if prefixes.address_size => Some(&JECXZ),
        (OpcodeMap::TwoByte, 0xB8) if prefixes.repeat == RepeatKind::Rep => Some(&POPCNT),
        (OpcodeMap::TwoByte, 0xBC) if prefixes.repeat == RepeatKind::Rep => Some(&TZCNT),
        (OpcodeMap::TwoByte, 0xBD) if prefixes.repeat == RepeatKind::Rep => Some(&LZCNT),
        (OpcodeMap::TwoByte, 0x1E) if prefixes.repeat == RepeatKind::Rep => match next {
            Some(0xFA) => Some(&ENDBR64),
            Some(0xFB) => Some(&ENDBR32),
            _ => None,
        },
        _ => None,
    }
}
