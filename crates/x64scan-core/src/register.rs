//! x86-64 register representation.

/// Register class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegisterClass {
    /// General purpose register (rax, r8d, al, ah, ...)
    General,
    /// Instruction pointer (rip, eip)
    ProgramCounter,
    /// Segment register (cs, ds, ...)
    Segment,
}

/// A register operand or addressing component.
///
/// `id` is one of the constants in [`x86`]; `size` is the access width in
/// bits. The same `id` names `rax`, `eax`, `ax` and `al` at different sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Register {
    /// The class of register.
    pub class: RegisterClass,
    /// Register ID (see [`x86`]).
    pub id: u16,
    /// Size of the access in bits.
    pub size: u16,
}

// x86-64 register IDs
pub mod x86 {
    // GPRs, numbered by their 4-bit encoding
    pub const RAX: u16 = 0;
    pub const RCX: u16 = 1;
    pub const RDX: u16 = 2;
    pub const RBX: u16 = 3;
    pub const RSP: u16 = 4;
    pub const RBP: u16 = 5;
    pub const RSI: u16 = 6;
    pub const RDI: u16 = 7;
    pub const R8: u16 = 8;
    pub const R9: u16 = 9;
    pub const R10: u16 = 10;
    pub const R11: u16 = 11;
    pub const R12: u16 = 12;
    pub const R13: u16 = 13;
    pub const R14: u16 = 14;
    pub const R15: u16 = 15;

    // Instruction pointer
    pub const RIP: u16 = 16;

    // Legacy high-byte registers, only encodable without REX
    pub const AH: u16 = 20;
    pub const CH: u16 = 21;
    pub const DH: u16 = 22;
    pub const BH: u16 = 23;

    // Segment registers
    pub const CS: u16 = 32;
    pub const DS: u16 = 33;
    pub const ES: u16 = 34;
    pub const FS: u16 = 35;
    pub const GS: u16 = 36;
    pub const SS: u16 = 37;
}

const GPR64: [&str; 16] = [
    "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi", "r8", "r9", "r10", "r11", "r12", "r13",
    "r14", "r15",
];

const GPR32: [&str; 16] = [
    "eax", "ecx", "edx", "ebx", "esp", "ebp", "esi", "edi", "r8d", "r9d", "r10d", "r11d", "r12d",
    "r13d", "r14d", "r15d",
];

const GPR16: [&str; 16] = [
    "ax", "cx", "dx", "bx", "sp", "bp", "si", "di", "r8w", "r9w", "r10w", "r11w", "r12w", "r13w",
    "r14w", "r15w",
];

const GPR8: [&str; 16] = [
    "al", "cl", "dl", "bl", "spl", "bpl", "sil", "dil", "r8b", "r9b", "r10b", "r11b", "r12b",
    "r13b", "r14b", "r15b",
];

impl Register {
    /// Creates a new register.
    pub fn new(class: RegisterClass, id: u16, size: u16) -> Self {
        Self { class, id, size }
    }

    /// Creates a general purpose register from its 4-bit encoding.
    ///
    /// Encodings 4-7 at byte size select `ah`/`ch`/`dh`/`bh` when no REX
    /// prefix is present and `spl`/`bpl`/`sil`/`dil` when one is.
    pub fn gpr(index: u8, size: u16, rex_present: bool) -> Self {
        let index = (index & 0x0F) as u16;
        if size == 8 && !rex_present && (4..8).contains(&index) {
            return Self::new(RegisterClass::General, x86::AH + (index - 4), 8);
        }
        Self::new(RegisterClass::General, index, size)
    }

    /// Creates the instruction pointer register at the given address size.
    pub fn rip(size: u16) -> Self {
        Self::new(RegisterClass::ProgramCounter, x86::RIP, size)
    }

    /// Returns true for `rip`/`eip`.
    pub fn is_instruction_pointer(&self) -> bool {
        self.class == RegisterClass::ProgramCounter
    }

    /// Returns the canonical Intel-syntax name for this register.
    pub fn name(&self) -> &'static str {
        match self.class {
            RegisterClass::General => gpr_name(self.id, self.size),
            RegisterClass::ProgramCounter => match self.size {
                32 => "eip",
                _ => "rip",
            },
            RegisterClass::Segment => match self.id {
                x86::CS => "cs",
                x86::DS => "ds",
                x86::ES => "es",
                x86::FS => "fs",
                x86::GS => "gs",
                x86::SS => "ss",
                _ => "unknown",
            },
        }
    }
}

fn gpr_name(id: u16, size: u16) -> &'static str {
    match id {
        x86::AH => "ah",
        x86::CH => "ch",
        x86::DH => "dh",
        x86::BH => "bh",
        0..=15 => {
            let i = id as usize;
            match size {
                64 => GPR64[i],
                32 => GPR32[i],
                16 => GPR16[i],
                8 => GPR8[i],
                _ => "unknown",
            }
        }
        _ => "unknown",
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
