//! Intel-syntax operand and instruction formatting.

use crate::{Immediate, Instruction, MemoryRef, Operand, Register};

/// Formatter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormatterOptions {
    /// Render mnemonics, prefixes and register names in upper case.
    pub uppercase: bool,
    /// Prefix memory operands with their access size (`qword ptr`).
    pub memory_size: bool,
    /// Emit `lock`/`rep`/`repz`/`repnz` before the mnemonic.
    pub prefix_keywords: bool,
    /// Append the resolved RIP-relative address as a trailing comment when
    /// the instruction address is known.
    pub rip_comments: bool,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        Self {
            uppercase: false,
            memory_size: true,
            prefix_keywords: true,
            rip_comments: true,
        }
    }
}

/// Renders operands into register/memory text.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperandFormatter {
    options: FormatterOptions,
}

impl OperandFormatter {
    pub fn new(options: FormatterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormatterOptions {
        &self.options
    }

    fn case(&self, text: &str) -> String {
        if self.options.uppercase {
            text.to_uppercase()
        } else {
            text.to_string()
        }
    }

    /// Returns the canonical register name.
    pub fn register(&self, reg: Register) -> String {
        self.case(reg.name())
    }

    /// Renders an immediate as hex, with a leading minus for negative signed values.
    pub fn immediate(&self, imm: &Immediate) -> String {
        if imm.signed && imm.value < 0 {
            format!("-{:#x}", -imm.value)
        } else {
            format!("{:#x}", imm.value)
        }
    }

    /// Renders a memory operand, omitting every absent or zero term.
    pub fn memory(&self, mem: &MemoryRef) -> String {
        let mut out = String::new();

        if self.options.memory_size {
            if let Some(keyword) = size_keyword(mem.size) {
                out.push_str(&self.case(keyword));
                out.push_str(&self.case(" ptr "));
            }
        }

        if let Some(segment) = mem.segment {
            out.push_str(&self.case(segment.name()));
            out.push(':');
        }

        out.push('[');
        let mut has_content = false;

        if let Some(base) = mem.base {
            out.push_str(&self.register(base));
            has_content = true;
        }

        if let Some(index) = mem.index {
            if has_content {
                out.push_str(" + ");
            }
            out.push_str(&self.register(index));
            if mem.scale > 1 {
                out.push_str(&format!("*{}", mem.scale));
            }
            has_content = true;
        }

        if has_content {
            if mem.displacement > 0 {
                out.push_str(&format!(" + {:#x}", mem.displacement));
            } else if mem.displacement < 0 {
                out.push_str(&format!(" - {:#x}", -(mem.displacement as i128)));
            }
        } else {
            out.push_str(&format!("{:#x}", mem.displacement as u64));
        }

        out.push(']');
        out
    }

    /// Renders one operand of `insn`.
    ///
    /// Relative operands without a resolved target are shown as `$±n`,
    /// counted from the start of the instruction.
    pub fn operand(&self, operand: &Operand, insn: &Instruction) -> String {
        match operand {
            Operand::Register(reg) => self.register(*reg),
            Operand::Immediate(imm) => self.immediate(imm),
            Operand::Memory(mem) => self.memory(mem),
            Operand::Relative {
                target: Some(target),
                ..
            } => format!("{:#x}", target),
            Operand::Relative {
                displacement,
                target: None,
            } => {
                let delta = insn.length as i64 + displacement;
                match delta {
                    0 => "$".to_string(),
                    d if d > 0 => format!("$+{:#x}", d),
                    d => format!("$-{:#x}", -(d as i128)),
                }
            }
        }
    }

    /// Renders every operand of `insn`, in order.
    pub fn format_operands(&self, insn: &Instruction) -> Vec<String> {
        insn.operands
            .iter()
            .map(|op| self.operand(op, insn))
            .collect()
    }

    /// Renders the whole instruction: prefix keywords, mnemonic and operands.
    pub fn format_instruction(&self, insn: &Instruction) -> String {
        let mut out = String::new();

        if self.options.prefix_keywords {
            if insn.prefixes.lock {
                out.push_str(&self.case("lock "));
            }
            if let Some(keyword) = insn.prefixes.repeat.keyword() {
                out.push_str(&self.case(keyword));
                out.push(' ');
            }
        }

        out.push_str(&self.case(&insn.mnemonic));

        let operands = self.format_operands(insn);
        if !operands.is_empty() {
            out.push(' ');
            out.push_str(&operands.join(", "));
        }

        if self.options.rip_comments {
            if let Some(target) = insn.rip_target() {
                out.push_str(&format!("  # {:#x}", target));
            }
        }

        out
    }
}

fn size_keyword(size: u8) -> Option<&'static str> {
    match size {
        1 => Some("byte"),
        2 => Some("word"),
        4 => Some("dword"),
        6 => Some("fword"),
        8 => Some("qword"),
        10 => Some("tbyte"),
        16 => Some("xmmword"),
        _ => None,
    }
}
