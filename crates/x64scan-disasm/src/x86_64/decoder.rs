//! x86-64 instruction decoder.
//!
//! Each instruction is decoded by an explicit state machine:
//!
//! ```text
//! Start -> ScanningPrefixes -> Opcode -> (ModRmSib) -> (Displacement) -> Immediate -> Complete
//! ```
//!
//! Every stage either names the next stage or emits a record. A failing
//! stage emits a [`DecodeError`] that says how many bytes to skip, and the
//! [`Decoder`] moves its cursor past them before the next pass.

use std::iter::FusedIterator;

use tracing::{debug, trace};
use x64scan_core::{Instruction, MemoryRef, Operand, PrefixSet, Register, RepeatKind, Segment};

use super::modrm::{self, MemoryPlan, ModRm, Sib};
use super::opcodes::{
    self, GroupTable, ImmediateKind, OpcodeDescriptor, OpcodeMap, OperandKind, TableEntry,
};
use super::prefix::scan_prefixes;
use crate::cursor::ByteCursor;
use crate::error::{DecodeError, DecodeErrorKind, OutOfBounds};
use crate::options::DecoderOptions;
use crate::traits::{DecodedInstruction, Disassembler};

/// Decoding stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    ScanningPrefixes,
    Opcode,
    ModRmSib,
    Displacement,
    /// Reads trailing immediate, branch and moffs fields and assembles operands.
    Immediate,
    Complete,
}

/// Outcome of one stage.
enum Transition {
    Next(State),
    Emit(Result<Instruction, DecodeError>),
}

/// Instruction under construction.
#[derive(Debug)]
struct Pending {
    start: usize,
    prefixes: PrefixSet,
    map: OpcodeMap,
    opcode: u8,
    /// Position of the first opcode byte (0x0F for two-byte opcodes).
    opcode_offset: usize,
    /// Position just past the last opcode byte.
    opcode_end: usize,
    /// Memory and register tables of a group entry, selected by ModR/M.
    group: Option<(&'static GroupTable, &'static GroupTable)>,
    descriptor: Option<&'static OpcodeDescriptor>,
    modrm: Option<ModRm>,
    plan: Option<MemoryPlan>,
    memory: Option<MemoryRef>,
    operands: Vec<Operand>,
}

impl Pending {
    fn new(start: usize) -> Self {
        Self {
            start,
            prefixes: PrefixSet::default(),
            map: OpcodeMap::Primary,
            opcode: 0,
            opcode_offset: start,
            opcode_end: start,
            group: None,
            descriptor: None,
            modrm: None,
            plan: None,
            memory: None,
            operands: Vec::new(),
        }
    }

    /// Bytes covered by prefixes and opcode.
    fn opcode_consumed(&self) -> usize {
        (self.opcode_end - self.start).max(1)
    }

    fn unknown_opcode(&self) -> DecodeError {
        DecodeError::unknown_opcode(
            self.map,
            self.opcode,
            self.opcode_end.saturating_sub(1),
            self.start,
            self.opcode_consumed(),
        )
    }

    fn descriptor(&self) -> Result<&'static OpcodeDescriptor, DecodeError> {
        self.descriptor.ok_or_else(|| self.unknown_opcode())
    }

    fn operand_size(&self, desc: &OpcodeDescriptor) -> u16 {
        self.prefixes.operand_size(desc.default_64)
    }
}

/// Lazy sequence of decode results over one buffer.
///
/// Every record consumes at least one byte, and the bytes consumed by all
/// records add up to the buffer length. The sequence ends at the end of the
/// buffer or after a truncated instruction.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    cursor: ByteCursor<'a>,
    options: DecoderOptions,
    done: bool,
}

impl<'a> Decoder<'a> {
    pub fn new(bytes: &'a [u8], options: DecoderOptions) -> Self {
        Self {
            cursor: ByteCursor::new(bytes),
            options,
            done: false,
        }
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Buffer offset where the next record starts.
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    fn truncated(&self, start: usize) -> impl Fn(OutOfBounds) -> DecodeError {
        let len = self.cursor.buffer().len();
        move |err| DecodeError::out_of_bounds(err, start, len)
    }

    /// Runs the state machine once, from the current position to one record.
    fn decode_one(&mut self) -> Result<Instruction, DecodeError> {
        let mut pending = Pending::new(self.cursor.position());
        let mut state = State::Start;

        let result = loop {
            match self.step(state, &mut pending) {
                Transition::Next(next) => {
                    trace!(offset = pending.start, from = ?state, to = ?next, "transition");
                    state = next;
                }
                Transition::Emit(result) => break result,
            }
        };

        match &result {
            Ok(insn) => self.cursor.set_position(insn.end_offset()),
            Err(err) => {
                debug!(
                    offset = err.offset,
                    start = err.start,
                    consumed = err.bytes_consumed,
                    kind = %err.kind,
                    "decode error"
                );
                self.cursor.set_position(err.start + err.bytes_consumed.max(1));
                if err.is_terminal() {
                    self.done = true;
                }
            }
        }

        result
    }

    fn step(&mut self, state: State, p: &mut Pending) -> Transition {
        let next = match state {
            State::Start => {
                p.start = self.cursor.position();
                Ok(State::ScanningPrefixes)
            }
            State::ScanningPrefixes => {
                p.prefixes = scan_prefixes(&mut self.cursor);
                p.opcode_offset = self.cursor.position();
                Ok(State::Opcode)
            }
            State::Opcode => self.read_opcode(p),
            State::ModRmSib => self.read_modrm(p),
            State::Displacement => self.read_displacement(p),
            State::Immediate => self.read_operands(p),
            State::Complete => return Transition::Emit(self.complete(p)),
        };

        match next {
            Ok(state) => Transition::Next(state),
            Err(err) => Transition::Emit(Err(err)),
        }
    }

    fn read_opcode(&mut self, p: &mut Pending) -> Result<State, DecodeError> {
        let truncated = self.truncated(p.start);
        let first = self.cursor.read_u8().map_err(&truncated)?;
        let (map, opcode) = if first == 0x0F {
            (OpcodeMap::TwoByte, self.cursor.read_u8().map_err(&truncated)?)
        } else {
            (OpcodeMap::Primary, first)
        };
        p.map = map;
        p.opcode = opcode;
        p.opcode_end = self.cursor.position();

        let next = self.cursor.peek().ok();
        if let Some(desc) = opcodes::lookup_special(map, opcode, &p.prefixes, next) {
            p.descriptor = Some(desc);
            return Ok(after_opcode(desc));
        }

        let entry = opcodes::lookup(map, opcode);
        match entry {
            TableEntry::Op(desc) => {
                p.descriptor = Some(desc);
                Ok(after_opcode(desc))
            }
            TableEntry::Group(table) => {
                p.group = Some((*table, *table));
                Ok(State::ModRmSib)
            }
            TableEntry::SplitGroup { memory, register } => {
                p.group = Some((*memory, *register));
                Ok(State::ModRmSib)
            }
            // The scanner takes every prefix up to REX, so this byte follows REX.
            TableEntry::Prefix => Err(DecodeError::new(
                DecodeErrorKind::MisplacedPrefix { byte: first },
                p.opcode_offset,
                p.start,
                (p.opcode_offset - p.start).max(1),
            )),
            TableEntry::Escape(escape) => Err(DecodeError::new(
                DecodeErrorKind::UnsupportedEscapeMap(*escape),
                p.opcode_offset,
                p.start,
                p.opcode_consumed(),
            )),
            TableEntry::Unsupported(class) => Err(DecodeError::new(
                DecodeErrorKind::UnsupportedInstruction {
                    class: *class,
                    map,
                    opcode,
                },
                p.opcode_end - 1,
                p.start,
                p.opcode_consumed(),
            )),
            TableEntry::Invalid | TableEntry::TwoByteEscape => Err(p.unknown_opcode()),
        }
    }

    fn read_modrm(&mut self, p: &mut Pending) -> Result<State, DecodeError> {
        let truncated = self.truncated(p.start);
        let modrm = ModRm(self.cursor.read_u8().map_err(&truncated)?);
        p.modrm = Some(modrm);

        if let Some((memory, register)) = p.group {
            let table = if modrm.is_register() { register } else { memory };
            p.descriptor = table[modrm.reg() as usize].as_ref();
        }
        let desc = p.descriptor()?;

        if modrm.is_register() && desc.memory_only() {
            return Err(p.unknown_opcode());
        }
        let uses_segment = desc
            .operands
            .iter()
            .any(|op| matches!(op, OperandKind::SegmentReg));
        if uses_segment {
            let segment = Segment::from_encoding(modrm.reg());
            // `cs` can be read but never loaded with `mov`.
            let loads_cs = matches!(desc.operands.first(), Some(OperandKind::SegmentReg))
                && segment == Some(Segment::CS);
            if segment.is_none() || loads_cs {
                return Err(p.unknown_opcode());
            }
        }

        if modrm.is_register() {
            return Ok(State::Immediate);
        }

        let sib = if modrm.needs_sib() {
            Some(Sib(self.cursor.read_u8().map_err(&truncated)?))
        } else {
            None
        };
        p.plan = Some(modrm::memory_plan(modrm, sib, &p.prefixes));
        Ok(State::Displacement)
    }

    fn read_displacement(&mut self, p: &mut Pending) -> Result<State, DecodeError> {
        let Some(plan) = p.plan else {
            return Ok(State::Immediate);
        };
        let displacement = modrm::read_displacement(&mut self.cursor, plan.displacement_size)
            .map_err(self.truncated(p.start))?;
        p.memory = Some(
            MemoryRef::sib(plan.base, plan.index, plan.scale, displacement, 0)
                .with_segment(p.prefixes.segment),
        );
        Ok(State::Immediate)
    }

    fn read_operands(&mut self, p: &mut Pending) -> Result<State, DecodeError> {
        let desc = p.descriptor()?;
        let operand_size = p.operand_size(desc);

        let mut operands = Vec::with_capacity(desc.operand_count());
        for kind in desc.operands {
            operands.push(self.operand(p, *kind, operand_size)?);
        }
        p.operands = operands;
        Ok(State::Complete)
    }

    fn operand(&mut self, p: &Pending, kind: OperandKind, operand_size: u16) -> Result<Operand, DecodeError> {
        let truncated = self.truncated(p.start);
        let rex = p.prefixes.has_rex();

        let operand = match kind {
            OperandKind::Reg(width) => {
                let modrm = p.modrm.ok_or_else(|| p.unknown_opcode())?;
                let index = modrm::reg_index(modrm, &p.prefixes);
                Operand::reg(Register::gpr(index, width.bits(operand_size), rex))
            }
            OperandKind::Rm(width) => {
                let bits = width.bits(operand_size);
                match (&p.memory, p.modrm) {
                    (Some(mem), _) => Operand::Memory(mem.clone().with_size((bits / 8) as u8)),
                    (None, Some(modrm)) => {
                        let index = modrm::rm_index(modrm, &p.prefixes);
                        Operand::reg(Register::gpr(index, bits, rex))
                    }
                    (None, None) => return Err(p.unknown_opcode()),
                }
            }
            OperandKind::Mem => {
                let mem = p.memory.clone().ok_or_else(|| p.unknown_opcode())?;
                Operand::Memory(mem)
            }
            OperandKind::OpcodeReg(width) => {
                let index = (p.opcode & 0x7) | ((p.prefixes.rex_b() as u8) << 3);
                Operand::reg(Register::gpr(index, width.bits(operand_size), rex))
            }
            OperandKind::Acc(width) => Operand::reg(Register::gpr(0, width.bits(operand_size), rex)),
            OperandKind::Cl => Operand::reg(Register::gpr(1, 8, false)),
            OperandKind::Dx => Operand::reg(Register::gpr(2, 16, false)),
            OperandKind::One => Operand::imm_unsigned(1, 8),
            OperandKind::SegmentReg => {
                let segment = p
                    .modrm
                    .and_then(|modrm| Segment::from_encoding(modrm.reg()))
                    .ok_or_else(|| p.unknown_opcode())?;
                Operand::reg(segment.register())
            }
            OperandKind::FixedSegment(segment) => Operand::reg(segment.register()),
            OperandKind::Imm(imm) => self.immediate(imm, operand_size).map_err(&truncated)?,
            OperandKind::Rel8 => {
                let displacement = self.cursor.read_i8().map_err(&truncated)?;
                Operand::relative(displacement as i64, None)
            }
            OperandKind::Rel32 => {
                let displacement = self.cursor.read_i32().map_err(&truncated)?;
                Operand::relative(displacement as i64, None)
            }
            OperandKind::Moffs(width) => {
                let address = if p.prefixes.address_size {
                    self.cursor.read_u32().map_err(&truncated)? as u64
                } else {
                    self.cursor.read_u64().map_err(&truncated)?
                };
                let size = (width.bits(operand_size) / 8) as u8;
                Operand::Memory(MemoryRef::absolute(address as i64, size).with_segment(p.prefixes.segment))
            }
        };

        Ok(operand)
    }

    fn immediate(&mut self, kind: ImmediateKind, operand_size: u16) -> Result<Operand, OutOfBounds> {
        let size = kind.size(operand_size);
        let raw = match size {
            1 => self.cursor.read_u8()? as u64,
            2 => self.cursor.read_u16()? as u64,
            4 => self.cursor.read_u32()? as u64,
            _ => self.cursor.read_u64()?,
        };
        let bits = (size * 8) as u8;

        // imm8 sign-extends; imm32 sign-extends to 64 bits under REX.W.
        let signed = match kind {
            ImmediateKind::Imm8Sext => true,
            ImmediateKind::Imm32 => operand_size == 64,
            _ => false,
        };
        if signed {
            let shift = 64 - u32::from(bits);
            let value = ((raw << shift) as i64) >> shift;
            Ok(Operand::imm(value as i128, bits))
        } else {
            Ok(Operand::imm_unsigned(raw, bits))
        }
    }

    fn complete(&mut self, p: &mut Pending) -> Result<Instruction, DecodeError> {
        let desc = p.descriptor()?;
        let length = self.cursor.position() - p.start;

        let limit = self.options.max_instruction_length;
        if length > limit {
            return Err(DecodeError::new(
                DecodeErrorKind::InstructionTooLong { length, limit },
                p.start,
                p.start,
                p.opcode_consumed(),
            ));
        }

        let mut prefixes = p.prefixes;
        if desc.mandatory_rep {
            prefixes.repeat = RepeatKind::None;
        } else if prefixes.repeat == RepeatKind::Rep && desc.compare_string {
            prefixes.repeat = RepeatKind::Repz;
        }

        let address = self.options.address_of(p.start);
        let end = address.map(|a| a.wrapping_add(length as u64));
        let mut operands = std::mem::take(&mut p.operands);
        for operand in &mut operands {
            if let Operand::Relative {
                displacement,
                target,
            } = operand
            {
                *target = end.map(|e| e.wrapping_add(*displacement as u64));
            }
        }

        let bytes = self.cursor.buffer()[p.start..p.start + length].to_vec();
        let mnemonic = desc.mnemonic.select(p.operand_size(desc));

        Ok(Instruction::new(p.start, bytes, mnemonic)
            .with_address(address)
            .with_operands(operands)
            .with_prefixes(prefixes))
    }
}

fn after_opcode(desc: &OpcodeDescriptor) -> State {
    if desc.modrm {
        State::ModRmSib
    } else {
        State::Immediate
    }
}

impl Iterator for Decoder<'_> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.cursor.is_empty() {
            return None;
        }
        Some(self.decode_one())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            (0, Some(self.cursor.remaining()))
        }
    }
}

impl FusedIterator for Decoder<'_> {}

/// Decodes `bytes` with default options.
pub fn decode(bytes: &[u8]) -> Decoder<'_> {
    Decoder::new(bytes, DecoderOptions::default())
}

/// x86-64 instruction decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct X86_64Disassembler {
    options: DecoderOptions,
}

impl X86_64Disassembler {
    /// Creates a new x86-64 disassembler with default options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DecoderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }
}

impl Disassembler for X86_64Disassembler {
    fn decode_instruction(&self, bytes: &[u8], address: u64) -> Result<DecodedInstruction, DecodeError> {
        let options = self.options.with_base_address(address);
        match Decoder::new(bytes, options).next() {
            Some(Ok(instruction)) => Ok(DecodedInstruction {
                size: instruction.length,
                instruction,
            }),
            Some(Err(err)) => Err(err),
            None => Err(DecodeError::out_of_bounds(
                OutOfBounds {
                    offset: 0,
                    needed: 1,
                    available: 0,
                },
                0,
                0,
            )),
        }
    }

    fn min_instruction_size(&self) -> usize {
        1
    }

    fn max_instruction_size(&self) -> usize {
        self.options.max_instruction_length
    }

    fn is_fixed_width(&self) -> bool {
        false
    }

    fn disassemble_block(&self, bytes: &[u8], start_address: u64) -> Vec<Result<Instruction, DecodeError>> {
        Decoder::new(bytes, self.options.with_base_address(start_address)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x86_64::opcodes::{EscapeMap, UnsupportedClass};

    fn decode_all(bytes: &[u8]) -> Vec<Result<Instruction, DecodeError>> {
        decode(bytes).collect()
    }

    /// Decodes a buffer holding exactly one instruction.
    fn one(bytes: &[u8]) -> Instruction {
        let records = decode_all(bytes);
        assert_eq!(records.len(), 1, "{:?}", records);
        records.into_iter().next().unwrap().unwrap()
    }

    fn text(bytes: &[u8]) -> String {
        one(bytes).to_string()
    }

    fn consumed(record: &Result<Instruction, DecodeError>) -> usize {
        match record {
            Ok(insn) => insn.length,
            Err(err) => err.bytes_consumed,
        }
    }

    #[test]
    fn test_mov_rip_relative() {
        let insn = one(&[0x48, 0x8b, 0x05, 0x1e, 0x00, 0x00, 0x00]);
        assert_eq!(insn.mnemonic, "mov");
        assert_eq!(insn.length, 7);
        assert_eq!(insn.operands[0].as_register().unwrap().name(), "rax");
        let mem = insn.operands[1].as_memory().unwrap();
        assert!(mem.is_rip_relative());
        assert_eq!(mem.displacement, 0x1e);
        assert_eq!(insn.to_string(), "mov rax, qword ptr [rip + 0x1e]");
    }

    #[test]
    fn test_rip_target_with_base_address() {
        let bytes = [0x48, 0x8b, 0x05, 0x1e, 0x00, 0x00, 0x00];
        let options = DecoderOptions::default().with_base_address(0x1000);
        let insn = Decoder::new(&bytes, options).next().unwrap().unwrap();
        assert_eq!(insn.rip_target(), Some(0x1025));
        assert_eq!(insn.to_string(), "mov rax, qword ptr [rip + 0x1e]  # 0x1025");
    }

    #[test]
    fn test_eip_target_wraps() {
        let bytes = [0x67, 0x8b, 0x05, 0x20, 0x00, 0x00, 0x00];
        let options = DecoderOptions::default().with_base_address(0xFFFF_FFF0);
        let insn = Decoder::new(&bytes, options).next().unwrap().unwrap();
        assert_eq!(insn.rip_target(), Some(0x17));
    }

    #[test]
    fn test_inc_with_rex() {
        let insn = one(&[0x48, 0xff, 0xc0]);
        assert_eq!(insn.length, 3);
        assert_eq!(insn.to_string(), "inc rax");
    }

    #[test]
    fn test_push_register() {
        let insn = one(&[0x50]);
        assert_eq!(insn.mnemonic, "push");
        assert_eq!(insn.length, 1);
        assert_eq!(insn.to_string(), "push rax");
        assert_eq!(text(&[0x41, 0x57]), "push r15");
    }

    #[test]
    fn test_prologue_epilogue() {
        let records = decode_all(&[0x55, 0x48, 0x89, 0xe5, 0x48, 0x83, 0xec, 0x10, 0xc9, 0xc3]);
        let text: Vec<String> = records.into_iter().map(|r| r.unwrap().to_string()).collect();
        assert_eq!(text, ["push rbp", "mov rbp, rsp", "sub rsp, 0x10", "leave", "ret"]);
    }

    #[test]
    fn test_escape_map_is_skipped() {
        let records = decode_all(&[0x0f, 0x38, 0x00]);
        assert_eq!(records.len(), 2);

        let err = records[0].as_ref().unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::UnsupportedEscapeMap(EscapeMap::Map0F38));
        assert_eq!(err.offset, 0);
        assert_eq!(err.bytes_consumed, 2);

        // Decoding resumes at offset 2 with the lone 0x00.
        let err = records[1].as_ref().unwrap_err();
        assert_eq!(err.start, 2);
        assert!(matches!(err.kind, DecodeErrorKind::OutOfBounds { .. }));
    }

    #[test]
    fn test_truncated_displacement_ends_sequence() {
        // mov eax, [rax + disp32] with one displacement byte present
        let records = decode_all(&[0x8b, 0x80, 0x00]);
        assert_eq!(records.len(), 1);
        let err = records[0].as_ref().unwrap_err();
        assert_eq!(
            err.kind,
            DecodeErrorKind::OutOfBounds {
                needed: 4,
                available: 1
            }
        );
        assert_eq!(err.offset, 2);
        assert_eq!(err.bytes_consumed, 3);
    }

    #[test]
    fn test_every_single_byte_yields_one_record() {
        for byte in 0u8..=0xff {
            let records = decode_all(&[byte]);
            assert_eq!(records.len(), 1, "byte {:#04x}", byte);
            assert_eq!(consumed(&records[0]), 1, "byte {:#04x}", byte);
        }
    }

    #[test]
    fn test_string_repeat_classification() {
        let insn = one(&[0xf3, 0xa4]);
        assert_eq!(insn.prefixes.repeat, RepeatKind::Rep);
        assert_eq!(insn.to_string(), "rep movsb");

        let insn = one(&[0xf3, 0xa6]);
        assert_eq!(insn.prefixes.repeat, RepeatKind::Repz);
        assert_eq!(insn.to_string(), "repz cmpsb");

        assert_eq!(text(&[0xf2, 0xae]), "repnz scasb");
        assert_eq!(text(&[0xf3, 0x48, 0xab]), "rep stosq");
        assert_eq!(text(&[0x66, 0xa5]), "movsw");
        assert_eq!(text(&[0x48, 0xa5]), "movsq");
    }

    #[test]
    fn test_nop_variants() {
        assert_eq!(text(&[0x90]), "nop");

        let pause = one(&[0xf3, 0x90]);
        assert_eq!(pause.to_string(), "pause");
        assert_eq!(pause.prefixes.repeat, RepeatKind::None);

        assert_eq!(text(&[0x49, 0x90]), "xchg r8, rax");
        assert_eq!(text(&[0x0f, 0x1f, 0x40, 0x00]), "nop dword ptr [rax]");
    }

    #[test]
    fn test_endbr64() {
        let insn = one(&[0xf3, 0x0f, 0x1e, 0xfa]);
        assert_eq!(insn.to_string(), "endbr64");
        assert_eq!(insn.length, 4);
    }

    #[test]
    fn test_bit_count_forms() {
        let tzcnt = one(&[0xf3, 0x0f, 0xbc, 0xc0]);
        assert_eq!(tzcnt.to_string(), "tzcnt eax, eax");
        assert_eq!(tzcnt.prefixes.repeat, RepeatKind::None);

        assert_eq!(text(&[0xf3, 0x48, 0x0f, 0xbd, 0xc1]), "lzcnt rax, rcx");
        assert_eq!(text(&[0xf3, 0x0f, 0xb8, 0xc0]), "popcnt eax, eax");

        assert_eq!(text(&[0x0f, 0xbc, 0xc0]), "bsf eax, eax");
        assert_eq!(text(&[0x0f, 0xbd, 0xc1]), "bsr eax, ecx");
        let err = decode_all(&[0x0f, 0xb8, 0xc0]).remove(0).unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::UnknownOpcode { .. }));
    }

    #[test]
    fn test_misplaced_prefix_after_rex() {
        let records = decode_all(&[0x48, 0x66, 0x90]);
        assert_eq!(records.len(), 2);

        let err = records[0].as_ref().unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::MisplacedPrefix { byte: 0x66 });
        assert_eq!(err.offset, 1);
        assert_eq!(err.bytes_consumed, 1);

        let nop = records[1].as_ref().unwrap();
        assert_eq!(nop.offset, 1);
        assert_eq!(nop.length, 2);
        assert_eq!(nop.mnemonic, "nop");
    }

    #[test]
    fn test_unknown_group_extension() {
        let records = decode_all(&[0x48, 0xff, 0xff]);
        let err = records[0].as_ref().unwrap_err();
        assert_eq!(
            err.kind,
            DecodeErrorKind::UnknownOpcode {
                map: OpcodeMap::Primary,
                opcode: 0xff
            }
        );
        assert_eq!(err.offset, 1);
        assert_eq!(err.bytes_consumed, 2);
        assert_eq!(records.iter().map(consumed).sum::<usize>(), 3);
    }

    #[test]
    fn test_invalid_in_long_mode() {
        let err = decode_all(&[0x06]).remove(0).unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::UnknownOpcode { opcode: 0x06, .. }));
        assert_eq!(err.bytes_consumed, 1);
    }

    #[test]
    fn test_unsupported_classes() {
        let records = decode_all(&[0xd9, 0xc0]);
        let err = records[0].as_ref().unwrap_err();
        assert_eq!(
            err.kind,
            DecodeErrorKind::UnsupportedInstruction {
                class: UnsupportedClass::X87,
                map: OpcodeMap::Primary,
                opcode: 0xd9
            }
        );
        assert_eq!(err.bytes_consumed, 1);

        let err = decode_all(&[0x66, 0x0f, 0x6f, 0xc1]).remove(0).unwrap_err();
        assert!(matches!(
            err.kind,
            DecodeErrorKind::UnsupportedInstruction {
                class: UnsupportedClass::Vector,
                ..
            }
        ));
        assert_eq!(err.offset, 2);
        assert_eq!(err.bytes_consumed, 3);
    }

    #[test]
    fn test_memory_only_operand_with_register_modrm() {
        let records = decode_all(&[0x48, 0x8d, 0xc0]);
        let err = records[0].as_ref().unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::UnknownOpcode { opcode: 0x8d, .. }));
        assert_eq!(err.bytes_consumed, 2);
    }

    #[test]
    fn test_sib_addressing() {
        assert_eq!(
            text(&[0x48, 0x8b, 0x44, 0x8b, 0xf8]),
            "mov rax, qword ptr [rbx + rcx*4 - 0x8]"
        );
        assert_eq!(text(&[0x48, 0x8d, 0x04, 0x24]), "lea rax, [rsp]");
        assert_eq!(
            text(&[0x64, 0x48, 0x8b, 0x04, 0x25, 0x28, 0x00, 0x00, 0x00]),
            "mov rax, qword ptr fs:[0x28]"
        );
    }

    #[test]
    fn test_address_size_override() {
        assert_eq!(text(&[0x67, 0x8b, 0x00]), "mov eax, dword ptr [eax]");
    }

    #[test]
    fn test_byte_registers() {
        assert_eq!(text(&[0x88, 0xe0]), "mov al, ah");
        assert_eq!(text(&[0x40, 0x88, 0xe0]), "mov al, spl");
        assert_eq!(text(&[0x0f, 0x94, 0xc0]), "sete al");
    }

    #[test]
    fn test_relative_branches() {
        assert_eq!(text(&[0xe8, 0x00, 0x01, 0x00, 0x00]), "call $+0x105");
        assert_eq!(text(&[0xeb, 0xfe]), "jmp $");
        assert_eq!(text(&[0x0f, 0x84, 0xfa, 0xff, 0xff, 0xff]), "je $");
        assert_eq!(text(&[0xe3, 0x00]), "jrcxz $+0x2");
        assert_eq!(text(&[0x67, 0xe3, 0x00]), "jecxz $+0x3");

        let options = DecoderOptions::default().with_base_address(0x401000);
        let insn = Decoder::new(&[0xe8, 0x00, 0x01, 0x00, 0x00], options)
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(insn.to_string(), "call 0x401105");
    }

    #[test]
    fn test_immediates() {
        assert_eq!(text(&[0x48, 0xc7, 0xc0, 0xff, 0xff, 0xff, 0xff]), "mov rax, -0x1");
        assert_eq!(text(&[0xb8, 0x78, 0x56, 0x34, 0x12]), "mov eax, 0x12345678");
        assert_eq!(
            text(&[0x48, 0xb8, 0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11]),
            "mov rax, 0x1122334455667788"
        );
        assert_eq!(text(&[0x83, 0xc0, 0xff]), "add eax, -0x1");
        assert_eq!(text(&[0x66, 0x05, 0x34, 0x12]), "add ax, 0x1234");
        assert_eq!(text(&[0xc2, 0x08, 0x00]), "ret 0x8");
    }

    #[test]
    fn test_shift_groups() {
        assert_eq!(text(&[0xd1, 0xe0]), "shl eax, 0x1");
        assert_eq!(text(&[0x48, 0xd3, 0xe8]), "shr rax, cl");
        assert_eq!(text(&[0xc1, 0xf8, 0x03]), "sar eax, 0x3");
    }

    #[test]
    fn test_moffs() {
        let insn = one(&[0xa1, 0x10, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(insn.length, 9);
        assert_eq!(insn.to_string(), "mov eax, dword ptr [0x10]");

        let insn = one(&[0x67, 0xa2, 0x20, 0, 0, 0]);
        assert_eq!(insn.to_string(), "mov byte ptr [0x20], al");
    }

    #[test]
    fn test_lock_prefix() {
        assert_eq!(
            text(&[0xf0, 0x48, 0x0f, 0xb1, 0x0e]),
            "lock cmpxchg qword ptr [rsi], rcx"
        );
    }

    #[test]
    fn test_two_byte_forms() {
        assert_eq!(text(&[0x48, 0x0f, 0x4f, 0xc1]), "cmovg rax, rcx");
        assert_eq!(text(&[0x0f, 0xb6, 0xc1]), "movzx eax, cl");
        assert_eq!(text(&[0x0f, 0x05]), "syscall");
        assert_eq!(text(&[0x0f, 0xa2]), "cpuid");
        assert_eq!(text(&[0x0f, 0xae, 0xe8]), "lfence");
        assert_eq!(text(&[0x0f, 0xae, 0x38]), "clflush [rax]");
        assert_eq!(text(&[0x0f, 0xa0]), "push fs");
        assert_eq!(text(&[0x48, 0x0f, 0xc7, 0x0f]), "cmpxchg16b [rdi]");
    }

    #[test]
    fn test_segment_register_moves() {
        assert_eq!(text(&[0x8c, 0xd8]), "mov ax, ds");
        assert_eq!(text(&[0x8c, 0xc8]), "mov ax, cs");
        assert_eq!(text(&[0x8e, 0xd8]), "mov ds, ax");
        let err = decode_all(&[0x8e, 0xf8]).remove(0).unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::UnknownOpcode { opcode: 0x8e, .. }));
        let err = decode_all(&[0x8e, 0xc8]).remove(0).unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::UnknownOpcode { opcode: 0x8e, .. }));
        assert_eq!(err.bytes_consumed, 1);
    }

    #[test]
    fn test_instruction_too_long() {
        let mut bytes = vec![0x66; 14];
        bytes.extend_from_slice(&[0x05, 0x90, 0x90]);
        let records = decode_all(&bytes);

        let err = records[0].as_ref().unwrap_err();
        assert_eq!(
            err.kind,
            DecodeErrorKind::InstructionTooLong {
                length: 17,
                limit: 15
            }
        );
        assert_eq!(err.bytes_consumed, 15);
        assert_eq!(records.len(), 3);
        assert_eq!(records.iter().map(consumed).sum::<usize>(), bytes.len());
    }

    #[test]
    fn test_custom_length_limit() {
        let options = DecoderOptions::default().with_max_instruction_length(2);
        let records: Vec<_> = Decoder::new(&[0x48, 0x89, 0xe5], options).collect();
        assert!(matches!(
            records[0].as_ref().unwrap_err().kind,
            DecodeErrorKind::InstructionTooLong { length: 3, limit: 2 }
        ));
    }

    #[test]
    fn test_iterator_is_fused() {
        let mut decoder = decode(&[0xc3]);
        assert!(decoder.next().is_some());
        assert!(decoder.next().is_none());
        assert!(decoder.next().is_none());
        assert_eq!(decoder.position(), 1);
    }

    #[test]
    fn test_disassembler_trait() {
        let disasm = X86_64Disassembler::new();
        let decoded = disasm.decode_instruction(&[0x48, 0x89, 0xe5], 0x1000).unwrap();
        assert_eq!(decoded.size, 3);
        assert_eq!(decoded.instruction.address, Some(0x1000));
        assert!(!disasm.is_fixed_width());
        assert_eq!(disasm.max_instruction_size(), 15);

        let block = disasm.disassemble_block(&[0x55, 0x0f, 0x0b, 0xc3], 0x2000);
        let addresses: Vec<_> = block.iter().map(|r| r.as_ref().unwrap().address).collect();
        assert_eq!(addresses, [Some(0x2000), Some(0x2001), Some(0x2003)]);

        assert!(disasm.decode_instruction(&[], 0).is_err());
    }
}
