//! Disassembler traits.

use crate::DecodeError;
use x64scan_core::Instruction;

/// Result of decoding an instruction.
#[derive(Debug, Clone)]
pub struct DecodedInstruction {
    /// The decoded instruction.
    pub instruction: Instruction,
    /// Number of bytes consumed.
    pub size: usize,
}

/// Trait for instruction decoders.
pub trait Disassembler {
    /// Decode a single instruction starting at the given address.
    ///
    /// # Arguments
    /// * `bytes` - The raw bytes to decode
    /// * `address` - The virtual address of the first byte
    ///
    /// # Returns
    /// The decoded instruction and the number of bytes consumed, or an
    /// error record whose offsets are relative to `bytes`.
    fn decode_instruction(&self, bytes: &[u8], address: u64) -> Result<DecodedInstruction, DecodeError>;

    /// Returns the minimum instruction size for this architecture.
    fn min_instruction_size(&self) -> usize;

    /// Returns the maximum instruction size for this architecture.
    fn max_instruction_size(&self) -> usize;

    /// Returns whether instructions are fixed-width.
    fn is_fixed_width(&self) -> bool;

    /// Disassemble a block of code into instructions.
    ///
    /// After an error, decoding resumes `bytes_consumed` bytes past the
    /// start of the failed instruction. Error offsets are relative to `bytes`.
    fn disassemble_block(&self, bytes: &[u8], start_address: u64) -> Vec<Result<Instruction, DecodeError>> {
        let mut instructions = Vec::new();
        let mut offset = 0;

        while offset < bytes.len() {
            let remaining = &bytes[offset..];
            let address = start_address.wrapping_add(offset as u64);

            match self.decode_instruction(remaining, address) {
                Ok(decoded) => {
                    let mut instruction = decoded.instruction;
                    instruction.offset += offset;
                    offset += decoded.size.max(1);
                    instructions.push(Ok(instruction));
                }
                Err(e) => {
                    let step = e.bytes_consumed.max(1);
                    instructions.push(Err(e.rebased(offset)));
                    offset += step;
                }
            }
        }

        instructions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeErrorKind;
    use crate::x86_64::opcodes::OpcodeMap;

    /// Two-byte units; a unit starting with 0xFF is rejected after one byte.
    struct Pairs;

    impl Disassembler for Pairs {
        fn decode_instruction(&self, bytes: &[u8], address: u64) -> Result<DecodedInstruction, DecodeError> {
            if bytes[0] == 0xFF {
                return Err(DecodeError::unknown_opcode(OpcodeMap::Primary, 0xFF, 0, 0, 1));
            }
            let size = bytes.len().min(2);
            let instruction = Instruction::new(0, bytes[..size].to_vec(), "pair").with_address(Some(address));
            Ok(DecodedInstruction { instruction, size })
        }

        fn min_instruction_size(&self) -> usize {
            2
        }

        fn max_instruction_size(&self) -> usize {
            2
        }

        fn is_fixed_width(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_default_block_rebases_records() {
        let records = Pairs.disassemble_block(&[0x01, 0x02, 0xFF, 0x03, 0x04], 0x100);
        assert_eq!(records.len(), 3);

        let first = records[0].as_ref().unwrap();
        assert_eq!((first.offset, first.address), (0, Some(0x100)));

        let err = records[1].as_ref().unwrap_err();
        assert_eq!(err.start, 2);
        assert_eq!(err.offset, 2);
        assert!(matches!(err.kind, DecodeErrorKind::UnknownOpcode { .. }));

        let last = records[2].as_ref().unwrap();
        assert_eq!((last.offset, last.address), (3, Some(0x103)));
    }
}
