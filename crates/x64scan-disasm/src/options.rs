//! Decoder configuration.

/// Architectural upper bound on the length of one instruction.
pub const MAX_INSTRUCTION_LENGTH: usize = 15;

/// Options controlling decoding behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecoderOptions {
    /// Virtual address of the first buffer byte. Used to resolve relative
    /// branch targets and RIP-relative memory references.
    pub base_address: Option<u64>,
    /// Longest accepted instruction, prefixes included.
    pub max_instruction_length: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            base_address: None,
            max_instruction_length: MAX_INSTRUCTION_LENGTH,
        }
    }
}

impl DecoderOptions {
    /// Sets the virtual address of the first buffer byte.
    pub fn with_base_address(mut self, address: u64) -> Self {
        self.base_address = Some(address);
        self
    }

    /// Sets the instruction length limit. Values below 1 are raised to 1.
    pub fn with_max_instruction_length(mut self, length: usize) -> Self {
        self.max_instruction_length = length.max(1);
        self
    }

    /// Virtual address of the byte at `offset`, if a base address is set.
    pub fn address_of(&self, offset: usize) -> Option<u64> {
        self.base_address
            .map(|base| base.wrapping_add(offset as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DecoderOptions::default();
        assert_eq!(options.base_address, None);
        assert_eq!(options.max_instruction_length, 15);
        assert_eq!(options.address_of(4), None);
    }

    #[test]
    fn test_builders() {
        let options = DecoderOptions::default()
            .with_base_address(0x401000)
            .with_max_instruction_length(0);
        assert_eq!(options.address_of(0x10), Some(0x401010));
        assert_eq!(options.max_instruction_length, 1);
    }
}
