//! # x64scan-disasm
//!
//! Table-driven x86-64 instruction decoder.
//!
//! The decoder turns a byte buffer into an ordered sequence of
//! [`Instruction`] records or [`DecodeError`]s. Every record consumes at
//! least one byte and the byte counts of all records add up to the buffer
//! length, so a scan always covers the whole input and terminates.
//!
//! ```
//! use x64scan_disasm::{decode, DecoderOptions, Decoder};
//!
//! let code = [0x55, 0x48, 0x89, 0xe5, 0xc3];
//! let text: Vec<String> = decode(&code)
//!     .filter_map(Result::ok)
//!     .map(|insn| insn.to_string())
//!     .collect();
//! assert_eq!(text, ["push rbp", "mov rbp, rsp", "ret"]);
//!
//! let options = DecoderOptions::default().with_base_address(0x401000);
//! let first = Decoder::new(&code, options).next().unwrap().unwrap();
//! assert_eq!(first.address, Some(0x401000));
//! ```

pub mod cursor;
pub mod error;
pub mod options;
pub mod traits;
pub mod x86_64;

pub use cursor::ByteCursor;
pub use error::{DecodeError, DecodeErrorKind, OutOfBounds};
pub use options::DecoderOptions;
pub use traits::{DecodedInstruction, Disassembler};
pub use x86_64::{decode, Decoder, X86_64Disassembler};

pub use x64scan_core::{Instruction, Operand};
