//! # x64scan-core
//!
//! Core data model for the x64scan decoder. This crate defines the
//! instruction record produced by the decoder along with its registers,
//! operands and prefix flags, and the Intel-syntax operand formatter.

pub mod format;
pub mod instruction;
pub mod operand;
pub mod prefix;
pub mod register;

pub use format::{FormatterOptions, OperandFormatter};
pub use instruction::Instruction;
pub use operand::{Immediate, MemoryRef, Operand};
pub use prefix::{PrefixSet, RepeatKind, Rex, Segment};
pub use register::{Register, RegisterClass};
