//! Instruction-level model of a JVM method body
//!
//! This module holds the input side of the analysis: canonical opcodes,
//! descriptor parsing, instruction and frame records, and a textual listing
//! format for writing method bodies by hand.

pub mod descriptor;
pub mod insn;
pub mod listing;
pub mod opcodes;

pub use descriptor::{FieldType, MethodDescriptor};
pub use insn::{Constant, FrameKind, FrameRecord, Insn, Label, VerificationType};
pub use opcodes::{OperandShape, Opcode};
