//! litstack: literal-propagating stack interpreter for JVM method bodies
//!
//! Walks a method body one instruction record at a time and reconstructs the
//! operand stack and local variables, keeping track of every value whose
//! literal content or source field is statically known. Observers see the
//! frame before each record and may inject replacement code, which makes
//! call-site recognition ("the factory call whose first argument is the
//! string `"Mods..."`") and stack-shape-preserving rewrites straightforward.
//!
//! ## Architecture
//!
//! - **bytecode**: opcodes, descriptors, instruction and frame records, and
//!   a textual listing format
//! - **analysis**: value cells, frame state, constant folding, the
//!   interpreter, observers and the analysis driver
//! - **patterns**: ready-made rewriting observers
//! - **bin**: command-line tracer
//!
//! ## Analysis Flow
//!
//! ```text
//! records → observers (pre-instruction frame, may emit) → interpreter
//!                                  ↓                          ↓
//!                          output stream              max_stack / max_locals
//! ```

pub mod analysis;
pub mod bytecode;
pub mod config;
pub mod error;
pub mod patterns;

pub use analysis::{Analysis, Analyzer, MethodContext};
pub use config::Config;
pub use error::{Error, Result};

use bytecode::insn::Insn;

/// Analyse a method body with the given configuration and no observers.
pub fn analyze(method: &MethodContext, insns: &[Insn], config: &Config) -> Result<Analysis> {
    Analyzer::new(config.clone()).run(method, insns, &mut [])
}

/// Parse a listing and analyse it in one step.
pub fn analyze_listing(method: &MethodContext, source: &str, config: &Config) -> Result<Analysis> {
    let insns = bytecode::listing::parse(source)?;
    analyze(method, &insns, config)
}
