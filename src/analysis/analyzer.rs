//! Analysis driver: observers, output stream and interpreter in lockstep

use super::interpreter::Interpreter;
use super::observer::{Emitter, Observer};
use crate::bytecode::insn::Insn;
use crate::config::Config;
use crate::error::Result;

/// The method whose body is analysed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodContext {
    /// Internal name of the declaring class
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub is_static: bool,
}

impl MethodContext {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
            is_static: false,
        }
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }
}

/// Result of one analysis run
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Output stream: observer emissions plus every unsuppressed record
    pub instructions: Vec<Insn>,
    pub max_stack: usize,
    pub max_locals: usize,
}

pub struct Analyzer {
    config: Config,
}

impl Analyzer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyse a method body, notifying `observers` in order before each
    /// record is executed.
    pub fn run(
        &self,
        method: &MethodContext,
        insns: &[Insn],
        observers: &mut [&mut dyn Observer],
    ) -> Result<Analysis> {
        let mut interpreter = Interpreter::new(method, &self.config)?;
        let mut instructions = Vec::with_capacity(insns.len());

        for (index, insn) in insns.iter().enumerate() {
            let mut out = Emitter::default();
            for observer in observers.iter_mut() {
                observer.observe(insn, interpreter.frame(), &mut out)?;
            }
            let (emitted, suppressed) = out.into_parts();
            instructions.extend(emitted);
            if !suppressed {
                instructions.push(insn.clone());
            }
            interpreter.execute(insn).map_err(|e| {
                log::debug!(
                    "{}.{}{}: record {} ({}) failed: {}",
                    method.owner, method.name, method.descriptor, index, insn, e
                );
                e
            })?;
        }

        let frame = interpreter.into_frame();
        let analysis = Analysis {
            instructions,
            max_stack: frame.max_stack(),
            max_locals: frame.max_locals(),
        };
        log::debug!(
            "{}.{}{}: {} records in, {} out, max_stack={}, max_locals={}",
            method.owner,
            method.name,
            method.descriptor,
            insns.len(),
            analysis.instructions.len(),
            analysis.max_stack,
            analysis.max_locals
        );
        Ok(analysis)
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::frame::FrameState;
    use crate::bytecode::opcodes::Opcode;

    #[test]
    fn test_suppressed_record_is_still_executed() {
        let method = MethodContext::new("a/Main", "run", "()I").with_static(true);
        let insns = vec![Insn::simple(Opcode::Iconst1), Insn::simple(Opcode::Ireturn)];
        let mut swap_constant = |insn: &Insn, _: &FrameState, out: &mut Emitter| -> Result<()> {
            if *insn == Insn::simple(Opcode::Iconst1) {
                out.emit(Insn::simple(Opcode::Iconst2));
                out.suppress_original();
            }
            Ok(())
        };
        let analysis = Analyzer::default()
            .run(&method, &insns, &mut [&mut swap_constant])
            .unwrap();
        assert_eq!(
            analysis.instructions,
            vec![Insn::simple(Opcode::Iconst2), Insn::simple(Opcode::Ireturn)]
        );
        assert_eq!(analysis.max_stack, 1);
        assert_eq!(analysis.max_locals, 0);
    }

    #[test]
    fn test_observers_run_in_order() {
        let method = MethodContext::new("a/Main", "run", "()V").with_static(true);
        let insns = vec![Insn::simple(Opcode::Return)];
        let mut first = |_: &Insn, _: &FrameState, out: &mut Emitter| -> Result<()> {
            out.emit(Insn::simple(Opcode::Nop));
            Ok(())
        };
        let mut second = |_: &Insn, _: &FrameState, out: &mut Emitter| -> Result<()> {
            assert_eq!(out.emitted().len(), 1);
            out.emit(Insn::simple(Opcode::Iconst0));
            out.emit(Insn::simple(Opcode::Pop));
            Ok(())
        };
        let analysis = Analyzer::default()
            .run(&method, &insns, &mut [&mut first, &mut second])
            .unwrap();
        assert_eq!(analysis.instructions.len(), 4);
    }
}
