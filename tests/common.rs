// Common test utilities
#![allow(dead_code)]

use litstack::analysis::{Analysis, Analyzer, Emitter, FrameState, Interpreter, MethodContext, Observer};
use litstack::bytecode::{listing, Insn};
use litstack::{Config, Result};

pub fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Trace)
        .try_init();
}

/// `static void run()` on `test/Main`
pub fn static_method() -> MethodContext {
    MethodContext::new("test/Main", "run", "()V").with_static(true)
}

/// Execute a listing against a fresh interpreter and return the final frame.
pub fn execute_with(method: &MethodContext, source: &str, config: &Config) -> Result<FrameState> {
    let insns = listing::parse(source)?;
    let mut interpreter = Interpreter::new(method, config)?;
    for insn in &insns {
        interpreter.execute(insn)?;
    }
    Ok(interpreter.into_frame())
}

pub fn execute(source: &str) -> FrameState {
    execute_with(&static_method(), source, &Config::default()).expect("listing should execute")
}

/// Records paired with the frame each one was observed against.
pub fn observe_all(method: &MethodContext, source: &str) -> (Analysis, Vec<(Insn, FrameState)>) {
    let insns = listing::parse(source).expect("listing should parse");
    let mut seen = Vec::new();
    let mut recorder = |insn: &Insn, frame: &FrameState, _: &mut Emitter| -> Result<()> {
        seen.push((insn.clone(), frame.clone()));
        Ok(())
    };
    let analysis = Analyzer::default()
        .run(method, &insns, &mut [&mut recorder])
        .expect("analysis should succeed");
    (analysis, seen)
}

/// Frame observed just before the first record whose listing text starts
/// with `prefix`.
pub fn frame_before(seen: &[(Insn, FrameState)], prefix: &str) -> FrameState {
    seen.iter()
        .find(|(insn, _)| insn.to_string().starts_with(prefix))
        .map(|(_, frame)| frame.clone())
        .unwrap_or_else(|| panic!("no record starting with '{}'", prefix))
}

pub fn run_with(method: &MethodContext, source: &str, observers: &mut [&mut dyn Observer]) -> Result<Analysis> {
    let insns = listing::parse(source)?;
    Analyzer::default().run(method, &insns, observers)
}
