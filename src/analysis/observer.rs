//! Observer hook: inspect the frame before each record and inject code

use super::frame::FrameState;
use crate::bytecode::insn::Insn;
use crate::error::Result;

/// Called once per record, before the record is executed.
///
/// Observers see the pre-instruction frame read-only and may write extra
/// records to `out`. Anything emitted must leave the stack shape the
/// original record expects.
pub trait Observer {
    fn observe(&mut self, insn: &Insn, frame: &FrameState, out: &mut Emitter) -> Result<()>;
}

impl<F> Observer for F
where
    F: FnMut(&Insn, &FrameState, &mut Emitter) -> Result<()>,
{
    fn observe(&mut self, insn: &Insn, frame: &FrameState, out: &mut Emitter) -> Result<()> {
        self(insn, frame, out)
    }
}

/// Output sink handed to observers for one record
#[derive(Debug, Default)]
pub struct Emitter {
    emitted: Vec<Insn>,
    suppressed: bool,
}

impl Emitter {
    /// Emit a record ahead of the observed one.
    pub fn emit(&mut self, insn: Insn) {
        self.emitted.push(insn);
    }

    /// Leave the observed record out of the output stream. It is still
    /// executed against the frame.
    pub fn suppress_original(&mut self) {
        self.suppressed = true;
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn emitted(&self) -> &[Insn] {
        &self.emitted
    }

    pub(crate) fn into_parts(self) -> (Vec<Insn>, bool) {
        (self.emitted, self.suppressed)
    }
}
