//! Rewrite the positioning offset of one labelled UI component.
//!
//! The rewriter follows a component through four steps of a method body:
//! its construction by a factory call carrying a known label, the field it
//! is stored in, the `add` call that attaches it, and finally the call that
//! positions it with a literal offset. The offset argument is then replaced
//! in place with `pop; ldc <replacement>`.

use crate::analysis::call_site;
use crate::analysis::frame::FrameState;
use crate::analysis::observer::{Emitter, Observer};
use crate::analysis::value::{Literal, STRING_CLASS};
use crate::bytecode::descriptor::{FieldType, MethodDescriptor};
use crate::bytecode::insn::{Constant, Insn};
use crate::bytecode::opcodes::Opcode;
use crate::error::Result;

pub const DEFAULT_LABEL: &str = "Mods...";
pub const DEFAULT_POSITIONING_METHOD: &str = "inBMid";
pub const DEFAULT_OFFSET: f32 = 25.0;
pub const DEFAULT_REPLACEMENT: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteState {
    /// Waiting for the factory call that builds the component
    Construction,
    /// Waiting for the `putfield` that stores it
    Assignment,
    /// Waiting for `add(field)`
    Addition,
    /// Waiting for the positioning call
    Positioning,
    Done,
}

#[derive(Debug, Clone)]
pub struct ComponentOffsetRewriter {
    component_type: String,
    alignment_type: String,
    label: String,
    positioning_method: String,
    offset: f32,
    replacement: f32,
    state: RewriteState,
    field_name: Option<String>,
}

impl ComponentOffsetRewriter {
    /// `component_type` is the factory's return type and `alignment_type`
    /// its third parameter, both as internal names.
    pub fn new(component_type: impl Into<String>, alignment_type: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            alignment_type: alignment_type.into(),
            label: DEFAULT_LABEL.to_string(),
            positioning_method: DEFAULT_POSITIONING_METHOD.to_string(),
            offset: DEFAULT_OFFSET,
            replacement: DEFAULT_REPLACEMENT,
            state: RewriteState::Construction,
            field_name: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_positioning_method(mut self, name: impl Into<String>) -> Self {
        self.positioning_method = name.into();
        self
    }

    pub fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_replacement(mut self, replacement: f32) -> Self {
        self.replacement = replacement;
        self
    }

    pub fn state(&self) -> RewriteState {
        self.state
    }

    /// Field the component was stored in, once seen
    pub fn field_name(&self) -> Option<&str> {
        self.field_name.as_deref()
    }

    pub fn is_done(&self) -> bool {
        self.state == RewriteState::Done
    }

    fn is_factory_call(&self, desc: &MethodDescriptor, frame: &FrameState, descriptor: &str) -> bool {
        let returns_component = matches!(&desc.ret, Some(FieldType::Object(name)) if *name == self.component_type);
        let string = Some(FieldType::Object(STRING_CLASS.to_string()));
        let pattern = [
            string.clone(),
            string,
            Some(FieldType::Object(self.alignment_type.clone())),
            None,
            None,
        ];
        returns_component
            && call_site::types_match(&desc.params, &pattern)
            && matches!(
                call_site::argument_literals(frame, descriptor).as_deref(),
                Some([Literal::Str(text), ..]) if *text == self.label
            )
    }

    fn on_call(&mut self, name: &str, descriptor: &str, frame: &FrameState, out: &mut Emitter) -> Result<()> {
        let desc = MethodDescriptor::parse(descriptor)?;
        match self.state {
            RewriteState::Construction => {
                if self.is_factory_call(&desc, frame, descriptor) {
                    log::debug!("component '{}' constructed", self.label);
                    self.state = RewriteState::Assignment;
                }
            }
            RewriteState::Addition => {
                let source = call_site::argument_sources(frame, descriptor)
                    .and_then(|sources| sources.first().copied().flatten());
                if name == "add" && source.is_some() && source == self.field_name.as_deref() {
                    self.state = RewriteState::Positioning;
                }
            }
            RewriteState::Positioning => {
                let offset = Literal::Float(self.offset);
                if name == self.positioning_method
                    && call_site::types_match(&desc.params, &[Some(FieldType::Float)])
                    && call_site::argument(frame, descriptor, 0).map(|v| v.literal()) == Some(&offset)
                {
                    out.emit(Insn::simple(Opcode::Pop));
                    out.emit(Insn::ldc(Constant::Float(self.replacement)));
                    log::debug!(
                        "rewrote {} offset {} -> {}",
                        self.positioning_method, self.offset, self.replacement
                    );
                    self.state = RewriteState::Done;
                }
            }
            RewriteState::Assignment | RewriteState::Done => {}
        }
        Ok(())
    }
}

impl Observer for ComponentOffsetRewriter {
    fn observe(&mut self, insn: &Insn, frame: &FrameState, out: &mut Emitter) -> Result<()> {
        match insn {
            Insn::Method { name, descriptor, .. } => self.on_call(name, descriptor, frame, out),
            Insn::Field { op: Opcode::Putfield, name, .. } if self.state == RewriteState::Assignment => {
                self.field_name = Some(name.clone());
                self.state = RewriteState::Addition;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
