//! Argument lookup for a pending invocation.
//!
//! Called from an observer just before an `invoke*` executes: the arguments
//! are the top cells of the stack, laid out as the descriptor says.

use super::frame::FrameState;
use super::value::{Literal, Value};
use crate::bytecode::descriptor::{FieldType, MethodDescriptor};

fn argument_cells<'f>(frame: &'f FrameState, desc: &MethodDescriptor) -> Option<(usize, Vec<&'f Value>)> {
    if !frame.is_reachable() {
        return None;
    }
    let stack = frame.stack();
    let base = stack.len().checked_sub(desc.argument_size())?;
    let mut offset = base;
    let mut cells = Vec::with_capacity(desc.params.len());
    for param in &desc.params {
        cells.push(&stack[offset]);
        offset += param.size();
    }
    Some((base, cells))
}

/// Argument cells in declaration order. Wide arguments resolve to their
/// value cell.
pub fn arguments<'f>(frame: &'f FrameState, descriptor: &str) -> Option<Vec<&'f Value>> {
    let desc = MethodDescriptor::parse(descriptor).ok()?;
    argument_cells(frame, &desc).map(|(_, cells)| cells)
}

pub fn argument<'f>(frame: &'f FrameState, descriptor: &str, index: usize) -> Option<&'f Value> {
    arguments(frame, descriptor)?.get(index).copied()
}

/// Receiver cell of an instance call
pub fn receiver<'f>(frame: &'f FrameState, descriptor: &str) -> Option<&'f Value> {
    let desc = MethodDescriptor::parse(descriptor).ok()?;
    let (base, _) = argument_cells(frame, &desc)?;
    frame.stack().get(base.checked_sub(1)?)
}

pub fn argument_literals<'f>(frame: &'f FrameState, descriptor: &str) -> Option<Vec<&'f Literal>> {
    Some(arguments(frame, descriptor)?.into_iter().map(Value::literal).collect())
}

/// Field each argument was loaded from, if any
pub fn argument_sources<'f>(frame: &'f FrameState, descriptor: &str) -> Option<Vec<Option<&'f str>>> {
    Some(arguments(frame, descriptor)?.into_iter().map(Value::provenance).collect())
}

/// Match parameter types against a pattern; `None` matches any type.
pub fn types_match(params: &[FieldType], pattern: &[Option<FieldType>]) -> bool {
    params.len() == pattern.len()
        && params
            .iter()
            .zip(pattern)
            .all(|(param, expected)| expected.as_ref().map_or(true, |e| e == param))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(cells: Vec<Value>) -> FrameState {
        let mut frame = FrameState::new(None);
        for cell in cells {
            frame.push_sized(cell).unwrap();
        }
        frame
    }

    #[test]
    fn test_arguments_follow_descriptor_offsets() {
        let frame = frame_with(vec![
            Value::unknown_object("a/Panel"),
            Value::string("Mods..."),
            Value::long(3),
            Value::float(25.0),
        ]);
        let args = arguments(&frame, "(Ljava/lang/String;JF)V").unwrap();
        assert_eq!(args, vec![&Value::string("Mods..."), &Value::long(3), &Value::float(25.0)]);
        assert_eq!(argument(&frame, "(Ljava/lang/String;JF)V", 2), Some(&Value::float(25.0)));
        assert_eq!(
            receiver(&frame, "(Ljava/lang/String;JF)V"),
            Some(&Value::unknown_object("a/Panel"))
        );
    }

    #[test]
    fn test_shallow_or_unreachable_frame() {
        let mut frame = frame_with(vec![Value::int(1)]);
        assert!(arguments(&frame, "(II)V").is_none());
        assert!(receiver(&frame, "(I)V").is_none());
        assert!(arguments(&frame, "not a descriptor").is_none());
        frame.mark_unreachable();
        assert!(arguments(&frame, "()V").is_none());
    }

    #[test]
    fn test_literal_and_source_views() {
        let frame = frame_with(vec![
            Value::unknown_object("a/Button").with_provenance("mods"),
            Value::int(9),
        ]);
        assert_eq!(
            argument_sources(&frame, "(La/Button;I)V").unwrap(),
            vec![Some("mods"), None]
        );
        assert_eq!(
            argument_literals(&frame, "(La/Button;I)V").unwrap(),
            vec![&Literal::Unknown, &Literal::Int(9)]
        );
    }

    #[test]
    fn test_types_match_with_wildcards() {
        let params = MethodDescriptor::parse("(Ljava/lang/String;IF)V").unwrap().params;
        let string = Some(FieldType::Object("java/lang/String".into()));
        assert!(types_match(&params, &[string.clone(), None, Some(FieldType::Float)]));
        assert!(!types_match(&params, &[string.clone(), None]));
        assert!(!types_match(&params, &[None, Some(FieldType::Long), None]));
    }
}
