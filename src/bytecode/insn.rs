//! Instruction records and frame records
//!
//! An instruction stream is a `Vec<Insn>` as a class reader would deliver it
//! to a method visitor: canonical opcodes with resolved operands, symbolic
//! labels, and expanded frame records at merge points.

use super::opcodes::{array_types, OperandShape, Opcode};
use crate::error::{Error, Result};
use std::fmt;

/// Symbolic position in an instruction stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Loadable constant carried by `ldc`
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// Class literal by internal name or array descriptor
    Class(String),
    /// Method type by descriptor
    MethodType(String),
    MethodHandle {
        owner: String,
        name: String,
        descriptor: String,
    },
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(v) => write!(f, "{}", v),
            Constant::Long(v) => write!(f, "{}L", v),
            Constant::Float(v) => write_float(f, *v as f64, v.is_nan(), "f"),
            Constant::Double(v) => write_float(f, *v, v.is_nan(), "d"),
            Constant::String(s) => write_quoted(f, s),
            Constant::Class(name) => write!(f, "class {}", name),
            Constant::MethodType(desc) => write!(f, "methodtype {}", desc),
            Constant::MethodHandle { owner, name, descriptor } => {
                write!(f, "handle {}.{} {}", owner, name, descriptor)
            }
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f64, nan: bool, suffix: &str) -> fmt::Result {
    if nan {
        write!(f, "NaN{}", suffix)
    } else if v.is_infinite() {
        let sign = if v < 0.0 { "-" } else { "" };
        write!(f, "{}Infinity{}", sign, suffix)
    } else if suffix == "f" {
        write!(f, "{}f", v as f32)
    } else {
        write!(f, "{}d", v)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for ch in s.chars() {
        match ch {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\r' => write!(f, "\\r")?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32)?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "\"")
}

/// Verification type of one entry in a frame record (JVMS 4.10.1.2).
/// Wide types occupy a single entry in an expanded frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VerificationType {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,
    UninitializedThis,
    /// Internal name or array descriptor
    Object(String),
    /// Uninitialized object created by the `new` bound to this label
    Uninitialized(Label),
}

impl VerificationType {
    pub fn is_wide(&self) -> bool {
        matches!(self, VerificationType::Long | VerificationType::Double)
    }
}

impl fmt::Display for VerificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationType::Top => f.write_str("top"),
            VerificationType::Integer => f.write_str("int"),
            VerificationType::Float => f.write_str("float"),
            VerificationType::Double => f.write_str("double"),
            VerificationType::Long => f.write_str("long"),
            VerificationType::Null => f.write_str("null"),
            VerificationType::UninitializedThis => f.write_str("uninit_this"),
            VerificationType::Object(name) => f.write_str(name),
            VerificationType::Uninitialized(label) => write!(f, "uninit:{}", label),
        }
    }
}

/// Encoding of a frame record. Only `Expanded` carries the full local and
/// stack lists; the others are deltas against the previous frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Expanded,
    Full,
    Append,
    Chop,
    Same,
    Same1,
}

impl FrameKind {
    pub fn keyword(self) -> &'static str {
        match self {
            FrameKind::Expanded => "expanded",
            FrameKind::Full => "full",
            FrameKind::Append => "append",
            FrameKind::Chop => "chop",
            FrameKind::Same => "same",
            FrameKind::Same1 => "same1",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<FrameKind> {
        [
            FrameKind::Expanded,
            FrameKind::Full,
            FrameKind::Append,
            FrameKind::Chop,
            FrameKind::Same,
            FrameKind::Same1,
        ]
        .into_iter()
        .find(|k| k.keyword() == keyword)
    }
}

/// Authoritative frame at a merge point
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub kind: FrameKind,
    pub locals: Vec<VerificationType>,
    pub stack: Vec<VerificationType>,
}

impl FrameRecord {
    pub fn expanded(locals: Vec<VerificationType>, stack: Vec<VerificationType>) -> Self {
        Self { kind: FrameKind::Expanded, locals, stack }
    }
}

/// One record of an instruction stream
#[derive(Debug, Clone, PartialEq)]
pub enum Insn {
    /// Opcode without immediate operands
    Simple(Opcode),
    /// `bipush`, `sipush`, `newarray` (type code)
    Int { op: Opcode, operand: i32 },
    Var { op: Opcode, index: u16 },
    Iinc { index: u16, delta: i32 },
    Type { op: Opcode, type_name: String },
    Field {
        op: Opcode,
        owner: String,
        name: String,
        descriptor: String,
    },
    Method {
        op: Opcode,
        owner: String,
        name: String,
        descriptor: String,
        interface: bool,
    },
    InvokeDynamic { name: String, descriptor: String },
    Jump { op: Opcode, target: Label },
    Ldc(Constant),
    TableSwitch {
        min: i32,
        max: i32,
        default: Label,
        targets: Vec<Label>,
    },
    LookupSwitch {
        default: Label,
        pairs: Vec<(i32, Label)>,
    },
    MultiANewArray { descriptor: String, dims: u8 },
    Label(Label),
    Frame(FrameRecord),
}

impl Insn {
    pub fn simple(op: Opcode) -> Self {
        Insn::Simple(op)
    }

    pub fn int(op: Opcode, operand: i32) -> Self {
        Insn::Int { op, operand }
    }

    pub fn var(op: Opcode, index: u16) -> Self {
        Insn::Var { op, index }
    }

    pub fn type_insn(op: Opcode, type_name: impl Into<String>) -> Self {
        Insn::Type { op, type_name: type_name.into() }
    }

    pub fn field(
        op: Opcode,
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Insn::Field {
            op,
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    pub fn method(
        op: Opcode,
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Insn::Method {
            op,
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
            interface: op == Opcode::Invokeinterface,
        }
    }

    pub fn ldc(constant: Constant) -> Self {
        Insn::Ldc(constant)
    }

    pub fn jump(op: Opcode, target: Label) -> Self {
        Insn::Jump { op, target }
    }

    /// Opcode of a real instruction; `None` for labels and frames.
    pub fn opcode(&self) -> Option<Opcode> {
        match self {
            Insn::Simple(op)
            | Insn::Int { op, .. }
            | Insn::Var { op, .. }
            | Insn::Type { op, .. }
            | Insn::Field { op, .. }
            | Insn::Method { op, .. }
            | Insn::Jump { op, .. } => Some(*op),
            Insn::Iinc { .. } => Some(Opcode::Iinc),
            Insn::InvokeDynamic { .. } => Some(Opcode::Invokedynamic),
            Insn::Ldc(_) => Some(Opcode::Ldc),
            Insn::TableSwitch { .. } => Some(Opcode::Tableswitch),
            Insn::LookupSwitch { .. } => Some(Opcode::Lookupswitch),
            Insn::MultiANewArray { .. } => Some(Opcode::Multianewarray),
            Insn::Label(_) | Insn::Frame(_) => None,
        }
    }

    /// Check that the record's variant agrees with its opcode's operand shape.
    pub fn check_shape(&self) -> Result<()> {
        let expected = match self {
            Insn::Simple(_) => OperandShape::None,
            Insn::Int { .. } => OperandShape::Int,
            Insn::Var { .. } => OperandShape::Var,
            Insn::Type { .. } => OperandShape::Type,
            Insn::Field { .. } => OperandShape::Field,
            Insn::Method { .. } => OperandShape::Method,
            Insn::Jump { .. } => OperandShape::Jump,
            _ => return Ok(()),
        };
        match self.opcode() {
            Some(op) if op.shape() != expected => Err(Error::malformed(format!(
                "{} does not take {:?} operands",
                op, expected
            ))),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Insn::Simple(op) => write!(f, "{}", op),
            Insn::Int { op: Opcode::Newarray, operand } => match array_types::keyword(*operand) {
                Some(keyword) => write!(f, "newarray {}", keyword),
                None => write!(f, "newarray {}", operand),
            },
            Insn::Int { op, operand } => write!(f, "{} {}", op, operand),
            Insn::Var { op, index } => write!(f, "{} {}", op, index),
            Insn::Iinc { index, delta } => write!(f, "iinc {} {}", index, delta),
            Insn::Type { op, type_name } => write!(f, "{} {}", op, type_name),
            Insn::Field { op, owner, name, descriptor } => {
                write!(f, "{} {}.{} {}", op, owner, name, descriptor)
            }
            Insn::Method { op, owner, name, descriptor, interface } => {
                write!(f, "{} {}.{} {}", op, owner, name, descriptor)?;
                if *interface && *op != Opcode::Invokeinterface {
                    write!(f, " itf")?;
                }
                Ok(())
            }
            Insn::InvokeDynamic { name, descriptor } => {
                write!(f, "invokedynamic {} {}", name, descriptor)
            }
            Insn::Jump { op, target } => write!(f, "{} {}", op, target),
            Insn::Ldc(constant) => write!(f, "ldc {}", constant),
            Insn::TableSwitch { min, max, default, targets } => {
                write!(f, "tableswitch {} {} {}", min, max, default)?;
                for t in targets {
                    write!(f, " {}", t)?;
                }
                Ok(())
            }
            Insn::LookupSwitch { default, pairs } => {
                write!(f, "lookupswitch {}", default)?;
                for (key, target) in pairs {
                    write!(f, " {}:{}", key, target)?;
                }
                Ok(())
            }
            Insn::MultiANewArray { descriptor, dims } => {
                write!(f, "multianewarray {} {}", descriptor, dims)
            }
            Insn::Label(label) => write!(f, "{}:", label),
            Insn::Frame(frame) => {
                write!(f, "frame {} {{", frame.kind.keyword())?;
                write_types(f, &frame.locals)?;
                write!(f, "}} {{")?;
                write_types(f, &frame.stack)?;
                write!(f, "}}")
            }
        }
    }
}

fn write_types(f: &mut fmt::Formatter<'_>, types: &[VerificationType]) -> fmt::Result {
    for (i, t) in types.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", t)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_of_records() {
        assert_eq!(Insn::simple(Opcode::Iadd).opcode(), Some(Opcode::Iadd));
        assert_eq!(Insn::Iinc { index: 1, delta: 2 }.opcode(), Some(Opcode::Iinc));
        assert_eq!(Insn::Label(Label(0)).opcode(), None);
    }

    #[test]
    fn test_shape_mismatch_is_malformed() {
        assert!(Insn::simple(Opcode::Iload).check_shape().is_err());
        assert!(Insn::var(Opcode::Iload, 0).check_shape().is_ok());
        assert!(Insn::int(Opcode::Iadd, 3).check_shape().is_err());
    }

    #[test]
    fn test_display() {
        let call = Insn::method(Opcode::Invokevirtual, "a/Panel", "inBMid", "(F)V");
        assert_eq!(call.to_string(), "invokevirtual a/Panel.inBMid (F)V");
        assert_eq!(Insn::ldc(Constant::Float(25.0)).to_string(), "ldc 25f");
        assert_eq!(Insn::ldc(Constant::Double(f64::NEG_INFINITY)).to_string(), "ldc -Infinityd");
        assert_eq!(
            Insn::ldc(Constant::String("say \"hi\"\n".into())).to_string(),
            r#"ldc "say \"hi\"\n""#
        );
        assert_eq!(Insn::int(Opcode::Newarray, array_types::T_INT).to_string(), "newarray int");
        let frame = Insn::Frame(FrameRecord::expanded(
            vec![VerificationType::Integer, VerificationType::Uninitialized(Label(2))],
            vec![],
        ));
        assert_eq!(frame.to_string(), "frame expanded {int, uninit:L2} {}");
    }
}
