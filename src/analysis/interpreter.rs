//! Instruction executor
//!
//! Applies one record at a time to a `FrameState`, propagating literals
//! through loads, stores, shuffles and (when enabled) constant folding.

use super::analyzer::MethodContext;
use super::fold;
use super::frame::FrameState;
use super::value::{Category, CreationSite, Literal, Value};
use crate::bytecode::descriptor::FieldType;
use crate::bytecode::insn::{Constant, FrameKind, Insn, Label};
use crate::bytecode::opcodes::{array_types, Opcode};
use crate::config::Config;
use crate::error::{Error, Result};
use std::collections::HashMap;

const CLASS_CLASS: &str = "java/lang/Class";
const METHOD_TYPE_CLASS: &str = "java/lang/invoke/MethodType";
const METHOD_HANDLE_CLASS: &str = "java/lang/invoke/MethodHandle";
const OBJECT_CLASS: &str = "java/lang/Object";
const CONSTRUCTOR: &str = "<init>";

pub struct Interpreter {
    frame: FrameState,
    owner: String,
    fold_constants: bool,
    trace: bool,
    /// Labels bound since the last real instruction
    pending_labels: Vec<Label>,
    /// Type created at each `new` site
    created: HashMap<CreationSite, String>,
    next_site: u32,
}

impl Interpreter {
    pub fn new(method: &MethodContext, config: &Config) -> Result<Self> {
        Ok(Self {
            frame: FrameState::for_method(method, config.max_stack)?,
            owner: method.owner.clone(),
            fold_constants: config.fold_constants,
            trace: config.trace,
            pending_labels: Vec::new(),
            created: HashMap::new(),
            next_site: 0,
        })
    }

    pub fn frame(&self) -> &FrameState {
        &self.frame
    }

    pub fn into_frame(self) -> FrameState {
        self.frame
    }

    /// Execute one record.
    pub fn execute(&mut self, insn: &Insn) -> Result<()> {
        let op = match insn {
            Insn::Label(label) => {
                self.pending_labels.push(*label);
                return Ok(());
            }
            Insn::Frame(record) => {
                if record.kind != FrameKind::Expanded {
                    return Err(Error::CompressedFrame { kind: record.kind.keyword().to_string() });
                }
                return self.frame.reset_at(&record.locals, &record.stack);
            }
            _ => insn.opcode().ok_or_else(|| Error::malformed(format!("{:?}", insn)))?,
        };
        if op.is_subroutine() {
            return Err(Error::unsupported(op.mnemonic()));
        }
        insn.check_shape()?;
        if !self.frame.is_reachable() {
            self.pending_labels.clear();
            return Ok(());
        }

        self.frame.begin(op);
        let result = self.dispatch(op, insn);
        self.pending_labels.clear();
        result?;
        if op.ends_flow() {
            self.frame.mark_unreachable();
        }
        if self.trace {
            log::trace!("{:<40} {}", insn.to_string(), self.frame);
        }
        Ok(())
    }

    fn dispatch(&mut self, op: Opcode, insn: &Insn) -> Result<()> {
        use Opcode::*;
        match (op, insn) {
            (Nop, _) => Ok(()),

            (AconstNull, _) => self.frame.push(Value::null()),
            (IconstM1 | Iconst0 | Iconst1 | Iconst2 | Iconst3 | Iconst4 | Iconst5, _) => {
                let n = op.byte() as i32 - Iconst0.byte() as i32;
                self.frame.push(Value::int(n))
            }
            (Lconst0 | Lconst1, _) => {
                let n = (op.byte() - Lconst0.byte()) as i64;
                self.frame.push_sized(Value::long(n))
            }
            (Fconst0 | Fconst1 | Fconst2, _) => {
                let n = (op.byte() - Fconst0.byte()) as f32;
                self.frame.push(Value::float(n))
            }
            (Dconst0 | Dconst1, _) => {
                let n = (op.byte() - Dconst0.byte()) as f64;
                self.frame.push_sized(Value::double(n))
            }
            (Bipush | Sipush, Insn::Int { operand, .. }) => self.frame.push(Value::int(*operand)),
            (Ldc, Insn::Ldc(constant)) => self.ldc(constant),

            (Iload | Lload | Fload | Dload | Aload, Insn::Var { index, .. }) => {
                let value = self.frame.get(*index as usize)?;
                self.frame.push(value)?;
                if matches!(op, Lload | Dload) {
                    self.frame.push(Value::top())?;
                }
                Ok(())
            }
            (Istore | Fstore | Astore, Insn::Var { index, .. }) => {
                let value = self.frame.pop()?;
                self.frame.set(*index as usize, value)
            }
            (Lstore | Dstore, Insn::Var { index, .. }) => {
                let value = self.frame.pop_wide(2)?;
                self.frame.set(*index as usize, value)
            }
            (Iinc, Insn::Iinc { index, delta }) => {
                let index = *index as usize;
                let current = self.frame.get(index)?;
                let next = match (self.fold_constants, current.literal()) {
                    (true, Literal::Int(v)) => Value::int(v.wrapping_add(*delta)),
                    _ => Value::unknown(Category::Int),
                };
                self.frame.set(index, next)
            }

            (Iaload | Baload | Caload | Saload, _) => self.array_load(Category::Int),
            (Faload, _) => self.array_load(Category::Float),
            (Laload, _) => self.array_load(Category::Long),
            (Daload, _) => self.array_load(Category::Double),
            (Aaload, _) => {
                self.frame.pop()?;
                let array = self.frame.pop()?;
                let element = match array.category() {
                    Category::Object(name) => FieldType::parse(name)
                        .ok()
                        .and_then(|ty| ty.element())
                        .map(|ty| Category::from_field_type(&ty)),
                    _ => None,
                };
                self.frame
                    .push(Value::unknown(element.unwrap_or_else(|| Category::object(OBJECT_CLASS))))
            }
            (Iastore | Fastore | Aastore | Bastore | Castore | Sastore, _) => self.frame.pop_n(3),
            (Lastore | Dastore, _) => self.frame.pop_n(4),

            (Pop, _) => self.frame.pop_n(1),
            (Pop2, _) => self.frame.pop_n(2),
            (Dup, _) => {
                let v1 = self.frame.pop()?;
                self.push_all([v1.clone(), v1])
            }
            (DupX1, _) => {
                let v1 = self.frame.pop()?;
                let v2 = self.frame.pop()?;
                self.push_all([v1.clone(), v2, v1])
            }
            (DupX2, _) => {
                let v1 = self.frame.pop()?;
                let v2 = self.frame.pop()?;
                let v3 = self.frame.pop()?;
                self.push_all([v1.clone(), v3, v2, v1])
            }
            (Dup2, _) => {
                let v1 = self.frame.pop()?;
                let v2 = self.frame.pop()?;
                self.push_all([v2.clone(), v1.clone(), v2, v1])
            }
            (Dup2X1, _) => {
                let v1 = self.frame.pop()?;
                let v2 = self.frame.pop()?;
                let v3 = self.frame.pop()?;
                self.push_all([v2.clone(), v1.clone(), v3, v2, v1])
            }
            (Dup2X2, _) => {
                let v1 = self.frame.pop()?;
                let v2 = self.frame.pop()?;
                let v3 = self.frame.pop()?;
                let v4 = self.frame.pop()?;
                self.push_all([v2.clone(), v1.clone(), v4, v3, v2, v1])
            }
            (Swap, _) => {
                let v1 = self.frame.pop()?;
                let v2 = self.frame.pop()?;
                self.push_all([v1, v2])
            }

            (Iadd | Isub | Imul | Idiv | Irem | Iand | Ior | Ixor | Ishl | Ishr | Iushr, _) => {
                self.binary(op, 1, 1, Category::Int)
            }
            (Ladd | Lsub | Lmul | Ldiv | Lrem | Land | Lor | Lxor, _) => {
                self.binary(op, 2, 2, Category::Long)
            }
            (Lshl | Lshr | Lushr, _) => self.binary(op, 2, 1, Category::Long),
            (Fadd | Fsub | Fmul | Fdiv | Frem, _) => self.binary(op, 1, 1, Category::Float),
            (Dadd | Dsub | Dmul | Ddiv | Drem, _) => self.binary(op, 2, 2, Category::Double),
            (Lcmp, _) => self.binary(op, 2, 2, Category::Int),
            (Fcmpl | Fcmpg, _) => self.binary(op, 1, 1, Category::Int),
            (Dcmpl | Dcmpg, _) => self.binary(op, 2, 2, Category::Int),

            (Ineg, _) => self.unary(op, 1, Category::Int),
            (Lneg, _) => self.unary(op, 2, Category::Long),
            (Fneg, _) => self.unary(op, 1, Category::Float),
            (Dneg, _) => self.unary(op, 2, Category::Double),
            (I2l, _) => self.unary(op, 1, Category::Long),
            (I2f, _) => self.unary(op, 1, Category::Float),
            (I2d, _) => self.unary(op, 1, Category::Double),
            (L2i, _) => self.unary(op, 2, Category::Int),
            (L2f, _) => self.unary(op, 2, Category::Float),
            (L2d, _) => self.unary(op, 2, Category::Double),
            (F2i, _) => self.unary(op, 1, Category::Int),
            (F2l, _) => self.unary(op, 1, Category::Long),
            (F2d, _) => self.unary(op, 1, Category::Double),
            (D2i, _) => self.unary(op, 2, Category::Int),
            (D2l, _) => self.unary(op, 2, Category::Long),
            (D2f, _) => self.unary(op, 2, Category::Float),
            (I2b | I2c | I2s, _) => self.unary(op, 1, Category::Int),

            (Ifeq | Ifne | Iflt | Ifge | Ifgt | Ifle | Ifnull | Ifnonnull, _) => self.frame.pop_n(1),
            (IfIcmpeq | IfIcmpne | IfIcmplt | IfIcmpge | IfIcmpgt | IfIcmple | IfAcmpeq
            | IfAcmpne, _) => self.frame.pop_n(2),
            (Goto, _) => Ok(()),
            (Tableswitch | Lookupswitch, _) => self.frame.pop_n(1),
            (Ireturn | Freturn | Areturn | Athrow, _) => self.frame.pop_n(1),
            (Lreturn | Dreturn, _) => self.frame.pop_n(2),
            (Return, _) => Ok(()),

            (Getstatic, Insn::Field { name, descriptor, .. }) => {
                self.frame.push_descriptor_from(descriptor, Some(name))
            }
            (Getfield, Insn::Field { name, descriptor, .. }) => {
                self.frame.pop()?;
                self.frame.push_descriptor_from(descriptor, Some(name))
            }
            (Putstatic, Insn::Field { descriptor, .. }) => self.frame.pop_descriptor(descriptor),
            (Putfield, Insn::Field { descriptor, .. }) => {
                self.frame.pop_descriptor(descriptor)?;
                self.frame.pop_n(1)
            }

            (
                Invokevirtual | Invokespecial | Invokestatic | Invokeinterface,
                Insn::Method { owner, name, descriptor, .. },
            ) => {
                self.frame.pop_descriptor(descriptor)?;
                if op != Invokestatic {
                    let receiver = self.frame.pop()?;
                    if op == Invokespecial && name == CONSTRUCTOR {
                        self.complete_construction(&receiver, owner);
                    }
                }
                self.frame.push_descriptor(descriptor)
            }
            (Invokedynamic, Insn::InvokeDynamic { descriptor, .. }) => {
                self.frame.pop_descriptor(descriptor)?;
                self.frame.push_descriptor(descriptor)
            }

            (New, Insn::Type { type_name, .. }) => {
                let site = match self.pending_labels.first() {
                    Some(label) => CreationSite::Label(*label),
                    None => {
                        self.next_site += 1;
                        CreationSite::Synthetic(self.next_site)
                    }
                };
                for label in &self.pending_labels {
                    self.created.insert(CreationSite::Label(*label), type_name.clone());
                }
                self.created.insert(site, type_name.clone());
                self.frame.push(Value::uninitialized(site))
            }
            (Newarray, Insn::Int { operand, .. }) => {
                let desc = array_types::descriptor(*operand).ok_or_else(|| {
                    Error::malformed(format!("newarray with invalid type code {}", operand))
                })?;
                self.frame.pop_n(1)?;
                self.frame.push(Value::unknown_object(desc))
            }
            (Anewarray, Insn::Type { type_name, .. }) => {
                let desc = if type_name.starts_with('[') {
                    format!("[{}", type_name)
                } else {
                    format!("[L{};", type_name)
                };
                self.frame.pop_n(1)?;
                self.frame.push(Value::unknown_object(desc))
            }
            (Multianewarray, Insn::MultiANewArray { descriptor, dims }) => {
                self.frame.pop_n(*dims as usize)?;
                self.frame.push(Value::unknown_object(descriptor.clone()))
            }
            (Arraylength | Instanceof, _) => {
                self.frame.pop_n(1)?;
                self.frame.push(Value::unknown(Category::Int))
            }
            (Checkcast, Insn::Type { type_name, .. }) => {
                self.frame.pop_n(1)?;
                self.frame.push(Value::unknown_object(type_name.clone()))
            }
            (Monitorenter | Monitorexit, _) => self.frame.pop_n(1),

            (Jsr | Ret, _) => Err(Error::unsupported(op.mnemonic())),
            _ => Err(Error::malformed(format!("{} with operands {:?}", op, insn))),
        }
    }

    fn push_all<const N: usize>(&mut self, values: [Value; N]) -> Result<()> {
        for value in values {
            self.frame.push(value)?;
        }
        Ok(())
    }

    fn ldc(&mut self, constant: &Constant) -> Result<()> {
        match constant {
            Constant::Int(v) => self.frame.push(Value::int(*v)),
            Constant::Float(v) => self.frame.push(Value::float(*v)),
            Constant::Long(v) => self.frame.push_sized(Value::long(*v)),
            Constant::Double(v) => self.frame.push_sized(Value::double(*v)),
            Constant::String(s) => self.frame.push(Value::string(s.clone())),
            Constant::Class(_) => self.frame.push(Value::unknown_object(CLASS_CLASS)),
            Constant::MethodType(_) => self.frame.push(Value::unknown_object(METHOD_TYPE_CLASS)),
            Constant::MethodHandle { .. } => {
                self.frame.push(Value::unknown_object(METHOD_HANDLE_CLASS))
            }
        }
    }

    fn array_load(&mut self, element: Category) -> Result<()> {
        self.frame.pop_n(2)?;
        self.frame.push_sized(Value::unknown(element))
    }

    /// Pop a `width`-slot operand and return its value cell.
    fn operand(&mut self, width: usize) -> Result<Value> {
        if width == 2 {
            self.frame.pop_wide(2)
        } else {
            self.frame.pop()
        }
    }

    fn unary(&mut self, op: Opcode, width: usize, result: Category) -> Result<()> {
        let operand = self.operand(width)?;
        let literal = if self.fold_constants {
            fold::fold1(op, operand.literal())?
        } else {
            Literal::Unknown
        };
        self.frame.push_sized(Value::from_literal(result, literal))
    }

    fn binary(&mut self, op: Opcode, left_width: usize, right_width: usize, result: Category) -> Result<()> {
        let right = self.operand(right_width)?;
        let left = self.operand(left_width)?;
        let literal = if self.fold_constants {
            fold::fold2(op, left.literal(), right.literal())?
        } else {
            Literal::Unknown
        };
        self.frame.push_sized(Value::from_literal(result, literal))
    }

    /// Replace every alias of an uninitialized receiver with the
    /// initialized object once its constructor has been called.
    fn complete_construction(&mut self, receiver: &Value, call_owner: &str) {
        let type_name = match receiver.category() {
            Category::UninitializedThis => self.owner.clone(),
            Category::Uninitialized(site) => self
                .created
                .get(site)
                .cloned()
                .unwrap_or_else(|| call_owner.to_string()),
            _ => return,
        };
        log::trace!("constructed {} from {}", type_name, receiver);
        self.frame.replace_all(receiver, &Value::unknown_object(type_name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(insns: &[Insn]) -> Interpreter {
        let method = MethodContext::new("a/Main", "run", "()V").with_static(true);
        let mut interp = Interpreter::new(&method, &Config::default()).unwrap();
        for insn in insns {
            interp.execute(insn).unwrap();
        }
        interp
    }

    #[test]
    fn test_iconst_values() {
        let interp = run(&[Insn::simple(Opcode::IconstM1), Insn::simple(Opcode::Iconst5)]);
        assert_eq!(interp.frame().stack(), &[Value::int(-1), Value::int(5)]);
    }

    #[test]
    fn test_wide_constants_push_continuation() {
        let interp = run(&[Insn::simple(Opcode::Lconst1), Insn::simple(Opcode::Dconst1)]);
        let stack = interp.frame().stack();
        assert_eq!(stack.len(), 4);
        assert_eq!(stack[0], Value::long(1));
        assert!(stack[1].is_top());
        assert_eq!(stack[2], Value::double(1.0));
        assert!(stack[3].is_top());
    }

    #[test]
    fn test_fold_disabled_keeps_constants_but_not_results() {
        let method = MethodContext::new("a/Main", "run", "()V").with_static(true);
        let config = Config::default().with_constant_folding(false);
        let mut interp = Interpreter::new(&method, &config).unwrap();
        for insn in [
            Insn::simple(Opcode::Iconst2),
            Insn::simple(Opcode::Iconst3),
            Insn::simple(Opcode::Iadd),
        ] {
            interp.execute(&insn).unwrap();
        }
        assert_eq!(interp.frame().stack(), &[Value::unknown(Category::Int)]);
    }

    #[test]
    fn test_long_shift_takes_int_count() {
        let interp = run(&[
            Insn::simple(Opcode::Lconst1),
            Insn::int(Opcode::Bipush, 4),
            Insn::simple(Opcode::Lshl),
        ]);
        assert_eq!(interp.frame().stack().len(), 2);
        assert_eq!(interp.frame().stack()[0], Value::long(16));
    }

    #[test]
    fn test_synthetic_sites_are_distinct() {
        let interp = run(&[
            Insn::type_insn(Opcode::New, "a/B"),
            Insn::type_insn(Opcode::New, "a/B"),
        ]);
        let stack = interp.frame().stack();
        assert_ne!(stack[0], stack[1]);
    }

    #[test]
    fn test_new_uses_bound_label() {
        let interp = run(&[Insn::Label(Label(7)), Insn::type_insn(Opcode::New, "a/B")]);
        assert_eq!(
            interp.frame().stack()[0],
            Value::uninitialized(CreationSite::Label(Label(7)))
        );
    }

    #[test]
    fn test_aaload_element_type() {
        let method = MethodContext::new("a/Main", "run", "([[Ljava/lang/String;)V").with_static(true);
        let mut interp = Interpreter::new(&method, &Config::default()).unwrap();
        for insn in [
            Insn::var(Opcode::Aload, 0),
            Insn::simple(Opcode::Iconst0),
            Insn::simple(Opcode::Aaload),
        ] {
            interp.execute(&insn).unwrap();
        }
        assert_eq!(interp.frame().stack()[0], Value::unknown_object("[Ljava/lang/String;"));
    }
}
