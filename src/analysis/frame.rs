//! Frame state: locals, operand stack and reachability of one method body
//!
//! 64-bit values take two adjacent slots, the value followed by a `Top`
//! continuation, in both locals and stack.

use super::analyzer::MethodContext;
use super::value::{Category, Value};
use crate::bytecode::descriptor::{self, MethodDescriptor};
use crate::bytecode::insn::VerificationType;
use crate::bytecode::opcodes::Opcode;
use crate::error::{Error, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct FrameState {
    locals: Vec<Value>,
    stack: Vec<Value>,
    reachable: bool,
    max_stack: usize,
    max_locals: usize,
    stack_limit: Option<usize>,
    /// Instruction being executed, for error reports
    current: Option<Opcode>,
}

impl FrameState {
    /// Empty reachable frame
    pub fn new(stack_limit: Option<usize>) -> Self {
        Self {
            locals: Vec::new(),
            stack: Vec::new(),
            reachable: true,
            max_stack: 0,
            max_locals: 0,
            stack_limit,
            current: None,
        }
    }

    /// Entry frame of a method: receiver (if any) then the parameters.
    pub fn for_method(method: &MethodContext, stack_limit: Option<usize>) -> Result<Self> {
        let desc = MethodDescriptor::parse(&method.descriptor)?;
        let mut frame = Self::new(stack_limit);
        let mut index = 0;
        if !method.is_static {
            let receiver = if method.is_constructor() {
                Value::uninitialized_this()
            } else {
                Value::unknown_object(method.owner.clone())
            };
            frame.set(index, receiver)?;
            index += 1;
        }
        for param in &desc.params {
            frame.set(index, Value::unknown(Category::from_field_type(param)))?;
            index += param.size();
        }
        Ok(frame)
    }

    pub(crate) fn begin(&mut self, op: Opcode) {
        self.current = Some(op);
    }

    fn underflow(&self) -> Error {
        Error::StackUnderflow {
            opcode: self.current.map_or("<none>", Opcode::mnemonic).to_string(),
        }
    }

    fn ensure_reachable(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(Error::Unreachable)
        }
    }

    /// Local at `index`; `Top` past the current local count.
    pub fn get(&mut self, index: usize) -> Result<Value> {
        self.ensure_reachable()?;
        self.max_locals = self.max_locals.max(index + 1);
        Ok(self.locals.get(index).cloned().unwrap_or_else(Value::top))
    }

    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        self.ensure_reachable()?;
        let wide = value.is_wide();
        let needed = index + if wide { 2 } else { 1 };
        if self.locals.len() < needed {
            self.locals.resize(needed, Value::top());
        }
        let was_wide = self.locals[index].is_wide();
        self.locals[index] = value;
        if wide || was_wide {
            self.locals[index + 1] = Value::top();
        }
        // A wide value at index - 1 just lost its continuation
        if index > 0 && self.locals[index - 1].is_wide() {
            self.locals[index - 1] = Value::top();
        }
        self.max_locals = self.max_locals.max(self.locals.len());
        Ok(())
    }

    pub fn push(&mut self, value: Value) -> Result<()> {
        self.ensure_reachable()?;
        if let Some(limit) = self.stack_limit {
            if self.stack.len() >= limit {
                return Err(Error::StackOverflow { limit });
            }
        }
        self.stack.push(value);
        self.max_stack = self.max_stack.max(self.stack.len());
        Ok(())
    }

    /// Push a value and, for 64-bit values, its continuation.
    pub fn push_sized(&mut self, value: Value) -> Result<()> {
        let wide = value.is_wide();
        self.push(value)?;
        if wide {
            self.push(Value::top())?;
        }
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value> {
        self.ensure_reachable()?;
        self.stack.pop().ok_or_else(|| self.underflow())
    }

    /// Pop `count` cells and return the deepest, which for a 64-bit value
    /// popped with `count == 2` is the value cell.
    pub fn pop_wide(&mut self, count: usize) -> Result<Value> {
        self.ensure_reachable()?;
        if count == 0 || self.stack.len() < count {
            return Err(self.underflow());
        }
        let at = self.stack.len() - count;
        let mut popped = self.stack.drain(at..);
        popped.next().ok_or_else(|| Error::malformed("empty pop"))
    }

    pub fn pop_n(&mut self, count: usize) -> Result<()> {
        self.ensure_reachable()?;
        if self.stack.len() < count {
            return Err(self.underflow());
        }
        self.stack.truncate(self.stack.len() - count);
        Ok(())
    }

    /// Pop the cells a descriptor implies: a method's arguments (receiver
    /// excluded) or a field's value.
    pub fn pop_descriptor(&mut self, desc: &str) -> Result<()> {
        let count = descriptor::popped_slots(desc)?;
        self.pop_n(count)
    }

    /// Push an unknown of a field type or a method's return type.
    pub fn push_descriptor(&mut self, desc: &str) -> Result<()> {
        self.push_descriptor_from(desc, None)
    }

    /// Like `push_descriptor`, tagging the pushed value with its source field.
    pub fn push_descriptor_from(&mut self, desc: &str, field: Option<&str>) -> Result<()> {
        if let Some(ty) = descriptor::pushed_type(desc)? {
            let mut value = Value::unknown(Category::from_field_type(&ty));
            if let Some(field) = field {
                value = value.with_provenance(field);
            }
            self.push_sized(value)?;
        }
        Ok(())
    }

    /// Replace locals and stack with the types of an authoritative frame.
    /// The frame becomes reachable and every literal is forgotten.
    pub fn reset_at(&mut self, locals: &[VerificationType], stack: &[VerificationType]) -> Result<()> {
        let locals = expand(locals);
        let stack = expand(stack);
        if let Some(limit) = self.stack_limit {
            if stack.len() > limit {
                return Err(Error::StackOverflow { limit });
            }
        }
        self.max_locals = self.max_locals.max(locals.len());
        self.max_stack = self.max_stack.max(stack.len());
        self.locals = locals;
        self.stack = stack;
        self.reachable = true;
        Ok(())
    }

    pub fn mark_unreachable(&mut self) {
        self.reachable = false;
        self.locals.clear();
        self.stack.clear();
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    pub fn locals(&self) -> &[Value] {
        &self.locals
    }

    /// Operand stack, bottom first
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// Cell `depth` slots below the top (0 is the top)
    pub fn peek(&self, depth: usize) -> Option<&Value> {
        self.stack.iter().rev().nth(depth)
    }

    /// Replace every cell equal to `old` in locals and stack.
    pub fn replace_all(&mut self, old: &Value, new: &Value) {
        for cell in self.locals.iter_mut().chain(self.stack.iter_mut()) {
            if cell == old {
                *cell = new.clone();
            }
        }
    }

    pub fn max_stack(&self) -> usize {
        self.max_stack
    }

    pub fn max_locals(&self) -> usize {
        self.max_locals
    }
}

fn expand(types: &[VerificationType]) -> Vec<Value> {
    let mut cells = Vec::with_capacity(types.len());
    for ty in types {
        cells.push(Value::unknown(Category::from_verification_type(ty)));
        if ty.is_wide() {
            cells.push(Value::top());
        }
    }
    cells
}

impl fmt::Display for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.reachable {
            return f.write_str("<unreachable>");
        }
        write!(f, "locals [")?;
        write_cells(f, &self.locals)?;
        write!(f, "] stack [")?;
        write_cells(f, &self.stack)?;
        write!(f, "]")
    }
}

fn write_cells(f: &mut fmt::Formatter<'_>, cells: &[Value]) -> fmt::Result {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", cell)?;
    }
    Ok(())
}
