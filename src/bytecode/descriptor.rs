//! Field and method descriptor parsing
//!
//! Descriptors drive stack arity: argument cells popped by an invocation,
//! cells pushed for a return value or field read.

use crate::error::{Error, Result};
use std::fmt;

/// A field type as encoded in a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Float,
    Long,
    Double,
    /// Class type by internal name (`java/lang/String`)
    Object(String),
    /// Array type by full descriptor (`[I`, `[Ljava/lang/String;`)
    Array(String),
}

impl FieldType {
    pub fn parse(descriptor: &str) -> Result<FieldType> {
        match Self::parse_prefix(descriptor) {
            Some((ty, "")) => Ok(ty),
            _ => Err(Error::invalid_descriptor(descriptor)),
        }
    }

    /// Parse one field type from the front of `s`, returning the rest.
    fn parse_prefix(s: &str) -> Option<(FieldType, &str)> {
        let first = s.chars().next()?;
        let rest = &s[first.len_utf8()..];
        let ty = match first {
            'Z' => FieldType::Boolean,
            'B' => FieldType::Byte,
            'C' => FieldType::Char,
            'S' => FieldType::Short,
            'I' => FieldType::Int,
            'F' => FieldType::Float,
            'J' => FieldType::Long,
            'D' => FieldType::Double,
            'L' => {
                let end = rest.find(';')?;
                if end == 0 {
                    return None;
                }
                return Some((FieldType::Object(rest[..end].to_string()), &rest[end + 1..]));
            }
            '[' => {
                let (_, after) = Self::parse_prefix(rest)?;
                let consumed = s.len() - after.len();
                return Some((FieldType::Array(s[..consumed].to_string()), after));
            }
            _ => return None,
        };
        Some((ty, rest))
    }

    /// Build a field type from a verification-style internal name: array
    /// descriptors stay arrays, anything else is a class.
    pub fn from_internal_name(name: &str) -> FieldType {
        if name.starts_with('[') {
            FieldType::Array(name.to_string())
        } else {
            FieldType::Object(name.to_string())
        }
    }

    /// Number of stack/local slots a value of this type occupies
    pub fn size(&self) -> usize {
        if self.is_wide() {
            2
        } else {
            1
        }
    }

    pub fn is_wide(&self) -> bool {
        matches!(self, FieldType::Long | FieldType::Double)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Object(_) | FieldType::Array(_))
    }

    /// The name a verification type uses for this reference type:
    /// the internal name for classes, the descriptor for arrays.
    pub fn internal_name(&self) -> Option<&str> {
        match self {
            FieldType::Object(name) | FieldType::Array(name) => Some(name),
            _ => None,
        }
    }

    /// Element type of an array type
    pub fn element(&self) -> Option<FieldType> {
        match self {
            FieldType::Array(desc) => FieldType::parse(&desc[1..]).ok(),
            _ => None,
        }
    }

    pub fn descriptor(&self) -> String {
        match self {
            FieldType::Boolean => "Z".to_string(),
            FieldType::Byte => "B".to_string(),
            FieldType::Char => "C".to_string(),
            FieldType::Short => "S".to_string(),
            FieldType::Int => "I".to_string(),
            FieldType::Float => "F".to_string(),
            FieldType::Long => "J".to_string(),
            FieldType::Double => "D".to_string(),
            FieldType::Object(name) => format!("L{};", name),
            FieldType::Array(desc) => desc.clone(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor())
    }
}

/// A parsed method descriptor `(params)ret`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    /// `None` for `V`
    pub ret: Option<FieldType>,
}

impl MethodDescriptor {
    pub fn parse(descriptor: &str) -> Result<MethodDescriptor> {
        let invalid = || Error::invalid_descriptor(descriptor);
        let mut rest = descriptor.strip_prefix('(').ok_or_else(invalid)?;
        let mut params = Vec::new();
        while !rest.starts_with(')') {
            let (ty, after) = FieldType::parse_prefix(rest).ok_or_else(invalid)?;
            params.push(ty);
            rest = after;
        }
        let ret = match &rest[1..] {
            "V" => None,
            other => Some(FieldType::parse(other).map_err(|_| invalid())?),
        };
        Ok(MethodDescriptor { params, ret })
    }

    /// Total slots taken by the arguments (receiver excluded)
    pub fn argument_size(&self) -> usize {
        self.params.iter().map(FieldType::size).sum()
    }

    pub fn return_size(&self) -> usize {
        self.ret.as_ref().map_or(0, FieldType::size)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for p in &self.params {
            write!(f, "{}", p)?;
        }
        match &self.ret {
            Some(r) => write!(f, "){}", r),
            None => write!(f, ")V"),
        }
    }
}

/// Slots popped for a field or method descriptor: the argument size of a
/// method, or the value size of a field.
pub fn popped_slots(descriptor: &str) -> Result<usize> {
    if descriptor.starts_with('(') {
        Ok(MethodDescriptor::parse(descriptor)?.argument_size())
    } else {
        Ok(FieldType::parse(descriptor)?.size())
    }
}

/// The type pushed for a field descriptor or a method's return type
pub fn pushed_type(descriptor: &str) -> Result<Option<FieldType>> {
    if descriptor.starts_with('(') {
        Ok(MethodDescriptor::parse(descriptor)?.ret)
    } else {
        FieldType::parse(descriptor).map(Some)
    }
}
