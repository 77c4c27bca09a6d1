//! Value cells: verification category, literal and provenance of one slot

use crate::bytecode::descriptor::FieldType;
use crate::bytecode::insn::{Label, VerificationType};
use std::fmt;

/// Internal name of the string class
pub const STRING_CLASS: &str = "java/lang/String";

/// Identity of the `new` instruction that produced an uninitialized object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreationSite {
    /// The `new` is bound to this label; frame records refer to it.
    Label(Label),
    /// No label was bound to the `new`; the number is unique per analysis.
    Synthetic(u32),
}

impl fmt::Display for CreationSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreationSite::Label(label) => write!(f, "{}", label),
            CreationSite::Synthetic(n) => write!(f, "#{}", n),
        }
    }
}

/// Verification category of a cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Top,
    Int,
    Float,
    Long,
    Double,
    Null,
    /// Class by internal name, or array by descriptor
    Object(String),
    UninitializedThis,
    Uninitialized(CreationSite),
}

impl Category {
    pub fn object(name: impl Into<String>) -> Self {
        Category::Object(name.into())
    }

    pub fn is_wide(&self) -> bool {
        matches!(self, Category::Long | Category::Double)
    }

    /// Category of a descriptor type; sub-int types widen to `Int`.
    pub fn from_field_type(ty: &FieldType) -> Self {
        match ty {
            FieldType::Boolean
            | FieldType::Byte
            | FieldType::Char
            | FieldType::Short
            | FieldType::Int => Category::Int,
            FieldType::Float => Category::Float,
            FieldType::Long => Category::Long,
            FieldType::Double => Category::Double,
            FieldType::Object(name) | FieldType::Array(name) => Category::Object(name.clone()),
        }
    }

    pub fn from_verification_type(ty: &VerificationType) -> Self {
        match ty {
            VerificationType::Top => Category::Top,
            VerificationType::Integer => Category::Int,
            VerificationType::Float => Category::Float,
            VerificationType::Long => Category::Long,
            VerificationType::Double => Category::Double,
            VerificationType::Null => Category::Null,
            VerificationType::UninitializedThis => Category::UninitializedThis,
            VerificationType::Object(name) => Category::Object(name.clone()),
            VerificationType::Uninitialized(label) => {
                Category::Uninitialized(CreationSite::Label(*label))
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Top => f.write_str("top"),
            Category::Int => f.write_str("int"),
            Category::Float => f.write_str("float"),
            Category::Long => f.write_str("long"),
            Category::Double => f.write_str("double"),
            Category::Null => f.write_str("null"),
            Category::Object(name) => f.write_str(name),
            Category::UninitializedThis => f.write_str("uninit_this"),
            Category::Uninitialized(site) => write!(f, "uninit:{}", site),
        }
    }
}

/// Statically known value of a cell
#[derive(Debug, Clone)]
pub enum Literal {
    Unknown,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Null,
}

impl Literal {
    pub fn is_known(&self) -> bool {
        !matches!(self, Literal::Unknown)
    }

    /// Short name of the literal's runtime type
    pub fn kind(&self) -> &'static str {
        match self {
            Literal::Unknown => "unknown",
            Literal::Int(_) => "int",
            Literal::Long(_) => "long",
            Literal::Float(_) => "float",
            Literal::Double(_) => "double",
            Literal::Str(_) => "string",
            Literal::Null => "null",
        }
    }
}

/// Floats compare by bit pattern: NaN equals itself, `0.0 != -0.0`.
impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Unknown, Literal::Unknown) | (Literal::Null, Literal::Null) => true,
            (Literal::Int(a), Literal::Int(b)) => a == b,
            (Literal::Long(a), Literal::Long(b)) => a == b,
            (Literal::Float(a), Literal::Float(b)) => a.to_bits() == b.to_bits(),
            (Literal::Double(a), Literal::Double(b)) => a.to_bits() == b.to_bits(),
            (Literal::Str(a), Literal::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Unknown => f.write_str("?"),
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Long(v) => write!(f, "{}L", v),
            Literal::Float(v) => write!(f, "{:?}f", v),
            Literal::Double(v) => write!(f, "{:?}", v),
            Literal::Str(s) => write!(f, "{:?}", s),
            Literal::Null => f.write_str("null"),
        }
    }
}

/// One stack or local slot.
///
/// Fields are private so a literal can only accompany a matching category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    category: Category,
    literal: Literal,
    provenance: Option<String>,
}

impl Value {
    fn known(category: Category, literal: Literal) -> Self {
        Self { category, literal, provenance: None }
    }

    pub fn int(v: i32) -> Self {
        Self::known(Category::Int, Literal::Int(v))
    }

    pub fn long(v: i64) -> Self {
        Self::known(Category::Long, Literal::Long(v))
    }

    pub fn float(v: f32) -> Self {
        Self::known(Category::Float, Literal::Float(v))
    }

    pub fn double(v: f64) -> Self {
        Self::known(Category::Double, Literal::Double(v))
    }

    pub fn string(text: impl Into<String>) -> Self {
        Self::known(Category::object(STRING_CLASS), Literal::Str(text.into()))
    }

    pub fn null() -> Self {
        Self::known(Category::Null, Literal::Null)
    }

    /// Empty slot or the continuation half of a 64-bit value
    pub fn top() -> Self {
        Self::unknown(Category::Top)
    }

    pub fn unknown(category: Category) -> Self {
        Self::known(category, Literal::Unknown)
    }

    pub fn unknown_object(name: impl Into<String>) -> Self {
        Self::unknown(Category::object(name))
    }

    pub fn uninitialized_this() -> Self {
        Self::unknown(Category::UninitializedThis)
    }

    pub fn uninitialized(site: CreationSite) -> Self {
        Self::unknown(Category::Uninitialized(site))
    }

    /// A cell of `category` holding `literal` when the two agree, otherwise
    /// an unknown of `category`.
    pub fn from_literal(category: Category, literal: Literal) -> Self {
        let agrees = matches!(
            (&category, &literal),
            (Category::Int, Literal::Int(_))
                | (Category::Long, Literal::Long(_))
                | (Category::Float, Literal::Float(_))
                | (Category::Double, Literal::Double(_))
                | (Category::Null, Literal::Null)
        ) || matches!((&category, &literal), (Category::Object(name), Literal::Str(_)) if name == STRING_CLASS);
        if agrees {
            Self::known(category, literal)
        } else {
            Self::unknown(category)
        }
    }

    /// Same cell, tagged as loaded from `field`
    pub fn with_provenance(mut self, field: impl Into<String>) -> Self {
        self.provenance = Some(field.into());
        self
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn literal(&self) -> &Literal {
        &self.literal
    }

    /// Name of the field this value was last loaded from
    pub fn provenance(&self) -> Option<&str> {
        self.provenance.as_deref()
    }

    pub fn is_literal(&self) -> bool {
        self.literal.is_known()
    }

    pub fn is_wide(&self) -> bool {
        self.category.is_wide()
    }

    pub fn is_top(&self) -> bool {
        self.category == Category::Top
    }

    pub fn as_int(&self) -> Option<i32> {
        match self.literal {
            Literal::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self.literal {
            Literal::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self.literal {
            Literal::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self.literal {
            Literal::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.literal {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.category)?;
        if self.is_literal() && self.category != Category::Null {
            write!(f, " {}", self.literal)?;
        }
        if let Some(field) = &self.provenance {
            write!(f, " @{}", field)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factories_pair_category_and_literal() {
        assert_eq!(Value::int(5).category(), &Category::Int);
        assert_eq!(Value::int(5).as_int(), Some(5));
        assert_eq!(Value::string("x").category(), &Category::object(STRING_CLASS));
        assert_eq!(Value::string("x").as_str(), Some("x"));
        assert_eq!(Value::null().literal(), &Literal::Null);
        assert!(!Value::top().is_literal());
        assert!(!Value::uninitialized_this().is_literal());
        assert!(Value::long(1).is_wide());
    }

    #[test]
    fn test_from_literal_rejects_mismatched_pairs() {
        assert_eq!(Value::from_literal(Category::Int, Literal::Int(3)), Value::int(3));
        let v = Value::from_literal(Category::Int, Literal::Float(3.0));
        assert!(!v.is_literal());
        let v = Value::from_literal(Category::object("java/lang/Object"), Literal::Str("s".into()));
        assert!(!v.is_literal());
    }

    #[test]
    fn test_float_literals_compare_bitwise() {
        assert_eq!(Literal::Float(f32::NAN), Literal::Float(f32::NAN));
        assert_ne!(Literal::Double(0.0), Literal::Double(-0.0));
        assert_eq!(Value::float(f32::NAN), Value::float(f32::NAN));
    }

    #[test]
    fn test_provenance_is_part_of_identity() {
        let plain = Value::unknown_object("a/Button");
        let tagged = plain.clone().with_provenance("mods");
        assert_eq!(tagged.provenance(), Some("mods"));
        assert_ne!(plain, tagged);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::float(25.0).to_string(), "float 25.0f");
        assert_eq!(Value::string("Mods").with_provenance("label").to_string(), "java/lang/String \"Mods\" @label");
        assert_eq!(Value::uninitialized(CreationSite::Synthetic(2)).to_string(), "uninit:#2");
        assert_eq!(Value::null().to_string(), "null");
    }
}
