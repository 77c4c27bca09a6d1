//! Constant folding over literal operands
//!
//! Follows the JVM's arithmetic: two's-complement wraparound, shift counts
//! masked to 5 or 6 bits, IEEE-754 floats, saturating float-to-int
//! conversions. An `Unknown` operand folds to `Unknown`; so does integer
//! division or remainder by zero, which throws at run time.

use super::value::Literal;
use crate::bytecode::opcodes::Opcode;
use crate::error::{Error, Result};
use std::cmp::Ordering;

fn mismatch(op: Opcode, found: String) -> Error {
    Error::LiteralMismatch {
        opcode: op.mnemonic().to_string(),
        expected: expected_operands(op).to_string(),
        found,
    }
}

/// Operand types an opcode folds over, as reported in mismatch errors
fn expected_operands(op: Opcode) -> &'static str {
    use Opcode::*;
    match op {
        Lshl | Lshr | Lushr => "long, int",
        Ladd | Lsub | Lmul | Ldiv | Lrem | Land | Lor | Lxor | Lneg | Lcmp | L2i | L2f | L2d => {
            "long"
        }
        Fadd | Fsub | Fmul | Fdiv | Frem | Fneg | Fcmpl | Fcmpg | F2i | F2l | F2d => "float",
        Dadd | Dsub | Dmul | Ddiv | Drem | Dneg | Dcmpl | Dcmpg | D2i | D2l | D2f => "double",
        _ => "int",
    }
}

/// Fold a negation or conversion.
pub fn fold1(op: Opcode, operand: &Literal) -> Result<Literal> {
    if !operand.is_known() {
        return Ok(Literal::Unknown);
    }
    let folded = match (op, operand) {
        (Opcode::Ineg, Literal::Int(v)) => Literal::Int(v.wrapping_neg()),
        (Opcode::Lneg, Literal::Long(v)) => Literal::Long(v.wrapping_neg()),
        (Opcode::Fneg, Literal::Float(v)) => Literal::Float(-v),
        (Opcode::Dneg, Literal::Double(v)) => Literal::Double(-v),

        (Opcode::I2l, Literal::Int(v)) => Literal::Long(*v as i64),
        (Opcode::I2f, Literal::Int(v)) => Literal::Float(*v as f32),
        (Opcode::I2d, Literal::Int(v)) => Literal::Double(*v as f64),
        (Opcode::L2i, Literal::Long(v)) => Literal::Int(*v as i32),
        (Opcode::L2f, Literal::Long(v)) => Literal::Float(*v as f32),
        (Opcode::L2d, Literal::Long(v)) => Literal::Double(*v as f64),
        // `as` saturates and maps NaN to zero, exactly like f2i/d2l and friends
        (Opcode::F2i, Literal::Float(v)) => Literal::Int(*v as i32),
        (Opcode::F2l, Literal::Float(v)) => Literal::Long(*v as i64),
        (Opcode::F2d, Literal::Float(v)) => Literal::Double(*v as f64),
        (Opcode::D2i, Literal::Double(v)) => Literal::Int(*v as i32),
        (Opcode::D2l, Literal::Double(v)) => Literal::Long(*v as i64),
        (Opcode::D2f, Literal::Double(v)) => Literal::Float(*v as f32),
        (Opcode::I2b, Literal::Int(v)) => Literal::Int(*v as i8 as i32),
        (Opcode::I2c, Literal::Int(v)) => Literal::Int(*v as u16 as i32),
        (Opcode::I2s, Literal::Int(v)) => Literal::Int(*v as i16 as i32),

        _ => return Err(mismatch(op, operand.kind().to_string())),
    };
    Ok(folded)
}

/// Fold a binary arithmetic, bitwise, shift or comparison instruction.
/// `left` is the deeper operand.
pub fn fold2(op: Opcode, left: &Literal, right: &Literal) -> Result<Literal> {
    use Literal::{Double as D, Float as F, Int as I, Long as L};

    if !left.is_known() || !right.is_known() {
        return Ok(Literal::Unknown);
    }
    let folded = match (op, left, right) {
        (Opcode::Iadd, I(a), I(b)) => I(a.wrapping_add(*b)),
        (Opcode::Isub, I(a), I(b)) => I(a.wrapping_sub(*b)),
        (Opcode::Imul, I(a), I(b)) => I(a.wrapping_mul(*b)),
        (Opcode::Idiv | Opcode::Irem, I(_), I(0)) => Literal::Unknown,
        (Opcode::Idiv, I(a), I(b)) => I(a.wrapping_div(*b)),
        (Opcode::Irem, I(a), I(b)) => I(a.wrapping_rem(*b)),
        (Opcode::Iand, I(a), I(b)) => I(a & b),
        (Opcode::Ior, I(a), I(b)) => I(a | b),
        (Opcode::Ixor, I(a), I(b)) => I(a ^ b),
        (Opcode::Ishl, I(a), I(b)) => I(a << (b & 0x1f)),
        (Opcode::Ishr, I(a), I(b)) => I(a >> (b & 0x1f)),
        (Opcode::Iushr, I(a), I(b)) => I(((*a as u32) >> (b & 0x1f)) as i32),

        (Opcode::Ladd, L(a), L(b)) => L(a.wrapping_add(*b)),
        (Opcode::Lsub, L(a), L(b)) => L(a.wrapping_sub(*b)),
        (Opcode::Lmul, L(a), L(b)) => L(a.wrapping_mul(*b)),
        (Opcode::Ldiv | Opcode::Lrem, L(_), L(0)) => Literal::Unknown,
        (Opcode::Ldiv, L(a), L(b)) => L(a.wrapping_div(*b)),
        (Opcode::Lrem, L(a), L(b)) => L(a.wrapping_rem(*b)),
        (Opcode::Land, L(a), L(b)) => L(a & b),
        (Opcode::Lor, L(a), L(b)) => L(a | b),
        (Opcode::Lxor, L(a), L(b)) => L(a ^ b),
        (Opcode::Lshl, L(a), I(b)) => L(a << (b & 0x3f)),
        (Opcode::Lshr, L(a), I(b)) => L(a >> (b & 0x3f)),
        (Opcode::Lushr, L(a), I(b)) => L(((*a as u64) >> (b & 0x3f)) as i64),

        (Opcode::Fadd, F(a), F(b)) => F(a + b),
        (Opcode::Fsub, F(a), F(b)) => F(a - b),
        (Opcode::Fmul, F(a), F(b)) => F(a * b),
        (Opcode::Fdiv, F(a), F(b)) => F(a / b),
        (Opcode::Frem, F(a), F(b)) => F(a % b),

        (Opcode::Dadd, D(a), D(b)) => D(a + b),
        (Opcode::Dsub, D(a), D(b)) => D(a - b),
        (Opcode::Dmul, D(a), D(b)) => D(a * b),
        (Opcode::Ddiv, D(a), D(b)) => D(a / b),
        (Opcode::Drem, D(a), D(b)) => D(a % b),

        (Opcode::Lcmp, L(a), L(b)) => I(a.cmp(b) as i32),
        (Opcode::Fcmpl, F(a), F(b)) => I(compare(a.partial_cmp(b), -1)),
        (Opcode::Fcmpg, F(a), F(b)) => I(compare(a.partial_cmp(b), 1)),
        (Opcode::Dcmpl, D(a), D(b)) => I(compare(a.partial_cmp(b), -1)),
        (Opcode::Dcmpg, D(a), D(b)) => I(compare(a.partial_cmp(b), 1)),

        _ => return Err(mismatch(op, format!("{}, {}", left.kind(), right.kind()))),
    };
    Ok(folded)
}

fn compare(ordering: Option<Ordering>, unordered: i32) -> i32 {
    ordering.map_or(unordered, |o| o as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int2(op: Opcode, a: i32, b: i32) -> Literal {
        fold2(op, &Literal::Int(a), &Literal::Int(b)).unwrap()
    }

    #[test]
    fn test_int_arithmetic() {
        assert_eq!(int2(Opcode::Iadd, 5, 3), Literal::Int(8));
        assert_eq!(int2(Opcode::Idiv, -7, 2), Literal::Int(-3));
        assert_eq!(int2(Opcode::Irem, -7, 2), Literal::Int(-1));
        assert_eq!(int2(Opcode::Iadd, i32::MAX, 1), Literal::Int(i32::MIN));
        assert_eq!(int2(Opcode::Idiv, i32::MIN, -1), Literal::Int(i32::MIN));
        assert_eq!(int2(Opcode::Irem, i32::MIN, -1), Literal::Int(0));
    }

    #[test]
    fn test_division_by_zero_is_unknown() {
        assert_eq!(int2(Opcode::Idiv, 1, 0), Literal::Unknown);
        assert_eq!(int2(Opcode::Irem, 1, 0), Literal::Unknown);
        assert_eq!(
            fold2(Opcode::Ldiv, &Literal::Long(1), &Literal::Long(0)).unwrap(),
            Literal::Unknown
        );
        assert_eq!(
            fold2(Opcode::Fdiv, &Literal::Float(1.0), &Literal::Float(0.0)).unwrap(),
            Literal::Float(f32::INFINITY)
        );
    }

    #[test]
    fn test_shifts_mask_count() {
        assert_eq!(int2(Opcode::Ishl, 1, 33), Literal::Int(2));
        assert_eq!(int2(Opcode::Ishr, -8, 1), Literal::Int(-4));
        assert_eq!(int2(Opcode::Iushr, -1, 28), Literal::Int(0xf));
        assert_eq!(
            fold2(Opcode::Lshl, &Literal::Long(1), &Literal::Int(65)).unwrap(),
            Literal::Long(2)
        );
        assert_eq!(
            fold2(Opcode::Lushr, &Literal::Long(-1), &Literal::Int(60)).unwrap(),
            Literal::Long(0xf)
        );
    }

    #[test]
    fn test_nan_comparisons() {
        let nan = Literal::Float(f32::NAN);
        let one = Literal::Float(1.0);
        assert_eq!(fold2(Opcode::Fcmpg, &nan, &one).unwrap(), Literal::Int(1));
        assert_eq!(fold2(Opcode::Fcmpl, &nan, &one).unwrap(), Literal::Int(-1));
        let nan = Literal::Double(f64::NAN);
        assert_eq!(fold2(Opcode::Dcmpl, &Literal::Double(0.0), &nan).unwrap(), Literal::Int(-1));
        assert_eq!(
            fold2(Opcode::Lcmp, &Literal::Long(3), &Literal::Long(3)).unwrap(),
            Literal::Int(0)
        );
    }

    #[test]
    fn test_conversions() {
        assert_eq!(fold1(Opcode::I2f, &Literal::Int(25)).unwrap(), Literal::Float(25.0));
        assert_eq!(fold1(Opcode::F2i, &Literal::Float(f32::NAN)).unwrap(), Literal::Int(0));
        assert_eq!(fold1(Opcode::D2i, &Literal::Double(1e20)).unwrap(), Literal::Int(i32::MAX));
        assert_eq!(fold1(Opcode::I2b, &Literal::Int(200)).unwrap(), Literal::Int(-56));
        assert_eq!(fold1(Opcode::I2c, &Literal::Int(-1)).unwrap(), Literal::Int(0xffff));
        assert_eq!(fold1(Opcode::I2s, &Literal::Int(0x18000)).unwrap(), Literal::Int(-0x8000));
        assert_eq!(fold1(Opcode::L2i, &Literal::Long(0x1_0000_0005)).unwrap(), Literal::Int(5));
    }

    #[test]
    fn test_unknown_operand_folds_to_unknown() {
        assert_eq!(fold2(Opcode::Iadd, &Literal::Unknown, &Literal::Int(1)).unwrap(), Literal::Unknown);
        assert_eq!(fold1(Opcode::Ineg, &Literal::Unknown).unwrap(), Literal::Unknown);
    }

    #[test]
    fn test_mismatched_literals_are_reported() {
        let err = fold2(Opcode::Iadd, &Literal::Int(1), &Literal::Float(1.0)).unwrap_err();
        assert!(matches!(err, Error::LiteralMismatch { ref opcode, .. } if opcode == "iadd"));
        assert!(fold1(Opcode::I2l, &Literal::Str("1".into())).is_err());
    }
}
