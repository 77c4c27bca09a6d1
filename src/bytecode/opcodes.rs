//! JVM instruction opcodes, in the canonical form instruction records use
//!
//! Byte values follow the Java Virtual Machine Specification. Short forms
//! (`iload_0`, `ldc_w`, `goto_w`, ...) and the `wide` prefix never appear in
//! instruction records: a record names the canonical opcode and carries its
//! operand explicitly.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// Which immediate operands an opcode takes in an instruction record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandShape {
    None,
    /// `bipush`, `sipush`, `newarray`
    Int,
    /// local variable loads/stores and `ret`
    Var,
    Iinc,
    /// `new`, `anewarray`, `checkcast`, `instanceof`
    Type,
    Field,
    Method,
    InvokeDynamic,
    Jump,
    Ldc,
    TableSwitch,
    LookupSwitch,
    MultiANewArray,
}

macro_rules! define_opcodes {
    ($($variant:ident = $byte:literal => $mnemonic:literal, $shape:ident;)*) => {
        /// Canonical JVM opcode
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $($variant = $byte,)*
        }

        impl Opcode {
            /// Every canonical opcode, in byte order
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];

            /// Lower-case mnemonic as printed by `javap`
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $mnemonic,)*
                }
            }

            pub fn shape(self) -> OperandShape {
                match self {
                    $(Opcode::$variant => OperandShape::$shape,)*
                }
            }

            pub fn from_byte(byte: u8) -> Option<Opcode> {
                match byte {
                    $($byte => Some(Opcode::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

define_opcodes! {
    Nop = 0x00 => "nop", None;
    AconstNull = 0x01 => "aconst_null", None;
    IconstM1 = 0x02 => "iconst_m1", None;
    Iconst0 = 0x03 => "iconst_0", None;
    Iconst1 = 0x04 => "iconst_1", None;
    Iconst2 = 0x05 => "iconst_2", None;
    Iconst3 = 0x06 => "iconst_3", None;
    Iconst4 = 0x07 => "iconst_4", None;
    Iconst5 = 0x08 => "iconst_5", None;
    Lconst0 = 0x09 => "lconst_0", None;
    Lconst1 = 0x0a => "lconst_1", None;
    Fconst0 = 0x0b => "fconst_0", None;
    Fconst1 = 0x0c => "fconst_1", None;
    Fconst2 = 0x0d => "fconst_2", None;
    Dconst0 = 0x0e => "dconst_0", None;
    Dconst1 = 0x0f => "dconst_1", None;
    Bipush = 0x10 => "bipush", Int;
    Sipush = 0x11 => "sipush", Int;
    Ldc = 0x12 => "ldc", Ldc;
    Iload = 0x15 => "iload", Var;
    Lload = 0x16 => "lload", Var;
    Fload = 0x17 => "fload", Var;
    Dload = 0x18 => "dload", Var;
    Aload = 0x19 => "aload", Var;
    Iaload = 0x2e => "iaload", None;
    Laload = 0x2f => "laload", None;
    Faload = 0x30 => "faload", None;
    Daload = 0x31 => "daload", None;
    Aaload = 0x32 => "aaload", None;
    Baload = 0x33 => "baload", None;
    Caload = 0x34 => "caload", None;
    Saload = 0x35 => "saload", None;
    Istore = 0x36 => "istore", Var;
    Lstore = 0x37 => "lstore", Var;
    Fstore = 0x38 => "fstore", Var;
    Dstore = 0x39 => "dstore", Var;
    Astore = 0x3a => "astore", Var;
    Iastore = 0x4f => "iastore", None;
    Lastore = 0x50 => "lastore", None;
    Fastore = 0x51 => "fastore", None;
    Dastore = 0x52 => "dastore", None;
    Aastore = 0x53 => "aastore", None;
    Bastore = 0x54 => "bastore", None;
    Castore = 0x55 => "castore", None;
    Sastore = 0x56 => "sastore", None;
    Pop = 0x57 => "pop", None;
    Pop2 = 0x58 => "pop2", None;
    Dup = 0x59 => "dup", None;
    DupX1 = 0x5a => "dup_x1", None;
    DupX2 = 0x5b => "dup_x2", None;
    Dup2 = 0x5c => "dup2", None;
    Dup2X1 = 0x5d => "dup2_x1", None;
    Dup2X2 = 0x5e => "dup2_x2", None;
    Swap = 0x5f => "swap", None;
    Iadd = 0x60 => "iadd", None;
    Ladd = 0x61 => "ladd", None;
    Fadd = 0x62 => "fadd", None;
    Dadd = 0x63 => "dadd", None;
    Isub = 0x64 => "isub", None;
    Lsub = 0x65 => "lsub", None;
    Fsub = 0x66 => "fsub", None;
    Dsub = 0x67 => "dsub", None;
    Imul = 0x68 => "imul", None;
    Lmul = 0x69 => "lmul", None;
    Fmul = 0x6a => "fmul", None;
    Dmul = 0x6b => "dmul", None;
    Idiv = 0x6c => "idiv", None;
    Ldiv = 0x6d => "ldiv", None;
    Fdiv = 0x6e => "fdiv", None;
    Ddiv = 0x6f => "ddiv", None;
    Irem = 0x70 => "irem", None;
    Lrem = 0x71 => "lrem", None;
    Frem = 0x72 => "frem", None;
    Drem = 0x73 => "drem", None;
    Ineg = 0x74 => "ineg", None;
    Lneg = 0x75 => "lneg", None;
    Fneg = 0x76 => "fneg", None;
    Dneg = 0x77 => "dneg", None;
    Ishl = 0x78 => "ishl", None;
    Lshl = 0x79 => "lshl", None;
    Ishr = 0x7a => "ishr", None;
    Lshr = 0x7b => "lshr", None;
    Iushr = 0x7c => "iushr", None;
    Lushr = 0x7d => "lushr", None;
    Iand = 0x7e => "iand", None;
    Land = 0x7f => "land", None;
    Ior = 0x80 => "ior", None;
    Lor = 0x81 => "lor", None;
    Ixor = 0x82 => "ixor", None;
    Lxor = 0x83 => "lxor", None;
    Iinc = 0x84 => "iinc", Iinc;
    I2l = 0x85 => "i2l", None;
    I2f = 0x86 => "i2f", None;
    I2d = 0x87 => "i2d", None;
    L2i = 0x88 => "l2i", None;
    L2f = 0x89 => "l2f", None;
    L2d = 0x8a => "l2d", None;
    F2i = 0x8b => "f2i", None;
    F2l = 0x8c => "f2l", None;
    F2d = 0x8d => "f2d", None;
    D2i = 0x8e => "d2i", None;
    D2l = 0x8f => "d2l", None;
    D2f = 0x90 => "d2f", None;
    I2b = 0x91 => "i2b", None;
    I2c = 0x92 => "i2c", None;
    I2s = 0x93 => "i2s", None;
    Lcmp = 0x94 => "lcmp", None;
    Fcmpl = 0x95 => "fcmpl", None;
    Fcmpg = 0x96 => "fcmpg", None;
    Dcmpl = 0x97 => "dcmpl", None;
    Dcmpg = 0x98 => "dcmpg", None;
    Ifeq = 0x99 => "ifeq", Jump;
    Ifne = 0x9a => "ifne", Jump;
    Iflt = 0x9b => "iflt", Jump;
    Ifge = 0x9c => "ifge", Jump;
    Ifgt = 0x9d => "ifgt", Jump;
    Ifle = 0x9e => "ifle", Jump;
    IfIcmpeq = 0x9f => "if_icmpeq", Jump;
    IfIcmpne = 0xa0 => "if_icmpne", Jump;
    IfIcmplt = 0xa1 => "if_icmplt", Jump;
    IfIcmpge = 0xa2 => "if_icmpge", Jump;
    IfIcmpgt = 0xa3 => "if_icmpgt", Jump;
    IfIcmple = 0xa4 => "if_icmple", Jump;
    IfAcmpeq = 0xa5 => "if_acmpeq", Jump;
    IfAcmpne = 0xa6 => "if_acmpne", Jump;
    Goto = 0xa7 => "goto", Jump;
    Jsr = 0xa8 => "jsr", Jump;
    Ret = 0xa9 => "ret", Var;
    Tableswitch = 0xaa => "tableswitch", TableSwitch;
    Lookupswitch = 0xab => "lookupswitch", LookupSwitch;
    Ireturn = 0xac => "ireturn", None;
    Lreturn = 0xad => "lreturn", None;
    Freturn = 0xae => "freturn", None;
    Dreturn = 0xaf => "dreturn", None;
    Areturn = 0xb0 => "areturn", None;
    Return = 0xb1 => "return", None;
    Getstatic = 0xb2 => "getstatic", Field;
    Putstatic = 0xb3 => "putstatic", Field;
    Getfield = 0xb4 => "getfield", Field;
    Putfield = 0xb5 => "putfield", Field;
    Invokevirtual = 0xb6 => "invokevirtual", Method;
    Invokespecial = 0xb7 => "invokespecial", Method;
    Invokestatic = 0xb8 => "invokestatic", Method;
    Invokeinterface = 0xb9 => "invokeinterface", Method;
    Invokedynamic = 0xba => "invokedynamic", InvokeDynamic;
    New = 0xbb => "new", Type;
    Newarray = 0xbc => "newarray", Int;
    Anewarray = 0xbd => "anewarray", Type;
    Arraylength = 0xbe => "arraylength", None;
    Athrow = 0xbf => "athrow", None;
    Checkcast = 0xc0 => "checkcast", Type;
    Instanceof = 0xc1 => "instanceof", Type;
    Monitorenter = 0xc2 => "monitorenter", None;
    Monitorexit = 0xc3 => "monitorexit", None;
    Multianewarray = 0xc5 => "multianewarray", MultiANewArray;
    Ifnull = 0xc6 => "ifnull", Jump;
    Ifnonnull = 0xc7 => "ifnonnull", Jump;
}

static BY_MNEMONIC: Lazy<HashMap<&'static str, Opcode>> = Lazy::new(|| {
    Opcode::ALL.iter().map(|op| (op.mnemonic(), *op)).collect()
});

impl Opcode {
    pub fn from_mnemonic(mnemonic: &str) -> Option<Opcode> {
        BY_MNEMONIC.get(mnemonic).copied()
    }

    pub fn byte(self) -> u8 {
        self as u8
    }

    /// `ireturn` .. `return`
    pub fn is_return(self) -> bool {
        (Opcode::Ireturn.byte()..=Opcode::Return.byte()).contains(&self.byte())
    }

    /// True when control never falls through to the next instruction.
    pub fn ends_flow(self) -> bool {
        self.is_return()
            || matches!(
                self,
                Opcode::Athrow | Opcode::Goto | Opcode::Tableswitch | Opcode::Lookupswitch
            )
    }

    /// Legacy subroutine call/return
    pub fn is_subroutine(self) -> bool {
        matches!(self, Opcode::Jsr | Opcode::Ret)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// `newarray` element type codes
pub mod array_types {
    pub const T_BOOLEAN: i32 = 4;
    pub const T_CHAR: i32 = 5;
    pub const T_FLOAT: i32 = 6;
    pub const T_DOUBLE: i32 = 7;
    pub const T_BYTE: i32 = 8;
    pub const T_SHORT: i32 = 9;
    pub const T_INT: i32 = 10;
    pub const T_LONG: i32 = 11;

    /// Array descriptor for a `newarray` type code
    pub fn descriptor(code: i32) -> Option<&'static str> {
        Some(match code {
            T_BOOLEAN => "[Z",
            T_CHAR => "[C",
            T_FLOAT => "[F",
            T_DOUBLE => "[D",
            T_BYTE => "[B",
            T_SHORT => "[S",
            T_INT => "[I",
            T_LONG => "[J",
            _ => return None,
        })
    }

    /// Keyword used by `javap` for a type code
    pub fn keyword(code: i32) -> Option<&'static str> {
        Some(match code {
            T_BOOLEAN => "boolean",
            T_CHAR => "char",
            T_FLOAT => "float",
            T_DOUBLE => "double",
            T_BYTE => "byte",
            T_SHORT => "short",
            T_INT => "int",
            T_LONG => "long",
            _ => return None,
        })
    }

    pub fn from_keyword(keyword: &str) -> Option<i32> {
        (T_BOOLEAN..=T_LONG).find(|code| self::keyword(*code) == Some(keyword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_round_trip_covers_all() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_byte(op.byte()), Some(*op));
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(*op));
        }
    }

    #[test]
    fn test_short_forms_are_not_canonical() {
        // iload_0 and goto_w
        assert_eq!(Opcode::from_byte(0x1a), None);
        assert_eq!(Opcode::from_byte(0xc8), None);
        assert_eq!(Opcode::from_mnemonic("iload_0"), None);
    }

    #[test]
    fn test_flow_classification() {
        assert!(Opcode::Areturn.is_return());
        assert!(Opcode::Return.ends_flow());
        assert!(Opcode::Lookupswitch.ends_flow());
        assert!(!Opcode::Ifeq.ends_flow());
        assert!(Opcode::Ret.is_subroutine());
    }

    #[test]
    fn test_array_type_codes() {
        assert_eq!(array_types::descriptor(array_types::T_INT), Some("[I"));
        assert_eq!(array_types::from_keyword("long"), Some(array_types::T_LONG));
        assert_eq!(array_types::descriptor(3), None);
    }
}
