//! Textual instruction listings
//!
//! One record per line, in the syntax `Insn` prints:
//!
//! ```text
//! # comment
//! L0:
//! ldc "Mods..."
//! bipush 25
//! i2f
//! invokevirtual a/Panel.inBMid (F)V
//! frame expanded {a/Panel, int} {}
//! ```

use super::insn::{Constant, FrameKind, FrameRecord, Insn, Label, VerificationType};
use super::opcodes::{array_types, OperandShape, Opcode};
use crate::error::{Error, Result};
use logos::Logos;
use std::path::Path;

/// Listing tokens. Lines are lexed one at a time, so newlines never appear.
#[derive(Logos, Debug, PartialEq, Clone, Copy)]
#[logos(skip r"[ \t\r]+")]
enum Token {
    #[regex(r"#[^\n]*", logos::skip)]
    Comment,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("-")]
    Minus,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,
    #[regex(r"-?[0-9]+[lL]")]
    LongLit,
    #[regex(r"-?[0-9]+(\.[0-9]+)?([eE][-+]?[0-9]+)?[fF]")]
    FloatLit,
    #[regex(r"-?[0-9]+\.[0-9]+([eE][-+]?[0-9]+)?[dD]?")]
    #[regex(r"-?[0-9]+([eE][-+]?[0-9]+)?[dD]")]
    DoubleLit,
    #[regex(r"-?[0-9]+")]
    IntLit,
    #[regex(r"[A-Za-z_$<\[(][A-Za-z0-9_$/<>;\[\]().]*")]
    Word,
}

/// Parse a listing into instruction records.
pub fn parse(source: &str) -> Result<Vec<Insn>> {
    let mut insns = Vec::new();
    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        let tokens = tokenize(text, line)?;
        if tokens.is_empty() {
            continue;
        }
        LineParser { tokens, pos: 0, line }.parse_into(&mut insns)?;
    }
    log::debug!("parsed {} listing records", insns.len());
    Ok(insns)
}

/// Read and parse a listing file.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<Insn>> {
    let source = std::fs::read_to_string(path)?;
    parse(&source)
}

/// Render records back into listing syntax, one per line.
pub fn render(insns: &[Insn]) -> String {
    let mut out = String::new();
    for insn in insns {
        out.push_str(&insn.to_string());
        out.push('\n');
    }
    out
}

/// `iload_1` and friends: load/store with the slot folded into the mnemonic
fn short_var(mnemonic: &str) -> Option<Insn> {
    let (base, slot) = mnemonic.rsplit_once('_')?;
    let op = Opcode::from_mnemonic(base)?;
    let index = slot.parse::<u16>().ok().filter(|i| *i <= 3)?;
    (op.shape() == OperandShape::Var && op != Opcode::Ret).then_some(Insn::Var { op, index })
}

fn tokenize(text: &str, line: usize) -> Result<Vec<(Token, &str)>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(text);
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push((token, lexer.slice())),
            Err(_) => {
                return Err(Error::listing(
                    line,
                    format!("unexpected input '{}'", lexer.slice()),
                ))
            }
        }
    }
    Ok(tokens)
}

struct LineParser<'a> {
    tokens: Vec<(Token, &'a str)>,
    pos: usize,
    line: usize,
}

impl<'a> LineParser<'a> {
    fn error(&self, message: impl Into<String>) -> Error {
        Error::listing(self.line, message)
    }

    fn peek(&self) -> Option<(Token, &'a str)> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Result<(Token, &'a str)> {
        let token = self.peek().ok_or_else(|| self.error("unexpected end of line"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<&'a str> {
        match self.next()? {
            (token, text) if token == expected => Ok(text),
            (_, text) => Err(self.error(format!("expected {}, found '{}'", what, text))),
        }
    }

    fn word(&mut self, what: &str) -> Result<&'a str> {
        self.expect(Token::Word, what)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn parse_into(&mut self, insns: &mut Vec<Insn>) -> Result<()> {
        // Label definitions may share a line with an instruction
        while let (Some((Token::Word, text)), Some((Token::Colon, _))) =
            (self.peek(), self.tokens.get(self.pos + 1).copied())
        {
            insns.push(Insn::Label(self.label_from(text)?));
            self.pos += 2;
        }
        if self.at_end() {
            return Ok(());
        }
        let insn = self.instruction()?;
        if let Some((_, text)) = self.peek() {
            return Err(self.error(format!("trailing input '{}'", text)));
        }
        insns.push(insn);
        Ok(())
    }

    fn label_from(&self, text: &str) -> Result<Label> {
        text.strip_prefix('L')
            .and_then(|n| n.parse::<u32>().ok())
            .map(Label)
            .ok_or_else(|| self.error(format!("invalid label '{}'", text)))
    }

    fn label(&mut self) -> Result<Label> {
        let text = self.word("label")?;
        self.label_from(text)
    }

    fn int<T: std::str::FromStr>(&mut self, what: &str) -> Result<T> {
        let text = self.expect(Token::IntLit, what)?;
        text.parse::<T>()
            .map_err(|_| self.error(format!("{} out of range: {}", what, text)))
    }

    fn instruction(&mut self) -> Result<Insn> {
        let mnemonic = self.word("mnemonic")?;
        if mnemonic == "frame" {
            return self.frame();
        }
        let canonical = match mnemonic {
            "ldc_w" | "ldc2_w" => Some(Opcode::Ldc),
            "goto_w" => Some(Opcode::Goto),
            "jsr_w" => Some(Opcode::Jsr),
            other => Opcode::from_mnemonic(other),
        };
        if let Some(op) = canonical {
            return self.operands(op);
        }
        short_var(mnemonic).ok_or_else(|| self.error(format!("unknown mnemonic '{}'", mnemonic)))
    }

    fn operands(&mut self, op: Opcode) -> Result<Insn> {
        let insn = match op.shape() {
            OperandShape::None => Insn::Simple(op),
            OperandShape::Int if op == Opcode::Newarray => {
                let operand = match self.next()? {
                    (Token::IntLit, text) => text
                        .parse::<i32>()
                        .map_err(|_| self.error(format!("invalid array type '{}'", text)))?,
                    (Token::Word, text) => array_types::from_keyword(text)
                        .ok_or_else(|| self.error(format!("invalid array type '{}'", text)))?,
                    (_, text) => return Err(self.error(format!("invalid array type '{}'", text))),
                };
                Insn::Int { op, operand }
            }
            OperandShape::Int => Insn::Int { op, operand: self.int("operand")? },
            OperandShape::Var => Insn::Var { op, index: self.int("local index")? },
            OperandShape::Iinc => Insn::Iinc {
                index: self.int("local index")?,
                delta: self.int("increment")?,
            },
            OperandShape::Type => Insn::Type {
                op,
                type_name: self.word("type name")?.to_string(),
            },
            OperandShape::Field => {
                let (owner, name) = self.member()?;
                Insn::Field {
                    op,
                    owner,
                    name,
                    descriptor: self.word("field descriptor")?.to_string(),
                }
            }
            OperandShape::Method => {
                let (owner, name) = self.member()?;
                let descriptor = self.word("method descriptor")?.to_string();
                let interface = match self.peek() {
                    Some((Token::Word, "itf")) => {
                        self.pos += 1;
                        true
                    }
                    _ => op == Opcode::Invokeinterface,
                };
                Insn::Method { op, owner, name, descriptor, interface }
            }
            OperandShape::InvokeDynamic => Insn::InvokeDynamic {
                name: self.word("call site name")?.to_string(),
                descriptor: self.word("method descriptor")?.to_string(),
            },
            OperandShape::Jump => Insn::Jump { op, target: self.label()? },
            OperandShape::Ldc => Insn::Ldc(self.constant()?),
            OperandShape::TableSwitch => {
                let min: i32 = self.int("low key")?;
                let max: i32 = self.int("high key")?;
                let default = self.label()?;
                let mut targets = Vec::new();
                while !self.at_end() {
                    targets.push(self.label()?);
                }
                if max < min || targets.len() as i64 != max as i64 - min as i64 + 1 {
                    return Err(self.error(format!(
                        "tableswitch {}..{} needs {} targets, found {}",
                        min,
                        max,
                        max as i64 - min as i64 + 1,
                        targets.len()
                    )));
                }
                Insn::TableSwitch { min, max, default, targets }
            }
            OperandShape::LookupSwitch => {
                let default = self.label()?;
                let mut pairs = Vec::new();
                while !self.at_end() {
                    let key: i32 = self.int("switch key")?;
                    self.expect(Token::Colon, "':'")?;
                    pairs.push((key, self.label()?));
                }
                Insn::LookupSwitch { default, pairs }
            }
            OperandShape::MultiANewArray => Insn::MultiANewArray {
                descriptor: self.word("array descriptor")?.to_string(),
                dims: self.int("dimensions")?,
            },
        };
        Ok(insn)
    }

    /// `owner.name`, split at the last dot
    fn member(&mut self) -> Result<(String, String)> {
        let text = self.word("member reference")?;
        match text.rsplit_once('.') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
                Ok((owner.to_string(), name.to_string()))
            }
            _ => Err(self.error(format!("expected owner.name, found '{}'", text))),
        }
    }

    fn constant(&mut self) -> Result<Constant> {
        let (token, text) = self.next()?;
        let constant = match token {
            Token::IntLit => Constant::Int(
                text.parse()
                    .map_err(|_| self.error(format!("int constant out of range: {}", text)))?,
            ),
            Token::LongLit => Constant::Long(
                text[..text.len() - 1]
                    .parse()
                    .map_err(|_| self.error(format!("long constant out of range: {}", text)))?,
            ),
            Token::FloatLit => Constant::Float(
                text[..text.len() - 1]
                    .parse()
                    .map_err(|_| self.error(format!("invalid float '{}'", text)))?,
            ),
            Token::DoubleLit => Constant::Double(
                text.trim_end_matches(['d', 'D'])
                    .parse()
                    .map_err(|_| self.error(format!("invalid double '{}'", text)))?,
            ),
            Token::Str => Constant::String(self.unescape(&text[1..text.len() - 1])?),
            Token::Minus => match self.word("Infinity")? {
                "Infinityf" => Constant::Float(f32::NEG_INFINITY),
                "Infinity" | "Infinityd" => Constant::Double(f64::NEG_INFINITY),
                other => return Err(self.error(format!("invalid constant '-{}'", other))),
            },
            Token::Word => match text {
                "NaNf" => Constant::Float(f32::NAN),
                "NaN" | "NaNd" => Constant::Double(f64::NAN),
                "Infinityf" => Constant::Float(f32::INFINITY),
                "Infinity" | "Infinityd" => Constant::Double(f64::INFINITY),
                "class" => Constant::Class(self.word("class name")?.to_string()),
                "methodtype" => Constant::MethodType(self.word("method descriptor")?.to_string()),
                "handle" => {
                    let (owner, name) = self.member()?;
                    let descriptor = self.word("descriptor")?.to_string();
                    Constant::MethodHandle { owner, name, descriptor }
                }
                other => return Err(self.error(format!("invalid constant '{}'", other))),
            },
            _ => return Err(self.error(format!("invalid constant '{}'", text))),
        };
        Ok(constant)
    }

    fn unescape(&self, body: &str) -> Result<String> {
        let mut out = String::with_capacity(body.len());
        let mut chars = body.chars();
        while let Some(ch) = chars.next() {
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            match chars.next() {
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some('\'') => out.push('\''),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('u') => {
                    let hex: String = chars.by_ref().take(4).collect();
                    let decoded = u32::from_str_radix(&hex, 16)
                        .ok()
                        .filter(|_| hex.len() == 4)
                        .and_then(char::from_u32)
                        .ok_or_else(|| self.error(format!("invalid escape '\\u{}'", hex)))?;
                    out.push(decoded);
                }
                Some(other) => return Err(self.error(format!("invalid escape '\\{}'", other))),
                None => return Err(self.error("dangling escape")),
            }
        }
        Ok(out)
    }

    fn frame(&mut self) -> Result<Insn> {
        let keyword = self.word("frame kind")?;
        let kind = FrameKind::from_keyword(keyword)
            .ok_or_else(|| self.error(format!("unknown frame kind '{}'", keyword)))?;
        let locals = self.type_list()?;
        let stack = self.type_list()?;
        Ok(Insn::Frame(FrameRecord { kind, locals, stack }))
    }

    fn type_list(&mut self) -> Result<Vec<VerificationType>> {
        self.expect(Token::LBrace, "'{'")?;
        let mut types = Vec::new();
        if let Some((Token::RBrace, _)) = self.peek() {
            self.pos += 1;
            return Ok(types);
        }
        loop {
            types.push(self.verification_type()?);
            match self.next()? {
                (Token::Comma, _) => continue,
                (Token::RBrace, _) => return Ok(types),
                (_, text) => return Err(self.error(format!("expected ',' or '}}', found '{}'", text))),
            }
        }
    }

    fn verification_type(&mut self) -> Result<VerificationType> {
        let text = self.word("verification type")?;
        let ty = match text {
            "top" => VerificationType::Top,
            "int" => VerificationType::Integer,
            "float" => VerificationType::Float,
            "long" => VerificationType::Long,
            "double" => VerificationType::Double,
            "null" => VerificationType::Null,
            "uninit_this" => VerificationType::UninitializedThis,
            "uninit" => {
                self.expect(Token::Colon, "':'")?;
                VerificationType::Uninitialized(self.label()?)
            }
            name => VerificationType::Object(name.to_string()),
        };
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_listing() {
        let insns = parse(
            "# leading comment\n\
             L0:\n\
             ldc \"Mods...\"   # trailing\n\
             bipush 25\n\
             i2f\n\
             invokevirtual a/Panel.inBMid (F)V\n",
        )
        .unwrap();
        assert_eq!(
            insns,
            vec![
                Insn::Label(Label(0)),
                Insn::ldc(Constant::String("Mods...".into())),
                Insn::int(Opcode::Bipush, 25),
                Insn::simple(Opcode::I2f),
                Insn::method(Opcode::Invokevirtual, "a/Panel", "inBMid", "(F)V"),
            ]
        );
    }

    #[test]
    fn test_numeric_constants() {
        let insns = parse("ldc 7L\nldc 1.5f\nldc 2.5\nldc 3d\nldc -Infinityf\nldc NaN\nldc -2").unwrap();
        assert_eq!(insns[0], Insn::ldc(Constant::Long(7)));
        assert_eq!(insns[1], Insn::ldc(Constant::Float(1.5)));
        assert_eq!(insns[2], Insn::ldc(Constant::Double(2.5)));
        assert_eq!(insns[3], Insn::ldc(Constant::Double(3.0)));
        assert_eq!(insns[4], Insn::ldc(Constant::Float(f32::NEG_INFINITY)));
        match &insns[5] {
            Insn::Ldc(Constant::Double(v)) => assert!(v.is_nan()),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(insns[6], Insn::ldc(Constant::Int(-2)));
    }

    #[test]
    fn test_string_escapes() {
        let insns = parse(r#"ldc "a\"b\\c\nA""#).unwrap();
        assert_eq!(insns[0], Insn::ldc(Constant::String("a\"b\\c\nA".into())));
        assert!(parse(r#"ldc "\q""#).is_err());
    }

    #[test]
    fn test_frames_and_switches() {
        let insns = parse(
            "frame expanded {a/Main, uninit:L3, long} {uninit_this}\n\
             tableswitch 0 1 L9 L1 L2\n\
             lookupswitch L9 -1:L1 10:L2\n\
             L4: goto L4",
        )
        .unwrap();
        assert_eq!(
            insns[0],
            Insn::Frame(FrameRecord::expanded(
                vec![
                    VerificationType::Object("a/Main".into()),
                    VerificationType::Uninitialized(Label(3)),
                    VerificationType::Long,
                ],
                vec![VerificationType::UninitializedThis],
            ))
        );
        assert_eq!(
            insns[2],
            Insn::LookupSwitch { default: Label(9), pairs: vec![(-1, Label(1)), (10, Label(2))] }
        );
        assert_eq!(insns[3], Insn::Label(Label(4)));
        assert_eq!(insns[4], Insn::jump(Opcode::Goto, Label(4)));
    }

    #[test]
    fn test_short_forms() {
        let insns = parse("aload_0\nldc_w 3\nnewarray byte").unwrap();
        assert_eq!(insns[0], Insn::var(Opcode::Aload, 0));
        assert_eq!(insns[1], Insn::ldc(Constant::Int(3)));
        assert_eq!(insns[2], Insn::int(Opcode::Newarray, array_types::T_BYTE));
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let err = parse("nop\n\nfrobnicate 1").unwrap_err();
        assert!(matches!(err, Error::Listing { line: 3, .. }));
        let err = parse("iadd 4").unwrap_err();
        assert!(matches!(err, Error::Listing { line: 1, .. }));
        let err = parse("tableswitch 0 2 L0 L1").unwrap_err();
        assert!(matches!(err, Error::Listing { line: 1, .. }));
    }

    #[test]
    fn test_render_reparses() {
        let source = "L0:\nldc -0.5f\nldc 1.0E10d\ngetfield a/B.c J\nframe same {} {}\n";
        let insns = parse(source).unwrap();
        assert_eq!(parse(&render(&insns)).unwrap(), insns);
    }
}
