//! Parsing MIPS assembly lines into decoded instructions.
//!
//! The main function here is [`parse_line`], which decodes a single line of assembly
//! into an [`Instruction`].
//!
//! A line is processed as follows:
//! 1. Commas are stripped and the line is split on whitespace.
//! 2. The first field is the mnemonic (case-insensitive), looked up in the mnemonic table.
//! 3. The remaining fields are operands, each of which is tokenized by the [`lex`] module.
//!    Fields past the ones the mnemonic needs are ignored.
//!
//! ```
//! use mips_stepper::parse::parse_line;
//! use mips_stepper::ast::{Category, Instr, IOp};
//! use mips_stepper::ast::reg_consts::{R0, ZERO};
//!
//! let instr = parse_line("addi, $r0, $zero, 0xF").unwrap();
//! assert_eq!(instr.instr().category(), Category::I);
//! assert_eq!(*instr.instr(), Instr::I { op: IOp::Addi, rs: R0, rt: ZERO, imm: 15 });
//! ```

pub mod lex;

use std::borrow::Cow;

use logos::{Logos, Span};

use crate::ast::{Instr, Instruction, Mnemonic, Reg};
use self::lex::{LexErr, Token};

/// Parses one line of assembly into an instruction.
///
/// The resulting [`Instruction`] keeps `line` (minus surrounding whitespace) as its source text.
pub fn parse_line(line: &str) -> Result<Instruction, ParseErr> {
    let mut fields = Fields::new(line);

    let Some((span, name)) = fields.next() else {
        return Err(ParseErr::new(ParseErrKind::Empty, 0..line.len()));
    };
    let mnemonic: Mnemonic = name.parse()
        .map_err(|_| ParseErr::new(ParseErrKind::UnknownMnemonic, span))?;

    let mut ops = Operands { fields, end: line.len() };
    let instr = match mnemonic {
        Mnemonic::R(op) => {
            let rd = ops.reg()?;
            let rs = ops.reg()?;
            let rt = ops.reg()?;
            Instr::R { op, rd, rs, rt }
        },
        Mnemonic::I(op) => {
            let rs = ops.reg()?;
            let rt = ops.reg()?;
            let imm = ops.imm()?;
            Instr::I { op, rs, rt, imm }
        },
        Mnemonic::Mem(op) => {
            let rt = ops.reg()?;
            let (rs, imm) = ops.mem()?;
            Instr::Mem { op, rt, rs, imm }
        },
        Mnemonic::J => Instr::J { target: ops.imm()? },
        Mnemonic::Beq => {
            let rs = ops.reg()?;
            let rt = ops.reg()?;
            let target = ops.imm()?;
            Instr::Beq { rs, rt, target }
        },
        Mnemonic::Nop  => Instr::Nop,
        Mnemonic::Exit => Instr::Exit,
    };

    Ok(Instruction::new(line.trim(), instr))
}

/// Kinds of errors that can occur from parsing a line.
///
/// See [`ParseErr`] for this error type with span information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ParseErrKind {
    /// The line contained no fields.
    Empty,
    /// The first field is not a supported mnemonic.
    UnknownMnemonic,
    /// An operand could not be tokenized.
    Lex(LexErr),
    /// The instruction needs more operands than were given.
    MissingOperand,
    /// Expected a register here.
    ExpectedReg,
    /// Expected a numeric literal here.
    ExpectedImm,
    /// Expected `offset(register)` or a register here.
    ExpectedMemOperand,
    /// A memory operand was written as `(register)` without an offset.
    MissingOffset,
    /// The operand is not a register, a number, or `offset(register)`.
    InvalidOperand,
}
impl std::fmt::Display for ParseErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty              => f.write_str("empty line"),
            Self::UnknownMnemonic    => f.write_str("unknown instruction"),
            Self::Lex(e)             => write!(f, "{e}"),
            Self::MissingOperand     => f.write_str("missing operand"),
            Self::ExpectedReg        => f.write_str("expected register"),
            Self::ExpectedImm        => f.write_str("expected immediate"),
            Self::ExpectedMemOperand => f.write_str("expected memory operand"),
            Self::MissingOffset      => f.write_str("memory operand is missing its offset"),
            Self::InvalidOperand     => f.write_str("invalid operand"),
        }
    }
}

/// Error from parsing a line.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParseErr {
    /// The kind of error.
    pub kind: ParseErrKind,
    /// The byte span in the line associated with this error.
    pub span: Span
}
impl ParseErr {
    /// Creates a new [`ParseErr`].
    pub fn new(kind: ParseErrKind, span: Span) -> Self {
        ParseErr { kind, span }
    }
}
impl std::fmt::Display for ParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}
impl std::error::Error for ParseErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ParseErrKind::Lex(e) => Some(e),
            _ => None
        }
    }
}
impl crate::err::Error for ParseErr {
    fn help(&self) -> Option<Cow<str>> {
        match &self.kind {
            ParseErrKind::Empty              => None,
            ParseErrKind::UnknownMnemonic    => Some("supported instructions are add, sub, mult, div, and, or, nor, slt, addi, subi, andi, xori, lw, sw, j, beq, nop, exit".into()),
            ParseErrKind::Lex(e)             => crate::err::Error::help(e),
            ParseErrKind::MissingOperand     => None,
            ParseErrKind::ExpectedReg        => Some("registers are written like $r0 or $sp".into()),
            ParseErrKind::ExpectedImm        => Some("immediates are decimal (15) or hex (0xF)".into()),
            ParseErrKind::ExpectedMemOperand => Some("memory operands are written like 4($sp) or $sp".into()),
            ParseErrKind::MissingOffset      => Some("add an offset before the parenthesis, e.g. 0($sp)".into()),
            ParseErrKind::InvalidOperand     => Some("operands are registers, numbers, or offset(register)".into()),
        }
    }
}

/// Iterator over the comma-stripped, whitespace-separated fields of a line,
/// along with the span each field occupies in the line.
struct Fields<'s> {
    src: &'s str,
    pos: usize,
}
impl<'s> Fields<'s> {
    fn new(src: &'s str) -> Self {
        Self { src, pos: 0 }
    }
}
impl<'s> Iterator for Fields<'s> {
    type Item = (Span, Cow<'s, str>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest = &self.src[self.pos..];
            let start = self.pos + rest.find(|c: char| !c.is_whitespace())?;
            let len = self.src[start..]
                .find(char::is_whitespace)
                .unwrap_or(self.src.len() - start);
            self.pos = start + len;

            let raw = &self.src[start..self.pos];
            let field = match raw.contains(',') {
                true  => Cow::Owned(raw.replace(',', "")),
                false => Cow::Borrowed(raw),
            };

            // A field of only commas disappears entirely.
            if !field.is_empty() {
                break Some((start..self.pos, field));
            }
        }
    }
}

/// The shape of a single operand.
#[derive(Debug, Clone, Copy)]
enum Operand {
    Reg(Reg),
    Imm(i16),
    Mem(i16, Reg),
}
impl Operand {
    fn lex(field: &str, span: Span) -> Result<Self, ParseErr> {
        let tokens = Token::lexer(field)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ParseErr::new(ParseErrKind::Lex(e), span.clone()))?;

        match tokens.as_slice() {
            &[Token::Reg(r)] => Ok(Operand::Reg(r)),
            &[Token::Int(i)] => Ok(Operand::Imm(i)),
            &[Token::Int(off), Token::LParen, Token::Reg(r), Token::RParen] => Ok(Operand::Mem(off, r)),
            [Token::LParen, Token::Reg(_), Token::RParen] => Err(ParseErr::new(ParseErrKind::MissingOffset, span)),
            _ => Err(ParseErr::new(ParseErrKind::InvalidOperand, span)),
        }
    }
}

/// The operand fields that follow a mnemonic.
struct Operands<'s> {
    fields: Fields<'s>,
    /// End of the line, used as the span of missing operands.
    end: usize,
}
impl Operands<'_> {
    fn next_operand(&mut self) -> Result<(Operand, Span), ParseErr> {
        let Some((span, field)) = self.fields.next() else {
            return Err(ParseErr::new(ParseErrKind::MissingOperand, self.end..self.end));
        };
        Operand::lex(&field, span.clone()).map(|op| (op, span))
    }

    fn reg(&mut self) -> Result<Reg, ParseErr> {
        match self.next_operand()? {
            (Operand::Reg(r), _) => Ok(r),
            (_, span) => Err(ParseErr::new(ParseErrKind::ExpectedReg, span)),
        }
    }

    fn imm(&mut self) -> Result<i16, ParseErr> {
        match self.next_operand()? {
            (Operand::Imm(i), _) => Ok(i),
            (_, span) => Err(ParseErr::new(ParseErrKind::ExpectedImm, span)),
        }
    }

    /// Reads `offset(reg)` or a bare `reg` (offset 0).
    fn mem(&mut self) -> Result<(Reg, i16), ParseErr> {
        match self.next_operand()? {
            (Operand::Mem(off, r), _) => Ok((r, off)),
            (Operand::Reg(r), _) => Ok((r, 0)),
            (Operand::Imm(_), span) => Err(ParseErr::new(ParseErrKind::ExpectedMemOperand, span)),
        }
    }
}
