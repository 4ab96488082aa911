//! Tokenizing operands of MIPS assembly.
//!
//! A source line is first split into whitespace-separated fields (see [`crate::parse`]).
//! Each operand field is then broken into [`Token`]s by this module,
//! so that `8($sp)` becomes `Int(8)`, `LParen`, `Reg($sp)`, `RParen`.

use std::num::IntErrorKind;

use logos::{Lexer, Logos};

use crate::ast::{Reg, RegErr};

/// A unit of information in an operand.
#[derive(Debug, Logos, PartialEq, Eq, Clone, Copy)]
#[logos(skip r"[ \t]+", error = LexErr)]
pub enum Token {
    // Like the register regex, this regex spans over text that is technically invalid
    // (e.g., `12ab` or `0xZZ`). The callback validates it.

    /// A numeric literal.
    ///
    /// This is decimal (e.g., `15`, `-3`, `+4`) unless it contains a lowercase `x`,
    /// in which case everything after the first `x` is read as hex
    /// (e.g., `0xF`, `xF`, `0x-10`).
    #[regex(r"[\w+-]+", lex_int)]
    Int(i16),

    /// A register (e.g., `$zero`, `$r0`, `$sp`).
    #[regex(r"\$[^()\s]*", lex_reg)]
    Reg(Reg),

    /// The opening parenthesis of a memory operand.
    #[token("(")]
    LParen,

    /// The closing parenthesis of a memory operand.
    #[token(")")]
    RParen,
}

/// Any errors raised in attempting to tokenize an operand.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub enum LexErr {
    /// Numeric literal cannot fit within the range of an i16
    DoesNotFitI16,
    /// Hex literal (containing x) has invalid hex digits
    InvalidHex,
    /// Hex literal (containing x) doesn't have digits after the x.
    InvalidHexEmpty,
    /// Numeric literal could not be parsed as a decimal literal because it has invalid digits
    InvalidNumeric,
    /// Numeric literal has a sign but no digits.
    InvalidDecEmpty,
    /// Int parsing failed but the reason why is unknown
    UnknownIntErr,
    /// Token started with `$` but does not name a register.
    InvalidReg(RegErr),
    /// A symbol was used which is not allowed in an operand
    #[default]
    InvalidSymbol
}
impl std::fmt::Display for LexErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErr::DoesNotFitI16   => f.write_str("numeric token does not fit 16-bit signed integer"),
            LexErr::InvalidHex      => f.write_str("invalid hex literal"),
            LexErr::InvalidHexEmpty => f.write_str("invalid hex literal"),
            LexErr::InvalidNumeric  => f.write_str("invalid decimal literal"),
            LexErr::InvalidDecEmpty => f.write_str("invalid decimal literal"),
            LexErr::UnknownIntErr   => f.write_str("could not parse integer"),
            LexErr::InvalidReg(e)   => write!(f, "invalid register: {e}"),
            LexErr::InvalidSymbol   => f.write_str("unrecognized symbol"),
        }
    }
}
impl std::error::Error for LexErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LexErr::InvalidReg(e) => Some(e),
            _ => None
        }
    }
}
impl crate::err::Error for LexErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            LexErr::DoesNotFitI16    => Some(format!("the range for a 16-bit signed integer is [{}, {}]", i16::MIN, i16::MAX).into()),
            LexErr::InvalidHex       => Some("a hex literal contains 'x' followed by 0-9, A-F".into()),
            LexErr::InvalidHexEmpty  => Some("there should be hex digits (0-9, A-F) after the 'x'".into()),
            LexErr::InvalidNumeric   => Some("a decimal literal only consists of digits 0-9".into()),
            LexErr::InvalidDecEmpty  => Some("there should be digits (0-9) here".into()),
            LexErr::UnknownIntErr    => None,
            LexErr::InvalidReg(e)    => crate::err::Error::help(e),
            LexErr::InvalidSymbol    => Some("operands are registers, numbers, or offset(register)".into()),
        }
    }
}

/// Helper that converts an int error kind to its corresponding LexErr, based on the provided inputs.
fn convert_int_error(
    e: &IntErrorKind,
    invalid_digits_err: LexErr,
    empty_err: LexErr,
    src: &str
) -> LexErr {
    match e {
        IntErrorKind::Empty        => empty_err,
        IntErrorKind::InvalidDigit if matches!(src, "-" | "+") => empty_err,
        IntErrorKind::InvalidDigit => invalid_digits_err,
        IntErrorKind::PosOverflow  => LexErr::DoesNotFitI16,
        IntErrorKind::NegOverflow  => LexErr::DoesNotFitI16,
        _ => LexErr::UnknownIntErr,
    }
}
fn lex_int(lx: &Lexer<'_, Token>) -> Result<i16, LexErr> {
    let string = lx.slice();

    match string.split_once('x') {
        Some((_, hex)) => i16::from_str_radix(hex, 16)
            .map_err(|e| convert_int_error(e.kind(), LexErr::InvalidHex, LexErr::InvalidHexEmpty, hex)),
        None => string.parse::<i16>()
            .map_err(|e| convert_int_error(e.kind(), LexErr::InvalidNumeric, LexErr::InvalidDecEmpty, string)),
    }
}
fn lex_reg(lx: &Lexer<'_, Token>) -> Result<Reg, LexErr> {
    lx.slice().parse::<Reg>()
        .map_err(LexErr::InvalidReg)
}

#[cfg(test)]
mod tests {
    use logos::Logos;

    use crate::ast::reg_consts::*;
    use crate::ast::RegErr;
    use crate::parse::lex::{LexErr, Token};

    #[test]
    fn test_numeric_dec_success() {
        let mut tokens = Token::lexer("0 123 456 789");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(123))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(456))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(789))));
        assert_eq!(tokens.next(), None);

        // Signs
        let mut tokens = Token::lexer("-123 +456 -0");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(-123))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(456))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_numeric_hex_success() {
        let mut tokens = Token::lexer("0xF xF 0x7FFF 0x10 0xabcd");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0xF))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0xF))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0x7FFF))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0x10))));
        assert_eq!(Token::lexer("0xabcd").next(), Some(Err(LexErr::DoesNotFitI16)));

        // Everything after the x is the hex literal, so the sign goes after it
        let mut tokens = Token::lexer("0x-10 x-8000");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(-0x10))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(-0x8000))));
        assert_eq!(tokens.next(), None);

        // Uppercase X does not mark hex
        assert_eq!(Token::lexer("0XF").next(), Some(Err(LexErr::InvalidNumeric)));
    }

    #[test]
    fn test_numeric_overflow() {
        let mut tokens = Token::lexer("32767 -32768");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(32767))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(-32768))));
        assert_eq!(tokens.next(), None);

        assert_eq!(Token::lexer("32768").next(), Some(Err(LexErr::DoesNotFitI16)));
        assert_eq!(Token::lexer("-32769").next(), Some(Err(LexErr::DoesNotFitI16)));
        assert_eq!(Token::lexer("0x8000").next(), Some(Err(LexErr::DoesNotFitI16)));
        assert_eq!(Token::lexer("0xFFFF").next(), Some(Err(LexErr::DoesNotFitI16)));
        assert_eq!(Token::lexer("999999999999999999999").next(), Some(Err(LexErr::DoesNotFitI16)));
    }

    #[test]
    fn test_numeric_invalid() {
        assert_eq!(Token::lexer("3Q").next(), Some(Err(LexErr::InvalidNumeric)));
        assert_eq!(Token::lexer("abc").next(), Some(Err(LexErr::InvalidNumeric)));
        assert_eq!(Token::lexer("-").next(), Some(Err(LexErr::InvalidDecEmpty)));
        assert_eq!(Token::lexer("0x").next(), Some(Err(LexErr::InvalidHexEmpty)));
        assert_eq!(Token::lexer("0xG").next(), Some(Err(LexErr::InvalidHex)));
    }

    #[test]
    fn test_regs() {
        let mut tokens = Token::lexer("$zero $r0 $r8 $sp $ra");
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(ZERO))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(R0))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(R8))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(SP))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(RA))));
        assert_eq!(tokens.next(), None);

        assert_eq!(Token::lexer("$t0").next(), Some(Err(LexErr::InvalidReg(RegErr::UnknownPrefix('t')))));
        assert_eq!(Token::lexer("$s16").next(), Some(Err(LexErr::InvalidReg(RegErr::OutOfRange))));
        assert_eq!(Token::lexer("$r0$r1").next(), Some(Err(LexErr::InvalidReg(RegErr::InvalidSuffix))));
    }

    #[test]
    fn test_mem_operand() {
        let tokens = Token::lexer("8($sp)").collect::<Result<Vec<_>, _>>();
        assert_eq!(tokens, Ok(vec![Token::Int(8), Token::LParen, Token::Reg(SP), Token::RParen]));

        let tokens = Token::lexer("-0x4($r1)").collect::<Result<Vec<_>, _>>();
        assert_eq!(tokens, Ok(vec![Token::Int(4), Token::LParen, Token::Reg(R1), Token::RParen]));
    }

    #[test]
    fn test_invalid_symbol() {
        for string in ["@", "#", "%", "[", "]", ";", ":", "."] {
            assert_eq!(
                Token::lexer(string).next(),
                Some(Err(LexErr::InvalidSymbol)),
                "Expected {string:?} to be an invalid symbol"
            );
        }
    }

    #[test]
    fn test_errors_hash() {
        use std::collections::HashSet;

        use crate::parse::ParseErrKind;

        let kinds: HashSet<_> = [
            ParseErrKind::Lex(LexErr::DoesNotFitI16),
            ParseErrKind::Lex(LexErr::InvalidReg(RegErr::OutOfRange)),
            ParseErrKind::Lex(LexErr::DoesNotFitI16),
        ].into_iter().collect();
        assert_eq!(kinds.len(), 2);
    }
}
