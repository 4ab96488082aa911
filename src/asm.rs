//! Assembling source text into programs.
//!
//! This module is used to convert a whole source file into a [`Program`]
//! that can be loaded into the processor.
//!
//! The module notably consists of:
//! - [`assemble`] and [`load_program`]: functions which assemble source text (or a file) line by line
//! - [`Program`]: the ordered list of decoded instructions
//! - [`Assembly`]: the result of assembling, which holds the program and every line that was rejected
//!
//! Assembling never fails as a whole. A line that does not parse is reported
//! (to the log and in [`Assembly::errors`]) and left out of the program,
//! so every instruction after it moves up one slot.
//!
//! ```
//! use mips_stepper::asm::assemble;
//!
//! let src = "
//!     addi $r0 $zero 3
//!     frobnicate $r0
//!     exit
//! ";
//! let asm = assemble(src);
//! assert_eq!(asm.program.len(), 2);
//! assert_eq!(asm.errors.len(), 1);
//! assert_eq!(asm.errors[0].line_no, 3);
//! ```

use std::path::Path;

use crate::ast::Instruction;
use crate::parse::{parse_line, ParseErr};

/// Assembles source text into a program.
///
/// Blank lines are skipped. Lines that fail to parse are logged as a warning,
/// recorded in [`Assembly::errors`], and dropped from the program.
pub fn assemble(src: &str) -> Assembly {
    let mut instrs = vec![];
    let mut errors = vec![];

    for (i, line) in src.lines().enumerate() {
        if line.trim().is_empty() { continue; }

        match parse_line(line) {
            Ok(instr) => instrs.push(instr),
            Err(err) => {
                let err = LineErr { line_no: i + 1, line: line.to_string(), err };
                log::warn!("{err}");
                errors.push(err);
            }
        }
    }

    log::debug!("assembled {} instruction(s), rejected {} line(s)", instrs.len(), errors.len());
    Assembly { program: Program::new(instrs), errors }
}

/// Reads a UTF-8 text file and assembles it (see [`assemble`]).
///
/// # Errors
/// This errors only if the file cannot be read.
pub fn load_program(path: impl AsRef<Path>) -> std::io::Result<Assembly> {
    let path = path.as_ref();
    let src = std::fs::read_to_string(path)?;

    log::info!("loading program from {}", path.display());
    Ok(assemble(&src))
}

/// The result of [`assemble`].
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    /// The instructions that parsed, in source order.
    pub program: Program,
    /// Every line that did not parse.
    pub errors: Vec<LineErr>,
}

/// A line that was rejected while assembling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineErr {
    /// The line number (starting from 1).
    pub line_no: usize,
    /// The text of the line.
    pub line: String,
    /// Why it was rejected.
    pub err: ParseErr,
}
impl std::fmt::Display for LineErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid instruction '{}' on line {}", self.line, self.line_no)
    }
}
impl std::error::Error for LineErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.err)
    }
}
impl crate::err::Error for LineErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        crate::err::Error::help(&self.err)
    }
}

/// An ordered list of decoded instructions.
///
/// Instruction `i` lives at address `4 * i`.
///
/// The [`Display`] implementation prints the program listing, one instruction per line.
///
/// [`Display`]: std::fmt::Display
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instrs: Vec<Instruction>,
}
impl Program {
    /// Creates a program from a list of instructions.
    pub fn new(instrs: Vec<Instruction>) -> Self {
        Self { instrs }
    }

    /// The number of instructions in this program.
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    /// Whether this program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Gets the instruction at a given index.
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instrs.get(index)
    }

    /// Iterates over the instructions in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instrs.iter()
    }

    /// The instructions as a slice.
    pub fn as_slice(&self) -> &[Instruction] {
        &self.instrs
    }
}
impl FromIterator<Instruction> for Program {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for instr in &self.instrs {
            writeln!(f, "{instr}")?;
        }
        Ok(())
    }
}
