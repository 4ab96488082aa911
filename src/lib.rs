//! A parser and stepping interpreter for a teaching subset of MIPS32 assembly.
//!
//! Programs are plain text, one instruction per line. Registers use this dialect's names
//! (`$zero`, `$one`, `$v0`, `$a0`, `$r0`, `$s0`, `$gp`, `$sp`, `$fp`, `$ra`),
//! and jump/branch targets are instruction indices rather than labels.
//!
//! # Usage
//!
//! To run source code, it must be assembled into a program:
//! ```
//! use mips_stepper::asm::assemble;
//!
//! let code = "
//!     addi $r0 $zero 10
//!     sw $r0 0($zero)
//!     lw $r1 0($zero)
//!     exit
//! ";
//! let asm = assemble(code);
//! assert!(asm.errors.is_empty());
//! assert_eq!(asm.program.len(), 4);
//! ```
//!
//! Once a program has been assembled, it can be stepped through with the processor:
//! ```
//! # use mips_stepper::asm::assemble;
//! # let code = "addi $r0 $zero 10\nsw $r0 0($zero)\nlw $r1 0($zero)\nexit";
//! # let asm = assemble(code);
//! use mips_stepper::sim::Processor;
//! use mips_stepper::ast::reg_consts::R1;
//!
//! let mut cpu = Processor::new(Default::default());
//! cpu.load_program(asm.program);
//! while !cpu.is_done() {
//!     cpu.step();
//! }
//! assert_eq!(cpu.reg(R1), 10);
//! assert_eq!(cpu.changed_mem(), [0]);
//! ```
//!
//! To run a program in the background (and stop it from another thread),
//! see the [`session`] module.
#![warn(missing_docs)]

pub mod parse;
pub mod ast;
pub mod asm;
pub mod sim;
pub mod session;
pub mod err;
