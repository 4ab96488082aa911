//! Simulating and execution for MIPS assembly.
//!
//! This module is focused on executing assembled programs (i.e., [`Program`]).
//!
//! This module consists of:
//! - [`Processor`]: The struct that steps through a program.
//! - [`mem`]: The module holding the register file and data memory.
//! - [`observer`]: The module tracking which registers and memory words were touched.
//!
//! # Usage
//!
//! To simulate some code, you need to create a `Processor` and load a program into it.
//! Execution only ever happens one instruction at a time, through [`Processor::step`]:
//!
//! ```
//! use mips_stepper::asm::assemble;
//! use mips_stepper::sim::{HaltReason, Processor};
//! use mips_stepper::ast::reg_consts::R2;
//!
//! let src = "
//!     addi $r0 $zero 3
//!     addi $r1 $zero 4
//!     add $r2 $r0 $r1
//!     exit
//! ";
//! let asm = assemble(src);
//!
//! let mut cpu = Processor::new(Default::default());
//! cpu.load_program(asm.program);
//! while !cpu.is_done() {
//!     cpu.step();
//! }
//!
//! assert_eq!(cpu.reg(R2), 7);
//! assert_eq!(cpu.pc(), 16);
//! assert_eq!(cpu.halt_reason(), Some(HaltReason::Exit));
//! ```
//!
//! ## Flags
//!
//! The processor above has the default flags. The only configurable
//! setting is the size of data memory:
//!
//! ```
//! # use mips_stepper::sim::{Processor, SimFlags};
//! let cpu = Processor::new(SimFlags { mem_words: 8192 });
//! assert_eq!(cpu.mem().len(), 8192);
//! ```
//!
//! ## Halting
//!
//! Once the processor is done, [`Processor::step`] does nothing until the next
//! [`Processor::reset`] or [`Processor::load_program`].
//! Faults (division by zero, out-of-range memory) are not errors. They just finish the program,
//! and the cause is available through [`Processor::halt_reason`].
//!
//! ## Querying State
//!
//! - The PC, register file and memory are available through [`Processor::pc`], [`Processor::regs`] and [`Processor::mem`].
//! - Registers written since the last reset are available through [`Processor::changed_regs`].
//! - Memory words stored to since the last reset are available through [`Processor::changed_mem`].
//!   Loads are not changes, but they are visible through [`Processor::mem_accesses`].

pub mod mem;
pub mod observer;

use crate::asm::Program;
use crate::ast::{IOp, Instr, Instruction, MemOp, ROp, Reg};

use self::mem::{Mem, RegFile, MAX_MEM_WORDS, MIN_MEM_WORDS};
use self::observer::{AccessSet, ChangeObserver};

/// Configuration flags for [`Processor`].
///
/// These can be modified after the `Processor` is created with [`Processor::new`].
/// Changes apply on the next [`Processor::reset`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SimFlags {
    /// The number of 32-bit words of data memory.
    ///
    /// Values are clamped between [`MIN_MEM_WORDS`] and [`MAX_MEM_WORDS`].
    ///
    /// By default, this is [`MIN_MEM_WORDS`] (4096).
    pub mem_words: usize,
}
impl Default for SimFlags {
    fn default() -> Self {
        Self { mem_words: MIN_MEM_WORDS }
    }
}

/// Reason why the processor finished.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum HaltReason {
    /// The program executed `exit`.
    Exit,
    /// The PC stopped pointing at an instruction.
    ///
    /// This is the normal way for a program without `exit` to finish,
    /// but it also occurs when a jump or branch targets a negative index.
    PcOutOfRange {
        /// The byte address the PC was at (or would have been set to).
        pc: i64,
    },
    /// `div` with a zero divisor.
    DivByZero,
    /// `lw` or `sw` addressed a word outside of data memory.
    MemFault {
        /// The computed byte address.
        addr: i32,
    },
}
impl HaltReason {
    /// Whether this reason is a fault (rather than the program running to completion).
    pub fn is_fault(&self) -> bool {
        matches!(self, HaltReason::DivByZero | HaltReason::MemFault { .. })
    }
}
impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltReason::Exit                => f.write_str("program exited"),
            HaltReason::PcOutOfRange { pc } => write!(f, "PC {pc} is outside of the program"),
            HaltReason::DivByZero           => f.write_str("division by zero"),
            HaltReason::MemFault { addr }   => write!(f, "memory address {addr} is out of range"),
        }
    }
}

/// Executes assembled code.
#[derive(Debug)]
pub struct Processor {
    // ------------------ SIMULATION STATE ------------------
    // Calling [`Processor::reset`] resets these values.

    /// The program counter (a byte address; instruction `i` is at `4 * i`).
    pc: u32,

    /// The register file.
    regs: RegFile,

    /// The data memory.
    mem: Mem,

    /// Tracks changes in processor state.
    observer: ChangeObserver,

    /// Why the processor finished. `None` while it can still step.
    halt: Option<HaltReason>,

    /// The number of instructions successfully run since the last reset.
    instructions_run: u64,

    // ------------------ CONFIG STATE ------------------
    // Calling [`Processor::reset`] does not reset these values.

    /// The loaded program.
    program: Program,

    /// Configuration settings for the processor.
    ///
    /// These are preserved between resets.
    pub flags: SimFlags,
}

impl Processor {
    /// Creates a new processor with no program loaded.
    pub fn new(flags: SimFlags) -> Self {
        Self {
            pc: 0,
            regs: RegFile::new(),
            mem: Mem::new(flags.mem_words),
            observer: ChangeObserver::new(),
            halt: None,
            instructions_run: 0,

            program: Program::default(),
            flags,
        }
    }

    /// Replaces the program and resets the processor.
    pub fn load_program(&mut self, program: Program) {
        log::debug!("loaded program with {} instruction(s)", program.len());
        self.program = program;
        self.reset();
    }

    /// Resets the processor.
    ///
    /// This zeroes the PC, registers and memory, and clears all recorded changes.
    /// The program and flags are kept.
    pub fn reset(&mut self) {
        let words = self.flags.mem_words.clamp(MIN_MEM_WORDS, MAX_MEM_WORDS);
        if self.mem.len() == words {
            self.mem.clear();
        } else {
            self.mem = Mem::new(words);
        }

        self.pc = 0;
        self.regs.clear();
        self.observer.clear();
        self.halt = None;
        self.instructions_run = 0;
    }

    /// The loaded program.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The program counter.
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// The instruction the PC currently points at, if any.
    pub fn current_instruction(&self) -> Option<&Instruction> {
        self.program.get(self.pc as usize / 4)
    }

    /// The register file, indexed by register number.
    pub fn regs(&self) -> &[i32; Reg::COUNT] {
        self.regs.as_array()
    }

    /// The value of a single register.
    pub fn reg(&self, reg: Reg) -> i32 {
        self.regs[reg]
    }

    /// The data memory, indexed by word.
    pub fn mem(&self) -> &[i32] {
        self.mem.as_slice()
    }

    /// The registers written since the last reset, in first-write order.
    pub fn changed_regs(&self) -> impl Iterator<Item = Reg> + '_ {
        self.observer.changed_regs()
    }

    /// The memory words stored to since the last reset, in first-write order.
    pub fn changed_mem(&self) -> &[usize] {
        self.observer.changed_mem()
    }

    /// The accesses made to a memory word since the last reset.
    pub fn mem_accesses(&self, index: usize) -> AccessSet {
        self.observer.mem_accesses(index)
    }

    /// Whether the processor has finished (and [`Processor::step`] is a no-op).
    pub fn is_done(&self) -> bool {
        self.halt.is_some()
    }

    /// Why the processor finished, or `None` if it has not.
    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.halt
    }

    /// The number of instructions successfully run since the last reset.
    pub fn instructions_run(&self) -> u64 {
        self.instructions_run
    }

    /// Executes the instruction at the PC.
    ///
    /// This does nothing if the processor is done.
    pub fn step(&mut self) {
        if self.is_done() { return; }

        match self.execute() {
            Ok(()) => self.instructions_run += 1,
            Err(reason) => {
                if reason == HaltReason::Exit {
                    self.instructions_run += 1;
                }
                self.halt(reason);
            }
        }
    }

    /// Steps until the processor is done or `max_steps` steps have been taken.
    ///
    /// Returns the number of steps taken.
    pub fn run_with_limit(&mut self, max_steps: u64) -> u64 {
        let mut steps = 0;
        while !self.is_done() && steps < max_steps {
            self.step();
            steps += 1;
        }
        steps
    }

    fn halt(&mut self, reason: HaltReason) {
        if reason.is_fault() {
            log::warn!("fault at PC {}: {reason}", self.pc);
        } else {
            log::debug!("halted at PC {}: {reason}", self.pc);
        }
        self.halt = Some(reason);
    }

    fn write_reg(&mut self, reg: Reg, value: i32) {
        self.regs[reg] = value;
        self.observer.record_reg_write(reg);
    }

    fn advance_pc(&mut self) {
        self.pc = self.pc.wrapping_add(4);
    }

    /// Computes the PC for a jump or branch to an instruction index.
    fn target_pc(target: i16) -> Result<u32, HaltReason> {
        u32::try_from(target)
            .map(|t| t * 4)
            .map_err(|_| HaltReason::PcOutOfRange { pc: i64::from(target) * 4 })
    }

    /// Computes the memory word index for `R[rs] + imm`.
    ///
    /// This only fails for negative addresses. The upper bound is checked on access.
    fn mem_index(&self, rs: Reg, imm: i16) -> Result<(usize, i32), HaltReason> {
        let addr = self.regs[rs].wrapping_add(i32::from(imm));
        let index = usize::try_from(addr / 4)
            .map_err(|_| HaltReason::MemFault { addr })?;

        Ok((index, addr))
    }

    /// Executes one instruction.
    ///
    /// On `Err`, the PC has only moved if the reason is [`HaltReason::Exit`].
    fn execute(&mut self) -> Result<(), HaltReason> {
        let Some(instr) = self.current_instruction().map(|i| *i.instr()) else {
            return Err(HaltReason::PcOutOfRange { pc: i64::from(self.pc) });
        };
        log::trace!("PC {}: {instr}", self.pc);

        match instr {
            Instr::R { op, rd, rs, rt } => {
                let (a, b) = (self.regs[rs], self.regs[rt]);
                let result = match op {
                    ROp::Add  => a.wrapping_add(b),
                    ROp::Sub  => a.wrapping_sub(b),
                    ROp::Mult => a.wrapping_mul(b),
                    ROp::Div  => match b {
                        0 => return Err(HaltReason::DivByZero),
                        _ => a.wrapping_div(b),
                    },
                    ROp::And  => a & b,
                    ROp::Or   => a | b,
                    ROp::Nor  => !(a | b),
                    ROp::Slt  => i32::from(a < b),
                };
                self.write_reg(rd, result);
                self.advance_pc();
            },
            Instr::I { op, rs, rt, imm } => {
                // rs is the destination here (see Instr::I).
                let (a, imm) = (self.regs[rt], i32::from(imm));
                let result = match op {
                    IOp::Addi => a.wrapping_add(imm),
                    IOp::Subi => a.wrapping_sub(imm),
                    IOp::Andi => a & imm,
                    IOp::Xori => a ^ imm,
                };
                self.write_reg(rs, result);
                self.advance_pc();
            },
            Instr::Mem { op: MemOp::Lw, rt, rs, imm } => {
                let (index, addr) = self.mem_index(rs, imm)?;
                let value = self.mem.get(index)
                    .ok_or(HaltReason::MemFault { addr })?;

                self.observer.record_mem_read(index);
                self.write_reg(rt, value);
                self.advance_pc();
            },
            Instr::Mem { op: MemOp::Sw, rt, rs, imm } => {
                let (index, addr) = self.mem_index(rs, imm)?;
                self.mem.set(index, self.regs[rt])
                    .ok_or(HaltReason::MemFault { addr })?;

                self.observer.record_mem_write(index);
                self.advance_pc();
            },
            Instr::J { target } => {
                self.pc = Self::target_pc(target)?;
            },
            Instr::Beq { rs, rt, target } => {
                if self.regs[rs] == self.regs[rt] {
                    self.pc = Self::target_pc(target)?;
                } else {
                    self.advance_pc();
                }
            },
            Instr::Nop => self.advance_pc(),
            Instr::Exit => {
                self.advance_pc();
                return Err(HaltReason::Exit);
            },
        }

        Ok(())
    }
}
impl Default for Processor {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::asm::assemble;
    use crate::ast::reg_consts::*;
    use crate::ast::{IOp, Instr, MemOp, ROp, Reg};

    use super::observer::AccessSet;
    use super::{HaltReason, Processor, SimFlags};

    fn load(src: &str) -> Processor {
        let asm = assemble(src);
        assert!(asm.errors.is_empty(), "{:?}", asm.errors);

        let mut cpu = Processor::default();
        cpu.load_program(asm.program);
        cpu
    }

    fn assert_pristine(cpu: &Processor) {
        assert_eq!(cpu.pc(), 0);
        assert!(cpu.regs().iter().all(|&r| r == 0));
        assert!(cpu.mem().iter().all(|&w| w == 0));
        assert_eq!(cpu.changed_regs().count(), 0);
        assert!(cpu.changed_mem().is_empty());
        assert!(!cpu.is_done());
        assert_eq!(cpu.instructions_run(), 0);
    }

    #[test]
    fn test_addi_exit() {
        let mut cpu = load("addi $r0 $zero 5\nexit");
        cpu.step();
        assert!(!cpu.is_done());
        cpu.step();

        assert_eq!(cpu.regs()[8], 5);
        assert_eq!(cpu.pc(), 8);
        assert_eq!(cpu.changed_regs().collect::<Vec<_>>(), [R0]);
        assert!(cpu.is_done());
        assert_eq!(cpu.halt_reason(), Some(HaltReason::Exit));
        assert_eq!(cpu.instructions_run(), 2);
    }

    #[test]
    fn test_add_chain() {
        let mut cpu = load("addi $r0 $zero 3\naddi $r1 $zero 4\nadd $r2 $r0 $r1\nexit");
        cpu.run_with_limit(100);

        assert_eq!(cpu.regs()[10], 7);
        let changed: Vec<_> = cpu.changed_regs().map(usize::from).collect();
        assert_eq!(changed, [8, 9, 10]);
    }

    #[test]
    fn test_store_load() {
        let mut cpu = load("addi $r0 $zero 10\nsw $r0 0($zero)\nlw $r1 0($zero)\nexit");
        cpu.run_with_limit(100);

        assert_eq!(cpu.regs()[9], 10);
        assert_eq!(cpu.mem()[0], 10);
        assert_eq!(cpu.changed_mem(), [0]);
        assert_eq!(cpu.mem_accesses(0), AccessSet::READ | AccessSet::WRITTEN);
    }

    #[test]
    fn test_load_is_not_a_change() {
        let mut cpu = load("lw $r1 16($zero)\nexit");
        cpu.run_with_limit(100);

        assert!(cpu.changed_mem().is_empty());
        assert_eq!(cpu.mem_accesses(4), AccessSet::READ);
        assert_eq!(cpu.changed_regs().collect::<Vec<_>>(), [R1]);
    }

    #[test]
    fn test_mem_addressing() {
        // byte addresses fall into their containing word
        let mut cpu = load("addi $r0 $zero 7\naddi $r1 $zero 9\nsw $r0 11($r1)\nsw $r0 -3($zero)\nexit");
        cpu.run_with_limit(100);

        assert_eq!(cpu.mem()[5], 7);
        assert_eq!(cpu.mem()[0], 7);
        assert_eq!(cpu.changed_mem(), [5, 0]);
    }

    #[test]
    fn test_beq_loop() {
        let mut cpu = load("addi $r0 $zero 1\nbeq $r0 $r0 0\nexit");
        for _ in 0..1000 {
            cpu.step();
            assert!(!cpu.is_done());
            assert!(cpu.pc() == 0 || cpu.pc() == 4);
        }
        assert_eq!(cpu.run_with_limit(50), 50);
        assert!(!cpu.is_done());
    }

    #[test]
    fn test_div_by_zero() {
        let mut cpu = load("addi $r0 $zero 10\naddi $r1 $zero 0\ndiv $r2 $r0 $r1\nexit");
        cpu.step();
        cpu.step();
        assert!(!cpu.is_done());
        cpu.step();

        assert!(cpu.is_done());
        assert_eq!(cpu.halt_reason(), Some(HaltReason::DivByZero));
        assert_eq!(cpu.regs()[10], 0);
        assert_eq!(cpu.pc(), 8);
        assert!(!cpu.changed_regs().any(|r| r == R2));
    }

    #[test]
    fn test_arithmetic() {
        let mut cpu = load("
            addi $v0 $zero 0x7FFF
            mult $v0 $v0 $v0
            mult $v0 $v0 $v0
            addi $a0 $zero -6
            addi $a1 $zero 4
            div $a2 $a0 $a1
            slt $a3 $a0 $a1
            slt $s0 $a1 $a0
            nor $s1 $zero $zero
            and $s2 $a0 $a1
            or $s3 $a0 $a1
            sub $s4 $a1 $a0
            subi $s5 $a1 10
            andi $s6 $a0 0xF
            xori $s7 $a0 -1
            exit
        ");
        cpu.run_with_limit(100);
        assert_eq!(cpu.halt_reason(), Some(HaltReason::Exit));

        let big = 0x7FFFi32.wrapping_mul(0x7FFF);
        assert_eq!(cpu.reg(V0), big.wrapping_mul(big));
        assert_eq!(cpu.reg(A2), -1);
        assert_eq!(cpu.reg(A3), 1);
        assert_eq!(cpu.reg(S0), 0);
        assert_eq!(cpu.reg(S1), -1);
        assert_eq!(cpu.reg(S2), -6 & 4);
        assert_eq!(cpu.reg(S3), -6 | 4);
        assert_eq!(cpu.reg(S4), 10);
        assert_eq!(cpu.reg(S5), -6);
        assert_eq!(cpu.reg(S6), 10);
        assert_eq!(cpu.reg(S7), 5);
    }

    #[test]
    fn test_overflow_wraps() {
        let mut cpu = load("
            addi $r0 $zero -32768
            mult $r1 $r0 $r0
            add $r2 $r1 $r1
            addi $r4 $zero -1
            div $r3 $r2 $r4
            addi $r5 $r2 -1
        ");
        cpu.run_with_limit(100);

        assert_eq!(cpu.reg(R1), 1 << 30);
        assert_eq!(cpu.reg(R2), i32::MIN);
        assert_eq!(cpu.reg(R3), i32::MIN);
        assert_eq!(cpu.reg(R5), i32::MAX);
        assert_eq!(cpu.halt_reason(), Some(HaltReason::PcOutOfRange { pc: 24 }));
    }

    #[test]
    fn test_zero_is_writable() {
        let mut cpu = load("addi $zero $zero 3\nexit");
        cpu.run_with_limit(10);
        assert_eq!(cpu.reg(ZERO), 3);
        assert_eq!(cpu.changed_regs().collect::<Vec<_>>(), [ZERO]);
    }

    #[test]
    fn test_jump() {
        let mut cpu = load("j 2\naddi $r0 $zero 1\nnop\nexit");
        cpu.step();
        assert_eq!(cpu.pc(), 8);
        cpu.step();
        assert_eq!(cpu.pc(), 12);
        cpu.step();
        assert_eq!(cpu.halt_reason(), Some(HaltReason::Exit));
        assert_eq!(cpu.reg(R0), 0);
    }

    #[test]
    fn test_negative_target() {
        let mut cpu = load("beq $zero $zero -1");
        cpu.step();
        assert_eq!(cpu.halt_reason(), Some(HaltReason::PcOutOfRange { pc: -4 }));
        assert_eq!(cpu.pc(), 0);

        let mut cpu = load("j -3");
        cpu.step();
        assert_eq!(cpu.halt_reason(), Some(HaltReason::PcOutOfRange { pc: -12 }));
    }

    #[test]
    fn test_mem_fault() {
        let mut cpu = load("addi $r0 $zero 0x4000\nlw $r1 0($r0)\nexit");
        cpu.step();
        cpu.step();
        assert_eq!(cpu.halt_reason(), Some(HaltReason::MemFault { addr: 0x4000 }));
        assert_eq!(cpu.pc(), 4);

        let mut cpu = load("sw $r0 -4($zero)\nexit");
        cpu.step();
        assert_eq!(cpu.halt_reason(), Some(HaltReason::MemFault { addr: -4 }));
        assert!(cpu.changed_mem().is_empty());

        // A larger memory fits the same address.
        let mut cpu = Processor::new(SimFlags { mem_words: 0x2000 });
        cpu.load_program(assemble("addi $r0 $zero 0x4000\nlw $r1 0($r0)\nexit").program);
        cpu.run_with_limit(10);
        assert_eq!(cpu.halt_reason(), Some(HaltReason::Exit));
    }

    #[test]
    fn test_termination() {
        // empty program is done after one step
        let mut cpu = Processor::default();
        cpu.step();
        assert_eq!(cpu.halt_reason(), Some(HaltReason::PcOutOfRange { pc: 0 }));

        // falling off the end
        let mut cpu = load("nop\nnop");
        assert_eq!(cpu.run_with_limit(100), 3);
        assert_eq!(cpu.pc(), 8);
        assert_eq!(cpu.instructions_run(), 2);

        // step when done is a no-op
        let mut cpu = load("addi $r0 $zero 1\nexit\naddi $r0 $zero 2");
        cpu.run_with_limit(100);
        let (pc, regs) = (cpu.pc(), *cpu.regs());
        cpu.step();
        assert_eq!(cpu.pc(), pc);
        assert_eq!(*cpu.regs(), regs);
        assert_eq!(cpu.instructions_run(), 2);
    }

    #[test]
    fn test_reset() {
        let mut cpu = load("addi $r0 $zero 10\nsw $r0 0($zero)\nexit");
        cpu.run_with_limit(100);
        assert!(cpu.is_done());

        cpu.reset();
        assert_pristine(&cpu);
        assert_eq!(cpu.program().len(), 3);
        assert_eq!(cpu.mem_accesses(0), AccessSet::default());

        // and the program runs again the same way
        cpu.run_with_limit(100);
        assert_eq!(cpu.mem()[0], 10);

        cpu.load_program(assemble("nop").program);
        assert_pristine(&cpu);
        assert_eq!(cpu.program().len(), 1);
    }

    #[test]
    fn test_flags_apply_on_reset() {
        let mut cpu = Processor::new(SimFlags { mem_words: 10 });
        assert_eq!(cpu.mem().len(), 4096);

        cpu.flags.mem_words = 5000;
        cpu.reset();
        assert_eq!(cpu.mem().len(), 5000);
    }

    fn random_reg(rng: &mut StdRng) -> Reg {
        Reg::all().nth(rng.gen_range(0..Reg::COUNT)).unwrap_or(ZERO)
    }

    fn random_instr(rng: &mut StdRng, len: i16) -> Instr {
        const R_OPS: [ROp; 8] = [ROp::Add, ROp::Sub, ROp::Mult, ROp::Div, ROp::And, ROp::Or, ROp::Nor, ROp::Slt];
        const I_OPS: [IOp; 4] = [IOp::Addi, IOp::Subi, IOp::Andi, IOp::Xori];

        match rng.gen_range(0..10) {
            0..=2 => Instr::R {
                op: R_OPS[rng.gen_range(0..R_OPS.len())],
                rd: random_reg(rng),
                rs: random_reg(rng),
                rt: random_reg(rng),
            },
            3..=5 => Instr::I {
                op: I_OPS[rng.gen_range(0..I_OPS.len())],
                rs: random_reg(rng),
                rt: random_reg(rng),
                imm: rng.gen(),
            },
            6 => Instr::Mem {
                op: if rng.gen() { MemOp::Lw } else { MemOp::Sw },
                rt: random_reg(rng),
                rs: ZERO,
                imm: rng.gen_range(0..0x4000),
            },
            7 => Instr::J { target: rng.gen_range(0..len) },
            8 => Instr::Beq { rs: random_reg(rng), rt: random_reg(rng), target: rng.gen_range(0..len) },
            _ => Instr::Nop,
        }
    }

    #[test]
    fn test_determinism() {
        let mut rng = StdRng::seed_from_u64(0x6D69_7073);

        for _ in 0..50 {
            let len = rng.gen_range(1..40);
            let instrs: Vec<_> = (0..len).map(|_| random_instr(&mut rng, len)).collect();

            // The rendered program should parse back into the same instructions.
            let src = instrs.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
            let asm = assemble(&src);
            assert!(asm.errors.is_empty(), "{:?}", asm.errors);
            let decoded: Vec<_> = asm.program.iter().map(|i| *i.instr()).collect();
            assert_eq!(decoded, instrs);

            let mut a = Processor::default();
            let mut b = Processor::default();
            a.load_program(asm.program.clone());
            b.load_program(asm.program);

            for _ in 0..500 {
                a.step();
                b.step();
                assert_eq!(a.pc() % 4, 0);
                assert_eq!(a.pc(), b.pc());
                assert_eq!(a.regs(), b.regs());
                assert_eq!(a.mem(), b.mem());
            }
            assert_eq!(a.changed_regs().collect::<Vec<_>>(), b.changed_regs().collect::<Vec<_>>());
            assert_eq!(a.changed_mem(), b.changed_mem());
            assert_eq!(a.halt_reason(), b.halt_reason());
            assert_eq!(a.instructions_run(), b.instructions_run());
        }
    }
}
