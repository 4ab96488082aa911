//! Controller glue between a front-end and the processor.
//!
//! A [`Session`] owns a shared [`Processor`] and at most one [`FreeRun`] worker.
//! It offers the commands a front-end needs (load, step, run, stop, reset)
//! and formatted views of the processor state:
//!
//! - [`Session::highlight`]: the index of the instruction about to execute
//! - [`Session::changed_registers`]: written registers, shown as `name: value`
//! - [`Session::changed_memory`]: stored memory words, shown as `index: value`
//!
//! ```
//! use mips_stepper::session::Session;
//! use mips_stepper::asm::assemble;
//!
//! let mut session = Session::new(Default::default());
//! session.load_program(assemble("addi $r0 $zero 5\nexit").program);
//!
//! session.step();
//! assert_eq!(session.highlight(), Some(1));
//!
//! let regs: Vec<_> = session.changed_registers().iter().map(|e| e.to_string()).collect();
//! assert_eq!(regs, ["$r0: 5"]);
//!
//! session.run();
//! let report = session.wait_run().unwrap();
//! assert_eq!(report.steps, 1);
//! assert!(session.is_done());
//! ```

mod free_run;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use self::free_run::{FreeRun, RunReport};
use crate::asm::{self, LineErr, Program};
use crate::ast::Reg;
use crate::sim::{HaltReason, Processor, SimFlags};

/// A written register and its current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegEntry {
    #[allow(missing_docs)]
    pub reg: Reg,
    #[allow(missing_docs)]
    pub value: i32,
}
impl std::fmt::Display for RegEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.reg, self.value as u32)
    }
}

/// A stored memory word and its current value.
///
/// The index is displayed as a signed 16-bit number,
/// so indices from 32768 up show as negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemEntry {
    #[allow(missing_docs)]
    pub index: usize,
    #[allow(missing_docs)]
    pub value: i32,
}
impl std::fmt::Display for MemEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.index as u16 as i16, self.value as u32)
    }
}

/// An interactive session over one processor.
///
/// Dropping the session stops any active free-run.
#[derive(Debug)]
pub struct Session {
    cpu: Arc<Mutex<Processor>>,
    run: Option<FreeRun>,
}
impl Session {
    /// Creates a session with an empty program.
    pub fn new(flags: SimFlags) -> Self {
        Self {
            cpu: Arc::new(Mutex::new(Processor::new(flags))),
            run: None,
        }
    }

    /// Locks the processor.
    ///
    /// During a free-run, holding this guard pauses the worker.
    pub fn processor(&self) -> MutexGuard<'_, Processor> {
        self.cpu.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads a program file, stopping any active free-run first.
    ///
    /// Returns the lines that were rejected while assembling.
    ///
    /// # Errors
    /// If the file cannot be read, this logs the error, loads an empty program
    /// and steps once (so the processor is done right away), then returns the error.
    pub fn load(&mut self, path: impl AsRef<Path>) -> std::io::Result<Vec<LineErr>> {
        let path = path.as_ref();
        self.stop();

        match asm::load_program(path) {
            Ok(asm) => {
                self.processor().load_program(asm.program);
                Ok(asm.errors)
            },
            Err(e) => {
                log::error!("could not read {}: {e}", path.display());

                let mut cpu = self.processor();
                cpu.load_program(Program::default());
                cpu.step();
                Err(e)
            }
        }
    }

    /// Loads an already assembled program, stopping any active free-run first.
    pub fn load_program(&mut self, program: Program) {
        self.stop();
        self.processor().load_program(program);
    }

    /// Executes one instruction.
    ///
    /// This is ignored while a free-run is active.
    pub fn step(&mut self) {
        if self.is_running() {
            log::debug!("ignoring step during free-run");
            return;
        }
        self.processor().step();
    }

    /// Starts free-running on a worker thread and returns immediately.
    ///
    /// This is a no-op if a free-run is already active.
    pub fn run(&mut self) {
        if self.is_running() { return; }
        // a finished worker that was never polled
        self.poll_run();

        self.run = Some(FreeRun::start(Arc::clone(&self.cpu)));
    }

    /// Stops the free-run (if any) and waits for the worker to exit.
    pub fn stop(&mut self) -> Option<RunReport> {
        self.run.take().map(FreeRun::stop)
    }

    /// Stops any free-run, then resets the processor.
    pub fn reset(&mut self) {
        self.stop();
        self.processor().reset();
    }

    /// Whether a free-run worker is still stepping.
    pub fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(|run| !run.is_finished())
    }

    /// Returns the report of a free-run that has finished, without blocking.
    ///
    /// This returns `None` if there is no free-run or if it is still going.
    pub fn poll_run(&mut self) -> Option<RunReport> {
        match self.run.take()?.try_finish() {
            Ok(report) => Some(report),
            Err(run) => {
                self.run = Some(run);
                None
            }
        }
    }

    /// Blocks until the free-run finishes on its own and returns its report.
    ///
    /// This returns `None` if there is no free-run.
    pub fn wait_run(&mut self) -> Option<RunReport> {
        self.run.take().map(FreeRun::wait)
    }

    /// The program counter.
    pub fn pc(&self) -> u32 {
        self.processor().pc()
    }

    /// The index of the instruction at the PC, if the PC is within the program.
    pub fn highlight(&self) -> Option<usize> {
        let cpu = self.processor();
        let index = cpu.pc() as usize / 4;
        (index < cpu.program().len()).then_some(index)
    }

    /// Whether the processor has finished.
    pub fn is_done(&self) -> bool {
        self.processor().is_done()
    }

    /// Why the processor finished, if it has.
    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.processor().halt_reason()
    }

    /// The registers written since the last reset, in first-write order.
    pub fn changed_registers(&self) -> Vec<RegEntry> {
        let cpu = self.processor();
        cpu.changed_regs()
            .map(|reg| RegEntry { reg, value: cpu.reg(reg) })
            .collect()
    }

    /// The memory words stored to since the last reset, in first-write order.
    pub fn changed_memory(&self) -> Vec<MemEntry> {
        let cpu = self.processor();
        cpu.changed_mem()
            .iter()
            .map(|&index| MemEntry { index, value: cpu.mem()[index] })
            .collect()
    }

    /// The program listing.
    pub fn listing(&self) -> String {
        self.processor().program().to_string()
    }
}
impl Default for Session {
    fn default() -> Self {
        Self::new(Default::default())
    }
}
impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::ast::reg_consts::*;
    use crate::sim::HaltReason;

    use super::{MemEntry, RegEntry, Session};

    fn temp_program(name: &str, src: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mips-stepper-{name}-{}.s", std::process::id()));
        std::fs::write(&path, src).unwrap();
        path
    }

    #[test]
    fn test_entry_display() {
        assert_eq!(RegEntry { reg: R8, value: 7 }.to_string(), "$r8: 7");
        assert_eq!(RegEntry { reg: SP, value: -1 }.to_string(), "$sp: 4294967295");
        assert_eq!(MemEntry { index: 3, value: 10 }.to_string(), "3: 10");
        assert_eq!(MemEntry { index: 40000, value: -2 }.to_string(), "-25536: 4294967294");
    }

    #[test]
    fn test_load_and_step() {
        let path = temp_program("step", "addi $r0 $zero 10\nbad line\nsw $r0 4($zero)\nexit\n");
        let mut session = Session::default();
        let errors = session.load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line_no, 2);
        assert_eq!(session.highlight(), Some(0));

        session.step();
        session.step();
        assert_eq!(session.pc(), 8);
        assert_eq!(session.highlight(), Some(2));
        assert_eq!(session.changed_registers(), [RegEntry { reg: R0, value: 10 }]);
        assert_eq!(session.changed_memory(), [MemEntry { index: 1, value: 10 }]);

        session.step();
        assert!(session.is_done());
        assert_eq!(session.highlight(), None);
        assert_eq!(session.listing().lines().count(), 3);
    }

    #[test]
    fn test_load_missing() {
        let mut session = Session::default();
        let path = std::env::temp_dir().join("mips-stepper-missing-file.s");
        assert!(session.load(path).is_err());

        assert!(session.is_done());
        assert_eq!(session.halt_reason(), Some(HaltReason::PcOutOfRange { pc: 0 }));
        assert_eq!(session.highlight(), None);
        assert!(session.listing().is_empty());
    }

    #[test]
    fn test_run_to_completion() {
        let path = temp_program("run", "addi $r0 $zero 3\naddi $r1 $zero 4\nadd $r2 $r0 $r1\nexit\n");
        let mut session = Session::default();
        session.load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        session.run();
        let report = session.wait_run().unwrap();
        assert_eq!(report.steps, 4);
        assert!(!report.stopped);
        assert_eq!(report.halt, Some(HaltReason::Exit));

        let regs: Vec<_> = session.changed_registers().iter().map(|e| e.to_string()).collect();
        assert_eq!(regs, ["$r0: 3", "$r1: 4", "$r2: 7"]);
        assert!(session.wait_run().is_none());
    }

    #[test]
    fn test_run_stop_reset() {
        let path = temp_program("loop", "addi $r0 $zero 1\nbeq $r0 $r0 0\nexit\n");
        let mut session = Session::default();
        session.load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        session.run();
        // a second run is ignored
        session.run();
        while session.processor().instructions_run() < 50 {
            std::thread::yield_now();
        }
        assert!(session.is_running());

        let report = session.stop().unwrap();
        assert!(report.stopped);
        assert!(!session.is_done());
        assert!(!session.is_running());
        assert!(session.pc() == 0 || session.pc() == 4);

        session.run();
        session.reset();
        assert!(!session.is_running());
        assert_eq!(session.pc(), 0);
        assert!(session.changed_registers().is_empty());
        assert!(session.stop().is_none());
    }

    #[test]
    fn test_poll_run() {
        let path = temp_program("poll", "nop\nnop\nexit\n");
        let mut session = Session::default();
        session.load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(session.poll_run().is_none());
        session.run();
        let report = loop {
            if let Some(report) = session.poll_run() { break report; }
            std::thread::yield_now();
        };
        assert_eq!(report.halt, Some(HaltReason::Exit));
        assert!(session.poll_run().is_none());
    }
}
