//! Free-running a processor on a worker thread.
//!
//! A [`FreeRun`] repeatedly steps a shared [`Processor`] until it is done
//! or until it is asked to stop. The processor is locked for one step at a time,
//! so anyone else holding the same `Arc<Mutex<Processor>>` can read it between steps.
//!
//! When the worker finishes, it sends a [`RunReport`] back through a channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use crossbeam_channel as cbc;

use crate::sim::{HaltReason, Processor};

/// Summary of a finished free-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// The number of steps the worker took.
    pub steps: u64,
    /// Whether the run ended because of a stop request.
    pub stopped: bool,
    /// Why the processor finished, if it did.
    pub halt: Option<HaltReason>,
}

/// A worker thread stepping a shared processor.
///
/// Dropping a `FreeRun` stops the worker and waits for it to exit.
#[derive(Debug)]
pub struct FreeRun {
    stop: Arc<AtomicBool>,
    report: cbc::Receiver<RunReport>,
    // `None` once joined.
    handle: Option<JoinHandle<()>>,
}
impl FreeRun {
    /// Spawns a worker that steps `cpu` until it is done or [`FreeRun::stop`] is called.
    pub fn start(cpu: Arc<Mutex<Processor>>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let (report_tx, report_rx) = cbc::bounded(1);

        let stop_flag = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            let mut steps = 0;
            let report = loop {
                if stop_flag.load(Ordering::Relaxed) {
                    let halt = cpu.lock().unwrap_or_else(PoisonError::into_inner).halt_reason();
                    break RunReport { steps, stopped: true, halt };
                }

                {
                    let mut cpu = cpu.lock().unwrap_or_else(PoisonError::into_inner);
                    if let Some(halt) = cpu.halt_reason() {
                        break RunReport { steps, stopped: false, halt: Some(halt) };
                    }
                    cpu.step();
                }
                steps += 1;

                // let readers in between steps
                std::thread::yield_now();
            };

            log::debug!("free-run finished after {} step(s)", report.steps);
            // Never blocks: the channel holds one report and only one is sent.
            let _ = report_tx.send(report);
        });

        log::debug!("free-run started");
        Self { stop, report: report_rx, handle: Some(handle) }
    }

    /// Asks the worker to stop at the next instruction boundary, without waiting for it.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Whether the worker has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Returns the report if the worker has finished, or gives the run back if it has not.
    pub fn try_finish(mut self) -> Result<RunReport, Self> {
        match self.report.try_recv() {
            Ok(report) => {
                self.join();
                Ok(report)
            },
            Err(cbc::TryRecvError::Empty) => Err(self),
            Err(cbc::TryRecvError::Disconnected) => Ok(self.wait()),
        }
    }

    /// Stops the worker and waits for it to finish.
    pub fn stop(self) -> RunReport {
        self.request_stop();
        self.wait()
    }

    /// Waits for the worker to finish on its own.
    ///
    /// This blocks forever if the program never finishes and nothing calls [`FreeRun::request_stop`].
    pub fn wait(mut self) -> RunReport {
        let report = self.report.recv();
        self.join();

        report.unwrap_or_else(|_| {
            // The worker can only drop its sender without sending by panicking.
            log::error!("free-run worker exited without a report");
            RunReport { steps: 0, stopped: true, halt: None }
        })
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
impl Drop for FreeRun {
    fn drop(&mut self) {
        self.request_stop();
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::asm::assemble;
    use crate::ast::reg_consts::R0;
    use crate::sim::{HaltReason, Processor};

    use super::FreeRun;

    fn shared(src: &str) -> Arc<Mutex<Processor>> {
        let mut cpu = Processor::default();
        cpu.load_program(assemble(src).program);
        Arc::new(Mutex::new(cpu))
    }

    #[test]
    fn test_run_to_exit() {
        let cpu = shared("addi $r0 $zero 1\naddi $r0 $r0 1\nexit");
        let report = FreeRun::start(Arc::clone(&cpu)).wait();

        assert_eq!(report.steps, 3);
        assert!(!report.stopped);
        assert_eq!(report.halt, Some(HaltReason::Exit));
        assert_eq!(cpu.lock().unwrap().reg(R0), 2);
    }

    #[test]
    fn test_stop_loop() {
        let cpu = shared("addi $r0 $r0 1\nj 0");
        let run = FreeRun::start(Arc::clone(&cpu));

        // wait until it's actually going
        while cpu.lock().unwrap().instructions_run() < 100 {
            std::thread::yield_now();
        }
        let report = run.stop();

        assert!(report.stopped);
        assert_eq!(report.halt, None);
        let cpu = cpu.lock().unwrap();
        assert!(!cpu.is_done());
        assert_eq!(cpu.instructions_run(), report.steps);
        assert_eq!(cpu.pc() % 4, 0);
    }

    #[test]
    fn test_already_done() {
        let cpu = shared("exit");
        cpu.lock().unwrap().step();

        let report = FreeRun::start(cpu).wait();
        assert_eq!(report.steps, 0);
        assert_eq!(report.halt, Some(HaltReason::Exit));
    }

    #[test]
    fn test_try_finish() {
        let cpu = shared("nop\nnop\nnop");
        let mut run = FreeRun::start(cpu);

        let report = loop {
            match run.try_finish() {
                Ok(report) => break report,
                Err(r) => {
                    run = r;
                    std::thread::yield_now();
                },
            }
        };
        assert_eq!(report.steps, 4);
        assert_eq!(report.halt, Some(HaltReason::PcOutOfRange { pc: 12 }));
    }

    #[test]
    fn test_drop_stops_worker() {
        let cpu = shared("addi $r0 $r0 1\nj 0");
        let run = FreeRun::start(Arc::clone(&cpu));
        while cpu.lock().unwrap().instructions_run() < 100 {
            std::thread::yield_now();
        }
        drop(run);

        // The worker has exited and released its handle on the processor.
        assert_eq!(Arc::strong_count(&cpu), 1);
        let steps = cpu.lock().unwrap().instructions_run();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(cpu.lock().unwrap().instructions_run(), steps);
    }
}
