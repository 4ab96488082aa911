use std::error::Error;
use std::io::{self, BufRead, Write};

use getopts::Options;
use mips_stepper::ast::Reg;
use mips_stepper::err::Error as _;
use mips_stepper::session::{RunReport, Session};
use mips_stepper::sim::mem::{MAX_MEM_WORDS, MIN_MEM_WORDS};
use mips_stepper::sim::SimFlags;

const DEFAULT_MAX_STEPS: u64 = 10_000_000;

#[derive(Debug)]
struct CliOptions {
    file: Option<String>,
    flags: SimFlags,
    batch: bool,
    max_steps: u64,
    listing: bool,
}

const COMMANDS: &str = "\
commands:
  load <path>   load a program file
  step [n]      execute n instructions (default 1)
  run           run until the program finishes or 'stop'
  stop          stop a running program
  reset         reset registers, memory and PC
  regs          show all registers (* = written)
  mem           show written memory words
  list          show the program listing
  pc            show the PC and the next instruction
  help          show this message
  quit          exit";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let options = match parse_command_line(std::env::args()) {
        Ok(Some(options)) => options,
        Ok(None) => return,
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1)
        }
    };

    let mut session = Session::new(options.flags);
    if let Some(path) = &options.file {
        load(&mut session, path);
    }
    if options.listing {
        print_listing(&session);
    }

    if options.batch {
        let steps = session.processor().run_with_limit(options.max_steps);
        match session.halt_reason() {
            Some(halt) => println!("finished after {steps} step(s): {halt}"),
            None => println!("stopped at the step limit ({steps} step(s))"),
        }
        print_registers_changed(&session);
        print_memory_changed(&session);
    } else {
        repl(&mut session);
    }
}

/// Returns `None` if help was requested.
fn parse_command_line(args: impl IntoIterator<Item = String>) -> Result<Option<CliOptions>, Box<dyn Error>> {
    const HELP_OPTION: &str = "h";
    const MEM_OPTION: &str = "m";
    const RUN_OPTION: &str = "r";
    const STEPS_OPTION: &str = "s";
    const LISTING_OPTION: &str = "l";

    let args: Vec<String> = args.into_iter().collect();
    let program_name = args.first().map_or("mipsi", String::as_str);

    let mut opts = Options::new();
    opts.optflag(HELP_OPTION, "help", "print this help menu");
    opts.optopt(MEM_OPTION, "mem-words", "size of data memory in 32-bit words (4096 to 67108864)", "N");
    opts.optflag(RUN_OPTION, "run", "run FILE to completion, print the changes and exit");
    opts.optopt(STEPS_OPTION, "max-steps", "with --run, give up after N steps (default 10000000)", "N");
    opts.optflag(LISTING_OPTION, "listing", "print the program listing after loading");

    let matches = opts.parse(args.iter().skip(1))?;
    if matches.opt_present(HELP_OPTION) {
        let brief = format!("Usage: {program_name} [options] [FILE]");
        print!("{}", opts.usage(&brief));
        println!("\n{COMMANDS}");
        return Ok(None);
    }

    let mut flags = SimFlags::default();
    if let Some(words) = matches.opt_get::<usize>(MEM_OPTION)? {
        if !(MIN_MEM_WORDS..=MAX_MEM_WORDS).contains(&words) {
            return Err(format!("--mem-words must be between {MIN_MEM_WORDS} and {MAX_MEM_WORDS}, got {words}").into());
        }
        flags.mem_words = words;
    }
    let max_steps = matches.opt_get_default(STEPS_OPTION, DEFAULT_MAX_STEPS)?;

    if matches.free.len() > 1 {
        return Err(format!("expected at most one input file, got {}", matches.free.len()).into());
    }

    Ok(Some(CliOptions {
        file: matches.free.first().cloned(),
        flags,
        batch: matches.opt_present(RUN_OPTION),
        max_steps,
        listing: matches.opt_present(LISTING_OPTION),
    }))
}

fn repl(session: &mut Session) {
    println!("type 'help' for a list of commands");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let Some(Ok(line)) = lines.next() else { break };
        if let Some(report) = session.poll_run() {
            print_report(&report);
        }

        let mut words = line.split_whitespace();
        let Some(command) = words.next() else { continue };
        match command {
            "load" => match words.next() {
                Some(path) => load(session, path),
                None => println!("usage: load <path>"),
            },
            "step" => {
                let count = match words.next().map(str::parse::<u64>) {
                    None => 1,
                    Some(Ok(n)) => n,
                    Some(Err(e)) => {
                        println!("invalid step count: {e}");
                        continue;
                    }
                };
                if session.is_running() {
                    println!("program is running, 'stop' it first");
                    continue;
                }
                for _ in 0..count {
                    if session.is_done() { break; }
                    session.step();
                }
                print_position(session);
                print_registers_changed(session);
                print_memory_changed(session);
            },
            "run" => {
                if session.is_running() {
                    println!("already running");
                } else {
                    session.run();
                    println!("running (type 'stop' to stop)");
                }
            },
            "stop" => match session.stop() {
                Some(report) => {
                    print_report(&report);
                    print_position(session);
                },
                None => println!("not running"),
            },
            "reset" => {
                session.reset();
                print_position(session);
            },
            "regs" => print_registers(session),
            "mem" => print_memory_changed(session),
            "list" => print_listing(session),
            "pc" => print_position(session),
            "help" => println!("{COMMANDS}"),
            "quit" | "exit" => break,
            other => println!("unknown command '{other}' (type 'help' for a list of commands)"),
        }
    }
}

fn load(session: &mut Session, path: &str) {
    match session.load(path) {
        Ok(errors) => {
            for error in &errors {
                eprintln!("  line {}: {}", error.line_no, error.err);
                if let Some(help) = error.help() {
                    eprintln!("    help: {help}");
                }
            }
            let count = session.processor().program().len();
            println!("loaded {count} instruction(s) from {path}");
        },
        Err(error) => eprintln!("error: cannot read {path}: {error}"),
    }
}

fn print_report(report: &RunReport) {
    match (report.stopped, report.halt) {
        (true, _) => println!("stopped after {} step(s)", report.steps),
        (false, Some(halt)) => println!("finished after {} step(s): {halt}", report.steps),
        (false, None) => println!("finished after {} step(s)", report.steps),
    }
}

fn print_position(session: &Session) {
    let cpu = session.processor();
    match (cpu.halt_reason(), cpu.current_instruction()) {
        (Some(halt), _) => println!("PC {}: done ({halt})", cpu.pc()),
        (None, Some(instr)) => println!("PC {}: {}", cpu.pc(), instr.src()),
        (None, None) => println!("PC {}", cpu.pc()),
    }
}

fn print_registers_changed(session: &Session) {
    print!("{}", section("registers", &session.changed_registers()));
}

fn print_memory_changed(session: &Session) {
    print!("{}", section("memory", &session.changed_memory()));
}

/// Renders a titled list of entries, or nothing if there are none.
fn section<T: std::fmt::Display>(title: &str, entries: &[T]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let mut out = format!("{title}:\n");
    for entry in entries {
        out += &format!("  {entry}\n");
    }
    out
}

fn print_registers(session: &Session) {
    let cpu = session.processor();
    let changed: Vec<Reg> = cpu.changed_regs().collect();

    for reg in Reg::all() {
        let mark = if changed.contains(&reg) { '*' } else { ' ' };
        let value = cpu.reg(reg);
        println!("{mark} {reg:<6} {value:>11}  {:#010x}", value as u32);
    }
}

fn print_listing(session: &Session) {
    let highlight = session.highlight();
    let cpu = session.processor();

    for (i, instr) in cpu.program().iter().enumerate() {
        let mark = if highlight == Some(i) { "=>" } else { "  " };
        println!("{mark} {i:>4}  {instr}");
    }
}
