//! Interactive command loop: the simulator's control panel on a terminal.

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use sync_sim::{ColumnRef, Observer, Simulator, Thread};

pub const DEFAULT_RUN_TICKS: u64 = 10;

const HELP: &str = "\
commands:
  run [N]            round-robin run for N ticks (default 10)
  random-run [N]     random run for N ticks (default 10)
  step               one round-robin tick
  step NAME          step only thread NAME
  random-step        step one runnable thread chosen at random
  thread COL         start another thread on column COL
  add-column         append an empty thread column
  add-row COL TEXT   append a row to column COL (or `init`)
  init               re-run the initialization column
  show               print thread placement and variables
  help               this text
  quit               leave
Ctrl-C stops a run in progress; at the prompt it exits.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(u64),
    RandomRun(u64),
    Step,
    StepThread(String),
    RandomStep,
    Thread(usize),
    AddColumn,
    AddRow(ColumnRef, String),
    Init,
    Show,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "run" => Command::Run(ticks(rest)?),
        "random-run" => Command::RandomRun(ticks(rest)?),
        "step" | "s" if rest.is_empty() => Command::Step,
        "step" | "s" => Command::StepThread(rest.to_string()),
        "random-step" | "r" => Command::RandomStep,
        "add-column" => Command::AddColumn,
        "thread" => Command::Thread(
            rest.parse()
                .with_context(|| format!("expected a column number, got `{}`", rest))?,
        ),
        "add-row" => {
            let (column, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if column.is_empty() {
                bail!("usage: add-row COL TEXT");
            }
            let column = if column == "init" {
                ColumnRef::Init
            } else {
                ColumnRef::Thread(
                    column
                        .parse()
                        .with_context(|| format!("expected a column number, got `{}`", column))?,
                )
            };
            Command::AddRow(column, text.to_string())
        }
        "init" => Command::Init,
        "show" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command `{}` (try `help`)", other),
    };
    Ok(Some(command))
}

fn ticks(arg: &str) -> Result<u64> {
    if arg.is_empty() {
        return Ok(DEFAULT_RUN_TICKS);
    }
    arg.parse()
        .with_context(|| format!("expected a number of ticks, got `{}`", arg))
}

/// Read commands from `input` until `quit` or end of input.
pub fn run_shell<R, W>(
    sim: &mut Simulator,
    input: R,
    out: &mut W,
    observer: &mut dyn Observer,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    writeln!(out, "type `help` for commands")?;
    for line in input.lines() {
        let line = line.context("failed to read command")?;
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                writeln!(out, "{}", err)?;
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        execute(sim, command, out, observer)?;
    }
    sim.stop();
    Ok(())
}

fn execute<W: Write>(
    sim: &mut Simulator,
    command: Command,
    out: &mut W,
    observer: &mut dyn Observer,
) -> Result<()> {
    match command {
        Command::Run(n) | Command::RandomRun(n) => {
            let previous = sim.config().max_steps;
            sim.config_mut().max_steps = Some(n);
            let summary = if matches!(command, Command::Run(_)) {
                sim.run(observer)
            } else {
                sim.random_run(observer)
            };
            sim.config_mut().max_steps = previous;
            writeln!(out, "ran {} tick(s), {} failure(s)", summary.ticks, summary.failures)?;
        }
        Command::Step => {
            sim.step(observer);
        }
        Command::StepThread(name) => match sim.thread_by_name(&name).map(Thread::id) {
            Some(id) => {
                let tick = sim.step_one(id, observer);
                if tick.reports.is_empty() && tick.failures.is_empty() {
                    writeln!(out, "thread {} cannot run", name)?;
                }
            }
            None => writeln!(out, "no thread named {}", name)?,
        },
        Command::RandomStep => {
            sim.random_step(observer);
        }
        Command::AddColumn => {
            if let ColumnRef::Thread(column) = sim.add_column() {
                writeln!(out, "added column {}", column)?;
            }
        }
        Command::Thread(column) => match sim.create_thread(column) {
            Ok(id) => {
                let name = sim.thread(id).map(|t| t.name().to_string()).unwrap_or_default();
                writeln!(out, "created thread {} on column {}", name, column)?;
            }
            Err(err) => writeln!(out, "{}", err)?,
        },
        Command::AddRow(column, text) => match sim.add_row(column, &text) {
            Ok(row) => writeln!(out, "added row {}", row)?,
            Err(err) => writeln!(out, "{}", err)?,
        },
        Command::Init => match sim.run_init() {
            Ok(()) => writeln!(out, "initialized ({} variables)", sim.env().len())?,
            Err(err) => writeln!(out, "{}", err)?,
        },
        Command::Show => {
            let state = sim.display();
            for thread in &state.threads {
                let row = thread.row.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string());
                let status = if thread.queued { "queued" } else { "runnable" };
                writeln!(out, "{} row {} {}", thread.name, row, status)?;
            }
            for view in &state.views {
                writeln!(out, "{} = {}", view.name, view.value)?;
            }
        }
        Command::Help => writeln!(out, "{}", HELP)?,
        Command::Quit => {}
    }
    Ok(())
}
