//! sync-sim CLI

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use sync_sim::{ColumnRef, Script, SimConfig, Simulator, StopHandle, StopReason};
use sync_sim_cli::{
    config::{self, Overrides},
    run_shell, OutputFormat, TerminalObserver, TraceLogger,
};

#[derive(Parser, Debug)]
#[command(name = "sync-sim")]
#[command(version, about = "Step through semaphore exercises one row at a time")]
struct Cli {
    /// Ignore sync-sim.toml / pyproject.toml configuration
    #[arg(long, global = true)]
    no_config: bool,

    /// Read configuration from this file instead of searching for one
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable coloured output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a script until stopped or out of steps
    Run(RunArgs),
    /// Execute a fixed number of scheduler ticks
    Step(StepArgs),
    /// Parse every row and report the malformed ones
    Check {
        /// Script file
        script: PathBuf,
    },
    /// Drive the simulator interactively from stdin
    Shell {
        /// Script file
        script: PathBuf,

        /// Seed for random scheduling
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Script file
    script: PathBuf,

    /// Pick one runnable thread at random per tick
    #[arg(long)]
    random: bool,

    /// Stop after this many ticks
    #[arg(long)]
    steps: Option<u64>,

    /// Milliseconds between ticks
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Seed for random scheduling
    #[arg(long)]
    seed: Option<u64>,

    /// Emit one JSON object per event
    #[arg(long)]
    json: bool,

    /// Append a JSON-lines step trace to this file
    #[arg(long, value_name = "PATH")]
    trace_log: Option<PathBuf>,

    /// End the run on the first failing row
    #[arg(long)]
    stop_on_error: bool,

    /// Print thread placement and variables after every tick
    #[arg(long)]
    show_state: bool,
}

#[derive(Args, Debug)]
struct StepArgs {
    /// Script file
    script: PathBuf,

    /// Number of ticks
    #[arg(long, default_value_t = 1)]
    count: u64,

    /// Pick one runnable thread at random per tick
    #[arg(long)]
    random: bool,

    /// Seed for random scheduling
    #[arg(long)]
    seed: Option<u64>,

    /// Emit one JSON object per event
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default())
        .format_timestamp(None)
        .try_init()
        .ok();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    match dispatch(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::from(2)
        }
    }
}

fn dispatch(cli: &Cli) -> Result<ExitCode> {
    match &cli.command {
        Commands::Run(args) => run(cli, args),
        Commands::Step(args) => step(cli, args),
        Commands::Check { script } => check(script),
        Commands::Shell { script, seed } => shell(cli, script, *seed),
    }
}

fn file_config(cli: &Cli, script: &Path) -> Option<config::Config> {
    if cli.no_config {
        None
    } else {
        config::load_config(cli.config.as_deref(), script)
    }
}

fn load_script(path: &Path) -> Result<Script> {
    let script = Script::load(path)?;
    log::info!(
        "loaded {} ({} init rows, {} thread columns)",
        path.display(),
        script.init().len(),
        script.columns().len()
    );
    Ok(script)
}

fn boot(path: &Path, sim: SimConfig) -> Result<Simulator> {
    let script = load_script(path)?;
    Simulator::boot(script, sim)
        .with_context(|| format!("failed to initialize {}", path.display()))
}

/// Ctrl-C ends a run in progress through `handle`; with nothing running it
/// exits the process.
fn install_interrupt(handle: StopHandle) -> Result<()> {
    ctrlc::set_handler(move || {
        if handle.is_running() {
            handle.stop();
        } else {
            eprintln!("\nCancelled.");
            std::process::exit(130);
        }
    })
    .context("failed to set Ctrl+C handler")
}

fn format_of(json: bool) -> OutputFormat {
    if json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    }
}

fn mode_of(random: bool) -> &'static str {
    if random {
        "random"
    } else {
        "round_robin"
    }
}

fn run(cli: &Cli, args: &RunArgs) -> Result<ExitCode> {
    let file = file_config(cli, &args.script);
    let settings = config::merge_config(
        file.as_ref(),
        &Overrides {
            delay_ms: args.delay_ms,
            seed: args.seed,
            max_steps: args.steps,
            stop_on_error: args.stop_on_error,
            random: args.random,
            trace_log: args.trace_log.clone(),
        },
    );
    log::debug!("effective settings: {:?}", settings);

    let mut sim = boot(&args.script, settings.sim.clone())?;
    install_interrupt(sim.stop_handle())?;

    let stdout = io::stdout();
    let mut observer =
        TerminalObserver::new(stdout.lock(), format_of(args.json)).show_state(args.show_state);
    if let Some(path) = &settings.trace_log {
        let trace = TraceLogger::new(path)
            .with_context(|| format!("failed to open trace log {}", path.display()))?;
        observer = observer.with_trace(trace);
    }
    observer.set_mode(mode_of(settings.random));

    let summary = if settings.random {
        sim.random_run(&mut observer)
    } else {
        sim.run(&mut observer)
    };
    sim.destroy();

    if !args.json {
        let state = sim.display();
        observer.print_state(&state);
        eprintln!(
            "\n{} tick(s), {} failure(s), stopped: {:?}",
            summary.ticks, summary.failures, summary.reason
        );
    }

    Ok(match summary.reason {
        StopReason::Error => ExitCode::from(1),
        _ => ExitCode::SUCCESS,
    })
}

fn step(cli: &Cli, args: &StepArgs) -> Result<ExitCode> {
    let file = file_config(cli, &args.script);
    let settings = config::merge_config(
        file.as_ref(),
        &Overrides {
            seed: args.seed,
            random: args.random,
            ..Default::default()
        },
    );

    let mut sim = boot(&args.script, settings.sim)?;
    let stdout = io::stdout();
    let mut observer = TerminalObserver::new(stdout.lock(), format_of(args.json));
    observer.set_mode(mode_of(settings.random));

    let mut failures = 0;
    for _ in 0..args.count {
        let tick = if settings.random {
            sim.random_step(&mut observer)
        } else {
            sim.step(&mut observer)
        };
        failures += tick.failures.len();
    }

    if !args.json {
        let state = sim.display();
        observer.print_state(&state);
    }

    Ok(if failures > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}

fn check(path: &Path) -> Result<ExitCode> {
    let script = load_script(path)?;
    let malformed = script.validate();

    for m in &malformed {
        let column = match m.column {
            ColumnRef::Init => "init".to_string(),
            ColumnRef::Thread(i) => format!("thread {}", i),
        };
        println!(
            "{}:{} row {}: {}",
            path.display(),
            column.cyan(),
            m.row,
            m.error
        );
    }

    if malformed.is_empty() {
        eprintln!("{}", "No malformed rows.".green());
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("\nFound {} malformed row(s)", malformed.len());
        Ok(ExitCode::from(1))
    }
}

fn shell(cli: &Cli, path: &Path, seed: Option<u64>) -> Result<ExitCode> {
    let file = file_config(cli, path);
    let settings = config::merge_config(
        file.as_ref(),
        &Overrides {
            seed,
            ..Default::default()
        },
    );

    let mut sim = boot(path, settings.sim)?;
    install_interrupt(sim.stop_handle())?;
    let stdin = io::stdin();
    let mut out = io::stderr();
    let mut observer = TerminalObserver::new(io::stdout(), OutputFormat::Text);
    run_shell(&mut sim, stdin.lock(), &mut out, &mut observer)?;
    sim.destroy();
    out.flush()?;
    Ok(ExitCode::SUCCESS)
}
