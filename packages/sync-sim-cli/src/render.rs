//! Terminal output for simulator events.

use std::io::Write;

use colored::{Color, Colorize};
use serde_json::json;
use sync_sim::{DisplayState, Observer, SimError, StepReport};

use crate::trace_log::{StepLogEntry, TraceLogger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Map a thread's display colour to a terminal colour.
pub fn thread_color(name: &str) -> Color {
    let (r, g, b) = match name {
        "red" => (255, 0, 0),
        "orange" => (255, 165, 0),
        "yellow" => (255, 255, 0),
        "greenyellow" => (173, 255, 47),
        "green" => (0, 128, 0),
        "mediumseagreen" => (60, 179, 113),
        "skyblue" => (135, 206, 235),
        "violet" => (238, 130, 238),
        "magenta" => (255, 0, 255),
        _ => (255, 255, 255),
    };
    Color::TrueColor { r, g, b }
}

/// Writes simulator events to a terminal (or any writer) and, optionally,
/// to a JSON-lines trace.
pub struct TerminalObserver<W: Write> {
    out: W,
    format: OutputFormat,
    mode: &'static str,
    /// Print thread placement after every tick.
    show_state: bool,
    tick: u64,
    trace: Option<TraceLogger>,
}

impl<W: Write> TerminalObserver<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            mode: "round_robin",
            show_state: false,
            tick: 0,
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: TraceLogger) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn show_state(mut self, show: bool) -> Self {
        self.show_state = show;
        self
    }

    /// Scheduling mode recorded in trace entries.
    pub fn set_mode(&mut self, mode: &'static str) {
        self.mode = mode;
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print the full display state regardless of `show_state`.
    pub fn print_state(&mut self, state: &DisplayState) {
        let result = match self.format {
            OutputFormat::Json => self.write_json(json!({ "event": "state", "state": state })),
            OutputFormat::Text => write_state(&mut self.out, state),
        };
        self.report_io(result);
    }

    fn write_json(&mut self, value: serde_json::Value) -> std::io::Result<()> {
        writeln!(self.out, "{}", value)
    }

    fn trace(&mut self, entry: StepLogEntry) {
        if let Some(trace) = self.trace.as_mut() {
            if let Err(err) = trace.log(&entry) {
                log::warn!(
                    "failed to write trace to {}: {}",
                    trace.log_path().display(),
                    err
                );
                self.trace = None;
            }
        }
    }

    fn report_io(&self, result: std::io::Result<()>) {
        if let Err(err) = result {
            log::warn!("failed to write output: {}", err);
        }
    }

    fn current_tick(&self) -> u64 {
        self.tick + 1
    }
}

impl<W: Write> Observer for TerminalObserver<W> {
    fn thread_stepped(&mut self, report: &StepReport) {
        let result = match self.format {
            OutputFormat::Json => self.write_json(json!({ "event": "step", "step": report })),
            OutputFormat::Text => write_report(&mut self.out, report),
        };
        self.report_io(result);
        let entry = StepLogEntry::from_report(report, self.current_tick(), self.mode);
        self.trace(entry);
    }

    fn step_failed(&mut self, thread: &str, error: &SimError) {
        let message = error.to_string();
        let result = match self.format {
            OutputFormat::Json => self.write_json(json!({
                "event": "error",
                "thread": thread,
                "message": message,
            })),
            OutputFormat::Text => writeln!(self.out, "{} {}", "error:".red().bold(), message),
        };
        self.report_io(result);
        let entry = StepLogEntry::from_failure(thread, &message, self.current_tick(), self.mode);
        self.trace(entry);
    }

    fn no_runnable_threads(&mut self) {
        let result = match self.format {
            OutputFormat::Json => self.write_json(json!({ "event": "idle" })),
            OutputFormat::Text => writeln!(
                self.out,
                "{}",
                "There are currently no threads that can run.".dimmed()
            ),
        };
        self.report_io(result);
    }

    fn refresh(&mut self, state: &DisplayState) {
        self.tick += 1;
        if self.show_state {
            self.print_state(state);
        }
    }
}

fn write_report<W: Write>(out: &mut W, report: &StepReport) -> std::io::Result<()> {
    let marker = if report.blocked {
        " (queued)".yellow().to_string()
    } else if report.skipped_block {
        " (skip)".dimmed().to_string()
    } else {
        String::new()
    };
    writeln!(
        out,
        "{} {:>3}  {}{}",
        report.thread_name.bold(),
        report.at.row,
        report.source,
        marker
    )?;
    for binding in &report.defined {
        writeln!(out, "      {} = {}", binding.name.green(), binding.value)?;
    }
    for binding in &report.changed {
        writeln!(out, "      {} = {}", binding.name.yellow(), binding.value)?;
    }
    for line in &report.output {
        writeln!(out, "      {} {}", ">".cyan(), line)?;
    }
    Ok(())
}

fn write_state<W: Write>(out: &mut W, state: &DisplayState) -> std::io::Result<()> {
    let runnable: Vec<String> = state
        .runnable()
        .map(|t| {
            let row = t.row.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string());
            format!("{}@{}", t.name.color(thread_color(t.color)), row)
        })
        .collect();
    let queued: Vec<String> = state
        .queued()
        .map(|t| t.name.color(thread_color(t.color)).to_string())
        .collect();
    writeln!(out, "{} {}", "runnable:".dimmed(), runnable.join(" "))?;
    writeln!(out, "{} {}", "queued:  ".dimmed(), queued.join(" "))?;
    for view in &state.views {
        writeln!(out, "  {} = {}", view.name, view.value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_sim::{Script, SimConfig, Simulator};

    fn sim() -> Simulator {
        let script = Script::parse(
            "mutex = Semaphore(1)\n## thread\nmutex.wait()\nx = 1\nmutex.signal()\n## thread\nmutex.wait()\nmutex.signal()\n",
        );
        Simulator::boot(script, SimConfig::default().with_seed(2).with_delay_ms(0)).unwrap()
    }

    #[test]
    fn test_text_output() {
        colored::control::set_override(false);
        let mut sim = sim();
        let mut observer = TerminalObserver::new(Vec::new(), OutputFormat::Text).show_state(true);
        sim.step(&mut observer);
        sim.step(&mut observer);
        assert_eq!(observer.tick(), 2);

        let text = String::from_utf8(observer.into_inner()).unwrap();
        assert!(text.contains("A   0  mutex.wait()"));
        assert!(text.contains("B   0  mutex.wait() (queued)"));
        assert!(text.contains("      x = 1"));
        assert!(text.contains("queued:   B"));
        assert!(text.contains("  mutex = -1"));
    }

    #[test]
    fn test_json_output() {
        let mut sim = sim();
        let mut observer = TerminalObserver::new(Vec::new(), OutputFormat::Json);
        sim.step(&mut observer);

        let text = String::from_utf8(observer.into_inner()).unwrap();
        let events: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["event"], "step");
        assert_eq!(events[1]["step"]["thread_name"], "B");
        assert_eq!(events[1]["step"]["blocked"], true);
    }

    #[test]
    fn test_idle_message() {
        colored::control::set_override(false);
        let mut observer = TerminalObserver::new(Vec::new(), OutputFormat::Text);
        observer.no_runnable_threads();
        let text = String::from_utf8(observer.into_inner()).unwrap();
        assert_eq!(text, "There are currently no threads that can run.\n");
    }

    #[test]
    fn test_thread_color() {
        assert_eq!(thread_color("orange"), Color::TrueColor { r: 255, g: 165, b: 0 });
        assert_eq!(thread_color("white"), Color::TrueColor { r: 255, g: 255, b: 255 });
    }
}
