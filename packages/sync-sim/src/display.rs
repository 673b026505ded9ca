//! What the simulator tells whoever is drawing it.
//!
//! After every executed row an [`Observer`] receives a [`StepReport`] with
//! the bindings that row defined or changed; at the end of each scheduling
//! tick it receives the full [`DisplayState`]: where every thread sits and
//! the current value of every variable, attributed to the row that first
//! defined it.

use serde::Serialize;

use crate::error::SimError;
use crate::ids::ThreadId;
use crate::script::ColumnRef;

/// A row position inside the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RowRef {
    pub column: ColumnRef,
    pub row: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub name: String,
    pub value: String,
}

/// Outcome of executing one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub thread: ThreadId,
    pub thread_name: String,
    pub at: RowRef,
    /// The row text as executed, indentation stripped.
    pub source: String,
    /// An `if` guard evaluated false and its block was skipped.
    pub skipped_block: bool,
    /// The thread ended the step queued on a semaphore.
    pub blocked: bool,
    pub defined: Vec<Binding>,
    pub changed: Vec<Binding>,
    /// Lines written by `print`.
    pub output: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadPlacement {
    pub id: ThreadId,
    pub name: String,
    pub color: &'static str,
    pub column: ColumnRef,
    pub row: Option<usize>,
    pub queued: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableView {
    pub name: String,
    pub value: String,
    pub owner: RowRef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    pub threads: Vec<ThreadPlacement>,
    pub views: Vec<VariableView>,
}

impl DisplayState {
    pub fn thread(&self, name: &str) -> Option<&ThreadPlacement> {
        self.threads.iter().find(|t| t.name == name)
    }

    pub fn view(&self, name: &str) -> Option<&VariableView> {
        self.views.iter().find(|v| v.name == name)
    }

    pub fn runnable(&self) -> impl Iterator<Item = &ThreadPlacement> {
        self.threads.iter().filter(|t| !t.queued)
    }

    pub fn queued(&self) -> impl Iterator<Item = &ThreadPlacement> {
        self.threads.iter().filter(|t| t.queued)
    }
}

/// Receives simulator events. Every method defaults to doing nothing.
pub trait Observer {
    fn thread_stepped(&mut self, _report: &StepReport) {}

    fn step_failed(&mut self, _thread: &str, _error: &SimError) {}

    /// Random scheduling found every thread queued.
    fn no_runnable_threads(&mut self) {}

    fn refresh(&mut self, _state: &DisplayState) {}
}

/// An observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {}

/// Collects every event; handy for tests and for batch output.
#[derive(Debug, Default)]
pub struct Recorder {
    pub reports: Vec<StepReport>,
    pub failures: Vec<(String, String)>,
    pub idle_ticks: usize,
    pub refreshes: usize,
    pub last_state: Option<DisplayState>,
}

impl Observer for Recorder {
    fn thread_stepped(&mut self, report: &StepReport) {
        self.reports.push(report.clone());
    }

    fn step_failed(&mut self, thread: &str, error: &SimError) {
        self.failures.push((thread.to_string(), error.to_string()));
    }

    fn no_runnable_threads(&mut self) {
        self.idle_ticks += 1;
    }

    fn refresh(&mut self, state: &DisplayState) {
        self.refreshes += 1;
        self.last_state = Some(state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(name: &str, queued: bool) -> ThreadPlacement {
        ThreadPlacement {
            id: ThreadId::from_raw(0),
            name: name.to_string(),
            color: "red",
            column: ColumnRef::Thread(0),
            row: Some(0),
            queued,
        }
    }

    #[test]
    fn test_runnable_and_queued_partition() {
        let state = DisplayState {
            threads: vec![placement("A", false), placement("B", true)],
            views: Vec::new(),
        };
        let runnable: Vec<_> = state.runnable().map(|t| t.name.as_str()).collect();
        let queued: Vec<_> = state.queued().map(|t| t.name.as_str()).collect();
        assert_eq!(runnable, vec!["A"]);
        assert_eq!(queued, vec!["B"]);
        assert!(state.thread("B").is_some_and(|t| t.queued));
    }

    #[test]
    fn test_state_serializes() {
        let state = DisplayState {
            threads: vec![placement("A", false)],
            views: vec![VariableView {
                name: "mutex".into(),
                value: "1".into(),
                owner: RowRef {
                    column: ColumnRef::Init,
                    row: 0,
                },
            }],
        };
        let json = serde_json::to_value(&state).expect("serialize");
        assert_eq!(json["threads"][0]["column"]["thread"], 0);
        assert_eq!(json["views"][0]["owner"]["column"], "init");
    }
}
