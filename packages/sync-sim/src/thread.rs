//! Simulated threads: revolving cursors over a column.
//!
//! A thread is running at some row, queued on a semaphore, or finished with
//! its cursor at `None`. Round-robin and random stepping restart a finished
//! thread at the top of its column, so programs repeat forever.

use serde::Serialize;

use crate::ids::ThreadId;
use crate::script::{Column, ColumnRef};

const NAMES: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const COLORS: [&str; 9] = [
    "red",
    "orange",
    "yellow",
    "greenyellow",
    "green",
    "mediumseagreen",
    "skyblue",
    "violet",
    "magenta",
];

pub const INIT_NAME: &str = "0";
pub const INIT_COLOR: &str = "white";

/// Hands out thread names and colours, cycling through both lists.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    next_name: usize,
    next_color: usize,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> (String, &'static str) {
        let name = NAMES
            .chars()
            .nth(self.next_name)
            .map(String::from)
            .unwrap_or_default();
        let color = COLORS[self.next_color];
        self.next_name = (self.next_name + 1) % NAMES.len();
        self.next_color = (self.next_color + 1) % COLORS.len();
        (name, color)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thread {
    id: ThreadId,
    name: String,
    color: &'static str,
    column: ColumnRef,
    cursor: Option<usize>,
    queued: bool,
}

impl Thread {
    /// A new thread positioned at the first row of `rows`.
    pub fn new(
        id: ThreadId,
        name: impl Into<String>,
        color: &'static str,
        column: ColumnRef,
        rows: &Column,
    ) -> Self {
        let mut thread = Thread {
            id,
            name: name.into(),
            color,
            column,
            cursor: None,
            queued: false,
        };
        thread.start(rows);
        thread
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &'static str {
        self.color
    }

    pub fn column(&self) -> ColumnRef {
        self.column
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn is_queued(&self) -> bool {
        self.queued
    }

    /// Back to the first row, runnable. An empty column leaves the cursor
    /// at `None`.
    pub fn start(&mut self, rows: &Column) {
        self.queued = false;
        self.cursor = if rows.is_empty() { None } else { Some(0) };
    }

    /// Advance one row, or to `None` past the last one. Queued threads stay
    /// on the row they blocked on.
    pub fn next_row(&mut self, rows: &Column) {
        if self.queued {
            return;
        }
        self.cursor = match self.cursor {
            Some(i) if i + 1 < rows.len() => Some(i + 1),
            _ => None,
        };
    }

    /// Advance one row, looping to the top of the column if necessary.
    pub fn next_loop(&mut self, rows: &Column) {
        self.next_row(rows);
        if self.cursor.is_none() {
            self.start(rows);
        }
    }

    /// Jump past a skipped block.
    pub fn skip_to(&mut self, target: Option<usize>) {
        if !self.queued {
            self.cursor = target;
        }
    }

    pub fn enqueue(&mut self) {
        self.queued = true;
    }

    pub fn dequeue(&mut self) {
        self.queued = false;
    }
}
