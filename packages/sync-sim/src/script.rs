//! Script loading: columns of rows.
//!
//! A script file is plain text. Lines starting with `##` in the first column
//! are directives and `## thread` opens a new column; blank lines are
//! dropped; everything else becomes a row of the current column with
//! trailing whitespace stripped and indentation kept. An indented `##` line
//! is an ordinary (comment-only) row. Rows before the first `## thread` form
//! the initialization column.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::{ExecError, Result, SimError};
use crate::interp::parse_line;

/// One line of script text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    text: String,
    indent: usize,
    /// Where the cursor goes when this row is an `if` header whose guard is
    /// false: the first later row that is not indented deeper than this one,
    /// or `None` when the block runs to the end of the column.
    skip_to: Option<usize>,
}

impl Row {
    fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let indent = indentation(&text);
        Row {
            text,
            indent,
            skip_to: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn skip_to(&self) -> Option<usize> {
        self.skip_to
    }
}

/// Width of leading whitespace; a tab counts as advancing to the next
/// multiple of eight.
fn indentation(text: &str) -> usize {
    let mut width = 0;
    for c in text.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width = (width / 8 + 1) * 8,
            _ => break,
        }
    }
    width
}

/// An ordered sequence of rows: one simulated thread's program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Column {
    rows: Vec<Row>,
}

impl Column {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut column = Column {
            rows: lines.into_iter().map(Row::new).collect(),
        };
        column.resolve_blocks();
        column
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row and return its index.
    pub fn add_row(&mut self, text: impl Into<String>) -> usize {
        self.rows.push(Row::new(text.into().trim_end()));
        self.resolve_blocks();
        self.rows.len() - 1
    }

    fn resolve_blocks(&mut self) {
        for i in 0..self.rows.len() {
            let indent = self.rows[i].indent;
            self.rows[i].skip_to = self.rows[i + 1..]
                .iter()
                .position(|row| row.indent <= indent)
                .map(|offset| i + 1 + offset);
        }
    }
}

/// Which column a thread runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRef {
    Init,
    Thread(usize),
}

/// A row that failed to parse, found by [`Script::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Malformed {
    pub column: ColumnRef,
    pub row: usize,
    pub error: ExecError,
}

/// The initialization column plus one column per thread program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Script {
    init: Column,
    columns: Vec<Column>,
}

impl Script {
    pub fn new(init: Column, columns: Vec<Column>) -> Self {
        Script { init, columns }
    }

    pub fn parse(source: &str) -> Self {
        let mut init = Vec::new();
        let mut columns: Vec<Vec<String>> = Vec::new();

        for line in source.lines() {
            let line = line.trim_end();
            if line.trim().is_empty() {
                continue;
            }
            if let Some(directive) = line.strip_prefix("##") {
                if is_thread_directive(directive) {
                    columns.push(Vec::new());
                } else {
                    log::debug!("ignoring directive `{}`", line.trim());
                }
                continue;
            }
            match columns.last_mut() {
                Some(column) => column.push(line.to_string()),
                None => init.push(line.to_string()),
            }
        }

        Script {
            init: Column::from_lines(init),
            columns: columns.into_iter().map(Column::from_lines).collect(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|error| SimError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        Ok(Self::parse(&source))
    }

    pub fn init(&self) -> &Column {
        &self.init
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, column: ColumnRef) -> Option<&Column> {
        match column {
            ColumnRef::Init => Some(&self.init),
            ColumnRef::Thread(i) => self.columns.get(i),
        }
    }

    pub fn column_mut(&mut self, column: ColumnRef) -> Option<&mut Column> {
        match column {
            ColumnRef::Init => Some(&mut self.init),
            ColumnRef::Thread(i) => self.columns.get_mut(i),
        }
    }

    /// Append an empty thread column and return its reference.
    pub fn add_column(&mut self) -> ColumnRef {
        self.columns.push(Column::new());
        ColumnRef::Thread(self.columns.len() - 1)
    }

    /// Parse every row without executing anything.
    pub fn validate(&self) -> Vec<Malformed> {
        let init = std::iter::once((ColumnRef::Init, &self.init));
        let threads = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (ColumnRef::Thread(i), c));

        let mut malformed = Vec::new();
        for (column, rows) in init.chain(threads) {
            for (row, r) in rows.rows.iter().enumerate() {
                let text = r.text.trim();
                if let Err(reason) = parse_line(text) {
                    malformed.push(Malformed {
                        column,
                        row,
                        error: ExecError::malformed(text, reason),
                    });
                }
            }
        }
        malformed
    }
}

/// `## thread`, `##Thread 2`, `## thread A`: the first word after the
/// leading hashes names the directive, case-insensitively.
fn is_thread_directive(directive: &str) -> bool {
    directive
        .trim_start_matches('#')
        .split_whitespace()
        .next()
        .is_some_and(|word| word.eq_ignore_ascii_case("thread"))
}
