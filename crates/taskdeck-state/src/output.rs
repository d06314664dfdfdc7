//! Per-task output buffers and the filtered, capped display view.
//!
//! A buffer is always the full snapshot the remote returned for that task.
//! The display cap only limits what `render` hands out; storage keeps
//! every line.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use taskdeck_protocol::{OutputKind, OutputLine, TaskId};

use crate::error::StateError;

// Literal patterns; the timestamp tests below force both.
static BRACKETED_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\d{2}:\d{2}:\d{2})\]\s*").expect("valid regex")
});

static INLINE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{2}:\d{2}:\d{2})\s+(.*)").expect("valid regex")
});

/// Which stream(s) to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OutputFilter {
    #[default]
    All,
    Stdout,
    Stderr,
}

impl OutputFilter {
    pub fn matches(self, kind: OutputKind) -> bool {
        match self {
            OutputFilter::All => true,
            OutputFilter::Stdout => kind == OutputKind::Stdout,
            OutputFilter::Stderr => kind == OutputKind::Stderr,
        }
    }

    /// all -> stdout -> stderr -> all
    pub fn next(self) -> Self {
        match self {
            OutputFilter::All => OutputFilter::Stdout,
            OutputFilter::Stdout => OutputFilter::Stderr,
            OutputFilter::Stderr => OutputFilter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OutputFilter::All => "all",
            OutputFilter::Stdout => "stdout",
            OutputFilter::Stderr => "stderr",
        }
    }
}

impl fmt::Display for OutputFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OutputFilter {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(OutputFilter::All),
            "stdout" => Ok(OutputFilter::Stdout),
            "stderr" => Ok(OutputFilter::Stderr),
            other => Err(StateError::UnknownFilter(other.to_string())),
        }
    }
}

/// Split a display time out of a line.
///
/// Recognizes a leading `[HH:MM:SS]`, or else the first `HH:MM:SS` followed
/// by whitespace anywhere in the line (text is what follows it). Lines with
/// neither come back whole with no time.
pub fn parse_timestamp(content: &str) -> (Option<&str>, &str) {
    if let Some(caps) = BRACKETED_TIME_RE.captures(content) {
        if let (Some(whole), Some(time)) = (caps.get(0), caps.get(1)) {
            return (Some(time.as_str()), &content[whole.end()..]);
        }
    }
    if let Some(caps) = INLINE_TIME_RE.captures(content) {
        if let (Some(time), Some(text)) = (caps.get(1), caps.get(2)) {
            return (Some(time.as_str()), text.as_str());
        }
    }
    (None, content)
}

/// A line prepared for display. The stored line is not modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayLine {
    pub kind: OutputKind,
    pub time: Option<String>,
    pub text: String,
}

impl DisplayLine {
    fn from_line(line: &OutputLine) -> Self {
        let (time, text) = parse_timestamp(&line.content);
        Self {
            kind: line.kind,
            time: time.map(str::to_string),
            text: text.to_string(),
        }
    }
}

/// Filtered, capped view of one task's output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputView {
    pub lines: Vec<DisplayLine>,
    /// Lines matching the filter, before the cap.
    pub filtered_count: usize,
    /// Lines in `lines`. Never above the cap, never above `filtered_count`.
    pub displayed_count: usize,
    /// Lines stored for the task, unfiltered.
    pub total_count: usize,
}

impl OutputView {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutputStore {
    buffers: HashMap<TaskId, Vec<OutputLine>>,
}

impl OutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in the complete output snapshot for a task.
    pub fn replace(&mut self, task_id: &str, lines: Vec<OutputLine>) {
        self.buffers.insert(task_id.to_string(), lines);
    }

    pub fn clear(&mut self, task_id: &str) {
        self.buffers.remove(task_id);
    }

    pub fn lines(&self, task_id: &str) -> &[OutputLine] {
        self.buffers.get(task_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn render(&self, task_id: &str, filter: OutputFilter, cap: usize) -> OutputView {
        let stored = self.lines(task_id);
        let filtered: Vec<&OutputLine> =
            stored.iter().filter(|l| filter.matches(l.kind)).collect();
        let skip = filtered.len().saturating_sub(cap);
        let lines: Vec<DisplayLine> = filtered[skip..]
            .iter()
            .map(|l| DisplayLine::from_line(l))
            .collect();

        OutputView {
            filtered_count: filtered.len(),
            displayed_count: lines.len(),
            total_count: stored.len(),
            lines,
        }
    }
}
