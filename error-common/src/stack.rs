//! Stack trace text helpers.
//!
//! Stack traces are kept as plain text: a header line (`<name>: <message>`)
//! followed by one `    at <function> (<file>:<line>:<column>)` line per frame.
//! Keeping the text form lets a trace survive serialization and be inherited
//! by an error that wraps it.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::codes::STACK_ID_MARKER;
use crate::types::EnrichedError;

lazy_static! {
    static ref FRAME_REGEX: Regex = Regex::new(
        r"^\s*at\s+(?P<function>.+?)(?:\s+\((?P<file>.+?)(?::(?P<line>\d+))?(?::(?P<column>\d+))?\))?\s*$"
    )
    .unwrap();
}

/// Leading frames belonging to the capture machinery and the error constructors.
const CAPTURE_FRAME_PREFIXES: &[&str] = &[
    "backtrace::",
    "<backtrace::",
    "error_common::stack::",
    "error_common::types::",
    "<error_common::types::",
];

/// A single frame parsed from stack trace text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub function: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl StackFrame {
    /// Renders the frame as an `at` line.
    pub fn to_line(&self) -> String {
        let mut line = format!("    at {}", self.function);
        if let Some(file) = &self.file {
            let _ = write!(line, " ({file}");
            if let Some(number) = self.line {
                let _ = write!(line, ":{number}");
                if let Some(column) = self.column {
                    let _ = write!(line, ":{column}");
                }
            }
            line.push(')');
        }
        line
    }
}

/// Message text before the first stack id marker.
pub fn strip_stack_id(message: &str) -> &str {
    message
        .split(STACK_ID_MARKER)
        .next()
        .unwrap_or(message)
}

/// Replaces the first line of `stack` with `header`, keeping every other line.
pub fn splice_header(header: &str, stack: &str) -> String {
    match stack.split_once('\n') {
        Some((_, body)) => format!("{header}\n{body}"),
        None => header.to_string(),
    }
}

/// Adopts an inherited stack trace for `error`: the header line shows the
/// error's own name and displayed message, the call chain is carried over.
pub fn inherit_stack_trace(error: &EnrichedError, inherited: &str) -> String {
    splice_header(&error.header(), inherited)
}

/// Captures a stack trace rooted at the caller of the error constructor.
///
/// Falls back to the standard library backtrace when no frame can be
/// symbolized, and to the bare header when the platform captures nothing.
pub fn capture_stack(header: &str) -> String {
    let frames = capture_frames();
    if !frames.is_empty() {
        let mut stack = header.to_string();
        for frame in &frames {
            stack.push('\n');
            stack.push_str(&frame.to_line());
        }
        return stack;
    }

    let fallback = std::backtrace::Backtrace::force_capture();
    match fallback.status() {
        std::backtrace::BacktraceStatus::Captured => format!("{header}\n{fallback}"),
        _ => header.to_string(),
    }
}

fn capture_frames() -> Vec<StackFrame> {
    let backtrace = backtrace::Backtrace::new();
    let mut frames = Vec::new();

    for frame in backtrace.frames() {
        for symbol in frame.symbols() {
            let Some(name) = symbol.name() else {
                continue;
            };
            frames.push(StackFrame {
                function: format!("{name:#}"),
                file: symbol.filename().map(|path| path.display().to_string()),
                line: symbol.lineno(),
                column: symbol.colno(),
            });
        }
    }

    let skip = frames
        .iter()
        .take_while(|frame| is_capture_frame(&frame.function))
        .count();
    frames.split_off(skip)
}

fn is_capture_frame(function: &str) -> bool {
    CAPTURE_FRAME_PREFIXES
        .iter()
        .any(|prefix| function.starts_with(prefix))
}

/// Parses the `at` lines of a stack trace, ignoring the header and any line
/// that is not a frame.
pub fn parse_frames(stack: &str) -> Vec<StackFrame> {
    stack.lines().filter_map(parse_frame).collect()
}

pub fn parse_frame(line: &str) -> Option<StackFrame> {
    let caps = FRAME_REGEX.captures(line)?;
    Some(StackFrame {
        function: caps.name("function")?.as_str().to_string(),
        file: caps.name("file").map(|m| m.as_str().to_string()),
        line: caps.name("line").and_then(|m| m.as_str().parse().ok()),
        column: caps.name("column").and_then(|m| m.as_str().parse().ok()),
    })
}
