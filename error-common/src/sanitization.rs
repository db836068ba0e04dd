// Stack trace cleaning
// Removes runtime-internal frames so serialized traces only show application code

use crate::error::{CommonError, Result};
use crate::stack::parse_frame;

/// Frames from the runtime, the standard library and the capture machinery.
const INTERNAL_FRAME_PATTERNS: &[&str] = &[
    "std::",
    "<std::",
    "core::",
    "<core::",
    "alloc::",
    "<alloc::",
    "backtrace::",
    "test::",
    "tokio::runtime::",
    "__rust_begin_short_backtrace",
    "__rust_end_short_backtrace",
    "rust_begin_unwind",
    "__libc_start",
    "_start",
    "start_thread",
    "clone3",
];

/// Cleans a textual stack trace before it is serialized.
///
/// Cleaning is cosmetic: callers fall back to the raw stack when it fails.
pub trait StackCleaner: Send + Sync {
    fn clean(&self, stack: &str) -> Result<String>;
}

impl<F> StackCleaner for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn clean(&self, stack: &str) -> Result<String> {
        self(stack)
    }
}

/// Drops internal frames from a stack trace.
#[derive(Debug, Clone)]
pub struct InternalFrameFilter {
    patterns: Vec<String>,
    home_dir: Option<String>,
}

impl Default for InternalFrameFilter {
    fn default() -> Self {
        Self {
            patterns: INTERNAL_FRAME_PATTERNS.iter().map(ToString::to_string).collect(),
            home_dir: None,
        }
    }
}

impl InternalFrameFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also drops frames whose function starts with `pattern`.
    pub fn with_pattern<P: Into<String>>(mut self, pattern: P) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Replaces the current user's home directory with `~` in file paths.
    pub fn pretty(mut self) -> Self {
        self.home_dir = std::env::var("HOME").ok().filter(|home| !home.is_empty());
        self
    }

    /// Replaces `home_dir` with `~` in file paths.
    pub fn with_home_dir<H: Into<String>>(mut self, home_dir: H) -> Self {
        self.home_dir = Some(home_dir.into());
        self
    }

    fn is_internal(&self, function: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| function.starts_with(pattern.as_str()))
    }
}

impl StackCleaner for InternalFrameFilter {
    fn clean(&self, stack: &str) -> Result<String> {
        if stack.trim().is_empty() {
            return Err(CommonError::StackClean("stack trace is empty".to_string()));
        }

        let mut cleaned = Vec::new();
        for line in stack.lines() {
            match parse_frame(line) {
                Some(frame) if self.is_internal(&frame.function) => {}
                Some(_) => match &self.home_dir {
                    Some(home) => cleaned.push(line.replace(home.as_str(), "~")),
                    None => cleaned.push(line.to_string()),
                },
                None if line.trim().is_empty() => {}
                None => cleaned.push(line.to_string()),
            }
        }

        Ok(cleaned.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STACK: &str = "EnrichedError: boom (stackId: x)
    at billing::charge (/home/dev/app/src/billing.rs:12:9)
    at core::ops::function::FnOnce::call_once (/rustc/library/core/src/ops/function.rs:250:5)
    at std::sys::backtrace::__rust_begin_short_backtrace
    at app::main (/home/dev/app/src/main.rs:4:5)";

    #[test]
    fn test_removes_internal_frames() {
        let cleaned = InternalFrameFilter::new().clean(STACK).unwrap();
        assert_eq!(
            cleaned,
            "EnrichedError: boom (stackId: x)
    at billing::charge (/home/dev/app/src/billing.rs:12:9)
    at app::main (/home/dev/app/src/main.rs:4:5)"
        );
    }

    #[test]
    fn test_pretty_paths_and_custom_patterns() {
        let cleaned = InternalFrameFilter::new()
            .with_pattern("billing::")
            .with_home_dir("/home/dev")
            .clean(STACK)
            .unwrap();
        assert_eq!(
            cleaned,
            "EnrichedError: boom (stackId: x)
    at app::main (~/app/src/main.rs:4:5)"
        );
    }

    #[test]
    fn test_empty_stack_is_an_error() {
        assert!(matches!(
            InternalFrameFilter::new().clean("  "),
            Err(CommonError::StackClean(_))
        ));
    }

    #[test]
    fn test_closures_are_cleaners() {
        let cleaner = |stack: &str| -> Result<String> { Ok(stack.to_uppercase()) };
        assert_eq!(cleaner.clean("at x").unwrap(), "AT X");
    }
}
