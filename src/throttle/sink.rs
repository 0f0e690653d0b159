//! Where the throttler's diagnostic lines go.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::info;

/// Accepts one formatted diagnostic line at a time.
pub trait LogSink {
    fn line(&self, line: &str);
}

/// Forwards lines to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn line(&self, line: &str) {
        info!(target: "dispatch_throttle", "{}", line);
    }
}

/// Keeps every line in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Rc<RefCell<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines received so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

impl LogSink for MemorySink {
    fn line(&self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_shares_buffer() {
        let sink = MemorySink::new();
        let handle = sink.clone();

        sink.line("first");
        sink.line("second");
        assert_eq!(handle.lines(), vec!["first", "second"]);

        handle.clear();
        assert!(sink.lines().is_empty());
    }
}
