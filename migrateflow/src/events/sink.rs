//! Output sink trait and implementations.

use parking_lot::{Mutex, RwLock};
use std::io::Write;
use tracing::{debug, info, warn, Level};

/// An append-only line writer.
///
/// Implementations must never fail loudly: write errors are logged and
/// swallowed so that progress output can't abort a phase.
pub trait OutputSink: Send + Sync {
    /// Appends one line.
    fn write_line(&self, line: &str);
}

/// A sink that discards all lines.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl OutputSink for NoOpSink {
    fn write_line(&self, _line: &str) {
        // Intentionally empty - discards all lines
    }
}

/// A sink that forwards lines to the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingSink {
    level: Level,
}

impl Default for LoggingSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingSink {
    /// Creates a new logging sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl OutputSink for LoggingSink {
    fn write_line(&self, line: &str) {
        if self.level == Level::DEBUG {
            debug!(target: "migrateflow::output", "{}", line);
        } else {
            info!(target: "migrateflow::output", "{}", line);
        }
    }
}

/// A sink that writes to any `io::Write`, one line per call.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the sink, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl WriterSink<std::io::Stdout> {
    /// Creates a sink writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> OutputSink for WriterSink<W> {
    fn write_line(&self, line: &str) {
        let mut writer = self.writer.lock();
        if let Err(e) = writeln!(writer, "{line}") {
            warn!(error = %e, "Failed to write output line");
        }
    }
}

impl<W: Write + Send> std::fmt::Debug for WriterSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterSink").finish_non_exhaustive()
    }
}

/// A collecting sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingSink {
    lines: RwLock<Vec<String>>,
}

impl CollectingSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.read().clone()
    }

    /// Returns the number of collected lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.read().len()
    }

    /// Returns true if no lines have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.read().is_empty()
    }

    /// Returns true if any line contains the needle.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.read().iter().any(|l| l.contains(needle))
    }

    /// Clears all collected lines.
    pub fn clear(&self) {
        self.lines.write().clear();
    }
}

impl OutputSink for CollectingSink {
    fn write_line(&self, line: &str) {
        self.lines.write().push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_sink() {
        NoOpSink.write_line("ignored");
    }

    #[test]
    fn test_logging_sink() {
        LoggingSink::default().write_line("info line");
        LoggingSink::debug().write_line("debug line");
    }

    #[test]
    fn test_writer_sink_appends_newlines() {
        let sink = WriterSink::new(Vec::new());
        sink.write_line("first");
        sink.write_line("second");

        let bytes = sink.into_inner();
        assert_eq!(String::from_utf8(bytes).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        assert!(sink.is_empty());

        sink.write_line("Preparing UsersPipeline");
        sink.write_line("Prepared 3 unit(s)");

        assert_eq!(sink.len(), 2);
        assert!(sink.contains("UsersPipeline"));

        sink.clear();
        assert!(sink.is_empty());
    }
}
