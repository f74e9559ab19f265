//! Output sinks for operator-facing progress lines.
//!
//! A sink is injected into the orchestrator once, at construction. It is a
//! write-only side channel: nothing in the protocol reads it back.

mod sink;

pub use sink::{CollectingSink, LoggingSink, NoOpSink, OutputSink, WriterSink};

use std::sync::Arc;

/// Returns the default sink, which discards every line.
#[must_use]
pub fn default_sink() -> Arc<dyn OutputSink> {
    Arc::new(NoOpSink)
}

/// Writes every line to the sink, in order.
pub fn write_lines<I, S>(sink: &dyn OutputSink, lines: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for line in lines {
        sink.write_line(line.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sink_discards() {
        let sink = default_sink();
        sink.write_line("nobody hears this");
    }

    #[test]
    fn test_write_lines_in_order() {
        let sink = CollectingSink::new();
        write_lines(&sink, ["one", "two", "three"]);
        assert_eq!(sink.lines(), vec!["one", "two", "three"]);
    }
}
