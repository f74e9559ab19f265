//! Structured logging setup.

use crate::errors::MigrationError;
use tracing_subscriber::EnvFilter;

/// Installs a global `tracing-subscriber` fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` is used as the filter
/// directive. With `json` the output is one JSON object per event.
pub fn init_logging(level: &str, json: bool) -> Result<(), MigrationError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| MigrationError::Logging(format!("invalid filter '{level}': {e}")))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| MigrationError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails_cleanly() {
        // Whichever test installs first wins; the second call must not panic.
        let _ = init_logging("info", false);
        let second = init_logging("debug", true);
        assert!(matches!(second, Err(MigrationError::Logging(_))));
    }
}
