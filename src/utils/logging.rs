//! Logging utilities
//!
//! Subscriber initialization plus small formatting helpers shared by the
//! orchestrator's log output.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Honors `RUST_LOG`; defaults to `info` when unset. Safe to call more than
/// once (later calls are no-ops), which keeps tests independent.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Truncate long text for log display
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("court", 10), "court");
        assert_eq!(truncate_text("abcdefghij", 4), "abcd...");
    }
}
