//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence over the configured level when it is set.
//! `LOG_FORMAT=json` switches to machine-readable output.

use tracing_subscriber::EnvFilter;

/// Maps a user-facing level name onto a tracing directive
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" | "critical" => "error",
        _ => "info",
    }
}

/// Initializes the global subscriber
pub fn init_logging(level: &str, format: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(level)));

    if format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("INFO"), "info");
        assert_eq!(level_directive("Warning"), "warn");
        assert_eq!(level_directive("critical"), "error");
        assert_eq!(level_directive("debug"), "debug");
        assert_eq!(level_directive("verbose"), "info");
    }
}
