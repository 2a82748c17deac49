//! Logging setup
//!
//! One `tracing_subscriber::fmt` subscriber writing to stderr. The filter comes from
//! `AULA_LOG` when set, otherwise from the configured level.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "AULA_LOG";

/// Build the filter: `AULA_LOG` wins, then `level`, then "info"
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Safe to call more than once; later calls are ignored.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init("debug");
        init("warn");
        tracing::info!("logging initialized");
    }

    #[test]
    fn test_bad_directive_falls_back() {
        let filter = env_filter("not a [valid directive");
        assert!(!filter.to_string().is_empty());
    }
}
