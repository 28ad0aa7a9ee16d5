//! Telemetry and Observability
//!
//! Sets up `tracing-subscriber`. The level comes from `RUST_LOG` when set,
//! otherwise from `--log` or the config file. Debug builds print pretty
//! terminal output, release builds emit JSON lines.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Only the first call takes effect.
pub fn init_telemetry_with_level(log_level: &str) {
    let default_filter = default_filter(log_level);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_target(false))
            .try_init()
            .ok();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
            .ok();
    }
}

/// Default filter for a level, covering this crate and the HTTP trace layer
pub fn default_filter(log_level: &str) -> String {
    format!(
        "{},ecopyright_engine={},tower_http={}",
        log_level, log_level, log_level
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_is_valid() {
        let filter = default_filter("debug");
        assert!(filter.contains("ecopyright_engine=debug"));
        assert!(EnvFilter::try_new(&filter).is_ok());
    }
}
