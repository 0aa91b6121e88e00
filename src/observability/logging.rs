//! # Logging
//!
//! `tracing` subscriber setup. Logs go to stderr so stdout stays clean for
//! command output such as `pull` dumps.

use crate::config::{LogFormat, RuntimeConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
fn default_directive(config: &RuntimeConfig, verbose: bool) -> String {
    let level = if verbose { "debug" } else { config.log_level.as_str() };
    format!("envsync={level}")
}

/// Install the global subscriber. Returns `false` when one was already
/// installed; that subscriber stays in place.
pub fn init_logging(config: &RuntimeConfig, verbose: bool) -> bool {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() && !verbose => {
            EnvFilter::try_new(directives)
                .unwrap_or_else(|_| EnvFilter::new(default_directive(config, verbose)))
        }
        _ => EnvFilter::try_new(default_directive(config, verbose))
            .unwrap_or_else(|_| EnvFilter::new("envsync=warn")),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match config.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.with_target(false).try_init(),
    };
    match installed {
        Ok(()) => true,
        Err(error) => {
            debug!(%error, "Keeping existing tracing subscriber");
            false
        }
    }
}

/// Mask secret value for logging (show first and last few characters)
#[must_use]
pub fn mask_secret_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        // Very short values - mask completely
        "*".repeat(chars.len().min(4))
    } else {
        let first: String = chars[..4].iter().collect();
        let last: String = chars[chars.len() - 4..].iter().collect();
        format!("{first}...{last}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret_value_short() {
        assert_eq!(mask_secret_value(""), "");
        assert_eq!(mask_secret_value("abc"), "***");
        assert_eq!(mask_secret_value("short"), "****");
        assert_eq!(mask_secret_value("12345678"), "****");
    }

    #[test]
    fn test_mask_secret_value_long() {
        assert_eq!(mask_secret_value("sk_live_abcdef123456"), "sk_l...3456");
    }

    #[test]
    fn test_mask_secret_value_multibyte() {
        assert_eq!(mask_secret_value("ééééxxxxéééé"), "éééé...éééé");
    }

    #[test]
    fn test_verbose_raises_level() {
        let config = RuntimeConfig::default();
        assert_eq!(default_directive(&config, false), "envsync=warn");
        assert_eq!(default_directive(&config, true), "envsync=debug");
    }

    #[test]
    fn test_second_init_keeps_existing_subscriber() {
        let config = RuntimeConfig::default();
        init_logging(&config, false);
        assert!(!init_logging(&config, true));
    }
}
