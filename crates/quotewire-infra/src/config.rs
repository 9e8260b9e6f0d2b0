//! Configuration loader for Quotewire.
//!
//! Reads `config.toml` from the data directory (`~/.quotewire/` by
//! default, overridable via `QUOTEWIRE_DATA_DIR`) and deserializes it
//! into [`RelayConfig`]. Falls back to defaults when the file is
//! missing or malformed. The store service key is never stored in the
//! file; it comes from the `QUOTEWIRE_STORE_KEY` environment variable.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use quotewire_types::config::RelayConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "QUOTEWIRE_DATA_DIR";

/// Environment variable holding the message store service key.
pub const STORE_KEY_ENV: &str = "QUOTEWIRE_STORE_KEY";

/// Resolve the data directory: `$QUOTEWIRE_DATA_DIR`, else
/// `~/.quotewire`, else `./.quotewire` when no home dir exists.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".quotewire"))
        .unwrap_or_else(|| PathBuf::from(".quotewire"))
}

/// Load relay configuration from `{data_dir}/config.toml`.
///
/// - Missing file: returns [`RelayConfig::default()`].
/// - Unreadable or unparsable file: logs a warning and returns the default.
pub async fn load_relay_config(data_dir: &Path) -> RelayConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return RelayConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return RelayConfig::default();
        }
    };

    match toml::from_str::<RelayConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            RelayConfig::default()
        }
    }
}

/// Read the store service key from the environment.
pub fn store_service_key() -> Option<SecretString> {
    std::env::var(STORE_KEY_ENV).ok().map(SecretString::from)
}
