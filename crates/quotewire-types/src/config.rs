//! Configuration types for the relay.
//!
//! `RelayConfig` represents the top-level `config.toml`: branding,
//! webhook destinations, the message store connection, query limits,
//! and poll cadence. All fields have defaults so a missing file still
//! yields a usable (if automation-less) deployment.

use serde::{Deserialize, Serialize};

/// Top-level configuration for Quotewire.
///
/// Loaded from `{data_dir}/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub branding: BrandingConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Widget branding shown by the terminal client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandingConfig {
    #[serde(default = "default_company_name")]
    pub company_name: String,
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
}

fn default_company_name() -> String {
    "Quotewire".to_string()
}

fn default_welcome_message() -> String {
    "Let's make some profit. What are we doing today?".to_string()
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            company_name: default_company_name(),
            welcome_message: default_welcome_message(),
        }
    }
}

/// Outbound webhook destinations.
///
/// An unset `url` intentionally disables automation: dispatch becomes
/// a logged no-op rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub feedback_url: Option<String>,
    /// Source tag identifying this client in outbound events.
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "quotewire".to_string()
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            feedback_url: None,
            source: default_source(),
        }
    }
}

/// Durable message store (REST) connection settings.
///
/// The service key is not stored here; it is read from the
/// `QUOTEWIRE_STORE_KEY` environment variable at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_store_table")]
    pub table: String,
}

fn default_store_table() -> String {
    "demo_messages".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            table: default_store_table(),
        }
    }
}

/// Query endpoint limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Maximum rows returned per query.
    #[serde(default = "default_query_limit")]
    pub limit: u32,
    /// Deadline on the store call, seconds.
    #[serde(default = "default_query_timeout")]
    pub timeout_secs: u64,
    /// `retryAfter` hint returned on timeout, seconds.
    #[serde(default = "default_retry_after")]
    pub retry_after_secs: u64,
}

fn default_query_limit() -> u32 {
    10
}

fn default_query_timeout() -> u64 {
    5
}

fn default_retry_after() -> u64 {
    3
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            limit: default_query_limit(),
            timeout_secs: default_query_timeout(),
            retry_after_secs: default_retry_after(),
        }
    }
}

/// Client poll cadence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between the first few polls, milliseconds.
    #[serde(default = "default_burst_ms")]
    pub burst_ms: u64,
    /// Number of burst-cadence attempts.
    #[serde(default = "default_burst_len")]
    pub burst_len: u32,
    /// Delay in the moderate phase, milliseconds.
    #[serde(default = "default_steady_ms")]
    pub steady_ms: u64,
    /// Attempt count at which the slow cadence takes over.
    #[serde(default = "default_steady_len")]
    pub steady_len: u32,
    /// Delay after an extended wait, milliseconds. Also the background
    /// cadence between turns.
    #[serde(default = "default_slow_ms")]
    pub slow_ms: u64,
    /// Per-turn ceiling before the turn is marked timed out, seconds.
    #[serde(default = "default_turn_ceiling")]
    pub turn_ceiling_secs: u64,
}

fn default_burst_ms() -> u64 {
    1_000
}

fn default_burst_len() -> u32 {
    5
}

fn default_steady_ms() -> u64 {
    2_000
}

fn default_steady_len() -> u32 {
    15
}

fn default_slow_ms() -> u64 {
    3_000
}

fn default_turn_ceiling() -> u64 {
    60
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            burst_ms: default_burst_ms(),
            burst_len: default_burst_len(),
            steady_ms: default_steady_ms(),
            steady_len: default_steady_len(),
            slow_ms: default_slow_ms(),
            turn_ceiling_secs: default_turn_ceiling(),
        }
    }
}

/// Ingest sanitization and degradation limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Reply text cap, characters. Longer replies are truncated with a
    /// marker appended.
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
    /// Fallback cache: messages retained per session.
    #[serde(default = "default_cache_per_session")]
    pub cache_per_session: usize,
    /// Fallback cache: sessions retained process-wide.
    #[serde(default = "default_cache_sessions")]
    pub cache_sessions: usize,
}

fn default_max_text_chars() -> usize {
    2_000
}

fn default_cache_per_session() -> usize {
    50
}

fn default_cache_sessions() -> usize {
    256
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_text_chars: default_max_text_chars(),
            cache_per_session: default_cache_per_session(),
            cache_sessions: default_cache_sessions(),
        }
    }
}
