//! Application state wiring the relay service together.
//!
//! `AppState` pins the generic `RelayService` to the concrete infra
//! backends and is shared by the HTTP handlers.

use std::sync::Arc;

use quotewire_core::relay::RelayService;
use quotewire_infra::cache::DashReplyCache;
use quotewire_infra::config::{load_relay_config, resolve_data_dir, store_service_key};
use quotewire_infra::store::{AnyMessageStore, MemoryMessageStore, RestMessageStore};
use quotewire_types::config::RelayConfig;

/// Relay service pinned to the concrete store and cache backends.
pub type ConcreteRelayService = RelayService<AnyMessageStore, DashReplyCache>;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ConcreteRelayService>,
    pub config: Arc<RelayConfig>,
}

impl AppState {
    /// Initialize from the data-dir config. Uses the REST store when a
    /// base URL and service key are both present, otherwise falls back
    /// to the in-process store (demo mode). `force_memory` skips the
    /// REST store even when configured.
    pub async fn init(force_memory: bool) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_relay_config(&data_dir).await;

        let store = if force_memory {
            AnyMessageStore::Memory(MemoryMessageStore::new())
        } else {
            match (config.store.base_url.clone(), store_service_key()) {
                (Some(base_url), Some(key)) => AnyMessageStore::Rest(RestMessageStore::new(
                    base_url,
                    config.store.table.clone(),
                    key,
                )),
                (base_url, _) => {
                    if base_url.is_some() {
                        tracing::warn!(
                            "store.base_url set but QUOTEWIRE_STORE_KEY missing, using in-process store"
                        );
                    } else {
                        tracing::warn!("no durable store configured, using in-process store");
                    }
                    AnyMessageStore::Memory(MemoryMessageStore::new())
                }
            }
        };

        Ok(Self::from_store(store, config))
    }

    /// Build state around an in-process store. Used by `serve --memory`
    /// after an explicit request and by the integration tests.
    pub fn with_memory_store(config: RelayConfig) -> Self {
        Self::from_store(AnyMessageStore::Memory(MemoryMessageStore::new()), config)
    }

    fn from_store(store: AnyMessageStore, config: RelayConfig) -> Self {
        let cache = DashReplyCache::new(
            config.ingest.cache_per_session,
            config.ingest.cache_sessions,
        );
        let relay = RelayService::new(store, cache, &config.query, &config.ingest);

        Self {
            relay: Arc::new(relay),
            config: Arc::new(config),
        }
    }
}
