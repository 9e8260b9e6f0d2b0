//! Message store backends.
//!
//! `RestMessageStore` talks to the durable REST store; and
//! `MemoryMessageStore` backs dev deployments and tests. `AnyMessageStore`
//! pins the two behind one concrete type so application state stays
//! object-safe-free (the store trait uses RPITIT).

pub mod memory;
pub mod rest;

use chrono::{DateTime, Utc};

use quotewire_core::store::MessageStore;
use quotewire_types::error::StoreError;
use quotewire_types::message::{Message, NewMessage};

pub use memory::MemoryMessageStore;
pub use rest::RestMessageStore;

/// Concrete store backend selected at startup.
pub enum AnyMessageStore {
    Rest(RestMessageStore),
    Memory(MemoryMessageStore),
}

impl MessageStore for AnyMessageStore {
    async fn insert(&self, msg: &NewMessage) -> Result<Message, StoreError> {
        match self {
            AnyMessageStore::Rest(store) => store.insert(msg).await,
            AnyMessageStore::Memory(store) => store.insert(msg).await,
        }
    }

    async fn replies_since(
        &self,
        session_id: &str,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Message>, StoreError> {
        match self {
            AnyMessageStore::Rest(store) => store.replies_since(session_id, since, limit).await,
            AnyMessageStore::Memory(store) => store.replies_since(session_id, since, limit).await,
        }
    }
}
