pub mod error;
pub mod memory;
pub mod models;
pub mod query;
pub mod rest;
pub mod schema;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use query::{Filter, Query};
pub use rest::RestStore;
use ticket_booking_config::StoreConfig;
use tracing::info;

pub type ItemId = u64;
pub type UserId = u64;

/// A list item as the site returns it: column name to json value.
pub type Item = serde_json::Map<String, serde_json::Value>;

/// A list-like store addressed by list title.
#[async_trait]
pub trait ListStore: Send + Sync {
    async fn filter(&self, list: &str, query: &Query) -> Result<Vec<Item>, StoreError>;

    /// Creates an item and returns it including the assigned `Id`.
    async fn add(&self, list: &str, fields: Item) -> Result<Item, StoreError>;

    async fn update(&self, list: &str, id: ItemId, fields: Item) -> Result<(), StoreError>;

    async fn delete(&self, list: &str, id: ItemId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait DocumentLibrary: Send + Sync {
    /// Stores `content` as `name` inside `folder` and returns its server relative url.
    async fn upload(
        &self,
        folder: &str,
        name: &str,
        content: Bytes,
        overwrite: bool,
    ) -> Result<String, StoreError>;
}

#[async_trait]
pub trait PeopleService: Send + Sync {
    /// Maps a display name or email to the site user id.
    async fn ensure_user(&self, login: &str) -> Result<UserId, StoreError>;
}

/// The three remote collaborators behind one handle.
#[derive(Clone)]
pub struct Site {
    pub lists: Arc<dyn ListStore>,
    pub documents: Arc<dyn DocumentLibrary>,
    pub people: Arc<dyn PeopleService>,
}

impl Site {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ListStore + DocumentLibrary + PeopleService + 'static,
    {
        Self {
            lists: store.clone(),
            documents: store.clone(),
            people: store,
        }
    }
}

pub fn connect(config: &StoreConfig) -> Result<Site, StoreError> {
    if config.offline {
        info!("using the in-memory store");
        Ok(Site::from_store(Arc::new(MemoryStore::new())))
    } else {
        info!("using the site at {}", config.site_url);
        Ok(Site::from_store(Arc::new(RestStore::new(
            &config.site_url,
            config.access_token.clone(),
        )?)))
    }
}
