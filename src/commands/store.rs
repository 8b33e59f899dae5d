//! Stored listing lookup and removal.

use crate::config::Config;
use crate::format::Formatter;
use crate::listing::Listing;
use crate::store::KeyValueStore;
use anyhow::{Context, Result};
use tracing::info;

/// Reads and deletes listings in the dedup store.
pub struct StoreCommand {
    config: Config,
}

impl StoreCommand {
    /// Creates a new store command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Prints the listing stored under `id`.
    pub async fn show(&self, store: &dyn KeyValueStore, id: &str) -> Result<String> {
        let data = store
            .get(id)
            .await?
            .with_context(|| format!("No stored listing with id: {}", id))?;

        let listing = Listing::from_json(&data)
            .with_context(|| format!("Stored record {} is not a listing", id))?;

        Ok(Formatter::new(self.config.format).format_listing(&listing))
    }

    /// Removes the listing stored under `id` so the next cycle saves it again.
    pub async fn forget(&self, store: &dyn KeyValueStore, id: &str) -> Result<String> {
        if !store.exists(id).await? {
            return Ok(format!("No stored listing with id: {}", id));
        }

        store.delete(id).await?;
        info!("Removed listing {}", id);
        Ok(format!("Removed listing {}", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::engine::{ListingPersister, LISTING_TTL};
    use crate::store::MemoryStore;
    use chrono::Utc;
    use std::sync::Arc;

    fn make_listing() -> Listing {
        let now = Utc::now();
        Listing {
            id: "listing_https:__site.test_item_7".to_string(),
            title: "Studio".to_string(),
            price: "18 000 ₽".to_string(),
            url: "https://site.test/item/7".to_string(),
            location: String::new(),
            description: String::new(),
            images: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        ListingPersister::new(store.clone(), LISTING_TTL)
            .save_if_new(&make_listing())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_show_existing() {
        let store = seeded_store().await;
        let cmd = StoreCommand::new(Config { format: OutputFormat::Table, ..Config::default() });

        let output = cmd.show(&*store, &make_listing().id).await.unwrap();
        assert!(output.contains("Studio"));
        assert!(output.contains("18 000 ₽"));
    }

    #[tokio::test]
    async fn test_show_missing() {
        let store = MemoryStore::new();
        let cmd = StoreCommand::new(Config::default());

        let err = cmd.show(&store, "listing_nope").await.unwrap_err();
        assert!(err.to_string().contains("No stored listing"));
    }

    #[tokio::test]
    async fn test_show_corrupt_record() {
        let store = MemoryStore::new();
        store.set("listing_bad", "not json", LISTING_TTL).await.unwrap();
        let cmd = StoreCommand::new(Config::default());

        let err = cmd.show(&store, "listing_bad").await.unwrap_err();
        assert!(err.to_string().contains("is not a listing"));
    }

    #[tokio::test]
    async fn test_forget_then_missing() {
        let store = seeded_store().await;
        let cmd = StoreCommand::new(Config::default());
        let id = make_listing().id;

        assert_eq!(cmd.forget(&*store, &id).await.unwrap(), format!("Removed listing {}", id));
        assert!(store.is_empty());
        assert!(cmd.forget(&*store, &id).await.unwrap().starts_with("No stored listing"));
    }
}
