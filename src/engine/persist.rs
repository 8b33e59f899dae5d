//! Dedup / persist step.
//!
//! The existence check and the write are separate store calls. That is safe
//! for a single harvester; concurrent writers would need a conditional write.

use crate::error::PersistError;
use crate::listing::Listing;
use crate::store::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Default lifetime of a persisted listing.
pub const LISTING_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Result of offering a listing to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    AlreadyExists,
}

/// Writes listings the store has not seen yet.
#[derive(Clone)]
pub struct ListingPersister {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl ListingPersister {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Saves `listing` unless its id is already stored.
    pub async fn save_if_new(&self, listing: &Listing) -> Result<SaveOutcome, PersistError> {
        if listing.id.is_empty() {
            return Err(PersistError::InvalidListing("empty id".to_string()));
        }
        if listing.title.is_empty() {
            return Err(PersistError::InvalidListing(format!("{} has no title", listing.id)));
        }

        if self.store.exists(&listing.id).await? {
            return Ok(SaveOutcome::AlreadyExists);
        }

        let data = listing.to_json()?;
        self.store.set(&listing.id, &data, self.ttl).await?;

        info!("Saved listing: {} - {}", listing.title, listing.price);
        Ok(SaveOutcome::Saved)
    }
}
