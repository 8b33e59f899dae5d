//! listing-harvester - continuous classifieds listing harvester
//!
//! Pages through a results listing, extracts each ad through selector
//! fallback chains, and persists unseen listings with a one-day expiry.
//! Rendering and storage sit behind the [`render::Renderer`] and
//! [`store::KeyValueStore`] traits.

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod listing;
pub mod render;
pub mod store;

pub use config::Config;
pub use engine::{CycleStats, Harvester, Scheduler, StopReason};
pub use error::{ExtractionError, FetchError, PersistError, StoreError};
pub use listing::Listing;
