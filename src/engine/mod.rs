//! Harvest engine: page validation, fetching, pagination and scheduling.

pub mod controller;
pub mod fetcher;
pub mod loader;
pub mod pages;
pub mod persist;
pub mod retry;
pub mod scheduler;
pub mod validator;

pub use controller::{CycleLimits, CycleStats, Harvester, StopReason};
pub use fetcher::ListingFetcher;
pub use loader::{LoadedPage, PageLoader};
pub use pages::PageUrls;
pub use persist::{ListingPersister, SaveOutcome, LISTING_TTL};
pub use retry::RetryPolicy;
pub use scheduler::{Scheduler, SchedulerReport};
pub use validator::{PageCheck, PageValidator, DEFAULT_MIN_LISTINGS};
