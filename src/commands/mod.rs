//! CLI command implementations.

pub mod harvest;
pub mod inspect;
pub mod store;

pub use harvest::HarvestCommand;
pub use inspect::InspectCommand;
pub use store::StoreCommand;
