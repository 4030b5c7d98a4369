pub mod client;
pub mod snapshot;
pub mod traits;
pub mod types;

pub use client::HubClient;
pub use snapshot::SnapshotSource;
pub use traits::PropertySource;
pub use types::{HubFilters, HubPage, ListingKind, BEDROOMS_OR_MORE};
