//! Property extension overlay and composition engine.
//!
//! Property records come from an external hub that owns price, physical
//! attributes and status. This crate overlays them with locally owned
//! marketing metadata (visibility, popular flag, promotions, tags) and serves
//! filtered, paginated and aggregated views of the joined records.
//!
//! ```rust,ignore
//! let store = Arc::new(SqliteExtensionStore::new(SqlitePool::new(config.store.clone())?));
//! let source = Arc::new(HubClient::new(&config.hub)?);
//! let catalog = Catalog::from_config(source, store, &config.hub);
//!
//! let page = query::search(&catalog, &criteria, Scope::Public, PageRequest::default()).await?;
//! ```

pub mod catalog;
pub mod compose;
pub mod config;
pub mod error;
pub mod hub;
pub mod models;
pub mod promotions;
pub mod query;
pub mod reconcile;
pub mod stats;
pub mod store;

#[cfg(test)]
mod fixtures;

pub use catalog::{Catalog, Scope};
pub use config::AppConfig;
pub use error::{OverlayError, OverlayResult};
pub use promotions::PromotionManager;
pub use query::{search, PageRequest, SearchCriteria, SearchPage, SortOrder};
