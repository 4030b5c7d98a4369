//! Local persistence for property overlays.
//!
//! Exactly zero or one extension exists per external property id. Every
//! write path creates the extension on demand through an upsert keyed on
//! that id, so callers never provision overlays up front.

pub mod connection;
pub mod schema;
pub mod sqlite;

pub use connection::SqlitePool;
pub use sqlite::SqliteExtensionStore;

use crate::error::OverlayResult;
use crate::models::{FlagPatch, PromotionType, PropertyExtension};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Validated promotion ready to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct PromotionDraft {
    pub label: String,
    pub promotion_type: PromotionType,
    pub discounted_price: Option<i64>,
    pub discounted_rental_price: Option<i64>,
}

/// Overlay persistence.
///
/// Promotion and tag list mutations are last-write-wins at list level.
#[async_trait]
pub trait ExtensionStore: Send + Sync {
    async fn get(&self, external_id: &str) -> OverlayResult<Option<PropertyExtension>>;

    /// Bulk lookup; ids without an extension are simply absent from the map
    async fn get_many(
        &self,
        external_ids: &HashSet<String>,
    ) -> OverlayResult<HashMap<String, PropertyExtension>>;

    /// Create-if-absent, returns the stored extension either way
    async fn ensure(&self, external_id: &str) -> OverlayResult<PropertyExtension>;

    /// Atomic create-or-patch of the overlay flags
    async fn upsert_flags(
        &self,
        external_id: &str,
        patch: &FlagPatch,
    ) -> OverlayResult<PropertyExtension>;

    /// Append a promotion, creating the extension if needed
    async fn insert_promotion(
        &self,
        external_id: &str,
        draft: &PromotionDraft,
    ) -> OverlayResult<PropertyExtension>;

    /// `NotFound` unless `promotion_id` belongs to the extension of `external_id`
    async fn delete_promotion(
        &self,
        external_id: &str,
        promotion_id: &str,
    ) -> OverlayResult<PropertyExtension>;

    async fn set_promotion_active(
        &self,
        external_id: &str,
        promotion_id: &str,
        active: bool,
    ) -> OverlayResult<PropertyExtension>;

    /// Attach a tag; an existing tag with the same name (case-insensitive) is updated
    async fn upsert_tag(
        &self,
        external_id: &str,
        name: &str,
        color: Option<&str>,
    ) -> OverlayResult<PropertyExtension>;

    async fn delete_tag(&self, external_id: &str, tag_id: &str)
        -> OverlayResult<PropertyExtension>;

    async fn list_external_ids(&self) -> OverlayResult<Vec<String>>;

    /// Flag extensions whose property left the hub. Returns how many were newly marked.
    async fn mark_orphans(&self, external_ids: &[String], at: DateTime<Utc>)
        -> OverlayResult<usize>;

    /// Clear the orphan flag. Returns how many were cleared.
    async fn clear_orphans(&self, external_ids: &[String]) -> OverlayResult<usize>;
}
