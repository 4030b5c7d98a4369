use crate::error::{OverlayError, OverlayResult};
use crate::hub::traits::PropertySource;
use crate::hub::types::{HubFilters, HubPage};
use crate::models::CanonicalProperty;
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

/// Property source backed by a JSON dump of hub records.
/// Applies the hub filter vocabulary locally and paginates in input order.
pub struct SnapshotSource {
    records: Vec<CanonicalProperty>,
}

impl SnapshotSource {
    pub fn new(records: Vec<CanonicalProperty>) -> Self {
        Self { records }
    }

    /// Load a JSON array of canonical properties
    pub async fn from_file(path: &Path) -> OverlayResult<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            OverlayError::SourceUnavailable(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let records: Vec<CanonicalProperty> = serde_json::from_str(&raw).map_err(|e| {
            OverlayError::SourceUnavailable(format!("Invalid snapshot {}: {}", path.display(), e))
        })?;

        info!("📂 Loaded {} properties from {}", records.len(), path.display());
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PropertySource for SnapshotSource {
    async fn fetch_page(
        &self,
        filters: &HubFilters,
        page: u32,
        page_size: u32,
    ) -> OverlayResult<HubPage> {
        let matching: Vec<&CanonicalProperty> =
            self.records.iter().filter(|p| filters.matches(p)).collect();

        let page_size = page_size.max(1) as usize;
        let offset = (page.max(1) as usize - 1).saturating_mul(page_size);

        Ok(HubPage {
            total: matching.len() as u64,
            records: matching
                .into_iter()
                .skip(offset)
                .take(page_size)
                .cloned()
                .collect(),
        })
    }

    async fn fetch_one(&self, id: &str) -> OverlayResult<CanonicalProperty> {
        self.records
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| OverlayError::NotFound(format!("property {}", id)))
    }

    fn source_name(&self) -> &'static str {
        "snapshot"
    }
}
