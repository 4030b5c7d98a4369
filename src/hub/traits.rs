use crate::error::OverlayResult;
use crate::hub::types::{HubFilters, HubPage};
use crate::models::CanonicalProperty;
use async_trait::async_trait;

/// Read-only access to the system of record for property data.
/// Implementations must map outages to `OverlayError::SourceUnavailable`
/// rather than returning an empty page.
#[async_trait]
pub trait PropertySource: Send + Sync {
    /// Fetch one 1-based page of properties matching `filters`
    async fn fetch_page(
        &self,
        filters: &HubFilters,
        page: u32,
        page_size: u32,
    ) -> OverlayResult<HubPage>;

    /// Fetch a single property, `OverlayError::NotFound` if the hub has no such id
    async fn fetch_one(&self, id: &str) -> OverlayResult<CanonicalProperty>;

    /// Get the name of the property source
    fn source_name(&self) -> &'static str;
}
