//! Candidate collection: pull canonical pages, pull overlays, compose.

use crate::compose::{compose, compose_one};
use crate::config::HubConfig;
use crate::error::{OverlayError, OverlayResult};
use crate::hub::{HubFilters, PropertySource};
use crate::models::{CanonicalProperty, ComposedPropertyView};
use crate::store::ExtensionStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Who is asking. Decides whether hidden properties and admin-only
/// fields may appear in a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Storefront: hidden properties never appear, internal notes stripped
    Public,
    /// Back office: hidden properties only when asked for
    Admin { include_hidden: bool },
}

impl Scope {
    /// Back office, hidden properties excluded
    pub fn admin() -> Self {
        Self::Admin {
            include_hidden: false,
        }
    }

    /// Back office, hidden properties included
    pub fn admin_all() -> Self {
        Self::Admin {
            include_hidden: true,
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Self::Public)
    }

    /// Default visibility rule when no explicit hidden filter applies
    pub fn admits(&self, view: &ComposedPropertyView) -> bool {
        match self {
            Self::Public | Self::Admin { include_hidden: false } => !view.is_hidden(),
            Self::Admin { include_hidden: true } => true,
        }
    }

    /// Shape a view for this audience
    pub fn present(&self, view: ComposedPropertyView) -> ComposedPropertyView {
        if self.is_public() {
            view.public()
        } else {
            view
        }
    }
}

/// Canonical records drained from the source
#[derive(Debug, Clone, Default)]
pub struct Collected {
    pub records: Vec<CanonicalProperty>,
    /// `max_pages` was hit before the source reported the end
    pub truncated: bool,
    /// Records skipped because an earlier page already carried their id
    pub duplicates: usize,
    /// The source changed between pages (moving `total` or repeated ids), so
    /// records may have slid past us unseen
    pub drifted: bool,
}

impl Collected {
    /// Every record the source holds was seen. Only then does absence from
    /// `records` prove absence from the source.
    pub fn is_complete(&self) -> bool {
        !self.truncated && !self.drifted
    }
}

/// Read side of the overlay engine: every query path goes through here
#[derive(Clone)]
pub struct Catalog {
    source: Arc<dyn PropertySource>,
    store: Arc<dyn ExtensionStore>,
    page_size: u32,
    max_pages: u32,
}

impl Catalog {
    pub fn new(
        source: Arc<dyn PropertySource>,
        store: Arc<dyn ExtensionStore>,
        page_size: u32,
        max_pages: u32,
    ) -> Self {
        Self {
            source,
            store,
            page_size: page_size.max(1),
            max_pages: max_pages.max(1),
        }
    }

    /// Paging limits taken from `[hub]`
    pub fn from_config(
        source: Arc<dyn PropertySource>,
        store: Arc<dyn ExtensionStore>,
        config: &HubConfig,
    ) -> Self {
        Self::new(source, store, config.page_size, config.max_pages)
    }

    pub fn store(&self) -> &Arc<dyn ExtensionStore> {
        &self.store
    }

    /// Drain the source for `filters`. The hub paginates independently of our
    /// overlay filters, so counting a filtered set needs every candidate.
    pub async fn collect_canonical(&self, filters: &HubFilters) -> OverlayResult<Collected> {
        let mut collected = Collected::default();
        let mut seen = HashSet::new();
        let mut received: u64 = 0;
        let mut first_total = None;
        let mut page = 1;

        loop {
            let batch = self.source.fetch_page(filters, page, self.page_size).await?;
            match first_total {
                None => first_total = Some(batch.total),
                Some(total) if total != batch.total => {
                    debug!(
                        "Source total moved from {} to {} on page {}",
                        total, batch.total, page
                    );
                    collected.drifted = true;
                }
                Some(_) => {}
            }
            if batch.records.is_empty() {
                break;
            }
            received += batch.records.len() as u64;

            for record in batch.records {
                if seen.insert(record.id.clone()) {
                    collected.records.push(record);
                } else {
                    collected.duplicates += 1;
                }
            }

            if received >= batch.total {
                break;
            }
            if page >= self.max_pages {
                warn!(
                    "Stopped after {} pages ({} of {} records) from {}",
                    page,
                    received,
                    batch.total,
                    self.source.source_name()
                );
                collected.truncated = true;
                break;
            }
            page += 1;
        }

        if collected.duplicates > 0 {
            collected.drifted = true;
            warn!(
                "{} duplicate ids skipped while paging; source changed mid-scan",
                collected.duplicates
            );
        }
        debug!(
            "Collected {} canonical records from {}",
            collected.records.len(),
            self.source.source_name()
        );
        Ok(collected)
    }

    /// Every candidate for `filters`, composed with its overlay. Hidden
    /// properties are included; callers apply their scope.
    pub async fn collect(&self, filters: &HubFilters) -> OverlayResult<Vec<ComposedPropertyView>> {
        let collected = self.collect_canonical(filters).await?;
        let ids: HashSet<String> = collected.records.iter().map(|p| p.id.clone()).collect();
        let extensions = self.store.get_many(&ids).await?;

        Ok(compose(collected.records, &extensions))
    }

    /// The whole composed set as seen by `scope`
    pub async fn composed_set(&self, scope: Scope) -> OverlayResult<Vec<ComposedPropertyView>> {
        let views = self.collect(&HubFilters::default()).await?;
        let total = views.len();
        let visible: Vec<_> = views
            .into_iter()
            .filter(|v| scope.admits(v))
            .map(|v| scope.present(v))
            .collect();

        info!("Composed set: {} of {} properties visible to {:?}", visible.len(), total, scope);
        Ok(visible)
    }

    /// One composed property. Hidden ones are `NotFound` unless the scope admits them.
    pub async fn get(&self, id: &str, scope: Scope) -> OverlayResult<ComposedPropertyView> {
        let property = self.source.fetch_one(id).await?;
        let extension = self.store.get(id).await?;
        let view = compose_one(property, extension);

        if !scope.admits(&view) {
            return Err(OverlayError::NotFound(format!("property {}", id)));
        }
        Ok(scope.present(view))
    }
}
