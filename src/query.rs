//! Search over composed property views.
//!
//! Canonical filters are pushed down to the source where its semantics match
//! ours (type, listing, bedrooms) and re-checked locally. Price range and all
//! overlay filters run locally after composition. `total` always counts the
//! filtered set.

use crate::catalog::{Catalog, Scope};
use crate::error::{OverlayError, OverlayResult};
use crate::hub::{HubFilters, ListingKind};
use crate::models::ComposedPropertyView;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Result ordering. Every order ends with the default tie-break.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// `updatedAt` descending, then id ascending
    #[default]
    RecentlyUpdated,
    /// Overlay priority descending
    Priority,
    /// View counter descending
    MostViewed,
}

/// Search criteria shared by storefront and back office
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    /// Case-insensitive substring over title, agent code, and project name
    pub text: Option<String>,
    pub property_type: Option<String>,
    pub listing_type: Option<ListingKind>,
    /// `4` means four or more
    pub bedrooms: Option<u32>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    /// Manually featured only
    pub popular: bool,
    /// At least one active promotion
    pub has_promotions: bool,
    /// Sold or rented
    pub closed_deal: bool,
    /// Hidden properties only. Ignored for the public scope.
    pub hidden: bool,
    /// Carries a tag with this name (case-insensitive)
    pub tag: Option<String>,
    pub sort: SortOrder,
}

impl SearchCriteria {
    /// The part of the criteria the source can evaluate for us
    pub fn source_filters(&self) -> HubFilters {
        HubFilters {
            property_type: self.property_type.clone(),
            listing_type: self.listing_type,
            bedrooms: self.bedrooms,
            // OR-of-prices semantics are ours, not the hub's
            min_price: None,
            max_price: None,
        }
    }

    fn canonical_filters(&self) -> HubFilters {
        HubFilters {
            min_price: self.min_price,
            max_price: self.max_price,
            ..self.source_filters()
        }
    }

    /// Rejects an inverted price range
    pub fn validate(&self) -> OverlayResult<()> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(OverlayError::Validation(format!(
                    "min price {} exceeds max price {}",
                    min, max
                )));
            }
        }
        Ok(())
    }

    /// Full predicate for one composed view under `scope`
    pub fn matches(&self, view: &ComposedPropertyView, scope: Scope) -> bool {
        let visible = if self.hidden && !scope.is_public() {
            view.is_hidden()
        } else {
            scope.admits(view)
        };
        if !visible {
            return false;
        }

        if !self.canonical_filters().matches(&view.property) {
            return false;
        }
        if let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            if !view.property.matches_text(&text.to_lowercase()) {
                return false;
            }
        }
        if let Some(tag) = self.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            if !view.overlay.tags.iter().any(|t| t.name.eq_ignore_ascii_case(tag)) {
                return false;
            }
        }

        (!self.popular || view.is_popular())
            && (!self.has_promotions || view.has_active_promotion())
            && (!self.closed_deal || view.is_closed_deal())
    }
}

/// Offset pagination, 1-based. Always clamped, including when deserialized.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", from = "RawPageRequest")]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

/// Wire shape of a page request before clamping
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPageRequest {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    page_size: u32,
}

impl From<RawPageRequest> for PageRequest {
    fn from(raw: RawPageRequest) -> Self {
        Self::new(raw.page, raw.page_size)
    }
}

impl PageRequest {
    /// Page 0 becomes 1; sizes are clamped to `1..=MAX_PAGE_SIZE`
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn offset(&self) -> usize {
        (self.page as usize).saturating_sub(1) * self.page_size as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub items: Vec<ComposedPropertyView>,
    /// Size of the filtered set
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

/// Default ordering: most recently updated first, id ascending on ties
pub fn by_recently_updated(a: &ComposedPropertyView, b: &ComposedPropertyView) -> Ordering {
    b.property
        .updated_at
        .cmp(&a.property.updated_at)
        .then_with(|| a.id().cmp(b.id()))
}

fn compare(sort: SortOrder, a: &ComposedPropertyView, b: &ComposedPropertyView) -> Ordering {
    let primary = match sort {
        SortOrder::RecentlyUpdated => Ordering::Equal,
        SortOrder::Priority => b.overlay.priority.cmp(&a.overlay.priority),
        SortOrder::MostViewed => b.property.view_count.cmp(&a.property.view_count),
    };
    primary.then_with(|| by_recently_updated(a, b))
}

/// Filter, sort and page an already composed set. Pure.
pub fn filter_views(
    views: Vec<ComposedPropertyView>,
    criteria: &SearchCriteria,
    scope: Scope,
    page: PageRequest,
) -> SearchPage {
    let mut matching: Vec<ComposedPropertyView> = views
        .into_iter()
        .filter(|v| criteria.matches(v, scope))
        .collect();
    matching.sort_by(|a, b| compare(criteria.sort, a, b));

    let total = matching.len();
    let total_pages = total.div_ceil(page.page_size.max(1) as usize) as u32;
    let items = matching
        .into_iter()
        .skip(page.offset())
        .take(page.page_size as usize)
        .map(|v| scope.present(v))
        .collect();

    SearchPage {
        items,
        total,
        page: page.page,
        page_size: page.page_size,
        total_pages,
    }
}

/// Entry point for every listing query. `scope` is mandatory so no caller can
/// forget the hidden-by-default rule.
pub async fn search(
    catalog: &Catalog,
    criteria: &SearchCriteria,
    scope: Scope,
    page: PageRequest,
) -> OverlayResult<SearchPage> {
    criteria.validate()?;

    let candidates = catalog.collect(&criteria.source_filters()).await?;
    let candidate_count = candidates.len();
    let result = filter_views(candidates, criteria, scope, page);

    debug!(
        "Search matched {} of {} candidates, returning page {} ({} items)",
        result.total,
        candidate_count,
        result.page,
        result.items.len()
    );
    Ok(result)
}
