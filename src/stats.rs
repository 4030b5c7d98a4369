//! Dashboard counters, rankings and breakdowns over a composed set.
//!
//! Everything here is pure. The caller decides which views are in the set;
//! hidden properties only show up when the caller asked for them.

use crate::models::{ComposedPropertyView, Promotion, PropertyStatus};
use crate::query::by_recently_updated;
use serde::Serialize;
use std::collections::BTreeMap;

/// Dashboard status buckets derived from the hub's richer status list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBucket {
    Active,
    Inactive,
    Sold,
    Rented,
}

impl From<PropertyStatus> for StatusBucket {
    fn from(status: PropertyStatus) -> Self {
        match status {
            PropertyStatus::Available | PropertyStatus::Reserved | PropertyStatus::UnderContract => {
                Self::Active
            }
            PropertyStatus::Sold => Self::Sold,
            PropertyStatus::Rented => Self::Rented,
            PropertyStatus::Pending
            | PropertyStatus::UnderMaintenance
            | PropertyStatus::OffMarket
            | PropertyStatus::Unknown => Self::Inactive,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub active: usize,
    pub inactive: usize,
    pub sold: usize,
    pub rented: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: usize,
    pub by_status: StatusCounts,
    pub by_property_type: BTreeMap<String, usize>,
    pub by_bedrooms: BTreeMap<String, usize>,
    /// Has a rental price; a property with both prices counts here and in `for_sale`
    pub for_rent: usize,
    pub for_sale: usize,
    pub price_on_request: usize,
    pub featured: usize,
    pub hidden: usize,
    pub with_promotions: usize,
    pub total_views: u64,
}

fn bedroom_bucket(bedrooms: Option<u32>) -> &'static str {
    match bedrooms {
        None => "unknown",
        Some(0) => "studio",
        Some(1) => "1",
        Some(2) => "2",
        Some(3) => "3",
        Some(_) => "4+",
    }
}

/// Counters over a composed set. Callers decide whether hidden views are in it.
pub fn dashboard_stats(views: &[ComposedPropertyView]) -> DashboardStats {
    let mut stats = DashboardStats {
        total: views.len(),
        ..Default::default()
    };

    for view in views {
        let property = &view.property;
        match StatusBucket::from(property.status) {
            StatusBucket::Active => stats.by_status.active += 1,
            StatusBucket::Inactive => stats.by_status.inactive += 1,
            StatusBucket::Sold => stats.by_status.sold += 1,
            StatusBucket::Rented => stats.by_status.rented += 1,
        }
        *stats
            .by_property_type
            .entry(property.property_type.to_lowercase())
            .or_default() += 1;
        *stats
            .by_bedrooms
            .entry(bedroom_bucket(property.bedrooms).to_string())
            .or_default() += 1;

        if property.has_rental_price() {
            stats.for_rent += 1;
        }
        if property.has_sale_price() {
            stats.for_sale += 1;
        }
        if property.is_price_on_request() {
            stats.price_on_request += 1;
        }
        if view.is_popular() {
            stats.featured += 1;
        }
        if view.is_hidden() {
            stats.hidden += 1;
        }
        if view.has_active_promotion() {
            stats.with_promotions += 1;
        }
        stats.total_views += property.view_count;
    }

    stats
}

/// Newest listings by hub creation time
pub fn recent(views: &[ComposedPropertyView], n: usize) -> Vec<&ComposedPropertyView> {
    let mut ranked: Vec<_> = views.iter().collect();
    ranked.sort_by(|a, b| {
        b.property
            .created_at
            .cmp(&a.property.created_at)
            .then_with(|| a.id().cmp(b.id()))
    });
    ranked.truncate(n);
    ranked
}

fn by_views(a: &&ComposedPropertyView, b: &&ComposedPropertyView) -> std::cmp::Ordering {
    b.property
        .view_count
        .cmp(&a.property.view_count)
        .then_with(|| a.id().cmp(b.id()))
}

/// Highest view counters, ties broken by id
pub fn top_viewed(views: &[ComposedPropertyView], n: usize) -> Vec<&ComposedPropertyView> {
    let mut ranked: Vec<_> = views.iter().collect();
    ranked.sort_by(by_views);
    ranked.truncate(n);
    ranked
}

/// Manually featured properties first (priority, then views), topped up with
/// the most viewed of the rest until `n` are filled or the set runs out.
pub fn popular(views: &[ComposedPropertyView], n: usize) -> Vec<&ComposedPropertyView> {
    let mut featured: Vec<_> = views.iter().filter(|v| v.is_popular()).collect();
    featured.sort_by(|a, b| {
        b.overlay
            .priority
            .cmp(&a.overlay.priority)
            .then_with(|| by_views(a, b))
    });
    featured.truncate(n);

    if featured.len() < n {
        // every flagged view is already in, backfill from the unflagged ones
        let mut rest: Vec<_> = views.iter().filter(|v| !v.is_popular()).collect();
        rest.sort_by(by_views);
        let missing = n - featured.len();
        featured.extend(rest.into_iter().take(missing));
    }

    featured
}

/// Sold or rented, most recently updated first
pub fn closed_deals(views: &[ComposedPropertyView], n: usize) -> Vec<&ComposedPropertyView> {
    let mut deals: Vec<_> = views.iter().filter(|v| v.is_closed_deal()).collect();
    deals.sort_by(|a, b| by_recently_updated(a, b));
    deals.truncate(n);
    deals
}

/// Original and shown price for one price kind
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PriceDisplay {
    pub original: i64,
    pub display: i64,
}

impl PriceDisplay {
    /// Render the original struck through
    pub fn is_discounted(&self) -> bool {
        self.display != self.original
    }
}

/// A promoted property with the price to show for it
#[derive(Debug, Clone, Serialize)]
pub struct PromotedView<'a> {
    pub view: &'a ComposedPropertyView,
    /// First active promotion, the one that is displayed
    pub promotion: &'a Promotion,
    pub rental: Option<PriceDisplay>,
    pub sale: Option<PriceDisplay>,
}

impl<'a> PromotedView<'a> {
    fn new(view: &'a ComposedPropertyView, promotion: &'a Promotion) -> Self {
        let discount = promotion.is_discount();
        let price = |original: Option<i64>, discounted: Option<i64>| {
            original.map(|original| PriceDisplay {
                original,
                display: discounted.filter(|_| discount).unwrap_or(original),
            })
        };

        Self {
            view,
            promotion,
            rental: price(
                view.property.rental_rate_num,
                promotion.discounted_rental_price,
            ),
            sale: price(view.property.sell_price_num, promotion.discounted_price),
        }
    }
}

/// Properties with at least one active promotion, by priority then recency
pub fn with_promotions(views: &[ComposedPropertyView], n: usize) -> Vec<PromotedView<'_>> {
    let mut promoted: Vec<_> = views.iter().filter(|v| v.has_active_promotion()).collect();
    promoted.sort_by(|a, b| {
        b.overlay
            .priority
            .cmp(&a.overlay.priority)
            .then_with(|| by_recently_updated(a, b))
    });

    promoted
        .into_iter()
        .take(n)
        .filter_map(|view| {
            view.overlay
                .first_active_promotion()
                .map(|promotion| PromotedView::new(view, promotion))
        })
        .collect()
}

/// Everything the dashboard renders, computed from one composed set
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport<'a> {
    pub stats: DashboardStats,
    pub recent: Vec<&'a ComposedPropertyView>,
    pub top_viewed: Vec<&'a ComposedPropertyView>,
    pub popular: Vec<&'a ComposedPropertyView>,
    pub closed_deals: Vec<&'a ComposedPropertyView>,
    pub promoted: Vec<PromotedView<'a>>,
}

/// Counters plus every ranking, `n` items each
pub fn dashboard_report(views: &[ComposedPropertyView], n: usize) -> DashboardReport<'_> {
    DashboardReport {
        stats: dashboard_stats(views),
        recent: recent(views, n),
        top_viewed: top_viewed(views, n),
        popular: popular(views, n),
        closed_deals: closed_deals(views, n),
        promoted: with_promotions(views, n),
    }
}
