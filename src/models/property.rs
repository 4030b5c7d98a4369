use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the property hub
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    Pending,
    Available,
    Reserved,
    UnderContract,
    Sold,
    Rented,
    UnderMaintenance,
    OffMarket,
    /// Anything the hub sends that we do not know about yet
    #[serde(other)]
    Unknown,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::UnderContract => "under_contract",
            Self::Sold => "sold",
            Self::Rented => "rented",
            Self::UnderMaintenance => "under_maintenance",
            Self::OffMarket => "off_market",
            Self::Unknown => "unknown",
        }
    }

    /// Sold or rented
    pub fn is_closed_deal(&self) -> bool {
        matches!(self, Self::Sold | Self::Rented)
    }
}

/// Thai/English text pair as served by the hub
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocalizedText {
    #[serde(default)]
    pub th: String,
    #[serde(default)]
    pub en: String,
}

impl LocalizedText {
    pub fn new(th: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            th: th.into(),
            en: en.into(),
        }
    }

    /// Case-insensitive substring match against either language.
    /// `needle` must already be lowercased.
    pub fn contains_lowercase(&self, needle: &str) -> bool {
        self.th.to_lowercase().contains(needle) || self.en.to_lowercase().contains(needle)
    }
}

/// Geolocation of a property
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Parent project (condominium, village, ...) a unit belongs to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectRef {
    pub id: String,
    #[serde(default)]
    pub name: LocalizedText,
}

/// Property record owned by the external hub. Read-only on our side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalProperty {
    pub id: String,
    pub property_type: String,
    pub listing_type: Option<String>,
    #[serde(default)]
    pub title: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub size_sqm: Option<f64>,
    pub rental_rate_num: Option<i64>,
    pub sell_price_num: Option<i64>,
    #[serde(default)]
    pub images: Vec<String>,
    pub location: Option<GeoPoint>,
    pub status: PropertyStatus,
    #[serde(default)]
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub project: Option<ProjectRef>,
    pub agent_code: Option<String>,
}

impl CanonicalProperty {
    /// Listed for rent
    pub fn has_rental_price(&self) -> bool {
        self.rental_rate_num.is_some()
    }

    /// Listed for sale
    pub fn has_sale_price(&self) -> bool {
        self.sell_price_num.is_some()
    }

    /// Neither price is published; consumers render "contact us"
    pub fn is_price_on_request(&self) -> bool {
        !self.has_rental_price() && !self.has_sale_price()
    }

    /// Matches title (both languages), agent code, and project name.
    /// `needle` must already be lowercased.
    pub fn matches_text(&self, needle: &str) -> bool {
        if self.title.contains_lowercase(needle) {
            return true;
        }
        if let Some(code) = &self.agent_code {
            if code.to_lowercase().contains(needle) {
                return true;
            }
        }
        self.project
            .as_ref()
            .map(|p| p.name.contains_lowercase(needle))
            .unwrap_or(false)
    }

    /// True when either published price falls inside `[min, max]`.
    /// Missing bounds are open.
    pub fn price_in_range(&self, min: Option<i64>, max: Option<i64>) -> bool {
        if min.is_none() && max.is_none() {
            return true;
        }
        let fits = |price: i64| {
            min.map_or(true, |lo| price >= lo) && max.map_or(true, |hi| price <= hi)
        };
        self.rental_rate_num.map_or(false, fits) || self.sell_price_num.map_or(false, fits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property(rent: Option<i64>, sale: Option<i64>) -> CanonicalProperty {
        serde_json::from_value(serde_json::json!({
            "id": "P-1",
            "propertyType": "condo",
            "title": { "th": "คอนโด สุขุมวิท", "en": "Sukhumvit Condo" },
            "rentalRateNum": rent,
            "sellPriceNum": sale,
            "status": "available",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z",
            "agentCode": "AG-77",
            "project": { "id": "PRJ-1", "name": { "th": "", "en": "Noble Ploenchit" } }
        }))
        .unwrap()
    }

    #[test]
    fn test_unknown_status_does_not_fail_decoding() {
        let json = serde_json::json!({
            "id": "P-2",
            "propertyType": "house",
            "status": "demolished",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        });
        let p: CanonicalProperty = serde_json::from_value(json).unwrap();
        assert_eq!(p.status, PropertyStatus::Unknown);
        assert!(p.is_price_on_request());
        assert!(p.images.is_empty());
    }

    #[test]
    fn test_text_match_covers_title_agent_and_project() {
        let p = property(Some(25_000), None);
        assert!(p.matches_text("sukhumvit"));
        assert!(p.matches_text("สุขุมวิท"));
        assert!(p.matches_text("ag-77"));
        assert!(p.matches_text("noble"));
        assert!(!p.matches_text("silom"));
    }

    #[test]
    fn test_price_range_matches_either_price() {
        assert!(property(Some(25_000), None).price_in_range(Some(10_000), Some(30_000)));
        assert!(property(None, Some(28_000)).price_in_range(Some(10_000), Some(30_000)));
        assert!(!property(Some(35_000), None).price_in_range(Some(10_000), Some(30_000)));
        assert!(property(Some(35_000), None).price_in_range(Some(30_000), None));
        assert!(!property(None, None).price_in_range(None, Some(1)));
        assert!(property(None, None).price_in_range(None, None));
    }
}
