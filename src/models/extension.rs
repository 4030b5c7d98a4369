use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of marketing callout attached to a property
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PromotionType {
    Hot,
    New,
    Discount,
    Special,
    Limited,
    Featured,
    /// Stored value we no longer recognise; rendered with the default badge
    #[serde(other)]
    Unknown,
}

impl PromotionType {
    /// Types accepted on write
    pub const RECOGNIZED: [PromotionType; 6] = [
        Self::Hot,
        Self::New,
        Self::Discount,
        Self::Special,
        Self::Limited,
        Self::Featured,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::New => "new",
            Self::Discount => "discount",
            Self::Special => "special",
            Self::Limited => "limited",
            Self::Featured => "featured",
            Self::Unknown => "unknown",
        }
    }

    /// Read path: never fails, falls back to `Unknown`
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or(Self::Unknown)
    }

    /// Badge colour for storefront rendering
    pub fn badge_color(&self) -> &'static str {
        match self {
            Self::Hot => "#e53935",
            Self::New => "#43a047",
            Self::Discount => "#fb8c00",
            Self::Special => "#8e24aa",
            Self::Limited => "#3949ab",
            Self::Featured => "#fdd835",
            Self::Unknown => "#757575",
        }
    }
}

impl fmt::Display for PromotionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse used when accepting input
impl FromStr for PromotionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::RECOGNIZED
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unrecognized promotion type '{}'", s))
    }
}

/// Promotion owned by exactly one extension
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub promotion_type: PromotionType,
    pub is_active: bool,
    pub discounted_price: Option<i64>,
    pub discounted_rental_price: Option<i64>,
}

impl Promotion {
    /// Only discounts change the displayed price
    pub fn is_discount(&self) -> bool {
        self.promotion_type == PromotionType::Discount
    }
}

/// Reusable label attached to an extension
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyTag {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
}

/// Locally owned marketing overlay for one canonical property
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertyExtension {
    /// `None` for the synthesized default of a property that has no stored overlay
    pub id: Option<String>,
    pub external_property_id: String,
    pub priority: i64,
    pub internal_notes: Option<String>,
    pub is_hidden: bool,
    pub is_featured_popular: bool,
    pub promotions: Vec<Promotion>,
    pub tags: Vec<PropertyTag>,
    /// Set by reconciliation when the hub no longer serves the property
    pub orphaned_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PropertyExtension {
    /// Zero-value overlay used when nothing is stored for `external_property_id`
    pub fn default_for(external_property_id: impl Into<String>) -> Self {
        Self {
            id: None,
            external_property_id: external_property_id.into(),
            priority: 0,
            internal_notes: None,
            is_hidden: false,
            is_featured_popular: false,
            promotions: Vec::new(),
            tags: Vec::new(),
            orphaned_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// False for the zero-value overlay of a property nobody has touched
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Active promotions in list order
    pub fn active_promotions(&self) -> impl Iterator<Item = &Promotion> {
        self.promotions.iter().filter(|p| p.is_active)
    }

    /// The promotion shown on cards
    pub fn first_active_promotion(&self) -> Option<&Promotion> {
        self.active_promotions().next()
    }

    /// At least one promotion is switched on
    pub fn has_active_promotion(&self) -> bool {
        self.first_active_promotion().is_some()
    }
}

/// Partial update for the overlay flags. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlagPatch {
    pub is_hidden: Option<bool>,
    pub is_featured_popular: Option<bool>,
    /// An empty string clears the notes
    pub internal_notes: Option<String>,
    pub priority: Option<i64>,
}

impl FlagPatch {
    /// Nothing to change
    pub fn is_empty(&self) -> bool {
        self.is_hidden.is_none()
            && self.is_featured_popular.is_none()
            && self.internal_notes.is_none()
            && self.priority.is_none()
    }
}

/// Input for adding a promotion. `promotion_type` is validated by the manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPromotion {
    pub label: String,
    #[serde(rename = "type")]
    pub promotion_type: String,
    pub discounted_price: Option<i64>,
    pub discounted_rental_price: Option<i64>,
}
