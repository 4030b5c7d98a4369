use crate::models::CanonicalProperty;
use serde::{Deserialize, Serialize};

/// Bedroom filter value that means "this many or more"
pub const BEDROOMS_OR_MORE: u32 = 4;

/// Which published price a listing must carry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Rent,
    Sale,
}

impl ListingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rent => "rent",
            Self::Sale => "sale",
        }
    }
}

/// Filter vocabulary understood by the property hub
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HubFilters {
    /// Property type, e.g. "condo", "house"
    pub property_type: Option<String>,
    /// Rent: rental price present. Sale: sale price present.
    pub listing_type: Option<ListingKind>,
    /// Exact bedroom count, `BEDROOMS_OR_MORE` and above means "at least"
    pub bedrooms: Option<u32>,
    /// Lower bound against rental or sale price
    pub min_price: Option<i64>,
    /// Upper bound against rental or sale price
    pub max_price: Option<i64>,
}

impl HubFilters {
    /// Query-string pairs sent to the hub, verbatim
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(property_type) = &self.property_type {
            query.push(("propertyType", property_type.clone()));
        }
        if let Some(listing) = self.listing_type {
            query.push(("listingType", listing.as_str().to_string()));
        }
        if let Some(bedrooms) = self.bedrooms {
            query.push(("bedrooms", bedrooms.to_string()));
        }
        if let Some(min) = self.min_price {
            query.push(("minPrice", min.to_string()));
        }
        if let Some(max) = self.max_price {
            query.push(("maxPrice", max.to_string()));
        }
        query
    }

    /// Local evaluation of the same vocabulary
    pub fn matches(&self, property: &CanonicalProperty) -> bool {
        if let Some(wanted) = &self.property_type {
            if !property.property_type.eq_ignore_ascii_case(wanted) {
                return false;
            }
        }
        match self.listing_type {
            Some(ListingKind::Rent) if !property.has_rental_price() => return false,
            Some(ListingKind::Sale) if !property.has_sale_price() => return false,
            _ => {}
        }
        if let Some(wanted) = self.bedrooms {
            let ok = match property.bedrooms {
                Some(actual) if wanted >= BEDROOMS_OR_MORE => actual >= BEDROOMS_OR_MORE,
                Some(actual) => actual == wanted,
                None => false,
            };
            if !ok {
                return false;
            }
        }
        property.price_in_range(self.min_price, self.max_price)
    }
}

/// One page of hub results
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HubPage {
    #[serde(rename = "data")]
    pub records: Vec<CanonicalProperty>,
    /// Total matching records across all pages
    pub total: u64,
}
