//! Builders shared by unit tests

use crate::error::{OverlayError, OverlayResult};
use crate::hub::{HubFilters, HubPage, PropertySource};
use crate::models::{
    CanonicalProperty, ComposedPropertyView, LocalizedText, ProjectRef, Promotion, PromotionType,
    PropertyExtension, PropertyStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

pub fn at_day(day: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day)
}

pub struct PropertyBuilder {
    property: CanonicalProperty,
}

impl PropertyBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            property: CanonicalProperty {
                id: id.to_string(),
                property_type: "condo".to_string(),
                listing_type: None,
                title: LocalizedText::new(format!("ห้อง {}", id), format!("Unit {}", id)),
                description: LocalizedText::default(),
                bedrooms: Some(1),
                bathrooms: Some(1),
                size_sqm: Some(35.0),
                rental_rate_num: Some(15_000),
                sell_price_num: None,
                images: Vec::new(),
                location: None,
                status: PropertyStatus::Available,
                view_count: 0,
                created_at: at_day(0),
                updated_at: at_day(0),
                project: None,
                agent_code: None,
            },
        }
    }

    pub fn property_type(mut self, value: &str) -> Self {
        self.property.property_type = value.to_string();
        self
    }

    pub fn title_en(mut self, value: &str) -> Self {
        self.property.title.en = value.to_string();
        self
    }

    pub fn project(mut self, name: &str) -> Self {
        self.property.project = Some(ProjectRef {
            id: format!("prj-{}", name.to_lowercase()),
            name: LocalizedText::new("", name),
        });
        self
    }

    pub fn agent(mut self, code: &str) -> Self {
        self.property.agent_code = Some(code.to_string());
        self
    }

    pub fn bedrooms(mut self, value: u32) -> Self {
        self.property.bedrooms = Some(value);
        self
    }

    pub fn prices(mut self, rent: Option<i64>, sale: Option<i64>) -> Self {
        self.property.rental_rate_num = rent;
        self.property.sell_price_num = sale;
        self
    }

    pub fn status(mut self, status: PropertyStatus) -> Self {
        self.property.status = status;
        self
    }

    pub fn views(mut self, count: u64) -> Self {
        self.property.view_count = count;
        self
    }

    pub fn created(mut self, day: i64) -> Self {
        self.property.created_at = at_day(day);
        self
    }

    pub fn updated(mut self, day: i64) -> Self {
        self.property.updated_at = at_day(day);
        self
    }

    pub fn build(self) -> CanonicalProperty {
        self.property
    }

    /// Composed with the zero-value overlay
    pub fn view(self) -> ComposedPropertyView {
        let overlay = PropertyExtension::default_for(self.property.id.clone());
        ComposedPropertyView {
            property: self.property,
            overlay,
        }
    }
}

pub fn promotion(id: &str, promotion_type: PromotionType, active: bool) -> Promotion {
    Promotion {
        id: id.to_string(),
        label: format!("Promo {}", id),
        promotion_type,
        is_active: active,
        discounted_price: None,
        discounted_rental_price: None,
    }
}

pub trait ViewExt {
    fn hidden(self) -> Self;
    fn popular(self) -> Self;
    fn priority(self, value: i64) -> Self;
    fn with_promotion(self, promotion: Promotion) -> Self;
}

impl ViewExt for ComposedPropertyView {
    fn hidden(mut self) -> Self {
        self.overlay.id = Some(format!("ext-{}", self.property.id));
        self.overlay.is_hidden = true;
        self
    }

    fn popular(mut self) -> Self {
        self.overlay.id = Some(format!("ext-{}", self.property.id));
        self.overlay.is_featured_popular = true;
        self
    }

    fn priority(mut self, value: i64) -> Self {
        self.overlay.id = Some(format!("ext-{}", self.property.id));
        self.overlay.priority = value;
        self
    }

    fn with_promotion(mut self, promotion: Promotion) -> Self {
        self.overlay.id = Some(format!("ext-{}", self.property.id));
        self.overlay.promotions.push(promotion);
        self
    }
}

/// Serves a scripted sequence of pages, then empty ones
pub struct ScriptedSource {
    pages: Mutex<Vec<OverlayResult<HubPage>>>,
}

impl ScriptedSource {
    pub fn new(pages: Vec<OverlayResult<HubPage>>) -> Self {
        Self {
            pages: Mutex::new(pages),
        }
    }
}

pub fn hub_page(records: Vec<CanonicalProperty>, total: u64) -> OverlayResult<HubPage> {
    Ok(HubPage { records, total })
}

#[async_trait]
impl PropertySource for ScriptedSource {
    async fn fetch_page(&self, _: &HubFilters, _: u32, _: u32) -> OverlayResult<HubPage> {
        let mut pages = self.pages.lock();
        if pages.is_empty() {
            Ok(HubPage::default())
        } else {
            pages.remove(0)
        }
    }

    async fn fetch_one(&self, id: &str) -> OverlayResult<CanonicalProperty> {
        Err(OverlayError::NotFound(id.to_string()))
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}
