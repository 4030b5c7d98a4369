use super::{CanonicalProperty, PropertyExtension};
use serde::{Deserialize, Serialize};

/// Per-request join of a canonical property with its overlay. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComposedPropertyView {
    #[serde(flatten)]
    pub property: CanonicalProperty,
    pub overlay: PropertyExtension,
}

impl ComposedPropertyView {
    /// Hub id, also the overlay join key
    pub fn id(&self) -> &str {
        &self.property.id
    }

    /// Suppressed from public views
    pub fn is_hidden(&self) -> bool {
        self.overlay.is_hidden
    }

    /// Manually placed in the popular rail
    pub fn is_popular(&self) -> bool {
        self.overlay.is_featured_popular
    }

    /// Carries at least one active promotion
    pub fn has_active_promotion(&self) -> bool {
        self.overlay.has_active_promotion()
    }

    /// Sold or rented
    pub fn is_closed_deal(&self) -> bool {
        self.property.status.is_closed_deal()
    }

    /// Strip admin-only fields before handing the view to public consumers
    pub fn public(mut self) -> Self {
        self.overlay.internal_notes = None;
        self.overlay.orphaned_at = None;
        self
    }
}
