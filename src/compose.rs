//! Joins canonical records with their overlays.

use crate::models::{CanonicalProperty, ComposedPropertyView, PropertyExtension};
use std::collections::HashMap;

/// Zip canonical records with overlays keyed by external property id.
///
/// Output order and length match `canonical`. Records without an overlay get
/// `PropertyExtension::default_for`. No I/O.
pub fn compose(
    canonical: Vec<CanonicalProperty>,
    extensions: &HashMap<String, PropertyExtension>,
) -> Vec<ComposedPropertyView> {
    canonical
        .into_iter()
        .map(|property| {
            let overlay = extensions
                .get(&property.id)
                .cloned()
                .unwrap_or_else(|| PropertyExtension::default_for(property.id.clone()));
            ComposedPropertyView { property, overlay }
        })
        .collect()
}

/// Single-record variant of [`compose`]
pub fn compose_one(
    property: CanonicalProperty,
    extension: Option<PropertyExtension>,
) -> ComposedPropertyView {
    let overlay = extension.unwrap_or_else(|| PropertyExtension::default_for(property.id.clone()));
    ComposedPropertyView { property, overlay }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PropertyStatus;
    use chrono::{TimeZone, Utc};

    fn canonical(id: &str) -> CanonicalProperty {
        CanonicalProperty {
            id: id.to_string(),
            property_type: "condo".to_string(),
            listing_type: None,
            title: Default::default(),
            description: Default::default(),
            bedrooms: None,
            bathrooms: None,
            size_sqm: None,
            rental_rate_num: None,
            sell_price_num: None,
            images: Vec::new(),
            location: None,
            status: PropertyStatus::Available,
            view_count: 0,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            project: None,
            agent_code: None,
        }
    }

    #[test]
    fn test_compose_preserves_order_and_length() {
        let records: Vec<_> = ["c", "a", "b", "d"].iter().map(|id| canonical(id)).collect();

        let mut hidden = PropertyExtension::default_for("b");
        hidden.id = Some("ext-b".to_string());
        hidden.is_hidden = true;
        let mut stray = PropertyExtension::default_for("zz");
        stray.id = Some("ext-zz".to_string());

        let extensions: HashMap<_, _> = [("b".to_string(), hidden), ("zz".to_string(), stray)]
            .into_iter()
            .collect();

        let views = compose(records, &extensions);

        assert_eq!(views.len(), 4);
        assert_eq!(
            views.iter().map(|v| v.id()).collect::<Vec<_>>(),
            vec!["c", "a", "b", "d"]
        );
        assert!(views[2].is_hidden());
        assert!(views[2].overlay.is_persisted());
        assert!(!views[0].overlay.is_persisted());
        assert_eq!(views[0].overlay.external_property_id, "c");
    }

    #[test]
    fn test_compose_empty_inputs() {
        assert!(compose(Vec::new(), &HashMap::new()).is_empty());
    }

    #[test]
    fn test_compose_one_defaults_missing_overlay() {
        let view = compose_one(canonical("x"), None);
        assert!(!view.is_popular());
        assert!(!view.has_active_promotion());
    }
}
