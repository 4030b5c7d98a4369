//! Admin write path for overlays: flags, promotions and tags.
//!
//! Every mutation returns the refreshed extension so callers can re-render
//! without a second fetch. Nothing here touches canonical property fields.

use crate::error::{OverlayError, OverlayResult};
use crate::models::{FlagPatch, NewPromotion, PromotionType, PropertyExtension};
use crate::store::{ExtensionStore, PromotionDraft};
use std::sync::Arc;
use tracing::info;

const MAX_LABEL_LEN: usize = 120;
const MAX_TAG_LEN: usize = 60;

/// Validated write path for overlay flags, promotions and tags
pub struct PromotionManager {
    store: Arc<dyn ExtensionStore>,
}

impl PromotionManager {
    pub fn new(store: Arc<dyn ExtensionStore>) -> Self {
        Self { store }
    }

    /// Create-or-patch the overlay flags of one property
    pub async fn set_flags(
        &self,
        external_id: &str,
        patch: &FlagPatch,
    ) -> OverlayResult<PropertyExtension> {
        let external_id = validate_external_id(external_id)?;
        let extension = self.store.upsert_flags(external_id, patch).await?;
        info!("🏷️  Updated flags for {}", external_id);
        Ok(extension)
    }

    /// Append an active promotion, creating the overlay if needed
    pub async fn add_promotion(
        &self,
        external_id: &str,
        input: &NewPromotion,
    ) -> OverlayResult<PropertyExtension> {
        let external_id = validate_external_id(external_id)?;
        let draft = validate_promotion(input)?;
        self.store.insert_promotion(external_id, &draft).await
    }

    /// `NotFound` when the promotion is not (or no longer) on this property
    pub async fn remove_promotion(
        &self,
        external_id: &str,
        promotion_id: &str,
    ) -> OverlayResult<PropertyExtension> {
        let external_id = validate_external_id(external_id)?;
        self.store.delete_promotion(external_id, promotion_id).await
    }

    /// Switch one promotion on or off; `NotFound` if it belongs elsewhere
    pub async fn set_promotion_active(
        &self,
        external_id: &str,
        promotion_id: &str,
        active: bool,
    ) -> OverlayResult<PropertyExtension> {
        let external_id = validate_external_id(external_id)?;
        self.store
            .set_promotion_active(external_id, promotion_id, active)
            .await
    }

    /// Attach a tag; a same-named tag (any case) only gets its colour updated
    pub async fn add_tag(
        &self,
        external_id: &str,
        name: &str,
        color: Option<&str>,
    ) -> OverlayResult<PropertyExtension> {
        let external_id = validate_external_id(external_id)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(OverlayError::Validation("tag name must not be empty".to_string()));
        }
        if name.chars().count() > MAX_TAG_LEN {
            return Err(OverlayError::Validation(format!(
                "tag name longer than {} characters",
                MAX_TAG_LEN
            )));
        }
        let color = color.map(str::trim).filter(|c| !c.is_empty());
        self.store.upsert_tag(external_id, name, color).await
    }

    /// Detach a tag; `NotFound` when it is not on this property
    pub async fn remove_tag(
        &self,
        external_id: &str,
        tag_id: &str,
    ) -> OverlayResult<PropertyExtension> {
        let external_id = validate_external_id(external_id)?;
        self.store.delete_tag(external_id, tag_id).await
    }
}

fn validate_external_id(external_id: &str) -> OverlayResult<&str> {
    let trimmed = external_id.trim();
    if trimmed.is_empty() {
        return Err(OverlayError::Validation(
            "external property id must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

fn validate_promotion(input: &NewPromotion) -> OverlayResult<PromotionDraft> {
    let label = input.label.trim();
    if label.is_empty() {
        return Err(OverlayError::Validation(
            "promotion label must not be empty".to_string(),
        ));
    }
    if label.chars().count() > MAX_LABEL_LEN {
        return Err(OverlayError::Validation(format!(
            "promotion label longer than {} characters",
            MAX_LABEL_LEN
        )));
    }

    let promotion_type: PromotionType = input
        .promotion_type
        .parse()
        .map_err(OverlayError::Validation)?;

    for (field, value) in [
        ("discountedPrice", input.discounted_price),
        ("discountedRentalPrice", input.discounted_rental_price),
    ] {
        if matches!(value, Some(v) if v < 0) {
            return Err(OverlayError::Validation(format!("{} must not be negative", field)));
        }
    }

    Ok(PromotionDraft {
        label: label.to_string(),
        promotion_type,
        discounted_price: input.discounted_price,
        discounted_rental_price: input.discounted_rental_price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{SqliteExtensionStore, SqlitePool};

    fn manager() -> PromotionManager {
        PromotionManager::new(Arc::new(SqliteExtensionStore::new(
            SqlitePool::memory().unwrap(),
        )))
    }

    fn new_promotion(label: &str, kind: &str) -> NewPromotion {
        NewPromotion {
            label: label.to_string(),
            promotion_type: kind.to_string(),
            discounted_price: None,
            discounted_rental_price: None,
        }
    }

    #[tokio::test]
    async fn test_add_then_remove_leaves_no_promotions() {
        let manager = manager();
        let mut input = new_promotion("  Rainy season deal ", "discount");
        input.discounted_rental_price = Some(20_000);

        let ext = manager.add_promotion("P-1", &input).await.unwrap();
        assert_eq!(ext.promotions.len(), 1);
        assert_eq!(ext.promotions[0].label, "Rainy season deal");
        assert_eq!(ext.promotions[0].promotion_type, PromotionType::Discount);
        assert_eq!(ext.promotions[0].discounted_rental_price, Some(20_000));

        let promo_id = ext.promotions[0].id.clone();
        let after = manager.remove_promotion("P-1", &promo_id).await.unwrap();
        assert!(after.promotions.is_empty());

        let err = manager.remove_promotion("P-1", &promo_id).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_rejects_invalid_promotions() {
        let manager = manager();

        let empty = manager.add_promotion("P-1", &new_promotion("   ", "hot")).await;
        assert!(matches!(empty, Err(OverlayError::Validation(_))));

        let bad_type = manager.add_promotion("P-1", &new_promotion("Deal", "mega")).await;
        assert!(matches!(bad_type, Err(OverlayError::Validation(_))));

        let mut negative = new_promotion("Deal", "discount");
        negative.discounted_price = Some(-1);
        assert!(matches!(
            manager.add_promotion("P-1", &negative).await,
            Err(OverlayError::Validation(_))
        ));

        let no_id = manager.add_promotion(" ", &new_promotion("Deal", "hot")).await;
        assert!(matches!(no_id, Err(OverlayError::Validation(_))));

        // nothing was created by the failed attempts
        assert!(manager.store.get("P-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_promotion_reuses_existing_extension() {
        let manager = manager();
        let flagged = manager
            .set_flags(
                "P-1",
                &FlagPatch {
                    is_featured_popular: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let ext = manager
            .add_promotion("P-1", &new_promotion("Just listed", "NEW"))
            .await
            .unwrap();

        assert_eq!(ext.id, flagged.id);
        assert!(ext.is_featured_popular);
        assert_eq!(ext.promotions[0].promotion_type, PromotionType::New);
    }

    #[tokio::test]
    async fn test_tag_validation_and_color_normalisation() {
        let manager = manager();

        assert!(matches!(
            manager.add_tag("P-1", "  ", None).await,
            Err(OverlayError::Validation(_))
        ));

        let ext = manager.add_tag("P-1", " Sea view ", Some(" ")).await.unwrap();
        assert_eq!(ext.tags[0].name, "Sea view");
        assert!(ext.tags[0].color.is_none());

        let tag_id = ext.tags[0].id.clone();
        assert!(manager.remove_tag("P-1", &tag_id).await.unwrap().tags.is_empty());
    }
}
