mod composed;
mod extension;
mod property;

pub use composed::ComposedPropertyView;
pub use extension::{
    FlagPatch, NewPromotion, Promotion, PromotionType, PropertyExtension, PropertyTag,
};
pub use property::{CanonicalProperty, GeoPoint, LocalizedText, ProjectRef, PropertyStatus};
