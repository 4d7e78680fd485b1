use crate::classify::classify;
use crate::types::{Feature, StyleDescriptor};

const STROKE_WEIGHT: u32 = 2;
const STROKE_OPACITY: f64 = 1.0;
const FILL_OPACITY: f64 = 0.9;

/// Computes per-feature styles for one profile's scoring attribute.
///
/// A stylist is bound to a single attribute name at construction so a whole
/// dataset renders consistently for one profile. Styling never fails:
/// malformed or absent scores degrade to the no-data color.
#[derive(Debug, Clone)]
pub struct Stylist {
    attribute: String,
}

impl Stylist {
    pub fn new(attribute: impl Into<String>) -> Self {
        Stylist { attribute: attribute.into() }
    }

    pub fn style_for(&self, feature: &Feature) -> StyleDescriptor {
        let color = classify(feature.property(&self.attribute).as_score());
        StyleDescriptor {
            fill_color: color,
            // Stroke matches fill; there is no separate stroke palette.
            color,
            weight: STROKE_WEIGHT,
            opacity: STROKE_OPACITY,
            fill_opacity: FILL_OPACITY,
        }
    }
}
