use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

/// A feature property value after ingestion.
///
/// Upstream GeoJSON is untyped: scores arrive as numbers or strings, keys go
/// missing, nulls appear. Coercing once at the boundary keeps the consumers
/// (stylist, popup formatter, stats) from re-implementing permissive parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
    Missing,
}

impl PropertyValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => PropertyValue::Missing,
            Value::Number(n) => match n.as_f64() {
                Some(f) => PropertyValue::Number(f),
                None => PropertyValue::Text(n.to_string()),
            },
            Value::String(s) => PropertyValue::Text(s.clone()),
            Value::Bool(b) => PropertyValue::Text(b.to_string()),
            // Arrays/objects are not expected from the analysis tool, but
            // render them literally rather than dropping them.
            other => PropertyValue::Text(other.to_string()),
        }
    }

    /// Permissive numeric interpretation: numbers pass through, numeric
    /// strings parse, everything else is no-data.
    pub fn as_score(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) if !n.is_nan() => Some(*n),
            PropertyValue::Number(_) => None,
            PropertyValue::Text(s) => s.trim().parse::<f64>().ok(),
            PropertyValue::Missing => None,
        }
    }

    /// Literal display form, or `None` when the value is absent.
    pub fn display(&self) -> Option<String> {
        match self {
            PropertyValue::Number(n) => Some(format!("{}", n)),
            PropertyValue::Text(s) => Some(s.clone()),
            PropertyValue::Missing => None,
        }
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, PropertyValue::Missing)
    }
}

/// One road-segment record. Geometry is opaque to the pipeline; it is carried
/// through so the display surface can draw the segment.
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Option<geojson::Geometry>,
    pub properties: HashMap<String, PropertyValue>,
}

impl Feature {
    pub fn property(&self, key: &str) -> &PropertyValue {
        self.properties.get(key).unwrap_or(&PropertyValue::Missing)
    }
}

/// All features loaded for one profile.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub features: Vec<Feature>,
}

/// Per-feature rendering style. Recomputed on every render, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleDescriptor {
    #[serde(rename = "fillColor")]
    pub fill_color: &'static str,
    pub color: &'static str,
    pub weight: u32,
    pub opacity: f64,
    #[serde(rename = "fillOpacity")]
    pub fill_opacity: f64,
}

/// A feature with its style and popup content resolved, ready for display.
#[derive(Debug, Clone)]
pub struct StyledFeature {
    pub geometry: Option<geojson::Geometry>,
    pub style: StyleDescriptor,
    pub popup_html: String,
}

/// The rendered form of one profile's dataset.
#[derive(Debug, Clone)]
pub struct StyledOverlay {
    pub profile: String,
    pub features: Vec<StyledFeature>,
}

impl StyledOverlay {
    /// Emits the overlay as a GeoJSON feature collection whose properties
    /// carry the style fields and popup HTML, so a thin map client can apply
    /// them without any logic of its own.
    pub fn to_feature_collection(&self) -> geojson::FeatureCollection {
        let features = self
            .features
            .iter()
            .map(|f| {
                let mut props = geojson::JsonObject::new();
                props.insert("style".into(), serde_json::json!(f.style));
                props.insert("popup".into(), Value::String(f.popup_html.clone()));
                geojson::Feature {
                    bbox: None,
                    geometry: f.geometry.clone(),
                    id: None,
                    properties: Some(props),
                    foreign_members: None,
                }
            })
            .collect();

        geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}
