use std::collections::HashMap;

use crate::config::{PopupFieldConfig, ProfileConfig};
use crate::types::{Feature, PropertyValue};

/// Value transform applied to a specific property key before display.
pub type ValueTransform = fn(&PropertyValue) -> String;

/// Renders the label/value table shown when a segment is clicked.
///
/// Field lists are per profile and ordered; special-cased keys go through an
/// open transform table, so further cases can be registered without touching
/// the formatting contract.
pub struct PopupFormatter {
    fields: HashMap<String, Vec<PopupFieldConfig>>,
    transforms: HashMap<String, ValueTransform>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopupRow {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PopupContent {
    Table(Vec<PopupRow>),
    /// Profile has no registered field list.
    Unconfigured,
}

impl PopupContent {
    pub fn to_html(&self) -> String {
        match self {
            PopupContent::Unconfigured => "No popup configuration".to_string(),
            PopupContent::Table(rows) => {
                let mut html = String::from("<table>");
                for row in rows {
                    html.push_str(&format!(
                        "<tr><td><b>{}:</b></td><td>{}</td></tr>",
                        row.label, row.value
                    ));
                }
                html.push_str("</table>");
                html
            }
        }
    }
}

impl PopupFormatter {
    pub fn from_profiles(profiles: &[ProfileConfig]) -> Self {
        let fields = profiles
            .iter()
            .map(|p| (p.name.clone(), p.popup_fields.clone()))
            .collect();
        let mut transforms: HashMap<String, ValueTransform> = HashMap::new();
        transforms.insert("lit".to_string(), lighting_transform);
        PopupFormatter { fields, transforms }
    }

    /// Registers an additional key transform, replacing any existing one for
    /// the same key.
    pub fn with_transform(mut self, key: impl Into<String>, transform: ValueTransform) -> Self {
        self.transforms.insert(key.into(), transform);
        self
    }

    pub fn format(&self, profile_name: &str, feature: &Feature) -> PopupContent {
        let Some(fields) = self.fields.get(profile_name) else {
            return PopupContent::Unconfigured;
        };

        let rows = fields
            .iter()
            .map(|field| {
                let value = feature.property(&field.key);
                let rendered = match self.transforms.get(&field.key) {
                    Some(transform) => transform(value),
                    None => value.display().unwrap_or_else(|| "n/a".to_string()),
                };
                PopupRow { label: field.label.clone(), value: rendered }
            })
            .collect();

        PopupContent::Table(rows)
    }
}

/// Lighting flag arrives as numeric or string 1/0; anything else (including
/// absence) is unknown.
fn lighting_transform(value: &PropertyValue) -> String {
    match value.as_score() {
        Some(v) if v == 1.0 => "Yes".to_string(),
        Some(v) if v == 0.0 => "No".to_string(),
        _ => "n/a".to_string(),
    }
}
