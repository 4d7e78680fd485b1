use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use geojson::GeoJson;
use tracing::info;

use crate::config::{DataConfig, ProfileConfig};
use crate::types::{Dataset, Feature, PropertyValue};

/// Fetches and parses a profile's GeoJSON dataset.
///
/// Sources are read whole and parsed into structured form; the fetch is
/// bounded by a timeout so a stalled source reports a failure instead of
/// hanging that profile's display.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    timeout: Duration,
}

impl DatasetLoader {
    pub fn new(timeout: Duration) -> Self {
        DatasetLoader { timeout }
    }

    pub fn from_config(config: &DataConfig) -> Self {
        DatasetLoader::new(Duration::from_secs(config.fetch_timeout_secs))
    }

    pub async fn load(&self, profile: &ProfileConfig) -> Result<Dataset> {
        let read = tokio::fs::read(&profile.source);
        let bytes = tokio::time::timeout(self.timeout, read)
            .await
            .map_err(|_| anyhow!("Timed out reading dataset: {:?}", profile.source))?
            .with_context(|| format!("Failed to read dataset: {:?}", profile.source))?;

        let dataset = parse_dataset(&bytes)
            .with_context(|| format!("Failed to parse dataset: {:?}", profile.source))?;
        info!(
            profile = %profile.name,
            features = dataset.features.len(),
            "loaded dataset"
        );
        Ok(dataset)
    }
}

/// Parses a GeoJSON feature collection, coercing every property value at the
/// boundary. Geometry is carried through untouched.
pub fn parse_dataset(bytes: &[u8]) -> Result<Dataset> {
    let geojson = GeoJson::from_reader(bytes).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let features = collection
        .features
        .into_iter()
        .map(|feature| {
            let properties: HashMap<String, PropertyValue> = feature
                .properties
                .map(|props| {
                    props
                        .iter()
                        .map(|(k, v)| (k.clone(), PropertyValue::from_json(v)))
                        .collect()
                })
                .unwrap_or_default();
            Feature { geometry: feature.geometry, properties }
        })
        .collect();

    Ok(Dataset { features })
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": [[13.04, 47.8], [13.05, 47.81]] },
                "properties": { "index_walk_ft": 0.35, "max_speed_ft": "30", "lit": null }
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": null
            }
        ]
    }"#;

    #[test]
    fn parses_features_and_coerces_properties() {
        let dataset = parse_dataset(COLLECTION.as_bytes()).unwrap();
        assert_eq!(dataset.features.len(), 2);

        let first = &dataset.features[0];
        assert!(first.geometry.is_some());
        assert_eq!(*first.property("index_walk_ft"), PropertyValue::Number(0.35));
        assert_eq!(
            *first.property("max_speed_ft"),
            PropertyValue::Text("30".into())
        );
        assert_eq!(*first.property("lit"), PropertyValue::Missing);

        let second = &dataset.features[1];
        assert!(second.geometry.is_none());
        assert!(second.properties.is_empty());
    }

    #[test]
    fn rejects_non_collections() {
        let err = parse_dataset(br#"{ "type": "Point", "coordinates": [13.0, 47.8] }"#)
            .unwrap_err();
        assert!(err.to_string().contains("FeatureCollection"));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_dataset(b"not geojson at all").is_err());
    }

    #[tokio::test]
    async fn missing_source_is_a_load_error() {
        let loader = DatasetLoader::new(Duration::from_secs(5));
        let profile = ProfileConfig {
            name: "General Walkability".into(),
            source: "/nonexistent/walk.json".into(),
            attribute: "index_walk_ft".into(),
            popup_fields: vec![],
        };
        assert!(loader.load(&profile).await.is_err());
    }
}
