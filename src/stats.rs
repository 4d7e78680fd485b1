use serde::Serialize;

use crate::classify::UNSUITABLE_MAX;
use crate::types::Dataset;

/// Citation for the analysis methodology behind the datasets; shown with the
/// statistics panel.
pub const ATTRIBUTION: &str = "Data analysis powered by NetAScore. Werner, C., Wendel, R., \
Kaziyeva, D., Stutz, P., van der Meer, L., Effertz, L., Zagel, B., & Loidl, M. (2024). \
NetAScore: An open and extendible software for segment-scale bikeability and walkability. \
Environment and Planning B: Urban Analytics and City Science, 0(0). \
https://doi.org/10.1177/23998083241293177";

/// Share of unsuitable segments for one profile, computed once at startup.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileStat {
    pub profile: String,
    /// Percentage rounded to one fraction digit, e.g. "30.0".
    pub percent_unsuitable: String,
}

/// Percentage of features in the lowest score bucket.
///
/// Denominator: features where the scoring attribute is present at all.
/// Numerator: those whose value, parsed with the same permissive rule the
/// stylist uses, is <= 0.2. Values that fail to parse count toward the
/// denominator but never the numerator. Empty input yields "0.0".
pub fn unsuitable_percentage(dataset: &Dataset, attribute: &str) -> String {
    let mut total = 0u64;
    let mut poor = 0u64;

    for feature in &dataset.features {
        let value = feature.property(attribute);
        if !value.is_present() {
            continue;
        }
        total += 1;
        if matches!(value.as_score(), Some(v) if v <= UNSUITABLE_MAX) {
            poor += 1;
        }
    }

    if total == 0 {
        return "0.0".to_string();
    }
    format!("{:.1}", poor as f64 / total as f64 * 100.0)
}
