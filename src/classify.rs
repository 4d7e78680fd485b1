use serde::Serialize;

/// Sentinel color for missing or non-numeric scores.
pub const NO_DATA_COLOR: &str = "#cccccc";

/// Five-class diverging palette, unsuitable (red) to very suitable (blue).
pub const BUCKET_COLORS: [&str; 5] = [
    "#d73027", "#fc8d59", "#fee08b", "#91bfdb", "#4575b4",
];

/// Upper bound of the "unsuitable" bucket; shared with the statistics
/// calculator.
pub const UNSUITABLE_MAX: f64 = 0.2;

/// Maps a score to its display color.
///
/// Buckets are half-open with inclusive upper bounds at 0.2/0.4/0.6/0.8.
/// Values outside [0, 1] are deliberately not rejected: the comparison chain
/// puts them in the extreme buckets, which is the accepted contract for this
/// data. NaN and `None` get the no-data color, so the function is total.
pub fn classify(value: Option<f64>) -> &'static str {
    match value {
        Some(v) if !v.is_nan() => {
            if v <= 0.2 {
                BUCKET_COLORS[0]
            } else if v <= 0.4 {
                BUCKET_COLORS[1]
            } else if v <= 0.6 {
                BUCKET_COLORS[2]
            } else if v <= 0.8 {
                BUCKET_COLORS[3]
            } else {
                BUCKET_COLORS[4]
            }
        }
        _ => NO_DATA_COLOR,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LegendEntry {
    pub label: &'static str,
    pub color: &'static str,
}

/// Legend rows in display order, lowest bucket first.
pub fn legend() -> Vec<LegendEntry> {
    vec![
        LegendEntry { label: "0.0 - 0.2 (unsuitable)", color: BUCKET_COLORS[0] },
        LegendEntry { label: "0.2 - 0.4", color: BUCKET_COLORS[1] },
        LegendEntry { label: "0.4 - 0.6", color: BUCKET_COLORS[2] },
        LegendEntry { label: "0.6 - 0.8", color: BUCKET_COLORS[3] },
        LegendEntry { label: "0.8 - 1.0 (very suitable)", color: BUCKET_COLORS[4] },
    ]
}
