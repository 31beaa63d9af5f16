//! Parser for the "already planted" text field.
//!
//! Input looks like `Tomatoes:50:4;Lettuce:25:2`: `;`-separated entries of
//! `name:area:weeksGrown`.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A crop that already occupies part of the garden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingCrop {
    pub name: String,
    /// Occupied area in square feet.
    pub area: f64,
    /// Weeks since planting.
    pub weeks_grown: f64,
}

/// Parse the existing-crops field.
///
/// - Entries that do not have exactly three `:` fields are dropped.
/// - If `area` or `weeksGrown` is not a finite, non-negative number, both are
///   recorded as 0 and the entry is kept.
/// - Empty or whitespace-only input yields an empty list.
///
/// Input order is preserved.
pub fn parse_existing_crops(input: &str) -> Vec<ExistingCrop> {
    input
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(parse_entry)
        .collect()
}

fn parse_entry(entry: &str) -> Option<ExistingCrop> {
    let fields: Vec<&str> = entry.split(':').collect();
    let [name, area, weeks] = fields.as_slice() else {
        debug!(entry, fields = fields.len(), "dropping existing-crop entry");
        return None;
    };

    let (area, weeks_grown) = match (parse_amount(area), parse_amount(weeks)) {
        (Some(area), Some(weeks)) => (area, weeks),
        _ => {
            debug!(entry, "unparsable numbers in existing-crop entry, using zero");
            (0.0, 0.0)
        }
    };

    Some(ExistingCrop {
        name: name.trim().to_string(),
        area,
        weeks_grown,
    })
}

fn parse_amount(field: &str) -> Option<f64> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}
