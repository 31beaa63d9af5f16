//! Planting, care, and harvest schedule generation.
//!
//! Existing crops get relative dates (they were planted some weeks ago and
//! follow a fixed 12-week cycle). New crops are staggered one week apart
//! from an anchor date and harvested a fixed 10 weeks after planting.

use std::collections::HashMap;
use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::existing::ExistingCrop;
use crate::weather::ForecastDay;

/// Assumed growing cycle of a crop that is already in the ground.
pub const EXISTING_CYCLE_WEEKS: f64 = 12.0;

/// Weeks from planting to harvest for newly recommended crops.
pub const HARVEST_OFFSET_WEEKS: i64 = 10;

pub const WATERING_INSTRUCTIONS: &str = "Water 1 inch per week (adjust if no rain).";
pub const WEEDING_INSTRUCTIONS: &str = "Weed once a week or as needed.";

/// Default first planting date for new crops.
pub fn default_anchor_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap_or(NaiveDate::MIN)
}

// ---------------------------------------------------------------------------
// Entry types
// ---------------------------------------------------------------------------

/// When a crop was (or will be) planted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlantingDate {
    /// Already planted, `weeks_ago` weeks before today.
    Relative { weeks_ago: f64 },
    /// To be planted on a calendar date.
    Calendar { date: NaiveDate },
}

impl PlantingDate {
    /// The date, when this is a calendar planting rather than a relative one.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Relative { .. } => None,
            Self::Calendar { date } => Some(*date),
        }
    }
}

impl fmt::Display for PlantingDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relative { weeks_ago } => write!(f, "~{weeks_ago} weeks ago"),
            Self::Calendar { date } => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// When a crop will be ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HarvestInfo {
    ReadyIn { weeks: f64 },
    On { date: NaiveDate },
}

impl fmt::Display for HarvestInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadyIn { weeks } => write!(f, "ready in {weeks} more weeks"),
            Self::On { date } => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// One row of the care schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub crop: String,
    pub planting: PlantingDate,
    pub watering: String,
    pub weeding: String,
    pub harvest: HarvestInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_note: Option<String>,
}

impl ScheduleEntry {
    fn new(crop: &str, planting: PlantingDate, harvest: HarvestInfo) -> Self {
        Self {
            crop: crop.to_string(),
            planting,
            watering: WATERING_INSTRUCTIONS.to_string(),
            weeding: WEEDING_INSTRUCTIONS.to_string(),
            harvest,
            weather_note: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Weeks left in the fixed cycle, floored at zero.
pub fn weeks_remaining(weeks_grown: f64) -> f64 {
    (EXISTING_CYCLE_WEEKS - weeks_grown).max(0.0)
}

/// Entries for crops already in the ground: planted "weeks ago", harvested
/// in the weeks left of the fixed cycle.
pub fn existing_crop_entries(existing: &[ExistingCrop]) -> Vec<ScheduleEntry> {
    existing
        .iter()
        .map(|crop| {
            ScheduleEntry::new(
                &crop.name,
                PlantingDate::Relative {
                    weeks_ago: crop.weeks_grown,
                },
                HarvestInfo::ReadyIn {
                    weeks: weeks_remaining(crop.weeks_grown),
                },
            )
        })
        .collect()
}

/// Crop `i` plants on `anchor + i` weeks and is harvested
/// [`HARVEST_OFFSET_WEEKS`] later.
pub fn new_crop_entries<S: AsRef<str>>(crops: &[S], anchor: NaiveDate) -> Vec<ScheduleEntry> {
    crops
        .iter()
        .enumerate()
        .map(|(i, crop)| {
            let planted = add_weeks(anchor, i as i64);
            let harvest = add_weeks(planted, HARVEST_OFFSET_WEEKS);
            ScheduleEntry::new(
                crop.as_ref(),
                PlantingDate::Calendar { date: planted },
                HarvestInfo::On { date: harvest },
            )
        })
        .collect()
}

/// Full schedule: existing crops first, then new crops.
pub fn generate_schedule<S: AsRef<str>>(
    existing: &[ExistingCrop],
    new_crops: &[S],
    anchor: NaiveDate,
) -> Vec<ScheduleEntry> {
    let mut entries = existing_crop_entries(existing);
    entries.extend(new_crop_entries(new_crops, anchor));
    entries
}

/// Attach a forecast note to every entry planted on a forecast day.
///
/// If the forecast lists the same date twice, the later description wins.
/// Entries with no matching day are left as they are.
pub fn annotate_with_forecast(entries: &mut [ScheduleEntry], forecast: &[ForecastDay]) {
    if forecast.is_empty() {
        return;
    }
    let by_date: HashMap<&str, &str> = forecast
        .iter()
        .map(|day| (day.date.as_str(), day.description.as_str()))
        .collect();

    for entry in entries.iter_mut() {
        let Some(date) = entry.planting.calendar_date() else {
            continue;
        };
        let key = date.format("%Y-%m-%d").to_string();
        if let Some(description) = by_date.get(key.as_str()) {
            entry.weather_note = Some(format!("On planting day, forecast: {description}"));
        }
    }
}

fn add_weeks(date: NaiveDate, weeks: i64) -> NaiveDate {
    date.checked_add_signed(Duration::weeks(weeks))
        .unwrap_or(NaiveDate::MAX)
}
