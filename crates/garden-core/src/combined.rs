//! Experimental shelter-wide schedule.
//!
//! Given every stored request and the free space an administrator has to
//! share, an allocation model estimates the fraction of space each request
//! should get and a text model writes week-by-week instructions. The
//! results are stitched into one document.
//!
//! Model output is taken as-is: fractions are not clamped and need not sum
//! to 1.

use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::ml::ModelError;
use crate::weather::WeatherSummary;

/// Upper bound on generated instruction length passed to the text model.
pub const INSTRUCTION_MAX_LENGTH: usize = 300;

pub const FEATURE_COUNT: usize = 8;

/// Request fields the allocation and text models look at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFeatures {
    pub id: Uuid,
    pub urgency: i32,
    pub num_people: i32,
    pub volume_goal: f64,
    pub calorie_goal: f64,
    #[serde(default)]
    pub additional_needs: String,
}

impl From<&garden_db::models::GardenRequest> for RequestFeatures {
    fn from(req: &garden_db::models::GardenRequest) -> Self {
        Self {
            id: req.id,
            urgency: req.urgency,
            num_people: req.num_people,
            volume_goal: req.volume_goal,
            calorie_goal: req.calorie_goal,
            additional_needs: req.additional_needs.clone(),
        }
    }
}

/// `[urgency, num_people, volume_goal, calorie_goal, free_space,
/// temperature, rain_probability, 0.0]`. The last slot is reserved for an
/// existing-crops feature and is always zero.
pub fn feature_row(
    request: &RequestFeatures,
    free_space: f64,
    weather: &WeatherSummary,
) -> [f64; FEATURE_COUNT] {
    [
        f64::from(request.urgency),
        f64::from(request.num_people),
        request.volume_goal,
        request.calorie_goal,
        free_space,
        weather.temperature,
        weather.rain_probability,
        0.0,
    ]
}

/// Prompt for the instruction writer. Ends with `Week 1:` so the model
/// continues from there.
pub fn build_prompt(request: &RequestFeatures, weather: &WeatherSummary) -> String {
    format!(
        "Provide a detailed multi-week planting and care schedule.\n\
         Request info:\n \
         - Urgency: {}\n \
         - People: {}\n \
         - Volume Goal: {}\n \
         - Calorie Goal: {}\n \
         - Additional Needs: {}\n\
         Weather forecast:\n \
         - Temperature: {} C\n \
         - Rain Probability: {:.1}%\n\
         \n\
         Now write the weekly instructions:\n\
         Week 1:",
        request.urgency,
        request.num_people,
        request.volume_goal,
        request.calorie_goal,
        request.additional_needs,
        weather.temperature,
        weather.rain_probability * 100.0,
    )
}

// ---------------------------------------------------------------------------
// Model seams
// ---------------------------------------------------------------------------

/// Estimates the share of free space each request should receive.
#[async_trait]
pub trait AllocationEstimator: Send + Sync {
    /// One fraction per input row, in row order.
    async fn estimate(&self, rows: &[[f64; FEATURE_COUNT]]) -> Result<Vec<f64>, ModelError>;
}

/// Writes free-text instructions from a prompt.
#[async_trait]
pub trait InstructionWriter: Send + Sync {
    async fn write(&self, prompt: &str, max_length: usize) -> Result<String, ModelError>;
}

/// The two collaborators, or nothing.
#[derive(Clone, Default)]
pub enum CombinedModels {
    #[default]
    Unavailable,
    Available {
        allocator: Arc<dyn AllocationEstimator>,
        writer: Arc<dyn InstructionWriter>,
    },
}

impl CombinedModels {
    /// Both models available.
    pub fn new(
        allocator: impl AllocationEstimator + 'static,
        writer: impl InstructionWriter + 'static,
    ) -> Self {
        Self::Available {
            allocator: Arc::new(allocator),
            writer: Arc::new(writer),
        }
    }

    /// Whether both models are configured.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

impl std::fmt::Debug for CombinedModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => f.write_str("CombinedModels::Unavailable"),
            Self::Available { .. } => f.write_str("CombinedModels::Available"),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestAllocation {
    pub request_id: Uuid,
    pub fraction: f64,
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedSchedule {
    pub entries: Vec<RequestAllocation>,
    pub total_fraction: f64,
    pub master_text: String,
}

/// Sum fractions and build the master document.
pub fn combine_schedule(entries: Vec<RequestAllocation>) -> CombinedSchedule {
    let total_fraction: f64 = entries.iter().map(|e| e.fraction).sum();

    let mut master_text = String::from("=== COMPREHENSIVE SCHEDULE ===\n\n");
    for entry in &entries {
        let _ = write!(
            master_text,
            "Request {} -> fraction {:.1}%\n{}\n\n",
            entry.request_id,
            entry.fraction * 100.0,
            entry.instructions
        );
    }
    let _ = write!(
        master_text,
        "Total fraction used: {:.1}%\n\n",
        total_fraction * 100.0
    );

    CombinedSchedule {
        entries,
        total_fraction,
        master_text,
    }
}

/// Run both models over `requests` and combine the results.
///
/// Requests are processed in the order given. Errors from either model
/// abort the whole run.
pub async fn generate_combined_schedule(
    models: &CombinedModels,
    requests: &[RequestFeatures],
    free_space: f64,
    weather: &WeatherSummary,
) -> Result<CombinedSchedule, ModelError> {
    let CombinedModels::Available { allocator, writer } = models else {
        return Err(ModelError::Unavailable);
    };

    let rows: Vec<[f64; FEATURE_COUNT]> = requests
        .iter()
        .map(|r| feature_row(r, free_space, weather))
        .collect();

    let fractions = if rows.is_empty() {
        Vec::new()
    } else {
        allocator.estimate(&rows).await?
    };
    if fractions.len() != requests.len() {
        return Err(ModelError::BatchSize {
            expected: requests.len(),
            got: fractions.len(),
        });
    }

    let mut entries = Vec::with_capacity(requests.len());
    for (request, fraction) in requests.iter().zip(fractions) {
        let prompt = build_prompt(request, weather);
        let instructions = writer.write(&prompt, INSTRUCTION_MAX_LENGTH).await?;
        debug!(request_id = %request.id, fraction, "allocated request");
        entries.push(RequestAllocation {
            request_id: request.id,
            fraction,
            instructions,
        });
    }

    let schedule = combine_schedule(entries);
    info!(
        requests = schedule.entries.len(),
        total_fraction = schedule.total_fraction,
        "combined schedule generated"
    );
    Ok(schedule)
}
