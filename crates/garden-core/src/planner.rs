//! One planning run, end to end.
//!
//! [`plan_garden`] is the pure pipeline: parse, allocate, schedule, draw.
//! [`Planner`] owns the collaborators (forecast source, yield model), fetches
//! what it needs, then hands off to [`plan_garden`].

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use garden_db::models::GardenRequest;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::allocate::{Goals, free_space, recommend_crops};
use crate::diagram::render_diagram;
use crate::existing::{ExistingCrop, parse_existing_crops};
use crate::ml::{YieldContext, YieldModel};
use crate::ranking::rank_by_predicted_yield;
use crate::schedule::{ScheduleEntry, annotate_with_forecast, default_anchor_date, generate_schedule};
use crate::weather::{Coordinates, ForecastDay, WeatherProvider};

/// How new crops are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Goal rules plus greedy first-fit packing.
    #[default]
    RuleBased,
    /// Top crops by predicted yield, no packing.
    PredictedYield,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RuleBased => write!(f, "rule_based"),
            Self::PredictedYield => write!(f, "predicted_yield"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyParseError(pub String);

impl fmt::Display for StrategyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid strategy: {:?}", self.0)
    }
}

impl std::error::Error for StrategyParseError {}

impl FromStr for Strategy {
    type Err = StrategyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rule_based" | "rules" => Ok(Self::RuleBased),
            "predicted_yield" | "ml" => Ok(Self::PredictedYield),
            other => Err(StrategyParseError(other.to_string())),
        }
    }
}

/// Inputs for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub goals: Goals,
    /// Raw `name:area:weeks;...` text.
    #[serde(default)]
    pub existing_crops: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub yield_context: YieldContext,
}

impl From<&GardenRequest> for PlanRequest {
    /// Replan a stored request. Negative numbers read back as zero.
    fn from(req: &GardenRequest) -> Self {
        Self {
            goals: Goals {
                num_people: u32::try_from(req.num_people).unwrap_or(0),
                volume_goal: req.volume_goal.max(0.0),
                calorie_goal: req.calorie_goal.max(0.0),
                additional_needs: req.additional_needs.clone(),
                garden_size: req.garden_size.max(0.0),
            },
            existing_crops: req.existing_crops.clone(),
            coordinates: Coordinates::from_optional(req.latitude, req.longitude),
            yield_context: YieldContext {
                region: req.region.clone().unwrap_or_default(),
                climate: req.climate.clone().unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOptions {
    /// Planting date of the first new crop.
    pub anchor: NaiveDate,
    pub strategy: Strategy,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            anchor: default_anchor_date(),
            strategy: Strategy::default(),
        }
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub existing_crops: Vec<ExistingCrop>,
    pub free_space: f64,
    pub recommended_crops: Vec<String>,
    pub diagram: String,
    pub schedule: Vec<ScheduleEntry>,
}

/// Run the pipeline. Pure: same inputs, same output.
pub fn plan_garden(
    request: &PlanRequest,
    options: &PlanOptions,
    yield_model: &YieldModel,
    forecast: &[ForecastDay],
) -> PlanOutcome {
    let existing = parse_existing_crops(&request.existing_crops);
    let free = free_space(request.goals.garden_size, &existing);

    let recommended = match options.strategy {
        Strategy::RuleBased => recommend_crops(&request.goals, free),
        Strategy::PredictedYield => {
            rank_by_predicted_yield(&request.goals, yield_model, &request.yield_context)
        }
    };

    let mut schedule = generate_schedule(&existing, &recommended, options.anchor);
    annotate_with_forecast(&mut schedule, forecast);
    let diagram = render_diagram(request.goals.garden_size, &existing, &recommended);

    PlanOutcome {
        existing_crops: existing,
        free_space: free,
        recommended_crops: recommended,
        diagram,
        schedule,
    }
}

/// Planning service with its collaborators injected.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    pub weather: WeatherProvider,
    pub yield_model: YieldModel,
    pub anchor: Option<NaiveDate>,
}

impl Planner {
    /// Planner with the given collaborators and the default anchor date.
    pub fn new(weather: WeatherProvider, yield_model: YieldModel) -> Self {
        Self {
            weather,
            yield_model,
            anchor: None,
        }
    }

    /// Plant the first new crop on `anchor`.
    pub fn with_anchor(mut self, anchor: NaiveDate) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Pipeline options for one run.
    pub fn options(&self, strategy: Strategy) -> PlanOptions {
        PlanOptions {
            anchor: self.anchor.unwrap_or_else(default_anchor_date),
            strategy,
        }
    }

    /// Fetch the forecast (if any) and run the pipeline.
    pub async fn plan(&self, request: &PlanRequest, strategy: Strategy) -> PlanOutcome {
        let forecast = self
            .weather
            .forecast_for(request.coordinates)
            .await
            .unwrap_or_default();

        let outcome = plan_garden(request, &self.options(strategy), &self.yield_model, &forecast);
        info!(
            %strategy,
            recommended = outcome.recommended_crops.len(),
            free_space = outcome.free_space,
            forecast_days = forecast.len(),
            "garden planned"
        );
        outcome
    }
}
