//! `garden plan`: run the planning pipeline locally, no database needed.

use std::fmt::Write as _;

use anyhow::{Context, Result};

use garden_core::allocate::Goals;
use garden_core::ml::YieldContext;
use garden_core::planner::{PlanOutcome, PlanRequest, Planner};
use garden_core::weather::Coordinates;

use crate::PlanArgs;

pub async fn run_plan(planner: &Planner, args: &PlanArgs) -> Result<()> {
    let request = plan_request(args);
    let outcome = planner.plan(&request, args.strategy).await;

    if args.json {
        let json = serde_json::to_string_pretty(&outcome).context("failed to serialize plan")?;
        println!("{json}");
    } else {
        print!("{}", render_text(&outcome));
    }
    Ok(())
}

fn plan_request(args: &PlanArgs) -> PlanRequest {
    PlanRequest {
        goals: Goals {
            num_people: args.people,
            volume_goal: args.volume_goal.max(0.0),
            calorie_goal: args.calorie_goal.max(0.0),
            additional_needs: args.needs.clone(),
            garden_size: args.garden_size.max(0.0),
        },
        existing_crops: args.existing.clone(),
        coordinates: Coordinates::from_optional(args.lat, args.lon),
        yield_context: YieldContext {
            region: args.region.clone().unwrap_or_default(),
            climate: args.climate.clone().unwrap_or_default(),
        },
    }
}

/// Diagram followed by one block per schedule entry.
fn render_text(outcome: &PlanOutcome) -> String {
    let mut out = outcome.diagram.clone();
    let _ = writeln!(out);
    let _ = writeln!(out, "Schedule:");
    if outcome.schedule.is_empty() {
        let _ = writeln!(out, "  (nothing to schedule)");
    }
    for entry in &outcome.schedule {
        let _ = writeln!(out, "  {}", entry.crop);
        let _ = writeln!(out, "    Planting: {}", entry.planting);
        let _ = writeln!(out, "    Watering: {}", entry.watering);
        let _ = writeln!(out, "    Weeding:  {}", entry.weeding);
        let _ = writeln!(out, "    Harvest:  {}", entry.harvest);
        if let Some(note) = &entry.weather_note {
            let _ = writeln!(out, "    Weather:  {note}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use garden_core::planner::{PlanOptions, Strategy, plan_garden};
    use garden_core::ml::YieldModel;

    fn args() -> PlanArgs {
        PlanArgs {
            garden_size: 100.0,
            people: 30,
            volume_goal: 0.0,
            calorie_goal: 2500.0,
            needs: String::new(),
            existing: "Tomatoes:50:4;Lettuce:25:2".to_string(),
            lat: None,
            lon: Some(76.3),
            region: None,
            climate: Some("tropical".to_string()),
            strategy: Strategy::RuleBased,
            json: false,
        }
    }

    #[test]
    fn args_become_plan_request() {
        let mut a = args();
        a.calorie_goal = -50.0;
        let req = plan_request(&a);
        assert_eq!(req.goals.calorie_goal, 0.0);
        assert_eq!(req.goals.num_people, 30);
        // One coordinate alone is not enough for a forecast.
        assert_eq!(req.coordinates, None);
        assert_eq!(req.yield_context.climate, "tropical");
    }

    #[test]
    fn text_output_lists_every_entry() {
        let outcome = plan_garden(
            &plan_request(&args()),
            &PlanOptions::default(),
            &YieldModel::Unavailable,
            &[],
        );
        let text = render_text(&outcome);

        assert!(text.starts_with(&outcome.diagram));
        assert!(text.contains("  Tomatoes\n    Planting: ~4 weeks ago\n"));
        assert!(text.contains("    Harvest:  ready in 8 more weeks\n"));
        assert!(text.contains("  Corn\n    Planting: 2025-03-08\n"));
        assert!(!text.contains("Weather:"));
    }

    #[test]
    fn empty_schedule_says_so() {
        let outcome = plan_garden(
            &PlanRequest::default(),
            &PlanOptions::default(),
            &YieldModel::Unavailable,
            &[],
        );
        assert!(render_text(&outcome).ends_with("Schedule:\n  (nothing to schedule)\n"));
    }
}
