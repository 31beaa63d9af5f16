//! End-to-end checks of the pure planning pipeline through the public API.

use chrono::{Duration, NaiveDate};

use garden_core::allocate::{Goals, free_space, recommend_crops};
use garden_core::crops::CropCatalog;
use garden_core::existing::parse_existing_crops;
use garden_core::ml::YieldModel;
use garden_core::planner::{PlanOptions, PlanRequest, Strategy, plan_garden};
use garden_core::schedule::{HarvestInfo, PlantingDate};
use garden_core::weather::ForecastDay;

fn shelter_request() -> PlanRequest {
    PlanRequest {
        goals: Goals {
            num_people: 60,
            volume_goal: 30.0,
            calorie_goal: 2600.0,
            additional_needs: "Leafy greens for the kids".to_string(),
            garden_size: 120.0,
        },
        existing_crops: "Tomatoes:50:4;Lettuce:25:2;Mystery".to_string(),
        ..PlanRequest::default()
    }
}

#[test]
fn full_run_respects_free_space() {
    let request = shelter_request();
    let outcome = plan_garden(&request, &PlanOptions::default(), &YieldModel::Unavailable, &[]);

    // The malformed "Mystery" entry is dropped.
    assert_eq!(outcome.existing_crops.len(), 2);
    assert_eq!(outcome.free_space, 45.0);

    // Potatoes 10 + Corn 12 + Zucchini 15 + Tomatoes 8 fills all 45 sq ft.
    assert_eq!(
        outcome.recommended_crops,
        vec!["Potatoes", "Corn", "Zucchini", "Tomatoes"]
    );
    let catalog = CropCatalog::builtin();
    let used: f64 = outcome
        .recommended_crops
        .iter()
        .map(|c| catalog.space_for(c))
        .sum();
    assert!(used <= outcome.free_space);
}

#[test]
fn schedule_dates_follow_anchor() {
    let anchor = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    let options = PlanOptions {
        anchor,
        strategy: Strategy::RuleBased,
    };
    let outcome = plan_garden(&shelter_request(), &options, &YieldModel::Unavailable, &[]);

    let new_entries = &outcome.schedule[2..];
    for (i, entry) in new_entries.iter().enumerate() {
        let planted = anchor + Duration::weeks(i as i64);
        assert_eq!(entry.planting, PlantingDate::Calendar { date: planted });
        assert_eq!(
            entry.harvest,
            HarvestInfo::On {
                date: planted + Duration::days(70)
            }
        );
    }
}

#[test]
fn idempotent_output() {
    let forecast = vec![ForecastDay {
        date: "2025-03-08".to_string(),
        temperature: 21.0,
        description: "broken clouds".to_string(),
    }];
    let runs: Vec<_> = (0..3)
        .map(|_| {
            plan_garden(
                &shelter_request(),
                &PlanOptions::default(),
                &YieldModel::Unavailable,
                &forecast,
            )
        })
        .collect();

    for run in &runs[1..] {
        assert_eq!(run.diagram, runs[0].diagram);
        assert_eq!(
            serde_json::to_vec(&run.schedule).unwrap(),
            serde_json::to_vec(&runs[0].schedule).unwrap()
        );
    }
}

#[test]
fn garden_fully_planted_gets_no_new_crops() {
    let existing = parse_existing_crops("Corn:80:3;Kale:40:1");
    let free = free_space(100.0, &existing);
    assert_eq!(free, 0.0);
    assert!(recommend_crops(&Goals::default(), free).is_empty());

    let request = PlanRequest {
        goals: Goals {
            garden_size: 100.0,
            ..Goals::default()
        },
        existing_crops: "Corn:80:3;Kale:40:1".to_string(),
        ..PlanRequest::default()
    };
    let outcome = plan_garden(&request, &PlanOptions::default(), &YieldModel::Unavailable, &[]);
    assert!(
        outcome
            .diagram
            .ends_with("New crops:\n  No new crops fit in the remaining space.\n")
    );
    assert_eq!(outcome.schedule.len(), 2);
}
