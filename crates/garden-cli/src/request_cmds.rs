//! Operator CLI handlers for `garden request` subcommands.
//!
//! - `garden request list`       -- every stored request, most urgent first
//! - `garden request show <id>`  -- one request plus its latest saved schedule

use std::fmt::Write as _;

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use garden_db::models::{GardenRequest, SavedSchedule};
use garden_db::queries::{requests as request_db, schedules as schedule_db};

use crate::RequestCommands;

pub async fn run_request_command(command: RequestCommands, pool: &PgPool) -> Result<()> {
    match command {
        RequestCommands::List => cmd_list(pool).await,
        RequestCommands::Show { id } => cmd_show(pool, &id).await,
    }
}

async fn cmd_list(pool: &PgPool) -> Result<()> {
    let requests = request_db::list_requests(pool).await?;
    if requests.is_empty() {
        println!("No garden requests found.");
        return Ok(());
    }

    println!(
        "{:<38} {:>7} {:>7} {:>10} {:<16}",
        "ID", "URGENCY", "PEOPLE", "SIZE", "SUBMITTED"
    );
    println!("{}", "-".repeat(82));
    for r in &requests {
        println!(
            "{:<38} {:>7} {:>7} {:>10} {:<16}",
            r.id,
            r.urgency,
            r.num_people,
            r.garden_size,
            r.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn cmd_show(pool: &PgPool, id_str: &str) -> Result<()> {
    let id = Uuid::parse_str(id_str).with_context(|| format!("invalid request ID: {id_str}"))?;
    let request = request_db::get_request(pool, id)
        .await?
        .with_context(|| format!("request {id} not found"))?;
    let schedule = schedule_db::latest_schedule_for_request(pool, id).await?;

    print!("{}", render_request(&request, schedule.as_ref()));
    Ok(())
}

fn render_request(r: &GardenRequest, schedule: Option<&SavedSchedule>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Request: {}", r.id);
    let _ = writeln!(out, "Owner:          {}", r.user_id);
    let _ = writeln!(out, "Urgency:        {}", r.urgency);
    let _ = writeln!(out, "People:         {}", r.num_people);
    let _ = writeln!(out, "Volume goal:    {}", r.volume_goal);
    let _ = writeln!(out, "Calorie goal:   {}", r.calorie_goal);
    if !r.additional_needs.is_empty() {
        let _ = writeln!(out, "Needs:          {}", r.additional_needs);
    }
    let _ = writeln!(out, "Garden size:    {} sq ft", r.garden_size);
    if !r.existing_crops.is_empty() {
        let _ = writeln!(out, "Existing crops: {}", r.existing_crops);
    }
    if let (Some(lat), Some(lon)) = (r.latitude, r.longitude) {
        let _ = writeln!(out, "Location:       {lat}, {lon}");
    }
    if let Some(region) = &r.region {
        let _ = writeln!(out, "Region:         {region}");
    }
    if let Some(climate) = &r.climate {
        let _ = writeln!(out, "Climate:        {climate}");
    }
    let _ = writeln!(out, "Submitted:      {}", r.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out);

    match schedule {
        None => {
            let _ = writeln!(out, "No saved schedule.");
        }
        Some(s) => {
            let _ = writeln!(out, "Latest schedule: {} ({})", s.id, s.created_at.format("%Y-%m-%d %H:%M"));
            match s.document["plan"]["diagram"].as_str() {
                Some(diagram) => out.push_str(diagram),
                None => {
                    let pretty = serde_json::to_string_pretty(&s.document).unwrap_or_default();
                    let _ = writeln!(out, "{pretty}");
                }
            }
        }
    }
    out
}
