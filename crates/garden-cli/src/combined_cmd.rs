//! `garden combined`: split shared free space across every stored request
//! and write one master instruction document. Experimental; needs a model
//! server in `[models] server_url`.

use anyhow::{Context, Result, bail};
use sqlx::PgPool;

use garden_core::combined::{CombinedModels, CombinedSchedule, RequestFeatures, generate_combined_schedule};
use garden_core::weather::WeatherSummary;
use garden_db::queries::requests as request_db;

#[derive(Debug, Clone)]
pub struct CombinedOptions {
    pub free_space: f64,
    pub temperature: Option<f64>,
    pub rain_probability: Option<f64>,
    pub json: bool,
}

impl CombinedOptions {
    fn weather(&self) -> WeatherSummary {
        let defaults = WeatherSummary::default();
        WeatherSummary {
            temperature: self.temperature.unwrap_or(defaults.temperature),
            rain_probability: self.rain_probability.unwrap_or(defaults.rain_probability),
        }
    }
}

pub async fn run_combined(
    pool: &PgPool,
    models: &CombinedModels,
    options: &CombinedOptions,
) -> Result<()> {
    if !models.is_available() {
        bail!("combined schedule needs a model server; set [models] server_url in the config file");
    }

    let schedule = combined_for_stored_requests(pool, models, options).await?;
    if options.json {
        let json =
            serde_json::to_string_pretty(&schedule).context("failed to serialize schedule")?;
        println!("{json}");
    } else {
        print!("{}", schedule.master_text);
    }
    Ok(())
}

async fn combined_for_stored_requests(
    pool: &PgPool,
    models: &CombinedModels,
    options: &CombinedOptions,
) -> Result<CombinedSchedule> {
    let requests = request_db::list_requests(pool).await?;
    let features: Vec<RequestFeatures> = requests.iter().map(RequestFeatures::from).collect();

    generate_combined_schedule(
        models,
        &features,
        options.free_space.max(0.0),
        &options.weather(),
    )
    .await
    .context("combined schedule failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use garden_core::combined::{AllocationEstimator, FEATURE_COUNT, InstructionWriter};
    use garden_core::ml::ModelError;
    use garden_db::models::Role;
    use garden_test_utils::{create_test_db, drop_test_db, seed_request, seed_user};

    /// Gives each request a tenth of the space per urgency point and
    /// checks the weather columns arrive intact.
    struct UrgencyShare;

    #[async_trait]
    impl AllocationEstimator for UrgencyShare {
        async fn estimate(&self, rows: &[[f64; FEATURE_COUNT]]) -> Result<Vec<f64>, ModelError> {
            for row in rows {
                assert_eq!(row[4], 120.0);
                assert_eq!(row[5], 31.0);
                assert_eq!(row[6], 0.2);
            }
            Ok(rows.iter().map(|r| r[0] / 10.0).collect())
        }
    }

    struct Echo;

    #[async_trait]
    impl InstructionWriter for Echo {
        async fn write(&self, _prompt: &str, _max_length: usize) -> Result<String, ModelError> {
            Ok("Week 1: sow.".to_string())
        }
    }

    fn options() -> CombinedOptions {
        CombinedOptions {
            free_space: 120.0,
            temperature: Some(31.0),
            rain_probability: None,
            json: false,
        }
    }

    #[tokio::test]
    async fn stored_requests_are_combined_by_urgency() {
        let (pool, db_name) = create_test_db().await;
        let user = seed_user(&pool, "shelter", Role::Shelter).await;
        for urgency in [2, 6] {
            seed_request(&pool, &user, urgency, 50.0).await;
        }

        let models = CombinedModels::new(UrgencyShare, Echo);
        let schedule = combined_for_stored_requests(&pool, &models, &options())
            .await
            .unwrap();

        // Most urgent first.
        assert_eq!(schedule.entries[0].fraction, 0.6);
        assert_eq!(schedule.entries[1].fraction, 0.2);
        assert!(schedule.master_text.contains("fraction 60.0%\nWeek 1: sow.\n\n"));
        assert!(schedule.master_text.ends_with("Total fraction used: 80.0%\n\n"));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn unavailable_models_are_reported() {
        let (pool, db_name) = create_test_db().await;

        let err = run_combined(&pool, &CombinedModels::Unavailable, &options())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("server_url"));

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
