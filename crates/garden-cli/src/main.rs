mod combined_cmd;
mod config;
mod plan_cmd;
mod request_cmds;
mod serve_cmd;
mod user_cmds;

use clap::{Args, Parser, Subcommand};

use garden_db::pool;

use config::GardenConfig;

#[derive(Parser)]
#[command(name = "garden", about = "Vegetable garden planner for shelters")]
struct Cli {
    /// Database URL (overrides GARDEN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a garden config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/garden")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
        /// OpenWeatherMap API key for forecast notes
        #[arg(long)]
        weather_api_key: Option<String>,
    },
    /// Initialize the garden database (requires config file or env vars)
    DbInit,
    /// Plan a garden locally and print the diagram and schedule
    Plan(PlanArgs),
    /// User account management
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Inspect stored garden requests
    Request {
        #[command(subcommand)]
        command: RequestCommands,
    },
    /// Split free space across every stored request (experimental)
    Combined {
        /// Square feet shared between all requests
        #[arg(long)]
        free_space: f64,
        /// Forecast temperature in °C (default 20)
        #[arg(long)]
        temperature: Option<f64>,
        /// Rain probability between 0 and 1 (default 0.2)
        #[arg(long)]
        rain_probability: Option<f64>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the HTTP API server
    Serve {
        /// Address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Total garden area in square feet
    #[arg(long)]
    pub garden_size: f64,
    /// Number of people to feed
    #[arg(long, default_value_t = 0)]
    pub people: u32,
    /// Desired harvest volume
    #[arg(long, default_value_t = 0.0)]
    pub volume_goal: f64,
    /// Daily calorie target per person
    #[arg(long, default_value_t = 0.0)]
    pub calorie_goal: f64,
    /// Free-text needs (e.g. "leafy greens")
    #[arg(long, default_value = "")]
    pub needs: String,
    /// Crops already planted, as name:area:weeks;...
    #[arg(long, default_value = "")]
    pub existing: String,
    /// Latitude for forecast notes
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,
    /// Longitude for forecast notes
    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<f64>,
    /// Region passed to the yield model
    #[arg(long)]
    pub region: Option<String>,
    /// Climate passed to the yield model
    #[arg(long)]
    pub climate: Option<String>,
    /// rule_based or predicted_yield
    #[arg(long, default_value = "rule_based")]
    pub strategy: garden_core::planner::Strategy,
    /// Print the full outcome as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user account
    Add {
        /// Login name
        username: String,
        /// shelter or admin
        #[arg(long, default_value = "shelter")]
        role: String,
        /// Account password
        #[arg(long)]
        password: String,
    },
    /// List user accounts
    List,
}

#[derive(Subcommand)]
pub enum RequestCommands {
    /// List every stored request, most urgent first
    List,
    /// Show one request and its latest schedule
    Show {
        /// Request ID
        id: String,
    },
}

/// Execute the `garden init` command: write config file.
fn cmd_init(db_url: &str, force: bool, weather_api_key: Option<String>) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile::new(db_url, weather_api_key);
    config::save_config_to(&path, &cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    let secret = &cfg.auth.token_secret;
    println!("  auth.token_secret = {}...{}", &secret[..8], &secret[secret.len() - 8..]);
    if cfg.weather.api_key.is_some() {
        println!("  weather.api_key = (set)");
    }
    println!();
    println!("Next: run `garden db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `garden db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = GardenConfig::resolve(cli_db_url)?;

    println!("Initializing garden database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("garden db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            force,
            weather_api_key,
        } => {
            cmd_init(&db_url, force, weather_api_key)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Plan(args) => {
            let planner = config::PipelineSettings::load()?.planner()?;
            plan_cmd::run_plan(&planner, &args).await?;
        }
        Commands::User { command } => {
            let resolved = GardenConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = user_cmds::run_user_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Request { command } => {
            let resolved = GardenConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = request_cmds::run_request_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Combined {
            free_space,
            temperature,
            rain_probability,
            json,
        } => {
            let resolved = GardenConfig::resolve(cli.database_url.as_deref())?;
            let models = resolved.pipeline.combined_models()?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let options = combined_cmd::CombinedOptions {
                free_space,
                temperature,
                rain_probability,
                json,
            };
            let result = combined_cmd::run_combined(&db_pool, &models, &options).await;
            db_pool.close().await;
            result?;
        }
        Commands::Serve { bind, port } => {
            let resolved = GardenConfig::resolve(cli.database_url.as_deref())?;
            let planner = resolved.pipeline.planner()?;
            let models = resolved.pipeline.combined_models()?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let state = serve_cmd::AppState {
                pool: db_pool.clone(),
                token_config: resolved.token_config,
                planner,
                models,
            };
            let result = serve_cmd::run_serve(state, &bind, port).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
