//! `~/.config/garden/config.toml` and the settings resolved from it.
//!
//! Precedence for every value: CLI flag > environment > config file >
//! built-in default. [`GardenConfig::from_sources`] does the merging and takes
//! its inputs explicitly; [`GardenConfig::resolve`] feeds it the real process
//! environment and file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use garden_core::combined::CombinedModels;
use garden_core::ml::{HttpModelClient, LinearYieldModel, YieldModel};
use garden_core::planner::Planner;
use garden_core::token::{TOKEN_SECRET_ENV, TokenConfig};
use garden_core::weather::WeatherProvider;
use garden_db::config::DbConfig;

pub const WEATHER_API_KEY_ENV: &str = "GARDEN_WEATHER_API_KEY";

// -----------------------------------------------------------------------
// File format
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    pub auth: AuthSection,
    #[serde(default)]
    pub weather: WeatherSection,
    #[serde(default)]
    pub schedule: ScheduleSection,
    #[serde(default)]
    pub models: ModelsSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthSection {
    /// 32 random bytes, hex encoded.
    pub token_secret: String,
    /// Session lifetime in hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_hours: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WeatherSection {
    /// OpenWeatherMap API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ScheduleSection {
    /// Planting date of the first new crop (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ModelsSection {
    /// JSON coefficients for the linear yield model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yield_model: Option<PathBuf>,
    /// Base URL of the allocation / text model server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
}

impl ConfigFile {
    /// A fresh file with a newly generated token secret.
    pub fn new(db_url: &str, weather_api_key: Option<String>) -> Self {
        Self {
            database: DatabaseSection {
                url: db_url.to_string(),
            },
            auth: AuthSection {
                token_secret: generate_token_secret(),
                session_hours: None,
            },
            weather: WeatherSection {
                api_key: weather_api_key,
            },
            schedule: ScheduleSection::default(),
            models: ModelsSection::default(),
        }
    }
}

// -----------------------------------------------------------------------
// Location and IO
// -----------------------------------------------------------------------

/// `$XDG_CONFIG_HOME/garden`, else `~/.config/garden`. macOS uses the same
/// layout.
pub fn config_dir() -> PathBuf {
    match std::env::var_os("XDG_CONFIG_HOME") {
        Some(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join("garden"),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config/garden"),
    }
}

/// `<config_dir>/config.toml`.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn parse_config(contents: &str) -> Result<ConfigFile> {
    toml::from_str(contents).context("failed to parse config file")
}

/// Read and parse the config file at `path`.
pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("in {}", path.display()))
}

/// The file at [`config_path`], or `None` if there is none. A file that
/// exists but cannot be parsed is an error.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    load_config_from(&path).map(Some)
}

/// Write `config` to `path` (mode 0600 on Unix), creating parent dirs.
pub fn save_config_to(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to restrict permissions on {}", path.display()))?;
    }
    Ok(())
}

/// 32 random bytes, hex encoded.
pub fn generate_token_secret() -> String {
    use rand::Rng;
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

// -----------------------------------------------------------------------
// Pipeline collaborators
// -----------------------------------------------------------------------

/// What the planning pipeline can use. Everything is optional.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub weather_api_key: Option<String>,
    pub anchor: Option<NaiveDate>,
    pub yield_model: Option<PathBuf>,
    pub model_server_url: Option<String>,
}

impl PipelineSettings {
    /// The weather key comes from the environment before the file; the rest
    /// only from the file.
    pub fn from_sources(env: impl Fn(&str) -> Option<String>, file: Option<&ConfigFile>) -> Self {
        let weather_api_key = env(WEATHER_API_KEY_ENV)
            .or_else(|| file.and_then(|c| c.weather.api_key.clone()))
            .filter(|k| !k.trim().is_empty());
        Self {
            weather_api_key,
            anchor: file.and_then(|c| c.schedule.anchor_date),
            yield_model: file.and_then(|c| c.models.yield_model.clone()),
            model_server_url: file.and_then(|c| c.models.server_url.clone()),
        }
    }

    /// For commands that need no database or token secret.
    pub fn load() -> Result<Self> {
        Ok(Self::from_sources(env_var, load_config()?.as_ref()))
    }

    /// A yield model that is configured but fails to load is an error.
    pub fn planner(&self) -> Result<Planner> {
        let weather = WeatherProvider::from_api_key(self.weather_api_key.as_deref());
        let yield_model = match &self.yield_model {
            None => YieldModel::Unavailable,
            Some(path) => {
                let model = LinearYieldModel::load(path)
                    .with_context(|| format!("failed to load yield model {}", path.display()))?;
                info!(path = %path.display(), "loaded yield model");
                YieldModel::available(model)
            }
        };

        let planner = Planner::new(weather, yield_model);
        Ok(match self.anchor {
            Some(anchor) => planner.with_anchor(anchor),
            None => planner,
        })
    }

    /// Clients for the model server, or `Unavailable` when none is set.
    pub fn combined_models(&self) -> Result<CombinedModels> {
        let Some(url) = self.model_server_url.as_deref() else {
            warn!("no model server configured; combined schedule disabled");
            return Ok(CombinedModels::Unavailable);
        };
        let client = || HttpModelClient::new(url).context("failed to build model server client");
        Ok(CombinedModels::new(client()?, client()?))
    }
}

// -----------------------------------------------------------------------
// Full resolution
// -----------------------------------------------------------------------

#[derive(Debug)]
pub struct GardenConfig {
    pub db_config: DbConfig,
    pub token_config: TokenConfig,
    pub pipeline: PipelineSettings,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

impl GardenConfig {
    /// Resolve against the process environment and [`config_path`].
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        Self::from_sources(cli_db_url, env_var, load_config()?.as_ref())
    }

    /// - database URL: `cli_db_url`, `GARDEN_DATABASE_URL`, `[database] url`,
    ///   then [`DbConfig::DEFAULT_URL`]
    /// - token secret (hex): `GARDEN_TOKEN_SECRET`, `[auth] token_secret`,
    ///   otherwise an error
    pub fn from_sources(
        cli_db_url: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
        file: Option<&ConfigFile>,
    ) -> Result<Self> {
        let db_url = cli_db_url
            .map(str::to_string)
            .or_else(|| env(DbConfig::ENV_VAR))
            .or_else(|| file.map(|c| c.database.url.clone()))
            .unwrap_or_else(|| DbConfig::DEFAULT_URL.to_string());

        let secret = match (env(TOKEN_SECRET_ENV), file) {
            (Some(hex_secret), _) => hex::decode(hex_secret.trim())
                .with_context(|| format!("{TOKEN_SECRET_ENV} is not valid hex"))?,
            (None, Some(cfg)) => hex::decode(cfg.auth.token_secret.trim())
                .context("[auth] token_secret in the config file is not valid hex")?,
            (None, None) => bail!(
                "token secret not found; set {TOKEN_SECRET_ENV} or run `garden init` to create a config file"
            ),
        };
        if secret.is_empty() {
            bail!("token secret must not be empty");
        }

        let mut token_config = TokenConfig::new(secret);
        match file.and_then(|c| c.auth.session_hours) {
            Some(hours) if hours > 0 => {
                token_config = token_config.with_ttl(chrono::Duration::hours(hours));
            }
            Some(hours) => bail!("[auth] session_hours must be positive, got {hours}"),
            None => {}
        }

        Ok(Self {
            db_config: DbConfig::new(db_url),
            token_config,
            pipeline: PipelineSettings::from_sources(&env, file),
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
