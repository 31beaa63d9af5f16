use std::env;
use std::time::Duration;

/// Where the planner's PostgreSQL database lives and how many connections
/// the server may hold open.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL, optionally with `?params`.
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/garden";

    /// Environment variable consulted by [`DbConfig::from_env`].
    pub const ENV_VAR: &str = "GARDEN_DATABASE_URL";

    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

    /// URL from `GARDEN_DATABASE_URL`, falling back to [`Self::DEFAULT_URL`].
    pub fn from_env() -> Self {
        Self::new(env::var(Self::ENV_VAR).unwrap_or_else(|_| Self::DEFAULT_URL.to_owned()))
    }

    /// Config for `database_url` with default pool settings.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(10),
        }
    }

    /// Pool size, at least 1.
    pub fn with_max_connections(mut self, n: u32) -> Self {
        self.max_connections = n.max(1);
        self
    }

    /// URL without any `?query` suffix.
    fn base_url(&self) -> &str {
        self.database_url
            .split_once('?')
            .map_or(self.database_url.as_str(), |(base, _)| base)
    }

    fn query_suffix(&self) -> &str {
        self.database_url
            .find('?')
            .map_or("", |pos| &self.database_url[pos..])
    }

    /// Database name from the URL path, or `None` when the URL has none.
    pub fn database_name(&self) -> Option<&str> {
        self.base_url()
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty() && !s.contains(':'))
    }

    /// Same server, `postgres` database. Used to create the target database
    /// before the first migration. Query parameters such as `sslmode` are
    /// kept.
    pub fn maintenance_url(&self) -> String {
        let base = self.base_url();
        match base.rfind('/') {
            Some(pos) => format!("{}/postgres{}", &base[..pos], self.query_suffix()),
            None => self.database_url.clone(),
        }
    }

    /// This URL pointed at a different database on the same server.
    pub fn with_database(&self, name: &str) -> Self {
        let base = self.base_url();
        let database_url = match base.rfind('/') {
            Some(pos) => format!("{}/{name}{}", &base[..pos], self.query_suffix()),
            None => format!("{base}/{name}{}", self.query_suffix()),
        };
        Self {
            database_url,
            ..self.clone()
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
