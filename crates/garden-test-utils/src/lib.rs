//! Database fixtures for garden tests.
//!
//! One PostgreSQL server is shared by every test in a binary and each test
//! gets a throwaway database on it. Set `GARDEN_TEST_PG_URL` (server URL,
//! no database name) to use an existing server; otherwise a `postgres:16`
//! container is started once and kept for the life of the binary.

use sqlx::{Executor, PgPool};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use garden_db::config::DbConfig;
use garden_db::models::{GardenRequest, Role, User};
use garden_db::pool;
use garden_db::queries::requests::{self, NewGardenRequest};
use garden_db::queries::users;

pub const PG_URL_ENV: &str = "GARDEN_TEST_PG_URL";

struct TestServer {
    /// Points at the `postgres` database; tests derive their own from it.
    config: DbConfig,
    _container: Option<ContainerAsync<Postgres>>,
}

static SERVER: OnceCell<TestServer> = OnceCell::const_new();

async fn start_server() -> TestServer {
    if let Ok(url) = std::env::var(PG_URL_ENV) {
        let url = url.trim_end_matches('/');
        return TestServer {
            config: DbConfig::new(format!("{url}/postgres")).with_max_connections(5),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("16")
        .start()
        .await
        .expect("failed to start PostgreSQL container");
    let host = container.get_host().await.expect("container host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("container port");

    TestServer {
        config: DbConfig::new(format!("postgresql://postgres:postgres@{host}:{port}/postgres"))
            .with_max_connections(5),
        _container: Some(container),
    }
}

async fn server() -> &'static TestServer {
    SERVER.get_or_init(start_server).await
}

/// Server URL without a database name.
pub async fn pg_url() -> &'static str {
    let url = &server().await.config.database_url;
    url.strip_suffix("/postgres").unwrap_or(url)
}

/// A fresh `garden_test_<uuid>` database with migrations applied.
///
/// Returns `(pool, db_name)`; hand `db_name` to [`drop_test_db`] afterwards.
pub async fn create_test_db() -> (PgPool, String) {
    let db_name = format!("garden_test_{}", Uuid::new_v4().simple());
    let config = server().await.config.with_database(&db_name);

    pool::ensure_database_exists(&config)
        .await
        .unwrap_or_else(|e| panic!("failed to create {db_name}: {e:#}"));
    let db = pool::create_pool(&config)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to {db_name}: {e:#}"));
    pool::run_migrations(&db).await.expect("migrations should apply");

    (db, db_name)
}

/// Drop a database made by [`create_test_db`]. Idempotent.
pub async fn drop_test_db(db_name: &str) {
    pool::check_identifier(db_name).expect("test database name");
    let maint = pool::create_pool(&server().await.config.clone().with_max_connections(1))
        .await
        .expect("maintenance connection");

    let _ = maint
        .execute(
            format!(
                "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
                 WHERE datname = '{db_name}' AND pid <> pg_backend_pid()"
            )
            .as_str(),
        )
        .await;
    let _ = maint
        .execute(format!("DROP DATABASE IF EXISTS {db_name}").as_str())
        .await;
    maint.close().await;
}

/// A user whose password hash never verifies. Use a real hash when a test
/// needs to log in.
pub async fn seed_user(pool: &PgPool, username: &str, role: Role) -> User {
    users::insert_user(pool, username, "not-a-real-hash", role)
        .await
        .expect("seed user insert should succeed")
}

/// A request for `user` with the given urgency and garden size; every other
/// field is empty.
pub async fn seed_request(pool: &PgPool, user: &User, urgency: i32, garden_size: f64) -> GardenRequest {
    requests::insert_request(
        pool,
        &NewGardenRequest {
            user_id: user.id,
            urgency,
            garden_size,
            ..NewGardenRequest::default()
        },
    )
    .await
    .expect("seed request insert should succeed")
}
