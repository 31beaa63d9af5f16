use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use uuid::Uuid;

use garden_core::allocate::Goals;
use garden_core::combined::{CombinedModels, CombinedSchedule, RequestFeatures, generate_combined_schedule};
use garden_core::ml::ModelError;
use garden_core::password::{decoy_hash, verify_password};
use garden_core::planner::{PlanRequest, Planner, Strategy};
use garden_core::schedule::ScheduleEntry;
use garden_core::token::guard::{self, GuardError};
use garden_core::token::{SessionClaims, TokenConfig, issue_token};
use garden_core::weather::WeatherSummary;
use garden_db::models::{GardenRequest, Role, SavedSchedule};
use garden_db::queries::requests::{self as request_db, NewGardenRequest};
use garden_db::queries::{schedules as schedule_db, users as user_db};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub token_config: TokenConfig,
    pub planner: Planner,
    pub models: CombinedModels,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
    }
}

impl From<GuardError> for AppError {
    fn from(err: GuardError) -> Self {
        let status = match err {
            GuardError::Forbidden { .. } => StatusCode::FORBIDDEN,
            GuardError::MissingToken | GuardError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
        };
        Self::new(status, err.to_string())
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        let status = match err {
            ModelError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    pub role: Role,
}

fn default_urgency() -> i32 {
    1
}

/// Body of `POST /api/plan`.
#[derive(Debug, Deserialize)]
pub struct PlanForm {
    #[serde(default = "default_urgency")]
    pub urgency: i32,
    #[serde(default)]
    pub num_people: i64,
    #[serde(default)]
    pub volume_goal: f64,
    #[serde(default)]
    pub calorie_goal: f64,
    #[serde(default)]
    pub additional_needs: String,
    pub garden_size: f64,
    #[serde(default)]
    pub existing_crops: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub region: Option<String>,
    pub climate: Option<String>,
    #[serde(default)]
    pub strategy: Strategy,
}

impl PlanForm {
    /// Goals with negative numbers clamped to zero.
    pub fn goals(&self) -> Goals {
        Goals {
            num_people: u32::try_from(self.num_people.max(0)).unwrap_or(u32::MAX),
            volume_goal: self.volume_goal.max(0.0),
            calorie_goal: self.calorie_goal.max(0.0),
            additional_needs: self.additional_needs.clone(),
            garden_size: self.garden_size.max(0.0),
        }
    }

    fn to_new_request(&self, user_id: Uuid) -> NewGardenRequest {
        let goals = self.goals();
        NewGardenRequest {
            user_id,
            urgency: self.urgency.max(0),
            num_people: i32::try_from(goals.num_people).unwrap_or(i32::MAX),
            volume_goal: goals.volume_goal,
            calorie_goal: goals.calorie_goal,
            additional_needs: goals.additional_needs,
            garden_size: goals.garden_size,
            existing_crops: self.existing_crops.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            region: self.region.clone(),
            climate: self.climate.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub request_id: Uuid,
    pub schedule_id: Uuid,
    pub recommended_crops: Vec<String>,
    pub diagram: String,
    pub schedule: Vec<ScheduleEntry>,
}

#[derive(Debug, Serialize)]
pub struct RequestDetailResponse {
    #[serde(flatten)]
    pub request: GardenRequest,
    pub schedule: Option<SavedSchedule>,
}

#[derive(Debug, Deserialize)]
pub struct CombinedForm {
    /// Square feet available to share between all requests.
    pub free_space: f64,
    pub temperature: Option<f64>,
    pub rain_probability: Option<f64>,
}

impl CombinedForm {
    fn weather(&self) -> WeatherSummary {
        let defaults = WeatherSummary::default();
        WeatherSummary {
            temperature: self.temperature.unwrap_or(defaults.temperature),
            rain_probability: self.rain_probability.unwrap_or(defaults.rain_probability),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CombinedResponse {
    pub schedule_id: Uuid,
    #[serde(flatten)]
    pub schedule: CombinedSchedule,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/login", post(login))
        .route("/api/plan", post(submit_plan))
        .route("/api/requests", get(list_requests))
        .route("/api/requests/{id}", get(get_request_detail))
        .route("/api/schedules", get(list_schedules))
        .route("/api/schedules/{id}", get(get_schedule))
        .route("/api/admin/combined-schedule", post(combined_schedule))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("garden serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("garden serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Auth helpers
// ---------------------------------------------------------------------------

fn require_user(state: &AppState, headers: &HeaderMap) -> Result<SessionClaims, AppError> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let claims = guard::authenticate(&state.token_config, header)?;
    guard::require_role(&claims, Role::Shelter)?;
    Ok(claims)
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<SessionClaims, AppError> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let claims = guard::authenticate(&state.token_config, header)?;
    guard::require_role(&claims, Role::Admin)?;
    Ok(claims)
}

fn can_see(claims: &SessionClaims, owner: Uuid) -> bool {
    claims.role == Role::Admin || claims.user_id == owner
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index() -> Html<&'static str> {
    Html(
        "<!DOCTYPE html>\
<html><head><title>garden</title></head><body>\
<h1>garden</h1>\
<p>Shelter vegetable garden planner.</p>\
<ul>\
<li><code>POST /api/login</code></li>\
<li><code>POST /api/plan</code></li>\
<li><code>GET /api/requests</code></li>\
<li><code>GET /api/schedules</code></li>\
<li><code>GET /api/schedules/{id}</code></li>\
<li><code>POST /api/admin/combined-schedule</code></li>\
</ul>\
</body></html>",
    )
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginForm>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(form) = payload?;
    let user = user_db::get_user_by_username(&state.pool, &form.username)
        .await
        .map_err(AppError::internal)?;

    let stored = user.as_ref().map(|u| u.password_hash.clone());
    let valid = check_password(&form.username, form.password, stored).await?;
    let Some(user) = user.filter(|_| valid) else {
        return Err(AppError::unauthorized("invalid username or password"));
    };

    info!(username = %user.username, role = %user.role, "user logged in");
    Ok(Json(LoginResponse {
        token: issue_token(&state.token_config, user.id, user.role),
        user_id: user.id,
        role: user.role,
    }))
}

/// Verify on the blocking pool. A missing account is checked against the
/// decoy hash so it takes as long as a wrong password.
async fn check_password(
    username: &str,
    password: String,
    stored: Option<String>,
) -> Result<bool, AppError> {
    let known = stored.is_some();
    let result = tokio::task::spawn_blocking(move || {
        let hash = stored.as_deref().unwrap_or_else(|| decoy_hash());
        verify_password(&password, hash)
    })
    .await
    .map_err(|e| AppError::internal(anyhow::anyhow!("password check failed: {e}")))?;

    match result {
        Ok(valid) => Ok(valid && known),
        Err(e) => {
            warn!(username, error = %e, "stored password hash is unreadable");
            Ok(false)
        }
    }
}

/// Stores the request and its schedule in one transaction.
async fn submit_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<PlanForm>, JsonRejection>,
) -> Result<Json<PlanResponse>, AppError> {
    let claims = require_user(&state, &headers)?;
    let Json(form) = payload?;

    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::internal(anyhow::Error::new(e).context("failed to begin transaction")))?;

    let stored = request_db::insert_request(&mut *tx, &form.to_new_request(claims.user_id))
        .await
        .map_err(AppError::internal)?;

    let outcome = state
        .planner
        .plan(&PlanRequest::from(&stored), form.strategy)
        .await;

    let document = serde_json::json!({
        "strategy": form.strategy,
        "plan": &outcome,
    });
    let saved = schedule_db::insert_schedule(&mut *tx, claims.user_id, Some(stored.id), &document)
        .await
        .map_err(AppError::internal)?;

    tx.commit()
        .await
        .map_err(|e| AppError::internal(anyhow::Error::new(e).context("failed to commit plan")))?;

    Ok(Json(PlanResponse {
        request_id: stored.id,
        schedule_id: saved.id,
        recommended_crops: outcome.recommended_crops,
        diagram: outcome.diagram,
        schedule: outcome.schedule,
    }))
}

/// Admins see every request (most urgent first); shelters see their own.
async fn list_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<GardenRequest>>, AppError> {
    let claims = require_user(&state, &headers)?;
    let requests = match claims.role {
        Role::Admin => request_db::list_requests(&state.pool).await,
        Role::Shelter => request_db::list_requests_for_user(&state.pool, claims.user_id).await,
    }
    .map_err(AppError::internal)?;
    Ok(Json(requests))
}

async fn get_request_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<RequestDetailResponse>, AppError> {
    let claims = require_user(&state, &headers)?;
    let request = request_db::get_request(&state.pool, id)
        .await
        .map_err(AppError::internal)?
        .filter(|r| can_see(&claims, r.user_id))
        .ok_or_else(|| AppError::not_found(format!("request {id} not found")))?;

    let schedule = schedule_db::latest_schedule_for_request(&state.pool, id)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(RequestDetailResponse { request, schedule }))
}

/// The caller's own saved schedules, newest first.
async fn list_schedules(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<SavedSchedule>>, AppError> {
    let claims = require_user(&state, &headers)?;
    let schedules = schedule_db::list_schedules_for_user(&state.pool, claims.user_id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(schedules))
}

async fn get_schedule(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<SavedSchedule>, AppError> {
    let claims = require_user(&state, &headers)?;
    let schedule = schedule_db::get_schedule(&state.pool, id)
        .await
        .map_err(AppError::internal)?
        .filter(|s| can_see(&claims, s.user_id))
        .ok_or_else(|| AppError::not_found(format!("schedule {id} not found")))?;
    Ok(Json(schedule))
}

async fn combined_schedule(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CombinedForm>, JsonRejection>,
) -> Result<Json<CombinedResponse>, AppError> {
    let claims = require_admin(&state, &headers)?;
    let Json(form) = payload?;
    if !state.models.is_available() {
        return Err(ModelError::Unavailable.into());
    }

    let requests = request_db::list_requests(&state.pool)
        .await
        .map_err(AppError::internal)?;
    let features: Vec<RequestFeatures> = requests.iter().map(RequestFeatures::from).collect();

    let schedule = generate_combined_schedule(
        &state.models,
        &features,
        form.free_space.max(0.0),
        &form.weather(),
    )
    .await?;

    let document = serde_json::to_value(&schedule).map_err(|e| AppError::internal(e.into()))?;
    let saved = schedule_db::insert_schedule(&state.pool, claims.user_id, None, &document)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(CombinedResponse {
        schedule_id: saved.id,
        schedule,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use sqlx::PgPool;
    use tower::ServiceExt;

    use garden_core::combined::{AllocationEstimator, CombinedModels, FEATURE_COUNT, InstructionWriter};
    use garden_core::ml::ModelError;
    use garden_core::password::hash_password_with;
    use garden_core::planner::Planner;
    use garden_core::token::{TokenConfig, issue_token};
    use garden_db::models::{Role, User};
    use garden_db::queries::users::insert_user;
    use garden_test_utils::{create_test_db, drop_test_db, seed_user};

    use super::AppState;

    // -----------------------------------------------------------------------
    // Stub models
    // -----------------------------------------------------------------------

    struct EvenSplit;

    #[async_trait]
    impl AllocationEstimator for EvenSplit {
        async fn estimate(&self, rows: &[[f64; FEATURE_COUNT]]) -> Result<Vec<f64>, ModelError> {
            Ok(vec![1.0 / rows.len() as f64; rows.len()])
        }
    }

    struct Canned;

    #[async_trait]
    impl InstructionWriter for Canned {
        async fn write(&self, _prompt: &str, _max_length: usize) -> Result<String, ModelError> {
            Ok("Week 1: till the soil.".to_string())
        }
    }

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    fn token_config() -> TokenConfig {
        TokenConfig::new(b"serve-test-secret".to_vec())
    }

    fn state(pool: PgPool, models: CombinedModels) -> AppState {
        AppState {
            pool,
            token_config: token_config(),
            planner: Planner::default(),
            models,
        }
    }

    fn bearer(user: &User) -> String {
        issue_token(&token_config(), user.id, user.role)
    }

    async fn send(
        state: AppState,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> axum::response::Response {
        let app = super::build_router(state);
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.oneshot(request).await.unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn plan_body() -> Value {
        json!({
            "urgency": 3,
            "num_people": 40,
            "volume_goal": 0,
            "calorie_goal": 2500,
            "additional_needs": "",
            "garden_size": 100,
            "existing_crops": "Tomatoes:50:4;Lettuce:25:2"
        })
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_index_returns_html() {
        let (pool, db_name) = create_test_db().await;

        let resp = send(state(pool.clone(), CombinedModels::Unavailable), "GET", "/", None, None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp
            .headers()
            .get("content-type")
            .expect("should have content-type header")
            .to_str()
            .unwrap();
        assert!(content_type.contains("text/html"), "got: {content_type}");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_login() {
        let (pool, db_name) = create_test_db().await;
        insert_user(&pool, "riverside", &hash_password_with("s3cret", 10), Role::Shelter)
            .await
            .unwrap();
        let st = state(pool.clone(), CombinedModels::Unavailable);

        let ok = send(
            st.clone(),
            "POST",
            "/api/login",
            None,
            Some(json!({ "username": "riverside", "password": "s3cret" })),
        )
        .await;
        assert_eq!(ok.status(), StatusCode::OK);
        let json = body_json(ok).await;
        assert_eq!(json["role"], "shelter");
        assert!(json["token"].as_str().unwrap().starts_with("garden_st_"));

        let wrong = send(
            st.clone(),
            "POST",
            "/api/login",
            None,
            Some(json!({ "username": "riverside", "password": "nope" })),
        )
        .await;
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let unknown = send(
            st,
            "POST",
            "/api/login",
            None,
            Some(json!({ "username": "ghost", "password": "s3cret" })),
        )
        .await;
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
        assert!(body_json(unknown).await["error"].is_string());

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_login_failures_look_the_same() {
        let (pool, db_name) = create_test_db().await;
        insert_user(&pool, "riverside", &hash_password_with("s3cret", 10), Role::Shelter)
            .await
            .unwrap();
        let st = state(pool.clone(), CombinedModels::Unavailable);

        let wrong = send(
            st.clone(),
            "POST",
            "/api/login",
            None,
            Some(json!({ "username": "riverside", "password": "nope" })),
        )
        .await;
        let unknown = send(
            st,
            "POST",
            "/api/login",
            None,
            Some(json!({ "username": "ghost", "password": "nope" })),
        )
        .await;

        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(wrong).await, body_json(unknown).await);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_check_password_for_unknown_user_runs_decoy() {
        // No stored hash: the decoy is verified and the answer is always no,
        // even for the empty password.
        assert!(!super::check_password("ghost", String::new(), None).await.unwrap());
        assert!(!super::check_password("ghost", "hunter2".into(), None).await.unwrap());

        let stored = hash_password_with("hunter2", 10);
        assert!(super::check_password("known", "hunter2".into(), Some(stored.clone())).await.unwrap());
        assert!(!super::check_password("known", "hunter3".into(), Some(stored)).await.unwrap());
        assert!(
            !super::check_password("broken", "x".into(), Some("not-a-hash".into()))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_plan_requires_token() {
        let (pool, db_name) = create_test_db().await;

        let resp = send(
            state(pool.clone(), CombinedModels::Unavailable),
            "POST",
            "/api/plan",
            None,
            Some(plan_body()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = send(
            state(pool.clone(), CombinedModels::Unavailable),
            "POST",
            "/api/plan",
            Some("garden_st_forged"),
            Some(plan_body()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_plan_is_persisted_and_retrievable() {
        let (pool, db_name) = create_test_db().await;
        let shelter = seed_user(&pool, "hillside", Role::Shelter).await;
        let token = bearer(&shelter);
        let st = state(pool.clone(), CombinedModels::Unavailable);

        let resp = send(st.clone(), "POST", "/api/plan", Some(&token), Some(plan_body())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["recommended_crops"], json!(["Potatoes", "Corn"]));
        assert!(
            json["diagram"]
                .as_str()
                .unwrap()
                .contains("Row 1: Tomatoes (50 sq ft)")
        );
        let schedule = json["schedule"].as_array().unwrap();
        assert_eq!(schedule.len(), 4);
        assert_eq!(schedule[2]["planting"]["date"], "2025-03-01");

        let request_id = json["request_id"].as_str().unwrap().to_string();
        let schedule_id = json["schedule_id"].as_str().unwrap().to_string();

        let detail = send(
            st.clone(),
            "GET",
            &format!("/api/requests/{request_id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(detail.status(), StatusCode::OK);
        let detail = body_json(detail).await;
        assert_eq!(detail["urgency"], 3);
        assert_eq!(detail["schedule"]["id"], schedule_id.as_str());

        let saved = send(
            st,
            "GET",
            &format!("/api/schedules/{schedule_id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(saved.status(), StatusCode::OK);
        let saved = body_json(saved).await;
        assert_eq!(saved["document"]["strategy"], "rule_based");
        assert_eq!(
            saved["document"]["plan"]["recommended_crops"],
            json!(["Potatoes", "Corn"])
        );

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_plan_clamps_negative_inputs() {
        let (pool, db_name) = create_test_db().await;
        let shelter = seed_user(&pool, "lakeside", Role::Shelter).await;

        let resp = send(
            state(pool.clone(), CombinedModels::Unavailable),
            "POST",
            "/api/plan",
            Some(&bearer(&shelter)),
            Some(json!({ "num_people": -3, "calorie_goal": -100, "garden_size": -20 })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["recommended_crops"], json!([]));
        assert!(
            json["diagram"]
                .as_str()
                .unwrap()
                .contains("Total garden size: 0 sq ft")
        );

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_plan_rejects_malformed_body() {
        let (pool, db_name) = create_test_db().await;
        let shelter = seed_user(&pool, "creekside", Role::Shelter).await;

        let resp = send(
            state(pool.clone(), CombinedModels::Unavailable),
            "POST",
            "/api/plan",
            Some(&bearer(&shelter)),
            Some(json!({ "garden_size": "large" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await["error"].is_string());

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_request_visibility() {
        let (pool, db_name) = create_test_db().await;
        let a = seed_user(&pool, "shelter-a", Role::Shelter).await;
        let b = seed_user(&pool, "shelter-b", Role::Shelter).await;
        let admin = seed_user(&pool, "coordinator", Role::Admin).await;
        let st = state(pool.clone(), CombinedModels::Unavailable);

        let mut low = plan_body();
        low["urgency"] = json!(1);
        let mut high = plan_body();
        high["urgency"] = json!(5);
        let resp = send(st.clone(), "POST", "/api/plan", Some(&bearer(&a)), Some(low)).await;
        let a_request = body_json(resp).await["request_id"].clone();
        send(st.clone(), "POST", "/api/plan", Some(&bearer(&b)), Some(high)).await;

        let own = body_json(send(st.clone(), "GET", "/api/requests", Some(&bearer(&a)), None).await).await;
        assert_eq!(own.as_array().unwrap().len(), 1);

        let all = body_json(send(st.clone(), "GET", "/api/requests", Some(&bearer(&admin)), None).await).await;
        let all = all.as_array().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["urgency"], 5);
        assert_eq!(all[1]["urgency"], 1);

        let uri = format!("/api/requests/{}", a_request.as_str().unwrap());
        let other = send(st.clone(), "GET", &uri, Some(&bearer(&b)), None).await;
        assert_eq!(other.status(), StatusCode::NOT_FOUND);
        let by_admin = send(st, "GET", &uri, Some(&bearer(&admin)), None).await;
        assert_eq!(by_admin.status(), StatusCode::OK);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_list_schedules_returns_own_only() {
        let (pool, db_name) = create_test_db().await;
        let a = seed_user(&pool, "pine", Role::Shelter).await;
        let b = seed_user(&pool, "oak", Role::Shelter).await;
        let st = state(pool.clone(), CombinedModels::Unavailable);

        for _ in 0..2 {
            send(st.clone(), "POST", "/api/plan", Some(&bearer(&a)), Some(plan_body())).await;
        }
        send(st.clone(), "POST", "/api/plan", Some(&bearer(&b)), Some(plan_body())).await;

        let resp = send(st.clone(), "GET", "/api/schedules", Some(&bearer(&a)), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let listed = body_json(resp).await;
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|s| s["user_id"] == a.id.to_string()));

        let anonymous = send(st, "GET", "/api/schedules", None, None).await;
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_plan_for_deleted_account_stores_nothing() {
        let (pool, db_name) = create_test_db().await;
        let ghost = User {
            id: uuid::Uuid::new_v4(),
            username: "gone".to_string(),
            password_hash: String::new(),
            role: Role::Shelter,
            created_at: chrono::Utc::now(),
        };

        let resp = send(
            state(pool.clone(), CombinedModels::Unavailable),
            "POST",
            "/api/plan",
            Some(&bearer(&ghost)),
            Some(plan_body()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let counts = garden_db::pool::table_counts(&pool).await.unwrap();
        assert!(counts.iter().all(|(_, n)| *n == 0), "got {counts:?}");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_schedule_not_found() {
        let (pool, db_name) = create_test_db().await;
        let shelter = seed_user(&pool, "nowhere", Role::Shelter).await;

        let resp = send(
            state(pool.clone(), CombinedModels::Unavailable),
            "GET",
            &format!("/api/schedules/{}", uuid::Uuid::new_v4()),
            Some(&bearer(&shelter)),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_combined_schedule_access_and_availability() {
        let (pool, db_name) = create_test_db().await;
        let shelter = seed_user(&pool, "valley", Role::Shelter).await;
        let admin = seed_user(&pool, "hq", Role::Admin).await;
        let body = json!({ "free_space": 200 });

        let forbidden = send(
            state(pool.clone(), CombinedModels::Unavailable),
            "POST",
            "/api/admin/combined-schedule",
            Some(&bearer(&shelter)),
            Some(body.clone()),
        )
        .await;
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let unavailable = send(
            state(pool.clone(), CombinedModels::Unavailable),
            "POST",
            "/api/admin/combined-schedule",
            Some(&bearer(&admin)),
            Some(body),
        )
        .await;
        assert_eq!(unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_combined_schedule_with_models() {
        let (pool, db_name) = create_test_db().await;
        let shelter = seed_user(&pool, "orchard", Role::Shelter).await;
        let admin = seed_user(&pool, "hq", Role::Admin).await;
        let st = state(pool.clone(), CombinedModels::new(EvenSplit, Canned));

        for _ in 0..2 {
            send(st.clone(), "POST", "/api/plan", Some(&bearer(&shelter)), Some(plan_body())).await;
        }

        let resp = send(
            st,
            "POST",
            "/api/admin/combined-schedule",
            Some(&bearer(&admin)),
            Some(json!({ "free_space": 200, "temperature": 25.0 })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["entries"].as_array().unwrap().len(), 2);
        assert_eq!(json["total_fraction"], 1.0);
        let text = json["master_text"].as_str().unwrap();
        assert!(text.starts_with("=== COMPREHENSIVE SCHEDULE ===\n\n"));
        assert!(text.contains("-> fraction 50.0%\nWeek 1: till the soil.\n\n"));
        assert!(text.ends_with("Total fraction used: 100.0%\n\n"));
        assert!(json["schedule_id"].is_string());

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
