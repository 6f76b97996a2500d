use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use chores_core::ChoreService;
use chores_core::models::{
    Chore, ChoreFilter, Completion, CompletionFilter, CompletionStats, DashboardStats, Frequency,
    Health, NewAdhocCompletion, NewChore, NewCompletion, NewUser, Page, UpdateChore,
    UpdateCompletion, UpdateUser, User, UserFilter, WeekGrid, WeeklyChores,
};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB
const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
struct AppState {
    svc: Arc<Mutex<ChoreService>>,
    api_key: Option<String>,
}

impl AppState {
    fn svc(&self) -> MutexGuard<'_, ChoreService> {
        self.svc
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Query types ---

#[derive(Deserialize)]
struct UserListQuery {
    is_active: Option<bool>,
    is_admin: Option<bool>,
    skip: Option<i64>,
    limit: Option<i64>,
}

#[derive(Deserialize)]
struct ChoreListQuery {
    is_active: Option<bool>,
    assigned_user_id: Option<i64>,
    frequency: Option<String>,
    #[serde(default)]
    include_adhoc: bool,
    skip: Option<i64>,
    limit: Option<i64>,
}

#[derive(Deserialize)]
struct WeeklyQuery {
    week_start: Option<String>,
    user_id: Option<i64>,
    frequency: Option<String>,
    viewer_id: Option<i64>,
}

#[derive(Deserialize)]
struct CompletionListQuery {
    chore_id: Option<i64>,
    user_id: Option<i64>,
    week_start: Option<String>,
    skip: Option<i64>,
    limit: Option<i64>,
}

#[derive(Deserialize)]
struct StatsQuery {
    user_id: Option<i64>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
    status: &'static str,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Forbidden(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::Internal(err) => {
                error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<chores_core::Error> for ApiError {
    fn from(err: chores_core::Error) -> Self {
        use chores_core::Error;
        match err {
            Error::Validation(msg) => Self::BadRequest(msg),
            Error::Timezone(_) => Self::BadRequest(err.to_string()),
            Error::NotFound { .. } => Self::NotFound(err.to_string()),
            Error::Conflict(msg) | Error::Integrity(msg) => Self::Conflict(msg),
            Error::Database(e) => Self::Internal(anyhow::Error::new(e).context("database error")),
        }
    }
}

fn parse_date_param(name: &str, value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid {name} '{value}'. Use YYYY-MM-DD")))
}

fn parse_frequency_param(value: Option<&str>) -> Result<Option<Frequency>, ApiError> {
    Ok(value.map(str::parse::<Frequency>).transpose()?)
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

/// Admin routes need an `X-User-Id` header naming an active admin.
async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok());

    let is_admin = user_id.is_some_and(|id| {
        state
            .svc()
            .get_user(id)
            .is_ok_and(|u| u.is_admin && u.is_active)
    });

    if !is_admin {
        warn!(?user_id, path = %request.uri().path(), "admin route refused");
        return ApiError::Forbidden("Admin privileges required".to_string()).into_response();
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Public handlers ---

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        name: "chores",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
    })
}

async fn health(State(state): State<AppState>) -> Result<Json<Health>, ApiError> {
    Ok(Json(state.svc().health()?))
}

// --- User handlers ---

async fn list_users(
    State(state): State<AppState>,
    Query(q): Query<UserListQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let filter = UserFilter {
        is_active: q.is_active,
        is_admin: q.is_admin,
        page: Page::new(q.skip, q.limit)?,
    };
    Ok(Json(state.svc().list_users(&filter)?))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.svc().get_user(id)?))
}

async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.svc().create_user(&req)?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUser>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.svc().update_user(id, &req)?))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.svc().delete_user(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Chore handlers ---

async fn list_chores(
    State(state): State<AppState>,
    Query(q): Query<ChoreListQuery>,
) -> Result<Json<Vec<Chore>>, ApiError> {
    let filter = ChoreFilter {
        is_active: q.is_active,
        assigned_user_id: q.assigned_user_id,
        frequency: parse_frequency_param(q.frequency.as_deref())?,
        include_adhoc: q.include_adhoc,
        page: Page::new(q.skip, q.limit)?,
    };
    Ok(Json(state.svc().list_chores(&filter)?))
}

async fn get_chore(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Chore>, ApiError> {
    Ok(Json(state.svc().get_chore(id)?))
}

async fn create_chore(
    State(state): State<AppState>,
    Json(req): Json<NewChore>,
) -> Result<(StatusCode, Json<Chore>), ApiError> {
    let chore = state.svc().create_chore(&req)?;
    Ok((StatusCode::CREATED, Json(chore)))
}

async fn update_chore(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateChore>,
) -> Result<Json<Chore>, ApiError> {
    Ok(Json(state.svc().update_chore(id, &req)?))
}

async fn delete_chore(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.svc().delete_chore(id)?;
    Ok(StatusCode::NO_CONTENT)
}

fn resolve_week(svc: &ChoreService, week_start: Option<&str>) -> Result<NaiveDate, ApiError> {
    match week_start {
        Some(s) => parse_date_param("week_start", s),
        None => Ok(svc.current_week_start()),
    }
}

async fn weekly_chores(
    State(state): State<AppState>,
    Query(q): Query<WeeklyQuery>,
) -> Result<Json<WeeklyChores>, ApiError> {
    let frequency = parse_frequency_param(q.frequency.as_deref())?;
    let svc = state.svc();
    let week = resolve_week(&svc, q.week_start.as_deref())?;
    Ok(Json(svc.list_weekly_chores(week, q.user_id, frequency)?))
}

async fn weekly_grid(
    State(state): State<AppState>,
    Query(q): Query<WeeklyQuery>,
) -> Result<Json<WeekGrid>, ApiError> {
    let frequency = parse_frequency_param(q.frequency.as_deref())?;
    let svc = state.svc();
    let week = resolve_week(&svc, q.week_start.as_deref())?;
    Ok(Json(svc.week_grid(week, q.user_id, frequency, q.viewer_id)?))
}

async fn adhoc_names(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.svc().adhoc_names()?))
}

async fn record_adhoc(
    State(state): State<AppState>,
    Json(req): Json<NewAdhocCompletion>,
) -> Result<(StatusCode, Json<Completion>), ApiError> {
    let completion = state.svc().record_adhoc(&req)?;
    Ok((StatusCode::CREATED, Json(completion)))
}

// --- Completion handlers ---

async fn list_completions(
    State(state): State<AppState>,
    Query(q): Query<CompletionListQuery>,
) -> Result<Json<Vec<Completion>>, ApiError> {
    let filter = CompletionFilter {
        chore_id: q.chore_id,
        user_id: q.user_id,
        week_start: q
            .week_start
            .as_deref()
            .map(|s| parse_date_param("week_start", s))
            .transpose()?,
        page: Page::new(q.skip, q.limit)?,
    };
    Ok(Json(state.svc().list_completions(&filter)?))
}

async fn create_completion(
    State(state): State<AppState>,
    Json(req): Json<NewCompletion>,
) -> Result<(StatusCode, Json<Completion>), ApiError> {
    let completion = state.svc().mark_complete(&req)?;
    Ok((StatusCode::CREATED, Json(completion)))
}

async fn update_completion(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCompletion>,
) -> Result<Json<Completion>, ApiError> {
    Ok(Json(state.svc().update_completion(id, &req)?))
}

async fn delete_completion(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.svc().delete_completion(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn completion_stats(
    State(state): State<AppState>,
    Query(q): Query<StatsQuery>,
) -> Result<Json<CompletionStats>, ApiError> {
    Ok(Json(state.svc().completion_stats(q.user_id)?))
}

// --- Admin handlers ---

async fn dashboard_stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(state.svc().dashboard_stats()?))
}

// --- Router builder ---

fn build_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/api/users", post(create_user))
        .route("/api/users/{id}", put(update_user).delete(delete_user))
        .route("/api/chores", post(create_chore))
        .route("/api/chores/{id}", put(update_chore).delete(delete_chore))
        .route("/api/completions/{id}", put(update_completion))
        .route("/api/admin/stats/dashboard", get(dashboard_stats))
        .route("/api/admin/health", get(health))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let api = Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/{id}", get(get_user))
        .route("/api/chores", get(list_chores))
        .route("/api/chores/{id}", get(get_chore))
        .route("/api/chores/weekly", get(weekly_chores))
        .route("/api/chores/weekly/grid", get(weekly_grid))
        .route("/api/chores/adhoc", post(record_adhoc))
        .route("/api/chores/adhoc/names", get(adhoc_names))
        .route(
            "/api/completions",
            get(list_completions).post(create_completion),
        )
        .route(
            "/api/completions/{id}",
            axum::routing::delete(delete_completion),
        )
        .route("/api/completions/stats", get(completion_stats))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(USER_ID_HEADER),
        ]);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(api)
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    svc: ChoreService,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let timezone = svc.timezone();
    let state = AppState {
        svc: Arc::new(Mutex::new(svc)),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {}...{} (see api_key file in data directory)",
            &key[..4],
            &key[key.len() - 4..],
        );
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    info!(%bind, port, %timezone, "chores API listening");
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
