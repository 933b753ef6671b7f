//! HTTP query surface for the analytics engine
//!
//! Thin axum handlers over the repository and the pure analytics code:
//! resolve the bearer token, validate query parameters, fetch filtered
//! rows, and shape the engine output as JSON. Status mapping: missing or
//! malformed parameters are 400, unknown tokens are 401, exercises the
//! user does not own are 404, anything unexpected is 500.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::{Arc, Mutex};

use crate::config::AppConfig;
use crate::database::{Database, DatabaseError, SetOrder};
use crate::error::LiftRsError;
use crate::overload::{CurrentAttempt, OverloadComparator};
use crate::stats::StatsCalculator;

/// Shared state for all handlers
pub struct ServerState {
    db: Mutex<Database>,
}

impl ServerState {
    pub fn new(db: Database) -> Self {
        ServerState { db: Mutex::new(db) }
    }
}

/// Error wrapper that maps the crate error hierarchy onto HTTP responses
pub struct AppError(LiftRsError);

impl<E> From<E> for AppError
where
    LiftRsError: From<E>,
{
    fn from(err: E) -> Self {
        AppError(LiftRsError::from(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LiftRsError::Validation(_) => StatusCode::BAD_REQUEST,
            LiftRsError::Database(DatabaseError::InvalidData(_)) => StatusCode::BAD_REQUEST,
            LiftRsError::Auth(_) => StatusCode::UNAUTHORIZED,
            LiftRsError::Database(DatabaseError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::warn!(error = %self.0, status = %status, "request rejected");
        }

        let body = Json(serde_json::json!({ "error": self.0.user_message() }));
        (status, body).into_response()
    }
}

/// Query parameters for stats and chart endpoints
#[derive(Deserialize)]
struct AnalyticsQuery {
    exercise_id: Option<String>,
    #[serde(default = "default_days")]
    days: u32,
}

/// Query parameters for the overload comparison endpoint
#[derive(Deserialize)]
struct OverloadQuery {
    exercise_id: Option<String>,
    weight: Option<Decimal>,
    reps: Option<u32>,
}

const fn default_days() -> u32 {
    90
}

/// Analytics API routes
pub struct ApiRoutes;

impl ApiRoutes {
    /// Create the full application router
    pub fn routes(state: Arc<ServerState>) -> Router {
        Router::new()
            .route("/health", get(Self::handle_health))
            .route("/api/stats", get(Self::handle_stats))
            .route("/api/chart", get(Self::handle_chart))
            .route("/api/overload", get(Self::handle_overload))
            .with_state(state)
    }

    /// Resolve the bearer token in the authorization header to a user id
    fn authenticate(headers: &HeaderMap, db: &Database) -> Result<String, LiftRsError> {
        let token = headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| LiftRsError::Auth("missing bearer token".to_string()))?;

        db.user_id_for_token(token)?
            .ok_or_else(|| LiftRsError::Auth("unknown token".to_string()))
    }

    /// Validate the shared exercise_id/days parameters
    fn validate_window(
        exercise_id: Option<String>,
        days: u32,
    ) -> Result<(String, u32), LiftRsError> {
        let exercise_id = exercise_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| LiftRsError::Validation("exercise_id is required".to_string()))?;
        if days == 0 {
            return Err(LiftRsError::Validation("days must be positive".to_string()));
        }
        Ok((exercise_id, days))
    }

    /// Check the exercise exists and belongs to the caller
    fn check_ownership(
        db: &Database,
        user_id: &str,
        exercise_id: &str,
    ) -> Result<(), LiftRsError> {
        db.find_exercise(user_id, exercise_id)?
            .map(|_| ())
            .ok_or_else(|| {
                DatabaseError::NotFound(format!("exercise {}", exercise_id)).into()
            })
    }

    async fn handle_health() -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "status": "healthy",
            "timestamp": Utc::now().to_rfc3339(),
        }))
    }

    /// Summary statistics over the trailing window; `null` when the window
    /// holds no sets
    async fn handle_stats(
        State(state): State<Arc<ServerState>>,
        headers: HeaderMap,
        Query(params): Query<AnalyticsQuery>,
    ) -> Result<Response, AppError> {
        let db = state
            .db
            .lock()
            .map_err(|_| LiftRsError::Internal("database lock poisoned".to_string()))?;
        let user_id = Self::authenticate(&headers, &db)?;
        let (exercise_id, days) = Self::validate_window(params.exercise_id, params.days)?;
        Self::check_ownership(&db, &user_id, &exercise_id)?;

        let since = Utc::now() - Duration::days(i64::from(days));
        let sets = db.fetch_sets_for_exercise(
            &user_id,
            &exercise_id,
            Some(since),
            SetOrder::Descending,
        )?;

        let stats = StatsCalculator::compute_stats(&sets);
        Ok((StatusCode::OK, Json(stats)).into_response())
    }

    /// Sparse per-day chart series over the trailing window
    async fn handle_chart(
        State(state): State<Arc<ServerState>>,
        headers: HeaderMap,
        Query(params): Query<AnalyticsQuery>,
    ) -> Result<Response, AppError> {
        let db = state
            .db
            .lock()
            .map_err(|_| LiftRsError::Internal("database lock poisoned".to_string()))?;
        let user_id = Self::authenticate(&headers, &db)?;
        let (exercise_id, days) = Self::validate_window(params.exercise_id, params.days)?;
        Self::check_ownership(&db, &user_id, &exercise_id)?;

        let since = Utc::now() - Duration::days(i64::from(days));
        let sets = db.fetch_sets_for_exercise(
            &user_id,
            &exercise_id,
            Some(since),
            SetOrder::Ascending,
        )?;

        let series = StatsCalculator::build_chart_series(&sets);
        Ok((StatusCode::OK, Json(series)).into_response())
    }

    /// Classify a proposed attempt against the exercise history
    async fn handle_overload(
        State(state): State<Arc<ServerState>>,
        headers: HeaderMap,
        Query(params): Query<OverloadQuery>,
    ) -> Result<Response, AppError> {
        let db = state
            .db
            .lock()
            .map_err(|_| LiftRsError::Internal("database lock poisoned".to_string()))?;
        let user_id = Self::authenticate(&headers, &db)?;
        let exercise_id = params
            .exercise_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| LiftRsError::Validation("exercise_id is required".to_string()))?;
        Self::check_ownership(&db, &user_id, &exercise_id)?;

        if let Some(weight) = params.weight {
            if weight < Decimal::ZERO {
                return Err(
                    LiftRsError::Validation("weight must be non-negative".to_string()).into(),
                );
            }
        }

        let current = CurrentAttempt::from_load(params.weight, params.reps);
        let week_start = Utc::now() - Duration::days(7);

        let last_set = db.fetch_last_set(&user_id, &exercise_id)?;
        let weekly_sets = db.fetch_weekly_sets(&user_id, &exercise_id, week_start)?;
        let best_set = db.fetch_all_time_best_set(&user_id, &exercise_id)?;

        let comparison = OverloadComparator::compare_overload(
            &exercise_id,
            current,
            last_set.as_ref(),
            &weekly_sets,
            best_set.as_ref(),
        );
        Ok((StatusCode::OK, Json(comparison)).into_response())
    }
}

/// Run the HTTP server until shutdown
pub async fn run_server(config: &AppConfig, db: Database) -> anyhow::Result<()> {
    let state = Arc::new(ServerState::new(db));
    let app = ApiRoutes::routes(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "analytics server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::NewSet;
    use axum::body::Body;
    use axum::http::Request;
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    fn seeded_router() -> (Router, String) {
        let db = Database::open_in_memory().unwrap();
        db.ensure_user("user_a", "Alice", Some("token_a")).unwrap();
        let exercise = db.ensure_exercise("user_a", "Squat").unwrap();

        let started = Utc::now() - Duration::days(2);
        let session_id = db.session_for("user_a", started).unwrap();
        db.insert_set(
            "user_a",
            &NewSet {
                exercise_id: exercise.id.clone(),
                session_id,
                weight: Some(dec!(100)),
                reps: Some(5),
                rpe: Some(dec!(8)),
                logged_at: started,
                session_started_at: started,
            },
        )
        .unwrap();

        let state = Arc::new(ServerState::new(db));
        (ApiRoutes::routes(state), exercise.id)
    }

    async fn get(router: Router, uri: &str, token: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let response = router
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (router, _) = seeded_router();
        let (status, body) = get(router, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_stats_returns_summary() {
        let (router, exercise_id) = seeded_router();
        let uri = format!("/api/stats?exercise_id={}", exercise_id);
        let (status, body) = get(router, &uri, Some("token_a")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_sets"], 1);
        assert_eq!(body["total_volume"], "500");
        assert_eq!(body["max_weight"], "100");
    }

    #[tokio::test]
    async fn test_stats_missing_exercise_id_is_400() {
        let (router, _) = seeded_router();
        let (status, body) = get(router, "/api/stats", Some("token_a")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("exercise_id"));
    }

    #[tokio::test]
    async fn test_stats_zero_days_is_400() {
        let (router, exercise_id) = seeded_router();
        let uri = format!("/api/stats?exercise_id={}&days=0", exercise_id);
        let (status, _) = get(router, &uri, Some("token_a")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_token_is_401() {
        let (router, exercise_id) = seeded_router();
        let uri = format!("/api/stats?exercise_id={}", exercise_id);
        let (status, _) = get(router, &uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_token_is_401() {
        let (router, exercise_id) = seeded_router();
        let uri = format!("/api/stats?exercise_id={}", exercise_id);
        let (status, _) = get(router, &uri, Some("bogus")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unowned_exercise_is_404() {
        let (router, _) = seeded_router();
        let (status, _) = get(router, "/api/stats?exercise_id=not-mine", Some("token_a")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stats_empty_window_is_null_not_error() {
        let (router, exercise_id) = seeded_router();
        // Window of 1 day misses the 2-day-old set
        let uri = format!("/api/stats?exercise_id={}&days=1", exercise_id);
        let (status, body) = get(router, &uri, Some("token_a")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn test_chart_returns_series() {
        let (router, exercise_id) = seeded_router();
        let uri = format!("/api/chart?exercise_id={}", exercise_id);
        let (status, body) = get(router, &uri, Some("token_a")).await;

        assert_eq!(status, StatusCode::OK);
        let series = body.as_array().unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0]["average_weight"], "100");
        assert_eq!(series[0]["average_rpe"], "8");
    }

    #[tokio::test]
    async fn test_overload_improved() {
        let (router, exercise_id) = seeded_router();
        // Stored last set has volume 500; 120x5 = 600
        let uri = format!(
            "/api/overload?exercise_id={}&weight=120&reps=5",
            exercise_id
        );
        let (status, body) = get(router, &uri, Some("token_a")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "improved");
        assert_eq!(body["last_session"]["volume"], "500");
        assert!(!body["weekly_average"]["volume"].is_null());
    }

    #[tokio::test]
    async fn test_overload_without_load_is_new() {
        let (router, exercise_id) = seeded_router();
        let uri = format!("/api/overload?exercise_id={}", exercise_id);
        let (status, body) = get(router, &uri, Some("token_a")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "new");
    }

    #[tokio::test]
    async fn test_overload_negative_weight_is_400() {
        let (router, exercise_id) = seeded_router();
        let uri = format!(
            "/api/overload?exercise_id={}&weight=-10&reps=5",
            exercise_id
        );
        let (status, _) = get(router, &uri, Some("token_a")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
