//! HTTP API - REST endpoints over the tracker

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::db::{Exercise, Storage, Workout, WorkoutPlan};
use crate::plan::{FileFormat, IngestError, Plan, ingest};
use crate::tracker::{self, DayView, ProgressReport};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared handler state.
///
/// Every request holds the store lock for its whole operation, so
/// progress read-modify-write cycles never interleave.
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<Box<dyn Storage + Send>>>,
    user_id: i64,
}

impl AppState {
    pub fn new(mut store: Box<dyn Storage + Send>) -> Result<Self> {
        let user_id = tracker::ensure_default_user(&mut *store)?;
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            user_id,
        })
    }
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
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        error!("Request failed: {err:#}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        warn!("Rejected workout plan: {err}");
        Self::bad_request(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, AppError>;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/workout-plans", get(list_plans).post(create_plan))
        .route("/api/workout-plans/upload/{format}", post(upload_plan))
        .route("/api/workout-plans/{id}", get(get_plan))
        .route("/api/workout-plans/{id}/workouts", get(list_workouts))
        .route("/api/workout-plans/{id}/workouts/day/{day}", get(get_day))
        .route("/api/workout-plans/{id}/progress", get(get_progress))
        .route("/api/workout-plans/{id}/export", get(export_plan))
        .route("/api/workouts/{id}/complete", put(complete_workout))
        .route("/api/exercises/{id}/complete", put(complete_exercise))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("fitplan serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("fitplan serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {e}");
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_plans(State(state): State<AppState>) -> ApiResult<Json<Vec<WorkoutPlan>>> {
    let store = state.store.lock().await;
    Ok(Json(store.plans()?))
}

async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<WorkoutPlan>> {
    let store = state.store.lock().await;
    let plan = store
        .plan(id)?
        .ok_or_else(|| AppError::not_found("Workout plan not found"))?;
    Ok(Json(plan))
}

/// JSON body, as sent by the manual entry form
async fn create_plan(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let plan = ingest(&body, FileFormat::Json)?;
    store_plan(&state, &plan).await
}

/// Raw file upload in the format named by the path
async fn upload_plan(
    State(state): State<AppState>,
    Path(format): Path<String>,
    body: Bytes,
) -> ApiResult<Response> {
    let format: FileFormat = format.parse()?;
    let plan = ingest(&body, format)?;
    store_plan(&state, &plan).await
}

async fn store_plan(state: &AppState, plan: &Plan) -> ApiResult<Response> {
    let mut store = state.store.lock().await;
    let row = tracker::import_plan(&mut **store, state.user_id, plan)?;
    Ok((StatusCode::CREATED, Json(row)).into_response())
}

async fn list_workouts(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Workout>>> {
    let store = state.store.lock().await;
    Ok(Json(store.workouts_for_plan(id)?))
}

async fn get_day(
    State(state): State<AppState>,
    Path((id, day)): Path<(i64, u32)>,
) -> ApiResult<Json<DayView>> {
    let store = state.store.lock().await;
    let view = tracker::day_view(&**store, id, day)?
        .ok_or_else(|| AppError::not_found("Workout not found"))?;
    Ok(Json(view))
}

async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ProgressReport>> {
    let store = state.store.lock().await;
    let report = tracker::progress_report(&**store, state.user_id, id)?
        .ok_or_else(|| AppError::not_found("Progress not found"))?;
    Ok(Json(report))
}

async fn export_plan(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Plan>> {
    let store = state.store.lock().await;
    let plan = tracker::export_plan(&**store, id)?
        .ok_or_else(|| AppError::not_found("Workout plan not found"))?;
    Ok(Json(plan))
}

async fn complete_workout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Workout>> {
    let mut store = state.store.lock().await;
    let workout = tracker::complete_workout(&mut **store, state.user_id, id)?
        .ok_or_else(|| AppError::not_found("Workout not found"))?;
    Ok(Json(workout))
}

async fn complete_exercise(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Exercise>> {
    let mut store = state.store.lock().await;
    let exercise = tracker::complete_exercise(&mut **store, id)?
        .ok_or_else(|| AppError::not_found("Exercise not found"))?;
    Ok(Json(exercise))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::db::MemStorage;

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    fn app() -> Router {
        let state = AppState::new(Box::new(MemStorage::new())).unwrap();
        build_router(state)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: impl Into<Body>) -> Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(body.into())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn plan_body() -> String {
        json!({
            "name": "Starter",
            "totalDays": 3,
            "workouts": [
                { "day": 1, "name": "Push", "exercises": [
                    { "name": "Push-ups", "sets": 3, "reps": "10" },
                    { "name": "Dips", "sets": 2, "reps": "8", "notes": "Slow" }
                ]},
                { "day": 2, "name": "Pull", "notes": "Grip", "exercises": [
                    { "name": "Rows", "sets": 3, "reps": "12" }
                ]}
            ]
        })
        .to_string()
    }

    async fn create(app: &Router) -> i64 {
        let resp = send(app, Method::POST, "/api/workout-plans", plan_body()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await["id"].as_i64().unwrap()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_list_plans_empty() {
        let app = app();
        let resp = send(&app, Method::GET, "/api/workout-plans", Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!([]));
    }

    #[tokio::test]
    async fn test_create_and_get_plan() {
        let app = app();
        let id = create(&app).await;

        let resp = send(&app, Method::GET, &format!("/api/workout-plans/{id}"), Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["name"], "Starter");
        assert_eq!(json["totalDays"], 3);

        let resp = send(&app, Method::GET, "/api/workout-plans", Body::empty()).await;
        assert_eq!(body_json(resp).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_plan_validation_error() {
        let app = app();
        let body = json!({ "name": "Bad", "totalDays": 3, "workouts": [{ "day": "one" }] });
        let resp = send(&app, Method::POST, "/api/workout-plans", body.to_string()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(json["message"].as_str().unwrap().contains("workouts[0].day"));
    }

    #[tokio::test]
    async fn test_upload_csv() {
        let app = app();
        let csv = "Quick,14\nDay,Workout,Notes,Exercise,Sets,Reps,Notes\n1,Legs,,Squat,3,10,\n1,Legs,,Lunge,3,12,\n";
        let resp = send(&app, Method::POST, "/api/workout-plans/upload/csv", csv).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let id = body_json(resp).await["id"].as_i64().unwrap();

        let uri = format!("/api/workout-plans/{id}/workouts/day/1");
        let json = body_json(send(&app, Method::GET, &uri, Body::empty()).await).await;
        assert_eq!(json["workout"]["name"], "Legs");
        assert_eq!(json["exercises"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upload_rejects_unknown_format_and_short_csv() {
        let app = app();
        let resp = send(&app, Method::POST, "/api/workout-plans/upload/xml", "<plan/>").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(&app, Method::POST, "/api/workout-plans/upload/csv", "Plan,7\nheader\n").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["message"], "CSV file must contain at least 3 lines");
    }

    #[tokio::test]
    async fn test_get_plan_not_found_and_bad_id() {
        let app = app();
        let resp = send(&app, Method::GET, "/api/workout-plans/42", Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["message"], "Workout plan not found");

        let resp = send(&app, Method::GET, "/api/workout-plans/abc", Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_workouts_ordered_by_day() {
        let app = app();
        let id = create(&app).await;
        let uri = format!("/api/workout-plans/{id}/workouts");
        let json = body_json(send(&app, Method::GET, &uri, Body::empty()).await).await;
        let days: Vec<i64> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["day"].as_i64().unwrap())
            .collect();
        assert_eq!(days, vec![1, 2]);
        assert_eq!(json[0]["isCompleted"], false);
    }

    #[tokio::test]
    async fn test_complete_workout_updates_progress() {
        let app = app();
        let id = create(&app).await;

        let uri = format!("/api/workout-plans/{id}/workouts/day/1");
        let day = body_json(send(&app, Method::GET, &uri, Body::empty()).await).await;
        let workout_id = day["workout"]["id"].as_i64().unwrap();

        let resp = send(&app, Method::PUT, &format!("/api/workouts/{workout_id}/complete"), Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["isCompleted"], true);
        assert!(json["completedAt"].is_string());

        let uri = format!("/api/workout-plans/{id}/progress");
        let report = body_json(send(&app, Method::GET, &uri, Body::empty()).await).await;
        assert_eq!(report["progress"]["completedDays"], 1);
        assert_eq!(report["progress"]["currentStreak"], 1);
        assert_eq!(report["progress"]["currentDay"], 2);
        assert_eq!(report["completionPercentage"], 33);
        assert_eq!(report["totalDays"], 3);
        assert_eq!(report["recentCompletedWorkouts"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_missing_rows() {
        let app = app();
        let resp = send(&app, Method::PUT, "/api/workouts/5/complete", Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = send(&app, Method::PUT, "/api/exercises/5/complete", Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = send(&app, Method::GET, "/api/workout-plans/5/progress", Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_complete_exercise() {
        let app = app();
        let id = create(&app).await;
        let uri = format!("/api/workout-plans/{id}/workouts/day/2");
        let day = body_json(send(&app, Method::GET, &uri, Body::empty()).await).await;
        let exercise_id = day["exercises"][0]["id"].as_i64().unwrap();

        let uri = format!("/api/exercises/{exercise_id}/complete");
        let json = body_json(send(&app, Method::PUT, &uri, Body::empty()).await).await;
        assert_eq!(json["isCompleted"], true);
        assert_eq!(json["name"], "Rows");
    }

    #[tokio::test]
    async fn test_export_round_trips_plan() {
        let app = app();
        let id = create(&app).await;
        let uri = format!("/api/workout-plans/{id}/export");
        let json = body_json(send(&app, Method::GET, &uri, Body::empty()).await).await;
        let expected: Value = serde_json::from_str(&plan_body()).unwrap();
        assert_eq!(json, expected);
    }
}
