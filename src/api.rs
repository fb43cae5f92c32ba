// 🌐 HTTP API - REST surface over the calculator, store and assistant
// Routes live under /api; every body uses the {success, data, error} envelope.

use crate::assistant::{Assistant, AssistantContext};
use crate::calculator::{compute, FinancialInput, FinancialResult};
use crate::presets::{IndustryPreset, PresetCatalog};
use crate::store::{self, FinancialRecord, RecordStore, StoreError, StoreResult};
use crate::view::{DashboardView, DisplayOptions};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub assistant: Arc<Assistant>,
    pub catalog: Arc<PresetCatalog>,
}

impl AppState {
    pub fn new(conn: Connection, assistant: Assistant) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            assistant: Arc::new(assistant),
            catalog: Arc::new(PresetCatalog::new()),
        }
    }

    /// Run a store operation under the connection lock. The guard never
    /// outlives the closure, so it cannot be held across an await.
    fn with_store<T>(&self, op: impl FnOnce(&Connection) -> StoreResult<T>) -> Result<T, ApiError> {
        let conn = self
            .db
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))?;
        Ok(op(&*conn)?)
    }
}

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    NotFound(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ApiError::NotFound(format!("Record not found: {}", id)),
            other => ApiError::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Store(e) => {
                tracing::error!(error = %e, "Store operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
        };
        (status, Json(ApiResponse::err(message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// Parameters currently on screen; when present the answer is about them
    /// instead of the saved history
    #[serde(default)]
    pub inputs: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub kpi_name: String,
    #[serde(default)]
    pub kpi_value: Value,
    #[serde(default)]
    pub business_data: Value,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Analysis {
    pub analysis: String,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: bool,
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub currency: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/health
async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/presets
async fn list_presets(State(state): State<AppState>) -> Json<ApiResponse<Vec<IndustryPreset>>> {
    Json(ApiResponse::ok(state.catalog.all().to_vec()))
}

/// GET /api/presets/:id - unknown ids get the manufacturing preset
async fn get_preset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<ApiResponse<IndustryPreset>> {
    let preset = state.catalog.get_or_default(&id);
    if preset.id != id {
        tracing::debug!(requested = %id, served = %preset.id, "Unknown preset, using default");
    }
    Json(ApiResponse::ok(preset.clone()))
}

/// POST /api/preview - compute without saving
async fn preview(Json(body): Json<Value>) -> Json<ApiResponse<FinancialResult>> {
    let inputs = FinancialInput::from_json(&body);
    Json(ApiResponse::ok(compute(&inputs)))
}

/// POST /api/compute - compute and save a new history entry
async fn compute_and_save(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<FinancialRecord> {
    let inputs = FinancialInput::from_json(&body);
    let record = state.with_store(|conn| store::compute_and_persist(conn, inputs))?;
    Ok(Json(ApiResponse::ok(record)))
}

/// GET /api/all - newest first
async fn all_records(State(state): State<AppState>) -> ApiResult<Vec<FinancialRecord>> {
    let records = state.with_store(|conn| store::list_records(conn))?;
    Ok(Json(ApiResponse::ok(records)))
}

/// GET /api/latest - data is null on an empty history
async fn latest(State(state): State<AppState>) -> ApiResult<Option<FinancialRecord>> {
    let record = state.with_store(|conn| store::latest_record(conn))?;
    Ok(Json(ApiResponse::ok(record)))
}

/// PUT /api/update/:id
async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<FinancialRecord> {
    let inputs = FinancialInput::from_json(&body);
    let record = state.with_store(|conn| store::recompute(conn, &id, inputs))?;
    Ok(Json(ApiResponse::ok(record)))
}

/// DELETE /api/delete/:id - deleting an unknown id is not an error
async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Deleted> {
    let deleted = state.with_store(|conn| store::delete_record(conn, &id))?;
    Ok(Json(ApiResponse::ok(Deleted { deleted })))
}

/// GET /api/dashboard?currency=€ - presentation model of the latest record
async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Option<DashboardView>> {
    let options = match query.currency {
        Some(symbol) if !symbol.is_empty() => DisplayOptions { currency_symbol: symbol },
        _ => DisplayOptions::default(),
    };

    let record = state.with_store(|conn| store::latest_record(conn))?;
    let view = record.map(|r| DashboardView::for_record(&r, &options));
    Ok(Json(ApiResponse::ok(view)))
}

/// POST /api/chat - answers over inline inputs, else the most recent history
async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> ApiResult<ChatReply> {
    if let Some(body) = &req.inputs {
        let inputs = FinancialInput::from_json(body);
        let results = compute(&inputs);
        let context = AssistantContext::Current {
            inputs: &inputs,
            results: &results,
        };
        let reply = state.assistant.ask(&req.message, &context).await;
        return Ok(Json(ApiResponse::ok(ChatReply { reply })));
    }

    let limit = state.assistant.history_limit();
    let history = state.with_store(|conn| conn.fetch_all(Some(limit)))?;

    let context = if history.is_empty() {
        AssistantContext::None
    } else {
        AssistantContext::History(&history)
    };
    let reply = state.assistant.ask(&req.message, &context).await;
    Ok(Json(ApiResponse::ok(ChatReply { reply })))
}

/// POST /api/analyze - explain a single KPI card
async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Json<ApiResponse<Analysis>> {
    let business = FinancialInput::from_json(&req.business_data);
    let value = match &req.kpi_value {
        Value::String(s) => s.clone(),
        Value::Null => "unknown".to_string(),
        other => other.to_string(),
    };

    let context = AssistantContext::Kpi {
        name: &req.kpi_name,
        value: &value,
        business: &business,
    };
    let analysis = state.assistant.ask(&req.message, &context).await;
    Json(ApiResponse::ok(Analysis { analysis }))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/presets", get(list_presets))
        .route("/presets/:id", get(get_preset))
        .route("/preview", post(preview))
        .route("/compute", post(compute_and_save))
        .route("/all", get(all_records))
        .route("/latest", get(latest))
        .route("/update/:id", put(update))
        .route("/delete/:id", delete(remove))
        .route("/dashboard", get(dashboard))
        .route("/chat", post(chat))
        .route("/analyze", post(analyze))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
