//! REST API
//!
//! HTTP endpoints for managing tracked items, reading price history, and
//! triggering check runs.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::{
    check_engine::CheckEngine,
    cooldown::CooldownTracker,
    error::{Result, TrackerError},
    history::HistoryStore,
    registry::ItemRegistry,
    steam::PriceSource,
    store::Store,
    types::{parse_store_url, CheckSummary, PriceObservation, TrackedItem},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: ItemRegistry,
    pub history: HistoryStore,
    pub cooldown: CooldownTracker,
    pub source: Arc<dyn PriceSource>,
    pub engine: CheckEngine,
    pub store: Arc<dyn Store>,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/games",
            get(list_items).post(add_item).delete(remove_item),
        )
        .route("/games/:id", get(get_item))
        .route("/games/:id/history", get(get_history))
        .route("/check", get(run_check))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// ITEM ENDPOINTS
// ============================================================================

/// POST /games
///
/// Track an item by its store page URL and a target price.
async fn add_item(
    State(state): State<AppState>,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<ItemResponse>> {
    let (kind, id) = parse_store_url(&request.url)?;

    if request.target_price <= Decimal::ZERO {
        return Err(TrackerError::Validation(
            "target_price must be positive".to_string(),
        ));
    }

    // Registration requires a successful storefront lookup; it also
    // captures the display name.
    let listing = state.source.lookup(kind, &id).await?;

    let item = TrackedItem {
        id,
        kind,
        name: listing.name,
        target_price: request.target_price,
    };
    state.registry.put(&item).await?;

    info!(
        "Tracking {} ({} {}) at target {}",
        item.name, item.kind, item.id, item.target_price
    );

    Ok(Json(ItemResponse {
        success: true,
        data: item,
    }))
}

/// GET /games
///
/// List all tracked items.
async fn list_items(State(state): State<AppState>) -> Result<Json<ItemListResponse>> {
    let items = state.registry.list().await?;

    Ok(Json(ItemListResponse {
        success: true,
        count: items.len(),
        data: items,
    }))
}

/// GET /games/:id
///
/// One tracked item with its live price and the lowest retained price.
async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ItemStatsResponse>> {
    let item = state
        .registry
        .get(&id)
        .await?
        .ok_or_else(|| TrackerError::NotFound(format!("no tracked item with id {}", id)))?;

    let current = state.source.fetch_price(&item).await;
    let lowest_price = state.history.lowest(&item.id, current.as_ref()).await?;

    Ok(Json(ItemStatsResponse {
        success: true,
        data: ItemStats {
            item,
            current,
            lowest_price,
        },
    }))
}

/// GET /games/:id/history
///
/// Retained price history in chronological order. An untracked or removed
/// id reads as an empty series.
async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>> {
    let entries = state.history.list(&id).await?;

    Ok(Json(HistoryResponse {
        success: true,
        count: entries.len(),
        data: entries,
    }))
}

/// DELETE /games
///
/// Stop tracking an item, by store URL or bare id. Also drops its history
/// and cooldown records (best-effort).
async fn remove_item(
    State(state): State<AppState>,
    Json(request): Json<RemoveItemRequest>,
) -> Result<Json<RemoveResponse>> {
    let id = match (&request.url, &request.id) {
        (Some(url), _) => parse_store_url(url)?.1,
        (None, Some(id)) => id.clone(),
        (None, None) => {
            return Err(TrackerError::Validation(
                "provide url or id".to_string(),
            ))
        }
    };

    if !state.registry.remove(&id).await? {
        return Err(TrackerError::NotFound(format!(
            "no tracked item with id {}",
            id
        )));
    }

    // Best-effort cascade; these keys are unreachable without the registry
    // record anyway.
    if let Err(e) = state.history.clear(&id).await {
        tracing::warn!("Failed to clear history for {}: {}", id, e);
    }
    if let Err(e) = state.cooldown.clear(&id).await {
        tracing::warn!("Failed to clear cooldown for {}: {}", id, e);
    }

    info!("Stopped tracking item {}", id);

    Ok(Json(RemoveResponse {
        success: true,
        data: RemovedItem { id },
    }))
}

// ============================================================================
// CHECK & HEALTH ENDPOINTS
// ============================================================================

/// GET /check
///
/// Run one price check over the whole registry.
async fn run_check(State(state): State<AppState>) -> Result<Json<CheckResponse>> {
    let summary = state.engine.run_check().await?;

    Ok(Json(CheckResponse {
        success: true,
        data: summary,
    }))
}

/// GET /health
///
/// Store connectivity check.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_healthy = state.store.ping().await;

    Json(HealthResponse {
        success: store_healthy,
        store: store_healthy,
        timestamp: chrono::Utc::now().timestamp(),
    })
}

// ============================================================================
// REQUEST/RESPONSE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub url: String,
    pub target_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct RemoveItemRequest {
    pub url: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub success: bool,
    pub data: TrackedItem,
}

#[derive(Debug, Serialize)]
pub struct ItemListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<TrackedItem>,
}

#[derive(Debug, Serialize)]
pub struct ItemStats {
    pub item: TrackedItem,
    pub current: Option<PriceObservation>,
    pub lowest_price: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct ItemStatsResponse {
    pub success: bool,
    pub data: ItemStats,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<PriceObservation>,
}

#[derive(Debug, Serialize)]
pub struct RemovedItem {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub success: bool,
    pub data: RemovedItem,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub success: bool,
    pub data: CheckSummary,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub store: bool,
    pub timestamp: i64,
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            TrackerError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            TrackerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            TrackerError::NotAvailable(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            TrackerError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            TrackerError::Redis(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("store error: {}", e),
            ),
            TrackerError::Parse(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}
