//! Request Handlers
//!
//! Each handler validates the request shape, then runs the economy operation on
//! the blocking pool. Economy calls hold a player lock and touch RocksDB, so
//! they never run on the async workers.

use super::{errors::ApiError, middleware::RequestId, models::*};
use crate::{
    config::ApiConfig,
    economy::{Economy, PurchasedStars},
    errors::{EconomyError, MinestarsResult},
    leaderboard::{Leaderboard, LeaderboardMetric},
    metrics::EconomyMetrics,
    mining::{HitOutcome, Lane, MineState},
    player::{InventoryEntry, PlayerId, PlayerView},
    shop::{DailyClaim, DiamondPickaxePurchase, ExchangeDirection, ExchangeResult, ItemPurchase, ShopItem},
    torch::{TickResult, TorchStatus},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub economy: Arc<Economy>,
    pub metrics: Arc<EconomyMetrics>,
    pub api: ApiConfig,
    pub metrics_enabled: bool,
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn run_economy<T, F>(state: &AppState, request_id: &RequestId, op: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Economy) -> MinestarsResult<T> + Send + 'static,
{
    let economy = Arc::clone(&state.economy);
    let result = tokio::task::spawn_blocking(move || op(&economy))
        .await
        .map_err(|e| ApiError::internal_error(request_id.0.clone(), format!("Economy worker failed: {}", e)))?;

    state.metrics.record_http_request(result.is_ok());
    result
        .map(Json)
        .map_err(|e| ApiError::from_economy(request_id.0.clone(), e))
}

fn parse<T>(state: &AppState, request_id: &RequestId, raw: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr<Err = EconomyError>,
{
    raw.parse().map_err(|e| {
        state.metrics.record_http_request(false);
        ApiError::from_economy(request_id.0.clone(), e)
    })
}

/// Turn an extractor rejection (malformed JSON, missing field, non-numeric
/// id) into the standard error envelope
fn extracted<T, R: std::fmt::Display>(state: &AppState, request_id: &RequestId, value: Result<T, R>) -> Result<T, ApiError> {
    value.map_err(|rejection| {
        state.metrics.record_http_request(false);
        ApiError::bad_request(request_id.0.clone(), "invalid_request", rejection.to_string())
    })
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus_format(),
    )
}

/// POST /api/user
pub async fn upsert_user_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    body: Result<Json<UpsertUserRequest>, JsonRejection>,
) -> ApiResult<PlayerView> {
    let Json(req) = extracted(&state, &request_id, body)?;
    run_economy(&state, &request_id, move |economy| economy.upsert_player(req.user_id, req.profile)).await
}

/// GET /api/user/:id
pub async fn get_user_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    path: Result<Path<PlayerId>, PathRejection>,
) -> ApiResult<PlayerView> {
    let Path(id) = extracted(&state, &request_id, path)?;
    run_economy(&state, &request_id, move |economy| economy.get_player(id)).await
}

/// POST /api/onboarding-seen
pub async fn onboarding_seen_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    body: Result<Json<UserRequest>, JsonRejection>,
) -> ApiResult<PlayerView> {
    let Json(req) = extracted(&state, &request_id, body)?;
    run_economy(&state, &request_id, move |economy| economy.mark_onboarding_seen(req.user_id)).await
}

/// POST /api/tick
pub async fn tick_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    body: Result<Json<UserRequest>, JsonRejection>,
) -> ApiResult<TickResult> {
    let Json(req) = extracted(&state, &request_id, body)?;
    run_economy(&state, &request_id, move |economy| economy.tick(req.user_id)).await
}

/// GET /api/torch/:id
pub async fn torch_state_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    path: Result<Path<PlayerId>, PathRejection>,
) -> ApiResult<TorchStatus> {
    let Path(id) = extracted(&state, &request_id, path)?;
    run_economy(&state, &request_id, move |economy| economy.torch_state(id)).await
}

/// GET /api/mine/state/:id
pub async fn mine_state_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    path: Result<Path<PlayerId>, PathRejection>,
) -> ApiResult<MineState> {
    let Path(id) = extracted(&state, &request_id, path)?;
    run_economy(&state, &request_id, move |economy| economy.mine_state(id)).await
}

/// POST /api/mine/hit
pub async fn hit_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    body: Result<Json<HitRequest>, JsonRejection>,
) -> ApiResult<HitOutcome> {
    let Json(req) = extracted(&state, &request_id, body)?;
    let lane: Lane = parse(&state, &request_id, &req.pickaxe)?;
    run_economy(&state, &request_id, move |economy| economy.hit(req.user_id, lane)).await
}

/// POST /api/mine/daily-claim
pub async fn daily_claim_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    body: Result<Json<UserRequest>, JsonRejection>,
) -> ApiResult<DailyClaim> {
    let Json(req) = extracted(&state, &request_id, body)?;
    run_economy(&state, &request_id, move |economy| economy.claim_daily(req.user_id)).await
}

/// POST /api/mine/purchase-dpick
pub async fn purchase_diamond_pickaxe_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    body: Result<Json<UserRequest>, JsonRejection>,
) -> ApiResult<DiamondPickaxePurchase> {
    let Json(req) = extracted(&state, &request_id, body)?;
    run_economy(&state, &request_id, move |economy| economy.buy_diamond_pickaxe(req.user_id)).await
}

/// POST /api/shop/exchange
pub async fn exchange_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    body: Result<Json<ExchangeRequest>, JsonRejection>,
) -> ApiResult<ExchangeResult> {
    let Json(req) = extracted(&state, &request_id, body)?;
    let direction: ExchangeDirection = parse(&state, &request_id, &req.direction)?;
    run_economy(&state, &request_id, move |economy| {
        economy.exchange(req.user_id, direction, req.amount)
    })
    .await
}

/// POST /api/shop/buy
pub async fn buy_item_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    body: Result<Json<BuyItemRequest>, JsonRejection>,
) -> ApiResult<ItemPurchase> {
    let Json(req) = extracted(&state, &request_id, body)?;
    let item: ShopItem = parse(&state, &request_id, &req.item)?;
    run_economy(&state, &request_id, move |economy| economy.buy_item(req.user_id, item)).await
}

/// POST /api/referrals/credit
pub async fn referral_credit_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    body: Result<Json<ReferralRequest>, JsonRejection>,
) -> ApiResult<PlayerView> {
    let Json(req) = extracted(&state, &request_id, body)?;
    run_economy(&state, &request_id, move |economy| {
        economy.credit_referral(req.user_id, req.count)
    })
    .await
}

/// POST /api/payments/credit
pub async fn payment_credit_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    body: Result<Json<PaymentRequest>, JsonRejection>,
) -> ApiResult<PurchasedStars> {
    let Json(req) = extracted(&state, &request_id, body)?;
    run_economy(&state, &request_id, move |economy| {
        economy.credit_purchased_stars(req.user_id, &req.payment_ref, req.amount)
    })
    .await
}

/// GET /api/inventory/:id
pub async fn inventory_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    path: Result<Path<PlayerId>, PathRejection>,
) -> ApiResult<Vec<InventoryEntry>> {
    let Path(id) = extracted(&state, &request_id, path)?;
    run_economy(&state, &request_id, move |economy| economy.inventory(id)).await
}

/// GET /api/leaderboard?metric=rubies|mining&limit=N
pub async fn leaderboard_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> ApiResult<Leaderboard> {
    let Query(query) = extracted(&state, &request_id, query)?;
    let metric: LeaderboardMetric = match query.metric.as_deref() {
        Some(raw) => parse(&state, &request_id, raw)?,
        None => LeaderboardMetric::Rubies,
    };
    let limit = query
        .limit
        .unwrap_or(state.api.leaderboard_default_limit)
        .min(state.api.leaderboard_max_limit);

    run_economy(&state, &request_id, move |economy| economy.leaderboard(metric, limit)).await
}
