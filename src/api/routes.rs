//! Route Definitions

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new().route("/health", get(health_handler));
    if state.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        // Players
        .route("/api/user", post(upsert_user_handler))
        .route("/api/user/:id", get(get_user_handler))
        .route("/api/onboarding-seen", post(onboarding_seen_handler))
        // Torch
        .route("/api/tick", post(tick_handler))
        .route("/api/torch/:id", get(torch_state_handler))
        // Mining
        .route("/api/mine/state/:id", get(mine_state_handler))
        .route("/api/mine/hit", post(hit_handler))
        .route("/api/mine/daily-claim", post(daily_claim_handler))
        .route("/api/mine/purchase-dpick", post(purchase_diamond_pickaxe_handler))
        // Shop and ledger
        .route("/api/shop/exchange", post(exchange_handler))
        .route("/api/shop/buy", post(buy_item_handler))
        .route("/api/referrals/credit", post(referral_credit_handler))
        .route("/api/payments/credit", post(payment_credit_handler))
        // Read models
        .route("/api/inventory/:id", get(inventory_handler))
        .route("/api/leaderboard", get(leaderboard_handler))
        .with_state(state)
}
