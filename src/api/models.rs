//! API request and response models
//!
//! Economy results are serialized as-is; only the request shapes and the
//! health payload live here.

use crate::player::{PlayerId, Profile};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Body naming an already-verified player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRequest {
    pub user_id: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertUserRequest {
    pub user_id: PlayerId,
    #[serde(flatten)]
    pub profile: Profile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitRequest {
    pub user_id: PlayerId,
    /// `stone` or `diamond`
    pub pickaxe: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRequest {
    pub user_id: PlayerId,
    pub direction: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyItemRequest {
    pub user_id: PlayerId,
    pub item: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralRequest {
    pub user_id: PlayerId,
    #[serde(default = "default_referral_count")]
    pub count: u64,
}

fn default_referral_count() -> u64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub user_id: PlayerId,
    pub payment_ref: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaderboardQuery {
    pub metric: Option<String>,
    pub limit: Option<usize>,
}
