//! Player record and its public projections

use crate::{
    mining::{BlockType, Lane},
    torch::{self, TorchPhase},
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Verified numeric identity supplied by the auth collaborator
pub type PlayerId = u64;

/// Display fields owned by the auth collaborator; opaque to the economy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Progress of one lane. `block == None` means no block has been drawn yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningLane {
    pub block: Option<BlockType>,
    pub hits_required: u32,
    pub hits_done: u32,
}

impl MiningLane {
    pub fn view(&self) -> LaneView {
        LaneView {
            block_type: self.block,
            hits_required: self.hits_required,
            hits_done: self.hits_done,
            hits_left: self.hits_required.saturating_sub(self.hits_done),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneView {
    pub block_type: Option<BlockType>,
    pub hits_required: u32,
    pub hits_done: u32,
    pub hits_left: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub name: String,
    pub count: u64,
}

/// Durable per-player state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub profile: Profile,
    pub rubies: u64,
    pub stars: u64,

    pub torch_on: bool,
    pub torch_expires_at: DateTime<Utc>,
    pub eternal_torch: bool,
    pub extinguish_count: u32,
    pub extinguish_week_key: String,
    /// Unix second of the last granted tick
    #[serde(default)]
    pub last_tick_at: Option<i64>,

    pub onboarding_seen: bool,

    pub stone_pickaxes: u64,
    pub diamond_pickaxes: u64,
    pub stone_lane: MiningLane,
    pub diamond_lane: MiningLane,
    pub stars_earned_mine: u64,

    pub referral_boost: bool,
    #[serde(default)]
    pub referral_count: u64,
    pub last_daily_claim: Option<NaiveDate>,

    #[serde(default)]
    pub inventory: Vec<InventoryEntry>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped by every commit
    #[serde(default)]
    pub revision: u64,
}

impl Player {
    /// Record created on first contact: lit torch, empty balances and lanes
    pub fn new(id: PlayerId, profile: Profile, now: DateTime<Utc>, torch_lifetime_secs: i64) -> Self {
        Self {
            id,
            profile,
            rubies: 0,
            stars: 0,
            torch_on: true,
            torch_expires_at: now + Duration::seconds(torch_lifetime_secs),
            eternal_torch: false,
            extinguish_count: 0,
            extinguish_week_key: crate::clock::iso_week_key(now),
            last_tick_at: None,
            onboarding_seen: false,
            stone_pickaxes: 0,
            diamond_pickaxes: 0,
            stone_lane: MiningLane::default(),
            diamond_lane: MiningLane::default(),
            stars_earned_mine: 0,
            referral_boost: false,
            referral_count: 0,
            last_daily_claim: None,
            inventory: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    pub fn lane(&self, lane: Lane) -> &MiningLane {
        match lane {
            Lane::Stone => &self.stone_lane,
            Lane::Diamond => &self.diamond_lane,
        }
    }

    pub fn lane_mut(&mut self, lane: Lane) -> &mut MiningLane {
        match lane {
            Lane::Stone => &mut self.stone_lane,
            Lane::Diamond => &mut self.diamond_lane,
        }
    }

    pub fn charges(&self, lane: Lane) -> u64 {
        match lane {
            Lane::Stone => self.stone_pickaxes,
            Lane::Diamond => self.diamond_pickaxes,
        }
    }

    pub fn charges_mut(&mut self, lane: Lane) -> &mut u64 {
        match lane {
            Lane::Stone => &mut self.stone_pickaxes,
            Lane::Diamond => &mut self.diamond_pickaxes,
        }
    }

    /// Increment the entry for `name`, creating it on first drop
    pub fn add_collectible(&mut self, name: &str) {
        match self.inventory.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.count = entry.count.saturating_add(1),
            None => self.inventory.push(InventoryEntry {
                name: name.to_string(),
                count: 1,
            }),
        }
    }

    /// Inventory ordered by count descending, then name
    pub fn sorted_inventory(&self) -> Vec<InventoryEntry> {
        let mut items = self.inventory.clone();
        items.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        items
    }

    pub fn view(&self, now: DateTime<Utc>) -> PlayerView {
        PlayerView {
            id: self.id,
            profile: self.profile.clone(),
            rubies: self.rubies,
            stars: self.stars,
            torch: torch::phase(self),
            torch_on: self.torch_on,
            seconds_left: torch::seconds_left(self, now),
            extinguish_count: self.extinguish_count,
            eternal_torch: self.eternal_torch,
            onboarding_seen: self.onboarding_seen,
            stone_pickaxes: self.stone_pickaxes,
            diamond_pickaxes: self.diamond_pickaxes,
            stone: self.stone_lane.view(),
            diamond: self.diamond_lane.view(),
            stars_earned_mine: self.stars_earned_mine,
            referral_boost: self.referral_boost,
            referral_count: self.referral_count,
            last_daily_claim: self.last_daily_claim,
            inventory: self.sorted_inventory(),
        }
    }
}

/// Public projection returned to collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    #[serde(flatten)]
    pub profile: Profile,
    pub rubies: u64,
    pub stars: u64,
    pub torch: TorchPhase,
    pub torch_on: bool,
    pub seconds_left: i64,
    pub extinguish_count: u32,
    pub eternal_torch: bool,
    pub onboarding_seen: bool,
    pub stone_pickaxes: u64,
    pub diamond_pickaxes: u64,
    pub stone: LaneView,
    pub diamond: LaneView,
    pub stars_earned_mine: u64,
    pub referral_boost: bool,
    pub referral_count: u64,
    pub last_daily_claim: Option<NaiveDate>,
    pub inventory: Vec<InventoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_player_defaults() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 9, 30, 0).unwrap();
        let player = Player::new(77, Profile::default(), now, 86_400);

        assert_eq!(player.rubies, 0);
        assert_eq!(player.stars, 0);
        assert!(player.torch_on);
        assert_eq!(player.torch_expires_at, now + Duration::hours(24));
        assert_eq!(player.extinguish_week_key, "2026-W42");
        assert_eq!(player.stone_lane, MiningLane::default());

        let view = player.view(now);
        assert_eq!(view.torch, TorchPhase::Lit);
        assert_eq!(view.seconds_left, 86_400);
    }

    #[test]
    fn test_add_collectible_increments_existing_entry() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        let mut player = Player::new(1, Profile::default(), now, 60);

        player.add_collectible("Swag Bag");
        player.add_collectible("Low Rider");
        player.add_collectible("Swag Bag");

        let items = player.sorted_inventory();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], InventoryEntry { name: "Swag Bag".into(), count: 2 });
        assert_eq!(items[1].name, "Low Rider");
    }

    #[test]
    fn test_record_survives_json_round_trip() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        let mut player = Player::new(5, Profile { username: Some("miner".into()), ..Default::default() }, now, 60);
        player.stone_lane = MiningLane { block: Some(BlockType::Wood), hits_required: 4, hits_done: 2 };
        player.last_daily_claim = Some(now.date_naive());

        let bytes = serde_json::to_vec(&player).unwrap();
        let decoded: Player = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, player);
    }
}
