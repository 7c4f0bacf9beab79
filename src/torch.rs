//! Torch lifecycle: LIT -> OUT on expiry, * -> ETERNAL by purchase.
//!
//! Expiry is never scheduled. `evaluate` is the single re-entry point and the
//! economy calls it on every access, before any read or mutation, so the
//! transition fires at the first touch after `torch_expires_at`.

use crate::{clock::iso_week_key, player::Player};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TorchPhase {
    Lit,
    Out,
    Eternal,
}

pub fn phase(player: &Player) -> TorchPhase {
    if player.eternal_torch {
        TorchPhase::Eternal
    } else if player.torch_on {
        TorchPhase::Lit
    } else {
        TorchPhase::Out
    }
}

/// Seconds until expiry, clamped at zero and computed from `now` on every call
pub fn seconds_left(player: &Player, now: DateTime<Utc>) -> i64 {
    (player.torch_expires_at - now).num_seconds().max(0)
}

/// Penalty applied by an extinguish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extinguished {
    pub week_key: String,
    pub count_this_week: u32,
    pub rubies_before: u64,
    pub rubies_after: u64,
}

/// Fire LIT -> OUT if the torch has expired. Returns the applied penalty.
pub fn evaluate(player: &mut Player, now: DateTime<Utc>) -> Option<Extinguished> {
    if player.eternal_torch || !player.torch_on || now < player.torch_expires_at {
        return None;
    }

    let week_key = iso_week_key(now);
    if player.extinguish_week_key != week_key {
        player.extinguish_count = 0;
        player.extinguish_week_key = week_key.clone();
    }
    player.extinguish_count = player.extinguish_count.saturating_add(1);

    let rubies_before = player.rubies;
    player.rubies = match player.extinguish_count {
        1 => player.rubies / 2,
        _ => 0,
    };
    player.torch_on = false;

    info!(
        player_id = player.id,
        week = %week_key,
        count = player.extinguish_count,
        rubies_before,
        rubies_after = player.rubies,
        "Torch extinguished"
    );

    Some(Extinguished {
        week_key,
        count_this_week: player.extinguish_count,
        rubies_before,
        rubies_after: player.rubies,
    })
}

/// Torch summary returned by reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorchStatus {
    pub phase: TorchPhase,
    pub torch_on: bool,
    pub eternal: bool,
    pub seconds_left: i64,
    pub extinguish_count: u32,
}

pub fn status(player: &Player, now: DateTime<Utc>) -> TorchStatus {
    TorchStatus {
        phase: phase(player),
        torch_on: player.torch_on,
        eternal: player.eternal_torch,
        seconds_left: seconds_left(player, now),
        extinguish_count: player.extinguish_count,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickResult {
    pub rubies: u64,
    pub stars: u64,
    pub torch_on: bool,
    pub seconds_left: i64,
    /// Whether this call minted a ruby
    pub granted: bool,
}

/// Accrue one ruby while lit or eternal.
///
/// Expects `evaluate` to have run for `now`. At most one ruby is minted per
/// unix second, so retried or duplicated ticks inside the same second are
/// no-ops.
pub fn tick(player: &mut Player, now: DateTime<Utc>) -> TickResult {
    let second = now.timestamp();
    let accruing = phase(player) != TorchPhase::Out;
    let fresh_second = player.last_tick_at.map_or(true, |last| second > last);

    let granted = accruing && fresh_second;
    if granted {
        player.rubies = player.rubies.saturating_add(1);
        player.last_tick_at = Some(second);
    }

    TickResult {
        rubies: player.rubies,
        stars: player.stars,
        torch_on: player.torch_on,
        seconds_left: seconds_left(player, now),
        granted,
    }
}

/// One-way transition into ETERNAL
pub fn make_eternal(player: &mut Player) {
    player.eternal_torch = true;
    player.torch_on = true;
}

/// 9999-12-31T23:59:59Z, the latest expiry a record will hold
pub const LATEST_EXPIRY_TIMESTAMP: i64 = 253_402_300_799;

/// Push the expiry out, saturating at `LATEST_EXPIRY_TIMESTAMP`. Does not
/// relight an extinguished torch. Returns the seconds actually added.
pub fn extend(player: &mut Player, by_secs: i64) -> i64 {
    let current = player.torch_expires_at.timestamp();
    if by_secs <= 0 || current >= LATEST_EXPIRY_TIMESTAMP {
        return 0;
    }

    let target = current.saturating_add(by_secs).min(LATEST_EXPIRY_TIMESTAMP);
    let nanos = player.torch_expires_at.timestamp_subsec_nanos();
    match DateTime::<Utc>::from_timestamp(target, nanos) {
        Some(expires_at) => {
            player.torch_expires_at = expires_at;
            target - current
        }
        None => 0,
    }
}
