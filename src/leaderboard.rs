//! Ranked read projections over the player store.
//!
//! The RocksDB store keeps one secondary index per metric. Key layout:
//! `prefix | inv_value(be) | player_id(be)`, so a forward prefix scan yields
//! the highest value first and breaks ties by ascending player id. The index
//! value is a small JSON summary, letting a board be served from one snapshot
//! scan without touching player records.

use crate::{
    errors::{EconomyError, MinestarsResult, StorageError},
    player::{Player, PlayerId, Profile},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

const RUBIES_PREFIX: &[u8] = b"lb:rubies:";
const MINING_PREFIX: &[u8] = b"lb:mine:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardMetric {
    Rubies,
    MiningStars,
}

impl LeaderboardMetric {
    pub const ALL: [LeaderboardMetric; 2] = [LeaderboardMetric::Rubies, LeaderboardMetric::MiningStars];

    pub fn value_of(self, player: &Player) -> u64 {
        match self {
            LeaderboardMetric::Rubies => player.rubies,
            LeaderboardMetric::MiningStars => player.stars_earned_mine,
        }
    }

    pub fn index_prefix(self) -> &'static [u8] {
        match self {
            LeaderboardMetric::Rubies => RUBIES_PREFIX,
            LeaderboardMetric::MiningStars => MINING_PREFIX,
        }
    }

    pub fn index_key(self, value: u64, player_id: PlayerId) -> Vec<u8> {
        let prefix = self.index_prefix();
        let mut key = Vec::with_capacity(prefix.len() + 16);
        key.extend_from_slice(prefix);
        key.extend_from_slice(&(u64::MAX - value).to_be_bytes());
        key.extend_from_slice(&player_id.to_be_bytes());
        key
    }
}

impl fmt::Display for LeaderboardMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaderboardMetric::Rubies => write!(f, "rubies"),
            LeaderboardMetric::MiningStars => write!(f, "mining"),
        }
    }
}

impl FromStr for LeaderboardMetric {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rubies" => Ok(LeaderboardMetric::Rubies),
            "mining" | "mining_stars" | "miningStars" => Ok(LeaderboardMetric::MiningStars),
            other => Err(EconomyError::InvalidMetric(other.to_string())),
        }
    }
}

/// Denormalized row stored as the rank index value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedPlayer {
    pub player_id: PlayerId,
    #[serde(flatten)]
    pub profile: Profile,
    pub value: u64,
}

impl RankedPlayer {
    pub fn of(player: &Player, metric: LeaderboardMetric) -> Self {
        Self {
            player_id: player.id,
            profile: player.profile.clone(),
            value: metric.value_of(player),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub player_id: PlayerId,
    #[serde(flatten)]
    pub profile: Profile,
    pub value: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    pub metric: LeaderboardMetric,
    pub entries: Vec<LeaderboardEntry>,
}

fn assign_ranks(rows: impl IntoIterator<Item = RankedPlayer>) -> Vec<LeaderboardEntry> {
    rows.into_iter()
        .zip(1u32..)
        .map(|(row, rank)| LeaderboardEntry {
            rank,
            player_id: row.player_id,
            profile: row.profile,
            value: row.value,
        })
        .collect()
}

/// Decode index rows produced by a prefix scan, already in rank order
pub fn from_index_rows(rows: Vec<(Vec<u8>, Vec<u8>)>) -> MinestarsResult<Vec<LeaderboardEntry>> {
    let ranked = rows
        .into_iter()
        .map(|(key, value)| {
            serde_json::from_slice::<RankedPlayer>(&value).map_err(|e| {
                EconomyError::Storage(StorageError::CorruptedData(format!(
                    "Bad leaderboard row {:?}: {}",
                    String::from_utf8_lossy(&key),
                    e
                )))
            })
        })
        .collect::<MinestarsResult<Vec<_>>>()?;
    Ok(assign_ranks(ranked))
}

/// Rank an in-memory set of players
pub fn rank_players<'a>(
    players: impl IntoIterator<Item = &'a Player>,
    metric: LeaderboardMetric,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    let mut rows: Vec<RankedPlayer> = players.into_iter().map(|p| RankedPlayer::of(p, metric)).collect();
    rows.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.player_id.cmp(&b.player_id)));
    rows.truncate(limit);
    assign_ranks(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn player(id: PlayerId, rubies: u64, mined: u64) -> Player {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        let mut player = Player::new(id, Profile::default(), now, 86_400);
        player.rubies = rubies;
        player.stars_earned_mine = mined;
        player
    }

    #[test]
    fn test_index_keys_sort_by_value_desc_then_id() {
        let metric = LeaderboardMetric::Rubies;
        let mut keys = vec![
            metric.index_key(10, 2),
            metric.index_key(500, 9),
            metric.index_key(10, 1),
            metric.index_key(0, 3),
        ];
        keys.sort();

        assert_eq!(keys[0], metric.index_key(500, 9));
        assert_eq!(keys[1], metric.index_key(10, 1));
        assert_eq!(keys[2], metric.index_key(10, 2));
        assert_eq!(keys[3], metric.index_key(0, 3));
        assert!(keys.iter().all(|k| k.starts_with(b"lb:rubies:")));
    }

    #[test]
    fn test_rank_players_per_metric() {
        let players = [player(1, 30, 900), player(2, 70, 5), player(3, 30, 900)];

        let rubies = rank_players(&players, LeaderboardMetric::Rubies, 10);
        let ids: Vec<_> = rubies.iter().map(|e| e.player_id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
        assert_eq!(rubies[0].rank, 1);
        assert_eq!(rubies[2].rank, 3);

        let mining = rank_players(&players, LeaderboardMetric::MiningStars, 2);
        assert_eq!(mining.len(), 2);
        assert_eq!((mining[0].player_id, mining[0].value), (1, 900));
        assert_eq!(mining[1].player_id, 3);
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("mining".parse::<LeaderboardMetric>().unwrap(), LeaderboardMetric::MiningStars);
        assert_eq!("rubies".parse::<LeaderboardMetric>().unwrap(), LeaderboardMetric::Rubies);
        assert!(matches!("gold".parse::<LeaderboardMetric>(), Err(EconomyError::InvalidMetric(_))));
    }
}
