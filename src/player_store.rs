//! Durable player records with version-checked commits.
//!
//! A commit succeeds only if the stored record still carries the revision the
//! caller loaded; otherwise it fails with `StorageConflict` and the caller
//! replays the whole operation. Rank indexes and payment receipts are written
//! in the same batch as the record.

use crate::{
    config::StorageConfig,
    errors::{EconomyError, MinestarsResult, StorageError},
    leaderboard::{self, LeaderboardEntry, LeaderboardMetric, RankedPlayer},
    player::{Player, PlayerId},
    storage::{BatchOp, OptimizedStorage},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU32, Ordering},
        Mutex, MutexGuard,
    },
};
use tracing::{debug, warn};

const PLAYER_PREFIX: &str = "player:";
const PAYMENT_PREFIX: &str = "payment:";
const COMMIT_STRIPES: usize = 64;

/// Proof that a provider payment was credited exactly once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment_ref: String,
    pub player_id: PlayerId,
    pub amount: u64,
    pub credited_at: DateTime<Utc>,
}

pub trait PlayerStore: Send + Sync {
    fn load(&self, id: PlayerId) -> MinestarsResult<Option<Player>>;

    /// Persist `player` if the stored revision still equals `player.revision`
    /// (0 for a record that does not exist yet). Returns the record as
    /// written, with its revision bumped.
    fn commit(&self, player: &Player, receipt: Option<&PaymentReceipt>) -> MinestarsResult<Player>;

    /// Top `limit` players by `metric` from a consistent snapshot
    fn top(&self, metric: LeaderboardMetric, limit: usize) -> MinestarsResult<Vec<LeaderboardEntry>>;

    fn payment_receipt(&self, payment_ref: &str) -> MinestarsResult<Option<PaymentReceipt>>;
}

fn player_key(id: PlayerId) -> Vec<u8> {
    format!("{}{}", PLAYER_PREFIX, id).into_bytes()
}

fn payment_key(payment_ref: &str) -> Vec<u8> {
    format!("{}{}", PAYMENT_PREFIX, payment_ref).into_bytes()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn next_revision(player: &Player) -> Player {
    let mut next = player.clone();
    next.revision = player.revision + 1;
    next
}

/// RocksDB-backed store
pub struct RocksPlayerStore {
    storage: OptimizedStorage,
    /// Serializes check-and-write per player; striped to bound memory
    stripes: Vec<Mutex<()>>,
    receipts: Mutex<()>,
}

impl RocksPlayerStore {
    pub fn open(config: &StorageConfig) -> MinestarsResult<Self> {
        let storage = OptimizedStorage::new_with_config(config)
            .map_err(|e| StorageError::DatabaseOpenFailed(e.to_string()))?;
        Ok(Self::with_storage(storage))
    }

    pub fn with_storage(storage: OptimizedStorage) -> Self {
        Self {
            storage,
            stripes: (0..COMMIT_STRIPES).map(|_| Mutex::new(())).collect(),
            receipts: Mutex::new(()),
        }
    }

    fn stripe(&self, id: PlayerId) -> &Mutex<()> {
        &self.stripes[(id % COMMIT_STRIPES as u64) as usize]
    }

    fn read(&self, key: &[u8]) -> MinestarsResult<Option<Vec<u8>>> {
        self.storage
            .get(key)
            .map_err(|e| EconomyError::Storage(StorageError::ReadFailed(e.to_string())))
    }
}

impl PlayerStore for RocksPlayerStore {
    fn load(&self, id: PlayerId) -> MinestarsResult<Option<Player>> {
        let Some(bytes) = self.read(&player_key(id))? else {
            return Ok(None);
        };

        let player = serde_json::from_slice(&bytes).map_err(|e| {
            EconomyError::Storage(StorageError::CorruptedData(format!(
                "Failed to decode player {}: {}",
                id, e
            )))
        })?;
        Ok(Some(player))
    }

    fn commit(&self, player: &Player, receipt: Option<&PaymentReceipt>) -> MinestarsResult<Player> {
        let _stripe = lock(self.stripe(player.id));
        let _receipts = receipt.map(|_| lock(&self.receipts));

        let stored = self.load(player.id)?;
        let stored_revision = stored.as_ref().map_or(0, |p| p.revision);
        if stored_revision != player.revision {
            warn!(
                player_id = player.id,
                expected = player.revision,
                found = stored_revision,
                "Stale player commit rejected"
            );
            return Err(EconomyError::StorageConflict { player_id: player.id });
        }

        let mut ops = Vec::with_capacity(6);
        if let Some(receipt) = receipt {
            let key = payment_key(&receipt.payment_ref);
            if self.read(&key)?.is_some() {
                return Err(EconomyError::StorageConflict { player_id: player.id });
            }
            ops.push(BatchOp::Put(key, serde_json::to_vec(receipt)?));
        }

        let next = next_revision(player);
        for metric in LeaderboardMetric::ALL {
            let new_key = metric.index_key(metric.value_of(&next), next.id);
            if let Some(old) = &stored {
                let old_key = metric.index_key(metric.value_of(old), old.id);
                if old_key != new_key {
                    ops.push(BatchOp::Delete(old_key));
                }
            }
            ops.push(BatchOp::Put(new_key, serde_json::to_vec(&RankedPlayer::of(&next, metric))?));
        }
        ops.push(BatchOp::Put(player_key(next.id), serde_json::to_vec(&next)?));

        self.storage
            .write_batch(&ops)
            .map_err(|e| StorageError::WriteFailed(format!("Commit for player {}: {}", next.id, e)))?;
        debug!(player_id = next.id, revision = next.revision, "Player committed");
        Ok(next)
    }

    fn top(&self, metric: LeaderboardMetric, limit: usize) -> MinestarsResult<Vec<LeaderboardEntry>> {
        let rows = self
            .storage
            .scan_prefix(metric.index_prefix(), limit)
            .map_err(|e| EconomyError::Storage(StorageError::ReadFailed(e.to_string())))?;
        leaderboard::from_index_rows(rows)
    }

    fn payment_receipt(&self, payment_ref: &str) -> MinestarsResult<Option<PaymentReceipt>> {
        match self.read(&payment_key(payment_ref))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[derive(Default)]
struct MemoryState {
    players: HashMap<PlayerId, Player>,
    receipts: HashMap<String, PaymentReceipt>,
}

/// In-process store for tests and tooling. Can be told to reject upcoming
/// commits with a conflict to exercise retry paths.
#[derive(Default)]
pub struct MemoryPlayerStore {
    state: Mutex<MemoryState>,
    injected_conflicts: AtomicU32,
}

impl MemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` commits with `StorageConflict`
    pub fn inject_conflicts(&self, count: u32) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        lock(&self.state).players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl PlayerStore for MemoryPlayerStore {
    fn load(&self, id: PlayerId) -> MinestarsResult<Option<Player>> {
        Ok(lock(&self.state).players.get(&id).cloned())
    }

    fn commit(&self, player: &Player, receipt: Option<&PaymentReceipt>) -> MinestarsResult<Player> {
        if self.take_injected_conflict() {
            return Err(EconomyError::StorageConflict { player_id: player.id });
        }

        let mut state = lock(&self.state);
        let stored_revision = state.players.get(&player.id).map_or(0, |p| p.revision);
        if stored_revision != player.revision {
            return Err(EconomyError::StorageConflict { player_id: player.id });
        }
        if let Some(receipt) = receipt {
            if state.receipts.contains_key(&receipt.payment_ref) {
                return Err(EconomyError::StorageConflict { player_id: player.id });
            }
            state.receipts.insert(receipt.payment_ref.clone(), receipt.clone());
        }

        let next = next_revision(player);
        state.players.insert(next.id, next.clone());
        Ok(next)
    }

    fn top(&self, metric: LeaderboardMetric, limit: usize) -> MinestarsResult<Vec<LeaderboardEntry>> {
        let state = lock(&self.state);
        Ok(leaderboard::rank_players(state.players.values(), metric, limit))
    }

    fn payment_receipt(&self, payment_ref: &str) -> MinestarsResult<Option<PaymentReceipt>> {
        Ok(lock(&self.state).receipts.get(payment_ref).cloned())
    }
}
