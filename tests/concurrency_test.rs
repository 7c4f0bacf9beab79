//! Concurrent access to the same player against a RocksDB store

use chrono::{Duration, TimeZone, Utc};
use minestars::{
    clock::ManualClock,
    config::{EconomyConfig, StorageConfig},
    economy::Economy,
    mining::Lane,
    player::Profile,
    player_store::{PlayerStore, RocksPlayerStore},
    shop::ExchangeDirection,
};
use std::sync::Arc;
use tempfile::TempDir;

fn setup() -> (Arc<Economy>, Arc<RocksPlayerStore>, Arc<ManualClock>, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        RocksPlayerStore::open(&StorageConfig {
            data_directory: dir.path().to_string_lossy().to_string(),
            ..Default::default()
        })
        .unwrap(),
    );
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 11, 2, 6, 0, 0).unwrap()));
    let economy = Economy::with_seed(store.clone(), clock.clone(), EconomyConfig::default(), 99);
    (Arc::new(economy), store, clock, dir)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_hits_and_exchanges_lose_no_updates() {
    let (economy, store, clock, _dir) = setup();
    economy.upsert_player(1, Profile::default()).unwrap();

    for _ in 0..20 {
        economy.claim_daily(1).unwrap();
        clock.advance(Duration::days(1));
    }
    let start = store.load(1).unwrap().unwrap();
    assert_eq!(start.stone_pickaxes, 60);

    let mut tasks = Vec::new();
    for _ in 0..60 {
        let economy = Arc::clone(&economy);
        tasks.push(tokio::task::spawn_blocking(move || economy.hit(1, Lane::Stone).is_ok()));
    }
    for _ in 0..10 {
        let economy = Arc::clone(&economy);
        tasks.push(tokio::task::spawn_blocking(move || {
            economy.exchange(1, ExchangeDirection::StarsToRubies, 1).is_ok()
        }));
    }

    let mut hits = 0;
    for (i, task) in tasks.into_iter().enumerate() {
        if task.await.unwrap() && i < 60 {
            hits += 1;
        }
    }

    let end = store.load(1).unwrap().unwrap();
    assert_eq!(hits, 60);
    assert_eq!(end.stone_pickaxes, 0);
    // every successful sale moved exactly 1 star to 80 rubies
    let sold = (end.rubies - start.rubies) / 80;
    assert_eq!((end.rubies - start.rubies) % 80, 0);
    assert_eq!(start.stars_earned_mine, 0);
    assert_eq!(end.stars + sold, end.stars_earned_mine);
    assert!(end.stone_lane.hits_done <= end.stone_lane.hits_required);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_payment_deliveries_credit_once() {
    let (economy, store, _clock, _dir) = setup();
    economy.upsert_player(5, Profile::default()).unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let economy = Arc::clone(&economy);
            tokio::task::spawn_blocking(move || economy.credit_purchased_stars(5, "webhook-991", 120).unwrap())
        })
        .collect();

    let mut credited = 0;
    for task in tasks {
        credited += task.await.unwrap().credited;
    }

    assert_eq!(credited, 120);
    assert_eq!(store.load(5).unwrap().unwrap().stars, 120);
}
