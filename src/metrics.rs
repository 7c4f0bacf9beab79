//! Economy counters with Prometheus text exposition

use std::{
    fmt::Write,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

pub struct EconomyMetrics {
    start_time: Instant,
    operations: AtomicU64,
    rejections: AtomicU64,
    conflicts_retried: AtomicU64,
    conflicts_surfaced: AtomicU64,
    rubies_minted: AtomicU64,
    stars_mined: AtomicU64,
    collectibles_dropped: AtomicU64,
    blocks_completed: AtomicU64,
    extinguishes: AtomicU64,
    stars_purchased: AtomicU64,
    http_requests: AtomicU64,
    http_errors: AtomicU64,
}

impl Default for EconomyMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EconomyMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            operations: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
            conflicts_retried: AtomicU64::new(0),
            conflicts_surfaced: AtomicU64::new(0),
            rubies_minted: AtomicU64::new(0),
            stars_mined: AtomicU64::new(0),
            collectibles_dropped: AtomicU64::new(0),
            blocks_completed: AtomicU64::new(0),
            extinguishes: AtomicU64::new(0),
            stars_purchased: AtomicU64::new(0),
            http_requests: AtomicU64::new(0),
            http_errors: AtomicU64::new(0),
        }
    }

    pub fn record_operation(&self) {
        self.operations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict_retry(&self) {
        self.conflicts_retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict_surfaced(&self) {
        self.conflicts_surfaced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rubies_minted(&self, amount: u64) {
        self.rubies_minted.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn record_block_completed(&self, stars: u64, dropped: bool) {
        self.blocks_completed.fetch_add(1, Ordering::Relaxed);
        self.stars_mined.fetch_add(stars, Ordering::Relaxed);
        if dropped {
            self.collectibles_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_extinguish(&self) {
        self.extinguishes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stars_purchased(&self, amount: u64) {
        self.stars_purchased.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn record_http_request(&self, success: bool) {
        self.http_requests.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.http_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    pub fn conflicts_retried(&self) -> u64 {
        self.conflicts_retried.load(Ordering::Relaxed)
    }

    pub fn extinguishes(&self) -> u64 {
        self.extinguishes.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn to_prometheus_format(&self) -> String {
        let counters: [(&str, &str, &AtomicU64); 12] = [
            ("operations_total", "Economy operations executed", &self.operations),
            ("rejections_total", "Operations rejected by a business rule", &self.rejections),
            ("conflicts_retried_total", "Storage conflicts retried internally", &self.conflicts_retried),
            ("conflicts_surfaced_total", "Storage conflicts returned to callers", &self.conflicts_surfaced),
            ("rubies_minted_total", "Rubies granted by ticks", &self.rubies_minted),
            ("stars_mined_total", "Stars granted by finished blocks", &self.stars_mined),
            ("collectibles_dropped_total", "Collectibles dropped by finished blocks", &self.collectibles_dropped),
            ("blocks_completed_total", "Mining blocks finished", &self.blocks_completed),
            ("torch_extinguishes_total", "Torches extinguished on expiry", &self.extinguishes),
            ("stars_purchased_total", "Stars credited from provider payments", &self.stars_purchased),
            ("http_requests_total", "HTTP requests served", &self.http_requests),
            ("http_errors_total", "HTTP requests answered with an error", &self.http_errors),
        ];

        let mut output = String::new();
        for (name, help, value) in counters {
            let _ = write!(
                output,
                "# HELP minestars_{name} {help}\n# TYPE minestars_{name} counter\nminestars_{name} {}\n\n",
                value.load(Ordering::Relaxed)
            );
        }
        let _ = write!(
            output,
            "# HELP minestars_uptime_seconds Process uptime\n# TYPE minestars_uptime_seconds gauge\nminestars_uptime_seconds {}\n",
            self.uptime().as_secs()
        );
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prometheus_output_lists_counters() {
        let metrics = EconomyMetrics::new();
        metrics.record_operation();
        metrics.record_operation();
        metrics.record_block_completed(300, true);
        metrics.record_http_request(false);

        let text = metrics.to_prometheus_format();
        assert!(text.contains("# TYPE minestars_operations_total counter"));
        assert!(text.contains("minestars_operations_total 2\n"));
        assert!(text.contains("minestars_stars_mined_total 300\n"));
        assert!(text.contains("minestars_collectibles_dropped_total 1\n"));
        assert!(text.contains("minestars_http_errors_total 1\n"));
        assert!(text.contains("minestars_uptime_seconds"));
    }
}
