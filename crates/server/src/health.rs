//! Turn health monitoring
//!
//! Timers bracket a turn, error counters accumulate per key, and a stall
//! watcher logs when a stream stops making progress. All of it is
//! observational; nothing here alters control flow or terminates a stream.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use parla_core::ErrorCategory;

use crate::metrics;

/// Shared last-progress marker for an in-flight stream
#[derive(Clone)]
pub struct StreamProgress {
    last: Arc<Mutex<Instant>>,
}

impl StreamProgress {
    pub fn new() -> Self {
        Self { last: Arc::new(Mutex::new(Instant::now())) }
    }

    /// Note that the stream produced output.
    pub fn mark(&self) {
        *self.last.lock() = Instant::now();
    }

    fn elapsed(&self) -> Duration {
        self.last.lock().elapsed()
    }
}

impl Default for StreamProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-key turn timers and error counters
#[derive(Default)]
pub struct HealthMonitor {
    timers: Mutex<HashMap<String, Instant>>,
    errors: Mutex<HashMap<(String, ErrorCategory), u64>>,
    // Arc'd so the spawned stall watcher can write to it
    stalls: Arc<Mutex<HashMap<String, u64>>>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_timer(&self, key: &str) {
        self.timers.lock().insert(key.to_string(), Instant::now());
    }

    /// Stop the timer for a key and record the elapsed turn duration.
    pub fn end_timer(&self, key: &str) -> Option<Duration> {
        let elapsed = self.timers.lock().remove(key)?.elapsed();
        metrics::record_turn_duration(elapsed.as_secs_f64());
        tracing::debug!(key, elapsed_ms = elapsed.as_millis() as u64, "turn finished");
        Some(elapsed)
    }

    /// Count an error against a key. Observational only.
    pub fn track_error(&self, key: &str, category: ErrorCategory) {
        *self
            .errors
            .lock()
            .entry((key.to_string(), category))
            .or_insert(0) += 1;
        metrics::record_error(category);
    }

    pub fn error_count(&self, key: &str, category: ErrorCategory) -> u64 {
        self.errors
            .lock()
            .get(&(key.to_string(), category))
            .copied()
            .unwrap_or(0)
    }

    /// How many stall intervals the watcher has observed for a key.
    pub fn stall_count(&self, key: &str) -> u64 {
        self.stalls.lock().get(key).copied().unwrap_or(0)
    }

    /// Watch a stream for stalls on a fixed interval.
    ///
    /// Logs and counts a degraded-stream observation when no progress has
    /// been marked within the threshold; never terminates the stream. The
    /// caller aborts the returned task when the turn ends.
    pub fn monitor_streaming_health(
        &self,
        key: String,
        progress: StreamProgress,
        check_interval: Duration,
        threshold: Duration,
    ) -> JoinHandle<()> {
        let stalls = self.stalls.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(check_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // First tick fires immediately; skip it.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let stalled_for = progress.elapsed();
                if stalled_for >= threshold {
                    *stalls.lock().entry(key.clone()).or_insert(0) += 1;
                    metrics::record_stream_stall();
                    tracing::warn!(
                        key,
                        stalled_ms = stalled_for.as_millis() as u64,
                        "stream has made no progress past the stall threshold"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_round_trip() {
        let monitor = HealthMonitor::new();
        monitor.start_timer("u1");
        assert!(monitor.end_timer("u1").is_some());
        // Ending twice yields nothing the second time
        assert!(monitor.end_timer("u1").is_none());
    }

    #[test]
    fn test_error_counters_are_per_key_and_category() {
        let monitor = HealthMonitor::new();
        monitor.track_error("u1", ErrorCategory::ProviderFailure);
        monitor.track_error("u1", ErrorCategory::ProviderFailure);
        monitor.track_error("u1", ErrorCategory::InputValidation);

        assert_eq!(monitor.error_count("u1", ErrorCategory::ProviderFailure), 2);
        assert_eq!(monitor.error_count("u1", ErrorCategory::InputValidation), 1);
        assert_eq!(monitor.error_count("u2", ErrorCategory::ProviderFailure), 0);
    }

    #[tokio::test]
    async fn test_stall_watcher_counts_stalls_without_ending_stream() {
        let monitor = HealthMonitor::new();
        let progress = StreamProgress::new();
        let watcher = monitor.monitor_streaming_health(
            "u1".to_string(),
            progress.clone(),
            Duration::from_millis(10),
            Duration::from_millis(30),
        );

        // No progress: the threshold elapses and stalls accumulate
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(monitor.stall_count("u1") > 0);

        // Purely observational: the watcher never exits on its own and
        // the stream can still make progress afterwards
        progress.mark();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!watcher.is_finished());
        assert_eq!(monitor.stall_count("u2"), 0);
        watcher.abort();
    }
}
