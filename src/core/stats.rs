//! Tick timing statistics

use std::collections::VecDeque;
use std::time::Duration;

/// Tick cost tracker for a simulation session
#[derive(Debug)]
pub struct TickStats {
    /// Tick time history for averaging
    tick_times: VecDeque<Duration>,
    /// Maximum samples to keep
    max_samples: usize,
    /// Average tick time in milliseconds
    avg_tick_time_ms: f32,
    /// Minimum tick time in milliseconds
    min_tick_time_ms: f32,
    /// Maximum tick time in milliseconds
    max_tick_time_ms: f32,
    /// Total ticks recorded
    total_ticks: u64,
}

impl TickStats {
    /// Create a new tick stats tracker
    pub fn new() -> Self {
        Self {
            tick_times: VecDeque::with_capacity(120),
            max_samples: 120,
            avg_tick_time_ms: 0.0,
            min_tick_time_ms: 0.0,
            max_tick_time_ms: 0.0,
            total_ticks: 0,
        }
    }

    /// Record a tick with the time it took to simulate
    pub fn record_tick(&mut self, cost: Duration) {
        self.total_ticks += 1;

        if self.tick_times.len() >= self.max_samples {
            self.tick_times.pop_front();
        }
        self.tick_times.push_back(cost);

        self.update_stats();
    }

    fn update_stats(&mut self) {
        if self.tick_times.is_empty() {
            return;
        }

        let mut total = Duration::ZERO;
        let mut min = Duration::MAX;
        let mut max = Duration::ZERO;

        for &dt in &self.tick_times {
            total += dt;
            min = min.min(dt);
            max = max.max(dt);
        }

        let count = self.tick_times.len() as f32;
        self.avg_tick_time_ms = total.as_secs_f32() / count * 1000.0;
        self.min_tick_time_ms = min.as_secs_f32() * 1000.0;
        self.max_tick_time_ms = max.as_secs_f32() * 1000.0;
    }

    /// Get average tick time in milliseconds
    pub fn avg_tick_time_ms(&self) -> f32 {
        self.avg_tick_time_ms
    }

    /// Get minimum tick time in milliseconds
    pub fn min_tick_time_ms(&self) -> f32 {
        self.min_tick_time_ms
    }

    /// Get maximum tick time in milliseconds
    pub fn max_tick_time_ms(&self) -> f32 {
        self.max_tick_time_ms
    }

    /// Get total ticks recorded
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Get a formatted stats string
    pub fn format_stats(&self) -> String {
        format!(
            "Ticks: {} | Cost: {:.3}ms (min: {:.3}, max: {:.3})",
            self.total_ticks, self.avg_tick_time_ms, self.min_tick_time_ms, self.max_tick_time_ms
        )
    }
}

impl Default for TickStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_updates_aggregates() {
        let mut stats = TickStats::new();
        stats.record_tick(Duration::from_millis(2));
        stats.record_tick(Duration::from_millis(4));

        assert_eq!(stats.total_ticks(), 2);
        assert!((stats.avg_tick_time_ms() - 3.0).abs() < 0.01);
        assert!((stats.min_tick_time_ms() - 2.0).abs() < 0.01);
        assert!((stats.max_tick_time_ms() - 4.0).abs() < 0.01);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut stats = TickStats::new();
        for _ in 0..500 {
            stats.record_tick(Duration::from_micros(100));
        }
        assert_eq!(stats.total_ticks(), 500);
        assert!(stats.tick_times.len() <= 120);
    }
}
