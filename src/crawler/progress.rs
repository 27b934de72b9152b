//! Throttled progress accounting for a stage
//!
//! Every worker of a stage shares one [`ProgressTracker`]. A line is emitted
//! when the stage completes, or when the percentage has moved at least one
//! point and at least five seconds have passed since the previous line.

use chrono::{DateTime, Local};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

const MIN_PERCENT_STEP: f64 = 1.0;
const MIN_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Counters of one running stage
#[derive(Debug, Clone)]
pub struct ProgressState {
    pub total: usize,
    pub current: usize,
    pub start_time: Instant,
    pub last_logged_percent: f64,
    pub last_log_time: Option<Instant>,
}

impl ProgressState {
    fn new(total: usize, now: Instant) -> Self {
        Self {
            total,
            current: 0,
            start_time: now,
            last_logged_percent: 0.0,
            last_log_time: None,
        }
    }

    fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.current as f64 / self.total as f64 * 100.0
        }
    }

    /// Remaining items times the average time per item so far
    fn eta(&self, now: Instant) -> Duration {
        if self.current == 0 {
            return Duration::ZERO;
        }
        let per_item = now.duration_since(self.start_time).as_secs_f64() / self.current as f64;
        let remaining = self.total.saturating_sub(self.current) as f64;
        Duration::from_secs_f64(per_item * remaining)
    }
}

/// One emitted progress line
#[derive(Debug, Clone)]
pub struct ProgressReport {
    pub task: String,
    pub current: usize,
    pub total: usize,
    pub percent: f64,
    pub eta: Duration,
    pub timestamp: DateTime<Local>,
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}], {}: {:.2}% ({}/{}), ETA: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.task,
            self.percent,
            self.current,
            self.total,
            format_eta(self.eta)
        )
    }
}

/// Formats a duration as `1h 2m 3s`, `2m 3s` or `3s`
pub fn format_eta(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

pub struct ProgressTracker {
    task: String,
    state: Mutex<ProgressState>,
}

impl ProgressTracker {
    pub fn new(task: &str, total: usize) -> Self {
        Self {
            task: task.to_string(),
            state: Mutex::new(ProgressState::new(total, Instant::now())),
        }
    }

    /// Resets the counters for a new run of the stage
    pub fn init(&self, total: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = ProgressState::new(total, Instant::now());
    }

    /// Counts one processed item and logs a progress line when due
    pub fn increment(&self) -> Option<ProgressReport> {
        let report = self.increment_at(Instant::now());
        if let Some(report) = &report {
            tracing::info!("{}", report);
        }
        report
    }

    /// Counts one processed item as of `now`, returning the line to emit if any
    pub fn increment_at(&self, now: Instant) -> Option<ProgressReport> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.current += 1;

        let percent = state.percent();
        let interval_passed = state
            .last_log_time
            .map_or(true, |last| now.saturating_duration_since(last) >= MIN_LOG_INTERVAL);
        let due = state.current == state.total
            || (percent - state.last_logged_percent >= MIN_PERCENT_STEP && interval_passed);
        if !due {
            return None;
        }

        state.last_logged_percent = percent;
        state.last_log_time = Some(now);
        Some(ProgressReport {
            task: self.task.clone(),
            current: state.current,
            total: state.total,
            percent,
            eta: state.eta(now),
            timestamp: Local::now(),
        })
    }

    pub fn snapshot(&self) -> ProgressState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn percent(&self) -> f64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .percent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(Duration::from_secs(0)), "0s");
        assert_eq!(format_eta(Duration::from_secs(59)), "59s");
        assert_eq!(format_eta(Duration::from_secs(63)), "1m 3s");
        assert_eq!(format_eta(Duration::from_secs(3723)), "1h 2m 3s");
        assert_eq!(format_eta(Duration::from_secs(7200)), "2h 0m 0s");
    }

    #[test]
    fn test_final_item_always_emits() {
        let tracker = ProgressTracker::new("Fetching events", 100);
        let start = tracker.snapshot().start_time;

        // First increment emits: one point reached and nothing logged yet
        assert!(tracker.increment_at(start).is_some());

        // Everything else lands inside the same five-second window
        let mut emitted = 0;
        for i in 2..100 {
            if tracker.increment_at(start + Duration::from_millis(i)).is_some() {
                emitted += 1;
            }
        }
        assert_eq!(emitted, 0);

        let last = tracker.increment_at(start + Duration::from_millis(100)).unwrap();
        assert_eq!(last.current, 100);
        assert_eq!(last.total, 100);
        assert!((last.percent - 100.0).abs() < f64::EPSILON);
        assert_eq!(last.eta, Duration::ZERO);
    }

    #[test]
    fn test_emission_requires_step_and_interval() {
        let tracker = ProgressTracker::new("Scraping", 1000);
        let start = tracker.snapshot().start_time;

        // 0.1% after the first item: not enough progress
        assert!(tracker.increment_at(start).is_none());
        for _ in 0..8 {
            assert!(tracker.increment_at(start).is_none());
        }
        // 1.0%, nothing logged before
        assert!(tracker.increment_at(start).is_some());

        // Enough progress but inside the interval
        for _ in 0..20 {
            assert!(tracker.increment_at(start + Duration::from_secs(1)).is_none());
        }
        let report = tracker.increment_at(start + Duration::from_secs(6)).unwrap();
        assert_eq!(report.current, 31);
    }

    #[test]
    fn test_eta_uses_average_item_time() {
        let tracker = ProgressTracker::new("Fetching", 4);
        let start = tracker.snapshot().start_time;

        let report = tracker.increment_at(start + Duration::from_secs(10)).unwrap();
        assert_eq!(report.eta, Duration::from_secs(30));
    }

    #[test]
    fn test_report_line_shape() {
        let tracker = ProgressTracker::new("Fetching athlete URLs", 3);
        let start = tracker.snapshot().start_time;
        let report = tracker.increment_at(start).unwrap();
        let line = report.to_string();

        assert!(line.starts_with('['));
        assert!(line.contains("], Fetching athlete URLs: 33.33% (1/3), ETA: "));
    }

    #[test]
    fn test_init_resets_counters() {
        let tracker = ProgressTracker::new("Fetching", 2);
        tracker.increment();
        tracker.init(5);
        let state = tracker.snapshot();
        assert_eq!(state.current, 0);
        assert_eq!(state.total, 5);
        assert!(state.last_log_time.is_none());
    }
}
