//! Timing bookkeeping for line annotations.
//!
//! Tracks the basetime reference point, the previously reported elapsed time,
//! and formats the per-line annotation in either relative or absolute mode.
//! Pure over an injected `now` so it can be tested without a clock.

use chrono::{DateTime, Local};

/// How the visible timestamp on each line is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimingMode {
    /// `[elapsed delta]` seconds since basetime.
    Relative,
    /// Wall-clock timestamp rendered with a strftime-style format string,
    /// optionally followed by the delta.
    Absolute { format: String, show_delta: bool },
}

/// Mutable timing state for one engine invocation.
#[derive(Debug)]
pub struct TimingTracker {
    mode: Option<TimingMode>,
    basetime: Option<f64>,
    prev_elapsed: f64,
}

/// Epoch seconds as a float, microsecond precision.
pub fn epoch_seconds(now: DateTime<Local>) -> f64 {
    now.timestamp_micros() as f64 / 1_000_000.0
}

impl TimingTracker {
    pub fn new(mode: Option<TimingMode>) -> Self {
        Self {
            mode,
            basetime: None,
            prev_elapsed: 0.0,
        }
    }

    /// Whether any annotation mode is enabled.
    pub fn enabled(&self) -> bool {
        self.mode.is_some()
    }

    pub fn basetime(&self) -> Option<f64> {
        self.basetime
    }

    /// Set basetime if it has not been set yet (launch-time or first byte).
    pub fn ensure_basetime(&mut self, now: DateTime<Local>) {
        if self.basetime.is_none() {
            self.basetime = Some(epoch_seconds(now));
        }
    }

    /// Rebase to the timestamp of a matched line; the next annotation's
    /// delta restarts from zero.
    pub fn rebase(&mut self, line_time: f64) {
        self.basetime = Some(line_time);
        self.prev_elapsed = 0.0;
    }

    /// Elapsed seconds since basetime at `time`, zero if basetime is unset.
    pub fn elapsed_at(&self, time: f64) -> f64 {
        self.basetime.map(|base| time - base).unwrap_or(0.0)
    }

    /// Format the annotation for a line starting at `now`, updating the
    /// delta bookkeeping. Returns `None` when no timing mode is enabled.
    pub fn annotate(&mut self, now: DateTime<Local>) -> Option<String> {
        let mode = self.mode.clone()?;
        let elapsed = self.elapsed_at(epoch_seconds(now));
        let delta = elapsed - self.prev_elapsed;
        self.prev_elapsed = elapsed;
        Some(match mode {
            TimingMode::Relative => format!("[{elapsed:4.6} {delta:2.6}] "),
            TimingMode::Absolute { format, show_delta } => {
                let stamp = now.format(&format);
                if show_delta {
                    format!("[{stamp} {delta:2.6}] ")
                } else {
                    format!("[{stamp}] ")
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(micros: i64) -> DateTime<Local> {
        Local.timestamp_micros(micros).unwrap()
    }

    #[test]
    fn test_relative_elapsed_and_delta() {
        let mut tracker = TimingTracker::new(Some(TimingMode::Relative));
        tracker.ensure_basetime(at(1_000_000));
        let first = tracker.annotate(at(2_500_000)).unwrap();
        assert_eq!(first, "[1.500000 1.500000] ");
        let second = tracker.annotate(at(4_000_000)).unwrap();
        assert_eq!(second, "[3.000000 1.500000] ");
    }

    #[test]
    fn test_first_basetime_wins() {
        let mut tracker = TimingTracker::new(Some(TimingMode::Relative));
        tracker.ensure_basetime(at(5_000_000));
        tracker.ensure_basetime(at(9_000_000));
        assert_eq!(tracker.basetime(), Some(5.0));
    }

    #[test]
    fn test_rebase_resets_delta() {
        let mut tracker = TimingTracker::new(Some(TimingMode::Relative));
        tracker.ensure_basetime(at(0));
        tracker.annotate(at(10_000_000)).unwrap();
        tracker.rebase(10.0);
        let ann = tracker.annotate(at(12_000_000)).unwrap();
        assert_eq!(ann, "[2.000000 2.000000] ");
    }

    #[test]
    fn test_absolute_mode_with_delta() {
        let mut tracker = TimingTracker::new(Some(TimingMode::Absolute {
            format: "%H:%M:%S".to_string(),
            show_delta: true,
        }));
        let now = at(3_000_000);
        tracker.ensure_basetime(now);
        let ann = tracker.annotate(at(4_000_000)).unwrap();
        assert_eq!(ann, format!("[{} 1.000000] ", at(4_000_000).format("%H:%M:%S")));
    }

    #[test]
    fn test_absolute_mode_nodelta() {
        let mut tracker = TimingTracker::new(Some(TimingMode::Absolute {
            format: "%H:%M:%S".to_string(),
            show_delta: false,
        }));
        let now = at(3_000_000);
        tracker.ensure_basetime(now);
        let ann = tracker.annotate(now).unwrap();
        assert!(!ann.contains("0.000000"));
    }

    #[test]
    fn test_disabled_mode_yields_nothing() {
        let mut tracker = TimingTracker::new(None);
        tracker.ensure_basetime(at(0));
        assert!(tracker.annotate(at(1_000_000)).is_none());
    }
}
