//! Search control — stop flag and time management (spec §4.12, §5's
//! "Cancellation"/"Timeouts" subsections).
//!
//! Copied nearly verbatim from the teacher's `search/control.rs`: the
//! stop-flag/soft-hard-bound/ponder-scale mechanism isn't chess-specific,
//! so it generalizes to this engine unchanged.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Controls when a search should stop.
///
/// Checked periodically by the search (every 2048 nodes) to decide whether
/// to abort. Supports three modes:
/// - **Infinite**: no time pressure, only responds to external stop flag
/// - **Timed**: clock starts immediately
/// - **Ponder**: clock inactive until [`activate()`](SearchControl::activate) is called
pub struct SearchControl {
    stopped: Arc<AtomicBool>,
    clock_active: AtomicBool,
    start: Mutex<Option<Instant>>,
    soft_limit: Option<Duration>,
    hard_limit: Option<Duration>,
    soft_scale: AtomicI32,
    ponder_scale: AtomicI32,
}

impl SearchControl {
    /// Create control without time limits; only the external stop flag matters.
    pub fn new_infinite(stopped: Arc<AtomicBool>) -> Self {
        Self {
            stopped,
            clock_active: AtomicBool::new(false),
            start: Mutex::new(None),
            soft_limit: None,
            hard_limit: None,
            soft_scale: AtomicI32::new(100),
            ponder_scale: AtomicI32::new(100),
        }
    }

    /// Create control with time limits; clock starts immediately.
    pub fn new_timed(stopped: Arc<AtomicBool>, soft: Duration, hard: Duration) -> Self {
        Self {
            stopped,
            clock_active: AtomicBool::new(true),
            start: Mutex::new(Some(Instant::now())),
            soft_limit: Some(soft),
            hard_limit: Some(hard),
            soft_scale: AtomicI32::new(100),
            ponder_scale: AtomicI32::new(100),
        }
    }

    /// Create control for pondering — time limits exist but the clock is
    /// inactive until [`activate`](Self::activate) is called on ponderhit.
    /// `ponder_scale` starts at 50 (half the normal soft limit) so the
    /// engine reacts faster post-ponderhit; the hard limit is unaffected.
    pub fn new_ponder(stopped: Arc<AtomicBool>, soft: Duration, hard: Duration) -> Self {
        Self {
            stopped,
            clock_active: AtomicBool::new(false),
            start: Mutex::new(None),
            soft_limit: Some(soft),
            hard_limit: Some(hard),
            soft_scale: AtomicI32::new(100),
            ponder_scale: AtomicI32::new(50),
        }
    }

    /// Activate the clock (called when pondering resolves to a real move).
    pub fn activate(&self) {
        *self.start.lock().expect("start mutex poisoned") = Some(Instant::now());
        self.clock_active.store(true, Ordering::Release);
    }

    /// Whether the search should abort immediately: the external stop flag
    /// is set, or the clock is active and the hard limit is exceeded
    /// (checked every 2048 nodes).
    pub fn should_stop(&self, nodes: u64) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return true;
        }
        if nodes & 2047 != 0 {
            return false;
        }
        if !self.clock_active.load(Ordering::Acquire) {
            return false;
        }
        if let Some(hard) = self.hard_limit {
            if self.elapsed() >= hard {
                self.stopped.store(true, Ordering::Release);
                return true;
            }
        }
        false
    }

    /// Update the soft-limit scaling factor (in hundredths): 100 = neutral,
    /// 60 = play faster, 180 = think longer. Used by [`StabilityTracker`]
    /// (`crate::lazy_smp`) to shorten iterative deepening once the best
    /// move has stabilized.
    pub fn update_soft_scale(&self, scale_hundredths: i32) {
        self.soft_scale.store(scale_hundredths, Ordering::Relaxed);
    }

    /// Whether iterative deepening should stop before starting a new
    /// iteration: `effective = soft * soft_scale/100 * ponder_scale/100`,
    /// clamped to the hard limit.
    pub fn should_stop_iterating(&self) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return true;
        }
        if !self.clock_active.load(Ordering::Acquire) {
            return false;
        }
        if let Some(soft) = self.soft_limit {
            let scale = self.soft_scale.load(Ordering::Relaxed);
            let ponder_scale = self.ponder_scale.load(Ordering::Relaxed);
            let effective_ms = (soft.as_millis() as i64 * scale as i64 * ponder_scale as i64 / 10_000) as u64;
            let mut effective = Duration::from_millis(effective_ms);
            if let Some(hard) = self.hard_limit {
                effective = effective.min(hard);
            }
            return self.elapsed() >= effective;
        }
        false
    }

    /// Elapsed time since the clock was activated, or `Duration::ZERO` if
    /// never activated.
    pub fn elapsed(&self) -> Duration {
        self.start.lock().expect("start mutex poisoned").map_or(Duration::ZERO, |s| s.elapsed())
    }

    /// Reference to the shared stop flag, for cooperative cross-thread cancellation.
    pub fn stop_flag(&self) -> &Arc<AtomicBool> {
        &self.stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinite_control_never_stops_on_time() {
        let stopped = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_infinite(stopped);
        assert!(!control.should_stop(2048));
        assert!(!control.should_stop_iterating());
    }

    #[test]
    fn external_stop_flag_is_observed() {
        let stopped = Arc::new(AtomicBool::new(true));
        let control = SearchControl::new_infinite(stopped);
        assert!(control.should_stop(0));
    }

    #[test]
    fn timed_control_does_not_stop_immediately() {
        let stopped = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_timed(stopped, Duration::from_secs(10), Duration::from_secs(30));
        assert!(!control.should_stop(2048));
        assert!(!control.should_stop_iterating());
    }

    #[test]
    fn soft_scale_clamped_by_hard_limit() {
        let stopped = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_timed(stopped, Duration::from_secs(10), Duration::from_secs(5));
        control.update_soft_scale(250);
        assert!(!control.should_stop_iterating());
    }

    #[test]
    fn unactivated_ponder_control_never_stops() {
        let stopped = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_ponder(stopped, Duration::from_secs(10), Duration::from_secs(30));
        assert!(!control.should_stop_iterating());
        assert!(!control.should_stop(2048));
    }

    #[test]
    fn activating_ponder_starts_the_clock() {
        let stopped = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_ponder(stopped, Duration::from_millis(50), Duration::from_secs(30));
        control.activate();
        assert!(control.elapsed() < Duration::from_secs(1));
    }
}
