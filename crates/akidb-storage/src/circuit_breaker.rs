//! Circuit breaker for remote-store uploads
//!
//! Tracks the error rate of upload attempts over a sliding window and stops
//! attempting uploads once that rate crosses a threshold, so an outage of the
//! remote tier does not turn into a retry storm.
//!
//! # States
//!
//! - **Closed:** Normal operation, every attempt allowed and recorded
//! - **Open:** Tripped, attempts are rejected until the cooldown elapses
//! - **HalfOpen:** Probing recovery, a limited number of attempts allowed
//!
//! The current phase is mirrored in an atomic so the hot path (`state`) never
//! takes the lock. Every time-dependent operation has an `*_at` variant taking
//! an explicit `Instant`.
//!
//! # Example
//!
//! ```rust
//! use akidb_storage::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! let config = CircuitBreakerConfig {
//!     failure_threshold: 0.5,
//!     window_duration: Duration::from_secs(60),
//!     cooldown_duration: Duration::from_secs(300),
//!     half_open_successes: 10,
//!     min_requests: 10,
//! };
//!
//! let cb = CircuitBreaker::new(config);
//!
//! let permit = cb.try_acquire(1);
//! if permit.granted() == 1 {
//!     let success = true;
//!     cb.record_result(permit, success);
//! }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use akidb_core::{CoreError, CoreResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::telemetry::{NoopObserver, StorageObserver};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitBreakerState {
    /// Normal operation, uploads enabled.
    Closed,

    /// Circuit breaker tripped, all uploads rejected.
    Open,

    /// Testing recovery, limited uploads allowed.
    HalfOpen,
}

impl CircuitBreakerState {
    /// Convert state to numeric value for metrics.
    ///
    /// 0 = Closed, 1 = Open, 2 = HalfOpen
    #[must_use]
    pub fn to_metric(&self) -> u8 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
        }
    }

    fn from_metric(value: u8) -> Self {
        match value {
            1 => Self::Open,
            2 => Self::HalfOpen,
            _ => Self::Closed,
        }
    }

    /// Lowercase name used in logs and health reports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitBreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failure rate threshold to trip circuit (0.0-1.0].
    /// Default: 0.5 (50%)
    pub failure_threshold: f64,

    /// Error rate tracking window duration.
    /// Default: 60 seconds
    pub window_duration: Duration,

    /// Cooldown period before transitioning to HalfOpen.
    /// Default: 300 seconds (5 minutes)
    pub cooldown_duration: Duration,

    /// Number of successes in HalfOpen required to close the circuit.
    /// Default: 10
    pub half_open_successes: u32,

    /// Minimum samples in the window before the error rate is evaluated.
    /// Default: 10
    pub min_requests: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 0.5,
            window_duration: Duration::from_secs(60),
            cooldown_duration: Duration::from_secs(300),
            half_open_successes: 10,
            min_requests: 10,
        }
    }
}

impl CircuitBreakerConfig {
    /// Validate configuration.
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.failure_threshold > 0.0 && self.failure_threshold <= 1.0) {
            return Err(CoreError::ValidationError(format!(
                "failure_threshold must be in (0.0, 1.0], got {}",
                self.failure_threshold
            )));
        }
        if self.window_duration.is_zero() {
            return Err(CoreError::ValidationError(
                "window_duration must be > 0".to_string(),
            ));
        }
        if self.half_open_successes == 0 {
            return Err(CoreError::ValidationError(
                "half_open_successes must be > 0".to_string(),
            ));
        }
        if self.min_requests == 0 {
            return Err(CoreError::ValidationError(
                "min_requests must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Why the breaker changed phase.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionReason {
    /// Error rate over the window crossed the threshold.
    ErrorRateExceeded {
        /// Observed error rate.
        error_rate: f64,
        /// Samples in the window when it tripped.
        requests: usize,
    },
    /// Cooldown elapsed while Open.
    CooldownElapsed,
    /// A trial attempt failed while HalfOpen.
    HalfOpenFailure,
    /// Enough trial attempts succeeded while HalfOpen.
    HalfOpenRecovered {
        /// Successes counted in HalfOpen.
        successes: u32,
    },
    /// Operator forced the breaker closed.
    ManualReset,
}

impl fmt::Display for TransitionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ErrorRateExceeded {
                error_rate,
                requests,
            } => write!(
                f,
                "error rate {:.1}% over {} requests",
                error_rate * 100.0,
                requests
            ),
            Self::CooldownElapsed => f.write_str("cooldown elapsed"),
            Self::HalfOpenFailure => f.write_str("trial upload failed while half-open"),
            Self::HalfOpenRecovered { successes } => {
                write!(f, "{successes} successful trial uploads while half-open")
            }
            Self::ManualReset => f.write_str("manual reset"),
        }
    }
}

/// A phase change, reported to the observer and kept for telemetry.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Phase before the change.
    pub from: CircuitBreakerState,
    /// Phase after the change.
    pub to: CircuitBreakerState,
    /// Why it changed.
    pub reason: TransitionReason,
    /// When it changed.
    pub at: Instant,
}

/// Point-in-time view of the breaker for metrics and health.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerSnapshot {
    /// Current phase.
    pub state: CircuitBreakerState,
    /// Error rate over the current window.
    pub error_rate: f64,
    /// Samples in the current window.
    pub requests_in_window: usize,
    /// Reason for the most recent transition, if any.
    pub last_transition_reason: Option<String>,
}

/// Upload attempts granted by [`CircuitBreaker::try_acquire`].
///
/// Every outcome is reported back with the permit it ran under. Only outcomes
/// of permits granted during the current HalfOpen phase count toward closing
/// or re-opening the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Permit {
    granted: usize,
    half_open_epoch: Option<u64>,
}

impl Permit {
    /// Number of attempts allowed.
    pub fn granted(&self) -> usize {
        self.granted
    }

    /// Whether these are trial attempts granted while HalfOpen.
    pub fn is_trial(&self) -> bool {
        self.half_open_epoch.is_some()
    }
}

/// Sliding window of (timestamp, success) samples.
#[derive(Debug)]
struct ErrorRateTracker {
    window: VecDeque<(Instant, bool)>,
    failures: usize,
    window_duration: Duration,
}

impl ErrorRateTracker {
    fn new(window_duration: Duration) -> Self {
        Self {
            window: VecDeque::new(),
            failures: 0,
            window_duration,
        }
    }

    fn record(&mut self, now: Instant, success: bool) {
        self.window.push_back((now, success));
        if !success {
            self.failures += 1;
        }
        self.prune(now);
    }

    fn prune(&mut self, now: Instant) {
        let Some(cutoff) = now.checked_sub(self.window_duration) else {
            return;
        };
        while let Some(&(timestamp, success)) = self.window.front() {
            if timestamp >= cutoff {
                break;
            }
            self.window.pop_front();
            if !success {
                self.failures -= 1;
            }
        }
    }

    fn error_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.failures as f64 / self.window.len() as f64
    }

    fn total_requests(&self) -> usize {
        self.window.len()
    }

    fn clear(&mut self) {
        self.window.clear();
        self.failures = 0;
    }
}

struct Inner {
    tracker: ErrorRateTracker,
    opened_at: Option<Instant>,
    half_open_successes: u32,
    half_open_in_flight: u32,
    half_open_epoch: u64,
    last_transition: Option<Transition>,
}

/// Circuit breaker owned by one storage backend.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    phase: AtomicU8,
    inner: Mutex<Inner>,
    observer: Arc<dyn StorageObserver>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker in Closed state.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_observer(config, Arc::new(NoopObserver))
    }

    /// Create a breaker that reports transitions to `observer`.
    #[must_use]
    pub fn with_observer(config: CircuitBreakerConfig, observer: Arc<dyn StorageObserver>) -> Self {
        let tracker = ErrorRateTracker::new(config.window_duration);
        Self {
            config,
            phase: AtomicU8::new(CircuitBreakerState::Closed.to_metric()),
            inner: Mutex::new(Inner {
                tracker,
                opened_at: None,
                half_open_successes: 0,
                half_open_in_flight: 0,
                half_open_epoch: 0,
                last_transition: None,
            }),
            observer,
        }
    }

    /// Breaker configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current phase. Lock-free; an elapsed cooldown is only applied by
    /// `refresh` or `try_acquire`.
    #[must_use]
    pub fn state(&self) -> CircuitBreakerState {
        CircuitBreakerState::from_metric(self.phase.load(Ordering::Acquire))
    }

    /// Error rate over the trailing window.
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        self.error_rate_at(Instant::now())
    }

    /// Error rate over the window ending at `now`.
    #[must_use]
    pub fn error_rate_at(&self, now: Instant) -> f64 {
        let mut inner = self.inner.lock();
        inner.tracker.prune(now);
        inner.tracker.error_rate()
    }

    /// Most recent transition, if the breaker ever changed phase.
    #[must_use]
    pub fn last_transition(&self) -> Option<Transition> {
        self.inner.lock().last_transition.clone()
    }

    /// Snapshot for metrics and health reporting.
    #[must_use]
    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.tracker.prune(now);
        CircuitBreakerSnapshot {
            state: self.state(),
            error_rate: inner.tracker.error_rate(),
            requests_in_window: inner.tracker.total_requests(),
            last_transition_reason: inner
                .last_transition
                .as_ref()
                .map(|t| t.reason.to_string()),
        }
    }

    /// Apply an elapsed cooldown and return the resulting phase.
    pub fn refresh(&self) -> CircuitBreakerState {
        self.refresh_at(Instant::now())
    }

    /// `refresh` against an explicit clock.
    pub fn refresh_at(&self, now: Instant) -> CircuitBreakerState {
        if self.state() != CircuitBreakerState::Open {
            return self.state();
        }
        let transition = {
            let mut inner = self.inner.lock();
            self.maybe_half_open(&mut inner, now)
        };
        self.notify(transition);
        self.state()
    }

    /// Ask for permission to attempt up to `requested` uploads.
    ///
    /// Grants all of them when Closed, none when Open, and at most the
    /// remaining trial budget when HalfOpen. Each granted attempt's outcome
    /// must be reported through `record_result` with the returned permit.
    pub fn try_acquire(&self, requested: usize) -> Permit {
        self.try_acquire_at(requested, Instant::now())
    }

    /// `try_acquire` against an explicit clock.
    pub fn try_acquire_at(&self, requested: usize, now: Instant) -> Permit {
        let closed = Permit {
            granted: requested,
            half_open_epoch: None,
        };
        if requested == 0 || self.state() == CircuitBreakerState::Closed {
            return closed;
        }

        let (permit, transition) = {
            let mut inner = self.inner.lock();
            let transition = self.maybe_half_open(&mut inner, now);

            let permit = match self.state() {
                CircuitBreakerState::Closed => closed,
                CircuitBreakerState::Open => Permit {
                    granted: 0,
                    half_open_epoch: None,
                },
                CircuitBreakerState::HalfOpen => {
                    let used = inner.half_open_successes + inner.half_open_in_flight;
                    let budget = self.config.half_open_successes.saturating_sub(used) as usize;
                    let granted = requested.min(budget);
                    inner.half_open_in_flight += granted as u32;
                    Permit {
                        granted,
                        half_open_epoch: Some(inner.half_open_epoch),
                    }
                }
            };
            (permit, transition)
        };

        self.notify(transition);
        permit
    }

    /// Record the outcome of one attempt made under `permit`.
    pub fn record_result(&self, permit: Permit, success: bool) {
        self.record_result_at(permit, success, Instant::now());
    }

    /// `record_result` against an explicit clock.
    pub fn record_result_at(&self, permit: Permit, success: bool, now: Instant) {
        let transition = {
            let mut inner = self.inner.lock();
            inner.tracker.record(now, success);

            match self.state() {
                CircuitBreakerState::Closed => {
                    let requests = inner.tracker.total_requests();
                    let error_rate = inner.tracker.error_rate();
                    if requests >= self.config.min_requests
                        && error_rate > self.config.failure_threshold
                    {
                        inner.opened_at = Some(now);
                        self.transition(
                            &mut inner,
                            CircuitBreakerState::Open,
                            TransitionReason::ErrorRateExceeded {
                                error_rate,
                                requests,
                            },
                            now,
                        )
                    } else {
                        None
                    }
                }
                // Attempts started before this HalfOpen phase say nothing about recovery.
                CircuitBreakerState::HalfOpen
                    if permit.half_open_epoch != Some(inner.half_open_epoch) =>
                {
                    None
                }
                CircuitBreakerState::HalfOpen => {
                    inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
                    if success {
                        inner.half_open_successes += 1;
                        if inner.half_open_successes >= self.config.half_open_successes {
                            let successes = inner.half_open_successes;
                            inner.tracker.clear();
                            inner.opened_at = None;
                            self.transition(
                                &mut inner,
                                CircuitBreakerState::Closed,
                                TransitionReason::HalfOpenRecovered { successes },
                                now,
                            )
                        } else {
                            None
                        }
                    } else {
                        inner.opened_at = Some(now);
                        self.transition(
                            &mut inner,
                            CircuitBreakerState::Open,
                            TransitionReason::HalfOpenFailure,
                            now,
                        )
                    }
                }
                CircuitBreakerState::Open => None,
            }
        };

        self.notify(transition);
    }

    /// Force the breaker Closed and clear the window. Returns the previous phase.
    pub fn reset(&self) -> CircuitBreakerState {
        let now = Instant::now();
        let (previous, transition) = {
            let mut inner = self.inner.lock();
            let previous = self.state();
            inner.tracker.clear();
            inner.opened_at = None;
            let transition = self.transition(
                &mut inner,
                CircuitBreakerState::Closed,
                TransitionReason::ManualReset,
                now,
            );
            (previous, transition)
        };

        self.notify(transition);
        previous
    }

    fn maybe_half_open(&self, inner: &mut Inner, now: Instant) -> Option<Transition> {
        if self.state() != CircuitBreakerState::Open {
            return None;
        }
        let opened_at = inner.opened_at?;
        if now.saturating_duration_since(opened_at) < self.config.cooldown_duration {
            return None;
        }
        self.transition(
            inner,
            CircuitBreakerState::HalfOpen,
            TransitionReason::CooldownElapsed,
            now,
        )
    }

    /// Must be called with `inner` locked.
    fn transition(
        &self,
        inner: &mut Inner,
        to: CircuitBreakerState,
        reason: TransitionReason,
        now: Instant,
    ) -> Option<Transition> {
        let from = self.state();
        inner.half_open_successes = 0;
        inner.half_open_in_flight = 0;
        if from == to && reason != TransitionReason::ManualReset {
            return None;
        }

        if to == CircuitBreakerState::HalfOpen {
            inner.half_open_epoch += 1;
        }
        self.phase.store(to.to_metric(), Ordering::Release);
        let transition = Transition {
            from,
            to,
            reason,
            at: now,
        };
        inner.last_transition = Some(transition.clone());
        Some(transition)
    }

    fn notify(&self, transition: Option<Transition>) {
        let Some(transition) = transition else {
            return;
        };
        match transition.to {
            CircuitBreakerState::Open => tracing::warn!(
                from = %transition.from,
                reason = %transition.reason,
                "circuit breaker opened"
            ),
            _ => tracing::info!(
                from = %transition.from,
                to = %transition.to,
                reason = %transition.reason,
                "circuit breaker transition"
            ),
        }
        self.observer.circuit_breaker_transition(&transition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 0.5,
            window_duration: Duration::from_secs(60),
            cooldown_duration: Duration::from_secs(300),
            half_open_successes: 3,
            min_requests: 10,
        }
    }

    fn attempt(cb: &CircuitBreaker, success: bool, at: Instant) {
        let permit = cb.try_acquire_at(1, at);
        cb.record_result_at(permit, success, at);
    }

    fn trip(cb: &CircuitBreaker, start: Instant) -> Instant {
        for i in 0..10 {
            attempt(cb, false, start + Duration::from_millis(i));
        }
        start + Duration::from_millis(9)
    }

    #[test]
    fn test_initial_state() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig::default());
        assert_eq!(cb.state(), CircuitBreakerState::Closed);
        assert_eq!(cb.error_rate(), 0.0);
        assert_eq!(cb.try_acquire(4).granted(), 4);
        assert!(cb.last_transition().is_none());
    }

    #[test]
    fn test_trips_at_error_rate_threshold() {
        let cb = CircuitBreaker::new(fast_config());
        let start = Instant::now();

        for i in 0..6 {
            attempt(&cb, true, start + Duration::from_millis(i));
        }
        for i in 6..13 {
            attempt(&cb, false, start + Duration::from_millis(i));
        }

        // 7 failures out of 13 = 53.8%
        assert_eq!(cb.state(), CircuitBreakerState::Open);
        let transition = cb.last_transition().unwrap();
        assert!(matches!(
            transition.reason,
            TransitionReason::ErrorRateExceeded { requests: 13, .. }
        ));
    }

    #[test]
    fn test_minimum_samples_required() {
        let cb = CircuitBreaker::new(fast_config());
        let start = Instant::now();

        for i in 0..9 {
            attempt(&cb, false, start + Duration::from_millis(i));
        }
        assert_eq!(cb.state(), CircuitBreakerState::Closed);

        attempt(&cb, false, start + Duration::from_millis(9));
        assert_eq!(cb.state(), CircuitBreakerState::Open);
    }

    #[test]
    fn test_exactly_threshold_does_not_trip() {
        let cb = CircuitBreaker::new(fast_config());
        let start = Instant::now();

        for i in 0..10 {
            attempt(&cb, i % 2 == 0, start + Duration::from_millis(i));
        }
        assert_eq!(cb.state(), CircuitBreakerState::Closed);
    }

    #[test]
    fn test_old_samples_leave_the_window() {
        let cb = CircuitBreaker::new(fast_config());
        let start = Instant::now();

        for i in 0..9 {
            attempt(&cb, false, start + Duration::from_millis(i));
        }
        // The nine failures are older than the window by the time this lands.
        let later = start + Duration::from_secs(61);
        attempt(&cb, false, later);

        assert_eq!(cb.state(), CircuitBreakerState::Closed);
        assert_eq!(cb.error_rate_at(later), 1.0);
        assert_eq!(cb.snapshot().requests_in_window, 1);
    }

    #[test]
    fn test_open_rejects_until_cooldown() {
        let cb = CircuitBreaker::new(fast_config());
        let opened = trip(&cb, Instant::now());

        assert_eq!(cb.try_acquire_at(5, opened + Duration::from_secs(299)).granted(), 0);
        assert_eq!(cb.state(), CircuitBreakerState::Open);

        assert_eq!(
            cb.refresh_at(opened + Duration::from_secs(300)),
            CircuitBreakerState::HalfOpen
        );
    }

    #[test]
    fn test_half_open_limits_trial_attempts() {
        let cb = CircuitBreaker::new(fast_config());
        let opened = trip(&cb, Instant::now());
        let trial_time = opened + Duration::from_secs(301);

        let permit = cb.try_acquire_at(10, trial_time);
        assert_eq!(permit.granted(), 3);
        assert!(permit.is_trial());
        assert_eq!(cb.try_acquire_at(10, trial_time).granted(), 0);
        assert_eq!(cb.state(), CircuitBreakerState::HalfOpen);
    }

    #[test]
    fn test_half_open_successes_close() {
        let cb = CircuitBreaker::new(fast_config());
        let opened = trip(&cb, Instant::now());
        let trial_time = opened + Duration::from_secs(301);

        let permit = cb.try_acquire_at(3, trial_time);
        assert_eq!(permit.granted(), 3);
        cb.record_result_at(permit, true, trial_time);
        cb.record_result_at(permit, true, trial_time);
        assert_eq!(cb.state(), CircuitBreakerState::HalfOpen);
        cb.record_result_at(permit, true, trial_time);

        assert_eq!(cb.state(), CircuitBreakerState::Closed);
        assert_eq!(cb.error_rate_at(trial_time), 0.0);
        assert!(matches!(
            cb.last_transition().unwrap().reason,
            TransitionReason::HalfOpenRecovered { successes: 3 }
        ));
    }

    #[test]
    fn test_half_open_failure_reopens_and_restarts_cooldown() {
        let cb = CircuitBreaker::new(fast_config());
        let opened = trip(&cb, Instant::now());
        let trial_time = opened + Duration::from_secs(301);

        attempt(&cb, true, trial_time);
        attempt(&cb, false, trial_time);

        assert_eq!(cb.state(), CircuitBreakerState::Open);
        assert_eq!(
            cb.refresh_at(trial_time + Duration::from_secs(299)),
            CircuitBreakerState::Open
        );
        assert_eq!(
            cb.refresh_at(trial_time + Duration::from_secs(300)),
            CircuitBreakerState::HalfOpen
        );
    }

    #[test]
    fn test_results_granted_before_half_open_do_not_count() {
        let cb = CircuitBreaker::new(fast_config());
        let start = Instant::now();

        // A batch leaves while Closed, then the breaker trips underneath it
        let early = cb.try_acquire_at(5, start);
        assert!(!early.is_trial());
        let opened = trip(&cb, start);
        let trial_time = opened + Duration::from_secs(301);
        assert_eq!(cb.refresh_at(trial_time), CircuitBreakerState::HalfOpen);

        let trial = cb.try_acquire_at(3, trial_time);
        assert_eq!(trial.granted(), 3);

        // Late results from the Closed-era batch neither close nor re-open it
        for _ in 0..5 {
            cb.record_result_at(early, true, trial_time);
        }
        cb.record_result_at(early, false, trial_time);
        assert_eq!(cb.state(), CircuitBreakerState::HalfOpen);
        assert_eq!(cb.try_acquire_at(1, trial_time).granted(), 0);

        for _ in 0..3 {
            cb.record_result_at(trial, true, trial_time);
        }
        assert_eq!(cb.state(), CircuitBreakerState::Closed);
    }

    #[test]
    fn test_permits_from_an_earlier_half_open_phase_are_stale() {
        let cb = CircuitBreaker::new(fast_config());
        let opened = trip(&cb, Instant::now());
        let first_trial = opened + Duration::from_secs(301);

        let stale = cb.try_acquire_at(2, first_trial);
        cb.record_result_at(stale, false, first_trial);
        assert_eq!(cb.state(), CircuitBreakerState::Open);

        let second_trial = first_trial + Duration::from_secs(300);
        assert_eq!(cb.refresh_at(second_trial), CircuitBreakerState::HalfOpen);
        cb.record_result_at(stale, false, second_trial);
        assert_eq!(cb.state(), CircuitBreakerState::HalfOpen);
        assert_eq!(cb.try_acquire_at(10, second_trial).granted(), 3);
    }

    #[test]
    fn test_reset_from_any_state() {
        let cb = CircuitBreaker::new(fast_config());
        trip(&cb, Instant::now());
        assert_eq!(cb.state(), CircuitBreakerState::Open);

        assert_eq!(cb.reset(), CircuitBreakerState::Open);
        assert_eq!(cb.state(), CircuitBreakerState::Closed);
        assert_eq!(cb.error_rate(), 0.0);
        assert_eq!(
            cb.last_transition().unwrap().reason,
            TransitionReason::ManualReset
        );

        assert_eq!(cb.reset(), CircuitBreakerState::Closed);
    }

    #[test]
    fn test_state_metric_values() {
        assert_eq!(CircuitBreakerState::Closed.to_metric(), 0);
        assert_eq!(CircuitBreakerState::Open.to_metric(), 1);
        assert_eq!(CircuitBreakerState::HalfOpen.to_metric(), 2);
    }

    #[test]
    fn test_config_validation() {
        assert!(CircuitBreakerConfig::default().validate().is_ok());

        let bad = CircuitBreakerConfig {
            failure_threshold: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = CircuitBreakerConfig {
            half_open_successes: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
