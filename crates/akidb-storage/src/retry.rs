//! Retry state machine for failed uploads.
//!
//! Each pending upload carries its own schedule: `Scheduled(attempt, next_attempt_at)`.
//! Failures advance the schedule with exponential backoff until the error is
//! permanent or the attempt budget runs out, at which point the item is
//! dead-lettered. A breaker deferral moves `next_attempt_at` without consuming
//! an attempt. All transitions take the clock as an argument.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use akidb_core::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error_classifier::ErrorClass;
use crate::object_store::StoreError;
use crate::upload_scheduler::UploadItem;

/// Configuration for upload retry behavior.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Failed attempts before an item is dead-lettered (default: 15)
    pub max_attempts: u32,

    /// Base backoff duration (default: 1s)
    pub base_backoff: Duration,

    /// Maximum backoff duration (default: 64s)
    pub max_backoff: Duration,

    /// How long to wait before asking an open breaker again (default: 10s)
    pub breaker_defer: Duration,

    /// Retry worker poll interval (default: 1s)
    pub poll_interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(64),
            breaker_defer: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    /// Validate configuration.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_attempts == 0 {
            return Err(CoreError::ValidationError(
                "max_attempts must be > 0".to_string(),
            ));
        }
        if self.max_backoff < self.base_backoff {
            return Err(CoreError::ValidationError(
                "max_backoff must be >= base_backoff".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(CoreError::ValidationError(
                "poll_interval must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Calculate exponential backoff delay.
///
/// Formula: min(base * 2^attempt, max_backoff)
///
/// Clamps attempt to 30 and uses saturating arithmetic, so large attempt
/// counts cannot overflow.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    const MAX_ATTEMPT: u32 = 30;
    let clamped_attempt = attempt.min(MAX_ATTEMPT);

    base.saturating_mul(1u32 << clamped_attempt).min(max)
}

/// Where a pending upload sits in its retry schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Attempt number `attempt` (1-based) may start at `next_attempt_at`.
    Scheduled {
        attempt: u32,
        next_attempt_at: Instant,
    },
}

/// Why an upload was given up on.
#[derive(Debug, Clone, PartialEq)]
pub enum DeadLetterReason {
    /// The remote rejected the upload in a way retrying cannot fix.
    Permanent(String),
    /// Transient failures used up the attempt budget.
    AttemptsExhausted { attempts: u32, last_error: String },
}

impl fmt::Display for DeadLetterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permanent(error) => write!(f, "permanent failure: {error}"),
            Self::AttemptsExhausted {
                attempts,
                last_error,
            } => write!(f, "gave up after {attempts} attempts: {last_error}"),
        }
    }
}

/// Outcome of recording a failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Try again at `next_attempt_at`.
    Retry {
        attempt: u32,
        next_attempt_at: Instant,
    },
    /// Move to the dead letter queue.
    DeadLetter(DeadLetterReason),
}

/// An upload that has failed at least once, or was deferred by the breaker.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    /// The upload being retried
    pub item: UploadItem,
    /// Failed attempts so far
    pub attempts: u32,
    /// Earliest time the next attempt may start
    pub next_attempt_at: Instant,
    /// Wall-clock time of the first failure
    pub first_failed_at: Option<DateTime<Utc>>,
    /// Most recent error
    pub last_error: Option<String>,
}

impl PendingUpload {
    /// A fresh item, ready at `now`.
    pub fn new(item: UploadItem, now: Instant) -> Self {
        Self {
            item,
            attempts: 0,
            next_attempt_at: now,
            first_failed_at: None,
            last_error: None,
        }
    }

    pub fn is_ready(&self, now: Instant) -> bool {
        self.next_attempt_at <= now
    }

    pub fn state(&self) -> RetryState {
        RetryState::Scheduled {
            attempt: self.attempts + 1,
            next_attempt_at: self.next_attempt_at,
        }
    }

    /// Push the next attempt out to `until` without consuming an attempt.
    pub fn defer(&mut self, until: Instant) {
        if until > self.next_attempt_at {
            self.next_attempt_at = until;
        }
    }

    /// Record a failed attempt and decide what happens next.
    pub fn on_failure(
        &mut self,
        error: &StoreError,
        class: ErrorClass,
        config: &RetryConfig,
        now: Instant,
        now_utc: DateTime<Utc>,
    ) -> RetryDecision {
        self.attempts = self.attempts.saturating_add(1);
        self.first_failed_at.get_or_insert(now_utc);
        let message = error.to_string();
        self.last_error = Some(message.clone());

        if class == ErrorClass::Permanent {
            return RetryDecision::DeadLetter(DeadLetterReason::Permanent(message));
        }

        if self.attempts >= config.max_attempts {
            return RetryDecision::DeadLetter(DeadLetterReason::AttemptsExhausted {
                attempts: self.attempts,
                last_error: message,
            });
        }

        let backoff = calculate_backoff(
            self.attempts - 1,
            config.base_backoff,
            config.max_backoff,
        );
        self.next_attempt_at = now + backoff;

        RetryDecision::Retry {
            attempt: self.attempts + 1,
            next_attempt_at: self.next_attempt_at,
        }
    }
}

/// Uploads waiting for their next attempt.
#[derive(Debug, Default)]
pub struct RetryQueue {
    items: Mutex<VecDeque<PendingUpload>>,
}

impl RetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, pending: PendingUpload) {
        self.items.lock().push_back(pending);
    }

    /// Remove up to `limit` items that are due at `now`, oldest first.
    pub fn take_ready(&self, now: Instant, limit: usize) -> Vec<PendingUpload> {
        let mut items = self.items.lock();
        let mut ready = Vec::new();
        let mut waiting = VecDeque::with_capacity(items.len());

        while let Some(pending) = items.pop_front() {
            if ready.len() < limit && pending.is_ready(now) {
                ready.push(pending);
            } else {
                waiting.push_back(pending);
            }
        }

        *items = waiting;
        ready
    }

    /// Earliest scheduled attempt, if any.
    pub fn next_due(&self) -> Option<Instant> {
        self.items.lock().iter().map(|p| p.next_attempt_at).min()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use akidb_core::{CollectionId, DocumentId, VectorDocument};
    use crate::wal::LogSequenceNumber;

    fn item(seq: u64) -> UploadItem {
        UploadItem {
            sequence: LogSequenceNumber::new(seq),
            collection_id: CollectionId::new(),
            document: VectorDocument::new(DocumentId::new(), vec![1.0]),
        }
    }

    #[test]
    fn test_backoff_doubles_until_capped() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(64);

        assert_eq!(calculate_backoff(0, base, max), Duration::from_secs(1));
        assert_eq!(calculate_backoff(1, base, max), Duration::from_secs(2));
        assert_eq!(calculate_backoff(5, base, max), Duration::from_secs(32));
        assert_eq!(calculate_backoff(6, base, max), Duration::from_secs(64));
        assert_eq!(calculate_backoff(7, base, max), Duration::from_secs(64));
    }

    #[test]
    fn test_backoff_huge_attempt_does_not_overflow() {
        let max = Duration::from_secs(64);
        assert_eq!(calculate_backoff(u32::MAX, Duration::from_secs(1), max), max);
        assert_eq!(
            calculate_backoff(40, Duration::from_secs(u64::MAX / 2), Duration::MAX),
            Duration::MAX
        );
    }

    #[test]
    fn test_transient_failures_schedule_backoff() {
        let config = RetryConfig::default();
        let now = Instant::now();
        let mut pending = PendingUpload::new(item(1), now);

        let decision = pending.on_failure(
            &StoreError::Timeout("slow".into()),
            ErrorClass::Transient,
            &config,
            now,
            Utc::now(),
        );
        assert_eq!(
            decision,
            RetryDecision::Retry {
                attempt: 2,
                next_attempt_at: now + Duration::from_secs(1)
            }
        );
        assert!(!pending.is_ready(now));
        assert!(pending.is_ready(now + Duration::from_secs(1)));

        pending.on_failure(
            &StoreError::Timeout("slow".into()),
            ErrorClass::Transient,
            &config,
            now,
            Utc::now(),
        );
        assert_eq!(pending.next_attempt_at, now + Duration::from_secs(2));
    }

    #[test]
    fn test_permanent_failure_dead_letters_immediately() {
        let mut pending = PendingUpload::new(item(1), Instant::now());
        let decision = pending.on_failure(
            &StoreError::Unauthorized("denied".into()),
            ErrorClass::Permanent,
            &RetryConfig::default(),
            Instant::now(),
            Utc::now(),
        );
        assert!(matches!(
            decision,
            RetryDecision::DeadLetter(DeadLetterReason::Permanent(_))
        ));
        assert_eq!(pending.attempts, 1);
    }

    #[test]
    fn test_attempt_budget_escalates_to_dead_letter() {
        let config = RetryConfig {
            max_attempts: 3,
            ..Default::default()
        };
        let now = Instant::now();
        let mut pending = PendingUpload::new(item(1), now);
        let err = StoreError::http(503, "unavailable");

        for _ in 0..2 {
            assert!(matches!(
                pending.on_failure(&err, ErrorClass::Transient, &config, now, Utc::now()),
                RetryDecision::Retry { .. }
            ));
        }
        let decision = pending.on_failure(&err, ErrorClass::Transient, &config, now, Utc::now());
        assert_eq!(
            decision,
            RetryDecision::DeadLetter(DeadLetterReason::AttemptsExhausted {
                attempts: 3,
                last_error: err.to_string(),
            })
        );
    }

    #[test]
    fn test_defer_keeps_attempt_count() {
        let now = Instant::now();
        let mut pending = PendingUpload::new(item(1), now);
        pending.defer(now + Duration::from_secs(10));

        assert_eq!(pending.attempts, 0);
        assert_eq!(
            pending.state(),
            RetryState::Scheduled {
                attempt: 1,
                next_attempt_at: now + Duration::from_secs(10)
            }
        );

        // Deferring to an earlier time never pulls the schedule in.
        pending.defer(now);
        assert_eq!(pending.next_attempt_at, now + Duration::from_secs(10));
    }

    #[test]
    fn test_take_ready_respects_schedule_and_limit() {
        let queue = RetryQueue::new();
        let now = Instant::now();

        for seq in 1..=3 {
            queue.push(PendingUpload::new(item(seq), now));
        }
        let mut later = PendingUpload::new(item(4), now);
        later.defer(now + Duration::from_secs(5));
        queue.push(later);

        let ready = queue.take_ready(now, 2);
        let sequences: Vec<u64> = ready.iter().map(|p| p.item.sequence.value()).collect();
        assert_eq!(sequences, vec![1, 2]);
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.take_ready(now, 10).len(), 1);
        assert_eq!(queue.next_due(), Some(now + Duration::from_secs(5)));
        assert_eq!(queue.take_ready(now + Duration::from_secs(5), 10).len(), 1);
        assert!(queue.is_empty());
    }
}
