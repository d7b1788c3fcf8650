// ── Roost Engine: HTTP Retry & Circuit Breaker ─────────────────────────────
//
// Shared request resilience for the REST client.
//
//   • Exponential backoff with ±25% jitter (base 500ms, max 8s)
//   • Honours an integer `Retry-After` header
//   • Circuit breaker: N consecutive failures → fail fast for a cooldown
//
// Only idempotent GETs are retried; writes fail on the first error so a
// message is never posted twice.

use log::warn;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

pub use crate::atoms::error::is_retryable_status;

// ── Constants ──────────────────────────────────────────────────────────────

/// Attempts per idempotent request, first try included.
pub const MAX_ATTEMPTS: u32 = 3;

const INITIAL_RETRY_DELAY_MS: u64 = 500;
const MAX_RETRY_DELAY_MS: u64 = 8_000;
/// Server-requested waits longer than this are clamped.
const MAX_RETRY_AFTER_SECS: u64 = 30;

pub const BREAKER_THRESHOLD: u32 = 5;
pub const BREAKER_COOLDOWN_SECS: u64 = 30;

// ── Backoff delay ──────────────────────────────────────────────────────────

/// Delay before retry number `attempt` (0-based), without sleeping.
pub fn backoff_delay(attempt: u32, retry_after_secs: Option<u64>) -> Duration {
    let base_ms = INITIAL_RETRY_DELAY_MS.saturating_mul(2u64.saturating_pow(attempt.min(16)));
    let capped_ms = base_ms.min(MAX_RETRY_DELAY_MS);
    let delay_ms = match retry_after_secs {
        Some(secs) => (secs.min(MAX_RETRY_AFTER_SECS) * 1000).max(capped_ms),
        None => apply_jitter(capped_ms),
    };
    Duration::from_millis(delay_ms)
}

/// Sleep for the backoff delay and return it for logging.
pub async fn retry_delay(attempt: u32, retry_after_secs: Option<u64>) -> Duration {
    let delay = backoff_delay(attempt, retry_after_secs);
    tokio::time::sleep(delay).await;
    delay
}

fn apply_jitter(base_ms: u64) -> u64 {
    let spread = (base_ms / 4) as i64;
    if spread == 0 {
        return base_ms.max(50);
    }
    let offset = (clock_noise() % (2 * spread + 1)) - spread;
    (base_ms as i64 + offset).max(50) as u64
}

/// Jitter source from the clock's sub-second nanos.
fn clock_noise() -> i64 {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    i64::from(nanos % 10_007)
}

/// Integer seconds only; HTTP-date values fall back to computed backoff.
pub fn parse_retry_after(header_value: &str) -> Option<u64> {
    header_value.trim().parse::<u64>().ok()
}

// ── Circuit Breaker ────────────────────────────────────────────────────────

/// Trips after `threshold` consecutive failures, then rejects calls until
/// `cooldown_secs` have passed. The first call after the cooldown is let
/// through as a probe; its result closes or re-opens the circuit.
pub struct CircuitBreaker {
    consecutive_failures: AtomicU32,
    tripped_at: AtomicU64,
    threshold: u32,
    cooldown_secs: u64,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BREAKER_THRESHOLD, BREAKER_COOLDOWN_SECS)
    }
}

impl CircuitBreaker {
    pub const fn new(threshold: u32, cooldown_secs: u64) -> Self {
        Self {
            consecutive_failures: AtomicU32::new(0),
            tripped_at: AtomicU64::new(0),
            threshold,
            cooldown_secs,
        }
    }

    /// `Err(reason)` while the circuit is open.
    pub fn check(&self) -> Result<(), String> {
        let failures = self.consecutive_failures.load(Ordering::Relaxed);
        if failures < self.threshold {
            return Ok(());
        }
        let elapsed = now_secs().saturating_sub(self.tripped_at.load(Ordering::Relaxed));
        if elapsed < self.cooldown_secs {
            Err(format!(
                "server unreachable after {} consecutive failures; retrying in {}s",
                failures,
                self.cooldown_secs - elapsed
            ))
        } else {
            Ok(())
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.tripped_at.store(0, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.threshold {
            self.tripped_at.store(now_secs(), Ordering::Relaxed);
            if failures == self.threshold {
                warn!(
                    "[http] Circuit open after {} consecutive failures, cooling down {}s",
                    failures, self.cooldown_secs
                );
            }
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        for s in [429, 500, 502, 503, 504] {
            assert!(is_retryable_status(s), "{s} should retry");
        }
        for s in [200, 400, 401, 403, 404] {
            assert!(!is_retryable_status(s), "{s} should not retry");
        }
    }

    #[test]
    fn parse_retry_after_values() {
        assert_eq!(parse_retry_after("5"), Some(5));
        assert_eq!(parse_retry_after(" 12 "), Some(12));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn backoff_grows_and_caps() {
        let first = backoff_delay(0, None).as_millis() as u64;
        assert!((375..=625).contains(&first), "first delay {first}");
        let late = backoff_delay(10, None).as_millis() as u64;
        assert!(late <= MAX_RETRY_DELAY_MS * 5 / 4, "late delay {late}");
    }

    #[test]
    fn retry_after_wins_when_longer() {
        assert_eq!(backoff_delay(0, Some(4)), Duration::from_secs(4));
        assert_eq!(backoff_delay(0, Some(600)), Duration::from_secs(MAX_RETRY_AFTER_SECS));
    }

    #[test]
    fn circuit_breaker_trips_and_resets() {
        let cb = CircuitBreaker::new(3, 60);
        cb.record_failure();
        cb.record_failure();
        assert!(cb.check().is_ok());
        cb.record_failure();
        assert!(cb.check().is_err());
        cb.record_success();
        assert!(cb.check().is_ok());
    }

    #[test]
    fn circuit_breaker_half_opens_after_cooldown() {
        let cb = CircuitBreaker::new(1, 0);
        cb.record_failure();
        assert!(cb.check().is_ok());
    }
}
