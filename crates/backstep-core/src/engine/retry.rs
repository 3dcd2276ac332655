//! Retry policy for transient store failures.

use std::time::Duration;

use tracing::warn;

use super::error::EngineError;
use crate::sleep::Sleeper;

/// How the pause between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// 2^attempt seconds.
    Exponential,
    /// attempt × 2 seconds.
    Linear,
    /// 5 seconds.
    Fixed,
}

impl BackoffStrategy {
    /// Pause after failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::Exponential => Duration::from_secs(2u64.saturating_pow(attempt)),
            BackoffStrategy::Linear => Duration::from_secs(u64::from(attempt) * 2),
            BackoffStrategy::Fixed => Duration::from_secs(5),
        }
    }
}

/// Bounded retry of a block on retryable failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Exponential,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: BackoffStrategy) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Run `block`, retrying retryable failures until the attempts run out.
    ///
    /// The block receives the 1-based attempt number. Non-retryable errors
    /// and the error of the last attempt are returned unchanged.
    pub fn execute<T>(
        &self,
        sleeper: &dyn Sleeper,
        mut block: impl FnMut(u32) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match block(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff.delay(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying after transient failure"
                    );
                    sleeper.sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::RetryableError;
    use crate::sleep::RecordingSleeper;

    #[test]
    fn test_backoff_delays() {
        assert_eq!(BackoffStrategy::Exponential.delay(1), Duration::from_secs(2));
        assert_eq!(BackoffStrategy::Exponential.delay(3), Duration::from_secs(8));
        assert_eq!(BackoffStrategy::Linear.delay(1), Duration::from_secs(2));
        assert_eq!(BackoffStrategy::Linear.delay(4), Duration::from_secs(8));
        assert_eq!(BackoffStrategy::Fixed.delay(9), Duration::from_secs(5));
    }

    #[test]
    fn test_deadlock_then_success() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::new(3, BackoffStrategy::Exponential);

        let result = policy.execute(&sleeper, |attempt| {
            if attempt == 1 {
                Err(RetryableError::Deadlock("orders".into()).into())
            } else {
                Ok(attempt)
            }
        });

        assert_eq!(result.unwrap(), 2);
        assert_eq!(sleeper.pauses(), vec![Duration::from_secs(2)]);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::new(3, BackoffStrategy::Linear);
        let mut calls = 0;

        let result: Result<(), _> = policy.execute(&sleeper, |_| {
            calls += 1;
            Err(RetryableError::LockTimeout("widgets".into()).into())
        });

        assert!(matches!(
            result,
            Err(EngineError::Retryable(RetryableError::LockTimeout(_)))
        ));
        assert_eq!(calls, 3);
        assert_eq!(
            sleeper.pauses(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[test]
    fn test_non_retryable_fails_immediately() {
        let sleeper = RecordingSleeper::new();
        let mut calls = 0;

        let result: Result<(), _> = RetryPolicy::default().execute(&sleeper, |_| {
            calls += 1;
            Err(EngineError::Aborted("bad data".into()))
        });

        assert!(matches!(result, Err(EngineError::Aborted(_))));
        assert_eq!(calls, 1);
        assert!(sleeper.pauses().is_empty());
    }
}
