// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Types used when calling [`super::send_with_retry`] to configure the retry logic.

use std::time::Duration;
use tokio::time::sleep;

/// Enum representing the type of backoff to use for the delay between retries.
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub enum RetryBackoffType {
    /// Increases the delay by a fixed increment each attempt.
    Linear,
    /// The delay is constant for each attempt.
    Constant,
    /// The delay is doubled for each attempt.
    Exponential,
}

/// Retry strategy for sending data: maximum attempts, base delay, backoff
/// shape and an optional jitter added to every delay.
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub struct RetryStrategy {
    max_retries: u32,
    delay_ms: Duration,
    backoff_type: RetryBackoffType,
    jitter: Option<Duration>,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        RetryStrategy {
            max_retries: 5,
            delay_ms: Duration::from_millis(100),
            backoff_type: RetryBackoffType::Exponential,
            jitter: None,
        }
    }
}

impl RetryStrategy {
    /// Creates a new `RetryStrategy`.
    ///
    /// # Arguments
    ///
    /// * `max_retries`: The maximum number of attempts.
    /// * `delay_ms`: The minimum delay between attempts, in milliseconds.
    /// * `backoff_type`: The type of backoff to use for the delay between attempts.
    /// * `jitter`: An optional jitter to add randomness to the delay, in milliseconds.
    pub fn new(
        max_retries: u32,
        delay_ms: u64,
        backoff_type: RetryBackoffType,
        jitter: Option<u64>,
    ) -> RetryStrategy {
        RetryStrategy {
            max_retries,
            delay_ms: Duration::from_millis(delay_ms),
            backoff_type,
            jitter: jitter.map(Duration::from_millis),
        }
    }

    /// Delays the next request attempt based on the retry strategy.
    ///
    /// If a jitter duration is specified, a random duration up to the jitter
    /// value is added to the delay.
    ///
    /// # Arguments
    ///
    /// * `attempt`: The number of the current attempt (1-indexed).
    pub(crate) async fn delay(&self, attempt: u32) {
        let delay = match self.backoff_type {
            RetryBackoffType::Exponential => self.delay_ms * 2u32.pow(attempt - 1),
            RetryBackoffType::Constant => self.delay_ms,
            RetryBackoffType::Linear => self.delay_ms + (self.delay_ms * (attempt - 1)),
        };

        if let Some(jitter) = self.jitter {
            let jitter = rand::random::<u64>() % jitter.as_millis() as u64;
            sleep(delay + Duration::from_millis(jitter)).await;
        } else {
            sleep(delay).await;
        }
    }

    /// Returns the maximum number of attempts.
    pub(crate) fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

#[cfg(test)]
// The observed delays are approximate; only the lower bound matters for
// correctness of the retry logic.
mod tests {
    use super::*;
    use tokio::time::Instant;

    const TIME_TOLERANCE_MS: u64 = 100;

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn test_constant_backoff() {
        let retry_strategy = RetryStrategy {
            max_retries: 5,
            delay_ms: Duration::from_millis(100),
            backoff_type: RetryBackoffType::Constant,
            jitter: None,
        };

        for attempt in [1, 2] {
            let start = Instant::now();
            retry_strategy.delay(attempt).await;
            let elapsed = start.elapsed();

            assert!(
                elapsed >= retry_strategy.delay_ms
                    && elapsed
                        <= retry_strategy.delay_ms + Duration::from_millis(TIME_TOLERANCE_MS),
                "Elapsed time of {} ms was not within expected range",
                elapsed.as_millis()
            );
        }
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn test_linear_backoff() {
        let retry_strategy = RetryStrategy {
            max_retries: 5,
            delay_ms: Duration::from_millis(100),
            backoff_type: RetryBackoffType::Linear,
            jitter: None,
        };

        // For the linear strategy, the delay for the 3rd attempt should be
        // delay_ms + (delay_ms * 2).
        let start = Instant::now();
        retry_strategy.delay(3).await;
        let elapsed = start.elapsed();

        assert!(
            elapsed >= retry_strategy.delay_ms * 3
                && elapsed
                    <= retry_strategy.delay_ms * 3 + Duration::from_millis(TIME_TOLERANCE_MS),
            "Elapsed time of {} ms was not within expected range",
            elapsed.as_millis()
        );
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn test_exponential_backoff() {
        let retry_strategy = RetryStrategy {
            max_retries: 5,
            delay_ms: Duration::from_millis(100),
            backoff_type: RetryBackoffType::Exponential,
            jitter: None,
        };

        // For the exponential strategy, the delay for the 3rd attempt should be
        // delay_ms * 2^(3-1).
        let start = Instant::now();
        retry_strategy.delay(3).await;
        let elapsed = start.elapsed();

        assert!(
            elapsed >= retry_strategy.delay_ms * 4
                && elapsed
                    <= retry_strategy.delay_ms * 4 + Duration::from_millis(TIME_TOLERANCE_MS),
            "Elapsed time of {} ms was not within expected range",
            elapsed.as_millis()
        );
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn test_jitter() {
        let retry_strategy = RetryStrategy {
            max_retries: 5,
            delay_ms: Duration::from_millis(100),
            backoff_type: RetryBackoffType::Constant,
            jitter: Some(Duration::from_millis(50)),
        };

        let start = Instant::now();
        retry_strategy.delay(1).await;
        let elapsed = start.elapsed();

        // The delay should be between delay_ms and delay_ms + jitter.
        assert!(
            elapsed >= retry_strategy.delay_ms
                && elapsed
                    <= retry_strategy.delay_ms
                        + retry_strategy.jitter.unwrap()
                        + Duration::from_millis(TIME_TOLERANCE_MS),
            "Elapsed time of {} ms was not within expected range",
            elapsed.as_millis()
        );
    }

    #[test]
    fn test_max_retries() {
        let retry_strategy = RetryStrategy::new(17, 100, RetryBackoffType::Constant, None);
        assert_eq!(retry_strategy.max_retries(), 17);
    }
}
