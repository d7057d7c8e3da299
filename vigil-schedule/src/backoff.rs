//! Retry delay policies.

use crate::error::ScheduleError;
use serde::{Deserialize, Serialize};
use vigil_core::DurationMs;

/// How long to wait before the next attempt after `attempts` failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Always the same delay.
    Fixed {
        /// Delay between attempts.
        delay: DurationMs,
    },
    /// `base * 2^(attempts - 1)`, never more than `max`.
    Exponential {
        /// Delay after the first failure.
        base: DurationMs,
        /// Upper bound.
        max: DurationMs,
    },
}

impl Backoff {
    /// Capped exponential backoff.
    pub fn exponential(base: DurationMs, max: DurationMs) -> Self {
        Backoff::Exponential { base, max }
    }

    /// Delay after the `attempts`-th consecutive failure (1-based).
    pub fn delay(&self, attempts: u32) -> DurationMs {
        match *self {
            Backoff::Fixed { delay } => delay,
            Backoff::Exponential { base, max } => {
                let shift = attempts.saturating_sub(1).min(32);
                let scaled = base.as_millis().saturating_mul(1u64 << shift);
                DurationMs::from_millis(scaled.min(max.as_millis()))
            }
        }
    }

    /// Reject policies that would spin or stall.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        match *self {
            Backoff::Fixed { delay } if delay.is_zero() => {
                Err(ScheduleError::Config("fixed retry delay must be positive".into()))
            }
            Backoff::Exponential { base, .. } if base.is_zero() => {
                Err(ScheduleError::Config("retry base delay must be positive".into()))
            }
            Backoff::Exponential { base, max } if max < base => Err(ScheduleError::Config(
                format!("retry max delay {max} is below base delay {base}"),
            )),
            _ => Ok(()),
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::exponential(DurationMs::from_secs(10), DurationMs::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_doubles_then_caps() {
        let b = Backoff::exponential(DurationMs::from_secs(10), DurationMs::from_secs(60));
        let delays: Vec<u64> = (1..=6).map(|n| b.delay(n).as_millis()).collect();
        assert_eq!(delays, vec![10_000, 20_000, 40_000, 60_000, 60_000, 60_000]);
        assert_eq!(b.delay(u32::MAX), DurationMs::from_secs(60));
    }

    #[test]
    fn fixed_is_constant() {
        let b = Backoff::Fixed {
            delay: DurationMs::from_secs(10),
        };
        assert_eq!(b.delay(1), b.delay(50));
    }

    #[test]
    fn validation() {
        assert!(Backoff::default().validate().is_ok());
        assert!(Backoff::Fixed { delay: DurationMs::ZERO }.validate().is_err());
        assert!(
            Backoff::exponential(DurationMs::from_secs(10), DurationMs::from_secs(1))
                .validate()
                .is_err()
        );
    }
}
