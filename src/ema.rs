//! Exponential moving average difficulty estimator
//!
//! Keeps the last `ema_window` block timestamps. The median of the window is
//! the earliest timestamp a new block may carry (the same idea as median
//! time-past), and the step of that median from one block to the next is the
//! "delayed" observed interval fed into the average:
//!
//! ```text
//! target' = target × (T + α·(observed − T)) / T
//! ```
//!
//! with `T` the target interval, `α = ema_alpha_numerator / ema_alpha_denominator`
//! and `observed` clamped to `[T / k, T · k]`. Using the median rather than
//! the raw timestamp keeps a single dishonest timestamp from moving the
//! difficulty. The target is left alone until the window has filled.

use crate::config::ChainParameters;
use crate::error::{BlockError, Result};
use crate::pow::scale_target;
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ema {
    difficulty: u32,
    delayed: VecDeque<Timestamp>,
}

impl Ema {
    /// Estimator state right after genesis.
    pub fn create(params: &ChainParameters) -> Self {
        let mut delayed = VecDeque::with_capacity(params.ema_window.max(1));
        delayed.push_back(params.genesis_time);
        Ema {
            difficulty: params.initial_difficulty,
            delayed,
        }
    }

    /// Compact target the next block must carry.
    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Window of recent timestamps, oldest first.
    pub fn delayed(&self) -> &VecDeque<Timestamp> {
        &self.delayed
    }

    /// A block timestamp must be strictly greater than this.
    pub fn earliest(&self) -> Timestamp {
        median(&self.delayed)
    }

    /// Reject timestamps that are stale relative to the window or too far
    /// ahead of the local clock.
    pub fn check_timestamp(
        &self,
        params: &ChainParameters,
        timestamp: Timestamp,
        now: Timestamp,
    ) -> Result<()> {
        if timestamp <= self.earliest() {
            return Err(BlockError::TimestampTooEarly);
        }
        if timestamp > now.saturating_add(params.max_time_in_future) {
            return Err(BlockError::TimestampTooFarInFuture);
        }
        Ok(())
    }

    /// State after a block with `timestamp`.
    pub fn add(&self, params: &ChainParameters, timestamp: Timestamp) -> Result<Ema> {
        let window = params.ema_window.max(1);
        let previous_median = self.earliest();

        let mut delayed = self.delayed.clone();
        delayed.push_back(timestamp);
        while delayed.len() > window {
            delayed.pop_front();
        }

        // Both medians must come from full windows.
        if self.delayed.len() < window {
            return Ok(Ema {
                difficulty: self.difficulty,
                delayed,
            });
        }

        let interval = params.block_interval;
        let clamp = params.ema_interval_clamp.max(1);
        let observed = median(&delayed)
            .saturating_sub(previous_median)
            .clamp(interval / clamp, interval.saturating_mul(clamp));

        let alpha_num = params.ema_alpha_numerator;
        let base = interval.saturating_mul(params.ema_alpha_denominator);
        let weighted = if observed >= interval {
            base.saturating_add(alpha_num.saturating_mul(observed - interval))
        } else {
            base.saturating_sub(alpha_num.saturating_mul(interval - observed))
        };

        let difficulty = scale_target(
            self.difficulty,
            weighted,
            base,
            params.proof_of_work_limit,
        )?;

        tracing::trace!(
            observed,
            old = format_args!("{:#010x}", self.difficulty),
            new = format_args!("{:#010x}", difficulty),
            "ema retarget"
        );

        Ok(Ema {
            difficulty,
            delayed,
        })
    }
}

/// Median of the window; the mean of the two middle values when even.
fn median(timestamps: &VecDeque<Timestamp>) -> Timestamp {
    if timestamps.is_empty() {
        return 0;
    }
    let mut sorted: Vec<Timestamp> = timestamps.iter().copied().collect();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        let (low, high) = (sorted[mid - 1], sorted[mid]);
        low + (high - low) / 2
    } else {
        sorted[mid]
    }
}
