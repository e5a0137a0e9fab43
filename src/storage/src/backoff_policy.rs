// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defines the delay between attempts of a ranged read.
//!
//! The service [recommends] exponential backoff, starting with a one second
//! delay and doubling on each attempt.
//!
//! [recommends]: https://cloud.google.com/storage/docs/retry-strategy

use crate::error::ValidationError;
use std::sync::Arc;
use std::time::Duration;

/// Computes the delay before the next attempt of a failed request.
pub trait BackoffPolicy: std::fmt::Debug + Send + Sync {
    /// Returns the delay after the attempt number `attempt_count` failed.
    ///
    /// `attempt_count` is `1` after the first failure.
    fn on_failure(&self, attempt_count: u32) -> Duration;
}

impl<T: BackoffPolicy + ?Sized> BackoffPolicy for Arc<T> {
    fn on_failure(&self, attempt_count: u32) -> Duration {
        self.as_ref().on_failure(attempt_count)
    }
}

/// The default backoff policy for ranged reads.
pub(crate) fn read_default() -> impl BackoffPolicy {
    ExponentialBackoff {
        initial_delay: Duration::from_secs(1),
        maximum_delay: Duration::from_secs(60),
        scaling: 2.0,
    }
}

/// Builds an [ExponentialBackoff].
///
/// # Example
/// ```
/// # use google_cloud_storage_streams::backoff_policy::ExponentialBackoffBuilder;
/// # use std::time::Duration;
/// # fn sample() -> anyhow::Result<()> {
/// let policy = ExponentialBackoffBuilder::new()
///     .with_initial_delay(Duration::from_millis(100))
///     .with_maximum_delay(Duration::from_secs(5))
///     .with_scaling(4.0)
///     .build()?;
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct ExponentialBackoffBuilder {
    initial_delay: Duration,
    maximum_delay: Duration,
    scaling: f64,
}

impl Default for ExponentialBackoffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExponentialBackoffBuilder {
    /// Creates a builder with the default values.
    pub fn new() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            maximum_delay: Duration::from_secs(60),
            scaling: 2.0,
        }
    }

    /// Sets the delay after the first failure.
    pub fn with_initial_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.initial_delay = v.into();
        self
    }

    /// Sets the largest delay between attempts.
    pub fn with_maximum_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.maximum_delay = v.into();
        self
    }

    /// Sets the factor applied to the delay after each failure.
    pub fn with_scaling<V: Into<f64>>(mut self, v: V) -> Self {
        self.scaling = v.into();
        self
    }

    /// Creates the policy, rejecting inconsistent values.
    pub fn build(self) -> Result<ExponentialBackoff, ValidationError> {
        if !(self.scaling >= 1.0 && self.scaling.is_finite()) {
            return Err(ValidationError::InvalidOption {
                name: "scaling",
                reason: "must be a finite number, greater than or equal to 1.0",
            });
        }
        if self.maximum_delay < self.initial_delay {
            return Err(ValidationError::InvalidOption {
                name: "maximum_delay",
                reason: "must be greater than or equal to the initial delay",
            });
        }
        Ok(ExponentialBackoff {
            initial_delay: self.initial_delay,
            maximum_delay: self.maximum_delay,
            scaling: self.scaling,
        })
    }
}

/// Waits `initial_delay * scaling^(attempt_count - 1)`, up to `maximum_delay`.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    maximum_delay: Duration,
    scaling: f64,
}

impl BackoffPolicy for ExponentialBackoff {
    fn on_failure(&self, attempt_count: u32) -> Duration {
        let exponent = attempt_count.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay = self.initial_delay.as_secs_f64() * self.scaling.powi(exponent);
        if !delay.is_finite() || delay >= self.maximum_delay.as_secs_f64() {
            return self.maximum_delay;
        }
        Duration::from_secs_f64(delay)
    }
}
