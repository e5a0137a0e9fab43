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

//! Defines the retry policies for ranged reads.
//!
//! The storage service [recommends] retrying 408, 429, and all 5xx HTTP
//! status codes:
//!
//! - [408 - Request Timeout][408]
//! - [429 - Too Many Requests][429]
//! - [500 - Internal Server Error][500]
//! - [502 - Bad Gateway][502]
//! - [503 - Service Unavailable][503]
//! - [504 - Gateway Timeout][504]
//!
//! Only reads are retried. Starting an upload session and sending each chunk
//! are single attempts, a failed chunk is reported to the caller, who may
//! write the same bytes again.
//!
//! [recommends]: https://cloud.google.com/storage/docs/retry-strategy
//! [408]: https://cloud.google.com/storage/docs/json_api/v1/status-codes#408_Request_Timeout
//! [429]: https://cloud.google.com/storage/docs/json_api/v1/status-codes#429_Too_Many_Requests
//! [500]: https://cloud.google.com/storage/docs/json_api/v1/status-codes#500_Internal_Server_Error
//! [502]: https://cloud.google.com/storage/docs/json_api/v1/status-codes#502_Bad_Gateway
//! [503]: https://cloud.google.com/storage/docs/json_api/v1/status-codes#503_Service_Unavailable
//! [504]: https://cloud.google.com/storage/docs/json_api/v1/status-codes#504_Gateway_Timeout

use crate::Error;
use std::sync::Arc;

/// The number of attempts for each ranged read, including the first one.
pub const DEFAULT_READ_ATTEMPTS: u32 = 3;

/// The result of a retry policy decision.
#[derive(Debug)]
pub enum RetryResult {
    /// The error may succeed on a new attempt.
    Continue(Error),
    /// The error will not succeed on a new attempt.
    Permanent(Error),
    /// The policy ran out of attempts.
    Exhausted(Error),
}

impl RetryResult {
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }

    /// Consumes the result, returning the error.
    pub fn into_error(self) -> Error {
        match self {
            Self::Continue(e) | Self::Permanent(e) | Self::Exhausted(e) => e,
        }
    }
}

/// Determines how errors are handled in the read retry loop.
///
/// Implementations of this trait decide, after each failed attempt, whether
/// the request should be sent again.
pub trait RetryPolicy: std::fmt::Debug + Send + Sync {
    /// Query the retry policy after an error.
    ///
    /// `attempt_count` includes the attempt that just failed, it is `1` after
    /// the first failure.
    fn on_error(&self, attempt_count: u32, error: Error) -> RetryResult;
}

impl<T: RetryPolicy + ?Sized> RetryPolicy for Arc<T> {
    fn on_error(&self, attempt_count: u32, error: Error) -> RetryResult {
        self.as_ref().on_error(attempt_count, error)
    }
}

/// Extension methods to decorate retry policies.
pub trait RetryPolicyExt: RetryPolicy + Sized {
    /// Stop retrying after `maximum_attempts` attempts.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_streams::retry_policy::*;
    /// let policy = RetryableErrors.with_attempt_limit(5);
    /// ```
    fn with_attempt_limit(self, maximum_attempts: u32) -> LimitedAttemptCount<Self> {
        LimitedAttemptCount::custom(self, maximum_attempts)
    }
}

impl<T: RetryPolicy> RetryPolicyExt for T {}

/// The default retry policy for ranged reads.
///
/// Retries the errors shown as retryable in the service documentation, with
/// at most [DEFAULT_READ_ATTEMPTS] attempts.
pub(crate) fn read_default() -> impl RetryPolicy {
    RetryableErrors.with_attempt_limit(DEFAULT_READ_ATTEMPTS)
}

/// Follows the [retry strategy] recommended by the Cloud Storage service guides.
///
/// This policy never gives up, it must be decorated to limit the number of
/// attempts.
///
/// # Example
/// ```
/// # use google_cloud_storage_streams::retry_policy::*;
/// use google_cloud_storage_streams::client::Storage;
/// let builder = Storage::builder()
///     .with_read_retry_policy(RetryableErrors.with_attempt_limit(10));
/// ```
///
/// [retry strategy]: https://cloud.google.com/storage/docs/retry-strategy
#[derive(Clone, Debug)]
pub struct RetryableErrors;

impl RetryPolicy for RetryableErrors {
    fn on_error(&self, _attempt_count: u32, error: Error) -> RetryResult {
        if error.is_io() {
            return RetryResult::Continue(error);
        }
        if let Some(code) = error.http_status_code() {
            return match code {
                408 | 429 | 500..600 => RetryResult::Continue(error),
                _ => RetryResult::Permanent(error),
            };
        }
        RetryResult::Permanent(error)
    }
}

/// A retry policy decorator that limits the number of attempts.
#[derive(Clone, Debug)]
pub struct LimitedAttemptCount<P> {
    inner: P,
    maximum_attempts: u32,
}

impl<P> LimitedAttemptCount<P> {
    /// Limits the number of attempts of `inner` to `maximum_attempts`.
    pub fn custom(inner: P, maximum_attempts: u32) -> Self {
        Self {
            inner,
            maximum_attempts,
        }
    }
}

impl<P: RetryPolicy> RetryPolicy for LimitedAttemptCount<P> {
    fn on_error(&self, attempt_count: u32, error: Error) -> RetryResult {
        match self.inner.on_error(attempt_count, error) {
            RetryResult::Continue(e) if attempt_count >= self.maximum_attempts => {
                RetryResult::Exhausted(e)
            }
            r => r,
        }
    }
}
