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

//! Custom errors for the Cloud Storage streams client.
//!
//! The client defines additional error types. These are often returned as the
//! `source()` of an [Error][crate::Error].

mod core_error;
pub use core_error::Error;

/// An input was rejected before any request was sent.
///
/// # Example
/// ```
/// # use google_cloud_storage_streams::error::ValidationError;
/// # use google_cloud_storage_streams::locator::ObjectLocator;
/// let err = ObjectLocator::parse("gs://BadBucketName/object").unwrap_err();
/// assert!(matches!(err, ValidationError::InvalidBucketName(_)));
/// ```
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ValidationError {
    /// The path does not have the `gs://bucket[/object]` form.
    #[error("invalid Google Cloud Storage path: {0}")]
    InvalidPath(String),

    /// The bucket name does not follow the naming rules.
    #[error("invalid bucket name: {0}")]
    InvalidBucketName(String),

    /// The object name contains forbidden characters.
    #[error("invalid object name: {0:?}")]
    InvalidObjectName(String),

    /// The operation requires an object name, the path only names a bucket.
    #[error("the path must name an object: {0}")]
    MissingObjectName(String),

    /// The ACL is not one of the canned ACLs.
    #[error("Invalid ACL value: {0}")]
    InvalidAcl(String),

    /// A metadata key contains characters other than letters, digits, and `-`.
    #[error("Invalid metadata key: {0}")]
    InvalidMetadataKey(String),

    /// A metadata value contains non-printable characters.
    #[error("Invalid metadata value: {0}")]
    InvalidMetadataValue(String),

    /// The stream mode is not a supported read or write mode.
    #[error("invalid stream mode: {0}")]
    InvalidMode(String),

    /// An option has a value outside its valid range.
    #[error("invalid value for option `{name}`: {reason}")]
    InvalidOption {
        name: &'static str,
        reason: &'static str,
    },
}

/// An error that can occur while performing a resumable upload.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum UploadError {
    /// The service did not include a `Location` header when the upload session
    /// was created.
    #[error("missing Location header in start resumable upload")]
    MissingLocation,

    /// The `Location` header does not include an `upload_id`.
    #[error("the Location header does not contain an upload_id: {0}")]
    MissingUploadId(String),

    /// The service rejected the credentials when starting the upload.
    #[error("Access Denied")]
    AccessDenied,

    /// The upload is finalized, or finalizing, and cannot accept more data.
    #[error("the upload is closed, no more data can be written")]
    Closed,
}

/// Represents an error that can occur when reading response data.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ReadError {
    /// Only 200, 206, 304, and 416 status codes are expected in read responses.
    #[error("unexpected success code {0} in read request, only 200 and 206 are expected")]
    UnexpectedSuccessCode(u16),

    /// Successful HTTP response must include some headers.
    #[error("the response is missing '{0}', a required header")]
    MissingHeader(&'static str),

    /// The received header format is invalid.
    #[error("the format for header '{0}' is incorrect")]
    BadHeaderFormat(
        &'static str,
        #[source] Box<dyn std::error::Error + Send + Sync + 'static>,
    ),

    /// The service confirmed a cached window with `304 Not Modified`, but the
    /// cache no longer holds that window.
    #[error("the service returned 304 Not Modified without a cached response")]
    NotModifiedWithoutCache,

    /// A seek targets an offset past the end of the object.
    #[error("cannot seek to {offset}, the object size is {size}")]
    SeekPastEnd { offset: u64, size: u64 },

    /// A seek targets an offset before the start of the object.
    #[error("cannot seek to a negative offset ({0})")]
    NegativeSeek(i64),
}

/// An error that can occur in directory operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DirectoryError {
    /// `rmdir` requires the directory to be empty.
    #[error("The directory is not empty: {0}")]
    NotEmpty(String),

    /// `mkdir` found an existing directory.
    #[error("The directory already exists: {0}")]
    AlreadyExists(String),

    /// The bucket listing could not be parsed.
    #[error("cannot parse the bucket listing: {0}")]
    BadListing(String),
}
