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

//! Parse and validate `gs://bucket/object` paths.
//!
//! The naming rules are described in the [bucket naming] and [object naming]
//! guides.
//!
//! [bucket naming]: https://cloud.google.com/storage/docs/buckets#naming
//! [object naming]: https://cloud.google.com/storage/docs/objects#naming

use crate::error::ValidationError;

/// The scheme prefix for Cloud Storage paths.
pub const SCHEME: &str = "gs://";

const RESERVED_PREFIX: &str = "goog";
const MAX_BUCKET_NAME_LEN: usize = 222;
const MAX_BUCKET_LABEL_LEN: usize = 63;
const MIN_BUCKET_NAME_LEN: usize = 3;

/// A parsed `gs://bucket[/object]` path.
///
/// The object name keeps its leading `/`, so `gs://bucket/a/b.txt` has the
/// object `/a/b.txt`. A path that names only the bucket, such as `gs://bucket`
/// or `gs://bucket/`, has no object.
///
/// # Example
/// ```
/// # use google_cloud_storage_streams::locator::ObjectLocator;
/// let locator = ObjectLocator::parse("gs://my-bucket/path/to/object.txt")?;
/// assert_eq!(locator.bucket(), "my-bucket");
/// assert_eq!(locator.object(), Some("/path/to/object.txt"));
///
/// let bucket = ObjectLocator::parse("gs://my-bucket/")?;
/// assert_eq!(bucket.object(), None);
/// # Ok::<(), google_cloud_storage_streams::error::ValidationError>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectLocator {
    bucket: String,
    object: Option<String>,
}

impl ObjectLocator {
    /// Parses and validates a `gs://bucket[/object]` path.
    pub fn parse(path: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidPath(path.to_string());
        let rest = path.strip_prefix(SCHEME).ok_or_else(invalid)?;
        let (bucket, object) = match rest.find('/') {
            None => (rest, None),
            Some(i) => match &rest[i..] {
                "/" => (&rest[..i], None),
                o => (&rest[..i], Some(o)),
            },
        };
        if bucket.is_empty() {
            return Err(invalid());
        }
        Self::new(bucket, object)
    }

    /// Creates a locator from its parts, validating both.
    ///
    /// A leading `/` is added to the object name if missing.
    pub fn new(bucket: &str, object: Option<&str>) -> Result<Self, ValidationError> {
        validate_bucket(bucket)?;
        let object = match object {
            None => None,
            Some(o) => {
                validate_object(o)?;
                Some(match o.starts_with('/') {
                    true => o.to_string(),
                    false => format!("/{o}"),
                })
            }
        };
        Ok(Self {
            bucket: bucket.to_string(),
            object,
        })
    }

    /// The bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The object name, including its leading `/`.
    pub fn object(&self) -> Option<&str> {
        self.object.as_deref()
    }

    /// The object name, or an error naming the path if this is a bucket.
    pub(crate) fn require_object(&self) -> Result<&str, ValidationError> {
        self.object
            .as_deref()
            .ok_or_else(|| ValidationError::MissingObjectName(self.to_string()))
    }

    /// Returns a locator for `suffix` appended to this object name.
    pub(crate) fn with_suffix(&self, suffix: &str) -> Self {
        let object = self.object.as_deref().unwrap_or("");
        Self {
            bucket: self.bucket.clone(),
            object: Some(format!("{object}{suffix}")),
        }
    }
}

impl std::fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{SCHEME}{}{}",
            self.bucket,
            self.object.as_deref().unwrap_or("")
        )
    }
}

impl std::str::FromStr for ObjectLocator {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Validates a bucket name.
///
/// A valid name:
/// - uses only lowercase letters, digits, `.`, `-`, and `_`,
/// - starts and ends with a letter or digit,
/// - is between 3 and 222 characters long, with each dot-separated component
///   no longer than 63 characters,
/// - does not start with `goog`,
/// - is not an IPv4 address.
pub fn validate_bucket(name: &str) -> Result<(), ValidationError> {
    if is_valid_bucket(name) {
        return Ok(());
    }
    Err(ValidationError::InvalidBucketName(name.to_string()))
}

fn is_valid_bucket(name: &str) -> bool {
    let bytes = name.as_bytes();
    let edge = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    let inner = |b: &u8| edge(b) || matches!(b, b'.' | b'-' | b'_');
    let charset = match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => edge(first) && edge(last) && bytes.iter().all(inner),
        _ => false,
    };
    charset
        && (MIN_BUCKET_NAME_LEN..=MAX_BUCKET_NAME_LEN).contains(&name.len())
        && !name.starts_with(RESERVED_PREFIX)
        && name
            .split('.')
            .all(|l| !l.is_empty() && l.len() <= MAX_BUCKET_LABEL_LEN)
        && name.parse::<std::net::Ipv4Addr>().is_err()
}

/// Validates an object name.
///
/// Object names cannot contain carriage return or line feed characters.
pub fn validate_object(name: &str) -> Result<(), ValidationError> {
    if name.contains(['\r', '\n']) {
        return Err(ValidationError::InvalidObjectName(name.to_string()));
    }
    Ok(())
}
