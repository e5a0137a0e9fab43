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

//! Options to configure object streams.

use crate::error::ValidationError;
use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::time::Duration;

/// How long cached read windows remain valid, unless configured otherwise.
pub const DEFAULT_READ_CACHE_EXPIRY: Duration = Duration::from_secs(3600);

/// The canned ACLs accepted in the `x-goog-acl` header.
///
/// See [predefined ACLs] for their meaning.
///
/// [predefined ACLs]: https://cloud.google.com/storage/docs/access-control/lists#predefined-acl
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum PredefinedAcl {
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl PredefinedAcl {
    /// The value used in the `x-goog-acl` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
            Self::PublicReadWrite => "public-read-write",
            Self::AuthenticatedRead => "authenticated-read",
            Self::BucketOwnerRead => "bucket-owner-read",
            Self::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

impl std::str::FromStr for PredefinedAcl {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let acl = match s {
            "private" => Self::Private,
            "public-read" => Self::PublicRead,
            "public-read-write" => Self::PublicReadWrite,
            "authenticated-read" => Self::AuthenticatedRead,
            "bucket-owner-read" => Self::BucketOwnerRead,
            "bucket-owner-full-control" => Self::BucketOwnerFullControl,
            _ => return Err(ValidationError::InvalidAcl(s.to_string())),
        };
        Ok(acl)
    }
}

/// Configure how a stream reads or writes an object.
///
/// The write options (content type, ACL, metadata, and the standard object
/// headers) apply when the object is created. The cache options apply to
/// reads, and to writes when invalidating cached windows of the object.
///
/// Values are validated when the stream is opened, before any request is
/// sent. Applications can also call [validate][StreamOptions::validate]
/// directly.
///
/// # Example
/// ```
/// # use google_cloud_storage_streams::options::StreamOptions;
/// let options = StreamOptions::default()
///     .with_content_type("text/plain")
///     .with_acl("public-read")
///     .with_metadata([("origin", "sample")])
///     .with_cache(true);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct StreamOptions {
    pub(crate) content_type: Option<String>,
    pub(crate) acl: Option<String>,
    pub(crate) metadata: BTreeMap<String, String>,
    pub(crate) cache_control: Option<String>,
    pub(crate) content_disposition: Option<String>,
    pub(crate) content_encoding: Option<String>,
    pub(crate) content_language: Option<String>,
    pub(crate) enable_cache: bool,
    pub(crate) enable_optimistic_cache: bool,
    pub(crate) read_cache_expiry: Duration,
    pub(crate) read_size: u64,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            content_type: None,
            acl: None,
            metadata: BTreeMap::new(),
            cache_control: None,
            content_disposition: None,
            content_encoding: None,
            content_language: None,
            enable_cache: false,
            enable_optimistic_cache: false,
            read_cache_expiry: DEFAULT_READ_CACHE_EXPIRY,
            read_size: crate::DEFAULT_READ_SIZE,
        }
    }
}

impl StreamOptions {
    /// Sets the `Content-Type` for new objects.
    pub fn with_content_type<V: Into<String>>(mut self, v: V) -> Self {
        self.content_type = Some(v.into());
        self
    }

    /// Sets the canned ACL for new objects.
    ///
    /// The value must be one of the [PredefinedAcl] names, for example
    /// `public-read`. Other values are rejected when the stream is opened.
    pub fn with_acl<V: Into<String>>(mut self, v: V) -> Self {
        self.acl = Some(v.into());
        self
    }

    /// Sets the custom metadata for new objects.
    ///
    /// Keys may only contain ASCII letters, digits, and `-`. Values may only
    /// contain printable ASCII characters.
    pub fn with_metadata<I, K, V>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.metadata = v.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Sets the `Cache-Control` header for new objects.
    pub fn with_cache_control<V: Into<String>>(mut self, v: V) -> Self {
        self.cache_control = Some(v.into());
        self
    }

    /// Sets the `Content-Disposition` header for new objects.
    pub fn with_content_disposition<V: Into<String>>(mut self, v: V) -> Self {
        self.content_disposition = Some(v.into());
        self
    }

    /// Sets the `Content-Encoding` header for new objects.
    pub fn with_content_encoding<V: Into<String>>(mut self, v: V) -> Self {
        self.content_encoding = Some(v.into());
        self
    }

    /// Sets the `Content-Language` header for new objects.
    pub fn with_content_language<V: Into<String>>(mut self, v: V) -> Self {
        self.content_language = Some(v.into());
        self
    }

    /// Enables the read cache.
    ///
    /// The client must be configured with a [CacheStore][crate::cache::CacheStore],
    /// otherwise this option has no effect. Write streams with the cache
    /// enabled invalidate the cached windows of the object when the upload
    /// completes.
    pub fn with_cache(mut self, v: bool) -> Self {
        self.enable_cache = v;
        self
    }

    /// Trust cached windows without revalidating them.
    ///
    /// With this option a cache hit returns the cached data without any
    /// request. The data may be stale for up to the
    /// [read cache expiry][StreamOptions::with_read_cache_expiry]. Without it,
    /// the client revalidates each cached window with a conditional request.
    pub fn with_optimistic_cache(mut self, v: bool) -> Self {
        self.enable_optimistic_cache = v;
        self
    }

    /// How long read windows stay in the cache.
    pub fn with_read_cache_expiry(mut self, v: Duration) -> Self {
        self.read_cache_expiry = v;
        self
    }

    /// The size of each ranged read request.
    ///
    /// Write streams invalidate cached windows of [DEFAULT_READ_SIZE] bytes.
    /// Reads configured with a different size are not invalidated.
    ///
    /// [DEFAULT_READ_SIZE]: crate::DEFAULT_READ_SIZE
    pub fn with_read_size(mut self, v: u64) -> Self {
        self.read_size = v;
        self
    }

    /// The `Content-Type` for new objects, if set.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The custom metadata for new objects.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Validates all the options.
    ///
    /// Returns the first problem found. No request is sent for a stream with
    /// invalid options.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if let Some(acl) = &self.acl {
            acl.parse::<PredefinedAcl>()?;
        }
        for (key, value) in &self.metadata {
            validate_metadata_key(key)?;
            validate_metadata_value(value)?;
        }
        if self.read_size == 0 {
            return Err(ValidationError::InvalidOption {
                name: "read_size",
                reason: "must be greater than zero",
            });
        }
        if self.read_cache_expiry.is_zero() {
            return Err(ValidationError::InvalidOption {
                name: "read_cache_expiry",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }

    /// The headers describing a new object.
    ///
    /// Includes the standard object headers, `x-goog-acl`, and one
    /// `x-goog-meta-<key>` header per metadata entry.
    pub(crate) fn object_headers(&self) -> Result<HeaderMap> {
        self.validate().map_err(Error::binding)?;
        let standard = [
            (http::header::CONTENT_TYPE, &self.content_type),
            (http::header::CACHE_CONTROL, &self.cache_control),
            (http::header::CONTENT_DISPOSITION, &self.content_disposition),
            (http::header::CONTENT_ENCODING, &self.content_encoding),
            (http::header::CONTENT_LANGUAGE, &self.content_language),
            (HeaderName::from_static("x-goog-acl"), &self.acl),
        ];
        let mut headers = HeaderMap::new();
        for (name, value) in standard {
            if let Some(v) = value {
                headers.insert(name, HeaderValue::from_str(v).map_err(Error::ser)?);
            }
        }
        for (key, value) in &self.metadata {
            let name = HeaderName::try_from(format!("x-goog-meta-{key}")).map_err(Error::ser)?;
            headers.insert(name, HeaderValue::from_str(value).map_err(Error::ser)?);
        }
        Ok(headers)
    }
}

fn validate_metadata_key(key: &str) -> std::result::Result<(), ValidationError> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return Err(ValidationError::InvalidMetadataKey(key.to_string()));
    }
    Ok(())
}

fn validate_metadata_value(value: &str) -> std::result::Result<(), ValidationError> {
    if !value.bytes().all(|b| (b' '..=b'~').contains(&b)) {
        return Err(ValidationError::InvalidMetadataValue(value.to_string()));
    }
    Ok(())
}
