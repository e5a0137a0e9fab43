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

//! Types and functions to authenticate requests.
//!
//! The client library asks the [Credentials] for the authentication headers
//! before each request. The credentials are responsible for any caching and
//! refreshing of the underlying tokens.

use http::{HeaderMap, HeaderValue};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// The OAuth scope needed by a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Scope {
    /// Read objects and list buckets.
    ReadOnly,
    /// Create, replace, and delete objects.
    ReadWrite,
    /// Full control over objects, including their ACLs.
    FullControl,
}

impl Scope {
    /// The OAuth scope URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "https://www.googleapis.com/auth/devstorage.read_only",
            Self::ReadWrite => "https://www.googleapis.com/auth/devstorage.read_write",
            Self::FullControl => "https://www.googleapis.com/auth/devstorage.full_control",
        }
    }
}

/// Represents an error creating the authentication headers.
#[derive(Clone, Debug)]
pub struct CredentialsError {
    is_transient: bool,
    source: CredentialsErrorImpl,
}

#[derive(Clone, Debug)]
enum CredentialsErrorImpl {
    SimpleMessage(String),
    Source(Arc<dyn Error + Send + Sync>),
}

impl CredentialsError {
    /// Creates a new error wrapping `source`.
    pub fn new<T: Error + Send + Sync + 'static>(is_transient: bool, source: T) -> Self {
        Self {
            is_transient,
            source: CredentialsErrorImpl::Source(Arc::new(source)),
        }
    }

    /// Creates a new error from a message.
    pub fn from_msg<T: Into<String>>(is_transient: bool, message: T) -> Self {
        Self {
            is_transient,
            source: CredentialsErrorImpl::SimpleMessage(message.into()),
        }
    }

    /// Future attempts to create the headers may succeed.
    pub fn is_transient(&self) -> bool {
        self.is_transient
    }
}

impl Error for CredentialsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.source {
            CredentialsErrorImpl::SimpleMessage(_) => None,
            CredentialsErrorImpl::Source(source) => Some(source.as_ref()),
        }
    }
}

const TRANSIENT_MSG: &str = "but future attempts may succeed";
const PERMANENT_MSG: &str = "and future attempts will not succeed";

impl Display for CredentialsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let msg = if self.is_transient {
            TRANSIENT_MSG
        } else {
            PERMANENT_MSG
        };
        match &self.source {
            CredentialsErrorImpl::SimpleMessage(m) => {
                write!(f, "cannot create access token, {msg}, source:{m}")
            }
            CredentialsErrorImpl::Source(s) => {
                write!(f, "cannot create access token, {msg}, source:{s}")
            }
        }
    }
}

/// Implementations of this trait produce the authentication headers.
///
/// Applications rarely need to implement this trait, except in tests, or to
/// integrate with a custom token source.
///
/// # Example
/// ```
/// # use google_cloud_storage_streams::credentials::{CredentialsError, CredentialsProvider, Scope};
/// #[derive(Debug)]
/// struct Fixed;
///
/// #[async_trait::async_trait]
/// impl CredentialsProvider for Fixed {
///     async fn headers(&self, _scope: Scope) -> Result<http::HeaderMap, CredentialsError> {
///         let mut headers = http::HeaderMap::new();
///         headers.insert("authorization", http::HeaderValue::from_static("Bearer fixed"));
///         Ok(headers)
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait CredentialsProvider: Debug + Send + Sync {
    /// Returns the headers to authenticate a request needing `scope`.
    async fn headers(&self, scope: Scope) -> Result<HeaderMap, CredentialsError>;
}

/// The credentials used by the client library.
///
/// Wraps any [CredentialsProvider]. The default credentials are
/// [anonymous][AnonymousCredentials], which can only access public objects.
#[derive(Clone, Debug)]
pub struct Credentials {
    inner: Arc<dyn CredentialsProvider>,
}

impl Credentials {
    /// Returns the headers to authenticate a request needing `scope`.
    pub async fn headers(&self, scope: Scope) -> Result<HeaderMap, CredentialsError> {
        self.inner.headers(scope).await
    }
}

impl<T> From<T> for Credentials
where
    T: CredentialsProvider + 'static,
{
    fn from(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::from(AnonymousCredentials)
    }
}

/// Credentials that send no authentication headers.
#[derive(Clone, Debug, Default)]
pub struct AnonymousCredentials;

#[async_trait::async_trait]
impl CredentialsProvider for AnonymousCredentials {
    async fn headers(&self, _scope: Scope) -> Result<HeaderMap, CredentialsError> {
        Ok(HeaderMap::new())
    }
}

/// Credentials using a fixed OAuth 2.0 access token.
///
/// The token is sent as-is on every request, the application is responsible
/// for replacing the credentials before the token expires.
///
/// # Example
/// ```
/// # use google_cloud_storage_streams::credentials::{AccessTokenCredentials, Credentials};
/// let credentials: Credentials = AccessTokenCredentials::new("ya29.example").into();
/// ```
#[derive(Clone)]
pub struct AccessTokenCredentials {
    token: String,
}

impl AccessTokenCredentials {
    /// Creates credentials for the given token.
    pub fn new<T: Into<String>>(token: T) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Debug for AccessTokenCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenCredentials")
            .field("token", &"[censored]")
            .finish()
    }
}

#[async_trait::async_trait]
impl CredentialsProvider for AccessTokenCredentials {
    async fn headers(&self, _scope: Scope) -> Result<HeaderMap, CredentialsError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|e| CredentialsError::new(false, e))?;
        value.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, value);
        Ok(headers)
    }
}

#[doc(hidden)]
pub mod testing {
    use super::*;

    /// Credentials returning a fixed, test-only, authorization header.
    pub fn test_credentials() -> Credentials {
        Credentials::from(AccessTokenCredentials::new("test-only-token"))
    }

    /// Credentials that always fail.
    pub fn error_credentials(transient: bool) -> Credentials {
        Credentials::from(ErrorCredentials(transient))
    }

    #[derive(Debug)]
    struct ErrorCredentials(bool);

    #[async_trait::async_trait]
    impl CredentialsProvider for ErrorCredentials {
        async fn headers(&self, _scope: Scope) -> Result<HeaderMap, CredentialsError> {
            Err(CredentialsError::from_msg(self.0, "test-only"))
        }
    }
}
