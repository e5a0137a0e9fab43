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

use super::list_objects::Directory;
use super::object_ops::{self, UrlStat};
use super::read_object::ReadStream;
use super::stream::{Mode, Stream};
use super::stub::{HttpRequest, HttpResponse, Transport};
use super::transport::ReqwestTransport;
use super::upload::WriteStream;
use crate::backoff_policy::BackoffPolicy;
use crate::cache::CacheStore;
use crate::credentials::{Credentials, Scope};
use crate::locator::ObjectLocator;
use crate::options::StreamOptions;
use crate::retry_policy::RetryPolicy;
use crate::{Error, Result};
use http::{HeaderName, HeaderValue};
use std::sync::Arc;

/// Implements a client for the Cloud Storage XML API.
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// # use google_cloud_storage_streams::client::Storage;
/// let client = Storage::builder().build()?;
/// // use `client` to open streams over Cloud Storage objects.
/// # google_cloud_storage_streams::Result::<()>::Ok(()) });
/// ```
///
/// # Configuration
///
/// To configure `Storage` use the `with_*` methods in the type returned
/// by [builder()][Storage::builder]. The default configuration should
/// work for most applications. Common configuration changes include
///
/// * [with_endpoint()]: by default this client uses the global default endpoint
///   (`https://storage.googleapis.com`). Applications using regional
///   endpoints, or an emulator, may want to override this default.
/// * [with_credentials()]: by default this client sends anonymous requests.
///   Applications reading or writing private objects must provide
///   credentials.
/// * [with_cache()]: by default this client does not cache reads. Streams
///   opened with [StreamOptions::with_cache] use the configured store.
///
/// # Pooling and Cloning
///
/// `Storage` holds a connection pool internally, it is advised to
/// create one and then reuse it.  You do not need to wrap `Storage` in
/// an [Rc](std::rc::Rc) or [Arc] to reuse it, because it already uses an `Arc`
/// internally.
///
/// [with_endpoint()]: ClientBuilder::with_endpoint
/// [with_credentials()]: ClientBuilder::with_credentials
/// [with_cache()]: ClientBuilder::with_cache
#[derive(Clone, Debug)]
pub struct Storage {
    inner: Arc<StorageInner>,
}

#[derive(Clone, Debug)]
pub(crate) struct StorageInner {
    pub transport: Arc<dyn Transport>,
    pub cred: Credentials,
    pub endpoint: String,
    pub cache: Option<Arc<dyn CacheStore>>,
    pub read_retry: Arc<dyn RetryPolicy>,
    pub read_backoff: Arc<dyn BackoffPolicy>,
}

impl Storage {
    /// Returns a builder for [Storage].
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_streams::client::Storage;
    /// # fn sample() -> anyhow::Result<()> {
    /// let client = Storage::builder().build()?;
    /// # Ok(()) }
    /// ```
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Opens a stream over an object.
    ///
    /// Use [Mode::Read] to download an existing object, and [Mode::Write] to
    /// create (or replace) an object. Opening a write stream starts a
    /// resumable upload session, the object is created when the stream is
    /// [closed][Stream::close].
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_streams::client::Storage;
    /// # use google_cloud_storage_streams::options::StreamOptions;
    /// # use google_cloud_storage_streams::stream::Mode;
    /// # async fn sample(client: &Storage) -> anyhow::Result<()> {
    /// let mode: Mode = "rb".parse()?;
    /// let mut stream = client
    ///     .open("gs://my-bucket/my-object", mode, StreamOptions::default())
    ///     .await?;
    /// let contents = stream.read_to_end().await?;
    /// println!("object contents={contents:?}");
    /// # Ok(()) }
    /// ```
    ///
    /// # Parameters
    /// * `path` - the object path, in `gs://{bucket}/{object}` format.
    /// * `mode` - read or write.
    /// * `options` - the object attributes (for writes) and cache settings.
    pub async fn open(&self, path: &str, mode: Mode, options: StreamOptions) -> Result<Stream> {
        match mode {
            Mode::Read => self.open_read(path, options).await.map(Stream::Read),
            Mode::Write => self.open_write(path, options).await.map(Stream::Write),
        }
    }

    /// Opens a stream to read an object.
    ///
    /// No request is sent until the first read or [stat][ReadStream::stat].
    pub async fn open_read(&self, path: &str, options: StreamOptions) -> Result<ReadStream> {
        let locator = ObjectLocator::parse(path).map_err(Error::binding)?;
        ReadStream::new(self.inner.clone(), locator, options)
    }

    /// Opens a stream to create an object.
    ///
    /// Validates the options, and then starts a resumable upload session.
    pub async fn open_write(&self, path: &str, options: StreamOptions) -> Result<WriteStream> {
        let locator = ObjectLocator::parse(path).map_err(Error::binding)?;
        WriteStream::open(self.inner.clone(), locator, options).await
    }

    /// Deletes an object.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_streams::client::Storage;
    /// # async fn sample(client: &Storage) -> anyhow::Result<()> {
    /// client.delete("gs://my-bucket/my-object").await?;
    /// # Ok(()) }
    /// ```
    pub async fn delete(&self, path: &str) -> Result<()> {
        let locator = ObjectLocator::parse(path).map_err(Error::binding)?;
        object_ops::delete(&self.inner, &locator).await
    }

    /// Renames an object, by copying it and deleting the original.
    ///
    /// With `options` set to `None` the copy keeps the content type and
    /// metadata of the original object. Otherwise the copy uses the content
    /// type, ACL, and metadata from `options`.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_streams::client::Storage;
    /// # async fn sample(client: &Storage) -> anyhow::Result<()> {
    /// client
    ///     .rename("gs://my-bucket/old-name", "gs://my-bucket/new-name", None)
    ///     .await?;
    /// # Ok(()) }
    /// ```
    pub async fn rename(
        &self,
        from: &str,
        to: &str,
        options: Option<StreamOptions>,
    ) -> Result<()> {
        let from = ObjectLocator::parse(from).map_err(Error::binding)?;
        let to = ObjectLocator::parse(to).map_err(Error::binding)?;
        object_ops::rename(&self.inner, &from, &to, options.as_ref()).await
    }

    /// Creates a directory placeholder.
    ///
    /// Cloud Storage has no directories, this creates an empty object named
    /// `<path>/`. Fails if the placeholder already exists.
    pub async fn mkdir(&self, path: &str) -> Result<()> {
        let locator = ObjectLocator::parse(path).map_err(Error::binding)?;
        object_ops::mkdir(&self.inner, &locator).await
    }

    /// Removes an empty directory placeholder.
    ///
    /// Fails if any object, other than the placeholder, uses the directory
    /// as a prefix.
    pub async fn rmdir(&self, path: &str) -> Result<()> {
        let locator = ObjectLocator::parse(path).map_err(Error::binding)?;
        object_ops::rmdir(&self.inner, &locator).await
    }

    /// Describes an object or directory.
    pub async fn url_stat(&self, path: &str) -> Result<UrlStat> {
        let locator = ObjectLocator::parse(path).map_err(Error::binding)?;
        object_ops::url_stat(&self.inner, &locator).await
    }

    /// Lists the immediate children of a directory.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_streams::client::Storage;
    /// # async fn sample(client: &Storage) -> anyhow::Result<()> {
    /// let mut dir = client.open_dir("gs://my-bucket/photos").await?;
    /// while let Some(entry) = dir.next_entry().await? {
    ///     println!("{} (directory: {})", entry.name, entry.is_dir);
    /// }
    /// # Ok(()) }
    /// ```
    pub async fn open_dir(&self, path: &str) -> Result<Directory> {
        let locator = ObjectLocator::parse(path).map_err(Error::binding)?;
        Directory::open(self.inner.clone(), locator).await
    }

    pub(crate) fn new(builder: ClientBuilder) -> Result<Self> {
        let transport: Arc<dyn Transport> = match builder.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new()?),
        };
        let inner = StorageInner {
            transport,
            cred: builder.credentials.unwrap_or_default(),
            endpoint: builder
                .endpoint
                .unwrap_or_else(|| self::DEFAULT_HOST.to_string()),
            cache: builder.cache,
            read_retry: builder
                .read_retry
                .unwrap_or_else(|| Arc::new(crate::retry_policy::read_default())),
            read_backoff: builder
                .read_backoff
                .unwrap_or_else(|| Arc::new(crate::backoff_policy::read_default())),
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }
}

impl StorageInner {
    /// The URL for an object, `object` keeps its leading `/`.
    pub fn object_url(&self, bucket: &str, object: &str) -> String {
        format!("{}/{bucket}{}", self.endpoint, enc(object))
    }

    /// The URL for a bucket.
    pub fn bucket_url(&self, bucket: &str) -> String {
        format!("{}/{bucket}", self.endpoint)
    }

    /// The cache to use with `options`, if any.
    pub fn cache_for(&self, options: &StreamOptions) -> Option<Arc<dyn CacheStore>> {
        match options.enable_cache {
            true => self.cache.clone(),
            false => None,
        }
    }

    /// Sends a request with the common and authentication headers.
    ///
    /// The response is returned whatever its status code.
    pub async fn send(&self, scope: Scope, request: HttpRequest) -> Result<HttpResponse> {
        let request = self
            .apply_auth_headers(scope, request)
            .await?
            .with_header(
                HeaderName::from_static("x-goog-api-version"),
                HeaderValue::from_static("2"),
            )
            .with_header(
                HeaderName::from_static("x-goog-api-client"),
                HeaderValue::from_static(&self::info::X_GOOG_API_CLIENT_HEADER),
            );
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            range = request.header_str("range"),
            content_range = request.header_str("content-range"),
            "sending request"
        );
        let response = self.transport.execute(request).await?;
        tracing::debug!(status = response.status.as_u16(), "received response");
        Ok(response)
    }

    // Helper method to apply authentication headers to the request.
    async fn apply_auth_headers(&self, scope: Scope, request: HttpRequest) -> Result<HttpRequest> {
        let auth_headers = self
            .cred
            .headers(scope)
            .await
            .map_err(Error::authentication)?;
        Ok(request.with_headers(auth_headers))
    }
}

/// A builder for [Storage].
///
/// ```
/// # use google_cloud_storage_streams::client::Storage;
/// # fn sample() -> anyhow::Result<()> {
/// let builder = Storage::builder();
/// let client = builder
///     .with_endpoint("https://storage.googleapis.com")
///     .build()?;
/// # Ok(()) }
/// ```
#[derive(Debug, Default)]
pub struct ClientBuilder {
    pub(crate) endpoint: Option<String>,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) transport: Option<Arc<dyn Transport>>,
    pub(crate) cache: Option<Arc<dyn CacheStore>>,
    pub(crate) read_retry: Option<Arc<dyn RetryPolicy>>,
    pub(crate) read_backoff: Option<Arc<dyn BackoffPolicy>>,
}

impl ClientBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Creates a new client.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_streams::client::Storage;
    /// # fn sample() -> anyhow::Result<()> {
    /// let client = Storage::builder().build()?;
    /// # Ok(()) }
    /// ```
    pub fn build(self) -> Result<Storage> {
        Storage::new(self)
    }

    /// Sets the endpoint.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_streams::client::Storage;
    /// # fn sample() -> anyhow::Result<()> {
    /// let client = Storage::builder()
    ///     .with_endpoint("https://private.googleapis.com")
    ///     .build()?;
    /// # Ok(()) }
    /// ```
    pub fn with_endpoint<V: Into<String>>(mut self, v: V) -> Self {
        let endpoint: String = v.into();
        self.endpoint = Some(endpoint.trim_end_matches('/').to_string());
        self
    }

    /// Configures the authentication credentials.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_streams::client::Storage;
    /// # fn sample() -> anyhow::Result<()> {
    /// use google_cloud_storage_streams::credentials::AccessTokenCredentials;
    /// let client = Storage::builder()
    ///     .with_credentials(AccessTokenCredentials::new("ya29.example"))
    ///     .build()?;
    /// # Ok(()) }
    /// ```
    pub fn with_credentials<V: Into<Credentials>>(mut self, v: V) -> Self {
        self.credentials = Some(v.into());
        self
    }

    /// Configures the transport used to send requests.
    ///
    /// The default transport uses [reqwest]. Tests can replace it with a fake.
    pub fn with_transport<T: Transport + 'static>(mut self, v: T) -> Self {
        self.transport = Some(Arc::new(v));
        self
    }

    /// Configures the store for the read cache.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_streams::client::Storage;
    /// # fn sample() -> anyhow::Result<()> {
    /// use google_cloud_storage_streams::cache::InMemoryCache;
    /// let client = Storage::builder()
    ///     .with_cache(InMemoryCache::new())
    ///     .build()?;
    /// # Ok(()) }
    /// ```
    pub fn with_cache<C: CacheStore + 'static>(mut self, v: C) -> Self {
        self.cache = Some(Arc::new(v));
        self
    }

    /// Configures the retry policy for ranged reads.
    ///
    /// Uploads are never retried.
    pub fn with_read_retry_policy<P: RetryPolicy + 'static>(mut self, v: P) -> Self {
        self.read_retry = Some(Arc::new(v));
        self
    }

    /// Configures the delay between attempts of a ranged read.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_streams::client::Storage;
    /// # use std::time::Duration;
    /// # fn sample() -> anyhow::Result<()> {
    /// use google_cloud_storage_streams::backoff_policy::ExponentialBackoffBuilder;
    /// let policy = ExponentialBackoffBuilder::new()
    ///     .with_initial_delay(Duration::from_millis(200))
    ///     .build()?;
    /// let client = Storage::builder()
    ///     .with_read_backoff_policy(policy)
    ///     .build()?;
    /// # Ok(()) }
    /// ```
    pub fn with_read_backoff_policy<P: BackoffPolicy + 'static>(mut self, v: P) -> Self {
        self.read_backoff = Some(Arc::new(v));
        self
    }
}

/// The default host used by the service.
const DEFAULT_HOST: &str = "https://storage.googleapis.com";

pub(crate) mod info {
    const NAME: &str = env!("CARGO_PKG_NAME");
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    mod build_info {
        // The file has been placed there by the build script.
        include!(concat!(env!("OUT_DIR"), "/build_env.rs"));
    }

    lazy_static::lazy_static! {
        pub(crate) static ref X_GOOG_API_CLIENT_HEADER: String = {
            let rustc_version = build_info::RUSTC_VERSION;
            let rustc_version = rustc_version
                .strip_prefix("rustc ")
                .unwrap_or(rustc_version);
            format!("gl-rust/{rustc_version} xml/{VERSION}-reqwest gccl/{VERSION} {NAME}")
        };
    }
}

/// The set of characters that are percent encoded in object names.
///
/// This set is defined at https://cloud.google.com/storage/docs/request-endpoints#encoding.
/// The `/` separators are kept, the XML API uses them as part of the path.
const ENCODED_CHARS: percent_encoding::AsciiSet = percent_encoding::CONTROLS
    .add(b'!')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b':')
    .add(b';')
    .add(b'=')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b']')
    .add(b' ');

/// Percent encode an object name.
pub(crate) fn enc(value: &str) -> String {
    percent_encoding::utf8_percent_encode(value, &ENCODED_CHARS).to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::credentials::testing::{error_credentials, test_credentials};
    use crate::storage::stub::tests::MockTransport;
    use http::{Method, StatusCode};
    use test_case::test_case;

    type Result = anyhow::Result<()>;

    pub(crate) fn test_builder() -> ClientBuilder {
        ClientBuilder::new()
            .with_credentials(test_credentials())
            .with_endpoint("http://private.googleapis.com")
    }

    /// This is used by the stream tests.
    pub(crate) fn test_inner_client<T: Transport + 'static>(transport: T) -> Arc<StorageInner> {
        inner_client(test_builder().with_transport(transport))
    }

    pub(crate) fn inner_client(builder: ClientBuilder) -> Arc<StorageInner> {
        builder
            .build()
            .expect("building a client with a transport never fails")
            .inner
    }

    #[test_case("/object.txt", "/object.txt")]
    #[test_case("/a/b/c.txt", "/a/b/c.txt")]
    #[test_case("/with spaces?#", "/with%20spaces%3F%23")]
    #[test_case("/100%", "/100%25")]
    #[test_case("/caf\u{e9}", "/caf%C3%A9")]
    fn object_url(object: &str, want: &str) -> Result {
        let inner = test_inner_client(MockTransport::new());
        assert_eq!(
            inner.object_url("bucket", object),
            format!("http://private.googleapis.com/bucket{want}")
        );
        assert_eq!(
            inner.bucket_url("bucket"),
            "http://private.googleapis.com/bucket"
        );
        Ok(())
    }

    #[tokio::test]
    async fn send_adds_headers() -> Result {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|r| {
                r.header_str("x-goog-api-version") == Some("2")
                    && r.header_str("authorization") == Some("Bearer test-only-token")
                    && r.header_str("x-goog-api-client")
                        .is_some_and(|v| v.contains("gl-rust/"))
            })
            .return_once(|_| Ok(HttpResponse::new(StatusCode::OK)));
        let inner = test_inner_client(mock);
        let response = inner
            .send(
                Scope::ReadOnly,
                HttpRequest::new(Method::GET, "http://private.googleapis.com/b/o"),
            )
            .await?;
        assert_eq!(response.status, StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn send_auth_error() -> Result {
        let mut mock = MockTransport::new();
        mock.expect_execute().never();
        let client = test_builder()
            .with_credentials(error_credentials(false))
            .with_transport(mock)
            .build()?;
        let err = client
            .inner
            .send(
                Scope::ReadOnly,
                HttpRequest::new(Method::GET, "http://private.googleapis.com/b/o"),
            )
            .await
            .unwrap_err();
        assert!(err.is_authentication(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn invalid_paths() -> Result {
        let mut mock = MockTransport::new();
        mock.expect_execute().never();
        let client = test_builder().with_transport(mock).build()?;

        let err = client
            .open("gs://BadBucket/o", Mode::Read, StreamOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_binding(), "{err:?}");
        let err = client
            .open("bucket/o", Mode::Write, StreamOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_binding(), "{err:?}");
        let err = client.delete("gs://goog-bucket/o").await.unwrap_err();
        assert!(err.is_binding(), "{err:?}");
        let err = client
            .rename("gs://bucket/a", "gs://BAD/b", None)
            .await
            .unwrap_err();
        assert!(err.is_binding(), "{err:?}");
        Ok(())
    }

    #[test]
    fn builder() -> Result {
        let client = Storage::builder()
            .with_endpoint("https://example.com/")
            .build()?;
        assert_eq!(client.inner.endpoint, "https://example.com");
        assert!(client.inner.cache.is_none());

        let client = Storage::builder().build()?;
        assert_eq!(client.inner.endpoint, DEFAULT_HOST);
        Ok(())
    }

    #[test]
    fn cache_for() -> Result {
        let client = test_builder()
            .with_transport(MockTransport::new())
            .with_cache(crate::cache::InMemoryCache::new())
            .build()?;
        let inner = client.inner;
        assert!(inner.cache_for(&StreamOptions::default()).is_none());
        assert!(
            inner
                .cache_for(&StreamOptions::default().with_cache(true))
                .is_some()
        );
        Ok(())
    }

    static_assertions::assert_impl_all!(Storage: Clone, Send, Sync, std::fmt::Debug);
}
