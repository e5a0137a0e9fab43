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

use super::client::StorageInner;
use super::status::to_http_error;
use super::stream::{ObjectStat, Whence};
use super::stub::{HttpRequest, HttpResponse};
use crate::backoff_policy::BackoffPolicy as _;
use crate::cache::{CacheEntry, CacheStore, cache_key};
use crate::credentials::Scope;
use crate::error::ReadError;
use crate::locator::ObjectLocator;
use crate::options::StreamOptions;
use crate::range::{RangeError, RangeRequest, parse_content_range};
use crate::retry_policy::RetryResult;
use crate::{Error, Result};
use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_RANGE, ETAG, IF_MATCH, IF_NONE_MATCH, RANGE};
use http::{HeaderValue, Method, StatusCode};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The default size of each ranged read.
///
/// Write streams use this size to find the cached windows of an object they
/// replace.
pub const DEFAULT_READ_SIZE: u64 = 524288;

/// The outcome of fetching one window.
#[derive(Debug)]
enum Fetched {
    Window(CacheEntry),
    /// The service returned `416 Range Not Satisfiable`, with the object size
    /// if it was reported.
    EndOfObject(Option<u64>),
}

/// Reads an object in ranged windows.
///
/// Each window is [read_size][StreamOptions::with_read_size] bytes, fetched
/// with a single `GET` request. Reads are served from the current window
/// until it is exhausted. Once the first window is received, further requests
/// carry an `If-Match` header with its `ETag`, so a stream never mixes data
/// from two versions of the object.
///
/// With the cache enabled each window is stored in the client's
/// [CacheStore]. By default cached windows are revalidated with a conditional
/// request, with the optimistic cache they are used without any request.
///
/// # Example
/// ```
/// # use google_cloud_storage_streams::client::Storage;
/// # use google_cloud_storage_streams::options::StreamOptions;
/// # async fn sample(client: &Storage) -> anyhow::Result<()> {
/// let mut reader = client
///     .open_read("gs://my-bucket/my-object", StreamOptions::default())
///     .await?;
/// loop {
///     let chunk = reader.read(4096).await?;
///     if chunk.is_empty() {
///         break;
///     }
///     println!("received {} bytes", chunk.len());
/// }
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct ReadStream {
    inner: Arc<StorageInner>,
    locator: ObjectLocator,
    object_url: String,
    options: StreamOptions,
    cache: Option<Arc<dyn CacheStore>>,
    // The unread part of the current window, it starts at `position`.
    buffer: Bytes,
    position: u64,
    object_size: Option<u64>,
    etag: Option<String>,
    // The headers of the most recent window.
    headers: Option<BTreeMap<String, String>>,
    eof: bool,
}

impl ReadStream {
    /// Validates the options. No request is sent until the first read.
    pub(crate) fn new(
        inner: Arc<StorageInner>,
        locator: ObjectLocator,
        options: StreamOptions,
    ) -> Result<Self> {
        let object = locator.require_object().map_err(Error::binding)?;
        options.validate().map_err(Error::binding)?;
        let object_url = inner.object_url(locator.bucket(), object);
        let cache = inner.cache_for(&options);
        Ok(Self {
            inner,
            locator,
            object_url,
            options,
            cache,
            buffer: Bytes::new(),
            position: 0,
            object_size: None,
            etag: None,
            headers: None,
            eof: false,
        })
    }

    /// Reads at most `max` bytes from the current position.
    ///
    /// Returns an empty buffer at the end of the object. Sends a request only
    /// when the current window is exhausted.
    pub async fn read(&mut self, max: usize) -> Result<Bytes> {
        if max == 0 {
            return Ok(Bytes::new());
        }
        if self.buffer.is_empty() {
            if self.eof || self.at_known_end() {
                self.eof = true;
                return Ok(Bytes::new());
            }
            self.fill_buffer().await?;
            if self.buffer.is_empty() {
                return Ok(Bytes::new());
            }
        }
        let len = max.min(self.buffer.len());
        let data = self.buffer.split_to(len);
        self.position += len as u64;
        Ok(data)
    }

    /// Reads from the current position to the end of the object.
    pub async fn read_to_end(&mut self) -> Result<Bytes> {
        let mut contents = BytesMut::new();
        loop {
            let chunk = self.read(usize::MAX).await?;
            if chunk.is_empty() {
                break;
            }
            contents.extend_from_slice(&chunk);
        }
        Ok(contents.freeze())
    }

    /// Moves the read position.
    ///
    /// Discards the current window, the next read fetches a new window at the
    /// new position. If the object size is known, seeking past the end fails
    /// without sending any requests. Seeking relative to the end fetches a
    /// window if the size is not known yet.
    pub async fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => self.position,
            Whence::End => self.size().await?,
        };
        let target = i64::try_from(base)
            .ok()
            .and_then(|b| b.checked_add(offset))
            .ok_or_else(|| Error::binding(ReadError::NegativeSeek(offset)))?;
        let target =
            u64::try_from(target).map_err(|_| Error::binding(ReadError::NegativeSeek(target)))?;
        if let Some(size) = self.object_size.filter(|s| target > *s) {
            return Err(Error::binding(ReadError::SeekPastEnd {
                offset: target,
                size,
            }));
        }
        self.position = target;
        self.buffer = Bytes::new();
        self.eof = false;
        Ok(target)
    }

    /// Describes the object, fetching the first window if needed.
    pub async fn stat(&mut self) -> Result<ObjectStat> {
        let size = self.size().await?;
        let headers = self.headers.iter().flatten();
        Ok(ObjectStat::from_headers(
            size,
            headers.map(|(k, v)| (k.as_str(), v.as_str())),
        ))
    }

    /// The current read position.
    pub fn tell(&self) -> u64 {
        self.position
    }

    /// Returns `true` once the position reaches the end of the object.
    pub fn eof(&self) -> bool {
        self.eof || (self.buffer.is_empty() && self.at_known_end())
    }

    /// The path of the object.
    pub fn locator(&self) -> &ObjectLocator {
        &self.locator
    }

    /// Releases the current window.
    pub fn close(&mut self) {
        self.buffer = Bytes::new();
    }

    fn at_known_end(&self) -> bool {
        self.object_size.is_some_and(|s| self.position >= s)
    }

    async fn size(&mut self) -> Result<u64> {
        if self.object_size.is_none() && self.headers.is_none() {
            self.fill_buffer().await?;
        }
        self.object_size
            .ok_or_else(|| Error::deser(ReadError::MissingHeader("content-range")))
    }

    /// Fetches the window starting at the current position.
    async fn fill_buffer(&mut self) -> Result<()> {
        let range = RangeRequest::window(self.position, self.options.read_size);
        let key = cache_key(&self.object_url, &range.to_header());
        let cached = match &self.cache {
            Some(cache) => cache.get(&key).await,
            None => None,
        };
        if let Some(entry) = cached.as_ref().filter(|_| self.options.enable_optimistic_cache) {
            tracing::debug!(locator = %self.locator, %range, "using cached window");
            return self.handle_window(&range, entry.clone());
        }
        match self.fetch_with_retry(&range, &key, cached.as_ref()).await? {
            Fetched::Window(entry) => self.handle_window(&range, entry),
            Fetched::EndOfObject(size) => {
                tracing::debug!(locator = %self.locator, %range, "range not satisfiable");
                self.object_size = size.or(self.object_size).or_else(|| {
                    // Nothing at offset 0 means an empty object.
                    (self.position == 0).then_some(0)
                });
                self.eof = true;
                Ok(())
            }
        }
    }

    async fn fetch_with_retry(
        &self,
        range: &RangeRequest,
        key: &str,
        cached: Option<&CacheEntry>,
    ) -> Result<Fetched> {
        let mut attempt_count = 0;
        loop {
            attempt_count += 1;
            let error = match self.fetch(range, key, cached).await {
                Ok(fetched) => return Ok(fetched),
                Err(e) => e,
            };
            match self.inner.read_retry.on_error(attempt_count, error) {
                RetryResult::Continue(e) => {
                    let delay = self.inner.read_backoff.on_failure(attempt_count);
                    tracing::warn!(
                        locator = %self.locator,
                        %range,
                        attempt_count,
                        ?delay,
                        "retrying ranged read: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryResult::Permanent(e) | RetryResult::Exhausted(e) => {
                    tracing::error!(
                        locator = %self.locator,
                        %range,
                        attempt_count,
                        "ranged read failed: {e}"
                    );
                    return Err(e);
                }
            }
        }
    }

    async fn fetch(
        &self,
        range: &RangeRequest,
        key: &str,
        cached: Option<&CacheEntry>,
    ) -> Result<Fetched> {
        let mut request = HttpRequest::new(Method::GET, &self.object_url)
            .with_header(RANGE, header_value(&range.to_header())?);
        if let Some(etag) = &self.etag {
            request = request.with_header(IF_MATCH, header_value(etag)?);
        }
        if let Some(etag) = cached.and_then(|c| c.header(ETAG.as_str())) {
            request = request.with_header(IF_NONE_MATCH, header_value(etag)?);
        }
        let response = self.inner.send(Scope::ReadOnly, request).await?;
        match response.status {
            StatusCode::OK | StatusCode::PARTIAL_CONTENT => {
                let entry = self::to_cache_entry(response);
                if let Some(cache) = &self.cache {
                    cache
                        .set(key, entry.clone(), self.options.read_cache_expiry)
                        .await;
                }
                Ok(Fetched::Window(entry))
            }
            StatusCode::NOT_MODIFIED => cached
                .cloned()
                .map(Fetched::Window)
                .ok_or_else(|| Error::deser(ReadError::NotModifiedWithoutCache)),
            StatusCode::RANGE_NOT_SATISFIABLE => {
                let size = response
                    .header_str(CONTENT_RANGE.as_str())
                    .and_then(|v| parse_content_range(v).ok())
                    .and_then(|r| r.total);
                Ok(Fetched::EndOfObject(size))
            }
            s if s.is_success() => Err(Error::deser(ReadError::UnexpectedSuccessCode(
                s.as_u16(),
            ))),
            _ => Err(to_http_error(response)),
        }
    }

    /// Makes `entry` the current window.
    ///
    /// A `200 OK` holds the full object. A `206 Partial Content` holds the
    /// bytes described by its `Content-Range` header, which must include the
    /// current position.
    fn handle_window(&mut self, range: &RangeRequest, entry: CacheEntry) -> Result<()> {
        let (start, size) = match entry.status_code {
            200 => (0, Some(entry.body.len() as u64)),
            206 => {
                let header = entry
                    .header(CONTENT_RANGE.as_str())
                    .ok_or_else(|| Error::deser(ReadError::MissingHeader("content-range")))?;
                let response_range = parse_content_range(header).map_err(|e| {
                    Error::deser(ReadError::BadHeaderFormat("content-range", e.into()))
                })?;
                let (start, end) = response_range
                    .span
                    .unwrap_or((range.start() as u64, u64::MAX));
                if start > self.position || end < self.position {
                    let e = RangeError::Malformed(header.to_string());
                    return Err(Error::deser(ReadError::BadHeaderFormat(
                        "content-range",
                        e.into(),
                    )));
                }
                (start, response_range.total)
            }
            code => return Err(Error::deser(ReadError::UnexpectedSuccessCode(code))),
        };
        if let Some(size) = size {
            self.object_size = Some(size);
        }
        if let Some(etag) = entry.header(ETAG.as_str()) {
            self.etag = Some(etag.to_string());
        }
        let skip = (self.position.saturating_sub(start) as usize).min(entry.body.len());
        self.buffer = entry.body.slice(skip..);
        if self.buffer.is_empty() {
            self.eof = true;
        }
        tracing::debug!(
            locator = %self.locator,
            position = self.position,
            len = self.buffer.len(),
            "window received"
        );
        self.headers = Some(entry.headers);
        Ok(())
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(Error::ser)
}

fn to_cache_entry(response: HttpResponse) -> CacheEntry {
    let headers = response
        .headers
        .iter()
        .filter_map(|(k, v)| {
            v.to_str()
                .ok()
                .map(|v| (k.as_str().to_string(), v.to_string()))
        })
        .collect();
    CacheEntry {
        status_code: response.status.as_u16(),
        headers,
        body: response.body,
    }
}
