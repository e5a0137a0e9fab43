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
use super::read_object::DEFAULT_READ_SIZE;
use super::status::{RESUME_INCOMPLETE, expect_status, to_http_error};
use super::stub::{HttpRequest, HttpResponse};
use crate::cache::cache_key;
use crate::credentials::Scope;
use crate::error::UploadError;
use crate::locator::ObjectLocator;
use crate::options::StreamOptions;
use crate::range::{ContentRange, RangeRequest};
use crate::{Error, Result};
use buffer::UploadBuffer;
use http::{HeaderValue, Method, StatusCode};
use std::collections::BTreeMap;
use std::sync::Arc;

mod buffer;

/// The service requires all chunks, except the last one, to be multiples of
/// this size.
pub const WRITE_CHUNK_SIZE: usize = 262144;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionState {
    Active,
    Completing,
    Closed,
}

/// Writes a new object using a resumable upload session.
///
/// Data is buffered in memory and sent in chunks of [WRITE_CHUNK_SIZE]
/// bytes. The object is created when the stream is [closed][WriteStream::close],
/// which sends any remaining data. An object is never created if the stream
/// is dropped without closing it.
///
/// # Example
/// ```
/// # use google_cloud_storage_streams::client::Storage;
/// # use google_cloud_storage_streams::options::StreamOptions;
/// # async fn sample(client: &Storage) -> anyhow::Result<()> {
/// let mut writer = client
///     .open_write("gs://my-bucket/my-object", StreamOptions::default())
///     .await?;
/// writer.write(b"the quick brown fox").await?;
/// writer.write(b" jumps over the lazy dog").await?;
/// writer.close().await?;
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct WriteStream {
    inner: Arc<StorageInner>,
    locator: ObjectLocator,
    object_url: String,
    upload_url: String,
    options: StreamOptions,
    buffer: UploadBuffer,
    state: SessionState,
}

impl WriteStream {
    /// Validates the options and starts the upload session.
    pub(crate) async fn open(
        inner: Arc<StorageInner>,
        locator: ObjectLocator,
        options: StreamOptions,
    ) -> Result<Self> {
        let object = locator.require_object().map_err(Error::binding)?;
        let headers = options.object_headers()?;
        let object_url = inner.object_url(locator.bucket(), object);
        let request = HttpRequest::new(Method::POST, &object_url)
            .with_headers(headers)
            .with_header("x-goog-resumable", HeaderValue::from_static("start"));
        let response = inner.send(Scope::ReadWrite, request).await?;
        let upload_id = self::handle_start_response(response)?;
        let upload_url = format!(
            "{object_url}?{}",
            url::form_urlencoded::Serializer::new(String::new())
                .append_pair("upload_id", &upload_id)
                .finish()
        );
        tracing::info!(%locator, %upload_id, "started resumable upload");
        Ok(Self {
            inner,
            locator,
            object_url,
            upload_url,
            options,
            buffer: UploadBuffer::new(),
            state: SessionState::Active,
        })
    }

    /// Appends `data` to the object.
    ///
    /// Returns the number of bytes accepted, always `data.len()` on success.
    /// Data is sent to the service once at least [WRITE_CHUNK_SIZE] bytes are
    /// buffered. If sending fails none of `data` is accepted, the buffer is
    /// left as it was before the call, and the application may write the same
    /// data again.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize> {
        if self.state != SessionState::Active {
            return Err(Error::binding(UploadError::Closed));
        }
        self.buffer.append(data);
        if self.buffer.len() < WRITE_CHUNK_SIZE {
            return Ok(data.len());
        }
        let len = self.buffer.aligned_len(WRITE_CHUNK_SIZE);
        if let Err(e) = self.send_chunk(len, false).await {
            self.buffer.rollback(data.len());
            tracing::warn!(
                locator = %self.locator,
                "cannot send chunk, rolled back {} bytes: {e}",
                data.len()
            );
            return Err(e);
        }
        Ok(data.len())
    }

    /// Sends any buffered data and finalizes the object.
    ///
    /// With the cache enabled, also removes any cached read windows for the
    /// object. Closing a closed stream has no effect. If a previous call was
    /// cancelled before it completed, this sends the final chunk again.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Completing;
        let len = self.buffer.len();
        let result = self.send_chunk(len, true).await;
        self.state = SessionState::Closed;
        if let Err(e) = result {
            tracing::error!(locator = %self.locator, "cannot finalize upload: {e}");
            return Err(e);
        }
        let size = self.buffer.end_offset();
        tracing::info!(locator = %self.locator, size, "finalized upload");
        self.invalidate_cache(size).await;
        Ok(())
    }

    /// Chunks are only sent when aligned, this has no effect.
    pub async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// The number of bytes accepted so far.
    pub fn tell(&self) -> u64 {
        self.buffer.end_offset()
    }

    /// The custom metadata for the new object.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        self.options.metadata()
    }

    /// The content type for the new object, if set.
    pub fn content_type(&self) -> Option<&str> {
        self.options.content_type()
    }

    /// The path of the new object.
    pub fn locator(&self) -> &ObjectLocator {
        &self.locator
    }

    /// Returns `true` once the stream is closed, successfully or not.
    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    async fn send_chunk(&mut self, len: usize, finalize: bool) -> Result<()> {
        let range = ContentRange::for_chunk(self.buffer.start_offset(), len as u64, finalize);
        let mut request = HttpRequest::new(Method::PUT, &self.upload_url).with_header(
            http::header::CONTENT_RANGE,
            HeaderValue::from_str(&range.to_header()).map_err(Error::ser)?,
        );
        if len > 0 {
            request = request.with_body(self.buffer.prefix(len));
        }
        let response = self.inner.send(Scope::ReadWrite, request).await?;
        let expected = match finalize {
            true => StatusCode::OK.as_u16(),
            false => RESUME_INCOMPLETE,
        };
        expect_status(response, expected)?;
        self.buffer.consume(len);
        Ok(())
    }

    async fn invalidate_cache(&self, size: u64) {
        let Some(cache) = self.inner.cache_for(&self.options) else {
            return;
        };
        if size == 0 {
            return;
        }
        let keys = self::invalidation_keys(&self.object_url, size);
        tracing::info!(
            locator = %self.locator,
            count = keys.len(),
            "invalidating cached reads"
        );
        cache.delete_many(&keys).await;
    }
}

/// The cache keys for all the [DEFAULT_READ_SIZE] windows of an object.
fn invalidation_keys(object_url: &str, size: u64) -> Vec<String> {
    (0..size)
        .step_by(DEFAULT_READ_SIZE as usize)
        .map(|offset| {
            let range = RangeRequest::window(offset, DEFAULT_READ_SIZE);
            cache_key(object_url, &range.to_header())
        })
        .collect()
}

fn handle_start_response(response: HttpResponse) -> Result<String> {
    match response.status {
        StatusCode::FORBIDDEN => {
            tracing::error!("cannot start resumable upload: Access Denied");
            return Err(Error::deser(UploadError::AccessDenied));
        }
        StatusCode::CREATED => {}
        _ => return Err(to_http_error(response)),
    }
    let location = response
        .header_str("location")
        .ok_or_else(|| Error::deser(UploadError::MissingLocation))?;
    let missing = || Error::deser(UploadError::MissingUploadId(location.to_string()));
    let url = url::Url::parse("http://localhost")
        .and_then(|base| base.join(location))
        .map_err(|_| missing())?;
    url.query_pairs()
        .find(|(k, _)| k == "upload_id")
        .map(|(_, v)| v.into_owned())
        .ok_or_else(missing)
}
