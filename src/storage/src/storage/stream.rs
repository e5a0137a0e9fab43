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

use super::read_object::ReadStream;
use super::upload::WriteStream;
use crate::error::ValidationError;
use crate::{Error, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

const METADATA_PREFIX: &str = "x-goog-meta-";

/// The direction of a stream.
///
/// Streams are either read-only or write-only. The mode can be parsed from
/// the usual `fopen()`-style strings:
///
/// ```
/// # use google_cloud_storage_streams::stream::Mode;
/// let mode: Mode = "rb".parse()?;
/// assert_eq!(mode, Mode::Read);
/// let mode: Mode = "w".parse()?;
/// assert_eq!(mode, Mode::Write);
/// assert!("a+".parse::<Mode>().is_err());
/// # Ok::<(), google_cloud_storage_streams::error::ValidationError>(())
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Download an existing object.
    Read,
    /// Create, or replace, an object.
    Write,
}

impl std::str::FromStr for Mode {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "r" | "rb" | "rt" => Ok(Self::Read),
            "w" | "wb" | "wt" => Ok(Self::Write),
            _ => Err(ValidationError::InvalidMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// The reference point for [seek][ReadStream::seek].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Whence {
    /// The offset is relative to the start of the object.
    Start,
    /// The offset is relative to the current position.
    Current,
    /// The offset is relative to the end of the object.
    End,
}

/// The attributes of an object, as reported by the service.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct ObjectStat {
    /// The object size in bytes.
    pub size: u64,
    /// The last modification time, from the `Last-Modified` header.
    pub mtime: Option<DateTime<Utc>>,
    /// The content type, if the service reported one.
    pub content_type: Option<String>,
    /// The entity tag for the object version.
    pub etag: Option<String>,
    /// The custom metadata, with the `x-goog-meta-` prefix removed.
    pub metadata: BTreeMap<String, String>,
}

impl ObjectStat {
    pub(crate) fn from_headers<'a, I>(size: u64, headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut stat = Self {
            size,
            ..Default::default()
        };
        for (name, value) in headers {
            let name = name.to_ascii_lowercase();
            match name.as_str() {
                "last-modified" => stat.mtime = parse_http_date(value),
                "content-type" => stat.content_type = Some(value.to_string()),
                "etag" => stat.etag = Some(value.to_string()),
                n => {
                    if let Some(key) = n.strip_prefix(METADATA_PREFIX) {
                        stat.metadata.insert(key.to_string(), value.to_string());
                    }
                }
            }
        }
        stat
    }
}

/// Parses the RFC 2822 dates used in `Last-Modified` headers.
fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// A stream over an object, opened with [Storage::open][crate::client::Storage::open].
///
/// Operations that do not apply to the stream [Mode] fail with a binding
/// error, and send no requests.
#[derive(Debug)]
pub enum Stream {
    Read(ReadStream),
    Write(WriteStream),
}

impl Stream {
    /// The stream direction.
    pub fn mode(&self) -> Mode {
        match self {
            Self::Read(_) => Mode::Read,
            Self::Write(_) => Mode::Write,
        }
    }

    /// Reads at most `max` bytes. An empty result means the end of the object.
    pub async fn read(&mut self, max: usize) -> Result<Bytes> {
        self.reader("read")?.read(max).await
    }

    /// Reads all the remaining bytes.
    pub async fn read_to_end(&mut self) -> Result<Bytes> {
        self.reader("read")?.read_to_end().await
    }

    /// Appends `data` to the object, returns the number of bytes accepted.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.writer("write")?.write(data).await
    }

    /// Moves the read position, returns the new position.
    pub async fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        self.reader("seek")?.seek(offset, whence).await
    }

    /// Flushes a write stream.
    pub async fn flush(&mut self) -> Result<()> {
        self.writer("flush")?.flush().await
    }

    /// Closes the stream. For write streams this creates the object.
    pub async fn close(&mut self) -> Result<()> {
        match self {
            Self::Read(r) => {
                r.close();
                Ok(())
            }
            Self::Write(w) => w.close().await,
        }
    }

    /// Describes the object.
    ///
    /// Write streams report the bytes accepted so far, with the content type
    /// and metadata the object is created with.
    pub async fn stat(&mut self) -> Result<ObjectStat> {
        match self {
            Self::Read(r) => r.stat().await,
            Self::Write(w) => Ok(ObjectStat {
                size: w.tell(),
                content_type: w.content_type().map(str::to_string),
                metadata: w.metadata().clone(),
                ..Default::default()
            }),
        }
    }

    /// The read position, or the number of bytes written.
    pub fn tell(&self) -> u64 {
        match self {
            Self::Read(r) => r.tell(),
            Self::Write(w) => w.tell(),
        }
    }

    /// Returns `true` when a read stream reached the end of the object.
    pub fn eof(&self) -> bool {
        match self {
            Self::Read(r) => r.eof(),
            Self::Write(_) => false,
        }
    }

    fn reader(&mut self, op: &str) -> Result<&mut ReadStream> {
        match self {
            Self::Read(r) => Ok(r),
            Self::Write(_) => Err(wrong_mode(op, Mode::Write)),
        }
    }

    fn writer(&mut self, op: &str) -> Result<&mut WriteStream> {
        match self {
            Self::Write(w) => Ok(w),
            Self::Read(_) => Err(wrong_mode(op, Mode::Read)),
        }
    }
}

fn wrong_mode(op: &str, mode: Mode) -> Error {
    Error::binding(ValidationError::InvalidMode(format!(
        "cannot {op} a {mode} stream"
    )))
}
