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

//! Convert byte offsets to and from the `Range` and `Content-Range` headers.
//!
//! Reads use the `Range` request header (see [RFC 7233 section 3.1]) to
//! request a window of the object. Resumable uploads use the `Content-Range`
//! header (see [RFC 7233 section 4.2]) to describe which bytes each `PUT`
//! carries, and whether the upload is complete.
//!
//! [RFC 7233 section 3.1]: https://www.rfc-editor.org/rfc/rfc7233#section-3.1
//! [RFC 7233 section 4.2]: https://www.rfc-editor.org/rfc/rfc7233#section-4.2

/// Represents an error that can occur when an invalid range is specified.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum RangeError {
    /// The end offset is before the start offset.
    #[error("the range end ({end}) is before the range start ({start})")]
    EndBeforeStart { start: i64, end: u64 },

    /// A negative start selects the last bytes of the object, it cannot be
    /// combined with an end offset.
    #[error("negative range starts ({start}) cannot be used with an end offset ({end})")]
    NegativeStartWithEnd { start: i64, end: u64 },

    /// The header value does not have the expected format.
    #[error("malformed range header: {0:?}")]
    Malformed(String),
}

/// A window of bytes in an object.
///
/// A non-negative `start` requests the bytes from `start` to `end` (inclusive),
/// or to the end of the object if `end` is `None`. A negative `start` requests
/// the last `|start|` bytes of the object.
///
/// # Example
/// ```
/// # use google_cloud_storage_streams::range::RangeRequest;
/// let range = RangeRequest::new(1000, Some(1099))?;
/// assert_eq!(range.to_string(), "bytes=1000-1099");
/// assert_eq!("bytes=1000-1099".parse::<RangeRequest>()?, range);
///
/// let tail = RangeRequest::new(-500, None)?;
/// assert_eq!(tail.to_string(), "bytes=-500");
/// # Ok::<(), google_cloud_storage_streams::range::RangeError>(())
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeRequest {
    start: i64,
    end: Option<u64>,
}

impl RangeRequest {
    /// Creates a new range, validating the offsets.
    pub fn new(start: i64, end: Option<u64>) -> Result<Self, RangeError> {
        match (start, end) {
            (s, Some(e)) if s < 0 => Err(RangeError::NegativeStartWithEnd { start: s, end: e }),
            (s, Some(e)) if e < s as u64 => Err(RangeError::EndBeforeStart { start: s, end: e }),
            (start, end) => Ok(Self { start, end }),
        }
    }

    /// A window of `len` bytes starting at `offset`.
    ///
    /// `len` must be positive, a zero length window is represented as a single
    /// byte window.
    pub fn window(offset: u64, len: u64) -> Self {
        let end = offset.saturating_add(len.max(1) - 1);
        Self {
            start: offset as i64,
            end: Some(end),
        }
    }

    /// The start offset. Negative values count from the end of the object.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// The inclusive end offset, if any.
    pub fn end(&self) -> Option<u64> {
        self.end
    }

    /// The value for the `Range` header.
    pub fn to_header(&self) -> String {
        match (self.start, self.end) {
            (s, _) if s < 0 => format!("bytes={s}"),
            (s, None) => format!("bytes={s}-"),
            (s, Some(e)) => format!("bytes={s}-{e}"),
        }
    }
}

impl std::fmt::Display for RangeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_header())
    }
}

impl std::str::FromStr for RangeRequest {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || RangeError::Malformed(s.to_string());
        let spec = s.trim().strip_prefix("bytes=").ok_or_else(malformed)?;
        if let Some(suffix) = spec.strip_prefix('-') {
            let n = suffix.parse::<u64>().map_err(|_| malformed())?;
            let start = i64::try_from(n).map_err(|_| malformed())?;
            return Self::new(-start, None);
        }
        let (start, end) = spec.split_once('-').ok_or_else(malformed)?;
        let start = start.parse::<i64>().map_err(|_| malformed())?;
        let end = match end {
            "" => None,
            e => Some(e.parse::<u64>().map_err(|_| malformed())?),
        };
        Self::new(start, end)
    }
}

/// Formats a `Range` header from a start and optional inclusive end offset.
///
/// # Example
/// ```
/// # use google_cloud_storage_streams::range::format_range_header;
/// assert_eq!(format_range_header(10, None)?, "bytes=10-");
/// assert_eq!(format_range_header(10, Some(19))?, "bytes=10-19");
/// assert_eq!(format_range_header(-10, None)?, "bytes=-10");
/// assert!(format_range_header(10, Some(5)).is_err());
/// # Ok::<(), google_cloud_storage_streams::range::RangeError>(())
/// ```
pub fn format_range_header(start: i64, end: Option<u64>) -> Result<String, RangeError> {
    RangeRequest::new(start, end).map(|r| r.to_header())
}

/// Parses a `Range` header into a start and optional inclusive end offset.
pub fn parse_range_header(value: &str) -> Result<(i64, Option<u64>), RangeError> {
    let range = value.parse::<RangeRequest>()?;
    Ok((range.start, range.end))
}

/// The `Content-Range` header for a resumable upload `PUT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentRange {
    /// A non-final chunk: `bytes <start>-<end>/*`.
    Partial { start: u64, end: u64 },
    /// The final chunk with data: `bytes <start>-<end>/<total>`.
    Final { start: u64, end: u64, total: u64 },
    /// Finalize without data: `bytes */<total>`.
    FinalEmpty { total: u64 },
}

impl ContentRange {
    /// Describes a chunk of `len` bytes starting at `offset`.
    ///
    /// If `finalize` is set the header also carries the total object size,
    /// which is `offset + len`.
    pub fn for_chunk(offset: u64, len: u64, finalize: bool) -> Self {
        match (len, finalize) {
            (0, _) => Self::FinalEmpty { total: offset },
            (n, false) => Self::Partial {
                start: offset,
                end: offset + n - 1,
            },
            (n, true) => Self::Final {
                start: offset,
                end: offset + n - 1,
                total: offset + n,
            },
        }
    }

    /// The value for the `Content-Range` header.
    pub fn to_header(&self) -> String {
        match self {
            Self::Partial { start, end } => format!("bytes {start}-{end}/*"),
            Self::Final { start, end, total } => format!("bytes {start}-{end}/{total}"),
            Self::FinalEmpty { total } => format!("bytes */{total}"),
        }
    }
}

impl std::fmt::Display for ContentRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_header())
    }
}

/// The `Content-Range` returned with a `206 Partial Content` or
/// `416 Range Not Satisfiable` response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponseRange {
    /// The first and last (inclusive) byte in the body, `None` for `bytes */N`.
    pub span: Option<(u64, u64)>,
    /// The total object size, `None` when the service reports `*`.
    pub total: Option<u64>,
}

/// Parses a `Content-Range` response header.
///
/// Accepts both `bytes <start>-<end>/<total>` and `bytes */<total>`, where
/// `<total>` may be `*`.
pub fn parse_content_range(value: &str) -> Result<ResponseRange, RangeError> {
    let malformed = || RangeError::Malformed(value.to_string());
    let spec = value.trim().strip_prefix("bytes ").ok_or_else(malformed)?;
    let (span, total) = spec.split_once('/').ok_or_else(malformed)?;
    let total = match total {
        "*" => None,
        t => Some(t.parse::<u64>().map_err(|_| malformed())?),
    };
    let span = match span {
        "*" => None,
        s => {
            let (start, end) = s.split_once('-').ok_or_else(malformed)?;
            let start = start.parse::<u64>().map_err(|_| malformed())?;
            let end = end.parse::<u64>().map_err(|_| malformed())?;
            if end < start {
                return Err(malformed());
            }
            Some((start, end))
        }
    };
    Ok(ResponseRange { span, total })
}
