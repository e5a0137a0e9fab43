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
use super::status::expect_status;
use super::stub::HttpRequest;
use crate::credentials::Scope;
use crate::error::DirectoryError;
use crate::locator::ObjectLocator;
use crate::{Error, Result};
use http::{Method, StatusCode};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::VecDeque;
use std::sync::Arc;

/// The maximum number of keys requested in each listing page.
pub const MAX_KEYS: usize = 1000;

/// The separator for directory-style object names.
pub const DELIMITER: &str = "/";

/// Some tools mark empty directories with an object named `<dir>_$folder$`.
///
/// These markers are never returned as directory entries.
pub const FOLDER_SUFFIX: &str = "_$folder$";

/// An entry in a [Directory].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    /// The name relative to the directory. Sub-directories end with `/`.
    pub name: String,
    /// `true` for sub-directories.
    pub is_dir: bool,
}

/// One page of a bucket listing.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct ListPage {
    pub keys: Vec<String>,
    pub common_prefixes: Vec<String>,
    pub next_marker: Option<String>,
}

/// Lists the immediate children of a directory.
///
/// Cloud Storage has a flat namespace, directories are emulated by listing
/// the objects with a common prefix. Results are fetched in pages of at most
/// [MAX_KEYS] keys, the next page is requested when the current one is
/// exhausted.
///
/// # Example
/// ```
/// # use google_cloud_storage_streams::client::Storage;
/// # use futures::TryStreamExt;
/// # async fn sample(client: &Storage) -> anyhow::Result<()> {
/// let dir = client.open_dir("gs://my-bucket/photos/").await?;
/// let names: Vec<String> = dir
///     .into_stream()
///     .map_ok(|entry| entry.name)
///     .try_collect()
///     .await?;
/// println!("{names:?}");
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct Directory {
    inner: Arc<StorageInner>,
    locator: ObjectLocator,
    prefix: Option<String>,
    next_marker: Option<String>,
    entries: VecDeque<DirEntry>,
    started: bool,
}

impl Directory {
    /// Fetches the first page, failing if the bucket cannot be listed.
    pub(crate) async fn open(inner: Arc<StorageInner>, locator: ObjectLocator) -> Result<Self> {
        let mut dir = Self::new(inner, locator);
        dir.fill().await?;
        Ok(dir)
    }

    pub(crate) fn new(inner: Arc<StorageInner>, locator: ObjectLocator) -> Self {
        let prefix = directory_prefix(locator.object());
        Self {
            inner,
            locator,
            prefix,
            next_marker: None,
            entries: VecDeque::new(),
            started: false,
        }
    }

    /// Returns the next entry, or `None` once all entries are returned.
    pub async fn next_entry(&mut self) -> Result<Option<DirEntry>> {
        loop {
            if let Some(entry) = self.entries.pop_front() {
                return Ok(Some(entry));
            }
            if self.started && self.next_marker.is_none() {
                return Ok(None);
            }
            self.fill().await?;
        }
    }

    /// Restarts the listing from the first entry.
    pub fn rewind(&mut self) {
        self.next_marker = None;
        self.entries.clear();
        self.started = false;
    }

    /// The path of the directory.
    pub fn locator(&self) -> &ObjectLocator {
        &self.locator
    }

    /// Converts the directory into a [Stream][futures::Stream] of entries.
    ///
    /// The stream ends after the first error.
    pub fn into_stream(self) -> impl futures::Stream<Item = Result<DirEntry>> + Send {
        futures::stream::unfold(Some(self), move |state| async move {
            let mut dir = state?;
            match dir.next_entry().await {
                Ok(Some(entry)) => Some((Ok(entry), Some(dir))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    async fn fill(&mut self) -> Result<()> {
        let page = list_page(
            &self.inner,
            self.locator.bucket(),
            self.prefix.as_deref(),
            self.next_marker.as_deref(),
        )
        .await?;
        self.started = true;
        self.next_marker = page.next_marker;
        let prefix = self.prefix.as_deref().unwrap_or("");
        let strip = |name: &str| name.strip_prefix(prefix).unwrap_or(name).to_string();
        let files = page
            .keys
            .iter()
            .filter(|k| !k.ends_with(FOLDER_SUFFIX) && !k.ends_with(DELIMITER))
            .map(|k| DirEntry {
                name: strip(k),
                is_dir: false,
            });
        let dirs = page.common_prefixes.iter().map(|p| DirEntry {
            name: strip(p),
            is_dir: true,
        });
        self.entries.extend(files.chain(dirs));
        tracing::debug!(
            locator = %self.locator,
            entries = self.entries.len(),
            truncated = self.next_marker.is_some(),
            "listed directory page"
        );
        Ok(())
    }
}

/// The listing prefix for a directory: the object name without its leading
/// `/` and with a trailing `/`. Buckets have no prefix.
pub(crate) fn directory_prefix(object: Option<&str>) -> Option<String> {
    let name = object?.trim_start_matches('/');
    if name.is_empty() {
        return None;
    }
    match name.ends_with(DELIMITER) {
        true => Some(name.to_string()),
        false => Some(format!("{name}{DELIMITER}")),
    }
}

/// Fetches one page of a bucket listing.
pub(crate) async fn list_page(
    inner: &StorageInner,
    bucket: &str,
    prefix: Option<&str>,
    marker: Option<&str>,
) -> Result<ListPage> {
    // The serializer is not `Send`, drop it before the first await.
    let url = {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("delimiter", DELIMITER)
            .append_pair("max-keys", &MAX_KEYS.to_string());
        if let Some(p) = prefix {
            query.append_pair("prefix", p);
        }
        if let Some(m) = marker {
            query.append_pair("marker", m);
        }
        format!("{}?{}", inner.bucket_url(bucket), query.finish())
    };
    let request = HttpRequest::new(Method::GET, url);
    let response = inner.send(Scope::ReadOnly, request).await?;
    let response = expect_status(response, StatusCode::OK.as_u16())?;
    parse_list_page(&response.body).map_err(Error::deser)
}

/// Parses a `ListBucketResult` document.
pub(crate) fn parse_list_page(payload: &[u8]) -> std::result::Result<ListPage, DirectoryError> {
    let mut reader = Reader::from_reader(payload);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut path = Vec::<Vec<u8>>::new();
    let mut page = ListPage::default();
    let bad = |e: quick_xml::Error| DirectoryError::BadListing(e.to_string());
    loop {
        match reader.read_event_into(&mut buf).map_err(bad)? {
            Event::Start(e) => path.push(e.local_name().as_ref().to_vec()),
            Event::End(_) => {
                path.pop();
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(bad)?.into_owned();
                match path.as_slice() {
                    [.., parent, leaf] if parent == b"Contents" && leaf == b"Key" => {
                        page.keys.push(text)
                    }
                    [.., parent, leaf] if parent == b"CommonPrefixes" && leaf == b"Prefix" => {
                        page.common_prefixes.push(text)
                    }
                    [root, leaf] if root == b"ListBucketResult" && leaf == b"NextMarker" => {
                        page.next_marker = Some(text)
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    if !path.is_empty() {
        return Err(DirectoryError::BadListing(
            "unexpected end of document".to_string(),
        ));
    }
    Ok(page)
}
