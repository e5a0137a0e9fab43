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

//! Object and directory operations that do not need a stream.

use super::client::{StorageInner, enc};
use super::list_objects::{DELIMITER, Directory, directory_prefix, list_page};
use super::status::{expect_status, to_http_error};
use super::stream::ObjectStat;
use super::stub::{HttpRequest, HttpResponse};
use crate::credentials::Scope;
use crate::error::{DirectoryError, ReadError};
use crate::locator::ObjectLocator;
use crate::options::StreamOptions;
use crate::range::ContentRange;
use crate::{Error, Result};
use http::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG};
use http::{HeaderName, HeaderValue, Method, StatusCode};
use std::sync::Arc;

/// What a path refers to.
#[derive(Clone, Debug, PartialEq)]
pub enum UrlStat {
    /// An object, with its attributes.
    Object(ObjectStat),
    /// A bucket, or a prefix shared by at least one object.
    Directory,
}

impl UrlStat {
    /// Returns `true` for buckets and directories.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// The object attributes, `None` for directories.
    pub fn object(&self) -> Option<&ObjectStat> {
        match self {
            Self::Object(stat) => Some(stat),
            Self::Directory => None,
        }
    }
}

pub(crate) async fn delete(inner: &Arc<StorageInner>, locator: &ObjectLocator) -> Result<()> {
    let object = locator.require_object().map_err(Error::binding)?;
    delete_object(inner, locator.bucket(), object).await?;
    tracing::info!(%locator, "deleted object");
    Ok(())
}

async fn delete_object(inner: &StorageInner, bucket: &str, object: &str) -> Result<()> {
    let request = HttpRequest::new(Method::DELETE, inner.object_url(bucket, object));
    let response = inner.send(Scope::ReadWrite, request).await?;
    expect_status(response, StatusCode::NO_CONTENT.as_u16())?;
    Ok(())
}

/// Copies `from` into `to`, and then deletes `from`.
///
/// The copy is conditional on the `ETag` of the source, a concurrent change
/// to the source fails the rename and leaves the source in place.
pub(crate) async fn rename(
    inner: &Arc<StorageInner>,
    from: &ObjectLocator,
    to: &ObjectLocator,
    options: Option<&StreamOptions>,
) -> Result<()> {
    let source = from.require_object().map_err(Error::binding)?;
    let destination = to.require_object().map_err(Error::binding)?;
    let replace = options.map(StreamOptions::object_headers).transpose()?;

    let request = HttpRequest::new(Method::HEAD, inner.object_url(from.bucket(), source));
    let response = inner.send(Scope::ReadWrite, request).await?;
    let head = expect_status(response, StatusCode::OK.as_u16())?;
    let etag = head
        .header_str(ETAG.as_str())
        .ok_or_else(|| Error::deser(ReadError::MissingHeader("etag")))?;
    let copy_source = format!("/{}{}", from.bucket(), enc(source));

    let mut request = HttpRequest::new(Method::PUT, inner.object_url(to.bucket(), destination))
        .with_header(
            HeaderName::from_static("x-goog-copy-source"),
            header_value(&copy_source)?,
        )
        .with_header(
            HeaderName::from_static("x-goog-copy-source-if-match"),
            header_value(etag)?,
        );
    let directive = match replace {
        None => "COPY",
        Some(headers) => {
            request = request.with_headers(headers);
            "REPLACE"
        }
    };
    if !request.headers.contains_key(CONTENT_TYPE) {
        if let Some(content_type) = head.headers.get(CONTENT_TYPE) {
            request = request.with_header(CONTENT_TYPE, content_type.clone());
        }
    }
    let request = request.with_header(
        HeaderName::from_static("x-goog-metadata-directive"),
        HeaderValue::from_static(directive),
    );
    let response = inner.send(Scope::ReadWrite, request).await?;
    expect_status(response, StatusCode::OK.as_u16()).inspect_err(|e| {
        tracing::error!(%from, %to, "cannot copy object: {e}");
    })?;

    delete_object(inner, from.bucket(), source)
        .await
        .inspect_err(|e| {
            tracing::error!(%from, %to, "object copied, but cannot delete the source: {e}");
        })?;
    tracing::info!(%from, %to, directive, "renamed object");
    Ok(())
}

/// Creates an empty object named `<path>/`, it represents an empty directory.
///
/// The object is only created if it does not exist.
pub(crate) async fn mkdir(inner: &Arc<StorageInner>, locator: &ObjectLocator) -> Result<()> {
    let object = locator.require_object().map_err(Error::binding)?;
    let marker = directory_marker(object);
    let range = ContentRange::for_chunk(0, 0, true);
    let request = HttpRequest::new(Method::PUT, inner.object_url(locator.bucket(), &marker))
        .with_header(
            HeaderName::from_static("x-goog-if-generation-match"),
            HeaderValue::from_static("0"),
        )
        .with_header(CONTENT_RANGE, header_value(&range.to_header())?);
    let response = inner.send(Scope::ReadWrite, request).await?;
    match response.status {
        StatusCode::OK => {
            tracing::info!(%locator, "created directory");
            Ok(())
        }
        StatusCode::PRECONDITION_FAILED => Err(Error::deser(DirectoryError::AlreadyExists(
            locator.to_string(),
        ))),
        _ => Err(to_http_error(response)),
    }
}

/// Deletes the `<path>/` object, if the directory has no entries.
pub(crate) async fn rmdir(inner: &Arc<StorageInner>, locator: &ObjectLocator) -> Result<()> {
    let object = locator.require_object().map_err(Error::binding)?;
    let mut dir = Directory::new(inner.clone(), locator.clone());
    if dir.next_entry().await?.is_some() {
        return Err(Error::binding(DirectoryError::NotEmpty(locator.to_string())));
    }
    delete_object(inner, locator.bucket(), &directory_marker(object)).await?;
    tracing::info!(%locator, "removed directory");
    Ok(())
}

/// Describes an object, or reports that the path is a directory.
///
/// Objects are found with a `HEAD` request. If there is no object with that
/// name, the path is a directory when at least one object uses it as a
/// prefix.
pub(crate) async fn url_stat(inner: &Arc<StorageInner>, locator: &ObjectLocator) -> Result<UrlStat> {
    let object = match locator.object() {
        None => {
            list_page(inner, locator.bucket(), None, None).await?;
            return Ok(UrlStat::Directory);
        }
        Some(o) => o,
    };
    let not_found = if object.ends_with(DELIMITER) {
        None
    } else {
        let request = HttpRequest::new(Method::HEAD, inner.object_url(locator.bucket(), object));
        let response = inner.send(Scope::ReadOnly, request).await?;
        match response.status {
            StatusCode::OK => return object_stat(&response).map(UrlStat::Object),
            StatusCode::NOT_FOUND => Some(response),
            _ => return Err(to_http_error(response)),
        }
    };
    let prefix = directory_prefix(Some(object));
    let page = list_page(inner, locator.bucket(), prefix.as_deref(), None).await?;
    if !page.keys.is_empty() || !page.common_prefixes.is_empty() {
        return Ok(UrlStat::Directory);
    }
    match not_found {
        Some(response) => Err(to_http_error(response)),
        None => Err(Error::http(
            StatusCode::NOT_FOUND.as_u16(),
            http::HeaderMap::new(),
            bytes::Bytes::new(),
        )),
    }
}

fn object_stat(response: &HttpResponse) -> Result<ObjectStat> {
    let size = response
        .header_str(CONTENT_LENGTH.as_str())
        .ok_or_else(|| Error::deser(ReadError::MissingHeader("content-length")))?
        .parse::<u64>()
        .map_err(|e| Error::deser(ReadError::BadHeaderFormat("content-length", e.into())))?;
    let headers = response
        .headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str(), v)));
    Ok(ObjectStat::from_headers(size, headers))
}

/// The name of the object representing a directory.
fn directory_marker(object: &str) -> String {
    match object.ends_with(DELIMITER) {
        true => object.to_string(),
        false => format!("{object}{DELIMITER}"),
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(Error::ser)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::client::tests::test_inner_client;
    use crate::storage::list_objects::tests::{expect_list, list_response};
    use crate::storage::stub::tests::MockTransport;
    use mockall::Sequence;
    use std::error::Error as _;
    use test_case::test_case;

    type Result = anyhow::Result<()>;

    const OBJECT_URL: &str = "http://private.googleapis.com/bucket/object.png";

    fn locator(path: &str) -> anyhow::Result<ObjectLocator> {
        Ok(ObjectLocator::parse(path)?)
    }

    fn head_response() -> HttpResponse {
        HttpResponse::new(StatusCode::OK)
            .with_header(CONTENT_LENGTH, HeaderValue::from_static("37337"))
            .with_header(ETAG, HeaderValue::from_static("abcdef"))
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
    }

    fn expect_request(
        mock: &mut MockTransport,
        seq: &mut Sequence,
        method: Method,
        url: &'static str,
        status: StatusCode,
    ) {
        mock.expect_execute()
            .times(1)
            .in_sequence(seq)
            .withf(move |r| r.method == method && r.url == url)
            .return_once(move |_| Ok(HttpResponse::new(status)));
    }

    #[tokio::test]
    async fn delete_success() -> Result {
        let mut seq = Sequence::new();
        let mut mock = MockTransport::new();
        expect_request(&mut mock, &mut seq, Method::DELETE, OBJECT_URL, StatusCode::NO_CONTENT);
        let inner = test_inner_client(mock);
        delete(&inner, &locator("gs://bucket/object.png")?).await?;
        Ok(())
    }

    #[tokio::test]
    async fn delete_failure() -> Result {
        let mut seq = Sequence::new();
        let mut mock = MockTransport::new();
        expect_request(&mut mock, &mut seq, Method::DELETE, OBJECT_URL, StatusCode::NOT_FOUND);
        let inner = test_inner_client(mock);
        let err = delete(&inner, &locator("gs://bucket/object.png")?)
            .await
            .unwrap_err();
        assert_eq!(err.http_status_code(), Some(404), "{err:?}");
        assert!(err.to_string().contains("NOT FOUND"), "{err}");
        Ok(())
    }

    #[tokio::test]
    async fn delete_bucket() -> Result {
        let mut mock = MockTransport::new();
        mock.expect_execute().never();
        let inner = test_inner_client(mock);
        let err = delete(&inner, &locator("gs://bucket/")?).await.unwrap_err();
        assert!(err.is_binding(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn rename_copy_metadata() -> Result {
        let mut seq = Sequence::new();
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|r| r.method == Method::HEAD && r.url == OBJECT_URL)
            .return_once(|_| Ok(head_response()));
        mock.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|r| {
                r.method == Method::PUT
                    && r.url == "http://private.googleapis.com/to_bucket/to.png"
                    && r.header_str("x-goog-copy-source") == Some("/bucket/object.png")
                    && r.header_str("x-goog-copy-source-if-match") == Some("abcdef")
                    && r.header_str("content-type") == Some("text/plain")
                    && r.header_str("x-goog-metadata-directive") == Some("COPY")
                    && r.header_str("x-goog-acl").is_none()
            })
            .return_once(|_| Ok(HttpResponse::new(StatusCode::OK)));
        expect_request(&mut mock, &mut seq, Method::DELETE, OBJECT_URL, StatusCode::NO_CONTENT);

        let inner = test_inner_client(mock);
        let from = locator("gs://bucket/object.png")?;
        let to = locator("gs://to_bucket/to.png")?;
        rename(&inner, &from, &to, None).await?;
        Ok(())
    }

    #[tokio::test]
    async fn rename_replace_metadata() -> Result {
        let mut seq = Sequence::new();
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|r| r.method == Method::HEAD)
            .return_once(|_| Ok(head_response()));
        mock.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|r| {
                r.method == Method::PUT
                    && r.header_str("x-goog-copy-source") == Some("/bucket/object.png")
                    && r.header_str("content-type") == Some("image/png")
                    && r.header_str("x-goog-metadata-directive") == Some("REPLACE")
                    && r.header_str("x-goog-meta-foo") == Some("bar")
                    && r.header_str("x-goog-acl") == Some("public-read-write")
            })
            .return_once(|_| Ok(HttpResponse::new(StatusCode::OK)));
        expect_request(&mut mock, &mut seq, Method::DELETE, OBJECT_URL, StatusCode::NO_CONTENT);

        let inner = test_inner_client(mock);
        let from = locator("gs://bucket/object.png")?;
        let to = locator("gs://to_bucket/to.png")?;
        let options = StreamOptions::default()
            .with_content_type("image/png")
            .with_acl("public-read-write")
            .with_metadata([("foo", "bar")]);
        rename(&inner, &from, &to, Some(&options)).await?;
        Ok(())
    }

    #[tokio::test]
    async fn rename_source_not_found() -> Result {
        let mut seq = Sequence::new();
        let mut mock = MockTransport::new();
        expect_request(&mut mock, &mut seq, Method::HEAD, OBJECT_URL, StatusCode::NOT_FOUND);
        let inner = test_inner_client(mock);
        let err = rename(
            &inner,
            &locator("gs://bucket/object.png")?,
            &locator("gs://to_bucket/to_object")?,
            None,
        )
        .await
        .unwrap_err();
        assert_eq!(err.http_status_code(), Some(404), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn rename_copy_failed() -> Result {
        let mut seq = Sequence::new();
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|_| Ok(head_response()));
        expect_request(
            &mut mock,
            &mut seq,
            Method::PUT,
            "http://private.googleapis.com/to_bucket/to_object",
            StatusCode::PRECONDITION_FAILED,
        );
        let inner = test_inner_client(mock);
        let err = rename(
            &inner,
            &locator("gs://bucket/object.png")?,
            &locator("gs://to_bucket/to_object")?,
            None,
        )
        .await
        .unwrap_err();
        assert_eq!(err.http_status_code(), Some(412), "{err:?}");
        assert!(err.to_string().contains("PRECONDITION FAILED"), "{err}");
        Ok(())
    }

    #[tokio::test]
    async fn rename_delete_failed() -> Result {
        let mut seq = Sequence::new();
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|_| Ok(head_response()));
        expect_request(
            &mut mock,
            &mut seq,
            Method::PUT,
            "http://private.googleapis.com/to_bucket/to_object",
            StatusCode::OK,
        );
        expect_request(&mut mock, &mut seq, Method::DELETE, OBJECT_URL, StatusCode::NOT_FOUND);
        let inner = test_inner_client(mock);
        let err = rename(
            &inner,
            &locator("gs://bucket/object.png")?,
            &locator("gs://to_bucket/to_object")?,
            None,
        )
        .await
        .unwrap_err();
        assert_eq!(err.http_status_code(), Some(404), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn rename_missing_etag() -> Result {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .return_once(|_| Ok(HttpResponse::new(StatusCode::OK)));
        let inner = test_inner_client(mock);
        let err = rename(
            &inner,
            &locator("gs://bucket/object.png")?,
            &locator("gs://to_bucket/to_object")?,
            None,
        )
        .await
        .unwrap_err();
        let source = err.source().and_then(|e| e.downcast_ref::<ReadError>());
        assert!(
            matches!(source, Some(ReadError::MissingHeader("etag"))),
            "{err:?}"
        );
        Ok(())
    }

    #[tokio::test]
    async fn rename_invalid_paths() -> Result {
        let mut mock = MockTransport::new();
        mock.expect_execute().never();
        let inner = test_inner_client(mock);
        let err = rename(
            &inner,
            &locator("gs://bucket/")?,
            &locator("gs://to_bucket/object.png")?,
            None,
        )
        .await
        .unwrap_err();
        assert!(err.is_binding(), "{err:?}");

        let options = StreamOptions::default().with_acl("invalid");
        let err = rename(
            &inner,
            &locator("gs://bucket/object.png")?,
            &locator("gs://to_bucket/object.png")?,
            Some(&options),
        )
        .await
        .unwrap_err();
        assert!(err.is_binding(), "{err:?}");
        Ok(())
    }

    #[test_case("gs://bucket/dira/dirb"; "without delimiter")]
    #[test_case("gs://bucket/dira/dirb/"; "with delimiter")]
    #[tokio::test]
    async fn mkdir_success(path: &str) -> Result {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .withf(|r| {
                r.method == Method::PUT
                    && r.url == "http://private.googleapis.com/bucket/dira/dirb/"
                    && r.header_str("x-goog-if-generation-match") == Some("0")
                    && r.header_str("content-range") == Some("bytes */0")
                    && r.body.is_none()
            })
            .return_once(|_| Ok(HttpResponse::new(StatusCode::OK)));
        let inner = test_inner_client(mock);
        mkdir(&inner, &locator(path)?).await?;
        Ok(())
    }

    #[tokio::test]
    async fn mkdir_already_exists() -> Result {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .return_once(|_| Ok(HttpResponse::new(StatusCode::PRECONDITION_FAILED)));
        let inner = test_inner_client(mock);
        let err = mkdir(&inner, &locator("gs://bucket/dir")?).await.unwrap_err();
        let source = err.source().and_then(|e| e.downcast_ref::<DirectoryError>());
        assert!(
            matches!(source, Some(DirectoryError::AlreadyExists(_))),
            "{err:?}"
        );
        Ok(())
    }

    #[tokio::test]
    async fn mkdir_bucket() -> Result {
        let mut mock = MockTransport::new();
        mock.expect_execute().never();
        let inner = test_inner_client(mock);
        let err = mkdir(&inner, &locator("gs://bucket/")?).await.unwrap_err();
        assert!(err.is_binding(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn rmdir_success() -> Result {
        let mut seq = Sequence::new();
        let mut mock = MockTransport::new();
        // The marker object itself is not an entry.
        let body = list_response("dira/dirb/", &["dira/dirb/"], None, &[]);
        expect_list(
            &mut mock,
            &mut seq,
            "delimiter=%2F&max-keys=1000&prefix=dira%2Fdirb%2F",
            body,
        );
        expect_request(
            &mut mock,
            &mut seq,
            Method::DELETE,
            "http://private.googleapis.com/bucket/dira/dirb/",
            StatusCode::NO_CONTENT,
        );
        let inner = test_inner_client(mock);
        rmdir(&inner, &locator("gs://bucket/dira/dirb")?).await?;
        Ok(())
    }

    #[tokio::test]
    async fn rmdir_not_empty() -> Result {
        let mut seq = Sequence::new();
        let mut mock = MockTransport::new();
        let body = list_response("dira/dirb/", &["dira/dirb/file.txt"], None, &[]);
        expect_list(
            &mut mock,
            &mut seq,
            "delimiter=%2F&max-keys=1000&prefix=dira%2Fdirb%2F",
            body,
        );
        let inner = test_inner_client(mock);
        let err = rmdir(&inner, &locator("gs://bucket/dira/dirb")?)
            .await
            .unwrap_err();
        let source = err.source().and_then(|e| e.downcast_ref::<DirectoryError>());
        assert!(
            matches!(source, Some(DirectoryError::NotEmpty(_))),
            "{err:?}"
        );
        Ok(())
    }

    #[tokio::test]
    async fn stat_object() -> Result {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .withf(|r| r.method == Method::HEAD && r.url == OBJECT_URL)
            .return_once(|_| {
                Ok(head_response()
                    .with_header(
                        "last-modified",
                        HeaderValue::from_static("Mon, 01 Jul 2013 10:02:46 GMT"),
                    )
                    .with_header("x-goog-meta-foo", HeaderValue::from_static("bar")))
            });
        let inner = test_inner_client(mock);
        let stat = url_stat(&inner, &locator("gs://bucket/object.png")?).await?;
        assert!(!stat.is_dir());
        let object = stat
            .object()
            .ok_or_else(|| anyhow::anyhow!("expected an object"))?;
        assert_eq!(object.size, 37337);
        assert_eq!(object.content_type.as_deref(), Some("text/plain"));
        assert_eq!(object.mtime.map(|t| t.timestamp()), Some(1372672966));
        assert_eq!(object.metadata.get("foo").map(String::as_str), Some("bar"));
        Ok(())
    }

    #[tokio::test]
    async fn stat_bucket() -> Result {
        let mut seq = Sequence::new();
        let mut mock = MockTransport::new();
        let body = list_response("", &["file1.txt", "file2.txt"], None, &[]);
        expect_list(&mut mock, &mut seq, "delimiter=%2F&max-keys=1000", body);
        let inner = test_inner_client(mock);
        let stat = url_stat(&inner, &locator("gs://bucket")?).await?;
        assert!(stat.is_dir(), "{stat:?}");
        Ok(())
    }

    #[tokio::test]
    async fn stat_directory() -> Result {
        let mut seq = Sequence::new();
        let mut mock = MockTransport::new();
        expect_request(
            &mut mock,
            &mut seq,
            Method::HEAD,
            "http://private.googleapis.com/bucket/a/b",
            StatusCode::NOT_FOUND,
        );
        let body = list_response("a/b/", &[], None, &["a/b/c/", "a/b/d/"]);
        expect_list(
            &mut mock,
            &mut seq,
            "delimiter=%2F&max-keys=1000&prefix=a%2Fb%2F",
            body,
        );
        let inner = test_inner_client(mock);
        let stat = url_stat(&inner, &locator("gs://bucket/a/b")?).await?;
        assert_eq!(stat, UrlStat::Directory);
        Ok(())
    }

    #[tokio::test]
    async fn stat_directory_with_delimiter() -> Result {
        let mut seq = Sequence::new();
        let mut mock = MockTransport::new();
        let body = list_response("a/b/", &["a/b/"], None, &[]);
        expect_list(
            &mut mock,
            &mut seq,
            "delimiter=%2F&max-keys=1000&prefix=a%2Fb%2F",
            body,
        );
        let inner = test_inner_client(mock);
        let stat = url_stat(&inner, &locator("gs://bucket/a/b/")?).await?;
        assert!(stat.is_dir(), "{stat:?}");
        Ok(())
    }

    #[tokio::test]
    async fn stat_not_found() -> Result {
        let mut seq = Sequence::new();
        let mut mock = MockTransport::new();
        expect_request(&mut mock, &mut seq, Method::HEAD, OBJECT_URL, StatusCode::NOT_FOUND);
        let body = list_response("object.png/", &[], None, &[]);
        expect_list(
            &mut mock,
            &mut seq,
            "delimiter=%2F&max-keys=1000&prefix=object.png%2F",
            body,
        );
        let inner = test_inner_client(mock);
        let err = url_stat(&inner, &locator("gs://bucket/object.png")?)
            .await
            .unwrap_err();
        assert_eq!(err.http_status_code(), Some(404), "{err:?}");
        assert!(
            err.to_string().contains("Cloud Storage Error: NOT FOUND"),
            "{err}"
        );
        Ok(())
    }

    #[test]
    fn marker_names() {
        assert_eq!(directory_marker("/a/b"), "/a/b/");
        assert_eq!(directory_marker("/a/b/"), "/a/b/");
    }
}
