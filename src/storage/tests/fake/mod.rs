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

//! An in-process fake of the Cloud Storage XML API.
//!
//! Supports enough of the service to exercise the client end-to-end:
//! resumable uploads, ranged and conditional reads, `HEAD`, `DELETE`,
//! copies, and bucket listings.

use bytes::Bytes;
use google_cloud_storage_streams::range::{parse_content_range, parse_range_header};
use google_cloud_storage_streams::stub::{HttpRequest, HttpResponse, Transport};
use google_cloud_storage_streams::Result;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

const LAST_MODIFIED: &str = "Mon, 01 Jul 2013 10:02:46 GMT";

#[derive(Clone, Debug, Default)]
pub struct FakeStorage {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<(String, String), FakeObject>,
    uploads: HashMap<String, Upload>,
    requests: Vec<(Method, String)>,
    generation: u64,
}

#[derive(Clone, Debug)]
struct FakeObject {
    data: Bytes,
    etag: String,
    headers: HeaderMap,
}

#[derive(Debug)]
struct Upload {
    bucket: String,
    object: String,
    data: Vec<u8>,
    headers: HeaderMap,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of requests received with `method`.
    pub fn count(&self, method: Method) -> usize {
        let state = self.state.lock().expect("fake state is poisoned");
        state.requests.iter().filter(|(m, _)| *m == method).count()
    }

    /// The `Content-Range` headers (or `Range` for reads) of requests with
    /// `method`, in the order they were received.
    pub fn ranges(&self, method: Method) -> Vec<String> {
        let state = self.state.lock().expect("fake state is poisoned");
        state
            .requests
            .iter()
            .filter(|(m, _)| *m == method)
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn contents(&self, bucket: &str, object: &str) -> Option<Bytes> {
        let state = self.state.lock().expect("fake state is poisoned");
        state
            .objects
            .get(&(bucket.to_string(), object.to_string()))
            .map(|o| o.data.clone())
    }

    /// Replaces an object behind the client's back.
    pub fn insert(&self, bucket: &str, object: &str, data: &'static [u8]) {
        let mut state = self.state.lock().expect("fake state is poisoned");
        state.insert(bucket, object, Bytes::from_static(data), HeaderMap::new());
    }

    fn handle(&self, request: HttpRequest) -> HttpResponse {
        let url = url::Url::parse(&request.url).expect("requests use absolute URLs");
        let path = percent_encoding::percent_decode_str(url.path())
            .decode_utf8()
            .expect("paths are UTF-8")
            .into_owned();
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let (bucket, object) = match path.trim_start_matches('/').split_once('/') {
            Some((b, o)) => (b.to_string(), o.to_string()),
            None => (path.trim_start_matches('/').to_string(), String::new()),
        };

        let mut state = self.state.lock().expect("fake state is poisoned");
        let range = request
            .header_str("content-range")
            .or(request.header_str("range"))
            .unwrap_or_default()
            .to_string();
        state.requests.push((request.method.clone(), range));

        match (&request.method, object.is_empty()) {
            (&Method::GET, true) => state.list(&bucket, &query),
            (&Method::GET, false) => state.read(&bucket, &object, &request),
            (&Method::HEAD, _) => state.head(&bucket, &object),
            (&Method::DELETE, _) => match state.objects.remove(&(bucket, object)) {
                Some(_) => HttpResponse::new(StatusCode::NO_CONTENT),
                None => HttpResponse::new(StatusCode::NOT_FOUND),
            },
            (&Method::POST, _) => state.start_upload(bucket, object, &request),
            (&Method::PUT, _) if query.contains_key("upload_id") => {
                state.upload_chunk(&query["upload_id"], &request)
            }
            (&Method::PUT, _) if request.headers.contains_key("x-goog-copy-source") => {
                state.copy(bucket, object, &request)
            }
            (&Method::PUT, _) => state.create_empty(bucket, object, &request),
            _ => HttpResponse::new(StatusCode::METHOD_NOT_ALLOWED),
        }
    }
}

#[async_trait::async_trait]
impl Transport for FakeStorage {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        Ok(self.handle(request))
    }
}

impl State {
    fn insert(&mut self, bucket: &str, object: &str, data: Bytes, headers: HeaderMap) {
        self.generation += 1;
        let etag = format!("\"{:032x}\"", self.generation);
        let key = (bucket.to_string(), object.to_string());
        self.objects.insert(
            key,
            FakeObject {
                data,
                etag,
                headers,
            },
        );
    }

    fn start_upload(&mut self, bucket: String, object: String, request: &HttpRequest) -> HttpResponse {
        if request.header_str("x-goog-resumable") != Some("start") {
            return HttpResponse::new(StatusCode::BAD_REQUEST);
        }
        let upload_id = uuid::Uuid::new_v4().to_string();
        let headers = object_headers(&request.headers);
        self.uploads.insert(
            upload_id.clone(),
            Upload {
                bucket,
                object,
                data: Vec::new(),
                headers,
            },
        );
        let location = format!("{}?upload_id={upload_id}", request.url);
        HttpResponse::new(StatusCode::CREATED).with_header(
            "location",
            HeaderValue::from_str(&location).expect("valid location"),
        )
    }

    fn upload_chunk(&mut self, upload_id: &str, request: &HttpRequest) -> HttpResponse {
        let Some(upload) = self.uploads.get_mut(upload_id) else {
            return HttpResponse::new(StatusCode::NOT_FOUND);
        };
        let Some(range) = request
            .header_str("content-range")
            .and_then(|r| parse_content_range(r).ok())
        else {
            return HttpResponse::new(StatusCode::BAD_REQUEST);
        };
        let body = request.body.clone().unwrap_or_default();
        match range.span {
            Some((start, end)) => {
                if start != upload.data.len() as u64 || end + 1 - start != body.len() as u64 {
                    return HttpResponse::new(StatusCode::BAD_REQUEST);
                }
                upload.data.extend_from_slice(&body);
            }
            None if !body.is_empty() => return HttpResponse::new(StatusCode::BAD_REQUEST),
            None => {}
        }
        let Some(total) = range.total else {
            return HttpResponse::new(StatusCode::PERMANENT_REDIRECT);
        };
        if total != upload.data.len() as u64 {
            return HttpResponse::new(StatusCode::BAD_REQUEST);
        }
        let Some(upload) = self.uploads.remove(upload_id) else {
            return HttpResponse::new(StatusCode::NOT_FOUND);
        };
        self.insert(
            &upload.bucket,
            &upload.object,
            Bytes::from(upload.data),
            upload.headers,
        );
        HttpResponse::new(StatusCode::OK)
    }

    fn create_empty(&mut self, bucket: String, object: String, request: &HttpRequest) -> HttpResponse {
        let key = (bucket.clone(), object.clone());
        if request.header_str("x-goog-if-generation-match") == Some("0")
            && self.objects.contains_key(&key)
        {
            return HttpResponse::new(StatusCode::PRECONDITION_FAILED);
        }
        let data = request.body.clone().unwrap_or_default();
        self.insert(&bucket, &object, data, object_headers(&request.headers));
        HttpResponse::new(StatusCode::OK)
    }

    fn copy(&mut self, bucket: String, object: String, request: &HttpRequest) -> HttpResponse {
        let Some((src_bucket, src_object)) = request
            .header_str("x-goog-copy-source")
            .and_then(|s| s.trim_start_matches('/').split_once('/'))
        else {
            return HttpResponse::new(StatusCode::BAD_REQUEST);
        };
        let src_object = percent_encoding::percent_decode_str(src_object)
            .decode_utf8_lossy()
            .into_owned();
        let Some(source) = self
            .objects
            .get(&(src_bucket.to_string(), src_object))
            .cloned()
        else {
            return HttpResponse::new(StatusCode::NOT_FOUND);
        };
        if request
            .header_str("x-goog-copy-source-if-match")
            .is_some_and(|etag| etag != source.etag)
        {
            return HttpResponse::new(StatusCode::PRECONDITION_FAILED);
        }
        let headers = match request.header_str("x-goog-metadata-directive") {
            Some("REPLACE") => object_headers(&request.headers),
            _ => source.headers,
        };
        self.insert(&bucket, &object, source.data, headers);
        HttpResponse::new(StatusCode::OK)
    }

    fn head(&self, bucket: &str, object: &str) -> HttpResponse {
        match self.objects.get(&(bucket.to_string(), object.to_string())) {
            None => HttpResponse::new(StatusCode::NOT_FOUND),
            Some(o) => with_object_headers(HttpResponse::new(StatusCode::OK), o).with_header(
                "content-length",
                HeaderValue::from(o.data.len()),
            ),
        }
    }

    fn read(&self, bucket: &str, object: &str, request: &HttpRequest) -> HttpResponse {
        let Some(o) = self.objects.get(&(bucket.to_string(), object.to_string())) else {
            return HttpResponse::new(StatusCode::NOT_FOUND);
        };
        if request.header_str("if-match").is_some_and(|e| e != o.etag) {
            return HttpResponse::new(StatusCode::PRECONDITION_FAILED);
        }
        if request.header_str("if-none-match") == Some(o.etag.as_str()) {
            return HttpResponse::new(StatusCode::NOT_MODIFIED)
                .with_header("etag", HeaderValue::from_str(&o.etag).expect("valid etag"));
        }
        let len = o.data.len() as u64;
        let Some(range) = request.header_str("range") else {
            return with_object_headers(HttpResponse::new(StatusCode::OK), o)
                .with_body(o.data.clone());
        };
        let Ok((start, end)) = parse_range_header(range) else {
            return HttpResponse::new(StatusCode::BAD_REQUEST);
        };
        let start = start.max(0) as u64;
        if start >= len {
            return HttpResponse::new(StatusCode::RANGE_NOT_SATISFIABLE).with_header(
                "content-range",
                HeaderValue::from_str(&format!("bytes */{len}")).expect("valid range"),
            );
        }
        let end = end.unwrap_or(len - 1).min(len - 1);
        let content_range = format!("bytes {start}-{end}/{len}");
        with_object_headers(HttpResponse::new(StatusCode::PARTIAL_CONTENT), o)
            .with_header(
                "content-range",
                HeaderValue::from_str(&content_range).expect("valid range"),
            )
            .with_body(o.data.slice(start as usize..=end as usize))
    }

    fn list(&self, bucket: &str, query: &HashMap<String, String>) -> HttpResponse {
        let prefix = query.get("prefix").cloned().unwrap_or_default();
        let delimiter = query.get("delimiter").cloned().unwrap_or_default();
        let marker = query.get("marker").cloned().unwrap_or_default();
        let max_keys = query
            .get("max-keys")
            .and_then(|m| m.parse::<usize>().ok())
            .unwrap_or(1000);

        // Each entry is either a key or a common prefix, in name order.
        let mut entries = BTreeMap::<String, bool>::new();
        for (b, name) in self.objects.keys() {
            if b != bucket || !name.starts_with(&prefix) || name.as_str() <= marker.as_str() {
                continue;
            }
            let rest = &name[prefix.len()..];
            match rest.find(delimiter.as_str()).filter(|_| !delimiter.is_empty()) {
                Some(i) => entries.insert(format!("{prefix}{}", &rest[..=i]), true),
                None => entries.insert(name.clone(), false),
            };
        }
        let truncated = entries.len() > max_keys;
        let page: Vec<_> = entries.into_iter().take(max_keys).collect();

        let mut xml = format!(
            "<?xml version='1.0' encoding='UTF-8'?>\
             <ListBucketResult><Name>{bucket}</Name><Prefix>{prefix}</Prefix>\
             <Marker>{marker}</Marker><IsTruncated>{truncated}</IsTruncated>"
        );
        if truncated {
            if let Some((last, _)) = page.last() {
                xml.push_str(&format!("<NextMarker>{last}</NextMarker>"));
            }
        }
        for (name, is_prefix) in &page {
            match is_prefix {
                true => xml.push_str(&format!(
                    "<CommonPrefixes><Prefix>{name}</Prefix></CommonPrefixes>"
                )),
                false => xml.push_str(&format!("<Contents><Key>{name}</Key></Contents>")),
            }
        }
        xml.push_str("</ListBucketResult>");
        HttpResponse::new(StatusCode::OK).with_body(xml)
    }
}

fn object_headers(request: &HeaderMap) -> HeaderMap {
    request
        .iter()
        .filter(|(k, _)| {
            let k = k.as_str();
            k == "content-type" || k.starts_with("x-goog-meta-")
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn with_object_headers(mut response: HttpResponse, object: &FakeObject) -> HttpResponse {
    response.headers.extend(object.headers.clone());
    response
        .with_header("etag", HeaderValue::from_str(&object.etag).expect("valid etag"))
        .with_header("last-modified", HeaderValue::from_static(LAST_MODIFIED))
}
