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

//! Status codes used by the XML API and the messages for unexpected ones.

use super::stub::HttpResponse;
use crate::Error;
use quick_xml::Reader;
use quick_xml::events::Event;

/// Resumable uploads use `308` to acknowledge a partial chunk.
pub(crate) const RESUME_INCOMPLETE: u16 = 308;

/// The name used in error messages for a status code.
pub(crate) fn status_name(code: u16) -> Option<&'static str> {
    let name = match code {
        200 => "OK",
        201 => "CREATED",
        204 => "NO CONTENT",
        206 => "PARTIAL CONTENT",
        304 => "NOT MODIFIED",
        RESUME_INCOMPLETE => "RESUME INCOMPLETE",
        400 => "BAD REQUEST",
        401 => "UNAUTHORIZED",
        403 => "FORBIDDEN",
        404 => "NOT FOUND",
        408 => "REQUEST TIMEOUT",
        412 => "PRECONDITION FAILED",
        416 => "RANGE NOT SATISFIABLE",
        500 => "INTERNAL SERVER ERROR",
        502 => "BAD GATEWAY",
        503 => "SERVICE UNAVAILABLE",
        504 => "GATEWAY TIMEOUT",
        _ => return None,
    };
    Some(name)
}

/// Formats the message for an unexpected status code.
///
/// Uses the `<Message>` and `<Code>` elements when the payload is an XML
/// error document, and the name of the status code otherwise.
pub(crate) fn error_message(code: u16, payload: &[u8]) -> String {
    if let Some((code, message)) = parse_error_document(payload) {
        return format!("Cloud Storage Error: {message} ({code})");
    }
    match status_name(code) {
        Some(name) => format!("Cloud Storage Error: {name}"),
        None => format!("Cloud Storage Error: Unknown Code {code}"),
    }
}

/// Converts a response with an unexpected status into an error.
pub(crate) fn to_http_error(response: HttpResponse) -> Error {
    tracing::error!(
        status = response.status.as_u16(),
        "{}",
        error_message(response.status.as_u16(), &response.body)
    );
    Error::http(response.status.as_u16(), response.headers, response.body)
}

/// Returns the response if it has the expected status, an error otherwise.
pub(crate) fn expect_status(response: HttpResponse, expected: u16) -> crate::Result<HttpResponse> {
    if response.status.as_u16() == expected {
        return Ok(response);
    }
    Err(to_http_error(response))
}

fn parse_error_document(payload: &[u8]) -> Option<(String, String)> {
    let mut reader = Reader::from_reader(payload);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut path = Vec::<Vec<u8>>::new();
    let (mut code, mut message) = (None, None);
    loop {
        match reader.read_event_into(&mut buf).ok()? {
            Event::Start(e) => path.push(e.local_name().as_ref().to_vec()),
            Event::End(_) => {
                path.pop();
            }
            Event::Text(t) => {
                let text = t.unescape().ok()?.into_owned();
                match path.as_slice() {
                    [root, leaf] if root == b"Error" && leaf == b"Code" => code = Some(text),
                    [root, leaf] if root == b"Error" && leaf == b"Message" => {
                        message = Some(text)
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    code.zip(message)
}
