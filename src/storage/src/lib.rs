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

//! Google Cloud Client Libraries for Rust - Storage Streams
//!
//! This crate contains types and functions to read and write [Google Cloud
//! Storage] objects as streams. Objects are named with `gs://bucket/object`
//! paths. Writes use the resumable upload protocol: data is buffered and sent
//! in chunks aligned to [WRITE_CHUNK_SIZE]. Reads fetch the object in ranged
//! windows of [DEFAULT_READ_SIZE] bytes, optionally through a read cache.
//!
//! Most applications will use [Storage][client::Storage]:
//!
//! ```
//! # use google_cloud_storage_streams::client::Storage;
//! # use google_cloud_storage_streams::stream::Mode;
//! # use google_cloud_storage_streams::options::StreamOptions;
//! # async fn sample() -> anyhow::Result<()> {
//! let client = Storage::builder().build()?;
//! let mut writer = client
//!     .open("gs://my-bucket/greeting.txt", Mode::Write, StreamOptions::default())
//!     .await?;
//! writer.write(b"hello world").await?;
//! writer.close().await?;
//!
//! let mut reader = client
//!     .open("gs://my-bucket/greeting.txt", Mode::Read, StreamOptions::default())
//!     .await?;
//! let contents = reader.read_to_end().await?;
//! assert_eq!(&contents[..], b"hello world");
//! # Ok(()) }
//! ```
//!
//! **WARNING:** this crate is under active development. We expect multiple
//! breaking changes in the upcoming releases. Testing is also incomplete, we do
//! **not** recommend that you use this crate in production. We welcome feedback
//! about the APIs, documentation, missing features, bugs, etc.
//!
//! [Google Cloud Storage]: https://cloud.google.com/storage

pub mod error;
pub use error::Error;

/// The result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;

pub mod backoff_policy;
pub mod cache;
pub mod credentials;
pub mod locator;
pub mod options;
pub mod range;
pub mod retry_policy;

mod storage;

pub use storage::read_object::DEFAULT_READ_SIZE;
pub use storage::upload::WRITE_CHUNK_SIZE;

/// Clients to interact with Google Cloud Storage.
pub mod client {
    pub use crate::storage::client::{ClientBuilder, Storage};
}

/// Streams over Cloud Storage objects.
pub mod stream {
    pub use crate::storage::read_object::ReadStream;
    pub use crate::storage::stream::{Mode, ObjectStat, Stream, Whence};
    pub use crate::storage::upload::WriteStream;
}

/// Directory-style listing and management of objects.
pub mod directory {
    pub use crate::storage::list_objects::{
        DELIMITER, DirEntry, Directory, FOLDER_SUFFIX, MAX_KEYS,
    };
    pub use crate::storage::object_ops::UrlStat;
}

/// Traits to mock the network layer of the client library.
///
/// The client library uses a [Transport][stub::Transport] to send each HTTP
/// request. Applications can replace the default implementation in tests, or
/// to route requests through a different HTTP stack.
pub mod stub {
    pub use crate::storage::stub::{HttpRequest, HttpResponse, Transport};
    pub use crate::storage::transport::ReqwestTransport;
}
