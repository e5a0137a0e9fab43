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

use bytes::{Buf, Bytes, BytesMut};

/// The bytes accepted by a write stream but not yet sent to the service.
///
/// `start_offset` is the object offset of the first buffered byte, which is
/// also the number of bytes already persisted by the service.
#[derive(Debug, Default)]
pub(crate) struct UploadBuffer {
    data: BytesMut,
    start_offset: u64,
}

impl UploadBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn start_offset(&self) -> u64 {
        self.start_offset
    }

    /// The total number of bytes accepted, sent or not.
    pub fn end_offset(&self) -> u64 {
        self.start_offset + self.data.len() as u64
    }

    pub fn append(&mut self, data: &[u8]) {
        self.data.extend_from_slice(data);
    }

    /// Removes the last `n` bytes appended.
    pub fn rollback(&mut self, n: usize) {
        let len = self.data.len().saturating_sub(n);
        self.data.truncate(len);
    }

    /// The largest multiple of `chunk_size` that is buffered.
    pub fn aligned_len(&self, chunk_size: usize) -> usize {
        self.data.len() / chunk_size * chunk_size
    }

    /// A copy of the first `len` bytes.
    pub fn prefix(&self, len: usize) -> Bytes {
        Bytes::copy_from_slice(&self.data[..len])
    }

    /// Drops the first `len` bytes, they are persisted by the service.
    pub fn consume(&mut self, len: usize) {
        self.data.advance(len);
        self.start_offset += len as u64;
    }
}
