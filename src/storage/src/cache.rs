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

//! A read-through cache for ranged reads.
//!
//! Read streams with the cache enabled store each response window in a
//! [CacheStore], keyed by the object URL and the `Range` header. Write
//! streams with the cache enabled remove those windows once the upload is
//! finalized.
//!
//! The client library does not bound the cache, the store is responsible for
//! expiring and evicting entries.

use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

const KEY_PREFIX: &str = "_ah_gs_read_cache";

/// Returns the cache key for a window of an object.
///
/// # Example
/// ```
/// # use google_cloud_storage_streams::cache::cache_key;
/// let key = cache_key("https://storage.googleapis.com/bucket/object", "bytes=0-99");
/// assert_eq!(
///     key,
///     "_ah_gs_read_cache_https://storage.googleapis.com/bucket/object_bytes=0-99"
/// );
/// ```
pub fn cache_key(url: &str, range: &str) -> String {
    format!("{KEY_PREFIX}_{url}_{range}")
}

/// A cached HTTP response for one window of an object.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CacheEntry {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    #[serde(with = "base64_bytes")]
    pub body: Bytes,
}

impl CacheEntry {
    /// Returns a header value. Names are compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Serializes the entry for stores that hold strings.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserializes an entry created with [encode][CacheEntry::encode].
    pub fn decode(value: &str) -> serde_json::Result<Self> {
        serde_json::from_str(value)
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::prelude::BASE64_STANDARD;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let s = String::deserialize(deserializer)?;
        BASE64_STANDARD
            .decode(s)
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

/// The Cache Store port.
///
/// A cache failure never fails a read: implementations should log and
/// swallow their own errors, returning `None` from `get` when in doubt.
#[async_trait::async_trait]
pub trait CacheStore: std::fmt::Debug + Send + Sync {
    /// Returns the entry for `key`, if present and not expired.
    async fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Stores `entry` under `key` for `ttl`.
    async fn set(&self, key: &str, entry: CacheEntry, ttl: Duration);

    /// Removes all the entries in `keys`. Missing keys are ignored.
    async fn delete_many(&self, keys: &[String]);
}

#[async_trait::async_trait]
impl<T: CacheStore + ?Sized> CacheStore for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.as_ref().get(key).await
    }

    async fn set(&self, key: &str, entry: CacheEntry, ttl: Duration) {
        self.as_ref().set(key, entry, ttl).await
    }

    async fn delete_many(&self, keys: &[String]) {
        self.as_ref().delete_many(keys).await
    }
}

/// A process-local [CacheStore].
///
/// Expired entries are removed when they are next accessed.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: tokio::sync::Mutex<HashMap<String, (CacheEntry, Option<Instant>)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of stored entries, including any expired ones.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait::async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut guard = self.entries.lock().await;
        match guard.get(key) {
            Some((entry, deadline)) if deadline.is_none_or(|d| Instant::now() < d) => {
                Some(entry.clone())
            }
            Some(_) => {
                guard.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, entry: CacheEntry, ttl: Duration) {
        // `None` never expires.
        let deadline = Instant::now().checked_add(ttl);
        self.entries.lock().await.insert(key.to_string(), (entry, deadline));
    }

    async fn delete_many(&self, keys: &[String]) {
        let mut guard = self.entries.lock().await;
        keys.iter().for_each(|k| {
            guard.remove(k);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry() -> CacheEntry {
        CacheEntry {
            status_code: 206,
            headers: BTreeMap::from([
                ("Content-Range".to_string(), "bytes 0-4/10".to_string()),
                ("ETag".to_string(), "\"abc\"".to_string()),
            ]),
            body: Bytes::from_static(b"\x00\x01hi\xff"),
        }
    }

    #[test]
    fn serialize() -> anyhow::Result<()> {
        let encoded = entry().encode()?;
        let json = serde_json::from_str::<serde_json::Value>(&encoded)?;
        assert_eq!(json["body"], "AAFoaf8=");
        assert_eq!(json["status_code"], 206);
        assert_eq!(CacheEntry::decode(&encoded)?, entry());
        Ok(())
    }

    #[test]
    fn decode_bad_body() {
        let got = CacheEntry::decode(r#"{"status_code":200,"headers":{},"body":"not base64!"}"#);
        assert!(got.is_err(), "{got:?}");
    }

    #[test]
    fn header() {
        let e = entry();
        assert_eq!(e.header("etag"), Some("\"abc\""));
        assert_eq!(e.header("content-range"), Some("bytes 0-4/10"));
        assert_eq!(e.header("last-modified"), None);
    }

    #[tokio::test]
    async fn in_memory() {
        let cache = InMemoryCache::new();
        assert!(cache.get("k1").await.is_none());
        cache.set("k1", entry(), Duration::from_secs(60)).await;
        cache.set("k2", entry(), Duration::from_secs(60)).await;
        assert_eq!(cache.get("k1").await, Some(entry()));
        assert_eq!(cache.len().await, 2);

        cache
            .delete_many(&["k1".to_string(), "missing".to_string()])
            .await;
        assert!(cache.get("k1").await.is_none());
        assert!(cache.get("k2").await.is_some());
    }

    #[tokio::test]
    async fn in_memory_expires() {
        let cache = InMemoryCache::new();
        cache.set("k1", entry(), Duration::ZERO).await;
        assert!(cache.get("k1").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn in_memory_unbounded_ttl() {
        let cache = InMemoryCache::new();
        cache.set("k1", entry(), Duration::MAX).await;
        assert_eq!(cache.get("k1").await, Some(entry()));
    }
}
