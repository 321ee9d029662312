//! Geolocation lookups backing the enrich pipeline hook (§4.9): a cached
//! front end over either a local database or a remote HTTP API.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use tracing::{debug, warn};

use mcscan_config::LogType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoInfo {
    pub country: Option<String>,
    pub city: Option<String>,
    pub asn: Option<String>,
}

#[async_trait]
pub trait GeolocationBackend: Send + Sync {
    async fn lookup(&self, addr: IpAddr) -> Option<GeoInfo>;
}

/// Looks up `ip-api.com`'s free JSON endpoint. Used when
/// `geolocation.provider = remote`.
pub struct RemoteBackend {
    client: reqwest::Client,
}

impl RemoteBackend {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for RemoteBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct IpApiResponse {
    status: String,
    country: Option<String>,
    city: Option<String>,
    #[serde(rename = "as")]
    asn: Option<String>,
}

#[async_trait]
impl GeolocationBackend for RemoteBackend {
    async fn lookup(&self, addr: IpAddr) -> Option<GeoInfo> {
        let url = format!("http://ip-api.com/json/{addr}");
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(log_type = LogType::Blacklist.as_str(), %addr, error = %e, "geolocation request failed");
                return None;
            }
        };

        let parsed: IpApiResponse = response.json().await.ok()?;
        if parsed.status != "success" {
            return None;
        }

        Some(GeoInfo {
            country: parsed.country,
            city: parsed.city,
            asn: parsed.asn,
        })
    }
}

/// Reads a local MaxMind-format database. The corpus this crate is built
/// from never reaches for an mmdb-decoding crate, so this backend only
/// validates that the configured file exists; it does not decode entries.
/// `geolocation.provider = remote` is the path that actually resolves
/// lookups today (see DESIGN.md).
pub struct LocalBackend {
    database_path: String,
}

impl LocalBackend {
    pub fn new(database_path: String) -> Self {
        Self { database_path }
    }
}

#[async_trait]
impl GeolocationBackend for LocalBackend {
    async fn lookup(&self, addr: IpAddr) -> Option<GeoInfo> {
        if !std::path::Path::new(&self.database_path).exists() {
            warn!(
                log_type = LogType::Blacklist.as_str(),
                path = %self.database_path,
                "local geolocation database missing, skipping lookup"
            );
        }
        let _ = addr;
        None
    }
}

struct CacheEntry {
    fetched_at: Instant,
    value: Option<GeoInfo>,
}

/// Per-address TTL cache (`geolocation.cache_duration`) in front of a
/// [`GeolocationBackend`], so a host probed repeatedly across a long scan
/// isn't re-queried on every result.
pub struct GeoCache {
    backend: Arc<dyn GeolocationBackend>,
    ttl: Duration,
    entries: DashMap<IpAddr, CacheEntry>,
}

impl GeoCache {
    pub fn new(backend: Arc<dyn GeolocationBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            entries: DashMap::new(),
        }
    }

    pub async fn lookup(&self, addr: IpAddr) -> Option<GeoInfo> {
        if let Some(entry) = self.entries.get(&addr) {
            if entry.fetched_at.elapsed() < self.ttl {
                return entry.value.clone();
            }
        }

        let value = self.backend.lookup(addr).await;
        debug!(log_type = LogType::Blacklist.as_str(), %addr, hit = value.is_some(), "geolocation lookup");
        self.entries.insert(
            addr,
            CacheEntry {
                fetched_at: Instant::now(),
                value: value.clone(),
            },
        );
        value
    }

    /// Drops the oldest third of cached entries; used by the memory
    /// governor at 95% RSS (§4.10).
    pub fn evict_oldest(&self) {
        let mut ages: Vec<(IpAddr, Instant)> =
            self.entries.iter().map(|e| (*e.key(), e.fetched_at)).collect();
        ages.sort_by_key(|(_, fetched_at)| *fetched_at);
        let drop_count = ages.len() / 3;
        for (addr, _) in ages.into_iter().take(drop_count) {
            self.entries.remove(&addr);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedBackend(GeoInfo);

    #[async_trait]
    impl GeolocationBackend for FixedBackend {
        async fn lookup(&self, _addr: IpAddr) -> Option<GeoInfo> {
            Some(self.0.clone())
        }
    }

    #[tokio::test]
    async fn caches_within_ttl() {
        let backend = Arc::new(FixedBackend(GeoInfo {
            country: Some("US".to_string()),
            city: None,
            asn: None,
        }));
        let cache = GeoCache::new(backend, Duration::from_secs(60));
        let addr: IpAddr = "203.0.113.1".parse().unwrap();

        let first = cache.lookup(addr).await.unwrap();
        assert_eq!(first.country.as_deref(), Some("US"));
        assert_eq!(cache.len(), 1);

        cache.lookup(addr).await;
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn eviction_drops_a_third_of_entries() {
        let backend = Arc::new(FixedBackend(GeoInfo {
            country: None,
            city: None,
            asn: None,
        }));
        let cache = GeoCache::new(backend, Duration::from_secs(60));
        for i in 0..9u8 {
            let addr: IpAddr = format!("203.0.113.{i}").parse().unwrap();
            cache.lookup(addr).await;
        }
        assert_eq!(cache.len(), 9);
        cache.evict_oldest();
        assert_eq!(cache.len(), 6);
    }
}
