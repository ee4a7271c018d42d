use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::key::{network_key, parse_ipv4};
use crate::{GeoRecord, GeoStore, IpApiLookup, IpLookup, Result};

/// Read-through cache: embedded store first, external lookup on a miss.
///
/// Addresses in the same `/24` share one record, so results are only as
/// precise as the network prefix.
#[derive(Clone)]
pub struct GeoIpCache {
    store: GeoStore,
    lookup: Arc<dyn IpLookup>,
}

impl GeoIpCache {
    pub fn new(store: GeoStore, lookup: Arc<dyn IpLookup>) -> Self {
        Self { store, lookup }
    }

    pub fn open(db_path: impl AsRef<Path>, provider_url: &str, lang: &str) -> Result<Self> {
        let store = GeoStore::open(db_path)?;
        let lookup = IpApiLookup::new(provider_url, lang)?;
        Ok(Self::new(store, Arc::new(lookup)))
    }

    /// Record for `addr`, or `None` for IPv6, invalid input, and failed lookups.
    pub async fn resolve(&self, addr: &str) -> Result<Option<GeoRecord>> {
        let Some(ip) = parse_ipv4(addr) else {
            return Ok(None);
        };
        let key = network_key(ip);

        if let Some(record) = self.store.get(&key).await? {
            debug!(key = %key, "Geo store hit");
            return Ok(Some(record));
        }

        let reply = self.lookup.lookup(ip).await?;
        let Some(record) = GeoRecord::from_lookup(&key, reply) else {
            return Ok(None);
        };
        self.store.put(&key, &record).await?;
        debug!(key = %key, ip_type = ?record.ip_type, "Geo record stored");
        Ok(Some(record))
    }

    /// `"country,region,city"` for `addr`, or `""` when unknown. Never fails.
    pub async fn localize(&self, addr: &str) -> String {
        match self.resolve(addr).await {
            Ok(Some(record)) => record.localize(),
            Ok(None) => String::new(),
            Err(e) => {
                warn!(addr = %addr, error = %e, "Geo localization failed");
                String::new()
            }
        }
    }
}

impl std::fmt::Debug for GeoIpCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoIpCache")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
