//! Read-through behaviour of the geo-IP cache.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use relay_geoip::{
    GeoError, GeoIpCache, GeoStore, IpApiLookup, IpApiResponse, IpLookup, IpType,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct CountingLookup {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingLookup {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IpLookup for CountingLookup {
    async fn lookup(&self, addr: Ipv4Addr) -> relay_geoip::Result<IpApiResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GeoError::Rejected("lookup offline".into()));
        }
        Ok(serde_json::from_value(json!({
            "status": "success",
            "query": addr.to_string(),
            "country": "Japan",
            "regionName": "Tokyo",
            "city": "Chiyoda",
            "zip": "100-0001"
        }))
        .unwrap())
    }
}

fn open_store(dir: &tempfile::TempDir) -> GeoStore {
    GeoStore::open(dir.path().join("ipv4.db")).unwrap()
}

#[tokio::test]
async fn test_second_localize_served_from_store() {
    let dir = tempfile::tempdir().unwrap();
    let lookup = CountingLookup::new(false);
    let cache = GeoIpCache::new(open_store(&dir), lookup.clone());

    let first = cache.localize("203.0.113.9").await;
    let second = cache.localize("203.0.113.9").await;
    assert_eq!(first, "Japan,Tokyo,Chiyoda");
    assert_eq!(first, second);
    assert_eq!(lookup.calls(), 1);

    // Same /24, different host.
    assert_eq!(cache.localize("203.0.113.200").await, first);
    assert_eq!(lookup.calls(), 1);
}

#[tokio::test]
async fn test_ipv6_and_invalid_skip_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let lookup = CountingLookup::new(false);
    let cache = GeoIpCache::new(open_store(&dir), lookup.clone());

    assert_eq!(cache.localize("2001:db8::1").await, "");
    assert_eq!(cache.localize("garbage").await, "");
    assert_eq!(lookup.calls(), 0);
}

#[tokio::test]
async fn test_lookup_failure_is_blank_and_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let lookup = CountingLookup::new(true);
    let cache = GeoIpCache::new(open_store(&dir), lookup.clone());

    assert_eq!(cache.localize("198.51.100.1").await, "");
    assert_eq!(cache.localize("198.51.100.1").await, "");
    assert_eq!(lookup.calls(), 2);
}

#[tokio::test]
async fn test_ip_api_lookup_private_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/10.1.2.3"))
        .and(query_param("lang", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "fail",
            "message": "private range",
            "query": "10.1.2.3"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let lookup = IpApiLookup::new(&format!("{}/json/", server.uri()), "en").unwrap();
    let cache = GeoIpCache::new(open_store(&dir), Arc::new(lookup));

    let record = cache.resolve("10.1.2.3").await.unwrap().unwrap();
    assert_eq!(record.ip_type, IpType::Private);
    assert_eq!(record.status, "local");
    assert_eq!(record.address, "10.1.2.0");

    // Served from the store; the mock expects exactly one call.
    assert!(cache.resolve("10.1.2.99").await.unwrap().is_some());
}
