use std::net::Ipv4Addr;

use async_trait::async_trait;
use relay_httpx::{Content, HttpClient, QueryParams, RequestSpec};
use tracing::debug;

use crate::{GeoError, IpApiResponse, Result};

pub const DEFAULT_PROVIDER_URL: &str = "http://ip-api.com/json/";
const LOOKUP_FIELDS: &str =
    "status,message,country,countryCode,regionName,city,district,zip,timezone,org,mobile,query";

/// External address lookup consulted on a store miss.
#[async_trait]
pub trait IpLookup: Send + Sync {
    async fn lookup(&self, addr: Ipv4Addr) -> Result<IpApiResponse>;
}

/// Lookup against the ip-api JSON endpoint.
pub struct IpApiLookup {
    client: HttpClient,
    lang: String,
}

impl IpApiLookup {
    pub fn new(provider_url: &str, lang: &str) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(provider_url)?,
            lang: lang.to_string(),
        })
    }
}

#[async_trait]
impl IpLookup for IpApiLookup {
    async fn lookup(&self, addr: Ipv4Addr) -> Result<IpApiResponse> {
        let params = QueryParams::new()
            .with("lang", self.lang.as_str())
            .with("fields", LOOKUP_FIELDS);
        let response = self
            .client
            .request(&addr.to_string(), &params, RequestSpec::get().skip_verify(true))
            .await?;
        debug!(addr = %addr, elapsed_ms = response.elapsed.as_millis() as u64, "Geo lookup");

        match response.into_content() {
            Some(Content::Object(map)) => {
                Ok(serde_json::from_value(serde_json::Value::Object(map))?)
            }
            Some(other) => Err(GeoError::Rejected(format!(
                "unexpected {:?} body",
                other.kind()
            ))),
            None => Err(GeoError::Rejected("stream body".into())),
        }
    }
}
