use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpType {
    #[default]
    Public,
    Private,
    Reserved,
}

/// Localized metadata for one `/24` network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoRecord {
    #[serde(rename = "type")]
    pub ip_type: IpType,
    /// Network key the record is stored under.
    pub address: String,
    pub country: String,
    pub region: String,
    pub city: String,
    pub district: String,
    pub zip: u32,
    pub status: String,
}

impl GeoRecord {
    pub fn localize(&self) -> String {
        format!("{},{},{}", self.country, self.region, self.city)
    }

    pub fn full_localize(&self) -> String {
        let mut text = self.localize();
        if !self.district.is_empty() {
            text.push(' ');
            text.push_str(&self.district);
        }
        if self.zip > 0 {
            text.push_str(&format!(" ({})", self.zip));
        }
        text
    }

    /// Normalizes an ip-api reply stored under `key`.
    ///
    /// Failed lookups are kept only for private and reserved ranges; any other
    /// failure returns `None`.
    pub fn from_lookup(key: &str, reply: IpApiResponse) -> Option<Self> {
        let ip_type = if reply.status == "fail" {
            match reply.message.as_str() {
                "private range" => IpType::Private,
                "reserved range" => IpType::Reserved,
                _ => return None,
            }
        } else {
            IpType::Public
        };

        let status = match ip_type {
            IpType::Private => "local",
            IpType::Reserved => "reserved",
            IpType::Public => "",
        };

        let region = if reply.region.trim().is_empty() {
            reply.region_name
        } else {
            reply.region
        };

        Some(Self {
            ip_type,
            address: key.to_string(),
            country: reply.country.trim().to_string(),
            region: region.trim().to_string(),
            city: reply.city.trim().to_string(),
            district: reply.district.trim().to_string(),
            zip: reply.zip,
            status: status.to_string(),
        })
    }
}

/// Reply body of the ip-api JSON endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IpApiResponse {
    pub status: String,
    pub message: String,
    pub query: String,
    pub country: String,
    #[serde(rename = "countryCode")]
    pub country_code: String,
    pub region: String,
    #[serde(rename = "regionName")]
    pub region_name: String,
    pub city: String,
    pub district: String,
    #[serde(deserialize_with = "lenient_zip")]
    pub zip: u32,
    pub timezone: String,
    pub org: String,
    pub mobile: bool,
}

// ip-api sends zip as a string, sometimes empty or non-numeric.
fn lenient_zip<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()).unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}
