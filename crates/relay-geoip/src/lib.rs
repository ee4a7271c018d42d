//! Geo-IP localization cache.

mod cache;
mod error;
mod key;
mod lookup;
mod record;
mod store;

pub use cache::GeoIpCache;
pub use error::{GeoError, Result};
pub use key::{network_key, parse_ipv4};
pub use lookup::{IpApiLookup, IpLookup, DEFAULT_PROVIDER_URL};
pub use record::{GeoRecord, IpApiResponse, IpType};
pub use store::GeoStore;
