//! GeoIP country resolution
//!
//! [`CountryLookup`] is the seam between the decision engine and whatever
//! answers "which country is this address in". [`GeoIpDatabase`] implements it
//! over a MaxMind GeoIP2/GeoLite2 database held in memory.

use std::fmt;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use maxminddb::{geoip2, Reader};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::country::normalize_country_code;

/// Errors that can occur while loading a GeoIP database
#[derive(Error, Debug)]
pub enum GeoIpError {
    #[error("invalid GeoIP database")]
    DatabaseOpen(#[from] maxminddb::MaxMindDBError),

    #[error("Database file not found: {0}")]
    NotFound(String),
}

/// Synchronous, in-memory IP to country lookup.
///
/// Implementations are shared across concurrently handled requests and must
/// not perform network I/O.
pub trait CountryLookup: Send + Sync {
    /// ISO country code for `ip`, or `None` when the address has no entry
    fn country_code(&self, ip: &IpAddr) -> Option<String>;
}

/// GeoIP lookup result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoLookup {
    /// ISO country code (e.g., "US", "CN")
    pub country_code: Option<String>,
    /// Country name
    pub country_name: Option<String>,
    /// Continent code
    pub continent_code: Option<String>,
    /// Whether this is an EU country
    pub is_eu: bool,
}

/// MaxMind database opened once at startup
pub struct GeoIpDatabase {
    reader: Reader<Vec<u8>>,
}

impl GeoIpDatabase {
    /// Load a MaxMind GeoIP2 database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GeoIpError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GeoIpError::NotFound(path.display().to_string()));
        }

        let reader = Reader::open_readfile(path)?;
        info!(
            "Loaded GeoIP database {} ({})",
            path.display(),
            reader.metadata.database_type
        );
        Ok(Self { reader })
    }

    /// Load database from bytes (useful for embedded databases)
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, GeoIpError> {
        let reader = Reader::from_source(data)?;
        Ok(Self { reader })
    }

    /// Lookup country information for an IP
    pub fn lookup(&self, ip: &IpAddr) -> Option<GeoLookup> {
        let country: geoip2::Country = self.reader.lookup(*ip).ok()?;

        let country_data = country.country?;
        let continent = country.continent;

        Some(GeoLookup {
            country_code: country_data.iso_code.map(String::from),
            country_name: country_data
                .names
                .and_then(|n| n.get("en").map(|s| s.to_string())),
            continent_code: continent.and_then(|c| c.code.map(String::from)),
            is_eu: country_data.is_in_european_union.unwrap_or(false),
        })
    }
}

impl CountryLookup for GeoIpDatabase {
    fn country_code(&self, ip: &IpAddr) -> Option<String> {
        let country: geoip2::Country = self.reader.lookup(*ip).ok()?;
        country.country?.iso_code.map(String::from)
    }
}

impl fmt::Debug for GeoIpDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoIpDatabase")
            .field("database_type", &self.reader.metadata.database_type)
            .field("build_epoch", &self.reader.metadata.build_epoch)
            .finish()
    }
}

/// Shared handle resolving addresses to normalized country codes
#[derive(Clone)]
pub struct GeoResolver {
    lookup: Arc<dyn CountryLookup>,
}

impl GeoResolver {
    pub fn new(lookup: Arc<dyn CountryLookup>) -> Self {
        Self { lookup }
    }

    /// Uppercase country code for `ip`. Misses and malformed codes from the
    /// backing lookup both come back as `None`.
    pub fn country_of(&self, ip: &IpAddr) -> Option<String> {
        self.lookup
            .country_code(ip)
            .and_then(|code| normalize_country_code(&code))
    }
}

impl fmt::Debug for GeoResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoResolver").finish_non_exhaustive()
    }
}
