//! Shared fixtures for integration tests

use std::net::IpAddr;
use std::sync::Arc;

use ipfilter::filter::{CountryLookup, GeoResolver};
use ipnetwork::IpNetwork;

pub const BLOCK_MSG: &str = "You are not allowed here";

/// In-memory network to country table standing in for a MaxMind database
#[derive(Default)]
pub struct CountryTable {
    entries: Vec<(IpNetwork, &'static str)>,
}

impl CountryTable {
    pub fn with(mut self, network: &str, code: &'static str) -> Self {
        self.entries.push((network.parse().unwrap(), code));
        self
    }

    /// Addresses used by the scenario tables
    pub fn sample() -> Self {
        Self::default()
            .with("8.8.8.0/24", "US")
            .with("24.53.192.0/24", "CA")
            .with("42.48.120.0/24", "CN")
            .with("78.95.221.0/24", "SA")
            .with("5.175.96.0/24", "RU")
            .with("5.4.9.0/24", "DE")
            .with("2a02:2e0::/32", "de")
    }

    pub fn into_resolver(self) -> GeoResolver {
        GeoResolver::new(Arc::new(self))
    }
}

impl CountryLookup for CountryTable {
    fn country_code(&self, ip: &IpAddr) -> Option<String> {
        self.entries
            .iter()
            .find(|(net, _)| net.contains(*ip))
            .map(|(_, code)| code.to_string())
    }
}
