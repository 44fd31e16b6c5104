use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building a filter from its settings
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("filter sets both country codes and IP ranges")]
    ConflictingSources,

    #[error("filter sets neither country codes nor IP ranges")]
    MissingSource,

    #[error("invalid IP range: {0}")]
    InvalidRange(String),

    #[error("range mixes address families: {low} - {high}")]
    MixedFamilies { low: IpAddr, high: IpAddr },

    #[error("range start is above range end: {low} - {high}")]
    InvertedRange { low: IpAddr, high: IpAddr },

    #[error("invalid country code: {0:?}")]
    InvalidCountryCode(String),

    #[error("invalid trusted proxy network: {0}")]
    InvalidProxy(String),

    #[error("country filtering requires a GeoIP database")]
    MissingDatabase,

    #[error(transparent)]
    GeoIp(#[from] crate::filter::geoip::GeoIpError),

    #[error("failed to read block page {}", path.display())]
    BlockPage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, FilterError>;
