//! Request classification building blocks
//!
//! Provides the pieces the decision engine composes:
//! - Client address resolution (with forwarded-header trust policy)
//! - Inclusive IP ranges
//! - Country code sets and GeoIP country resolution
//! - Path scopes

pub mod address;
pub mod country;
pub mod geoip;
pub mod range;
pub mod scope;

pub use address::{AddressResolver, ForwardedTrust, InvalidAddress};
pub use country::CountryCodeSet;
pub use geoip::{CountryLookup, GeoIpDatabase, GeoIpError, GeoLookup, GeoResolver};
pub use range::{Range, RangeSet};
pub use scope::PathScope;
