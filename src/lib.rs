//! Path-scoped HTTP request admission by client IP
//!
//! Decides, before a request reaches application code, whether its client
//! may proceed. A filter applies to a set of path prefixes and classifies the
//! client address with exactly one source:
//! - explicit IP ranges (IPv4 and IPv6, inclusive)
//! - ISO country codes resolved through a GeoIP database
//!
//! The rule then turns the match into a verdict: `Block` denies matching
//! clients, `Allow` denies everyone else.
//!
//! # Example
//!
//! ```rust
//! use ipfilter::engine::{ClassificationSource, FilterConfig, Rule, Verdict};
//! use ipfilter::filter::{PathScope, RangeSet};
//! use ipfilter::request::RequestInfo;
//!
//! let ranges = RangeSet::parse(&["8.8.8.8"]).unwrap();
//! let filter = FilterConfig::new(
//!     PathScope::new(["/"]),
//!     Rule::Block,
//!     ClassificationSource::Ranges(ranges),
//! )
//! .unwrap();
//!
//! let direct = RequestInfo::new("8.8.4.4:12345", "/");
//! assert_eq!(filter.decide(&direct), Verdict::Continue);
//!
//! let proxied = RequestInfo::new("8.8.4.4:12345", "/").with_forwarded_for("8.8.8.8");
//! assert_eq!(filter.decide(&proxied).status(), http::StatusCode::FORBIDDEN);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod request;

pub use config::Config;
pub use engine::{ClassificationSource, Decision, FilterChain, FilterConfig, Rule, Verdict};
pub use error::{FilterError, Result};
pub use filter::{
    AddressResolver, CountryCodeSet, CountryLookup, ForwardedTrust, GeoIpDatabase, GeoResolver,
    PathScope, Range, RangeSet,
};
pub use request::{ClientRequest, RequestInfo};
