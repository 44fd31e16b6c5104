//! Client address resolution
//!
//! By default `X-Forwarded-For` is trusted unconditionally and replaces the
//! remote peer address. Any client can forge that header unless an upstream
//! proxy strips it; [`ForwardedTrust::TrustedProxies`] and
//! [`ForwardedTrust::Never`] are available for deployments that need more.

use std::net::IpAddr;

use ipnetwork::IpNetwork;
use thiserror::Error;

use crate::request::{ClientRequest, X_FORWARDED_FOR};

/// The candidate address did not parse as IPv4 or IPv6
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid client address: {0:?}")]
pub struct InvalidAddress(pub String);

/// When to honor the forwarded-address header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ForwardedTrust {
    /// Always use the header when present
    #[default]
    Always,
    /// Ignore the header, use the remote peer only
    Never,
    /// Use the header only when the remote peer is one of these networks
    TrustedProxies(Vec<IpNetwork>),
}

/// Extracts the effective client IP from a request
#[derive(Debug, Clone, Default)]
pub struct AddressResolver {
    trust: ForwardedTrust,
}

impl AddressResolver {
    pub fn new(trust: ForwardedTrust) -> Self {
        Self { trust }
    }

    pub fn trust(&self) -> &ForwardedTrust {
        &self.trust
    }

    pub fn resolve<R: ClientRequest + ?Sized>(&self, req: &R) -> Result<IpAddr, InvalidAddress> {
        let remote = req.remote_addr().unwrap_or_default();

        if let Some(forwarded) = req.header(X_FORWARDED_FOR) {
            let forwarded = forwarded.trim();
            if !forwarded.is_empty() && self.honors_forwarded(&remote) {
                return parse_candidate(forwarded);
            }
        }

        parse_candidate(strip_port(&remote))
    }

    fn honors_forwarded(&self, remote: &str) -> bool {
        match &self.trust {
            ForwardedTrust::Always => true,
            ForwardedTrust::Never => false,
            ForwardedTrust::TrustedProxies(networks) => match strip_port(remote).parse::<IpAddr>() {
                Ok(peer) => networks.iter().any(|n| n.contains(peer)),
                Err(_) => false,
            },
        }
    }
}

fn parse_candidate(s: &str) -> Result<IpAddr, InvalidAddress> {
    s.parse().map_err(|_| InvalidAddress(s.to_string()))
}

/// Host part of `host:port`, `[v6]:port` or a bare address. The port itself is
/// not validated.
pub fn strip_port(addr: &str) -> &str {
    let addr = addr.trim();
    if let Some(rest) = addr.strip_prefix('[') {
        return match rest.find(']') {
            Some(end) => &rest[..end],
            None => addr,
        };
    }
    match addr.rfind(':') {
        // A single colon separates host and port; more than one means a bare IPv6
        Some(idx) if addr[..idx].find(':').is_none() => &addr[..idx],
        _ => addr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestInfo;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("8.8.4.4:12345"), "8.8.4.4");
        assert_eq!(strip_port("8.8.8.8:_"), "8.8.8.8");
        assert_eq!(strip_port("[2001:db8::1]:443"), "2001:db8::1");
        assert_eq!(strip_port("[::1]"), "::1");
        assert_eq!(strip_port("2001:db8::1"), "2001:db8::1");
        assert_eq!(strip_port("10.0.0.1"), "10.0.0.1");
    }

    #[test]
    fn test_remote_addr_without_header() {
        let resolver = AddressResolver::default();
        let req = RequestInfo::new("8.8.4.4:12345", "/");
        assert_eq!(resolver.resolve(&req), Ok(ip("8.8.4.4")));
    }

    #[test]
    fn test_forwarded_overrides_remote() {
        let resolver = AddressResolver::default();
        let req = RequestInfo::new("8.8.4.4:12345", "/").with_forwarded_for("8.8.8.8");
        assert_eq!(resolver.resolve(&req), Ok(ip("8.8.8.8")));
    }

    #[test]
    fn test_empty_forwarded_falls_back() {
        let resolver = AddressResolver::default();
        let req = RequestInfo::new("8.8.4.4:12345", "/").with_forwarded_for("  ");
        assert_eq!(resolver.resolve(&req), Ok(ip("8.8.4.4")));
    }

    #[test]
    fn test_malformed_forwarded_is_invalid() {
        let resolver = AddressResolver::default();
        let req = RequestInfo::new("8.8.4.4:12345", "/").with_forwarded_for("8.8.8.8, 1.1.1.1");
        assert!(resolver.resolve(&req).is_err());

        let req = RequestInfo::new("8.8.4.4:12345", "/").with_forwarded_for("unknown");
        assert_eq!(
            resolver.resolve(&req),
            Err(InvalidAddress("unknown".to_string()))
        );
    }

    #[test]
    fn test_malformed_remote_is_invalid() {
        let resolver = AddressResolver::default();
        assert!(resolver.resolve(&RequestInfo::new("garbage:80", "/")).is_err());
        assert!(resolver.resolve(&RequestInfo::new("", "/")).is_err());
    }

    #[test]
    fn test_never_trust_ignores_header() {
        let resolver = AddressResolver::new(ForwardedTrust::Never);
        let req = RequestInfo::new("8.8.4.4:12345", "/").with_forwarded_for("8.8.8.8");
        assert_eq!(resolver.resolve(&req), Ok(ip("8.8.4.4")));
    }

    #[test]
    fn test_trusted_proxies() {
        let proxies = vec!["10.0.0.0/8".parse().unwrap()];
        let resolver = AddressResolver::new(ForwardedTrust::TrustedProxies(proxies));

        let via_proxy = RequestInfo::new("10.1.2.3:8080", "/").with_forwarded_for("8.8.8.8");
        assert_eq!(resolver.resolve(&via_proxy), Ok(ip("8.8.8.8")));

        let direct = RequestInfo::new("8.8.4.4:8080", "/").with_forwarded_for("8.8.8.8");
        assert_eq!(resolver.resolve(&direct), Ok(ip("8.8.4.4")));
    }

    #[test]
    fn test_ipv6_peer() {
        let resolver = AddressResolver::default();
        let req = RequestInfo::new("[2001:db8::7]:4000", "/");
        assert_eq!(resolver.resolve(&req), Ok(ip("2001:db8::7")));
    }
}
