//! Inclusive IP address ranges
//!
//! A [`RangeSet`] answers "does this address fall in any configured interval".
//! Ranges may overlap; nothing is merged or reordered.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnetwork::IpNetwork;

use crate::error::{FilterError, Result};

/// Inclusive interval of addresses of a single family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    low: IpAddr,
    high: IpAddr,
}

impl Range {
    /// Create a range, rejecting mixed families and `low > high`
    pub fn new(low: IpAddr, high: IpAddr) -> Result<Self> {
        match (low, high) {
            (IpAddr::V4(l), IpAddr::V4(h)) if u32::from(l) > u32::from(h) => {
                Err(FilterError::InvertedRange { low, high })
            }
            (IpAddr::V6(l), IpAddr::V6(h)) if u128::from(l) > u128::from(h) => {
                Err(FilterError::InvertedRange { low, high })
            }
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                Ok(Self { low, high })
            }
            _ => Err(FilterError::MixedFamilies { low, high }),
        }
    }

    /// Range holding exactly one address
    pub fn single(ip: IpAddr) -> Self {
        Self { low: ip, high: ip }
    }

    /// Range spanning a CIDR network, network address through broadcast
    pub fn from_network(network: IpNetwork) -> Self {
        Self {
            low: network.network(),
            high: network.broadcast(),
        }
    }

    pub fn low(&self) -> IpAddr {
        self.low
    }

    pub fn high(&self) -> IpAddr {
        self.high
    }

    /// Numeric containment. An IPv4 address never matches an IPv6 range,
    /// including its IPv4-mapped form.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (self.low, self.high, ip) {
            (IpAddr::V4(l), IpAddr::V4(h), IpAddr::V4(v)) => {
                let v = u32::from(*v);
                u32::from(l) <= v && v <= u32::from(h)
            }
            (IpAddr::V6(l), IpAddr::V6(h), IpAddr::V6(v)) => {
                let v = u128::from(*v);
                u128::from(l) <= v && v <= u128::from(h)
            }
            _ => false,
        }
    }
}

impl FromStr for Range {
    type Err = FilterError;

    /// Accepts `ip`, `low-high` and `network/prefix`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some((low, high)) = s.split_once('-') {
            let low = parse_ip(low)?;
            let high = parse_ip(high)?;
            return Range::new(low, high);
        }
        if s.contains('/') {
            let network = s
                .parse::<IpNetwork>()
                .map_err(|_| FilterError::InvalidRange(s.to_string()))?;
            return Ok(Range::from_network(network));
        }
        parse_ip(s).map(Range::single)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}-{}", self.low, self.high)
        }
    }
}

fn parse_ip(s: &str) -> Result<IpAddr> {
    let s = s.trim();
    s.parse()
        .map_err(|_| FilterError::InvalidRange(s.to_string()))
}

/// Collection of ranges matched with "any range contains"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<Range>,
}

impl RangeSet {
    pub fn new(ranges: Vec<Range>) -> Self {
        Self { ranges }
    }

    /// Parse every entry, failing on the first invalid one
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let ranges = entries
            .iter()
            .map(|e| e.as_ref().parse::<Range>())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { ranges })
    }

    pub fn push(&mut self, range: Range) {
        self.ranges.push(range);
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.ranges.iter().any(|r| r.contains(ip))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Range> {
        self.ranges.iter()
    }
}

impl FromIterator<Range> for RangeSet {
    fn from_iter<I: IntoIterator<Item = Range>>(iter: I) -> Self {
        Self {
            ranges: iter.into_iter().collect(),
        }
    }
}
