//! Per-request admission decision
//!
//! A filter is configured once and then evaluated concurrently for every
//! request. Evaluation is a pure function of the request and the filter:
//!
//! 1. Path outside every scope: continue, nothing else is looked at
//! 2. Resolve the client address (unparseable means "not matched")
//! 3. Classify the address against the ranges or the country set
//! 4. Combine with the rule: Block denies matches, Allow denies non-matches

use std::fmt;
use std::net::IpAddr;

use bytes::Bytes;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FilterError, Result};
use crate::filter::{
    AddressResolver, CountryCodeSet, ForwardedTrust, GeoResolver, PathScope, RangeSet,
};
use crate::request::ClientRequest;

/// What a filter does with clients that match its ranges or countries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rule {
    /// Only matching clients may proceed
    Allow,
    /// Matching clients are denied
    Block,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Allow => f.write_str("allow"),
            Rule::Block => f.write_str("block"),
        }
    }
}

/// Outcome handed back to the hosting pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Pass the request to the next stage
    Continue,
    /// Stop here and answer with `status` and `body`
    Deny { status: StatusCode, body: Bytes },
}

impl Verdict {
    /// A configured block page is served with 200 so clients see the page;
    /// without one the client gets a bare 403.
    pub fn deny(block_page: Option<&Bytes>) -> Self {
        match block_page {
            Some(page) => Verdict::Deny {
                status: StatusCode::OK,
                body: page.clone(),
            },
            None => Verdict::Deny {
                status: StatusCode::FORBIDDEN,
                body: Bytes::new(),
            },
        }
    }

    /// Status reported to the pipeline; 200 on pass-through
    pub fn status(&self) -> StatusCode {
        match self {
            Verdict::Continue => StatusCode::OK,
            Verdict::Deny { status, .. } => *status,
        }
    }

    /// Body written by the filter; empty on pass-through
    pub fn body(&self) -> &[u8] {
        match self {
            Verdict::Continue => &[],
            Verdict::Deny { body, .. } => &body[..],
        }
    }

    pub fn is_deny(&self) -> bool {
        matches!(self, Verdict::Deny { .. })
    }
}

/// The single source a filter classifies addresses with
#[derive(Debug, Clone)]
pub enum ClassificationSource {
    /// Explicit address ranges
    Ranges(RangeSet),
    /// Countries resolved through GeoIP
    Countries {
        codes: CountryCodeSet,
        geo: GeoResolver,
    },
}

impl ClassificationSource {
    pub fn countries(codes: CountryCodeSet, geo: GeoResolver) -> Self {
        ClassificationSource::Countries { codes, geo }
    }

    /// Whether `ip` falls in a configured range or resolves to a configured
    /// country. Addresses without a GeoIP entry never match.
    pub fn matches(&self, ip: &IpAddr) -> bool {
        match self {
            ClassificationSource::Ranges(ranges) => ranges.contains(ip),
            ClassificationSource::Countries { codes, geo } => geo
                .country_of(ip)
                .map(|country| codes.contains(&country))
                .unwrap_or(false),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            ClassificationSource::Ranges(ranges) => ranges.is_empty(),
            ClassificationSource::Countries { codes, .. } => codes.is_empty(),
        }
    }
}

/// One configured filter instance, immutable after construction
#[derive(Debug, Clone)]
pub struct FilterConfig {
    scope: PathScope,
    rule: Rule,
    source: ClassificationSource,
    block_page: Option<Bytes>,
    resolver: AddressResolver,
}

impl FilterConfig {
    /// Create a filter. An empty range or country set is rejected, since a
    /// filter has to classify with exactly one non-empty source.
    pub fn new(scope: PathScope, rule: Rule, source: ClassificationSource) -> Result<Self> {
        if source.is_empty() {
            return Err(FilterError::MissingSource);
        }
        Ok(Self {
            scope,
            rule,
            source,
            block_page: None,
            resolver: AddressResolver::default(),
        })
    }

    /// Body served instead of a bare 403 when a request is denied
    pub fn with_block_page(mut self, page: impl Into<Bytes>) -> Self {
        self.block_page = Some(page.into());
        self
    }

    pub fn with_forwarded_trust(mut self, trust: ForwardedTrust) -> Self {
        self.resolver = AddressResolver::new(trust);
        self
    }

    pub fn scope(&self) -> &PathScope {
        &self.scope
    }

    pub fn rule(&self) -> Rule {
        self.rule
    }

    pub fn source(&self) -> &ClassificationSource {
        &self.source
    }

    pub fn block_page(&self) -> Option<&Bytes> {
        self.block_page.as_ref()
    }

    /// Decide whether `req` may proceed
    pub fn decide<R: ClientRequest + ?Sized>(&self, req: &R) -> Verdict {
        self.evaluate(req).verdict
    }

    /// Like [`decide`](Self::decide), also reporting how the verdict was reached
    pub fn evaluate<R: ClientRequest + ?Sized>(&self, req: &R) -> Decision {
        let path = req.path();
        if !self.scope.in_scope(path) {
            return Decision {
                verdict: Verdict::Continue,
                in_scope: false,
                client_ip: None,
                matched: false,
            };
        }

        let client_ip = match self.resolver.resolve(req) {
            Ok(ip) => Some(ip),
            Err(e) => {
                warn!("Treating request to {} as unmatched: {}", path, e);
                None
            }
        };
        let matched = client_ip
            .map(|ip| self.source.matches(&ip))
            .unwrap_or(false);

        let verdict = match (self.rule, matched) {
            (Rule::Block, true) | (Rule::Allow, false) => Verdict::deny(self.block_page.as_ref()),
            (Rule::Block, false) | (Rule::Allow, true) => Verdict::Continue,
        };

        debug!(
            "{} {} ip={:?} matched={} -> {}",
            self.rule,
            path,
            client_ip,
            matched,
            verdict.status()
        );

        Decision {
            verdict,
            in_scope: true,
            client_ip,
            matched,
        }
    }
}

/// Verdict plus the facts it was derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub verdict: Verdict,
    /// Whether the path fell under one of the filter's scopes
    pub in_scope: bool,
    /// Resolved client address, `None` when out of scope or unparseable
    pub client_ip: Option<IpAddr>,
    /// Whether the address matched the ranges or countries
    pub matched: bool,
}
