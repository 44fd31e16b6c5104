//! Ordered set of filters evaluated as one pipeline stage

use std::sync::Arc;

use super::decision::{FilterConfig, Verdict};
use crate::request::ClientRequest;

/// Filters evaluated in configuration order; the first deny wins.
///
/// Cloning is cheap, every clone shares the same filters.
#[derive(Debug, Clone)]
pub struct FilterChain {
    filters: Arc<[FilterConfig]>,
}

impl FilterChain {
    pub fn new(filters: Vec<FilterConfig>) -> Self {
        Self {
            filters: filters.into(),
        }
    }

    pub fn decide<R: ClientRequest + ?Sized>(&self, req: &R) -> Verdict {
        self.filters
            .iter()
            .map(|f| f.decide(req))
            .find(Verdict::is_deny)
            .unwrap_or(Verdict::Continue)
    }

    pub fn filters(&self) -> &[FilterConfig] {
        &self.filters
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
