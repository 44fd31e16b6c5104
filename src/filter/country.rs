//! ISO 3166-1 alpha-2 country code sets

use std::collections::HashSet;

use crate::error::{FilterError, Result};

/// Normalize a country code to two-letter uppercase form
pub fn normalize_country_code(code: &str) -> Option<String> {
    let code = code.trim();
    if code.len() == 2 && code.bytes().all(|b| b.is_ascii_alphabetic()) {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}

/// Set of uppercase country codes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryCodeSet {
    codes: HashSet<String>,
}

impl CountryCodeSet {
    /// Build a set from configured codes; any entry that is not two ASCII
    /// letters is rejected
    pub fn new<S: AsRef<str>>(codes: &[S]) -> Result<Self> {
        let mut set = Self::default();
        for code in codes {
            set.insert(code.as_ref())?;
        }
        Ok(set)
    }

    pub fn insert(&mut self, code: &str) -> Result<()> {
        let normalized = normalize_country_code(code)
            .ok_or_else(|| FilterError::InvalidCountryCode(code.to_string()))?;
        self.codes.insert(normalized);
        Ok(())
    }

    /// Exact match after normalizing the candidate
    pub fn contains(&self, code: &str) -> bool {
        normalize_country_code(code)
            .map(|c| self.codes.contains(&c))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }
}
