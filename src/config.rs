use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::engine::{ClassificationSource, FilterChain, FilterConfig, Rule};
use crate::error::FilterError;
use crate::filter::{
    CountryCodeSet, ForwardedTrust, GeoIpDatabase, GeoResolver, PathScope, RangeSet,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub geoip: GeoIpConfig,

    /// Filter instances, evaluated in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterSettings>,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load config from default locations or create default
    pub fn load_or_default() -> Result<Self> {
        let paths = [
            PathBuf::from("/etc/ipfilter/config.toml"),
            dirs_next::config_dir()
                .map(|p| p.join("ipfilter/config.toml"))
                .unwrap_or_default(),
            PathBuf::from("ipfilter.toml"),
        ];

        for path in &paths {
            if path.exists() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Sample configuration written by `ipfilter init`
    pub fn sample() -> Self {
        Self {
            filters: vec![FilterSettings {
                paths: vec!["/admin".to_string()],
                rule: Rule::Allow,
                countries: Vec::new(),
                ranges: vec![
                    "127.0.0.1".to_string(),
                    "10.0.0.0/8".to_string(),
                    "192.168.1.10-192.168.1.20".to_string(),
                ],
                block_page: None,
                forwarded_for: ForwardedMode::Trust,
                trusted_proxies: Vec::new(),
            }],
            ..Self::default()
        }
    }

    /// Whether any filter classifies by country. Filters that also set
    /// `ranges` are invalid and do not count.
    pub fn needs_geoip(&self) -> bool {
        self.filters
            .iter()
            .any(|f| !f.countries.is_empty() && f.ranges.is_empty())
    }

    /// Open the GeoIP database, if one is configured
    pub fn open_geoip(&self) -> Result<Option<GeoIpDatabase>> {
        match &self.geoip.database {
            Some(path) => {
                let db = GeoIpDatabase::open(path).with_context(|| {
                    format!("Failed to open GeoIP database: {}", path.display())
                })?;
                Ok(Some(db))
            }
            None => Ok(None),
        }
    }

    /// Validate every filter and build the runtime chain.
    ///
    /// The GeoIP database is opened once and shared by all country filters;
    /// it is only required when at least one filter uses `countries`.
    pub fn build_filters(&self) -> Result<FilterChain> {
        let geo = if self.needs_geoip() {
            let db = self.open_geoip()?.ok_or(FilterError::MissingDatabase)?;
            Some(GeoResolver::new(Arc::new(db)))
        } else {
            None
        };

        self.build_filters_with(geo.as_ref())
    }

    /// Build the chain against an already opened country lookup
    pub fn build_filters_with(&self, geo: Option<&GeoResolver>) -> Result<FilterChain> {
        let mut filters = Vec::with_capacity(self.filters.len());
        for (index, settings) in self.filters.iter().enumerate() {
            let filter = settings
                .build(geo)
                .with_context(|| format!("Invalid filter #{} ({:?})", index + 1, settings.paths))?;
            filters.push(filter);
        }

        info!("Loaded {} filter(s)", filters.len());
        Ok(FilterChain::new(filters))
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// GeoIP database settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoIpConfig {
    /// Path to a MaxMind GeoIP2/GeoLite2 country or city database
    #[serde(default)]
    pub database: Option<PathBuf>,
}

/// How a filter treats the X-Forwarded-For header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForwardedMode {
    /// Always use the header when present
    #[default]
    Trust,
    /// Never use the header
    Ignore,
    /// Use the header only from `trusted_proxies`
    Proxies,
}

/// One `[[filters]]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Path prefixes this filter applies to
    #[serde(default = "default_paths")]
    pub paths: Vec<String>,

    pub rule: Rule,

    /// ISO country codes (mutually exclusive with `ranges`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub countries: Vec<String>,

    /// Addresses, `low-high` ranges or CIDR networks (mutually exclusive with `countries`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ranges: Vec<String>,

    /// File served with status 200 to denied clients
    #[serde(default)]
    pub block_page: Option<PathBuf>,

    #[serde(default)]
    pub forwarded_for: ForwardedMode,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trusted_proxies: Vec<String>,
}

impl FilterSettings {
    /// Validate these settings and build a filter
    pub fn build(&self, geo: Option<&GeoResolver>) -> crate::error::Result<FilterConfig> {
        let source = match (self.countries.is_empty(), self.ranges.is_empty()) {
            (false, false) => return Err(FilterError::ConflictingSources),
            (true, true) => return Err(FilterError::MissingSource),
            (false, true) => {
                let geo = geo.ok_or(FilterError::MissingDatabase)?;
                ClassificationSource::countries(CountryCodeSet::new(&self.countries)?, geo.clone())
            }
            (true, false) => ClassificationSource::Ranges(RangeSet::parse(&self.ranges)?),
        };

        let scope = PathScope::new(self.paths.iter().cloned());
        let mut filter = FilterConfig::new(scope, self.rule, source)?
            .with_forwarded_trust(self.forwarded_trust()?);

        if let Some(path) = &self.block_page {
            let page = std::fs::read(path).map_err(|source| FilterError::BlockPage {
                path: path.clone(),
                source,
            })?;
            filter = filter.with_block_page(page);
        }

        Ok(filter)
    }

    fn forwarded_trust(&self) -> crate::error::Result<ForwardedTrust> {
        match self.forwarded_for {
            ForwardedMode::Trust => Ok(ForwardedTrust::Always),
            ForwardedMode::Ignore => Ok(ForwardedTrust::Never),
            ForwardedMode::Proxies => {
                let networks = self
                    .trusted_proxies
                    .iter()
                    .map(|p| {
                        p.trim()
                            .parse()
                            .map_err(|_| FilterError::InvalidProxy(p.clone()))
                    })
                    .collect::<crate::error::Result<Vec<_>>>()?;
                Ok(ForwardedTrust::TrustedProxies(networks))
            }
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_paths() -> Vec<String> {
    vec!["/".to_string()]
}
