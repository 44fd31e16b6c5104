use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::net::IpAddr;
use std::path::PathBuf;
use tabled::{Table, Tabled};

use ipfilter::config::Config;
use ipfilter::engine::{ClassificationSource, FilterChain, Verdict};
use ipfilter::request::RequestInfo;

#[derive(Parser)]
#[command(name = "ipfilter")]
#[command(author, version, about = "Path-scoped HTTP request filtering by IP range or country")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Configuration for the selected command. `init` never reads a file.
    pub fn load_config(&self) -> Result<Config> {
        if let Commands::Init { .. } = self.command {
            return Ok(Config::sample());
        }
        match &self.config {
            Some(path) => Config::load(path),
            None => Config::load_or_default(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a request against the configured filters
    Check {
        /// Request path
        #[arg(short, long, default_value = "/")]
        path: String,

        /// Remote peer address (host:port)
        #[arg(short, long)]
        remote: String,

        /// X-Forwarded-For header value
        #[arg(short, long)]
        forwarded_for: Option<String>,
    },

    /// Load and validate every filter
    Validate,

    /// Show the GeoIP record for an address
    Lookup {
        /// IP address to look up
        ip: IpAddr,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a sample configuration
    Init {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Table row for the filter list
#[derive(Tabled)]
struct FilterRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Paths")]
    paths: String,
    #[tabled(rename = "Rule")]
    rule: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Block Page")]
    block_page: String,
}

pub fn run_command(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Check {
            path,
            remote,
            forwarded_for,
        } => cmd_check(config, path, remote, forwarded_for),
        Commands::Validate => cmd_validate(config),
        Commands::Lookup { ip, json } => cmd_lookup(config, ip, json),
        Commands::Init { output } => cmd_init(config, output),
    }
}

fn cmd_check(
    config: Config,
    path: String,
    remote: String,
    forwarded_for: Option<String>,
) -> Result<()> {
    let chain = config.build_filters()?;

    let mut req = RequestInfo::new(remote, path);
    if let Some(fwd) = forwarded_for {
        req = req.with_forwarded_for(fwd);
    }

    for (index, filter) in chain.filters().iter().enumerate() {
        let decision = filter.evaluate(&req);
        let client = decision
            .client_ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "filter #{}: in_scope={} client={} matched={} -> {}",
            index + 1,
            decision.in_scope,
            client,
            decision.matched,
            decision.verdict.status()
        );
    }

    match chain.decide(&req) {
        Verdict::Continue => println!("{}", "CONTINUE".green().bold()),
        Verdict::Deny { status, body } if body.is_empty() => {
            println!("{} {}", "DENY".red().bold(), status)
        }
        Verdict::Deny { status, body } => println!(
            "{} {} (block page, {} bytes)",
            "DENY".red().bold(),
            status,
            body.len()
        ),
    }

    Ok(())
}

fn cmd_validate(config: Config) -> Result<()> {
    let chain: FilterChain = config.build_filters()?;

    if chain.is_empty() {
        println!("{} no filters configured", "Note:".yellow().bold());
        return Ok(());
    }

    let rows: Vec<FilterRow> = chain
        .filters()
        .iter()
        .zip(&config.filters)
        .enumerate()
        .map(|(index, (filter, settings))| FilterRow {
            index: index + 1,
            paths: filter.scope().prefixes().join(", "),
            rule: filter.rule().to_string(),
            source: match filter.source() {
                ClassificationSource::Ranges(ranges) => format!("{} range(s)", ranges.len()),
                ClassificationSource::Countries { codes, .. } => {
                    let mut codes: Vec<&str> = codes.iter().collect();
                    codes.sort_unstable();
                    codes.join(",")
                }
            },
            block_page: settings
                .block_page
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    println!("{}", Table::new(rows));
    println!("{} {} filter(s)", "Valid:".green().bold(), chain.len());
    Ok(())
}

fn cmd_lookup(config: Config, ip: IpAddr, json: bool) -> Result<()> {
    let db = config
        .open_geoip()?
        .context("No GeoIP database configured (set [geoip] database)")?;

    let Some(record) = db.lookup(&ip) else {
        println!("{} {} not found in database", "Note:".yellow().bold(), ip);
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("IP:        {}", ip);
        println!("Country:   {}", record.country_code.as_deref().unwrap_or("-"));
        println!("Name:      {}", record.country_name.as_deref().unwrap_or("-"));
        println!("Continent: {}", record.continent_code.as_deref().unwrap_or("-"));
        println!("EU:        {}", record.is_eu);
    }

    Ok(())
}

fn cmd_init(config: Config, output: Option<PathBuf>) -> Result<()> {
    let toml_str = toml::to_string_pretty(&config)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &toml_str)?;
            println!("Configuration written to {}", path.display());
        }
        None => {
            println!("{}", toml_str);
        }
    }

    Ok(())
}
