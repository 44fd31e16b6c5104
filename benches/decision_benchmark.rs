//! Decision throughput benchmark
//!
//! Measures per-request latency of the decision engine across source kinds,
//! set sizes and worker counts. Runs without a GeoIP database; country
//! lookups go through an in-memory table.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ipfilter::engine::{ClassificationSource, FilterConfig, Rule};
use ipfilter::filter::{CountryCodeSet, CountryLookup, GeoResolver, PathScope, Range, RangeSet};
use ipfilter::request::RequestInfo;

const REQUESTS: usize = 200_000;

/// Maps the first octet to a fixed country code
struct OctetTable;

impl CountryLookup for OctetTable {
    fn country_code(&self, ip: &IpAddr) -> Option<String> {
        const CODES: [&str; 8] = ["US", "DE", "FR", "GB", "JP", "CN", "RU", "BR"];
        match ip {
            IpAddr::V4(v4) => Some(CODES[v4.octets()[0] as usize % CODES.len()].to_string()),
            IpAddr::V6(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct LatencyMetrics {
    min_ns: u64,
    max_ns: u64,
    avg_ns: u64,
    p50_ns: u64,
    p99_ns: u64,
}

impl LatencyMetrics {
    fn from_samples(mut samples: Vec<u64>) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        samples.sort_unstable();
        let len = samples.len();
        Self {
            min_ns: samples[0],
            max_ns: samples[len - 1],
            avg_ns: samples.iter().sum::<u64>() / len as u64,
            p50_ns: samples[len / 2],
            p99_ns: samples[(len * 99) / 100],
        }
    }
}

fn range_source(count: u32) -> ClassificationSource {
    let ranges: RangeSet = (0..count)
        .map(|i| {
            let base = 0x0A00_0000 + i * 0x100;
            Range::new(
                IpAddr::V4(Ipv4Addr::from(base)),
                IpAddr::V4(Ipv4Addr::from(base + 0x7F)),
            )
            .unwrap()
        })
        .collect();
    ClassificationSource::Ranges(ranges)
}

fn country_source() -> ClassificationSource {
    let codes = CountryCodeSet::new(&["US", "GB", "JP"]).unwrap();
    ClassificationSource::countries(codes, GeoResolver::new(Arc::new(OctetTable)))
}

fn api_filter(rule: Rule, source: ClassificationSource) -> FilterConfig {
    FilterConfig::new(PathScope::new(["/api"]), rule, source).unwrap()
}

fn requests(n: usize) -> Vec<RequestInfo> {
    (0..n)
        .map(|i| {
            let offset = (i as u32).wrapping_mul(2_654_435_761) >> 8;
            let ip = Ipv4Addr::from(0x0A00_0000u32.wrapping_add(offset));
            let path = if i % 4 == 0 { "/static/app.js" } else { "/api/items" };
            RequestInfo::new(format!("{}:{}", ip, 1024 + i % 60_000), path)
        })
        .collect()
}

fn run_single(name: &str, filter: &FilterConfig, reqs: &[RequestInfo]) {
    let mut samples = Vec::with_capacity(reqs.len());
    let mut denied = 0usize;

    let start = Instant::now();
    for req in reqs {
        let t = Instant::now();
        if filter.decide(req).is_deny() {
            denied += 1;
        }
        samples.push(t.elapsed().as_nanos() as u64);
    }
    let elapsed = start.elapsed();

    let latency = LatencyMetrics::from_samples(samples);
    println!(
        "{:<28} {:>10.0} req/s  min {:>5}ns  avg {:>5}ns  p50 {:>5}ns  p99 {:>6}ns  \
         max {:>8}ns  denied {}",
        name,
        reqs.len() as f64 / elapsed.as_secs_f64(),
        latency.min_ns,
        latency.avg_ns,
        latency.p50_ns,
        latency.p99_ns,
        latency.max_ns,
        denied
    );
}

fn run_parallel(
    name: &str,
    filter: FilterConfig,
    reqs: Arc<Vec<RequestInfo>>,
    workers: usize,
) -> Duration {
    let filter = Arc::new(filter);
    let start = Instant::now();

    let handles: Vec<_> = (0..workers)
        .map(|w| {
            let filter = Arc::clone(&filter);
            let reqs = Arc::clone(&reqs);
            thread::spawn(move || {
                reqs.iter()
                    .skip(w)
                    .step_by(workers)
                    .filter(|r| filter.decide(*r).is_deny())
                    .count()
            })
        })
        .collect();

    let denied: usize = handles.into_iter().map(|h| h.join().unwrap_or(0)).sum();
    let elapsed = start.elapsed();

    println!(
        "{:<28} {:>10.0} req/s  workers {:>2}  denied {}",
        name,
        reqs.len() as f64 / elapsed.as_secs_f64(),
        workers,
        denied
    );
    elapsed
}

fn main() {
    println!("=== Decision benchmark ({} requests) ===\n", REQUESTS);
    let reqs = requests(REQUESTS);

    println!("--- Single thread ---");
    for count in [1u32, 16, 256, 4096] {
        let filter = api_filter(Rule::Block, range_source(count));
        run_single(&format!("ranges x{}", count), &filter, &reqs);
    }
    let filter = api_filter(Rule::Allow, country_source());
    run_single("countries x3", &filter, &reqs);

    println!("\n--- Parallel ---");
    let reqs = Arc::new(reqs);
    for workers in [1, 2, 4, 8] {
        let filter = api_filter(Rule::Block, range_source(256));
        run_parallel("ranges x256", filter, Arc::clone(&reqs), workers);
    }
    for workers in [1, 2, 4, 8] {
        let filter = api_filter(Rule::Allow, country_source());
        run_parallel("countries x3", filter, Arc::clone(&reqs), workers);
    }
}
