//! Report assembly.

use chrono::{DateTime, Utc};

use crate::models::{CacheInfo, Network, Report, Summary};

/// Computes the summary counts for `networks`.
pub fn summarize(networks: &[Network]) -> Summary {
    Summary {
        total_networks: networks.len(),
        total_subnets: networks.iter().map(|n| n.subnets.len()).sum(),
        network_names: networks.iter().map(|n| n.name.clone()).collect(),
    }
}

/// Assembles a fresh, uncached report.
///
/// `cache_info.cached_successfully` is left unset; the caller records the
/// outcome of the cache write.
pub fn build_report(
    project_id: &str,
    region: &str,
    networks: Vec<Network>,
    cache_enabled: bool,
    cache_ttl_seconds: u64,
    generated_at: DateTime<Utc>,
) -> Report {
    let summary = summarize(&networks);
    Report {
        project_id: project_id.to_string(),
        region: region.to_string(),
        generated_at,
        cached: false,
        vpc_networks: networks,
        summary,
        cache_info: CacheInfo {
            cache_enabled,
            cache_ttl_seconds,
            cached_successfully: None,
        },
        served_at: None,
    }
}
