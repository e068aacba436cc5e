//! Data models for the discovery report and the Compute API payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A VPC network together with the subnets it owns in the configured region.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Network {
    pub name: String,
    pub description: String,
    pub creation_timestamp: String,
    pub self_link: String,
    pub subnets: Vec<Subnet>,
}

/// A regional subnet. `network` is the parent network name.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Subnet {
    pub name: String,
    pub ip_cidr_range: String,
    pub region: String,
    pub private_ip_google_access: bool,
    pub creation_timestamp: String,
    pub network: String,
}

/// Counts computed over the networks of a single report.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Summary {
    pub total_networks: usize,
    pub total_subnets: usize,
    /// Network names, in the same order as `vpc_networks`.
    pub network_names: Vec<String>,
}

/// Cache settings in effect when the report was generated.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CacheInfo {
    pub cache_enabled: bool,
    pub cache_ttl_seconds: u64,
    /// Outcome of the write attempt. Unset in the stored copy, since the
    /// report is written before the outcome is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_successfully: Option<bool>,
}

/// The discovery report served by `GET /` and stored in the cache.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Report {
    pub project_id: String,
    pub region: String,
    pub generated_at: DateTime<Utc>,
    pub cached: bool,
    pub vpc_networks: Vec<Network>,
    pub summary: Summary,
    pub cache_info: CacheInfo,
    /// Set only when the report is served from the cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub served_at: Option<DateTime<Utc>>,
}

impl Report {
    /// Marks a report read back from the cache as served at `now`.
    ///
    /// These are the only fields ever changed after construction.
    pub fn mark_served_from_cache(&mut self, now: DateTime<Utc>) {
        self.cached = true;
        self.served_at = Some(now);
    }
}

/// Body of `GET /health`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub project_id: String,
    pub region: String,
    pub redis_connected: bool,
}

/// Body of a failed discovery request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    pub timestamp: DateTime<Utc>,
    pub project_id: String,
    pub region: String,
}

/// One page of a Compute API `list` call.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ComputeList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

/// A network resource as returned by the Compute API.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ComputeNetwork {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub creation_timestamp: String,
    #[serde(default)]
    pub self_link: String,
}

/// A subnetwork resource as returned by the Compute API.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ComputeSubnetwork {
    pub name: String,
    #[serde(default)]
    pub ip_cidr_range: String,
    #[serde(default)]
    pub private_ip_google_access: bool,
    #[serde(default)]
    pub creation_timestamp: String,
    /// Self-link of the parent network.
    #[serde(default)]
    pub network: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_list_without_items() {
        let page: ComputeList<ComputeNetwork> =
            serde_json::from_str(r#"{"kind":"compute#networkList","id":"x"}"#).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_compute_subnetwork_camel_case() {
        let raw = r#"{
            "name": "sub-a",
            "ipCidrRange": "10.0.0.0/24",
            "privateIpGoogleAccess": true,
            "creationTimestamp": "2024-01-01T00:00:00.000-08:00",
            "network": "https://www.googleapis.com/compute/v1/projects/p/global/networks/default"
        }"#;
        let subnet: ComputeSubnetwork = serde_json::from_str(raw).unwrap();
        assert_eq!(subnet.ip_cidr_range, "10.0.0.0/24");
        assert!(subnet.private_ip_google_access);
        assert!(subnet.network.ends_with("/networks/default"));
    }

    #[test]
    fn test_served_at_omitted_until_cache_hit() {
        let mut report = Report {
            project_id: "p".into(),
            region: "r".into(),
            generated_at: Utc::now(),
            cached: false,
            vpc_networks: vec![],
            summary: Summary::default(),
            cache_info: CacheInfo {
                cache_enabled: true,
                cache_ttl_seconds: 300,
                cached_successfully: None,
            },
            served_at: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("served_at").is_none());
        assert!(json["cache_info"].get("cached_successfully").is_none());

        report.mark_served_from_cache(Utc::now());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["cached"], true);
        assert!(json["served_at"].is_string());
    }
}
