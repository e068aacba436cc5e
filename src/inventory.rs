//! Network inventory: lists VPC networks and attaches their regional subnets.

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::ComputeError;
use crate::models::{ComputeNetwork, ComputeSubnetwork, Network, Subnet};

/// Read-only view of the Compute Engine API used for discovery.
///
/// Implementations return every page of a listing; pagination is their concern.
#[async_trait]
pub trait ComputeApi: Send + Sync {
    async fn list_networks(&self, project: &str) -> Result<Vec<ComputeNetwork>, ComputeError>;

    async fn list_subnetworks(
        &self,
        project: &str,
        region: &str,
    ) -> Result<Vec<ComputeSubnetwork>, ComputeError>;
}

/// Lists all networks of `project` with their subnets in `region`.
///
/// Never fails: a failed network listing yields no networks, and a failed
/// subnet listing yields no subnets for the affected network only.
pub async fn list_networks_and_subnets(
    api: &dyn ComputeApi,
    project: &str,
    region: &str,
) -> Vec<Network> {
    let networks = match api.list_networks(project).await {
        Ok(networks) => networks,
        Err(e) => {
            error!(project, "Error getting VPC networks: {}", e);
            return Vec::new();
        }
    };

    let mut result = Vec::with_capacity(networks.len());
    for network in networks {
        let subnets = match api.list_subnetworks(project, region).await {
            Ok(subnets) => subnets_of(&network, &subnets, region),
            Err(e) => {
                error!(
                    network = %network.name,
                    region,
                    "Error getting subnets for network: {}",
                    e
                );
                Vec::new()
            }
        };
        result.push(Network {
            name: network.name,
            description: network.description.unwrap_or_default(),
            creation_timestamp: network.creation_timestamp,
            self_link: network.self_link,
            subnets,
        });
    }

    info!(
        project,
        region,
        networks = result.len(),
        "Listed VPC networks"
    );
    result
}

/// Subnets whose parent reference is exactly the network's self-link.
fn subnets_of(network: &ComputeNetwork, subnets: &[ComputeSubnetwork], region: &str) -> Vec<Subnet> {
    subnets
        .iter()
        .filter(|s| !network.self_link.is_empty() && s.network == network.self_link)
        .map(|s| Subnet {
            name: s.name.clone(),
            ip_cidr_range: s.ip_cidr_range.clone(),
            region: region.to_string(),
            private_ip_google_access: s.private_ip_google_access,
            creation_timestamp: s.creation_timestamp.clone(),
            network: network.name.clone(),
        })
        .collect()
}
