//! In-memory stand-ins for the cache backend and the Compute API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::cache::CacheBackend;
use crate::error::{CacheError, ComputeError};
use crate::inventory::ComputeApi;
use crate::models::{ComputeNetwork, ComputeSubnetwork};

fn io_failure(message: &str) -> CacheError {
    CacheError::Redis(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "simulated failure",
        message.to_string(),
    )))
}

/// Key-value store that remembers the TTL of each write.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, (String, u64)>>,
    failing: AtomicBool,
    panicking: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryBackend {
    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.into(), (value.into(), 0));
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_panicking(&self, panicking: bool) {
        self.panicking.store(panicking, Ordering::SeqCst);
    }

    pub fn ttl_of(&self, key: &str) -> Option<u64> {
        self.entries.lock().unwrap().get(key).map(|(_, ttl)| *ttl)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(io_failure("connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if self.panicking.load(Ordering::SeqCst) {
            panic!("cache client state corrupted");
        }
        self.check()?;
        Ok(self.entries.lock().unwrap().get(key).map(|(v, _)| v.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap()
            .insert(key.into(), (value.into(), ttl_secs));
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.check()
    }
}

/// Compute API serving fixed networks and subnets.
#[derive(Default)]
pub struct FakeCompute {
    networks: Vec<ComputeNetwork>,
    subnets: Vec<ComputeSubnetwork>,
    fail_networks: bool,
    fail_subnets: bool,
    panic_on_list: bool,
    network_calls: AtomicUsize,
}

impl FakeCompute {
    pub fn new(networks: Vec<ComputeNetwork>, subnets: Vec<ComputeSubnetwork>) -> Self {
        Self {
            networks,
            subnets,
            ..Default::default()
        }
    }

    pub fn failing_networks() -> Self {
        Self {
            fail_networks: true,
            ..Default::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panic_on_list: true,
            ..Default::default()
        }
    }

    pub fn with_failing_subnets(mut self) -> Self {
        self.fail_subnets = true;
        self
    }

    pub fn network_calls(&self) -> usize {
        self.network_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ComputeApi for FakeCompute {
    async fn list_networks(&self, _project: &str) -> Result<Vec<ComputeNetwork>, ComputeError> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_list {
            panic!("inventory backend exploded");
        }
        if self.fail_networks {
            return Err(ComputeError::Token("metadata server unreachable".into()));
        }
        Ok(self.networks.clone())
    }

    async fn list_subnetworks(
        &self,
        _project: &str,
        _region: &str,
    ) -> Result<Vec<ComputeSubnetwork>, ComputeError> {
        if self.fail_subnets {
            return Err(ComputeError::Token("metadata server unreachable".into()));
        }
        Ok(self.subnets.clone())
    }
}

pub fn self_link(network: &str) -> String {
    format!("https://www.googleapis.com/compute/v1/projects/p/global/networks/{network}")
}

pub fn network(name: &str) -> ComputeNetwork {
    ComputeNetwork {
        name: name.into(),
        description: Some(format!("{name} network")),
        creation_timestamp: "2024-01-01T00:00:00.000-08:00".into(),
        self_link: self_link(name),
    }
}

pub fn subnet(name: &str, network: &str, cidr: &str) -> ComputeSubnetwork {
    ComputeSubnetwork {
        name: name.into(),
        ip_cidr_range: cidr.into(),
        private_ip_google_access: true,
        creation_timestamp: "2024-01-02T00:00:00.000-08:00".into(),
        network: self_link(network),
    }
}
