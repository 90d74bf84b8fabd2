use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;

use super::DomainPolicyStore;
use crate::dns::normalize_hostname;
use crate::error_handling::StoreError;

/// [`DomainPolicyStore`] over a fixed domain to hostnames map.
#[derive(Debug, Clone, Default)]
pub struct MemoryPolicyStore {
    hostnames: HashMap<String, Vec<String>>,
}

impl MemoryPolicyStore {
    /// A store answering from `hostnames`. Domain names are normalized.
    pub fn new<I>(hostnames: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        MemoryPolicyStore {
            hostnames: hostnames
                .into_iter()
                .map(|(domain, hosts)| (normalize_hostname(&domain), hosts))
                .collect(),
        }
    }

    /// Loads a JSON object mapping each domain to its expected hostnames.
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Unavailable(format!("Could not read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Parses a JSON object mapping each domain to its expected hostnames.
    pub fn from_json(content: &str) -> Result<Self, StoreError> {
        let map: BTreeMap<String, Vec<String>> = serde_json::from_str(content)?;
        Ok(Self::new(map))
    }

    /// Number of domains.
    pub fn len(&self) -> usize {
        self.hostnames.len()
    }

    /// Whether the store has no domains.
    pub fn is_empty(&self) -> bool {
        self.hostnames.is_empty()
    }
}

#[async_trait]
impl DomainPolicyStore for MemoryPolicyStore {
    async fn domains_to_validate(&self) -> Result<Vec<String>, StoreError> {
        let mut domains: Vec<String> = self.hostnames.keys().cloned().collect();
        domains.sort();
        Ok(domains)
    }

    async fn hostnames_for_domain(&self, domain: &str) -> Result<Vec<String>, StoreError> {
        self.hostnames
            .get(&normalize_hostname(domain))
            .cloned()
            .ok_or_else(|| StoreError::Unavailable(format!("Unknown domain {domain}")))
    }
}
