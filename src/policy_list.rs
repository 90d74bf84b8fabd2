//! Membership in a published STARTTLS policy list.
//!
//! The list file is either a JSON array of domain names or an object whose
//! `policies` member is keyed by domain, the layout used by published
//! STARTTLS policy lists.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::dns::normalize_hostname;
use crate::error_handling::StoreError;
use crate::models::{CheckResult, POLICY_LIST};

/// A set of domains with a published policy.
pub trait PolicyList: Send + Sync {
    /// Whether `domain` is on the list.
    fn has_domain(&self, domain: &str) -> bool;
}

/// [`PolicyList`] over a fixed set of domains.
#[derive(Debug, Clone, Default)]
pub struct StaticPolicyList {
    domains: HashSet<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListFile {
    Domains(Vec<String>),
    Policies {
        policies: BTreeMap<String, serde_json::Value>,
    },
}

impl StaticPolicyList {
    /// A list holding `domains`, normalized.
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        StaticPolicyList {
            domains: domains
                .into_iter()
                .map(|d| normalize_hostname(d.as_ref()))
                .collect(),
        }
    }

    /// Parses a JSON list file.
    pub fn from_json(content: &str) -> Result<Self, StoreError> {
        let file: ListFile = serde_json::from_str(content)?;
        Ok(match file {
            ListFile::Domains(domains) => Self::new(domains),
            ListFile::Policies { policies } => Self::new(policies.keys()),
        })
    }

    /// Reads and parses a JSON list file.
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Unavailable(format!("Could not read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Number of listed domains.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl PolicyList for StaticPolicyList {
    fn has_domain(&self, domain: &str) -> bool {
        self.domains.contains(&normalize_hostname(domain))
    }
}

/// `policy-list` check: success when `domain` is listed, failure otherwise.
pub fn policy_list_check(domain: &str, list: &dyn PolicyList) -> CheckResult {
    if list.has_domain(domain) {
        CheckResult::success(POLICY_LIST)
    } else {
        CheckResult::failure(
            POLICY_LIST,
            format!("Domain {} is not on the policy list", normalize_hostname(domain)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;

    #[test]
    fn test_listed_domain_succeeds() {
        let list = StaticPolicyList::new(["Example.com."]);
        let check = policy_list_check("example.COM", &list);
        assert_eq!(check.name(), POLICY_LIST);
        assert_eq!(check.status(), Status::Success);
    }

    #[test]
    fn test_unlisted_domain_fails() {
        let list = StaticPolicyList::new(["example.com"]);
        let check = policy_list_check("other.org", &list);
        assert_eq!(check.status(), Status::Failure);
        assert_eq!(
            check.messages(),
            ["Domain other.org is not on the policy list".to_string()]
        );
    }

    #[test]
    fn test_from_json_array() {
        let list = StaticPolicyList::from_json(r#"["a.com", "b.org"]"#).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.has_domain("b.org"));
    }

    #[test]
    fn test_from_json_policies_object() {
        let list = StaticPolicyList::from_json(
            r#"{"version": "0.1", "policies": {"eff.org": {"mode": "testing", "mxs": [".eff.org"]}}}"#,
        )
        .unwrap();
        assert!(list.has_domain("eff.org"));
        assert!(!list.has_domain("example.com"));
    }

    #[test]
    fn test_from_json_rejects_other_shapes() {
        assert!(StaticPolicyList::from_json(r#"{"domains": 3}"#).is_err());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("policies.json");
        std::fs::write(&path, r#"["a.com"]"#).unwrap();
        assert!(StaticPolicyList::from_json_file(&path).unwrap().has_domain("a.com"));
        assert!(StaticPolicyList::from_json_file(&dir.path().join("missing.json")).is_err());
    }
}
