//! DNS resolution seam.
//!
//! Domain checks need two lookups: MX records to find the mail servers and
//! the `_mta-sts` TXT record. Both go through the [`DnsResolver`] trait so
//! checks can run against [`StaticResolver`] in tests and against
//! `hickory-resolver` in production.

mod records;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;

use crate::error_handling::DnsError;

pub use records::{lookup_mx_records, lookup_txt_records};

/// Async DNS lookups used by the checkers.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// MX exchange hostnames for `domain`, most preferred first.
    ///
    /// A domain without MX records yields `Ok(vec![])`.
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<String>, DnsError>;

    /// TXT strings published at `name`.
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, DnsError>;
}

/// [`DnsResolver`] backed by a shared hickory resolver.
#[derive(Clone)]
pub struct HickoryResolver {
    resolver: Arc<TokioAsyncResolver>,
}

impl HickoryResolver {
    /// Wraps an initialized resolver.
    pub fn new(resolver: Arc<TokioAsyncResolver>) -> Self {
        HickoryResolver { resolver }
    }
}

#[async_trait]
impl DnsResolver for HickoryResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        lookup_mx_records(domain, &self.resolver).await
    }

    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, DnsError> {
        lookup_txt_records(name, &self.resolver).await
    }
}

/// In-memory [`DnsResolver`] with fixed answers.
///
/// Names without an entry behave like names without records. Names
/// registered with [`StaticResolver::with_error`] fail the lookup.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    mx: HashMap<String, Vec<String>>,
    txt: HashMap<String, Vec<String>>,
    failing: HashMap<String, String>,
}

impl StaticResolver {
    /// An empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers MX queries for `domain` with `hosts`, in the given order.
    pub fn with_mx<I, S>(mut self, domain: &str, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mx.insert(
            normalize_hostname(domain),
            hosts.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Answers TXT queries for `name` with `records`.
    pub fn with_txt<I, S>(mut self, name: &str, records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.txt.insert(
            normalize_hostname(name),
            records.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Makes every lookup for `name` fail with `message`.
    pub fn with_error(mut self, name: &str, message: &str) -> Self {
        self.failing
            .insert(normalize_hostname(name), message.to_string());
        self
    }

    fn answer(
        &self,
        table: &HashMap<String, Vec<String>>,
        name: &str,
    ) -> Result<Vec<String>, DnsError> {
        let key = normalize_hostname(name);
        if let Some(message) = self.failing.get(&key) {
            return Err(DnsError::new(name, message.clone()));
        }
        Ok(table.get(&key).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl DnsResolver for StaticResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        self.answer(&self.mx, domain)
    }

    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, DnsError> {
        self.answer(&self.txt, name)
    }
}

/// Canonical form of a domain or hostname: trimmed, lowercase, no trailing dot.
pub fn normalize_hostname(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hostname() {
        assert_eq!(normalize_hostname(" MX1.Example.COM. "), "mx1.example.com");
        assert_eq!(normalize_hostname("example.com"), "example.com");
        assert_eq!(normalize_hostname("."), "");
    }

    #[tokio::test]
    async fn test_static_resolver_answers() {
        let resolver = StaticResolver::new()
            .with_mx("Example.com", ["mx1.example.com", "mx2.example.com"])
            .with_txt("_mta-sts.example.com", ["v=STSv1; id=1"]);

        assert_eq!(
            resolver.lookup_mx("example.com.").await.unwrap(),
            vec!["mx1.example.com", "mx2.example.com"]
        );
        assert_eq!(
            resolver.lookup_txt("_mta-sts.example.com").await.unwrap(),
            vec!["v=STSv1; id=1"]
        );
        assert!(resolver.lookup_mx("other.org").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_static_resolver_failure() {
        let resolver = StaticResolver::new().with_error("broken.org", "SERVFAIL");
        let err = resolver.lookup_mx("broken.org").await.unwrap_err();
        assert_eq!(err.name, "broken.org");
        assert_eq!(err.message, "SERVFAIL");
    }

    #[tokio::test]
    #[ignore] // requires network access
    async fn test_hickory_resolver_live_mx() {
        let resolver = crate::initialization::init_resolver().unwrap();
        let hosts = resolver.lookup_mx("gmail.com").await.unwrap();
        assert!(!hosts.is_empty());
        assert!(hosts.iter().all(|h| !h.ends_with('.')));
    }
}
