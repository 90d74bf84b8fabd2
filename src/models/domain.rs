use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::check::{CheckResult, Status, MTA_STS_MX_CONSISTENCY};
use super::hostname::HostnameResult;
use super::mta_sts::MtaStsResult;

/// Aggregate verdict for one mail domain.
///
/// `hostname_results` is keyed by the probed MX hostnames, so the set of
/// results is deterministic even though probes finish in any order. The
/// overall status is the worst of every hostname status and the MTA-STS
/// MX consistency status. The TXT record and content-type checks stay on
/// the MTA-STS result as diagnostics; a missing policy does not lower it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainResult {
    domain: String,
    status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    mx_hostnames: Vec<String>,
    preferred_hostnames: Vec<String>,
    hostname_results: BTreeMap<String, HostnameResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mta_sts: Option<MtaStsResult>,
    timestamp: DateTime<Utc>,
}

impl DomainResult {
    /// A domain whose MX lookup failed or returned nothing.
    ///
    /// Such a domain is treated as not operating mail service: no hostnames
    /// are recorded and the verdict is a failure carrying `message`.
    pub fn without_mail_service(domain: impl Into<String>, message: impl Into<String>) -> Self {
        DomainResult {
            domain: domain.into(),
            status: Status::Failure,
            message: Some(message.into()),
            mx_hostnames: Vec::new(),
            preferred_hostnames: Vec::new(),
            hostname_results: BTreeMap::new(),
            mta_sts: None,
            timestamp: Utc::now(),
        }
    }

    /// A domain whose MX hostnames all fell outside the expected set.
    pub fn no_matching_hostnames(
        domain: impl Into<String>,
        mx_hostnames: Vec<String>,
        message: impl Into<String>,
    ) -> Self {
        DomainResult {
            mx_hostnames,
            ..Self::without_mail_service(domain, message)
        }
    }

    /// Composes the verdict from the probed hostnames and the MTA-STS result.
    pub fn from_checks(
        domain: impl Into<String>,
        mx_hostnames: Vec<String>,
        preferred_hostnames: Vec<String>,
        hostname_results: BTreeMap<String, HostnameResult>,
        mta_sts: Option<MtaStsResult>,
    ) -> Self {
        let domain = domain.into();
        if hostname_results.is_empty() {
            return DomainResult {
                mx_hostnames,
                preferred_hostnames,
                mta_sts,
                ..Self::without_mail_service(domain, "No MX hostnames were checked")
            };
        }

        let status = Status::worst(
            hostname_results
                .values()
                .map(HostnameResult::status)
                .chain(
                    mta_sts
                        .as_ref()
                        .and_then(|m| m.check(MTA_STS_MX_CONSISTENCY))
                        .map(CheckResult::status),
                ),
        );

        DomainResult {
            domain,
            status,
            message: None,
            mx_hostnames,
            preferred_hostnames,
            hostname_results,
            mta_sts,
            timestamp: Utc::now(),
        }
    }

    /// Normalized domain name.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Overall verdict.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Explanation for verdicts that did not come from hostname checks.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// All MX hostnames, in preference order.
    pub fn mx_hostnames(&self) -> &[String] {
        &self.mx_hostnames
    }

    /// MX hostnames that were actually probed.
    pub fn preferred_hostnames(&self) -> &[String] {
        &self.preferred_hostnames
    }

    /// Probe results keyed by hostname.
    pub fn hostname_results(&self) -> &BTreeMap<String, HostnameResult> {
        &self.hostname_results
    }

    /// MTA-STS policy, if one could be fetched and parsed.
    pub fn mta_sts(&self) -> Option<&MtaStsResult> {
        self.mta_sts.as_ref()
    }

    /// When the verdict was composed.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether any MX hostname was probed.
    pub fn has_mail_service(&self) -> bool {
        !self.hostname_results.is_empty()
    }

    /// Whether the domain publishes an MTA-STS policy that fully validated.
    pub fn supports_mta_sts(&self) -> bool {
        self.mta_sts
            .as_ref()
            .is_some_and(|m| m.status().is_success())
    }
}
