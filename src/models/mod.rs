//! Check results produced by the probing engine.
//!
//! Every result type here is built once and then only read:
//! - [`CheckResult`]: a single named check with a fixed severity
//! - [`HostnameResult`]: all checks run against one MX hostname
//! - [`MtaStsResult`]: the validated MTA-STS policy of a domain
//! - [`DomainResult`]: the aggregate verdict for a mail domain

mod check;
mod domain;
mod hostname;
mod mta_sts;

pub use check::{
    CheckResult, Status, CERTIFICATE, CONNECTIVITY, MTA_STS, MTA_STS_MX_CONSISTENCY,
    MTA_STS_POLICY_FILE, MTA_STS_TEXT, POLICY_LIST, STARTTLS, VERSION,
};
pub use domain::DomainResult;
pub use hostname::HostnameResult;
pub use mta_sts::{MtaStsMode, MtaStsResult};
