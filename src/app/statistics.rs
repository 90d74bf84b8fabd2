//! Statistics and result summaries.

use log::{info, warn};
use strum::IntoEnumIterator;

use crate::error_handling::{FailureType, InfoType, ProcessingStats};
use crate::models::{DomainResult, Status};
use crate::scan::ScanSummary;

/// Prints failure and info counters to the log.
///
/// Counters that stayed at zero are omitted.
pub fn print_failure_statistics(stats: &ProcessingStats) {
    let total_failures = stats.total_failures();
    let total_info = stats.total_info();

    if total_failures > 0 {
        info!("Failure Counts ({} total):", total_failures);
        for failure_type in FailureType::iter() {
            let count = stats.get_failure_count(failure_type);
            if count > 0 {
                info!("   {}: {}", failure_type.as_str(), count);
            }
        }
    }

    if total_info > 0 {
        info!("Info Counts ({} total):", total_info);
        for info_type in InfoType::iter() {
            let count = stats.get_info_count(info_type);
            if count > 0 {
                info!("   {}: {}", info_type.as_str(), count);
            }
        }
    }
}

/// Logs a one-line summary of a finished batch scan.
pub fn print_scan_summary(summary: &ScanSummary) {
    let elapsed = summary.elapsed.as_secs_f64();
    let rate = if elapsed > 0.0 {
        summary.domains_checked as f64 / elapsed
    } else {
        0.0
    };
    info!(
        "✅ Checked {} domain{} ({} rows, {} skipped) in {:.1}s (~{:.2} domains/sec){}",
        summary.domains_checked,
        if summary.domains_checked == 1 { "" } else { "s" },
        summary.rows_read,
        summary.rows_skipped,
        elapsed,
        rate,
        if summary.cancelled { " - cancelled" } else { "" }
    );
}

/// Logs the verdict for one domain, with per-hostname details at debug level.
pub fn log_domain_result(result: &DomainResult) {
    match result.status() {
        Status::Success => info!("{}: {}", result.domain(), result.status()),
        status => warn!(
            "{}: {}{}",
            result.domain(),
            status,
            result
                .message()
                .map(|m| format!(" ({m})"))
                .unwrap_or_default()
        ),
    }
    for (hostname, hostname_result) in result.hostname_results() {
        log::debug!("   {hostname}: {}", hostname_result.status());
        for message in hostname_result.messages() {
            log::debug!("      {message}");
        }
    }
    if let Some(mta_sts) = result.mta_sts() {
        log::debug!("   MTA-STS {}: {}", mta_sts.mode(), mta_sts.status());
    }
}
