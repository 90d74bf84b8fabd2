//! Result handlers for batch scans.

use std::fmt;
use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use log::{info, warn};

use super::ResultHandler;
use crate::config::PROGRESS_LOG_EVERY;
use crate::models::{DomainResult, MtaStsMode};

/// Aggregate counts across a scan.
///
/// Domains without probed MX hostnames are counted as attempted only.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainTotals {
    /// When the scan started.
    pub time: DateTime<Utc>,
    /// Label for the scanned list, usually the input file name.
    pub source: String,
    /// Domains handled.
    pub attempted: usize,
    /// Domains with at least one probed MX hostname.
    pub with_mxs: usize,
    /// Domains publishing an MTA-STS policy in testing mode.
    pub mta_sts_testing: Vec<String>,
    /// Domains publishing an MTA-STS policy in enforce mode.
    pub mta_sts_enforce: Vec<String>,
}

impl DomainTotals {
    /// Empty totals stamped with the current time.
    pub fn new(source: impl Into<String>) -> Self {
        DomainTotals {
            time: Utc::now(),
            source: source.into(),
            attempted: 0,
            with_mxs: 0,
            mta_sts_testing: Vec::new(),
            mta_sts_enforce: Vec::new(),
        }
    }
}

impl ResultHandler for DomainTotals {
    fn handle_domain(&mut self, result: DomainResult) {
        self.attempted += 1;
        if self.attempted % PROGRESS_LOG_EVERY == 0 {
            info!("Progress:\n{self}");
            info!("MTA-STS testing: {:?}", self.mta_sts_testing);
            info!("MTA-STS enforce: {:?}", self.mta_sts_enforce);
        }

        if !result.has_mail_service() {
            return;
        }
        self.with_mxs += 1;
        match result.mta_sts().map(|m| m.mode()) {
            Some(MtaStsMode::Enforce) => self.mta_sts_enforce.push(result.domain().to_string()),
            Some(MtaStsMode::Testing) => self.mta_sts_testing.push(result.domain().to_string()),
            Some(MtaStsMode::None) | None => {}
        }
    }
}

/// Header line followed by one tab-separated value line.
impl fmt::Display for DomainTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "time\tsource\tattempted\twith_mxs\tmta_sts_testing\tmta_sts_enforce"
        )?;
        writeln!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.time.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.source,
            self.attempted,
            self.with_mxs,
            self.mta_sts_testing.len(),
            self.mta_sts_enforce.len()
        )
    }
}

/// Writes each result as one JSON object per line.
///
/// Broken pipes are ignored so output can be piped into `head`. Other write
/// errors are logged and counted.
pub struct JsonLinesWriter<W: Write> {
    writer: W,
    written: usize,
    errors: usize,
}

impl<W: Write> JsonLinesWriter<W> {
    /// Writes to `writer`.
    pub fn new(writer: W) -> Self {
        JsonLinesWriter {
            writer,
            written: 0,
            errors: 0,
        }
    }

    /// Lines written successfully.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Results that could not be written.
    pub fn errors(&self) -> usize {
        self.errors
    }

    /// Flushes buffered output.
    pub fn flush(&mut self) -> io::Result<()> {
        ignore_broken_pipe(self.writer.flush())
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, result: &DomainResult) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, result)?;
        self.writer.write_all(b"\n")
    }
}

impl<W: Write> ResultHandler for JsonLinesWriter<W> {
    fn handle_domain(&mut self, result: DomainResult) {
        match ignore_broken_pipe(self.write_line(&result)) {
            Ok(()) => self.written += 1,
            Err(e) => {
                warn!("Failed to write result for {}: {e}", result.domain());
                self.errors += 1;
            }
        }
    }
}

fn ignore_broken_pipe(outcome: io::Result<()>) -> io::Result<()> {
    match outcome {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}
