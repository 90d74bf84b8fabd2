//! Error type definitions.
//!
//! This module defines the error enums returned across the crate and the
//! failure/info categories counted by [`ProcessingStats`](super::ProcessingStats).

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// Error building the TLS client configuration.
    #[error("TLS configuration error: {0}")]
    TlsConfigError(String),

    /// Error opening the scan cache backend.
    #[error("Scan cache initialization error: {0}")]
    ScanStoreError(#[from] StoreError),

    /// Error initializing the DNS resolver.
    #[error("DNS resolver initialization error: {0}")]
    DnsResolverError(String),
}

/// Error types for scan cache and policy store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// Schema migration error.
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// A stored record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The backend cannot serve requests.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that end a batch scan early.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The domain list could not be read.
    #[error("Failed to read input at row {row}: {source}")]
    InputRead {
        /// 1-based data row at which reading failed.
        row: usize,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// The input reader or a worker task panicked or was aborted.
    #[error("Scan task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    /// The pipeline configuration was rejected.
    #[error("Invalid scan configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Invalid configuration values.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric setting is outside its accepted range.
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// Setting name.
        name: &'static str,
        /// Value supplied.
        value: u64,
        /// Smallest accepted value.
        min: u64,
        /// Largest accepted value.
        max: u64,
    },

    /// A text setting is malformed.
    #[error("Invalid {name}: {reason}")]
    Invalid {
        /// Setting name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// A DNS lookup that failed for a reason other than "no records".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("DNS lookup for {name} failed: {message}")]
pub struct DnsError {
    /// Name that was queried.
    pub name: String,
    /// Resolver error text.
    pub message: String,
}

impl DnsError {
    /// Builds an error for `name`.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        DnsError {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Categories of non-success outcomes observed while checking domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum FailureType {
    // DNS
    MxLookupError,
    NoMxRecords,
    // SMTP
    ProbeTimeout,
    ConnectError,
    SmtpProtocolError,
    StarttlsUnsupported,
    // TLS
    TlsHandshakeError,
    TlsVersionDeprecated,
    CertificateInvalid,
    CertificateExpiringSoon,
    // MTA-STS
    MtaStsPolicyUnavailable,
    MtaStsInconsistent,
    // Scan cache
    CacheReadError,
    CacheWriteError,
}

/// Informational events counted during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum InfoType {
    DomainChecked,
    HostnameProbed,
    CacheHit,
    MtaStsPolicyFound,
}

impl FailureType {
    /// Human-readable label for statistics output.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureType::MxLookupError => "MX lookup error",
            FailureType::NoMxRecords => "No MX records",
            FailureType::ProbeTimeout => "Probe timeout",
            FailureType::ConnectError => "SMTP connect error",
            FailureType::SmtpProtocolError => "SMTP protocol error",
            FailureType::StarttlsUnsupported => "STARTTLS not supported",
            FailureType::TlsHandshakeError => "TLS handshake error",
            FailureType::TlsVersionDeprecated => "Deprecated TLS version",
            FailureType::CertificateInvalid => "Invalid certificate",
            FailureType::CertificateExpiringSoon => "Certificate expiring soon",
            FailureType::MtaStsPolicyUnavailable => "MTA-STS policy unavailable",
            FailureType::MtaStsInconsistent => "MTA-STS policy inconsistent with MX",
            FailureType::CacheReadError => "Scan cache read error",
            FailureType::CacheWriteError => "Scan cache write error",
        }
    }
}

impl InfoType {
    /// Human-readable label for statistics output.
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoType::DomainChecked => "Domains checked",
            InfoType::HostnameProbed => "Hostnames probed",
            InfoType::CacheHit => "Scan cache hits",
            InfoType::MtaStsPolicyFound => "MTA-STS policies found",
        }
    }
}
