//! Probe failure modes.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::error_handling::FailureType;

/// Why one step of a hostname probe failed.
///
/// Never escapes the checker: every variant is turned into a failure-tier
/// check carrying the `Display` text.
#[derive(Debug, Error)]
pub(crate) enum ProbeError {
    #[error("{step} timed out after {timeout:?}")]
    Timeout {
        step: &'static str,
        timeout: Duration,
    },

    #[error("Could not connect: {0}")]
    Connect(#[source] io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed by server")]
    Closed,

    #[error("Malformed SMTP reply: {0}")]
    Malformed(String),

    #[error("Unexpected reply to {command}: {code} {text}")]
    UnexpectedReply {
        command: &'static str,
        code: u16,
        text: String,
    },

    #[error("does not support STARTTLS")]
    StarttlsUnsupported,

    #[error("Server sent data before the TLS handshake")]
    PipelinedData,

    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] io::Error),

    #[error("Server only supports TLS versions below 1.2")]
    DeprecatedVersion,
}

impl ProbeError {
    /// Statistics bucket for this failure.
    pub(crate) fn failure_type(&self) -> FailureType {
        match self {
            ProbeError::Timeout { .. } => FailureType::ProbeTimeout,
            ProbeError::Connect(_) => FailureType::ConnectError,
            ProbeError::Io(_)
            | ProbeError::Closed
            | ProbeError::Malformed(_)
            | ProbeError::UnexpectedReply { .. }
            | ProbeError::PipelinedData => FailureType::SmtpProtocolError,
            ProbeError::StarttlsUnsupported => FailureType::StarttlsUnsupported,
            ProbeError::Handshake(_) => FailureType::TlsHandshakeError,
            ProbeError::DeprecatedVersion => FailureType::TlsVersionDeprecated,
        }
    }
}
