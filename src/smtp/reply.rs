//! Bounded SMTP reply reader.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::error::ProbeError;
use crate::config::{MAX_SMTP_LINE_BYTES, MAX_SMTP_REPLY_LINES};

/// A complete, possibly multi-line, SMTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reply {
    pub(crate) code: u16,
    pub(crate) lines: Vec<String>,
}

impl Reply {
    /// Text of all lines joined with a space, for diagnostics.
    pub(crate) fn text(&self) -> String {
        self.lines.join(" ")
    }

    /// Whether an EHLO reply advertises `keyword` (case-insensitive).
    ///
    /// The first line carries the server greeting, so only the following
    /// lines are extension lines.
    pub(crate) fn has_extension(&self, keyword: &str) -> bool {
        self.lines.iter().skip(1).any(|line| {
            line.split_whitespace()
                .next()
                .is_some_and(|word| word.eq_ignore_ascii_case(keyword))
        })
    }
}

/// Reads one reply, rejecting oversized lines and runaway multi-line replies.
pub(crate) async fn read_reply<R>(reader: &mut R) -> Result<Reply, ProbeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = Vec::new();
    let mut code = None;

    loop {
        if lines.len() == MAX_SMTP_REPLY_LINES {
            return Err(ProbeError::Malformed(format!(
                "reply has more than {MAX_SMTP_REPLY_LINES} lines"
            )));
        }

        let raw = read_line(reader).await?;
        let (line_code, last, text) = parse_line(&raw)?;
        match code {
            None => code = Some(line_code),
            Some(c) if c != line_code => {
                return Err(ProbeError::Malformed(format!(
                    "reply code changed from {c} to {line_code}"
                )))
            }
            Some(_) => {}
        }
        lines.push(text.to_string());
        if last {
            break;
        }
    }

    Ok(Reply {
        code: code.unwrap_or_default(),
        lines,
    })
}

/// Reads bytes up to and including `\n`, never buffering more than the
/// line limit.
async fn read_line<R>(reader: &mut R) -> Result<String, ProbeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Err(ProbeError::Closed);
        }
        let (chunk, done) = match available.iter().position(|b| *b == b'\n') {
            Some(i) => (&available[..=i], true),
            None => (available, false),
        };
        if line.len() + chunk.len() > MAX_SMTP_LINE_BYTES {
            return Err(ProbeError::Malformed(format!(
                "reply line exceeds {MAX_SMTP_LINE_BYTES} bytes"
            )));
        }
        line.extend_from_slice(chunk);
        let consumed = chunk.len();
        reader.consume(consumed);
        if done {
            break;
        }
    }

    let text = String::from_utf8_lossy(&line);
    Ok(text.trim_end_matches(['\r', '\n']).to_string())
}

/// Splits `250-SIZE 1000` into `(250, false, "SIZE 1000")`.
fn parse_line(line: &str) -> Result<(u16, bool, &str), ProbeError> {
    let malformed = || ProbeError::Malformed(format!("{line:?}"));

    let code_part = line.get(..3).ok_or_else(malformed)?;
    if !code_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let code: u16 = code_part.parse().map_err(|_| malformed())?;

    match line.as_bytes().get(3) {
        None => Ok((code, true, "")),
        Some(b' ') => Ok((code, true, &line[4..])),
        Some(b'-') => Ok((code, false, &line[4..])),
        Some(_) => Err(malformed()),
    }
}
