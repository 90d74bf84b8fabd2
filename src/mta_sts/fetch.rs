//! Policy file download.

use thiserror::Error;

use crate::config::MAX_MTA_STS_POLICY_BYTES;

/// A downloaded policy body.
#[derive(Debug)]
pub(crate) struct FetchedPolicy {
    pub(crate) body: String,
    pub(crate) content_type: Option<String>,
}

#[derive(Debug, Error)]
pub(crate) enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),
    #[error("policy body exceeds {MAX_MTA_STS_POLICY_BYTES} bytes")]
    TooLarge,
    #[error("policy body is not UTF-8")]
    NotUtf8,
}

/// GETs `url`, reading at most the policy size limit.
///
/// The client is expected to refuse redirects and carry the probe timeout.
pub(crate) async fn fetch_policy(
    client: &reqwest::Client,
    url: &str,
) -> Result<FetchedPolicy, FetchError> {
    let mut response = client.get(url).send().await?;
    if response.status() != reqwest::StatusCode::OK {
        return Err(FetchError::Status(response.status()));
    }
    if response
        .content_length()
        .is_some_and(|len| len > MAX_MTA_STS_POLICY_BYTES as u64)
    {
        return Err(FetchError::TooLarge);
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > MAX_MTA_STS_POLICY_BYTES {
            return Err(FetchError::TooLarge);
        }
        body.extend_from_slice(&chunk);
    }

    let body = String::from_utf8(body).map_err(|_| FetchError::NotUtf8)?;
    Ok(FetchedPolicy { body, content_type })
}

/// Whether a `Content-Type` header names `text/plain`, ignoring parameters.
pub(crate) fn is_text_plain(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/plain"))
}
