//! Product page download.

use std::time::Duration;

use crate::error::{Error, Result};

/// Sent with every request so storefronts return regular HTML instead of a
/// bot interstitial.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Reject anything that is not a non-empty http(s) URL before touching the
/// network.
pub(crate) fn require_http_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(Error::Validation("url is empty".to_string()));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(Error::Validation(format!(
            "url must start with http:// or https://: {url}"
        )));
    }
    Ok(())
}

pub(crate) fn blocking_agent(timeout_secs: u64) -> ureq::Agent {
    ureq::Agent::new_with_config(
        ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout_secs)))
            .user_agent(USER_AGENT)
            .build(),
    )
}

/// Download the HTML of a product page.
///
/// Non-2xx status and network failures are transport errors, as is a body
/// that is blank after trimming.
pub fn fetch_html(url: &str, timeout_secs: u64) -> Result<String> {
    require_http_url(url)?;

    let response = blocking_agent(timeout_secs)
        .get(url)
        .call()
        .map_err(|e| Error::Transport(format!("failed to fetch {url}: {e}")))?;

    let html = response
        .into_body()
        .read_to_string()
        .map_err(|e| Error::Transport(format!("failed to read body of {url}: {e}")))?;

    if html.trim().is_empty() {
        return Err(Error::Transport(format!("empty document returned for {url}")));
    }
    Ok(html)
}
