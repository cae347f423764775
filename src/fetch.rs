use log::{debug, info};

use crate::constants::FETCH_TIMEOUT;
use crate::error::{PacServeError, Result};

/// Downloads the raw PAC script from `source_url` with a single GET.
///
/// `upstream_proxy`, when non-empty, is used as the egress proxy for this
/// request only. There is no retry: network failures, timeouts and non-2xx
/// statuses all surface as `Unreachable`, and the caller is expected to keep
/// whatever document it was serving before.
pub async fn fetch_pac(source_url: &str, upstream_proxy: Option<&str>) -> Result<String> {
    let url = source_url.trim();
    if url.is_empty() {
        return Err(PacServeError::Unreachable("PAC URL is empty".to_string()));
    }
    info!("Downloading PAC script from {}", url);

    let mut builder = reqwest::Client::builder().timeout(FETCH_TIMEOUT);
    if let Some(proxy) = upstream_proxy.map(str::trim).filter(|p| !p.is_empty()) {
        debug!("Routing PAC fetch through upstream proxy {}", proxy);
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| {
            PacServeError::InvalidProxyFormat(format!("upstream proxy '{}': {}", proxy, e))
        })?;
        builder = builder.proxy(proxy);
    }
    let client = builder
        .build()
        .map_err(|e| PacServeError::Unreachable(format!("failed to build HTTP client: {}", e)))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PacServeError::Unreachable(format!("GET {} failed: {}", url, e)))?;
    if !response.status().is_success() {
        return Err(PacServeError::Unreachable(format!(
            "GET {} returned HTTP {}",
            url,
            response.status()
        )));
    }

    let text = response
        .text()
        .await
        .map_err(|e| PacServeError::Unreachable(format!("failed to read PAC body: {}", e)))?;
    info!("PAC script downloaded ({} bytes)", text.len());
    Ok(text)
}
