use log::debug;
use regex::{NoExpand, Regex};
use std::sync::LazyLock;

use crate::error::{PacServeError, Result};

/// Matches one `PROXY host:port` directive inside PAC text. The keyword is
/// case-sensitive; the target runs until whitespace, a statement separator
/// or a closing quote.
static PROXY_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"PROXY\s+[^\s;"]+"#).expect("PROXY directive pattern"));

/// Matches an `http(s)://host:port` proxy URL, capturing the authority.
static PROXY_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://([^/\s]+)/?$").expect("proxy URL pattern"));

/// Extracts the `host:port` portion of a proxy server URL.
///
/// Accepts `http://` and `https://` prefixed forms, with or without a
/// trailing slash. Anything else, including scheme-less strings and
/// unsupported schemes like `ftp://`, is rejected.
pub fn extract_host_port(proxy_server: &str) -> Result<String> {
    let caps = PROXY_URL.captures(proxy_server.trim()).ok_or_else(|| {
        PacServeError::InvalidProxyFormat(format!(
            "expected 'http://host:port' or 'https://host:port', got '{}'",
            proxy_server
        ))
    })?;
    let host_port = &caps[1];

    let (host, port) = host_port.rsplit_once(':').ok_or_else(|| {
        PacServeError::InvalidProxyFormat(format!("missing port in '{}'", proxy_server))
    })?;
    if host.is_empty() {
        return Err(PacServeError::InvalidProxyFormat(format!(
            "missing host in '{}'",
            proxy_server
        )));
    }
    if port.parse::<u16>().is_err() {
        return Err(PacServeError::InvalidProxyFormat(format!(
            "invalid port '{}' in '{}'",
            port, proxy_server
        )));
    }

    Ok(host_port.to_string())
}

/// Replaces every `PROXY host:port` directive in `pac_text` with one derived
/// from `proxy_server`.
///
/// This is a textual substitution, not a PAC-script parse: occurrences inside
/// string literals or comments are rewritten like any other. All directives
/// receive the same target, and rewriting already-rewritten text with the
/// same proxy yields identical output.
pub fn rewrite_pac(pac_text: &str, proxy_server: &str) -> Result<String> {
    let host_port = extract_host_port(proxy_server)?;
    let replacement = format!("PROXY {}", host_port);

    let count = PROXY_DIRECTIVE.find_iter(pac_text).count();
    let rewritten = PROXY_DIRECTIVE.replace_all(pac_text, NoExpand(&replacement));
    debug!("Rewrote {} PROXY directive(s) to '{}'", count, replacement);

    Ok(rewritten.into_owned())
}
