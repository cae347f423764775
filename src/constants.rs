use std::time::Duration;

/// Path under which the PAC document is served.
pub const PAC_PATH: &str = "/proxy.pac";

/// MIME type proxy-resolution clients expect for PAC scripts.
pub const PAC_CONTENT_TYPE: &str = "application/x-ns-proxy-autoconfig";

/// Default port for the local HTTP responder.
pub const DEFAULT_PORT: u16 = 12345;

/// Default proxy server written into rewritten PAC scripts.
pub const DEFAULT_PROXY_SERVER: &str = "http://127.0.0.1:8080";

/// Default on-disk copy of the last rewritten PAC document.
pub const DEFAULT_CACHE_FILE: &str = "pacfile.pac";

/// Timeout for the outbound PAC fetch. There is no retry; a refresh either
/// completes within this window or fails.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);
