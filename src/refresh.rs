use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::error::{PacServeError, Result};
use crate::fetch::fetch_pac;
use crate::rewrite::{extract_host_port, rewrite_pac};
use crate::server::PacResponder;

/// Drives one fetch -> rewrite -> persist -> serve cycle and remembers the
/// last successful fetch.
///
/// Refreshes are issued one at a time through `&mut self`; they may overlap
/// request handling in the responder, which keeps serving the previous
/// document until the swap.
pub struct Refresher {
    responder: Arc<PacResponder>,
    cache_file: PathBuf,
    /// Source URL of the last successful fetch. Empty at process start.
    last_url: Option<String>,
    /// Raw script text of the last successful fetch, kept pre-rewrite so a
    /// changed proxy can be re-applied without another round trip.
    raw_pac: Option<String>,
}

impl Refresher {
    pub fn new(responder: Arc<PacResponder>, cache_file: impl Into<PathBuf>) -> Self {
        Self {
            responder,
            cache_file: cache_file.into(),
            last_url: None,
            raw_pac: None,
        }
    }

    /// Pre-populates the responder from the on-disk cache, if present.
    /// Does not count as a fetch; the next refresh still hits the network.
    pub async fn preload_cache(&self) {
        match fs::read_to_string(&self.cache_file) {
            Ok(text) => {
                info!(
                    "Loaded cached PAC document from {} ({} bytes)",
                    self.cache_file.display(),
                    text.len()
                );
                self.responder.set_content(text).await;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cached PAC document at {}", self.cache_file.display());
            }
            Err(e) => warn!(
                "Failed to read cached PAC document {}: {}",
                self.cache_file.display(),
                e
            ),
        }
    }

    /// Refreshes the served PAC document from `pac_url`, rewriting its proxy
    /// directives to `proxy_server`.
    ///
    /// When `pac_url` matches the last successful fetch the network round
    /// trip is skipped and the rewrite is re-applied to the cached raw
    /// script, so a changed proxy still takes effect. A failed fetch leaves
    /// the persisted file and the served document untouched. A proxy string
    /// the rewriter rejects does not blank out the document either: the
    /// unrewritten script is persisted and served, and the error is still
    /// returned for the caller to report.
    pub async fn refresh(&mut self, pac_url: &str, proxy_server: &str) -> Result<()> {
        let raw = match (&self.last_url, &self.raw_pac) {
            (Some(last), Some(raw)) if last == pac_url => {
                info!("PAC URL unchanged, reusing previously fetched script");
                raw.clone()
            }
            _ => {
                let text = fetch_pac(pac_url, upstream_proxy(proxy_server)).await?;
                self.last_url = Some(pac_url.to_string());
                self.raw_pac = Some(text.clone());
                text
            }
        };

        let (document, rewrite_err) = match rewrite_pac(&raw, proxy_server) {
            Ok(text) => (text, None),
            Err(e) => {
                warn!("PAC rewrite failed ({}), keeping the unrewritten script", e);
                (raw, Some(e))
            }
        };

        self.persist(&document)?;
        self.responder.set_content(document).await;

        match rewrite_err {
            Some(e) => Err(e),
            None => {
                info!("PAC document refreshed from {}", pac_url);
                Ok(())
            }
        }
    }

    fn persist(&self, document: &str) -> Result<()> {
        fs::write(&self.cache_file, document).map_err(|e| {
            PacServeError::Persist(format!(
                "failed to write {}: {}",
                self.cache_file.display(),
                e
            ))
        })?;
        debug!(
            "Persisted PAC document to {} ({} bytes)",
            self.cache_file.display(),
            document.len()
        );
        Ok(())
    }
}

/// Picks the egress proxy for the fetch. A proxy string the rewriter would
/// reject is not handed to the HTTP client; the fetch then goes out directly
/// and the rewrite step reports the bad value.
fn upstream_proxy(proxy_server: &str) -> Option<&str> {
    let trimmed = proxy_server.trim();
    if trimmed.is_empty() {
        return None;
    }
    match extract_host_port(trimmed) {
        Ok(_) => Some(trimmed),
        Err(e) => {
            warn!("Not using upstream proxy for fetch: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SOURCE_PAC: &str =
        r#"function FindProxyForURL(url,host){ return "PROXY 10.0.0.5:3128; DIRECT"; }"#;

    /// Loopback responder standing in for the remote PAC host. The returned
    /// address doubles as an egress proxy target: proxied requests arrive in
    /// absolute form and are routed by path like any other.
    async fn source_server() -> (Arc<PacResponder>, std::net::SocketAddr) {
        let source = Arc::new(PacResponder::new());
        let addr = source.start(0).await.unwrap();
        source.set_content(SOURCE_PAC.to_string()).await;
        (source, addr)
    }

    fn rewritten_for(proxy_host_port: &str) -> String {
        format!(
            r#"function FindProxyForURL(url,host){{ return "PROXY {}; DIRECT"; }}"#,
            proxy_host_port
        )
    }

    #[tokio::test]
    async fn refresh_fetches_rewrites_persists_and_serves() {
        let (source, addr) = source_server().await;
        let dir = tempdir().unwrap();
        let cache = dir.path().join("pacfile.pac");

        let responder = Arc::new(PacResponder::new());
        let mut refresher = Refresher::new(Arc::clone(&responder), &cache);

        let pac_url = format!("http://{}/proxy.pac", addr);
        let proxy_server = format!("http://{}", addr);
        refresher.refresh(&pac_url, &proxy_server).await.unwrap();

        let expected = rewritten_for(&addr.to_string());
        assert_eq!(responder.content().await, expected);
        assert_eq!(fs::read_to_string(&cache).unwrap(), expected);
        source.stop().await;
    }

    #[tokio::test]
    async fn fetch_goes_through_the_upstream_proxy() {
        let (source, addr) = source_server().await;
        let dir = tempdir().unwrap();

        let responder = Arc::new(PacResponder::new());
        let mut refresher = Refresher::new(Arc::clone(&responder), dir.path().join("pacfile.pac"));

        // The host is only reachable through the proxy; name resolution is
        // the proxy's job for plain-HTTP targets.
        let pac_url = "http://pac.internal.test/proxy.pac";
        let proxy_server = format!("http://{}", addr);
        refresher.refresh(pac_url, &proxy_server).await.unwrap();

        assert_eq!(responder.content().await, rewritten_for(&addr.to_string()));
        source.stop().await;
    }

    #[tokio::test]
    async fn unchanged_url_reapplies_a_changed_proxy_without_fetching() {
        let (source, addr) = source_server().await;
        let dir = tempdir().unwrap();

        let responder = Arc::new(PacResponder::new());
        let mut refresher = Refresher::new(Arc::clone(&responder), dir.path().join("pacfile.pac"));

        let pac_url = format!("http://{}/proxy.pac", addr);
        let proxy_server = format!("http://{}", addr);
        refresher.refresh(&pac_url, &proxy_server).await.unwrap();

        // The source going away must not matter: the raw script is cached.
        source.stop().await;

        refresher
            .refresh(&pac_url, "http://192.0.2.7:9999")
            .await
            .unwrap();
        assert_eq!(responder.content().await, rewritten_for("192.0.2.7:9999"));
    }

    #[tokio::test]
    async fn failed_fetch_leaves_document_and_cache_untouched() {
        let (source, addr) = source_server().await;
        let dir = tempdir().unwrap();
        let cache = dir.path().join("pacfile.pac");

        let responder = Arc::new(PacResponder::new());
        let mut refresher = Refresher::new(Arc::clone(&responder), &cache);

        let pac_url = format!("http://{}/proxy.pac", addr);
        let proxy_server = format!("http://{}", addr);
        refresher.refresh(&pac_url, &proxy_server).await.unwrap();
        let good = responder.content().await;

        // A new URL forces a fetch; route it through a dead proxy endpoint.
        let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let closed_addr = closed.local_addr().unwrap();
        drop(closed);

        let err = refresher
            .refresh(
                "http://pac.other.test/proxy.pac",
                &format!("http://{}", closed_addr),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PacServeError::Unreachable(_)));
        assert_eq!(responder.content().await, good);
        assert_eq!(fs::read_to_string(&cache).unwrap(), good);
        source.stop().await;
    }

    #[tokio::test]
    async fn invalid_proxy_serves_the_unrewritten_script() {
        let (source, addr) = source_server().await;
        let dir = tempdir().unwrap();
        let cache = dir.path().join("pacfile.pac");

        let responder = Arc::new(PacResponder::new());
        let mut refresher = Refresher::new(Arc::clone(&responder), &cache);

        let pac_url = format!("http://{}/proxy.pac", addr);
        let err = refresher.refresh(&pac_url, "ftp://badhost").await.unwrap_err();

        assert!(matches!(err, PacServeError::InvalidProxyFormat(_)));
        assert_eq!(responder.content().await, SOURCE_PAC);
        assert_eq!(fs::read_to_string(&cache).unwrap(), SOURCE_PAC);
        source.stop().await;
    }

    #[tokio::test]
    async fn persist_failure_leaves_served_document_unchanged() {
        let (source, addr) = source_server().await;
        let dir = tempdir().unwrap();
        let cache = dir.path().join("no-such-dir").join("pacfile.pac");

        let responder = Arc::new(PacResponder::new());
        responder.set_content("previous".to_string()).await;
        let mut refresher = Refresher::new(Arc::clone(&responder), &cache);

        let pac_url = format!("http://{}/proxy.pac", addr);
        let proxy_server = format!("http://{}", addr);
        let err = refresher.refresh(&pac_url, &proxy_server).await.unwrap_err();

        assert!(matches!(err, PacServeError::Persist(_)));
        assert_eq!(responder.content().await, "previous");
        source.stop().await;
    }

    #[tokio::test]
    async fn preload_populates_the_responder_from_disk() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("pacfile.pac");
        fs::write(&cache, SOURCE_PAC).unwrap();

        let responder = Arc::new(PacResponder::new());
        let refresher = Refresher::new(Arc::clone(&responder), &cache);
        refresher.preload_cache().await;
        assert_eq!(responder.content().await, SOURCE_PAC);
    }

    #[tokio::test]
    async fn preload_without_cache_is_a_no_op() {
        let dir = tempdir().unwrap();
        let responder = Arc::new(PacResponder::new());
        let refresher = Refresher::new(Arc::clone(&responder), dir.path().join("pacfile.pac"));
        refresher.preload_cache().await;
        assert_eq!(responder.content().await, "");
    }
}
