use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use log::{debug, error, info};
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::constants::{PAC_CONTENT_TYPE, PAC_PATH};
use crate::error::{PacServeError, Result};

/// Thread-safe slot holding the currently served PAC document.
type SharedPacDocument = Arc<RwLock<String>>;

struct RunningServer {
    local_addr: SocketAddr,
    shutdown: watch::Sender<()>,
    handle: JoinHandle<()>,
}

/// Local HTTP listener serving the current PAC document to OS and browser
/// proxy-resolution clients.
///
/// Exactly one route exists: `GET /proxy.pac`. Every other path or method is
/// answered with an empty 404. The listener binds to loopback only and trusts
/// any local caller; there is no authentication and no request inspection.
pub struct PacResponder {
    document: SharedPacDocument,
    running: Mutex<Option<RunningServer>>,
}

impl PacResponder {
    pub fn new() -> Self {
        Self {
            document: Arc::new(RwLock::new(String::new())),
            running: Mutex::new(None),
        }
    }

    /// Replaces the served document wholesale. Callable at any time; takes
    /// effect for every request accepted after this returns. Requests already
    /// in flight see the previous document in full.
    pub async fn set_content(&self, text: String) {
        let mut document = self.document.write().await;
        debug!(
            "Swapping served PAC document ({} -> {} bytes)",
            document.len(),
            text.len()
        );
        *document = text;
    }

    /// Current in-memory document. Empty until the first `set_content`.
    pub async fn content(&self) -> String {
        self.document.read().await.clone()
    }

    /// URL proxy-resolution clients should be pointed at, if listening.
    pub async fn server_url(&self) -> Option<String> {
        let running = self.running.lock().await;
        running
            .as_ref()
            .map(|server| format!("http://127.0.0.1:{}{}", server.local_addr.port(), PAC_PATH))
    }

    /// Binds the loopback listener and starts accepting connections on a
    /// background task. A no-op returning the existing address when already
    /// listening. On a failed bind the responder stays in the not-listening
    /// state and `start` may be retried.
    pub async fn start(&self, port: u16) -> Result<SocketAddr> {
        let mut running = self.running.lock().await;
        if let Some(server) = running.as_ref() {
            info!("PAC responder already listening on {}", server.local_addr);
            return Ok(server.local_addr);
        }

        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| PacServeError::Bind(format!("failed to bind {}: {}", addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| PacServeError::Bind(format!("failed to read bound address: {}", e)))?;

        let app = Router::new()
            .route(PAC_PATH, any(serve_pac))
            .fallback(not_found)
            .with_state(Arc::clone(&self.document));

        let (shutdown, mut signal) = watch::channel(());
        let handle = tokio::spawn(async move {
            let stop = async move {
                let _ = signal.changed().await;
            };
            if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(stop).await {
                error!("PAC responder failed: {}", e);
            }
        });

        info!("PAC responder listening on http://{}{}", local_addr, PAC_PATH);
        *running = Some(RunningServer {
            local_addr,
            shutdown,
            handle,
        });
        Ok(local_addr)
    }

    /// Stops accepting connections and releases the socket. Requests accepted
    /// before the call are allowed to complete. A no-op when not listening;
    /// a subsequent `start` on the same port succeeds.
    pub async fn stop(&self) {
        let server = self.running.lock().await.take();
        if let Some(server) = server {
            let _ = server.shutdown.send(());
            if let Err(e) = server.handle.await {
                error!("PAC responder task ended abnormally: {}", e);
            }
            info!("PAC responder on {} stopped", server.local_addr);
        }
    }
}

async fn serve_pac(State(document): State<SharedPacDocument>, method: Method) -> Response {
    if method != Method::GET {
        debug!("Rejecting {} {}", method, PAC_PATH);
        return StatusCode::NOT_FOUND.into_response();
    }
    let body = document.read().await.clone();
    debug!("Serving PAC document ({} bytes)", body.len());
    (
        StatusCode::OK,
        [("Content-Type", PAC_CONTENT_TYPE)],
        body,
    )
        .into_response()
}

async fn not_found(uri: Uri) -> StatusCode {
    debug!("No route for {}", uri.path());
    StatusCode::NOT_FOUND
}
