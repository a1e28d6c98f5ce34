//! In-memory mock of the storefront cart and catalog API
//!
//! Used by the cart client's integration tests and for local demos.

pub mod api;
pub mod error;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

pub use api::router;
pub use state::{Caller, MockState};

/// A mock server running on an ephemeral local port
pub struct MockServer {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Base URL, e.g. `http://127.0.0.1:53187`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Bind to `127.0.0.1:0` and serve `state` in the background
pub async fn spawn(state: Arc<MockState>) -> std::io::Result<MockServer> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = router(state.clone());

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "Mock cart API stopped");
        }
    });
    tracing::debug!(%addr, "Mock cart API listening");

    Ok(MockServer {
        addr,
        state,
        handle,
    })
}
