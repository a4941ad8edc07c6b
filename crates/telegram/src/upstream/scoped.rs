//! A connected client bound to a cancellable run context.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{UpstreamClient, UpstreamError};

/// Owns one connected client for the duration of an operation.
///
/// Every call made through [`ScopedClient::call`] aborts with
/// [`UpstreamError::Cancelled`] once the run context is cancelled. The
/// client is disconnected by [`ScopedClient::close`], or in the background
/// if the scope is dropped without closing.
pub struct ScopedClient {
    client: Arc<dyn UpstreamClient>,
    cancel: CancellationToken,
    closed: bool,
}

impl ScopedClient {
    pub fn new(client: Box<dyn UpstreamClient>, cancel: CancellationToken) -> Self {
        Self {
            client: Arc::from(client),
            cancel,
            closed: false,
        }
    }

    pub fn client(&self) -> &dyn UpstreamClient {
        self.client.as_ref()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Await `op` unless the run context is cancelled first.
    pub async fn call<T, F>(&self, op: F) -> Result<T, UpstreamError>
    where
        F: Future<Output = Result<T, UpstreamError>>,
    {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(UpstreamError::Cancelled),
            result = op => result,
        }
    }

    /// Disconnect the client.
    pub async fn close(mut self) {
        self.closed = true;
        self.client.disconnect().await;
    }
}

impl Drop for ScopedClient {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let client = Arc::clone(&self.client);
            handle.spawn(async move { client.disconnect().await });
        }
    }
}
