use std::sync::Arc;

use tokio::sync::Mutex;
use url::Url;

use super::client::McpClient;
use crate::errors::ConnectionError;

struct McpConnection {
    url: Url,
    client: Arc<McpClient>,
}

/// Owns the single outbound MCP connection for a session of work.
///
/// Callers hold one `McpSession` per logical context instead of sharing a
/// process-wide global; concurrent contexts each get their own session.
/// Reconnecting to the recorded url is a no-op. Connecting to a different url
/// establishes the new session first, swaps it in, then closes the old one.
pub struct McpSession {
    inner: Mutex<Option<McpConnection>>,
}

impl Default for McpSession {
    fn default() -> Self {
        Self::new()
    }
}

impl McpSession {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Connect to a tool server, idempotently.
    ///
    /// A failed attempt leaves no partial state: either the previous
    /// connection (when switching urls) or the disconnected state remains.
    pub async fn connect(&self, url: &str) -> Result<(), ConnectionError> {
        let url = Url::parse(url).map_err(|source| ConnectionError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let mut guard = self.inner.lock().await;

        if let Some(connection) = guard.as_ref() {
            if connection.url == url {
                tracing::debug!(url = %url, "MCP session already connected");
                return Ok(());
            }
            tracing::info!(old = %connection.url, new = %url, "switching MCP endpoint");
        }

        let client = McpClient::connect(url.clone())
            .await
            .map_err(|source| ConnectionError::Handshake {
                url: url.to_string(),
                source: source.into(),
            })?;

        let previous = guard.replace(McpConnection {
            url,
            client: Arc::new(client),
        });
        drop(guard);

        if let Some(old) = previous {
            if let Err(e) = old.client.close().await {
                tracing::warn!(url = %old.url, error = %e, "failed to close prior MCP session");
            }
        }
        Ok(())
    }

    /// The live client, if connected.
    pub async fn client(&self) -> Option<Arc<McpClient>> {
        self.inner
            .lock()
            .await
            .as_ref()
            .map(|connection| connection.client.clone())
    }

    /// The url of the live connection, if any.
    pub async fn current_url(&self) -> Option<Url> {
        self.inner
            .lock()
            .await
            .as_ref()
            .map(|connection| connection.url.clone())
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    /// Drop the connection, closing the remote session best effort.
    pub async fn disconnect(&self) {
        let previous = self.inner.lock().await.take();
        if let Some(old) = previous {
            if let Err(e) = old.client.close().await {
                tracing::warn!(url = %old.url, error = %e, "failed to close MCP session");
            }
        }
    }
}
