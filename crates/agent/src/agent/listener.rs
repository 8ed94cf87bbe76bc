//! Socket acceptance.
//!
//! Binds the agent's Unix socket and constructs a per-connection driver
//! for each accepted client. Framing is identical on every transport; the
//! listener is only one way of obtaining a stream — tests and embedded
//! uses hand an in-process duplex channel straight to
//! [`serve_stream`](crate::agent::connection::serve_stream).

use std::os::unix::fs::PermissionsExt as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::UnixListener;
use tracing::info;
use vigil_platform::{VigilError, VigilResult};

use crate::agent::client::ClientRegistry;
use crate::agent::connection::serve_stream;
use crate::agent::handler::RequestHandler;

/// Agent listener configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Path of the Unix socket to bind.
    pub socket_path: PathBuf,
    /// Disable per-request detail logging for every client.
    pub suppress_logging: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            socket_path: std::env::temp_dir().join("vigil-agent.sock"),
            suppress_logging: false,
        }
    }
}

/// Accepts agent clients on a Unix socket.
pub struct AgentListener<H: RequestHandler> {
    listener: UnixListener,
    handler: Arc<H>,
    registry: Arc<ClientRegistry>,
    config: AgentConfig,
}

impl<H: RequestHandler> AgentListener<H> {
    /// Binds the configured socket, restricted to the owning user.
    pub fn bind(config: AgentConfig, handler: Arc<H>) -> VigilResult<Self> {
        let listener = UnixListener::bind(&config.socket_path).map_err(|e| {
            VigilError::config(format!(
                "cannot bind agent socket {:?}: {}",
                config.socket_path, e
            ))
        })?;
        std::fs::set_permissions(
            &config.socket_path,
            std::fs::Permissions::from_mode(0o600),
        )?;

        info!("listening on {:?}", config.socket_path);
        Ok(Self {
            listener,
            handler,
            registry: Arc::new(ClientRegistry::new()),
            config,
        })
    }

    /// The bound socket path.
    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// The registry tracking this listener's clients.
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Accepts connections forever, spawning a driver per client.
    pub async fn run(self) -> VigilResult<()> {
        loop {
            let (stream, _addr) = self.listener.accept().await?;
            let handler = Arc::clone(&self.handler);
            let registry = Arc::clone(&self.registry);
            let suppress_logging = self.config.suppress_logging;
            tokio::spawn(async move {
                if let Err(e) = serve_stream(handler, registry, stream, suppress_logging).await {
                    tracing::warn!("connection error: {}", e);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::handler::Agent;
    use crate::agent::message::{RequestType, SSH2_AGENT_IDENTITIES_ANSWER};
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::UnixStream;

    #[tokio::test]
    async fn test_bind_and_answer_over_unix_socket() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("vigil-agent-test-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let config = AgentConfig {
            socket_path: path.clone(),
            suppress_logging: false,
        };
        let listener = AgentListener::bind(config, Agent::new()).unwrap();
        assert_eq!(listener.socket_path(), path.as_path());
        tokio::spawn(listener.run());

        let mut stream = UnixStream::connect(&path).await.unwrap();
        stream
            .write_all(&[0, 0, 0, 1, RequestType::RequestIdentities as u8])
            .await
            .unwrap();

        let mut reply = [0u8; 9];
        stream.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [0, 0, 0, 5, SSH2_AGENT_IDENTITIES_ANSWER, 0, 0, 0, 0]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert!(!config.suppress_logging);
        assert!(config.socket_path.ends_with("vigil-agent.sock"));
    }

    #[tokio::test]
    async fn test_bind_refuses_unusable_path() {
        let config = AgentConfig {
            socket_path: PathBuf::from("/nonexistent-dir/agent.sock"),
            suppress_logging: false,
        };
        let result = AgentListener::bind(config, Agent::new());
        assert!(matches!(result, Err(VigilError::Config(_))));
    }
}
