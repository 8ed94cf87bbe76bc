//! Simple SSH Agent Example
//!
//! This example demonstrates how to:
//! - Create an agent with a pre-loaded Ed25519 key
//! - Bind the agent socket
//! - Serve clients until interrupted
//!
//! Usage:
//!   cargo run --example simple_agent [socket_path]
//!
//! Then point a client at it:
//!   SSH_AUTH_SOCK=/tmp/vigil-agent.sock ssh-add -l

use std::env;
use std::path::PathBuf;

use vigil_agent::agent::key::Ed25519UserKey;
use vigil_agent::agent::keystore::AgentKey;
use vigil_agent::{Agent, AgentConfig, AgentListener};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let socket_path = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        std::env::temp_dir().join("vigil-agent.sock")
    };
    let _ = std::fs::remove_file(&socket_path);

    println!("=== Vigil SSH Agent Example ===");
    println!();

    // Pre-load one demonstration key. A real deployment would receive
    // keys over the wire via ADD_IDENTITY instead.
    let agent = Agent::new();
    {
        let key = Ed25519UserKey::from_seed(&[0x42; 32]);
        let entry = AgentKey::User {
            key: Box::new(key),
            comment: "demo@vigil".to_string(),
        };
        let mut core = agent.core().await;
        let fingerprint = entry.fingerprint();
        core.keys_mut().add(entry);
        println!("Loaded demo key: {}", fingerprint);
    }

    let config = AgentConfig {
        socket_path: socket_path.clone(),
        suppress_logging: false,
    };
    let listener = AgentListener::bind(config, agent)?;

    println!("Agent listening on {:?}", socket_path);
    println!();
    println!("Try it:");
    println!("  SSH_AUTH_SOCK={} ssh-add -l", socket_path.display());
    println!();
    println!("Waiting for clients... (Press Ctrl+C to stop)");

    listener.run().await?;
    Ok(())
}
