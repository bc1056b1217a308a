#![deny(unsafe_code)]

//! didsock CLI — example invocations against the local DID agent.
//!
//! Each subcommand is one straight-line exchange: build the payload, call
//! the endpoint, print the reply. Application failures from the agent are
//! printed with their status, reason, and body, and the process exits
//! non-zero — this binary is the only place that policy lives; the client
//! library always returns failures as values.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use didsock_client::types::{
    CustomMetric, Event, LogMessage, MessageEnvelope, VerifyRequest, VersionUpdate,
};
use didsock_client::{AgentClient, AgentReply, ClientError};
use didsock_config::AgentConfig;

/// didsock — talk to the local DID agent daemon.
#[derive(Parser)]
#[command(name = "didsock", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "didsock.toml")]
    config: PathBuf,

    /// Override the agent's Unix socket path (forces the unix transport).
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Override the agent's TCP port (forces the tcp transport).
    #[arg(long)]
    port: Option<u16>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new DID for this device.
    CreateDid,

    /// Resolve a DID document.
    FindDid {
        /// The DID to resolve.
        did: String,
    },

    /// Post a single event.
    SendEvent {
        #[arg(long, default_value = "test-key")]
        key: String,
        #[arg(long, default_value = "test-detail")]
        detail: String,
    },

    /// Post a batch of events in one call.
    SendEvents {
        /// Number of events in the batch.
        #[arg(long, default_value_t = 10)]
        count: u32,
    },

    /// Post a custom metric sample.
    SendCustomMetric {
        #[arg(long, default_value = "test-key")]
        key: String,
        #[arg(long, default_value_t = 10.52)]
        value: f64,
    },

    /// Forward a log line to the agent.
    SendLog {
        #[arg(long, default_value = "test-message")]
        message: String,
    },

    /// Wrap a JSON message as an encrypted DIDComm message.
    CreateDidcommMessage {
        /// Destination DID.
        destination_did: String,
        /// JSON message body to wrap.
        #[arg(long, default_value = r#"{"string":"value","number":1}"#)]
        message: String,
        #[arg(long, default_value = "test-operation-tag")]
        operation_tag: String,
    },

    /// Decrypt and verify a DIDComm message.
    VerifyDidcommMessage {
        /// The envelope JSON printed by create-didcomm-message.
        message: String,
    },

    /// Wrap a JSON message as a signed verifiable credential.
    CreateVerifiableMessage {
        /// Destination DID.
        destination_did: String,
        /// JSON message body to wrap.
        #[arg(long, default_value = r#"{"string":"value","number":1}"#)]
        message: String,
        #[arg(long, default_value = "test-operation-tag")]
        operation_tag: String,
    },

    /// Verify a signed verifiable credential.
    VerifyVerifiableMessage {
        /// The credential JSON printed by create-verifiable-message.
        message: String,
    },

    /// Ask the agent for its version.
    VersionGet,

    /// Trigger a remote binary update.
    VersionUpdate {
        /// Where the agent should fetch the new binary archive.
        #[arg(long)]
        binary_url: String,
        /// Where the agent should unpack it.
        #[arg(long, default_value = "/tmp")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up tracing subscriber with verbosity level
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let mut config = load_config(&cli.config).await?;
    if let Some(socket) = &cli.socket {
        config.transport.socket_path = Some(socket.display().to_string());
        config.transport.mode = "unix".to_string();
    }
    if let Some(port) = cli.port {
        config.transport.port = Some(port);
        config.transport.mode = "tcp".to_string();
    }

    let client = AgentClient::from_config(&config)?;

    match run(&client, cli.command).await {
        Ok(reply) => {
            println!("{reply}");
            Ok(())
        }
        Err(ClientError::Api {
            status,
            reason,
            body,
        }) => {
            eprintln!("{status} {reason} {body}");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

async fn run(client: &AgentClient, command: Commands) -> Result<AgentReply, ClientError> {
    match command {
        Commands::CreateDid => client.create_identifier().await.map(AgentReply::Json),

        Commands::FindDid { did } => client.find_identifier(&did).await.map(AgentReply::Json),

        Commands::SendEvent { key, detail } => {
            let event = Event {
                key,
                detail,
                occurred_at: epoch_secs(),
            };
            client.send_event(&event).await
        }

        Commands::SendEvents { count } => {
            let now = epoch_secs();
            let events: Vec<Event> = (0..count)
                .map(|i| Event {
                    key: format!("test-key{}", i + 10),
                    detail: format!("test-detail{i}"),
                    occurred_at: now + u64::from(i),
                })
                .collect();
            client.send_events(&events).await
        }

        Commands::SendCustomMetric { key, value } => {
            let metric = CustomMetric {
                key,
                value,
                occurred_at: epoch_secs().to_string(),
            };
            client.send_custom_metric(&metric).await
        }

        Commands::SendLog { message } => {
            let log = LogMessage {
                message,
                occurred_at: epoch_millis(),
            };
            client.send_log(&log).await
        }

        Commands::CreateDidcommMessage {
            destination_did,
            message,
            operation_tag,
        } => {
            let envelope = MessageEnvelope {
                destination_did,
                message,
                operation_tag,
            };
            client
                .create_didcomm_message(&envelope)
                .await
                .map(AgentReply::Json)
        }

        Commands::VerifyDidcommMessage { message } => client
            .verify_didcomm_message(&VerifyRequest { message })
            .await
            .map(AgentReply::Json),

        Commands::CreateVerifiableMessage {
            destination_did,
            message,
            operation_tag,
        } => {
            let envelope = MessageEnvelope {
                destination_did,
                message,
                operation_tag,
            };
            client
                .create_verifiable_message(&envelope)
                .await
                .map(AgentReply::Json)
        }

        Commands::VerifyVerifiableMessage { message } => client
            .verify_verifiable_message(&VerifyRequest { message })
            .await
            .map(AgentReply::Json),

        Commands::VersionGet => {
            let info = client.version_get().await?;
            serde_json::to_value(info)
                .map(AgentReply::Json)
                .map_err(|e| ClientError::Serialize(e.to_string()))
        }

        Commands::VersionUpdate { binary_url, path } => {
            client
                .version_update(&VersionUpdate::new(binary_url, path))
                .await
        }
    }
}

async fn load_config(path: &Path) -> Result<AgentConfig> {
    if path.exists() {
        AgentConfig::load(path).await.map_err(|e| anyhow::anyhow!(e))
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        Ok(AgentConfig::default())
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
