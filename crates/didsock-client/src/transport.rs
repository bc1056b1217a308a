//! Transport resolution — Unix domain socket or loopback TCP.
//!
//! The agent is reachable either over a Unix socket (POSIX platforms) or a
//! conventional loopback TCP port (everywhere else). The choice is made
//! once, at client construction, and captured in a [`Transport`] value with
//! exactly two variants. Resolution is a pure function of
//! [`TransportSettings`], so tests never have to touch the process
//! environment.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::client::conn::http1::SendRequest;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tracing::warn;

use didsock_config::AgentConfig;

use crate::platform;

/// Fixed socket path used by system-wide agent installs.
pub const SYSTEM_SOCKET_PATH: &str = "/var/lib/didsock/run/agent.sock";

/// Socket path under the invoking user's home directory.
pub const USER_SOCKET_PATH: &str = ".didsock/run/agent.sock";

/// Errors from transport resolution and connection establishment.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("agent port is not configured (set [transport].port or DIDSOCK_AGENT_PORT)")]
    MissingPort,

    #[error(transparent)]
    Config(#[from] didsock_config::ConfigError),

    #[error("home directory could not be determined")]
    NoHomeDir,

    #[error("unix socket transport is not available on this platform")]
    UnixUnsupported,

    #[error("agent is not running (socket not found at {0})")]
    NotRunning(PathBuf),

    #[error("failed to connect to agent at {target}: {source}")]
    Connect {
        target: String,
        source: std::io::Error,
    },

    #[error("HTTP handshake failed: {0}")]
    Handshake(String),
}

/// How the transport style is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// Pick by platform: TCP on Windows, Unix socket elsewhere.
    #[default]
    Auto,
    /// Force the Unix socket transport.
    Unix,
    /// Force the loopback TCP transport.
    Tcp,
}

impl TransportMode {
    /// Map the config-file string to a mode. Unknown strings fall back to
    /// `Auto`; the config layer has already rejected them at validation.
    pub fn parse(s: &str) -> Self {
        match s {
            "unix" => Self::Unix,
            "tcp" => Self::Tcp,
            _ => Self::Auto,
        }
    }
}

/// Merged transport settings from the config file and the environment.
#[derive(Debug, Clone, Default)]
pub struct TransportSettings {
    pub mode: TransportMode,
    pub socket_path: Option<PathBuf>,
    pub port: Option<u16>,
}

impl TransportSettings {
    /// Merge the loaded config with the process environment. The config
    /// file wins over `DIDSOCK_AGENT_PORT` when both supply a port.
    pub fn from_config(config: &AgentConfig) -> Result<Self, TransportError> {
        let port = match config.transport.port {
            Some(port) => Some(port),
            None => didsock_config::agent_port_from_env()?,
        };
        Ok(Self {
            mode: TransportMode::parse(&config.transport.mode),
            socket_path: config.transport.socket_path.as_deref().map(PathBuf::from),
            port,
        })
    }
}

/// The resolved communication channel to the local agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// HTTP over a Unix domain socket.
    #[cfg(unix)]
    Unix { socket_path: PathBuf },
    /// HTTP over loopback TCP.
    Tcp { addr: SocketAddr },
}

impl Transport {
    /// Resolve the transport from merged settings.
    ///
    /// No connection is attempted here. A TCP transport without a
    /// configured port is a fatal configuration error, surfaced before any
    /// network I/O.
    pub fn resolve(settings: &TransportSettings) -> Result<Self, TransportError> {
        let use_tcp = match settings.mode {
            TransportMode::Unix => false,
            TransportMode::Tcp => true,
            TransportMode::Auto => platform::is_windows(),
        };

        if use_tcp {
            let port = settings.port.ok_or(TransportError::MissingPort)?;
            return Ok(Self::Tcp {
                addr: SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
            });
        }

        #[cfg(unix)]
        {
            let socket_path = match &settings.socket_path {
                Some(path) => path.clone(),
                None => default_socket_path()?,
            };
            Ok(Self::Unix { socket_path })
        }
        #[cfg(not(unix))]
        {
            Err(TransportError::UnixUnsupported)
        }
    }

    /// Human-readable request target, logged before every send.
    pub fn target(&self) -> String {
        match self {
            #[cfg(unix)]
            Self::Unix { socket_path } => format!("unix://{}", socket_path.display()),
            Self::Tcp { addr } => format!("http://{addr}"),
        }
    }

    /// Whether the agent looks reachable. For the Unix variant this probes
    /// the socket file; TCP is assumed reachable until a connect fails.
    pub fn agent_available(&self) -> bool {
        match self {
            #[cfg(unix)]
            Self::Unix { socket_path } => socket_path.exists(),
            Self::Tcp { .. } => true,
        }
    }

    /// Open a connection for one exchange and perform the HTTP/1.1
    /// handshake.
    ///
    /// The connection driver is spawned onto the runtime and terminates
    /// when the returned sender drops, so the socket is released on every
    /// exit path.
    pub(crate) async fn handshake(&self) -> Result<SendRequest<Full<Bytes>>, TransportError> {
        match self {
            #[cfg(unix)]
            Self::Unix { socket_path } => {
                if !socket_path.exists() {
                    return Err(TransportError::NotRunning(socket_path.clone()));
                }
                let stream = UnixStream::connect(socket_path).await.map_err(|source| {
                    TransportError::Connect {
                        target: self.target(),
                        source,
                    }
                })?;
                spawn_http1(TokioIo::new(stream)).await
            }
            Self::Tcp { addr } => {
                let stream =
                    TcpStream::connect(addr)
                        .await
                        .map_err(|source| TransportError::Connect {
                            target: self.target(),
                            source,
                        })?;
                spawn_http1(TokioIo::new(stream)).await
            }
        }
    }
}

/// Candidate socket locations: the fixed system install path first, then
/// the per-user path. The user path is selected even when neither file
/// exists yet — the connect step reports "not running" in that case.
#[cfg(unix)]
pub fn default_socket_path() -> Result<PathBuf, TransportError> {
    let system = PathBuf::from(SYSTEM_SOCKET_PATH);
    if system.exists() {
        return Ok(system);
    }
    let home = dirs::home_dir().ok_or(TransportError::NoHomeDir)?;
    Ok(home.join(USER_SOCKET_PATH))
}

async fn spawn_http1<I>(io: I) -> Result<SendRequest<Full<Bytes>>, TransportError>
where
    I: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let (sender, conn) = hyper::client::conn::http1::handshake::<_, Full<Bytes>>(io)
        .await
        .map_err(|e| TransportError::Handshake(e.to_string()))?;

    // Drive the connection in the background
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            warn!(error = %e, "agent connection error");
        }
    });

    Ok(sender)
}
