use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Idle window after which an inactive session closes.
pub(crate) const KEEPALIVE_DEFAULT: Duration = Duration::from_secs(10);

/// Sleep between non-blocking transport polls.
pub(crate) const POLL_INTERVAL_DEFAULT: Duration = Duration::from_millis(10);

/// Represents the config parameters required to create a server.
///
/// # Example
///
/// ```
/// # use tiny_serve::ServerConfig;
/// let cfg = ServerConfig { document_root: "./public".into(), ..ServerConfig::default() };
/// ```
///
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address to listen to.
    pub addr: SocketAddr,

    /// Directory files are served from; the sandbox boundary. Canonicalized
    /// once at server construction.
    pub document_root: PathBuf,

    /// Idle window after which a session closes. Reset by every fully
    /// received request.
    pub keepalive: Duration,

    /// Sleep between non-blocking polls in the session and read loops.
    pub poll_interval: Duration,

    /// Value sent in the `Server` response header.
    pub server_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from_str("127.0.0.1:80").unwrap(),
            document_root: PathBuf::from("./root"),
            keepalive: KEEPALIVE_DEFAULT,
            poll_interval: POLL_INTERVAL_DEFAULT,
            server_name: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}
