//! # Simple usage
//!
//! ## Creating the server
//!
//! The easiest way to create a server is to call `Server::http()` with the
//! address to bind and the directory to serve. The document root is
//! canonicalized once at startup and becomes the sandbox boundary: every
//! request resolves against it, and anything escaping it (through `../`
//! segments or symlinks alike) is answered like a missing file.
//!
//! ```no_run
//! # use std::path::Path;
//! let server = tiny_serve::Server::http("127.0.0.1:8080", Path::new("./root")).unwrap();
//! ```
//!
//! ## Serving
//!
//! The server accepts on the caller's thread and spawns one worker thread
//! per connection; `accept()` never blocks, so the owning loop decides the
//! poll cadence:
//!
//! ```no_run
//! # use std::path::Path;
//! # use std::thread;
//! # let mut server = tiny_serve::Server::http("127.0.0.1:8080", Path::new("./root")).unwrap();
//! while server.is_running() {
//!     server.accept();
//!     thread::sleep(server.config().poll_interval);
//! }
//! ```
//!
//! Each worker answers `GET` requests until its keepalive window runs dry,
//! expanding `####file` include directives in HTML bodies on the way out.
//! Calling `shutdown()` (from any thread, via `shutdown_handle()`) stops
//! every session cooperatively; dropping the `Server` joins all remaining
//! workers.

use std::fs;
use std::io::{Error as IoError, ErrorKind as IoErrorKind, Result as IoResult};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

pub use common::{ContentType, StatusCode};
pub use connection::Connection;
pub use error::SessionError;
pub use resource::Resource;
pub use server_config::ServerConfig;
pub use session::Session;
pub use stream_traits::SessionStream;
pub use test::TestStream;
use util::CompletionGuard;

mod common;
mod connection;
mod error;
mod log;
mod resource;
mod server_config;
mod session;
mod stream_traits;
mod test;
mod util;

// binary-only dependencies
#[cfg(feature = "cli")]
use clap as _;
#[cfg(feature = "cli")]
use env_logger as _;

/// The listener/supervisor owning the accept socket and the session
/// workers.
///
/// `accept()` polls without blocking, spawns a worker per connection and
/// opportunistically reaps workers that reported completion. Dropping the
/// server clears the shared running flag and joins every remaining worker,
/// so no thread is abandoned.
#[allow(missing_debug_implementations)]
pub struct Server {
    /// ids reported by finished workers; the only state shared between
    /// supervisor and sessions besides the running flag and id counter
    completed: Arc<Mutex<Vec<u64>>>,
    config: Arc<ServerConfig>,
    listener: TcpListener,
    next_id: AtomicU64,
    running: Arc<AtomicBool>,
    workers: Vec<Worker>,
}

struct Worker {
    id: u64,
    handle: JoinHandle<()>,
}

impl Server {
    /// Binds the configured address and prepares the sandbox root.
    ///
    /// # Errors
    ///
    /// `std::io::Error` when binding fails or the document root cannot be
    /// canonicalized.
    pub fn new(config: &ServerConfig) -> IoResult<Server> {
        let listener = TcpListener::bind(config.addr)?;
        listener.set_nonblocking(true)?;

        let document_root = fs::canonicalize(&config.document_root)?;
        let config = Arc::new(ServerConfig {
            document_root,
            ..config.clone()
        });

        log::info!(
            "server listening on {} serving {}",
            listener.local_addr()?,
            config.document_root.display()
        );

        Ok(Server {
            completed: Arc::new(Mutex::new(Vec::new())),
            config,
            listener,
            next_id: AtomicU64::new(0),
            running: Arc::new(AtomicBool::new(true)),
            workers: Vec::new(),
        })
    }

    /// Shortcut for a server on a specific address serving
    /// `document_root`.
    ///
    /// # Errors
    ///
    /// `std::io::Error` when `addr` is no socket address, binding fails,
    /// or the document root cannot be canonicalized.
    pub fn http<A>(addr: A, document_root: &Path) -> IoResult<Server>
    where
        A: ToSocketAddrs,
    {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| IoError::new(IoErrorKind::AddrNotAvailable, "no socket address"))?;

        Server::new(&ServerConfig {
            addr,
            document_root: document_root.to_path_buf(),
            ..ServerConfig::default()
        })
    }

    /// The address the server is listening to.
    ///
    /// # Errors
    ///
    /// `std::io::Error` when the socket is gone.
    pub fn local_addr(&self) -> IoResult<SocketAddr> {
        self.listener.local_addr()
    }

    /// The effective configuration (document root in canonical form).
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// True until [`shutdown`](Server::shutdown) is called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Requests cooperative shutdown: sessions and the accept loop observe
    /// the cleared flag on their next poll iteration.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Clone of the running flag, for wiring shutdown to an external
    /// trigger such as a signal handler.
    #[must_use]
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Number of live session workers (completed but unreaped workers
    /// included until the next [`accept`](Server::accept) call).
    #[must_use]
    pub fn num_sessions(&self) -> usize {
        self.workers.len()
    }

    /// Polls for one incoming connection and reclaims finished workers.
    ///
    /// Returns immediately when no connection is pending; the owning loop
    /// chooses the poll cadence. Reaping only joins workers that already
    /// reported completion, so this call never waits on a running session.
    pub fn accept(&mut self) {
        match self.listener.accept() {
            Ok((stream, addr)) => self.spawn_session(stream, addr),
            Err(ref err) if err.kind() == IoErrorKind::WouldBlock => {}
            Err(err) => {
                log::error!("error on connection accept: {err:?}");
                let _ = err;
            }
        }

        self.reap_completed();
    }

    fn spawn_session(&mut self, stream: TcpStream, addr: SocketAddr) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let config = Arc::clone(&self.config);
        let running = Arc::clone(&self.running);
        let completed = Arc::clone(&self.completed);

        let handle = thread::spawn(move || {
            let _guard = CompletionGuard::new(id, completed);

            match Connection::new(stream) {
                Ok(connection) => Session::new(connection, id, config, running).run(),
                Err(err) => {
                    log::error!("[#{id}] ({addr}) connection setup failed: {err}");
                    let _ = (err, addr);
                }
            }
        });

        self.workers.push(Worker { id, handle });
    }

    /// Joins every worker whose id has been reported, removing it from the
    /// live set and the id from the completed list.
    fn reap_completed(&mut self) {
        let finished: Vec<u64> = {
            let mut completed = self.completed.lock().unwrap();
            completed.drain(..).collect()
        };

        for id in finished {
            if let Some(pos) = self.workers.iter().position(|worker| worker.id == id) {
                let worker = self.workers.swap_remove(pos);
                if worker.handle.join().is_err() {
                    log::error!("session #{id} panicked");
                }
                log::debug!("reaped session #{id}");
            }
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);

        // final blocking reap of everything, reported or not
        for worker in self.workers.drain(..) {
            if worker.handle.join().is_err() {
                log::error!("session #{} panicked", worker.id);
            }
        }
    }
}
