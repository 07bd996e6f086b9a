use std::fs;
use std::io::Read;
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tiny_serve::{Server, ServerConfig};

/// A server driven on its own thread, serving a throwaway document root.
pub(crate) struct TestServer {
    pub(crate) addr: SocketAddr,
    live: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
    driver: Option<JoinHandle<()>>,
    _root: tempfile::TempDir,
}

impl TestServer {
    /// Last observed size of the live session set.
    pub(crate) fn live_sessions(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.store(false, Ordering::Relaxed);
        if let Some(driver) = self.driver.take() {
            driver.join().unwrap();
        }
    }
}

/// Creates a document root from `files`, starts a server on an ephemeral
/// port and drives its accept loop on a background thread.
pub(crate) fn serve(files: &[(&str, &str)], keepalive: Duration) -> TestServer {
    let root = tempfile::tempdir().unwrap();
    for (name, content) in files {
        let path = root.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    let mut server = Server::new(&ServerConfig {
        addr: "127.0.0.1:0".parse().unwrap(),
        document_root: root.path().to_path_buf(),
        keepalive,
        poll_interval: Duration::from_millis(1),
        ..ServerConfig::default()
    })
    .unwrap();

    let addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_handle();
    let live = Arc::new(AtomicUsize::new(0));
    let gauge = Arc::clone(&live);

    let driver = thread::spawn(move || {
        while server.is_running() {
            server.accept();
            gauge.store(server.num_sessions(), Ordering::Relaxed);
            thread::sleep(Duration::from_millis(1));
        }
    });

    TestServer {
        addr,
        live,
        shutdown,
        driver: Some(driver),
        _root: root,
    }
}

/// Connects a blocking client with a safety read timeout.
pub(crate) fn client(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).unwrap();
    stream.set_nodelay(true).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream
}

/// Reads one complete response: the header block, then exactly
/// `Content-Length` body bytes.
pub(crate) fn read_response(stream: &mut TcpStream) -> (String, Vec<u8>) {
    let mut head = Vec::new();
    let mut byte = [0_u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        stream.read_exact(&mut byte).unwrap();
        head.push(byte[0]);
    }
    let head = String::from_utf8(head).unwrap();

    let length = head
        .lines()
        .find_map(|line| line.strip_prefix("Content-Length: "))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .expect("response without Content-Length");

    let mut body = vec![0_u8; length];
    stream.read_exact(&mut body).unwrap();
    (head, body)
}
