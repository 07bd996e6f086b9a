//! Per-connection request/response state machine.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use ascii::{AsciiChar, AsciiString};

use crate::common::StatusCode;
use crate::error::SessionError;
use crate::log;
use crate::resource::Resource;
use crate::server_config::ServerConfig;
use crate::stream_traits::SessionStream;

/// Bytes requested from the transport per read while collecting a request.
const RECV_CHUNK: usize = 128;

/// Upper bound on an accumulated request head; anything longer is answered
/// with a 400 instead of being buffered until the keepalive fires.
const MAX_REQUEST_SIZE: usize = 8_192;

/// Shortest well-formed request: `GET / HTTP/1.1`.
const MIN_REQUEST_SIZE: usize = 14;

/// Size of the blocks streamed from a resource to the transport.
const SEND_CHUNK: usize = 4_096;

/// Fallback resource served in place of missing targets.
const NOT_FOUND_PAGE: &str = "/404page.html";

/// Hard-coded response body when the fallback page itself is missing.
const NOT_FOUND_BODY: &[u8] = b"<!Doctype html>\n\
    <html>\n\
    <head><title>404 Not Found</title></head>\n\
    <body>\n\
    <h2>404 Not Found</h2>\n\
    </body>\n\
    </html>\n";

/// The state and logic bound to one accepted connection.
///
/// A session owns its transport from accept to close. [`run`](Session::run)
/// polls for requests until the keepalive window elapses, the transport
/// dies, or the shared running flag clears; every per-request failure is
/// converted into exactly one HTTP response.
#[allow(missing_debug_implementations)]
pub struct Session<S> {
    stream: S,
    id: u64,
    config: Arc<ServerConfig>,
    running: Arc<AtomicBool>,
    last_activity: Instant,
}

impl<S> Session<S>
where
    S: SessionStream,
{
    /// Creates a session over `stream`. `running` is the cooperative
    /// cancellation flag shared with the listener.
    pub fn new(stream: S, id: u64, config: Arc<ServerConfig>, running: Arc<AtomicBool>) -> Self {
        Session {
            stream,
            id,
            config,
            running,
            last_activity: Instant::now(),
        }
    }

    /// Runs the session until idle timeout, transport death, or shutdown.
    ///
    /// Loops while the keepalive window holds: a pending request is read,
    /// validated and answered (resetting the window); failures go through
    /// the dispatch table; between polls the thread sleeps for the
    /// configured interval.
    pub fn run(&mut self) {
        log::info!("[#{}] ({}) session begin", self.id, self.stream.peer_name());

        while self.last_activity.elapsed() < self.config.keepalive {
            if self.stream.peek() > 0 {
                if let Err(err) = self.handle_request() {
                    if !self.dispatch_error(&err) {
                        log::info!(
                            "[#{}] ({}) session end ({err})",
                            self.id,
                            self.stream.peer_name()
                        );
                        return;
                    }
                }
            }

            if !self.running.load(Ordering::Relaxed) {
                log::info!(
                    "[#{}] ({}) session terminated: exit requested",
                    self.id,
                    self.stream.peer_name()
                );
                return;
            }

            if self.stream.is_error() {
                break;
            }

            thread::sleep(self.config.poll_interval);
        }

        log::info!("[#{}] ({}) session end", self.id, self.stream.peer_name());
    }

    /// One full request cycle: read, validate, resolve, respond.
    fn handle_request(&mut self) -> Result<(), SessionError> {
        let request = self.read_request()?;
        validate_request(&request)?;
        let target = extract_target(&request);

        let resource = Resource::open(&self.config.document_root, target.as_str())?;
        log::info!(
            "[#{}] ({}) request resource \"{}\" ({})",
            self.id,
            self.stream.peer_name(),
            resource.name(),
            resource.content_type()
        );

        self.send_resource(resource)
    }

    /// Accumulates transport bytes until the `\r\n\r\n` header terminator.
    ///
    /// Fails `Closed` when the keepalive window elapses mid-read or the
    /// transport dies, `Shutdown` when the running flag clears, and
    /// `Malformed` when the accumulated head outgrows the size cap. A
    /// complete request resets the keepalive window.
    fn read_request(&mut self) -> Result<Vec<u8>, SessionError> {
        let mut request = Vec::new();
        let mut block = [0_u8; RECV_CHUNK];

        loop {
            if self.last_activity.elapsed() >= self.config.keepalive {
                return Err(SessionError::Closed);
            }

            let received = self.stream.read_nonblock(&mut block);

            if self.stream.is_error() {
                return Err(SessionError::Closed);
            }
            if !self.running.load(Ordering::Relaxed) {
                return Err(SessionError::Shutdown);
            }

            request.extend_from_slice(&block[..received]);
            if request.len() > MAX_REQUEST_SIZE {
                return Err(SessionError::Malformed);
            }

            if contains_terminator(&request) {
                break;
            }

            if received == 0 {
                thread::sleep(self.config.poll_interval);
            }
        }

        self.last_activity = Instant::now();
        Ok(request)
    }

    /// Streams a resolved resource: the fixed header shape, then the body
    /// in fixed-size chunks until the declared length is transferred.
    fn send_resource(&mut self, mut resource: Resource) -> Result<(), SessionError> {
        let header = response_header(
            StatusCode(200),
            resource.len(),
            Some(resource.content_type().as_str()),
            &self.config.server_name,
        );
        self.send(header.as_bytes())?;

        let size = resource.len();
        let mut sent = 0_u64;
        let mut block = [0_u8; SEND_CHUNK];

        while sent != size {
            let got = resource
                .read(&mut block)
                .map_err(|err| SessionError::Internal(err.to_string()))?;
            if got == 0 {
                // the file shrank under us; the declared length can no
                // longer be honored, so drop the connection
                return Err(SessionError::Closed);
            }

            self.send(&block[..got])?;
            sent += got as u64;

            if !self.running.load(Ordering::Relaxed) {
                return Err(SessionError::Shutdown);
            }
        }

        log::info!(
            "[#{}] ({}) sent \"{}\" ({size} bytes)",
            self.id,
            self.stream.peer_name(),
            resource.name()
        );
        Ok(())
    }

    /// Writes `data` completely, retrying short writes until the transport
    /// reports an error or shutdown is requested.
    fn send(&mut self, data: &[u8]) -> Result<(), SessionError> {
        let mut sent = 0;

        while sent != data.len() {
            sent += self.stream.write_nonblock(&data[sent..]);

            if self.stream.is_error() {
                return Err(SessionError::Closed);
            }
            if !self.running.load(Ordering::Relaxed) {
                return Err(SessionError::Shutdown);
            }
        }

        Ok(())
    }

    /// Converts one failed request cycle into its response. Returns false
    /// when the session has to end.
    fn dispatch_error(&mut self, err: &SessionError) -> bool {
        log::warn!("[#{}] ({}) {err}", self.id, self.stream.peer_name());

        match err {
            SessionError::NotFound(_) | SessionError::Forbidden(_) => self.send_not_found(),
            SessionError::Malformed => self.send_generic(StatusCode(400), b"").is_ok(),
            SessionError::NotSupported => self.send_generic(StatusCode(501), b"").is_ok(),
            SessionError::Version => self.send_generic(StatusCode(505), b"").is_ok(),
            SessionError::Internal(_) => self.send_generic(StatusCode(500), b"").is_ok(),
            SessionError::Closed | SessionError::Shutdown => false,
        }
    }

    /// Serves the fallback page, or the hard-coded 404 body when the
    /// fallback is missing too.
    fn send_not_found(&mut self) -> bool {
        match Resource::open(&self.config.document_root, NOT_FOUND_PAGE) {
            Ok(resource) => self.send_resource(resource).is_ok(),
            Err(SessionError::NotFound(_)) => {
                self.send_generic(StatusCode(404), NOT_FOUND_BODY).is_ok()
            }
            Err(err) => {
                log::warn!(
                    "[#{}] ({}) fallback page: {err}",
                    self.id,
                    self.stream.peer_name()
                );
                false
            }
        }
    }

    /// Sends a bodyless (or hard-coded) response without a `Content-Type`
    /// field.
    fn send_generic(&mut self, status: StatusCode, body: &[u8]) -> Result<(), SessionError> {
        let header = response_header(status, body.len() as u64, None, &self.config.server_name);
        self.send(header.as_bytes())?;
        self.send(body)?;

        log::info!(
            "[#{}] ({}) sent generic {status} page ({} bytes)",
            self.id,
            self.stream.peer_name(),
            body.len()
        );
        Ok(())
    }
}

/// Builds the fixed response header shape. Generic error responses pass
/// `None` for the content type and the field is omitted.
fn response_header(
    status: StatusCode,
    length: u64,
    content_type: Option<&str>,
    server_name: &str,
) -> String {
    let mut header = format!(
        "HTTP/1.1 {}\r\nContent-Length: {length}\r\n",
        status.status_text()
    );
    if let Some(content_type) = content_type {
        header.push_str("Content-Type: ");
        header.push_str(content_type);
        header.push_str("\r\n");
    }
    header.push_str("Server: ");
    header.push_str(server_name);
    header.push_str("\r\n\r\n");
    header
}

fn contains_terminator(request: &[u8]) -> bool {
    request.windows(4).any(|window| window == b"\r\n\r\n")
}

/// Checks the request head for minimal validity.
///
/// Check order matters: the method is inspected before the full length so
/// a short non-GET request classifies as `NotSupported`, and the version
/// digit is read relative to the first `\r\n`.
fn validate_request(request: &[u8]) -> Result<(), SessionError> {
    if request.len() < 4 {
        return Err(SessionError::Malformed);
    }
    if &request[..4] != b"GET " {
        return Err(SessionError::NotSupported);
    }
    if request.len() < MIN_REQUEST_SIZE {
        return Err(SessionError::Malformed);
    }

    let eol = request
        .windows(2)
        .position(|window| window == b"\r\n")
        .ok_or(SessionError::Malformed)?;
    if eol < 3 {
        return Err(SessionError::Malformed);
    }

    // 3 back from the line end sits the major http version
    if request[eol - 3] != b'1' {
        return Err(SessionError::Version);
    }

    Ok(())
}

/// Picks the target out of the request line: the bytes between the first
/// and second space, lowercased. Anything that frustrates extraction
/// (missing spaces, non-ascii bytes) leaves the target empty.
fn extract_target(request: &[u8]) -> AsciiString {
    let begin = match request.iter().position(|&byte| byte == b' ') {
        Some(n) => n + 1,
        None => return AsciiString::new(),
    };
    if begin >= request.len() {
        return AsciiString::new();
    }

    let end = match request[begin..].iter().position(|&byte| byte == b' ') {
        Some(n) => begin + n,
        None => return AsciiString::new(),
    };

    let mut target = AsciiString::with_capacity(end - begin);
    for &byte in &request[begin..end] {
        match AsciiChar::from_ascii(byte) {
            Ok(ch) => target.push(ch.to_ascii_lowercase()),
            Err(_) => return AsciiString::new(),
        }
    }

    target
}
