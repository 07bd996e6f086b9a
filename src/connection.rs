//! Non-blocking TCP transport.

use std::io::{ErrorKind as IoErrorKind, Read, Result as IoResult, Write};
use std::net::TcpStream;

use crate::stream_traits::SessionStream;

/// A [`TcpStream`] in non-blocking mode, adapted to the
/// [`SessionStream`] contract.
///
/// Would-block results are mapped to zero counts; a hard I/O error or an
/// orderly close by the peer latches the error flag, after which the
/// stream reports dead forever.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: String,
    error: bool,
}

impl Connection {
    /// Switches `stream` to non-blocking mode and takes ownership of it.
    ///
    /// # Errors
    ///
    /// `std::io::Error` when the socket rejects non-blocking mode.
    pub fn new(stream: TcpStream) -> IoResult<Connection> {
        stream.set_nonblocking(true)?;
        let peer = stream
            .peer_addr()
            .map_or_else(|_| String::from("unknown"), |addr| addr.to_string());

        Ok(Connection {
            stream,
            peer,
            error: false,
        })
    }
}

impl SessionStream for Connection {
    fn peek(&mut self) -> usize {
        let mut probe = [0_u8; 512];
        match self.stream.peek(&mut probe) {
            // an orderly shutdown by the peer reads as 0 available bytes
            Ok(0) => {
                self.error = true;
                0
            }
            Ok(count) => count,
            Err(ref err) if err.kind() == IoErrorKind::WouldBlock => 0,
            Err(_) => {
                self.error = true;
                0
            }
        }
    }

    fn read_nonblock(&mut self, buf: &mut [u8]) -> usize {
        match self.stream.read(buf) {
            Ok(0) => {
                self.error = true;
                0
            }
            Ok(count) => count,
            Err(ref err)
                if err.kind() == IoErrorKind::WouldBlock
                    || err.kind() == IoErrorKind::Interrupted =>
            {
                0
            }
            Err(_) => {
                self.error = true;
                0
            }
        }
    }

    fn write_nonblock(&mut self, buf: &[u8]) -> usize {
        match self.stream.write(buf) {
            Ok(count) => count,
            Err(ref err)
                if err.kind() == IoErrorKind::WouldBlock
                    || err.kind() == IoErrorKind::Interrupted =>
            {
                0
            }
            Err(_) => {
                self.error = true;
                0
            }
        }
    }

    fn is_error(&self) -> bool {
        self.error
    }

    fn peer_name(&self) -> &str {
        &self.peer
    }
}
