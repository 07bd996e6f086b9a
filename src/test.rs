use std::collections::VecDeque;

use crate::stream_traits::SessionStream;

/// An in-memory [`SessionStream`] for exercising sessions without
/// sockets. No data actually goes anywhere.
///
/// Input is scripted with the builder: each [`with_input`] call becomes
/// one segment, delivered the way a socket would deliver separate
/// arrivals. Everything the session writes is captured in [`output`].
///
/// ```
/// # use tiny_serve::TestStream;
/// let stream = TestStream::new()
///     .with_input(b"GET / HTTP/1.1\r\n\r\n")
///     .with_input(b"GET /style.css HTTP/1.1\r\n\r\n");
/// ```
///
/// [`with_input`]: TestStream::with_input
/// [`output`]: TestStream::output
#[derive(Debug)]
pub struct TestStream {
    input: VecDeque<Vec<u8>>,
    output: Vec<u8>,
    error: bool,
    peer: String,
}

impl Default for TestStream {
    fn default() -> Self {
        TestStream {
            input: VecDeque::new(),
            output: Vec::new(),
            error: false,
            peer: "test-peer".to_owned(),
        }
    }
}

impl TestStream {
    /// An empty stream: nothing to read, healthy transport.
    #[must_use]
    pub fn new() -> Self {
        TestStream::default()
    }

    /// Appends one input segment, delivered after all earlier segments
    /// have been consumed.
    #[must_use]
    pub fn with_input(mut self, input: &[u8]) -> Self {
        if !input.is_empty() {
            self.input.push_back(input.to_vec());
        }
        self
    }

    /// Starts the stream in the dead-transport state.
    #[must_use]
    pub fn with_error(mut self) -> Self {
        self.error = true;
        self
    }

    /// Everything written to the stream so far.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }
}

impl SessionStream for TestStream {
    fn peek(&mut self) -> usize {
        self.input.front().map_or(0, Vec::len)
    }

    fn read_nonblock(&mut self, buf: &mut [u8]) -> usize {
        let segment = match self.input.front_mut() {
            Some(segment) => segment,
            None => return 0,
        };

        let count = buf.len().min(segment.len());
        buf[..count].copy_from_slice(&segment[..count]);
        let _ = segment.drain(..count);
        if segment.is_empty() {
            let _ = self.input.pop_front();
        }

        count
    }

    fn write_nonblock(&mut self, buf: &[u8]) -> usize {
        if self.error {
            return 0;
        }
        self.output.extend_from_slice(buf);
        buf.len()
    }

    fn is_error(&self) -> bool {
        self.error
    }

    fn peer_name(&self) -> &str {
        &self.peer
    }
}
