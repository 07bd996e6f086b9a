//! Trait for the byte streams a [`Session`](crate::Session) runs over.

/// Non-blocking duplex byte stream contract.
///
/// Zero or partial counts from the read/write calls mean the operation
/// would block and are normal; a dead transport is signaled exclusively
/// through [`is_error`](SessionStream::is_error), which is sticky once set.
///
/// Implemented by [`Connection`](crate::Connection) for real sockets and by
/// [`TestStream`](crate::TestStream) for in-memory testing.
pub trait SessionStream {
    /// Number of bytes ready to read without blocking; 0 when none are
    /// pending.
    fn peek(&mut self) -> usize;

    /// Reads up to `buf.len()` bytes without blocking, returning the count
    /// actually read (0 when the read would block).
    fn read_nonblock(&mut self, buf: &mut [u8]) -> usize;

    /// Writes up to `buf.len()` bytes without blocking, returning the count
    /// actually written (0 when the write would block).
    fn write_nonblock(&mut self, buf: &[u8]) -> usize;

    /// True once the transport is dead: hard error or orderly close by the
    /// peer.
    fn is_error(&self) -> bool;

    /// Identifier of the remote end, for log lines.
    fn peer_name(&self) -> &str;
}
