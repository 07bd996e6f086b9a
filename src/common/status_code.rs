/// Status code of a response.
///
/// The server emits a closed set of codes; everything outside that set
/// falls back to the 500 status line.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct StatusCode(pub u16);

impl StatusCode {
    /// Returns the full status line text for this code, e.g. `200 OK`.
    #[must_use]
    pub fn status_text(&self) -> &'static str {
        match self.0 {
            200 => "200 OK",
            400 => "400 Bad Request",
            404 => "404 Not Found",
            501 => "501 Not Implemented",
            505 => "505 HTTP Version Not Supported",
            _ => "500 Internal Server Error",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> StatusCode {
        StatusCode(code)
    }
}

impl PartialEq<u16> for StatusCode {
    fn eq(&self, other: &u16) -> bool {
        &self.0 == other
    }
}

impl PartialEq<StatusCode> for u16 {
    fn eq(&self, other: &StatusCode) -> bool {
        self == &other.0
    }
}
