use std::collections::HashMap;

use lazy_static::lazy_static;

/// `Content-Type` header values this server emits (closed set).
///
/// The type is derived from the target's file extension alone; anything
/// unknown, including a target without an extension, is served as
/// `application/octet-stream`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[allow(missing_docs)]
pub enum ContentType {
    Css,
    Gif,
    Html,
    Icon,
    JavaScript,
    Jpeg,
    Mp4,
    OctetStream,
    Plain,
    Png,
    Webm,
}

lazy_static! {
    static ref EXTENSION_TYPES: HashMap<&'static str, ContentType> = {
        let mut map = HashMap::new();
        let _ = map.insert("html", ContentType::Html);
        let _ = map.insert("css", ContentType::Css);
        let _ = map.insert("js", ContentType::JavaScript);
        let _ = map.insert("txt", ContentType::Plain);
        let _ = map.insert("ico", ContentType::Icon);
        let _ = map.insert("jpg", ContentType::Jpeg);
        let _ = map.insert("jpeg", ContentType::Jpeg);
        let _ = map.insert("png", ContentType::Png);
        let _ = map.insert("gif", ContentType::Gif);
        let _ = map.insert("webm", ContentType::Webm);
        let _ = map.insert("mp4", ContentType::Mp4);
        map
    };
}

impl ContentType {
    /// Derives the content type from a target path's extension.
    #[must_use]
    pub fn from_target(target: &str) -> ContentType {
        match extension(target) {
            Some(ext) => EXTENSION_TYPES
                .get(ext.to_ascii_lowercase().as_str())
                .copied()
                .unwrap_or(ContentType::OctetStream),
            None => ContentType::OctetStream,
        }
    }

    /// The header value, e.g. `text/html`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Css => "text/css",
            Self::Gif => "image/gif",
            Self::Html => "text/html",
            Self::Icon => "image/x-icon",
            Self::JavaScript => "application/javascript",
            Self::Jpeg => "image/jpeg",
            Self::Mp4 => "video/mp4",
            Self::OctetStream => "application/octet-stream",
            Self::Plain => "text/plain",
            Self::Png => "image/png",
            Self::Webm => "video/webm",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracts the extension by walking backward from the second-to-last
/// character. A path separator reached before any dot means the last
/// component has no extension.
fn extension(target: &str) -> Option<&str> {
    let bytes = target.as_bytes();
    if bytes.len() < 2 {
        return None;
    }

    for i in (0..bytes.len() - 1).rev() {
        match bytes[i] {
            b'/' | b'\\' => return None,
            b'.' => return Some(&target[i + 1..]),
            _ => {}
        }
    }

    None
}
