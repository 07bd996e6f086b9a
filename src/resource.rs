//! Resolution of request targets to servable files.

use std::fs::{self, File};
use std::io::{Cursor, Read, Result as IoResult};
use std::path::Path;

use crate::common::ContentType;
use crate::error::SessionError;

/// Literal marker opening an include directive in HTML bodies.
const INCLUDE_MARKER: &[u8] = b"####";

/// Upper bound on nested include construction.
const MAX_INCLUDE_DEPTH: usize = 8;

/// Upper bound on directives expanded within one body.
const MAX_INCLUDES: usize = 64;

/// A resolved, type-tagged, readable file under the document root.
///
/// Constructed once per request and consumed through [`Read`]. HTML
/// resources are materialized up front with their include directives
/// expanded; everything else streams from disk on demand.
#[allow(missing_debug_implementations)]
pub struct Resource {
    name: String,
    size: u64,
    content_type: ContentType,
    body: Body,
}

enum Body {
    Stream(File),
    Expanded(Cursor<Vec<u8>>),
}

impl Resource {
    /// Resolves `target` to a file under `root` and opens it.
    ///
    /// `root` must be in canonical form (see
    /// [`Server::new`](crate::Server::new), which canonicalizes the
    /// configured document root once at startup).
    ///
    /// An empty or root target maps to the document root; a target naming
    /// a directory is completed with `index.html`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotFound`] when the resolved path does not exist
    /// - [`SessionError::Forbidden`] when the canonical path leaves `root`,
    ///   through `../` segments or symlinks alike
    /// - [`SessionError::Internal`] on host I/O failure or a failed
    ///   include expansion
    pub fn open(root: &Path, target: &str) -> Result<Resource, SessionError> {
        Resource::open_at(root, target, 0)
    }

    fn open_at(root: &Path, target: &str, depth: usize) -> Result<Resource, SessionError> {
        if depth > MAX_INCLUDE_DEPTH {
            return Err(SessionError::Internal(format!(
                "include depth over {MAX_INCLUDE_DEPTH} at \"{target}\""
            )));
        }

        let mut name = normalize(target);
        let mut path = root.join(&name);
        if path.is_dir() {
            path.push("index.html");
            if !name.is_empty() && !name.ends_with('/') && !name.ends_with('\\') {
                name.push('/');
            }
            name.push_str("index.html");
        }

        let canonical =
            fs::canonicalize(&path).map_err(|_| SessionError::NotFound(name.clone()))?;
        if !canonical.starts_with(root) {
            return Err(SessionError::Forbidden(name));
        }

        let content_type = ContentType::from_target(&name);

        let body = if content_type == ContentType::Html {
            let raw = fs::read(&canonical)
                .map_err(|err| SessionError::Internal(format!("read \"{name}\": {err}")))?;
            Body::Expanded(Cursor::new(expand_includes(root, raw, depth)?))
        } else {
            let file = File::open(&canonical)
                .map_err(|err| SessionError::Internal(format!("open \"{name}\": {err}")))?;
            Body::Stream(file)
        };

        let size = match &body {
            Body::Stream(file) => {
                file.metadata()
                    .map_err(|err| SessionError::Internal(format!("stat \"{name}\": {err}")))?
                    .len()
            }
            Body::Expanded(cursor) => cursor.get_ref().len() as u64,
        };

        Ok(Resource {
            name,
            size,
            content_type,
            body,
        })
    }

    /// Path of the served file, relative to the document root.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of body bytes a reader will get; for HTML this is the
    /// post-expansion length.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.size
    }

    /// True when the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The content type derived from the resolved path's extension.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }
}

impl Read for Resource {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match &mut self.body {
            Body::Stream(file) => file.read(buf),
            Body::Expanded(cursor) => cursor.read(buf),
        }
    }
}

/// Maps the root target to the document root and strips leading
/// separators, leaving a path safe to join onto the root.
fn normalize(target: &str) -> String {
    target
        .trim_start_matches(|c| c == '/' || c == '\\')
        .to_owned()
}

/// Replaces every valid `####name` directive with the named file's
/// content.
///
/// A directive is valid only when nothing but whitespace separates the
/// marker from the previous newline; anything else is left untouched.
/// Included files pass through the full resolution logic, so the sandbox
/// applies to them too, and scanning resumes at the splice point so
/// included content may itself carry directives.
fn expand_includes(
    root: &Path,
    mut body: Vec<u8>,
    depth: usize,
) -> Result<Vec<u8>, SessionError> {
    let mut pos = 0;
    let mut expanded = 0_usize;

    while let Some(found) = find(&body, INCLUDE_MARKER, pos) {
        if !starts_line(&body, found) {
            pos = found + INCLUDE_MARKER.len();
            continue;
        }

        expanded += 1;
        if expanded > MAX_INCLUDES {
            return Err(SessionError::Internal(format!(
                "more than {MAX_INCLUDES} includes in one body"
            )));
        }

        let name_start = found + INCLUDE_MARKER.len();
        let name_end = body[name_start..]
            .iter()
            .position(u8::is_ascii_whitespace)
            .map_or(body.len(), |n| name_start + n);
        let name = String::from_utf8_lossy(&body[name_start..name_end]).into_owned();

        let included = read_include(root, &name, depth)?;

        let tail = body.split_off(name_end);
        body.truncate(found);
        body.extend_from_slice(&included);
        body.extend_from_slice(&tail);

        // re-scan from the splice point: included content may hold
        // further directives
        pos = found;
    }

    Ok(body)
}

/// Loads the full content of one include target through the regular
/// resolution path. Every failure comes back as `Internal`.
fn read_include(root: &Path, name: &str, depth: usize) -> Result<Vec<u8>, SessionError> {
    if root.join(normalize(name)).is_dir() {
        return Err(SessionError::Internal(format!(
            "include \"{name}\" is a directory"
        )));
    }

    let mut resource = Resource::open_at(root, name, depth + 1).map_err(|err| match err {
        err @ SessionError::Internal(_) => err,
        other => SessionError::Internal(format!("include \"{name}\": {other}")),
    })?;

    #[allow(clippy::cast_possible_truncation)]
    let mut data = Vec::with_capacity(resource.len() as usize);
    let _ = resource
        .read_to_end(&mut data)
        .map_err(|err| SessionError::Internal(format!("include \"{name}\": {err}")))?;

    Ok(data)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|n| from + n)
}

/// True when only whitespace sits between the previous newline (or the
/// start of the body) and `at`.
fn starts_line(body: &[u8], at: usize) -> bool {
    for &byte in body[..at].iter().rev() {
        if byte == b'\n' {
            return true;
        }
        if !byte.is_ascii_whitespace() {
            return false;
        }
    }

    true
}
