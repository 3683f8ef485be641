//! Resource location resolution
//!
//! This module handles resolution of schema locations (URLs, file paths,
//! in-memory identifiers) and the source positions attached to diagnostics.

use crate::error::Result;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Resource location - can be a URL, file path, or string identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// URL (http, https, ftp, etc.)
    Url(Url),
    /// String identifier (for in-memory resources)
    String(String),
}

impl Location {
    /// Create a location from a string (auto-detect type)
    pub fn from_str(s: &str) -> Result<Self> {
        if has_url_scheme(s) {
            let url = Url::parse(s)?;
            if url.scheme() == "file" {
                if let Ok(path) = url.to_file_path() {
                    return Ok(Location::Path(path));
                }
            }
            return Ok(Location::Url(url));
        }

        let path = PathBuf::from(s);
        if path.exists() || path.is_absolute() || s.starts_with('.') || s.ends_with(".xsd") {
            return Ok(Location::Path(path));
        }

        Ok(Location::String(s.to_string()))
    }

    /// Get the location as a string
    pub fn as_str(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::Url(u) => u.to_string(),
            Location::String(s) => s.clone(),
        }
    }

    /// Check if this is a remote location (URL)
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Url(_))
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }
}

/// Resolve a schemaLocation hint against the identifier of the referring
/// document, producing the canonical identifier of the referenced document.
///
/// URL identifiers are joined with URL semantics; everything else is treated
/// as a path relative to the referrer's directory and normalized lexically.
pub fn resolve_reference(base: &str, hint: &str) -> String {
    if has_url_scheme(hint) {
        return match Url::parse(hint) {
            Ok(url) => url.to_string(),
            Err(_) => hint.to_string(),
        };
    }

    if has_url_scheme(base) {
        if let Ok(joined) = Url::parse(base).and_then(|b| b.join(hint)) {
            return joined.to_string();
        }
    }

    let hint_path = Path::new(hint);
    let joined = if hint_path.is_absolute() {
        hint_path.to_path_buf()
    } else {
        match Path::new(base).parent() {
            Some(dir) => dir.join(hint_path),
            None => hint_path.to_path_buf(),
        }
    };
    normalize_path(&joined).to_string_lossy().to_string()
}

/// Lexically normalize a path, folding `.` and `..` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn has_url_scheme(s: &str) -> bool {
    // A single letter before ':' is a Windows drive, not a scheme
    match s.split_once(':') {
        Some((scheme, _)) => {
            scheme.len() > 1
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        }
        None => false,
    }
}

/// Line and column (both 1-based) inside a schema document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextPosition {
    /// Line number
    pub line: usize,
    /// Column number
    pub column: usize,
}

impl TextPosition {
    /// Create a new position
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for TextPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A document identifier plus an optional position inside it
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// Identifier of the schema document
    pub document: String,
    /// Position inside the document, if known
    pub position: Option<TextPosition>,
}

impl SourceLocation {
    /// Create a location pointing at a position in a document
    pub fn new(document: impl Into<String>, position: TextPosition) -> Self {
        Self {
            document: document.into(),
            position: Some(position),
        }
    }

    /// Create a location naming only the document
    pub fn document(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            position: None,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{}:{}", self.document, pos),
            None => write!(f, "{}", self.document),
        }
    }
}

/// Maps byte offsets of a text to line/column positions
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Index the line starts of a text
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    /// Convert a byte offset into a position
    pub fn position(&self, offset: usize) -> TextPosition {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        TextPosition::new(line + 1, offset - self.line_starts[line] + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_url() {
        let loc = Location::from_str("http://example.com/schema.xsd").unwrap();
        assert!(matches!(loc, Location::Url(_)));
        assert!(loc.is_remote());
    }

    #[test]
    fn test_location_from_path() {
        let loc = Location::from_str("/tmp/schema.xsd").unwrap();
        assert!(matches!(loc, Location::Path(_)));
        assert!(loc.is_file());
    }

    #[test]
    fn test_location_as_str() {
        let loc = Location::String("test".to_string());
        assert_eq!(loc.as_str(), "test");
    }

    #[test]
    fn test_resolve_relative_path() {
        assert_eq!(
            resolve_reference("/schemas/main/root.xsd", "../common/types.xsd"),
            "/schemas/common/types.xsd"
        );
        assert_eq!(
            resolve_reference("/schemas/root.xsd", "./types.xsd"),
            "/schemas/types.xsd"
        );
        assert_eq!(resolve_reference("root.xsd", "types.xsd"), "types.xsd");
    }

    #[test]
    fn test_resolve_against_url() {
        assert_eq!(
            resolve_reference("http://example.com/xsd/root.xsd", "types.xsd"),
            "http://example.com/xsd/types.xsd"
        );
        assert_eq!(
            resolve_reference("/local/root.xsd", "http://example.com/other.xsd"),
            "http://example.com/other.xsd"
        );
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.position(0), TextPosition::new(1, 1));
        assert_eq!(index.position(4), TextPosition::new(2, 2));
        assert_eq!(index.position(7), TextPosition::new(4, 1));
    }

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation::new("a.xsd", TextPosition::new(3, 7));
        assert_eq!(loc.to_string(), "a.xsd:3:7");
        assert_eq!(SourceLocation::document("b.xsd").to_string(), "b.xsd");
    }
}
