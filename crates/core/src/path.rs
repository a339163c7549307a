//! [`RelativePath`]: a normalized, slash-separated path rooted at the vault.

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum InvalidPathError {
    #[error("path is empty")]
    Empty,
    #[error("path segment '..' is not allowed: {0}")]
    ParentSegment(String),
    #[error("path segment '.' is not allowed: {0}")]
    CurrentSegment(String),
}

/// A slash-separated path rooted at the vault, e.g. `"notes/today.md"`.
///
/// Invariants: no leading slash, no empty segments, no `.`/`..` segments.
/// Comparison and hashing are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RelativePath(String);

impl RelativePath {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, InvalidPathError> {
        let trimmed = raw.as_ref().trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(InvalidPathError::Empty);
        }
        for segment in trimmed.split('/') {
            if segment == ".." {
                return Err(InvalidPathError::ParentSegment(trimmed.to_string()));
            }
            if segment == "." {
                return Err(InvalidPathError::CurrentSegment(trimmed.to_string()));
            }
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final path segment, e.g. `"today.md"` for `"notes/today.md"`.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The parent directory segments, or `None` at the vault root.
    pub fn parent(&self) -> Option<RelativePath> {
        self.0.rsplit_once('/').map(|(dir, _)| RelativePath(dir.to_string()))
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for RelativePath {
    type Error = InvalidPathError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for RelativePath {
    type Error = InvalidPathError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_leading_slash() {
        assert_eq!(RelativePath::new("/a/b").unwrap().as_str(), "a/b");
    }

    #[test]
    fn rejects_parent_segment() {
        assert!(matches!(
            RelativePath::new("a/../b"),
            Err(InvalidPathError::ParentSegment(_))
        ));
    }

    #[test]
    fn rejects_current_segment() {
        assert!(matches!(
            RelativePath::new("./a"),
            Err(InvalidPathError::CurrentSegment(_))
        ));
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(RelativePath::new(""), Err(InvalidPathError::Empty)));
        assert!(matches!(RelativePath::new("/"), Err(InvalidPathError::Empty)));
    }

    #[test]
    fn file_name_and_parent() {
        let p = RelativePath::new("notes/today.md").unwrap();
        assert_eq!(p.file_name(), "today.md");
        assert_eq!(p.parent().unwrap().as_str(), "notes");

        let root = RelativePath::new("today.md").unwrap();
        assert_eq!(root.parent(), None);
    }

    #[test]
    fn case_sensitive_ordering() {
        let a = RelativePath::new("A.md").unwrap();
        let b = RelativePath::new("a.md").unwrap();
        assert_ne!(a, b);
    }
}
