use derive_more::Display;
use thiserror::Error;

/// A hierarchy node path.
///
/// A path always starts with `/`; a non-root path cannot end with `/`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct NodePath(String);

/// An invalid node path.
#[derive(Debug, Error)]
#[error("invalid node path {0}")]
pub struct NodePathError(String);

impl NodePath {
    /// Create a new node path from `path`.
    ///
    /// # Errors
    /// Returns [`NodePathError`] if `path` is not valid according to [`NodePath::validate()`].
    pub fn new(path: &str) -> Result<Self, NodePathError> {
        if Self::validate(path) {
            Ok(Self(path.to_string()))
        } else {
            Err(NodePathError(path.to_string()))
        }
    }

    /// The root node.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Extract a string slice containing the node path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate a path.
    ///
    /// A valid path starts with `/`, does not end with `/` (unless root), and
    /// has no empty components.
    #[must_use]
    pub fn validate(path: &str) -> bool {
        path.eq("/") || (path.starts_with('/') && !path.ends_with('/') && !path.contains("//"))
    }

    /// Return the path of the child node `name`.
    ///
    /// # Errors
    /// Returns [`NodePathError`] if `name` is empty or contains `/`.
    pub fn join(&self, name: &str) -> Result<Self, NodePathError> {
        if name.is_empty() || name.contains('/') {
            return Err(NodePathError(name.to_string()));
        }
        if self.0 == "/" {
            Ok(Self(format!("/{name}")))
        } else {
            Ok(Self(format!("{}/{name}", self.0)))
        }
    }

    /// Return the name of the node (the last path component).
    ///
    /// The root node has an empty name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Return the path of the parent node, or [`None`] for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0 == "/" {
            return None;
        }
        let parent = &self.0[..self.0.rfind('/').unwrap_or(0)];
        Some(if parent.is_empty() {
            Self::root()
        } else {
            Self(parent.to_string())
        })
    }
}

impl TryFrom<&str> for NodePath {
    type Error = NodePathError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity() {
        assert!(NodePath::new("/").is_ok());
        assert!(NodePath::new("/a/b").is_ok());
        assert!(NodePath::new("a/b").is_err());
        assert!(NodePath::new("/a/b/").is_err());
        assert!(NodePath::new("/a//b").is_err());
    }

    #[test]
    fn join_name_parent() {
        let path = NodePath::root().join("a").unwrap().join("b").unwrap();
        assert_eq!(path.as_str(), "/a/b");
        assert_eq!(path.name(), "b");
        assert_eq!(path.parent().unwrap().as_str(), "/a");
        assert_eq!(path.parent().unwrap().parent().unwrap().as_str(), "/");
        assert!(NodePath::root().parent().is_none());
        assert!(path.join("c/d").is_err());
        assert!(path.join("").is_err());
    }
}
