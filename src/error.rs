//! Error types for library management.

use std::path::PathBuf;

use thiserror::Error;

use crate::library::{FullLibraryIdentity, LibraryIdentity};

pub type Result<T, E = LibraryError> = std::result::Result<T, E>;

/// Errors raised by the store port, the registry and the manager.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The library has no slot in the store.
    #[error("library {0} is not installed")]
    NotInstalled(LibraryIdentity),

    /// A single file requested from an installed library does not exist.
    #[error("file '{path}' not found in library {library}")]
    FileNotFound {
        library: LibraryIdentity,
        path: String,
    },

    /// The install source has no readable `library.json`.
    #[error("cannot read library manifest at {}: {source}", path.display())]
    ManifestUnreadable {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Files declared by the manifest are absent from the store after
    /// install.
    #[error("library {library} is missing declared files: {}", paths.join(", "))]
    FileMissing {
        library: FullLibraryIdentity,
        paths: Vec<String>,
    },

    /// A JSON document shipped with a library is malformed.
    #[error("cannot decode '{path}' of library {library}: {source}")]
    Decode {
        library: LibraryIdentity,
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The storage backend failed.
    #[error(transparent)]
    Store(#[from] anyhow::Error),

    /// An install failed and deleting the partial slot failed as well.
    #[error("{original}; removing {library} afterwards also failed: {cleanup}")]
    RollbackFailed {
        library: LibraryIdentity,
        #[source]
        original: Box<LibraryError>,
        cleanup: Box<LibraryError>,
    },
}

impl LibraryError {
    /// Whether the error only says something is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LibraryError::NotInstalled(_) | LibraryError::FileNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_missing_lists_every_path() {
        let err = LibraryError::FileMissing {
            library: FullLibraryIdentity::new("A", 1, 0, 2),
            paths: vec!["a.js".into(), "b.css".into()],
        };
        assert_eq!(
            err.to_string(),
            "library A-1.0.2 is missing declared files: a.js, b.css"
        );
    }

    #[test]
    fn test_rollback_failed_surfaces_both_errors() {
        let err = LibraryError::RollbackFailed {
            library: LibraryIdentity::new("A", 1, 0),
            original: Box::new(LibraryError::Store(anyhow::anyhow!("disk full"))),
            cleanup: Box::new(LibraryError::Store(anyhow::anyhow!("permission denied"))),
        };
        let message = err.to_string();
        assert!(message.contains("disk full"));
        assert!(message.contains("permission denied"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_is_not_found() {
        assert!(LibraryError::NotInstalled(LibraryIdentity::new("A", 1, 0)).is_not_found());
        assert!(!LibraryError::Store(anyhow::anyhow!("boom")).is_not_found());
    }
}
