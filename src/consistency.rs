//! Post-install consistency check.

use futures_util::future::try_join_all;
use log::debug;

use crate::error::{LibraryError, Result};
use crate::library::LibraryIdentity;
use crate::store::LibraryStore;

/// Verifies that every file a stored manifest preloads exists in the store.
pub struct ConsistencyChecker<'a, S: LibraryStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: LibraryStore + ?Sized> ConsistencyChecker<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Reload the persisted manifest and check each `preloadedJs` and
    /// `preloadedCss` path.
    ///
    /// Fails with [`FileMissing`](LibraryError::FileMissing) listing every
    /// absent path, in manifest order.
    #[tracing::instrument(skip(self))]
    pub async fn check(&self, library: &LibraryIdentity) -> Result<()> {
        let manifest = self.store.get_metadata(library).await?;
        let paths: Vec<&str> = manifest.preloaded_paths().collect();

        let present = try_join_all(
            paths
                .iter()
                .map(|path| self.store.file_exists(library, path)),
        )
        .await?;

        let missing: Vec<String> = paths
            .iter()
            .zip(present)
            .filter(|(_, exists)| !exists)
            .map(|(path, _)| path.to_string())
            .collect();

        if missing.is_empty() {
            debug!("All {} preloaded files of {} present", paths.len(), library);
            Ok(())
        } else {
            Err(LibraryError::FileMissing {
                library: manifest.full_identity(),
                paths: missing,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{FileReference, LibraryManifest};
    use crate::store::MemoryStore;

    fn manifest(js: &[&str], css: &[&str]) -> LibraryManifest {
        let mut manifest: LibraryManifest = serde_json::from_value(serde_json::json!({
            "machineName": "A",
            "majorVersion": 1,
            "minorVersion": 0,
            "patchVersion": 2
        }))
        .unwrap();
        manifest.preloaded_js = js.iter().map(|p| FileReference::new(*p)).collect();
        manifest.preloaded_css = css.iter().map(|p| FileReference::new(*p)).collect();
        manifest
    }

    #[tokio::test]
    async fn test_all_present() {
        let store = MemoryStore::new().with_library(
            manifest(&["a.js"], &["a.css"]),
            [("a.js", "x"), ("a.css", "y")],
        );

        ConsistencyChecker::new(&store)
            .check(&LibraryIdentity::new("A", 1, 0))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_collects_every_missing_path() {
        let store = MemoryStore::new().with_library(
            manifest(&["a.js", "b.js"], &["a.css", "b.css"]),
            [("b.js", "x")],
        );

        let err = ConsistencyChecker::new(&store)
            .check(&LibraryIdentity::new("A", 1, 0))
            .await
            .unwrap_err();

        match err {
            LibraryError::FileMissing { library, paths } => {
                assert_eq!(library.to_string(), "A-1.0.2");
                assert_eq!(paths, vec!["a.js", "a.css", "b.css"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_not_installed() {
        let store = MemoryStore::new();
        let err = ConsistencyChecker::new(&store)
            .check(&LibraryIdentity::new("A", 1, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::NotInstalled(_)));
    }
}
