use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;

use crate::library::LibraryIdentity;
use crate::manager::LibraryManager;
use crate::runtime::Runtime;
use crate::store::FsStore;

/// Base URL of library files when none is configured.
pub const DEFAULT_BASE_URL: &str = "/libraries";

/// Everything a command needs: the store and how to address its files.
pub struct Config<R: Runtime> {
    pub store: FsStore<R>,
    pub base_url: String,
}

impl<R: Runtime> Config<R> {
    pub fn new(runtime: R, root: Option<PathBuf>, base_url: Option<String>) -> Result<Self> {
        let root = match root {
            Some(path) => path,
            None => default_store_root(&runtime)?,
        };
        debug!("Using store root: {:?}", root);

        let base_url = base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            store: FsStore::new(runtime, root),
            base_url,
        })
    }

    pub fn manager(&self) -> LibraryManager<'_, R, FsStore<R>> {
        let base_url = self.base_url.clone();
        LibraryManager::new(
            self.store.runtime(),
            &self.store,
            move |library: &LibraryIdentity, path: &str| file_url(&base_url, library, path),
        )
    }
}

/// Returns: `<base_url>/<MachineName>-<Major>.<Minor>/<path>`
pub fn file_url(base_url: &str, library: &LibraryIdentity, path: &str) -> String {
    format!("{}/{}/{}", base_url, library, path)
}

/// Get the default store root: `~/.libinstall`
#[tracing::instrument(skip(runtime))]
pub fn default_store_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let home_dir = runtime
        .home_dir()
        .context("Could not find home directory")?;
    Ok(home_dir.join(".libinstall"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;

    #[test]
    fn test_default_store_root() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_home_dir()
            .returning(|| Some(PathBuf::from("/home/user")));

        let config = Config::new(runtime, None, None).unwrap();
        assert_eq!(config.store.root(), PathBuf::from("/home/user/.libinstall"));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_no_home_dir() {
        let mut runtime = MockRuntime::new();
        runtime.expect_home_dir().returning(|| None);

        assert!(Config::new(runtime, None, None).is_err());
    }

    #[test]
    fn test_explicit_root_and_base_url() {
        let runtime = MockRuntime::new();
        let config = Config::new(
            runtime,
            Some(PathBuf::from("/srv/libraries")),
            Some("https://cdn.example.com/libs/".to_string()),
        )
        .unwrap();

        assert_eq!(config.store.root(), PathBuf::from("/srv/libraries"));
        assert_eq!(
            config
                .manager()
                .get_file_url(&LibraryIdentity::new("H5P.Quiz", 1, 2), "js/quiz.js"),
            "https://cdn.example.com/libs/H5P.Quiz-1.2/js/quiz.js"
        );
    }
}
