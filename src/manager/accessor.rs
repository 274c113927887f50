//! Read-through accessors on [`LibraryManager`].

use anyhow::Context;
use log::{debug, warn};
use serde::de::DeserializeOwned;

use super::LibraryManager;
use crate::error::{LibraryError, Result};
use crate::library::semantics::{DEFAULT_LANGUAGE, SEMANTICS_FILE, UPGRADES_SCRIPT, language_file};
use crate::library::{LanguageDocument, LibraryIdentity, LibraryManifest, Semantics};
use crate::runtime::Runtime;
use crate::store::{FileStream, LibraryStore};

impl<'a, R: Runtime, S: LibraryStore + ?Sized> LibraryManager<'a, R, S> {
    pub async fn is_installed(&self, library: &LibraryIdentity) -> Result<bool> {
        self.store.exists(library).await
    }

    pub async fn get_metadata(&self, library: &LibraryIdentity) -> Result<LibraryManifest> {
        self.store.get_metadata(library).await
    }

    /// The stored manifest, or `None` when it is absent or cannot be loaded.
    pub async fn get_metadata_if_installed(
        &self,
        library: &LibraryIdentity,
    ) -> Option<LibraryManifest> {
        match self.store.get_metadata(library).await {
            Ok(manifest) => Some(manifest),
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                warn!("Failed to load metadata of {}: {}", library, e);
                None
            }
        }
    }

    pub async fn get_file_stream(
        &self,
        library: &LibraryIdentity,
        path: &str,
    ) -> Result<FileStream> {
        self.store.get_file_stream(library, path).await
    }

    pub async fn file_exists(&self, library: &LibraryIdentity, path: &str) -> Result<bool> {
        self.store.file_exists(library, path).await
    }

    pub async fn list_files(&self, library: &LibraryIdentity) -> Result<Vec<String>> {
        self.store.list_files(library).await
    }

    /// Decode the library's `semantics.json`.
    #[tracing::instrument(skip(self))]
    pub async fn get_semantics(&self, library: &LibraryIdentity) -> Result<Semantics> {
        self.read_json(library, SEMANTICS_FILE).await
    }

    /// Decode the translation for `language`. A missing file gives `None`.
    #[tracing::instrument(skip(self))]
    pub async fn get_language(
        &self,
        library: &LibraryIdentity,
        language: &str,
    ) -> Result<Option<LanguageDocument>> {
        match self.read_json(library, &language_file(language)).await {
            Ok(document) => Ok(Some(document)),
            Err(e) if e.is_not_found() => {
                debug!("No {} translation in {}", language, library);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Language codes the library can be shown in, sorted. Always contains
    /// the language the semantics are written in.
    pub async fn list_languages(&self, library: &LibraryIdentity) -> Result<Vec<String>> {
        let mut codes = match self.store.list_language_codes(library).await {
            Ok(codes) => codes,
            Err(LibraryError::NotInstalled(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        codes.push(DEFAULT_LANGUAGE.to_string());
        codes.sort();
        codes.dedup();
        Ok(codes)
    }

    /// Resolve the URL of a library file. Existence is not checked.
    pub fn get_file_url(&self, library: &LibraryIdentity, path: &str) -> String {
        (self.url_resolver)(library, path)
    }

    /// URL of the library's upgrade script, if it ships one.
    pub async fn get_upgrade_script_path(
        &self,
        library: &LibraryIdentity,
    ) -> Result<Option<String>> {
        if self.store.file_exists(library, UPGRADES_SCRIPT).await? {
            Ok(Some(self.get_file_url(library, UPGRADES_SCRIPT)))
        } else {
            Ok(None)
        }
    }

    async fn read_json<T>(&self, library: &LibraryIdentity, path: &str) -> Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let stream = self.store.get_file_stream(library, path).await?;
        tokio::task::spawn_blocking(move || serde_json::from_reader::<_, T>(stream))
            .await
            .context("JSON decode task panicked")?
            .map_err(|source| LibraryError::Decode {
                library: library.clone(),
                path: path.to_string(),
                source,
            })
    }
}
