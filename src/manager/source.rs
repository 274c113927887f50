use std::path::{Path, PathBuf};

use anyhow::anyhow;

use crate::error::{LibraryError, Result};
use crate::library::{LibraryManifest, MANIFEST_FILE};
use crate::runtime::{Runtime, walk_files};
use crate::store::{FileStream, validate_machine_name};

/// An unpacked library directory ready to be installed.
#[derive(Debug)]
pub struct InstallSource {
    dir: PathBuf,
    manifest: LibraryManifest,
    files: Vec<String>,
}

impl InstallSource {
    /// Read the manifest and list every other file under `dir`.
    #[tracing::instrument(skip(runtime))]
    pub fn open<R: Runtime + ?Sized>(runtime: &R, dir: &Path) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let unreadable = |source: anyhow::Error| LibraryError::ManifestUnreadable {
            path: manifest_path.clone(),
            source,
        };

        if !runtime.exists(&manifest_path) {
            return Err(unreadable(anyhow!("file not found")));
        }
        let content = runtime.read_to_string(&manifest_path).map_err(unreadable)?;
        let manifest: LibraryManifest =
            serde_json::from_str(&content).map_err(|e| unreadable(e.into()))?;
        validate_machine_name(&manifest.identity()).map_err(unreadable)?;

        let files = walk_files(runtime, dir)?
            .into_iter()
            .filter(|path| path != MANIFEST_FILE)
            .collect();

        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            files,
        })
    }

    pub fn manifest(&self) -> &LibraryManifest {
        &self.manifest
    }

    /// Relative paths of every file to copy, the root manifest excluded.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn open_file<R: Runtime + ?Sized>(&self, runtime: &R, path: &str) -> Result<FileStream> {
        let full_path = path.split('/').fold(self.dir.clone(), |acc, part| acc.join(part));
        Ok(runtime.open(&full_path)?)
    }
}
