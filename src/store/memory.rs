//! In-memory library store.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use tokio::sync::RwLock;

use super::{FileStream, LibraryStore, validate_path};
use crate::error::{LibraryError, Result};
use crate::library::semantics::LANGUAGE_DIR;
use crate::library::{FullLibraryIdentity, InstalledLibraryRecord, LibraryIdentity, LibraryManifest};

struct Slot {
    manifest: LibraryManifest,
    restricted: bool,
    files: BTreeMap<String, Vec<u8>>,
}

/// Library store that keeps every slot in memory.
///
/// Slots live in a map behind a [`RwLock`], so all trait methods work on
/// `&self`. Useful for tests and for hosts that rebuild their library set on
/// start-up.
#[derive(Default)]
pub struct MemoryStore {
    slots: RwLock<BTreeMap<LibraryIdentity, Slot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a slot, bypassing the install flow.
    ///
    /// Panics if any path fails validation. If test setup is wrong, the test
    /// should not pass.
    pub fn with_library(
        mut self,
        manifest: LibraryManifest,
        files: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>,
    ) -> Self {
        let library = manifest.identity();
        let files = files
            .into_iter()
            .map(|(path, data)| {
                let path = path.into();
                if validate_path(&library, &path).is_err() {
                    panic!("MemoryStore::with_library: invalid path {path}");
                }
                (path, data.into())
            })
            .collect();
        self.slots.get_mut().insert(
            library,
            Slot {
                manifest,
                restricted: false,
                files,
            },
        );
        self
    }
}

#[async_trait]
impl LibraryStore for MemoryStore {
    async fn exists(&self, library: &LibraryIdentity) -> Result<bool> {
        Ok(self.slots.read().await.contains_key(library))
    }

    async fn get_metadata(&self, library: &LibraryIdentity) -> Result<LibraryManifest> {
        self.slots
            .read()
            .await
            .get(library)
            .map(|slot| slot.manifest.clone())
            .ok_or_else(|| LibraryError::NotInstalled(library.clone()))
    }

    async fn add_slot(
        &self,
        manifest: &LibraryManifest,
        restricted: bool,
    ) -> Result<InstalledLibraryRecord> {
        let library = manifest.identity();
        let mut slots = self.slots.write().await;
        if slots.contains_key(&library) {
            return Err(anyhow!("slot for library {} already exists", library).into());
        }
        slots.insert(
            library,
            Slot {
                manifest: manifest.clone(),
                restricted,
                files: BTreeMap::new(),
            },
        );
        Ok(InstalledLibraryRecord::from_manifest(manifest))
    }

    async fn update_metadata(&self, manifest: &LibraryManifest) -> Result<()> {
        let library = manifest.identity();
        let mut slots = self.slots.write().await;
        let slot = slots
            .get_mut(&library)
            .ok_or(LibraryError::NotInstalled(library))?;
        slot.manifest = manifest.clone();
        Ok(())
    }

    async fn delete_slot(&self, library: &LibraryIdentity) -> Result<()> {
        self.slots.write().await.remove(library);
        Ok(())
    }

    async fn clear_files(&self, library: &LibraryIdentity) -> Result<()> {
        let mut slots = self.slots.write().await;
        let slot = slots
            .get_mut(library)
            .ok_or_else(|| LibraryError::NotInstalled(library.clone()))?;
        slot.files.clear();
        Ok(())
    }

    async fn add_file(
        &self,
        library: &LibraryIdentity,
        path: &str,
        mut content: FileStream,
    ) -> Result<()> {
        validate_path(library, path)?;
        if !self.exists(library).await? {
            return Err(LibraryError::NotInstalled(library.clone()));
        }

        let data = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<u8>> {
            let mut buf = Vec::new();
            content.read_to_end(&mut buf)?;
            Ok(buf)
        })
        .await
        .context("File copy task panicked")?
        .with_context(|| format!("Failed to read content for {}", path))?;

        let mut slots = self.slots.write().await;
        // The slot may have been deleted while the stream was read.
        let slot = slots
            .get_mut(library)
            .ok_or_else(|| LibraryError::NotInstalled(library.clone()))?;
        slot.files.insert(path.to_string(), data);
        Ok(())
    }

    async fn file_exists(&self, library: &LibraryIdentity, path: &str) -> Result<bool> {
        Ok(self
            .slots
            .read()
            .await
            .get(library)
            .is_some_and(|slot| slot.files.contains_key(path)))
    }

    async fn get_file_stream(&self, library: &LibraryIdentity, path: &str) -> Result<FileStream> {
        let slots = self.slots.read().await;
        let data = slots
            .get(library)
            .and_then(|slot| slot.files.get(path))
            .ok_or_else(|| LibraryError::FileNotFound {
                library: library.clone(),
                path: path.to_string(),
            })?;
        Ok(Box::new(Cursor::new(data.clone())))
    }

    async fn list_files(&self, library: &LibraryIdentity) -> Result<Vec<String>> {
        let slots = self.slots.read().await;
        let slot = slots
            .get(library)
            .ok_or_else(|| LibraryError::NotInstalled(library.clone()))?;
        Ok(slot.files.keys().cloned().collect())
    }

    async fn list_identities(
        &self,
        machine_name: Option<&str>,
    ) -> Result<Vec<FullLibraryIdentity>> {
        Ok(self
            .slots
            .read()
            .await
            .values()
            .filter(|slot| machine_name.is_none_or(|name| slot.manifest.machine_name == name))
            .map(|slot| slot.manifest.full_identity())
            .collect())
    }

    async fn list_language_codes(&self, library: &LibraryIdentity) -> Result<Vec<String>> {
        let slots = self.slots.read().await;
        let slot = slots
            .get(library)
            .ok_or_else(|| LibraryError::NotInstalled(library.clone()))?;
        let prefix = format!("{LANGUAGE_DIR}/");
        Ok(slot
            .files
            .keys()
            .filter_map(|path| path.strip_prefix(&prefix))
            .filter(|name| !name.contains('/'))
            .filter_map(|name| name.strip_suffix(".json"))
            .map(String::from)
            .collect())
    }
}

impl MemoryStore {
    /// Whether the slot was installed as restricted.
    pub async fn is_restricted(&self, library: &LibraryIdentity) -> Option<bool> {
        self.slots.read().await.get(library).map(|slot| slot.restricted)
    }
}
