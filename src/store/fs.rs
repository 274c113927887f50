//! File system library store.
//!
//! Directory structure:
//!
//! ```text
//! <root>/<MachineName>-<Major>.<Minor>/library.json   manifest, presence marks the slot
//! <root>/<MachineName>-<Major>.<Minor>/slot.json      store-private slot flags
//! <root>/<MachineName>-<Major>.<Minor>/content/...    library files
//! ```

use anyhow::Context;
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{FileStream, LibraryStore, validate_machine_name, validate_path};
use crate::error::{LibraryError, Result};
use crate::library::semantics::LANGUAGE_DIR;
use crate::library::{
    FullLibraryIdentity, InstalledLibraryRecord, LibraryIdentity, LibraryManifest, MANIFEST_FILE,
};
use crate::runtime::{Runtime, walk_files};

const SLOT_FILE: &str = "slot.json";
const CONTENT_DIR: &str = "content";

#[derive(Serialize, Deserialize, Debug, Default)]
struct SlotFlags {
    restricted: bool,
}

/// Library store on a local directory tree.
pub struct FsStore<R: Runtime> {
    runtime: R,
    root: PathBuf,
}

impl<R: Runtime> FsStore<R> {
    pub fn new(runtime: R, root: PathBuf) -> Self {
        Self { runtime, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Returns: `<root>/<MachineName>-<Major>.<Minor>`
    pub fn slot_dir(&self, library: &LibraryIdentity) -> PathBuf {
        self.root.join(library.to_string())
    }

    /// Returns: `<root>/<MachineName>-<Major>.<Minor>/library.json`
    pub fn manifest_path(&self, library: &LibraryIdentity) -> PathBuf {
        self.slot_dir(library).join(MANIFEST_FILE)
    }

    fn content_dir(&self, library: &LibraryIdentity) -> PathBuf {
        self.slot_dir(library).join(CONTENT_DIR)
    }

    fn file_path(&self, library: &LibraryIdentity, path: &str) -> PathBuf {
        path.split('/')
            .fold(self.content_dir(library), |acc, part| acc.join(part))
    }

    fn require_slot(&self, library: &LibraryIdentity) -> Result<()> {
        if self.runtime.exists(&self.manifest_path(library)) {
            Ok(())
        } else {
            Err(LibraryError::NotInstalled(library.clone()))
        }
    }

    /// Write the manifest next to its final location and rename it into
    /// place, so readers never observe a half-written file.
    fn write_manifest(&self, manifest: &LibraryManifest) -> anyhow::Result<()> {
        let target = self.manifest_path(&manifest.identity());
        let staging = target.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(manifest)?;
        self.runtime.write(&staging, content.as_bytes())?;
        self.runtime
            .rename(&staging, &target)
            .with_context(|| format!("Failed to save metadata to {:?}", target))
    }

    /// Create the slot directory, its flags and finally its manifest.
    fn create_slot(&self, manifest: &LibraryManifest, restricted: bool) -> anyhow::Result<()> {
        let library = manifest.identity();
        let slot_dir = self.slot_dir(&library);
        debug!("Creating slot directory: {:?}", slot_dir);
        self.runtime.create_dir_all(&self.content_dir(&library))?;

        let flags = serde_json::to_string(&SlotFlags { restricted })
            .context("Failed to encode slot flags")?;
        self.runtime.write(&slot_dir.join(SLOT_FILE), flags.as_bytes())?;

        // The manifest goes last: its presence is what makes the slot visible.
        self.write_manifest(manifest)
    }

    fn load_flags(&self, library: &LibraryIdentity) -> SlotFlags {
        let path = self.slot_dir(library).join(SLOT_FILE);
        if !self.runtime.exists(&path) {
            return SlotFlags::default();
        }
        let flags = self
            .runtime
            .read_to_string(&path)
            .and_then(|content| Ok(serde_json::from_str(&content)?));
        match flags {
            Ok(flags) => flags,
            Err(e) => {
                warn!("Failed to load slot flags from {:?}: {}", path, e);
                SlotFlags::default()
            }
        }
    }

    /// Whether the slot was installed as restricted.
    pub fn is_restricted(&self, library: &LibraryIdentity) -> bool {
        self.load_flags(library).restricted
    }
}

#[async_trait]
impl<R: Runtime> LibraryStore for FsStore<R> {
    async fn exists(&self, library: &LibraryIdentity) -> Result<bool> {
        Ok(self.runtime.exists(&self.manifest_path(library)))
    }

    #[tracing::instrument(skip(self))]
    async fn get_metadata(&self, library: &LibraryIdentity) -> Result<LibraryManifest> {
        self.require_slot(library)?;
        let path = self.manifest_path(library);
        let manifest = LibraryManifest::load(&self.runtime, &path)
            .with_context(|| format!("Failed to load metadata from {:?}", path))?;
        Ok(manifest)
    }

    #[tracing::instrument(skip(self, manifest))]
    async fn add_slot(
        &self,
        manifest: &LibraryManifest,
        restricted: bool,
    ) -> Result<InstalledLibraryRecord> {
        let library = manifest.identity();
        validate_machine_name(&library)?;
        if self.exists(&library).await? {
            return Err(anyhow::anyhow!("slot for library {} already exists", library).into());
        }

        if let Err(e) = self.create_slot(manifest, restricted) {
            // Without a manifest the directory is not a slot; leave nothing behind.
            let slot_dir = self.slot_dir(&library);
            if self.runtime.exists(&slot_dir)
                && let Err(cleanup) = self.runtime.remove_dir_all(&slot_dir)
            {
                warn!("Failed to remove partial slot {:?}: {}", slot_dir, cleanup);
            }
            return Err(e.into());
        }

        Ok(InstalledLibraryRecord::from_manifest(manifest))
    }

    #[tracing::instrument(skip(self, manifest))]
    async fn update_metadata(&self, manifest: &LibraryManifest) -> Result<()> {
        validate_machine_name(&manifest.identity())?;
        self.require_slot(&manifest.identity())?;
        self.write_manifest(manifest)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_slot(&self, library: &LibraryIdentity) -> Result<()> {
        let slot_dir = self.slot_dir(library);
        if self.runtime.exists(&slot_dir) {
            debug!("Removing slot directory: {:?}", slot_dir);
            self.runtime.remove_dir_all(&slot_dir)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn clear_files(&self, library: &LibraryIdentity) -> Result<()> {
        self.require_slot(library)?;
        let content_dir = self.content_dir(library);
        if self.runtime.exists(&content_dir) {
            self.runtime.remove_dir_all(&content_dir)?;
        }
        self.runtime.create_dir_all(&content_dir)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, content))]
    async fn add_file(
        &self,
        library: &LibraryIdentity,
        path: &str,
        mut content: FileStream,
    ) -> Result<()> {
        validate_path(library, path)?;
        self.require_slot(library)?;

        let target = self.file_path(library, path);
        if let Some(parent) = target.parent()
            && !self.runtime.exists(parent)
        {
            self.runtime.create_dir_all(parent)?;
        }

        let mut writer = self.runtime.create_file(&target)?;
        let written = tokio::task::spawn_blocking(move || -> std::io::Result<u64> {
            let written = std::io::copy(&mut content, &mut writer)?;
            writer.flush()?;
            Ok(written)
        })
        .await
        .context("File copy task panicked")?
        .with_context(|| format!("Failed to write {:?}", target))?;

        debug!("Wrote {} bytes to {:?}", written, target);
        Ok(())
    }

    async fn file_exists(&self, library: &LibraryIdentity, path: &str) -> Result<bool> {
        if validate_path(library, path).is_err() {
            return Ok(false);
        }
        let target = self.file_path(library, path);
        Ok(self.runtime.exists(&target) && !self.runtime.is_dir(&target))
    }

    async fn get_file_stream(&self, library: &LibraryIdentity, path: &str) -> Result<FileStream> {
        if !self.file_exists(library, path).await? {
            return Err(LibraryError::FileNotFound {
                library: library.clone(),
                path: path.to_string(),
            });
        }
        Ok(self.runtime.open(&self.file_path(library, path))?)
    }

    #[tracing::instrument(skip(self))]
    async fn list_files(&self, library: &LibraryIdentity) -> Result<Vec<String>> {
        self.require_slot(library)?;
        Ok(walk_files(&self.runtime, &self.content_dir(library))?)
    }

    #[tracing::instrument(skip(self))]
    async fn list_identities(
        &self,
        machine_name: Option<&str>,
    ) -> Result<Vec<FullLibraryIdentity>> {
        let mut identities = Vec::new();
        if !self.runtime.exists(&self.root) {
            return Ok(identities);
        }

        for slot_dir in self.runtime.read_dir(&self.root)? {
            if !self.runtime.is_dir(&slot_dir) {
                continue;
            }
            let Some(library) = slot_dir
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(LibraryIdentity::parse)
            else {
                continue;
            };
            if machine_name.is_some_and(|name| name != library.machine_name) {
                continue;
            }

            let manifest_path = slot_dir.join(MANIFEST_FILE);
            if !self.runtime.exists(&manifest_path) {
                continue;
            }
            match LibraryManifest::load(&self.runtime, &manifest_path) {
                Ok(manifest) => identities.push(manifest.full_identity()),
                Err(e) => {
                    warn!("Failed to load metadata from {:?}: {}", manifest_path, e);
                }
            }
        }

        Ok(identities)
    }

    async fn list_language_codes(&self, library: &LibraryIdentity) -> Result<Vec<String>> {
        self.require_slot(library)?;
        let language_dir = self.content_dir(library).join(LANGUAGE_DIR);
        if !self.runtime.exists(&language_dir) {
            return Ok(vec![]);
        }

        let mut codes: Vec<String> = self
            .runtime
            .read_dir(&language_dir)?
            .into_iter()
            .filter(|entry| !self.runtime.is_dir(entry))
            .filter_map(|entry| {
                let name = entry.file_name()?.to_str()?;
                name.strip_suffix(".json").map(String::from)
            })
            .collect();
        codes.sort();
        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use mockall::predicate::eq;
    use std::io::{Cursor, Read};
    use tempfile::tempdir;

    fn manifest(name: &str, major: u32, minor: u32, patch: u32) -> LibraryManifest {
        serde_json::from_value(serde_json::json!({
            "machineName": name,
            "majorVersion": major,
            "minorVersion": minor,
            "patchVersion": patch,
            "title": name,
            "author": "someone"
        }))
        .unwrap()
    }

    fn stream(data: &'static [u8]) -> FileStream {
        Box::new(Cursor::new(data))
    }

    #[test]
    fn test_paths() {
        let store = FsStore::new(MockRuntime::new(), PathBuf::from("/root"));
        let lib = LibraryIdentity::new("H5P.Text", 1, 2);

        assert_eq!(store.slot_dir(&lib), PathBuf::from("/root/H5P.Text-1.2"));
        assert_eq!(
            store.manifest_path(&lib),
            PathBuf::from("/root/H5P.Text-1.2/library.json")
        );
        assert_eq!(
            store.file_path(&lib, "js/a.js"),
            PathBuf::from("/root/H5P.Text-1.2/content/js/a.js")
        );
    }

    #[tokio::test]
    async fn test_exists_checks_manifest() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(PathBuf::from("/root/A-1.0/library.json")))
            .returning(|_| true);

        let store = FsStore::new(runtime, PathBuf::from("/root"));
        assert!(store.exists(&LibraryIdentity::new("A", 1, 0)).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_metadata_not_installed() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);

        let store = FsStore::new(runtime, PathBuf::from("/root"));
        let err = store
            .get_metadata(&LibraryIdentity::new("A", 1, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::NotInstalled(_)));
    }

    #[tokio::test]
    async fn test_round_trip_on_disk() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(RealRuntime, dir.path().to_path_buf());
        let m = manifest("A", 1, 0, 3);
        let lib = m.identity();

        store.add_slot(&m, true).await.unwrap();
        assert!(store.exists(&lib).await.unwrap());
        assert!(store.is_restricted(&lib));
        assert!(!dir.path().join("A-1.0/library.json.tmp").exists());

        store.add_file(&lib, "js/a.js", stream(b"alert(1)")).await.unwrap();
        store.add_file(&lib, "language/de.json", stream(b"{}")).await.unwrap();
        assert!(store.file_exists(&lib, "js/a.js").await.unwrap());
        assert!(!store.file_exists(&lib, "js").await.unwrap());

        let mut content = String::new();
        store
            .get_file_stream(&lib, "js/a.js")
            .await
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "alert(1)");

        assert_eq!(
            store.list_files(&lib).await.unwrap(),
            vec!["js/a.js", "language/de.json"]
        );
        assert_eq!(store.list_language_codes(&lib).await.unwrap(), vec!["de"]);

        let loaded = store.get_metadata(&lib).await.unwrap();
        assert_eq!(loaded, m);
        assert_eq!(loaded.extra["author"], "someone");

        assert_eq!(
            store.list_identities(None).await.unwrap(),
            vec![FullLibraryIdentity::new("A", 1, 0, 3)]
        );
        assert!(store.list_identities(Some("B")).await.unwrap().is_empty());

        store.clear_files(&lib).await.unwrap();
        assert!(store.list_files(&lib).await.unwrap().is_empty());
        assert!(store.exists(&lib).await.unwrap());

        store.update_metadata(&manifest("A", 1, 0, 4)).await.unwrap();
        assert_eq!(store.get_metadata(&lib).await.unwrap().patch_version, 4);

        store.delete_slot(&lib).await.unwrap();
        assert!(!store.exists(&lib).await.unwrap());
        assert!(!dir.path().join("A-1.0").exists());
        store.delete_slot(&lib).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_identities_skips_incomplete_slots() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("A-1.0/content")).unwrap();
        std::fs::create_dir_all(dir.path().join("not-a-slot")).unwrap();
        std::fs::write(dir.path().join("B-2.0.json"), "{}").unwrap();

        let store = FsStore::new(RealRuntime, dir.path().to_path_buf());
        assert!(store.list_identities(None).await.unwrap().is_empty());
        assert!(
            !store
                .exists(&LibraryIdentity::new("A", 1, 0))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_add_file_rejects_escaping_path() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(RealRuntime, dir.path().to_path_buf());
        let m = manifest("A", 1, 0, 0);
        store.add_slot(&m, false).await.unwrap();

        let result = store
            .add_file(&m.identity(), "../escape.js", stream(b"x"))
            .await;
        assert!(result.is_err());
        assert!(!dir.path().join("A-1.0/escape.js").exists());
    }

    #[tokio::test]
    async fn test_add_slot_rejects_unsafe_machine_names() {
        let base = tempdir().unwrap();
        let root = base.path().join("store");
        std::fs::create_dir(&root).unwrap();
        let store = FsStore::new(RealRuntime, root.clone());

        for name in ["../escaped", "H5P/Sub"] {
            let err = store
                .add_slot(&manifest(name, 1, 0, 0), false)
                .await
                .unwrap_err();
            assert!(matches!(err, LibraryError::Store(_)), "accepted {name:?}");
            assert!(
                store
                    .update_metadata(&manifest(name, 1, 0, 1))
                    .await
                    .is_err()
            );
        }

        assert!(!base.path().join("escaped-1.0").exists());
        assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_add_slot_removes_partial_slot_on_failure() {
        let mut runtime = MockRuntime::new();
        let slot_dir = PathBuf::from("/root/A-1.0");

        // Nothing is installed yet, but the half-created directory exists
        runtime
            .expect_exists()
            .returning(|p| !p.ends_with("library.json"));
        runtime.expect_create_dir_all().returning(|_| Ok(()));
        runtime.expect_write().returning(|_, _| Ok(()));
        runtime
            .expect_rename()
            .returning(|_, _| Err(anyhow::anyhow!("disk full")));
        runtime
            .expect_remove_dir_all()
            .with(eq(slot_dir))
            .times(1)
            .returning(|_| Ok(()));

        let store = FsStore::new(runtime, PathBuf::from("/root"));
        let err = store
            .add_slot(&manifest("A", 1, 0, 0), false)
            .await
            .unwrap_err();
        match err {
            LibraryError::Store(e) => assert_eq!(e.root_cause().to_string(), "disk full"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_corrupt_slot_flags_read_as_unrestricted() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(RealRuntime, dir.path().to_path_buf());
        let m = manifest("A", 1, 0, 0);
        store.add_slot(&m, true).await.unwrap();
        std::fs::write(dir.path().join("A-1.0/slot.json"), "{ not json").unwrap();

        assert!(!store.is_restricted(&m.identity()));
        assert!(store.exists(&m.identity()).await.unwrap());
    }
}
