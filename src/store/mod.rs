//! Library store port and implementations.
//!
//! The [`LibraryStore`] trait is the only storage interface the manager and
//! registry consume. Backends are interchangeable; two ship with this crate:
//! an in-memory store and a file system store.
//!
//! No store method enforces one-build-per-line or monotonic patch versions.
//! Those rules live in [`LibraryManager`](crate::manager::LibraryManager).

mod fs;
mod memory;

pub use self::fs::FsStore;
pub use self::memory::MemoryStore;

use async_trait::async_trait;
use std::io::Read;

use crate::error::Result;
use crate::library::{FullLibraryIdentity, InstalledLibraryRecord, LibraryIdentity, LibraryManifest};

/// Streaming file contents. `'static` so it can move into a blocking task.
pub type FileStream = Box<dyn Read + Send + 'static>;

/// Storage backend for installed libraries.
///
/// A slot is keyed by [`LibraryIdentity`] and holds exactly one manifest plus
/// a set of files addressed by `/`-separated paths relative to the library
/// root.
///
/// # Visibility
/// A slot must become visible to [`exists`](Self::exists) and
/// [`list_identities`](Self::list_identities) only once
/// [`add_slot`](Self::add_slot) has returned. File writes carry no such
/// guarantee.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Check if a slot exists for the line.
    async fn exists(&self, library: &LibraryIdentity) -> Result<bool>;

    /// Load the stored manifest.
    ///
    /// Returns [`NotInstalled`](crate::error::LibraryError::NotInstalled) if
    /// there is no slot.
    async fn get_metadata(&self, library: &LibraryIdentity) -> Result<LibraryManifest>;

    /// Reserve a new slot and persist its manifest. On failure no part of
    /// the slot remains.
    async fn add_slot(
        &self,
        manifest: &LibraryManifest,
        restricted: bool,
    ) -> Result<InstalledLibraryRecord>;

    /// Overwrite the manifest of an existing slot with the same identity.
    async fn update_metadata(&self, manifest: &LibraryManifest) -> Result<()>;

    /// Remove the manifest and every file of a slot. Removing an absent slot
    /// succeeds.
    async fn delete_slot(&self, library: &LibraryIdentity) -> Result<()>;

    /// Remove every file but keep the slot and its manifest.
    async fn clear_files(&self, library: &LibraryIdentity) -> Result<()>;

    /// Write a file from a stream, creating or replacing it.
    async fn add_file(
        &self,
        library: &LibraryIdentity,
        path: &str,
        content: FileStream,
    ) -> Result<()>;

    async fn file_exists(&self, library: &LibraryIdentity, path: &str) -> Result<bool>;

    /// Open a file for streaming reads.
    ///
    /// Returns [`FileNotFound`](crate::error::LibraryError::FileNotFound) if
    /// the file does not exist.
    async fn get_file_stream(&self, library: &LibraryIdentity, path: &str) -> Result<FileStream>;

    /// All file paths of a slot, sorted.
    async fn list_files(&self, library: &LibraryIdentity) -> Result<Vec<String>>;

    /// Identities of every installed build, optionally only those of one
    /// machine name.
    async fn list_identities(&self, machine_name: Option<&str>) -> Result<Vec<FullLibraryIdentity>>;

    /// Codes of the translation files a slot holds.
    ///
    /// Returns [`NotInstalled`](crate::error::LibraryError::NotInstalled) if
    /// there is no slot.
    async fn list_language_codes(&self, library: &LibraryIdentity) -> Result<Vec<String>>;
}

/// Reject paths that could escape a slot.
pub(crate) fn validate_path(library: &LibraryIdentity, path: &str) -> Result<()> {
    let valid = !path.is_empty()
        && !path.starts_with('/')
        && !path.contains('\\')
        && path
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..");
    if valid {
        Ok(())
    } else {
        Err(anyhow::anyhow!("invalid file path '{}' for library {}", path, library).into())
    }
}

/// Reject machine names that cannot serve as a single directory name, or
/// that would not parse back from the `Name-Major.Minor` form.
pub(crate) fn validate_machine_name(library: &LibraryIdentity) -> anyhow::Result<()> {
    let name = library.machine_name.as_str();
    let valid = !name.is_empty()
        && !name.contains(['/', '\\'])
        && name != "."
        && name != ".."
        && LibraryIdentity::parse(&library.to_string()).as_ref() == Some(library);
    if valid {
        Ok(())
    } else {
        Err(anyhow::anyhow!("invalid machine name '{}'", name))
    }
}
