//! Library manager - orchestrates the install flow.
//!
//! This use case coordinates:
//! - Reading the install source
//! - Deciding between a fresh install, a patch update or nothing
//! - Streaming files into the store
//! - Consistency verification
//! - Removing the slot again when any of the above fails
//!
//! Concurrent installs of the same library line must be serialized by the
//! caller.

mod accessor;
mod source;

use std::path::Path;

use futures_util::stream::{self, TryStreamExt};
use log::{debug, info, warn};

use crate::consistency::ConsistencyChecker;
use crate::error::{LibraryError, Result};
use crate::library::{FullLibraryIdentity, InstallOutcome, LibraryIdentity};
use crate::registry::LibraryRegistry;
use crate::runtime::Runtime;
use crate::store::LibraryStore;

pub use source::InstallSource;

/// Files copied into the store at the same time during an install.
const COPY_CONCURRENCY: usize = 8;

/// Computes the externally addressable URL of a library file.
pub type FileUrlResolver = Box<dyn Fn(&LibraryIdentity, &str) -> String + Send + Sync>;

/// Options for an install
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    /// Installing the library requires elevated permission. Passed through
    /// to the store.
    pub restricted: bool,
}

impl InstallOptions {
    pub fn restricted() -> Self {
        Self { restricted: true }
    }

    pub fn unrestricted() -> Self {
        Self { restricted: false }
    }
}

/// Library manager - installs libraries into a store and reads them back.
pub struct LibraryManager<'a, R: Runtime, S: LibraryStore + ?Sized> {
    runtime: &'a R,
    store: &'a S,
    url_resolver: FileUrlResolver,
}

impl<'a, R: Runtime, S: LibraryStore + ?Sized> LibraryManager<'a, R, S> {
    pub fn new(
        runtime: &'a R,
        store: &'a S,
        url_resolver: impl Fn(&LibraryIdentity, &str) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            runtime,
            store,
            url_resolver: Box::new(url_resolver),
        }
    }

    pub fn registry(&self) -> LibraryRegistry<'a, S> {
        LibraryRegistry::new(self.store)
    }

    /// Install or patch the library in `source_dir`.
    ///
    /// Returns [`InstallOutcome::None`] without touching the store when the
    /// installed build on the same line is at least as new. A failed install
    /// never leaves a slot behind; a failed patch update removes the slot
    /// entirely, so the previous build is gone as well.
    #[tracing::instrument(skip(self))]
    pub async fn install_from_source(
        &self,
        source_dir: &Path,
        options: InstallOptions,
    ) -> Result<InstallOutcome> {
        let source = InstallSource::open(self.runtime, source_dir)?;
        let incoming = source.manifest().full_identity();

        match self.registry().find_line(incoming.line()).await? {
            None => {
                info!("Installing {}", incoming);
                self.install_new(&source, options).await
            }
            Some(installed) if installed.patch_version() < incoming.patch_version => {
                info!("Updating {} to {}", installed.identity, incoming);
                self.apply_patch(&source, installed.identity).await
            }
            Some(installed) => {
                info!(
                    "{} is already installed, skipping {}",
                    installed.identity, incoming
                );
                Ok(InstallOutcome::None)
            }
        }
    }

    async fn install_new(
        &self,
        source: &InstallSource,
        options: InstallOptions,
    ) -> Result<InstallOutcome> {
        let manifest = source.manifest();
        let library = manifest.identity();

        // A failed add_slot leaves nothing behind, so there is no slot to remove.
        let record = self.store.add_slot(manifest, options.restricted).await?;

        if let Err(e) = self.copy_and_verify(source, &library).await {
            return Err(self.rollback(&library, e).await);
        }

        Ok(InstallOutcome::New {
            identity: record.identity,
        })
    }

    async fn apply_patch(
        &self,
        source: &InstallSource,
        old_identity: FullLibraryIdentity,
    ) -> Result<InstallOutcome> {
        let manifest = source.manifest();
        let library = manifest.identity();

        self.store.update_metadata(manifest).await?;

        // Once the old files are cleared there is nothing to revert to.
        let result = async {
            self.store.clear_files(&library).await?;
            self.copy_and_verify(source, &library).await
        }
        .await;
        if let Err(e) = result {
            return Err(self.rollback(&library, e).await);
        }

        Ok(InstallOutcome::Patch {
            old_identity,
            new_identity: manifest.full_identity(),
        })
    }

    async fn copy_and_verify(
        &self,
        source: &InstallSource,
        library: &LibraryIdentity,
    ) -> Result<()> {
        self.copy_files(source, library).await?;
        ConsistencyChecker::new(self.store).check(library).await
    }

    /// Stream every source file into the slot. Copies are independent, so
    /// they run concurrently and in no particular order.
    async fn copy_files(&self, source: &InstallSource, library: &LibraryIdentity) -> Result<()> {
        stream::iter(source.files().iter().map(Ok::<_, LibraryError>))
            .try_for_each_concurrent(COPY_CONCURRENCY, |path| async move {
                debug!("Copying {} into {}", path, library);
                let content = source.open_file(self.runtime, path)?;
                self.store.add_file(library, path, content).await
            })
            .await
    }

    /// Delete the slot after a failed install and return the error to report.
    async fn rollback(&self, library: &LibraryIdentity, error: LibraryError) -> LibraryError {
        warn!("Installing {} failed, removing it: {}", library, error);
        match self.store.delete_slot(library).await {
            Ok(()) => error,
            Err(cleanup) => {
                warn!("Failed to remove {}: {}", library, cleanup);
                LibraryError::RollbackFailed {
                    library: library.clone(),
                    original: Box::new(error),
                    cleanup: Box::new(cleanup),
                }
            }
        }
    }
}
