//! Installed library registry - read-side queries over a store.

use std::collections::BTreeMap;

use futures_util::future::try_join_all;
use log::debug;

use crate::error::{LibraryError, Result};
use crate::library::{FullLibraryIdentity, InstalledLibraryRecord, LibraryIdentity, LibraryManifest};
use crate::store::LibraryStore;

/// Installed libraries grouped by machine name, each group sorted ascending
/// by version.
pub type InstalledLibraries = BTreeMap<String, Vec<InstalledLibraryRecord>>;

/// Registry - queries what is installed
pub struct LibraryRegistry<'a, S: LibraryStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: LibraryStore + ?Sized> LibraryRegistry<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// List installed libraries, optionally only those of one machine name.
    ///
    /// Slots that disappear between listing and loading their metadata are
    /// left out.
    #[tracing::instrument(skip(self))]
    pub async fn list_installed(&self, machine_name: Option<&str>) -> Result<InstalledLibraries> {
        let identities = self.store.list_identities(machine_name).await?;

        let records = try_join_all(identities.iter().map(|identity| async move {
            match self.store.get_metadata(identity.line()).await {
                Ok(manifest) => Ok(Some(InstalledLibraryRecord::from_manifest(&manifest))),
                Err(LibraryError::NotInstalled(_)) => {
                    debug!("Library {} vanished while listing", identity);
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        }))
        .await?;

        let mut grouped = InstalledLibraries::new();
        for record in records.into_iter().flatten() {
            grouped
                .entry(record.identity.machine_name().to_string())
                .or_default()
                .push(record);
        }
        for records in grouped.values_mut() {
            records.sort_by(|a, b| a.identity.cmp(&b.identity));
        }

        Ok(grouped)
    }

    /// The record installed on a (machine name, major, minor) line, if any.
    pub async fn find_line(
        &self,
        library: &LibraryIdentity,
    ) -> Result<Option<InstalledLibraryRecord>> {
        let mut installed = self.list_installed(Some(&library.machine_name)).await?;
        Ok(installed
            .remove(&library.machine_name)
            .unwrap_or_default()
            .into_iter()
            .find(|record| record.identity.line() == library))
    }

    /// The installed build the manifest would patch.
    ///
    /// Only the manifest's own (major, minor) line is considered. Returns the
    /// installed identity when its patch version is strictly lower than the
    /// manifest's.
    pub async fn find_patch_candidate(
        &self,
        manifest: &LibraryManifest,
    ) -> Result<Option<FullLibraryIdentity>> {
        Ok(self
            .find_line(&manifest.identity())
            .await?
            .filter(|record| record.patch_version() < manifest.patch_version)
            .map(|record| record.identity))
    }

    /// Whether anything installed for the candidate's machine name, on any
    /// line, is already at least as new as the candidate.
    pub async fn has_upgrade(&self, candidate: &FullLibraryIdentity) -> Result<bool> {
        let installed = self.list_installed(Some(candidate.machine_name())).await?;
        let newest = installed
            .get(candidate.machine_name())
            .and_then(|records| records.iter().map(|r| &r.identity).max());
        Ok(newest.is_some_and(|newest| newest >= candidate))
    }
}
