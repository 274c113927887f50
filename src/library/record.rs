use serde::{Deserialize, Serialize};

use super::{FullLibraryIdentity, LibraryManifest};

/// Listing view of an installed library. Carries no file contents.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstalledLibraryRecord {
    #[serde(flatten)]
    pub identity: FullLibraryIdentity,
    pub title: String,
    pub runnable: bool,
}

impl InstalledLibraryRecord {
    pub fn from_manifest(manifest: &LibraryManifest) -> Self {
        Self {
            identity: manifest.full_identity(),
            title: manifest.title.clone(),
            runnable: manifest.runnable,
        }
    }

    pub fn patch_version(&self) -> u32 {
        self.identity.patch_version
    }
}

/// What [`install_from_source`](crate::manager::LibraryManager::install_from_source)
/// did with a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// A new slot was created.
    New { identity: FullLibraryIdentity },
    /// An existing slot was replaced by a newer patch.
    Patch {
        old_identity: FullLibraryIdentity,
        new_identity: FullLibraryIdentity,
    },
    /// The installed build is the same or newer; storage was not touched.
    None,
}

impl InstallOutcome {
    /// Identity of the build now installed, if storage changed.
    pub fn installed(&self) -> Option<&FullLibraryIdentity> {
        match self {
            InstallOutcome::New { identity } => Some(identity),
            InstallOutcome::Patch { new_identity, .. } => Some(new_identity),
            InstallOutcome::None => None,
        }
    }
}
