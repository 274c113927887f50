//! Library domain model
//!
//! Identities, version ordering, manifests and the structured documents a
//! library ships with.

mod identity;
mod manifest;
mod record;
pub mod semantics;

pub use identity::{FullLibraryIdentity, LibraryIdentity, compare_versions};
pub use manifest::{FileReference, LibraryManifest, MANIFEST_FILE};
pub use record::{InstallOutcome, InstalledLibraryRecord};
pub use semantics::{LanguageDocument, SemanticField, Semantics};
