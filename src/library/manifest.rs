use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use super::{FullLibraryIdentity, LibraryIdentity};
use crate::runtime::Runtime;

/// File name of the manifest at the root of an install source and of a slot.
pub const MANIFEST_FILE: &str = "library.json";

/// Library descriptor as read from `library.json`.
///
/// Only the identity, title, runnable flag and preloaded file lists are
/// interpreted. Every other field is kept in `extra` and written back
/// unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LibraryManifest {
    pub machine_name: String,
    pub major_version: u32,
    pub minor_version: u32,
    pub patch_version: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "flag")]
    pub runnable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preloaded_js: Vec<FileReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preloaded_css: Vec<FileReference>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A file path declared by a manifest, relative to the library root.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub path: String,
}

impl FileReference {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl LibraryManifest {
    pub fn identity(&self) -> LibraryIdentity {
        LibraryIdentity::new(
            self.machine_name.clone(),
            self.major_version,
            self.minor_version,
        )
    }

    pub fn full_identity(&self) -> FullLibraryIdentity {
        self.identity().with_patch(self.patch_version)
    }

    /// Every path listed under `preloadedJs` then `preloadedCss`, in order.
    pub fn preloaded_paths(&self) -> impl Iterator<Item = &str> {
        self.preloaded_js
            .iter()
            .chain(self.preloaded_css.iter())
            .map(|f| f.path.as_str())
    }

    #[tracing::instrument(skip(runtime, path))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime.read_to_string(path)?;
        let manifest: LibraryManifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }
}

/// Manifests in the wild write flags either as booleans or as 0/1.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(u64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}
