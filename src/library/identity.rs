//! Library identities and version ordering.
//!
//! A library line is identified by its machine name plus major and minor
//! version. The patch version distinguishes builds of the same line; only one
//! build per line is ever installed at a time.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a library line (machine name, major, minor), ignoring patch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct LibraryIdentity {
    pub machine_name: String,
    pub major_version: u32,
    pub minor_version: u32,
}

impl LibraryIdentity {
    pub fn new(machine_name: impl Into<String>, major_version: u32, minor_version: u32) -> Self {
        Self {
            machine_name: machine_name.into(),
            major_version,
            minor_version,
        }
    }

    /// Attach a patch version, producing the identity of a concrete build.
    pub fn with_patch(&self, patch_version: u32) -> FullLibraryIdentity {
        FullLibraryIdentity {
            library: self.clone(),
            patch_version,
        }
    }

    /// Parse the `Name-Major.Minor` form produced by [`Display`](fmt::Display).
    ///
    /// The machine name may itself contain dashes; only the last one separates
    /// the version.
    pub fn parse(s: &str) -> Option<Self> {
        let (name, version) = s.rsplit_once('-')?;
        let (major, minor) = version.split_once('.')?;
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, major.parse().ok()?, minor.parse().ok()?))
    }
}

impl fmt::Display for LibraryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}.{}",
            self.machine_name, self.major_version, self.minor_version
        )
    }
}

/// Identifies one installed build of a library.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct FullLibraryIdentity {
    #[serde(flatten)]
    pub library: LibraryIdentity,
    pub patch_version: u32,
}

impl FullLibraryIdentity {
    pub fn new(
        machine_name: impl Into<String>,
        major_version: u32,
        minor_version: u32,
        patch_version: u32,
    ) -> Self {
        LibraryIdentity::new(machine_name, major_version, minor_version).with_patch(patch_version)
    }

    pub fn machine_name(&self) -> &str {
        &self.library.machine_name
    }

    /// The line this build belongs to.
    pub fn line(&self) -> &LibraryIdentity {
        &self.library
    }

    pub fn version(&self) -> (u32, u32, u32) {
        (
            self.library.major_version,
            self.library.minor_version,
            self.patch_version,
        )
    }
}

impl fmt::Display for FullLibraryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.library, self.patch_version)
    }
}

/// Order two builds by major, then minor, then patch version.
///
/// The machine name does not take part. This is the single ordering used for
/// sorting listings and for upgrade detection.
pub fn compare_versions(a: &FullLibraryIdentity, b: &FullLibraryIdentity) -> Ordering {
    a.version().cmp(&b.version())
}

impl PartialOrd for FullLibraryIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Version first so sorting a single machine's builds follows compare_versions;
// the name only breaks ties to keep Ord consistent with Eq.
impl Ord for FullLibraryIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_versions(self, other)
            .then_with(|| self.library.machine_name.cmp(&other.library.machine_name))
    }
}
