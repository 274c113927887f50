use anyhow::{Result, anyhow};
use std::path::Path;

use super::Runtime;

/// Find every regular file below `root`.
///
/// Returns `/`-separated paths relative to `root`, sorted. Returns an empty
/// list if `root` does not exist.
#[tracing::instrument(skip(runtime, root))]
pub fn walk_files<R: Runtime + ?Sized>(runtime: &R, root: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();

    if !runtime.exists(root) {
        return Ok(files);
    }

    let mut pending = vec![(root.to_path_buf(), String::new())];
    while let Some((dir, prefix)) = pending.pop() {
        for entry in runtime.read_dir(&dir)? {
            let name = entry
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow!("Non UTF-8 file name under {:?}", dir))?;
            let relative = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", prefix, name)
            };

            if runtime.is_dir(&entry) {
                pending.push((entry, relative));
            } else {
                files.push(relative);
            }
        }
    }

    files.sort();
    Ok(files)
}
