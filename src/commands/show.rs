use anyhow::{Context, Result};
use log::debug;

use crate::library::LibraryIdentity;
use crate::runtime::Runtime;

use super::config::Config;

/// Show detailed information about an installed library
#[tracing::instrument(skip(config))]
pub async fn show<R: Runtime>(config: Config<R>, library: &str) -> Result<()> {
    let library = LibraryIdentity::parse(library).with_context(|| {
        format!(
            "Invalid library '{}', expected <MachineName>-<Major>.<Minor>",
            library
        )
    })?;
    debug!("Showing info for {}", library);

    let manager = config.manager();
    let Some(manifest) = manager.get_metadata_if_installed(&library).await else {
        anyhow::bail!("Library {} is not installed.", library);
    };

    println!("Library: {}", manifest.full_identity());
    if !manifest.title.is_empty() {
        println!("Title: {}", manifest.title);
    }
    println!("Runnable: {}", if manifest.runnable { "yes" } else { "no" });
    println!(
        "Directory: {}",
        config.store.slot_dir(&library).display()
    );

    let languages = manager.list_languages(&library).await?;
    println!("Languages: {}", languages.join(", "));

    if let Some(url) = manager.get_upgrade_script_path(&library).await? {
        println!("Upgrade script: {}", url);
    }

    println!("\nFiles:");
    for path in manager.list_files(&library).await? {
        println!("  {}", path);
    }

    Ok(())
}
