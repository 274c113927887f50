use anyhow::Result;
use std::path::Path;

use crate::library::InstallOutcome;
use crate::manager::InstallOptions;
use crate::runtime::Runtime;

use super::config::Config;

/// Install a library from an unpacked directory
#[tracing::instrument(skip(config))]
pub async fn install<R: Runtime>(config: Config<R>, dir: &Path, restricted: bool) -> Result<()> {
    let options = if restricted {
        InstallOptions::restricted()
    } else {
        InstallOptions::unrestricted()
    };

    let outcome = config.manager().install_from_source(dir, options).await?;
    println!("{}", describe(&outcome));
    Ok(())
}

fn describe(outcome: &InstallOutcome) -> String {
    match outcome {
        InstallOutcome::New { identity } => format!("Installed {}", identity),
        InstallOutcome::Patch {
            old_identity,
            new_identity,
        } => format!("Updated {} to {}", old_identity, new_identity),
        InstallOutcome::None => "Already up to date, nothing installed.".to_string(),
    }
}
