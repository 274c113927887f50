use anyhow::Result;
use log::debug;

use crate::library::InstalledLibraryRecord;
use crate::runtime::Runtime;

use super::config::Config;

/// List installed libraries
#[tracing::instrument(skip(config))]
pub async fn list<R: Runtime>(config: Config<R>, machine_name: Option<&str>) -> Result<()> {
    debug!("Listing libraries from {:?}", config.store.root());

    let installed = config.manager().registry().list_installed(machine_name).await?;
    if installed.is_empty() {
        println!("No libraries installed.");
        return Ok(());
    }

    for record in installed.values().flatten() {
        println!("{}", format_record(record));
    }

    Ok(())
}

fn format_record(record: &InstalledLibraryRecord) -> String {
    let mut line = record.identity.to_string();
    if !record.title.is_empty() {
        line.push_str(&format!("  {}", record.title));
    }
    if record.runnable {
        line.push_str(" (runnable)");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::FullLibraryIdentity;
    use crate::runtime::RealRuntime;
    use std::path::PathBuf;

    #[test]
    fn test_format_record() {
        let mut record = InstalledLibraryRecord {
            identity: FullLibraryIdentity::new("H5P.Quiz", 1, 2, 3),
            title: "Quiz".to_string(),
            runnable: true,
        };
        assert_eq!(format_record(&record), "H5P.Quiz-1.2.3  Quiz (runnable)");

        record.title.clear();
        record.runnable = false;
        assert_eq!(format_record(&record), "H5P.Quiz-1.2.3");
    }

    #[tokio::test]
    async fn test_list_empty_root() {
        let root = tempfile::tempdir().unwrap();
        let config = Config::new(RealRuntime, Some(root.path().to_path_buf()), None).unwrap();
        assert!(list(config, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_missing_root() {
        let root = PathBuf::from("/nonexistent/libinstall");
        let config = Config::new(RealRuntime, Some(root), None).unwrap();
        assert!(list(config, Some("A")).await.is_ok());
    }
}
