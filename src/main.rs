use anyhow::Result;
use clap::Parser;
use libinstall::commands::{self, Config};
use std::path::PathBuf;

/// libinstall - versioned library installer
///
/// Install unpacked libraries into a local store. A library whose
/// (major, minor) line is already installed is only replaced by a higher
/// patch version.
///
/// Examples:
///   libinstall install ./H5P.Quiz     # Install or patch from a directory
///   libinstall list                   # List installed libraries
///   libinstall show H5P.Quiz-1.2      # Show one installed library
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Store root directory (defaults to ~/.libinstall; also via LIBINSTALL_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "LIBINSTALL_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub root: Option<PathBuf>,

    /// Base URL of library files (defaults to /libraries)
    #[arg(
        long = "base-url",
        env = "LIBINSTALL_BASE_URL",
        value_name = "URL",
        global = true
    )]
    pub base_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install a library from an unpacked directory
    Install(InstallArgs),

    /// List installed libraries
    List(ListArgs),

    /// Show details of an installed library
    Show(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Directory containing library.json
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Mark the library as requiring elevated permission
    #[arg(long)]
    pub restricted: bool,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only list libraries with this machine name
    #[arg(value_name = "MACHINE_NAME")]
    pub machine_name: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// The library in the format "MachineName-Major.Minor"
    #[arg(value_name = "NAME-MAJOR.MINOR")]
    pub library: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = Config::new(libinstall::runtime::RealRuntime, cli.root, cli.base_url)?;

    match cli.command {
        Commands::Install(args) => commands::install(config, &args.dir, args.restricted).await?,
        Commands::List(args) => commands::list(config, args.machine_name.as_deref()).await?,
        Commands::Show(args) => commands::show(config, &args.library).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_install_parsing() {
        let cli = Cli::try_parse_from(["libinstall", "install", "./quiz"]).unwrap();
        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.dir, PathBuf::from("./quiz"));
                assert!(!args.restricted);
            }
            _ => panic!("Expected Install command"),
        }
    }

    #[test]
    fn test_cli_install_restricted_parsing() {
        let cli =
            Cli::try_parse_from(["libinstall", "install", "./quiz", "--restricted"]).unwrap();
        match cli.command {
            Commands::Install(args) => assert!(args.restricted),
            _ => panic!("Expected Install command"),
        }
    }

    #[test]
    fn test_cli_list_parsing() {
        let cli = Cli::try_parse_from(["libinstall", "list"]).unwrap();
        match cli.command {
            Commands::List(args) => assert_eq!(args.machine_name, None),
            _ => panic!("Expected List command"),
        }

        let cli = Cli::try_parse_from(["libinstall", "list", "H5P.Quiz"]).unwrap();
        match cli.command {
            Commands::List(args) => assert_eq!(args.machine_name.as_deref(), Some("H5P.Quiz")),
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_cli_show_parsing() {
        let cli = Cli::try_parse_from(["libinstall", "show", "H5P.Quiz-1.2"]).unwrap();
        match cli.command {
            Commands::Show(args) => assert_eq!(args.library, "H5P.Quiz-1.2"),
            _ => panic!("Expected Show command"),
        }
    }

    #[test]
    fn test_cli_global_options_parsing() {
        let cli = Cli::try_parse_from([
            "libinstall",
            "--root",
            "/tmp/store",
            "list",
            "--base-url",
            "https://cdn.example.com",
        ])
        .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/store")));
        assert_eq!(cli.base_url.as_deref(), Some("https://cdn.example.com"));
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["libinstall", "./quiz"]).is_err());
    }
}
