//! Command implementations behind the `libinstall` binary.

pub mod config;
mod install;
mod list;
mod show;

pub use config::Config;
pub use install::install;
pub use list::list;
pub use show::show;
