pub mod commands;
pub mod consistency;
pub mod error;
pub mod library;
pub mod manager;
pub mod registry;
pub mod runtime;
pub mod store;
