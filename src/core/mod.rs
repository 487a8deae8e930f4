// src/core/mod.rs
//! Configuration, storage and file system plumbing shared by every layer

pub mod config_manager;
pub mod database;
pub mod fs_ops;

pub use config_manager::ConfigManager;
pub use database::Database;
pub use fs_ops::FsOps;
