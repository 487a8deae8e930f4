// src/lib.rs
pub mod auth;
pub mod cli;
pub mod core;
pub mod documents;
pub mod error;
pub mod llm;
pub mod models;
pub mod repository;
pub mod scrape;
pub mod services;
pub mod utils;
pub mod web;

pub use crate::core::{ConfigManager, Database};
pub use crate::error::{ServiceError, ServiceResult};
pub use crate::services::AppState;
pub use crate::web::{build_rocket, start_web_server};
