pub mod assets;
pub mod auth;
pub mod blog;
pub mod cleanup;
pub mod config;
pub mod content;
pub mod error;
pub mod guest;
pub mod models;
pub mod openapi;
pub mod repo;
pub mod routes;
pub mod storage;
pub mod upload;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
