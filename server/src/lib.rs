// orderflow-server/src/lib.rs

//! HTTP boundary for the order workflows: configuration, PostgreSQL storage,
//! the mail notifier and the actix-web routes.

pub mod config;
pub mod errors;
pub mod services;
pub mod state;
pub mod store;
pub mod web;

pub use crate::config::AppConfig;
pub use crate::errors::{AppError, Result};
pub use crate::state::AppState;
