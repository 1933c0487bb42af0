pub mod config;
pub mod models;
pub mod service;
pub mod tasks;

pub use config::{ConfigError, ServiceConfig};
pub use service::{AppState, build_router, create_app};
pub use models::*;
