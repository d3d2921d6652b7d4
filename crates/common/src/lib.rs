//! Shared types, config, and error definitions for the surf-lamp service.

pub mod config;
pub mod error;
pub mod types;

pub use config::{LampServerConfig, Location, ProviderKind, ProviderSource};
pub use error::Error;
pub use types::*;
