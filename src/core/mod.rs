/*!
 * Core Module
 * Fundamental types, limits, configuration and error handling
 */

pub mod config;
pub mod errors;
pub mod limits;
pub mod serialization;
pub mod types;

// Re-export for convenience
pub use config::{ConfigError, ConfigResult, SupervisorConfig};
pub use errors::*;
pub use types::*;
