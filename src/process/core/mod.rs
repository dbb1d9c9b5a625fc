/*!
 * Process Core Types
 * Errors, states and exit status shared by the supervisor
 */

pub mod types;

pub use types::*;
