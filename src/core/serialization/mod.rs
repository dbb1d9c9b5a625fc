/*!
 * Serialization Utilities
 * Custom serde helpers for optional field skipping and strict maps
 */

pub mod serde;

pub use self::serde::{is_empty_map, is_none, unique_map};
