/*!
 * Core Types
 * Common types used across the supervisor and the naming layer
 */

use std::collections::{BTreeMap, HashMap};

/// OS process ID type
pub type Pid = u32;

/// Task name remapping table (declared name -> deployed name)
pub type NameMappings = BTreeMap<String, String>;

/// Raw handshake payload (deployed task name -> address)
pub type AddressMap = HashMap<String, String>;

/// Common result type for crate-level operations
pub type TaskhostResult<T> = Result<T, super::errors::TaskhostError>;
