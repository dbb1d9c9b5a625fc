/*!
 * Limits and Constants
 *
 * Centralized location for timeouts, buffer sizes and the names of the
 * arguments and environment variables shared with child processes.
 */

use std::time::Duration;

// =============================================================================
// HANDSHAKE
// =============================================================================

/// Command-line option carrying the inherited handshake descriptor number
pub const HANDSHAKE_FD_ARG: &str = "handshake-fd";

/// Environment variable carrying the inherited handshake descriptor number
pub const HANDSHAKE_FD_ENV: &str = "TASKHOST_HANDSHAKE_FD";

/// Read size for a single non-blocking handshake read
pub const HANDSHAKE_READ_CHUNK: usize = 4096;

/// Upper bound on an accumulated handshake message (1MB)
/// A flat name -> address map never gets anywhere near this
pub const MAX_HANDSHAKE_BYTES: usize = 1024 * 1024;

/// How long to wait for the exit notification after the channel closed with
/// an unusable buffer, to tell a crash apart from a protocol violation
pub const HANDSHAKE_EXIT_GRACE: Duration = Duration::from_millis(200);

// =============================================================================
// PROCESS COMMAND LINE
// =============================================================================

/// Command-line option used to rename a deployed task (`--rename=old:new`)
pub const RENAME_ARG: &str = "rename";

/// Environment variable carrying the component log level
pub const LOG_LEVEL_ENV: &str = "COMPONENT_LOG_LEVEL";

/// Default port used by the gdbserver wrapper
pub const DEFAULT_GDB_PORT: u16 = 30000;

// =============================================================================
// SUPERVISION
// =============================================================================

/// Default deadline for `wait_running` when the caller relies on configuration
pub const DEFAULT_WAIT_RUNNING_TIMEOUT: Duration = Duration::from_secs(20);

/// Default grace period before a waited soft kill is escalated to SIGKILL
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

/// Operations slower than this are reported by `OperationSpan`
pub const SLOW_OPERATION_THRESHOLD: Duration = Duration::from_millis(100);

// =============================================================================
// NAMING
// =============================================================================

/// Separator between a namespace and a basename (`namespace/basename`)
pub const NAMESPACE_DELIMITER: char = '/';
