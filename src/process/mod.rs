/*!
 * Process Module
 * Spawning, handshake and lifecycle of component processes
 */

pub mod batch;
pub mod command;
pub mod core;
pub mod descriptor;
pub mod handshake;
pub mod options;
pub mod supervised;
pub mod supervisor;

// Re-export for convenience
pub use batch::SpawnRequest;
pub use command::{render_output, CommandLine};
pub use self::core::{ExitStatus, HandshakeError, ProcessError, ProcessResult, ProcessState};
pub use descriptor::{DeploymentModel, ProcessDescriptor};
pub use handshake::{parse_message, HandshakeChannel};
pub use options::{CmdArg, LogLevel, SpawnOptions, Wrapper};
pub use supervised::{KillOptions, Process};
pub use supervisor::{Supervisor, SupervisorBuilder, SupervisorContext};
