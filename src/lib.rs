/*!
 * Taskhost Library
 * Supervision of component processes and resolution of the tasks they expose
 */

pub mod core;
pub mod monitoring;
pub mod naming;
pub mod process;
pub mod task;

// Re-exports
pub use crate::core::{
    ConfigError, SerializableError, SupervisorConfig, TaskhostError, TaskhostResult,
};
pub use monitoring::{init_tracing, span_operation};
pub use naming::{
    Announcement, DirectoryClient, DiscoveryBrowser, DiscoveryRegistry, Handle, HandleMap,
    LocalRegistry, Registry, RegistryError, RegistryResult, RemoteDirectory, Resolver,
};
pub use process::{
    CmdArg, DeploymentModel, ExitStatus, KillOptions, LogLevel, Process, ProcessDescriptor,
    ProcessError, ProcessResult, ProcessState, SpawnOptions, SpawnRequest, Supervisor,
    SupervisorBuilder, Wrapper,
};
pub use task::{Member, RemoteError, TaskModel, TaskRef, TaskRuntime};
