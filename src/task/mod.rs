/*!
 * Task Module
 * Typed task interfaces and the RPC collaborator interface
 */

pub mod traits;
pub mod types;

pub use traits::TaskRuntime;
pub use types::{
    Member, MemberKind, MemberNotFound, OperationRef, OperationSpec, PortDirection, PortRef,
    PortSpec, PropertyRef, PropertySpec, RemoteError, TaskModel, TaskRef,
};
