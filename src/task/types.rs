/*!
 * Task Types
 * Typed task interface: ports, properties and operations resolved through
 * explicit lookup tables
 */

use crate::naming::Handle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Failure reported by the RPC layer or by a directory/discovery client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("communication failed: {0}")]
    Communication(String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Kind of interface member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Port,
    Property,
    Operation,
    /// Any of the three, for lookups that try them all
    Member,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Port => write!(f, "port"),
            MemberKind::Property => write!(f, "property"),
            MemberKind::Operation => write!(f, "operation"),
            MemberKind::Member => write!(f, "member"),
        }
    }
}

/// Lookup failure on a task interface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("task {task} has no {kind} named '{name}'")]
pub struct MemberNotFound {
    pub task: String,
    pub kind: MemberKind,
    pub name: String,
}

/// Direction of a data port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    Input,
    Output,
}

/// Port declaration from the component model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    pub name: String,
    pub type_name: String,
    pub direction: PortDirection,
}

/// Property declaration from the component model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    pub type_name: String,
}

/// Operation declaration from the component model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSpec {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub return_type: Option<String>,
}

/// Interface of one task as declared by the component model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskModel {
    pub name: String,
    #[serde(default)]
    pub ports: Vec<PortSpec>,
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
    #[serde(default)]
    pub operations: Vec<OperationSpec>,
}

impl TaskModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_port(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        direction: PortDirection,
    ) -> Self {
        self.ports.push(PortSpec {
            name: name.into(),
            type_name: type_name.into(),
            direction,
        });
        self
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.properties.push(PropertySpec {
            name: name.into(),
            type_name: type_name.into(),
        });
        self
    }

    #[must_use]
    pub fn with_operation(mut self, name: impl Into<String>, arguments: Vec<String>) -> Self {
        self.operations.push(OperationSpec {
            name: name.into(),
            arguments,
            return_type: None,
        });
        self
    }
}

/// Reference to a port of a resolved task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRef {
    pub task: Handle,
    pub spec: PortSpec,
}

/// Reference to a property of a resolved task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRef {
    pub task: Handle,
    pub spec: PropertySpec,
}

/// Reference to an operation of a resolved task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRef {
    pub task: Handle,
    pub spec: OperationSpec,
}

/// Result of an untyped member lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Port(PortRef),
    Property(PropertyRef),
    Operation(OperationRef),
    NotFound(MemberNotFound),
}

/// A resolved task: its handle plus the interface tables of its model
#[derive(Debug, Clone)]
pub struct TaskRef {
    name: String,
    handle: Handle,
    ports: BTreeMap<String, PortSpec>,
    properties: BTreeMap<String, PropertySpec>,
    operations: BTreeMap<String, OperationSpec>,
}

impl TaskRef {
    /// A task without declared interface
    pub fn new(name: impl Into<String>, handle: Handle) -> Self {
        Self {
            name: name.into(),
            handle,
            ports: BTreeMap::new(),
            properties: BTreeMap::new(),
            operations: BTreeMap::new(),
        }
    }

    /// A task named `name` whose interface comes from `model`
    pub fn from_model(name: impl Into<String>, handle: Handle, model: &TaskModel) -> Self {
        let mut task = Self::new(name, handle);
        task.ports = model
            .ports
            .iter()
            .map(|p| (p.name.clone(), p.clone()))
            .collect();
        task.properties = model
            .properties
            .iter()
            .map(|p| (p.name.clone(), p.clone()))
            .collect();
        task.operations = model
            .operations
            .iter()
            .map(|o| (o.name.clone(), o.clone()))
            .collect();
        task
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn port(&self, name: &str) -> Result<PortRef, MemberNotFound> {
        self.ports
            .get(name)
            .map(|spec| PortRef {
                task: self.handle.clone(),
                spec: spec.clone(),
            })
            .ok_or_else(|| self.not_found(MemberKind::Port, name))
    }

    pub fn property(&self, name: &str) -> Result<PropertyRef, MemberNotFound> {
        self.properties
            .get(name)
            .map(|spec| PropertyRef {
                task: self.handle.clone(),
                spec: spec.clone(),
            })
            .ok_or_else(|| self.not_found(MemberKind::Property, name))
    }

    pub fn operation(&self, name: &str) -> Result<OperationRef, MemberNotFound> {
        self.operations
            .get(name)
            .map(|spec| OperationRef {
                task: self.handle.clone(),
                spec: spec.clone(),
            })
            .ok_or_else(|| self.not_found(MemberKind::Operation, name))
    }

    /// Look `name` up as a port, then a property, then an operation
    pub fn member(&self, name: &str) -> Member {
        if let Ok(port) = self.port(name) {
            Member::Port(port)
        } else if let Ok(property) = self.property(name) {
            Member::Property(property)
        } else if let Ok(operation) = self.operation(name) {
            Member::Operation(operation)
        } else {
            Member::NotFound(MemberNotFound {
                task: self.name.clone(),
                kind: MemberKind::Member,
                name: name.to_string(),
            })
        }
    }

    pub fn port_names(&self) -> impl Iterator<Item = &str> {
        self.ports.keys().map(String::as_str)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    fn not_found(&self, kind: MemberKind, name: &str) -> MemberNotFound {
        MemberNotFound {
            task: self.name.clone(),
            kind,
            name: name.to_string(),
        }
    }
}
