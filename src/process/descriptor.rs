/*!
 * Process Descriptor
 * Static description of a supervised process: its model and task names
 */

use crate::core::types::NameMappings;
use crate::task::TaskModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Deployment metadata supplied by the model loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentModel {
    pub name: String,
    pub binary: PathBuf,
    #[serde(default)]
    pub tasks: Vec<TaskModel>,
}

impl DeploymentModel {
    pub fn new(name: impl Into<String>, binary: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            binary: binary.into(),
            tasks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_task(mut self, task: TaskModel) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name.as_str())
    }

    pub fn find_task(&self, name: &str) -> Option<&TaskModel> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

/// What the supervisor knows about a process before it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDescriptor {
    name: String,
    model: DeploymentModel,
    name_mappings: NameMappings,
}

impl ProcessDescriptor {
    /// A process named after its deployment
    pub fn new(model: DeploymentModel) -> Self {
        Self {
            name: model.name.clone(),
            model,
            name_mappings: NameMappings::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_name_mappings(mut self, mappings: NameMappings) -> Self {
        self.name_mappings = mappings;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &DeploymentModel {
        &self.model
    }

    pub fn name_mappings(&self) -> &NameMappings {
        &self.name_mappings
    }

    /// Deployed name of the declared task `declared`
    pub fn map_name<'a>(&'a self, declared: &'a str) -> &'a str {
        self.name_mappings
            .get(declared)
            .map(String::as_str)
            .unwrap_or(declared)
    }

    /// Declared name of the deployed task `deployed`
    pub fn declared_name<'a>(&'a self, deployed: &'a str) -> Option<&'a str> {
        self.model
            .task_names()
            .find(|declared| self.map_name(declared) == deployed)
    }

    /// Every task name the process may report in its handshake
    pub fn deployed_task_names(&self) -> BTreeSet<String> {
        self.model
            .task_names()
            .map(|declared| self.map_name(declared).to_string())
            .collect()
    }
}
