//! The portable flow shape

use super::error::{FlowError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashMap;

/// A serialized component tree
///
/// Leaf parameters live in `parameters` as JSON-encoded strings keyed
/// by name; nested components are hoisted into `components` and
/// referenced from the parameter text by identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDescriptor {
    /// Unique display name
    pub name: String,
    /// Class path plus a random hex suffix keeping repeats distinct
    pub class_name: String,
    pub description: String,
    /// JSON-encoded parameter values by name
    pub parameters: BTreeMap<String, String>,
    /// Hoisted sub-flows by identifier, in hoist order
    pub components: Vec<(String, FlowDescriptor)>,
    /// Comma-joined version tags of every package involved
    pub external_version: String,
    /// Newline-separated dependency lines
    pub dependencies: String,
    pub tags: Vec<String>,
}

impl FlowDescriptor {
    /// Serialize to a JSON string
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from a JSON string
    pub fn from_json_string(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Look up a hoisted sub-flow by identifier
    pub fn component(&self, key: &str) -> Option<&FlowDescriptor> {
        self.components
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, flow)| flow)
    }
}

/// Sub-flows awaiting consumption during reconstruction
///
/// Every reference consumes its target exactly once; a second take of
/// the same identifier means the flow is inconsistent.
pub(crate) struct ComponentPool {
    entries: HashMap<String, FlowDescriptor>,
}

impl ComponentPool {
    pub(crate) fn new(components: &[(String, FlowDescriptor)]) -> Self {
        let entries = components
            .iter()
            .map(|(name, flow)| (name.clone(), flow.clone()))
            .collect();
        Self { entries }
    }

    pub(crate) fn take(&mut self, key: &str) -> Result<FlowDescriptor> {
        self.entries
            .remove(key)
            .ok_or_else(|| FlowError::MissingComponent(key.to_string()))
    }
}
