// Task Arguments & Listing

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Arguments bound to a task's declared parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskArgs {
    named: BTreeMap<String, String>,
    extras: Vec<String>,
}

impl TaskArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind positional `values` to `params` in order; surplus values become extras
    pub fn bind(params: &[String], values: &[String]) -> Self {
        let named = params
            .iter()
            .cloned()
            .zip(values.iter().cloned())
            .collect();
        let extras = values.iter().skip(params.len()).cloned().collect();
        Self { named, extras }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    pub fn extras(&self) -> &[String] {
        &self.extras
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.extras.is_empty()
    }

    /// Values for the parameter names in `params` only
    pub fn subset(&self, params: &[String]) -> Self {
        let named = params
            .iter()
            .filter_map(|p| self.named.get(p).map(|v| (p.clone(), v.clone())))
            .collect();
        Self {
            named,
            extras: Vec::new(),
        }
    }
}

/// Public view of a defined task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub name: String,
    pub description: Option<String>,
    pub prerequisites: Vec<String>,
    pub params: Vec<String>,
    pub actions: usize,
}
