//! Task Graph - Named tasks with prerequisites, parameters and actions
//!
//! Re-declaring a task merges into the existing one: prerequisites and actions
//! are appended, description and parameters replaced only when supplied.
//! `invoke` runs prerequisites depth-first, each task at most once.

use crate::domain::{TaskArgs, TaskInfo};
use crate::error::{Result, TaskError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// Body of a task
#[async_trait]
pub trait TaskAction: Send + Sync {
    async fn execute(&self, args: &TaskArgs) -> Result<()>;
}

/// Closure adapter for [`TaskAction`]
pub struct FnAction<F>(F);

#[async_trait]
impl<F, Fut> TaskAction for FnAction<F>
where
    F: Fn(TaskArgs) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn execute(&self, args: &TaskArgs) -> Result<()> {
        (self.0)(args.clone()).await
    }
}

/// Wrap an async closure as a task action
pub fn fn_action<F, Fut>(f: F) -> Arc<dyn TaskAction>
where
    F: Fn(TaskArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnAction(f))
}

/// Declaration of (part of) a task
#[derive(Clone, Default)]
pub struct TaskDefinition {
    name: String,
    description: Option<String>,
    prerequisites: Vec<String>,
    params: Vec<String>,
    actions: Vec<Arc<dyn TaskAction>>,
}

impl TaskDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn depends_on(mut self, prerequisite: impl Into<String>) -> Self {
        self.prerequisites.push(prerequisite.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(name.into());
        self
    }

    pub fn action(mut self, action: Arc<dyn TaskAction>) -> Self {
        self.actions.push(action);
        self
    }
}

/// A defined task
pub struct Task {
    name: String,
    description: Option<String>,
    prerequisites: Vec<String>,
    params: Vec<String>,
    actions: Vec<Arc<dyn TaskAction>>,
}

impl Task {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn prerequisites(&self) -> &[String] {
        &self.prerequisites
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    fn info(&self) -> TaskInfo {
        TaskInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            prerequisites: self.prerequisites.clone(),
            params: self.params.clone(),
            actions: self.actions.len(),
        }
    }

    fn merge(&mut self, def: TaskDefinition) {
        if def.description.is_some() {
            self.description = def.description;
        }
        if !def.params.is_empty() {
            self.params = def.params;
        }
        for prerequisite in def.prerequisites {
            if !self.prerequisites.contains(&prerequisite) {
                self.prerequisites.push(prerequisite);
            }
        }
        self.actions.extend(def.actions);
    }
}

/// Registry of tasks for one process
#[derive(Default)]
pub struct TaskGraph {
    tasks: BTreeMap<String, Task>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a task, merging into an existing declaration of the same name
    pub fn define(&mut self, def: TaskDefinition) {
        match self.tasks.get_mut(&def.name) {
            Some(task) => {
                debug!(task = %def.name, "Merging task declaration");
                task.merge(def);
            }
            None => {
                debug!(task = %def.name, "Defining task");
                let mut task = Task {
                    name: def.name.clone(),
                    description: None,
                    prerequisites: Vec::new(),
                    params: Vec::new(),
                    actions: Vec::new(),
                };
                task.merge(def);
                self.tasks.insert(task.name.clone(), task);
            }
        }
    }

    /// Append an action to `name`, defining the task if needed
    pub fn enhance(&mut self, name: &str, action: Arc<dyn TaskAction>) {
        self.define(TaskDefinition::new(name).action(action));
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn prerequisites(&self, name: &str) -> Option<&[String]> {
        self.tasks.get(name).map(Task::prerequisites)
    }

    /// All tasks, sorted by name
    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.tasks.values().map(Task::info).collect()
    }

    /// Run `name` after its prerequisites
    ///
    /// `args` bind positionally to the task's parameters. Prerequisites see the
    /// values for the parameter names they declare. Action errors propagate as-is.
    pub async fn invoke(&self, name: &str, args: &[String]) -> Result<()> {
        let root = self
            .task(name)
            .ok_or_else(|| TaskError::TaskNotFound(name.to_string()))?;
        let root_args = TaskArgs::bind(&root.params, args);

        let order = self.execution_order(name)?;
        info!(task = %name, chain = ?order, "Invoking task");

        for task_name in &order {
            let task = self
                .task(task_name)
                .ok_or_else(|| TaskError::TaskNotFound(task_name.clone()))?;
            let task_args = if task_name == name {
                root_args.clone()
            } else {
                root_args.subset(&task.params)
            };

            debug!(task = %task_name, actions = task.actions.len(), "Executing task");
            for action in &task.actions {
                action.execute(&task_args).await?;
            }
        }

        Ok(())
    }

    /// Prerequisites first, each task once
    fn execution_order(&self, name: &str) -> Result<Vec<String>> {
        let mut order = Vec::new();
        let mut done = HashSet::new();
        let mut chain = Vec::new();
        self.visit(name, &mut chain, &mut done, &mut order)?;
        Ok(order)
    }

    fn visit(
        &self,
        name: &str,
        chain: &mut Vec<String>,
        done: &mut HashSet<String>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        if done.contains(name) {
            return Ok(());
        }
        if chain.iter().any(|n| n == name) {
            let mut cycle = chain.clone();
            cycle.push(name.to_string());
            return Err(TaskError::CircularDependency(cycle.join(" => ")));
        }

        let task = self
            .task(name)
            .ok_or_else(|| TaskError::TaskNotFound(name.to_string()))?;

        chain.push(name.to_string());
        for prerequisite in &task.prerequisites {
            self.visit(prerequisite, chain, done, order)?;
        }
        chain.pop();

        done.insert(name.to_string());
        order.push(name.to_string());
        Ok(())
    }
}
