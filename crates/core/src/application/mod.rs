// Application Layer - Task host and the migration task adapter

pub mod migration_task;
pub mod task_graph;

// Re-exports
pub use migration_task::{MigrationTask, MigrationTaskBuilder};
pub use task_graph::{fn_action, Task, TaskAction, TaskDefinition, TaskGraph};
