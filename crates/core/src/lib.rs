// Migrate Task Core - Task Graph, Ports & Migration Task Adapter
// NO database dependencies: engines and drivers live behind ports

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{MigrationTask, MigrationTaskBuilder, TaskGraph};
pub use error::{Result, TaskError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
