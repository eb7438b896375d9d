// Migration Task Adapter tests

use super::*;
use crate::application::task_graph::fn_action;
use crate::domain::{MigrationTaskOptions, TaskArg};
use crate::port::migration_runner::mocks::RecordingMigrationRunner;
use crate::port::{ConnectionError, ConnectionParams, Connector, DefaultDatabase, MigrationError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_test::{assert_err, assert_ok};

#[derive(Debug, Clone, PartialEq)]
struct FakeDb(&'static str);

const DIRECTORY: &str = "migrations";

fn runner() -> Arc<RecordingMigrationRunner<FakeDb>> {
    Arc::new(RecordingMigrationRunner::new())
}

/// Connector that hands out `FakeDb("connected")` and counts calls
#[derive(Default)]
struct FakeConnector {
    calls: AtomicUsize,
    last_params: Mutex<Option<ConnectionParams>>,
    refuse: bool,
}

impl FakeConnector {
    fn refusing() -> Self {
        Self {
            refuse: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Connector<FakeDb> for FakeConnector {
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> std::result::Result<FakeDb, ConnectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = Some(params.clone());
        if self.refuse {
            return Err(ConnectionError::Failed("connection refused".to_string()));
        }
        Ok(FakeDb("connected"))
    }
}

// ----------------------------------------------------------------------------
// Construction
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_requires_directory() {
    let err = assert_err!(MigrationTask::<FakeDb>::builder(runner()).build().await);
    assert!(matches!(err, TaskError::Config(msg) if msg.contains("directory")));
}

#[tokio::test]
async fn test_empty_directory_is_rejected() {
    let result = MigrationTask::<FakeDb>::builder(runner()).directory("").build().await;
    assert!(matches!(result, Err(TaskError::Config(_))));
}

#[tokio::test]
async fn test_failed_install_registers_no_tasks() {
    let mut graph = TaskGraph::new();
    let result = MigrationTask::<FakeDb>::builder(runner())
        .database(FakeDb("main"))
        .install(&mut graph)
        .await;

    assert!(result.is_err());
    assert!(graph.tasks().is_empty());
}

#[tokio::test]
async fn test_directory_from_arguments() {
    let task = assert_ok!(
        MigrationTask::<FakeDb>::builder(runner())
            .directory(DIRECTORY)
            .build()
            .await
    );
    assert_eq!(task.directory(), Path::new(DIRECTORY));
}

#[tokio::test]
async fn test_directory_from_options() {
    let task = assert_ok!(
        MigrationTask::<FakeDb>::builder(runner())
            .options(MigrationTaskOptions::new().directory(DIRECTORY))
            .build()
            .await
    );
    assert_eq!(task.directory(), Path::new(DIRECTORY));
}

#[tokio::test]
async fn test_directory_from_callback() {
    let task = assert_ok!(
        MigrationTask::<FakeDb>::builder(runner())
            .configure(|config| {
                config.set_directory(DIRECTORY);
            })
            .build()
            .await
    );
    assert_eq!(task.directory(), Path::new(DIRECTORY));
}

#[tokio::test]
async fn test_argument_order_does_not_matter() {
    let forward = assert_ok!(
        MigrationTask::<FakeDb>::builder(runner())
            .args([
                TaskArg::Directory(DIRECTORY.into()),
                TaskArg::Database(FakeDb("main")),
            ])
            .build()
            .await
    );
    let reverse = assert_ok!(
        MigrationTask::<FakeDb>::builder(runner())
            .args([
                TaskArg::Database(FakeDb("main")),
                TaskArg::Directory(DIRECTORY.into()),
            ])
            .build()
            .await
    );

    for task in [forward, reverse] {
        assert_eq!(task.directory(), Path::new(DIRECTORY));
        assert_eq!(task.database(), Some(&FakeDb("main")));
    }
}

#[tokio::test]
async fn test_first_positional_value_wins() {
    let task = assert_ok!(
        MigrationTask::<FakeDb>::builder(runner())
            .directory("first")
            .directory("second")
            .database(FakeDb("a"))
            .database(FakeDb("b"))
            .build()
            .await
    );
    assert_eq!(task.directory(), Path::new("first"));
    assert_eq!(task.database(), Some(&FakeDb("a")));
}

#[tokio::test]
async fn test_options_extracted_from_any_position() {
    let task = assert_ok!(
        MigrationTask::<FakeDb>::builder(runner())
            .args([
                TaskArg::Options(MigrationTaskOptions::new().column("version_number")),
                TaskArg::Directory(DIRECTORY.into()),
            ])
            .build()
            .await
    );
    assert_eq!(task.directory(), Path::new(DIRECTORY));
    assert_eq!(task.column(), Some("version_number"));
}

#[tokio::test]
async fn test_options_override_positional_values() {
    let task = assert_ok!(
        MigrationTask::<FakeDb>::builder(runner())
            .directory("positional")
            .database(FakeDb("positional"))
            .options(
                MigrationTaskOptions::new()
                    .directory("from-options")
                    .database(FakeDb("from-options"))
                    .table("schema_information"),
            )
            .build()
            .await
    );
    assert_eq!(task.directory(), Path::new("from-options"));
    assert_eq!(task.database(), Some(&FakeDb("from-options")));
    assert_eq!(task.table(), Some("schema_information"));
}

#[tokio::test]
async fn test_callback_overrides_options_and_positional() {
    let task = assert_ok!(
        MigrationTask::<FakeDb>::builder(runner())
            .directory("positional")
            .options(
                MigrationTaskOptions::new()
                    .directory("from-options")
                    .database(FakeDb("from-options"))
                    .table("from-options")
                    .column("from-options"),
            )
            .configure(|config| {
                config
                    .set_directory("from-callback")
                    .set_database(FakeDb("from-callback"))
                    .set_table("from-callback")
                    .set_column("from-callback");
            })
            .build()
            .await
    );
    assert_eq!(task.directory(), Path::new("from-callback"));
    assert_eq!(task.database(), Some(&FakeDb("from-callback")));
    assert_eq!(task.table(), Some("from-callback"));
    assert_eq!(task.column(), Some("from-callback"));

    let config = task.config();
    assert_eq!(config.directory(), Some(Path::new("from-callback")));
    assert_eq!(config.database, Some(FakeDb("from-callback")));
}

#[tokio::test]
async fn test_callbacks_run_in_order() {
    let task = assert_ok!(
        MigrationTask::<FakeDb>::builder(runner())
            .configure(|config| {
                config.set_directory("first").set_table("first");
            })
            .configure(|config| {
                config.set_table("second");
            })
            .build()
            .await
    );
    assert_eq!(task.directory(), Path::new("first"));
    assert_eq!(task.table(), Some("second"));
}

// ----------------------------------------------------------------------------
// Connection parameters
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_connection_opened_when_no_database() {
    let connector = Arc::new(FakeConnector::default());
    let params = ConnectionParams::url("postgres://localhost/db")
        .with("user", "joe")
        .with("password", "schmoe");

    let task = assert_ok!(
        MigrationTask::<FakeDb>::builder(runner())
            .directory(DIRECTORY)
            .connection(params.clone())
            .connector(connector.clone())
            .build()
            .await
    );

    assert_eq!(task.database(), Some(&FakeDb("connected")));
    assert_eq!(connector.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*connector.last_params.lock().unwrap(), Some(params));
}

#[tokio::test]
async fn test_connection_from_parameter_map() {
    let connector = Arc::new(FakeConnector::default());
    let params = ConnectionParams::map([
        ("adapter", "postgres"),
        ("host", "localhost"),
        ("database", "db"),
        ("default_schema", "test"),
    ]);

    let task = assert_ok!(
        MigrationTask::<FakeDb>::builder(runner())
            .directory(DIRECTORY)
            .connection(params.clone())
            .connector(connector.clone())
            .build()
            .await
    );

    assert_eq!(task.database(), Some(&FakeDb("connected")));
    assert_eq!(*connector.last_params.lock().unwrap(), Some(params));
}

#[tokio::test]
async fn test_no_connection_when_database_given() {
    let connector = Arc::new(FakeConnector::default());

    let task = assert_ok!(
        MigrationTask::<FakeDb>::builder(runner())
            .args([
                TaskArg::Directory(DIRECTORY.into()),
                TaskArg::Database(FakeDb("main")),
                TaskArg::Connection(ConnectionParams::url("postgres://localhost/db")),
            ])
            .connector(connector.clone())
            .build()
            .await
    );

    assert_eq!(task.database(), Some(&FakeDb("main")));
    assert_eq!(connector.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_connection_without_connector_is_config_error() {
    let result = MigrationTask::<FakeDb>::builder(runner())
        .directory(DIRECTORY)
        .connection(ConnectionParams::url("sqlite::memory:"))
        .build()
        .await;
    assert!(matches!(result, Err(TaskError::Config(msg)) if msg.contains("connector")));
}

#[tokio::test]
async fn test_no_connection_when_callback_sets_database() {
    let connector = Arc::new(FakeConnector::refusing());

    let task = assert_ok!(
        MigrationTask::<FakeDb>::builder(runner())
            .directory(DIRECTORY)
            .connection(ConnectionParams::url("postgres://localhost/db"))
            .connector(connector.clone())
            .configure(|config| {
                config.set_database(FakeDb("configured"));
            })
            .build()
            .await
    );

    assert_eq!(task.database(), Some(&FakeDb("configured")));
    assert_eq!(connector.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_directory_checked_before_connecting() {
    let connector = Arc::new(FakeConnector::refusing());

    let err = assert_err!(
        MigrationTask::<FakeDb>::builder(runner())
            .connection(ConnectionParams::url("postgres://nowhere/db"))
            .connector(connector.clone())
            .build()
            .await
    );

    assert!(matches!(err, TaskError::Config(msg) if msg.contains("directory")));
    assert_eq!(connector.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_connection_failure_is_connection_error() {
    let err = assert_err!(
        MigrationTask::<FakeDb>::builder(runner())
            .directory(DIRECTORY)
            .connection(ConnectionParams::url("postgres://nowhere/db"))
            .connector(Arc::new(FakeConnector::refusing()))
            .build()
            .await
    );
    assert!(matches!(err, TaskError::Connection(ConnectionError::Failed(_))));
}

// ----------------------------------------------------------------------------
// Task registration
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_defines_environment_and_migrate() {
    let mut graph = TaskGraph::new();
    assert_ok!(
        MigrationTask::<FakeDb>::builder(runner())
            .directory(DIRECTORY)
            .database(FakeDb("main"))
            .install(&mut graph)
            .await
    );

    assert!(graph.is_defined(ENVIRONMENT_TASK));
    assert!(graph.is_defined(MIGRATE_TASK));

    let environment = graph.task(ENVIRONMENT_TASK).unwrap();
    assert_eq!(environment.name(), ENVIRONMENT_TASK);
    assert!(environment.prerequisites().is_empty());
    assert_eq!(environment.action_count(), 0);

    assert_eq!(
        graph.prerequisites(MIGRATE_TASK),
        Some(&[ENVIRONMENT_TASK.to_string()][..])
    );

    let migrate = graph.task(MIGRATE_TASK).unwrap();
    assert_eq!(migrate.name(), MIGRATE_TASK);
    assert_eq!(migrate.params(), &[VERSION_PARAM.to_string()]);
    assert!(migrate.description().is_some());
}

#[tokio::test]
async fn test_redeclaring_environment_keeps_hooks() {
    let mut graph = TaskGraph::new();
    graph.enhance(ENVIRONMENT_TASK, fn_action(|_| async { Ok(()) }));

    assert_ok!(
        MigrationTask::<FakeDb>::builder(runner())
            .directory(DIRECTORY)
            .install(&mut graph)
            .await
    );

    assert_eq!(graph.task(ENVIRONMENT_TASK).unwrap().action_count(), 1);
}

// ----------------------------------------------------------------------------
// Invocation
// ----------------------------------------------------------------------------

async fn installed(
    runner: Arc<RecordingMigrationRunner<FakeDb>>,
    builder: impl FnOnce(MigrationTaskBuilder<FakeDb>) -> MigrationTaskBuilder<FakeDb>,
) -> TaskGraph {
    let mut graph = TaskGraph::new();
    builder(MigrationTask::<FakeDb>::builder(runner))
        .install(&mut graph)
        .await
        .unwrap();
    graph
}

#[tokio::test]
async fn test_migrate_without_version() {
    let runner = runner();
    let graph = installed(runner.clone(), |b| {
        b.configure(|config| {
            config
                .set_database(FakeDb("main"))
                .set_table("table")
                .set_column("column")
                .set_directory(DIRECTORY);
        })
    })
    .await;

    assert_ok!(graph.invoke(MIGRATE_TASK, &[]).await);

    let call = runner.last_call().unwrap();
    assert_eq!(call.database, FakeDb("main"));
    assert_eq!(call.directory, PathBuf::from(DIRECTORY));
    assert_eq!(
        call.options,
        MigrationOptions {
            table: Some("table".to_string()),
            column: Some("column".to_string()),
            target: None,
        }
    );
}

#[tokio::test]
async fn test_migrate_with_version() {
    let runner = runner();
    let graph = installed(runner.clone(), |b| {
        b.directory(DIRECTORY)
            .database(FakeDb("main"))
            .options(MigrationTaskOptions::new().table("table").column("column"))
    })
    .await;

    assert_ok!(graph.invoke(MIGRATE_TASK, &["15".to_string()]).await);

    let call = runner.last_call().unwrap();
    assert_eq!(
        call.options,
        MigrationOptions {
            table: Some("table".to_string()),
            column: Some("column".to_string()),
            target: Some(15),
        }
    );
}

#[tokio::test]
async fn test_migrate_with_no_options() {
    let runner = runner();
    let graph = installed(runner.clone(), |b| {
        b.directory(DIRECTORY).database(FakeDb("main"))
    })
    .await;

    assert_ok!(graph.invoke(MIGRATE_TASK, &[]).await);

    let call = runner.last_call().unwrap();
    assert!(call.options.is_empty());
    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn test_invalid_version_argument() {
    let runner = runner();
    let graph = installed(runner.clone(), |b| {
        b.directory(DIRECTORY).database(FakeDb("main"))
    })
    .await;

    let err = assert_err!(graph.invoke(MIGRATE_TASK, &["latest".to_string()]).await);
    assert!(matches!(err, TaskError::Config(msg) if msg.contains("latest")));
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_uses_default_database() {
    let runner = runner();
    let default_db = Arc::new(DefaultDatabase::with_database(FakeDb("DB")));
    let graph = installed(runner.clone(), |b| {
        b.directory(DIRECTORY).fallback(default_db)
    })
    .await;

    assert_ok!(graph.invoke(MIGRATE_TASK, &[]).await);
    assert_eq!(runner.last_call().unwrap().database, FakeDb("DB"));
}

#[tokio::test]
async fn test_instance_database_wins_over_default() {
    let runner = runner();
    let default_db = Arc::new(DefaultDatabase::with_database(FakeDb("DB")));
    let graph = installed(runner.clone(), |b| {
        b.directory(DIRECTORY)
            .database(FakeDb("instance"))
            .fallback(default_db)
    })
    .await;

    assert_ok!(graph.invoke(MIGRATE_TASK, &[]).await);
    assert_eq!(runner.last_call().unwrap().database, FakeDb("instance"));
}

#[tokio::test]
async fn test_default_registered_by_environment_hook() {
    let runner = runner();
    let default_db: Arc<DefaultDatabase<FakeDb>> = Arc::new(DefaultDatabase::new());

    let mut graph = TaskGraph::new();
    let hook_db = Arc::clone(&default_db);
    graph.enhance(
        ENVIRONMENT_TASK,
        fn_action(move |_| {
            let hook_db = Arc::clone(&hook_db);
            async move {
                hook_db.set(FakeDb("from-environment"));
                Ok(())
            }
        }),
    );

    MigrationTask::<FakeDb>::builder(runner.clone())
        .directory(DIRECTORY)
        .fallback(default_db)
        .install(&mut graph)
        .await
        .unwrap();

    assert_ok!(graph.invoke(MIGRATE_TASK, &[]).await);
    assert_eq!(
        runner.last_call().unwrap().database,
        FakeDb("from-environment")
    );
}

#[tokio::test]
async fn test_missing_database_fails_at_invocation() {
    let runner = runner();
    let graph = installed(runner.clone(), |b| b.directory(DIRECTORY)).await;

    let err = assert_err!(graph.invoke(MIGRATE_TASK, &[]).await);
    assert!(matches!(err, TaskError::MissingDatabase));
    assert!(err.to_string().contains("environment task"));
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_runner_errors_propagate_unchanged() {
    let runner = Arc::new(RecordingMigrationRunner::new_fail("disk full"));
    let graph = installed(runner.clone(), |b| {
        b.directory(DIRECTORY).database(FakeDb("main"))
    })
    .await;

    let err = assert_err!(graph.invoke(MIGRATE_TASK, &[]).await);
    match err {
        TaskError::Migration(MigrationError::Database(msg)) => assert_eq!(msg, "disk full"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_parse_version() {
    assert_eq!(parse_version(None).unwrap(), None);
    assert_eq!(parse_version(Some("")).unwrap(), None);
    assert_eq!(parse_version(Some("15")).unwrap(), Some(15));
    assert_eq!(parse_version(Some(" 0 ")).unwrap(), Some(0));
    assert!(parse_version(Some("v2")).is_err());
}
