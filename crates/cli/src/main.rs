//! Migrate Task CLI - runs the `migrate` task against SQLite
//!
//! Wiring: settings (file + env) form the options layer, command-line flags
//! are applied last through a configuration callback.

mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use migrate_task_core::application::migration_task::{ENVIRONMENT_TASK, MIGRATE_TASK};
use migrate_task_core::application::{fn_action, MigrationTask, TaskGraph};
use migrate_task_core::domain::TaskInfo;
use migrate_task_core::port::DefaultDatabase;
use migrate_task_core::TaskError;
use migrate_task_sqlite::{create_pool, SqliteConnector, SqliteMigrationRunner, SqlitePool};
use settings::{Settings, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Database opened by the `environment` hook when no database URL is configured
const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Parser)]
#[command(name = "migrate-task")]
#[command(about = "Run database migrations as a task", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (TOML, optional)
    #[arg(long, env = "MIGRATE_TASK_CONFIG", default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,

    /// Directory containing migration scripts
    #[arg(short, long, global = true)]
    directory: Option<PathBuf>,

    /// Database URL (e.g. sqlite://app.db)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Table recording the applied version
    #[arg(long, global = true)]
    table: Option<String>,

    /// Column recording the applied version
    #[arg(long, global = true)]
    column: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate the database to VERSION or the latest version
    Migrate {
        /// Target version (default: latest)
        version: Option<String>,
    },

    /// List defined tasks
    Tasks {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Tabled)]
struct TaskRow {
    task: String,
    prerequisites: String,
    description: String,
}

impl From<TaskInfo> for TaskRow {
    fn from(info: TaskInfo) -> Self {
        let task = if info.params.is_empty() {
            info.name
        } else {
            format!("{}[{}]", info.name, info.params.join(","))
        };
        Self {
            task,
            prerequisites: info.prerequisites.join(", "),
            description: info.description.unwrap_or_default(),
        }
    }
}

fn init_logging() -> Result<()> {
    let log_format =
        std::env::var("MIGRATE_TASK_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("migrate_task=info"))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

/// Build the task graph: environment hook + migration tasks
///
/// `fallback_url` (normally `DATABASE_URL`) is opened by the `environment`
/// task, and only when neither the flags nor the settings name a database.
async fn build_graph(
    cli: &Cli,
    settings: Settings,
    fallback_url: Option<String>,
) -> Result<(TaskGraph, Arc<MigrationTask<SqlitePool>>)> {
    let mut graph = TaskGraph::new();
    let default_db: Arc<DefaultDatabase<SqlitePool>> = Arc::new(DefaultDatabase::new());

    let database_url = cli
        .database_url
        .clone()
        .or_else(|| settings.database_url.clone());

    if let (None, Some(url)) = (&database_url, fallback_url) {
        let hook_db = Arc::clone(&default_db);
        graph.enhance(
            ENVIRONMENT_TASK,
            fn_action(move |_| {
                let hook_db = Arc::clone(&hook_db);
                let url = url.clone();
                async move {
                    let pool = create_pool(&url).await?;
                    info!(env = DATABASE_URL_ENV, "Registered default database");
                    hook_db.set(pool);
                    Ok::<(), TaskError>(())
                }
            }),
        );
    }

    let mut builder = MigrationTask::<SqlitePool>::builder(Arc::new(SqliteMigrationRunner::new()))
        .connector(Arc::new(SqliteConnector::new()))
        .fallback(default_db)
        .options(settings.options());

    if let Some(url) = &database_url {
        builder = builder.connection(settings.connection_params(url));
    }

    let directory = cli.directory.clone();
    let table = cli.table.clone();
    let column = cli.column.clone();
    builder = builder.configure(move |config| {
        if let Some(directory) = directory {
            config.set_directory(directory);
        }
        if let Some(table) = table {
            config.set_table(table);
        }
        if let Some(column) = column {
            config.set_column(column);
        }
    });

    let task = builder
        .install(&mut graph)
        .await
        .context("Failed to configure the migrate task")?;

    Ok((graph, task))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    info!("migrate-task v{}", VERSION);

    let settings = Settings::load(&cli.config)?;
    let (graph, task) =
        build_graph(&cli, settings, std::env::var(DATABASE_URL_ENV).ok()).await?;
    info!(directory = %task.directory().display(), "Migration task configured");

    match &cli.command {
        Commands::Migrate { version } => {
            let args: Vec<String> = version.iter().cloned().collect();
            graph
                .invoke(MIGRATE_TASK, &args)
                .await
                .context("Migration failed")?;

            println!("{}", "✓ Migrations complete".green().bold());
        }

        Commands::Tasks { json } => {
            let tasks = graph.tasks();
            if *json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else {
                let rows: Vec<TaskRow> = tasks.into_iter().map(TaskRow::from).collect();
                println!("{}", Table::new(rows));
            }
        }
    }

    Ok(())
}
