//! Command-line front end for watch tasks and runs.
//!
//! Every command prints its result as pretty JSON on standard output; logs
//! go to standard error and are filtered by `TRENDWATCH_LOG`.

use std::{io::Write, sync::Arc};

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use eyre::{Result, WrapErr};
use mockable::DefaultClock;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use trendwatch::{
    config::WatchConfig,
    run::{
        adapters::{
            chat_expander::ChatCompletionExpander,
            command_pipeline::CommandReportPipeline,
            fs_resource::DirResource,
            json_results::JsonResultSource,
            memory::StaticKeywordExpander,
        },
        domain::AdHocRunRequest,
        ports::KeywordExpander,
        services::{ConfigTransaction, RunCollaborators, RunCoordinator},
    },
    task::{
        adapters::sqlite::SqliteTaskRepository,
        services::{CreateTaskRequest, TaskLifecycleService, UpdateTaskRequest},
    },
};

const LOG_ENV: &str = "TRENDWATCH_LOG";

/// Trendwatch: persistent keyword watch tasks.
#[derive(Parser)]
#[command(name = "trendwatch", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "trendwatch.toml")]
    config: Utf8PathBuf,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage users.
    #[command(subcommand)]
    User(UserCommand),
    /// Manage and run watch tasks.
    #[command(subcommand)]
    Task(TaskCommand),
    /// Run an ad hoc search.
    Search(SearchArgs),
}

#[derive(Subcommand)]
enum UserCommand {
    /// Create the user unless it exists.
    Ensure {
        /// User identifier.
        user_id: String,
    },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Create a task.
    Create(CreateArgs),
    /// List a user's tasks.
    List {
        /// Owning user.
        #[arg(long)]
        user: String,
        /// Only tasks with this status.
        #[arg(long)]
        status: Option<String>,
    },
    /// Show a task and its recent executions.
    Show {
        /// Task identifier.
        task_id: String,
    },
    /// Update a task.
    Update(UpdateArgs),
    /// Delete a task and its history.
    Delete {
        /// Task identifier.
        task_id: String,
        /// Acting user.
        #[arg(long)]
        user: String,
    },
    /// Run a stored task.
    Run {
        /// Task identifier.
        task_id: String,
    },
}

#[derive(Args)]
struct CreateArgs {
    /// Owning user.
    #[arg(long)]
    user: String,
    /// Task name.
    #[arg(long)]
    name: String,
    /// Search keyword; repeatable.
    #[arg(long = "keyword", required = true)]
    keywords: Vec<String>,
    /// Exclusion term; repeatable.
    #[arg(long = "filter")]
    filters: Vec<String>,
    /// Platform identifier; repeatable.
    #[arg(long = "platform")]
    platforms: Vec<String>,
    /// Report mode: current, daily, or incremental.
    #[arg(long)]
    mode: Option<String>,
    /// Schedule descriptor.
    #[arg(long)]
    schedule: Option<String>,
    /// Search the keywords verbatim.
    #[arg(long)]
    no_expand: bool,
    /// Free-form description.
    #[arg(long)]
    description: Option<String>,
}

#[derive(Args)]
struct UpdateArgs {
    /// Task identifier.
    task_id: String,
    /// Acting user.
    #[arg(long)]
    user: String,
    /// New name.
    #[arg(long)]
    name: Option<String>,
    /// Replacement keywords; repeatable.
    #[arg(long = "keyword")]
    keywords: Vec<String>,
    /// Replacement exclusion terms; repeatable.
    #[arg(long = "filter", conflicts_with = "clear_filters")]
    filters: Vec<String>,
    /// Remove every exclusion term.
    #[arg(long)]
    clear_filters: bool,
    /// Replacement platforms; repeatable.
    #[arg(long = "platform", conflicts_with = "clear_platforms")]
    platforms: Vec<String>,
    /// Search every configured platform.
    #[arg(long)]
    clear_platforms: bool,
    /// New report mode.
    #[arg(long)]
    mode: Option<String>,
    /// New schedule descriptor.
    #[arg(long, conflicts_with = "clear_schedule")]
    schedule: Option<String>,
    /// Remove the schedule.
    #[arg(long)]
    clear_schedule: bool,
    /// Enable or disable keyword expansion.
    #[arg(long)]
    expand: Option<bool>,
    /// New status: active, paused, or archived.
    #[arg(long)]
    status: Option<String>,
    /// New description.
    #[arg(long)]
    description: Option<String>,
}

#[derive(Args)]
struct SearchArgs {
    /// Search keyword; repeatable.
    #[arg(long = "keyword", required = true)]
    keywords: Vec<String>,
    /// Exclusion term; repeatable.
    #[arg(long = "filter")]
    filters: Vec<String>,
    /// Platform identifier; repeatable.
    #[arg(long = "platform")]
    platforms: Vec<String>,
    /// Report mode.
    #[arg(long)]
    mode: Option<String>,
    /// Search the keywords verbatim.
    #[arg(long)]
    no_expand: bool,
    /// Return ranked links instead of rendering a report.
    #[arg(long)]
    links: bool,
}

type Lifecycle = TaskLifecycleService<SqliteTaskRepository, DefaultClock>;
type Coordinator = RunCoordinator<SqliteTaskRepository, DefaultClock>;

struct App {
    lifecycle: Lifecycle,
    coordinator: Coordinator,
}

impl App {
    fn build(config: &WatchConfig) -> Result<Self> {
        let database_dir = config
            .storage
            .database_path
            .parent()
            .filter(|parent| !parent.as_str().is_empty());
        if let Some(parent) = database_dir {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("failed to create {parent}"))?;
        }
        let repository = Arc::new(
            SqliteTaskRepository::open(config.storage.database_path.as_str())
                .wrap_err("failed to open task database")?,
        );
        let clock = Arc::new(DefaultClock);
        let lifecycle = TaskLifecycleService::new(Arc::clone(&repository), Arc::clone(&clock))
            .with_recent_executions(config.history.recent_limit);

        let resources = &config.resources;
        let transaction = ConfigTransaction::new(
            Arc::new(DirResource::open(&resources.config_dir, &resources.filter_file)?),
            Arc::new(DirResource::open(&resources.config_dir, &resources.settings_file)?),
        );
        let expander: Arc<dyn KeywordExpander> = if config.expander.enabled {
            Arc::new(ChatCompletionExpander::new(config.expander.chat_settings())?)
        } else {
            Arc::new(StaticKeywordExpander::identity())
        };
        let collaborators = RunCollaborators {
            expander,
            pipeline: Arc::new(CommandReportPipeline::new(config.pipeline.command_settings())),
            results: Arc::new(JsonResultSource::new(config.results.snapshot_dir.clone())),
            transaction,
        };
        let coordinator = RunCoordinator::new(repository, clock, collaborators);
        Ok(Self {
            lifecycle,
            coordinator,
        })
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn emit(value: &impl Serialize) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).wrap_err("failed to encode output")?;
    writeln!(stdout).wrap_err("failed to write output")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);
    let config = WatchConfig::load(&cli.config)?;
    let app = App::build(&config)?;

    match cli.command {
        Command::User(UserCommand::Ensure { user_id }) => {
            emit(&app.lifecycle.ensure_user(&user_id).await?)
        }
        Command::Task(command) => run_task_command(&app, command).await,
        Command::Search(args) => {
            let request = AdHocRunRequest::new(args.keywords)
                .with_filters(args.filters)
                .with_platforms(args.platforms)
                .with_expand_keywords(!args.no_expand)
                .with_generate_artifact(!args.links);
            let moded = match args.mode {
                Some(mode) => request.with_report_mode(mode),
                None => request,
            };
            emit(&app.coordinator.execute_ad_hoc(moded).await?)
        }
    }
}

async fn run_task_command(app: &App, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::Create(args) => {
            emit(&app.lifecycle.create_task(create_request(args)).await?)
        }
        TaskCommand::List { user, status } => {
            emit(&app.lifecycle.list_tasks(&user, status.as_deref()).await?)
        }
        TaskCommand::Show { task_id } => emit(&app.lifecycle.get_task(&task_id).await?),
        TaskCommand::Update(args) => {
            emit(&app.lifecycle.update_task(update_request(args)).await?)
        }
        TaskCommand::Delete { task_id, user } => {
            app.lifecycle.delete_task(&task_id, &user).await?;
            emit(&serde_json::json!({ "deleted": task_id }))
        }
        TaskCommand::Run { task_id } => emit(&app.coordinator.execute_task(&task_id).await?),
    }
}

fn create_request(args: CreateArgs) -> CreateTaskRequest {
    let base = CreateTaskRequest::new(args.name, args.user, args.keywords)
        .with_filters(args.filters)
        .with_platforms(args.platforms)
        .with_expand_keywords(!args.no_expand);
    let with_mode = match args.mode {
        Some(mode) => base.with_report_mode(mode),
        None => base,
    };
    let with_schedule = match args.schedule {
        Some(schedule) => with_mode.with_schedule(schedule),
        None => with_mode,
    };
    match args.description {
        Some(description) => with_schedule.with_description(description),
        None => with_schedule,
    }
}

fn update_request(args: UpdateArgs) -> UpdateTaskRequest {
    let mut request = UpdateTaskRequest::new(args.task_id, args.user);
    if let Some(name) = args.name {
        request = request.with_name(name);
    }
    if !args.keywords.is_empty() {
        request = request.with_keywords(args.keywords);
    }
    if !args.filters.is_empty() {
        request = request.with_filters(args.filters);
    }
    if args.clear_filters {
        request = request.clear_filters();
    }
    if !args.platforms.is_empty() {
        request = request.with_platforms(args.platforms);
    }
    if args.clear_platforms {
        request = request.clear_platforms();
    }
    if let Some(mode) = args.mode {
        request = request.with_report_mode(mode);
    }
    if let Some(schedule) = args.schedule {
        request = request.with_schedule(schedule);
    }
    if args.clear_schedule {
        request = request.clear_schedule();
    }
    if let Some(expand) = args.expand {
        request = request.with_expand_keywords(expand);
    }
    if let Some(status) = args.status {
        request = request.with_status(status);
    }
    if let Some(description) = args.description {
        request = request.with_description(description);
    }
    request
}
