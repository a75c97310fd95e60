//! Stop Governor - continuation governors for agent stop hooks
//!
//! Command-line entry point: stop-hook adapters plus task and configuration
//! inspection commands.

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use stop_governor::config::{GovernorConfig, GovernorSettings, TASK_LIST_ID_ENV};
use stop_governor::hooks::{run_stop_hook, HookInput, HookKind};
use stop_governor::task::{classify, find_executable, load_tasks, resolve};

#[derive(Parser)]
#[command(name = "stop-governor")]
#[command(version = "0.1.0")]
#[command(about = "Decide whether an agent session may stop or should keep working", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format (logs always go to stderr)
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Stop-hook adapters
    Hook {
        #[command(subcommand)]
        action: HookAction,
    },

    /// Inspect a ticket's tasks
    Tasks {
        #[command(subcommand)]
        action: TasksAction,
    },

    /// Show resolved configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum HookAction {
    /// Run a governor for one stop event
    Run {
        /// Governor to run
        #[arg(value_enum)]
        hook_type: HookKind,

        /// Hook payload as JSON (read from stdin when omitted)
        input: Option<String>,
    },
}

#[derive(Subcommand)]
enum TasksAction {
    /// Print the readiness classification as JSON
    Resolve {
        /// Ticket id
        #[arg(short, long, env = TASK_LIST_ID_ENV)]
        ticket: Option<String>,

        /// Only consider tasks whose subject contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Show a readiness summary
    Status {
        /// Ticket id
        #[arg(short, long, env = TASK_LIST_ID_ENV)]
        ticket: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "stop_governor=debug,info"
        } else {
            "stop_governor=info,warn"
        })
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    // Resolve project path
    let project_path = cli.project.canonicalize().unwrap_or(cli.project.clone());

    match cli.command {
        Commands::Hook { action } => match action {
            HookAction::Run { hook_type, input } => {
                // Stop hooks never fail the host: every error ends in silence
                let raw = input.unwrap_or_else(read_stdin);
                let config = GovernorConfig::from_env(&project_path);
                if let Some(line) = run_stop_hook(hook_type, &HookInput::parse(&raw), &config) {
                    println!("{}", line);
                }
            }
        },

        Commands::Tasks { action } => {
            let config = GovernorConfig::from_env(&project_path);
            match action {
                TasksAction::Resolve { ticket, filter } => {
                    // A blank --ticket falls back to the environment
                    let ticket = ticket
                        .as_deref()
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .or(config.ticket_id.as_deref());
                    let output = resolve(config.home_dir.as_deref(), ticket, filter.as_deref());
                    println!("{}", output.to_json()?);
                }

                TasksAction::Status { ticket } => {
                    let config = match ticket.filter(|t| !t.trim().is_empty()) {
                        Some(ticket) => config.with_ticket_id(ticket),
                        None => config,
                    };
                    print_task_status(&config)?;
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show { json } => {
                ensure_project_exists(&project_path);
                let config = GovernorConfig::from_env(&project_path);

                if json {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                } else {
                    print_config(&config);
                }
            }
        },
    }

    Ok(())
}

fn read_stdin() -> String {
    let mut raw = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut raw) {
        tracing::debug!("Could not read hook input from stdin: {}", e);
    }
    raw
}

fn ensure_project_exists(project_path: &Path) {
    if !project_path.exists() {
        eprintln!(
            "{} Project directory does not exist: {}",
            "Error:".red().bold(),
            project_path.display()
        );
        std::process::exit(1);
    }
}

fn print_task_status(config: &GovernorConfig) -> anyhow::Result<()> {
    let Some(ticket) = config.ticket_id.as_deref() else {
        eprintln!(
            "{} No ticket id (pass --ticket or set {})",
            "Error:".red().bold(),
            TASK_LIST_ID_ENV
        );
        std::process::exit(1);
    };
    let Some(dir) = config.tasks_dir() else {
        eprintln!("{} HOME directory not found", "Error:".red().bold());
        std::process::exit(1);
    };

    let report = load_tasks(&dir)?;
    let classification = classify(&report.graph, None);
    let executable = find_executable(&report.graph);

    println!("\n{} {}", "Tasks:".cyan().bold(), ticket.bold());
    println!("{}", "─".repeat(40));
    println!("   Directory: {}", dir.display());
    println!("   Loaded: {}", report.graph.len());
    if report.skipped_count() > 0 {
        println!(
            "   {} {} record(s) skipped",
            "Warning:".yellow().bold(),
            report.skipped_count()
        );
    }

    println!(
        "\n   {} {}",
        "Ready:".green().bold(),
        join_or_dash(&classification.ready)
    );
    println!(
        "   {} {}",
        "Pending:".yellow().bold(),
        join_or_dash(&classification.pending)
    );
    println!(
        "   {} {}",
        "Completed:".blue().bold(),
        join_or_dash(&classification.completed)
    );

    if !classification.blocked.is_empty() {
        println!("\n   {}", "Blocked:".red().bold());
        for (id, blockers) in &classification.blocked {
            println!("     {} ← {}", id.bold(), blockers.join(", "));
        }
    }

    println!(
        "\n   {} {}",
        "autoRun executable:".cyan().bold(),
        join_or_dash(&executable)
    );
    Ok(())
}

fn join_or_dash(ids: &[String]) -> String {
    if ids.is_empty() {
        "-".dimmed().to_string()
    } else {
        ids.join(", ")
    }
}

fn print_config(config: &GovernorConfig) {
    let display_opt = |value: Option<String>| value.unwrap_or_else(|| "(not set)".dimmed().to_string());

    println!("\n{} Stop Governor Configuration", "Config:".cyan().bold());
    println!("{}", "─".repeat(40));
    println!("   Project: {}", config.project_dir.display());
    println!(
        "   Settings file: {}",
        GovernorSettings::settings_path(&config.project_dir).display()
    );
    println!(
        "   Home: {}",
        display_opt(config.home_dir.as_ref().map(|h| h.display().to_string()))
    );
    println!("   Ticket: {}", display_opt(config.ticket_id.clone()));
    println!(
        "   Task directory: {}",
        display_opt(config.tasks_dir().map(|d| d.display().to_string()))
    );
    println!("   Cooldown: {}s", config.settings.cooldown_seconds);
    println!("   Refine kinds: {}", config.settings.refine_kinds.join(", "));
    println!(
        "   Refine directory: {}",
        config.refine_base_dir().display()
    );
    println!("   Trigger lock: {}", config.trigger_lock_path().display());
}
