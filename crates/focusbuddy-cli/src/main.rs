mod commands;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use focusbuddy_core::config::get_data_dir;

use commands::{
    categories::{add_category, list_categories, remove_category},
    daemon::{run_daemon_foreground, run_daemon_process, show_status, start_daemon, stop_daemon},
    focus::{block_process, set_auto_minimize, set_focus_mode, show_focus, unblock_process},
    init::init_command,
    report::{handle_report_command, handle_top_command},
};

#[derive(Parser)]
#[command(name = "focusbuddy")]
#[command(about = "Foreground window usage tracker with focus mode", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the data directory with default settings and category rules
    Init {
        /// Overwrite existing settings and rules
        #[arg(short, long)]
        force: bool,
    },
    /// Start the tracking daemon in the background
    Start,
    /// (Internal) Run the daemon process
    #[command(hide = true)]
    DaemonInternalStart,
    /// Run the tracker in the foreground until Ctrl-C
    Run,
    /// Stop the tracking daemon
    Stop,
    /// Show what is being tracked right now
    Status,
    /// Usage per category
    Report {
        /// Time period: today or week
        #[arg(default_value = "today")]
        period: String,
        /// Report a single past day instead (YYYY-MM-DD)
        #[arg(short, long, conflicts_with = "period")]
        date: Option<NaiveDate>,
    },
    /// Most used applications today, or on a given day
    Top {
        /// Number of applications to show
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
        /// Day to rank (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Manage category rules
    Categories {
        #[command(subcommand)]
        action: Option<CategoryAction>,
    },
    /// Focus mode settings
    Focus {
        #[command(subcommand)]
        action: Option<FocusAction>,
    },
}

#[derive(Subcommand, Debug)]
enum CategoryAction {
    /// List all rules in match order
    List,
    /// Add a rule, or extend the rule for an existing category
    Add {
        /// Category label
        category: String,
        /// Process name to match (repeatable), e.g. code.exe
        #[arg(short, long = "process")]
        processes: Vec<String>,
        /// Window title keyword to match (repeatable)
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,
    },
    /// Remove the rule for a category
    Remove {
        /// Category label
        category: String,
    },
}

#[derive(Subcommand, Debug)]
enum FocusAction {
    /// Show focus mode settings
    Show,
    /// Turn focus mode on
    Enable,
    /// Turn focus mode off
    Disable,
    /// Mark a process as distracting
    Block {
        /// Process name, e.g. steam.exe
        process: String,
    },
    /// Remove a process from the distracting list
    Unblock {
        /// Process name
        process: String,
    },
    /// Minimize distracting windows when they take focus
    AutoMinimize {
        #[arg(value_enum)]
        state: Switch,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Switch {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::DaemonInternalStart) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_secs()
            .init();
    }

    let data_dir = get_data_dir()?;

    match cli.command {
        Commands::Init { force } => init_command(&data_dir, force),
        Commands::Start => start_daemon(&data_dir),
        Commands::DaemonInternalStart => run_daemon_process(&data_dir).await,
        Commands::Run => run_daemon_foreground(&data_dir).await,
        Commands::Stop => stop_daemon(&data_dir).await,
        Commands::Status => show_status(&data_dir).await,
        Commands::Report { period, date } => handle_report_command(&period, date),
        Commands::Top { limit, date } => handle_top_command(limit, date),
        Commands::Categories { action } => match action.unwrap_or(CategoryAction::List) {
            CategoryAction::List => list_categories(&data_dir),
            CategoryAction::Add {
                category,
                processes,
                keywords,
            } => add_category(&data_dir, &category, processes, keywords).await,
            CategoryAction::Remove { category } => remove_category(&data_dir, &category).await,
        },
        Commands::Focus { action } => match action.unwrap_or(FocusAction::Show) {
            FocusAction::Show => show_focus(&data_dir),
            FocusAction::Enable => set_focus_mode(&data_dir, true).await,
            FocusAction::Disable => set_focus_mode(&data_dir, false).await,
            FocusAction::Block { process } => block_process(&data_dir, &process).await,
            FocusAction::Unblock { process } => unblock_process(&data_dir, &process).await,
            FocusAction::AutoMinimize { state } => {
                set_auto_minimize(&data_dir, matches!(state, Switch::On)).await
            }
        },
    }
}
