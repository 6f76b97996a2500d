mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

use crate::commands::{
    cmd_admin_init, cmd_adhoc, cmd_chore_add, cmd_chore_list, cmd_chore_remove, cmd_done,
    cmd_stats, cmd_undo, cmd_user_add, cmd_user_list, cmd_user_remove, cmd_week,
};
use crate::config::Config;
use chores_core::ChoreService;

#[derive(Parser)]
#[command(
    name = "chores",
    version,
    about = "A weekly household chore tracker",
    long_about = "Track who did which household chore, week by week.\n\n\
        Run `chores serve` to expose the REST API, or use the subcommands \
        below to manage the household from the terminal."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the week grid: every chore on every day it is due
    Week {
        /// Any date in the week to show, or its Monday (YYYY-MM-DD, today, yesterday, tomorrow)
        #[arg(long)]
        week: Option<String>,
        /// Only chores assigned to this user
        #[arg(long)]
        user: Option<i64>,
        /// Only chores with this frequency: daily, weekly, twice_weekly
        #[arg(long)]
        frequency: Option<String>,
        /// List this user's chores first within each day
        #[arg(long)]
        viewer: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a chore as done
    Done {
        /// Chore ID
        chore_id: i64,
        /// User who did it
        #[arg(short, long)]
        user: i64,
        /// Day it was done (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Optional note
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a completion (undo "done")
    Undo {
        /// Completion ID
        completion_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a one-off chore that is not on the schedule
    Adhoc {
        /// What was done (reuses an earlier one-off chore with the same name)
        name: String,
        /// User who did it
        #[arg(short, long)]
        user: i64,
        /// Day it was done (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Description for a newly created one-off chore
        #[arg(long)]
        description: Option<String>,
        /// Optional note
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage household members
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Manage chores
    Chore {
        #[command(subcommand)]
        command: ChoreCommands,
    },
    /// Administrative tasks
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
    /// Completion statistics
    Stats {
        /// Only this user's completions
        #[arg(long)]
        user: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8001")]
        port: u16,
        /// Address to bind to (use 0.0.0.0 for LAN access)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Add a household member
    Add {
        /// Display name
        name: String,
        /// Email address
        #[arg(long)]
        email: Option<String>,
        /// Give admin privileges
        #[arg(long)]
        admin: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List household members
    List {
        /// Include inactive members
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a household member and their completions
    Remove {
        /// User ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ChoreCommands {
    /// Add a recurring chore
    Add {
        /// Chore name
        name: String,
        /// daily, weekly, or twice_weekly
        #[arg(short, long, default_value = "weekly")]
        frequency: String,
        /// Day it is due (monday-sunday, mon-sun, or 0-6)
        #[arg(long)]
        day: Option<String>,
        /// Second day for twice_weekly chores
        #[arg(long)]
        day2: Option<String>,
        /// Assign to this user
        #[arg(short, long)]
        user: Option<i64>,
        /// Longer description
        #[arg(long)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List chores
    List {
        /// Include inactive chores
        #[arg(long)]
        all: bool,
        /// Only chores assigned to this user
        #[arg(long)]
        user: Option<i64>,
        /// Include one-off chores
        #[arg(long)]
        adhoc: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a chore and its completion history
    Remove {
        /// Chore ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Make sure an admin exists (CHORES_ADMIN_NAME / CHORES_ADMIN_EMAIL)
    Init {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if matches!(cli.command, Commands::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let svc = ChoreService::new(&config.db_path, config.timezone)?;

    match cli.command {
        Commands::Week {
            week,
            user,
            frequency,
            viewer,
            json,
        } => cmd_week(&svc, week.as_deref(), user, frequency.as_deref(), viewer, json),
        Commands::Done {
            chore_id,
            user,
            date,
            notes,
            json,
        } => cmd_done(&svc, chore_id, user, date.as_deref(), notes, json),
        Commands::Undo {
            completion_id,
            json,
        } => cmd_undo(&svc, completion_id, json),
        Commands::Adhoc {
            name,
            user,
            date,
            description,
            notes,
            json,
        } => cmd_adhoc(&svc, name, user, date.as_deref(), description, notes, json),
        Commands::User { command } => match command {
            UserCommands::Add {
                name,
                email,
                admin,
                json,
            } => cmd_user_add(&svc, name, email, admin, json),
            UserCommands::List { all, json } => cmd_user_list(&svc, all, json),
            UserCommands::Remove { id, json } => cmd_user_remove(&svc, id, json),
        },
        Commands::Chore { command } => match command {
            ChoreCommands::Add {
                name,
                frequency,
                day,
                day2,
                user,
                description,
                json,
            } => cmd_chore_add(
                &svc,
                name,
                &frequency,
                day.as_deref(),
                day2.as_deref(),
                user,
                description,
                json,
            ),
            ChoreCommands::List {
                all,
                user,
                adhoc,
                json,
            } => cmd_chore_list(&svc, all, user, adhoc, json),
            ChoreCommands::Remove { id, json } => cmd_chore_remove(&svc, id, json),
        },
        Commands::Admin { command } => match command {
            AdminCommands::Init { json } => cmd_admin_init(&svc, &config, json),
        },
        Commands::Stats { user, json } => cmd_stats(&svc, user, json),
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let (admin, created) =
                svc.ensure_admin(&config.admin_name, config.admin_email.as_deref())?;
            if created {
                eprintln!("Created admin user '{}' (id {})", admin.name, admin.id);
            }
            let api_key = if no_auth {
                None
            } else {
                Some(config.load_or_create_api_key()?.0)
            };
            server::start_server(svc, port, &bind, api_key).await
        }
    }
}
