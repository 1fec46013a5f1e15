//! ticketdesk - a command-line client for the help desk.
//!
//! Signs in against the help desk backend, keeps the session alive across
//! expired access tokens and lists or updates tickets.

mod commands;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ticketdesk_core::{ApiClient, Config, CredentialStore, SessionManager};

/// Log file name prefix inside `log_dir`
const LOG_FILE_PREFIX: &str = "ticketdesk.log";

#[derive(Debug, Parser)]
#[command(name = "ticketdesk", version, about = "Help desk tickets from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show the signed-in user
    Whoami,
    /// Sign in
    Login {
        /// Login name (prompted when omitted)
        #[arg(long)]
        login: Option<String>,
        /// Stay signed in across restarts
        #[arg(long)]
        remember: bool,
    },
    /// Sign out
    Logout,
    /// Support queue
    Tickets {
        /// new, in_progress, closed or all
        #[arg(long, default_value = "new")]
        tab: String,
        /// Search text
        #[arg(long)]
        query: Option<String>,
    },
    /// Tickets you filed
    MyTickets,
    /// Show one ticket
    Ticket { id: i64 },
    /// Assign a ticket to a support user
    Assign { id: i64, assignee: i64 },
    /// Add a message to a ticket
    Reply {
        id: i64,
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        message: Vec<String>,
    },
    /// Run commands in one session until `quit`
    Shell,
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the log file and must live until exit.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let (mut config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    let _log_guard = init_tracing(&config);
    if let Some(e) = config_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }

    let store = Arc::new(CredentialStore::from_config(&config)?);
    let api = ApiClient::from_config(&config, store)?;
    let session = SessionManager::new(api);
    info!(api_url = %session.api().base_url(), "ticketdesk starting");

    match cli.command {
        Command::Shell => run_shell(&session, &mut config).await,
        command => commands::run(&session, &mut config, command).await,
    }
}

/// Read commands line by line, sharing one session.
///
/// A login without `--remember` stays usable here until the loop ends.
async fn run_shell(session: &SessionManager, config: &mut Config) -> Result<()> {
    println!("ticketdesk shell - type `help` for commands, `quit` to leave");

    loop {
        print!("ticketdesk> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let words: Vec<&str> = line.split_whitespace().collect();

        match words.first().copied() {
            None => continue,
            Some("quit") | Some("exit") => break,
            Some("help") => {
                println!("whoami | login [--remember] | logout | tickets [--tab TAB] [--query Q]");
                println!("my-tickets | ticket ID | assign ID ASSIGNEE | reply ID MESSAGE | quit");
                continue;
            }
            Some(_) => {}
        }

        let parsed = Cli::try_parse_from(std::iter::once("ticketdesk").chain(words));
        match parsed {
            Ok(Cli {
                command: Command::Shell,
            }) => println!("Already in the shell"),
            Ok(Cli { command }) => {
                if let Err(e) = commands::run(session, config, command).await {
                    eprintln!("Error: {}", e);
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }

    Ok(())
}
