pub mod commands;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "civic")]
#[command(author, version, about = "Classify and triage civic issue reports", long_about = None)]
pub struct Cli {
    /// Override the data directory (default: ~/.civic/, env: CIVIC_HOME)
    #[arg(long, global = true)]
    pub home: Option<String>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Classify a description with the keyword rules
    Classify {
        /// Issue description
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Analyze a description with the model, falling back to the rules
    Analyze {
        /// Issue description
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show the keyword rules in evaluation order
    Rules,

    /// File a new report
    Submit {
        /// Issue description
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Reporter email
        #[arg(long)]
        email: Option<String>,

        /// Latitude of the issue
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude of the issue
        #[arg(long, allow_negative_numbers = true)]
        lon: Option<f64>,

        /// URL of an uploaded photo
        #[arg(long)]
        image_url: Option<String>,
    },

    /// Show a report by ticket id
    Lookup {
        /// Ticket id (e.g., CS-12345)
        ticket: String,
    },

    /// List reports in triage order with dashboard metrics
    List {
        /// Only show reports matching this term
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Change a report's status
    SetStatus {
        /// Ticket id (e.g., CS-12345)
        ticket: String,

        /// Submitted, Verified, Dispatched or Resolved
        status: String,

        /// Refuse the update unless the stored version matches
        #[arg(long)]
        version: Option<u64>,
    },

    /// Sign or verify session tokens (requires AUTH_SECRET)
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum TokenAction {
    /// Issue a session token
    Sign {
        /// Email to embed in the session
        email: String,

        /// Sign an administrator session
        #[arg(long)]
        admin: bool,
    },

    /// Check a session token and print its claims
    Verify {
        /// Token to check
        token: String,
    },
}

/// Resolve a potentially relative path to an absolute one.
fn resolve_absolute(path: &Path) -> Result<PathBuf, String> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| e.to_string())?;
    Ok(cwd.join(path))
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<(), String> {
    // Set CIVIC_HOME early so every config lookup sees the override
    if let Some(home) = &cli.home {
        let absolute = resolve_absolute(Path::new(home))?;
        std::env::set_var("CIVIC_HOME", &absolute);
    }

    let format = cli.format;
    match cli.command {
        Commands::Classify { text } => commands::classify::run(&text.join(" "), format),
        Commands::Analyze { text } => commands::classify::run_analyze(&text.join(" "), format),
        Commands::Rules => commands::rules::run(format),
        Commands::Submit {
            text,
            email,
            lat,
            lon,
            image_url,
        } => commands::submit::run(&text.join(" "), email, lat, lon, image_url, format),
        Commands::Lookup { ticket } => commands::lookup::run(&ticket, format),
        Commands::List { query } => commands::list::run(query.as_deref(), format),
        Commands::SetStatus {
            ticket,
            status,
            version,
        } => commands::set_status::run(&ticket, &status, version, format),
        Commands::Token { action } => commands::token::run(action, format),
    }
}
