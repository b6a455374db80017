use std::process;

use clap::{Parser, Subcommand};

mod commands;
mod launcher;

/// oti: one-time launcher favorites initializer.
///
/// Run the version-gated component remapping, or inspect the stores it works on.
#[derive(Parser)]
#[command(name = "oti", version, about, long_about = None)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the component mapping once, if not already applied.
    Run {
        /// Path to the launcher SQLite database. Never created.
        #[arg(long)]
        db: String,

        /// Database holding the mapping version. Defaults to `--db`.
        #[arg(long)]
        prefs: Option<String>,

        /// Path to the mapping configuration (TOML).
        #[arg(short, long, default_value = "oti-mapping.toml")]
        config: String,

        /// Show what would change without touching either database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the mapping version and favorites statistics.
    Status {
        /// Path to the launcher SQLite database.
        #[arg(long)]
        db: String,

        /// Database holding the mapping version. Defaults to `--db`.
        #[arg(long)]
        prefs: Option<String>,
    },

    /// List favorites, or show one favorite's parsed intent.
    Inspect {
        /// Path to the launcher SQLite database.
        #[arg(long)]
        db: String,

        /// Favorite `_id` to inspect. If omitted, lists all favorites.
        id: Option<i64>,

        /// Print the parsed intent as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Export favorites as JSON for debugging.
    Export {
        /// Path to the launcher SQLite database.
        #[arg(long)]
        db: String,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<(), Box<dyn std::error::Error>> = match cli.command {
        Commands::Run {
            db,
            prefs,
            config,
            dry_run,
        } => commands::run(&db, prefs.as_deref(), &config, dry_run),
        Commands::Status { db, prefs } => commands::status(&db, prefs.as_deref()),
        Commands::Inspect { db, id, json } => commands::inspect(&db, id, json),
        Commands::Export { db } => commands::export(&db),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
