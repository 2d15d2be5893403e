use clap::{Parser, Subcommand};
use god_client::commands;
use std::path::PathBuf;
use tracing::{error, Level};

#[derive(Parser)]
#[command(
    name = "iso2god",
    about = "Repackage Xbox 360 disc images into the Games on Demand container layout",
    version
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a disc image into a GOD container
    Convert {
        /// Source ISO image
        iso: PathBuf,

        /// Directory the container is created under
        output: PathBuf,

        /// Hide the progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show the identity of a disc image without converting it
    Info {
        /// Source ISO image
        iso: PathBuf,
    },

    /// Re-hash an emitted container against its stored hash tables
    Verify {
        /// Content directory holding the Data parts
        content_dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Convert { iso, output, quiet } => commands::convert::handle(&iso, &output, quiet),
        Commands::Info { iso } => commands::info::handle(&iso),
        Commands::Verify { content_dir } => commands::verify::handle(&content_dir),
    };

    if let Err(e) = result {
        error!("{e}");
        // Host-facing result codes are negative; shells want them positive.
        std::process::exit(-e.code());
    }
}
