use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "snapwatch")]
#[command(
    about = "Snapwatch - record entity captures and dispatch them to comparators",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the capture ledger schema
    Migrate(commands::migrate::MigrateArgs),

    /// Record a capture of an entity from a JSON tree file
    Record(commands::record::RecordArgs),

    /// List the captures of one entity
    List(commands::list::ListArgs),

    /// Run dispatch for a capture, or for every entity with pending captures
    Process(commands::process::ProcessArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Migrate(args) => commands::migrate::execute(args),
        Commands::Record(args) => commands::record::execute(args),
        Commands::List(args) => commands::list::execute(args),
        Commands::Process(args) => commands::process::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
