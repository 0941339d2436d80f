//! Ledger migration command

use clap::Args;
use snapwatch_store::migrations::applied_migrations;

use super::StoreArgs;

#[derive(Debug, Args)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

pub fn execute(args: MigrateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.store.load()?;
    let conn = config.ledger().migrate()?;

    let applied = applied_migrations(&conn)?;
    println!(
        "Ledger at {} is at {} migration(s)",
        config.database.path.display(),
        applied.len()
    );
    for migration in applied {
        println!("  {}", migration);
    }
    Ok(())
}
