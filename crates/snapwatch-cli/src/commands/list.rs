//! List command

use clap::Args;
use snapwatch_core::model::{EntityKind, EntityRef};
use snapwatch_store::capture::list_captures;

use super::StoreArgs;

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Entity kind (core-module name, e.g. Product)
    #[arg(long = "type")]
    pub kind: String,

    #[arg(long)]
    pub id: i64,

    #[command(flatten)]
    pub store: StoreArgs,
}

pub fn execute(args: ListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let entity = EntityRef::new(EntityKind::parse(&args.kind), args.id);
    let config = args.store.load()?;
    let conn = config.ledger().migrate()?;

    let captures = list_captures(&conn, &entity)?;
    if captures.is_empty() {
        println!("No captures for {}", entity);
        return Ok(());
    }

    for capture in captures {
        let compared = capture
            .compared_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "pending".to_string());
        let pointer = match capture.pointer.parts() {
            Some((bucket, path, version)) => format!("{}/{}@{}", bucket, path, version),
            None => "-".to_string(),
        };
        println!(
            "{}\t{}\t{}\t{}",
            capture.id,
            capture.created_at.to_rfc3339(),
            compared,
            pointer
        );
    }
    Ok(())
}
