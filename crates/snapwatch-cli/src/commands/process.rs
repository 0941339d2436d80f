//! Process command

use clap::Args;
use snapwatch_engine::DispatchOutcome;
use snapwatch_store::capture::entities_with_unprocessed;

use super::{Session, StoreArgs};

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Capture whose entity should be dispatched; all pending entities if omitted
    #[arg(long)]
    pub capture_id: Option<i64>,

    /// Print each comparison pair as JSON
    #[arg(long)]
    pub echo: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

pub fn execute(args: ProcessArgs) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open(&args.store, args.echo)?;

    let capture_ids = match args.capture_id {
        Some(id) => vec![id],
        None => {
            let conn = session.dispatcher.ledger().connect()?;
            entities_with_unprocessed(&conn)?
                .into_iter()
                .map(|(_, newest_id)| newest_id)
                .collect()
        }
    };

    if capture_ids.is_empty() {
        println!("Nothing to process");
        return Ok(());
    }

    for capture_id in capture_ids {
        match session.dispatcher.process(capture_id)? {
            DispatchOutcome::AlreadyHandled => {
                println!("Capture {}: already handled", capture_id);
            }
            DispatchOutcome::Stale => {
                println!("Capture {}: stale batch claimed, nothing compared", capture_id);
            }
            DispatchOutcome::Dispatched(report) => {
                println!(
                    "Capture {}: compared {} capture(s) of {} with [{}]",
                    capture_id,
                    report.capture_ids.len(),
                    report.entity,
                    report.invoked.join(", ")
                );
            }
        }
    }
    Ok(())
}
