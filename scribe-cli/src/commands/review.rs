use anyhow::Result;
use clap::Args;

use super::{open_engine, parse_mode};

#[derive(Args, Debug)]
pub struct ReviewArgs {
    /// Refinement mode (raw, cleanup, email, messaging)
    #[arg(short, long, default_value = "cleanup")]
    pub mode: String,

    /// Text produced by the refinement
    #[arg(long)]
    pub ai: String,

    /// Text after the user's edits
    #[arg(long = "final")]
    pub final_text: String,

    /// Raw transcript before refinement
    #[arg(long, default_value = "")]
    pub original: String,

    /// The user dismissed the review without editing
    #[arg(long)]
    pub skipped: bool,
}

pub async fn run(args: ReviewArgs) -> Result<()> {
    let mode = parse_mode(&args.mode)?;
    let engine = open_engine().await?;
    if !engine.is_enabled() {
        println!("Learning is disabled; nothing recorded.");
        return Ok(());
    }

    let changes = scribe_learning::significant_changes(&args.ai, &args.final_text);
    engine
        .record_edit_review(&args.original, &args.ai, &args.final_text, mode, args.skipped)
        .await;

    if args.skipped {
        println!("Recorded skipped review.");
    } else {
        println!("Recorded review with {} change(s):", changes.len());
        for change in changes {
            println!("  \"{}\" -> \"{}\"", change.original, change.corrected);
        }
    }
    Ok(())
}
