use anyhow::Result;
use clap::Args;
use scribe_learning::Decision;

use super::open_engine;

#[derive(Args, Debug)]
pub struct DecideArgs {
    /// Word count of the refined dictation
    #[arg(short, long)]
    pub words: usize,

    /// Session count to decide for (defaults to the recorded count)
    #[arg(short, long)]
    pub sessions: Option<u64>,
}

pub async fn run(args: DecideArgs) -> Result<()> {
    let engine = open_engine().await?;
    let sessions = args.sessions.unwrap_or_else(|| engine.session_count());
    let label = match engine.decide(args.words, sessions) {
        Decision::EditReview => "edit-review",
        Decision::AbTesting => "ab-testing",
        Decision::None => "none",
    };
    println!("{label}");
    Ok(())
}
