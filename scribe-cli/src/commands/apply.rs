use anyhow::Result;
use clap::Args;

use super::{open_engine, parse_mode};

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Refinement mode (raw, cleanup, email, messaging)
    #[arg(short, long, default_value = "cleanup")]
    pub mode: String,

    /// Refined text to adjust
    pub text: String,
}

pub async fn run(args: ApplyArgs) -> Result<()> {
    let mode = parse_mode(&args.mode)?;
    let engine = open_engine().await?;
    println!("{}", engine.apply_learned_adjustments(&args.text, mode).await);
    Ok(())
}
