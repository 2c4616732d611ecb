use anyhow::{Result, bail};
use clap::Args;
use tracing::info;

use super::open_engine;

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Confirm deletion of every learned pattern, preference and session
    #[arg(long)]
    pub yes: bool,
}

pub async fn run(args: ResetArgs) -> Result<()> {
    if !args.yes {
        bail!("refusing to reset without --yes");
    }
    let engine = open_engine().await?;
    info!(user = ?engine.config().user_id, "deleting all learning data");
    engine.reset_all_learning().await?;
    println!("All learning data deleted.");
    Ok(())
}
