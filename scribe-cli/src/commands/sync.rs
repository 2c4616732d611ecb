use anyhow::Result;
use clap::Args;

use super::open_engine;

#[derive(Args, Debug)]
pub struct SyncArgs {}

pub async fn run(_args: SyncArgs) -> Result<()> {
    let engine = open_engine().await?;
    let report = engine.sync_now().await;

    if report.skipped {
        println!(
            "Sync skipped ({} pending). A backend URL and user id are required.",
            report.remaining
        );
        return Ok(());
    }
    println!(
        "Applied {}, failed {}, abandoned {}, remaining {}",
        report.applied, report.failed, report.abandoned, report.remaining
    );
    Ok(())
}
