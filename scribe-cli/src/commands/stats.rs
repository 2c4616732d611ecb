use anyhow::Result;
use clap::Args;

use super::open_engine;

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: StatsArgs) -> Result<()> {
    let engine = open_engine().await?;
    let stats = engine.stats().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Learning:        {}", if engine.is_enabled() { "enabled" } else { "disabled" });
    println!("Sessions:        {}", stats.session_count);
    println!("Quality:         {}", stats.quality);
    println!(
        "Patterns:        {} active, {} ready",
        stats.active_patterns, stats.ready_patterns
    );
    println!("Pending writes:  {}", stats.pending_operations);
    println!();
    println!("Preferences:");
    for pref in &stats.preferences {
        println!(
            "  {:<13} {:+.2}  ({} samples)",
            pref.preference_type.as_str(),
            pref.value,
            pref.sample_count
        );
    }
    Ok(())
}
