//! Pattern listing and removal commands

use anyhow::{Result, bail};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use scribe_learning::LearnedPattern;
use uuid::Uuid;

use super::open_engine;

#[derive(Args, Debug)]
pub struct PatternsArgs {
    /// Include inactive and not yet established patterns
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct ForgetArgs {
    /// Pattern id, as shown by `scribe patterns`
    pub id: Uuid,
}

pub async fn run(args: PatternsArgs) -> Result<()> {
    let engine = open_engine().await?;
    let patterns = if args.all {
        engine.patterns().await
    } else {
        engine.active_patterns().await
    };

    if patterns.is_empty() {
        if args.all {
            println!("No patterns learned yet.");
        } else {
            println!("No established patterns. Use --all to include new ones.");
        }
        return Ok(());
    }

    println!("{}", pattern_table(&patterns));
    Ok(())
}

pub async fn forget(args: ForgetArgs) -> Result<()> {
    let engine = open_engine().await?;
    if !engine.deactivate_pattern(args.id).await {
        bail!("no active pattern with id {}", args.id);
    }
    println!("Pattern {} will no longer be applied.", args.id);
    Ok(())
}

fn pattern_table(patterns: &[LearnedPattern]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Id").fg(Color::Cyan),
        Cell::new("Original").fg(Color::Cyan),
        Cell::new("Corrected").fg(Color::Cyan),
        Cell::new("Mode").fg(Color::Cyan),
        Cell::new("Seen").fg(Color::Cyan),
        Cell::new("Confidence").fg(Color::Cyan),
        Cell::new("Active").fg(Color::Cyan),
    ]);

    for pattern in patterns {
        table.add_row(vec![
            Cell::new(pattern.id),
            Cell::new(&pattern.original_phrase),
            Cell::new(&pattern.corrected_phrase),
            Cell::new(pattern.refinement_mode),
            Cell::new(pattern.occurrence_count),
            Cell::new(format!("{:.2}", pattern.confidence)),
            Cell::new(if pattern.is_active { "yes" } else { "no" }),
        ]);
    }
    table
}
