use anyhow::Result;
use clap::{Args, ValueEnum};
use scribe_learning::AbOption;

use super::{open_engine, parse_mode};

#[derive(Args, Debug)]
pub struct ChooseArgs {
    /// Refinement mode (raw, cleanup, email, messaging)
    #[arg(short, long, default_value = "cleanup")]
    pub mode: String,

    /// First candidate refinement
    #[arg(long)]
    pub a: String,

    /// Second candidate refinement
    #[arg(long)]
    pub b: String,

    /// Which candidate the user picked
    #[arg(long, value_enum)]
    pub selected: Choice,

    /// Raw transcript both candidates were refined from
    #[arg(long, default_value = "")]
    pub original: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Choice {
    A,
    B,
}

impl From<Choice> for AbOption {
    fn from(choice: Choice) -> Self {
        match choice {
            Choice::A => AbOption::A,
            Choice::B => AbOption::B,
        }
    }
}

pub async fn run(args: ChooseArgs) -> Result<()> {
    let mode = parse_mode(&args.mode)?;
    let engine = open_engine().await?;
    if !engine.is_enabled() {
        println!("Learning is disabled; nothing recorded.");
        return Ok(());
    }

    engine
        .record_ab_choice(&args.original, &args.a, &args.b, args.selected.into(), mode)
        .await;
    println!("Recorded choice {:?}.", args.selected);
    Ok(())
}
