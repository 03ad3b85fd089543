use anyhow::Result;
use blumclick::{
    logging,
    rng::Dice,
    settings::{FileSettingsStore, MemorySettingsStore},
    sim::{GameRules, SimulatedGame, Simulation, SimulationReport},
    Session, SettingField, SettingValue, SettingsStore,
};
use clap::Parser;
use itertools::{Itertools, MinMaxResult};
use std::{path::PathBuf, time::Duration};

const MAX_MINUTES: u64 = 7 * 24 * 60;

/// headless blum autoclicker run against a simulated drop game
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Runs the autoclicker core against a simulated drop game on a virtual clock and prints what it did each round."
)]
pub struct Cli {
    /// seed for the clicker and the simulated game (random when omitted)
    #[clap(short = 's', long)]
    seed: Option<u64>,

    /// simulated minutes to run, at most one week
    #[clap(
        short = 'm',
        long,
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..=MAX_MINUTES)
    )]
    minutes: u64,

    /// settings file to load and save (defaults to the platform config dir)
    #[clap(long)]
    settings: Option<PathBuf>,

    /// keep settings in memory, never touching disk
    #[clap(long, conflicts_with = "settings")]
    ephemeral: bool,

    /// switch auto-play on for this run
    #[clap(short = 'a', long)]
    auto_play: bool,

    /// auto-play duration in seconds, 0 means no limit
    #[clap(short = 'd', long)]
    duration: Option<u64>,

    /// debug-level logging (RUST_LOG overrides)
    #[clap(short = 'v', long)]
    verbose: bool,
}

impl Cli {
    fn store(&self) -> Box<dyn SettingsStore> {
        if self.ephemeral {
            return Box::new(MemorySettingsStore::new());
        }
        match &self.settings {
            Some(path) => Box::new(FileSettingsStore::with_path(path)),
            None => Box::new(FileSettingsStore::new()),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let seed = cli.seed.unwrap_or_else(rand::random);
    let mut session = Session::bootstrap(cli.store(), Dice::seeded(seed));
    if cli.auto_play {
        session.update_setting(SettingField::AutoClickPlay, SettingValue::Flag(true))?;
    }
    if let Some(secs) = cli.duration {
        session.update_setting(SettingField::AutoClickPlayDuration, SettingValue::Number(secs as f64))?;
    }

    let game = SimulatedGame::new(GameRules::default(), seed.wrapping_add(1));
    let mut sim = Simulation::new(session, game);
    sim.run_for(Duration::from_secs(cli.minutes.saturating_mul(60)));

    print_report(seed, &sim.report());
    Ok(())
}

fn print_report(seed: u64, report: &SimulationReport) {
    println!(
        "seed {seed} | {}s simulated | {} rounds started | {} finished | {} tickets left | auto-play {}",
        report.elapsed.as_secs(),
        report.rounds_started,
        report.rounds.len(),
        report.tickets_left,
        if report.auto_play_on { "on" } else { "off" }
    );

    // history keeps only the latest rounds
    let skipped = report.game_points.len().saturating_sub(report.rounds.len());
    for (i, (record, points)) in report
        .rounds
        .iter()
        .zip(report.game_points.iter().skip(skipped))
        .enumerate()
    {
        println!(
            "round {:>3} | {} | game points {:>3} | skip {:>5.1}%{}",
            skipped + i + 1,
            record.stats,
            points,
            record.params.effective_flower_skip_percentage,
            if record.params.is_bad_game { " | bad game" } else { "" }
        );
    }

    match report.rounds.iter().map(|r| r.stats.score).minmax() {
        MinMaxResult::NoElements => println!("no finished rounds"),
        MinMaxResult::OneElement(score) => println!("score {score}"),
        MinMaxResult::MinMax(lo, hi) => println!(
            "score range {lo}..={hi} | per round: {}",
            report.rounds.iter().map(|r| r.stats.score).join(", ")
        ),
    }
}
