use std::io::Write;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use fortuna_core::{
    rng::RngCore, GameConfig, GameMode, RoundDetail, RoundError, RoundOutcome, SeededRng, Session,
    Tick,
};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fortuna-cli", about = "Operator CLI for the fortuna outcome engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// JSON game config; defaults are used when absent
    #[arg(long, env = "FORTUNA_CONFIG")]
    config: Option<String>,
    /// Override the configured win chance (clamped to 0-100)
    #[arg(long)]
    win_chance: Option<i64>,
    /// Override the configured starting balance
    #[arg(long)]
    balance: Option<u64>,
    /// Seed for a reproducible run; OS entropy is used when absent
    #[arg(long, env = "FORTUNA_SEED")]
    seed: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one slot round
    Spin {
        #[arg(long)]
        bet: Option<u64>,
    },
    /// Fly one crash round on a virtual clock
    Crash {
        #[arg(long)]
        bet: Option<u64>,
        /// Cash out once the multiplier reaches this value
        #[arg(long, default_value_t = 2.0)]
        cash_out_at: f64,
    },
    /// Play many rounds and report win rates and return-to-player
    Simulate {
        #[arg(long, value_enum, default_value_t = Game::Slots)]
        game: Game,
        #[arg(long, default_value_t = 10_000)]
        rounds: u64,
        #[arg(long)]
        bet: Option<u64>,
        #[arg(long, default_value_t = 2.0)]
        cash_out_at: f64,
        /// Write one CSV row per round to this path
        #[arg(long)]
        csv: Option<String>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Game {
    Slots,
    Crash,
}

impl From<Game> for GameMode {
    fn from(game: Game) -> Self {
        match game {
            Game::Slots => GameMode::Slots,
            Game::Crash => GameMode::Crash,
        }
    }
}

#[derive(Serialize)]
struct RoundRow {
    round: u64,
    won: bool,
    predestined_win: bool,
    bet: u64,
    payout: u64,
    multiplier: f64,
    line: String,
    balance: u64,
}

#[derive(Default, Serialize)]
struct Summary {
    rounds: u64,
    wins: u64,
    predestined_wins: u64,
    total_bet: u64,
    total_payout: u64,
    final_balance: u64,
    stopped_early: bool,
}

impl Summary {
    fn add(&mut self, outcome: &RoundOutcome) {
        self.rounds += 1;
        self.total_bet += outcome.bet;
        self.total_payout += outcome.payout;
        if outcome.won {
            self.wins += 1;
        }
        if outcome.predestined_win {
            self.predestined_wins += 1;
        }
    }

    fn rate(&self, count: u64) -> f64 {
        if self.rounds == 0 {
            0.0
        } else {
            count as f64 / self.rounds as f64
        }
    }

    fn win_rate(&self) -> f64 {
        self.rate(self.wins)
    }

    /// Share of rounds the bias roll decided as wins, accidental lines excluded.
    fn predestined_rate(&self) -> f64 {
        self.rate(self.predestined_wins)
    }

    fn rtp(&self) -> f64 {
        if self.total_bet == 0 {
            0.0
        } else {
            self.total_payout as f64 / self.total_bet as f64
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    summary: &'a Summary,
    win_rate: f64,
    predestined_rate: f64,
    rtp: f64,
}

impl<'a> From<&'a Summary> for Report<'a> {
    fn from(summary: &'a Summary) -> Self {
        Self {
            summary,
            win_rate: summary.win_rate(),
            predestined_rate: summary.predestined_rate(),
            rtp: summary.rtp(),
        }
    }
}

/// Flies one round on a virtual clock, cashing out at `target` unless it crashes first.
fn fly<R: RngCore>(
    session: &mut Session<R>,
    bet: u64,
    target: f64,
) -> Result<RoundOutcome, RoundError> {
    let handle = session.start_crash_round(bet)?;
    let step = session.config().tick_interval();
    let mut elapsed = Duration::ZERO;
    loop {
        elapsed += step;
        match session.advance(handle, elapsed)? {
            Tick::Flying { multiplier } if multiplier >= target => {
                return session.cash_out(handle);
            }
            Tick::Flying { .. } => {}
            Tick::Crashed { .. } | Tick::Finished => {
                return session
                    .last_outcome()
                    .cloned()
                    .ok_or(RoundError::UnknownRound(handle.0));
            }
        }
    }
}

fn describe(outcome: &RoundOutcome) -> String {
    match &outcome.detail {
        RoundDetail::Slots {
            grid,
            line,
            multiplier,
            ..
        } => match line {
            Some(line) => format!("{grid}\nwin on {line} ({multiplier}x): +{}", outcome.payout),
            None => format!("{grid}\nno win"),
        },
        RoundDetail::Crash {
            multiplier,
            crash_point,
        } if outcome.won => format!(
            "cashed out at {multiplier:.2}x (crash point {crash_point:.2}x): +{}",
            outcome.payout
        ),
        RoundDetail::Crash { crash_point, .. } => format!("crashed at {crash_point:.2}x"),
    }
}

/// Plays up to `rounds` rounds, stopping early once the balance cannot cover `bet`.
fn simulate<R: RngCore, W: Write>(
    session: &mut Session<R>,
    game: Game,
    rounds: u64,
    bet: u64,
    cash_out_at: f64,
    mut writer: Option<&mut csv::Writer<W>>,
) -> anyhow::Result<Summary> {
    let mut summary = Summary::default();
    info!(rounds, bet, bias = session.win_bias().percent(), "simulation started");
    for round in 1..=rounds {
        let result = match GameMode::from(game) {
            GameMode::Slots => session.start_slot_round(bet),
            GameMode::Crash => fly(session, bet, cash_out_at),
        };
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(RoundError::InsufficientFunds { balance, .. }) => {
                debug!(round, balance, "out of funds");
                summary.stopped_early = true;
                break;
            }
            Err(e) => return Err(e.into()),
        };
        summary.add(&outcome);
        if let Some(w) = writer.as_mut() {
            w.serialize(RoundRow {
                round,
                won: outcome.won,
                predestined_win: outcome.predestined_win,
                bet: outcome.bet,
                payout: outcome.payout,
                multiplier: outcome.multiplier(),
                line: outcome.line().map(|l| l.to_string()).unwrap_or_default(),
                balance: session.balance(),
            })?;
        }
    }
    if let Some(w) = writer {
        w.flush()?;
    }
    summary.final_balance = session.balance();
    Ok(summary)
}

fn run<R: RngCore>(mut session: Session<R>, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Spin { bet } => {
            let bet = bet.unwrap_or_else(|| session.bet());
            let outcome = session.start_slot_round(bet)?;
            println!("{}", describe(&outcome));
            println!("balance={}", session.balance());
        }
        Commands::Crash { bet, cash_out_at } => {
            let bet = bet.unwrap_or_else(|| session.bet());
            let outcome = fly(&mut session, bet, cash_out_at)?;
            println!("{}", describe(&outcome));
            println!("balance={}", session.balance());
        }
        Commands::Simulate {
            game,
            rounds,
            bet,
            cash_out_at,
            csv,
            json,
        } => {
            let bet = bet.unwrap_or_else(|| session.bet());
            let summary = match csv {
                Some(path) => {
                    let mut writer = csv::Writer::from_path(path)?;
                    simulate(&mut session, game, rounds, bet, cash_out_at, Some(&mut writer))?
                }
                None => simulate::<_, std::fs::File>(
                    &mut session,
                    game,
                    rounds,
                    bet,
                    cash_out_at,
                    None,
                )?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&Report::from(&summary))?);
            } else {
                println!(
                    "rounds={} wins={} win_rate={:.4} rtp={:.4}",
                    summary.rounds,
                    summary.wins,
                    summary.win_rate(),
                    summary.rtp(),
                );
                println!(
                    "predestined_rate={:.4} balance={}{}",
                    summary.predestined_rate(),
                    summary.final_balance,
                    if summary.stopped_early { " (out of funds)" } else { "" }
                );
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if let Some(balance) = cli.balance {
        config.initial_balance = balance;
    }

    match cli.seed {
        Some(seed) => {
            let mut session = Session::with_rng(config, SeededRng::new(seed, 0));
            if let Some(percent) = cli.win_chance {
                session.set_win_bias(percent);
            }
            run(session, cli.command)
        }
        None => {
            let mut session = Session::new(config);
            if let Some(percent) = cli.win_chance {
                session.set_win_bias(percent);
            }
            run(session, cli.command)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(bias: u8) -> Session<SeededRng> {
        let config = GameConfig {
            win_chance_percent: bias,
            ..GameConfig::default()
        };
        Session::with_rng(config, SeededRng::new("cli", 0))
    }

    #[test]
    fn fly_cashes_out_at_target() {
        let mut session = seeded(100);
        // predestined wins crash at 2x or later
        let outcome = fly(&mut session, 10, 1.5).unwrap();
        assert!(outcome.won);
        assert!(outcome.multiplier() >= 1.5 && outcome.multiplier() < 2.0);
        assert_eq!(outcome.payout, (10.0 * outcome.multiplier()).floor() as u64);
    }

    #[test]
    fn fly_reports_crash() {
        let mut session = seeded(0);
        // predestined losses crash below 2.5x
        let outcome = fly(&mut session, 10, 3.0).unwrap();
        assert!(!outcome.won);
        assert_eq!(session.balance(), 990);
    }

    #[test]
    fn summary_rates() {
        let mut summary = Summary::default();
        let mut session = seeded(100);
        for _ in 0..10 {
            summary.add(&session.start_slot_round(10).unwrap());
        }
        assert_eq!(summary.win_rate(), 1.0);
        assert!(summary.rtp() >= 5.0);
    }

    #[test]
    fn simulate_reports_predestined_rate() {
        let mut sure = seeded(100);
        let summary = simulate::<_, Vec<u8>>(&mut sure, Game::Slots, 200, 10, 2.0, None).unwrap();
        assert_eq!(summary.rounds, 200);
        assert_eq!(summary.predestined_rate(), 1.0);
        assert_eq!(summary.win_rate(), 1.0);
        let report = serde_json::to_value(Report::from(&summary)).unwrap();
        assert_eq!(report["predestined_rate"], 1.0);
        assert_eq!(report["predestined_wins"], 200);

        // accidental lines still win, but none were predestined
        let mut never = seeded(0);
        let summary = simulate::<_, Vec<u8>>(&mut never, Game::Slots, 200, 1, 2.0, None).unwrap();
        assert_eq!(summary.predestined_rate(), 0.0);

        // loss branch crashes below 2.5x, so a 3x target never cashes out
        let mut never = seeded(0);
        let summary = simulate::<_, Vec<u8>>(&mut never, Game::Crash, 50, 10, 3.0, None).unwrap();
        assert_eq!(summary.predestined_rate(), 0.0);
        assert_eq!(summary.win_rate(), 0.0);
        assert_eq!(summary.final_balance, 500);
    }

    #[test]
    fn simulate_stops_when_funds_run_out() {
        let mut session = seeded(0);
        let summary =
            simulate::<_, Vec<u8>>(&mut session, Game::Crash, 500, 100, 3.0, None).unwrap();
        assert!(summary.stopped_early);
        assert_eq!(summary.rounds, 10);
        assert_eq!(summary.final_balance, 0);
    }

    #[test]
    fn simulate_writes_csv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rounds.csv");
        let mut session = seeded(50);
        let mut writer = csv::Writer::from_path(&path).unwrap();
        let summary = simulate(&mut session, Game::Slots, 25, 10, 2.0, Some(&mut writer)).unwrap();
        drop(writer);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(
            headers,
            [
                "round",
                "won",
                "predestined_win",
                "bet",
                "payout",
                "multiplier",
                "line",
                "balance"
            ]
        );
        let rows = reader.records().collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(rows.len() as u64, summary.rounds);
        assert_eq!(summary.rounds, 25);
        let last = rows.last().unwrap();
        assert_eq!(&last[0], "25");
        assert_eq!(&last[7], summary.final_balance.to_string().as_str());
    }
}
