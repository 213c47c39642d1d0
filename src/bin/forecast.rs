use std::io::Read as _;

use clap::{Parser, Subcommand};
use tracing::info;

use league_forecast::brier::BrierTracker;
use league_forecast::config::Config;
use league_forecast::data_store::load_matches;
use league_forecast::elo::EloStore;
use league_forecast::favorites::StaticFavoriteLookup;
use league_forecast::feedback::run_feedback_cycle;
use league_forecast::features::build_rolling_state;
use league_forecast::http_cache::flush_http_cache;
use league_forecast::http_client::http_client;
use league_forecast::kalman::KalmanFilterBank;
use league_forecast::orchestrator::{run_fixtures, FixtureOutcome};
use league_forecast::predictor::EnsemblePredictor;
use league_forecast::reflection::ReflectionSet;
use league_forecast::remote_mirror::build_mirror;
use league_forecast::team_names::IdentityResolver;

const DEFAULT_LEAGUES: &[&str] = &["EPL", "La_Liga", "Bundesliga", "Serie_A", "Ligue_1"];
const DEFAULT_SEASONS: &[&str] = &["2425"];

#[derive(Parser)]
#[command(name = "league-forecast", about = "Soccer match outcome forecaster")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Comma-separated league codes (default: all five supported leagues).
    #[arg(long, global = true)]
    leagues: Option<String>,

    /// Comma-separated season short-forms, e.g. 2425.
    #[arg(long, global = true)]
    seasons: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetches and caches the historical match corpus.
    Ingest {
        #[arg(long)]
        use_cache: bool,
    },
    /// Trains the ensemble once and reports holdout accuracy/Brier.
    Train,
    /// Reads fixture lines from stdin (or --file) and prints predictions.
    Predict {
        #[arg(long)]
        file: Option<String>,
    },
    /// Runs one feedback pass against recently completed matches.
    Feedback,
    /// Prints running accuracy/Brier statistics.
    Stats {
        #[arg(long)]
        last: Option<usize>,
    },
}

fn leagues_from(cli: &Cli) -> Vec<String> {
    cli.leagues
        .as_deref()
        .map(|s| s.split(',').map(|v| v.trim().to_string()).collect())
        .unwrap_or_else(|| DEFAULT_LEAGUES.iter().map(|s| s.to_string()).collect())
}

fn seasons_from(cli: &Cli) -> Vec<String> {
    cli.seasons
        .as_deref()
        .map(|s| s.split(',').map(|v| v.trim().to_string()).collect())
        .unwrap_or_else(|| DEFAULT_SEASONS.iter().map(|s| s.to_string()).collect())
}

fn main() -> anyhow::Result<()> {
    league_forecast::config::init_logging();
    let cfg = Config::from_env();
    let cli = Cli::parse();

    let leagues_owned = leagues_from(&cli);
    let seasons_owned = seasons_from(&cli);
    let leagues: Vec<&str> = leagues_owned.iter().map(String::as_str).collect();
    let seasons: Vec<&str> = seasons_owned.iter().map(String::as_str).collect();

    let client = http_client()?;
    let resolver = IdentityResolver;

    match cli.command {
        Command::Ingest { use_cache } => {
            let matches = load_matches(client, "", &leagues, &seasons, use_cache, &resolver)?;
            println!("loaded {} matches", matches.len());
        }
        Command::Train => {
            let matches = load_matches(client, "", &leagues, &seasons, true, &resolver)?;
            let reflection = ReflectionSet::load();
            let (_predictor, elo, report) = EnsemblePredictor::train(&matches, &reflection);
            let mirror = build_mirror(&cfg);
            elo.save(mirror.as_ref());
            println!(
                "trained on {} rows, holdout {} rows: accuracy={:.3} mean_brier={:.4}",
                report.n_train, report.n_holdout, report.accuracy, report.mean_brier
            );
        }
        Command::Predict { file } => {
            let input = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };

            let matches = load_matches(client, "", &leagues, &seasons, true, &resolver)?;
            let reflection = ReflectionSet::load();
            let (predictor, elo, _report) = EnsemblePredictor::train(&matches, &reflection);
            let rolling = build_rolling_state(&matches);

            let mut kalman = KalmanFilterBank::load();
            let mut brier = BrierTracker::load();
            let favorites = StaticFavoriteLookup;
            let now = chrono::Utc::now();

            let raw_xg_lookup = |team: &str| {
                let observed = rolling.avg_goals_for(team);
                if observed > 0.0 {
                    observed
                } else {
                    1.2
                }
            };

            let outcomes = run_fixtures(
                &input,
                &resolver,
                &predictor,
                &elo,
                &mut kalman,
                &rolling,
                &favorites,
                &mut brier,
                raw_xg_lookup,
                now,
            );

            for outcome in &outcomes {
                match outcome {
                    FixtureOutcome::Predicted(record) => println!(
                        "{} vs {}: H={:.1}% D={:.1}% A={:.1}% pick={:?} triggers={:?}",
                        record.home,
                        record.away,
                        record.p_h * 100.0,
                        record.p_d * 100.0,
                        record.p_a * 100.0,
                        record.pick,
                        record.triggers
                    ),
                    FixtureOutcome::UnresolvedNames { home_raw, away_raw } => {
                        println!("could not resolve fixture: {home_raw} vs {away_raw}");
                    }
                }
            }

            let mirror = build_mirror(&cfg);
            kalman.save(mirror.as_ref());
            brier.save(mirror.as_ref());
        }
        Command::Feedback => {
            let applied = run_feedback_cycle(&cfg, &leagues, &seasons)?;
            println!("feedback pass ingested {applied} new completed matches");
        }
        Command::Stats { last } => {
            let brier = BrierTracker::load();
            match (brier.average_brier(last), brier.accuracy(last)) {
                (Some(b), Some(a)) => println!("accuracy={a:.3} mean_brier={b:.4}"),
                _ => println!("no closed predictions yet"),
            }
        }
    }

    flush_http_cache();
    info!("done");
    Ok(())
}
