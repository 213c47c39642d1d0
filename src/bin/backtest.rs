use clap::Parser;

use league_forecast::data_store::load_matches;
use league_forecast::features::build_feature_rows;
use league_forecast::http_client::http_client;
use league_forecast::predictor::gbm::{Gbm, GbmParams};
use league_forecast::predictor::TRAIN_SEED;
use league_forecast::team_names::IdentityResolver;

/// Standalone walk-forward evaluation: trains the boosted classifier on a
/// chronological prefix and reports holdout accuracy/Brier across a sweep
/// of split points, rather than the single 80/20 split `train` uses.
#[derive(Parser)]
struct Args {
    #[arg(long, default_value = "EPL")]
    leagues: String,

    #[arg(long, default_value = "2425")]
    seasons: String,

    /// Number of chronological folds to evaluate (e.g. 5 folds sweeps
    /// 60%, 68%, 76%, 84%, 92% training splits).
    #[arg(long, default_value_t = 5)]
    folds: usize,
}

fn main() -> anyhow::Result<()> {
    league_forecast::config::init_logging();
    let args = Args::parse();

    let leagues: Vec<&str> = args.leagues.split(',').map(str::trim).collect();
    let seasons: Vec<&str> = args.seasons.split(',').map(str::trim).collect();

    let client = http_client()?;
    let resolver = IdentityResolver;
    let matches = load_matches(client, "", &leagues, &seasons, true, &resolver)?;

    let mut elo = league_forecast::elo::EloStore::default();
    let rows = build_feature_rows(&matches, &mut elo);
    if rows.len() < 20 {
        println!("not enough rows ({}) for a meaningful backtest", rows.len());
        return Ok(());
    }

    for fold in 1..=args.folds {
        let frac = 0.5 + 0.4 * (fold as f64) / (args.folds as f64);
        let split = ((rows.len() as f64) * frac).round() as usize;
        let split = split.clamp(1, rows.len() - 1);

        let x_train: Vec<[f64; league_forecast::features::DIM]> =
            rows[..split].iter().map(|r| *r.features.as_slice()).collect();
        let y_train: Vec<u8> = rows[..split].iter().map(|r| r.label.code()).collect();
        let w_train = vec![1.0; x_train.len()];

        let flat: Vec<f64> = x_train.iter().flatten().copied().collect();
        let x_array =
            ndarray::Array2::from_shape_vec((x_train.len(), league_forecast::features::DIM), flat)?;
        let model = Gbm::fit(&x_array, &y_train, &w_train, GbmParams::default(), TRAIN_SEED);

        let mut correct = 0usize;
        let mut brier_sum = 0.0_f64;
        let holdout = &rows[split..];
        for row in holdout {
            let x_row = ndarray::Array2::from_shape_vec(
                (1, league_forecast::features::DIM),
                row.features.as_slice().to_vec(),
            )?;
            let p = model.predict_proba_row(x_row.row(0));
            if p.argmax() == row.label {
                correct += 1;
            }
            let one_hot = league_forecast::outcome::Prob3::one_hot(row.label);
            brier_sum += ((p.home - one_hot.home).powi(2)
                + (p.draw - one_hot.draw).powi(2)
                + (p.away - one_hot.away).powi(2))
                / 3.0;
        }

        println!(
            "fold {fold}: split={split}/{} holdout={} accuracy={:.3} mean_brier={:.4}",
            rows.len(),
            holdout.len(),
            correct as f64 / holdout.len().max(1) as f64,
            brier_sum / holdout.len().max(1) as f64,
        );
    }

    Ok(())
}
