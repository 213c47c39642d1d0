use chrono::{DateTime, Utc};

use crate::brier::BrierTracker;
use crate::elo::EloStore;
use crate::favorites::FavoriteLookup;
use crate::features::{build_feature_vector, RollingTeamState};
use crate::kalman::KalmanFilterBank;
use crate::predictor::adjusters::PersistenceContext;
use crate::predictor::EnsemblePredictor;
use crate::prediction_record::PredictionRecord;
use crate::team_names::TeamNameResolver;

/// One parsed input line: an optional leading index, a colon, two team
/// names joined by the literal `vs` (spec §4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureLine {
    pub index: Option<u32>,
    pub home_raw: String,
    pub away_raw: String,
}

/// Parses `"<idx>: teamA vs teamB"` or `"teamA vs teamB"`. Blank lines are
/// skipped; a line without a `vs` separator produces no fixture.
pub fn parse_fixture_line(line: &str) -> Option<FixtureLine> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (prefix, rest) = match line.split_once(':') {
        Some((idx_part, rest)) if idx_part.trim().chars().all(|c| c.is_ascii_digit()) && !idx_part.trim().is_empty() => {
            (idx_part.trim().parse::<u32>().ok(), rest)
        }
        _ => (None, line),
    };

    let sep = rest.find(" vs ")?;
    let home_raw = rest[..sep].trim().to_string();
    let away_raw = rest[sep + 4..].trim().to_string();
    if home_raw.is_empty() || away_raw.is_empty() {
        return None;
    }

    Some(FixtureLine {
        index: prefix,
        home_raw,
        away_raw,
    })
}

/// One fixture's outcome: either a full prediction, or an error record for
/// an unresolved team name (spec §4.8: "on unresolved names emit an error
/// record and skip").
#[derive(Debug, Clone)]
pub enum FixtureOutcome {
    Predicted(PredictionRecord),
    UnresolvedNames { home_raw: String, away_raw: String },
}

/// Runs the full per-fixture pipeline (C3 Kalman smoothing -> C5 ensemble
/// predict -> C6 Brier registration) over a newline-delimited fixture list
/// (spec §4.8).
#[allow(clippy::too_many_arguments)]
pub fn run_fixtures(
    input: &str,
    resolver: &dyn TeamNameResolver,
    predictor: &EnsemblePredictor,
    elo: &EloStore,
    kalman: &mut KalmanFilterBank,
    rolling: &RollingTeamState,
    favorites: &dyn FavoriteLookup,
    brier: &mut BrierTracker,
    raw_xg_lookup: impl Fn(&str) -> f64,
    now: DateTime<Utc>,
) -> Vec<FixtureOutcome> {
    let mut out = Vec::new();

    for (i, line) in input.lines().enumerate() {
        let Some(fixture) = parse_fixture_line(line) else {
            continue;
        };

        let home = resolver.resolve(&fixture.home_raw);
        let away = resolver.resolve(&fixture.away_raw);
        let (Some(home), Some(away)) = (home, away) else {
            out.push(FixtureOutcome::UnresolvedNames {
                home_raw: fixture.home_raw,
                away_raw: fixture.away_raw,
            });
            continue;
        };

        let raw_h_xg = raw_xg_lookup(&home);
        let raw_a_xg = raw_xg_lookup(&away);
        let xg_home = kalman.observe(&home, raw_h_xg);
        let xg_away = kalman.observe(&away, raw_a_xg);

        let features = build_feature_vector(rolling, elo, &home, &away, 0.0, 0.0, 0.0);

        let match_id = fixture
            .index
            .map(|n| n.to_string())
            .unwrap_or_else(|| i.to_string());

        let record = predictor.predict(
            features,
            elo,
            &home,
            &away,
            xg_home,
            xg_away,
            PersistenceContext::default(),
            favorites,
            format!("{home}_vs_{away}_{match_id}"),
            now,
        );

        brier.add_prediction(record.clone());
        out.push(FixtureOutcome::Predicted(record));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_indexed_and_plain_fixture_lines() {
        let a = parse_fixture_line("1: Arsenal vs Chelsea").unwrap();
        assert_eq!(a.index, Some(1));
        assert_eq!(a.home_raw, "Arsenal");
        assert_eq!(a.away_raw, "Chelsea");

        let b = parse_fixture_line("Arsenal vs Chelsea").unwrap();
        assert_eq!(b.index, None);
        assert_eq!(b.home_raw, "Arsenal");
        assert_eq!(b.away_raw, "Chelsea");
    }

    #[test]
    fn blank_and_unparseable_lines_yield_none() {
        assert!(parse_fixture_line("").is_none());
        assert!(parse_fixture_line("   ").is_none());
        assert!(parse_fixture_line("Arsenal Chelsea").is_none());
    }

    #[test]
    fn team_name_survives_an_internal_colon_free_of_an_index_prefix() {
        let f = parse_fixture_line("Real Madrid vs Barcelona").unwrap();
        assert_eq!(f.home_raw, "Real Madrid");
        assert_eq!(f.away_raw, "Barcelona");
    }
}
