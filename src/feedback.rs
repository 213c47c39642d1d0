use std::collections::HashSet;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::brier::BrierTracker;
use crate::config::Config;
use crate::data_store::load_matches;
use crate::elo::EloStore;
use crate::match_record::Match;
use crate::remote_mirror::RemoteMirror;
use crate::store_util::{atomic_write_json, load_json_or_default, store_path};
use crate::team_names::TeamNameResolver;

const STORE_FILE: &str = "ingested_matches.json";

/// The persisted set of already-ingested match identities, keyed by
/// `(home, away, date)` so the loop can be run multiple times per day
/// without double-counting a completed match (spec §4.7).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestedMatches {
    seen: HashSet<(String, String, chrono::NaiveDate)>,
}

impl IngestedMatches {
    pub fn load() -> Self {
        match store_path(STORE_FILE) {
            Some(path) => load_json_or_default(&path),
            None => Self::default(),
        }
    }

    fn mark_seen(&mut self, m: &Match) -> bool {
        self.seen.insert((m.home.clone(), m.away.clone(), m.date))
    }

    pub fn save(&self, mirror: &dyn RemoteMirror) {
        let Some(path) = store_path(STORE_FILE) else {
            return;
        };
        if atomic_write_json(&path, self).is_ok() {
            if let Ok(bytes) = serde_json::to_vec(self) {
                mirror.mirror(STORE_FILE, &bytes);
            }
        }
    }
}

/// Case-insensitive substring match in either direction, per the spec's
/// preserved (if flagged) team-name matching behavior (§4.7, §9 Open
/// Question): exact canonical matching after normalization would avoid the
/// "Inter" vs "Inter Milan" collision, but isn't what's specified here.
fn names_match(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a.contains(&b) || b.contains(&a)
}

/// One feedback pass (spec §4.7): pulls recently completed matches from the
/// CSV source, applies each unseen one to `elo` and to any matching pending
/// `brier` prediction, and reports how many matches were newly ingested.
/// Callers are responsible for saving `elo`/`brier`/the ingested set only
/// when the returned count is nonzero.
pub fn run_feedback_pass(
    client: &Client,
    leagues: &[&str],
    seasons: &[&str],
    resolver: &dyn TeamNameResolver,
    ingested: &mut IngestedMatches,
    elo: &mut EloStore,
    brier: &mut BrierTracker,
) -> crate::error::Result<usize> {
    let matches = load_matches(client, "", leagues, seasons, false, resolver)?;

    let mut applied = 0usize;
    for m in &matches {
        if !ingested.mark_seen(m) {
            continue;
        }
        applied += 1;
        elo.update(&m.home, &m.away, m.result);

        let pending_ids: Vec<String> = brier
            .pending()
            .filter(|p| names_match(&p.home, &m.home) && names_match(&p.away, &m.away))
            .map(|p| p.match_id.clone())
            .collect();
        for match_id in pending_ids {
            brier.record_result(&match_id, m.result);
        }
    }

    info!(applied, "feedback pass ingested new completed matches");
    Ok(applied)
}

/// Convenience wrapper that owns the full load/apply/save cycle for a CLI
/// invocation (spec §4.7: "safe to run multiple times per day").
pub fn run_feedback_cycle(cfg: &Config, leagues: &[&str], seasons: &[&str]) -> crate::error::Result<usize> {
    use crate::http_client::http_client;
    use crate::team_names::IdentityResolver;

    let client = http_client()
        .map_err(|e| crate::error::ForecastError::TransientIo(e.to_string()))?;
    let resolver = IdentityResolver;
    let mirror = crate::remote_mirror::build_mirror(cfg);

    let mut ingested = IngestedMatches::load();
    let mut elo = EloStore::load();
    let mut brier = BrierTracker::load();

    let applied = run_feedback_pass(
        client,
        leagues,
        seasons,
        &resolver,
        &mut ingested,
        &mut elo,
        &mut brier,
    )?;

    if applied > 0 {
        elo.save(mirror.as_ref());
        brier.save(mirror.as_ref());
        ingested.save(mirror.as_ref());
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_is_case_insensitive_and_substring_both_directions() {
        assert!(names_match("inter", "Inter Milan"));
        assert!(names_match("Inter Milan", "inter"));
        assert!(!names_match("Arsenal", "Chelsea"));
    }

    #[test]
    fn ingested_matches_mark_seen_is_idempotent() {
        let mut ingested = IngestedMatches::default();
        let m = Match {
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            league: "EPL".into(),
            season: "2324".into(),
            home: "Arsenal".into(),
            away: "Chelsea".into(),
            h_goals: 1,
            a_goals: 0,
            result: crate::outcome::Outcome::Home,
            h_shots: 0.0,
            a_shots: 0.0,
            h_sot: 0.0,
            a_sot: 0.0,
            odds_h: 0.0,
            odds_d: 0.0,
            odds_a: 0.0,
        };
        assert!(ingested.mark_seen(&m));
        assert!(!ingested.mark_seen(&m));
    }
}
