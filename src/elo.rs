use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::outcome::{Outcome, Prob3};
use crate::remote_mirror::RemoteMirror;
use crate::store_util::{atomic_write_json, load_json_or_default, store_path};

const INITIAL_RATING: f64 = 1500.0;
const K_FACTOR: f64 = 32.0;
const HOME_ADV_PTS: f64 = 65.0;
const STORE_FILE: &str = "elo_ratings.json";

/// Per-team ELO ratings. Mutated only through `update`; readable by value
/// everywhere else (spec §3, §9). `rating[home] + rating[away]` is preserved
/// exactly across an `update` call — the zero-sum invariant tested below.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EloStore {
    ratings: HashMap<String, f64>,
}

impl EloStore {
    pub fn load() -> Self {
        match store_path(STORE_FILE) {
            Some(path) => load_json_or_default(&path),
            None => Self::default(),
        }
    }

    pub fn rating(&self, team: &str) -> f64 {
        *self.ratings.get(team).unwrap_or(&INITIAL_RATING)
    }

    /// Incremental update for one completed match (spec §4.2). Called both
    /// from the walk-forward feature builder (C4) and the feedback loop
    /// (C7) — the single source of truth for rating mutation.
    pub fn update(&mut self, home: &str, away: &str, result: Outcome) {
        let r_home = self.rating(home);
        let r_away = self.rating(away);

        let expected_home = expected_score(r_home + HOME_ADV_PTS, r_away);
        let actual_home = match result {
            Outcome::Home => 1.0,
            Outcome::Draw => 0.5,
            Outcome::Away => 0.0,
        };
        let delta = K_FACTOR * (actual_home - expected_home);

        self.ratings.insert(home.to_string(), r_home + delta);
        self.ratings.insert(away.to_string(), r_away - delta);
        debug!(home, away, delta, "elo updated");
    }

    /// Cold-start helper: replays a full match history through `update` in
    /// date order. Equivalent to calling `update` once per match during
    /// walk-forward feature construction, exposed separately for batch
    /// recompute (e.g. rebuilding the store from a cache after a schema
    /// change).
    pub fn rebuild_from<'a>(matches: impl Iterator<Item = (&'a str, &'a str, Outcome)>) -> Self {
        let mut store = Self::default();
        for (home, away, result) in matches {
            store.update(home, away, result);
        }
        store
    }

    /// Bounded strength-gap feature (§4.2): `clamp((r_h - r_a) / 500, -0.4,
    /// 0.4)`.
    pub fn tier_diff(&self, home: &str, away: &str) -> f64 {
        ((self.rating(home) - self.rating(away)) / 500.0).clamp(-0.4, 0.4)
    }

    /// Three-way expected outcome distribution (§4.2): a logistic home
    /// expectation, a symmetric draw term peaking when the sides are even,
    /// the remainder split proportionally and the whole normalized.
    pub fn expected_score(&self, home: &str, away: &str) -> Prob3 {
        let exp_h = expected_score(self.rating(home) + HOME_ADV_PTS, self.rating(away));
        let draw = 0.28 * (1.0 - 2.0 * (exp_h - 0.5).abs());
        let remaining = (1.0 - draw).max(0.0);
        let home_share = remaining * exp_h;
        let away_share = remaining * (1.0 - exp_h);
        Prob3::new(home_share, draw, away_share)
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

    pub fn path() -> Option<PathBuf> {
        store_path(STORE_FILE)
    }
}

fn expected_score(r_a: f64, r_b: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf(-(r_a - r_b) / 400.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sum_update() {
        let mut store = EloStore::default();
        let before = store.rating("A") + store.rating("B");
        store.update("A", "B", Outcome::Home);
        let after = store.rating("A") + store.rating("B");
        assert!((before - after).abs() < 1e-9);
    }

    #[test]
    fn winner_rises_loser_falls() {
        let mut store = EloStore::default();
        store.update("A", "B", Outcome::Home);
        assert!(store.rating("A") > INITIAL_RATING);
        assert!(store.rating("B") < INITIAL_RATING);
    }

    #[test]
    fn draw_moves_both_toward_each_other_equally() {
        let mut store = EloStore::default();
        store.ratings.insert("A".into(), 1600.0);
        store.ratings.insert("B".into(), 1400.0);
        let before_a = store.rating("A");
        let before_b = store.rating("B");
        store.update("A", "B", Outcome::Draw);
        let move_a = before_a - store.rating("A");
        let move_b = store.rating("B") - before_b;
        assert!((move_a - move_b).abs() < 1e-9);
    }

    #[test]
    fn equal_teams_repeated_draws_are_stable() {
        let mut store = EloStore::default();
        for _ in 0..50 {
            store.update("A", "B", Outcome::Draw);
        }
        assert!((store.rating("A") - INITIAL_RATING).abs() < 1e-6);
        assert!((store.rating("B") - INITIAL_RATING).abs() < 1e-6);
    }

    #[test]
    fn delta_zero_iff_actual_equals_expected() {
        let mut store = EloStore::default();
        store.ratings.insert("A".into(), 1500.0 - 65.0);
        store.ratings.insert("B".into(), 1500.0);
        // expected_home is exactly 0.5 when ratings (with home adv) are equal.
        let before_a = store.rating("A");
        store.update("A", "B", Outcome::Draw);
        assert!((store.rating("A") - before_a).abs() < 1e-9);
    }

    #[test]
    fn equal_teams_home_advantage_favors_home() {
        let store = EloStore::default();
        let dist = store.expected_score("A", "B");
        assert!(dist.home > dist.away);
        assert!((dist.home + dist.draw + dist.away - 1.0).abs() < 1e-9);
    }

    #[test]
    fn tier_diff_is_clamped() {
        let mut store = EloStore::default();
        store.ratings.insert("A".into(), 3000.0);
        store.ratings.insert("B".into(), 100.0);
        assert_eq!(store.tier_diff("A", "B"), 0.4);
        assert_eq!(store.tier_diff("B", "A"), -0.4);
    }
}
