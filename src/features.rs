use std::collections::{HashMap, VecDeque};

use crate::elo::EloStore;
use crate::match_record::Match;
use crate::outcome::Outcome;

/// Fixed dimension of a feature row (spec §4.4). A compile-time constant
/// rather than a dynamic map, per the REDESIGN FLAGS section.
pub const DIM: usize = 16;

/// Named positions into a `FeatureVector`. The 16-position contract may not
/// be reordered across persistence boundaries (spec §3).
pub mod idx {
    pub const HOME_AVG_GF: usize = 0;
    pub const HOME_AVG_GA: usize = 1;
    pub const HOME_AVG_SHOTS_RATIO: usize = 2;
    pub const AWAY_AVG_GF: usize = 3;
    pub const AWAY_AVG_GA: usize = 4;
    pub const AWAY_AVG_SHOTS_RATIO: usize = 5;
    pub const HOME_VENUE: usize = 6;
    pub const IMPLIED_ODDS_GAP: usize = 7;
    pub const ELO_RATIO: usize = 8;
    pub const HOME_FORM: usize = 9;
    pub const AWAY_FORM: usize = 10;
    pub const HOME_SCORING_CONSISTENCY: usize = 11;
    pub const ELO_DIFF_NORM: usize = 12;
    pub const HOME_GOAL_DIFF_TREND: usize = 13;
    pub const DRAW_TENDENCY: usize = 14;
    pub const UPSET_POTENTIAL: usize = 15;
}

/// A fixed-length, named-index feature row (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; DIM]);

impl FeatureVector {
    pub fn get(&self, i: usize) -> f64 {
        self.0[i]
    }

    pub fn as_slice(&self) -> &[f64; DIM] {
        &self.0
    }
}

/// One team's last-5-match history, carrying exactly the fields §4.4 names.
#[derive(Debug, Clone, Copy)]
struct RecentMatch {
    goals_for: u32,
    goals_against: u32,
    shots_ratio: f64,
    points: u8,
}

/// Per-team rolling state, bounded to the last 5 completed matches. Emitting
/// a feature row requires both sides to have at least 3 prior matches
/// (spec §4.4); a row is produced only by `build_feature_rows`, never on
/// demand, so the walk-forward order is enforced structurally.
#[derive(Debug, Clone, Default)]
pub struct RollingTeamState {
    history: HashMap<String, VecDeque<RecentMatch>>,
}

const WINDOW: usize = 5;
const MIN_HISTORY: usize = 3;

impl RollingTeamState {
    fn history_len(&self, team: &str) -> usize {
        self.history.get(team).map(|q| q.len()).unwrap_or(0)
    }

    fn push(&mut self, team: &str, entry: RecentMatch) {
        let q = self.history.entry(team.to_string()).or_default();
        q.push_back(entry);
        if q.len() > WINDOW {
            q.pop_front();
        }
    }

    /// Proxy for a live xG feed (out of scope, spec Non-goals): the
    /// rolling scored-goals average for a team, used as the Kalman
    /// filter's raw observation when no external xG source is wired in.
    pub fn avg_goals_for(&self, team: &str) -> f64 {
        mean(self.history.get(team), |m| m.goals_for as f64)
    }

    fn avg_goals_against(&self, team: &str) -> f64 {
        mean(self.history.get(team), |m| m.goals_against as f64)
    }

    fn avg_shots_ratio(&self, team: &str) -> f64 {
        mean(self.history.get(team), |m| m.shots_ratio)
    }

    fn recent_form(&self, team: &str) -> f64 {
        mean(self.history.get(team), |m| m.points as f64) / 3.0
    }

    fn scoring_consistency(&self, team: &str) -> f64 {
        let Some(q) = self.history.get(team) else {
            return 1.0 / 0.5;
        };
        let vals: Vec<f64> = q.iter().map(|m| m.goals_for as f64).collect();
        1.0 / (stdev(&vals) + 0.5)
    }

    fn goal_diff_trend_last3(&self, team: &str) -> f64 {
        let Some(q) = self.history.get(team) else {
            return 0.0;
        };
        q.iter()
            .rev()
            .take(3)
            .map(|m| m.goals_for as f64 - m.goals_against as f64)
            .sum::<f64>()
    }

    fn draw_share(&self, team: &str) -> f64 {
        let Some(q) = self.history.get(team) else {
            return 0.0;
        };
        if q.is_empty() {
            return 0.0;
        }
        let draws = q.iter().filter(|m| m.points == 1).count() as f64;
        draws / q.len() as f64
    }
}

fn mean(q: Option<&VecDeque<RecentMatch>>, f: impl Fn(&RecentMatch) -> f64) -> f64 {
    match q {
        Some(q) if !q.is_empty() => q.iter().map(f).sum::<f64>() / q.len() as f64,
        _ => 0.0,
    }
}

fn stdev(vals: &[f64]) -> f64 {
    if vals.len() < 2 {
        return 0.0;
    }
    let mean = vals.iter().sum::<f64>() / vals.len() as f64;
    let var = vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / vals.len() as f64;
    var.sqrt()
}

/// One emitted row: the feature vector and the observed outcome label.
pub struct FeatureRow {
    pub features: FeatureVector,
    pub label: Outcome,
    pub home: String,
    pub away: String,
}

/// Builds the feature vector for `(home, away)` from state derived strictly
/// from earlier matches, without mutating anything (spec §4.4). Used both
/// by the walk-forward builder below and at inference time (C5 step 1),
/// where the rolling state comes from live bootstrap rather than training
/// replay.
pub fn build_feature_vector(
    state: &RollingTeamState,
    elo: &EloStore,
    home: &str,
    away: &str,
    odds_h: f64,
    odds_d: f64,
    odds_a: f64,
) -> FeatureVector {
    let mut v = [0.0_f64; DIM];

    v[idx::HOME_AVG_GF] = state.avg_goals_for(home);
    v[idx::HOME_AVG_GA] = state.avg_goals_against(home);
    v[idx::HOME_AVG_SHOTS_RATIO] = state.avg_shots_ratio(home);
    v[idx::AWAY_AVG_GF] = state.avg_goals_for(away);
    v[idx::AWAY_AVG_GA] = state.avg_goals_against(away);
    v[idx::AWAY_AVG_SHOTS_RATIO] = state.avg_shots_ratio(away);
    v[idx::HOME_VENUE] = 1.0;
    v[idx::IMPLIED_ODDS_GAP] = if odds_h <= 0.0 || odds_a <= 0.0 {
        0.0
    } else {
        1.0 / odds_a - 1.0 / odds_h
    };
    let _ = odds_d;

    let rating_h = elo.rating(home);
    let rating_a = elo.rating(away);
    v[idx::ELO_RATIO] = rating_h / rating_a.max(1000.0);
    v[idx::HOME_FORM] = state.recent_form(home);
    v[idx::AWAY_FORM] = state.recent_form(away);
    v[idx::HOME_SCORING_CONSISTENCY] = state.scoring_consistency(home);
    v[idx::ELO_DIFF_NORM] = (rating_h - rating_a) / 400.0;
    v[idx::HOME_GOAL_DIFF_TREND] = state.goal_diff_trend_last3(home);
    v[idx::DRAW_TENDENCY] = (state.draw_share(home) + state.draw_share(away)) / 2.0;
    v[idx::UPSET_POTENTIAL] = ((rating_h - rating_a) / 400.0).abs();

    FeatureVector(v)
}

/// Walk-forward pass over a date-ordered match sequence (spec §4.4): builds
/// a row from prior-only state, then advances both rolling queues and the
/// ELO store with the match's own outcome. Matches must already be sorted
/// by date ascending (C1's contract); this function does not sort.
pub fn build_feature_rows(matches: &[Match], elo: &mut EloStore) -> Vec<FeatureRow> {
    let mut state = RollingTeamState::default();
    let mut rows = Vec::new();

    for m in matches {
        if state.history_len(&m.home) >= MIN_HISTORY && state.history_len(&m.away) >= MIN_HISTORY {
            let features = build_feature_vector(
                &state, elo, &m.home, &m.away, m.odds_h, m.odds_d, m.odds_a,
            );
            rows.push(FeatureRow {
                features,
                label: m.result,
                home: m.home.clone(),
                away: m.away.clone(),
            });
        }

        state.push(
            &m.home,
            RecentMatch {
                goals_for: m.h_goals,
                goals_against: m.a_goals,
                shots_ratio: m.shots_ratio_home(),
                points: m.points_home(),
            },
        );
        state.push(
            &m.away,
            RecentMatch {
                goals_for: m.a_goals,
                goals_against: m.h_goals,
                shots_ratio: m.shots_ratio_away(),
                points: m.points_away(),
            },
        );
        elo.update(&m.home, &m.away, m.result);
    }

    rows
}

/// Rebuilds the rolling per-team state from a date-ordered match history
/// without touching any ELO store — used to bootstrap inference-time
/// context (C8) after a training run has already consumed the same
/// history once for walk-forward feature construction.
pub fn build_rolling_state(matches: &[Match]) -> RollingTeamState {
    let mut state = RollingTeamState::default();
    for m in matches {
        state.push(
            &m.home,
            RecentMatch {
                goals_for: m.h_goals,
                goals_against: m.a_goals,
                shots_ratio: m.shots_ratio_home(),
                points: m.points_home(),
            },
        );
        state.push(
            &m.away,
            RecentMatch {
                goals_for: m.a_goals,
                goals_against: m.h_goals,
                shots_ratio: m.shots_ratio_away(),
                points: m.points_away(),
            },
        );
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn m(date: &str, home: &str, away: &str, hg: u32, ag: u32) -> Match {
        Match {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            league: "EPL".into(),
            season: "2425".into(),
            home: home.into(),
            away: away.into(),
            h_goals: hg,
            a_goals: ag,
            result: Outcome::from_goals(hg, ag),
            h_shots: 10.0,
            a_shots: 8.0,
            h_sot: 4.0,
            a_sot: 3.0,
            odds_h: 2.0,
            odds_d: 3.3,
            odds_a: 4.0,
        }
    }

    #[test]
    fn no_rows_emitted_before_three_prior_matches_each_side() {
        let matches = vec![
            m("2024-01-01", "A", "B", 1, 0),
            m("2024-01-08", "A", "B", 1, 1),
        ];
        let mut elo = EloStore::default();
        let rows = build_feature_rows(&matches, &mut elo);
        assert!(rows.is_empty());
    }

    #[test]
    fn row_emitted_once_both_sides_reach_three_prior_matches() {
        let mut matches = Vec::new();
        for i in 0..3 {
            matches.push(m(&format!("2024-01-{:02}", i * 7 + 1), "A", "C", 1, 0));
            matches.push(m(&format!("2024-02-{:02}", i * 7 + 1), "B", "D", 1, 0));
        }
        matches.push(m("2024-03-01", "A", "B", 2, 1));
        let mut elo = EloStore::default();
        let rows = build_feature_rows(&matches, &mut elo);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].home, "A");
        assert_eq!(rows[0].features.get(idx::HOME_VENUE), 1.0);
    }

    #[test]
    fn current_match_outcome_is_not_folded_into_its_own_row() {
        // A wins every prior A-C match, so by the final fixture A's rating
        // has already risen above 1500 from those three results alone. The
        // emitted row must reflect that pre-fixture rating, not one that
        // also bakes in the A-vs-B result labeled in the same row.
        let mut prior_only = Vec::new();
        let mut matches = Vec::new();
        for i in 0..3 {
            let ac = m(&format!("2024-01-{:02}", i * 7 + 1), "A", "C", 1, 0);
            let bd = m(&format!("2024-02-{:02}", i * 7 + 1), "B", "D", 1, 0);
            prior_only.push(ac.clone());
            prior_only.push(bd.clone());
            matches.push(ac);
            matches.push(bd);
        }
        matches.push(m("2024-03-01", "A", "B", 2, 1));

        let mut elo_expected = EloStore::default();
        for p in &prior_only {
            elo_expected.update(&p.home, &p.away, p.result);
        }
        let expected_ratio =
            elo_expected.rating("A") / elo_expected.rating("B").max(1000.0);
        assert_ne!(elo_expected.rating("A"), 1500.0);

        let mut elo = EloStore::default();
        let rows = build_feature_rows(&matches, &mut elo);
        let row = rows.last().unwrap();
        assert_eq!(row.features.get(idx::ELO_RATIO), expected_ratio);
    }
}
