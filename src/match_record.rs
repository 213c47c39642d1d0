use serde::{Deserialize, Serialize};

use crate::outcome::Outcome;

/// An immutable historical match record (spec §3). Missing optional
/// numerics default to the sentinel `0.0`, never `None` — callers that need
/// to distinguish "zero shots" from "unknown" must consult the source CSV
/// directly; this crate does not carry that distinction past ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub date: chrono::NaiveDate,
    pub league: String,
    pub season: String,
    pub home: String,
    pub away: String,
    pub h_goals: u32,
    pub a_goals: u32,
    pub result: Outcome,
    pub h_shots: f64,
    pub a_shots: f64,
    pub h_sot: f64,
    pub a_sot: f64,
    pub odds_h: f64,
    pub odds_d: f64,
    pub odds_a: f64,
}

impl Match {
    /// `shots_ratio` from a given side's perspective, per the rolling
    /// feature state in spec §4.4. Returns `0.5` (no signal) when both
    /// sides recorded zero shots.
    pub fn shots_ratio_home(&self) -> f64 {
        let total = self.h_shots + self.a_shots;
        if total <= 0.0 {
            0.5
        } else {
            self.h_shots / total
        }
    }

    pub fn shots_ratio_away(&self) -> f64 {
        1.0 - self.shots_ratio_home()
    }

    pub fn points_home(&self) -> u8 {
        match self.result {
            Outcome::Home => 3,
            Outcome::Draw => 1,
            Outcome::Away => 0,
        }
    }

    pub fn points_away(&self) -> u8 {
        match self.result {
            Outcome::Away => 3,
            Outcome::Draw => 1,
            Outcome::Home => 0,
        }
    }

    /// Implied-odds gap feature (§4.4 position 7): `1/odds_away -
    /// 1/odds_home`, `0.0` when either side's odds are missing.
    pub fn implied_odds_gap(&self) -> f64 {
        if self.odds_h <= 0.0 || self.odds_a <= 0.0 {
            0.0
        } else {
            1.0 / self.odds_a - 1.0 / self.odds_h
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Match {
        Match {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            league: "EPL".into(),
            season: "2425".into(),
            home: "Arsenal".into(),
            away: "Chelsea".into(),
            h_goals: 2,
            a_goals: 1,
            result: Outcome::Home,
            h_shots: 10.0,
            a_shots: 5.0,
            h_sot: 5.0,
            a_sot: 2.0,
            odds_h: 2.0,
            odds_d: 3.3,
            odds_a: 4.0,
        }
    }

    #[test]
    fn shots_ratio_complements() {
        let m = sample();
        assert!((m.shots_ratio_home() + m.shots_ratio_away() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn points_sum_is_at_most_two() {
        let m = sample();
        assert_eq!(m.points_home(), 3);
        assert_eq!(m.points_away(), 0);
    }

    #[test]
    fn missing_odds_yield_zero_gap() {
        let mut m = sample();
        m.odds_h = 0.0;
        assert_eq!(m.implied_odds_gap(), 0.0);
    }
}
