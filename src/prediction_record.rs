use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::outcome::Outcome;

/// The categorical forecast derived from the final probability vector and
/// the draw rule (spec §4.5) — not always the argmax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pick {
    Home,
    Draw,
    Away,
}

impl Pick {
    pub fn from_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Home => Pick::Home,
            Outcome::Draw => Pick::Draw,
            Outcome::Away => Pick::Away,
        }
    }

    pub fn matches(self, outcome: Outcome) -> bool {
        matches!(
            (self, outcome),
            (Pick::Home, Outcome::Home) | (Pick::Draw, Outcome::Draw) | (Pick::Away, Outcome::Away)
        )
    }
}

/// Names of the bounded adjusters / pick-rule overrides that fired for a
/// given prediction, carried for explanatory rendering (spec §4.5 closing
/// paragraph). `BTreeSet` keeps a deterministic, sorted order for display
/// and for byte-identical serialization in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Trigger {
    LowPersistenceChaos,
    EloGapHome,
    EloGapAway,
    AnomalyFavoriteFade,
    GhostStagnationSuppressedDraw,
    SmartDrawBuffer,
}

/// Emitted by C5, consumed by C6 (spec §3). `actual_result` and
/// `brier_score` start `None` and are filled exactly once, by
/// `BrierTracker::record_result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub match_id: String,
    pub home: String,
    pub away: String,
    pub p_h: f64,
    pub p_d: f64,
    pub p_a: f64,
    pub pick: Pick,
    pub triggers: BTreeSet<Trigger>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub actual_result: Option<Outcome>,
    pub brier_score: Option<f64>,
}

impl PredictionRecord {
    /// `|p_h + p_d + p_a - 1| <= 1e-6` and each probability in `[0, 1]`
    /// (spec §3, §8 universal invariant).
    pub fn is_well_formed(&self) -> bool {
        let sum_ok = (self.p_h + self.p_d + self.p_a - 1.0).abs() <= 1e-6;
        let range_ok = [self.p_h, self.p_d, self.p_a]
            .iter()
            .all(|p| (0.0..=1.0).contains(p));
        sum_ok && range_ok
    }
}
