use std::collections::BTreeSet;

use crate::outcome::{Outcome, Prob3};
use crate::prediction_record::{Pick, Trigger};

/// Per-team persistence ("Hurst") scalars supplied by the caller as context
/// for the CHAOS adjuster and the Poisson λ correction (spec §4.5 point 3).
/// Bootstrap callers that have no such signal should pass `0.5` for both
/// sides, which leaves both adjusters inert.
#[derive(Debug, Clone, Copy)]
pub struct PersistenceContext {
    pub home_hurst: f64,
    pub away_hurst: f64,
}

impl Default for PersistenceContext {
    fn default() -> Self {
        Self {
            home_hurst: 0.5,
            away_hurst: 0.5,
        }
    }
}

/// Applies the bounded adjuster chain in the fixed order the spec lists
/// (§4.5 point 5), renormalizing once at the end, and returns the set of
/// triggers that fired for explanatory rendering.
pub fn apply_adjusters(
    mut p: Prob3,
    ctx: PersistenceContext,
    elo_gap: f64,
    anomaly_flagged: bool,
    home_is_public_favorite: bool,
) -> (Prob3, BTreeSet<Trigger>) {
    let mut triggers = BTreeSet::new();

    if ctx.home_hurst < 0.45 || ctx.away_hurst < 0.45 {
        p.draw *= 1.08;
        p.away *= 1.05;
        p = p.normalized();
        triggers.insert(Trigger::LowPersistenceChaos);
    }

    if elo_gap < -100.0 {
        // `min(8%, |gap|/50)` on a 0-1 probability scale is `min(0.08, |gap|/5000)`.
        let adj = (elo_gap.abs() / 5000.0).min(0.08);
        p.home -= adj;
        p.away += adj;
        triggers.insert(Trigger::EloGapAway);
    } else if elo_gap > 200.0 {
        let adj = (elo_gap / 10000.0).min(0.05);
        p.home += adj;
        p.away -= adj;
        triggers.insert(Trigger::EloGapHome);
    }

    if anomaly_flagged && home_is_public_favorite {
        let trap = p.home * 0.08;
        p.home -= trap;
        p.draw += trap * 0.6;
        p.away += trap * 0.4;
        triggers.insert(Trigger::AnomalyFavoriteFade);
    }

    (p.normalized(), triggers)
}

/// The draw-sensitivity pick rule (spec §4.5 "Pick rule"): entropy-scaled
/// draw buffer, then a ghost-stagnation override that suppresses an
/// indecisive draw pick when the distribution is simultaneously close AND
/// low-entropy (the two together signal a stale/degenerate fixture rather
/// than a genuine toss-up).
pub fn pick_outcome(mut p: Prob3, triggers: &mut BTreeSet<Trigger>) -> (Prob3, Pick) {
    let raw_entropy = p.entropy();
    let norm_entropy = raw_entropy / 3.0_f64.log2();
    let draw_buffer = (0.20 * norm_entropy).max(0.05);
    let mut gap = (p.home - p.away).abs();

    if gap <= draw_buffer && raw_entropy <= 1.45 {
        p.draw = p.home.min(p.away) - 0.01;
        p = p.normalized();
        gap = (p.home - p.away).abs();
        triggers.insert(Trigger::GhostStagnationSuppressedDraw);
    }

    let pick = if gap <= draw_buffer && p.draw >= 0.25 {
        triggers.insert(Trigger::SmartDrawBuffer);
        Pick::Draw
    } else {
        Pick::from_outcome(p.argmax())
    };

    (p, pick)
}
