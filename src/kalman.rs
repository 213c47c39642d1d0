use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::remote_mirror::RemoteMirror;
use crate::store_util::{atomic_write_json, load_json_or_default, store_path};

const PROCESS_NOISE: f64 = 0.02;
const MEASUREMENT_NOISE: f64 = 0.15;
const STORE_FILE: &str = "kalman_states.json";

/// A scalar Kalman state for one team: the smoothed estimate and its error
/// covariance (spec §3, §4.3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KalmanState {
    pub estimate: f64,
    pub covariance: f64,
}

/// One scalar Kalman filter per team, smoothing a noisy attacking-strength
/// (xG) measurement so a single freak match doesn't swing the modeled
/// strength by a full unit. Persistence is optional: if the store can't be
/// written, the filter keeps running in memory (spec §4.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KalmanFilterBank {
    states: HashMap<String, KalmanState>,
}

impl KalmanFilterBank {
    pub fn load() -> Self {
        match store_path(STORE_FILE) {
            Some(path) => load_json_or_default(&path),
            None => Self::default(),
        }
    }

    pub fn estimate(&self, team: &str) -> Option<f64> {
        self.states.get(team).map(|s| s.estimate)
    }

    /// Smooths one new raw observation for `team`, updating and returning
    /// the filter's estimate.
    pub fn observe(&mut self, team: &str, raw_value: f64) -> f64 {
        let Some(prior) = self.states.get(team).copied() else {
            self.states.insert(
                team.to_string(),
                KalmanState {
                    estimate: raw_value,
                    covariance: 1.0,
                },
            );
            return raw_value;
        };

        let p_prior = prior.covariance + PROCESS_NOISE;
        let gain = p_prior / (p_prior + MEASUREMENT_NOISE);
        let estimate = prior.estimate + gain * (raw_value - prior.estimate);
        let covariance = (1.0 - gain) * p_prior;

        self.states.insert(team.to_string(), KalmanState { estimate, covariance });
        estimate
    }

    pub fn save(&self, mirror: &dyn RemoteMirror) {
        let Some(path) = store_path(STORE_FILE) else {
            return;
        };
        // Persistence is optional per spec §4.3: an unwritable destination
        // is swallowed, not surfaced.
        if atomic_write_json(&path, self).is_ok() {
            if let Ok(bytes) = serde_json::to_vec(self) {
                mirror.mirror(STORE_FILE, &bytes);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_returns_raw_value() {
        let mut bank = KalmanFilterBank::default();
        assert_eq!(bank.observe("Arsenal", 1.8), 1.8);
    }

    #[test]
    fn gain_is_between_zero_and_one_after_first() {
        let mut bank = KalmanFilterBank::default();
        bank.observe("Arsenal", 1.8);
        let before_p = bank.states["Arsenal"].covariance;
        bank.observe("Arsenal", 0.5);
        let after_p = bank.states["Arsenal"].covariance;
        // P' < P + q is the invariant; q = 0.02 here.
        assert!(after_p < before_p + PROCESS_NOISE);
    }

    #[test]
    fn one_noisy_match_does_not_shift_estimate_by_a_full_unit() {
        let mut bank = KalmanFilterBank::default();
        bank.observe("Arsenal", 1.5);
        let shocked = bank.observe("Arsenal", 4.5);
        assert!((shocked - 1.5).abs() < 1.0);
    }

    #[test]
    fn converges_toward_stationary_mean() {
        let mut bank = KalmanFilterBank::default();
        let mut last = bank.observe("Arsenal", 1.0);
        for _ in 0..200 {
            last = bank.observe("Arsenal", 2.0);
        }
        assert!((last - 2.0).abs() < 0.05);
    }
}
