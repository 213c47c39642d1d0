use serde::{Deserialize, Serialize};

use crate::outcome::{Outcome, Prob3};
use crate::prediction_record::PredictionRecord;
use crate::remote_mirror::RemoteMirror;
use crate::store_util::{atomic_write_json, load_json_or_default, store_path};

const STORE_FILE: &str = "brier_score_history.json";

/// Append-only prediction ledger (spec §4.6). Closed records carry both
/// `actual_result` and `brier_score`; open ones carry neither.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrierTracker {
    records: Vec<PredictionRecord>,
}

impl BrierTracker {
    pub fn load() -> Self {
        match store_path(STORE_FILE) {
            Some(path) => load_json_or_default(&path),
            None => Self::default(),
        }
    }

    /// Appends an open prediction. Idempotent on `match_id`: a repeat call
    /// with an already-known id is a no-op.
    pub fn add_prediction(&mut self, record: PredictionRecord) {
        if self.records.iter().any(|r| r.match_id == record.match_id) {
            return;
        }
        self.records.push(record);
    }

    /// Closes a pending prediction: `brier = mean over k of (p_k - 1{k=actual})^2`.
    pub fn record_result(&mut self, match_id: &str, actual: Outcome) -> bool {
        let Some(record) = self.records.iter_mut().find(|r| r.match_id == match_id) else {
            return false;
        };
        if record.actual_result.is_some() {
            return false;
        }
        let one_hot = Prob3::one_hot(actual);
        let brier = ((record.p_h - one_hot.home).powi(2)
            + (record.p_d - one_hot.draw).powi(2)
            + (record.p_a - one_hot.away).powi(2))
            / 3.0;
        record.actual_result = Some(actual);
        record.brier_score = Some(brier);
        true
    }

    /// Mean Brier score over the last `n` closed records, or all closed
    /// records when `n` is `None`.
    pub fn average_brier(&self, last_n: Option<usize>) -> Option<f64> {
        let closed: Vec<f64> = self
            .records
            .iter()
            .filter_map(|r| r.brier_score)
            .collect();
        mean_of_tail(&closed, last_n)
    }

    /// Argmax-pick accuracy over the last `n` closed records.
    pub fn accuracy(&self, last_n: Option<usize>) -> Option<f64> {
        let hits: Vec<f64> = self
            .records
            .iter()
            .filter_map(|r| r.actual_result.map(|actual| if r.pick.matches(actual) { 1.0 } else { 0.0 }))
            .collect();
        mean_of_tail(&hits, last_n)
    }

    pub fn pending(&self) -> impl Iterator<Item = &PredictionRecord> {
        self.records.iter().filter(|r| r.actual_result.is_none())
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

fn mean_of_tail(values: &[f64], last_n: Option<usize>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let slice = match last_n {
        Some(n) if n < values.len() => &values[values.len() - n..],
        _ => values,
    };
    if slice.is_empty() {
        return None;
    }
    Some(slice.iter().sum::<f64>() / slice.len() as f64)
}
