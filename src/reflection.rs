use serde::{Deserialize, Serialize};

use crate::features::{FeatureVector, DIM};
use crate::outcome::Outcome;
use crate::remote_mirror::RemoteMirror;
use crate::store_util::{atomic_write_json, load_json_or_default, store_path};

const STORE_FILE: &str = "reflection_set.json";

/// A past prediction retained with its realized label, for reweighted
/// retraining (spec §3). Serialized as a plain `[f64; 16]` array rather
/// than through `FeatureVector` directly, since the latter has no derived
/// `Serialize` impl of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionEntry {
    pub match_id: String,
    pub features: [f64; DIM],
    pub label: Outcome,
}

impl ReflectionEntry {
    pub fn new(match_id: impl Into<String>, features: FeatureVector, label: Outcome) -> Self {
        Self {
            match_id: match_id.into(),
            features: *features.as_slice(),
            label,
        }
    }
}

/// The persisted reflection set (spec §3, §9). Training (C5) folds these
/// rows back into the feature matrix with `sample_weight = 3.0`, as
/// additional rows rather than duplicates of existing ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReflectionSet {
    entries: Vec<ReflectionEntry>,
}

const REFLECTION_WEIGHT: f64 = 3.0;

impl ReflectionSet {
    pub fn load() -> Self {
        match store_path(STORE_FILE) {
            Some(path) => load_json_or_default(&path),
            None => Self::default(),
        }
    }

    pub fn add(&mut self, entry: ReflectionEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exports the reflection rows as `(X, y, w)` triples for concatenation
    /// onto the base training matrix, per the REDESIGN FLAGS guidance
    /// (weight, not duplication).
    pub fn as_weighted_rows(&self) -> Vec<([f64; DIM], Outcome, f64)> {
        self.entries
            .iter()
            .map(|e| (e.features, e.label, REFLECTION_WEIGHT))
            .collect()
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote_mirror::NullMirror;

    #[test]
    fn weighted_rows_carry_the_fixed_reflection_weight() {
        let mut set = ReflectionSet::default();
        set.add(ReflectionEntry::new(
            "m1",
            FeatureVector([0.0; DIM]),
            Outcome::Home,
        ));
        let rows = set.as_weighted_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].2, 3.0);
    }

    #[test]
    fn empty_set_exports_no_rows() {
        let set = ReflectionSet::default();
        assert!(set.as_weighted_rows().is_empty());
        set.save(&NullMirror);
    }
}
