use dvg_types::{Divergence, EffectKind};
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::DivergenceError;

/// A path whose evaluation faulted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathFault {
    pub path: String,
    pub error: DivergenceError,
}

/// The outcome of one divergence computation.
///
/// Divergences are keyed by path in emission order. Faulted paths are
/// absent from the divergences and listed in [`Self::faults`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DivergenceReport {
    divergences: IndexMap<String, Divergence>,
    faults: Vec<PathFault>,
}

impl DivergenceReport {
    pub(crate) fn new(divergences: IndexMap<String, Divergence>, faults: Vec<PathFault>) -> Self {
        Self {
            divergences,
            faults,
        }
    }

    /// An empty report, as produced when a snapshot is missing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.divergences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.divergences.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&Divergence> {
        self.divergences.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Divergence)> {
        self.divergences.iter().map(|(path, d)| (path.as_str(), d))
    }

    /// Divergences ordered lexicographically by path.
    pub fn sorted_by_path(&self) -> Vec<(&str, &Divergence)> {
        let mut sorted: Vec<_> = self.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        sorted
    }

    pub fn faults(&self) -> &[PathFault] {
        &self.faults
    }

    /// Number of divergences that are still unresolved.
    pub fn unresolved(&self) -> usize {
        self.divergences.values().filter(|d| !d.is_resolved()).count()
    }

    /// Number of divergences with the given effect.
    pub fn count_effect(&self, kind: EffectKind) -> usize {
        self.divergences
            .values()
            .filter(|d| d.effect_kind() == Some(kind))
            .count()
    }

    pub fn into_map(self) -> IndexMap<String, Divergence> {
        self.divergences
    }
}

/// Serializes as `{ "divergences": [...sorted by path], "faults": [...] }`.
impl Serialize for DivergenceReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let divergences: Vec<&Divergence> =
            self.sorted_by_path().into_iter().map(|(_, d)| d).collect();
        let faults: Vec<String> = self.faults.iter().map(|f| f.error.to_string()).collect();
        let mut state = serializer.serialize_struct("DivergenceReport", 2)?;
        state.serialize_field("divergences", &divergences)?;
        state.serialize_field("faults", &faults)?;
        state.end()
    }
}
