use super::normalize::{NormalizedLevel, NormalizedRow};
use crate::domain::{
    GfallError, GfallResult, IdentityKey, IonKey, LevelAttributes, LevelKey, LevelMethod,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::info;

/// A deduplicated gfall level, addressed by `(ion, level_index)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub ion: IonKey,
    pub level_index: u32,
    /// Wavenumber in cm^-1.
    pub energy: f64,
    pub j: f64,
    pub label: String,
    pub method: LevelMethod,
}

impl Level {
    /// Statistical weight `2j + 1`.
    pub fn g(&self) -> u32 {
        (2.0 * self.j + 1.0).round().max(0.0) as u32
    }
}

impl LevelAttributes for Level {
    fn energy(&self) -> f64 {
        self.energy
    }

    fn j(&self) -> f64 {
        self.j
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Levels sorted by ion and level index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LevelTable {
    levels: Vec<Level>,
}

impl LevelTable {
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn ions(&self) -> Vec<IonKey> {
        self.levels
            .iter()
            .map(|level| level.ion)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn ion_levels(&self, ion: IonKey) -> &[Level] {
        let start = self.levels.partition_point(|level| level.ion < ion);
        let end = self.levels.partition_point(|level| level.ion <= ion);
        &self.levels[start..end]
    }

    pub fn get(&self, ion: IonKey, level_index: u32) -> Option<&Level> {
        self.ion_levels(ion).get(level_index as usize)
    }

    pub fn retain_ions(&self, mut keep: impl FnMut(IonKey) -> bool) -> Self {
        Self {
            levels: self
                .levels
                .iter()
                .filter(|level| keep(level.ion))
                .cloned()
                .collect(),
        }
    }

    /// Maps the composite identity key of every level to its index, failing if
    /// two levels of one ion share a key.
    pub fn index_by_key(&self, identity_key: &IdentityKey) -> GfallResult<HashMap<LevelKey, u32>> {
        let mut index = HashMap::with_capacity(self.levels.len());
        for level in &self.levels {
            let key = identity_key.key_for(level.ion, level);
            if let Some(previous) = index.insert(key, level.level_index) {
                return Err(GfallError::referential(
                    "REFERENCE.KEY_COLLISION",
                    format!(
                        "ion {}: levels {} and {} share the identity key [{}]",
                        level.ion, previous, level.level_index, identity_key
                    ),
                ));
            }
        }
        Ok(index)
    }
}

struct LevelCandidate<'a> {
    ion: IonKey,
    level: &'a NormalizedLevel,
}

/// Collects the distinct lower and upper levels of `rows` and numbers them per
/// ion in `(energy, j, label)` order.
pub fn extract_levels(rows: &[NormalizedRow], identity_key: &IdentityKey) -> LevelTable {
    let lowers = rows.iter().map(|row| LevelCandidate {
        ion: row.ion,
        level: &row.levels.lower,
    });
    let uppers = rows.iter().map(|row| LevelCandidate {
        ion: row.ion,
        level: &row.levels.upper,
    });

    let mut seen = HashSet::new();
    let mut distinct = lowers
        .chain(uppers)
        .filter(|candidate| seen.insert(identity_key.key_for(candidate.ion, candidate.level)))
        .collect::<Vec<_>>();

    distinct.sort_by(|left, right| {
        left.ion
            .cmp(&right.ion)
            .then_with(|| left.level.energy.total_cmp(&right.level.energy))
            .then_with(|| left.level.j.total_cmp(&right.level.j))
            .then_with(|| left.level.label.cmp(&right.level.label))
    });

    let mut levels = Vec::with_capacity(distinct.len());
    let mut current_ion = None;
    let mut next_index = 0_u32;
    for candidate in distinct {
        if current_ion != Some(candidate.ion) {
            current_ion = Some(candidate.ion);
            next_index = 0;
        }
        levels.push(Level {
            ion: candidate.ion,
            level_index: next_index,
            energy: candidate.level.energy,
            j: candidate.level.j,
            label: candidate.level.label.clone(),
            method: LevelMethod::from_theoretical(candidate.level.theoretical),
        });
        next_index += 1;
    }

    info!(
        rows = rows.len(),
        levels = levels.len(),
        identity_key = %identity_key,
        "extracted distinct levels"
    );
    LevelTable { levels }
}
