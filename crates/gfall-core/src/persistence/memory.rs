use super::{LevelLineStore, NewLine};
use crate::domain::{GfallError, GfallResult, IonKey, LevelMethod, Medium};
use crate::gfall::Level;
use crate::serialization::write_json_artifact;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLevel {
    pub level_id: u64,
    pub data_source: String,
    pub ion: IonKey,
    pub level_index: u32,
    pub j: f64,
    /// cm^-1.
    pub energy: f64,
    pub method: LevelMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLine {
    pub line_id: u64,
    pub data_source: String,
    pub lower_level_id: u64,
    pub upper_level_id: u64,
    /// Ordinal among the lines handed over for the same level pair, so that
    /// hyperfine and isotopic components each keep a row.
    pub component: u32,
    /// nm, in `medium`.
    pub wavelength: f64,
    pub medium: Medium,
    pub gf: f64,
}

type LevelSlot = (String, IonKey, u32);
type LineSlot = (String, u64, u64, u32);

/// Store kept in memory and persisted as a JSON snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InMemoryStore {
    levels: Vec<StoredLevel>,
    lines: Vec<StoredLine>,
    #[serde(skip)]
    level_slots: HashMap<LevelSlot, usize>,
    #[serde(skip)]
    line_slots: HashMap<LineSlot, usize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn levels(&self) -> &[StoredLevel] {
        &self.levels
    }

    pub fn lines(&self) -> &[StoredLine] {
        &self.lines
    }

    pub fn from_json_str(source: &str) -> GfallResult<Self> {
        let mut store = serde_json::from_str::<Self>(source).map_err(|source| {
            GfallError::format(
                "FORMAT.STORE_JSON",
                format!("failed to parse store snapshot: {source}"),
            )
        })?;
        store.rebuild_slots();
        Ok(store)
    }

    /// Loads a snapshot, or starts empty when `path` does not exist yet.
    pub fn load_or_default(path: &Path) -> GfallResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let source = fs::read_to_string(path).map_err(|source| {
            GfallError::io_system(
                "IO.STORE_READ",
                format!("failed to read store snapshot '{}': {}", path.display(), source),
            )
        })?;
        Self::from_json_str(&source)
    }

    pub fn save(&self, path: &Path) -> GfallResult<()> {
        write_json_artifact(path, self)
    }

    fn rebuild_slots(&mut self) {
        self.level_slots = self
            .levels
            .iter()
            .enumerate()
            .map(|(slot, level)| ((level.data_source.clone(), level.ion, level.level_index), slot))
            .collect();
        self.line_slots = self
            .lines
            .iter()
            .enumerate()
            .map(|(slot, line)| {
                (
                    (
                        line.data_source.clone(),
                        line.lower_level_id,
                        line.upper_level_id,
                        line.component,
                    ),
                    slot,
                )
            })
            .collect();
    }

    fn next_level_id(&self) -> u64 {
        self.levels.iter().map(|level| level.level_id).max().unwrap_or(0) + 1
    }

    fn next_line_id(&self) -> u64 {
        self.lines.iter().map(|line| line.line_id).max().unwrap_or(0) + 1
    }
}

impl LevelLineStore for InMemoryStore {
    fn upsert_levels(
        &mut self,
        data_source: &str,
        ion: IonKey,
        levels: &[Level],
    ) -> GfallResult<Vec<u64>> {
        let mut next_level_id = self.next_level_id();
        let mut level_ids = Vec::with_capacity(levels.len());

        for level in levels {
            if level.ion != ion {
                return Err(GfallError::internal(
                    "STORE.ION_MISMATCH",
                    format!("level of ion {} handed over as ion {}", level.ion, ion),
                ));
            }

            let slot_key = (data_source.to_string(), ion, level.level_index);
            let level_id = match self.level_slots.get(&slot_key) {
                Some(&slot) => {
                    let stored = &mut self.levels[slot];
                    stored.j = level.j;
                    stored.energy = level.energy;
                    stored.method = level.method;
                    stored.level_id
                }
                None => {
                    let level_id = next_level_id;
                    next_level_id += 1;
                    self.level_slots.insert(slot_key, self.levels.len());
                    self.levels.push(StoredLevel {
                        level_id,
                        data_source: data_source.to_string(),
                        ion,
                        level_index: level.level_index,
                        j: level.j,
                        energy: level.energy,
                        method: level.method,
                    });
                    level_id
                }
            };
            level_ids.push(level_id);
        }
        Ok(level_ids)
    }

    fn upsert_lines(&mut self, data_source: &str, lines: &[NewLine]) -> GfallResult<Vec<u64>> {
        let mut next_line_id = self.next_line_id();
        let mut line_ids = Vec::with_capacity(lines.len());
        let mut components = HashMap::<(u64, u64), u32>::new();

        for line in lines {
            let pair_count = components
                .entry((line.lower_level_id, line.upper_level_id))
                .or_default();
            let component = *pair_count;
            *pair_count += 1;

            let slot_key = (
                data_source.to_string(),
                line.lower_level_id,
                line.upper_level_id,
                component,
            );
            let line_id = match self.line_slots.get(&slot_key) {
                Some(&slot) => {
                    let stored = &mut self.lines[slot];
                    stored.wavelength = line.wavelength;
                    stored.medium = line.medium;
                    stored.gf = line.gf;
                    stored.line_id
                }
                None => {
                    let line_id = next_line_id;
                    next_line_id += 1;
                    self.line_slots.insert(slot_key, self.lines.len());
                    self.lines.push(StoredLine {
                        line_id,
                        data_source: data_source.to_string(),
                        lower_level_id: line.lower_level_id,
                        upper_level_id: line.upper_level_id,
                        component,
                        wavelength: line.wavelength,
                        medium: line.medium,
                        gf: line.gf,
                    });
                    line_id
                }
            };
            line_ids.push(line_id);
        }
        Ok(line_ids)
    }

    fn level_index_to_id(&self, data_source: &str, ion: IonKey) -> GfallResult<BTreeMap<u32, u64>> {
        Ok(self
            .levels
            .iter()
            .filter(|level| level.data_source == data_source && level.ion == ion)
            .map(|level| (level.level_index, level.level_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryStore;
    use crate::domain::{IonKey, LevelMethod, Medium};
    use crate::gfall::Level;
    use crate::persistence::{LevelLineStore, NewLine};
    use tempfile::TempDir;

    fn level(ion: IonKey, level_index: u32, energy: f64) -> Level {
        Level {
            ion,
            level_index,
            energy,
            j: 0.5,
            label: String::new(),
            method: LevelMethod::Measured,
        }
    }

    #[test]
    fn upserting_levels_twice_keeps_their_ids() {
        let ion = IonKey::new(1, 0);
        let mut store = InMemoryStore::new();
        let levels = vec![level(ion, 0, 0.0), level(ion, 1, 82259.158)];

        let first = store.upsert_levels("ku_latest", ion, &levels).unwrap();
        let second = store.upsert_levels("ku_latest", ion, &levels).unwrap();
        assert_eq!(first, vec![1, 2]);
        assert_eq!(first, second);
        assert_eq!(store.levels().len(), 2);

        let other_source = store.upsert_levels("ku_2012", ion, &levels[..1]).unwrap();
        assert_eq!(other_source, vec![3]);

        let index = store.level_index_to_id("ku_latest", ion).unwrap();
        assert_eq!(index.get(&1), Some(&2));
        assert!(store.level_index_to_id("ku_latest", IonKey::new(2, 0)).unwrap().is_empty());
    }

    #[test]
    fn levels_of_another_ion_are_rejected() {
        let mut store = InMemoryStore::new();
        let error = store
            .upsert_levels("ku_latest", IonKey::new(2, 0), &[level(IonKey::new(1, 0), 0, 0.0)])
            .unwrap_err();
        assert_eq!(error.placeholder(), "STORE.ION_MISMATCH");
    }

    #[test]
    fn snapshot_round_trip_restores_upsert_slots() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("store.json");
        let ion = IonKey::new(1, 0);

        let mut store = InMemoryStore::load_or_default(&path).unwrap();
        store.upsert_levels("ku_latest", ion, &[level(ion, 0, 0.0), level(ion, 1, 82259.158)]).unwrap();
        let line = NewLine {
            lower_level_id: 1,
            upper_level_id: 2,
            wavelength: 121.567,
            medium: Medium::Vacuum,
            gf: 0.8324,
        };
        store.upsert_lines("ku_latest", &[line.clone()]).unwrap();
        store.save(&path).unwrap();

        let mut reloaded = InMemoryStore::load_or_default(&path).unwrap();
        assert_eq!(reloaded.levels(), store.levels());
        assert_eq!(reloaded.upsert_lines("ku_latest", &[line]).unwrap(), vec![1]);
        assert_eq!(reloaded.lines().len(), 1);
        assert_eq!(
            reloaded.upsert_levels("ku_latest", ion, &[level(ion, 1, 82259.2)]).unwrap(),
            vec![2]
        );
        assert_eq!(reloaded.levels()[1].energy, 82259.2);
    }

    #[test]
    fn components_sharing_a_level_pair_keep_separate_rows() {
        let ion = IonKey::new(3, 0);
        let mut store = InMemoryStore::new();
        store.upsert_levels("ku_latest", ion, &[level(ion, 0, 0.0), level(ion, 1, 14903.66)]).unwrap();
        let component = |wavelength, gf| NewLine {
            lower_level_id: 1,
            upper_level_id: 2,
            wavelength,
            medium: Medium::Air,
            gf,
        };
        let lines = [component(670.776, 0.9817), component(670.791, 0.4909)];

        assert_eq!(store.upsert_lines("ku_latest", &lines).unwrap(), vec![1, 2]);
        assert_eq!(store.upsert_lines("ku_latest", &lines).unwrap(), vec![1, 2]);

        let stored = store
            .lines()
            .iter()
            .map(|line| (line.component, line.wavelength, line.gf))
            .collect::<Vec<_>>();
        assert_eq!(stored, vec![(0, 670.776, 0.9817), (1, 670.791, 0.4909)]);
    }
}
