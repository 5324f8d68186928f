//! Hand-over of gfall levels and lines to a level/line store.
//!
//! The store owns identities: levels are upserted per ion first, and lines are
//! then written against the stored ids looked up by `level_index`. Upserts are
//! keyed so that ingesting the same data source again changes nothing.

pub mod memory;

pub use memory::{InMemoryStore, StoredLevel, StoredLine};

use crate::common::constants::GFALL_AIR_THRESHOLD_NM;
use crate::common::units::medium_for_wavelength_nm;
use crate::domain::{GfallError, GfallResult, IonKey, Medium};
use crate::gfall::{GfallTables, Level, LevelTable, LineTable};
use crate::selection::IonSelection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument};

pub const DEFAULT_DATA_SOURCE: &str = "ku_latest";

/// A line ready for storage, already pointing at stored level ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLine {
    pub lower_level_id: u64,
    pub upper_level_id: u64,
    /// nm, in `medium`.
    pub wavelength: f64,
    pub medium: Medium,
    pub gf: f64,
}

pub trait LevelLineStore {
    /// Inserts or updates the levels of one ion and returns their ids in input
    /// order.
    fn upsert_levels(
        &mut self,
        data_source: &str,
        ion: IonKey,
        levels: &[Level],
    ) -> GfallResult<Vec<u64>>;

    /// Lines sharing a level pair are told apart by their order in `lines`;
    /// handing over the same slice again updates them in place.
    fn upsert_lines(&mut self, data_source: &str, lines: &[NewLine]) -> GfallResult<Vec<u64>>;

    fn level_index_to_id(&self, data_source: &str, ion: IonKey) -> GfallResult<BTreeMap<u32, u64>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IngestSummary {
    pub ions: usize,
    pub levels: usize,
    pub lines: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GfallIngester {
    data_source: String,
    selection: IonSelection,
    air_threshold_nm: f64,
}

impl GfallIngester {
    pub fn new(data_source: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            selection: IonSelection::all(),
            air_threshold_nm: GFALL_AIR_THRESHOLD_NM,
        }
    }

    pub fn with_selection(mut self, selection: IonSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    #[instrument(skip_all, fields(data_source = %self.data_source))]
    pub fn ingest_levels(
        &self,
        store: &mut dyn LevelLineStore,
        levels: &LevelTable,
    ) -> GfallResult<IngestSummary> {
        let mut summary = IngestSummary::default();
        for ion in levels.ions() {
            if !self.selection.contains(ion) {
                continue;
            }
            let ion_levels = levels.ion_levels(ion);
            store.upsert_levels(&self.data_source, ion, ion_levels)?;
            debug!(ion = %ion, levels = ion_levels.len(), "ingested levels");
            summary.ions += 1;
            summary.levels += ion_levels.len();
        }
        info!(ions = summary.ions, levels = summary.levels, "ingested levels");
        Ok(summary)
    }

    /// Requires the levels of every ion to be stored already. Every line is
    /// resolved before the store is touched, so a missing level leaves the
    /// store unchanged.
    #[instrument(skip_all, fields(data_source = %self.data_source))]
    pub fn ingest_lines(
        &self,
        store: &mut dyn LevelLineStore,
        lines: &LineTable,
    ) -> GfallResult<IngestSummary> {
        let ions = lines
            .lines()
            .iter()
            .map(|line| line.ion)
            .filter(|ion| self.selection.contains(*ion))
            .collect::<BTreeSet<_>>();

        let mut summary = IngestSummary::default();
        let mut new_lines = Vec::new();
        for ion in ions {
            let index_to_id = store.level_index_to_id(&self.data_source, ion)?;
            let stored_id = |level_index: u32| {
                index_to_id.get(&level_index).copied().ok_or_else(|| {
                    GfallError::referential(
                        "STORE.LEVELS_MISSING",
                        format!(
                            "level {level_index} of ion {ion} is not stored for data source '{}'; ingest levels before lines",
                            self.data_source
                        ),
                    )
                })
            };

            let before = new_lines.len();
            for line in lines.ion_lines(ion) {
                new_lines.push(NewLine {
                    lower_level_id: stored_id(line.level_index.lower)?,
                    upper_level_id: stored_id(line.level_index.upper)?,
                    wavelength: line.wavelength,
                    medium: medium_for_wavelength_nm(line.wavelength, self.air_threshold_nm),
                    gf: line.gf,
                });
            }
            debug!(ion = %ion, lines = new_lines.len() - before, "resolved lines");
            summary.ions += 1;
        }

        store.upsert_lines(&self.data_source, &new_lines)?;
        summary.lines = new_lines.len();
        info!(ions = summary.ions, lines = summary.lines, "ingested lines");
        Ok(summary)
    }

    pub fn ingest(
        &self,
        store: &mut dyn LevelLineStore,
        tables: &GfallTables,
    ) -> GfallResult<IngestSummary> {
        let levels = self.ingest_levels(store, &tables.levels)?;
        let lines = self.ingest_lines(store, &tables.lines)?;
        Ok(IngestSummary {
            ions: levels.ions.max(lines.ions),
            levels: levels.levels,
            lines: lines.lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{GfallIngester, InMemoryStore, LevelLineStore};
    use crate::domain::{IdentityKey, IonKey, LevelPair, Medium};
    use crate::gfall::normalize::{NormalizedLevel, NormalizedRow};
    use crate::gfall::record::LineExtras;
    use crate::gfall::{GfallTables, extract_levels, extract_lines};
    use crate::selection::IonSelection;

    fn level(energy: f64, j: f64) -> NormalizedLevel {
        NormalizedLevel {
            energy,
            j,
            label: String::new(),
            theoretical: false,
            nlte_level_no: None,
            hyper_shift: None,
            hyperfine_f: None,
            hyperfine_note: None,
            lande_g: None,
        }
    }

    fn tables() -> GfallTables {
        let row = |ion, wavelength, lower, upper| NormalizedRow {
            line_number: 1,
            ion,
            wavelength,
            loggf: 0.0,
            levels: LevelPair::new(lower, upper),
            extras: LineExtras::default(),
        };
        let rows = vec![
            row(IonKey::new(1, 0), 121.567, level(0.0, 0.5), level(82259.158, 1.5)),
            row(IonKey::new(1, 0), 656.28, level(82259.158, 1.5), level(97492.304, 2.5)),
            row(IonKey::new(2, 1), 30.378, level(0.0, 0.5), level(329179.3, 1.5)),
        ];
        let key = IdentityKey::default();
        let levels = extract_levels(&rows, &key);
        let lines = extract_lines(&rows, &levels, &key).unwrap();
        GfallTables { rows, levels, lines }
    }

    #[test]
    fn ingest_stores_levels_then_lines() {
        let mut store = InMemoryStore::new();
        let summary = GfallIngester::new("ku_latest")
            .ingest(&mut store, &tables())
            .unwrap();

        assert_eq!(summary.ions, 2);
        assert_eq!(summary.levels, 5);
        assert_eq!(summary.lines, 3);
        assert_eq!(store.levels().len(), 5);

        let media = store.lines().iter().map(|line| line.medium).collect::<Vec<_>>();
        assert_eq!(media, vec![Medium::Vacuum, Medium::Air, Medium::Vacuum]);

        let hydrogen = store.level_index_to_id("ku_latest", IonKey::new(1, 0)).unwrap();
        assert_eq!(store.lines()[1].lower_level_id, hydrogen[&1]);
        assert_eq!(store.lines()[1].upper_level_id, hydrogen[&2]);
    }

    #[test]
    fn reingesting_a_data_source_is_idempotent() {
        let mut store = InMemoryStore::new();
        let ingester = GfallIngester::new("ku_latest");
        ingester.ingest(&mut store, &tables()).unwrap();
        let snapshot = store.clone();

        ingester.ingest(&mut store, &tables()).unwrap();
        assert_eq!(store.levels(), snapshot.levels());
        assert_eq!(store.lines(), snapshot.lines());
    }

    #[test]
    fn lines_before_levels_are_refused() {
        let mut store = InMemoryStore::new();
        let error = GfallIngester::new("ku_latest")
            .ingest_lines(&mut store, &tables().lines)
            .unwrap_err();
        assert_eq!(error.placeholder(), "STORE.LEVELS_MISSING");
        assert!(store.lines().is_empty());
    }

    #[test]
    fn a_missing_ion_leaves_no_lines_behind() {
        let full = tables();
        let mut store = InMemoryStore::new();
        let ingester = GfallIngester::new("ku_latest");
        let hydrogen = full.levels.retain_ions(|ion| ion == IonKey::new(1, 0));
        ingester.ingest_levels(&mut store, &hydrogen).unwrap();

        let error = ingester.ingest_lines(&mut store, &full.lines).unwrap_err();
        assert_eq!(error.placeholder(), "STORE.LEVELS_MISSING");
        assert!(error.message().contains("ion 2:1"));
        assert!(store.lines().is_empty());
        assert_eq!(store.levels().len(), 3);
    }

    #[test]
    fn lines_sharing_levels_are_all_stored() {
        let lithium = IonKey::new(3, 0);
        let row = |wavelength, loggf| NormalizedRow {
            line_number: 1,
            ion: lithium,
            wavelength,
            loggf,
            levels: LevelPair::new(level(0.0, 0.5), level(14903.66, 1.5)),
            extras: LineExtras::default(),
        };
        let rows = vec![row(670.776, -0.008), row(670.791, -0.309)];
        let key = IdentityKey::default();
        let levels = extract_levels(&rows, &key);
        let lines = extract_lines(&rows, &levels, &key).unwrap();
        let tables = GfallTables { rows, levels, lines };

        let mut store = InMemoryStore::new();
        let ingester = GfallIngester::new("ku_latest");
        let summary = ingester.ingest(&mut store, &tables).unwrap();
        assert_eq!(summary.lines, 2);
        ingester.ingest(&mut store, &tables).unwrap();

        let wavelengths = store.lines().iter().map(|line| line.wavelength).collect::<Vec<_>>();
        assert_eq!(wavelengths, vec![670.776, 670.791]);
    }

    #[test]
    fn selection_limits_ingested_ions() {
        let mut store = InMemoryStore::new();
        let summary = GfallIngester::new("ku_latest")
            .with_selection(IonSelection::only([IonKey::new(2, 1)]))
            .ingest(&mut store, &tables())
            .unwrap();
        assert_eq!(summary.ions, 1);
        assert_eq!(summary.levels, 2);
        assert_eq!(summary.lines, 1);
        assert!(store.levels().iter().all(|level| level.ion == IonKey::new(2, 1)));
    }
}
