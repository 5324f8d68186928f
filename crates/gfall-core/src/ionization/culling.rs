use super::{IonizationData, IonizationEnergySource};
use crate::common::constants::GFALL_AIR_THRESHOLD_NM;
use crate::common::units::{
    air_to_vacuum_angstrom, medium_for_wavelength_nm, nm_to_angstrom, wavenumber_to_ev,
};
use crate::domain::{GfallError, GfallResult, IonKey, Medium};
use crate::gfall::GfallTables;
use crate::selection::IonSelection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, instrument, warn};

/// Ground levels closer than this to a gfall level of the same ion and weight
/// are treated as the same level.
const GROUND_LEVEL_MATCH_EV: f64 = 1.0e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub air_threshold_nm: f64,
    pub selection: IonSelection,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            air_threshold_nm: GFALL_AIR_THRESHOLD_NM,
            selection: IonSelection::all(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalLevel {
    pub level_id: u64,
    pub atomic_number: u32,
    pub ion_number: u32,
    /// Position within the ion after culling, in (energy, g) order.
    pub level_number: u32,
    pub g: u32,
    /// eV.
    pub energy: f64,
    pub metastable: bool,
}

impl FinalLevel {
    pub fn is_fully_ionized(&self) -> bool {
        self.ion_number == self.atomic_number
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalLine {
    pub line_id: u64,
    pub lower_level_id: u64,
    pub upper_level_id: u64,
    /// Vacuum wavelength in Angstrom.
    pub wavelength: f64,
    pub gf: f64,
    pub loggf: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AtomicDataset {
    pub levels: Vec<FinalLevel>,
    pub lines: Vec<FinalLine>,
}

impl AtomicDataset {
    pub fn level(&self, level_id: u64) -> Option<&FinalLevel> {
        self.levels.iter().find(|level| level.level_id == level_id)
    }

    pub fn ion_levels(&self, atomic_number: u32, ion_number: u32) -> impl Iterator<Item = &FinalLevel> {
        self.levels.iter().filter(move |level| {
            level.atomic_number == atomic_number && level.ion_number == ion_number
        })
    }

    /// Fails if any line points at a level id missing from the level table.
    pub fn verify_references(&self) -> GfallResult<()> {
        let ids = self
            .levels
            .iter()
            .map(|level| level.level_id)
            .collect::<HashSet<_>>();

        for line in &self.lines {
            for level_id in [line.lower_level_id, line.upper_level_id] {
                if !ids.contains(&level_id) {
                    return Err(GfallError::referential(
                        "REFERENCE.DANGLING_LINE",
                        format!("line {} references unknown level {level_id}", line.line_id),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    ion: IonKey,
    /// `None` for ground levels that came from the ionization data.
    level_index: Option<u32>,
    g: u32,
    energy: f64,
}

/// Selects ions, fetches their ionization data and runs the culling pass.
#[instrument(skip_all, fields(levels = tables.levels.len(), lines = tables.lines.len()))]
pub fn build_dataset(
    tables: &GfallTables,
    source: &dyn IonizationEnergySource,
    config: &DatasetConfig,
) -> GfallResult<AtomicDataset> {
    let tables = tables.select(&config.selection);
    let atomic_numbers = tables
        .levels
        .levels()
        .iter()
        .map(|level| level.ion.atomic_number)
        .collect::<BTreeSet<_>>();
    let data = source.ionization_data(&atomic_numbers)?;
    cull_and_renumber(&tables, &data, config)
}

/// Drops levels at or above their ion's ionization energy, renumbers the
/// survivors, appends one fully ionized level per element and rewires the
/// lines onto global level ids.
pub fn cull_and_renumber(
    tables: &GfallTables,
    data: &IonizationData,
    config: &DatasetConfig,
) -> GfallResult<AtomicDataset> {
    let thresholds = data.thresholds()?;
    let mut candidates = merge_ground_levels(tables, data, &config.selection)?;

    let before = candidates.len();
    let mut without_threshold = BTreeSet::new();
    candidates.retain(|candidate| match thresholds.get(&candidate.ion) {
        Some(ionization_energy) => candidate.energy < *ionization_energy,
        None => {
            without_threshold.insert(candidate.ion);
            false
        }
    });
    for ion in &without_threshold {
        warn!(ion = %ion, "no ionization energy for ion; dropping its levels");
    }
    info!(
        kept = candidates.len(),
        culled = before - candidates.len(),
        "culled levels above ionization"
    );

    candidates.sort_by(|left, right| {
        left.ion
            .cmp(&right.ion)
            .then_with(|| left.energy.total_cmp(&right.energy))
            .then_with(|| left.g.cmp(&right.g))
    });

    let mut numbered = Vec::with_capacity(candidates.len());
    let mut current_ion = None;
    let mut level_number = 0_u32;
    for candidate in &candidates {
        if current_ion != Some(candidate.ion) {
            current_ion = Some(candidate.ion);
            level_number = 0;
        }
        numbered.push((
            candidate.level_index.map(|index| (candidate.ion, index)),
            FinalLevel {
                level_id: 0,
                atomic_number: candidate.ion.atomic_number,
                ion_number: candidate.ion.ion_charge,
                level_number,
                g: candidate.g,
                energy: candidate.energy,
                metastable: false,
            },
        ));
        level_number += 1;
    }

    let elements = candidates
        .iter()
        .map(|candidate| candidate.ion.atomic_number)
        .collect::<BTreeSet<_>>();
    numbered.extend(elements.into_iter().map(|atomic_number| {
        (
            None,
            FinalLevel {
                level_id: 0,
                atomic_number,
                ion_number: atomic_number,
                level_number: 0,
                g: 1,
                energy: 0.0,
                metastable: true,
            },
        )
    }));

    numbered.sort_by_key(|(_, level)| (level.atomic_number, level.ion_number, level.level_number));

    let mut level_ids = HashMap::with_capacity(numbered.len());
    let mut levels = Vec::with_capacity(numbered.len());
    for (level_id, (source_index, mut level)) in (1_u64..).zip(numbered) {
        level.level_id = level_id;
        if let Some(source_index) = source_index {
            level_ids.insert(source_index, level_id);
        }
        levels.push(level);
    }

    let lines = remap_lines(tables, &level_ids, config.air_threshold_nm);
    let dataset = AtomicDataset { levels, lines };
    dataset.verify_references()?;

    info!(
        levels = dataset.levels.len(),
        lines = dataset.lines.len(),
        "built atomic dataset"
    );
    Ok(dataset)
}

fn merge_ground_levels(
    tables: &GfallTables,
    data: &IonizationData,
    selection: &IonSelection,
) -> GfallResult<Vec<Candidate>> {
    let gfall = tables
        .levels
        .levels()
        .iter()
        .map(|level| Candidate {
            ion: level.ion,
            level_index: Some(level.level_index),
            g: level.g(),
            energy: wavenumber_to_ev(level.energy),
        })
        .collect::<Vec<_>>();
    let elements = gfall
        .iter()
        .map(|candidate| candidate.ion.atomic_number)
        .collect::<BTreeSet<_>>();

    let mut merged = Vec::with_capacity(gfall.len() + data.ground_levels.len());
    for ground in &data.ground_levels {
        let ion = ground.ion()?;
        if !elements.contains(&ion.atomic_number) || !selection.contains(ion) {
            continue;
        }
        let duplicate = gfall.iter().any(|candidate| {
            candidate.ion == ion
                && candidate.g == ground.g
                && (candidate.energy - ground.energy).abs() <= GROUND_LEVEL_MATCH_EV
        });
        if duplicate {
            debug!(ion = %ion, "ground level already present in gfall");
            continue;
        }
        merged.push(Candidate {
            ion,
            level_index: None,
            g: ground.g,
            energy: ground.energy,
        });
    }
    merged.extend(gfall);
    Ok(merged)
}

fn remap_lines(
    tables: &GfallTables,
    level_ids: &HashMap<(IonKey, u32), u64>,
    air_threshold_nm: f64,
) -> Vec<FinalLine> {
    let mut lines = Vec::with_capacity(tables.lines.len());
    let mut dropped = 0_usize;
    let mut self_transitions = 0_usize;

    for line in tables.lines.lines() {
        let lower = level_ids.get(&(line.ion, line.level_index.lower));
        let upper = level_ids.get(&(line.ion, line.level_index.upper));
        let (Some(&lower_level_id), Some(&upper_level_id)) = (lower, upper) else {
            dropped += 1;
            continue;
        };
        if lower_level_id == upper_level_id {
            self_transitions += 1;
        }

        let mut wavelength = nm_to_angstrom(line.wavelength);
        if medium_for_wavelength_nm(line.wavelength, air_threshold_nm) == Medium::Air {
            wavelength = air_to_vacuum_angstrom(wavelength);
        }

        lines.push(FinalLine {
            line_id: lines.len() as u64 + 1,
            lower_level_id,
            upper_level_id,
            wavelength,
            gf: line.gf,
            loggf: line.gf.log10(),
        });
    }

    debug!(
        kept = lines.len(),
        dropped,
        self_transitions,
        "remapped lines onto level ids"
    );
    lines
}
