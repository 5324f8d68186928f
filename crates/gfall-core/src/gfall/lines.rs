use super::levels::LevelTable;
use super::normalize::{NormalizedLevel, NormalizedRow};
use crate::common::units::medium_for_wavelength_nm;
use crate::domain::{GfallError, GfallResult, IdentityKey, IonKey, LevelPair, Medium};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A transition between two levels of one ion, addressed by level indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub ion: IonKey,
    pub level_index: LevelPair<u32>,
    /// Tabulated wavelength in nm (air above the air threshold).
    pub wavelength: f64,
    pub gf: f64,
}

impl Line {
    pub fn medium(&self, air_threshold_nm: f64) -> Medium {
        medium_for_wavelength_nm(self.wavelength, air_threshold_nm)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineTable {
    lines: Vec<Line>,
}

impl LineTable {
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn ion_lines(&self, ion: IonKey) -> impl Iterator<Item = &Line> {
        self.lines.iter().filter(move |line| line.ion == ion)
    }

    pub fn retain_ions(&self, mut keep: impl FnMut(IonKey) -> bool) -> Self {
        Self {
            lines: self
                .lines
                .iter()
                .filter(|line| keep(line.ion))
                .cloned()
                .collect(),
        }
    }
}

/// Joins every row to the indices of its lower and upper level.
pub fn extract_lines(
    rows: &[NormalizedRow],
    levels: &LevelTable,
    identity_key: &IdentityKey,
) -> GfallResult<LineTable> {
    let index = levels.index_by_key(identity_key)?;

    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        let lookup = |side: &str, level: &NormalizedLevel| {
            index
                .get(&identity_key.key_for(row.ion, level))
                .copied()
                .ok_or_else(|| {
                    GfallError::referential(
                        "REFERENCE.LEVEL_MISSING",
                        format!(
                            "line {}: {side} level of ion {} has no match under identity key [{}]",
                            row.line_number, row.ion, identity_key
                        ),
                    )
                })
        };

        let level_index = LevelPair::new(
            lookup("lower", &row.levels.lower)?,
            lookup("upper", &row.levels.upper)?,
        );
        lines.push(Line {
            ion: row.ion,
            level_index,
            wavelength: row.wavelength,
            gf: 10_f64.powf(row.loggf),
        });
    }

    info!(lines = lines.len(), "extracted lines");
    Ok(LineTable { lines })
}
