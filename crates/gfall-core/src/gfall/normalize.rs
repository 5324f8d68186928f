use super::record::{LineExtras, RawGfallRow, RawLevelSide};
use crate::common::constants::MAX_ATOMIC_NUMBER;
use crate::domain::{GfallError, GfallResult, IonKey, LevelAttributes, LevelPair};
use tracing::{debug, info};

/// Labels that mark bookkeeping records rather than physical levels.
pub const DEFAULT_IGNORED_LABELS: [&str; 4] =
    ["AVERAGE", "ENERGIES", "AVERAGE ENERGIES", "CONTINUUM"];

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLevel {
    /// Wavenumber magnitude in cm^-1.
    pub energy: f64,
    pub j: f64,
    pub label: String,
    pub theoretical: bool,
    pub nlte_level_no: Option<i64>,
    pub hyper_shift: Option<i64>,
    pub hyperfine_f: Option<i64>,
    pub hyperfine_note: Option<String>,
    pub lande_g: Option<i64>,
}

impl LevelAttributes for NormalizedLevel {
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

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub line_number: usize,
    pub ion: IonKey,
    /// Tabulated wavelength in nm.
    pub wavelength: f64,
    pub loggf: f64,
    pub levels: LevelPair<NormalizedLevel>,
    pub extras: LineExtras,
}

/// Reshapes raw rows into lower/upper form and drops bookkeeping records.
pub fn normalize_rows(
    rows: Vec<RawGfallRow>,
    ignored_labels: &[String],
) -> GfallResult<Vec<NormalizedRow>> {
    let total = rows.len();
    let mut normalized = Vec::with_capacity(total);

    for row in rows {
        let ion = split_element_code(row.line_number, row.element_code)?;
        let levels = order_lower_upper(row.first, row.second).map(normalize_level);

        if is_ignored(&levels.lower.label, ignored_labels)
            || is_ignored(&levels.upper.label, ignored_labels)
        {
            debug!(line = row.line_number, "skipping bookkeeping record");
            continue;
        }

        normalized.push(NormalizedRow {
            line_number: row.line_number,
            ion,
            wavelength: row.wavelength,
            loggf: row.loggf,
            levels,
            extras: row.extras,
        });
    }

    info!(rows = total, kept = normalized.len(), "normalized gfall records");
    Ok(normalized)
}

/// Decides once per row which side is lower, by comparing energy magnitudes.
/// Ties resolve to the second side being lower.
pub fn order_lower_upper(first: RawLevelSide, second: RawLevelSide) -> LevelPair<RawLevelSide> {
    if first.energy.abs() < second.energy.abs() {
        LevelPair::new(first, second)
    } else {
        LevelPair::new(second, first)
    }
}

fn normalize_level(side: RawLevelSide) -> NormalizedLevel {
    NormalizedLevel {
        energy: side.energy.abs(),
        j: side.j,
        label: clean_label(&side.label),
        theoretical: side.energy < 0.0,
        nlte_level_no: side.nlte_level_no,
        hyper_shift: side.hyper_shift,
        hyperfine_f: side.hyperfine_f,
        hyperfine_note: side.hyperfine_note,
        lande_g: side.lande_g,
    }
}

pub fn clean_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_ignored(label: &str, ignored_labels: &[String]) -> bool {
    ignored_labels.iter().any(|ignored| ignored == label)
}

/// `26.01` is Fe II: the integer part is the atomic number and the two
/// decimal digits are the ion charge.
pub fn split_element_code(line_number: usize, element_code: f64) -> GfallResult<IonKey> {
    let invalid = |detail: &str| {
        GfallError::format(
            "FORMAT.ELEMENT_CODE",
            format!("line {line_number}: element code {element_code} {detail}"),
        )
    };

    if !element_code.is_finite() || element_code < 1.0 {
        return Err(invalid("is not a positive element code"));
    }

    let atomic_number = element_code.floor();
    let ion_charge = ((element_code - atomic_number) * 100.0).round();
    if atomic_number > f64::from(MAX_ATOMIC_NUMBER) {
        return Err(invalid("exceeds the largest known atomic number"));
    }
    if ion_charge >= atomic_number {
        return Err(invalid("encodes an ion charge at or above the atomic number"));
    }

    Ok(IonKey::new(atomic_number as u32, ion_charge as u32))
}
