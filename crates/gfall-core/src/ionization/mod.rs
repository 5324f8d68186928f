//! Ionization energies and ground levels supplied from outside the line list,
//! and the culling pass that turns gfall tables into a final atomic dataset.

pub mod culling;

pub use culling::{AtomicDataset, DatasetConfig, FinalLevel, FinalLine, build_dataset};

use crate::domain::{GfallError, GfallResult, IonKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Ionization energy of one ion. `ion_number` is the spectrum number of the
/// ionizing stage (1 for the neutral atom), so the ion charge below the
/// ionization threshold is `ion_number - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IonizationEnergy {
    pub atomic_number: u32,
    pub ion_number: u32,
    /// eV.
    pub ionization_energy: f64,
}

impl IonizationEnergy {
    pub fn ion(&self) -> GfallResult<IonKey> {
        if self.ion_number == 0 || self.ion_number > self.atomic_number {
            return Err(GfallError::format(
                "FORMAT.IONIZATION_ION",
                format!(
                    "ionization energy for Z={} has ion_number {}; expected 1..={}",
                    self.atomic_number, self.ion_number, self.atomic_number
                ),
            ));
        }
        Ok(IonKey::new(self.atomic_number, self.ion_number - 1))
    }
}

/// Ground level of one ion, keyed by the ion charge itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundLevel {
    pub atomic_number: u32,
    pub ion_charge: u32,
    pub g: u32,
    /// eV.
    pub energy: f64,
}

impl GroundLevel {
    pub fn ion(&self) -> GfallResult<IonKey> {
        if self.ion_charge >= self.atomic_number {
            return Err(GfallError::format(
                "FORMAT.IONIZATION_ION",
                format!(
                    "ground level for Z={} has ion charge {}",
                    self.atomic_number, self.ion_charge
                ),
            ));
        }
        Ok(IonKey::new(self.atomic_number, self.ion_charge))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IonizationData {
    #[serde(default)]
    pub ionization_energies: Vec<IonizationEnergy>,
    #[serde(default)]
    pub ground_levels: Vec<GroundLevel>,
}

impl IonizationData {
    pub fn from_json_str(source: &str) -> GfallResult<Self> {
        serde_json::from_str(source).map_err(|source| {
            GfallError::format(
                "FORMAT.IONIZATION_JSON",
                format!("failed to parse ionization data: {source}"),
            )
        })
    }

    /// Ionization energy per ion charge, after the `ion_number - 1` shift.
    pub fn thresholds(&self) -> GfallResult<BTreeMap<IonKey, f64>> {
        self.ionization_energies
            .iter()
            .map(|entry| entry.ion().map(|ion| (ion, entry.ionization_energy)))
            .collect()
    }

    pub fn restricted_to(&self, atomic_numbers: &BTreeSet<u32>) -> Self {
        Self {
            ionization_energies: self
                .ionization_energies
                .iter()
                .filter(|entry| atomic_numbers.contains(&entry.atomic_number))
                .copied()
                .collect(),
            ground_levels: self
                .ground_levels
                .iter()
                .filter(|level| atomic_numbers.contains(&level.atomic_number))
                .copied()
                .collect(),
        }
    }
}

/// Read-only provider of ionization data for a set of elements.
pub trait IonizationEnergySource {
    fn ionization_data(&self, atomic_numbers: &BTreeSet<u32>) -> GfallResult<IonizationData>;
}

impl IonizationEnergySource for IonizationData {
    fn ionization_data(&self, atomic_numbers: &BTreeSet<u32>) -> GfallResult<IonizationData> {
        Ok(self.restricted_to(atomic_numbers))
    }
}

/// Ionization data stored as a JSON document on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonIonizationSource {
    path: PathBuf,
}

impl JsonIonizationSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IonizationEnergySource for JsonIonizationSource {
    fn ionization_data(&self, atomic_numbers: &BTreeSet<u32>) -> GfallResult<IonizationData> {
        Ok(load_ionization_data(&self.path)?.restricted_to(atomic_numbers))
    }
}

pub fn load_ionization_data(path: impl AsRef<Path>) -> GfallResult<IonizationData> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| {
        GfallError::io_system(
            "IO.IONIZATION_READ",
            format!("failed to read ionization data '{}': {}", path.display(), source),
        )
    })?;
    IonizationData::from_json_str(&source)
}

#[cfg(test)]
mod tests {
    use super::{
        IonizationData, IonizationEnergy, IonizationEnergySource, JsonIonizationSource,
        load_ionization_data,
    };
    use crate::domain::{GfallErrorCategory, IonKey};
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    const OXYGEN_JSON: &str = r#"{
        "ionization_energies": [
            {"atomic_number": 8, "ion_number": 1, "ionization_energy": 13.618055},
            {"atomic_number": 8, "ion_number": 2, "ionization_energy": 35.12112},
            {"atomic_number": 26, "ion_number": 2, "ionization_energy": 16.1992}
        ],
        "ground_levels": [
            {"atomic_number": 8, "ion_charge": 0, "g": 5, "energy": 0.0}
        ]
    }"#;

    #[test]
    fn ion_numbers_shift_down_to_the_charge_below_ionization() {
        let data = IonizationData::from_json_str(OXYGEN_JSON).unwrap();
        let thresholds = data.thresholds().unwrap();
        assert_eq!(thresholds.get(&IonKey::new(8, 0)), Some(&13.618055));
        assert_eq!(thresholds.get(&IonKey::new(8, 1)), Some(&35.12112));
        assert_eq!(thresholds.get(&IonKey::new(8, 2)), None);
    }

    #[test]
    fn zero_ion_number_is_rejected() {
        let entry = IonizationEnergy {
            atomic_number: 8,
            ion_number: 0,
            ionization_energy: 1.0,
        };
        assert_eq!(entry.ion().unwrap_err().placeholder(), "FORMAT.IONIZATION_ION");
    }

    #[test]
    fn sources_restrict_to_requested_elements() {
        let data = IonizationData::from_json_str(OXYGEN_JSON).unwrap();
        let oxygen = data.ionization_data(&BTreeSet::from([8])).unwrap();
        assert_eq!(oxygen.ionization_energies.len(), 2);
        assert_eq!(oxygen.ground_levels.len(), 1);

        let iron = data.ionization_data(&BTreeSet::from([26])).unwrap();
        assert_eq!(iron.ionization_energies.len(), 1);
        assert!(iron.ground_levels.is_empty());
    }

    #[test]
    fn json_source_reads_from_disk() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("ionization.json");
        fs::write(&path, OXYGEN_JSON).expect("fixture should be written");

        let source = JsonIonizationSource::new(&path);
        assert_eq!(source.path(), path.as_path());
        let data = source.ionization_data(&BTreeSet::from([8, 26])).unwrap();
        assert_eq!(data.ionization_energies.len(), 3);

        let missing = load_ionization_data(temp.path().join("missing.json")).unwrap_err();
        assert_eq!(missing.category(), GfallErrorCategory::IoSystemError);

        fs::write(&path, "{ not json").expect("fixture should be written");
        let malformed = load_ionization_data(&path).unwrap_err();
        assert_eq!(malformed.placeholder(), "FORMAT.IONIZATION_JSON");
    }
}
