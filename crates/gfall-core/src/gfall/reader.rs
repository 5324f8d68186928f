use super::levels::{LevelTable, extract_levels};
use super::lines::{LineTable, extract_lines};
use super::normalize::{DEFAULT_IGNORED_LABELS, NormalizedRow, normalize_rows};
use super::record::{RawGfallRow, decode_gfall_source, gfall_layout};
use crate::domain::{GfallError, GfallResult, IdentityKey, IonKey};
use crate::formats::fortran::FixedWidthLayout;
use crate::selection::IonSelection;
use std::fs;
use std::path::Path;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ReaderConfig {
    /// Level attributes that decide uniqueness within an ion; `None` falls back
    /// to `[energy, j]`.
    pub identity_key: Option<IdentityKey>,
    pub ignored_labels: Vec<String>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            identity_key: None,
            ignored_labels: DEFAULT_IGNORED_LABELS
                .iter()
                .map(|label| label.to_string())
                .collect(),
        }
    }
}

impl ReaderConfig {
    pub fn with_identity_key(mut self, identity_key: IdentityKey) -> Self {
        self.identity_key = Some(identity_key);
        self
    }
}

/// The three derived tables of one gfall source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GfallTables {
    pub rows: Vec<NormalizedRow>,
    pub levels: LevelTable,
    pub lines: LineTable,
}

impl GfallTables {
    pub fn ions(&self) -> Vec<IonKey> {
        self.levels.ions()
    }

    /// Keeps only the ions of `selection`; an ion absent from the source
    /// simply yields nothing.
    pub fn select(&self, selection: &IonSelection) -> Self {
        if selection.is_all() {
            return self.clone();
        }

        Self {
            rows: self
                .rows
                .iter()
                .filter(|row| selection.contains(row.ion))
                .cloned()
                .collect(),
            levels: self.levels.retain_ions(|ion| selection.contains(ion)),
            lines: self.lines.retain_ions(|ion| selection.contains(ion)),
        }
    }
}

/// Staged gfall pipeline: decode, normalize, extract levels, extract lines.
/// Every stage is a plain function of its inputs; callers keep whatever
/// intermediate tables they need.
#[derive(Debug, Clone)]
pub struct GfallReader {
    layout: FixedWidthLayout,
    identity_key: IdentityKey,
    ignored_labels: Vec<String>,
}

impl GfallReader {
    pub fn new(config: ReaderConfig) -> GfallResult<Self> {
        let identity_key = match config.identity_key {
            Some(identity_key) => identity_key,
            None => {
                let identity_key = IdentityKey::default();
                warn!(
                    identity_key = %identity_key,
                    "no identity key configured; using the default"
                );
                identity_key
            }
        };

        Ok(Self {
            layout: gfall_layout()?,
            identity_key,
            ignored_labels: config.ignored_labels,
        })
    }

    pub fn identity_key(&self) -> &IdentityKey {
        &self.identity_key
    }

    pub fn layout(&self) -> &FixedWidthLayout {
        &self.layout
    }

    pub fn decode(&self, source: &str) -> GfallResult<Vec<RawGfallRow>> {
        decode_gfall_source(&self.layout, source)
    }

    pub fn normalize(&self, rows: Vec<RawGfallRow>) -> GfallResult<Vec<NormalizedRow>> {
        normalize_rows(rows, &self.ignored_labels)
    }

    pub fn extract_levels(&self, rows: &[NormalizedRow]) -> LevelTable {
        extract_levels(rows, &self.identity_key)
    }

    pub fn extract_lines(
        &self,
        rows: &[NormalizedRow],
        levels: &LevelTable,
    ) -> GfallResult<LineTable> {
        extract_lines(rows, levels, &self.identity_key)
    }

    #[instrument(skip_all, fields(bytes = source.len()))]
    pub fn read_source(&self, source: &str) -> GfallResult<GfallTables> {
        let rows = self.normalize(self.decode(source)?)?;
        let levels = self.extract_levels(&rows);
        let lines = self.extract_lines(&rows, &levels)?;
        info!(
            ions = levels.ions().len(),
            levels = levels.len(),
            lines = lines.len(),
            "read gfall source"
        );
        Ok(GfallTables {
            rows,
            levels,
            lines,
        })
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn read_path(&self, path: &Path) -> GfallResult<GfallTables> {
        let source = fs::read_to_string(path).map_err(|source| {
            GfallError::io_system(
                "IO.GFALL_READ",
                format!("failed to read gfall file '{}': {}", path.display(), source),
            )
        })?;
        self.read_source(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::{GfallReader, ReaderConfig};
    use crate::domain::{GfallErrorCategory, IdentityKey, IonKey};
    use crate::selection::IonSelection;
    use std::fs;
    use tempfile::TempDir;

    const SOURCE: &str = concat!(
        "   103.3900 -1.234  7.05       0.000  0.0 1s2 1S      967178.000  1.0 1s2p 3P     9.00 -5.00 -7.00K88  0 0  0 0.000  0 0.000    0    0           1000 1000     0\n",
        "\n",
        "   102.9000 -0.456  7.05-1002500.000  2.0 1s3d 3D    -967178.000  1.0 1s2p 3P     9.00 -5.00 -7.00K88  0 0  0 0.000  0 0.000    0    0           1000 1000     0\n",
        "   630.0304 -9.715  8.00     158.265  1.0 2p4 3P       15867.862  2.0 2p4 1D      0.00  0.00  0.00NIST 0 0  0 0.000  0 0.000    0    0           1500 1000     0\n",
    );

    #[test]
    fn reader_builds_levels_and_lines() {
        let reader = GfallReader::new(ReaderConfig::default()).unwrap();
        let tables = reader.read_source(SOURCE).unwrap();

        assert_eq!(tables.rows.len(), 3);
        assert_eq!(tables.ions(), vec![IonKey::new(7, 5), IonKey::new(8, 0)]);
        assert_eq!(tables.levels.ion_levels(IonKey::new(7, 5)).len(), 3);
        assert_eq!(tables.lines.len(), 3);

        let n_vi = tables.levels.ion_levels(IonKey::new(7, 5));
        assert_eq!(n_vi[1].energy, 967178.0);
        assert_eq!(n_vi[2].method.as_str(), "theor");

        let second = &tables.lines.lines()[1];
        assert_eq!(second.level_index.lower, 1);
        assert_eq!(second.level_index.upper, 2);
    }

    #[test]
    fn missing_identity_key_falls_back_to_energy_and_j() {
        let reader = GfallReader::new(ReaderConfig::default()).unwrap();
        assert_eq!(reader.identity_key(), &IdentityKey::default());

        let key = IdentityKey::parse_list("energy,j,label").unwrap();
        let reader = GfallReader::new(ReaderConfig::default().with_identity_key(key.clone())).unwrap();
        assert_eq!(reader.identity_key(), &key);
    }

    #[test]
    fn selection_without_matches_yields_empty_tables() {
        let reader = GfallReader::new(ReaderConfig::default()).unwrap();
        let tables = reader.read_source(SOURCE).unwrap();

        let oxygen = tables.select(&"8:0".parse::<IonSelection>().unwrap());
        assert_eq!(oxygen.levels.len(), 2);
        assert_eq!(oxygen.lines.len(), 1);

        let absent = tables.select(&"26:1".parse::<IonSelection>().unwrap());
        assert!(absent.levels.is_empty());
        assert!(absent.lines.is_empty());
        assert!(absent.rows.is_empty());
    }

    #[test]
    fn unreadable_path_is_an_io_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let reader = GfallReader::new(ReaderConfig::default()).unwrap();
        let error = reader.read_path(&temp.path().join("gfall.dat")).unwrap_err();
        assert_eq!(error.category(), GfallErrorCategory::IoSystemError);
        assert_eq!(error.placeholder(), "IO.GFALL_READ");

        let path = temp.path().join("gfall.dat");
        fs::write(&path, SOURCE).expect("fixture should be written");
        assert_eq!(reader.read_path(&path).unwrap().lines.len(), 3);
    }
}
