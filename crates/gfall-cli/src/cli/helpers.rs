use super::CliError;
use anyhow::Context;
use gfall_core::domain::{IdentityKey, IonKey};
use gfall_core::gfall::{GfallReader, GfallTables, ReaderConfig};
use gfall_core::selection::IonSelection;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Installs the stderr subscriber once; later calls keep the first one.
pub(super) fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = if verbose {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub(super) fn build_reader(identity: Option<&str>) -> Result<GfallReader, CliError> {
    let mut config = ReaderConfig::default();
    if let Some(identity) = identity {
        config.identity_key =
            Some(IdentityKey::parse_list(identity).map_err(CliError::Compute)?);
    }
    GfallReader::new(config).map_err(CliError::Compute)
}

pub(super) fn parse_selection(ions: Option<&str>) -> Result<IonSelection, CliError> {
    ions.map_or_else(
        || Ok(IonSelection::all()),
        |ions| ions.parse::<IonSelection>().map_err(CliError::Compute),
    )
}

pub(super) fn read_tables(
    gfall: &Path,
    identity: Option<&str>,
    selection: &IonSelection,
) -> Result<GfallTables, CliError> {
    let reader = build_reader(identity)?;
    let tables = reader.read_path(gfall).map_err(CliError::Compute)?;
    Ok(tables.select(selection))
}

pub(super) fn ensure_parent_dir(path: &Path) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// One line per ion with its level and line counts, then a total line.
pub(super) fn render_ion_summary(tables: &GfallTables) -> String {
    let mut counts = BTreeMap::<IonKey, (usize, usize)>::new();
    for level in tables.levels.levels() {
        counts.entry(level.ion).or_default().0 += 1;
    }
    for line in tables.lines.lines() {
        counts.entry(line.ion).or_default().1 += 1;
    }

    let mut summary = String::new();
    for (ion, (levels, lines)) in &counts {
        let ion = ion.to_string();
        let _ = writeln!(summary, "{ion:<7} levels={levels:<6} lines={lines}");
    }
    let _ = write!(
        summary,
        "total   ions={} levels={} lines={}",
        counts.len(),
        tables.levels.len(),
        tables.lines.len()
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::{ensure_parent_dir, parse_selection, render_ion_summary};
    use gfall_core::domain::IonKey;
    use gfall_core::gfall::GfallTables;
    use tempfile::TempDir;

    #[test]
    fn selection_defaults_to_every_ion() {
        assert!(parse_selection(None).unwrap().is_all());
        let selection = parse_selection(Some("26:1")).unwrap();
        assert!(selection.contains(IonKey::new(26, 1)));
        assert!(parse_selection(Some("26")).is_err());
    }

    #[test]
    fn empty_tables_render_a_zero_total() {
        assert_eq!(
            render_ion_summary(&GfallTables::default()),
            "total   ions=0 levels=0 lines=0"
        );
    }

    #[test]
    fn parent_directories_are_created() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("nested/out/dataset.json");
        ensure_parent_dir(&path).unwrap();
        assert!(temp.path().join("nested/out").is_dir());
        ensure_parent_dir(std::path::Path::new("dataset.json")).unwrap();
    }
}
