use super::CliError;
use super::helpers::*;
use gfall_core::common::constants::GFALL_AIR_THRESHOLD_NM;
use gfall_core::ionization::{DatasetConfig, JsonIonizationSource, build_dataset};
use gfall_core::persistence::{DEFAULT_DATA_SOURCE, GfallIngester, InMemoryStore};
use gfall_core::serialization::{write_json_artifact, write_text_artifact};
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct ReadArgs {
    /// gfall line list path
    #[arg(value_name = "GFALL")]
    gfall: PathBuf,

    /// Comma-separated level attributes that identify a level (energy, j, label)
    #[arg(long, value_name = "ATTRS")]
    identity: Option<String>,

    /// Comma-separated ions to keep, as atomic_number:ion_charge
    #[arg(long, value_name = "IONS")]
    ions: Option<String>,
}

#[derive(clap::Args)]
pub(super) struct InspectArgs {
    #[command(flatten)]
    read: ReadArgs,

    /// Also write the summary to this text file
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct BuildArgs {
    #[command(flatten)]
    read: ReadArgs,

    /// Ionization energies and ground levels (JSON)
    #[arg(long)]
    ionization: PathBuf,

    /// Wavelengths above this value (nm) are converted from air to vacuum
    #[arg(long, default_value_t = GFALL_AIR_THRESHOLD_NM)]
    air_threshold: f64,

    /// JSON dataset output path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct IngestArgs {
    #[command(flatten)]
    read: ReadArgs,

    /// JSON store snapshot, created when missing
    #[arg(long)]
    store: PathBuf,

    /// Data source name the rows are stored under
    #[arg(long, default_value = DEFAULT_DATA_SOURCE)]
    data_source: String,

    /// Only ingest lines against levels already in the store
    #[arg(long)]
    skip_levels: bool,

    /// Only ingest levels
    #[arg(long, conflicts_with = "skip_levels")]
    skip_lines: bool,
}

pub(super) fn run_inspect_command(args: InspectArgs) -> Result<i32, CliError> {
    let selection = parse_selection(args.read.ions.as_deref())?;
    let tables = read_tables(&args.read.gfall, args.read.identity.as_deref(), &selection)?;
    let summary = render_ion_summary(&tables);
    println!("{summary}");

    if let Some(path) = args.summary {
        ensure_parent_dir(&path)?;
        write_text_artifact(&path, &summary).map_err(CliError::Compute)?;
        println!("Summary: {}", path.display());
    }
    Ok(0)
}

pub(super) fn run_build_command(args: BuildArgs) -> Result<i32, CliError> {
    let selection = parse_selection(args.read.ions.as_deref())?;
    let tables = read_tables(&args.read.gfall, args.read.identity.as_deref(), &selection)?;

    let config = DatasetConfig {
        air_threshold_nm: args.air_threshold,
        selection,
    };
    let source = JsonIonizationSource::new(args.ionization);
    let dataset = build_dataset(&tables, &source, &config).map_err(CliError::Compute)?;

    println!("Levels: {}", dataset.levels.len());
    println!("Lines: {}", dataset.lines.len());

    if let Some(output) = args.output {
        ensure_parent_dir(&output)?;
        write_json_artifact(&output, &dataset).map_err(CliError::Compute)?;
        println!("JSON dataset: {}", output.display());
    }
    Ok(0)
}

pub(super) fn run_ingest_command(args: IngestArgs) -> Result<i32, CliError> {
    let selection = parse_selection(args.read.ions.as_deref())?;
    let tables = read_tables(&args.read.gfall, args.read.identity.as_deref(), &selection)?;

    let mut store = InMemoryStore::load_or_default(&args.store).map_err(CliError::Compute)?;
    let ingester = GfallIngester::new(args.data_source).with_selection(selection);

    if !args.skip_levels {
        let summary = ingester
            .ingest_levels(&mut store, &tables.levels)
            .map_err(CliError::Compute)?;
        println!("Ingested {} levels for {} ions", summary.levels, summary.ions);
    }
    if !args.skip_lines {
        let summary = ingester
            .ingest_lines(&mut store, &tables.lines)
            .map_err(CliError::Compute)?;
        println!("Ingested {} lines for {} ions", summary.lines, summary.ions);
    }

    ensure_parent_dir(&args.store)?;
    store.save(&args.store).map_err(CliError::Compute)?;
    println!(
        "Store '{}': {} levels, {} lines",
        args.store.display(),
        store.levels().len(),
        store.lines().len()
    );
    Ok(0)
}
