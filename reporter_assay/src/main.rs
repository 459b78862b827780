use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use reporter_assay::analysis::aggregation::run_analysis;
use reporter_assay::analysis::timecourse::{make_timecourse_plots, DisplayMode};
use reporter_assay::config::AssayConfig;
use reporter_assay::data_handling::grid::load_grid;
use reporter_assay::data_handling::mapping::{read_mapping, write_mapping_template};
use reporter_assay::data_handling::stacked_blocks::{combine_raw, scan_stacked_blocks};
use reporter_assay::helper_functions::{dataframe_to_csv, read_csv};

#[derive(Parser)]
#[command(
    name = "reporter_assay",
    version,
    about = "Reporter assay analyzer - luminescence plate time-course processing"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON file overriding the control sample, conditions or plate geometry.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a mapping template CSV (A1..H12).
    MakeTemplate {
        #[arg(long)]
        out: PathBuf,
        /// Pre-fill an example layout instead of empty rows.
        #[arg(long)]
        example: bool,
    },

    /// Write the default configuration as JSON.
    MakeConfig {
        #[arg(long)]
        out: PathBuf,
    },

    /// Combine per-timepoint plate exports into one stacked sheet.
    CombineRaw {
        /// Folder with one plate export per timepoint (e.g. "3h post transfection.xlsx").
        #[arg(long)]
        data_dir: PathBuf,
        /// Output CSV (e.g. output/combined_raw.csv).
        #[arg(long)]
        out: PathBuf,
    },

    /// Blank-subtract and fold-change a stacked sheet using a well mapping.
    Analyze {
        /// Stacked plates, as written by combine-raw (CSV or workbook).
        #[arg(long)]
        combined: PathBuf,
        /// Worksheet to read when `combined` is a workbook.
        #[arg(long, default_value = "combined_raw")]
        sheet: String,
        #[arg(long)]
        mapping: PathBuf,
        /// Output CSV for the wide report.
        #[arg(long)]
        out: PathBuf,
        /// Also write the tidy (time_h, well, value, ...) table.
        #[arg(long)]
        tidy_out: Option<PathBuf>,
        /// Also write the per-condition long table.
        #[arg(long)]
        long_out: Option<PathBuf>,
    },

    /// Draw time-course charts from a final analysis CSV.
    Plot {
        #[arg(long = "final")]
        final_report: PathBuf,
        #[arg(long)]
        out_dir: PathBuf,
        #[arg(long, value_enum, default_value = "fold")]
        mode: DisplayMode,
        /// Sample display order, e.g. siNT,siFAM,siMMS.
        #[arg(long, value_delimiter = ',')]
        order: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = match &cli.config {
        Some(path) => AssayConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AssayConfig::default(),
    };

    match cli.command {
        Command::MakeTemplate { out, example } => {
            let n = write_mapping_template(&out, &config, example)?;
            info!("Wrote mapping template with {} wells: {}", n, out.display());
        }
        Command::MakeConfig { out } => {
            config.write(&out)?;
            info!("Wrote configuration: {}", out.display());
        }
        Command::CombineRaw { data_dir, out } => {
            let n = combine_raw(&data_dir, &out, &config.geometry)
                .with_context(|| format!("combining plates from {}", data_dir.display()))?;
            info!("Wrote combined raw file ({} stacked plates): {}", n, out.display());
        }
        Command::Analyze {
            combined,
            sheet,
            mapping,
            out,
            tidy_out,
            long_out,
        } => analyze(&combined, &sheet, &mapping, &out, tidy_out, long_out, &config)?,
        Command::Plot {
            final_report,
            out_dir,
            mode,
            order,
        } => {
            let report = read_csv(&final_report)
                .with_context(|| format!("reading {}", final_report.display()))?;
            let written = make_timecourse_plots(&report, &out_dir, mode, &order, &config)?;
            info!("Plots saved to {} ({} files)", out_dir.display(), written.len());
        }
    }

    Ok(())
}

fn analyze(
    combined: &Path,
    sheet: &str,
    mapping: &Path,
    out: &Path,
    tidy_out: Option<PathBuf>,
    long_out: Option<PathBuf>,
    config: &AssayConfig,
) -> Result<()> {
    // `sheet` is ignored for CSV input.
    let grid = load_grid(combined, Some(sheet))?;
    let readings = scan_stacked_blocks(&grid, &config.geometry)
        .with_context(|| format!("parsing {}", combined.display()))?;
    let mapping = read_mapping(mapping)?;

    let mut analysis = run_analysis(&readings, &mapping, config)?;

    dataframe_to_csv(&mut analysis.wide, out)?;
    if let Some(path) = tidy_out {
        dataframe_to_csv(&mut analysis.tidy, &path)?;
    }
    if let Some(path) = long_out {
        dataframe_to_csv(&mut analysis.long, &path)?;
    }
    info!("Wrote final analysis: {}", out.display());
    Ok(())
}
