// Stacked "combined raw" sheets: one titled plate per timepoint, one below the other.
// -----------------------------------------------------------------------------
// Each block spans `block_stride` rows (11 for a 96-well plate):
//
//   row 0   | "<n>h post transfection"
//   row 1   |          1    2   …   12
//   row 2-9 | A..H     v    v   …    v    Lum
//   row 10  | (spacer)
//
// The scanner trusts these fixed offsets instead of searching for the plate,
// which lets it skip stray rows between blocks without re-detecting anything.
// -----------------------------------------------------------------------------

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::PlateGeometry;
use crate::data_handling::grid::{is_supported, CellGrid};
use crate::data_handling::plate_block::{read_plate_export, PlateMatrix};
use crate::errors::{AssayError, AssayResult, FormatError};
use crate::models::{PlateReading, Well};

static TIMEPOINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)h").expect("static regex"));

/// Label written into the column right of each plate row.
const READOUT_LABEL: &str = "Lum";

/// Hours encoded in a title or file name, e.g. `"10h POST TRANSFECTION"` → 10.
pub fn parse_timepoint_hours(text: &str) -> Result<u32, FormatError> {
    TIMEPOINT_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
        .ok_or_else(|| FormatError::Timepoint {
            text: text.to_string(),
        })
}

/// Walk every block of a stacked sheet and return one reading per (timepoint, well),
/// sorted by timepoint then well.
pub fn scan_stacked_blocks(
    grid: &CellGrid,
    geometry: &PlateGeometry,
) -> AssayResult<Vec<PlateReading>> {
    geometry.validate()?;
    let n = grid.row_count();
    let mut readings: BTreeMap<(u32, Well), Option<f64>> = BTreeMap::new();
    let mut blocks = 0usize;
    let mut r = 0usize;

    while r < n {
        let title = grid.cell(r, 0);
        if title.is_blank() || !header_is_exact(grid, r + 1, geometry) {
            r += 1;
            continue;
        }

        let time_h = parse_timepoint_hours(&title.text())?;
        blocks += 1;
        debug!("Block at row {} is {}h", r, time_h);

        for (i, &letter) in geometry.row_labels.iter().enumerate() {
            let rr = r + 2 + i;
            if rr >= n {
                break;
            }
            let label = grid.cell(rr, 0).label();
            if label != letter.to_string() {
                warn!(
                    "Row {} of the {}h block is labelled {:?}, expected {:?}; skipping it",
                    rr, time_h, label, letter
                );
                continue;
            }

            for col in 1..=geometry.columns {
                let well = Well::new(letter, col);
                let value = grid.cell(rr, col as usize).as_number();
                if readings.contains_key(&(time_h, well)) {
                    warn!("Duplicate reading for {} at {}h; keeping the first", well, time_h);
                    continue;
                }
                readings.insert((time_h, well), value);
            }
        }

        r += geometry.block_stride;
    }

    if readings.is_empty() {
        return Err(AssayError::EmptyResult {
            source_name: grid.name.clone(),
        });
    }

    info!(
        "Parsed {} readings from {} blocks in {}",
        readings.len(),
        blocks,
        grid.name
    );
    Ok(readings
        .into_iter()
        .map(|((time_h, well), value)| PlateReading { time_h, well, value })
        .collect())
}

/// The row below a title must hold exactly 1..=columns in columns 1..=columns.
fn header_is_exact(grid: &CellGrid, row: usize, geometry: &PlateGeometry) -> bool {
    row < grid.row_count()
        && (1..=geometry.cols()).all(|c| grid.cell(row, c).as_integer() == Some(c as i64))
}

/// Plate exports in `data_dir` with their timepoints, sorted by timepoint.
/// Office lock files (`~$…`) are ignored.
pub fn collect_plate_files(data_dir: &Path) -> AssayResult<Vec<(u32, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(data_dir)? {
        let path = entry?.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        if !path.is_file() || name.starts_with("~$") || !is_supported(&path) {
            continue;
        }
        files.push((parse_timepoint_hours(&name)?, path));
    }
    files.sort();
    Ok(files)
}

/// Write plates as one stacked sheet (CSV) in the layout `scan_stacked_blocks` reads.
pub fn write_stacked_plates(
    plates: &[(u32, PlateMatrix)],
    geometry: &PlateGeometry,
    out_path: &Path,
) -> AssayResult<()> {
    geometry.validate()?;
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let width = geometry.cols() + 2;
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(out_path)?;

    for (time_h, plate) in plates {
        let mut title = vec![String::new(); width];
        title[0] = format!("{time_h}h post transfection");
        writer.write_record(&title)?;

        let mut header = vec![String::new()];
        header.extend((1..=geometry.columns).map(|c| c.to_string()));
        header.push(String::new());
        writer.write_record(&header)?;

        for (letter, values) in plate.row_labels.iter().zip(&plate.values) {
            let mut row = vec![letter.to_string()];
            row.extend(
                values
                    .iter()
                    .map(|v| v.map(|x| x.to_string()).unwrap_or_default()),
            );
            row.push(READOUT_LABEL.to_string());
            writer.write_record(&row)?;
        }

        // Pad to the stride with spacer rows.
        for _ in (2 + plate.row_labels.len())..geometry.block_stride {
            writer.write_record(vec![String::new(); width])?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Read every plate export in `data_dir` and write them stacked into `out_path`.
pub fn combine_raw(data_dir: &Path, out_path: &Path, geometry: &PlateGeometry) -> AssayResult<usize> {
    let files = collect_plate_files(data_dir)?;
    if files.is_empty() {
        return Err(AssayError::EmptyResult {
            source_name: data_dir.display().to_string(),
        });
    }

    let mut plates = Vec::with_capacity(files.len());
    for (time_h, path) in &files {
        plates.push((*time_h, read_plate_export(path, geometry)?));
    }
    write_stacked_plates(&plates, geometry, out_path)?;
    info!("Stacked {} plates into {}", plates.len(), out_path.display());
    Ok(plates.len())
}
