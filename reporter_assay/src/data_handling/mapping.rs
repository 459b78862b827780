use std::fs;
use std::path::Path;

use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::config::{AssayConfig, PlateGeometry};
use crate::errors::AssayResult;
use crate::helper_functions::read_csv_as_text;
use crate::models::Well;

/// Columns every mapping file must have.
pub const MAPPING_COLUMNS: [&str; 4] = ["well", "sample", "condition", "well_type"];

/// Samples used by the example layout, one per row A-D.
const EXAMPLE_SAMPLES: [&str; 4] = ["siNT", "siFAM", "siMMS", "siCIAO"];
const EXAMPLE_BLANK_COLUMN: u8 = 6;

#[derive(Debug, Serialize)]
struct TemplateRow {
    well: String,
    sample: String,
    condition: String,
    well_type: String,
}

impl TemplateRow {
    fn new(well: Well, sample: &str, condition: &str, well_type: &str) -> Self {
        Self {
            well: well.to_string(),
            sample: sample.to_string(),
            condition: condition.to_string(),
            well_type: well_type.to_string(),
        }
    }
}

/// Load a mapping CSV. Every column is read as text so that conditions like
/// `0` or `2` don't turn into integers; empty fields come back as nulls.
pub fn read_mapping(path: &Path) -> AssayResult<DataFrame> {
    info!("Reading well mapping from {}", path.display());
    let df = read_csv_as_text(path)?;
    info!("Mapping has {} rows", df.height());
    Ok(df)
}

/// Write a mapping template with one row per well. With `example` set, the
/// rows are pre-filled with a small demo layout instead of left empty.
pub fn write_mapping_template(
    out_path: &Path,
    config: &AssayConfig,
    example: bool,
) -> AssayResult<usize> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let rows: Vec<TemplateRow> = config
        .geometry
        .wells()
        .map(|well| {
            if example {
                example_row(well, &config.geometry, &config.conditions)
            } else {
                TemplateRow::new(well, "", "", "")
            }
        })
        .collect();

    let mut writer = csv::Writer::from_path(out_path)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(rows.len())
}

// Blanks fill one column for every row; the first conditions take the five
// columns either side of it, one sample per row.
fn example_row(well: Well, geometry: &PlateGeometry, conditions: &[String]) -> TemplateRow {
    if well.column == EXAMPLE_BLANK_COLUMN {
        return TemplateRow::new(well, "blank", "all", "blank");
    }

    let row_idx = geometry.row_labels.iter().position(|&r| r == well.row);
    let sample = row_idx.and_then(|i| EXAMPLE_SAMPLES.get(i));
    let condition = match well.column {
        1..=5 => conditions.first(),
        7..=11 => conditions.get(1),
        _ => None,
    };

    match (sample, condition) {
        (Some(sample), Some(condition)) => TemplateRow::new(well, sample, condition, "sample"),
        _ => TemplateRow::new(well, "unused", "unused", "unused"),
    }
}
