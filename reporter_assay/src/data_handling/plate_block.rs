// Locating one plate inside a messy plate-reader export.
// -----------------------------------------------------------------------------
// Exports put the plate somewhere below a pile of instrument metadata. The plate
// itself always looks like
//
//        1   2   3  …  12
//    A   v   v   v  …   v
//    …
//    H   v   v   v  …   v
//
// so we search for a 1..12 header run with the A..H labels one column to its
// left, then cut the 8x12 block out below it.
// -----------------------------------------------------------------------------

use std::path::Path;

use tracing::{debug, info};

use crate::config::PlateGeometry;
use crate::data_handling::grid::{load_grid, CellGrid};
use crate::errors::{AssayResult, FormatError};
use crate::models::{PlateReading, Well};

/// Position of a detected plate: `grid.cell(header_row, first_data_column)` is the `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateOrigin {
    pub header_row: usize,
    pub first_data_column: usize,
}

/// Values of one plate, indexed by row label then column (both zero-based here).
#[derive(Debug, Clone, PartialEq)]
pub struct PlateMatrix {
    pub row_labels: Vec<char>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl PlateMatrix {
    pub fn get(&self, well: Well) -> Option<f64> {
        let row = self.row_labels.iter().position(|&r| r == well.row)?;
        let col = (well.column as usize).checked_sub(1)?;
        self.values.get(row)?.get(col).copied().flatten()
    }

    /// Flatten to one reading per well, in plate order.
    pub fn to_readings(&self, time_h: u32) -> Vec<PlateReading> {
        self.row_labels
            .iter()
            .zip(&self.values)
            .flat_map(|(&row, values)| {
                values.iter().enumerate().map(move |(i, &value)| PlateReading {
                    time_h,
                    well: Well::new(row, (i + 1) as u8),
                    value,
                })
            })
            .collect()
    }
}

/// Brute-force scan for the plate header. The first match in row-major order wins.
pub fn detect_plate_block(
    grid: &CellGrid,
    geometry: &PlateGeometry,
) -> Result<PlateOrigin, FormatError> {
    let width = geometry.cols();
    let cols = grid.col_count();

    if width > 0 && cols > width {
        for r in 0..grid.row_count() {
            // The label column sits left of the header, so the run can't start at 0.
            for c in 1..=(cols - width) {
                if header_matches(grid, r, c, width) && labels_match(grid, r, c - 1, geometry) {
                    debug!("Plate block in {} at row {}, column {}", grid.name, r, c);
                    return Ok(PlateOrigin {
                        header_row: r,
                        first_data_column: c,
                    });
                }
            }
        }
    }

    Err(FormatError::BlockNotFound {
        source_name: grid.name.clone(),
    })
}

fn header_matches(grid: &CellGrid, row: usize, first_col: usize, width: usize) -> bool {
    (0..width).all(|j| grid.cell(row, first_col + j).as_integer() == Some(j as i64 + 1))
}

fn labels_match(grid: &CellGrid, header_row: usize, label_col: usize, geometry: &PlateGeometry) -> bool {
    geometry
        .row_labels
        .iter()
        .enumerate()
        .all(|(i, &letter)| grid.cell(header_row + 1 + i, label_col).label() == letter.to_string())
}

/// Cut the plate values out below a detected header. Unparsable cells become `None`.
pub fn extract_plate_matrix(
    grid: &CellGrid,
    origin: PlateOrigin,
    geometry: &PlateGeometry,
) -> PlateMatrix {
    let values = (0..geometry.rows())
        .map(|i| {
            (0..geometry.cols())
                .map(|j| {
                    grid.cell(origin.header_row + 1 + i, origin.first_data_column + j)
                        .as_number()
                })
                .collect()
        })
        .collect();

    PlateMatrix {
        row_labels: geometry.row_labels.clone(),
        values,
    }
}

/// Read a single plate-reader export and return its plate.
pub fn read_plate_export(path: &Path, geometry: &PlateGeometry) -> AssayResult<PlateMatrix> {
    let grid = load_grid(path, None)?;
    let origin = detect_plate_block(&grid, geometry)?;
    let matrix = extract_plate_matrix(&grid, origin, geometry);

    let missing = matrix.values.iter().flatten().filter(|v| v.is_none()).count();
    info!(
        "Extracted plate from {} ({} wells without a numeric value)",
        path.display(),
        missing
    );
    Ok(matrix)
}
