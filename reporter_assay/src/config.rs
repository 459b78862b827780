use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{AssayError, AssayResult};
use crate::models::Well;

/// Shape of one plate and of the stacked sheet it is embedded in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateGeometry {
    /// Row labels top to bottom.
    pub row_labels: Vec<char>,
    /// Number of columns, labelled `1..=columns`.
    pub columns: u8,
    /// Rows from one stacked block's title row to the next.
    pub block_stride: usize,
}

impl Default for PlateGeometry {
    fn default() -> Self {
        Self {
            row_labels: "ABCDEFGH".chars().collect(),
            columns: 12,
            block_stride: 11,
        }
    }
}

impl PlateGeometry {
    pub fn rows(&self) -> usize {
        self.row_labels.len()
    }

    pub fn cols(&self) -> usize {
        self.columns as usize
    }

    /// Reject shapes the stacked-block scanner cannot walk: at least one row
    /// and column, upper-case ASCII row labels, and a stride that fits the
    /// title, header and data rows.
    pub fn validate(&self) -> AssayResult<()> {
        let invalid = |reason: String| Err(AssayError::InvalidGeometry { reason });

        if self.row_labels.is_empty() {
            return invalid("no row labels".to_string());
        }
        if let Some(bad) = self.row_labels.iter().find(|c| !c.is_ascii_uppercase()) {
            return invalid(format!("row label {bad:?} is not an upper-case letter A-Z"));
        }
        let mut seen = self.row_labels.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != self.row_labels.len() {
            return invalid("row labels repeat".to_string());
        }
        if self.columns == 0 {
            return invalid("columns must be at least 1".to_string());
        }
        if self.block_stride < self.rows() + 2 {
            return invalid(format!(
                "block_stride {} is shorter than a block ({} rows)",
                self.block_stride,
                self.rows() + 2
            ));
        }
        Ok(())
    }

    /// Every well in row-major order.
    pub fn wells(&self) -> impl Iterator<Item = Well> + '_ {
        self.row_labels
            .iter()
            .flat_map(move |&r| (1..=self.columns).map(move |c| Well::new(r, c)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssayConfig {
    /// Reference sample every fold change is computed against.
    pub control_sample: String,
    /// Canonical condition tokens, in report column order.
    pub conditions: Vec<String>,
    pub geometry: PlateGeometry,
}

impl Default for AssayConfig {
    fn default() -> Self {
        Self {
            control_sample: "siNT".to_string(),
            conditions: vec!["0mM".to_string(), "2mM".to_string()],
            geometry: PlateGeometry::default(),
        }
    }
}

impl AssayConfig {
    pub fn load(path: &Path) -> AssayResult<Self> {
        info!("Reading configuration from {}", path.display());
        let json = fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&json)?;
        for label in &mut config.geometry.row_labels {
            label.make_ascii_uppercase();
        }
        config.geometry.validate()?;
        Ok(config)
    }

    pub fn write(&self, path: &Path) -> AssayResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn average_col(&self, condition: &str) -> String {
        format!("{condition} average")
    }

    pub fn blank_col(&self, condition: &str) -> String {
        format!("{condition} blank")
    }

    pub fn minus_blank_col(&self, condition: &str) -> String {
        format!("{condition} minus blank")
    }

    pub fn fold_col(&self, condition: &str) -> String {
        format!("{condition} (fold to {})", self.control_sample)
    }
}
