use std::fmt;
use std::str::FromStr;

/// One physical position on a plate, e.g. `B7`.
///
/// Ordering is row-major (`A1 < A2 < … < A12 < B1`), which is the order every
/// table in the pipeline is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Well {
    pub row: char,
    pub column: u8,
}

impl Well {
    pub fn new(row: char, column: u8) -> Self {
        Self {
            row: row.to_ascii_uppercase(),
            column,
        }
    }
}

impl fmt::Display for Well {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.column)
    }
}

impl FromStr for Well {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let row = chars
            .next()
            .filter(|c| c.is_ascii_alphabetic())
            .ok_or_else(|| format!("invalid well id {s:?}"))?;
        let column: u8 = chars
            .as_str()
            .parse()
            .map_err(|_| format!("invalid well id {s:?}"))?;
        if column == 0 {
            return Err(format!("invalid well id {s:?}"));
        }
        Ok(Well::new(row, column))
    }
}

/// A single luminescence value at one timepoint.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateReading {
    pub time_h: u32,
    pub well: Well,
    /// `None` when the source cell was empty or not numeric.
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WellType {
    Sample,
    Blank,
    /// Anything else found in the mapping (`unused`, `empty`, …).
    Other(String),
}

impl WellType {
    pub fn parse(raw: &str) -> Self {
        let norm = raw.trim().to_lowercase();
        match norm.as_str() {
            "sample" => WellType::Sample,
            "blank" => WellType::Blank,
            _ => WellType::Other(norm),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WellType::Sample => "sample",
            WellType::Blank => "blank",
            WellType::Other(s) => s,
        }
    }
}

/// What was pipetted into a well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellMapping {
    pub well: Well,
    pub sample: String,
    /// Already normalized (`0mM`, `2mM`, or the trimmed source text).
    pub condition: String,
    pub well_type: WellType,
}

/// A reading joined with its well mapping; one row of the tidy table.
#[derive(Debug, Clone, PartialEq)]
pub struct TidyRow {
    pub time_h: u32,
    pub well: Well,
    pub value: Option<f64>,
    pub sample: String,
    pub condition: String,
    pub well_type: WellType,
}

pub type TidyTable = Vec<TidyRow>;
