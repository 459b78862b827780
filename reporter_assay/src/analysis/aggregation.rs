//! Blank subtraction and fold change for a plate time course.
//!
//! ```text
//! readings ─┐
//!           ├─ join_mapping ─ tidy_frame ─┬─ blanks_by_timepoint ─┐
//! mapping ──┘                             └───────────────────────┴─ aggregate_samples ─ widen
//! ```
//!
//! * One blank level per timepoint: the mean of every `blank` well, whatever its
//!   condition.
//! * Replicates are averaged per (timepoint, sample, condition), then the blank
//!   is subtracted.
//! * Fold change divides by the control sample's blank-subtracted signal at the
//!   same timepoint and condition. There is no guard on the denominator, so a
//!   zero control shows up as `inf`/`NaN` and a missing control as null.
//!
//! Missing values are polars nulls throughout and are skipped by the means.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::config::AssayConfig;
use crate::data_handling::mapping::MAPPING_COLUMNS;
use crate::errors::{AssayResult, MappingError};
use crate::models::{PlateReading, TidyRow, TidyTable, Well, WellMapping, WellType};

/// Canonical-form lookup for condition labels (`"0 mM"`, `"0MM"`, `"0mM GuHCl"` → `"0mM"`).
#[derive(Debug, Clone)]
pub struct ConditionTable {
    lookup: HashMap<String, String>,
}

impl ConditionTable {
    pub fn new(conditions: &[String]) -> Self {
        let mut lookup = HashMap::new();
        for canonical in conditions {
            let key = canonical_key(canonical);
            if let Some(amount) = key.strip_suffix("mm") {
                for variant in [
                    amount.to_string(),
                    format!("{amount}mmg"),
                    format!("{amount}mmguhcl"),
                ] {
                    lookup.insert(variant, canonical.clone());
                }
            }
            lookup.insert(key, canonical.clone());
        }
        Self { lookup }
    }

    /// Unknown labels are returned trimmed but otherwise untouched.
    pub fn normalize(&self, raw: &str) -> String {
        self.lookup
            .get(&canonical_key(raw))
            .cloned()
            .unwrap_or_else(|| raw.trim().to_string())
    }
}

fn canonical_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Every intermediate table of one analysis run.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub tidy: DataFrame,
    pub blanks: DataFrame,
    pub long: DataFrame,
    pub wide: DataFrame,
}

/// Validate the mapping frame and turn it into typed entries.
///
/// Rows without a well id or a sample are dropped, so their wells count as
/// unmapped later on.
pub fn mapping_entries(mapping: &DataFrame, config: &AssayConfig) -> AssayResult<Vec<WellMapping>> {
    let names: Vec<&str> = mapping
        .get_column_names()
        .iter()
        .map(|c| c.as_str())
        .collect();
    let mut missing: Vec<String> = MAPPING_COLUMNS
        .iter()
        .filter(|c| !names.contains(c))
        .map(|c| c.to_string())
        .collect();
    missing.sort();
    if !missing.is_empty() {
        return Err(MappingError::MissingColumns { missing }.into());
    }

    let wells = mapping.column("well")?.cast(&DataType::String)?;
    let samples = mapping.column("sample")?.cast(&DataType::String)?;
    let conditions = mapping.column("condition")?.cast(&DataType::String)?;
    let types = mapping.column("well_type")?.cast(&DataType::String)?;
    let (wells, samples, conditions, types) =
        (wells.str()?, samples.str()?, conditions.str()?, types.str()?);

    let table = ConditionTable::new(&config.conditions);
    let mut entries = Vec::with_capacity(mapping.height());
    for i in 0..mapping.height() {
        let Some(raw_well) = wells.get(i) else {
            continue;
        };
        let well: Well = match raw_well.parse() {
            Ok(well) => well,
            Err(e) => {
                warn!("Skipping mapping row {}: {}", i + 1, e);
                continue;
            }
        };
        let Some(sample) = samples.get(i).map(str::trim).filter(|s| !s.is_empty()) else {
            debug!("{} has no sample in the mapping", well);
            continue;
        };
        entries.push(WellMapping {
            well,
            sample: sample.to_string(),
            condition: table.normalize(conditions.get(i).unwrap_or("")),
            well_type: WellType::parse(types.get(i).unwrap_or("")),
        });
    }

    let mut counts: BTreeMap<Well, usize> = BTreeMap::new();
    for entry in &entries {
        *counts.entry(entry.well).or_default() += 1;
    }
    let duplicated: Vec<String> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(well, _)| well.to_string())
        .collect();
    if !duplicated.is_empty() {
        return Err(MappingError::DuplicateWells { wells: duplicated }.into());
    }

    Ok(entries)
}

/// Attach sample, condition and well type to every reading.
pub fn join_mapping(
    readings: &[PlateReading],
    entries: &[WellMapping],
) -> Result<TidyTable, MappingError> {
    let by_well: HashMap<Well, &WellMapping> = entries.iter().map(|m| (m.well, m)).collect();

    let mut unmapped = BTreeSet::new();
    let mut tidy = Vec::with_capacity(readings.len());
    for reading in readings {
        match by_well.get(&reading.well) {
            Some(m) => tidy.push(TidyRow {
                time_h: reading.time_h,
                well: reading.well,
                value: reading.value,
                sample: m.sample.clone(),
                condition: m.condition.clone(),
                well_type: m.well_type.clone(),
            }),
            None => {
                unmapped.insert(reading.well);
            }
        }
    }

    if !unmapped.is_empty() {
        return Err(MappingError::UnmappedWells {
            wells: unmapped.iter().map(Well::to_string).collect(),
        });
    }
    Ok(tidy)
}

pub fn tidy_frame(tidy: &[TidyRow]) -> PolarsResult<DataFrame> {
    df![
        "time_h" => tidy.iter().map(|r| r.time_h as i64).collect::<Vec<_>>(),
        "well" => tidy.iter().map(|r| r.well.to_string()).collect::<Vec<_>>(),
        "value" => tidy.iter().map(|r| r.value).collect::<Vec<_>>(),
        "sample" => tidy.iter().map(|r| r.sample.as_str()).collect::<Vec<_>>(),
        "condition" => tidy.iter().map(|r| r.condition.as_str()).collect::<Vec<_>>(),
        "well_type" => tidy.iter().map(|r| r.well_type.as_str()).collect::<Vec<_>>(),
    ]
}

/// Mean of all blank wells per timepoint (`time_h`, `blank`).
pub fn blanks_by_timepoint(tidy: &DataFrame) -> PolarsResult<DataFrame> {
    tidy.clone()
        .lazy()
        .filter(col("well_type").eq(lit(WellType::Blank.as_str())))
        .group_by([col("time_h")])
        .agg([col("value").mean().alias("blank")])
        .sort(["time_h"], SortMultipleOptions::default())
        .collect()
}

/// Long table: one row per (time_h, sample, condition) with
/// `mean_value`, `blank`, `minus_blank` and `fold_to_control`.
pub fn aggregate_samples(
    tidy: &DataFrame,
    blanks: &DataFrame,
    config: &AssayConfig,
) -> PolarsResult<DataFrame> {
    let samples = tidy
        .clone()
        .lazy()
        .filter(col("well_type").eq(lit(WellType::Sample.as_str())))
        .group_by([col("time_h"), col("sample"), col("condition")])
        .agg([col("value").mean().alias("mean_value")])
        .join(
            blanks.clone().lazy(),
            [col("time_h")],
            [col("time_h")],
            JoinArgs::new(JoinType::Left),
        )
        .with_column((col("mean_value") - col("blank")).alias("minus_blank"));

    let control = samples
        .clone()
        .filter(col("sample").eq(lit(config.control_sample.as_str())))
        .select([
            col("time_h"),
            col("condition"),
            col("minus_blank").alias("control_minus_blank"),
        ]);

    samples
        .join(
            control,
            [col("time_h"), col("condition")],
            [col("time_h"), col("condition")],
            JoinArgs::new(JoinType::Left),
        )
        .with_column((col("minus_blank") / col("control_minus_blank")).alias("fold_to_control"))
        .select([
            col("time_h"),
            col("sample"),
            col("condition"),
            col("mean_value"),
            col("blank"),
            col("minus_blank"),
            col("fold_to_control"),
        ])
        .sort(["time_h", "sample", "condition"], SortMultipleOptions::default())
        .collect()
}

/// Reshape the long table to one row per (time_h, sample) with a column group
/// per configured condition.
pub fn widen(long: &DataFrame, blanks: &DataFrame, config: &AssayConfig) -> PolarsResult<DataFrame> {
    let long = long.clone().lazy();
    let in_conditions = config
        .conditions
        .iter()
        .map(|c| col("condition").eq(lit(c.as_str())))
        .reduce(|a, b| a.or(b))
        .unwrap_or_else(|| lit(false));

    let mut wide = long
        .clone()
        .filter(in_conditions)
        .group_by([col("time_h"), col("sample")])
        .agg([col("condition").count().alias("n_conditions")])
        .select([col("time_h"), col("sample")]);

    for cond in &config.conditions {
        let packed = long
            .clone()
            .filter(col("condition").eq(lit(cond.as_str())))
            .select([
                col("time_h"),
                col("sample"),
                col("mean_value").alias(config.average_col(cond)),
                col("minus_blank").alias(config.minus_blank_col(cond)),
                col("fold_to_control").alias(config.fold_col(cond)),
            ]);
        wide = wide.join(
            packed,
            [col("time_h"), col("sample")],
            [col("time_h"), col("sample")],
            JoinArgs::new(JoinType::Left),
        );
    }

    wide = wide.join(
        blanks.clone().lazy(),
        [col("time_h")],
        [col("time_h")],
        JoinArgs::new(JoinType::Left),
    );
    for cond in &config.conditions {
        wide = wide.with_column(col("blank").alias(config.blank_col(cond)));
    }

    wide.select(report_columns(config).into_iter().map(col).collect::<Vec<_>>())
        .sort(["time_h", "sample"], SortMultipleOptions::default())
        .collect()
}

/// Column order of the wide report.
pub fn report_columns(config: &AssayConfig) -> Vec<String> {
    let conditions = &config.conditions;
    let mut columns = vec!["time_h".to_string(), "sample".to_string()];
    columns.extend(conditions.iter().map(|c| config.average_col(c)));
    columns.push("blank".to_string());
    columns.extend(conditions.iter().map(|c| config.blank_col(c)));
    columns.extend(conditions.iter().map(|c| config.minus_blank_col(c)));
    columns.extend(conditions.iter().map(|c| config.fold_col(c)));
    columns
}

/// Run every stage and keep the intermediate tables.
pub fn run_analysis(
    readings: &[PlateReading],
    mapping: &DataFrame,
    config: &AssayConfig,
) -> AssayResult<Analysis> {
    let entries = mapping_entries(mapping, config)?;
    let tidy_rows = join_mapping(readings, &entries)?;
    let tidy = tidy_frame(&tidy_rows)?;
    let blanks = blanks_by_timepoint(&tidy)?;
    let long = aggregate_samples(&tidy, &blanks, config)?;
    let wide = widen(&long, &blanks, config)?;

    info!(
        "Aggregated {} readings into {} sample rows over {} timepoints",
        tidy.height(),
        wide.height(),
        blanks.height()
    );
    if long
        .column("sample")?
        .str()?
        .into_iter()
        .all(|s| s != Some(config.control_sample.as_str()))
    {
        warn!(
            "Control sample {} not found; fold changes will be empty",
            config.control_sample
        );
    }

    Ok(Analysis {
        tidy,
        blanks,
        long,
        wide,
    })
}

/// Readings + mapping → wide report.
pub fn aggregate(
    readings: &[PlateReading],
    mapping: &DataFrame,
    config: &AssayConfig,
) -> AssayResult<DataFrame> {
    Ok(run_analysis(readings, mapping, config)?.wide)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AssayError;
    use polars::df;

    fn reading(time_h: u32, well: &str, value: Option<f64>) -> PlateReading {
        PlateReading {
            time_h,
            well: well.parse().unwrap(),
            value,
        }
    }

    fn scenario_readings() -> Vec<PlateReading> {
        vec![
            reading(0, "A1", Some(100.0)),
            reading(0, "A2", Some(200.0)),
            reading(0, "A6", Some(10.0)),
            reading(0, "B6", Some(10.0)),
            reading(1, "A1", Some(110.0)),
            reading(1, "A2", Some(220.0)),
            reading(1, "A6", Some(10.0)),
            reading(1, "B6", Some(10.0)),
        ]
    }

    fn scenario_mapping() -> DataFrame {
        df![
            "well" => ["A1", "A2", "A6", "B6"],
            "sample" => ["siNT", "siFAM", "blank", "blank"],
            "condition" => ["0mM", "0mM", "all", "all"],
            "well_type" => ["sample", "sample", "blank", "blank"],
        ]
        .unwrap()
    }

    fn f64_col(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name).unwrap().f64().unwrap().into_iter().collect()
    }

    fn str_col(df: &DataFrame, name: &str) -> Vec<String> {
        df.column(name)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|s| s.unwrap_or_default().to_string())
            .collect()
    }

    fn close(actual: Option<f64>, expected: f64) -> bool {
        actual.is_some_and(|v| (v - expected).abs() < 1e-9)
    }

    #[test]
    fn two_timepoint_scenario() {
        let config = AssayConfig::default();
        let wide = aggregate(&scenario_readings(), &scenario_mapping(), &config).unwrap();

        assert_eq!(wide.height(), 4);
        assert_eq!(str_col(&wide, "sample"), ["siFAM", "siNT", "siFAM", "siNT"]);
        let times: Vec<Option<i64>> = wide.column("time_h").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(times, [Some(0), Some(0), Some(1), Some(1)]);

        assert_eq!(f64_col(&wide, "blank"), [Some(10.0); 4]);
        assert_eq!(f64_col(&wide, "0mM blank"), [Some(10.0); 4]);
        assert_eq!(f64_col(&wide, "2mM blank"), [Some(10.0); 4]);

        let minus = f64_col(&wide, "0mM minus blank");
        assert_eq!(minus, [Some(190.0), Some(90.0), Some(210.0), Some(100.0)]);

        let fold = f64_col(&wide, "0mM (fold to siNT)");
        assert!(close(fold[0], 190.0 / 90.0));
        assert!(close(fold[1], 1.0));
        assert!(close(fold[2], 2.1));
        assert!(close(fold[3], 1.0));

        // Nothing was mapped to 2mM.
        assert!(f64_col(&wide, "2mM average").iter().all(Option::is_none));
        assert!(f64_col(&wide, "2mM (fold to siNT)").iter().all(Option::is_none));
    }

    #[test]
    fn report_has_fixed_column_order() {
        let wide = aggregate(&scenario_readings(), &scenario_mapping(), &AssayConfig::default()).unwrap();
        let names: Vec<&str> = wide.get_column_names().iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            [
                "time_h",
                "sample",
                "0mM average",
                "2mM average",
                "blank",
                "0mM blank",
                "2mM blank",
                "0mM minus blank",
                "2mM minus blank",
                "0mM (fold to siNT)",
                "2mM (fold to siNT)",
            ]
        );
    }

    #[test]
    fn unmapped_wells_are_listed_once_in_plate_order() {
        let mut readings = scenario_readings();
        readings.push(reading(0, "C10", Some(1.0)));
        readings.push(reading(1, "C10", Some(1.0)));
        readings.push(reading(0, "C2", Some(1.0)));

        let err = aggregate(&readings, &scenario_mapping(), &AssayConfig::default()).unwrap_err();
        match err {
            AssayError::Mapping(MappingError::UnmappedWells { wells }) => {
                assert_eq!(wells, ["C2", "C10"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn well_without_sample_counts_as_unmapped() {
        let mapping = df![
            "well" => ["A1", "A2", "A6", "B6"],
            "sample" => [Some("siNT"), None, Some("blank"), Some("blank")],
            "condition" => ["0mM", "0mM", "all", "all"],
            "well_type" => ["sample", "sample", "blank", "blank"],
        ]
        .unwrap();
        let err = aggregate(&scenario_readings(), &mapping, &AssayConfig::default()).unwrap_err();
        assert!(
            matches!(err, AssayError::Mapping(MappingError::UnmappedWells { ref wells }) if wells == &["A2"])
        );
    }

    #[test]
    fn missing_mapping_columns_are_reported() {
        let mapping = df![
            "well" => ["A1"],
            "sample" => ["siNT"],
        ]
        .unwrap();
        let err = aggregate(&scenario_readings(), &mapping, &AssayConfig::default()).unwrap_err();
        match err {
            AssayError::Mapping(MappingError::MissingColumns { missing }) => {
                assert_eq!(missing, ["condition", "well_type"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_mapping_rows_are_rejected() {
        let mapping = df![
            "well" => ["A1", "a1", "A2", "A6", "B6"],
            "sample" => ["siNT", "siNT", "siFAM", "blank", "blank"],
            "condition" => ["0mM", "2mM", "0mM", "all", "all"],
            "well_type" => ["sample", "sample", "sample", "blank", "blank"],
        ]
        .unwrap();
        let err = aggregate(&scenario_readings(), &mapping, &AssayConfig::default()).unwrap_err();
        assert!(matches!(err, AssayError::Mapping(MappingError::DuplicateWells { .. })));
    }

    #[test]
    fn blanks_are_shared_across_conditions() {
        let readings = vec![
            reading(0, "A1", Some(100.0)),
            reading(0, "A7", Some(200.0)),
            reading(0, "A6", Some(10.0)),
            reading(0, "B6", Some(20.0)),
        ];
        let mapping = df![
            "well" => ["A1", "A7", "A6", "B6"],
            "sample" => ["siNT", "siNT", "blank", "blank"],
            "condition" => ["0mM", "2mM", "0mM", "2mM"],
            "well_type" => ["sample", "sample", "blank", "blank"],
        ]
        .unwrap();
        let wide = aggregate(&readings, &mapping, &AssayConfig::default()).unwrap();
        assert_eq!(wide.height(), 1);
        assert_eq!(f64_col(&wide, "blank"), [Some(15.0)]);
        assert_eq!(f64_col(&wide, "0mM minus blank"), [Some(85.0)]);
        assert_eq!(f64_col(&wide, "2mM minus blank"), [Some(185.0)]);
        assert_eq!(f64_col(&wide, "2mM (fold to siNT)"), [Some(1.0)]);
    }

    #[test]
    fn condition_variants_collapse() {
        let table = ConditionTable::new(&AssayConfig::default().conditions);
        for raw in ["0", "0mM", "0 mM", "0MM", "0mM GuHCl", " 0mmg "] {
            assert_eq!(table.normalize(raw), "0mM", "{raw:?}");
        }
        for raw in ["2", "2 mm", "2mM GuHCl"] {
            assert_eq!(table.normalize(raw), "2mM", "{raw:?}");
        }
        assert_eq!(table.normalize(" All "), "All");
        assert_eq!(table.normalize("5mM"), "5mM");
    }

    #[test]
    fn messy_condition_labels_land_in_the_right_columns() {
        let mapping = df![
            "well" => ["A1", "A2", "A6", "B6"],
            "sample" => [" siNT ", "siFAM", "blank", "blank"],
            "condition" => ["0 mM", "0MM GuHCl", "all", "all"],
            "well_type" => ["Sample", "SAMPLE", " blank", "Blank"],
        ]
        .unwrap();
        let wide = aggregate(&scenario_readings(), &mapping, &AssayConfig::default()).unwrap();
        assert_eq!(f64_col(&wide, "0mM average")[..2], [Some(200.0), Some(100.0)]);
    }

    #[test]
    fn replicate_mean_skips_missing_values() {
        let readings = vec![
            reading(0, "A1", Some(100.0)),
            reading(0, "B1", None),
            reading(0, "C1", Some(120.0)),
            reading(0, "A6", Some(10.0)),
        ];
        let mapping = df![
            "well" => ["A1", "B1", "C1", "A6"],
            "sample" => ["siNT", "siNT", "siNT", "blank"],
            "condition" => ["0mM", "0mM", "0mM", "all"],
            "well_type" => ["sample", "sample", "sample", "blank"],
        ]
        .unwrap();
        let wide = aggregate(&readings, &mapping, &AssayConfig::default()).unwrap();
        assert_eq!(f64_col(&wide, "0mM average"), [Some(110.0)]);
        assert_eq!(f64_col(&wide, "0mM minus blank"), [Some(100.0)]);
    }

    #[test]
    fn timepoint_without_blanks_propagates_missing() {
        let readings = vec![
            reading(0, "A1", Some(100.0)),
            reading(0, "A6", Some(10.0)),
            reading(3, "A1", Some(100.0)),
            reading(3, "A6", None),
        ];
        let mapping = df![
            "well" => ["A1", "A6"],
            "sample" => ["siNT", "blank"],
            "condition" => ["0mM", "all"],
            "well_type" => ["sample", "blank"],
        ]
        .unwrap();
        let wide = aggregate(&readings, &mapping, &AssayConfig::default()).unwrap();
        assert_eq!(f64_col(&wide, "blank"), [Some(10.0), None]);
        assert_eq!(f64_col(&wide, "0mM minus blank"), [Some(90.0), None]);
        assert_eq!(f64_col(&wide, "0mM (fold to siNT)"), [Some(1.0), None]);
    }

    #[test]
    fn fold_without_control_row_is_missing_and_zero_control_is_not_finite() {
        let readings = vec![
            reading(0, "A1", Some(10.0)),  // siNT 0mM, equal to blank
            reading(0, "A2", Some(50.0)),  // siFAM 0mM
            reading(0, "A8", Some(70.0)),  // siFAM 2mM, no control
            reading(0, "A6", Some(10.0)),
        ];
        let mapping = df![
            "well" => ["A1", "A2", "A8", "A6"],
            "sample" => ["siNT", "siFAM", "siFAM", "blank"],
            "condition" => ["0mM", "0mM", "2mM", "all"],
            "well_type" => ["sample", "sample", "sample", "blank"],
        ]
        .unwrap();
        let analysis = run_analysis(&readings, &mapping, &AssayConfig::default()).unwrap();
        let wide = &analysis.wide;
        assert_eq!(str_col(wide, "sample"), ["siFAM", "siNT"]);

        let fold0 = f64_col(wide, "0mM (fold to siNT)");
        assert_eq!(fold0[0], Some(f64::INFINITY));
        assert!(fold0[1].is_some_and(f64::is_nan));

        let fold2 = f64_col(wide, "2mM (fold to siNT)");
        assert_eq!(fold2, [None, None]);
        assert_eq!(f64_col(wide, "2mM minus blank"), [Some(60.0), None]);

        assert_eq!(analysis.long.height(), 3);
    }

    #[test]
    fn control_sample_is_configurable() {
        let config = AssayConfig {
            control_sample: "siFAM".to_string(),
            ..AssayConfig::default()
        };
        let wide = aggregate(&scenario_readings(), &scenario_mapping(), &config).unwrap();
        let fold = f64_col(&wide, "0mM (fold to siFAM)");
        assert!(close(fold[0], 1.0));
        assert!(close(fold[1], 90.0 / 190.0));
    }

    #[test]
    fn unused_wells_are_ignored() {
        let mut readings = scenario_readings();
        readings.push(reading(0, "H12", Some(99999.0)));
        let mapping = df![
            "well" => ["A1", "A2", "A6", "B6", "H12"],
            "sample" => ["siNT", "siFAM", "blank", "blank", "unused"],
            "condition" => ["0mM", "0mM", "all", "all", "unused"],
            "well_type" => ["sample", "sample", "blank", "blank", "unused"],
        ]
        .unwrap();
        let wide = aggregate(&readings, &mapping, &AssayConfig::default()).unwrap();
        assert_eq!(wide.height(), 4);
        assert_eq!(f64_col(&wide, "blank")[0], Some(10.0));
    }

    #[test]
    fn analysis_is_deterministic() {
        let config = AssayConfig::default();
        let a = aggregate(&scenario_readings(), &scenario_mapping(), &config).unwrap();
        let b = aggregate(&scenario_readings(), &scenario_mapping(), &config).unwrap();
        assert!(a.equals_missing(&b));
    }

    #[test]
    fn blank_table_is_one_row_per_timepoint() {
        let entries = mapping_entries(&scenario_mapping(), &AssayConfig::default()).unwrap();
        let tidy = tidy_frame(&join_mapping(&scenario_readings(), &entries).unwrap()).unwrap();
        assert_eq!(tidy.height(), 8);
        assert_eq!(tidy.column("sample").unwrap().null_count(), 0);

        let blanks = blanks_by_timepoint(&tidy).unwrap();
        assert_eq!(blanks.height(), 2);
        assert_eq!(f64_col(&blanks, "blank"), [Some(10.0), Some(10.0)]);
    }

    #[test]
    fn nan_cell_is_skipped_by_the_replicate_mean() {
        use crate::config::PlateGeometry;
        use crate::data_handling::grid::tests::grid_from;
        use crate::data_handling::stacked_blocks::scan_stacked_blocks;

        let geometry = PlateGeometry {
            row_labels: vec!['A', 'B', 'C'],
            columns: 2,
            block_stride: 5,
        };
        let grid = grid_from(&[
            vec!["0h post transfection"],
            vec!["", "1", "2"],
            vec!["A", "100", "10"],
            vec!["B", "NaN", "10"],
            vec!["C", "100", "10"],
        ]);
        let readings = scan_stacked_blocks(&grid, &geometry).unwrap();
        let mapping = df![
            "well" => ["A1", "B1", "C1", "A2", "B2", "C2"],
            "sample" => ["siNT", "siNT", "siNT", "blank", "blank", "blank"],
            "condition" => ["0mM", "0mM", "0mM", "all", "all", "all"],
            "well_type" => ["sample", "sample", "sample", "blank", "blank", "blank"],
        ]
        .unwrap();
        let config = AssayConfig {
            geometry,
            ..AssayConfig::default()
        };

        let wide = aggregate(&readings, &mapping, &config).unwrap();
        assert_eq!(wide.height(), 1);
        assert_eq!(f64_col(&wide, "0mM average"), [Some(100.0)]);
        assert_eq!(f64_col(&wide, "0mM minus blank"), [Some(90.0)]);
        assert_eq!(f64_col(&wide, "0mM (fold to siNT)"), [Some(1.0)]);
    }
}
