//! Luminescence reporter-assay plate processing.
//!
//! Plate-reader exports are located and cut out by [`data_handling::plate_block`],
//! stacked per timepoint and read back by [`data_handling::stacked_blocks`], and
//! turned into blank-subtracted, fold-changed reports by
//! [`analysis::aggregation`]. [`analysis::timecourse`] draws the charts.

pub mod analysis;
pub mod config;
pub mod data_handling;
pub mod errors;
pub mod helper_functions;
pub mod models;
