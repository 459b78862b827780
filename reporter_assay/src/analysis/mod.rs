pub mod aggregation;
pub mod timecourse;
