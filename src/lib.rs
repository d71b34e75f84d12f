//! The geomatch command line tool: loads calibration and dataset files, evaluates every reference feature
//! concurrently and writes one JSON line per reference feature.

pub mod batch;
pub mod dataset;
pub mod errors;
pub mod report;
