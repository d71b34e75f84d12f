//! Provides the evidence side of geomatch: calibrated membership functions that turn a criterion value into
//! mass, the [`EvidenceSource`] implementations that measure reference features against their candidates, and
//! the [`Matcher`] that runs a full evaluation for one reference feature.

mod bank;
mod errors;
mod function;
mod geometry;
mod matcher;
mod source;

pub use bank::*;
pub use errors::*;
pub use function::*;
pub use geometry::*;
pub use matcher::*;
pub use source::*;

#[cfg(test)]
#[macro_use]
extern crate approx;
