//! This crate provides a [Dempster-Shafer](https://en.wikipedia.org/wiki/Dempster%E2%80%93Shafer_theory)
//! evidence engine for matching geographic features.
//!
//! Hypotheses for one reference feature form a [`Frame`] of discernment. Subsets of the frame are encoded
//! as [`FocalSet`] bit sets, evidence is expressed as a [`MassFunction`] over those sets, independent
//! mass functions are merged with [`combine`], and the [`decide`] function turns the combined belief into
//! a [`Verdict`].

mod combination;
mod decision;
mod errors;
mod focal;
mod frame;
mod mass;

pub use combination::*;
pub use decision::*;
pub use errors::*;
pub use focal::*;
pub use frame::*;
pub use mass::*;

#[allow(unused_imports)]
#[macro_use]
extern crate approx;
