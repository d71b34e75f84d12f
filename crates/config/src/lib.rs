//! Provides geomatch's calibration configuration and configuration management functionality.

mod config;
mod errors;
pub mod toml;

pub use crate::config::*;
pub use crate::errors::*;

#[macro_use]
extern crate lazy_static;
