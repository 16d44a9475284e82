//! # ORIS Common Library
//!
//! Shared code for the ORIS split analyzer:
//! - Error taxonomy (`Error`, `Result`)
//! - Time codec for split times and event dates
//! - Configuration loading (TOML bootstrap with environment overrides)

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
pub use time::{RaceTime, TimeCell};
