// src/lib.rs
pub mod boundary;
pub mod config;
pub mod error;
pub mod io;
pub mod model;
pub mod physics;
pub mod utils;

pub use boundary::compare_raw;
pub use error::{CompareError, InputError};
pub use model::{Chirality, CompareOptions, SpeciesTable, Structure, Tolerance};
pub use physics::{compare, compare_structures, compare_with_report, ComparisonReport};
