//src/model/mod.rs
pub mod options;
pub mod species;
pub mod structure;

// Re-exports for cleaner imports
pub use options::{Chirality, CompareOptions, Tolerance};
pub use species::SpeciesTable;
pub use structure::Structure;
