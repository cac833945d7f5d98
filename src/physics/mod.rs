//src/physics/mod.rs
pub mod compare;
pub mod enumerate;
pub mod matcher;
pub mod metric;
pub mod reduction;

// Re-exports for cleaner imports
pub use compare::{compare, compare_structures, compare_with_report, ComparisonReport, SearchState};
pub use reduction::{niggli_reduce, ReducedLattice};
