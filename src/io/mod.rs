// src/io/mod.rs
pub mod poscar;

use crate::model::{SpeciesTable, Structure};
use std::io;
use std::path::Path;

/// Loads a structure file. POSCAR/CONTCAR (any name, e.g. `.vasp`) is the only format.
pub fn load_structure(path: &Path, species: &mut SpeciesTable) -> io::Result<Structure> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "cif" | "xyz" => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("Unsupported structure format: {}", path.display()),
        )),
        // POSCAR for unknown or explicit POSCAR/CONTCAR
        _ => poscar::parse(path, species),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_formats_are_refused() {
        let mut table = SpeciesTable::new();
        let err = load_structure(Path::new("quartz.CIF"), &mut table).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);

        let err = load_structure(Path::new("/nonexistent/POSCAR"), &mut table).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
