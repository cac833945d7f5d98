// src/io/poscar.rs

use log::{debug, warn};
use std::fs;
use std::io;
use std::path::Path;

use crate::model::{SpeciesTable, Structure};
use crate::utils::linalg;

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn parse_floats(line: &str, count: usize, what: &str) -> io::Result<Vec<f64>> {
    let values: Vec<f64> = line
        .split_whitespace()
        .take(count)
        .map(|x| x.parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid(format!("Invalid {} line: '{}'", what, line.trim())))?;
    if values.len() < count {
        return Err(invalid(format!("Invalid {} line: '{}'", what, line.trim())));
    }
    Ok(values)
}

pub fn parse(path: &Path, species: &mut SpeciesTable) -> io::Result<Structure> {
    let text = fs::read_to_string(path)?;
    parse_str(&text, species)
}

/// Parses VASP POSCAR/CONTCAR text into a structure with fractional positions.
///
/// Element symbols are turned into labels through `species`, so structures read
/// with the same table get consistent labels.
pub fn parse_str(text: &str, species: &mut SpeciesTable) -> io::Result<Structure> {
    let mut lines = text.lines();
    let mut next_line = |what: &str| {
        lines
            .next()
            .ok_or_else(|| invalid(format!("Unexpected EOF, missing {}", what)))
    };

    let _ = next_line("comment")?;

    // Scale (negative = target volume)
    let scale = parse_floats(next_line("scale")?, 1, "scale")?[0];

    // Lattice
    let mut lattice = [[0.0; 3]; 3];
    for row in lattice.iter_mut() {
        let v = parse_floats(next_line("lattice")?, 3, "lattice")?;
        row.copy_from_slice(&v);
    }

    let raw_volume = linalg::lattice_matrix(&lattice).determinant();
    let factor = if scale < 0.0 {
        if raw_volume == 0.0 {
            return Err(invalid("Zero-volume lattice with volume scaling"));
        }
        (-scale / raw_volume.abs()).cbrt()
    } else {
        scale
    };
    lattice
        .iter_mut()
        .flat_map(|row| row.iter_mut())
        .for_each(|x| *x *= factor);

    // Elements & Counts
    let line6 = next_line("element or count line")?;
    let starts_alpha = line6
        .trim()
        .chars()
        .next()
        .map(|c| c.is_alphabetic())
        .unwrap_or(false);
    let (element_names, counts_line): (Vec<String>, &str) = if starts_alpha {
        (
            line6.split_whitespace().map(str::to_string).collect(),
            next_line("counts")?,
        )
    } else {
        (Vec::new(), line6)
    };

    let counts: Vec<usize> = counts_line
        .split_whitespace()
        .map(|x| x.parse::<usize>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid(format!("Invalid counts line: '{}'", counts_line.trim())))?;

    if element_names.is_empty() {
        warn!("POSCAR has no element line; species are labelled by group order");
    } else if element_names.len() != counts.len() {
        return Err(invalid(format!(
            "{} element symbols but {} counts",
            element_names.len(),
            counts.len()
        )));
    }

    // Mode (optionally preceded by Selective dynamics)
    let mut mode_line = next_line("coordinate mode")?;
    if mode_line.trim_start().starts_with(['s', 'S']) {
        mode_line = next_line("coordinate mode")?;
    }
    let is_cartesian = mode_line.trim_start().starts_with(['c', 'C', 'k', 'K']);

    // Atoms
    let mut types = Vec::new();
    let mut positions = Vec::new();
    for (group, &count) in counts.iter().enumerate() {
        let label = match element_names.get(group) {
            Some(name) => species.label(name),
            None => species.label(&format!("#{}", group + 1)),
        };
        for _ in 0..count {
            let v = parse_floats(next_line("atom position")?, 3, "atom position")?;
            let mut p = [v[0], v[1], v[2]];
            if is_cartesian {
                let cart = [p[0] * factor, p[1] * factor, p[2] * factor];
                p = linalg::cart_to_frac(cart, &lattice)
                    .ok_or_else(|| invalid("Singular lattice"))?;
            }
            types.push(label);
            positions.push(p);
        }
    }

    debug!("Read POSCAR with {} atoms", types.len());
    Structure::new(lattice, types, positions).map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROCKSALT: &str = "NaCl
1.0
  5.64 0.00 0.00
  0.00 5.64 0.00
  0.00 0.00 5.64
Na Cl
1 1
Direct
0.0 0.0 0.0
0.5 0.5 0.5
";

    #[test]
    fn parse_direct_with_elements() {
        let mut table = SpeciesTable::new();
        let s = parse_str(ROCKSALT, &mut table).unwrap();
        assert_eq!(s.types, vec![11, 17]);
        assert!((s.lattice[0][0] - 5.64).abs() < 1e-12);
        assert!((s.positions[1][2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn parse_cartesian_with_scale_and_selective_dynamics() {
        let text = "scaled
2.0
  2.0 0.0 0.0
  0.0 2.0 0.0
  0.0 0.0 3.0
Si
2
Selective dynamics
Cartesian
0.0 0.0 0.0 T T T
1.0 1.0 1.5 F F F
";
        let mut table = SpeciesTable::new();
        let s = parse_str(text, &mut table).unwrap();
        assert!((s.lattice[2][2] - 6.0).abs() < 1e-12);
        for (got, want) in s.positions[1].iter().zip([0.5, 0.5, 0.5]) {
            assert!((got - want).abs() < 1e-12);
        }
        assert_eq!(s.types, vec![14, 14]);
    }

    #[test]
    fn negative_scale_is_a_volume() {
        let text = "vol
-64.0
1 0 0
0 1 0
0 0 1
1
Direct
0 0 0
";
        let mut table = SpeciesTable::new();
        let s = parse_str(text, &mut table).unwrap();
        assert!((s.volume() - 64.0).abs() < 1e-9);
        assert_eq!(s.types, vec![1000]);
    }

    #[test]
    fn truncated_file_is_an_error() {
        let mut table = SpeciesTable::new();
        let err = parse_str("comment\n1.0\n1 0 0\n", &mut table).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let bad = ROCKSALT.replace("1 1", "1 x");
        assert!(parse_str(&bad, &mut table).is_err());
    }
}
