// src/model/species.rs

use std::collections::HashMap;

/// Element symbols in order of atomic number (index 0 = H).
const SYMBOLS: [&str; 118] = [
    "H", "He", //
    "Li", "Be", "B", "C", "N", "O", "F", "Ne", //
    "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar", //
    "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As", "Se",
    "Br", "Kr", //
    "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In", "Sn", "Sb", "Te",
    "I", "Xe", //
    "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb",
    "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At", "Rn",
    //
    "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk", "Cf", "Es", "Fm", "Md", "No",
    "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

/// First label handed out to symbols that are not chemical elements.
const FIRST_CUSTOM_LABEL: i32 = 1000;

/// Returns the atomic number for an element symbol, or None for unknown symbols.
///
/// POSCAR files often decorate symbols (`Fe_pv`, `O/abc`); only the leading
/// alphabetic part is looked at.
pub fn atomic_number(symbol: &str) -> Option<i32> {
    let bare: String = symbol.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    SYMBOLS
        .iter()
        .position(|s| *s == bare)
        .map(|idx| idx as i32 + 1)
}

/// Maps species names to integer labels consistently across several files.
///
/// Chemical elements get their atomic number; anything else gets a label from
/// 1000 upwards in order of first appearance.
#[derive(Debug, Default, Clone)]
pub struct SpeciesTable {
    custom: HashMap<String, i32>,
}

impl SpeciesTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(&mut self, symbol: &str) -> i32 {
        if let Some(z) = atomic_number(symbol) {
            return z;
        }
        let next = FIRST_CUSTOM_LABEL + self.custom.len() as i32;
        *self.custom.entry(symbol.to_string()).or_insert(next)
    }
}
