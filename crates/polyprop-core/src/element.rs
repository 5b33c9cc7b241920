//! Periodic table data needed by the parser and the descriptor registry.

/// Static data for one element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    /// Element symbol as written in SMILES brackets (`*` for the wildcard).
    pub symbol: &'static str,
    /// Atomic number (0 for the wildcard).
    pub atomic_number: u8,
    /// Standard atomic weight in Daltons.
    pub average_mass: f64,
    /// Mass of the most abundant isotope.
    pub monoisotopic_mass: f64,
    /// Number of outer-shell electrons.
    pub valence_electrons: u8,
    /// Normal valences used for implicit hydrogens (organic subset only).
    pub default_valences: &'static [u8],
}

impl Element {
    /// Whether the element may be written outside brackets.
    pub fn is_organic_subset(&self) -> bool {
        !self.default_valences.is_empty()
    }

    /// Whether this is the `*` attachment point used in polymer repeat units.
    pub fn is_wildcard(&self) -> bool {
        self.atomic_number == 0
    }
}

/// Hydrogen's average mass, used for implicit hydrogens.
pub const HYDROGEN_MASS: f64 = 1.008;

/// Hydrogen's monoisotopic mass.
pub const HYDROGEN_EXACT_MASS: f64 = 1.007_825_032_23;

const fn el(
    symbol: &'static str,
    atomic_number: u8,
    average_mass: f64,
    monoisotopic_mass: f64,
    valence_electrons: u8,
    default_valences: &'static [u8],
) -> Element {
    Element {
        symbol,
        atomic_number,
        average_mass,
        monoisotopic_mass,
        valence_electrons,
        default_valences,
    }
}

static ELEMENTS: &[Element] = &[
    el("*", 0, 0.0, 0.0, 0, &[]),
    el("H", 1, 1.008, 1.007_825_032_23, 1, &[]),
    el("He", 2, 4.003, 4.002_603_254, 2, &[]),
    el("Li", 3, 6.94, 7.016_003_437, 1, &[]),
    el("Be", 4, 9.012, 9.012_183_065, 2, &[]),
    el("B", 5, 10.812, 11.009_305_36, 3, &[3]),
    el("C", 6, 12.011, 12.0, 4, &[4]),
    el("N", 7, 14.007, 14.003_074_004, 5, &[3, 5]),
    el("O", 8, 15.999, 15.994_914_62, 6, &[2]),
    el("F", 9, 18.998, 18.998_403_163, 7, &[1]),
    el("Ne", 10, 20.180, 19.992_440_176, 8, &[]),
    el("Na", 11, 22.990, 22.989_769_282, 1, &[]),
    el("Mg", 12, 24.305, 23.985_041_697, 2, &[]),
    el("Al", 13, 26.982, 26.981_538_53, 3, &[]),
    el("Si", 14, 28.086, 27.976_926_535, 4, &[]),
    el("P", 15, 30.974, 30.973_761_998, 5, &[3, 5]),
    el("S", 16, 32.067, 31.972_071_174, 6, &[2, 4, 6]),
    el("Cl", 17, 35.453, 34.968_852_682, 7, &[1]),
    el("Ar", 18, 39.948, 39.962_383_124, 8, &[]),
    el("K", 19, 39.098, 38.963_706_486, 1, &[]),
    el("Ca", 20, 40.078, 39.962_590_863, 2, &[]),
    el("Ti", 22, 47.867, 47.947_941_98, 4, &[]),
    el("Fe", 26, 55.845, 55.934_936_33, 8, &[]),
    el("Cu", 29, 63.546, 62.929_597_72, 11, &[]),
    el("Zn", 30, 65.39, 63.929_142_01, 2, &[]),
    el("Ge", 32, 72.61, 73.921_177_761, 4, &[]),
    el("As", 33, 74.922, 74.921_594_57, 5, &[]),
    el("Se", 34, 78.96, 79.916_521_8, 6, &[]),
    el("Br", 35, 79.904, 78.918_337_6, 7, &[1]),
    el("Sn", 50, 118.71, 119.902_201_63, 4, &[]),
    el("I", 53, 126.904, 126.904_471_9, 7, &[1]),
];

/// Look up an element by its symbol (case-sensitive, `"Cl"` not `"CL"`).
pub fn element_by_symbol(symbol: &str) -> Option<&'static Element> {
    ELEMENTS.iter().find(|e| e.symbol == symbol)
}

/// Look up an element by atomic number.
pub fn element_by_number(atomic_number: u8) -> Option<&'static Element> {
    ELEMENTS.iter().find(|e| e.atomic_number == atomic_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organic_subset_has_default_valences() {
        for symbol in ["B", "C", "N", "O", "P", "S", "F", "Cl", "Br", "I"] {
            let element = element_by_symbol(symbol).unwrap();
            assert!(element.is_organic_subset(), "{symbol}");
        }
        assert!(!element_by_symbol("Na").unwrap().is_organic_subset());
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert!(element_by_symbol("CL").is_none());
        assert_eq!(element_by_number(17).unwrap().symbol, "Cl");
        assert!(element_by_symbol("*").unwrap().is_wildcard());
    }
}
