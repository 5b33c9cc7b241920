//! SMILES parser producing a [`Molecule`].
//!
//! Supported syntax: organic-subset and aromatic atoms, bracket atoms
//! (isotope, chirality, hydrogen count, charge, atom class), all bond
//! symbols, branches, ring closures (`0-9` and `%nn`), disconnected
//! components and the polymer attachment wildcard `*`.
//!
//! Stereo markers are accepted and kept on the atom but not interpreted.

use std::collections::HashMap;

use thiserror::Error;

use crate::element::element_by_symbol;
use crate::molecule::{Atom, BondOrder, Chirality, Molecule};

/// Longest accepted input, in bytes after trimming.
pub const MAX_SMILES_LEN: usize = 4096;

/// Most atoms a single structure may contain.
pub const MAX_ATOMS: usize = 1000;

/// Reasons a structural string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmilesError {
    #[error("empty SMILES string")]
    Empty,

    #[error("SMILES string is {length} bytes, limit is {limit}")]
    TooLong { length: usize, limit: usize },

    #[error("more than {limit} atoms")]
    TooManyAtoms { limit: usize },

    #[error("{message} at position {position}")]
    Syntax { position: usize, message: String },

    #[error("unknown element '{symbol}' at position {position}")]
    UnknownElement { position: usize, symbol: String },

    #[error("explicit valence for atom #{atom} {symbol}, {valence}, is greater than permitted")]
    Valence {
        atom: usize,
        symbol: &'static str,
        valence: u32,
    },

    #[error("non-ring atom #{atom} {symbol} marked aromatic")]
    AromaticOutsideRing { atom: usize, symbol: &'static str },
}

/// Parse a SMILES string into a validated molecular graph.
pub fn parse_smiles(smiles: &str) -> Result<Molecule, SmilesError> {
    let trimmed = smiles.trim();
    if trimmed.is_empty() {
        return Err(SmilesError::Empty);
    }
    if trimmed.len() > MAX_SMILES_LEN {
        return Err(SmilesError::TooLong {
            length: trimmed.len(),
            limit: MAX_SMILES_LEN,
        });
    }

    let mut molecule = Parser::new(trimmed).parse()?;
    assign_hydrogens(&mut molecule)?;
    check_aromatic_atoms(&molecule)?;
    Ok(molecule)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BondSymbol {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
    Directional,
}

impl BondSymbol {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'-' => Some(Self::Single),
            b'=' => Some(Self::Double),
            b'#' => Some(Self::Triple),
            b'$' => Some(Self::Quadruple),
            b':' => Some(Self::Aromatic),
            b'/' | b'\\' => Some(Self::Directional),
            _ => None,
        }
    }

    fn order(self) -> BondOrder {
        match self {
            Self::Single | Self::Directional => BondOrder::Single,
            Self::Double => BondOrder::Double,
            Self::Triple => BondOrder::Triple,
            Self::Quadruple => BondOrder::Quadruple,
            Self::Aromatic => BondOrder::Aromatic,
        }
    }
}

struct RingOpening {
    atom: usize,
    bond: Option<BondSymbol>,
    position: usize,
}

struct BranchFrame {
    atom: usize,
    atoms_at_open: usize,
    position: usize,
}

struct Parser<'a> {
    text: &'a str,
    input: &'a [u8],
    pos: usize,
    molecule: Molecule,
    previous: Option<usize>,
    pending: Option<BondSymbol>,
    branches: Vec<BranchFrame>,
    rings: HashMap<u32, RingOpening>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            input: text.as_bytes(),
            pos: 0,
            molecule: Molecule::default(),
            previous: None,
            pending: None,
            branches: Vec::new(),
            rings: HashMap::new(),
        }
    }

    fn parse(mut self) -> Result<Molecule, SmilesError> {
        while self.pos < self.input.len() {
            let byte = self.input[self.pos];
            match byte {
                b'(' => self.open_branch()?,
                b')' => self.close_branch()?,
                b'0'..=b'9' | b'%' => self.ring_closure()?,
                b'.' => self.dot()?,
                b'[' => self.bracket_atom()?,
                b'*' | b'A'..=b'Z' | b'a'..=b'z' => self.organic_atom()?,
                _ => match BondSymbol::from_byte(byte) {
                    Some(symbol) => self.bond_symbol(symbol)?,
                    None => {
                        return Err(self.syntax(format!(
                            "unexpected character '{}'",
                            self.current_char()
                        )))
                    }
                },
            }
        }
        self.finish()
    }

    fn current_char(&self) -> char {
        self.text[self.pos..].chars().next().unwrap_or('?')
    }

    fn syntax(&self, message: impl Into<String>) -> SmilesError {
        SmilesError::Syntax {
            position: self.pos,
            message: message.into(),
        }
    }

    fn organic_atom(&mut self) -> Result<(), SmilesError> {
        let rest = &self.input[self.pos..];
        let (symbol, aromatic, len) = match rest {
            [b'C', b'l', ..] => ("Cl", false, 2),
            [b'B', b'r', ..] => ("Br", false, 2),
            [b'*', ..] => ("*", false, 1),
            [b'B', ..] => ("B", false, 1),
            [b'C', ..] => ("C", false, 1),
            [b'N', ..] => ("N", false, 1),
            [b'O', ..] => ("O", false, 1),
            [b'P', ..] => ("P", false, 1),
            [b'S', ..] => ("S", false, 1),
            [b'F', ..] => ("F", false, 1),
            [b'I', ..] => ("I", false, 1),
            [b'b', ..] => ("B", true, 1),
            [b'c', ..] => ("C", true, 1),
            [b'n', ..] => ("N", true, 1),
            [b'o', ..] => ("O", true, 1),
            [b'p', ..] => ("P", true, 1),
            [b's', ..] => ("S", true, 1),
            _ => {
                return Err(self.syntax(format!(
                    "unrecognized atom symbol '{}'",
                    self.current_char()
                )))
            }
        };
        let element = element_by_symbol(symbol).ok_or_else(|| SmilesError::UnknownElement {
            position: self.pos,
            symbol: symbol.to_string(),
        })?;
        self.pos += len;

        self.push_atom(Atom {
            element,
            aromatic,
            isotope: None,
            formal_charge: 0,
            hydrogens: 0,
            chirality: None,
            atom_class: None,
            bracket: false,
        })
    }

    fn bracket_atom(&mut self) -> Result<(), SmilesError> {
        let start = self.pos;
        let close = self.input[start..]
            .iter()
            .position(|&b| b == b']')
            .ok_or_else(|| self.syntax("unclosed bracket atom"))?;
        let body = &self.text[start + 1..start + close];
        let atom = parse_bracket(body, start)?;
        self.pos = start + close + 1;
        self.push_atom(atom)
    }

    fn push_atom(&mut self, atom: Atom) -> Result<(), SmilesError> {
        if self.molecule.atom_count() >= MAX_ATOMS {
            return Err(SmilesError::TooManyAtoms { limit: MAX_ATOMS });
        }
        let index = self.molecule.add_atom(atom);
        if let Some(previous) = self.previous {
            let symbol = self.pending.take();
            let order = self.resolve_order(symbol, previous, index);
            self.molecule.add_bond(previous, index, order);
        }
        self.previous = Some(index);
        Ok(())
    }

    fn resolve_order(&self, symbol: Option<BondSymbol>, a: usize, b: usize) -> BondOrder {
        match symbol {
            Some(symbol) => symbol.order(),
            None if self.molecule.atom(a).aromatic && self.molecule.atom(b).aromatic => {
                BondOrder::Aromatic
            }
            None => BondOrder::Single,
        }
    }

    fn bond_symbol(&mut self, symbol: BondSymbol) -> Result<(), SmilesError> {
        if self.previous.is_none() {
            return Err(self.syntax("bond symbol with no preceding atom"));
        }
        if self.pending.is_some() {
            return Err(self.syntax("consecutive bond symbols"));
        }
        self.pending = Some(symbol);
        self.pos += 1;
        Ok(())
    }

    fn open_branch(&mut self) -> Result<(), SmilesError> {
        let atom = self
            .previous
            .ok_or_else(|| self.syntax("branch opened without a preceding atom"))?;
        if self.pending.is_some() {
            return Err(self.syntax("bond symbol before branch"));
        }
        self.branches.push(BranchFrame {
            atom,
            atoms_at_open: self.molecule.atom_count(),
            position: self.pos,
        });
        self.pos += 1;
        Ok(())
    }

    fn close_branch(&mut self) -> Result<(), SmilesError> {
        let frame = self
            .branches
            .pop()
            .ok_or_else(|| self.syntax("unmatched ')'"))?;
        if self.pending.is_some() {
            return Err(self.syntax("dangling bond in branch"));
        }
        if self.molecule.atom_count() == frame.atoms_at_open {
            return Err(self.syntax("empty branch"));
        }
        self.previous = Some(frame.atom);
        self.pos += 1;
        Ok(())
    }

    fn ring_closure(&mut self) -> Result<(), SmilesError> {
        let position = self.pos;
        let number = if self.input[self.pos] == b'%' {
            match self.input.get(self.pos + 1..self.pos + 3) {
                Some([tens, ones]) if tens.is_ascii_digit() && ones.is_ascii_digit() => {
                    self.pos += 3;
                    u32::from(tens - b'0') * 10 + u32::from(ones - b'0')
                }
                _ => return Err(self.syntax("expected two digits after '%'")),
            }
        } else {
            self.pos += 1;
            u32::from(self.input[position] - b'0')
        };

        let atom = self.previous.ok_or_else(|| SmilesError::Syntax {
            position,
            message: "ring closure with no preceding atom".to_string(),
        })?;
        let bond = self.pending.take();

        let Some(opening) = self.rings.remove(&number) else {
            self.rings.insert(
                number,
                RingOpening {
                    atom,
                    bond,
                    position,
                },
            );
            return Ok(());
        };

        let fail = |message: String| SmilesError::Syntax { position, message };
        if opening.atom == atom {
            return Err(fail(format!("ring closure {number} bonds an atom to itself")));
        }
        if self.molecule.bond_between(opening.atom, atom).is_some() {
            return Err(fail(format!("duplicate bond via ring closure {number}")));
        }
        let symbol = match (opening.bond, bond) {
            (Some(a), Some(b)) if a.order() != b.order() => {
                return Err(fail(format!(
                    "conflicting bond symbols for ring closure {number}"
                )))
            }
            (a, b) => a.or(b),
        };
        let order = self.resolve_order(symbol, opening.atom, atom);
        self.molecule.add_bond(opening.atom, atom, order);
        Ok(())
    }

    fn dot(&mut self) -> Result<(), SmilesError> {
        if self.previous.is_none() {
            return Err(self.syntax("'.' with no preceding atom"));
        }
        if self.pending.is_some() {
            return Err(self.syntax("bond symbol before '.'"));
        }
        self.previous = None;
        self.pos += 1;
        Ok(())
    }

    fn finish(self) -> Result<Molecule, SmilesError> {
        if self.pending.is_some() {
            return Err(self.syntax("dangling bond at end of input"));
        }
        if let Some(frame) = self.branches.last() {
            return Err(SmilesError::Syntax {
                position: frame.position,
                message: "unclosed branch".to_string(),
            });
        }
        if let Some((number, opening)) = self.rings.iter().min_by_key(|(_, o)| o.position) {
            return Err(SmilesError::Syntax {
                position: opening.position,
                message: format!("unclosed ring bond {number}"),
            });
        }
        if self.molecule.atom_count() == 0 {
            return Err(SmilesError::Empty);
        }
        Ok(self.molecule)
    }
}

/// Parse the text between `[` and `]`.
fn parse_bracket(body: &str, position: usize) -> Result<Atom, SmilesError> {
    let fail = |message: String| SmilesError::Syntax { position, message };
    let bytes = body.as_bytes();
    let mut i = 0;

    if bytes.is_empty() {
        return Err(fail("empty bracket atom".to_string()));
    }

    let isotope_digits = take_digits(bytes, &mut i);
    let isotope = match isotope_digits {
        Some(value) => Some(
            u16::try_from(value).map_err(|_| fail(format!("isotope {value} out of range")))?,
        ),
        None => None,
    };

    let (symbol, aromatic) = match bytes.get(i..) {
        Some([b'*', ..]) => ("*".to_string(), false),
        Some([b's', b'e', ..]) => ("Se".to_string(), true),
        Some([b'a', b's', ..]) => ("As".to_string(), true),
        Some([first, second, ..]) if first.is_ascii_uppercase() && second.is_ascii_lowercase() => {
            (format!("{}{}", *first as char, *second as char), false)
        }
        Some([first, ..]) if first.is_ascii_uppercase() => ((*first as char).to_string(), false),
        Some([first, ..]) if b"bcnops".contains(first) => {
            ((first.to_ascii_uppercase() as char).to_string(), true)
        }
        _ => return Err(fail(format!("missing element symbol in '[{body}]'"))),
    };
    let element = element_by_symbol(&symbol).ok_or_else(|| SmilesError::UnknownElement {
        position,
        symbol: symbol.clone(),
    })?;
    i += if symbol == "*" { 1 } else { symbol.len() };

    let mut chirality = None;
    if bytes.get(i) == Some(&b'@') {
        i += 1;
        chirality = Some(Chirality::AntiClockwise);
        if bytes.get(i) == Some(&b'@') {
            i += 1;
            chirality = Some(Chirality::Clockwise);
        }
    }

    let mut hydrogens = 0u8;
    if bytes.get(i) == Some(&b'H') {
        i += 1;
        hydrogens = match take_digits(bytes, &mut i) {
            Some(count) => u8::try_from(count)
                .map_err(|_| fail(format!("hydrogen count {count} out of range")))?,
            None => 1,
        };
    }

    let mut formal_charge = 0i8;
    if let Some(&sign) = bytes.get(i).filter(|b| **b == b'+' || **b == b'-') {
        i += 1;
        let unit: i8 = if sign == b'+' { 1 } else { -1 };
        let magnitude = match take_digits(bytes, &mut i) {
            Some(value) => value,
            None => {
                let mut repeats = 1;
                while bytes.get(i) == Some(&sign) {
                    repeats += 1;
                    i += 1;
                }
                repeats
            }
        };
        let magnitude =
            i8::try_from(magnitude).map_err(|_| fail(format!("charge {magnitude} out of range")))?;
        formal_charge = unit * magnitude;
    }

    let mut atom_class = None;
    if bytes.get(i) == Some(&b':') {
        i += 1;
        atom_class = Some(
            take_digits(bytes, &mut i)
                .ok_or_else(|| fail("expected atom class digits after ':'".to_string()))?,
        );
    }

    if i != bytes.len() {
        return Err(fail(format!(
            "unexpected '{}' in bracket atom '[{body}]'",
            &body[i..]
        )));
    }

    Ok(Atom {
        element,
        aromatic,
        isotope,
        formal_charge,
        hydrogens,
        chirality,
        atom_class,
        bracket: true,
    })
}

fn take_digits(bytes: &[u8], i: &mut usize) -> Option<u32> {
    let start = *i;
    while bytes.get(*i).is_some_and(u8::is_ascii_digit) {
        *i += 1;
    }
    if *i == start {
        return None;
    }
    bytes[start..*i]
        .iter()
        .try_fold(0u32, |acc, d| acc.checked_mul(10)?.checked_add(u32::from(d - b'0')))
}

/// Fill implicit hydrogens on organic-subset atoms and enforce valence limits.
fn assign_hydrogens(molecule: &mut Molecule) -> Result<(), SmilesError> {
    for index in 0..molecule.atom_count() {
        let atom = molecule.atom(index);
        if atom.bracket || atom.element.is_wildcard() {
            continue;
        }

        let valences = atom.element.default_valences;
        let valence = molecule.explicit_valence(index);
        let max = valences.last().copied().map(u32::from).unwrap_or(0);
        if valence > max {
            return Err(SmilesError::Valence {
                atom: index,
                symbol: atom.element.symbol,
                valence,
            });
        }

        let hydrogens = if atom.aromatic {
            let aromatic_bonds = molecule
                .neighbors(index)
                .filter(|n| n.order == BondOrder::Aromatic)
                .count();
            let has_double = molecule.has_bond(index, BondOrder::Double);
            let donates_pi = matches!(atom.atomic_number(), 5 | 6 | 7 | 15);
            let pi = u32::from(aromatic_bonds >= 2 && !has_double && donates_pi);
            u32::from(valences[0]).saturating_sub(valence + pi)
        } else {
            valences
                .iter()
                .map(|&v| u32::from(v))
                .find(|&v| v >= valence)
                .map(|v| v - valence)
                .unwrap_or(0)
        };
        // Bounded by the largest default valence.
        molecule.atom_mut(index).hydrogens = u8::try_from(hydrogens).unwrap_or(u8::MAX);
    }
    Ok(())
}

fn check_aromatic_atoms(molecule: &Molecule) -> Result<(), SmilesError> {
    let ring = molecule.ring_bonds();
    for (index, atom) in molecule.atoms().enumerate() {
        if atom.aromatic && !molecule.neighbors(index).any(|n| ring[n.bond]) {
            return Err(SmilesError::AromaticOutsideRing {
                atom: index,
                symbol: atom.element.symbol,
            });
        }
    }
    Ok(())
}
