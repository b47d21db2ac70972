//! Molecule data model and connection-table ingestion.
//!
//! A [`Molecule`] is an ordered atom list plus an ordered bond list. Bonds
//! refer to atoms by 0-based list index. Molecules are produced fresh by
//! [`parse`] and never mutated afterwards; loading a new structure discards
//! the old molecule entirely.

pub mod element;
pub mod library;
mod parser;

use glam::DVec3;
pub use parser::{parse, ParseError};

/// A single atom: element symbol plus position in file-native units (Å).
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// 1-2 letter element symbol as written in the file (e.g. `"C"`, `"Cl"`).
    pub element: String,
    /// Cartesian position.
    pub position: DVec3,
}

impl Atom {
    /// Create an atom from an element symbol and position.
    #[must_use]
    pub fn new(element: impl Into<String>, position: DVec3) -> Self {
        Self {
            element: element.into(),
            position,
        }
    }
}

/// A bond between two atoms, referenced by 0-based index.
///
/// Indices are not checked against the atom list at construction time;
/// consumers must treat out-of-range endpoints as droppable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bond {
    /// Index of the first atom.
    pub start: usize,
    /// Index of the second atom.
    pub end: usize,
    /// Bond order in `1..=3`.
    pub order: u8,
}

impl Bond {
    /// Create a bond, normalizing the order: 0 and anything above 3 become
    /// a single bond.
    #[must_use]
    pub fn new(start: usize, end: usize, order: u8) -> Self {
        Self {
            start,
            end,
            order: normalize_order(order),
        }
    }

    /// Whether both endpoints index into a list of `atom_count` atoms.
    #[must_use]
    pub fn is_within(&self, atom_count: usize) -> bool {
        self.start < atom_count && self.end < atom_count
    }

    /// Whether the bond connects an atom to itself.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }
}

fn normalize_order(order: u8) -> u8 {
    match order {
        1..=3 => order,
        _ => 1,
    }
}

/// A single-conformer molecule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Molecule {
    /// Atoms in file order.
    pub atoms: Vec<Atom>,
    /// Bonds in file order.
    pub bonds: Vec<Bond>,
}

impl Molecule {
    /// Assemble a molecule from parsed atoms and bonds.
    #[must_use]
    pub fn new(atoms: Vec<Atom>, bonds: Vec<Bond>) -> Self {
        Self { atoms, bonds }
    }

    /// A molecule is renderable once it has at least one atom. Bondless
    /// molecules (monoatomic species, ion pairs) are valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.atoms.is_empty()
    }

    /// Number of atoms.
    #[must_use]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Number of bonds, including any with out-of-range endpoints.
    #[must_use]
    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    /// Atom positions in file order.
    pub fn positions(&self) -> impl Iterator<Item = DVec3> + '_ {
        self.atoms.iter().map(|a| a.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bond_order_normalization() {
        assert_eq!(Bond::new(0, 1, 2).order, 2);
        assert_eq!(Bond::new(0, 1, 3).order, 3);
        assert_eq!(Bond::new(0, 1, 0).order, 1);
        assert_eq!(Bond::new(0, 1, 4).order, 1);
        assert_eq!(Bond::new(0, 1, 9).order, 1);
    }

    #[test]
    fn bond_range_checks() {
        let bond = Bond::new(0, 2, 1);
        assert!(bond.is_within(3));
        assert!(!bond.is_within(2));
        assert!(Bond::new(1, 1, 1).is_degenerate());
    }

    #[test]
    fn empty_molecule_is_invalid() {
        assert!(!Molecule::default().is_valid());
        let single = Molecule::new(vec![Atom::new("Na", DVec3::ZERO)], vec![]);
        assert!(single.is_valid());
        assert_eq!(single.bond_count(), 0);
    }
}
