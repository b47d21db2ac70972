//! Fixed-column connection-table (MDL molfile V2000) reader.
//!
//! Only the header, counts line, atom block and bond block are read; the
//! properties block and any SDF data items after the bond block are ignored.
//!
//! Individual atom and bond records that are missing or malformed are
//! skipped rather than failing the whole parse. Exported files are
//! occasionally truncated, and a partially-good conformer is still worth
//! rendering.

use std::fmt;

use glam::DVec3;

use super::{Atom, Bond, Molecule};

/// Number of header lines before the counts line (name, program, comment).
const HEADER_LINES: usize = 3;

/// Errors returned by [`parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer than four lines, so there is no counts line.
    TooShort,
    /// The counts line declares zero (or an unreadable number of) atoms.
    NoAtoms,
    /// Atoms were declared but none of the atom records could be read.
    NoValidAtoms,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => {
                write!(f, "structure text has fewer than 4 lines")
            }
            Self::NoAtoms => write!(f, "counts line declares no atoms"),
            Self::NoValidAtoms => write!(f, "no valid atom records found"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse connection-table text into a [`Molecule`].
///
/// Bond endpoints are converted from 1-based to 0-based indices but are not
/// checked against the atom list.
///
/// # Errors
///
/// See [`ParseError`]. Malformed individual records never produce an error.
pub fn parse(text: &str) -> Result<Molecule, ParseError> {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    if lines.len() < HEADER_LINES + 1 {
        return Err(ParseError::TooShort);
    }

    let counts = lines[HEADER_LINES];
    let atom_count = leading_int(column(counts, 0, 3)).unwrap_or(0);
    let bond_count = leading_int(column(counts, 3, 6)).unwrap_or(0);
    if atom_count <= 0 {
        return Err(ParseError::NoAtoms);
    }
    let atom_count = atom_count as usize;
    let bond_count = bond_count.max(0) as usize;

    let atom_start = HEADER_LINES + 1;
    let mut atoms = Vec::with_capacity(atom_count);
    for line_idx in atom_start..atom_start + atom_count {
        match lines.get(line_idx).and_then(|l| parse_atom_line(l)) {
            Some(atom) => atoms.push(atom),
            None => log::debug!("skipping atom record on line {}", line_idx + 1),
        }
    }

    // The bond block follows the declared atom block even when some atom
    // records were skipped.
    let bond_start = atom_start + atom_count;
    let mut bonds = Vec::with_capacity(bond_count);
    for line_idx in bond_start..bond_start + bond_count {
        match lines.get(line_idx).and_then(|l| parse_bond_line(l)) {
            Some(bond) => bonds.push(bond),
            None => log::debug!("skipping bond record on line {}", line_idx + 1),
        }
    }

    if atoms.is_empty() {
        return Err(ParseError::NoValidAtoms);
    }

    log::debug!(
        "parsed connection table: {} atoms ({} declared), {} bonds ({} declared)",
        atoms.len(),
        atom_count,
        bonds.len(),
        bond_count
    );
    Ok(Molecule::new(atoms, bonds))
}

/// `xxxxx.xxxxyyyyy.yyyyzzzzz.zzzz aaa...`
fn parse_atom_line(line: &str) -> Option<Atom> {
    let x = leading_float(column(line, 0, 10))?;
    let y = leading_float(column(line, 10, 20))?;
    let z = leading_float(column(line, 20, 30))?;
    if !(x.is_finite() && y.is_finite() && z.is_finite()) {
        return None;
    }
    let element = column(line, 31, 34).trim();
    if element.is_empty() {
        return None;
    }
    Some(Atom::new(element, DVec3::new(x, y, z)))
}

/// `111222ttt...`
fn parse_bond_line(line: &str) -> Option<Bond> {
    let start = leading_int(column(line, 0, 3))?;
    let end = leading_int(column(line, 3, 6))?;
    let order = leading_int(column(line, 6, 9))
        .and_then(|o| u8::try_from(o).ok())
        .unwrap_or(1);
    Some(Bond::new(to_index(start), to_index(end), order))
}

/// 1-based file index to 0-based list index, clamped at zero.
fn to_index(one_based: i64) -> usize {
    (one_based - 1).max(0) as usize
}

/// Byte columns `[start, end)` clamped to the line. Ranges that would split a
/// multi-byte character yield an empty field.
fn column(line: &str, start: usize, end: usize) -> &str {
    let len = line.len();
    line.get(start.min(len)..end.min(len)).unwrap_or("")
}

/// Parse the leading integer of a trimmed field (`"12ab"` reads as 12).
fn leading_int(field: &str) -> Option<i64> {
    let s = field.trim();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    s[..end].parse().ok()
}

/// Parse the leading decimal number of a trimmed field, accepting an
/// optional fraction and exponent (`"1.5e2xyz"` reads as 150).
fn leading_float(field: &str) -> Option<f64> {
    let s = field.trim();
    let bytes = s.as_bytes();
    let is_digit = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_digit);

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let mut saw_digit = false;
    while is_digit(end) {
        end += 1;
        saw_digit = true;
    }
    if bytes.get(end) == Some(&b'.') {
        end += 1;
        while is_digit(end) {
            end += 1;
            saw_digit = true;
        }
    }
    if !saw_digit {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        if is_digit(exp_end) {
            while is_digit(exp_end) {
                exp_end += 1;
            }
            end = exp_end;
        }
    }
    s[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HYDROGEN: &str = "Title\nComment\nComment\n  2  1  0  0  0  0  0  0  0  0999 V2000\n    0.0000    0.0000    0.0000 H   0  0\n    1.0000    0.0000    0.0000 H   0  0\n  1  2  1  0\n";

    const ETHANOL: &str = "\
702
  -OEChem-10172612003D

  9  8  0     0  0  0  0  0  0999 V2000
    1.1879   -0.3829    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
   -0.0101    0.4247    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
   -1.2098   -0.4949    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
   -0.0412    1.0683    0.8777 H   0  0  0  0  0  0  0  0  0  0  0  0
   -0.0412    1.0683   -0.8777 H   0  0  0  0  0  0  0  0  0  0  0  0
   -1.1704   -1.1366    0.8834 H   0  0  0  0  0  0  0  0  0  0  0  0
   -2.1427    0.0725    0.0000 H   0  0  0  0  0  0  0  0  0  0  0  0
   -1.1704   -1.1366   -0.8834 H   0  0  0  0  0  0  0  0  0  0  0  0
    1.9753    0.1852    0.0000 H   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0  0  0  0
  1  9  1  0  0  0  0
  2  3  1  0  0  0  0
  2  4  1  0  0  0  0
  2  5  1  0  0  0  0
  3  6  1  0  0  0  0
  3  7  1  0  0  0  0
  3  8  1  0  0  0  0
M  END
$$$$
";

    #[test]
    fn hydrogen_molecule() {
        let mol = parse(HYDROGEN).unwrap();
        assert_eq!(mol.atom_count(), 2);
        assert_eq!(mol.atoms[0].element, "H");
        assert_eq!(mol.atoms[1].element, "H");
        assert_eq!(mol.atoms[1].position, DVec3::new(1.0, 0.0, 0.0));
        assert_eq!(mol.bonds, vec![Bond::new(0, 1, 1)]);
    }

    #[test]
    fn well_formed_file_keeps_counts_and_order() {
        let mol = parse(ETHANOL).unwrap();
        assert_eq!(mol.atom_count(), 9);
        assert_eq!(mol.bond_count(), 8);
        let elements: Vec<&str> =
            mol.atoms.iter().map(|a| a.element.as_str()).collect();
        assert_eq!(elements, ["O", "C", "C", "H", "H", "H", "H", "H", "H"]);
        assert_eq!(mol.bonds[1], Bond::new(0, 8, 1));
        assert_eq!(mol.bonds[7], Bond::new(2, 7, 1));
        assert!((mol.atoms[0].position.x - 1.1879).abs() < 1e-12);
    }

    #[test]
    fn crlf_line_endings() {
        let crlf = HYDROGEN.replace('\n', "\r\n");
        let mol = parse(&crlf).unwrap();
        assert_eq!(mol.atom_count(), 2);
        assert_eq!(mol.bond_count(), 1);
    }

    #[test]
    fn empty_input_is_too_short() {
        assert_eq!(parse(""), Err(ParseError::TooShort));
        assert_eq!(parse("a\nb\nc"), Err(ParseError::TooShort));
    }

    #[test]
    fn zero_or_blank_atom_count() {
        assert_eq!(parse("t\n\n\n  0  0\n"), Err(ParseError::NoAtoms));
        assert_eq!(parse("t\n\n\n      \n"), Err(ParseError::NoAtoms));
        assert_eq!(parse("t\n\n\nabcdef\n"), Err(ParseError::NoAtoms));
        assert_eq!(parse("t\n\n\n -3  0\n"), Err(ParseError::NoAtoms));
    }

    #[test]
    fn declared_atoms_but_none_readable() {
        let text = "t\n\n\n  2  0\n    garbage\n          \n";
        assert_eq!(parse(text), Err(ParseError::NoValidAtoms));
        // Atom block missing entirely.
        assert_eq!(parse("t\n\n\n  3  0"), Err(ParseError::NoValidAtoms));
    }

    #[test]
    fn malformed_atom_lines_are_skipped() {
        let text = "\
t


  4  0
    0.0000    0.0000    0.0000 C   0  0
    abcdef    0.0000    0.0000 C   0  0
    1.0000    0.0000    0.0000
    2.0000    0.0000    0.0000 O   0  0
";
        let mol = parse(text).unwrap();
        let elements: Vec<&str> =
            mol.atoms.iter().map(|a| a.element.as_str()).collect();
        assert_eq!(elements, ["C", "O"]);
    }

    #[test]
    fn fewer_atom_lines_than_declared() {
        let text = "\
t


  5  2
    0.0000    0.0000    0.0000 C   0  0
    1.5000    0.0000    0.0000 C   0  0
";
        let mol = parse(text).unwrap();
        assert_eq!(mol.atom_count(), 2);
        // Bond block would start after five atom lines; nothing is there.
        assert_eq!(mol.bond_count(), 0);
    }

    #[test]
    fn malformed_bond_lines_are_skipped() {
        let text = "\
t


  2  3
    0.0000    0.0000    0.0000 C   0  0
    1.5000    0.0000    0.0000 O   0  0
  1  2  2  0
 xx  2  1  0
";
        let mol = parse(text).unwrap();
        assert_eq!(mol.bonds, vec![Bond::new(0, 1, 2)]);
    }

    #[test]
    fn bond_order_defaults_and_clamps() {
        let text = "\
t


  2  4
    0.0000    0.0000    0.0000 C   0  0
    1.5000    0.0000    0.0000 C   0  0
  1  2
  1  2  4  0
  1  2  0  0
  0  2  3  0
";
        let mol = parse(text).unwrap();
        let orders: Vec<u8> = mol.bonds.iter().map(|b| b.order).collect();
        assert_eq!(orders, [1, 1, 1, 3]);
        // A zero file index clamps to the first atom.
        assert_eq!(mol.bonds[3].start, 0);
        assert_eq!(mol.bonds[3].end, 1);
    }

    #[test]
    fn out_of_range_bonds_are_kept_by_the_parser() {
        let text = "\
t


  2  1
    0.0000    0.0000    0.0000 C   0  0
    1.5000    0.0000    0.0000 C   0  0
  1  7  1  0
";
        let mol = parse(text).unwrap();
        assert_eq!(mol.bonds, vec![Bond::new(0, 6, 1)]);
    }

    #[test]
    fn two_letter_elements() {
        let text = "\
t


  2  0
    0.0000    0.0000    0.0000 Na  0  0
    2.3600    0.0000    0.0000 Cl  0  0
";
        let mol = parse(text).unwrap();
        assert_eq!(mol.atoms[0].element, "Na");
        assert_eq!(mol.atoms[1].element, "Cl");
    }

    #[test]
    fn column_helpers() {
        assert_eq!(column("abc", 1, 10), "bc");
        assert_eq!(column("abc", 5, 10), "");
        assert_eq!(column("é", 1, 2), "");
        assert_eq!(leading_int("  12ab"), Some(12));
        assert_eq!(leading_int("-4"), Some(-4));
        assert_eq!(leading_int("x1"), None);
        assert_eq!(leading_int(""), None);
        assert_eq!(leading_float(" -1.25 "), Some(-1.25));
        assert_eq!(leading_float("1.5e2xyz"), Some(150.0));
        assert_eq!(leading_float("3e"), Some(3.0));
        assert_eq!(leading_float(".5"), Some(0.5));
        assert_eq!(leading_float("."), None);
        assert_eq!(leading_float("nan"), None);
    }
}
