//! Molecule → renderable primitive descriptors.
//!
//! [`build`] is a pure transformation: it centers the molecule on its
//! centroid, scales it into display units, resolves per-element radius and
//! color, and emits one sphere per atom plus cylinders or line segments per
//! bond. No GPU objects are created here; the scene lifecycle manager turns
//! these descriptors into meshes.

use glam::{DVec3, Quat, Vec3};

use crate::options::DisplayStyle;
use crate::structure::{element, Bond, Molecule};

/// Scale applied to centered file coordinates before bounding-box
/// normalization.
pub const POSITION_SCALE: f64 = 0.55;

/// Base bond cylinder radius before the style factor.
pub const BOND_RADIUS: f32 = 0.08;

/// Perpendicular distance between parallel cylinders of a multiple bond.
pub const MULTI_BOND_OFFSET: f32 = 0.12;

/// One atom sphere.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomSphere {
    /// Element symbol, used as the geometry/material cache key.
    pub element: String,
    /// Centered, scaled position.
    pub position: Vec3,
    /// Style-adjusted radius.
    pub radius: f32,
    /// Linear RGB color.
    pub color: [f32; 3],
}

/// A bond cylinder. The unit cylinder's +Y axis is rotated onto the bond
/// direction by `orientation`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cylinder {
    /// Index of the source bond in [`Molecule::bonds`].
    pub bond_index: usize,
    /// 0 for the base cylinder, 1.. for offset siblings of a multiple bond.
    pub sibling: u8,
    /// Start endpoint (display units).
    pub start: Vec3,
    /// End endpoint (display units).
    pub end: Vec3,
    /// Midpoint of `start` and `end`.
    pub center: Vec3,
    /// Display length (after [`POSITION_SCALE`]).
    pub length: f32,
    /// Distance between the bonded atoms in file units.
    pub source_length: f32,
    /// Cylinder radius.
    pub radius: f32,
    /// Rotation taking +Y onto the start→end direction.
    pub orientation: Quat,
}

/// A wireframe bond.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    /// Index of the source bond in [`Molecule::bonds`].
    pub bond_index: usize,
    /// Start endpoint (display units).
    pub start: Vec3,
    /// End endpoint (display units).
    pub end: Vec3,
}

/// A single bond primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum BondPrimitive {
    /// Stick and spacefill bonds.
    Cylinder(Cylinder),
    /// Wireframe bonds.
    Line(LineSegment),
}

/// Everything needed to build the molecule's scene group.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderableGeometry {
    /// Style the primitives were built for.
    pub style: DisplayStyle,
    /// One sphere per atom, in atom order.
    pub atoms: Vec<AtomSphere>,
    /// Bond primitives in bond order; siblings follow their base cylinder.
    pub bonds: Vec<BondPrimitive>,
}

impl RenderableGeometry {
    /// Number of cylinder primitives, siblings included.
    #[must_use]
    pub fn cylinder_count(&self) -> usize {
        self.bonds
            .iter()
            .filter(|b| matches!(b, BondPrimitive::Cylinder(_)))
            .count()
    }

    /// Number of line primitives.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.bonds
            .iter()
            .filter(|b| matches!(b, BondPrimitive::Line(_)))
            .count()
    }

    /// Cylinders only.
    pub fn cylinders(&self) -> impl Iterator<Item = &Cylinder> {
        self.bonds.iter().filter_map(|b| match b {
            BondPrimitive::Cylinder(c) => Some(c),
            BondPrimitive::Line(_) => None,
        })
    }
}

/// Arithmetic mean of `positions`; the origin for an empty slice.
#[must_use]
pub fn centroid(positions: &[DVec3]) -> DVec3 {
    if positions.is_empty() {
        return DVec3::ZERO;
    }
    positions.iter().copied().sum::<DVec3>() / positions.len() as f64
}

/// Convert a molecule into primitives for `style`.
///
/// Bonds with an endpoint outside the atom list are skipped.
#[must_use]
pub fn build(molecule: &Molecule, style: DisplayStyle) -> RenderableGeometry {
    let raw: Vec<DVec3> = molecule.positions().collect();
    let center = centroid(&raw);
    let display: Vec<Vec3> = raw
        .iter()
        .map(|p| ((*p - center) * POSITION_SCALE).as_vec3())
        .collect();

    let atoms = molecule
        .atoms
        .iter()
        .zip(&display)
        .map(|(atom, &position)| AtomSphere {
            element: atom.element.clone(),
            position,
            radius: element::radius(&atom.element) * style.atom_radius_factor(),
            color: element::color_rgb(&atom.element),
        })
        .collect();

    let mut bonds = Vec::with_capacity(molecule.bond_count());
    for (bond_index, bond) in molecule.bonds.iter().enumerate() {
        if !bond.is_within(display.len()) {
            log::debug!(
                "dropping bond {bond_index} ({} -> {}): endpoint out of range for {} atoms",
                bond.start,
                bond.end,
                display.len()
            );
            continue;
        }
        let start = display[bond.start];
        let end = display[bond.end];

        if style.uses_lines() {
            bonds.push(BondPrimitive::Line(LineSegment {
                bond_index,
                start,
                end,
            }));
        } else {
            let source_length = raw[bond.start].distance(raw[bond.end]) as f32;
            push_cylinders(
                &mut bonds,
                bond_index,
                bond,
                [start, end],
                source_length,
                BOND_RADIUS * style.bond_radius_factor(),
            );
        }
    }

    RenderableGeometry {
        style,
        atoms,
        bonds,
    }
}

/// Push the base cylinder and `order - 1` offset siblings. Siblings
/// alternate sides: even sibling index on the positive side, odd on the
/// negative side.
fn push_cylinders(
    out: &mut Vec<BondPrimitive>,
    bond_index: usize,
    bond: &Bond,
    endpoints: [Vec3; 2],
    source_length: f32,
    radius: f32,
) {
    let [start, end] = endpoints;
    let axis = end - start;
    let direction = axis.normalize_or_zero();
    let orientation = if direction == Vec3::ZERO {
        Quat::IDENTITY
    } else {
        Quat::from_rotation_arc(Vec3::Y, direction)
    };
    // Zero when the bond is parallel to +Y; the siblings then overlap the
    // base cylinder.
    let offset = axis.cross(Vec3::Y).normalize_or_zero() * MULTI_BOND_OFFSET;

    for sibling in 0..bond.order {
        let shift = match sibling {
            0 => Vec3::ZERO,
            i if i % 2 == 0 => offset,
            _ => -offset,
        };
        let (s, e) = (start + shift, end + shift);
        out.push(BondPrimitive::Cylinder(Cylinder {
            bond_index,
            sibling,
            start: s,
            end: e,
            center: (s + e) * 0.5,
            length: axis.length(),
            source_length,
            radius,
            orientation,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{parse, Atom};

    const HYDROGEN: &str = "Title\nComment\nComment\n  2  1  0  0  0  0  0  0  0  0999 V2000\n    0.0000    0.0000    0.0000 H   0  0\n    1.0000    0.0000    0.0000 H   0  0\n  1  2  1  0\n";

    fn diatomic(order: u8, b: DVec3) -> Molecule {
        Molecule::new(
            vec![Atom::new("C", DVec3::ZERO), Atom::new("O", b)],
            vec![Bond::new(0, 1, order)],
        )
    }

    #[test]
    fn hydrogen_stick_geometry() {
        let mol = parse(HYDROGEN).unwrap();
        let geo = build(&mol, DisplayStyle::Stick);
        assert_eq!(geo.atoms.len(), 2);
        assert_eq!(geo.cylinder_count(), 1);
        let cyl = geo.cylinders().next().unwrap();
        assert!((cyl.source_length - 1.0).abs() < 1e-6);
        assert!((cyl.length - 0.55).abs() < 1e-6);
        assert!(cyl.center.length() < 1e-6);
        assert!((cyl.radius - 0.056).abs() < 1e-6);
        // Bond runs along +X; the cylinder's +Y must be rotated onto it.
        assert!((cyl.orientation * Vec3::Y - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn display_positions_are_centered() {
        let mol = parse(
            "\
t


  4  0
    1.0000    2.0000    3.0000 C   0  0
    4.0000   -2.0000    0.5000 N   0  0
   -7.2500    9.0000   11.0000 O   0  0
  100.0000   50.0000  -25.0000 S   0  0
",
        )
        .unwrap();
        let geo = build(&mol, DisplayStyle::Spacefill);
        let sum: Vec3 = geo.atoms.iter().map(|a| a.position).sum();
        assert!((sum / geo.atoms.len() as f32).length() < 1e-4);
    }

    #[test]
    fn centroid_of_points() {
        assert_eq!(centroid(&[]), DVec3::ZERO);
        let c = centroid(&[DVec3::new(0.0, 0.0, 0.0), DVec3::new(2.0, 4.0, -6.0)]);
        assert_eq!(c, DVec3::new(1.0, 2.0, -3.0));
    }

    #[test]
    fn multiple_bonds_add_offset_siblings() {
        let x = DVec3::new(1.2, 0.0, 0.0);
        let double = build(&diatomic(2, x), DisplayStyle::Stick);
        assert_eq!(double.cylinder_count(), 2);
        let triple = build(&diatomic(3, x), DisplayStyle::Stick);
        assert_eq!(triple.cylinder_count(), 3);

        let cyl: Vec<&Cylinder> = triple.cylinders().collect();
        assert_eq!(cyl[0].sibling, 0);
        // X × Y = +Z: sibling 1 goes negative, sibling 2 positive.
        assert!((cyl[1].center.z + MULTI_BOND_OFFSET).abs() < 1e-6);
        assert!((cyl[2].center.z - MULTI_BOND_OFFSET).abs() < 1e-6);
        assert_eq!(cyl[1].length, cyl[0].length);
    }

    #[test]
    fn spacefill_and_wireframe_radii() {
        let x = DVec3::new(1.2, 0.0, 0.0);
        let space = build(&diatomic(1, x), DisplayStyle::Spacefill);
        assert!((space.atoms[0].radius - 0.40 * 1.15).abs() < 1e-6);
        assert!((space.cylinders().next().unwrap().radius - 0.072).abs() < 1e-6);

        let wire = build(&diatomic(3, x), DisplayStyle::Wireframe);
        assert!((wire.atoms[1].radius - 0.36 * 0.9).abs() < 1e-6);
        assert_eq!(wire.line_count(), 1);
        assert_eq!(wire.cylinder_count(), 0);
    }

    #[test]
    fn bond_parallel_to_up_does_not_panic() {
        let geo = build(&diatomic(2, DVec3::new(0.0, 1.5, 0.0)), DisplayStyle::Stick);
        let cyl: Vec<&Cylinder> = geo.cylinders().collect();
        assert_eq!(cyl.len(), 2);
        assert_eq!(cyl[0].center, cyl[1].center);
        assert!((cyl[0].orientation * Vec3::Y - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn degenerate_bond_is_zero_length() {
        let mol = Molecule::new(
            vec![Atom::new("C", DVec3::ZERO)],
            vec![Bond::new(0, 0, 1)],
        );
        let geo = build(&mol, DisplayStyle::Stick);
        let cyl = geo.cylinders().next().unwrap();
        assert_eq!(cyl.length, 0.0);
        assert_eq!(cyl.orientation, Quat::IDENTITY);
    }

    #[test]
    fn unknown_elements_use_fallbacks() {
        let mol = Molecule::new(vec![Atom::new("Xe", DVec3::ONE)], vec![]);
        let geo = build(&mol, DisplayStyle::Stick);
        assert_eq!(geo.atoms[0].radius, element::FALLBACK_RADIUS);
        assert_eq!(
            geo.atoms[0].color,
            element::hex_to_rgb(element::FALLBACK_COLOR)
        );
        assert!(geo.bonds.is_empty());
        assert_eq!(geo.atoms[0].position, Vec3::ZERO);
    }

    #[test]
    fn bonds_into_missing_atoms_are_dropped() {
        let text = "\
t


  5  3
    0.0000    0.0000    0.0000 C   0  0
    1.5000    0.0000    0.0000 C   0  0
    garbage
    1.5000
              0.0000    0.0000 C   0  0
  1  2  1  0
  1  4  1  0
  3  5  2  0
";
        let mol = parse(text).unwrap();
        assert_eq!(mol.atom_count(), 2);
        assert_eq!(mol.bond_count(), 3);

        let geo = build(&mol, DisplayStyle::Stick);
        assert_eq!(geo.cylinder_count(), 1);
        assert_eq!(geo.cylinders().next().unwrap().bond_index, 0);
        let wire = build(&mol, DisplayStyle::Wireframe);
        assert_eq!(wire.line_count(), 1);
    }
}
