use crate::core::models::molecule::Molecule;
use nalgebra::{Matrix3, Point3, Rotation3, Unit, Vector3};
use std::f64::consts::PI;
use thiserror::Error;

/// Squared norms below this are treated as zero-length vectors.
const DEGENERACY_EPSILON: f64 = 1e-10;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Degenerate geometry: {0}")]
    Degenerate(&'static str),
    #[error("Atom index {0} is out of range")]
    AtomOutOfRange(usize),
}

/// A proper rigid-body motion: `x' = R·x + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    pub fn new(rotation: Rotation3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Rotation3::identity(), Vector3::zeros())
    }

    #[inline]
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.rotation * point + self.translation
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        self.rotation.matrix()
    }

    pub fn determinant(&self) -> f64 {
        self.rotation.matrix().determinant()
    }

    /// Returns the transform that undoes `self`.
    pub fn inverse(&self) -> Self {
        let inv_rotation = self.rotation.inverse();
        Self::new(inv_rotation, -(inv_rotation * self.translation))
    }
}

/// Wraps an angle in radians into the half-open interval (−π, π].
pub fn wrap_angle(angle: f64) -> f64 {
    let mut wrapped = angle.rem_euclid(2.0 * PI);
    if wrapped > PI {
        wrapped -= 2.0 * PI;
    }
    if wrapped <= -PI {
        wrapped += 2.0 * PI;
    }
    wrapped
}

/// Shortest signed angular difference `to − from`, in (−π, π].
pub fn angle_difference(to: f64, from: f64) -> f64 {
    wrap_angle(to - from)
}

/// Computes the signed dihedral angle a–b–c–d in radians, in (−π, π].
///
/// Uses the IUPAC sign convention: looking along b→c, the angle is positive
/// when the a–b bond must be rotated clockwise to eclipse the c–d bond.
///
/// # Errors
///
/// Returns [`GeometryError::Degenerate`] when either plane normal vanishes,
/// i.e. three consecutive points are colinear or coincident.
pub fn dihedral(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    d: &Point3<f64>,
) -> Result<f64, GeometryError> {
    let b1 = b - a;
    let b2 = c - b;
    let b3 = d - c;

    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    if n1.norm_squared() < DEGENERACY_EPSILON || n2.norm_squared() < DEGENERACY_EPSILON {
        return Err(GeometryError::Degenerate(
            "three consecutive dihedral points are colinear",
        ));
    }

    let y = b2.norm() * b1.dot(&n2);
    let x = n1.dot(&n2);
    let angle = y.atan2(x);
    Ok(if angle <= -PI { PI } else { angle })
}

/// Rotates exactly `atoms` by `angle` radians about the axis through
/// `axis_a → axis_b`, leaving every other atom untouched.
///
/// The rotation is right-handed about the axis direction.
pub fn rotate_subset(
    molecule: &mut Molecule,
    axis_a: usize,
    axis_b: usize,
    atoms: &[usize],
    angle: f64,
) -> Result<(), GeometryError> {
    let origin = molecule
        .position(axis_a)
        .ok_or(GeometryError::AtomOutOfRange(axis_a))?;
    let tip = molecule
        .position(axis_b)
        .ok_or(GeometryError::AtomOutOfRange(axis_b))?;

    let direction = tip - origin;
    if direction.norm_squared() < DEGENERACY_EPSILON {
        return Err(GeometryError::Degenerate("rotation axis has zero length"));
    }
    let rotation = Rotation3::from_axis_angle(&Unit::new_normalize(direction), angle);

    if let Some(&bad) = atoms.iter().find(|&&i| i >= molecule.atom_count()) {
        return Err(GeometryError::AtomOutOfRange(bad));
    }
    for &index in atoms {
        let atom = &mut molecule.atoms_mut()[index];
        atom.position = origin + rotation * (atom.position - origin);
    }
    Ok(())
}

/// Applies `transform` to every atom of `molecule`, in place.
pub fn apply_rigid_transform(molecule: &mut Molecule, transform: &RigidTransform) {
    for atom in molecule.atoms_mut() {
        atom.position = transform.apply(&atom.position);
    }
}

/// Geometric centre of a point set, or `None` for an empty set.
pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    Some(Point3::from(sum / points.len() as f64))
}

pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}
