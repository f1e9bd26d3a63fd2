use super::error::AlignError;
use super::torsion::{Torsion, measure};
use crate::core::models::molecule::Molecule;
use crate::core::utils::geometry::{angle_difference, rotate_subset};
use std::collections::VecDeque;
use tracing::debug;

/// Torsion state of a candidate before and after correction, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorsionCorrection {
    pub before: f64,
    /// Re-measured after the rotation; equals `before` when nothing was rotated.
    pub after: f64,
    /// Rotation applied about the C→N axis; zero when within tolerance.
    pub applied: f64,
}

impl TorsionCorrection {
    pub fn unchanged(angle: f64) -> Self {
        Self {
            before: angle,
            after: angle,
            applied: 0.0,
        }
    }

    pub fn was_applied(&self) -> bool {
        self.applied != 0.0
    }
}

/// Collects the atoms on the `n` side of the `c`–`n` bond, excluding `n`.
///
/// # Errors
///
/// Returns [`AlignError::UnsupportedRingBond`] if `c` can be reached from `n`
/// without crossing the bond itself.
pub fn moving_fragment(molecule: &Molecule, c: usize, n: usize) -> Result<Vec<usize>, AlignError> {
    let mut visited = vec![false; molecule.atom_count()];
    let mut queue = VecDeque::from([n]);
    let mut fragment = Vec::new();
    if let Some(seen) = visited.get_mut(n) {
        *seen = true;
    }

    while let Some(atom) = queue.pop_front() {
        for &next in molecule.neighbors(atom) {
            if atom == n && next == c {
                continue;
            }
            if next == c {
                return Err(AlignError::UnsupportedRingBond { c, n });
            }
            if !visited[next] {
                visited[next] = true;
                fragment.push(next);
                queue.push_back(next);
            }
        }
    }

    fragment.sort_unstable();
    Ok(fragment)
}

/// Rotates the N side of `torsion` so that its angle becomes `target`.
///
/// Nothing moves when the wrapped difference is within `tolerance` radians.
pub fn correct_torsion(
    molecule: &mut Molecule,
    torsion: &Torsion,
    target: f64,
    tolerance: f64,
) -> Result<TorsionCorrection, AlignError> {
    let delta = angle_difference(target, torsion.angle);
    if delta.abs() <= tolerance {
        debug!(
            "Torsion {:.2}° is within tolerance of {:.2}°",
            torsion.angle.to_degrees(),
            target.to_degrees()
        );
        return Ok(TorsionCorrection::unchanged(torsion.angle));
    }

    let atoms = torsion.atoms;
    let fragment = moving_fragment(molecule, atoms.c, atoms.n)?;
    rotate_subset(molecule, atoms.c, atoms.n, &fragment, delta)?;
    let after = measure(molecule, &atoms)?;

    debug!(
        "Rotated {} atoms by {:.2}°: torsion {:.2}° -> {:.2}°",
        fragment.len(),
        delta.to_degrees(),
        torsion.angle.to_degrees(),
        after.to_degrees()
    );
    Ok(TorsionCorrection {
        before: torsion.angle,
        after,
        applied: delta,
    })
}
