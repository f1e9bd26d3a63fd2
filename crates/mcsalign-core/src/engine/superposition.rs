use super::error::AlignError;
use crate::core::utils::geometry::{RigidTransform, calculate_rmsd, centroid};
use nalgebra::{Matrix3, Point3, Rotation3, SymmetricEigen, Vector3};

/// Relative spread below which a point set is treated as lying on a line.
const COLINEARITY_EPSILON: f64 = 1e-8;

/// Best-fit rigid motion of a mobile point set onto a fixed one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Superposition {
    pub transform: RigidTransform,
    /// RMSD between the transformed mobile points and the fixed points.
    pub rmsd: f64,
}

/// Computes the proper rotation and translation minimizing the RMSD between
/// `mobile` and `fixed` (paired by index), using the Kabsch algorithm.
///
/// # Errors
///
/// - [`AlignError::DegenerateInput`] if the sets differ in length, hold fewer
///   than three points, or either set is colinear.
/// - [`AlignError::OverlayFailure`] if the decomposition yields no finite
///   rotation.
pub fn superpose(
    mobile: &[Point3<f64>],
    fixed: &[Point3<f64>],
) -> Result<Superposition, AlignError> {
    if mobile.len() != fixed.len() {
        return Err(AlignError::DegenerateInput("point sets differ in length"));
    }
    if mobile.len() < 3 {
        return Err(AlignError::DegenerateInput("fewer than three point pairs"));
    }
    if is_colinear(mobile) || is_colinear(fixed) {
        return Err(AlignError::DegenerateInput("points are colinear"));
    }

    let (Some(mobile_centroid), Some(fixed_centroid)) = (centroid(mobile), centroid(fixed)) else {
        return Err(AlignError::DegenerateInput("empty point set"));
    };

    let h = mobile
        .iter()
        .zip(fixed)
        .fold(Matrix3::zeros(), |acc, (m, f)| {
            acc + (f - fixed_centroid) * (m - mobile_centroid).transpose()
        });

    let svd = h.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(AlignError::OverlayFailure("SVD did not converge".into()));
    };

    let mut correction = Matrix3::identity();
    if (u * v_t).determinant() < 0.0 {
        // Flip the axis of the smallest singular value to avoid a reflection.
        let smallest = svd.singular_values.imin();
        correction[(smallest, smallest)] = -1.0;
    }

    let rotation_matrix = u * correction * v_t;
    if rotation_matrix.iter().any(|x| !x.is_finite()) {
        return Err(AlignError::OverlayFailure("rotation is not finite".into()));
    }
    let rotation = Rotation3::from_matrix_unchecked(rotation_matrix);
    let translation: Vector3<f64> = fixed_centroid.coords - rotation * mobile_centroid.coords;
    let transform = RigidTransform::new(rotation, translation);

    let moved: Vec<Point3<f64>> = mobile.iter().map(|p| transform.apply(p)).collect();
    let rmsd = calculate_rmsd(&moved, fixed)
        .filter(|r| r.is_finite())
        .ok_or_else(|| AlignError::OverlayFailure("RMSD is not finite".into()))?;

    Ok(Superposition { transform, rmsd })
}

fn is_colinear(points: &[Point3<f64>]) -> bool {
    let Some(center) = centroid(points) else {
        return true;
    };
    let scatter = points.iter().fold(Matrix3::zeros(), |acc, p| {
        let d = p - center;
        acc + d * d.transpose()
    });
    let mut eigenvalues: Vec<f64> = SymmetricEigen::new(scatter)
        .eigenvalues
        .iter()
        .copied()
        .collect();
    eigenvalues.sort_by(|a, b| b.total_cmp(a));
    let largest = eigenvalues[0];
    largest <= f64::EPSILON || eigenvalues[1] <= COLINEARITY_EPSILON * largest
}
