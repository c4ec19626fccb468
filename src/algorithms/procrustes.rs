use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

use crate::error::{FredError, Result};

/// Rigid transform mapping moving space into fixed space, `fixed = R * moving + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl RigidTransform {
    pub fn identity() -> Self {
        RigidTransform {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn apply_to_point(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation * point.coords + self.translation)
    }

    /// 4x4 homogeneous form, for use with `multiply_points_by_matrix`.
    pub fn to_homogeneous(&self) -> Matrix4<f64> {
        let mut matrix = Matrix4::identity();
        matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.rotation);
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        matrix
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcrustesResult {
    pub transform: RigidTransform,
    /// RMS residual distance between fixed and transformed moving points.
    pub fre: f64,
}

fn centroid(points: &[Point3<f64>]) -> Vector3<f64> {
    points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / points.len() as f64
}

/// Least squares rigid alignment of co-indexed point sets (Arun et al. 1987).
///
/// Returns the rotation and translation taking `moving` onto `fixed`, and
/// the fiducial registration error of the fit. Reflections are corrected by
/// flipping the singular vector of the smallest singular value.
pub fn orthogonal_procrustes(
    fixed: &[Point3<f64>],
    moving: &[Point3<f64>],
) -> Result<ProcrustesResult> {
    if fixed.len() != moving.len() {
        return Err(FredError::InvalidValue(format!(
            "fixed and moving point sets differ in length ({} vs {})",
            fixed.len(),
            moving.len()
        )));
    }
    if fixed.len() < 3 {
        return Err(FredError::InvalidValue(format!(
            "need at least 3 point pairs, got {}",
            fixed.len()
        )));
    }
    if fixed
        .iter()
        .chain(moving.iter())
        .any(|p| p.coords.iter().any(|v| !v.is_finite()))
    {
        return Err(FredError::InvalidType(
            "point sets must contain only finite real values".to_string(),
        ));
    }

    let p_fixed = centroid(fixed);
    let p_moving = centroid(moving);

    // H = Σ q_moving * q_fixed^T
    let h = moving
        .iter()
        .zip(fixed)
        .fold(Matrix3::zeros(), |acc, (m, f)| {
            acc + (m.coords - p_moving) * (f.coords - p_fixed).transpose()
        });

    let svd = h.svd(true, true);
    let u = svd
        .u
        .ok_or_else(|| FredError::Procrustes("SVD did not return U".to_string()))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| FredError::Procrustes("SVD did not return V^T".to_string()))?;

    let mut v = v_t.transpose();
    let mut rotation = v * u.transpose();
    if rotation.determinant() < 0.0 {
        let weakest = svd.singular_values.imin();
        v.column_mut(weakest).neg_mut();
        rotation = v * u.transpose();
    }

    let translation = p_fixed - rotation * p_moving;
    let transform = RigidTransform {
        rotation,
        translation,
    };

    let sum_squared = moving
        .iter()
        .zip(fixed)
        .map(|(m, f)| (transform.apply_to_point(m) - f).norm_squared())
        .sum::<f64>();
    let fre = (sum_squared / fixed.len() as f64).sqrt();
    if !fre.is_finite() {
        return Err(FredError::Procrustes(
            "registration produced a non-finite residual".to_string(),
        ));
    }

    Ok(ProcrustesResult { transform, fre })
}
