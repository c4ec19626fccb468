//! Closed form estimates of registration error from fiducial localisation
//! error, following Fitzpatrick, West and Maurer (1998),
//! <http://dx.doi.org/10.1109/42.736021>.

use nalgebra::{DMatrix, Matrix2, SymmetricEigen, Vector2};
use std::f64::consts::PI;

use crate::error::{FredError, Result};
use crate::utils::vector_math::distance_from_line;

const DIMENSION: usize = 2;

/// Relative size below which an RMS axis distance is treated as zero.
const DEGENERATE_TOLERANCE: f64 = 1e-9;

fn check_std_devs(std_devs: &[f64]) -> Result<()> {
    if std_devs.iter().any(|s| !s.is_finite()) {
        return Err(FredError::InvalidType(
            "standard deviations must be finite real numbers".to_string(),
        ));
    }
    if std_devs.iter().any(|&s| s < 0.0) {
        return Err(FredError::InvalidValue(
            "cannot have negative standard deviation".to_string(),
        ));
    }
    Ok(())
}

/// Expected absolute value of a zero mean normal error with per axis
/// standard deviations `std_devs`.
///
/// Uses the folded normal identity E|X| = σ·√(2/π), where σ is the
/// Euclidean norm of the per axis standard deviations. The zero vector
/// gives exactly 0.0.
pub fn expected_absolute_value(std_devs: &[f64]) -> Result<f64> {
    check_std_devs(std_devs)?;
    let std_dev_1d = std_devs.iter().map(|s| s * s).sum::<f64>().sqrt();
    Ok((2.0 / PI).sqrt() * std_dev_1d)
}

/// Expected squared magnitude E‖X‖² = Σσ² of a zero mean normal error.
///
/// This is the mean squared FLE consumed by [`compute_fre_2d`] and
/// [`compute_tre_from_fle_2d`].
pub fn expected_squared_value(std_devs: &[f64]) -> Result<f64> {
    check_std_devs(std_devs)?;
    Ok(std_devs.iter().map(|s| s * s).sum())
}

/// Expected squared FRE for `N` fiducials, (1 - 2/N)·⟨FLE²⟩ (Sibson).
///
/// For one or two fiducials the result is zero or negative and is
/// returned as is.
pub fn compute_fre_2d(fiducials: &DMatrix<f64>, mean_fle_squared: f64) -> Result<f64> {
    let number_of_fiducials = fiducials.nrows();
    if number_of_fiducials == 0 {
        return Err(FredError::InvalidValue(
            "fiducials should have at least 1 row".to_string(),
        ));
    }
    Ok((1.0 - 2.0 / number_of_fiducials as f64) * mean_fle_squared)
}

/// Expected squared TRE at `target_point` for a 2D fiducial configuration.
///
/// `fiducials` is an N x 2 matrix with N >= 3 and `target_point` a 1 x 2
/// matrix. Implements equation 46 of Fitzpatrick (1998):
///
/// ```text
/// TRE² = ⟨FLE²⟩ / N · (1 + 1/D · Σ_k d_k² / f_k²)
/// ```
///
/// where `d_k` is the distance of the target from principal axis `k` and
/// `f_k` the RMS distance of the fiducials from that axis.
pub fn compute_tre_from_fle_2d(
    fiducials: &DMatrix<f64>,
    mean_fle_squared: f64,
    target_point: &DMatrix<f64>,
) -> Result<f64> {
    if fiducials.iter().any(|v| !v.is_finite()) {
        return Err(FredError::InvalidType(
            "fiducials is not an array of real values".to_string(),
        ));
    }
    if fiducials.ncols() != DIMENSION {
        return Err(FredError::InvalidValue(
            "fiducials should have 2 columns".to_string(),
        ));
    }
    if fiducials.nrows() < 3 {
        return Err(FredError::InvalidValue(
            "fiducials should have at least 3 rows".to_string(),
        ));
    }
    if target_point.iter().any(|v| !v.is_finite()) {
        return Err(FredError::InvalidType(
            "target_point is not an array of real values".to_string(),
        ));
    }
    if target_point.ncols() != DIMENSION {
        return Err(FredError::InvalidValue(
            "target_point should have 2 columns".to_string(),
        ));
    }
    if target_point.nrows() != 1 {
        return Err(FredError::InvalidValue(
            "target_point should have 1 row".to_string(),
        ));
    }

    let number_of_fiducials = fiducials.nrows() as f64;
    let points: Vec<Vector2<f64>> = fiducials
        .row_iter()
        .map(|row| Vector2::new(row[0], row[1]))
        .collect();
    let target = Vector2::new(target_point[(0, 0)], target_point[(0, 1)]);

    let centroid = points.iter().fold(Vector2::zeros(), |acc, p| acc + p) / number_of_fiducials;
    let covariance = points.iter().fold(Matrix2::zeros(), |acc, p| {
        let centred = p - centroid;
        acc + centred * centred.transpose()
    }) / (number_of_fiducials - 1.0);
    let spread = covariance.trace().sqrt();

    let principal_axes = SymmetricEigen::new(covariance).eigenvectors;

    let mut inner_sum = 0.0;
    for axis in principal_axes.column_iter() {
        let axis: Vector2<f64> = axis.into_owned();

        let mut sum_f_k_squared = 0.0;
        for fiducial in &points {
            let f_k = distance_from_line(&centroid, &axis, fiducial)?;
            sum_f_k_squared += f_k * f_k;
        }
        let f_k_rms = (sum_f_k_squared / number_of_fiducials).sqrt();
        if f_k_rms <= DEGENERATE_TOLERANCE * spread {
            return Err(FredError::Degenerate(format!(
                "fiducials have RMS distance {:e} from a principal axis, are they collinear?",
                f_k_rms
            )));
        }

        let d_k = distance_from_line(&centroid, &axis, &target)?;
        inner_sum += d_k * d_k / (f_k_rms * f_k_rms);
    }

    Ok((mean_fle_squared / number_of_fiducials) * (1.0 + inner_sum / DIMENSION as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::{Distribution, Normal};

    fn eav_by_brute_force(std_devs: &[f64], rng: &mut StdRng) -> f64 {
        let samples = 10_000;
        let normals: Vec<Normal<f64>> = std_devs
            .iter()
            .map(|&sd| Normal::new(0.0, sd).unwrap())
            .collect();
        let mut cum_sum = vec![0.0; std_devs.len()];
        for _ in 0..samples {
            for (acc, normal) in cum_sum.iter_mut().zip(&normals) {
                *acc += normal.sample(rng).abs();
            }
        }
        cum_sum
            .iter()
            .map(|s| (s / samples as f64).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    fn unit_circle_fiducials() -> DMatrix<f64> {
        let angles = [0.0, 2.0 * PI / 3.0, 4.0 * PI / 3.0];
        DMatrix::from_fn(3, 2, |r, c| {
            if c == 0 {
                angles[r].cos()
            } else {
                angles[r].sin()
            }
        })
    }

    #[test]
    fn test_expected_absolute_value_closed_form() {
        for std_devs in [vec![1.0], vec![1.0, 1.0], vec![0.5, 2.0, 3.0]] {
            let eav = expected_absolute_value(&std_devs).unwrap();
            let norm = std_devs.iter().map(|s| s * s).sum::<f64>().sqrt();
            assert_relative_eq!(eav, norm * (2.0 / PI).sqrt(), max_relative = 1e-4);
        }
    }

    #[test]
    fn test_expected_absolute_value_brute_force() {
        let mut rng = StdRng::seed_from_u64(0);
        for dims in 1..=3 {
            for _ in 0..5 {
                let std_devs: Vec<f64> =
                    (0..dims).map(|_| rng.random_range(0.1..100.0)).collect();
                let eav = expected_absolute_value(&std_devs).unwrap();
                let brute = eav_by_brute_force(&std_devs, &mut rng);
                assert_relative_eq!(eav, brute, max_relative = 0.05);
            }
        }
    }

    #[test]
    fn test_expected_absolute_value_zero() {
        assert_eq!(expected_absolute_value(&[0.0]).unwrap(), 0.0);
        assert_eq!(expected_absolute_value(&[0.0, 0.0]).unwrap(), 0.0);
        assert_eq!(expected_absolute_value(&[0.0, 0.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_expected_absolute_value_negative() {
        assert!(matches!(
            expected_absolute_value(&[-1.0]),
            Err(FredError::InvalidValue(_))
        ));
        assert!(matches!(
            expected_absolute_value(&[0.0, -1.0, 0.0]),
            Err(FredError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_expected_squared_value() {
        assert_relative_eq!(expected_squared_value(&[1.0, 1.0, 0.0]).unwrap(), 2.0);
        assert!(expected_squared_value(&[1.0, -0.1]).is_err());
    }

    #[test]
    fn test_compute_fre_2d() {
        let fiducials = DMatrix::<f64>::zeros(4, 2);
        assert_eq!(compute_fre_2d(&fiducials, 2.0).unwrap(), 1.0);
    }

    #[test]
    fn test_compute_fre_2d_few_fiducials_not_clamped() {
        let one = DMatrix::<f64>::zeros(1, 2);
        let two = DMatrix::<f64>::zeros(2, 2);
        assert_eq!(compute_fre_2d(&one, 2.0).unwrap(), -2.0);
        assert_eq!(compute_fre_2d(&two, 2.0).unwrap(), 0.0);
        assert!(compute_fre_2d(&DMatrix::<f64>::zeros(0, 2), 2.0).is_err());
    }

    #[test]
    fn test_compute_tre_target_at_centroid() {
        let mean_fle_squared = expected_squared_value(&[1.0, 1.0]).unwrap();
        assert_eq!(mean_fle_squared, 2.0);
        let target = DMatrix::from_row_slice(1, 2, &[0.0, 0.0]);
        let tre_sq =
            compute_tre_from_fle_2d(&unit_circle_fiducials(), mean_fle_squared, &target).unwrap();
        assert_relative_eq!(tre_sq, mean_fle_squared / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_compute_tre_offset_target() {
        // square fiducials, every axis through the centroid has f_k² = 1
        let fiducials = DMatrix::from_row_slice(
            4,
            2,
            &[1.0, 1.0, -1.0, 1.0, -1.0, -1.0, 1.0, -1.0],
        );
        let target = DMatrix::from_row_slice(1, 2, &[2.0, 0.0]);
        let tre_sq = compute_tre_from_fle_2d(&fiducials, 2.0, &target).unwrap();
        assert_relative_eq!(tre_sq, 2.0 / 4.0 * (1.0 + 4.0 / 2.0), epsilon = 1e-9);
    }

    #[test]
    fn test_compute_tre_grows_with_target_distance() {
        let fiducials = unit_circle_fiducials();
        let near = DMatrix::from_row_slice(1, 2, &[0.5, 0.0]);
        let far = DMatrix::from_row_slice(1, 2, &[5.0, 0.0]);
        let tre_near = compute_tre_from_fle_2d(&fiducials, 1.0, &near).unwrap();
        let tre_far = compute_tre_from_fle_2d(&fiducials, 1.0, &far).unwrap();
        assert!(tre_far > tre_near);
    }

    #[test]
    fn test_compute_tre_invalid_shapes() {
        let target = DMatrix::from_row_slice(1, 2, &[0.0, 0.0]);
        let three_cols = DMatrix::<f64>::zeros(3, 3);
        let two_rows = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 1.0]);
        assert!(matches!(
            compute_tre_from_fle_2d(&three_cols, 1.0, &target),
            Err(FredError::InvalidValue(_))
        ));
        assert!(matches!(
            compute_tre_from_fle_2d(&two_rows, 1.0, &target),
            Err(FredError::InvalidValue(_))
        ));

        let fiducials = unit_circle_fiducials();
        let target_3d = DMatrix::from_row_slice(1, 3, &[0.0, 0.0, 0.0]);
        let two_targets = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 1.0]);
        assert!(matches!(
            compute_tre_from_fle_2d(&fiducials, 1.0, &target_3d),
            Err(FredError::InvalidValue(_))
        ));
        assert!(matches!(
            compute_tre_from_fle_2d(&fiducials, 1.0, &two_targets),
            Err(FredError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_compute_tre_not_real_valued() {
        let mut fiducials = unit_circle_fiducials();
        fiducials[(1, 1)] = f64::NAN;
        let target = DMatrix::from_row_slice(1, 2, &[0.0, 0.0]);
        assert!(matches!(
            compute_tre_from_fle_2d(&fiducials, 1.0, &target),
            Err(FredError::InvalidType(_))
        ));
    }

    #[test]
    fn test_compute_tre_collinear_fiducials() {
        let fiducials = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
        let target = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        assert!(matches!(
            compute_tre_from_fle_2d(&fiducials, 1.0, &target),
            Err(FredError::Degenerate(_))
        ));
    }
}
