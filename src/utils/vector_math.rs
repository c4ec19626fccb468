use nalgebra::{DMatrix, Matrix4, Point3, SVector, Vector4};
use std::f64::consts::PI;

use crate::error::{FredError, Result};

/// Perpendicular distance from `point` to the line through `point_on_line`
/// along `direction`.
///
/// The direction does not need to be a unit vector, it is normalised here.
/// A zero-length direction does not define a line and is reported as
/// [`FredError::Degenerate`].
pub fn distance_from_line<const D: usize>(
    point_on_line: &SVector<f64, D>,
    direction: &SVector<f64, D>,
    point: &SVector<f64, D>,
) -> Result<f64> {
    let norm = direction.norm();
    if !(norm > f64::EPSILON) {
        return Err(FredError::Degenerate(format!(
            "line direction has length {}",
            norm
        )));
    }
    let unit = direction / norm;
    let offset = point - point_on_line;
    let along = offset.dot(&unit);
    Ok((offset - unit * along).norm())
}

/// Multiplies an N x 4 matrix of points by a 4x4 homogeneous transform.
///
/// The first column of `points_in` is the point ID, columns 1..4 are x, y, z.
/// The returned matrix keeps the IDs in column 0.
pub fn multiply_points_by_matrix(
    points_in: &DMatrix<f64>,
    matrix: &Matrix4<f64>,
) -> Result<DMatrix<f64>> {
    if points_in.ncols() != 4 {
        return Err(FredError::InvalidValue(format!(
            "points should have 4 columns (id, x, y, z), got {}",
            points_in.ncols()
        )));
    }

    let mut points_out = DMatrix::<f64>::zeros(points_in.nrows(), 4);
    for (row_in, mut row_out) in points_in.row_iter().zip(points_out.row_iter_mut()) {
        let homogeneous = Vector4::new(row_in[1], row_in[2], row_in[3], 1.0);
        let transformed = matrix * homogeneous;
        row_out[0] = row_in[0];
        row_out[1] = transformed.x;
        row_out[2] = transformed.y;
        row_out[3] = transformed.z;
    }
    Ok(points_out)
}

/// Generates `num_points` fiducials equally spaced on a circle in the z = 0 plane.
pub fn circle_fiducials(num_points: usize, centre: (f64, f64), radius: f64) -> Vec<Point3<f64>> {
    let angle_inc = 2.0 * PI / (num_points as f64);
    (0..num_points)
        .map(|i| {
            let theta = angle_inc * i as f64;
            Point3::new(
                centre.0 + radius * theta.cos(),
                centre.1 + radius * theta.sin(),
                0.0,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Rotation3, Translation3, Vector2, Vector3};
    use std::f64::consts::PI;

    #[test]
    fn test_distance_from_line_unit_direction() {
        let origin = Vector2::new(0.0, 0.0);
        let x_axis = Vector2::new(1.0, 0.0);
        let d = distance_from_line(&origin, &x_axis, &Vector2::new(5.0, 3.0)).unwrap();
        assert_relative_eq!(d, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_distance_from_line_normalises_direction() {
        let origin = Vector3::new(1.0, 1.0, 0.0);
        let short = Vector3::new(0.0, 0.0, 1.0);
        let long = Vector3::new(0.0, 0.0, 40.0);
        let point = Vector3::new(4.0, 5.0, 7.0);
        let d_short = distance_from_line(&origin, &short, &point).unwrap();
        let d_long = distance_from_line(&origin, &long, &point).unwrap();
        assert_relative_eq!(d_short, 5.0, epsilon = 1e-12);
        assert_relative_eq!(d_short, d_long, epsilon = 1e-12);
    }

    #[test]
    fn test_distance_from_line_point_on_line() {
        let origin = Vector2::new(1.0, 1.0);
        let diagonal = Vector2::new(1.0, 1.0);
        let d = distance_from_line(&origin, &diagonal, &Vector2::new(-3.0, -3.0)).unwrap();
        assert_relative_eq!(d, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_distance_from_line_zero_direction() {
        let origin = Vector2::new(0.0, 0.0);
        let result = distance_from_line(&origin, &Vector2::zeros(), &Vector2::new(1.0, 0.0));
        assert!(matches!(result, Err(FredError::Degenerate(_))));
    }

    #[test]
    fn test_multiply_points_by_matrix_keeps_ids() {
        let points = DMatrix::from_row_slice(
            2,
            4,
            &[
                7.0, 1.0, 0.0, 0.0, //
                9.0, 0.0, 2.0, 3.0,
            ],
        );
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), PI / 2.0);
        let transform =
            Translation3::new(10.0, 0.0, -1.0).to_homogeneous() * rotation.to_homogeneous();

        let out = multiply_points_by_matrix(&points, &transform).unwrap();

        assert_eq!(out[(0, 0)], 7.0);
        assert_eq!(out[(1, 0)], 9.0);
        assert_relative_eq!(out[(0, 1)], 10.0, epsilon = 1e-12);
        assert_relative_eq!(out[(0, 2)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(out[(0, 3)], -1.0, epsilon = 1e-12);
        assert_relative_eq!(out[(1, 1)], 8.0, epsilon = 1e-12);
        assert_relative_eq!(out[(1, 2)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(out[(1, 3)], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_multiply_points_by_matrix_rejects_shape() {
        let points = DMatrix::<f64>::zeros(3, 3);
        let result = multiply_points_by_matrix(&points, &Matrix4::identity());
        assert!(matches!(result, Err(FredError::InvalidValue(_))));
    }
}
