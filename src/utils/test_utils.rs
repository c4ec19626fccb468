use nalgebra::{Point2, Point3};

pub use crate::utils::vector_math::circle_fiducials;

/// Closed outline standing in for a fitted anatomy contour
pub fn circle_outline(num_points: usize, centre: (f64, f64), radius: f64) -> Vec<Point2<f64>> {
    circle_fiducials(num_points, centre, radius)
        .into_iter()
        .map(|p| Point2::new(p.x, p.y))
        .collect()
}

/// Rotates a point around the z axis through `pivot`
pub fn rotate_point_z(point: &Point3<f64>, angle: f64, pivot: (f64, f64)) -> Point3<f64> {
    let (x, y) = (point.x - pivot.0, point.y - pivot.1);
    let cos = angle.cos();
    let sin = angle.sin();
    Point3::new(
        x * cos - y * sin + pivot.0,
        x * sin + y * cos + pivot.1,
        point.z,
    )
}
