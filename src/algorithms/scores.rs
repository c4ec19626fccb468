use nalgebra::Point3;
use std::f64::consts::PI;

pub fn sphere_volume(radius: f64) -> f64 {
    4.0 * PI * radius * radius * radius / 3.0
}

/// Volume of the intersection of two spheres.
///
/// Zero when the spheres are apart, the smaller sphere's volume when one
/// contains the other, otherwise the sum of the two spherical caps:
/// π / (12d) · (r0 + r1 - d)² · (d² + 2d(r0 + r1) - 3(r0 - r1)²).
pub fn two_sphere_overlap_volume(
    centre0: &Point3<f64>,
    centre1: &Point3<f64>,
    radius0: f64,
    radius1: f64,
) -> f64 {
    let distance = (centre1 - centre0).norm();

    let sum_radii = radius0 + radius1;
    let abs_diff_radii = (radius0 - radius1).abs();

    if distance >= sum_radii {
        return 0.0;
    }

    if distance <= abs_diff_radii {
        return sphere_volume(radius0.min(radius1));
    }

    let first_term = PI / (12.0 * distance);
    let second_term = (sum_radii - distance) * (sum_radii - distance);
    let third_term =
        distance * distance + 2.0 * distance * sum_radii - 3.0 * abs_diff_radii * abs_diff_radii;

    first_term * second_term * third_term
}
