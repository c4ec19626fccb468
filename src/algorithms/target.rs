use nalgebra::{Point2, Point3, Vector2};
use rand::{Rng, RngCore};
use std::f64::consts::PI;

use crate::error::{FredError, Result};

/// Picks a random target inside an anatomy outline.
///
/// The anatomy is approximated as a circle centred on the outline mean,
/// with radius half the smaller outline extent scaled by `edge_buffer`.
pub fn make_target_point(
    outline: &[Point2<f64>],
    edge_buffer: f64,
    rng: &mut dyn RngCore,
) -> Result<Point3<f64>> {
    if outline.is_empty() {
        return Err(FredError::InvalidValue("outline is empty".to_string()));
    }
    if !(edge_buffer > 0.0 && edge_buffer <= 1.0) {
        return Err(FredError::InvalidValue(format!(
            "edge buffer must be in (0, 1], got {}",
            edge_buffer
        )));
    }

    let centre = outline.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords)
        / outline.len() as f64;
    let (min, max) = outline.iter().fold(
        (Vector2::repeat(f64::MAX), Vector2::repeat(f64::MIN)),
        |(min, max), p| (min.inf(&p.coords), max.sup(&p.coords)),
    );
    let max_radius = ((max - min) / 2.0).min() * edge_buffer;

    let radius = if max_radius > 0.0 {
        rng.random_range(0.0..max_radius)
    } else {
        0.0
    };
    let angle = rng.random_range(0.0..2.0 * PI);

    Ok(Point3::new(
        radius * angle.cos() + centre.x,
        radius * angle.sin() + centre.y,
        0.0,
    ))
}
