use nalgebra::Point3;

use crate::algorithms::scores::two_sphere_overlap_volume;

pub const DEFAULT_MARGIN: f64 = 1.0;
pub const DEFAULT_MARGIN_INCREMENT: f64 = 0.1;

/// Simulated ablation for the registration game.
///
/// The ablation is a sphere of radius `margin` centred on the estimated
/// target. Its score is the volume it shares with the true target sphere.
#[derive(Debug, Clone, PartialEq)]
pub struct Ablator {
    margin: f64,
    margin_increment: f64,
    margin_floor: f64,
    target: Option<Point3<f64>>,
    target_radius: f64,
}

impl Default for Ablator {
    fn default() -> Self {
        Ablator::new(DEFAULT_MARGIN, DEFAULT_MARGIN_INCREMENT)
    }
}

impl Ablator {
    /// Ablator with a starting margin and step. The margin floor is zero.
    pub fn new(margin: f64, margin_increment: f64) -> Self {
        Ablator {
            margin,
            margin_increment,
            margin_floor: 0.0,
            target: None,
            target_radius: 0.0,
        }
    }

    /// Sets the smallest margin `decrease_margin` and `setup` allow.
    pub fn with_margin_floor(mut self, margin_floor: f64) -> Self {
        self.margin_floor = margin_floor;
        self.margin = self.margin.max(margin_floor);
        self
    }

    pub fn margin_floor(&self) -> f64 {
        self.margin_floor
    }

    pub fn setup(&mut self, margin: f64, target: Point3<f64>, target_radius: f64) {
        self.margin = margin.max(self.margin_floor);
        self.target = Some(target);
        self.target_radius = target_radius;
    }

    pub fn is_ready(&self) -> bool {
        self.target.is_some()
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn target(&self) -> Option<&Point3<f64>> {
        self.target.as_ref()
    }

    pub fn target_radius(&self) -> f64 {
        self.target_radius
    }

    /// Grows the margin, returns the new margin or `None` before `setup`.
    pub fn increase_margin(&mut self) -> Option<f64> {
        self.target?;
        self.margin += self.margin_increment;
        log::debug!("margin = {:.1}", self.margin);
        Some(self.margin)
    }

    /// Shrinks the margin, never below the floor.
    pub fn decrease_margin(&mut self) -> Option<f64> {
        self.target?;
        self.margin = (self.margin - self.margin_increment).max(self.margin_floor);
        log::debug!("margin = {:.1}", self.margin);
        Some(self.margin)
    }

    /// Ablates around `estimated_target` and returns the score, or `None`
    /// when no target has been set up.
    pub fn ablate(&self, estimated_target: &Point3<f64>) -> Option<f64> {
        let target = self.target.as_ref()?;
        let score =
            two_sphere_overlap_volume(target, estimated_target, self.target_radius, self.margin);
        log::debug!("ablating at {:?}, score {:.2}", estimated_target, score);
        Some(score)
    }
}
