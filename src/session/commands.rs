use nalgebra::{Point2, Point3};
use rand::{Rng, RngCore};

use crate::algorithms::fle::Fle;
use crate::algorithms::target::make_target_point;
use crate::error::{FredError, Result};
use crate::io::config::GameConfig;
use crate::session::visibility::StatsView;

/// Ground truth and error models for one game round.
#[derive(Debug, Clone)]
pub struct RoundSetup {
    pub target: Point3<f64>,
    pub fixed_fle: Fle,
    pub moving_fle: Fle,
}

impl RoundSetup {
    pub fn new(target: Point3<f64>, fixed_fle: Fle, moving_fle: Fle) -> Self {
        RoundSetup {
            target,
            fixed_fle,
            moving_fle,
        }
    }

    /// Draws an isotropic fixed FLE from `config.fle_sd_range` and a target
    /// inside `outline`. The moving side is error free.
    pub fn random(
        outline: &[Point2<f64>],
        config: &GameConfig,
        rng: &mut dyn RngCore,
    ) -> Result<Self> {
        let [low, high] = config.fle_sd_range;
        if !(low >= 0.0 && high > low) {
            return Err(FredError::InvalidValue(format!(
                "fle_sd_range must satisfy 0 <= low < high, got [{}, {}]",
                low, high
            )));
        }
        let fle_sd = rng.random_range(low..high);
        let fixed_fle = Fle::normal(&[fle_sd; 3])?;
        let target = make_target_point(outline, config.edge_buffer, rng)?;

        Ok(RoundSetup::new(target, fixed_fle, Fle::default()))
    }
}

/// Input events, as produced by a mouse/keyboard adapter.
#[derive(Debug, Clone)]
pub enum Command {
    NewRound(RoundSetup),
    /// Marker placed at image location (x, y).
    AddFiducial { x: f64, y: f64 },
    IncreaseMargin,
    DecreaseMargin,
    Ablate,
}

/// Output events for a display adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayUpdate {
    RoundStarted {
        target: Point3<f64>,
        fixed_fle_std_devs: Vec<f64>,
        repeats_remaining: usize,
        /// Statistics shown during this round.
        view: StatsView,
    },
    /// Every accumulated fiducial of the current round.
    Fiducials {
        fixed: Vec<Point3<f64>>,
        moving: Vec<Point3<f64>>,
    },
    RegistrationStats {
        fre: f64,
        expected_fre: f64,
        expected_tre: f64,
        actual_tre: f64,
        mean_fle: f64,
        no_fids: usize,
        transformed_target: Point2<f64>,
    },
    Margin(f64),
    Score {
        score: f64,
        total_score: f64,
        view: StatsView,
    },
    GameOver {
        total_score: f64,
    },
}
