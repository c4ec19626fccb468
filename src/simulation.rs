//! Monte Carlo check of the TRE and FRE estimators.

use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;

use crate::algorithms::fle::Fle;
use crate::algorithms::point_based_reg::PointBasedRegistration;
use crate::error::{FredError, Result};
use crate::io::config::SimulationConfig;
use crate::utils::vector_math::circle_fiducials;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub trials: usize,
    pub expected_tre_squared: f64,
    pub expected_fre_squared: f64,
    pub mean_actual_tre_squared: f64,
    pub mean_fre_squared: f64,
}

/// Registers a noise free circle of fiducials against noisy copies of
/// itself and compares the predicted errors with the observed ones.
///
/// Trial `i` draws its noise from `StdRng::seed_from_u64(seed + i)`, so the
/// summary does not depend on how rayon schedules the trials.
pub fn simulate_registration(config: &SimulationConfig) -> Result<SimulationSummary> {
    config.validate()?;

    let [cx, cy, cz] = config.centre;
    let moving: Vec<Point3<f64>> = circle_fiducials(config.fiducials, (cx, cy), config.radius)
        .into_iter()
        .map(|p| Point3::new(p.x, p.y, cz))
        .collect();
    let target = Point3::from(config.target);
    let fixed_fle = Fle::normal(&config.fixed_fle_sd)?;
    let registration =
        PointBasedRegistration::new(target, fixed_fle.expected_squared_fle()?, 0.0)?;

    let noise_free = registration.register(&moving, &moving)?;

    let trials: Vec<(f64, f64)> = (0..config.repeats)
        .into_par_iter()
        .map(|trial| {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(trial as u64));
            let fixed = moving
                .iter()
                .map(|p| fixed_fle.perturb_point(p, &mut rng))
                .collect::<Result<Vec<_>>>()?;
            let result = registration.register(&fixed, &moving)?;
            if !result.success {
                return Err(FredError::Procrustes(format!(
                    "trial {} did not register",
                    trial
                )));
            }
            Ok((result.actual_tre.powi(2), result.fre.powi(2)))
        })
        .collect::<Result<Vec<_>>>()?;

    let n = trials.len() as f64;
    let (tre_sum, fre_sum) = trials
        .iter()
        .fold((0.0, 0.0), |(t, f), (tre2, fre2)| (t + tre2, f + fre2));

    let summary = SimulationSummary {
        trials: trials.len(),
        expected_tre_squared: noise_free.expected_tre_squared,
        expected_fre_squared: noise_free.expected_fre_squared,
        mean_actual_tre_squared: tre_sum / n,
        mean_fre_squared: fre_sum / n,
    };
    log::info!(
        "{} trials: TRE² expected {:.4} actual {:.4}, FRE² expected {:.4} actual {:.4}",
        summary.trials,
        summary.expected_tre_squared,
        summary.mean_actual_tre_squared,
        summary.expected_fre_squared,
        summary.mean_fre_squared
    );
    Ok(summary)
}
