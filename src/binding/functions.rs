use nalgebra::{DMatrix, Matrix4, Point2, SVector};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::algorithms::errors;
use crate::algorithms::scores;
use crate::algorithms::target;
use crate::binding::classes::{seeded_rng, to_point, PySimulationSummary};
use crate::entry::run_simulation;
use crate::io::config::SimulationConfig;
use crate::simulation;
use crate::utils::vector_math;

fn points_2d(points: &[(f64, f64)]) -> DMatrix<f64> {
    DMatrix::from_fn(points.len(), 2, |r, c| if c == 0 { points[r].0 } else { points[r].1 })
}

/// Expected absolute value of a normal error with the given per axis
/// standard deviations, ``|σ| * sqrt(2 / π)``
#[pyfunction]
pub fn expected_absolute_value(std_devs: Vec<f64>) -> PyResult<f64> {
    Ok(errors::expected_absolute_value(&std_devs)?)
}

/// Expected squared value, the sum of variances
#[pyfunction]
pub fn expected_squared_value(std_devs: Vec<f64>) -> PyResult<f64> {
    Ok(errors::expected_squared_value(&std_devs)?)
}

/// Expected squared FRE for N fiducials, ``(1 - 2/N) * mean_fle_squared``
#[pyfunction]
pub fn compute_fre_2d(fiducials: Vec<(f64, f64)>, mean_fle_squared: f64) -> PyResult<f64> {
    Ok(errors::compute_fre_2d(&points_2d(&fiducials), mean_fle_squared)?)
}

/// Expected squared TRE at ``target_point`` (Fitzpatrick 1998)
///
/// Raises:
///     ValueError: fewer than 3 fiducials
///     ArithmeticError: collinear fiducials
#[pyfunction]
pub fn compute_tre_from_fle_2d(
    fiducials: Vec<(f64, f64)>,
    mean_fle_squared: f64,
    target_point: (f64, f64),
) -> PyResult<f64> {
    Ok(errors::compute_tre_from_fle_2d(
        &points_2d(&fiducials),
        mean_fle_squared,
        &points_2d(&[target_point]),
    )?)
}

#[pyfunction]
pub fn sphere_volume(radius: f64) -> f64 {
    scores::sphere_volume(radius)
}

#[pyfunction]
pub fn two_sphere_overlap_volume(
    centre_0: (f64, f64, f64),
    centre_1: (f64, f64, f64),
    radius_0: f64,
    radius_1: f64,
) -> f64 {
    scores::two_sphere_overlap_volume(&to_point(centre_0), &to_point(centre_1), radius_0, radius_1)
}

/// Distance from ``point`` to a line, in 2 or 3 dimensions
#[pyfunction]
pub fn distance_from_line(
    point_on_line: Vec<f64>,
    direction: Vec<f64>,
    point: Vec<f64>,
) -> PyResult<f64> {
    fn distance<const D: usize>(a: &[f64], b: &[f64], c: &[f64]) -> PyResult<f64> {
        Ok(vector_math::distance_from_line(
            &SVector::<f64, D>::from_column_slice(a),
            &SVector::<f64, D>::from_column_slice(b),
            &SVector::<f64, D>::from_column_slice(c),
        )?)
    }

    let dims = point_on_line.len();
    if direction.len() != dims || point.len() != dims {
        return Err(PyValueError::new_err("all inputs must have the same length"));
    }
    match dims {
        2 => distance::<2>(&point_on_line, &direction, &point),
        3 => distance::<3>(&point_on_line, &direction, &point),
        _ => Err(PyValueError::new_err(format!(
            "expected 2 or 3 dimensional inputs, got {}",
            dims
        ))),
    }
}

/// Applies a 4x4 row major homogeneous transform to rows of (id, x, y, z)
#[pyfunction]
pub fn multiply_points_by_matrix(
    points: Vec<[f64; 4]>,
    matrix: [[f64; 4]; 4],
) -> PyResult<Vec<[f64; 4]>> {
    let flat: Vec<f64> = points.iter().flatten().copied().collect();
    let points_in = DMatrix::from_row_slice(points.len(), 4, &flat);
    let matrix_flat: Vec<f64> = matrix.iter().flatten().copied().collect();
    let transform = Matrix4::from_row_slice(&matrix_flat);

    let points_out = vector_math::multiply_points_by_matrix(&points_in, &transform)?;
    Ok(points_out
        .row_iter()
        .map(|row| [row[0], row[1], row[2], row[3]])
        .collect())
}

/// Random target inside an outline
#[pyfunction]
#[pyo3(signature = (outline, edge_buffer = 0.9, seed = None))]
pub fn make_target_point(
    outline: Vec<(f64, f64)>,
    edge_buffer: f64,
    seed: Option<u64>,
) -> PyResult<(f64, f64, f64)> {
    let outline: Vec<Point2<f64>> = outline.into_iter().map(|(x, y)| Point2::new(x, y)).collect();
    let mut rng = seeded_rng(seed);
    let target = target::make_target_point(&outline, edge_buffer, &mut rng)?;
    Ok((target.x, target.y, target.z))
}

/// Monte Carlo comparison of predicted and observed TRE and FRE
#[pyfunction]
#[pyo3(signature = (
    fiducials = 10usize,
    radius = 2.0f64,
    fixed_fle_sd = [1.0, 1.0, 0.0],
    target = [0.0, 0.0, 0.0],
    repeats = 1000usize,
    seed = 0u64,
))]
pub fn simulate_registration(
    fiducials: usize,
    radius: f64,
    fixed_fle_sd: [f64; 3],
    target: [f64; 3],
    repeats: usize,
    seed: u64,
) -> PyResult<PySimulationSummary> {
    let config = SimulationConfig {
        fiducials,
        radius,
        fixed_fle_sd,
        target,
        repeats,
        seed,
        ..SimulationConfig::default()
    };
    Ok(simulation::simulate_registration(&config)?.into())
}

/// Runs the simulation from a TOML configuration file
#[pyfunction]
#[pyo3(name = "run_simulation", signature = (config_path, summary_path = None))]
pub fn run_simulation_py(
    config_path: &str,
    summary_path: Option<&str>,
) -> PyResult<PySimulationSummary> {
    let summary = run_simulation(config_path, summary_path)
        .map_err(|e| PyRuntimeError::new_err(format!("{:#}", e)))?;
    Ok(summary.into())
}
