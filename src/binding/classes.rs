use nalgebra::Point3;
use pyo3::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::algorithms::ablation::{Ablator, DEFAULT_MARGIN, DEFAULT_MARGIN_INCREMENT};
use crate::algorithms::fle::Fle;
use crate::algorithms::point_based_reg::{PointBasedRegistration, RegistrationResult};
use crate::simulation::SimulationSummary;

pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

pub(crate) fn to_point(p: (f64, f64, f64)) -> Point3<f64> {
    Point3::new(p.0, p.1, p.2)
}

/// Fiducial localisation error model
///
/// Attributes:
///     dims (int): 2 or 3
///     ind_fle (list[float]): independent (per fiducial) standard deviations
///     sys_fle (list[float]): systematic offset applied to every fiducial
///
/// Example:
///     >>> fle = Fle([1.0, 1.0, 0.5], seed=0)
///     >>> fle.perturb([10.0, 20.0, 0.0])
#[pyclass(name = "Fle")]
#[derive(Debug, Clone)]
pub struct PyFle {
    inner: Fle,
    rng: StdRng,
}

#[pymethods]
impl PyFle {
    #[new]
    #[pyo3(signature = (independent_fle = vec![0.0], systematic_fle = vec![0.0], dims = 3usize, seed = None))]
    fn new(
        independent_fle: Vec<f64>,
        systematic_fle: Vec<f64>,
        dims: usize,
        seed: Option<u64>,
    ) -> PyResult<Self> {
        let inner = Fle::builder()
            .dims(dims)
            .independent_fle(&independent_fle)
            .systematic_fle(&systematic_fle)
            .build()?;
        Ok(Self {
            inner,
            rng: seeded_rng(seed),
        })
    }

    #[getter]
    fn dims(&self) -> usize {
        self.inner.dims()
    }

    #[getter]
    fn ind_fle(&self) -> Vec<f64> {
        self.inner.ind_fle().to_vec()
    }

    #[getter]
    fn sys_fle(&self) -> Vec<f64> {
        self.inner.sys_fle().to_vec()
    }

    /// Expected squared FLE (sum of independent variances)
    fn expected_squared_fle(&self) -> PyResult<f64> {
        Ok(self.inner.expected_squared_fle()?)
    }

    /// Returns a perturbed copy of ``fiducial``
    fn perturb(&mut self, fiducial: Vec<f64>) -> PyResult<Vec<f64>> {
        Ok(self.inner.perturb(&fiducial, &mut self.rng)?)
    }

    fn __repr__(&self) -> String {
        format!(
            "Fle(dims={}, ind_fle={:?}, sys_fle={:?})",
            self.inner.dims(),
            self.inner.ind_fle(),
            self.inner.sys_fle()
        )
    }
}

/// Result of one registration
///
/// Attributes:
///     success (bool): False until at least 3 fiducial pairs are registered
///     fre (float): achieved fiducial registration error
///     mean_fle_squared (float): expected squared FLE of the fixed points
///     expected_tre_squared (float)
///     expected_fre_squared (float)
///     transformed_target (tuple[float, float]): (-1, -1) when not registered
///     actual_tre (float)
///     no_fids (int)
#[pyclass(name = "RegistrationResult")]
#[derive(Debug, Clone)]
pub struct PyRegistrationResult {
    #[pyo3(get)]
    pub success: bool,
    #[pyo3(get)]
    pub fre: f64,
    #[pyo3(get)]
    pub mean_fle_squared: f64,
    #[pyo3(get)]
    pub expected_tre_squared: f64,
    #[pyo3(get)]
    pub expected_fre_squared: f64,
    #[pyo3(get)]
    pub transformed_target: (f64, f64),
    #[pyo3(get)]
    pub actual_tre: f64,
    #[pyo3(get)]
    pub no_fids: usize,
}

#[pymethods]
impl PyRegistrationResult {
    fn __repr__(&self) -> String {
        format!(
            "RegistrationResult(success={}, fre={:.3}, expected_tre_squared={:.3}, actual_tre={:.3}, no_fids={})",
            self.success, self.fre, self.expected_tre_squared, self.actual_tre, self.no_fids
        )
    }
}

impl From<&RegistrationResult> for PyRegistrationResult {
    fn from(result: &RegistrationResult) -> Self {
        Self {
            success: result.success,
            fre: result.fre,
            mean_fle_squared: result.mean_fle_squared,
            expected_tre_squared: result.expected_tre_squared,
            expected_fre_squared: result.expected_fre_squared,
            transformed_target: (result.transformed_target.x, result.transformed_target.y),
            actual_tre: result.actual_tre,
            no_fids: result.no_fids,
        }
    }
}

/// Point based registration with predicted TRE and FRE
///
/// Example:
///     >>> pbr = PointBasedRegistration((5.0, 5.0, 0.0), 2.0, 0.0)
///     >>> result = pbr.register(fixed_points, moving_points)
#[pyclass(name = "PointBasedRegistration")]
#[derive(Debug, Clone, Default)]
pub struct PyPointBasedRegistration {
    inner: PointBasedRegistration,
}

#[pymethods]
impl PyPointBasedRegistration {
    #[new]
    #[pyo3(signature = (target = None, fixed_fle_esv = 0.0, moving_fle_esv = 0.0))]
    fn new(
        target: Option<(f64, f64, f64)>,
        fixed_fle_esv: f64,
        moving_fle_esv: f64,
    ) -> PyResult<Self> {
        let inner = match target {
            Some(target) => {
                PointBasedRegistration::new(to_point(target), fixed_fle_esv, moving_fle_esv)?
            }
            None => PointBasedRegistration::default(),
        };
        Ok(Self { inner })
    }

    fn reinit(
        &mut self,
        target: (f64, f64, f64),
        fixed_fle_esv: f64,
        moving_fle_esv: f64,
    ) -> PyResult<()> {
        Ok(self
            .inner
            .reinit(to_point(target), fixed_fle_esv, moving_fle_esv)?)
    }

    fn register(
        &self,
        fixed_points: Vec<(f64, f64, f64)>,
        moving_points: Vec<(f64, f64, f64)>,
    ) -> PyResult<PyRegistrationResult> {
        let fixed: Vec<_> = fixed_points.into_iter().map(to_point).collect();
        let moving: Vec<_> = moving_points.into_iter().map(to_point).collect();
        let result = self.inner.register(&fixed, &moving)?;
        Ok((&result).into())
    }
}

/// Simulated ablation scored by overlap with the target sphere
#[pyclass(name = "Ablator")]
#[derive(Debug, Clone)]
pub struct PyAblator {
    inner: Ablator,
}

#[pymethods]
impl PyAblator {
    #[new]
    #[pyo3(signature = (margin = DEFAULT_MARGIN, margin_increment = DEFAULT_MARGIN_INCREMENT, margin_floor = 0.0))]
    fn new(margin: f64, margin_increment: f64, margin_floor: f64) -> Self {
        Self {
            inner: Ablator::new(margin, margin_increment).with_margin_floor(margin_floor),
        }
    }

    fn setup(&mut self, margin: f64, target: (f64, f64, f64), target_radius: f64) {
        self.inner.setup(margin, to_point(target), target_radius);
    }

    #[getter]
    fn margin(&self) -> f64 {
        self.inner.margin()
    }

    fn increase_margin(&mut self) -> Option<f64> {
        self.inner.increase_margin()
    }

    fn decrease_margin(&mut self) -> Option<f64> {
        self.inner.decrease_margin()
    }

    /// Score for ablating at ``estimated_target``, None before ``setup``
    fn ablate(&self, estimated_target: (f64, f64, f64)) -> Option<f64> {
        self.inner.ablate(&to_point(estimated_target))
    }
}

#[pyclass(name = "SimulationSummary")]
#[derive(Debug, Clone)]
pub struct PySimulationSummary {
    #[pyo3(get)]
    pub trials: usize,
    #[pyo3(get)]
    pub expected_tre_squared: f64,
    #[pyo3(get)]
    pub expected_fre_squared: f64,
    #[pyo3(get)]
    pub mean_actual_tre_squared: f64,
    #[pyo3(get)]
    pub mean_fre_squared: f64,
}

impl From<SimulationSummary> for PySimulationSummary {
    fn from(summary: SimulationSummary) -> Self {
        Self {
            trials: summary.trials,
            expected_tre_squared: summary.expected_tre_squared,
            expected_fre_squared: summary.expected_fre_squared,
            mean_actual_tre_squared: summary.mean_actual_tre_squared,
            mean_fre_squared: summary.mean_fre_squared,
        }
    }
}
