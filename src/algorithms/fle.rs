//! Fiducial localisation error (FLE) model.
//!
//! An [`Fle`] holds per axis magnitudes for an independent and a
//! systematic error term, and the functions used to apply each term to a
//! true fiducial location.

use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::fmt;
use std::sync::Arc;

use crate::algorithms::errors::expected_squared_value;
use crate::error::{FredError, Result};

/// Applies one error term: `(location, magnitudes, rng) -> perturbed location`.
pub type FleFunction = Arc<dyn Fn(&[f64], &[f64], &mut dyn RngCore) -> Vec<f64> + Send + Sync>;

/// Normal distribution with a finite, non-negative standard deviation.
pub fn normal_distribution(mean: f64, std_dev: f64) -> Result<Normal<f64>> {
    if !std_dev.is_finite() {
        return Err(FredError::InvalidValue(format!(
            "standard deviation must be finite, got {}",
            std_dev
        )));
    }
    Normal::new(mean, std_dev).map_err(|e| {
        FredError::InvalidValue(format!(
            "cannot sample N({}, {}^2): {}",
            mean, std_dev, e
        ))
    })
}

/// Default independent error: normal noise with per axis standard deviation.
/// An invalid standard deviation yields NaN on that axis.
pub fn normal_fle(location: &[f64], std_devs: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
    location
        .iter()
        .zip(std_devs)
        .map(|(&x, &sd)| match normal_distribution(x, sd) {
            Ok(normal) => normal.sample(&mut *rng),
            Err(_) => f64::NAN,
        })
        .collect()
}

/// Default systematic error: a fixed per axis offset.
pub fn additive_fle(location: &[f64], offsets: &[f64], _rng: &mut dyn RngCore) -> Vec<f64> {
    location.iter().zip(offsets).map(|(x, o)| x + o).collect()
}

/// Uniform noise in `[-magnitude, magnitude]` per axis.
pub fn uniform_fle(location: &[f64], magnitudes: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
    location
        .iter()
        .zip(magnitudes)
        .map(|(&x, &m)| x + m * (2.0 * rng.random::<f64>() - 1.0))
        .collect()
}

/// Broadcasts a single magnitude, or checks a per axis one, to `dims` values.
/// Standard deviations must be non-negative, offsets only finite.
fn set_fle(fle: Option<&[f64]>, dims: usize, non_negative: bool) -> Result<Vec<f64>> {
    let values = match fle {
        None => vec![0.0; dims],
        Some([single]) => vec![*single; dims],
        Some(values) if values.len() == dims => values.to_vec(),
        Some(values) => {
            return Err(FredError::InvalidValue(format!(
                "FLE value must be a single value or array of length {}, got length {}",
                dims,
                values.len()
            )))
        }
    };
    if values.iter().any(|v| !v.is_finite()) {
        return Err(FredError::InvalidType(
            "FLE values must be finite real numbers".to_string(),
        ));
    }
    if non_negative && values.iter().any(|&v| v < 0.0) {
        return Err(FredError::InvalidValue(
            "independent FLE standard deviations must not be negative".to_string(),
        ));
    }
    Ok(values)
}

/// Picks the user function or the default, rejecting a value plus a function.
fn set_fle_function(
    name: &str,
    value_given: bool,
    function: Option<FleFunction>,
    default: FleFunction,
) -> Result<FleFunction> {
    match function {
        Some(_) if value_given => Err(FredError::InvalidValue(format!(
            "{} FLE was given both a value and a sampling function",
            name
        ))),
        Some(function) => Ok(function),
        None => Ok(default),
    }
}

/// Runs `function` once on the configured magnitudes to check its output shape.
fn self_test(name: &str, function: &FleFunction, fle: &[f64]) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(0);
    let out = function(fle, fle, &mut rng);
    if out.len() != fle.len() || out.iter().any(|v| !v.is_finite()) {
        return Err(FredError::InvalidType(format!(
            "{} FLE function returned {} values for a {} dimensional location",
            name,
            out.len(),
            fle.len()
        )));
    }
    Ok(())
}

#[derive(Default)]
pub struct FleBuilder {
    dims: Option<usize>,
    independent_fle: Option<Vec<f64>>,
    independent_function: Option<FleFunction>,
    systematic_fle: Option<Vec<f64>>,
    systematic_function: Option<FleFunction>,
}

impl FleBuilder {
    /// Working dimensionality, 2 or 3. Defaults to 3.
    pub fn dims(mut self, dims: usize) -> Self {
        self.dims = Some(dims);
        self
    }

    /// Independent error magnitude(s), a single value or one per axis.
    pub fn independent_fle(mut self, fle: &[f64]) -> Self {
        self.independent_fle = Some(fle.to_vec());
        self
    }

    pub fn independent_function(mut self, function: FleFunction) -> Self {
        self.independent_function = Some(function);
        self
    }

    /// Systematic error magnitude(s), a single value or one per axis.
    pub fn systematic_fle(mut self, fle: &[f64]) -> Self {
        self.systematic_fle = Some(fle.to_vec());
        self
    }

    pub fn systematic_function(mut self, function: FleFunction) -> Self {
        self.systematic_function = Some(function);
        self
    }

    pub fn build(self) -> Result<Fle> {
        let dims = self.dims.unwrap_or(3);
        if !(2..=3).contains(&dims) {
            return Err(FredError::InvalidValue(format!(
                "FLE dimension must be 2 or 3, got {}",
                dims
            )));
        }

        let ind_fle = set_fle(self.independent_fle.as_deref(), dims, true)?;
        let sys_fle = set_fle(self.systematic_fle.as_deref(), dims, false)?;

        let ind_function = set_fle_function(
            "independent",
            self.independent_fle.is_some(),
            self.independent_function,
            Arc::new(normal_fle),
        )?;
        let sys_function = set_fle_function(
            "systematic",
            self.systematic_fle.is_some(),
            self.systematic_function,
            Arc::new(additive_fle),
        )?;

        self_test("independent", &ind_function, &ind_fle)?;
        self_test("systematic", &sys_function, &sys_fle)?;

        Ok(Fle {
            dims,
            ind_fle,
            sys_fle,
            ind_function,
            sys_function,
        })
    }
}

/// Localisation error model applied identically to every fiducial of a point set.
#[derive(Clone)]
pub struct Fle {
    dims: usize,
    ind_fle: Vec<f64>,
    sys_fle: Vec<f64>,
    ind_function: FleFunction,
    sys_function: FleFunction,
}

impl fmt::Debug for Fle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fle")
            .field("dims", &self.dims)
            .field("ind_fle", &self.ind_fle)
            .field("sys_fle", &self.sys_fle)
            .finish_non_exhaustive()
    }
}

impl Default for Fle {
    /// Three dimensional model with no error.
    fn default() -> Self {
        Fle {
            dims: 3,
            ind_fle: vec![0.0; 3],
            sys_fle: vec![0.0; 3],
            ind_function: Arc::new(normal_fle),
            sys_function: Arc::new(additive_fle),
        }
    }
}

impl Fle {
    pub fn builder() -> FleBuilder {
        FleBuilder::default()
    }

    /// Normal independent error with the given per axis standard deviations.
    /// Two values give a 2D model, anything else a 3D one.
    pub fn normal(std_devs: &[f64]) -> Result<Fle> {
        let dims = if std_devs.len() == 2 { 2 } else { 3 };
        Fle::builder()
            .dims(dims)
            .independent_fle(std_devs)
            .build()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn ind_fle(&self) -> &[f64] {
        &self.ind_fle
    }

    pub fn sys_fle(&self) -> &[f64] {
        &self.sys_fle
    }

    /// Expected squared independent FLE, Σσ², as used by the error estimators.
    pub fn expected_squared_fle(&self) -> Result<f64> {
        expected_squared_value(&self.ind_fle)
    }

    /// Applies the independent then the systematic error to a true location.
    pub fn perturb(&self, fiducial: &[f64], rng: &mut dyn RngCore) -> Result<Vec<f64>> {
        if fiducial.len() != self.dims {
            return Err(FredError::InvalidValue(format!(
                "fiducial has {} coordinates, FLE model is {} dimensional",
                fiducial.len(),
                self.dims
            )));
        }
        let independent = (self.ind_function)(fiducial, &self.ind_fle, rng);
        let moved = (self.sys_function)(&independent, &self.sys_fle, rng);
        if moved.len() != self.dims {
            return Err(FredError::InvalidType(format!(
                "FLE functions returned {} coordinates, expected {}",
                moved.len(),
                self.dims
            )));
        }
        if moved.iter().any(|v| !v.is_finite()) {
            return Err(FredError::InvalidType(
                "FLE functions returned a non-finite coordinate".to_string(),
            ));
        }
        Ok(moved)
    }

    /// Perturbs the first `dims` coordinates of a 3D fiducial.
    pub fn perturb_point(&self, fiducial: &Point3<f64>, rng: &mut dyn RngCore) -> Result<Point3<f64>> {
        let moved = self.perturb(&fiducial.coords.as_slice()[..self.dims], rng)?;
        let mut out = *fiducial;
        for (axis, value) in moved.into_iter().enumerate() {
            out[axis] = value;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fle_default() {
        let fle = Fle::builder().build().unwrap();
        assert_eq!(fle.dims(), 3);
        assert_eq!(fle.ind_fle(), &[0.0, 0.0, 0.0]);
        assert_eq!(fle.sys_fle(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_fle_single_value_broadcast() {
        let fle = Fle::builder()
            .independent_fle(&[1.0])
            .systematic_fle(&[0.0])
            .build()
            .unwrap();
        assert_eq!(fle.ind_fle(), &[1.0, 1.0, 1.0]);
        assert_eq!(fle.sys_fle(), &[0.0, 0.0, 0.0]);

        let fle = Fle::builder()
            .dims(2)
            .independent_fle(&[0.0])
            .systematic_fle(&[2.0])
            .build()
            .unwrap();
        assert_eq!(fle.sys_fle(), &[2.0, 2.0]);
        assert_eq!(fle.ind_fle(), &[0.0, 0.0]);
    }

    #[test]
    fn test_fle_anisotropic() {
        let fle = Fle::builder()
            .independent_fle(&[1.0, 2.0, 0.0])
            .build()
            .unwrap();
        assert_eq!(fle.ind_fle(), &[1.0, 2.0, 0.0]);
        assert_relative_eq!(fle.expected_squared_fle().unwrap(), 5.0);
    }

    #[test]
    fn test_fle_wrong_length() {
        let result = Fle::builder().independent_fle(&[1.0, 2.0]).build();
        assert!(matches!(result, Err(FredError::InvalidValue(_))));

        let result = Fle::builder().dims(2).systematic_fle(&[1.0, 2.0, 3.0]).build();
        assert!(matches!(result, Err(FredError::InvalidValue(_))));
    }

    #[test]
    fn test_fle_negative_or_bad_dims() {
        assert!(Fle::builder().independent_fle(&[-1.0]).build().is_err());
        assert!(Fle::builder().dims(4).build().is_err());
    }

    #[test]
    fn test_negative_systematic_offset_is_allowed() {
        let fle = Fle::builder()
            .dims(2)
            .systematic_fle(&[-2.0])
            .build()
            .unwrap();
        assert_eq!(fle.sys_fle(), &[-2.0, -2.0]);

        let result = Fle::builder().systematic_fle(&[f64::NAN]).build();
        assert!(matches!(result, Err(FredError::InvalidType(_))));
    }

    #[test]
    fn test_normal_distribution_rejects_bad_std_dev() {
        assert!(normal_distribution(0.0, 1.0).is_ok());
        assert!(matches!(
            normal_distribution(0.0, -1.0),
            Err(FredError::InvalidValue(_))
        ));
        assert!(matches!(
            normal_distribution(0.0, f64::INFINITY),
            Err(FredError::InvalidValue(_))
        ));

        let mut rng = StdRng::seed_from_u64(0);
        let moved = normal_fle(&[1.0, 2.0], &[0.0, -1.0], &mut rng);
        assert_eq!(moved[0], 1.0);
        assert!(moved[1].is_nan());
    }

    #[test]
    fn test_fle_value_and_function_is_ambiguous() {
        let result = Fle::builder()
            .independent_fle(&[1.0])
            .independent_function(Arc::new(uniform_fle))
            .build();
        assert!(matches!(result, Err(FredError::InvalidValue(_))));

        let result = Fle::builder()
            .systematic_fle(&[1.0])
            .systematic_function(Arc::new(additive_fle))
            .build();
        assert!(matches!(result, Err(FredError::InvalidValue(_))));
    }

    #[test]
    fn test_fle_incompatible_function() {
        let bad: FleFunction = Arc::new(|_loc, _fle, _rng| vec![0.0]);
        let result = Fle::builder().independent_function(bad).build();
        assert!(matches!(result, Err(FredError::InvalidType(_))));
    }

    #[test]
    fn test_fle_custom_function() {
        let shift: FleFunction =
            Arc::new(|loc, _fle, _rng| loc.iter().map(|x| x + 0.5).collect());
        let fle = Fle::builder()
            .systematic_function(shift)
            .build()
            .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let moved = fle.perturb(&[1.0, 2.0, 3.0], &mut rng).unwrap();
        assert_eq!(moved, vec![1.5, 2.5, 3.5]);
    }

    #[test]
    fn test_perturb_does_not_mutate_and_adds_systematic() {
        let fle = Fle::builder()
            .systematic_fle(&[1.0, -1.0, 0.5])
            .build()
            .unwrap();
        let fiducial = [10.0, 10.0, 10.0];
        let mut rng = StdRng::seed_from_u64(1);
        let moved = fle.perturb(&fiducial, &mut rng).unwrap();
        assert_eq!(fiducial, [10.0, 10.0, 10.0]);
        assert_eq!(moved, vec![11.0, 9.0, 10.5]);
    }

    #[test]
    fn test_perturb_point_statistics() {
        let fle = Fle::normal(&[2.0, 2.0, 0.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let fiducial = Point3::new(5.0, -5.0, 1.0);
        let n = 20_000;
        let mut sum_sq = 0.0;
        for _ in 0..n {
            let moved = fle.perturb_point(&fiducial, &mut rng).unwrap();
            assert_eq!(moved.z, 1.0);
            sum_sq += (moved - fiducial).norm_squared();
        }
        assert_relative_eq!(sum_sq / n as f64, 8.0, max_relative = 0.05);
    }

    #[test]
    fn test_perturb_point_2d_model_keeps_z() {
        let fle = Fle::normal(&[1.0, 1.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let moved = fle.perturb_point(&Point3::new(0.0, 0.0, 4.0), &mut rng).unwrap();
        assert_eq!(moved.z, 4.0);
    }

    #[test]
    fn test_perturb_wrong_dimension() {
        let fle = Fle::default();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(fle.perturb(&[1.0, 2.0], &mut rng).is_err());
    }
}
