//! Point based registration with predicted and actual error.

use nalgebra::{DMatrix, Point2, Point3};

use crate::algorithms::errors::{compute_fre_2d, compute_tre_from_fle_2d};
use crate::algorithms::procrustes::{orthogonal_procrustes, RigidTransform};
use crate::error::{FredError, Result};

/// Reported as the transformed target until a registration succeeds.
pub const TARGET_SENTINEL: [f64; 2] = [-1.0, -1.0];

/// Minimum number of point pairs needed to register.
pub const MIN_FIDUCIALS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationResult {
    pub success: bool,
    /// Achieved fiducial registration error (RMS).
    pub fre: f64,
    /// Expected squared FLE of the fixed point set, echoed from the session.
    pub mean_fle_squared: f64,
    pub expected_tre_squared: f64,
    pub expected_fre_squared: f64,
    /// Target mapped into fixed space, projected onto the x-y plane for display.
    pub transformed_target: Point2<f64>,
    /// Distance between the transformed and the true target.
    pub actual_tre: f64,
    pub no_fids: usize,
    pub transform: Option<RigidTransform>,
}

impl RegistrationResult {
    fn not_registered(mean_fle_squared: f64, no_fids: usize) -> Self {
        RegistrationResult {
            success: false,
            fre: 0.0,
            mean_fle_squared,
            expected_tre_squared: 0.0,
            expected_fre_squared: 0.0,
            transformed_target: Point2::from(TARGET_SENTINEL),
            actual_tre: 0.0,
            no_fids,
            transform: None,
        }
    }

    pub fn mean_fle(&self) -> f64 {
        self.mean_fle_squared.sqrt()
    }

    pub fn expected_tre(&self) -> f64 {
        self.expected_tre_squared.sqrt()
    }

    pub fn expected_fre(&self) -> f64 {
        self.expected_fre_squared.sqrt()
    }

    /// Transformed target in the z = 0 image plane.
    pub fn transformed_target_3d(&self) -> Point3<f64> {
        Point3::new(self.transformed_target.x, self.transformed_target.y, 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RegistrationSetup {
    target: Point3<f64>,
    fixed_fle_esv: f64,
    moving_fle_esv: f64,
}

/// Registration session for one scene.
///
/// Holds the ground truth target and the expected squared FLE of each point
/// set. Point sets are owned by the caller and passed in whole on every
/// call to [`PointBasedRegistration::register`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointBasedRegistration {
    setup: Option<RegistrationSetup>,
}

fn points_2d(points: &[Point3<f64>]) -> DMatrix<f64> {
    DMatrix::from_fn(points.len(), 2, |r, c| points[r][c])
}

impl PointBasedRegistration {
    pub fn new(target: Point3<f64>, fixed_fle_esv: f64, moving_fle_esv: f64) -> Result<Self> {
        let mut pbr = PointBasedRegistration::default();
        pbr.reinit(target, fixed_fle_esv, moving_fle_esv)?;
        Ok(pbr)
    }

    /// Replaces the target and FLE statistics, e.g. for a new game round.
    ///
    /// Only error on the fixed side is modelled, a non zero moving FLE is
    /// rejected with [`FredError::NotImplemented`].
    pub fn reinit(
        &mut self,
        target: Point3<f64>,
        fixed_fle_esv: f64,
        moving_fle_esv: f64,
    ) -> Result<()> {
        if !fixed_fle_esv.is_finite() || fixed_fle_esv < 0.0 {
            return Err(FredError::InvalidValue(format!(
                "fixed FLE statistic must be a non negative real, got {}",
                fixed_fle_esv
            )));
        }
        if target.coords.iter().any(|v| !v.is_finite()) {
            return Err(FredError::InvalidType(
                "target must contain only finite real values".to_string(),
            ));
        }
        if moving_fle_esv != 0.0 {
            return Err(FredError::NotImplemented(
                "currently only supports zero moving FLE".to_string(),
            ));
        }

        self.setup = Some(RegistrationSetup {
            target,
            fixed_fle_esv,
            moving_fle_esv,
        });
        log::debug!(
            "registration initialised, target {:?}, fixed FLE² {:.3}",
            target,
            fixed_fle_esv
        );
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.setup.is_some()
    }

    pub fn target(&self) -> Option<&Point3<f64>> {
        self.setup.as_ref().map(|s| &s.target)
    }

    pub fn fixed_fle_esv(&self) -> Option<f64> {
        self.setup.map(|s| s.fixed_fle_esv)
    }

    pub fn moving_fle_esv(&self) -> Option<f64> {
        self.setup.map(|s| s.moving_fle_esv)
    }

    /// Registers co-indexed `fixed` and `moving` point sets.
    ///
    /// With fewer than three pairs this returns an unsuccessful result rather
    /// than an error. Procrustes and estimator failures are propagated.
    pub fn register(
        &self,
        fixed_points: &[Point3<f64>],
        moving_points: &[Point3<f64>],
    ) -> Result<RegistrationResult> {
        let setup = self.setup.ok_or(FredError::Uninitialised)?;

        if fixed_points.len() != moving_points.len() {
            return Err(FredError::InvalidValue(format!(
                "fixed and moving point sets differ in length ({} vs {})",
                fixed_points.len(),
                moving_points.len()
            )));
        }

        let no_fids = fixed_points.len();
        if no_fids < MIN_FIDUCIALS {
            return Ok(RegistrationResult::not_registered(
                setup.fixed_fle_esv,
                no_fids,
            ));
        }

        let procrustes = orthogonal_procrustes(fixed_points, moving_points)?;

        let moving_2d = points_2d(moving_points);
        let target_2d = DMatrix::from_row_slice(1, 2, &[setup.target.x, setup.target.y]);
        let expected_tre_squared =
            compute_tre_from_fle_2d(&moving_2d, setup.fixed_fle_esv, &target_2d)?;
        let expected_fre_squared = compute_fre_2d(&moving_2d, setup.fixed_fle_esv)?;

        let transformed = procrustes.transform.apply_to_point(&setup.target);
        let transformed_target = Point2::new(transformed.x, transformed.y);
        let actual_tre = (transformed - setup.target).norm();

        log::debug!(
            "registered {} fiducials: FRE {:.3}, actual TRE {:.3}, expected TRE² {:.3}",
            no_fids,
            procrustes.fre,
            actual_tre,
            expected_tre_squared
        );

        Ok(RegistrationResult {
            success: true,
            fre: procrustes.fre,
            mean_fle_squared: setup.fixed_fle_esv,
            expected_tre_squared,
            expected_fre_squared,
            transformed_target,
            actual_tre,
            no_fids,
            transform: Some(procrustes.transform),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::errors::expected_squared_value;
    use crate::utils::test_utils::{circle_fiducials, rotate_point_z};
    use approx::assert_relative_eq;

    #[test]
    fn test_register_uninitialised() {
        let pbr = PointBasedRegistration::default();
        let points = circle_fiducials(4, (0.0, 0.0), 1.0);
        assert_eq!(
            pbr.register(&points, &points),
            Err(FredError::Uninitialised)
        );
    }

    #[test]
    fn test_register_too_few_fiducials() {
        let pbr = PointBasedRegistration::new(Point3::new(1.0, 1.0, 0.0), 2.0, 0.0).unwrap();
        let points = circle_fiducials(2, (0.0, 0.0), 1.0);
        let result = pbr.register(&points, &points).unwrap();
        assert!(!result.success);
        assert_eq!(result.fre, 0.0);
        assert_eq!(result.expected_tre_squared, 0.0);
        assert_eq!(result.expected_fre_squared, 0.0);
        assert_eq!(result.actual_tre, 0.0);
        assert_eq!(result.transformed_target, Point2::from(TARGET_SENTINEL));
        assert_eq!(result.no_fids, 2);
        assert_eq!(result.mean_fle_squared, 2.0);

        let empty = pbr.register(&[], &[]).unwrap();
        assert!(!empty.success);
        assert_eq!(empty.no_fids, 0);
    }

    #[test]
    fn test_register_noiseless_identity() {
        let target = Point3::new(0.3, -0.2, 0.0);
        let pbr = PointBasedRegistration::new(target, 2.0, 0.0).unwrap();
        let points = circle_fiducials(5, (10.0, 20.0), 4.0);
        let result = pbr.register(&points, &points).unwrap();
        assert!(result.success);
        assert_relative_eq!(result.fre, 0.0, epsilon = 1e-9);
        assert_relative_eq!(result.actual_tre, 0.0, epsilon = 1e-9);
        assert_relative_eq!(result.transformed_target, Point2::new(0.3, -0.2), epsilon = 1e-9);
        assert_eq!(result.no_fids, 5);
        assert_relative_eq!(result.expected_fre_squared, (1.0 - 2.0 / 5.0) * 2.0);
    }

    #[test]
    fn test_register_expected_values_match_estimators() {
        let target = Point3::new(0.0, 0.0, 0.0);
        let fle_esv = expected_squared_value(&[1.0, 1.0, 0.0]).unwrap();
        let pbr = PointBasedRegistration::new(target, fle_esv, 0.0).unwrap();
        let moving = circle_fiducials(3, (0.0, 0.0), 2.0);
        let result = pbr.register(&moving, &moving).unwrap();
        assert_relative_eq!(result.expected_tre_squared, fle_esv / 3.0, epsilon = 1e-12);
        assert_relative_eq!(result.expected_fre_squared, fle_esv / 3.0, epsilon = 1e-12);
        assert_relative_eq!(result.expected_tre(), (fle_esv / 3.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_register_rotated_fixed_space() {
        let target = Point3::new(3.0, 0.0, 0.0);
        let pbr = PointBasedRegistration::new(target, 1.0, 0.0).unwrap();
        let moving = circle_fiducials(6, (0.0, 0.0), 5.0);
        let fixed: Vec<_> = moving
            .iter()
            .map(|p| rotate_point_z(p, 0.1, (0.0, 0.0)))
            .collect();
        let result = pbr.register(&fixed, &moving).unwrap();
        let expected = rotate_point_z(&target, 0.1, (0.0, 0.0));
        assert_relative_eq!(result.transformed_target.x, expected.x, epsilon = 1e-9);
        assert_relative_eq!(result.transformed_target.y, expected.y, epsilon = 1e-9);
        assert_relative_eq!(result.actual_tre, (expected - target).norm(), epsilon = 1e-9);
    }

    #[test]
    fn test_actual_tre_includes_out_of_plane_error() {
        let pbr = PointBasedRegistration::new(Point3::origin(), 1.0, 0.0).unwrap();
        let moving = circle_fiducials(4, (0.0, 0.0), 1.0);
        let fixed: Vec<_> = moving
            .iter()
            .map(|p| Point3::new(p.x, p.y, p.z + 1.0))
            .collect();
        let result = pbr.register(&fixed, &moving).unwrap();
        assert!(result.success);
        assert_relative_eq!(result.actual_tre, 1.0, epsilon = 1e-9);
        assert_relative_eq!(result.transformed_target, Point2::origin(), epsilon = 1e-9);
    }

    #[test]
    fn test_register_mismatched_lengths() {
        let pbr = PointBasedRegistration::new(Point3::origin(), 1.0, 0.0).unwrap();
        let points = circle_fiducials(4, (0.0, 0.0), 1.0);
        assert!(matches!(
            pbr.register(&points, &points[..3]),
            Err(FredError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_register_collinear_fiducials_propagates() {
        let pbr = PointBasedRegistration::new(Point3::new(0.0, 1.0, 0.0), 1.0, 0.0).unwrap();
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        assert!(matches!(
            pbr.register(&points, &points),
            Err(FredError::Degenerate(_))
        ));
    }

    #[test]
    fn test_reinit() {
        let mut pbr = PointBasedRegistration::new(Point3::origin(), 1.0, 0.0).unwrap();
        pbr.reinit(Point3::new(5.0, 5.0, 0.0), 4.0, 0.0).unwrap();
        assert_eq!(pbr.target(), Some(&Point3::new(5.0, 5.0, 0.0)));
        assert_eq!(pbr.fixed_fle_esv(), Some(4.0));

        assert!(matches!(
            pbr.reinit(Point3::origin(), 1.0, 0.5),
            Err(FredError::NotImplemented(_))
        ));
        assert!(matches!(
            pbr.reinit(Point3::origin(), -1.0, 0.0),
            Err(FredError::InvalidValue(_))
        ));
        // failed reinit keeps the previous round
        assert_eq!(pbr.fixed_fle_esv(), Some(4.0));
    }
}
