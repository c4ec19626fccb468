//! Fiducial registration educational demonstration.
//!
//! Point based rigid registration with Fitzpatrick's predicted target and
//! fiducial registration errors, a simulated ablation score, and a command
//! driven game session on top.

pub mod algorithms;
pub mod entry;
pub mod error;
pub mod io;
pub mod session;
pub mod simulation;
pub mod utils;

#[cfg(feature = "python")]
mod binding;

pub use algorithms::ablation::Ablator;
pub use algorithms::errors::{
    compute_fre_2d, compute_tre_from_fle_2d, expected_absolute_value, expected_squared_value,
};
pub use algorithms::fle::Fle;
pub use algorithms::point_based_reg::{PointBasedRegistration, RegistrationResult};
pub use algorithms::procrustes::{orthogonal_procrustes, RigidTransform};
pub use error::{FredError, Result};
pub use io::config::FredConfig;
pub use session::{handle, Command, DisplayUpdate, RoundSetup, SessionState, StatsView};
pub use simulation::{simulate_registration, SimulationSummary};
