pub mod ablation;
pub mod errors;
pub mod fle;
pub mod point_based_reg;
pub mod procrustes;
pub mod scores;
pub mod target;
