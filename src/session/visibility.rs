//! Which registration statistics the player is shown in each round.
//!
//! The first rounds of a game show the actual TRE. The remaining rounds
//! each show one other statistic, drawn without replacement from a
//! [`VisibilityBuffer`] holding an equal share of the four alternatives.

use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{FredError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatsView {
    ActualTre,
    FleAndFids,
    ExpectedTre,
    ExpectedFre,
    ActualFre,
}

/// Flags for the statistics panel. Score, total score, margin and repeats
/// are always shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub fids: bool,
    pub actual_tre: bool,
    pub expected_tre: bool,
    pub expected_fre: bool,
    pub actual_fre: bool,
}

impl StatsView {
    /// Views dealt out by a [`VisibilityBuffer`].
    pub const ROTATION: [StatsView; 4] = [
        StatsView::FleAndFids,
        StatsView::ExpectedTre,
        StatsView::ExpectedFre,
        StatsView::ActualFre,
    ];

    /// Name written to the results log next to the round's score.
    pub fn label(&self) -> &'static str {
        match self {
            StatsView::ActualTre => "Actual TRE",
            StatsView::FleAndFids => "FLE and Number of Fids",
            StatsView::ExpectedTre => "Expected TRE",
            StatsView::ExpectedFre => "Expected FRE",
            StatsView::ActualFre => "Actual FRE",
        }
    }

    pub fn visibility(&self) -> Visibility {
        let hidden = Visibility {
            fids: false,
            actual_tre: false,
            expected_tre: false,
            expected_fre: false,
            actual_fre: false,
        };
        match self {
            StatsView::ActualTre => Visibility {
                fids: true,
                actual_tre: true,
                ..hidden
            },
            StatsView::FleAndFids => Visibility {
                fids: true,
                ..hidden
            },
            StatsView::ExpectedTre => Visibility {
                expected_tre: true,
                ..hidden
            },
            StatsView::ExpectedFre => Visibility {
                expected_fre: true,
                ..hidden
            },
            StatsView::ActualFre => Visibility {
                actual_fre: true,
                ..hidden
            },
        }
    }
}

/// Views still to be dealt in this game.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityBuffer {
    views: Vec<StatsView>,
}

impl VisibilityBuffer {
    /// Buffer with `size / 4` copies of each rotating view. `size` must be a
    /// multiple of 4.
    pub fn new(size: usize) -> Result<Self> {
        if size % StatsView::ROTATION.len() != 0 {
            return Err(FredError::InvalidValue(format!(
                "visibility buffer size must be divisible by {}, got {}",
                StatsView::ROTATION.len(),
                size
            )));
        }
        let each = size / StatsView::ROTATION.len();
        let views = StatsView::ROTATION
            .iter()
            .flat_map(|&view| std::iter::repeat(view).take(each))
            .collect();
        Ok(VisibilityBuffer { views })
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Shuffles the remaining views and removes one.
    pub fn next_view(&mut self, rng: &mut dyn RngCore) -> Result<StatsView> {
        self.views.shuffle(rng);
        self.views.pop().ok_or_else(|| {
            FredError::InvalidValue("visibility buffer is exhausted".to_string())
        })
    }
}
