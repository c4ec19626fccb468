use nalgebra::Point3;
use rand::RngCore;

use crate::algorithms::ablation::Ablator;
use crate::algorithms::fle::Fle;
use crate::algorithms::point_based_reg::{PointBasedRegistration, RegistrationResult};
use crate::error::{FredError, Result};
use crate::io::config::GameConfig;
use crate::session::commands::{Command, DisplayUpdate, RoundSetup};
use crate::session::visibility::{StatsView, VisibilityBuffer};

/// Everything one game session owns between input events.
#[derive(Debug, Clone)]
pub struct SessionState {
    registration: PointBasedRegistration,
    fixed_points: Vec<Point3<f64>>,
    moving_points: Vec<Point3<f64>>,
    fixed_fle: Fle,
    moving_fle: Fle,
    last_result: Option<RegistrationResult>,
    ablator: Ablator,
    initial_margin: f64,
    target_radius: f64,
    total_score: f64,
    repeats_remaining: usize,
    round_open: bool,
    view: StatsView,
    visibility: VisibilityBuffer,
}

impl SessionState {
    pub fn new(config: &GameConfig) -> Result<Self> {
        config.validate()?;
        Ok(SessionState {
            registration: PointBasedRegistration::default(),
            fixed_points: Vec::new(),
            moving_points: Vec::new(),
            fixed_fle: Fle::default(),
            moving_fle: Fle::default(),
            last_result: None,
            ablator: Ablator::new(config.initial_margin, config.margin_increment)
                .with_margin_floor(config.margin_floor),
            initial_margin: config.initial_margin,
            target_radius: config.target_radius,
            total_score: 0.0,
            repeats_remaining: config.repeats,
            round_open: false,
            view: StatsView::ActualTre,
            visibility: VisibilityBuffer::new(config.visibility_buffer)?,
        })
    }

    pub fn fixed_points(&self) -> &[Point3<f64>] {
        &self.fixed_points
    }

    pub fn moving_points(&self) -> &[Point3<f64>] {
        &self.moving_points
    }

    pub fn last_result(&self) -> Option<&RegistrationResult> {
        self.last_result.as_ref()
    }

    pub fn margin(&self) -> f64 {
        self.ablator.margin()
    }

    pub fn total_score(&self) -> f64 {
        self.total_score
    }

    pub fn repeats_remaining(&self) -> usize {
        self.repeats_remaining
    }

    /// Statistics shown in the current round.
    pub fn view(&self) -> StatsView {
        self.view
    }

    pub fn is_game_over(&self) -> bool {
        self.repeats_remaining == 0
    }

    fn fiducials_update(&self) -> DisplayUpdate {
        DisplayUpdate::Fiducials {
            fixed: self.fixed_points.clone(),
            moving: self.moving_points.clone(),
        }
    }
}

/// Applies one input event to `state`.
///
/// Returns the next state and the display updates it produced. `state` is
/// left untouched, so on error the caller still holds the last good state.
/// `AddFiducial` before any round fails with `FredError::Uninitialised`.
pub fn handle(
    state: &SessionState,
    command: Command,
    rng: &mut dyn RngCore,
) -> Result<(SessionState, Vec<DisplayUpdate>)> {
    let mut next = state.clone();
    let mut updates = Vec::new();

    match command {
        Command::NewRound(setup) => {
            let target = setup.target;
            new_round(&mut next, setup)?;
            updates.push(DisplayUpdate::RoundStarted {
                target,
                fixed_fle_std_devs: next.fixed_fle.ind_fle().to_vec(),
                repeats_remaining: next.repeats_remaining,
                view: next.view,
            });
            updates.push(next.fiducials_update());
            updates.push(DisplayUpdate::Margin(next.ablator.margin()));
        }
        Command::AddFiducial { x, y } => {
            if !next.registration.is_ready() {
                return Err(FredError::Uninitialised);
            }
            if !next.round_open {
                log::warn!("round already ablated, ignoring fiducial at ({}, {})", x, y);
                return Ok((next, updates));
            }
            let clicked = Point3::new(x, y, 0.0);
            let fixed = next.fixed_fle.perturb_point(&clicked, rng)?;
            let moving = next.moving_fle.perturb_point(&clicked, rng)?;
            next.fixed_points.push(fixed);
            next.moving_points.push(moving);

            let result = next
                .registration
                .register(&next.fixed_points, &next.moving_points)?;
            updates.push(next.fiducials_update());
            if result.success {
                updates.push(DisplayUpdate::RegistrationStats {
                    fre: result.fre,
                    expected_fre: result.expected_fre(),
                    expected_tre: result.expected_tre(),
                    actual_tre: result.actual_tre,
                    mean_fle: result.mean_fle(),
                    no_fids: result.no_fids,
                    transformed_target: result.transformed_target,
                });
            }
            next.last_result = Some(result);
        }
        Command::IncreaseMargin => {
            if next.round_open {
                if let Some(margin) = next.ablator.increase_margin() {
                    updates.push(DisplayUpdate::Margin(margin));
                }
            }
        }
        Command::DecreaseMargin => {
            if next.round_open {
                if let Some(margin) = next.ablator.decrease_margin() {
                    updates.push(DisplayUpdate::Margin(margin));
                }
            }
        }
        Command::Ablate => ablate(&mut next, &mut updates, rng)?,
    }

    Ok((next, updates))
}

fn new_round(state: &mut SessionState, setup: RoundSetup) -> Result<()> {
    state.registration.reinit(
        setup.target,
        setup.fixed_fle.expected_squared_fle()?,
        setup.moving_fle.expected_squared_fle()?,
    )?;
    state.fixed_points.clear();
    state.moving_points.clear();
    state.fixed_fle = setup.fixed_fle;
    state.moving_fle = setup.moving_fle;
    state.last_result = None;
    state
        .ablator
        .setup(state.initial_margin, setup.target, state.target_radius);
    state.round_open = true;
    log::info!(
        "new round, target ({:.1}, {:.1}), {} repeats left",
        setup.target.x,
        setup.target.y,
        state.repeats_remaining
    );
    Ok(())
}

/// Scores the round. Once the rounds left fit in the visibility buffer,
/// each following round gets a freshly drawn view.
fn ablate(
    state: &mut SessionState,
    updates: &mut Vec<DisplayUpdate>,
    rng: &mut dyn RngCore,
) -> Result<()> {
    if !state.round_open || state.is_game_over() {
        return Ok(());
    }
    let Some(result) = state.last_result.as_ref().filter(|r| r.success) else {
        return Ok(());
    };
    let Some(score) = state.ablator.ablate(&result.transformed_target_3d()) else {
        return Ok(());
    };

    let view = state.view;
    let rounds_left = state.repeats_remaining - 1;
    if rounds_left > 0 && rounds_left <= state.visibility.len() {
        state.view = state.visibility.next_view(rng)?;
        log::debug!("next round shows {}", state.view.label());
    }

    state.total_score += score;
    state.repeats_remaining = rounds_left;
    state.round_open = false;
    updates.push(DisplayUpdate::Score {
        score,
        total_score: state.total_score,
        view,
    });
    if state.is_game_over() {
        log::info!("game over, total score {:.2}", state.total_score);
        updates.push(DisplayUpdate::GameOver {
            total_score: state.total_score,
        });
    }
    Ok(())
}
