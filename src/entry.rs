use anyhow::{Context, Result};
use nalgebra::Point2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::path::Path;

use crate::io::config::FredConfig;
use crate::io::fred_logger::ResultLogger;
use crate::session::{handle, Command, DisplayUpdate, RoundSetup, SessionState};
use crate::simulation::{simulate_registration, SimulationSummary};

/// Runs the Monte Carlo simulation described by the `[simulation]` section
/// of `config_path`. The summary is also written as JSON when
/// `summary_path` is given.
pub fn run_simulation(config_path: &str, summary_path: Option<&str>) -> Result<SimulationSummary> {
    let config = FredConfig::from_file(config_path)?;
    let summary = simulate_registration(&config.simulation)
        .with_context(|| format!("simulation from {} failed", config_path))?;

    if let Some(path) = summary_path {
        write_summary(&summary, path)?;
    }
    Ok(summary)
}

fn write_summary<P: AsRef<Path>>(summary: &SimulationSummary, path: P) -> Result<()> {
    let file = File::create(&path)
        .with_context(|| format!("failed to create {:?}", path.as_ref()))?;
    serde_json::to_writer_pretty(file, summary)
        .with_context(|| format!("failed to write summary to {:?}", path.as_ref()))?;
    log::info!("simulation summary written to {:?}", path.as_ref());
    Ok(())
}

/// Plays one round from a configuration file, see [`play_scripted_round`].
pub fn run_scripted_round(
    config_path: &str,
    outline: &[Point2<f64>],
    clicks: &[(f64, f64)],
    seed: u64,
) -> Result<Vec<DisplayUpdate>> {
    let config = FredConfig::from_file(config_path)?;
    play_scripted_round(&config, outline, clicks, seed)
}

/// Plays one game round without a display: a random target and FLE are
/// drawn inside `outline`, each click is placed as a fiducial and the
/// round ends with an ablation. Registrations and the score go to the
/// results log when `[logger]` is configured.
pub fn play_scripted_round(
    config: &FredConfig,
    outline: &[Point2<f64>],
    clicks: &[(f64, f64)],
    seed: u64,
) -> Result<Vec<DisplayUpdate>> {
    let mut logger = ResultLogger::new(config.logger.as_ref())?;
    let mut rng = StdRng::seed_from_u64(seed);

    let setup = RoundSetup::random(outline, &config.game, &mut rng)
        .context("failed to set up round")?;
    let commands = std::iter::once(Command::NewRound(setup))
        .chain(clicks.iter().map(|&(x, y)| Command::AddFiducial { x, y }))
        .chain(std::iter::once(Command::Ablate));

    let mut state = SessionState::new(&config.game).context("invalid game configuration")?;
    let mut all_updates = Vec::new();
    for command in commands {
        let (next, updates) =
            handle(&state, command, &mut rng).context("session command failed")?;
        for update in &updates {
            match *update {
                DisplayUpdate::RegistrationStats {
                    fre,
                    expected_fre,
                    expected_tre,
                    actual_tre,
                    mean_fle,
                    no_fids,
                    ..
                } => logger.log_result(actual_tre, fre, expected_tre, expected_fre, mean_fle, no_fids)?,
                DisplayUpdate::Score { score, view, .. } => logger.log_score(view.label(), score)?,
                _ => {}
            }
        }
        all_updates.extend(updates);
        state = next;
    }

    if state.last_result().map_or(true, |r| !r.success) {
        log::warn!(
            "round ended with {} fiducials, not enough to register",
            clicks.len()
        );
    }
    Ok(all_updates)
}
