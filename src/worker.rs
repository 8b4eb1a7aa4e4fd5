use std::sync::mpsc::{self, Receiver, TryRecvError};

use tracing::debug;

use crate::config::{ModelParams, SimulationConfig};
use crate::error::{Result, ValuationError};
use crate::scenario::{self, Scenario, ScenarioResult};
use crate::scoring::{Molecule, Scorecard};
use crate::simulation::{self, MoleculeSimulation, SimulationResult};

/// One-shot handle to a run on the rayon pool. Dropping it abandons the run;
/// the worker finishes and its result is discarded.
pub struct SimulationHandle<T> {
    receiver: Receiver<Result<T>>,
}

impl<T> SimulationHandle<T> {
    /// Block until the run completes.
    pub fn wait(self) -> Result<T> {
        self.receiver.recv().map_err(|_| ValuationError::WorkerLost)?
    }

    /// Poll for the result. `None` while the run is still in flight.
    pub fn try_result(&self) -> Option<Result<T>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ValuationError::WorkerLost)),
        }
    }
}

fn spawn<T, F>(job: F) -> SimulationHandle<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (sender, receiver) = mpsc::sync_channel(1);
    rayon::spawn(move || {
        // The receiver is gone if the caller dropped the handle.
        if sender.send(job()).is_err() {
            debug!("simulation result discarded; handle dropped");
        }
    });
    SimulationHandle { receiver }
}

pub fn spawn_simulation(
    scorecard: Scorecard,
    config: SimulationConfig,
    params: ModelParams,
) -> SimulationHandle<SimulationResult> {
    spawn(move || simulation::simulate(&scorecard, &config, &params))
}

pub fn spawn_scenarios(
    scorecard: Scorecard,
    scenarios: Vec<Scenario>,
    config: SimulationConfig,
    params: ModelParams,
) -> SimulationHandle<Vec<ScenarioResult>> {
    spawn(move || scenario::run_scenarios(&scorecard, &scenarios, &config, &params))
}

pub fn spawn_batch(
    molecules: Vec<Molecule>,
    config: SimulationConfig,
    params: ModelParams,
) -> SimulationHandle<Vec<MoleculeSimulation>> {
    spawn(move || simulation::simulate_batch(&molecules, &config, &params))
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::types::MoleculeId;

    fn config() -> SimulationConfig {
        SimulationConfig::canonical().with_iterations(2_000).with_seed(42)
    }

    #[test]
    fn background_run_matches_foreground() {
        let card = Scorecard::uniform(70.0).unwrap();
        let params = ModelParams::canonical();
        let handle = spawn_simulation(card.clone(), config(), params.clone());
        let background = handle.wait().unwrap();
        let foreground = simulation::simulate(&card, &config(), &params).unwrap();
        assert_eq!(background.peak_sales_distribution, foreground.peak_sales_distribution);
    }

    #[test]
    fn try_result_eventually_yields() {
        let handle = spawn_simulation(Scorecard::uniform(55.0).unwrap(), config(), ModelParams::canonical());
        let result = loop {
            if let Some(r) = handle.try_result() {
                break r;
            }
            thread::sleep(Duration::from_millis(1));
        };
        assert_eq!(result.unwrap().iterations(), 2_000);
    }

    #[test]
    fn configuration_errors_come_back_through_the_handle() {
        let handle = spawn_simulation(
            Scorecard::uniform(55.0).unwrap(),
            config().with_iterations(0),
            ModelParams::canonical(),
        );
        assert!(matches!(handle.wait(), Err(ValuationError::ZeroIterations)));
    }

    #[test]
    fn dropped_handle_does_not_disturb_other_runs() {
        drop(spawn_simulation(Scorecard::uniform(60.0).unwrap(), config(), ModelParams::canonical()));
        let scenarios = spawn_scenarios(
            Scorecard::uniform(60.0).unwrap(),
            Scenario::catalog(),
            config(),
            ModelParams::canonical(),
        );
        assert_eq!(scenarios.wait().unwrap().len(), 3);
    }

    #[test]
    fn batch_runs_in_background() {
        let molecules: Vec<Molecule> = (1..=3)
            .map(|i| Molecule {
                id: MoleculeId(i),
                name: format!("PVX-{i}"),
                scorecard: Scorecard::uniform(50.0 + 10.0 * i as f64).unwrap(),
            })
            .collect();
        let runs = spawn_batch(molecules, config(), ModelParams::canonical()).wait().unwrap();
        let ids: Vec<MoleculeId> = runs.iter().map(|r| r.molecule).collect();
        assert_eq!(ids, vec![MoleculeId(1), MoleculeId(2), MoleculeId(3)]);
    }
}
