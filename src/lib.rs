//! # Description
//! Stochastic simulation engine for well-stirred chemical reaction networks. It takes a validated
//! network of species and reactions and simulates its time evolution with one of several
//! algorithms:
//!
//! - the exact direct method, reported at fixed hurdle checkpoints
//! - fixed-step tau-leaping
//! - stochastic Runge-Kutta leaping of order 3 or 5, each with three coefficient profiles
//! - the deterministic Heun integrator of the mean-field equations
//!
//! A single run is a [`Trial`]. The [`Builder`] / [`DssimEngine`] pair runs an ensemble of
//! independent trials on a thread pool and averages their trajectories.
//!
//! # Usage
//! ```no_run
//! use dssim_engine::{Algorithm, Builder, Count, Name, Reaction, Term};
//!
//! let (engine, _responses) = Builder::from_parts(
//!     vec![(Name::from("A"), Count(100)), (Name::from("B"), Count(0))],
//!     vec![Reaction::mass_action(vec![Term::of("A", 1)], vec![Term::of("B", 1)], 1.0)],
//! )
//! .unwrap()
//! .algorithm(Algorithm::TauLeap)
//! .total_time(5.0)
//! .step(0.01)
//! .trials(64)
//! .build();
//! let summary = engine.run().unwrap();
//! println!("{:?}", summary);
//! ```

pub mod trial;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, sync_channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use threadpool::ThreadPool;
use tracing::{debug, info, trace, warn};

pub use trial::algorithm::{Algorithm, Order, Profile};
pub use trial::reaction_network::reaction::{
    propensity::{Propensity, PropensityKind},
    term::Term,
    Reaction,
};
pub use trial::reaction_network::solution::{Count, Name, SimulationState};
pub use trial::reaction_network::{NetworkError, ReactionNetwork};
pub use trial::results::{
    csv_sink::CsvSink, Completion, MeanAccumulator, SinkError, Snapshot, Trajectory, TrajectorySink, TrialResult,
};
pub use trial::{CancelFlag, Settings, Trial, TrialReturn};

/// Engine error types
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{algorithm} needs a positive step, got {step}")]
    NonPositiveStep { algorithm: Algorithm, step: f64 },
    #[error("total simulated time must be positive, got {0}")]
    NonPositiveTime(f64),
    #[error("unsupported configuration: {0}")]
    Unsupported(&'static str),
    #[error("reaction {reaction} has propensity {rate}, expected a finite non-negative rate")]
    InvalidPropensity { reaction: usize, rate: f64 },
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

pub type TrialID = usize;

/// What an ensemble produced
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleSummary {
    /// Pointwise mean over the completed trials, `None` when no trial completed
    pub mean: Option<Trajectory>,
    pub completed: usize,
    /// Trials stopped by the runtime limit; these do not contribute to the mean
    pub cancelled: usize,
}

/// Engine response types
#[derive(Debug, Clone)]
pub enum EngineResponse {
    IntermediateStep(Snapshot, TrialID),
    TrialComplete(TrialID, Completion),
    SimulationResult(EnsembleSummary),
}

#[derive(Clone)]
enum EngineReturn {
    Full(Sender<EngineResponse>),
    Minimal(Sender<EngineResponse>),
}

/// Runs a single simulation of `network` into `sink`.
///
/// Without a seed the generator is seeded from the clock and the run is not reproducible.
pub fn simulate<S: TrajectorySink + ?Sized>(
    network: Arc<ReactionNetwork>,
    settings: Settings,
    seed: Option<u64>,
    sink: &mut S,
) -> Result<Completion, EngineError> {
    let mut trial = Trial::from(network, settings, 0);
    if let Some(seed) = seed {
        trial = trial.with_seed(seed);
    }
    trial.simulate(sink)
}

/// This is a builder object containing defaults and methods for constructing a DssimEngine Object.
///
/// # Usage
/// `Builder::new(network).trials(n).runtime(secs).algorithm(a).step(h).build()`
pub struct Builder {
    num_trials: usize,
    max_runtime: Option<u64>,
    settings: Settings,
    seed: Option<u64>,
    num_threads: Option<usize>,
    prime_network: Arc<ReactionNetwork>,
    runtime_return: EngineReturn,
    runtime_receiver: Receiver<EngineResponse>,
}

impl Builder {
    /// Builds a new engine from the given network with default values
    ///
    /// trials = 100
    /// runtime = unlimited
    /// settings = direct method, total time 100, hurdle 1
    /// seed = clock derived
    /// threads = one per cpu
    /// return verbosity = minimal
    pub fn new(prime_network: ReactionNetwork) -> Self {
        let (runtime_sender, runtime_receiver) = channel();

        Self {
            num_trials: 100,
            max_runtime: None,
            settings: Settings::default(),
            seed: None,
            num_threads: None,
            prime_network: Arc::new(prime_network),
            runtime_return: EngineReturn::Minimal(runtime_sender),
            runtime_receiver,
        }
    }

    /// Validates species and reactions into a network and wraps it in a builder
    pub fn from_parts(species: Vec<(Name, Count)>, reactions: Vec<Reaction>) -> Result<Self, EngineError> {
        Ok(Self::new(ReactionNetwork::new(species, reactions)?))
    }

    /// Sets the number of trials to be executed to a manual value
    pub fn trials(mut self, count: usize) -> Self {
        self.num_trials = count;
        self
    }

    /// Sets the maximum wall-clock runtime in seconds. Trials still running when it expires are
    /// cancelled and left out of the result.
    pub fn runtime(mut self, seconds: u64) -> Self {
        self.max_runtime = Some(seconds);
        self
    }

    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.settings.algorithm = algorithm;
        self
    }

    pub fn total_time(mut self, total_time: f64) -> Self {
        self.settings.total_time = total_time;
        self
    }

    /// Step size for the stepped methods, hurdle size for the direct method
    pub fn step(mut self, step: f64) -> Self {
        self.settings.step = step;
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Makes the ensemble reproducible. Trial `i` is seeded with `seed + i`.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the number of worker threads
    pub fn threads(mut self, count: usize) -> Self {
        self.num_threads = Some(count.max(1));
        self
    }

    /// Toggles return verbosity between minimal and full
    pub fn verbose(mut self) -> Self {
        self.runtime_return = match self.runtime_return {
            EngineReturn::Minimal(sender) => EngineReturn::Full(sender),
            EngineReturn::Full(sender) => EngineReturn::Minimal(sender),
        };
        self
    }

    /// Consumes builder object and outputs an engine object along with the receiving end of its
    /// response channel
    pub fn build(self) -> (DssimEngine, Receiver<EngineResponse>) {
        let mut computation_threads = threadpool::Builder::new().thread_name("DssimComputeThread".to_string());
        if let Some(count) = self.num_threads {
            computation_threads = computation_threads.num_threads(count);
        }

        let engine = DssimEngine {
            num_trials: self.num_trials,
            max_runtime: self.max_runtime,
            settings: self.settings,
            seed: self.seed,
            computation_threads: computation_threads.build(),
            prime_network: self.prime_network,
            runtime_return: self.runtime_return,
        };

        (engine, self.runtime_receiver)
    }
}

/// Ensemble runner: simulates independent trials of one network on a thread pool
pub struct DssimEngine {
    num_trials: usize,
    max_runtime: Option<u64>,
    settings: Settings,
    seed: Option<u64>,
    computation_threads: ThreadPool,
    prime_network: Arc<ReactionNetwork>,
    runtime_return: EngineReturn,
}

impl DssimEngine {
    pub fn network(&self) -> &ReactionNetwork {
        &self.prime_network
    }

    pub fn get_settings(&self) -> &Settings {
        &self.settings
    }

    /// Simulates every trial and returns the ensemble summary.
    ///
    /// Completed trials are reported to the frontend as they arrive, and in verbose mode so is
    /// every snapshot. The summary is both sent to the frontend and returned. If a trial fails the
    /// remaining trials are cancelled and the first error is returned.
    pub fn run(&self) -> Result<EngineResponse, EngineError> {
        self.settings.validate()?;

        info!(
            trials = self.num_trials,
            algorithm = %self.settings.algorithm,
            total_time = self.settings.total_time,
            step = self.settings.step,
            "starting ensemble"
        );
        if let Algorithm::RungeKutta(order, profile) = self.settings.algorithm {
            if trial::methods::runge_kutta::is_derived(order, profile) {
                warn!(
                    algorithm = %self.settings.algorithm,
                    "this profile uses derived Runge-Kutta coefficients, not a published tableau"
                );
            }
        }

        let cancel: CancelFlag = Arc::new(AtomicBool::new(false));
        let (timer_stop, timer_stopped) = channel::<()>();
        let timer = self.max_runtime.map(|seconds| {
            let cancel = cancel.clone();
            std::thread::spawn(move || Self::engine_runtime_timer(seconds, cancel, timer_stopped))
        });

        let (computation_threads_sender, computation_threads_receiver) = sync_channel(32);
        for id in 0..self.num_trials {
            let mut trial = Trial::from(self.prime_network.clone(), self.settings, id).with_cancel(cancel.clone());
            if let Some(seed) = self.seed {
                trial = trial.with_seed(seed.wrapping_add(id as u64));
            }
            let trial_return = match self.runtime_return {
                EngineReturn::Minimal(_) => TrialReturn::Minimal(computation_threads_sender.clone()),
                EngineReturn::Full(_) => TrialReturn::Full(computation_threads_sender.clone()),
            };
            self.computation_threads.execute(move || trial.execute(trial_return));
        }
        // every job owns a sender, the loop below ends once the last one is done
        drop(computation_threads_sender);

        // trajectories are folded into the running mean as they arrive and then dropped
        let mut completed = MeanAccumulator::new();
        let mut cancelled = 0;
        let mut first_error = None;

        for result in computation_threads_receiver.iter() {
            match result {
                TrialResult::IntermediateStep(snapshot, id) => {
                    if let EngineReturn::Full(_) = self.runtime_return {
                        self.respond(EngineResponse::IntermediateStep(snapshot, id));
                    }
                }
                TrialResult::Complete(trajectory, completion, id) => {
                    if completion.is_cancelled() {
                        debug!(trial = id, "discarding cancelled trial");
                        cancelled += 1;
                    } else {
                        completed.add(&trajectory);
                    }
                    self.respond(EngineResponse::TrialComplete(id, completion));
                }
                TrialResult::Failed(error, id) => {
                    warn!(trial = id, %error, "trial failed, cancelling the ensemble");
                    cancel.store(true, Ordering::Relaxed);
                    first_error.get_or_insert(error);
                }
            }
        }

        drop(timer_stop);
        if let Some(timer) = timer {
            let _ = timer.join();
        }
        if let Some(error) = first_error {
            return Err(error);
        }

        let summary = EnsembleSummary {
            mean: completed.mean(),
            completed: completed.count(),
            cancelled,
        };
        info!(completed = summary.completed, cancelled = summary.cancelled, "ensemble finished");

        self.respond(EngineResponse::SimulationResult(summary.clone()));
        Ok(EngineResponse::SimulationResult(summary))
    }

    fn respond(&self, response: EngineResponse) {
        let sender = match &self.runtime_return {
            EngineReturn::Minimal(sender) | EngineReturn::Full(sender) => sender,
        };
        if sender.send(response).is_err() {
            trace!("frontend receiver dropped, response discarded");
        }
    }

    /// Raises the cancel flag after `seconds` unless the ensemble finishes first, which it
    /// signals by dropping the other end of `stop`
    fn engine_runtime_timer(seconds: u64, cancel: CancelFlag, stop: Receiver<()>) {
        if let Err(RecvTimeoutError::Timeout) = stop.recv_timeout(Duration::from_secs(seconds)) {
            warn!(
                seconds,
                "forced termination because max time was reached, cancelled trials are left out of the result"
            );
            cancel.store(true, Ordering::Relaxed);
        }
    }
}
