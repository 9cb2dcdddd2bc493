//! Solver adapter.
//!
//! A solver backend is anything implementing [Backend]. Backends are created through factories
//! kept in a [BackendRegistry], keyed by [BackendId]. [solve] walks an ordered list of candidate
//! backends, picks the first one that can be created and reports itself available, and solves the
//! model with it exactly once.
//!
//! Nothing a backend does while being created or probed can escape the adapter: errors and panics
//! both count as "unavailable" and the search moves on to the next candidate. Errors and panics
//! during the solve itself are reported as [SolveOutcome::SolverError].

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{BackendError, ConfigurationError};
use crate::model::{Model, SolutionStatus};

/// Identifies a solver backend.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash,PartialOrd,Ord,Serialize,Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    Highs,
    Mosek,
    Microlp,
}

impl BackendId {
    pub const ALL : [BackendId;3] = [BackendId::Highs, BackendId::Mosek, BackendId::Microlp];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendId::Highs   => "highs",
            BackendId::Mosek   => "mosek",
            BackendId::Microlp => "microlp",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for BackendId {
    type Err = ConfigurationError;
    fn from_str(s : &str) -> Result<BackendId,ConfigurationError> {
        BackendId::ALL.iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| ConfigurationError::UnknownBackend(s.to_string()))
    }
}

/// Result of one solve call. Returned verbatim to the caller; the adapter never retries.
#[derive(Clone,Debug,PartialEq,Eq)]
pub enum SolveOutcome {
    /// The model's solution slots hold an optimal solution.
    Optimal,
    /// No point satisfies all constraints.
    Infeasible,
    /// The objective is unbounded.
    Unbounded,
    /// The backend failed, gave up (for example on a time limit) or panicked.
    SolverError(String),
    /// None of the candidate backends could be used.
    NoBackendAvailable,
}

impl SolveOutcome {
    pub fn is_optimal(&self) -> bool { matches!(self, SolveOutcome::Optimal) }
}

impl fmt::Display for SolveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveOutcome::Optimal            => write!(f,"optimal"),
            SolveOutcome::Infeasible         => write!(f,"infeasible"),
            SolveOutcome::Unbounded          => write!(f,"unbounded"),
            SolveOutcome::SolverError(msg)   => write!(f,"solver error: {}",msg),
            SolveOutcome::NoBackendAvailable => write!(f,"no solver backend available"),
        }
    }
}

/// Solver settings. Read-only while solving, and can be shared between threads.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Candidate backends in order of preference.
    pub backends        : Vec<BackendId>,
    /// Wall clock limit for a single solve, in seconds.
    pub time_limit_secs : Option<f64>,
    /// Let the backend write its own log output.
    pub verbose         : bool,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        SolverConfig{
            backends        : vec![BackendId::Highs, BackendId::Microlp, BackendId::Mosek],
            time_limit_secs : None,
            verbose         : false
        }
    }
}

impl SolverConfig {
    /// The time limit, if one is set and positive.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs
            .filter(|t| t.is_finite() && *t > 0.0)
            .map(Duration::from_secs_f64)
    }
}

/// An instantiated solver backend.
///
/// A backend reads the model through [Model::columns], [Model::rows] and
/// [Model::objective_function]. It must store the solution with [Model::set_solution] before
/// returning [SolveOutcome::Optimal].
pub trait Backend {
    fn id(&self) -> BackendId;

    /// Check that the backend is usable, for example that a native library is present and
    /// licensed. Must not have side effects on any model.
    fn probe(&mut self) -> Result<bool,BackendError>;

    /// Solve the model once.
    ///
    /// # Returns
    /// - `Ok(SolveOutcome::Optimal)` after the solution has been stored in `model`.
    /// - `Ok(SolveOutcome::Infeasible)`, `Ok(SolveOutcome::Unbounded)` or
    ///   `Ok(SolveOutcome::SolverError(..))` for the corresponding solver status.
    /// - `Err(..)` if the backend itself failed.
    fn solve(&mut self, model : &mut Model) -> Result<SolveOutcome,BackendError>;
}

/// Creates a backend configured by a [SolverConfig].
pub type BackendFactory = fn(&SolverConfig) -> Result<Box<dyn Backend>,BackendError>;

/// Maps backend ids to factories.
#[derive(Clone,Default)]
pub struct BackendRegistry {
    factories : HashMap<BackendId,BackendFactory>,
}

impl BackendRegistry {
    pub fn new() -> BackendRegistry { BackendRegistry::default() }

    /// Register a factory, returning the one it replaces, if any.
    pub fn register(&mut self, id : BackendId, factory : BackendFactory) -> Option<BackendFactory> {
        self.factories.insert(id,factory)
    }

    pub fn with(mut self, id : BackendId, factory : BackendFactory) -> BackendRegistry {
        self.register(id,factory);
        self
    }

    pub fn get(&self, id : BackendId) -> Option<BackendFactory> { self.factories.get(&id).copied() }

    pub fn contains(&self, id : BackendId) -> bool { self.factories.contains_key(&id) }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> Vec<BackendId> {
        let mut ids : Vec<BackendId> = self.factories.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry").field("backends",&self.ids()).finish()
    }
}

fn panic_message(payload : &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() { s.to_string() }
    else if let Some(s) = payload.downcast_ref::<String>() { s.clone() }
    else { "unknown panic payload".to_string() }
}

/// Run `f`, turning a panic into [BackendError::Panicked].
fn guarded<T, F : FnOnce() -> Result<T,BackendError>>(f : F) -> Result<T,BackendError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(r) => r,
        Err(payload) => Err(BackendError::Panicked(panic_message(payload.as_ref())))
    }
}

/// Create and probe a single candidate. Any failure means "unavailable".
fn instantiate(id : BackendId, registry : &BackendRegistry, config : &SolverConfig) -> Option<Box<dyn Backend>> {
    let Some(factory) = registry.get(id) else {
        debug!(backend = %id, "backend not registered");
        return None;
    };
    let mut backend = match guarded(|| factory(config)) {
        Ok(b) => b,
        Err(e) => {
            warn!(backend = %id, error = %e, "failed to create backend");
            return None;
        }
    };
    match guarded(|| backend.probe()) {
        Ok(true) => Some(backend),
        Ok(false) => {
            debug!(backend = %id, "backend reports itself unavailable");
            None
        },
        Err(e) => {
            warn!(backend = %id, error = %e, "backend probe failed");
            None
        }
    }
}

/// Solve `model` with the first available backend.
///
/// # Arguments
/// - `model` The model. The solution, if any, is written into it.
/// - `candidates` Backends to try, in order.
/// - `registry` Backend factories.
/// - `config` Passed to the factory of every candidate.
///
/// # Returns
/// The outcome reported by the selected backend, or [SolveOutcome::NoBackendAvailable]. Unless
/// the outcome is [SolveOutcome::Optimal], the model's solution status is left non-optimal, so a
/// stale or partial solution can not be read back.
pub fn solve(model : &mut Model, candidates : &[BackendId], registry : &BackendRegistry, config : &SolverConfig) -> SolveOutcome {
    let Some(mut backend) = candidates.iter().find_map(|&id| instantiate(id,registry,config)) else {
        warn!(candidates = ?candidates, "no solver backend available");
        model.clear_solution(SolutionStatus::Undefined);
        return SolveOutcome::NoBackendAvailable;
    };

    let id = backend.id();
    info!(backend = %id, columns = model.num_columns(), rows = model.num_rows(), "solving");
    model.clear_solution(SolutionStatus::Undefined);
    let t0 = Instant::now();
    let outcome = match guarded(|| backend.solve(model)) {
        Ok(SolveOutcome::Optimal) if model.solution_status() != SolutionStatus::Optimal =>
            SolveOutcome::SolverError(format!("{} reported optimal without storing a solution",id)),
        Ok(SolveOutcome::NoBackendAvailable) =>
            SolveOutcome::SolverError(format!("{} reported no backend available",id)),
        Ok(outcome) => outcome,
        Err(e) => SolveOutcome::SolverError(e.to_string())
    };

    match &outcome {
        SolveOutcome::Optimal => {},
        SolveOutcome::Infeasible => model.clear_solution(SolutionStatus::CertInfeas),
        SolveOutcome::Unbounded => model.clear_solution(SolutionStatus::CertUnbounded),
        _ => model.clear_solution(SolutionStatus::Unknown),
    }
    model.set_solved_by(id.as_str());

    match &outcome {
        SolveOutcome::Optimal => info!(backend = %id, objective = ?model.primal_objective(), elapsed = ?t0.elapsed(), "solved"),
        SolveOutcome::SolverError(msg) => warn!(backend = %id, error = %msg, "solve failed"),
        o => info!(backend = %id, outcome = %o, elapsed = ?t0.elapsed(), "solve finished"),
    }
    outcome
}
