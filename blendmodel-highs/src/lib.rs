//! HiGHS backend for [blendmodel].
//!
//! The model is passed to HiGHS row by row through [highs::RowProblem]. Integer columns are
//! added with [highs::RowProblem::add_integer_column]. The objective value is computed from the
//! returned column values, so a constant objective term is included.
//!
//! ```no_run
//! use blendmodel::*;
//! let mut registry = BackendRegistry::new();
//! blendmodel_highs::register(&mut registry);
//! ```

use std::time::Duration;

use blendmodel::{Backend, BackendError, BackendId, BackendRegistry, Model, Sense, SolutionStatus, SolveOutcome, SolverConfig};
use highs::{HighsModelStatus, RowProblem};
use itertools::izip;
use tracing::{debug, trace};

pub struct HighsBackend {
    time_limit : Option<Duration>,
    verbose    : bool,
}

impl HighsBackend {
    pub fn new(config : &SolverConfig) -> HighsBackend {
        HighsBackend{
            time_limit : config.time_limit(),
            verbose    : config.verbose
        }
    }

    fn problem(model : &Model) -> (RowProblem,Vec<highs::Col>) {
        let mut pb = RowProblem::default();
        let c = model.objective_coefficients();
        let cols : Vec<highs::Col> = izip!(model.columns(),c.iter())
            .map(|(col,&cj)| {
                let bounds = col.lower()..=col.upper();
                if col.is_integer() { pb.add_integer_column(cj,bounds) }
                else { pb.add_column(cj,bounds) }
            })
            .collect();

        for row in model.rows() {
            let factors : Vec<(highs::Col,f64)> = row.terms().map(|(j,c)| (cols[j],c)).collect();
            pb.add_row(row.lower()..=row.upper(), factors);
        }
        (pb,cols)
    }
}

/// A model without columns is decided by its row bounds alone. HiGHS reports such a model as
/// `ModelEmpty` without looking at the rows.
fn solve_empty(model : &mut Model) -> Result<SolveOutcome,BackendError> {
    if let Some(row) = model.rows().iter().find(|r| !r.admits_zero()) {
        debug!(row = ?row.name(), lower = row.lower(), upper = row.upper(), "empty model has an unsatisfiable row");
        return Ok(SolveOutcome::Infeasible);
    }
    let obj = model.evaluate_objective(&[]);
    model.set_solution(SolutionStatus::Optimal,Vec::new(),obj)
        .map_err(|e| BackendError::Native(e.to_string()))?;
    Ok(SolveOutcome::Optimal)
}

impl Backend for HighsBackend {
    fn id(&self) -> BackendId { BackendId::Highs }

    /// HiGHS is linked into the binary. Creating an empty instance is enough to check that it
    /// loads.
    fn probe(&mut self) -> Result<bool,BackendError> {
        let mut m = RowProblem::default().optimise(highs::Sense::Minimise);
        m.make_quiet();
        Ok(true)
    }

    fn solve(&mut self, model : &mut Model) -> Result<SolveOutcome,BackendError> {
        if model.num_columns() == 0 {
            return solve_empty(model);
        }
        let (pb,cols) = HighsBackend::problem(model);
        let sense = match model.sense() {
            Sense::Minimize => highs::Sense::Minimise,
            Sense::Maximize => highs::Sense::Maximise,
        };
        let mut hm = pb.optimise(sense);
        if !self.verbose {
            hm.make_quiet();
        }
        if let Some(t) = self.time_limit {
            hm.set_option("time_limit",t.as_secs_f64());
        }
        debug!(columns = cols.len(), rows = model.num_rows(), "running HiGHS");

        let solved = hm.try_solve().map_err(|e| BackendError::Native(format!("HiGHS failed: {:?}",e)))?;
        let status = solved.status();
        trace!(status = ?status, "HiGHS finished");

        match status {
            HighsModelStatus::ModelEmpty => solve_empty(model),
            HighsModelStatus::Optimal => {
                let x = solved.get_solution().columns().to_vec();
                let obj = model.evaluate_objective(&x);
                model.set_solution(SolutionStatus::Optimal,x,obj)
                    .map_err(|e| BackendError::Native(e.to_string()))?;
                Ok(SolveOutcome::Optimal)
            },
            HighsModelStatus::Infeasible => Ok(SolveOutcome::Infeasible),
            // Every column of a blend model is bounded, so an unbounded ray can not exist.
            HighsModelStatus::UnboundedOrInfeasible => Ok(SolveOutcome::Infeasible),
            HighsModelStatus::Unbounded => Ok(SolveOutcome::Unbounded),
            HighsModelStatus::ReachedTimeLimit => Ok(SolveOutcome::SolverError("HiGHS reached the time limit".to_string())),
            s => Ok(SolveOutcome::SolverError(format!("HiGHS terminated with status {:?}",s)))
        }
    }
}

/// Create a boxed HiGHS backend.
pub fn factory(config : &SolverConfig) -> Result<Box<dyn Backend>,BackendError> {
    Ok(Box::new(HighsBackend::new(config)))
}

/// Register the HiGHS backend under [BackendId::Highs].
pub fn register(registry : &mut BackendRegistry) {
    registry.register(BackendId::Highs, factory);
}
