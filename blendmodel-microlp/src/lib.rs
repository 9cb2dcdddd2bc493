//! Pure Rust backend for [blendmodel] based on the `microlp` simplex and branch-and-bound
//! solver. Needs no native libraries, so it is always available.
//!
//! Ranged rows are split into a `>=` and a `<=` constraint. `microlp` has no time limit; a
//! configured limit is ignored.

use blendmodel::{Backend, BackendError, BackendId, BackendRegistry, Model, Sense, SolutionStatus, SolveOutcome, SolverConfig};
use itertools::izip;
use microlp::{ComparisonOp, OptimizationDirection, Problem};
use tracing::debug;

#[derive(Default)]
pub struct MicrolpBackend {}

impl MicrolpBackend {
    pub fn new(config : &SolverConfig) -> MicrolpBackend {
        if let Some(t) = config.time_limit() {
            debug!(time_limit = ?t, "microlp does not support a time limit, ignoring it");
        }
        MicrolpBackend{}
    }

    /// Translate the model. Returns `None` if a row without terms has bounds excluding zero,
    /// which makes the model trivially infeasible.
    fn problem(model : &Model) -> Option<(Problem,Vec<microlp::Variable>)> {
        let direction = match model.sense() {
            Sense::Minimize => OptimizationDirection::Minimize,
            Sense::Maximize => OptimizationDirection::Maximize,
        };
        let mut pb = Problem::new(direction);
        let c = model.objective_coefficients();
        let vars : Vec<microlp::Variable> = izip!(model.columns(),c.iter())
            .map(|(col,&cj)| {
                if col.is_integer() && col.lower() == 0.0 && col.upper() == 1.0 {
                    pb.add_binary_var(cj)
                }
                else if col.is_integer() {
                    pb.add_integer_var(cj,(int_bound(col.lower().ceil()),int_bound(col.upper().floor())))
                }
                else {
                    pb.add_var(cj,(col.lower(),col.upper()))
                }
            })
            .collect();

        for row in model.rows() {
            let terms : Vec<(microlp::Variable,f64)> = row.terms().map(|(j,c)| (vars[j],c)).collect();
            if terms.is_empty() {
                if !row.admits_zero() {
                    return None;
                }
                continue;
            }
            if row.lower() == row.upper() {
                pb.add_constraint(terms.as_slice(),ComparisonOp::Eq,row.lower());
                continue;
            }
            if row.lower().is_finite() {
                pb.add_constraint(terms.as_slice(),ComparisonOp::Ge,row.lower());
            }
            if row.upper().is_finite() {
                pb.add_constraint(terms.as_slice(),ComparisonOp::Le,row.upper());
            }
        }
        Some((pb,vars))
    }
}

fn int_bound(b : f64) -> i32 {
    b.clamp(i32::MIN as f64,i32::MAX as f64) as i32
}

impl Backend for MicrolpBackend {
    fn id(&self) -> BackendId { BackendId::Microlp }

    fn probe(&mut self) -> Result<bool,BackendError> { Ok(true) }

    fn solve(&mut self, model : &mut Model) -> Result<SolveOutcome,BackendError> {
        let Some((pb,vars)) = MicrolpBackend::problem(model) else {
            debug!("model has an empty row that can not be satisfied");
            return Ok(SolveOutcome::Infeasible);
        };
        if vars.is_empty() {
            // every row was checked above
            let obj = model.evaluate_objective(&[]);
            model.set_solution(SolutionStatus::Optimal,Vec::new(),obj)
                .map_err(|e| BackendError::Native(e.to_string()))?;
            return Ok(SolveOutcome::Optimal);
        }
        debug!(columns = vars.len(), rows = model.num_rows(), "running microlp");
        match pb.solve() {
            Ok(sol) => {
                let x : Vec<f64> = izip!(model.columns(),vars.iter())
                    .map(|(col,&v)| {
                        let value = *sol.var_value(v);
                        if col.is_integer() { value.round() } else { value }
                    })
                    .collect();
                let obj = model.evaluate_objective(&x);
                model.set_solution(SolutionStatus::Optimal,x,obj)
                    .map_err(|e| BackendError::Native(e.to_string()))?;
                Ok(SolveOutcome::Optimal)
            },
            Err(microlp::Error::Infeasible) => Ok(SolveOutcome::Infeasible),
            Err(microlp::Error::Unbounded) => Ok(SolveOutcome::Unbounded),
            Err(e) => Ok(SolveOutcome::SolverError(format!("microlp failed: {}",e))),
        }
    }
}

/// Create a boxed microlp backend.
pub fn factory(config : &SolverConfig) -> Result<Box<dyn Backend>,BackendError> {
    Ok(Box::new(MicrolpBackend::new(config)))
}

/// Register the microlp backend under [BackendId::Microlp].
pub fn register(registry : &mut BackendRegistry) {
    registry.register(BackendId::Microlp, factory);
}
