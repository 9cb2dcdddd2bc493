use std::time::Duration;

use blendmodel::{Backend, BackendError, BackendId, Model, Sense, SolutionStatus, SolveOutcome, SolverConfig};
use itertools::izip;
use tracing::{debug, info};

pub struct MosekBackend {
    time_limit : Option<Duration>,
    verbose    : bool,
}

fn native(msg : String) -> BackendError { BackendError::Native(msg) }

fn index(i : usize) -> Result<i32,BackendError> {
    i32::try_from(i).map_err(|_| native(format!("index {} exceeds the MOSEK index range",i)))
}

/// Bound key and bounds for `[lower,upper]`.
fn bound(lower : f64, upper : f64) -> (i32,f64,f64) {
    match (lower.is_finite(),upper.is_finite()) {
        (false,false) => (mosek::Boundkey::FR,0.0,0.0),
        (true,false)  => (mosek::Boundkey::LO,lower,lower),
        (false,true)  => (mosek::Boundkey::UP,upper,upper),
        (true,true) if lower == upper => (mosek::Boundkey::FX,lower,upper),
        (true,true)   => (mosek::Boundkey::RA,lower,upper),
    }
}

impl MosekBackend {
    pub fn new(config : &SolverConfig) -> Result<MosekBackend,BackendError> {
        Ok(MosekBackend{
            time_limit : config.time_limit(),
            verbose    : config.verbose
        })
    }

    fn task() -> Result<mosek::TaskCB,BackendError> {
        mosek::Task::new()
            .map(|t| t.with_callbacks())
            .ok_or_else(|| BackendError::Unavailable("failed to create a MOSEK task".to_string()))
    }

    /// Load the model into a fresh task.
    fn load(&self, model : &Model) -> Result<mosek::TaskCB,BackendError> {
        let mut task = MosekBackend::task()?;
        if let Some(name) = model.name() {
            task.put_task_name(name).map_err(native)?;
        }
        if self.verbose {
            task.put_stream_callback(mosek::Streamtype::LOG, |msg| info!(target : "mosek", "{}", msg.trim_end())).map_err(native)?;
        }
        if let Some(t) = self.time_limit {
            task.put_dou_param(mosek::Dparam::OPTIMIZER_MAX_TIME, t.as_secs_f64()).map_err(native)?;
            task.put_dou_param(mosek::Dparam::MIO_MAX_TIME, t.as_secs_f64()).map_err(native)?;
        }

        let numvar = index(model.num_columns())?;
        let numcon = index(model.num_rows())?;
        task.append_vars(numvar).map_err(native)?;
        task.append_cons(numcon).map_err(native)?;

        let c = model.objective_coefficients();
        for (j,col,&cj) in izip!(0..numvar,model.columns(),c.iter()) {
            let (bk,bl,bu) = bound(col.lower(),col.upper());
            task.put_var_bound(j,bk,bl,bu).map_err(native)?;
            if col.is_integer() {
                task.put_var_type(j,mosek::Variabletype::TYPE_INT).map_err(native)?;
            }
            if let Some(name) = col.name() {
                task.put_var_name(j,name).map_err(native)?;
            }
            task.put_c_j(j,cj).map_err(native)?;
        }
        task.put_cfix(model.objective_function().fix()).map_err(native)?;
        task.put_obj_sense(match model.sense() {
            Sense::Minimize => mosek::Objsense::MINIMIZE,
            Sense::Maximize => mosek::Objsense::MAXIMIZE
        }).map_err(native)?;

        for (i,row) in izip!(0..numcon,model.rows()) {
            let subj = row.subj().iter().map(|&j| index(j)).collect::<Result<Vec<i32>,BackendError>>()?;
            task.put_a_row(i,subj.as_slice(),row.cof()).map_err(native)?;
            let (bk,bl,bu) = bound(row.lower(),row.upper());
            task.put_con_bound(i,bk,bl,bu).map_err(native)?;
            if let Some(name) = row.name() {
                task.put_con_name(i,name).map_err(native)?;
            }
        }
        Ok(task)
    }
}

impl Backend for MosekBackend {
    fn id(&self) -> BackendId { BackendId::Mosek }

    fn probe(&mut self) -> Result<bool,BackendError> {
        // Optimizing a one-variable problem fails without a valid license.
        let mut task = MosekBackend::task()?;
        task.append_vars(1).map_err(native)?;
        task.put_var_bound(0,mosek::Boundkey::RA,0.0,1.0).map_err(native)?;
        task.put_c_j(0,1.0).map_err(native)?;
        task.optimize()
            .map_err(|msg| BackendError::Unavailable(format!("MOSEK is not usable: {}",msg)))?;
        Ok(true)
    }

    fn solve(&mut self, model : &mut Model) -> Result<SolveOutcome,BackendError> {
        let mut task = self.load(model)?;
        let trm = task.optimize().map_err(native)?;
        debug!(trmcode = trm, "MOSEK finished");

        let whichsol =
            if model.columns().iter().any(|c| c.is_integer()) { mosek::Soltype::ITG }
            else if task.solution_def(mosek::Soltype::BAS).map_err(native)? { mosek::Soltype::BAS }
            else { mosek::Soltype::ITR };
        if !task.solution_def(whichsol).map_err(native)? {
            return Ok(SolveOutcome::SolverError(format!("MOSEK produced no solution (termination code {})",trm)));
        }

        let solsta = task.get_sol_sta(whichsol).map_err(native)?;
        let prosta = task.get_pro_sta(whichsol).map_err(native)?;
        match (solsta,prosta) {
            (mosek::Solsta::OPTIMAL,_) | (mosek::Solsta::INTEGER_OPTIMAL,_) => {
                let mut xx = vec![0.0; model.num_columns()];
                task.get_xx(whichsol,xx.as_mut_slice()).map_err(native)?;
                let obj = task.get_primal_obj(whichsol).map_err(native)?;
                model.set_solution(SolutionStatus::Optimal,xx,obj).map_err(|e| native(e.to_string()))?;
                Ok(SolveOutcome::Optimal)
            },
            (mosek::Solsta::PRIM_INFEAS_CER,_) | (_,mosek::Prosta::PRIM_INFEAS) => Ok(SolveOutcome::Infeasible),
            (mosek::Solsta::DUAL_INFEAS_CER,_) | (_,mosek::Prosta::DUAL_INFEAS) => Ok(SolveOutcome::Unbounded),
            // Every column of a blend model is bounded.
            (_,mosek::Prosta::PRIM_INFEAS_OR_UNBOUNDED) => Ok(SolveOutcome::Infeasible),
            _ if trm == mosek::Rescode::TRM_MAX_TIME => Ok(SolveOutcome::SolverError("MOSEK reached the time limit".to_string())),
            _ => Ok(SolveOutcome::SolverError(format!("MOSEK terminated with solution status {}, problem status {}",solsta,prosta)))
        }
    }
}
