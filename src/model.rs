//! The [Model] object: a linear (mixed-integer) problem in column/row form together with the
//! slots a solver backend writes its solution into.
//!
//! The model owns its data. Backends read it through [Model::columns], [Model::rows] and
//! [Model::objective_function], and report back through [Model::set_solution] or
//! [Model::clear_solution]. Solution values are stored in the model itself; nothing is copied
//! out until the caller asks for it.

use std::fmt;

use itertools::izip;

use crate::domain::IntoLinearDomain;
use crate::error::ModelError;
use crate::expr::{Expr, IntoExpr};
use crate::variable::Variable;

/// Objective sense
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Sense {
    Maximize,
    Minimize
}

/// Solution status indicator.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Default)]
pub enum SolutionStatus {
    /// The solution is optimal within tolerances.
    Optimal,
    /// The solution is feasible, but optimality was not proven.
    Feasible,
    /// The solver produced a certificate of primal infeasibility.
    CertInfeas,
    /// The solver produced a certificate of unboundedness.
    CertUnbounded,
    /// The solver terminated without a usable solution.
    Unknown,
    /// The model has not been solved.
    #[default]
    Undefined
}

/// A model column.
#[derive(Clone,Debug,PartialEq)]
pub struct Column {
    name       : Option<String>,
    lower      : f64,
    upper      : f64,
    is_integer : bool,
}

impl Column {
    pub fn name(&self) -> Option<&str> { self.name.as_deref() }
    pub fn lower(&self) -> f64 { self.lower }
    pub fn upper(&self) -> f64 { self.upper }
    pub fn is_integer(&self) -> bool { self.is_integer }
    /// An integer column restricted to `[0,1]`.
    pub fn is_binary(&self) -> bool { self.is_integer && self.lower >= 0.0 && self.upper <= 1.0 }
}

/// A model row `lower <= sum cof[k] x[subj[k]] <= upper`. Constant terms of the defining
/// expression are moved into the bounds; `fix` remembers them.
#[derive(Clone,Debug,PartialEq)]
pub struct Row {
    name  : Option<String>,
    subj  : Vec<usize>,
    cof   : Vec<f64>,
    fix   : f64,
    lower : f64,
    upper : f64,
}

impl Row {
    pub fn name(&self) -> Option<&str> { self.name.as_deref() }
    pub fn subj(&self) -> &[usize] { self.subj.as_slice() }
    pub fn cof(&self) -> &[f64] { self.cof.as_slice() }
    pub fn lower(&self) -> f64 { self.lower }
    pub fn upper(&self) -> f64 { self.upper }
    /// Iterate over `(column,coefficient)` pairs.
    pub fn terms(&self) -> impl Iterator<Item = (usize,f64)> + '_ { self.subj.iter().copied().zip(self.cof.iter().copied()) }
    /// Value of the row's linear part at `x`.
    pub fn activity(&self, x : &[f64]) -> f64 { self.terms().map(|(j,c)| c * x[j]).sum() }
    /// `true` if a zero activity satisfies the bounds. This is all that decides feasibility of a
    /// row without terms.
    pub fn admits_zero(&self) -> bool { self.lower <= 0.0 && self.upper >= 0.0 }
}

/// The objective `sense * (sum cof[k] x[subj[k]] + fix)`.
#[derive(Clone,Debug,PartialEq)]
pub struct Objective {
    name  : Option<String>,
    sense : Sense,
    subj  : Vec<usize>,
    cof   : Vec<f64>,
    fix   : f64,
}

impl Default for Objective {
    fn default() -> Objective { Objective{ name : None, sense : Sense::Minimize, subj : Vec::new(), cof : Vec::new(), fix : 0.0 } }
}

impl Objective {
    pub fn name(&self) -> Option<&str> { self.name.as_deref() }
    pub fn sense(&self) -> Sense { self.sense }
    pub fn subj(&self) -> &[usize] { self.subj.as_slice() }
    pub fn cof(&self) -> &[f64] { self.cof.as_slice() }
    pub fn fix(&self) -> f64 { self.fix }
}

/// A Constraint object is a wrapper around an array of row indexes.
#[derive(Clone,Debug,PartialEq,Eq)]
pub struct Constraint {
    idxs : Vec<usize>,
}

impl Constraint {
    pub fn idxs(&self) -> &[usize] { self.idxs.as_slice() }
    pub fn len(&self) -> usize { self.idxs.len() }
    pub fn is_empty(&self) -> bool { self.idxs.is_empty() }
}

#[derive(Clone,Debug,Default)]
struct Solution {
    status    : SolutionStatus,
    var       : Vec<f64>,
    obj       : f64,
    solved_by : Option<String>,
}

/// Something a primal solution value can be read for.
pub trait ModelItem {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool { self.len() == 0 }
    fn primal_into(&self, model : &Model, x : &[f64], res : &mut [f64]);
}

impl ModelItem for Variable {
    fn len(&self) -> usize { Variable::len(self) }
    fn primal_into(&self, _model : &Model, x : &[f64], res : &mut [f64]) {
        res.iter_mut().zip(self.idxs().iter()).for_each(|(r,&j)| *r = x[j]);
    }
}

impl ModelItem for Constraint {
    fn len(&self) -> usize { Constraint::len(self) }
    fn primal_into(&self, model : &Model, x : &[f64], res : &mut [f64]) {
        res.iter_mut().zip(self.idxs.iter()).for_each(|(r,&i)| {
            let row = &model.rows[i];
            *r = row.activity(x) + row.fix;
        });
    }
}

/// The `Model` object encapsulates an optimization problem. Variables and constraints are
/// created through the `Model` object and belong to exactly that model.
///
/// # Example
///
/// ```rust
/// use blendmodel::*;
///
/// let mut model = Model::new(Some("MyModel"));
/// let x = model.variable(Some("x"), nonnegative().with_shape(2));
/// let z = model.variable(Some("z"), in_range(0.0,1.0).integer());
/// _ = model.constraint(Some("link"), x.index(0).to_expr().sub(z.to_expr().mul(10.0)), less_than(0.0));
/// model.objective(Some("obj"), Sense::Minimize, x.dot(&[1.0,2.0]).add(z.sum().mul(5.0)));
/// assert_eq!(model.num_columns(),3);
/// assert_eq!(model.num_rows(),1);
/// ```
#[derive(Clone,Debug,Default)]
pub struct Model {
    name      : Option<String>,
    columns   : Vec<Column>,
    rows      : Vec<Row>,
    objective : Objective,
    sol       : Solution,
}

impl Model {
    /// Create new Model object.
    ///
    /// # Arguments
    /// - `name` An optional name
    /// # Returns
    /// An empty model.
    pub fn new(name : Option<&str>) -> Model {
        Model{
            name : name.map(|s| s.to_string()),
            ..Default::default()
        }
    }

    pub fn name(&self) -> Option<&str> { self.name.as_deref() }
    pub fn num_columns(&self) -> usize { self.columns.len() }
    pub fn num_rows(&self) -> usize { self.rows.len() }
    pub fn columns(&self) -> &[Column] { self.columns.as_slice() }
    pub fn rows(&self) -> &[Row] { self.rows.as_slice() }
    pub fn objective_function(&self) -> &Objective { &self.objective }
    pub fn sense(&self) -> Sense { self.objective.sense }

    ////////////////////////////////////////////////////////////
    // Variable interface

    /// Add a Variable.
    ///
    /// # Arguments
    /// - `name` Optional variable name. Elements are named `name[i]`.
    /// - `dom` The domain of the variable. A domain without a size produces a scalar variable.
    /// # Returns
    /// On success the variable, otherwise an error describing an inconsistent domain. The model
    /// is unchanged on failure.
    pub fn try_variable<D : IntoLinearDomain>(& mut self, name : Option<&str>, dom : D) -> Result<Variable,ModelError> {
        let n = dom.size_hint().unwrap_or(1);
        let (lower,upper,is_integer) = dom.try_into_domain(n)?.dissolve();
        let first = self.columns.len();
        self.columns.reserve(n);
        for (i,(lower,upper)) in lower.into_iter().zip(upper).enumerate() {
            self.columns.push(Column{
                name : name.map(|name| element_name(name,i,n)),
                lower,
                upper,
                is_integer });
        }
        self.invalidate();
        Ok(Variable::new((first..first+n).collect()))
    }

    /// Add a Variable. See [Model::try_variable]. Panics if the domain is inconsistent.
    pub fn variable<D : IntoLinearDomain>(& mut self, name : Option<&str>, dom : D) -> Variable {
        match self.try_variable(name,dom) {
            Ok(v) => v,
            Err(e) => panic!("{}",e)
        }
    }

    ////////////////////////////////////////////////////////////
    // Constraint interface

    /// Add a constraint `expr ∈ dom`.
    ///
    /// # Arguments
    /// - `name` Optional constraint name. Elements are named `name[i]`.
    /// - `expr` Expression of size `n`.
    /// - `dom` Domain of size `n`, or a scalable domain that is broadcast to size `n`.
    pub fn try_constraint<E : IntoExpr, D : IntoLinearDomain>(& mut self, name : Option<&str>, expr : E, dom : D) -> Result<Constraint,ModelError> {
        let expr = expr.into_expr().finalize();
        let n = expr.len();
        let (lower,upper,_) = dom.try_into_domain(n)?.dissolve();
        self.check_subj(&expr)?;

        let first = self.rows.len();
        self.rows.reserve(n);
        for (i,((subj,cof,fix),bl,bu)) in izip!(expr.rows(),lower,upper).enumerate() {
            self.rows.push(Row{
                name : name.map(|name| element_name(name,i,n)),
                subj : subj.to_vec(),
                cof  : cof.to_vec(),
                fix,
                lower : bl - fix,
                upper : bu - fix });
        }
        self.invalidate();
        Ok(Constraint{ idxs : (first..first+n).collect() })
    }

    /// Add a constraint. See [Model::try_constraint]. Panics on mismatching sizes or invalid
    /// variable indexes.
    pub fn constraint<E : IntoExpr, D : IntoLinearDomain>(& mut self, name : Option<&str>, expr : E, dom : D) -> Constraint {
        match self.try_constraint(name,expr,dom) {
            Ok(c) => c,
            Err(e) => panic!("{}",e)
        }
    }

    /// Set the objective. The expression must be scalar.
    pub fn try_objective<E : IntoExpr>(& mut self, name : Option<&str>, sense : Sense, expr : E) -> Result<(),ModelError> {
        let expr = expr.into_expr().finalize();
        if expr.len() != 1 {
            return Err(ModelError::NonScalarObjective(expr.len()));
        }
        self.check_subj(&expr)?;
        if let Some((subj,cof,fix)) = expr.rows().next() {
            self.objective = Objective{
                name : name.map(|s| s.to_string()),
                sense,
                subj : subj.to_vec(),
                cof  : cof.to_vec(),
                fix };
        }
        self.invalidate();
        Ok(())
    }

    /// Set the objective. See [Model::try_objective]. Panics if the expression is not scalar.
    pub fn objective<E : IntoExpr>(& mut self, name : Option<&str>, sense : Sense, expr : E) {
        if let Err(e) = self.try_objective(name,sense,expr) {
            panic!("{}",e);
        }
    }

    /// Dense objective coefficient vector, one entry per column.
    pub fn objective_coefficients(&self) -> Vec<f64> {
        let mut c = vec![0.0; self.columns.len()];
        self.objective.subj.iter().zip(self.objective.cof.iter()).for_each(|(&j,&v)| c[j] += v);
        c
    }

    /// Objective value at `x`, including the constant term.
    pub fn evaluate_objective(&self, x : &[f64]) -> f64 {
        self.objective.subj.iter().zip(self.objective.cof.iter()).map(|(&j,&c)| c * x[j]).sum::<f64>() + self.objective.fix
    }

    ////////////////////////////////////////////////////////////
    // Solution interface

    /// Store a solution. Called by solver backends.
    ///
    /// # Arguments
    /// - `status` Status of the primal solution.
    /// - `values` One value per column.
    /// - `obj` Objective value, including the constant term.
    pub fn set_solution(&mut self, status : SolutionStatus, values : Vec<f64>, obj : f64) -> Result<(),ModelError> {
        if values.len() != self.columns.len() {
            return Err(ModelError::SizeMismatch{ expr : values.len(), domain : self.columns.len() });
        }
        self.sol.status = status;
        self.sol.var = values;
        self.sol.obj = obj;
        Ok(())
    }

    /// Mark the model as solved without a usable solution.
    pub fn clear_solution(&mut self, status : SolutionStatus) {
        self.sol.status = status;
        self.sol.var.clear();
        self.sol.obj = 0.0;
    }

    pub fn set_solved_by(&mut self, backend : &str) { self.sol.solved_by = Some(backend.to_string()); }
    /// Name of the backend that produced the current solution status.
    pub fn solved_by(&self) -> Option<&str> { self.sol.solved_by.as_deref() }

    pub fn solution_status(&self) -> SolutionStatus { self.sol.status }

    fn solution_values(&self) -> Result<&[f64],ModelError> {
        match self.sol.status {
            SolutionStatus::Optimal | SolutionStatus::Feasible => Ok(self.sol.var.as_slice()),
            status => Err(ModelError::NoSolution(status))
        }
    }

    /// Primal objective value, if a solution is available.
    pub fn primal_objective(&self) -> Option<f64> {
        self.solution_values().ok().map(|_| self.sol.obj)
    }

    /// Get primal solution values for a variable or constraint.
    pub fn primal_solution<I : ModelItem>(&self, item : &I) -> Result<Vec<f64>,ModelError> {
        let x = self.solution_values()?;
        let mut res = vec![0.0; item.len()];
        item.primal_into(self,x,res.as_mut_slice());
        Ok(res)
    }

    fn check_subj(&self, expr : &Expr) -> Result<(),ModelError> {
        let numvar = self.columns.len();
        match expr.rows().flat_map(|(subj,_,_)| subj.iter()).find(|&&j| j >= numvar) {
            Some(&index) => Err(ModelError::IndexOutOfBounds{ index, numvar }),
            None => Ok(())
        }
    }

    fn invalidate(&mut self) {
        self.sol = Solution::default();
    }
}

fn element_name(name : &str, i : usize, n : usize) -> String {
    if n == 1 { name.to_string() } else { format!("{}[{}]",name,i) }
}

fn lp_name(name : Option<&str>, prefix : char, i : usize) -> String {
    match name {
        Some(name) => name.chars().map(|c| if c.is_alphanumeric() || "_[].".contains(c) { c } else { '_' }).collect(),
        None => format!("{}{}",prefix,i)
    }
}

fn write_terms(f : &mut fmt::Formatter<'_>, model : &Model, subj : &[usize], cof : &[f64]) -> fmt::Result {
    if subj.is_empty() {
        return write!(f," 0");
    }
    for (&j,&c) in subj.iter().zip(cof.iter()) {
        let sign = if c < 0.0 { '-' } else { '+' };
        write!(f," {} {} {}",sign,c.abs(),lp_name(model.columns[j].name(),'x',j))?;
    }
    Ok(())
}

/// Writes the model in LP format.
impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name() {
            writeln!(f,"\\ {}",name)?;
        }
        match self.objective.sense {
            Sense::Minimize => writeln!(f,"Minimize")?,
            Sense::Maximize => writeln!(f,"Maximize")?
        }
        write!(f," {}:",lp_name(self.objective.name(),'o',0))?;
        write_terms(f,self,&self.objective.subj,&self.objective.cof)?;
        if self.objective.fix != 0.0 {
            write!(f," + {}",self.objective.fix)?;
        }
        writeln!(f)?;

        writeln!(f,"Subject To")?;
        for (i,row) in self.rows.iter().enumerate() {
            let name = lp_name(row.name(),'c',i);
            let bounds : [(&str,f64,&str);2] = [("_lo",row.lower,">="),("_up",row.upper,"<=")];
            if row.lower == row.upper {
                write!(f," {}:",name)?;
                write_terms(f,self,&row.subj,&row.cof)?;
                writeln!(f," = {}",row.lower)?;
                continue;
            }
            for (suffix,b,op) in bounds.iter().filter(|(_,b,_)| b.is_finite()) {
                let suffix = if row.lower.is_finite() && row.upper.is_finite() { *suffix } else { "" };
                write!(f," {}{}:",name,suffix)?;
                write_terms(f,self,&row.subj,&row.cof)?;
                writeln!(f," {} {}",op,b)?;
            }
        }

        writeln!(f,"Bounds")?;
        for (j,col) in self.columns.iter().enumerate() {
            let name = lp_name(col.name(),'x',j);
            match (col.lower.is_finite(),col.upper.is_finite()) {
                (true,true)   => writeln!(f," {} <= {} <= {}",col.lower,name,col.upper)?,
                (true,false)  => writeln!(f," {} >= {}",name,col.lower)?,
                (false,true)  => writeln!(f," -inf <= {} <= {}",name,col.upper)?,
                (false,false) => writeln!(f," {} free",name)?,
            }
        }

        let ints : Vec<String> = self.columns.iter().enumerate()
            .filter(|(_,c)| c.is_integer)
            .map(|(j,c)| lp_name(c.name(),'x',j))
            .collect();
        if !ints.is_empty() {
            writeln!(f,"General")?;
            writeln!(f," {}",ints.join(" "))?;
        }
        writeln!(f,"End")
    }
}
