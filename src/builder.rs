//! The blend model builder.
//!
//! For a catalog of `n` ingredients the builder produces, in this order,
//! - variables `x` (quantities, `x[j] >= 0`) and `z` (activations, `z[j] ∈ {0,1}`),
//! - the objective `minimize cost·x + fee·z`,
//! - rows `total_min` and `total_max` bounding `sum(x)`,
//! - rows `link[j]`: `x[j] - availability[j] z[j] <= 0`,
//! - per tracked property `p` the rows `prop_<p>_min`: `(contrib_p - Pmin_p)·x >= 0` and
//!   `prop_<p>_max`: `(contrib_p - Pmax_p)·x <= 0`,
//! - the row `distinct`: `sum(z) <= max_distinct_ingredients`,
//! - optionally one row `share_<name>` per minimum share.
//!
//! The prefixes keep row names unique whatever the property and ingredient names are.
//!
//! The property rows are the linearization of `Pmin <= contrib·x / sum(x) <= Pmax` obtained by
//! multiplying through by `sum(x)`. The ratio itself never appears in the model.

use tracing::debug;

use crate::catalog::Catalog;
use crate::domain::*;
use crate::error::{ConfigurationError, ExtractionError};
use crate::model::{Model, Sense};
use crate::solution::{self, BlendSolution};
use crate::solver::{self, BackendRegistry, SolveOutcome, SolverConfig};
use crate::target::TargetSpec;
use crate::variable::Variable;

/// A built blend model together with the data it was built from.
///
/// The `BlendProblem` exclusively owns its [Model]. Solving writes the solution into that model,
/// and [BlendProblem::extract] reads it back.
#[derive(Clone,Debug)]
pub struct BlendProblem {
    catalog  : Catalog,
    targets  : TargetSpec,
    model    : Model,
    quantity : Variable,
    active   : Variable,
}

impl BlendProblem {
    pub fn catalog(&self) -> &Catalog { &self.catalog }
    pub fn targets(&self) -> &TargetSpec { &self.targets }
    pub fn model(&self) -> &Model { &self.model }
    /// Mutable access to the model, for backends and for adding side constraints.
    pub fn model_mut(&mut self) -> &mut Model { &mut self.model }
    /// Quantity variable `x`, one element per catalog entry.
    pub fn quantity(&self) -> &Variable { &self.quantity }
    /// Activation variable `z`, one element per catalog entry.
    pub fn active(&self) -> &Variable { &self.active }

    /// Solve with the first available backend among `config.backends`. See [solver::solve].
    pub fn solve(&mut self, registry : &BackendRegistry, config : &SolverConfig) -> SolveOutcome {
        solver::solve(&mut self.model, &config.backends, registry, config)
    }

    /// Extract the solution snapshot. See [solution::extract].
    pub fn extract(&self) -> Result<BlendSolution,ExtractionError> {
        solution::extract(self)
    }
}

/// Build the blend model.
///
/// # Arguments
/// - `catalog` The candidate ingredients. Their order defines the column order.
/// - `targets` Size, property and cardinality targets.
///
/// # Returns
/// The problem, or a [ConfigurationError] if the targets are inconsistent or a minimum share
/// names an ingredient that is not in the catalog. Nothing is emitted on failure.
///
/// # Example
/// ```
/// use blendmodel::*;
/// let catalog = Catalog::new(vec![
///     Ingredient::new("A",1.0,1000.0).with_property("p",1.0),
///     Ingredient::new("B",5.0,1000.0).with_property("p",10.0)]).unwrap();
/// let targets = TargetSpec::new(100.0,100.0,2).with_property("p",1.0,1.0);
/// let problem = build(catalog,targets).unwrap();
/// assert_eq!(problem.model().num_columns(),4);
/// assert_eq!(problem.model().num_rows(),2+2+2+1);
/// ```
pub fn build(catalog : Catalog, targets : TargetSpec) -> Result<BlendProblem,ConfigurationError> {
    targets.validate()?;
    if let Some(name) = targets.min_shares.keys().find(|name| catalog.position(name).is_none()) {
        return Err(ConfigurationError::UnknownIngredient(name.clone()));
    }

    let n = catalog.len();
    let mut model = Model::new(Some("blend"));

    let x = model.try_variable(Some("x"), nonnegative().with_shape(n))?;
    let z = model.try_variable(Some("z"), in_range(0.0,1.0).integer().with_shape(n))?;

    model.try_objective(Some("cost"),
                        Sense::Minimize,
                        x.dot(&catalog.costs()).add(z.dot(&catalog.fees())))?;

    let total = x.sum();
    model.try_constraint(Some("total_min"), total.clone(), greater_than(targets.total_min))?;
    model.try_constraint(Some("total_max"), total.clone(), less_than(targets.total_max))?;

    // x[j] <= availability[j] * z[j]
    model.try_constraint(Some("link"),
                         x.to_expr().sub(z.mul_elem(&catalog.availabilities())),
                         less_than(0.0))?;

    for (name,w) in targets.properties.iter() {
        let contrib = catalog.contributions(name);
        let lo : Vec<f64> = contrib.iter().map(|c| c - w.min).collect();
        let hi : Vec<f64> = contrib.iter().map(|c| c - w.max).collect();
        model.try_constraint(Some(format!("prop_{}_min",name).as_str()), x.dot(&lo), greater_than(0.0))?;
        model.try_constraint(Some(format!("prop_{}_max",name).as_str()), x.dot(&hi), less_than(0.0))?;
    }

    model.try_constraint(Some("distinct"), z.sum(), less_than(targets.max_distinct_ingredients as f64))?;

    for (name,&share) in targets.min_shares.iter() {
        if let Some(k) = catalog.position(name) {
            // x[k] - share * sum(x) >= 0
            model.try_constraint(Some(format!("share_{}",name).as_str()),
                                 x.index(k).to_expr().sub(total.clone().mul(share)),
                                 greater_than(0.0))?;
        }
    }

    debug!(ingredients = n,
           properties = targets.properties.len(),
           columns = model.num_columns(),
           rows = model.num_rows(),
           "built blend model");

    Ok(BlendProblem{ catalog, targets, model, quantity : x, active : z })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Ingredient;

    fn two_ingredients() -> Catalog {
        Catalog::new(vec![
            Ingredient::new("A",1.0,1000.0).with_property("p",1.0),
            Ingredient::new("B",5.0,1000.0).with_fee(3.0).with_property("p",10.0)]).unwrap()
    }

    #[test]
    fn structure() {
        let targets = TargetSpec::new(100.0,100.0,1).with_property("p",1.0,2.0).with_property("q",0.0,1.0);
        let p = build(two_ingredients(),targets).unwrap();
        let m = p.model();
        assert_eq!(m.num_columns(),4);
        assert_eq!(m.num_rows(),2 + 2 + 2*2 + 1);
        let names : Vec<&str> = m.rows().iter().filter_map(|r| r.name()).collect();
        assert_eq!(names,vec!["total_min","total_max","link[0]","link[1]","prop_p_min","prop_p_max","prop_q_min","prop_q_max","distinct"]);
        assert!(p.active().idxs().iter().all(|&j| m.columns()[j].is_binary()));
        assert!(p.quantity().idxs().iter().all(|&j| m.columns()[j].lower() == 0.0 && !m.columns()[j].is_integer()));
        assert_eq!(m.objective_coefficients(),vec![1.0,5.0,0.0,3.0]);
    }

    #[test]
    fn linearized_windows() {
        let targets = TargetSpec::new(10.0,20.0,2).with_property("p",2.0,4.0);
        let p = build(two_ingredients(),targets).unwrap();
        let m = p.model();
        let pmin = m.rows().iter().find(|r| r.name() == Some("prop_p_min")).unwrap();
        assert_eq!(pmin.subj(),&[0,1]);
        assert_eq!(pmin.cof(),&[-1.0,8.0]);
        assert_eq!(pmin.lower(),0.0);
        let pmax = m.rows().iter().find(|r| r.name() == Some("prop_p_max")).unwrap();
        assert_eq!(pmax.cof(),&[-3.0,6.0]);
        assert_eq!(pmax.upper(),0.0);

        let link = m.rows().iter().find(|r| r.name() == Some("link[1]")).unwrap();
        assert_eq!(link.terms().collect::<Vec<_>>(),vec![(1,1.0),(3,-1000.0)]);
        let distinct = m.rows().iter().find(|r| r.name() == Some("distinct")).unwrap();
        assert_eq!(distinct.upper(),2.0);
        assert_eq!(distinct.subj(),&[2,3]);
    }

    #[test]
    fn rejects_inconsistent_targets() {
        assert!(matches!(build(two_ingredients(),TargetSpec::new(1.0,2.0,-1)),
                         Err(ConfigurationError::NegativeCardinality(-1))));
        assert!(matches!(build(two_ingredients(),TargetSpec::new(1.0,2.0,1).with_property("p",3.0,2.0)),
                         Err(ConfigurationError::InvalidWindow{..})));
        assert!(matches!(build(two_ingredients(),TargetSpec::new(1.0,2.0,1).with_min_share("C",0.1)),
                         Err(ConfigurationError::UnknownIngredient(n)) if n == "C"));
    }

    #[test]
    fn share_rows() {
        let targets = TargetSpec::new(10.0,20.0,2).with_min_share("B",0.25);
        let p = build(two_ingredients(),targets).unwrap();
        let row = p.model().rows().last().unwrap();
        assert_eq!(row.name(),Some("share_B"));
        assert_eq!(row.terms().collect::<Vec<_>>(),vec![(0,-0.25),(1,0.75)]);
        assert_eq!(row.lower(),0.0);
    }

    #[test]
    fn row_names_are_unique() {
        let catalog = Catalog::new(vec![
            Ingredient::new("total",1.0,10.0).with_property("total",1.0),
            Ingredient::new("link",1.0,10.0)]).unwrap();
        let targets = TargetSpec::new(1.0,2.0,2)
            .with_property("total",0.0,1.0)
            .with_property("distinct",0.0,1.0)
            .with_min_share("total",0.1);
        let p = build(catalog,targets).unwrap();
        let mut names : Vec<&str> = p.model().rows().iter().filter_map(|r| r.name()).collect();
        assert_eq!(names.len(),p.model().num_rows());
        names.sort();
        names.dedup();
        assert_eq!(names.len(),p.model().num_rows());
        assert!(p.model().to_string().contains(" prop_total_min:"));
    }

    #[test]
    fn empty_catalog() {
        let p = build(Catalog::new(Vec::new()).unwrap(),TargetSpec::new(0.0,1.0,0)).unwrap();
        assert_eq!(p.model().num_columns(),0);
        // total_min, total_max, distinct
        assert_eq!(p.model().num_rows(),3);
    }
}
