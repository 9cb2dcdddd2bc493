//! Solution extraction and consistency checks.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use crate::builder::BlendProblem;
use crate::error::ExtractionError;
use crate::model::SolutionStatus;
use crate::target::{Window, WINDOW_TOLERANCE};

/// Quantities with an absolute value at or below this are reported as zero.
pub const QUANTITY_TOLERANCE : f64 = 1e-9;

fn within(value : f64, bound : f64) -> bool {
    value <= bound + WINDOW_TOLERANCE * bound.abs().max(1.0)
}

/// A solution value that does not satisfy the targets it was built from. Any violation means
/// the model or the backend is numerically off, since the constraints forbid all of them.
#[derive(Clone,Debug,PartialEq)]
pub enum Violation {
    /// Realized property value outside its window.
    Property { name : String, value : f64, window : Window },
    /// Total mixture size outside the capacity window.
    Total { value : f64, window : Window },
    /// More of an ingredient than is available.
    Availability { ingredient : String, quantity : f64, availability : f64 },
    /// A positive quantity of an ingredient that is not activated.
    Linking { ingredient : String, quantity : f64 },
    /// Too many distinct active ingredients.
    Cardinality { active : usize, limit : i64 },
    /// An ingredient below its required share of the total.
    Share { ingredient : String, share : f64, required : f64 },
    /// The objective reported by the backend disagrees with the cost recomputed from the
    /// quantities and activations.
    Objective { reported : f64, recomputed : f64 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Property{ name, value, window } =>
                write!(f,"property '{}' is {} outside [{},{}]",name,value,window.min,window.max),
            Violation::Total{ value, window } =>
                write!(f,"total {} outside [{},{}]",value,window.min,window.max),
            Violation::Availability{ ingredient, quantity, availability } =>
                write!(f,"'{}' uses {} but only {} is available",ingredient,quantity,availability),
            Violation::Linking{ ingredient, quantity } =>
                write!(f,"'{}' uses {} but is not activated",ingredient,quantity),
            Violation::Cardinality{ active, limit } =>
                write!(f,"{} active ingredients, at most {} allowed",active,limit),
            Violation::Share{ ingredient, share, required } =>
                write!(f,"'{}' has share {} below the required {}",ingredient,share,required),
            Violation::Objective{ reported, recomputed } =>
                write!(f,"reported objective {} differs from recomputed cost {}",reported,recomputed),
        }
    }
}

/// Quantity and activation of one ingredient.
#[derive(Clone,Debug,PartialEq)]
pub struct IngredientUse {
    pub name     : String,
    pub quantity : f64,
    pub active   : bool,
}

/// An immutable snapshot of an optimal blend.
#[derive(Clone,Debug)]
pub struct BlendSolution {
    objective       : f64,
    recomputed_cost : f64,
    total           : f64,
    ingredients     : Vec<IngredientUse>,
    properties      : BTreeMap<String,f64>,
    violations      : Vec<Violation>,
    solved_by       : Option<String>,
}

impl BlendSolution {
    /// Objective value as reported by the backend.
    pub fn objective(&self) -> f64 { self.objective }
    /// `sum cost·quantity + sum fee·[active]`, computed from the snapshot.
    pub fn recomputed_cost(&self) -> f64 { self.recomputed_cost }
    /// Total mixture size.
    pub fn total(&self) -> f64 { self.total }
    /// All ingredients in catalog order.
    pub fn ingredients(&self) -> &[IngredientUse] { self.ingredients.as_slice() }
    /// Realized quantity-weighted value of a property. Every property mentioned by the catalog or
    /// the targets is available.
    pub fn property(&self, name : &str) -> Option<f64> { self.properties.get(name).copied() }
    pub fn properties(&self) -> &BTreeMap<String,f64> { &self.properties }
    pub fn quantity(&self, name : &str) -> Option<f64> { self.find(name).map(|u| u.quantity) }
    pub fn is_active(&self, name : &str) -> Option<bool> { self.find(name).map(|u| u.active) }
    /// Names of activated ingredients.
    pub fn active_ingredients(&self) -> Vec<&str> {
        self.ingredients.iter().filter(|u| u.active).map(|u| u.name.as_str()).collect()
    }
    /// Ingredients with a non-zero quantity.
    pub fn used_ingredients(&self) -> impl Iterator<Item = &IngredientUse> {
        self.ingredients.iter().filter(|u| u.quantity > 0.0)
    }
    /// Consistency violations found during extraction. Empty for a sound solution.
    pub fn violations(&self) -> &[Violation] { self.violations.as_slice() }
    pub fn is_consistent(&self) -> bool { self.violations.is_empty() }
    /// The backend that produced the solution.
    pub fn solved_by(&self) -> Option<&str> { self.solved_by.as_deref() }

    fn find(&self, name : &str) -> Option<&IngredientUse> { self.ingredients.iter().find(|u| u.name == name) }
}

/// Read the solution of a solved [BlendProblem] and check it against the targets.
///
/// Quantities with `|x| <= 1e-9` are snapped to zero and activations are rounded at `0.5`.
/// Realized property values are recomputed as `contrib·x / sum(x)` and compared to their windows
/// with a relative tolerance of `1e-6`. Anything out of tolerance is logged and returned in
/// [BlendSolution::violations]; it does not fail the extraction.
///
/// # Errors
/// - [ExtractionError::NotOptimal] if the model does not hold an optimal solution.
/// - [ExtractionError::DegenerateMixture] if the total quantity is zero.
pub fn extract(problem : &BlendProblem) -> Result<BlendSolution,ExtractionError> {
    let model = problem.model();
    let status = model.solution_status();
    if status != SolutionStatus::Optimal {
        return Err(ExtractionError::NotOptimal(status));
    }
    let objective = model.primal_objective().ok_or(ExtractionError::NotOptimal(status))?;
    let x = model.primal_solution(problem.quantity())?;
    let z = model.primal_solution(problem.active())?;

    let catalog = problem.catalog();
    let targets = problem.targets();

    let ingredients : Vec<IngredientUse> = catalog.iter().zip(x.iter().zip(z.iter()))
        .map(|(ing,(&x,&z))| IngredientUse{
            name     : ing.name.clone(),
            quantity : if x.abs() <= QUANTITY_TOLERANCE { 0.0 } else { x },
            active   : z >= 0.5 })
        .collect();

    let total : f64 = ingredients.iter().map(|u| u.quantity).sum();
    if total == 0.0 {
        return Err(ExtractionError::DegenerateMixture);
    }

    let recomputed_cost : f64 = catalog.iter().zip(ingredients.iter())
        .map(|(ing,u)| ing.cost * u.quantity + if u.active { ing.fee } else { 0.0 })
        .sum();

    let mut names = catalog.property_names();
    names.extend(targets.properties.keys().map(|k| k.as_str()));
    let properties : BTreeMap<String,f64> = names.into_iter()
        .map(|p| (p.to_string(),
                  catalog.iter().zip(ingredients.iter()).map(|(ing,u)| ing.contribution(p) * u.quantity).sum::<f64>() / total))
        .collect();

    let mut violations = Vec::new();
    if !targets.total().contains(total,WINDOW_TOLERANCE) {
        violations.push(Violation::Total{ value : total, window : targets.total() });
    }
    for (ing,u) in catalog.iter().zip(ingredients.iter()) {
        if !within(u.quantity,ing.availability) {
            violations.push(Violation::Availability{ ingredient : u.name.clone(), quantity : u.quantity, availability : ing.availability });
        }
        if u.quantity > 0.0 && !u.active {
            violations.push(Violation::Linking{ ingredient : u.name.clone(), quantity : u.quantity });
        }
    }
    let active = ingredients.iter().filter(|u| u.active).count();
    if active as i64 > targets.max_distinct_ingredients {
        violations.push(Violation::Cardinality{ active, limit : targets.max_distinct_ingredients });
    }
    for (name,window) in targets.properties.iter() {
        if let Some(&value) = properties.get(name) {
            if !window.contains(value,WINDOW_TOLERANCE) {
                violations.push(Violation::Property{ name : name.clone(), value, window : *window });
            }
        }
    }
    for (name,&required) in targets.min_shares.iter() {
        if let Some(u) = ingredients.iter().find(|u| &u.name == name) {
            let share = u.quantity / total;
            if !within(required,share) {
                violations.push(Violation::Share{ ingredient : name.clone(), share, required });
            }
        }
    }
    if (objective - recomputed_cost).abs() > WINDOW_TOLERANCE * objective.abs().max(1.0) {
        violations.push(Violation::Objective{ reported : objective, recomputed : recomputed_cost });
    }

    for v in violations.iter() {
        warn!(violation = %v, "solution violates targets beyond tolerance");
    }
    debug!(total, objective, active, violations = violations.len(), "extracted solution");

    Ok(BlendSolution{
        objective,
        recomputed_cost,
        total,
        ingredients,
        properties,
        violations,
        solved_by : model.solved_by().map(|s| s.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::catalog::{Catalog, Ingredient};
    use crate::target::TargetSpec;
    use approx::assert_relative_eq;

    fn problem() -> BlendProblem {
        let catalog = Catalog::new(vec![
            Ingredient::new("A",1.0,1000.0).with_property("p",1.0),
            Ingredient::new("B",5.0,1000.0).with_fee(7.0).with_property("p",10.0)]).unwrap();
        build(catalog,TargetSpec::new(100.0,100.0,2).with_property("p",1.0,5.5)).unwrap()
    }

    // Columns are x[A], x[B], z[A], z[B].
    fn with_solution(x : [f64;4], obj : f64) -> BlendProblem {
        let mut p = problem();
        p.model_mut().set_solution(SolutionStatus::Optimal, x.to_vec(), obj).unwrap();
        p
    }

    #[test]
    fn requires_optimal() {
        let p = problem();
        assert!(matches!(extract(&p), Err(ExtractionError::NotOptimal(SolutionStatus::Undefined))));
        let mut p = problem();
        p.model_mut().clear_solution(SolutionStatus::CertInfeas);
        assert!(matches!(extract(&p), Err(ExtractionError::NotOptimal(SolutionStatus::CertInfeas))));
        let mut p = problem();
        p.model_mut().set_solution(SolutionStatus::Feasible, vec![100.0,0.0,1.0,0.0], 100.0).unwrap();
        assert!(matches!(extract(&p), Err(ExtractionError::NotOptimal(SolutionStatus::Feasible))));
    }

    #[test]
    fn zero_total() {
        let p = with_solution([1e-12,0.0,0.0,0.0],0.0);
        assert!(matches!(extract(&p), Err(ExtractionError::DegenerateMixture)));
    }

    #[test]
    fn consistent_solution() {
        // 50 A + 50 B: p = (50 + 500)/100 = 5.5
        let p = with_solution([50.0,50.0,1.0,1.0],50.0 + 250.0 + 7.0);
        let s = extract(&p).unwrap();
        assert!(s.is_consistent(),"{:?}",s.violations());
        assert_relative_eq!(s.total(),100.0);
        assert_relative_eq!(s.property("p").unwrap(),5.5);
        assert_relative_eq!(s.recomputed_cost(),307.0);
        assert_eq!(s.active_ingredients(),vec!["A","B"]);
        assert_eq!(s.quantity("B"),Some(50.0));
        assert_eq!(s.is_active("C"),None);
    }

    #[test]
    fn fee_only_when_active() {
        let p = with_solution([100.0,1e-10,1.0,0.2],100.0);
        let s = extract(&p).unwrap();
        assert_eq!(s.quantity("B"),Some(0.0));
        assert_eq!(s.is_active("B"),Some(false));
        assert_relative_eq!(s.recomputed_cost(),100.0);
        assert_eq!(s.used_ingredients().count(),1);
        assert!(s.is_consistent());
    }

    #[test]
    fn violations_are_reported() {
        // p = (40 + 600)/100 = 6.4 > 5.5, B used without activation, objective off
        let p = with_solution([40.0,60.0,1.0,0.0],0.0);
        let s = extract(&p).unwrap();
        let v = s.violations();
        assert!(v.iter().any(|v| matches!(v, Violation::Property{ name, .. } if name == "p")));
        assert!(v.iter().any(|v| matches!(v, Violation::Linking{ ingredient, .. } if ingredient == "B")));
        assert!(v.iter().any(|v| matches!(v, Violation::Objective{ .. })));
        assert!(!v.iter().any(|v| matches!(v, Violation::Total{ .. })));
    }

    #[test]
    fn tolerance_is_relative() {
        // p slightly above 5.5 but within 1e-6 relative
        let p = with_solution([49.9999999,50.0000001,1.0,1.0],307.0);
        let s = extract(&p).unwrap();
        assert!(!s.violations().iter().any(|v| matches!(v, Violation::Property{ .. })));
    }
}
