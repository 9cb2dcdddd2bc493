extern crate blendmodel;
extern crate blendmodel_microlp;

use approx::assert_abs_diff_eq;
use blendmodel::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn registry() -> BackendRegistry {
    let mut r = BackendRegistry::new();
    blendmodel_microlp::register(&mut r);
    r
}

fn config() -> SolverConfig {
    SolverConfig{ backends : vec![BackendId::Microlp], ..SolverConfig::default() }
}

fn two_ingredients(availability : f64) -> Catalog {
    Catalog::new(vec![
        Ingredient::new("A",1.0,availability).with_property("p",1.0),
        Ingredient::new("B",5.0,availability).with_property("p",10.0)]).unwrap()
}

fn solve(catalog : Catalog, targets : TargetSpec) -> (SolveOutcome,BlendProblem) {
    let mut p = build(catalog,targets).unwrap();
    let outcome = p.solve(&registry(),&config());
    (outcome,p)
}

#[test]
fn only_a_matches() {
    let (outcome,p) = solve(two_ingredients(1000.0),TargetSpec::new(100.0,100.0,2).with_property("p",1.0,1.0));
    assert_eq!(outcome,SolveOutcome::Optimal);
    let s = p.extract().unwrap();
    assert_abs_diff_eq!(s.quantity("A").unwrap(),100.0,epsilon = 1e-6);
    assert_abs_diff_eq!(s.quantity("B").unwrap(),0.0,epsilon = 1e-6);
    assert_abs_diff_eq!(s.objective(),100.0,epsilon = 1e-6);
    assert_eq!(s.active_ingredients(),vec!["A"]);
    assert_eq!(s.solved_by(),Some("microlp"));
}

#[test]
fn only_b_matches() {
    let (outcome,p) = solve(two_ingredients(1000.0),TargetSpec::new(100.0,100.0,2).with_property("p",10.0,10.0));
    assert_eq!(outcome,SolveOutcome::Optimal);
    let s = p.extract().unwrap();
    assert_abs_diff_eq!(s.quantity("A").unwrap(),0.0,epsilon = 1e-6);
    assert_abs_diff_eq!(s.quantity("B").unwrap(),100.0,epsilon = 1e-6);
    assert_abs_diff_eq!(s.objective(),500.0,epsilon = 1e-6);
}

#[test]
fn insufficient_availability() {
    let (outcome,p) = solve(two_ingredients(10.0),TargetSpec::new(50.0,50.0,2));
    assert_eq!(outcome,SolveOutcome::Infeasible);
    assert!(p.extract().is_err());
}

#[test]
fn unreachable_property_window() {
    // every contribution is at most 10, so an average in [11,12] is impossible
    let (outcome,_) = solve(two_ingredients(1000.0),TargetSpec::new(10.0,100.0,2).with_property("p",11.0,12.0));
    assert_eq!(outcome,SolveOutcome::Infeasible);
}

#[test]
fn cardinality_limits_the_mix() {
    // p = 5.5 needs both A and B
    let (outcome,_) = solve(two_ingredients(1000.0),TargetSpec::new(100.0,100.0,1).with_property("p",5.5,5.5));
    assert_eq!(outcome,SolveOutcome::Infeasible);
    let (outcome,p) = solve(two_ingredients(1000.0),TargetSpec::new(100.0,100.0,2).with_property("p",5.5,5.5));
    assert_eq!(outcome,SolveOutcome::Optimal);
    let s = p.extract().unwrap();
    assert_abs_diff_eq!(s.quantity("A").unwrap(),50.0,epsilon = 1e-6);
    assert_abs_diff_eq!(s.property("p").unwrap(),5.5,epsilon = 1e-6);
}

#[test]
fn minimum_share() {
    let targets = TargetSpec::new(100.0,100.0,2).with_min_share("B",0.2);
    let (outcome,p) = solve(two_ingredients(1000.0),targets);
    assert_eq!(outcome,SolveOutcome::Optimal);
    let s = p.extract().unwrap();
    assert_abs_diff_eq!(s.quantity("B").unwrap(),20.0,epsilon = 1e-6);
    assert_abs_diff_eq!(s.objective(),80.0 + 100.0,epsilon = 1e-6);
    assert!(s.is_consistent(),"{:?}",s.violations());
}

#[test]
fn empty_catalog() {
    let empty = || Catalog::new(Vec::new()).unwrap();
    // nothing to mix, so total_min > 0 can not be met
    let (outcome,p) = solve(empty(),TargetSpec::new(100.0,200.0,2));
    assert_eq!(outcome,SolveOutcome::Infeasible);
    assert!(matches!(p.extract(), Err(ExtractionError::NotOptimal(_))));

    let (outcome,p) = solve(empty(),TargetSpec::new(0.0,200.0,2));
    assert_eq!(outcome,SolveOutcome::Optimal);
    assert_eq!(p.model().primal_objective(),Some(0.0));
    assert!(matches!(p.extract(), Err(ExtractionError::DegenerateMixture)));
}

#[test]
fn idempotent() {
    let mut p = build(two_ingredients(1000.0),TargetSpec::new(100.0,120.0,2).with_property("p",2.5,4.0)).unwrap();
    assert!(p.solve(&registry(),&config()).is_optimal());
    let s1 = p.extract().unwrap();
    assert!(p.solve(&registry(),&config()).is_optimal());
    let s2 = p.extract().unwrap();
    assert_eq!(s1.objective(),s2.objective());
    assert_eq!(s1.ingredients(),s2.ingredients());
}

fn random_case(rng : &mut StdRng) -> (Catalog,TargetSpec,f64) {
    let n = rng.gen_range(2..7);
    let props = ["p","q"];
    let ingredients : Vec<Ingredient> = (0..n)
        .map(|j| {
            let mut ing = Ingredient::new(&format!("I{}",j), rng.gen_range(0.5..5.0), rng.gen_range(10.0..100.0))
                .with_fee(if rng.gen_bool(0.5) { rng.gen_range(0.0..50.0) } else { 0.0 });
            for p in props {
                ing = ing.with_property(p, rng.gen_range(0.0..10.0));
            }
            ing
        })
        .collect();

    // A feasible reference mixture of up to `k` ingredients, with windows around its values.
    let k = rng.gen_range(1..=n.min(3));
    let used : Vec<(usize,f64)> = (0..k).map(|j| (j, rng.gen_range(0.2..1.0) * ingredients[j].availability)).collect();
    let total : f64 = used.iter().map(|&(_,q)| q).sum();
    let cost : f64 = used.iter().map(|&(j,q)| ingredients[j].cost * q + ingredients[j].fee).sum();
    let mut targets = TargetSpec::new(0.9 * total, 1.1 * total, k as i64);
    for p in props {
        let v = used.iter().map(|&(j,q)| ingredients[j].contribution(p) * q).sum::<f64>() / total;
        targets = targets.with_property(p, v - 0.5, v + 0.5);
    }
    (Catalog::new(ingredients).unwrap(),targets,cost)
}

#[test]
fn random_catalogs() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..25 {
        let (catalog,targets,reference_cost) = random_case(&mut rng);
        let (outcome,p) = solve(catalog.clone(),targets.clone());
        assert_eq!(outcome,SolveOutcome::Optimal,"{:?} {:?}",catalog,targets);
        let s = p.extract().unwrap();

        assert!(s.is_consistent(),"{:?}",s.violations());
        assert!(s.objective() <= reference_cost + 1e-6 * reference_cost.max(1.0));
        assert_abs_diff_eq!(s.objective(),s.recomputed_cost(),epsilon = 1e-6 * s.objective().max(1.0));
        assert!(s.total() >= targets.total_min - 1e-6 && s.total() <= targets.total_max + 1e-6);
        assert!(s.active_ingredients().len() as i64 <= targets.max_distinct_ingredients);
        for (ing,u) in catalog.iter().zip(s.ingredients()) {
            assert!(u.quantity <= ing.availability + 1e-6);
            assert!(u.quantity == 0.0 || u.active);
        }
    }
}

#[test]
fn brewing_grist() {
    let malt = |name : &str, cost : f64, fee : f64, color : f64, body : f64, stock : f64|
        Ingredient::new(name,cost,stock).with_fee(fee).with_property("color",color).with_property("body",body);
    let catalog = Catalog::new(vec![
        malt("Pilsner",  1.8, 0.0, 1.0, 1.0, 160.0),
        malt("Vienna",   2.1, 0.0, 2.0, 1.4,  80.0),
        malt("Munich",   2.2, 0.0, 3.0, 1.6,  80.0),
        malt("Crystal60",3.0,25.0, 6.0, 1.2,  40.0),
        malt("Roasted",  3.4,25.0,12.0, 0.8,  20.0),
        malt("Wheat",    2.0, 0.0, 1.0, 1.5,  60.0)]).unwrap();
    let targets = TargetSpec::new(180.0,200.0,4)
        .with_property("color",2.5,5.0)
        .with_property("body",1.15,1.45);
    let (outcome,p) = solve(catalog,targets);
    assert_eq!(outcome,SolveOutcome::Optimal);
    let s = p.extract().unwrap();
    assert!(s.is_consistent(),"{:?}",s.violations());
    assert!(s.active_ingredients().len() <= 4);
    // Pilsner 20, Vienna 80, Munich 80, Crystal60 20 is feasible
    assert!(s.objective() <= 20.0*1.8 + 80.0*2.1 + 80.0*2.2 + 20.0*3.0 + 25.0 + 1e-6);
}
