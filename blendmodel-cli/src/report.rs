//! Operator-facing blend report.

use std::io::{self, Write};

use blendmodel::{BlendSolution, TargetSpec};

const RULE_WIDTH : usize = 40;

/// Write the plan for a solved blend.
///
/// # Arguments
/// - `out` Destination.
/// - `title` Report heading.
/// - `solution` The extracted solution.
/// - `targets` The targets it was solved against; used to print the windows next to the realized
///   values.
pub fn write_plan<W : Write>(out : &mut W, title : &str, solution : &BlendSolution, targets : &TargetSpec) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out,"=== {} ===",title)?;
    if let Some(id) = solution.solved_by() {
        writeln!(out,"{:<14} {}","Solved by",id)?;
    }
    writeln!(out,"{:<14} {:.2}","Total cost",solution.objective())?;
    writeln!(out,"{:<14} {:.1}  (window [{}, {}])","Total",solution.total(),targets.total_min,targets.total_max)?;

    if !targets.properties.is_empty() {
        let props : Vec<String> = targets.properties.iter()
            .filter_map(|(name,w)| solution.property(name).map(|v| format!("{}={:.2} in [{}, {}]",name,v,w.min,w.max)))
            .collect();
        writeln!(out,"{:<14} {}","Properties",props.join("  "))?;
    }

    let active = solution.active_ingredients();
    writeln!(out,"{:<14} [{}] (count={}, limit {})","Ingredients",active.join(", "),active.len(),targets.max_distinct_ingredients)?;

    writeln!(out)?;
    writeln!(out,"Breakdown")?;
    writeln!(out,"{}","─".repeat(RULE_WIDTH))?;
    for u in solution.used_ingredients() {
        writeln!(out,"  {:<12}  {:8.2}",u.name,u.quantity)?;
    }

    for v in solution.violations() {
        writeln!(out,"⚠ {}",v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blendmodel::*;

    #[test]
    fn plan() {
        let catalog = Catalog::new(vec![
            Ingredient::new("A",1.0,1000.0).with_property("p",1.0),
            Ingredient::new("B",5.0,1000.0).with_property("p",10.0)]).unwrap();
        let targets = TargetSpec::new(100.0,100.0,2).with_property("p",1.0,1.0);
        let mut p = build(catalog,targets.clone()).unwrap();
        p.model_mut().set_solution(SolutionStatus::Optimal,vec![100.0,0.0,1.0,0.0],101.0).unwrap();
        p.model_mut().set_solved_by("test");
        let s = p.extract().unwrap();

        let mut buf = Vec::new();
        write_plan(&mut buf,"Blend Plan",&s,&targets).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("=== Blend Plan ==="));
        assert!(text.contains("Solved by      test"));
        assert!(text.contains("Total cost     101.00"));
        assert!(text.contains("p=1.00 in [1, 1]"));
        assert!(text.contains("[A] (count=1, limit 2)"));
        let breakdown : Vec<&str> = text.lines().skip_while(|l| !l.starts_with("─")).skip(1).take_while(|l| l.starts_with("  ")).collect();
        assert_eq!(breakdown.len(),1);
        assert!(breakdown[0].starts_with("  A ") && breakdown[0].ends_with("100.00"));
        // reported 101 vs recomputed 100
        assert!(text.contains("⚠ reported objective"));
    }
}
