//! Blend files.
//!
//! A blend file is a TOML document with an optional `[solver]` table, a `[targets]` table and a
//! list of `[[ingredients]]`:
//!
//! ```toml
//! [solver]
//! backends = ["highs", "microlp"]
//! time_limit_secs = 30.0
//!
//! [targets]
//! total_min = 100.0
//! total_max = 100.0
//! max_distinct_ingredients = 2
//! [targets.properties.p]
//! min = 1.0
//! max = 1.0
//!
//! [[ingredients]]
//! name = "A"
//! cost = 1.0
//! availability = 1000.0
//! properties = { p = 1.0 }
//! ```
//!
//! Unknown keys are rejected.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::{build, BlendProblem};
use crate::catalog::Catalog;
use crate::error::ConfigurationError;
use crate::solver::SolverConfig;
use crate::target::TargetSpec;

#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlendFile {
    #[serde(default)]
    pub solver      : SolverConfig,
    pub targets     : TargetSpec,
    pub ingredients : Catalog,
}

impl BlendFile {
    /// Read and parse a blend file.
    pub fn load<P : AsRef<Path>>(path : P) -> Result<BlendFile,ConfigurationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(ConfigurationError::Read)?;
        debug!(path = %path.display(), bytes = text.len(), "read blend file");
        BlendFile::parse(&text)
    }

    /// Parse a blend file from a string. Catalog validation happens while parsing, target
    /// validation when the problem is built.
    pub fn parse(text : &str) -> Result<BlendFile,ConfigurationError> {
        toml::from_str(text).map_err(ConfigurationError::Parse)
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> Result<String,toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Build the blend problem. See [build].
    pub fn build(&self) -> Result<BlendProblem,ConfigurationError> {
        build(self.ingredients.clone(),self.targets.clone())
    }
}

impl std::str::FromStr for BlendFile {
    type Err = ConfigurationError;
    fn from_str(s : &str) -> Result<BlendFile,ConfigurationError> { BlendFile::parse(s) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::BackendId;

    const TEXT : &str = r#"
[solver]
backends = ["microlp", "highs"]
time_limit_secs = 5.0

[targets]
total_min = 100.0
total_max = 100.0
max_distinct_ingredients = 2
[targets.properties.p]
min = 1.0
max = 1.0

[[ingredients]]
name = "A"
cost = 1.0
availability = 1000.0
properties = { p = 1.0 }

[[ingredients]]
name = "B"
cost = 5.0
fee = 2.0
availability = 1000.0
[ingredients.properties]
p = 10.0
"#;

    #[test]
    fn parse() {
        let f : BlendFile = TEXT.parse().unwrap();
        assert_eq!(f.solver.backends,vec![BackendId::Microlp,BackendId::Highs]);
        assert_eq!(f.solver.time_limit_secs,Some(5.0));
        assert!(!f.solver.verbose);
        assert_eq!(f.ingredients.len(),2);
        assert_eq!(f.ingredients.get("B").map(|i| i.fee),Some(2.0));
        assert_eq!(f.ingredients.get("A").map(|i| i.fee),Some(0.0));
        assert_eq!(f.targets.properties["p"].max,1.0);
        assert!(f.build().is_ok());
    }

    #[test]
    fn solver_table_is_optional() {
        let text = TEXT.replace("[solver]\nbackends = [\"microlp\", \"highs\"]\ntime_limit_secs = 5.0\n","");
        let f = BlendFile::parse(&text).unwrap();
        assert_eq!(f.solver,SolverConfig::default());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(BlendFile::parse(&TEXT.replace("total_min","total_minimum")), Err(ConfigurationError::Parse(_))));
        assert!(matches!(BlendFile::parse(&TEXT.replace("\"microlp\"","\"cplex\"")), Err(ConfigurationError::Parse(_))));
        assert!(matches!(BlendFile::parse(&TEXT.replace("name = \"B\"","name = \"A\"")), Err(ConfigurationError::Parse(_))));
        assert!(matches!(BlendFile::load("/nonexistent/blend.toml"), Err(ConfigurationError::Read(_))));

        let f = BlendFile::parse(&TEXT.replace("max_distinct_ingredients = 2","max_distinct_ingredients = -2")).unwrap();
        assert!(matches!(f.build(), Err(ConfigurationError::NegativeCardinality(-2))));
    }

    #[test]
    fn round_trip() {
        let f = BlendFile::parse(TEXT).unwrap();
        let g = BlendFile::parse(&f.to_toml().unwrap()).unwrap();
        assert_eq!(f,g);
    }
}
