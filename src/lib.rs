//! Fixed-charge blending models.
//!
//! Given a catalog of ingredients, each with a unit cost, a one-off activation fee, per-unit
//! property contributions and an availability, find the cheapest mixture whose size lies in a
//! window, whose quantity-weighted property values lie in their windows and which uses at most a
//! given number of distinct ingredients. The problem is stated as a mixed-integer linear program:
//!
//! ```text
//! minimize    cost·x + fee·z
//! subject to  total_min <= sum(x) <= total_max
//!             x[j] <= availability[j] z[j]
//!             (contrib_p - Pmin_p)·x >= 0,  (contrib_p - Pmax_p)·x <= 0   for every property p
//!             sum(z) <= max_distinct
//!             x >= 0, z ∈ {0,1}
//! ```
//!
//! The crate contains
//! - a small linear modeling layer ([Model], [Variable], [Expr] and the domain functions),
//! - the builder ([build]) producing a [BlendProblem] from a [Catalog] and a [TargetSpec],
//! - the solver adapter ([solve], [Backend], [BackendRegistry]) that picks the first available
//!   backend,
//! - the extractor ([extract]) producing a checked [BlendSolution].
//!
//! Backends live in separate crates (`blendmodel-highs`, `blendmodel-microlp`,
//! `blendmodel-mosek`) and register themselves in a [BackendRegistry].
//!
//! # Example
//!
//! ```
//! use blendmodel::*;
//!
//! let catalog = Catalog::new(vec![
//!     Ingredient::new("A",1.0,1000.0).with_property("p",1.0),
//!     Ingredient::new("B",5.0,1000.0).with_property("p",10.0)]).unwrap();
//! let targets = TargetSpec::new(100.0,100.0,2).with_property("p",1.0,1.0);
//! let mut problem = build(catalog,targets).unwrap();
//!
//! // Without any registered backend the adapter reports that nothing is available.
//! let outcome = problem.solve(&BackendRegistry::new(), &SolverConfig::default());
//! assert_eq!(outcome, SolveOutcome::NoBackendAvailable);
//! assert!(problem.extract().is_err());
//! ```

extern crate itertools;

mod domain;
mod expr;
mod variable;
mod model;
pub mod error;
mod catalog;
mod target;
mod builder;
mod solver;
mod solution;
mod config;

pub use domain::*;
pub use expr::*;
pub use variable::*;
pub use model::*;
pub use error::{BackendError, ConfigurationError, ExtractionError, ModelError};
pub use catalog::*;
pub use target::*;
pub use builder::*;
pub use solver::*;
pub use solution::*;
pub use config::*;
