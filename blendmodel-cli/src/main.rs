//! `blend`: solve a blend file and print the plan.
//!
//! Without a file argument the built-in brewing demo is solved.

mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use blendmodel::{BackendId, BackendRegistry, BlendFile, SolveOutcome};
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, EnvFilter};

const DEMO : &str = include_str!("../demos/brew.toml");

/// Fixed-charge blend planner.
#[derive(Parser, Debug)]
#[command(name = "blend", version, about, long_about = None)]
struct Cli {
    /// Blend file (TOML). Solves the built-in brewing demo when omitted.
    file : Option<PathBuf>,

    /// Backend to try, in order. Repeat to give several. Overrides `[solver] backends`.
    #[arg(long = "backend", value_name = "NAME")]
    backends : Vec<BackendId>,

    /// Solver time limit in seconds.
    #[arg(long, value_name = "SECS")]
    time_limit : Option<f64>,

    /// Forward the backend's own log output.
    #[arg(long)]
    verbose : bool,

    /// Write the model in LP format to this file before solving.
    #[arg(long, value_name = "PATH")]
    write_lp : Option<PathBuf>,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, default_value = "warn")]
    log_level : String,
}

fn init_logging(level : &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn registry() -> BackendRegistry {
    let mut r = BackendRegistry::new();
    blendmodel_highs::register(&mut r);
    blendmodel_microlp::register(&mut r);
    blendmodel_mosek::register(&mut r);
    r
}

fn load(cli : &Cli) -> anyhow::Result<BlendFile> {
    let mut file = match &cli.file {
        Some(path) => BlendFile::load(path).with_context(|| format!("failed to load {}",path.display()))?,
        None => BlendFile::parse(DEMO).context("built-in demo is invalid")?,
    };
    if !cli.backends.is_empty() {
        file.solver.backends = cli.backends.clone();
    }
    if cli.time_limit.is_some() {
        file.solver.time_limit_secs = cli.time_limit;
    }
    file.solver.verbose |= cli.verbose;
    Ok(file)
}

fn run(cli : Cli) -> anyhow::Result<ExitCode> {
    let file = load(&cli)?;
    let mut problem = file.build().context("invalid blend")?;
    debug!(rows = problem.model().num_rows(), columns = problem.model().num_columns(), "built model");

    if let Some(path) = &cli.write_lp {
        std::fs::write(path,problem.model().to_string())
            .with_context(|| format!("failed to write {}",path.display()))?;
        info!(path = %path.display(), "wrote model");
    }

    let registry = registry();
    match problem.solve(&registry,&file.solver) {
        SolveOutcome::Optimal => {
            let solution = problem.extract().context("failed to read the solution")?;
            let title = if cli.file.is_some() { "Blend Plan" } else { "Brew & Blend Plan" };
            report::write_plan(&mut std::io::stdout().lock(),title,&solution,problem.targets())?;
            Ok(ExitCode::SUCCESS)
        },
        SolveOutcome::NoBackendAvailable => {
            let tried : Vec<&str> = file.solver.backends.iter().map(|b| b.as_str()).collect();
            eprintln!("✗ No MILP solver backend is available (tried: {}).", tried.join(", "));
            eprintln!("  Pass --backend microlp to use the built-in solver, or build with --features mosek and install a MOSEK license.");
            Ok(ExitCode::from(2))
        },
        outcome => {
            eprintln!("✗ No blend plan: {}", outcome);
            Ok(ExitCode::from(1))
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "fatal error");
            eprintln!("✗ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_builds() {
        let file = BlendFile::parse(DEMO).unwrap();
        assert_eq!(file.ingredients.len(),6);
        assert_eq!(file.solver.backends,vec![BackendId::Highs,BackendId::Microlp,BackendId::Mosek]);
        let p = file.build().unwrap();
        // total_min, total_max, 6 links, color and body windows, distinct
        assert_eq!(p.model().num_rows(),2 + 6 + 4 + 1);
    }

    #[test]
    fn arguments_override_the_file() {
        let cli = Cli::parse_from(["blend","--backend","microlp","--backend","HiGHS","--time-limit","5"]);
        let file = load(&cli).unwrap();
        assert_eq!(file.solver.backends,vec![BackendId::Microlp,BackendId::Highs]);
        assert_eq!(file.solver.time_limit_secs,Some(5.0));
        assert!(Cli::try_parse_from(["blend","--backend","cplex"]).is_err());
    }

    #[test]
    fn demo_solves_with_microlp() {
        let file = BlendFile::parse(DEMO).unwrap();
        let mut p = file.build().unwrap();
        let config = blendmodel::SolverConfig{ backends : vec![BackendId::Microlp], ..file.solver.clone() };
        assert_eq!(p.solve(&registry(),&config),SolveOutcome::Optimal);
        let s = p.extract().unwrap();
        assert!(s.is_consistent(),"{:?}",s.violations());
        assert!(s.total() >= 180.0 - 1e-6 && s.total() <= 200.0 + 1e-6);
    }
}
