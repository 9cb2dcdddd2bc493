//! MOSEK backend for [blendmodel].
//!
//! MOSEK needs a native library and a license. The backend is only functional when the crate is
//! built with the `mosek` feature; otherwise [factory] reports the backend as unavailable, and
//! the solver adapter moves on to the next candidate.
//!
//! With the feature enabled, probing optimizes a one-variable problem, so a missing or expired
//! license also makes the backend unavailable rather than failing the solve.

use blendmodel::{Backend, BackendError, BackendId, BackendRegistry, SolverConfig};

#[cfg(feature = "mosek")]
mod task;

#[cfg(feature = "mosek")]
pub use task::MosekBackend;

/// Create a boxed MOSEK backend.
#[cfg(feature = "mosek")]
pub fn factory(config : &SolverConfig) -> Result<Box<dyn Backend>,BackendError> {
    Ok(Box::new(MosekBackend::new(config)?))
}

/// Create a boxed MOSEK backend. Always fails since the crate was built without MOSEK support.
#[cfg(not(feature = "mosek"))]
pub fn factory(_config : &SolverConfig) -> Result<Box<dyn Backend>,BackendError> {
    Err(BackendError::Unavailable("built without the 'mosek' feature".to_string()))
}

/// Register the MOSEK backend under [BackendId::Mosek].
pub fn register(registry : &mut BackendRegistry) {
    registry.register(BackendId::Mosek, factory);
}

/// `true` if the crate was built with MOSEK support.
pub fn is_enabled() -> bool { cfg!(feature = "mosek") }
