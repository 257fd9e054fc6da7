use std::error::Error;

/// Boxed result used by the command executor and the binaries on top of it.
pub type EngineResult<T> = Result<T, Box<dyn Error + Send + Sync>>;
