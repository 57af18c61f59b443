use std::fmt;

/// Errors the engine surfaces to the policy layer.
///
/// Most engine misuse is a silent no-op by design (a stale `restore`,
/// `wait_next_interrupt` with nothing pending) — those are not
/// represented here, they simply return `()`. This enum only covers the
/// cases the policy must be able to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// `load_process` was called while `EngineConfig::max_processes` live
    /// processes already exist.
    ProcessLimitExceeded,
    /// `cpu_burst`, `io_request`, or `save` was called from a thread that
    /// is not currently resumed as a simulated process, and
    /// `EngineConfig::strict_context` is `true`.
    NoCurrentProcess,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::ProcessLimitExceeded => {
                write!(f, "process limit exceeded: no free process slot")
            }
            EngineError::NoCurrentProcess => {
                write!(f, "primitive called outside a resumed process context")
            }
        }
    }
}

impl std::error::Error for EngineError {}

pub type EngineResult<T> = Result<T, EngineError>;
