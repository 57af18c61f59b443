/// Runtime knobs for an [`crate::Engine`]. Since this engine is a reusable
/// library rather than a single simulation binary, its capacity and
/// misuse-handling settings are runtime fields rather than compile-time
/// constants.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Upper bound on simultaneously live (loaded, not yet exited)
    /// processes. `None` (the default) means unbounded, matching the engine
    /// having no inherent capacity of its own — only a policy imposes one.
    pub max_processes: Option<usize>,
    /// When `true` (the default), calling `cpu_burst`, `io_request`, or
    /// `save` from a thread that isn't currently resumed as a process
    /// returns `Err(EngineError::NoCurrentProcess)`. When `false`, the same
    /// misuse panics instead.
    pub strict_context: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_processes: None,
            strict_context: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_processes(mut self, max_processes: usize) -> Self {
        self.max_processes = Some(max_processes);
        self
    }

    pub fn with_strict_context(mut self, strict_context: bool) -> Self {
        self.strict_context = strict_context;
        self
    }
}
