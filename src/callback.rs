use std::sync::Arc;

/// A single engine-to-policy callback: `Fn(opaque)`, invoked synchronously
/// on whichever thread happens to be running inside the engine at the time.
pub type Callback<O> = Arc<dyn Fn(O) + Send + Sync + 'static>;

/// The three interrupt callbacks a policy registers with an [`crate::Engine`]:
/// one fired when a blocked process's I/O completes, one fired when a
/// running process's CPU-time slice runs out, and one fired after a
/// process body returns.
#[derive(Clone)]
pub struct Callbacks<O> {
    pub(crate) on_io_ready: Callback<O>,
    pub(crate) on_slice_runout: Callback<O>,
    pub(crate) on_exit: Callback<O>,
}

impl<O> Callbacks<O> {
    /// Register the three callbacks. `on_io_ready(opaque)` fires when a
    /// blocked process's I/O completes, `on_slice_runout(opaque)` fires
    /// when a running process exhausts its CPU-time budget, and
    /// `on_exit(opaque)` fires after a process body returns (the PCB has
    /// already been torn down by the time it fires).
    pub fn new(
        on_io_ready: impl Fn(O) + Send + Sync + 'static,
        on_slice_runout: impl Fn(O) + Send + Sync + 'static,
        on_exit: impl Fn(O) + Send + Sync + 'static,
    ) -> Self {
        Callbacks {
            on_io_ready: Arc::new(on_io_ready),
            on_slice_runout: Arc::new(on_slice_runout),
            on_exit: Arc::new(on_exit),
        }
    }
}
