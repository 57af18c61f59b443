use std::sync::Weak;

use parking_lot::Mutex;

use crate::pcb::Pcb;

struct CpuStateInner<O> {
    up_to_date: bool,
    pcb: Option<Weak<Pcb<O>>>,
}

/// The policy-owned, engine-observed handle that identifies a PCB for
/// `restore`.
///
/// This is the only durable reference the policy layer keeps into the
/// engine. It never dereferences engine-internal state directly; the
/// back-reference is a non-owning [`Weak`] handle, invalidated (by clearing
/// `up_to_date`) on every `restore`, so a stale handle simply fails to
/// upgrade instead of dangling. The PCB also tracks which `CpuState` last
/// bound it, so a handle superseded by a later `bind` on the same PCB is
/// rejected even before its own `up_to_date` bit would catch it.
pub struct CpuState<O> {
    inner: Mutex<CpuStateInner<O>>,
}

impl<O> CpuState<O> {
    /// A freshly constructed `CpuState` is not yet bound to any process;
    /// `load_process` binds it.
    pub fn new() -> Self {
        CpuState {
            inner: Mutex::new(CpuStateInner {
                up_to_date: false,
                pcb: None,
            }),
        }
    }

    pub(crate) fn bind(&self, pcb: &std::sync::Arc<Pcb<O>>) {
        let mut inner = self.inner.lock();
        inner.up_to_date = true;
        inner.pcb = Some(std::sync::Arc::downgrade(pcb));
        pcb.set_current_state(self as *const Self as usize);
    }

    /// Returns the target PCB and clears `up_to_date`, or `None` if the
    /// state is stale: not up to date, the PCB it pointed at is gone, or
    /// the PCB has since been rebound to a different `CpuState` (a second
    /// handle superseded this one via `bind`, even if this handle's own
    /// `up_to_date` bit was never cleared).
    pub(crate) fn take_for_restore(&self) -> Option<std::sync::Arc<Pcb<O>>> {
        let mut inner = self.inner.lock();
        if !inner.up_to_date {
            return None;
        }
        let pcb = inner.pcb.as_ref()?.upgrade()?;
        if !pcb.is_current_state(self as *const Self as usize) {
            return None;
        }
        inner.up_to_date = false;
        Some(pcb)
    }

    pub fn is_up_to_date(&self) -> bool {
        self.inner.lock().up_to_date
    }
}

impl<O> Default for CpuState<O> {
    fn default() -> Self {
        Self::new()
    }
}
