use parking_lot::Mutex;

use crate::clock::VirtualTime;
use crate::rendezvous::Rendezvous;

/// Unique process identifier, assigned sequentially starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub(crate) u64);

impl ProcessId {
    #[inline]
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pid{}", self.0)
    }
}

/// The engine's per-process control block.
///
/// Owned by the engine for the process's lifetime (`load_process` through
/// the exit callback). `O` is the policy's opaque handle type, passed back
/// verbatim in every callback.
pub struct Pcb<O> {
    pub(crate) pid: ProcessId,
    pub(crate) opaque: O,
    /// Set while queued in the engine's I/O-wait structure; `None`
    /// otherwise. Guarded independently of the scheduler lock's queue
    /// membership so `Engine::snapshot` can read it without re-deriving
    /// membership.
    pub(crate) io_ready_deadline: Mutex<Option<VirtualTime>>,
    /// Remaining CPU-time budget for the current on-CPU tenure. Zero means
    /// unlimited (cooperative, no preemption).
    pub(crate) slice_remaining: Mutex<VirtualTime>,
    pub(crate) rendezvous: Rendezvous,
    /// Address of the `CpuState` this PCB is currently bound to, set by
    /// every `bind` (i.e. every `load_process`/`save`). `restore` only
    /// succeeds through the `CpuState` holding this address, mirroring the
    /// original engine's `sim_cpustate_p != pcb->cpustate_p` guard: a
    /// handle that was superseded by a later `bind` is rejected even if its
    /// own `up_to_date` bit was never independently cleared.
    pub(crate) current_state: Mutex<usize>,
}

impl<O: Copy> Pcb<O> {
    pub(crate) fn new(pid: ProcessId, opaque: O) -> Self {
        Pcb {
            pid,
            opaque,
            io_ready_deadline: Mutex::new(None),
            slice_remaining: Mutex::new(VirtualTime::ZERO),
            rendezvous: Rendezvous::new(),
            current_state: Mutex::new(0),
        }
    }

    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    pub fn opaque(&self) -> O {
        self.opaque
    }

    /// Records that `state_ptr` (a `CpuState`'s own address) is the
    /// authoritative handle for this PCB, superseding whatever was bound
    /// before.
    pub(crate) fn set_current_state(&self, state_ptr: usize) {
        *self.current_state.lock() = state_ptr;
    }

    /// Whether `state_ptr` is still this PCB's authoritative `CpuState`.
    pub(crate) fn is_current_state(&self, state_ptr: usize) -> bool {
        *self.current_state.lock() == state_ptr
    }
}
