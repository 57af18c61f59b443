use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::callback::Callbacks;
use crate::clock::VirtualTime;
use crate::config::EngineConfig;
use crate::cpu_state::CpuState;
use crate::error::{EngineError, EngineResult};
use crate::events::{decide_next_event, Event};
use crate::pcb::{Pcb, ProcessId};

thread_local! {
    /// Which PCB (if any) the calling OS thread is currently resumed as.
    /// One engine-owned thread-local per OS thread, populated once when a
    /// process's dedicated thread starts and never reassigned thereafter.
    static CURRENT_PCB: RefCell<Option<Arc<dyn Any + Send + Sync>>> = RefCell::new(None);
}

/// The engine's shared, lock-protected state: virtual clock, the two
/// process queues, and live-process bookkeeping.
///
/// `clock`, `n_live`, `active`, and `iowait` are read and mutated
/// together by every operation, so they live behind one mutex rather
/// than four separately-locked fields.
struct SchedState<O> {
    clock: VirtualTime,
    active: VecDeque<Arc<Pcb<O>>>,
    /// Sorted ascending by deadline; ties broken by insertion order.
    iowait: Vec<(VirtualTime, Arc<Pcb<O>>)>,
    n_live: usize,
    ever_loaded: bool,
}

impl<O> SchedState<O> {
    fn new() -> Self {
        SchedState {
            clock: VirtualTime::ZERO,
            active: VecDeque::new(),
            iowait: Vec::new(),
            n_live: 0,
            ever_loaded: false,
        }
    }
}

struct EngineInner<O> {
    state: Mutex<SchedState<O>>,
    all_finished: Condvar,
    callbacks: Callbacks<O>,
    config: EngineConfig,
    next_pid: AtomicU64,
}

/// A debug/introspection snapshot of one live process, returned by
/// [`Engine::snapshot`]. Has no bearing on simulation semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub pid: ProcessId,
    pub in_active: bool,
    pub io_ready_deadline: Option<VirtualTime>,
}

/// The discrete-event scheduler simulation engine.
///
/// Owns the virtual clock, the process queues, and the three policy
/// callbacks. Cheap to clone (an `Arc` handle internally) — every clone
/// refers to the same simulation, so a process can run more than one
/// independent simulation at once, e.g. one per test.
pub struct Engine<O> {
    inner: Arc<EngineInner<O>>,
}

impl<O> Clone for Engine<O> {
    fn clone(&self) -> Self {
        Engine {
            inner: self.inner.clone(),
        }
    }
}

impl<O> Engine<O>
where
    O: Copy + Send + Sync + 'static,
{
    /// Registers the three interrupt callbacks and zeroes the virtual
    /// clock.
    pub fn new(config: EngineConfig, callbacks: Callbacks<O>) -> Self {
        Engine {
            inner: Arc::new(EngineInner {
                state: Mutex::new(SchedState::new()),
                all_finished: Condvar::new(),
                callbacks,
                config,
                next_pid: AtomicU64::new(1),
            }),
        }
    }

    fn current_pcb(&self) -> Option<Arc<Pcb<O>>> {
        CURRENT_PCB.with(|cell| {
            cell.borrow()
                .clone()
                .and_then(|arc| arc.downcast::<Pcb<O>>().ok())
        })
    }

    fn current_pcb_or_fail(&self) -> EngineResult<Arc<Pcb<O>>> {
        match self.current_pcb() {
            Some(pcb) => Ok(pcb),
            None if self.inner.config.strict_context => Err(EngineError::NoCurrentProcess),
            None => panic!(
                "vclock-sim: primitive called outside a resumed process context"
            ),
        }
    }

    /// Allocates a PCB, binds `state` to it, enqueues it in the active
    /// queue, and spawns the detached OS thread that will run `body` once
    /// resumed.
    pub fn load_process<F>(&self, body: F, state: &CpuState<O>, opaque: O) -> EngineResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut st = self.inner.state.lock();
            if let Some(max) = self.inner.config.max_processes {
                if st.n_live >= max {
                    return Err(EngineError::ProcessLimitExceeded);
                }
            }
            st.n_live += 1;
            st.ever_loaded = true;
        }

        let pid = ProcessId(self.inner.next_pid.fetch_add(1, Ordering::Relaxed));
        let pcb = Arc::new(Pcb::new(pid, opaque));
        state.bind(&pcb);

        {
            let mut st = self.inner.state.lock();
            st.active.push_back(pcb.clone());
        }
        log::debug!("load_process: {pid} loaded, parked");

        let engine = self.clone();
        let pcb_for_thread = pcb.clone();
        std::thread::Builder::new()
            .name(pid.to_string())
            .spawn(move || {
                CURRENT_PCB.with(|cell| {
                    *cell.borrow_mut() =
                        Some(pcb_for_thread.clone() as Arc<dyn Any + Send + Sync>);
                });
                pcb_for_thread.rendezvous.park();
                body();
                engine.on_body_return(&pcb_for_thread);
            })
            .expect("vclock-sim: failed to spawn process thread");

        Ok(())
    }

    /// Refreshes `state`'s binding to the calling thread's PCB.
    pub fn save(&self, state: &CpuState<O>) -> EngineResult<()> {
        let pcb = self.current_pcb_or_fail()?;
        state.bind(&pcb);
        Ok(())
    }

    /// Transfers the CPU to `state`'s target PCB: writes `max_burst` into
    /// its slice budget and posts its rendezvous. If the caller is itself
    /// a resumed PCB, parks the caller on its own rendezvous before
    /// returning (so this call only returns once someone restores the
    /// caller again). No-ops silently if `state` is stale.
    pub fn restore(&self, state: &CpuState<O>, max_burst: VirtualTime) {
        let Some(target) = state.take_for_restore() else {
            log::trace!("restore: stale cpu_state, ignoring");
            return;
        };

        *target.slice_remaining.lock() = max_burst;
        log::trace!("restore: handing CPU to {}", target.pid());
        target.rendezvous.post();

        if let Some(caller) = self.current_pcb() {
            caller.rendezvous.park();
        }
    }

    /// Advances the virtual clock by up to `wait` units, firing
    /// `on_io_ready` for each I/O completion due before `wait` elapses and
    /// `on_slice_runout` if the calling process's slice budget is
    /// exhausted first.
    pub fn cpu_burst(&self, wait: VirtualTime) -> EngineResult<()> {
        let pcb = self.current_pcb_or_fail()?;
        let mut remaining = wait;

        while !remaining.is_zero() {
            let (clock, slice, head_deadline) = {
                let st = self.inner.state.lock();
                let slice = *pcb.slice_remaining.lock();
                let head_deadline = st.iowait.first().map(|(d, _)| *d);
                (st.clock, slice, head_deadline)
            };

            match decide_next_event(remaining, slice, clock, head_deadline) {
                Event::IoReady { deadline, consumed } => {
                    remaining = remaining.saturating_sub(consumed);
                    if !slice.is_zero() {
                        *pcb.slice_remaining.lock() = slice.saturating_sub(consumed);
                    }

                    let ready = {
                        let mut st = self.inner.state.lock();
                        st.clock = deadline;
                        let (_, ready) = st.iowait.remove(0);
                        *ready.io_ready_deadline.lock() = None;
                        st.active.push_back(ready.clone());
                        ready
                    };
                    log::trace!("cpu_burst: io ready for {} at {}", ready.pid(), deadline);
                    (self.inner.callbacks.on_io_ready)(ready.opaque());
                }
                Event::SliceRunout { consumed } => {
                    remaining = remaining.saturating_sub(consumed);
                    {
                        let mut st = self.inner.state.lock();
                        st.clock += consumed;
                    }
                    *pcb.slice_remaining.lock() = VirtualTime::ZERO;
                    log::trace!("cpu_burst: slice runout for {}", pcb.pid());
                    (self.inner.callbacks.on_slice_runout)(pcb.opaque());
                }
                Event::Completes => {
                    {
                        let mut st = self.inner.state.lock();
                        st.clock += remaining;
                    }
                    if !slice.is_zero() {
                        let mut s = pcb.slice_remaining.lock();
                        *s = s.saturating_sub(remaining);
                    }
                    remaining = VirtualTime::ZERO;
                }
            }
        }

        Ok(())
    }

    /// Moves the calling process from the active queue to the I/O-wait
    /// structure, sorted by ascending completion deadline (ties broken by
    /// insertion order). Does not park the caller.
    pub fn io_request(&self, wait: VirtualTime) -> EngineResult<()> {
        let pcb = self.current_pcb_or_fail()?;
        let mut st = self.inner.state.lock();

        if let Some(pos) = st.active.iter().position(|p| Arc::ptr_eq(p, &pcb)) {
            st.active.remove(pos);
        }

        let deadline = st.clock + wait;
        *pcb.io_ready_deadline.lock() = Some(deadline);

        let insert_at = st
            .iowait
            .iter()
            .position(|(d, _)| *d > deadline)
            .unwrap_or(st.iowait.len());
        st.iowait.insert(insert_at, (deadline, pcb.clone()));

        log::trace!("io_request: {} sleeping until {}", pcb.pid(), deadline);
        Ok(())
    }

    /// Fast-forwards the clock to the earliest pending I/O completion and
    /// fires `on_io_ready` for it. No-ops if nothing is pending (the
    /// caller is responsible for detecting deadlock in that case).
    pub fn wait_next_interrupt(&self) {
        let ready = {
            let mut st = self.inner.state.lock();
            if st.iowait.is_empty() {
                return;
            }
            let (deadline, ready) = st.iowait.remove(0);
            st.clock = deadline;
            *ready.io_ready_deadline.lock() = None;
            st.active.push_back(ready.clone());
            ready
        };
        log::trace!("wait_next_interrupt: fast-forward to {}", ready.pid());
        (self.inner.callbacks.on_io_ready)(ready.opaque());
    }

    /// Reads the virtual clock.
    pub fn clock(&self) -> VirtualTime {
        self.inner.state.lock().clock
    }

    /// Blocks the calling thread until every loaded process has exited.
    /// Returns immediately if no process has ever been loaded.
    pub fn wait_all_finish(&self) {
        let mut st = self.inner.state.lock();
        while !(st.ever_loaded && st.n_live == 0) {
            self.inner.all_finished.wait(&mut st);
        }
    }

    /// Debug/introspection snapshot of every currently live process.
    pub fn snapshot(&self) -> Vec<ProcessSnapshot> {
        let st = self.inner.state.lock();
        let mut out = Vec::with_capacity(st.active.len() + st.iowait.len());
        for p in st.active.iter() {
            out.push(ProcessSnapshot {
                pid: p.pid(),
                in_active: true,
                io_ready_deadline: None,
            });
        }
        for (deadline, p) in st.iowait.iter() {
            out.push(ProcessSnapshot {
                pid: p.pid(),
                in_active: false,
                io_ready_deadline: Some(*deadline),
            });
        }
        out
    }

    fn on_body_return(&self, pcb: &Arc<Pcb<O>>) {
        {
            let mut st = self.inner.state.lock();
            if let Some(pos) = st.active.iter().position(|p| Arc::ptr_eq(p, pcb)) {
                st.active.remove(pos);
            }
            // A process can io_request and exit without ever waiting on
            // the completion; its iowait entry must not outlive it, or a
            // later io-ready fires for an opaque already torn down.
            if let Some(pos) = st.iowait.iter().position(|(_, p)| Arc::ptr_eq(p, pcb)) {
                st.iowait.remove(pos);
            }
            st.n_live -= 1;
            if st.n_live == 0 {
                self.inner.all_finished.notify_all();
            }
        }
        log::debug!("process {} exited", pcb.pid());
        (self.inner.callbacks.on_exit)(pcb.opaque());
    }
}
