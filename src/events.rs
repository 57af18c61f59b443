use crate::clock::VirtualTime;

/// The outcome of one iteration of the `cpu_burst` decision loop.
///
/// Factored out of [`crate::Engine::cpu_burst`] as a pure function so the
/// three-way branch carrying the bulk of the decision logic can be unit-
/// and property-tested without threads, locks, or callbacks. `cpu_burst`
/// itself is just a loop around this function that performs the
/// corresponding state mutation and callback dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The head of the I/O-wait queue completes before the requested burst
    /// (or the remaining slice, whichever binds first). `consumed` is how
    /// much of `wait` (and, if slice-limited, of `slice_remaining`) is used
    /// up advancing the clock to `deadline`.
    IoReady {
        deadline: VirtualTime,
        consumed: VirtualTime,
    },
    /// The current process's slice is exhausted strictly before the
    /// requested burst completes. `consumed` equals the slice that was
    /// remaining.
    SliceRunout { consumed: VirtualTime },
    /// Nothing preempts; the full remaining `wait` elapses and the burst
    /// is done.
    Completes,
}

/// Decide what happens next in a `cpu_burst(wait)` loop iteration.
///
/// `slice_remaining == VirtualTime::ZERO` means unlimited (no preemption
/// possible from branch 2). `next_iowait_deadline` is the head of the
/// engine's I/O-wait queue, if any.
///
/// The I/O-ready comparison is strict `<`: a deadline landing exactly on
/// `clock + budget` does *not* fire this iteration. Deliberate, not a bug:
/// it keeps a simultaneous slice-runout and I/O-ready from collapsing into
/// a single ambiguous event.
pub fn decide_next_event(
    wait: VirtualTime,
    slice_remaining: VirtualTime,
    clock: VirtualTime,
    next_iowait_deadline: Option<VirtualTime>,
) -> Event {
    if let Some(deadline) = next_iowait_deadline {
        let budget = if slice_remaining.is_zero() || wait < slice_remaining {
            wait
        } else {
            slice_remaining
        };
        if deadline < clock + budget {
            return Event::IoReady {
                deadline,
                consumed: deadline.saturating_sub(clock),
            };
        }
    }

    if !slice_remaining.is_zero() && wait > slice_remaining {
        return Event::SliceRunout {
            consumed: slice_remaining,
        };
    }

    Event::Completes
}
