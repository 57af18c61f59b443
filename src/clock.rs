use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// A point (or duration) on the simulator's virtual clock.
///
/// Monotonic, non-negative, and advanced only by the engine — never by a
/// process body or the policy layer directly. Reused as both an absolute
/// timestamp (`Engine::clock`, `io_ready_deadline`) and a relative duration
/// (`cpu_burst`'s `wait`, `io_request`'s `wait`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct VirtualTime(u64);

impl VirtualTime {
    /// The initial value of every fresh virtual clock.
    pub const ZERO: VirtualTime = VirtualTime(0);

    #[inline]
    pub const fn from_raw(value: u64) -> Self {
        VirtualTime(value)
    }

    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Saturating subtraction; the engine never needs values below zero
    /// but arithmetic on `wait`/`slice_remaining` can otherwise underflow
    /// on an off-by-one in a policy's bookkeeping.
    #[inline]
    pub const fn saturating_sub(self, rhs: VirtualTime) -> VirtualTime {
        VirtualTime(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for VirtualTime {
    type Output = VirtualTime;
    fn add(self, rhs: VirtualTime) -> VirtualTime {
        VirtualTime(self.0 + rhs.0)
    }
}

impl AddAssign for VirtualTime {
    fn add_assign(&mut self, rhs: VirtualTime) {
        self.0 += rhs.0;
    }
}

impl Sub for VirtualTime {
    type Output = VirtualTime;
    fn sub(self, rhs: VirtualTime) -> VirtualTime {
        VirtualTime(self.0 - rhs.0)
    }
}

impl SubAssign for VirtualTime {
    fn sub_assign(&mut self, rhs: VirtualTime) {
        self.0 -= rhs.0;
    }
}

impl From<u64> for VirtualTime {
    fn from(value: u64) -> Self {
        VirtualTime(value)
    }
}
