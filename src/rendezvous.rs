use parking_lot::{Condvar, Mutex};

/// A binary park/unpark primitive, one per [`crate::Pcb`].
///
/// Each simulated process owns its own OS thread and stack, so handing it
/// the virtual CPU is just posting to its rendezvous and parking the
/// previous holder on its own — a counting semaphore used strictly as a
/// 0/1 gate.
pub struct Rendezvous {
    state: Mutex<bool>,
    condvar: Condvar,
}

impl Rendezvous {
    /// A fresh rendezvous starts parked (not permitted to run).
    pub fn new() -> Self {
        Rendezvous {
            state: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Grant permission to run and wake the owner if it is parked.
    pub fn post(&self) {
        let mut permitted = self.state.lock();
        *permitted = true;
        self.condvar.notify_one();
    }

    /// Block the calling thread until this rendezvous has been posted,
    /// then consume the post (reset to parked) so the next `park` blocks
    /// again.
    pub fn park(&self) {
        let mut permitted = self.state.lock();
        while !*permitted {
            self.condvar.wait(&mut permitted);
        }
        *permitted = false;
    }
}

impl Default for Rendezvous {
    fn default() -> Self {
        Self::new()
    }
}
