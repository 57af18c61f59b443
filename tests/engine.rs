//! End-to-end scenarios driving [`vclock_sim::Engine`] through a minimal
//! round-robin/FCFS test policy. These exercise the engine the way a real
//! policy would: processes call `cpu_burst`/`io_request`/`save` on
//! themselves, and the three callbacks pick what runs next.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use vclock_sim::{Callbacks, CpuState, Engine, EngineConfig, VirtualTime};

/// Opaque handle the engine passes back to callbacks: an index into
/// `Scheduler::states`.
type Proc = usize;

#[derive(Clone)]
struct Scheduler {
    engine: Engine<Proc>,
    states: Vec<Arc<CpuState<Proc>>>,
    ready: Arc<Mutex<VecDeque<Proc>>>,
    log: Arc<Mutex<Vec<String>>>,
    slice: VirtualTime,
}

impl Scheduler {
    fn new(nprocs: usize, slice: VirtualTime) -> Self {
        let states: Vec<Arc<CpuState<Proc>>> =
            (0..nprocs).map(|_| Arc::new(CpuState::new())).collect();
        let ready = Arc::new(Mutex::new(VecDeque::new()));
        let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        // Two-phase init: the exit callback needs to hand the CPU to
        // whatever runs next, which means calling back into the engine
        // it's registered on. Filled in once the engine itself exists.
        let engine_cell: Arc<Mutex<Option<Engine<Proc>>>> = Arc::new(Mutex::new(None));

        let cb_ready = ready.clone();
        let cb_log = log.clone();
        let on_io_ready = move |p: Proc| {
            cb_log.lock().unwrap().push(format!("io_ready {p}"));
            cb_ready.lock().unwrap().push_back(p);
        };

        let cb_log = log.clone();
        let on_slice_runout = move |p: Proc| {
            cb_log.lock().unwrap().push(format!("slice_runout {p}"));
        };

        let cb_log = log.clone();
        let cb_ready = ready.clone();
        let cb_states = states.clone();
        let cb_engine_cell = engine_cell.clone();
        let on_exit = move |p: Proc| {
            cb_log.lock().unwrap().push(format!("exit {p}"));
            if let Some(next) = cb_ready.lock().unwrap().pop_front() {
                if let Some(engine) = cb_engine_cell.lock().unwrap().as_ref() {
                    engine.restore(&cb_states[next], slice);
                }
            }
        };

        let engine = Engine::new(
            EngineConfig::default(),
            Callbacks::new(on_io_ready, on_slice_runout, on_exit),
        );
        *engine_cell.lock().unwrap() = Some(engine.clone());

        Scheduler {
            engine,
            states,
            ready,
            log,
            slice,
        }
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[test]
fn pure_cpu_bursts_serialize_on_one_virtual_cpu() {
    let sched = Scheduler::new(2, VirtualTime::ZERO);

    sched
        .engine
        .load_process(
            {
                let sched = sched.clone();
                move || {
                    sched.engine.cpu_burst(VirtualTime::from_raw(100)).unwrap();
                    sched
                        .log
                        .lock()
                        .unwrap()
                        .push(format!("p0 done @{}", sched.engine.clock()));
                }
            },
            &sched.states[0],
            0,
        )
        .unwrap();

    sched
        .engine
        .load_process(
            {
                let sched = sched.clone();
                move || {
                    sched.engine.cpu_burst(VirtualTime::from_raw(50)).unwrap();
                    sched
                        .log
                        .lock()
                        .unwrap()
                        .push(format!("p1 done @{}", sched.engine.clock()));
                }
            },
            &sched.states[1],
            1,
        )
        .unwrap();
    sched.ready.lock().unwrap().push_back(1);

    sched.engine.restore(&sched.states[0], sched.slice);
    sched.engine.wait_all_finish();

    assert_eq!(sched.engine.clock(), VirtualTime::from_raw(150));
    let log: Vec<String> = sched
        .log()
        .into_iter()
        .filter(|l| l.contains("done"))
        .collect();
    assert_eq!(log, vec!["p0 done @100", "p1 done @150"]);
}

#[test]
fn io_ready_fires_synchronously_inside_cpu_burst_without_blocking_caller() {
    let sched = Scheduler::new(1, VirtualTime::ZERO);

    sched
        .engine
        .load_process(
            {
                let sched = sched.clone();
                move || {
                    // Stays the running process: io_request never yields
                    // the caller by itself.
                    sched.engine.io_request(VirtualTime::from_raw(30)).unwrap();
                    sched.engine.cpu_burst(VirtualTime::from_raw(50)).unwrap();
                }
            },
            &sched.states[0],
            0,
        )
        .unwrap();

    sched.engine.restore(&sched.states[0], sched.slice);
    sched.engine.wait_all_finish();

    // The burst ran to completion (50 units) even though its own pending
    // I/O fired midway through at t=30.
    assert_eq!(sched.engine.clock(), VirtualTime::from_raw(50));
    assert_eq!(sched.log(), vec!["io_ready 0", "exit 0"]);
}

#[test]
fn slice_runout_fires_once_and_leaves_remaining_burst_unlimited() {
    let sched = Scheduler::new(1, VirtualTime::from_raw(10));

    sched
        .engine
        .load_process(
            {
                let sched = sched.clone();
                move || {
                    sched.engine.cpu_burst(VirtualTime::from_raw(15)).unwrap();
                }
            },
            &sched.states[0],
            0,
        )
        .unwrap();

    sched.engine.restore(&sched.states[0], sched.slice);
    sched.engine.wait_all_finish();

    // 10 units consumed before runout, then 5 more before the burst
    // request (15) is satisfied.
    assert_eq!(sched.engine.clock(), VirtualTime::from_raw(15));
    assert_eq!(sched.log(), vec!["slice_runout 0", "exit 0"]);
}

#[test]
fn wait_next_interrupt_fast_forwards_instead_of_spinning() {
    let sched = Scheduler::new(1, VirtualTime::ZERO);

    sched
        .engine
        .load_process(
            {
                let sched = sched.clone();
                move || {
                    sched.engine.cpu_burst(VirtualTime::from_raw(5)).unwrap();
                    sched.engine.io_request(VirtualTime::from_raw(35)).unwrap();
                    sched.engine.save(&sched.states[0]).unwrap();
                }
            },
            &sched.states[0],
            0,
        )
        .unwrap();

    sched.engine.restore(&sched.states[0], sched.slice);
    sched.engine.wait_all_finish();

    assert_eq!(sched.engine.clock(), VirtualTime::from_raw(5));
    assert_eq!(sched.log(), vec!["exit 0"]);

    // Nothing is runnable; the driver fast-forwards straight to the
    // pending completion instead of polling.
    sched.engine.wait_next_interrupt();
    assert_eq!(sched.engine.clock(), VirtualTime::from_raw(40));
    assert_eq!(sched.log(), vec!["exit 0", "io_ready 0"]);
}

#[test]
fn io_completions_are_delivered_in_deadline_order_not_request_order() {
    let sched = Scheduler::new(2, VirtualTime::ZERO);

    // p0 requests a long wait, then exits (the exit callback hands the CPU
    // to p1, which requests a shorter wait and exits too). Both I/O
    // completions are now pending with nobody runnable. Despite p0 asking
    // first, p1's completion must fire first because its deadline is
    // earlier.
    sched
        .engine
        .load_process(
            {
                let sched = sched.clone();
                move || {
                    sched.engine.io_request(VirtualTime::from_raw(30)).unwrap();
                }
            },
            &sched.states[0],
            0,
        )
        .unwrap();

    sched
        .engine
        .load_process(
            {
                let sched = sched.clone();
                move || {
                    sched.engine.io_request(VirtualTime::from_raw(10)).unwrap();
                }
            },
            &sched.states[1],
            1,
        )
        .unwrap();
    sched.ready.lock().unwrap().push_back(1);

    sched.engine.restore(&sched.states[0], sched.slice);
    sched.engine.wait_all_finish();

    sched.engine.wait_next_interrupt();
    assert_eq!(sched.engine.clock(), VirtualTime::from_raw(10));
    sched.engine.wait_next_interrupt();
    assert_eq!(sched.engine.clock(), VirtualTime::from_raw(30));

    let io_events: Vec<String> = sched
        .log()
        .into_iter()
        .filter(|l| l.starts_with("io_ready"))
        .collect();
    assert_eq!(io_events, vec!["io_ready 1", "io_ready 0"]);
}

#[test]
fn simultaneous_io_completions_preserve_fifo_insertion_order() {
    let sched = Scheduler::new(2, VirtualTime::ZERO);

    // Both processes request an identical wait starting from the same
    // virtual clock value (0), so their deadlines tie exactly at 20. p0 is
    // loaded and inserted into the I/O-wait structure first.
    sched
        .engine
        .load_process(
            {
                let sched = sched.clone();
                move || {
                    sched.engine.io_request(VirtualTime::from_raw(20)).unwrap();
                }
            },
            &sched.states[0],
            0,
        )
        .unwrap();

    sched
        .engine
        .load_process(
            {
                let sched = sched.clone();
                move || {
                    sched.engine.io_request(VirtualTime::from_raw(20)).unwrap();
                }
            },
            &sched.states[1],
            1,
        )
        .unwrap();
    sched.ready.lock().unwrap().push_back(1);

    sched.engine.restore(&sched.states[0], sched.slice);
    sched.engine.wait_all_finish();

    sched.engine.wait_next_interrupt();

    assert_eq!(sched.engine.clock(), VirtualTime::from_raw(20));
    let io_events: Vec<String> = sched
        .log()
        .into_iter()
        .filter(|l| l.starts_with("io_ready"))
        .collect();
    assert_eq!(io_events, vec!["io_ready 0"]);
}
