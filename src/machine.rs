//! This module defines the `Machine` struct: a single-tape Turing Machine that executes on
//! its own background worker thread.
//!
//! The mutable configuration (tape, cursor, state, halt reason, step count) lives behind one
//! mutex per machine. The run controller is a separate pair of flags (`running`, `quitting`)
//! guarded by its own mutex and paired with a condition variable the worker sleeps on. The
//! worker only ever takes the flags lock and then the configuration lock, never the other way
//! around, and it never holds the configuration lock while sleeping.

use crate::table::TransitionSource;
use crate::types::{Direction, Halt, MachineError, Snapshot, Step};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, trace};

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// Tape, cursor and state of a machine. Always read and written as a unit.
#[derive(Debug, Clone)]
struct Config<S, T> {
    tape: Vec<T>,
    cursor: usize,
    state: S,
    halt: Option<Halt>,
    steps: u64,
    /// Set when the worker died from a panic in `lookup`.
    failed: bool,
}

#[derive(Debug, Default, Clone, Copy)]
struct Flags {
    running: bool,
    quitting: bool,
}

/// State shared between a `Machine` handle and its worker.
struct Shared<S, T> {
    id: usize,
    config: Mutex<Config<S, T>>,
    /// Signalled whenever the machine halts and when the worker fails.
    halted: Condvar,
    flags: Mutex<Flags>,
    /// Signalled on every control change; the worker waits on it.
    wake: Condvar,
    transitions: Arc<dyn TransitionSource<S, T>>,
}

// A panic can only escape from `lookup`, which runs before any field is written,
// so a poisoned lock still guards a consistent configuration.
fn relock<G>(result: Result<G, PoisonError<G>>) -> G {
    result.unwrap_or_else(PoisonError::into_inner)
}

impl<S, T> Shared<S, T>
where
    S: Clone,
    T: Clone,
{
    fn config(&self) -> MutexGuard<'_, Config<S, T>> {
        relock(self.config.lock())
    }

    fn flags(&self) -> MutexGuard<'_, Flags> {
        relock(self.flags.lock())
    }

    fn step(&self) -> Step {
        let mut config = self.config();
        if let Some(halt) = config.halt {
            return Step::Halt(halt);
        }

        let symbol = config.tape[config.cursor].clone();
        let Some(transition) = self.transitions.lookup(&config.state, &symbol) else {
            return self.halt(&mut config, Halt::Undefined);
        };

        let cursor = config.cursor;
        config.state = transition.next_state;
        config.tape[cursor] = transition.write;
        config.steps += 1;

        match transition.direction {
            Direction::Left if cursor == 0 => self.halt(&mut config, Halt::Boundary),
            Direction::Right if cursor + 1 == config.tape.len() => {
                self.halt(&mut config, Halt::Boundary)
            }
            Direction::Left => {
                config.cursor -= 1;
                Step::Continue
            }
            Direction::Right => {
                config.cursor += 1;
                Step::Continue
            }
        }
    }

    fn halt(&self, config: &mut Config<S, T>, halt: Halt) -> Step {
        config.halt = Some(halt);
        debug!(machine = self.id, steps = config.steps, ?halt, "machine halted");
        self.halted.notify_all();
        Step::Halt(halt)
    }

    fn is_halted(&self) -> bool {
        self.config().halt.is_some()
    }
}

/// Marks the machine failed if the worker unwinds, so waiters and the run flag
/// stop reporting a live worker.
struct WorkerGuard<'a, S: Clone, T: Clone> {
    shared: &'a Shared<S, T>,
}

impl<S, T> Drop for WorkerGuard<'_, S, T>
where
    S: Clone,
    T: Clone,
{
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }

        error!(machine = self.shared.id, "machine worker panicked");
        self.shared.flags().running = false;
        self.shared.config().failed = true;
        self.shared.halted.notify_all();
    }
}

/// The worker loop: sleep until running (and not halted) or quitting, then step.
fn work<S, T>(shared: &Shared<S, T>)
where
    S: Clone,
    T: Clone,
{
    trace!(machine = shared.id, "worker started");
    let _guard = WorkerGuard { shared };
    loop {
        {
            let mut flags = shared.flags();
            loop {
                if flags.quitting {
                    trace!(machine = shared.id, "worker exiting");
                    return;
                }
                if flags.running && !shared.is_halted() {
                    break;
                }
                flags = relock(shared.wake.wait(flags));
            }
        }

        shared.step();
    }
}

/// A single-tape Turing Machine with its own execution worker.
///
/// The machine starts stopped. `set_running(true)` lets the worker step it as fast as
/// the scheduler allows until it halts or is paused again. Every accessor takes the
/// machine's lock, so each call observes the state as of a completed step.
///
/// Dropping the machine stops and joins the worker.
pub struct Machine<S = String, T = char>
where
    S: Clone + Send + 'static,
    T: Clone + Send + 'static,
{
    shared: Arc<Shared<S, T>>,
    worker: Option<JoinHandle<()>>,
}

impl<S, T> Machine<S, T>
where
    S: Clone + Send + 'static,
    T: Clone + Send + 'static,
{
    /// Creates a new machine and starts its (paused) worker.
    ///
    /// # Arguments
    ///
    /// * `tape` - The initial tape. Its length is fixed for the machine's lifetime.
    /// * `cursor` - The initial head position, which must lie on the tape.
    /// * `state` - The initial state.
    /// * `transitions` - The rules the machine follows.
    ///
    /// # Returns
    ///
    /// * `Ok(Machine)` with a stopped worker.
    /// * `Err(MachineError)` if the tape is empty, the cursor is off the tape, or the
    ///   worker thread cannot be spawned.
    pub fn new<R>(
        tape: Vec<T>,
        cursor: usize,
        state: S,
        transitions: R,
    ) -> Result<Self, MachineError>
    where
        R: TransitionSource<S, T> + 'static,
    {
        Self::with_source(tape, cursor, state, Arc::new(transitions))
    }

    /// Creates a new machine that shares an existing transition source.
    pub fn with_source(
        tape: Vec<T>,
        cursor: usize,
        state: S,
        transitions: Arc<dyn TransitionSource<S, T>>,
    ) -> Result<Self, MachineError> {
        if tape.is_empty() {
            return Err(MachineError::EmptyTape);
        }
        if cursor >= tape.len() {
            return Err(MachineError::CursorOutOfBounds {
                cursor,
                len: tape.len(),
            });
        }

        let config = Config {
            tape,
            cursor,
            state,
            halt: None,
            steps: 0,
            failed: false,
        };

        Self::spawn(config, Flags::default(), transitions)
    }

    fn spawn(
        config: Config<S, T>,
        flags: Flags,
        transitions: Arc<dyn TransitionSource<S, T>>,
    ) -> Result<Self, MachineError> {
        let shared = Arc::new(Shared {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            config: Mutex::new(config),
            halted: Condvar::new(),
            flags: Mutex::new(flags),
            wake: Condvar::new(),
            transitions,
        });

        let worker = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(format!("machine-{}", shared.id))
                .spawn(move || work(&shared))?
        };

        debug!(machine = shared.id, "machine created");

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Creates an independent copy of this machine.
    ///
    /// The copy starts from this machine's current tape, cursor, state, step count and
    /// running flag, shares the same transition source, and gets its own worker.
    pub fn try_clone(&self) -> Result<Self, MachineError> {
        let config = Config {
            failed: false,
            ..self.shared.config().clone()
        };
        let flags = Flags {
            running: self.running(),
            quitting: false,
        };

        Self::spawn(config, flags, Arc::clone(&self.shared.transitions))
    }

    /// Executes a single step from the calling thread.
    ///
    /// # Returns
    ///
    /// * `Step::Continue` if a transition was applied and the machine can keep going.
    /// * `Step::Halt(_)` if the machine halted during this step or was already halted.
    ///   Stepping a halted machine changes nothing.
    pub fn step(&self) -> Step {
        self.shared.step()
    }

    /// Starts (`true`) or pauses (`false`) the background worker.
    ///
    /// The worker is woken before this returns, but may not have acted yet. Setting the
    /// flag on a halted machine is recorded and has no other effect.
    pub fn set_running(&self, running: bool) {
        let mut flags = self.shared.flags();
        flags.running = running;
        self.shared.wake.notify_all();
        debug!(machine = self.shared.id, running, "run flag changed");
    }

    /// Blocks until the machine halts, its worker fails, or the timeout expires.
    ///
    /// Returns `true` if the machine is halted. With `None` the call waits indefinitely
    /// for a running machine; a failed worker ends the wait with `false`.
    pub fn wait_halted(&self, timeout: Option<Duration>) -> bool {
        let config = self.shared.config();
        let pending = |c: &mut Config<S, T>| c.halt.is_none() && !c.failed;

        let config = match timeout {
            None => relock(self.shared.halted.wait_while(config, pending)),
            Some(timeout) => {
                relock(self.shared.halted.wait_timeout_while(config, timeout, pending)).0
            }
        };

        if config.halt.is_none() && config.failed {
            error!(machine = self.shared.id, "stopped waiting: machine worker failed");
        }
        config.halt.is_some()
    }

    /// Returns `true` if the worker died from a panicking transition lookup.
    ///
    /// The worker of a failed machine is gone; dropping the machine re-raises the panic.
    pub fn failed(&self) -> bool {
        self.shared.config().failed
    }

    /// A process-unique identifier, also used in the worker thread's name.
    pub fn id(&self) -> usize {
        self.shared.id
    }

    pub fn halted(&self) -> bool {
        self.shared.is_halted()
    }

    /// Returns why the machine halted, or `None` if it has not.
    pub fn halt(&self) -> Option<Halt> {
        self.shared.config().halt
    }

    pub fn cursor(&self) -> usize {
        self.shared.config().cursor
    }

    pub fn state(&self) -> S {
        self.shared.config().state.clone()
    }

    pub fn tape(&self) -> Vec<T> {
        self.shared.config().tape.clone()
    }

    /// Number of transitions applied so far.
    pub fn steps(&self) -> u64 {
        self.shared.config().steps
    }

    pub fn running(&self) -> bool {
        self.shared.flags().running
    }

    /// Returns tape, cursor, state, halt reason and step count from a single lock acquisition.
    pub fn snapshot(&self) -> Snapshot<S, T> {
        let config = self.shared.config();
        Snapshot {
            tape: config.tape.clone(),
            cursor: config.cursor,
            state: config.state.clone(),
            halt: config.halt,
            steps: config.steps,
        }
    }
}

impl<S, T> Drop for Machine<S, T>
where
    S: Clone + Send + 'static,
    T: Clone + Send + 'static,
{
    fn drop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        self.shared.flags().quitting = true;
        self.shared.wake.notify_all();

        if worker.join().is_err() {
            error!(machine = self.shared.id, "machine worker panicked");
            if !thread::panicking() {
                panic!("worker of machine {} panicked", self.shared.id);
            }
        }
        debug!(machine = self.shared.id, "machine destroyed");
    }
}

impl<S, T> fmt::Debug for Machine<S, T>
where
    S: Clone + Send + fmt::Debug + 'static,
    T: Clone + Send + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.shared.config().clone();
        let flags = *self.shared.flags();
        f.debug_struct("Machine")
            .field("id", &self.shared.id)
            .field("config", &config)
            .field("flags", &flags)
            .finish()
    }
}
