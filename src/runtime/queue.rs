//! Command submission
//!
//! [`Queue::submit`] builds one command through a [`Handler`] and returns an [`Event`]
//! immediately. Each queue owns one dispatcher thread that takes commands in submission
//! order and runs each one once every dependency event has completed:
//!
//! ```text
//! submit(kernel, |h| { h.depends_on(..); acc = range.access(h, mode)?; h.parallel_for(n, body) })
//!     │
//!     ├─ dependencies: explicit (depends_on) + derived from managed memory access modes
//!     ▼
//! dispatcher thread: wait deps ──► run command on the device's compute units ──► complete event
//! ```
//!
//! Managed memory carries a [`DependencyTracker`]: requesting an accessor with a read
//! mode orders the command after the last writer (read-after-write); a write mode orders
//! it after the last writer and every reader since (write-after-write, write-after-read).
//! Raw device allocations have no tracker; the caller orders those commands.

use super::cpu::CpuDevice;
use super::event::{Event, EventStatus};
use super::kernel::{Group, LocalAccessor};
use super::Device;
use crate::error::{Error, Result};
use crate::range::Access;
use parking_lot::Mutex;
use rayon::prelude::*;
use smallvec::SmallVec;
use std::any::{Any, TypeId};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, mpsc};
use std::thread;
use tracing::{debug, trace};

pub(crate) type EventList = SmallVec<[Event; 4]>;

// Flat kernels hand out at least this many consecutive indices per task
const FLAT_MIN_LEN: usize = 64;

// ============================================================================
// Dependency tracking
// ============================================================================

#[derive(Debug, Default)]
struct TrackerState {
    last_write: Option<Event>,
    reads: Vec<Event>,
}

/// Access history of one managed allocation
#[derive(Debug, Default)]
pub(crate) struct DependencyTracker {
    state: Mutex<TrackerState>,
}

impl DependencyTracker {
    /// Register `event` as accessing the allocation with `access`, returning the events it
    /// must wait for
    pub(crate) fn record(&self, event: &Event, access: Access) -> EventList {
        let mut state = self.state.lock();
        let mut deps = EventList::new();
        if let Some(writer) = &state.last_write {
            deps.push(writer.clone());
        }
        if access.writes() {
            deps.extend(state.reads.drain(..));
            state.last_write = Some(event.clone());
        } else {
            state.reads.retain(|e| !e.is_complete());
            state.reads.push(event.clone());
        }
        deps
    }

    /// Wait for the last writer, before reading on the host
    pub(crate) fn wait_writes(&self) -> Result<()> {
        let writer = self.state.lock().last_write.clone();
        match writer {
            Some(event) => event.wait(),
            None => Ok(()),
        }
    }

    /// Wait for every access, before writing on the host
    pub(crate) fn wait_all(&self) -> Result<()> {
        let events: EventList = {
            let state = self.state.lock();
            state
                .last_write
                .iter()
                .chain(state.reads.iter())
                .cloned()
                .collect()
        };
        Event::wait_all(&events)
    }
}

// ============================================================================
// Commands
// ============================================================================

type FlatBody = Box<dyn Fn(usize) + Send + Sync>;
type GroupBody = Box<dyn Fn(&Group) + Send + Sync>;
type HostBody = Box<dyn FnOnce() + Send>;

enum Command {
    Flat { count: usize, body: FlatBody },
    Grouped {
        groups: usize,
        group_size: usize,
        body: GroupBody,
    },
    Host(HostBody),
}

impl Command {
    fn run(self, pool: &rayon::ThreadPool) {
        match self {
            Self::Flat { count, body } => pool.install(|| {
                (0..count)
                    .into_par_iter()
                    .with_min_len(FLAT_MIN_LEN)
                    .for_each(|i| body(i))
            }),
            Self::Grouped {
                groups,
                group_size,
                body,
            } => pool.install(|| {
                (0..groups)
                    .into_par_iter()
                    .for_each(|g| body(&Group::new(g, groups, group_size)))
            }),
            Self::Host(body) => body(),
        }
    }
}

/// A built command waiting on the dispatcher
struct Job {
    event: Event,
    deps: EventList,
    command: Option<Command>,
}

impl Job {
    fn run(self, pool: &rayon::ThreadPool) {
        let Self { event, deps, command } = self;
        for dep in &deps {
            if let Err(err) = dep.wait() {
                event.complete(Err(Error::DependencyFailed {
                    kernel: event.label().to_string(),
                    reason: err.to_string(),
                }));
                return;
            }
        }
        let result = match command {
            None => Ok(()),
            Some(command) => panic::catch_unwind(AssertUnwindSafe(|| command.run(pool)))
                .map_err(|payload| Error::kernel(event.label(), panic_message(&*payload))),
        };
        if let Err(err) = &result {
            debug!(kernel = event.label(), error = %err, "kernel failed");
        }
        event.complete(result);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "kernel panicked".to_string()
    }
}

// ============================================================================
// Handler
// ============================================================================

/// Command group builder passed to [`Queue::submit`]
///
/// Collects dependencies and local memory declarations, then receives exactly one
/// command: [`parallel_for`](Self::parallel_for),
/// [`parallel_for_work_group`](Self::parallel_for_work_group) or
/// [`host_task`](Self::host_task).
pub struct Handler {
    queue: Queue,
    kernel: Arc<str>,
    explicit: bool,
    event: Event,
    deps: EventList,
    command: Option<Command>,
    local_bytes: usize,
}

impl Handler {
    /// Kernel id of the command being built
    pub fn kernel(&self) -> &str {
        &self.kernel
    }

    /// Queue the command is submitted to
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Run the command only after `event` completes
    pub fn depends_on(&mut self, event: &Event) {
        if event.is_same(&self.event) || self.deps.iter().any(|d| d.is_same(event)) {
            return;
        }
        self.deps.push(event.clone());
    }

    pub(crate) fn track(&mut self, tracker: &DependencyTracker, access: Access) {
        for dep in tracker.record(&self.event, access) {
            self.depends_on(&dep);
        }
    }

    /// Declare `len` elements of per-group local memory
    ///
    /// Fails with [`Error::LocalMemoryExceeded`] once the declarations of this command
    /// exceed the device's local memory.
    pub fn local_accessor<T>(&mut self, len: usize) -> Result<LocalAccessor<T>> {
        let available = self.queue.device().local_mem_size();
        let requested = self.local_bytes + len * std::mem::size_of::<T>();
        if requested > available {
            return Err(Error::LocalMemoryExceeded {
                requested,
                available,
            });
        }
        self.local_bytes = requested;
        Ok(LocalAccessor::new(len))
    }

    /// Launch `count` independent workers, each running `body(index)`
    pub fn parallel_for<F>(&mut self, count: usize, body: F) -> Result<()>
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.register::<F>();
        debug!(kernel = %self.kernel, workers = count, "submit flat kernel");
        self.set_command(Command::Flat {
            count,
            body: Box::new(body),
        })
    }

    /// Launch `groups` work-groups of `group_size` workers each
    pub fn parallel_for_work_group<F>(&mut self, groups: usize, group_size: usize, body: F) -> Result<()>
    where
        F: Fn(&Group) + Send + Sync + 'static,
    {
        let max = self.queue.device().max_work_group_size();
        if group_size == 0 || group_size > max {
            return Err(Error::invalid_argument(
                "group_size",
                format!("{group_size} is outside 1..={max}"),
            ));
        }
        self.register::<F>();
        debug!(
            kernel = %self.kernel,
            groups,
            group_size,
            local_bytes = self.local_bytes,
            "submit grouped kernel"
        );
        self.set_command(Command::Grouped {
            groups,
            group_size,
            body: Box::new(body),
        })
    }

    /// Run `f` once on the queue's dispatcher thread, ordered like any other command
    pub fn host_task<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        trace!(kernel = %self.kernel, "submit host task");
        self.set_command(Command::Host(Box::new(f)))
    }

    fn register<F: 'static>(&self) {
        self.queue
            .device()
            .kernels()
            .register(&self.kernel, TypeId::of::<F>(), self.explicit);
    }

    fn set_command(&mut self, command: Command) -> Result<()> {
        if self.command.is_some() {
            return Err(Error::Internal(format!(
                "kernel '{}' received more than one command",
                self.kernel
            )));
        }
        self.command = Some(command);
        Ok(())
    }
}

// ============================================================================
// Queue
// ============================================================================

struct QueueInner {
    device: CpuDevice,
    outstanding: Mutex<Vec<Event>>,
    jobs: mpsc::Sender<Job>,
}

/// In-order submission endpoint of one device
///
/// Cheap to clone; clones submit to the same device and share `wait`.
#[derive(Clone)]
pub struct Queue {
    inner: Arc<QueueInner>,
}

impl Queue {
    /// Create a queue on `device`, starting its dispatcher thread
    ///
    /// The dispatcher exits once every clone of the queue is dropped and the commands
    /// already submitted have run.
    pub fn new(device: CpuDevice) -> Result<Self> {
        let (jobs, inbox) = mpsc::channel::<Job>();
        let pool = device.pool().clone();
        thread::Builder::new()
            .name(format!("devpar-{}-dispatch", device.name()))
            .spawn(move || {
                for job in inbox {
                    job.run(&pool);
                }
            })
            .map_err(|e| Error::Backend(format!("failed to spawn dispatcher thread: {e}")))?;
        Ok(Self {
            inner: Arc::new(QueueInner {
                device,
                outstanding: Mutex::new(Vec::new()),
                jobs,
            }),
        })
    }

    /// Device this queue submits to
    pub fn device(&self) -> &CpuDevice {
        &self.inner.device
    }

    /// Submit one command named `kernel`
    ///
    /// `build` declares dependencies and accessors, then sets the command. The returned
    /// event completes when the command has run. If `build` fails, nothing runs and the
    /// error is returned.
    pub fn submit<F>(&self, kernel: &str, build: F) -> Result<Event>
    where
        F: FnOnce(&mut Handler) -> Result<()>,
    {
        self.submit_kernel(Arc::from(kernel), true, build)
    }

    pub(crate) fn submit_kernel<F>(&self, kernel: Arc<str>, explicit: bool, build: F) -> Result<Event>
    where
        F: FnOnce(&mut Handler) -> Result<()>,
    {
        let event = Event::pending(kernel.clone());
        let mut handler = Handler {
            queue: self.clone(),
            kernel,
            explicit,
            event: event.clone(),
            deps: EventList::new(),
            command: None,
            local_bytes: 0,
        };
        let built = build(&mut handler);
        let Handler { deps, command, .. } = handler;

        let (command, result) = match (built, command) {
            (Ok(()), Some(command)) => (Some(command), Ok(event.clone())),
            (Ok(()), None) => (
                None,
                Err(Error::Internal(format!(
                    "kernel '{}' submitted without a command",
                    event.label()
                ))),
            ),
            (Err(err), _) => (None, Err(err)),
        };

        // Accessors already recorded this event on their trackers, so even a failed
        // build must complete it in dependency order.
        self.launch(&event, deps, command)?;
        let mut outstanding = self.inner.outstanding.lock();
        // Failed events stay so that `wait` can report them
        outstanding.retain(|e| e.status() != EventStatus::Complete);
        outstanding.push(event);
        drop(outstanding);
        result
    }

    fn launch(&self, event: &Event, deps: EventList, command: Option<Command>) -> Result<()> {
        let job = Job {
            event: event.clone(),
            deps,
            command,
        };
        if self.inner.jobs.send(job).is_err() {
            let device = self.inner.device.name();
            let err = Error::Backend(format!("dispatcher of device '{device}' has stopped"));
            event.complete(Err(err.clone()));
            return Err(err);
        }
        Ok(())
    }

    /// Block until every command submitted so far has finished
    ///
    /// Returns the first failure among them.
    pub fn wait(&self) -> Result<()> {
        let events = std::mem::take(&mut *self.inner.outstanding.lock());
        Event::wait_all(&events)
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("device", &self.inner.device.name())
            .field("outstanding", &self.inner.outstanding.lock().len())
            .finish()
    }
}
