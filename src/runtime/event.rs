//! Completion tokens for submitted commands

use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;

/// State of a submitted command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventStatus {
    /// Still waiting on dependencies or running
    Pending,
    /// Ran to completion
    Complete,
    /// Failed, or was skipped because a dependency failed
    Failed(Error),
}

struct EventInner {
    label: Arc<str>,
    status: Mutex<EventStatus>,
    done: Condvar,
}

/// Completion token returned by every submission
///
/// Events are cheap to clone; all clones observe the same command.
#[derive(Clone)]
pub struct Event {
    inner: Arc<EventInner>,
}

impl Event {
    pub(crate) fn pending(label: Arc<str>) -> Self {
        Self {
            inner: Arc::new(EventInner {
                label,
                status: Mutex::new(EventStatus::Pending),
                done: Condvar::new(),
            }),
        }
    }

    /// An event that is already complete
    ///
    /// Returned by algorithms that had nothing to submit (empty inputs).
    pub fn completed() -> Self {
        Self {
            inner: Arc::new(EventInner {
                label: Arc::from("completed"),
                status: Mutex::new(EventStatus::Complete),
                done: Condvar::new(),
            }),
        }
    }

    /// Label of the command this event tracks (its kernel id)
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Current status without blocking
    pub fn status(&self) -> EventStatus {
        self.inner.status.lock().clone()
    }

    /// Returns true once the command has finished, successfully or not
    pub fn is_complete(&self) -> bool {
        !matches!(*self.inner.status.lock(), EventStatus::Pending)
    }

    /// Block until the command finishes
    ///
    /// Returns the command's failure, if any.
    pub fn wait(&self) -> Result<()> {
        let mut status = self.inner.status.lock();
        while matches!(*status, EventStatus::Pending) {
            self.inner.done.wait(&mut status);
        }
        match &*status {
            EventStatus::Failed(err) => Err(err.clone()),
            _ => Ok(()),
        }
    }

    /// Wait for every event, returning the first failure
    pub fn wait_all<'a>(events: impl IntoIterator<Item = &'a Event>) -> Result<()> {
        let mut first = Ok(());
        for event in events {
            let result = event.wait();
            if first.is_ok() {
                first = result;
            }
        }
        first
    }

    pub(crate) fn complete(&self, result: Result<()>) {
        let mut status = self.inner.status.lock();
        *status = match result {
            Ok(()) => EventStatus::Complete,
            Err(err) => EventStatus::Failed(err),
        };
        self.inner.done.notify_all();
    }

    pub(crate) fn is_same(&self, other: &Event) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("label", &self.label())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_wait_blocks_until_complete() {
        let event = Event::pending(Arc::from("k"));
        let remote = event.clone();
        let handle = thread::spawn(move || remote.complete(Ok(())));
        event.wait().unwrap();
        handle.join().unwrap();
        assert!(event.is_complete());
        assert_eq!(event.status(), EventStatus::Complete);
    }

    #[test]
    fn test_failure_is_reported_to_every_clone() {
        let event = Event::pending(Arc::from("k"));
        event.complete(Err(Error::kernel("k", "boom")));
        let other = event.clone();
        assert_eq!(other.wait(), Err(Error::kernel("k", "boom")));
        assert_eq!(
            Event::wait_all([&Event::completed(), &event]),
            Err(Error::kernel("k", "boom"))
        );
    }
}
