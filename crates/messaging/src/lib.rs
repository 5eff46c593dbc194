//! Typed message channels for TickMatch workers
//!
//! This crate provides the queue that carries commands into the matching
//! workers and events out of them: an unbounded multi-producer,
//! single-consumer channel with a blocking receive.
//!
//! [`channel`] is the only way to obtain handles, and it returns them with
//! split capabilities: a cloneable [`Sender`] that can only push, and a
//! [`Receiver`] that can only pop. The receive side blocks on a condition
//! variable until a message arrives or every sender has been dropped, so a
//! worker loop terminates cleanly on [`Disconnected`] instead of relying on
//! unwinding.
//!
//! The queue is unbounded: memory is the only backpressure.
//!
//! # Example
//!
//! ```
//! let (tx, rx) = messaging::channel();
//!
//! tx.send(42).unwrap();
//! assert_eq!(rx.recv(), Ok(42));
//!
//! drop(tx);
//! assert!(rx.recv().is_err());
//! ```

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

/// Error returned by [`Sender::send`] when the receiver has been dropped.
/// Carries the unsent message back to the caller.
#[derive(Debug, PartialEq, Eq)]
pub struct SendError<T>(pub T);

impl<T> std::fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sending on a channel with no receiver")
    }
}

impl<T: std::fmt::Debug> std::error::Error for SendError<T> {}

/// Error returned by [`Receiver::recv`] once the queue is empty and every
/// sender has been dropped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("receiving on an empty channel with no senders")]
pub struct Disconnected;

struct Inner<T> {
    queue: VecDeque<T>,
    senders: usize,
    receiver_alive: bool,
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
    ready: Condvar,
}

/// The sending half of a channel. Cloning yields another producer feeding
/// the same queue.
pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

/// The receiving half of a channel. There is exactly one per channel.
pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

/// Creates an unbounded channel, returning the paired send/receive handles.
pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared {
        inner: Mutex::new(Inner {
            queue: VecDeque::new(),
            senders: 1,
            receiver_alive: true,
        }),
        ready: Condvar::new(),
    });

    (
        Sender {
            shared: Arc::clone(&shared),
        },
        Receiver { shared },
    )
}

impl<T> Sender<T> {
    /// Enqueues a message, waking the receiver if it is blocked.
    ///
    /// Fails once the receiver has been dropped, handing the message back.
    pub fn send(&self, message: T) -> Result<(), SendError<T>> {
        let mut inner = self.shared.inner.lock();
        if !inner.receiver_alive {
            return Err(SendError(message));
        }
        inner.queue.push_back(message);
        drop(inner);
        self.shared.ready.notify_one();
        Ok(())
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        self.shared.inner.lock().senders += 1;
        Sender {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        let mut inner = self.shared.inner.lock();
        inner.senders -= 1;
        let last = inner.senders == 0;
        drop(inner);
        if last {
            // Wake a receiver blocked on an empty queue so it observes the
            // disconnect.
            self.shared.ready.notify_one();
        }
    }
}

impl<T> Receiver<T> {
    /// Blocks until a message is available and returns it.
    ///
    /// Returns [`Disconnected`] once the queue is empty and no senders
    /// remain. Messages sent before the last sender dropped are still
    /// delivered in order.
    pub fn recv(&self) -> Result<T, Disconnected> {
        let mut inner = self.shared.inner.lock();
        loop {
            if let Some(message) = inner.queue.pop_front() {
                return Ok(message);
            }
            if inner.senders == 0 {
                return Err(Disconnected);
            }
            self.shared.ready.wait(&mut inner);
        }
    }

    /// Pops a message without blocking; `None` when the queue is empty.
    pub fn try_recv(&self) -> Option<T> {
        self.shared.inner.lock().queue.pop_front()
    }

    /// Number of messages currently queued.
    pub fn len(&self) -> usize {
        self.shared.inner.lock().queue.len()
    }

    /// True when no messages are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.shared.inner.lock().receiver_alive = false;
    }
}

impl<T> std::fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender").finish_non_exhaustive()
    }
}

impl<T> std::fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver").finish_non_exhaustive()
    }
}
