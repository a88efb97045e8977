//! Bounded, thread-safe ingress FIFO for inbound ISO-TP frames.
//!
//! Replaces the mutable-list-plus-callback pattern from the reference
//! implementation with a proper mutex/condvar queue: the bus adapter's
//! receive callback pushes, and the sender/receiver state machines pop with
//! a deadline. Overflow drops the oldest frame and logs - liveness for the
//! reader matters more than preserving a backlog nobody can catch up on.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Instant;

/// Default bound on the number of buffered inbound frames.
pub const DEFAULT_CAPACITY: usize = 64;

/// One queued inbound frame: the CAN ID it arrived on, and its raw bytes.
pub type QueuedFrame = (u32, Vec<u8>);

/// A bounded FIFO of inbound frames, written by the bus adapter's callback
/// and drained by the ISO-TP sender/receiver with a deadline.
pub struct FrameQueue {
    inner: Mutex<VecDeque<QueuedFrame>>,
    cond: Condvar,
    capacity: usize,
}

impl FrameQueue {
    /// Creates an empty queue bounded to `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity.min(256))),
            cond: Condvar::new(),
            capacity,
        }
    }

    /// Pushes a frame, dropping the oldest buffered frame if at capacity.
    pub fn push(&self, can_id: u32, data: Vec<u8>) {
        let mut guard = self.inner.lock().expect("frame queue mutex poisoned");
        if guard.len() >= self.capacity {
            guard.pop_front();
            log::warn!("ISO-TP ingress queue full ({} frames); dropping oldest", self.capacity);
        }
        guard.push_back((can_id, data));
        self.cond.notify_one();
    }

    /// Pops the oldest frame, blocking until one arrives or `deadline` passes.
    /// Returns `None` on deadline expiry.
    pub fn pop(&self, deadline: Instant) -> Option<QueuedFrame> {
        let mut guard = self.inner.lock().expect("frame queue mutex poisoned");
        loop {
            if let Some(item) = guard.pop_front() {
                return Some(item);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard_back, timeout) = self
                .cond
                .wait_timeout(guard, deadline - now)
                .expect("frame queue mutex poisoned");
            guard = guard_back;
            if timeout.timed_out() && guard.is_empty() {
                return None;
            }
        }
    }

    /// Drops every buffered frame.
    pub fn clear(&self) {
        self.inner.lock().expect("frame queue mutex poisoned").clear();
    }

    /// Number of frames currently buffered.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("frame queue mutex poisoned").len()
    }

    /// True if no frames are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
