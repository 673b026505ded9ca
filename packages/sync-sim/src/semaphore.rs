//! Counting semaphores used by simulated threads.
//!
//! The counter may go negative; its magnitude is the number of queued
//! waiters. At every quiescent point `queue.len() == max(0, -n)`.

use std::collections::VecDeque;

use rand::Rng;
use serde::Serialize;

use crate::control::ThreadControl;
use crate::ids::ThreadId;

/// Which queued thread `signal` wakes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum QueueDiscipline {
    /// Wake the longest-waiting thread (`Semaphore`).
    Fifo,
    /// Wake a uniformly random waiter (`RandomSemaphore`).
    Random,
}

#[derive(Clone, Debug)]
pub struct Semaphore {
    n: i64,
    queue: VecDeque<ThreadId>,
    discipline: QueueDiscipline,
}

impl Semaphore {
    pub fn new(n: i64) -> Self {
        Semaphore::with_discipline(n, QueueDiscipline::Fifo)
    }

    pub fn random(n: i64) -> Self {
        Semaphore::with_discipline(n, QueueDiscipline::Random)
    }

    pub fn with_discipline(n: i64, discipline: QueueDiscipline) -> Self {
        Semaphore {
            n,
            queue: VecDeque::new(),
            discipline,
        }
    }

    pub fn value(&self) -> i64 {
        self.n
    }

    pub fn discipline(&self) -> QueueDiscipline {
        self.discipline
    }

    /// Waiting threads in queue order.
    pub fn waiters(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.queue.iter().copied()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// The queue-length invariant.
    pub fn is_consistent(&self) -> bool {
        self.queue.len() as i64 == (-self.n).max(0)
    }

    /// Decrement the counter; block `caller` if it went negative.
    ///
    /// Returns the new counter value.
    pub fn wait(&mut self, caller: ThreadId, control: &mut dyn ThreadControl) -> i64 {
        self.n -= 1;
        if self.n < 0 {
            control.block(caller);
            self.queue.push_back(caller);
        }
        self.n
    }

    /// Increment the counter `count` times, waking one waiter per increment
    /// while any are queued.
    pub fn signal<R: Rng + ?Sized>(
        &mut self,
        count: u32,
        control: &mut dyn ThreadControl,
        rng: &mut R,
    ) {
        for _ in 0..count {
            self.n += 1;
            if let Some(thread) = self.unblock(rng) {
                control.wake(thread);
            }
        }
    }

    /// Remove exactly one waiter according to the queue discipline.
    fn unblock<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<ThreadId> {
        if self.queue.is_empty() {
            return None;
        }
        match self.discipline {
            QueueDiscipline::Fifo => self.queue.pop_front(),
            QueueDiscipline::Random => {
                let index = rng.gen_range(0..self.queue.len());
                self.queue.remove(index)
            }
        }
    }
}
