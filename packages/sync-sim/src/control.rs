//! Execution context threaded through statement execution.
//!
//! A row runs on behalf of exactly one simulated thread. Semaphore operations
//! reached from inside that row need to know which thread is calling and need
//! a way to park and wake threads; both come from the `ExecContext` passed in
//! by the scheduler.

use rand::rngs::StdRng;

use crate::ids::ThreadId;

/// Scheduler-side operations reachable from inside an executing row.
pub trait ThreadControl {
    /// Mark `thread` queued. It stays on its current row until woken.
    fn block(&mut self, thread: ThreadId);

    /// Mark `thread` runnable and move it past the row it blocked on.
    fn wake(&mut self, thread: ThreadId);

    fn thread_name(&self, thread: ThreadId) -> Option<&str>;

    /// Number of registered threads, including the initialization thread
    /// while it runs.
    fn thread_count(&self) -> usize;
}

/// Everything a row may touch besides the variable environment.
pub struct ExecContext<'a> {
    pub thread: ThreadId,
    pub control: &'a mut dyn ThreadControl,
    pub rng: &'a mut StdRng,
    /// Lines produced by `print`.
    pub output: &'a mut Vec<String>,
}

impl<'a> ExecContext<'a> {
    pub fn new(
        thread: ThreadId,
        control: &'a mut dyn ThreadControl,
        rng: &'a mut StdRng,
        output: &'a mut Vec<String>,
    ) -> Self {
        ExecContext {
            thread,
            control,
            rng,
            output,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Control that records block/wake calls instead of moving cursors.
    #[derive(Debug, Default)]
    pub struct RecordingControl {
        pub names: Vec<String>,
        pub queued: Vec<ThreadId>,
        pub blocked: Vec<ThreadId>,
        pub woken: Vec<ThreadId>,
    }

    impl RecordingControl {
        pub fn with_threads(names: &[&str]) -> Self {
            RecordingControl {
                names: names.iter().map(|n| n.to_string()).collect(),
                ..Default::default()
            }
        }

        pub fn is_queued(&self, thread: ThreadId) -> bool {
            self.queued.contains(&thread)
        }
    }

    impl ThreadControl for RecordingControl {
        fn block(&mut self, thread: ThreadId) {
            self.blocked.push(thread);
            self.queued.push(thread);
        }

        fn wake(&mut self, thread: ThreadId) {
            self.woken.push(thread);
            self.queued.retain(|t| *t != thread);
        }

        fn thread_name(&self, thread: ThreadId) -> Option<&str> {
            self.names.get(thread.raw() as usize).map(String::as_str)
        }

        fn thread_count(&self) -> usize {
            self.names.len()
        }
    }
}
