//! The simulator: thread table, stepping, and run loops.
//!
//! Everything happens on the caller's thread. A simulated thread is a cursor
//! advanced by explicit calls; blocking on a semaphore only flips its
//! `queued` flag so the scheduler skips it until someone signals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::SimConfig;
use crate::control::{ExecContext, ThreadControl};
use crate::display::{
    Binding, DisplayState, Observer, RowRef, StepReport, ThreadPlacement, VariableView,
};
use crate::env::Environment;
use crate::error::{Result, SimError};
use crate::ids::ThreadId;
use crate::interp::exec_line;
use crate::script::{ColumnRef, Script};
use crate::thread::{Palette, Thread, INIT_COLOR, INIT_NAME};

/// Clears the running flag of a [`Simulator`] from anywhere.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What one call to `step`, `random_step` or `step_one` did.
#[derive(Debug, Default)]
pub struct Tick {
    /// Threads offered a step, in the order they were offered one.
    pub visited: Vec<ThreadId>,
    pub reports: Vec<StepReport>,
    pub failures: Vec<SimError>,
    /// Random scheduling found nothing runnable.
    pub idle: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Stopped,
    MaxSteps,
    Error,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub failures: usize,
    pub reason: StopReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Discipline {
    RoundRobin,
    Random,
}

/// Thread table as seen from inside an executing row.
struct SchedulerControl<'a> {
    threads: &'a mut [Thread],
    script: &'a Script,
}

impl SchedulerControl<'_> {
    fn find(&mut self, id: ThreadId) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|t| t.id() == id)
    }
}

impl ThreadControl for SchedulerControl<'_> {
    fn block(&mut self, thread: ThreadId) {
        if let Some(t) = self.find(thread) {
            log::debug!("thread {} queued", t.name());
            t.enqueue();
        }
    }

    fn wake(&mut self, thread: ThreadId) {
        let script = self.script;
        if let Some(t) = self.find(thread) {
            log::debug!("thread {} woken", t.name());
            t.dequeue();
            if let Some(rows) = script.column(t.column()) {
                t.next_loop(rows);
            }
        }
    }

    fn thread_name(&self, thread: ThreadId) -> Option<&str> {
        self.threads
            .iter()
            .find(|t| t.id() == thread)
            .map(Thread::name)
    }

    fn thread_count(&self) -> usize {
        self.threads.len()
    }
}

pub struct Simulator {
    script: Script,
    config: SimConfig,
    threads: Vec<Thread>,
    next_thread: u32,
    palette: Palette,
    env: Environment,
    /// Variable name to the row that first defined it.
    views: IndexMap<String, RowRef>,
    rng: StdRng,
    running: Arc<AtomicBool>,
    destroyed: bool,
}

impl Simulator {
    /// A simulator with no threads and an empty environment. See
    /// [`Simulator::boot`] for the usual start-up sequence.
    pub fn new(script: Script, config: SimConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Simulator {
            script,
            config,
            threads: Vec::new(),
            next_thread: 0,
            palette: Palette::new(),
            env: Environment::new(),
            views: IndexMap::new(),
            rng,
            running: Arc::new(AtomicBool::new(false)),
            destroyed: false,
        }
    }

    /// Run the initialization column, then start one thread per column.
    pub fn boot(script: Script, config: SimConfig) -> Result<Self> {
        let mut sim = Simulator::new(script, config);
        sim.run_init()?;
        for column in 0..sim.script.columns().len() {
            sim.create_thread(column)?;
        }
        Ok(sim)
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SimConfig {
        &mut self.config
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn thread(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id() == id)
    }

    pub fn thread_by_name(&self, name: &str) -> Option<&Thread> {
        self.threads.iter().find(|t| t.name() == name)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.running))
    }

    /// Add a thread over `column`, positioned at its first row.
    pub fn register(
        &mut self,
        column: ColumnRef,
        name: impl Into<String>,
        color: &'static str,
    ) -> Result<ThreadId> {
        let rows = self
            .script
            .column(column)
            .ok_or_else(|| unknown_column(column))?;
        let id = ThreadId::from_raw(self.next_thread);
        self.next_thread += 1;
        let thread = Thread::new(id, name, color, column, rows);
        log::debug!("registered thread {} on {:?}", thread.name(), column);
        self.threads.push(thread);
        Ok(id)
    }

    pub fn unregister(&mut self, id: ThreadId) -> Option<Thread> {
        let index = self.threads.iter().position(|t| t.id() == id)?;
        Some(self.threads.remove(index))
    }

    /// Start another thread over thread column `column` with the next name
    /// and colour.
    pub fn create_thread(&mut self, column: usize) -> Result<ThreadId> {
        if column >= self.script.columns().len() {
            return Err(SimError::UnknownColumn(column));
        }
        let (name, color) = self.palette.next();
        self.register(ColumnRef::Thread(column), name, color)
    }

    /// Append a row to a column. Threads already on that column see it the
    /// next time they reach the end.
    pub fn add_row(&mut self, column: ColumnRef, text: &str) -> Result<usize> {
        self.script
            .column_mut(column)
            .map(|c| c.add_row(text))
            .ok_or_else(|| unknown_column(column))
    }

    pub fn add_column(&mut self) -> ColumnRef {
        self.script.add_column()
    }

    /// Execute the current row of one thread.
    ///
    /// Returns `Ok(None)` without doing anything when the thread is queued or
    /// has no current row. On an execution error the cursor stays where it
    /// was; whatever the row did before failing is kept.
    pub fn step_thread(&mut self, id: ThreadId) -> Result<Option<StepReport>> {
        let index = self
            .threads
            .iter()
            .position(|t| t.id() == id)
            .ok_or(SimError::UnknownThread(id))?;
        let thread = &self.threads[index];
        if thread.is_queued() {
            return Ok(None);
        }
        let column = thread.column();
        let Some(row_index) = thread.cursor() else {
            return Ok(None);
        };
        let rows = self
            .script
            .column(column)
            .ok_or_else(|| unknown_column(column))?;
        let Some(row) = rows.row(row_index) else {
            return Ok(None);
        };
        let source = row.text().trim().to_string();
        let skip_to = row.skip_to();
        let name = thread.name().to_string();
        log::debug!("{} {}", name, source);

        let before = self.env.snapshot();
        let mut output = Vec::new();
        let outcome = {
            let mut control = SchedulerControl {
                threads: &mut self.threads,
                script: &self.script,
            };
            let mut ctx = ExecContext::new(id, &mut control, &mut self.rng, &mut output);
            exec_line(&source, &mut self.env, &mut ctx)
        };
        let proceed = outcome.map_err(|error| SimError::exec(&name, row_index, &source, error))?;

        let at = RowRef {
            column,
            row: row_index,
        };
        let diff = self.env.diff(&before);
        for key in &diff.defined {
            self.views.insert(key.clone(), at);
        }

        let thread = &mut self.threads[index];
        if proceed {
            thread.next_row(rows);
        } else {
            thread.skip_to(skip_to);
        }

        let render = |names: &[String]| -> Vec<Binding> {
            names
                .iter()
                .map(|name| Binding {
                    name: name.clone(),
                    value: self.env.render_var(name).unwrap_or_default(),
                })
                .collect()
        };
        Ok(Some(StepReport {
            thread: id,
            thread_name: name,
            at,
            source,
            skipped_block: !proceed,
            blocked: thread.is_queued(),
            defined: render(&diff.defined),
            changed: render(&diff.changed),
            output,
        }))
    }

    /// Step one thread, restarting it at the top of its column if it ran off
    /// the end.
    pub fn step_loop(&mut self, id: ThreadId) -> Result<Option<StepReport>> {
        let report = self.step_thread(id)?;
        let script = &self.script;
        if let Some(thread) = self.threads.iter_mut().find(|t| t.id() == id) {
            if thread.cursor().is_none() {
                if let Some(rows) = script.column(thread.column()) {
                    thread.start(rows);
                }
            }
        }
        Ok(report)
    }

    /// Offer every registered thread one step, in registration order.
    pub fn step(&mut self, observer: &mut dyn Observer) -> Tick {
        let mut tick = Tick::default();
        if self.destroyed {
            return tick;
        }
        let ids: Vec<ThreadId> = self.threads.iter().map(Thread::id).collect();
        for id in ids {
            tick.visited.push(id);
            self.offer(id, observer, &mut tick);
        }
        observer.refresh(&self.display());
        tick
    }

    /// Step one thread chosen uniformly among those not queued.
    pub fn random_step(&mut self, observer: &mut dyn Observer) -> Tick {
        let mut tick = Tick::default();
        if self.destroyed {
            return tick;
        }
        let runnable: Vec<ThreadId> = self
            .threads
            .iter()
            .filter(|t| !t.is_queued())
            .map(Thread::id)
            .collect();
        match runnable.choose(&mut self.rng).copied() {
            Some(id) => {
                tick.visited.push(id);
                self.offer(id, observer, &mut tick);
            }
            None => {
                log::info!("There are currently no threads that can run.");
                tick.idle = true;
                observer.no_runnable_threads();
            }
        }
        observer.refresh(&self.display());
        tick
    }

    /// Step a single chosen thread, restarting it at the top of its column
    /// if it ran off the end. A queued thread is visited but does nothing.
    pub fn step_one(&mut self, id: ThreadId, observer: &mut dyn Observer) -> Tick {
        let mut tick = Tick::default();
        if self.destroyed {
            return tick;
        }
        tick.visited.push(id);
        self.offer(id, observer, &mut tick);
        observer.refresh(&self.display());
        tick
    }

    fn offer(&mut self, id: ThreadId, observer: &mut dyn Observer, tick: &mut Tick) {
        match self.step_loop(id) {
            Ok(Some(report)) => {
                observer.thread_stepped(&report);
                tick.reports.push(report);
            }
            Ok(None) => {}
            Err(err) => {
                let name = self
                    .thread(id)
                    .map(|t| t.name().to_string())
                    .unwrap_or_default();
                log::warn!("step failed: {}", err);
                observer.step_failed(&name, &err);
                tick.failures.push(err);
            }
        }
    }

    /// Round-robin steps until stopped.
    pub fn run(&mut self, observer: &mut dyn Observer) -> RunSummary {
        self.run_loop(Discipline::RoundRobin, observer)
    }

    /// Random steps until stopped.
    pub fn random_run(&mut self, observer: &mut dyn Observer) -> RunSummary {
        self.run_loop(Discipline::Random, observer)
    }

    fn run_loop(&mut self, discipline: Discipline, observer: &mut dyn Observer) -> RunSummary {
        let mut summary = RunSummary {
            ticks: 0,
            failures: 0,
            reason: StopReason::Stopped,
        };
        if self.destroyed {
            summary.reason = StopReason::Destroyed;
            return summary;
        }

        self.running.store(true, Ordering::SeqCst);
        let delay = self.config.delay();
        while self.is_running() {
            if self.config.max_steps.is_some_and(|max| summary.ticks >= max) {
                summary.reason = StopReason::MaxSteps;
                break;
            }
            let tick = match discipline {
                Discipline::RoundRobin => self.step(observer),
                Discipline::Random => self.random_step(observer),
            };
            summary.ticks += 1;
            summary.failures += tick.failures.len();
            if self.config.stop_on_error && !tick.failures.is_empty() {
                summary.reason = StopReason::Error;
                break;
            }
            if !delay.is_zero() && self.is_running() {
                std::thread::sleep(delay);
            }
        }
        self.running.store(false, Ordering::SeqCst);
        log::debug!("run loop ended after {} ticks: {:?}", summary.ticks, summary.reason);
        summary
    }

    /// Clear the running flag. Calling it again, or with no loop active, is
    /// harmless.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Stop for good: later steps, runs and observer callbacks do nothing.
    pub fn destroy(&mut self) {
        self.stop();
        self.destroyed = true;
    }

    /// Reset the environment and run the initialization column once, top to
    /// bottom, on a temporary thread named `0`.
    pub fn run_init(&mut self) -> Result<()> {
        self.env.reset();
        self.views.clear();

        let id = self.register(ColumnRef::Init, INIT_NAME, INIT_COLOR)?;
        let result = self.drive_init(id);
        self.unregister(id);
        result
    }

    fn drive_init(&mut self, id: ThreadId) -> Result<()> {
        loop {
            let before = self.thread(id).and_then(Thread::cursor);
            self.step_thread(id)?;
            let Some(thread) = self.thread(id) else {
                return Ok(());
            };
            if thread.is_queued() {
                let row = before.unwrap_or_default();
                let line = self
                    .script
                    .init()
                    .row(row)
                    .map(|r| r.text().trim().to_string())
                    .unwrap_or_default();
                return Err(SimError::InitBlocked { row, line });
            }
            match (before, thread.cursor()) {
                (_, None) => return Ok(()),
                // A row that woke its own thread wrapped it back to the top.
                (Some(prev), Some(now)) if now <= prev => return Ok(()),
                _ => {}
            }
        }
    }

    pub fn display(&self) -> DisplayState {
        let threads = self
            .threads
            .iter()
            .map(|t| ThreadPlacement {
                id: t.id(),
                name: t.name().to_string(),
                color: t.color(),
                column: t.column(),
                row: t.cursor(),
                queued: t.is_queued(),
            })
            .collect();
        let views = self
            .views
            .iter()
            .filter_map(|(name, owner)| {
                self.env.render_var(name).map(|value| VariableView {
                    name: name.clone(),
                    value,
                    owner: *owner,
                })
            })
            .collect();
        DisplayState { threads, views }
    }
}

fn unknown_column(column: ColumnRef) -> SimError {
    match column {
        ColumnRef::Thread(i) => SimError::UnknownColumn(i),
        ColumnRef::Init => SimError::UnknownColumn(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{NullObserver, Recorder};
    use crate::error::ExecError;
    use crate::value::Value;

    fn config() -> SimConfig {
        SimConfig::default().with_seed(3).with_delay_ms(0)
    }

    fn boot(source: &str) -> Simulator {
        Simulator::boot(Script::parse(source), config()).expect("boot")
    }

    fn id_of(sim: &Simulator, name: &str) -> ThreadId {
        sim.thread_by_name(name).map(Thread::id).expect("thread exists")
    }

    const MUTEX: &str = "\
mutex = Semaphore(1)
## thread
mutex.wait()
x = 1
mutex.signal()
## thread
mutex.wait()
y = 2
mutex.signal()
";

    #[test]
    fn test_boot_names_threads_and_drops_init() {
        let sim = boot(MUTEX);
        let names: Vec<_> = sim.threads().iter().map(Thread::name).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(sim.threads()[0].color(), "red");
        assert_eq!(sim.threads()[1].color(), "orange");
        assert!(sim.env().contains("mutex"));
    }

    #[test]
    fn test_mutex_blocks_second_waiter() {
        let mut sim = boot(MUTEX);
        let (a, b) = (id_of(&sim, "A"), id_of(&sim, "B"));

        sim.step_thread(a).expect("A waits");
        assert_eq!(sim.env().render_var("mutex").as_deref(), Some("0"));
        let report = sim.step_thread(b).expect("B waits").expect("stepped");
        assert!(report.blocked);
        assert_eq!(sim.env().render_var("mutex").as_deref(), Some("-1"));
        assert!(sim.thread(b).is_some_and(Thread::is_queued));
        assert_eq!(sim.thread(b).and_then(Thread::cursor), Some(0));

        // queued threads are skipped
        assert_eq!(sim.step_thread(b).expect("no-op"), None);

        sim.step_thread(a).expect("x = 1");
        sim.step_thread(a).expect("A signals");
        assert_eq!(sim.env().render_var("mutex").as_deref(), Some("0"));
        let b_thread = sim.thread(b).expect("B");
        assert!(!b_thread.is_queued());
        assert_eq!(b_thread.cursor(), Some(1));
    }

    #[test]
    fn test_step_reports_defined_bindings_and_views() {
        let mut sim = boot(MUTEX);
        let a = id_of(&sim, "A");
        sim.step_thread(a).expect("wait");
        let report = sim.step_thread(a).expect("assign").expect("stepped");
        assert_eq!(report.source, "x = 1");
        assert_eq!(
            report.defined,
            vec![Binding {
                name: "x".into(),
                value: "1".into()
            }]
        );

        let state = sim.display();
        let view = state.view("x").expect("view for x");
        assert_eq!(view.owner, RowRef { column: ColumnRef::Thread(0), row: 1 });
        let mutex = state.view("mutex").expect("view for mutex");
        assert_eq!(mutex.owner.column, ColumnRef::Init);
    }

    #[test]
    fn test_round_robin_visits_in_registration_order() {
        let mut sim = boot(MUTEX);
        let c = sim.create_thread(0).expect("third thread");
        let tick = sim.step(&mut NullObserver);
        let order: Vec<_> = tick.visited.iter().map(|id| sim.thread(*id).map(Thread::name)).collect();
        assert_eq!(order, vec![Some("A"), Some("B"), Some("C")]);
        assert_eq!(tick.visited[2], c);
        // B and C block on the mutex A holds
        assert_eq!(tick.reports.len(), 3);
        assert!(sim.thread(c).is_some_and(Thread::is_queued));
    }

    #[test]
    fn test_step_loop_wraps_to_top() {
        let mut sim = boot("## thread\nx = 1\ny = 2\n");
        let a = id_of(&sim, "A");
        sim.step_loop(a).expect("x");
        sim.step_loop(a).expect("y");
        assert_eq!(sim.thread(a).and_then(Thread::cursor), Some(0));
    }

    #[test]
    fn test_random_step_skips_queued_threads() {
        let source = "gate = Semaphore(0)\n## thread\ngate.wait()\n## thread\nx = 1\n";
        let mut sim = boot(source);
        let a = id_of(&sim, "A");
        sim.step_thread(a).expect("A blocks");

        for _ in 0..20 {
            let tick = sim.random_step(&mut NullObserver);
            assert_eq!(tick.visited.len(), 1);
            assert_ne!(tick.visited[0], a);
        }
    }

    #[test]
    fn test_random_step_with_nothing_runnable() {
        let source = "gate = Semaphore(0)\n## thread\ngate.wait()\n";
        let mut sim = boot(source);
        sim.step(&mut NullObserver);

        let mut recorder = Recorder::default();
        let tick = sim.random_step(&mut recorder);
        assert!(tick.idle);
        assert!(tick.visited.is_empty());
        assert_eq!(recorder.idle_ticks, 1);
    }

    #[test]
    fn test_failed_step_keeps_cursor_and_tick_continues() {
        let mut sim = boot("## thread\nx = missing\n## thread\ny = 1\n");
        let a = id_of(&sim, "A");

        let mut recorder = Recorder::default();
        let tick = sim.step(&mut recorder);
        assert_eq!(tick.failures.len(), 1);
        assert!(matches!(
            tick.failures[0].exec_error(),
            Some(ExecError::Name { .. })
        ));
        assert_eq!(tick.reports.len(), 1);
        assert_eq!(recorder.failures[0].0, "A");
        assert_eq!(sim.thread(a).and_then(Thread::cursor), Some(0));
        assert_eq!(sim.env().get("y"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_run_stops_at_max_steps() {
        let mut sim = boot(MUTEX);
        sim.config.max_steps = Some(6);
        let mut recorder = Recorder::default();
        let summary = sim.run(&mut recorder);
        assert_eq!(summary.ticks, 6);
        assert_eq!(summary.reason, StopReason::MaxSteps);
        assert_eq!(recorder.refreshes, 6);
        assert!(!sim.is_running());
    }

    #[test]
    fn test_run_stops_on_error_when_configured() {
        let mut sim = boot("## thread\nx = 1 / 0\n");
        sim.config.stop_on_error = true;
        let summary = sim.random_run(&mut NullObserver);
        assert_eq!(summary.reason, StopReason::Error);
        assert_eq!(summary.ticks, 1);
        assert_eq!(summary.failures, 1);
    }

    #[test]
    fn test_stop_handle_ends_run_from_observer() {
        struct StopAfter {
            handle: StopHandle,
            left: u32,
        }
        impl Observer for StopAfter {
            fn refresh(&mut self, _state: &DisplayState) {
                self.left -= 1;
                if self.left == 0 {
                    self.handle.stop();
                }
            }
        }

        let mut sim = boot(MUTEX);
        let mut observer = StopAfter {
            handle: sim.stop_handle(),
            left: 4,
        };
        let summary = sim.run(&mut observer);
        assert_eq!(summary.ticks, 4);
        assert_eq!(summary.reason, StopReason::Stopped);
    }

    #[test]
    fn test_stop_handle_ends_unbounded_run_from_another_thread() {
        let mut sim = boot(MUTEX);
        let handle = sim.stop_handle();
        let stopper = std::thread::spawn(move || {
            while !handle.is_running() {
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
            std::thread::sleep(std::time::Duration::from_millis(20));
            handle.stop();
        });

        let summary = sim.run(&mut NullObserver);
        stopper.join().expect("stopper thread");
        assert_eq!(summary.reason, StopReason::Stopped);
        assert!(summary.ticks > 0);
        assert!(!sim.is_running());
    }

    #[test]
    fn test_step_one_reports_and_wraps() {
        let mut sim = boot("## thread
x = 1
## thread
y = 2
");
        let b = id_of(&sim, "B");
        let mut recorder = Recorder::default();

        let tick = sim.step_one(b, &mut recorder);
        assert_eq!(tick.visited, vec![b]);
        assert_eq!(tick.reports.len(), 1);
        assert_eq!(recorder.reports[0].thread_name, "B");
        assert_eq!(recorder.refreshes, 1);
        assert_eq!(sim.thread(b).and_then(Thread::cursor), Some(0));
        assert!(sim.env().get("x").is_none());
    }

    #[test]
    fn test_step_one_on_queued_or_failing_thread() {
        let mut sim = boot("## thread
bad = nope
## thread
gate = Semaphore(0)
gate.wait()
");
        let (a, b) = (id_of(&sim, "A"), id_of(&sim, "B"));
        let mut recorder = Recorder::default();

        let tick = sim.step_one(a, &mut recorder);
        assert_eq!(tick.failures.len(), 1);
        assert_eq!(recorder.failures[0].0, "A");

        sim.step_one(b, &mut recorder);
        sim.step_one(b, &mut recorder);
        assert!(sim.thread(b).is_some_and(Thread::is_queued));
        let tick = sim.step_one(b, &mut recorder);
        assert!(tick.reports.is_empty());
        assert!(tick.failures.is_empty());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut sim = boot(MUTEX);
        sim.stop();
        sim.stop();
        assert!(!sim.is_running());
        assert!(!sim.stop_handle().is_running());
    }

    #[test]
    fn test_destroy_silences_everything() {
        let mut sim = boot(MUTEX);
        sim.destroy();
        let mut recorder = Recorder::default();
        let tick = sim.step(&mut recorder);
        assert!(tick.visited.is_empty());
        assert_eq!(sim.run(&mut recorder).reason, StopReason::Destroyed);
        assert_eq!(recorder.refreshes, 0);
        assert!(sim.is_destroyed());
    }

    #[test]
    fn test_run_init_resets_environment() {
        let mut sim = boot("count = 0\n## thread\ncount += 1\n");
        let a = id_of(&sim, "A");
        sim.step_thread(a).expect("increment");
        assert_eq!(sim.env().get("count"), Some(&Value::Int(1)));

        sim.run_init().expect("re-init");
        assert_eq!(sim.env().get("count"), Some(&Value::Int(0)));
        assert_eq!(sim.threads().len(), 1);
    }

    #[test]
    fn test_blocked_init_is_an_error() {
        let err = Simulator::boot(Script::parse("s = Semaphore(0)\ns.wait()\n"), config())
            .err()
            .expect("init should block");
        assert!(matches!(err, SimError::InitBlocked { row: 1, .. }));
    }

    #[test]
    fn test_create_thread_on_unknown_column() {
        let mut sim = boot(MUTEX);
        assert!(matches!(sim.create_thread(9), Err(SimError::UnknownColumn(9))));
    }

    #[test]
    fn test_add_row_extends_running_column() {
        let mut sim = boot("## thread\nx = 1\n");
        let a = id_of(&sim, "A");
        let index = sim.add_row(ColumnRef::Thread(0), "y = 2").expect("add row");
        assert_eq!(index, 1);
        sim.step_loop(a).expect("x");
        assert_eq!(sim.thread(a).and_then(Thread::cursor), Some(1));
        sim.step_loop(a).expect("y");
        assert_eq!(sim.env().get("y"), Some(&Value::Int(2)));
    }
}
