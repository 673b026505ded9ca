//! sync-sim: a cooperative multi-thread simulator for semaphore exercises.
//!
//! A script is split into columns of rows. Each simulated thread is a cursor
//! over one column; the [`Simulator`] advances threads one row at a time,
//! either round robin or by picking a runnable thread at random. Rows are
//! small statements run by a restricted interpreter against one shared
//! variable environment. `Semaphore`, `RandomSemaphore` and `Lightswitch`
//! values created by the script park and wake threads through the
//! [`ThreadControl`] seam.
//!
//! ```
//! use sync_sim::{NullObserver, Script, SimConfig, Simulator};
//!
//! let script = Script::parse(
//!     "mutex = Semaphore(1)\n## thread\nmutex.wait()\nmutex.signal()\n## thread\nmutex.wait()\nmutex.signal()\n",
//! );
//! let mut sim = Simulator::boot(script, SimConfig::default().with_seed(1)).unwrap();
//! let tick = sim.step(&mut NullObserver);
//! assert_eq!(tick.visited.len(), 2);
//! assert!(sim.thread_by_name("B").unwrap().is_queued());
//! ```

pub mod config;
pub mod control;
pub mod display;
pub mod env;
pub mod error;
pub mod ids;
pub mod interp;
pub mod lightswitch;
pub mod scheduler;
pub mod script;
pub mod semaphore;
pub mod thread;
pub mod value;

pub use config::SimConfig;
pub use control::{ExecContext, ThreadControl};
pub use display::{
    Binding, DisplayState, NullObserver, Observer, Recorder, RowRef, StepReport, ThreadPlacement,
    VariableView,
};
pub use env::{Diff, Environment, Snapshot, SyncObjects};
pub use error::{ExecError, ParseError, Result, SimError};
pub use ids::{LightswitchId, SemaphoreId, ThreadId};
pub use lightswitch::Lightswitch;
pub use scheduler::{RunSummary, Simulator, StopHandle, StopReason, Tick};
pub use script::{Column, ColumnRef, Malformed, Row, Script};
pub use semaphore::{QueueDiscipline, Semaphore};
pub use thread::Thread;
pub use value::{Builtin, Value};
