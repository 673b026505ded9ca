//! The shared variable environment and the synchronization objects it owns.

use indexmap::IndexMap;
use rand::Rng;

use crate::control::ThreadControl;
use crate::ids::{LightswitchId, SemaphoreId, ThreadId};
use crate::lightswitch::Lightswitch;
use crate::semaphore::{QueueDiscipline, Semaphore};
use crate::value::Value;

/// Arena of semaphores and lightswitches created by executed rows.
#[derive(Debug, Default, Clone)]
pub struct SyncObjects {
    semaphores: Vec<Semaphore>,
    lightswitches: Vec<Lightswitch>,
}

impl SyncObjects {
    pub fn add_semaphore(&mut self, n: i64, discipline: QueueDiscipline) -> SemaphoreId {
        let id = SemaphoreId::from_index(self.semaphores.len());
        self.semaphores.push(Semaphore::with_discipline(n, discipline));
        id
    }

    pub fn add_lightswitch(&mut self) -> LightswitchId {
        let id = LightswitchId::from_index(self.lightswitches.len());
        self.lightswitches.push(Lightswitch::new());
        id
    }

    pub fn semaphore(&self, id: SemaphoreId) -> Option<&Semaphore> {
        self.semaphores.get(id.index())
    }

    pub fn semaphore_mut(&mut self, id: SemaphoreId) -> Option<&mut Semaphore> {
        self.semaphores.get_mut(id.index())
    }

    pub fn lightswitch(&self, id: LightswitchId) -> Option<&Lightswitch> {
        self.lightswitches.get(id.index())
    }

    pub fn semaphores(&self) -> impl Iterator<Item = (SemaphoreId, &Semaphore)> {
        self.semaphores
            .iter()
            .enumerate()
            .map(|(i, s)| (SemaphoreId::from_index(i), s))
    }

    /// `switch.lock(semaphore)` on behalf of `caller`.
    ///
    /// Returns `None` if either handle is dangling.
    pub fn lock<R: Rng + ?Sized>(
        &mut self,
        switch: LightswitchId,
        semaphore: SemaphoreId,
        caller: ThreadId,
        control: &mut dyn ThreadControl,
        rng: &mut R,
    ) -> Option<()> {
        let ls = self.lightswitches.get_mut(switch.index())?;
        let sem = self.semaphores.get_mut(semaphore.index())?;
        ls.lock(sem, caller, control, rng);
        Some(())
    }

    pub fn unlock<R: Rng + ?Sized>(
        &mut self,
        switch: LightswitchId,
        semaphore: SemaphoreId,
        caller: ThreadId,
        control: &mut dyn ThreadControl,
        rng: &mut R,
    ) -> Option<()> {
        let ls = self.lightswitches.get_mut(switch.index())?;
        let sem = self.semaphores.get_mut(semaphore.index())?;
        ls.unlock(sem, caller, control, rng);
        Some(())
    }
}

/// Bindings captured before a row executes.
#[derive(Debug, Clone)]
pub struct Snapshot(IndexMap<String, Value>);

/// Bindings that appeared or were rebound by one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub defined: Vec<String>,
    pub changed: Vec<String>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.defined.is_empty() && self.changed.is_empty()
    }
}

/// One flat name-to-value mapping shared by every simulated thread.
#[derive(Debug, Default, Clone)]
pub struct Environment {
    vars: IndexMap<String, Value>,
    objects: SyncObjects,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Bindings in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn objects(&self) -> &SyncObjects {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut SyncObjects {
        &mut self.objects
    }

    /// Drop every binding and object. Used by run-initialization.
    pub fn reset(&mut self) {
        self.vars.clear();
        self.objects = SyncObjects::default();
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.vars.clone())
    }

    /// Compare the current bindings against `before`.
    ///
    /// Handles compare by identity, so a semaphore mutated in place is not
    /// reported as changed; rebinding a name to a different handle is.
    pub fn diff(&self, before: &Snapshot) -> Diff {
        let mut diff = Diff::default();
        for (name, value) in &self.vars {
            match before.0.get(name) {
                None => diff.defined.push(name.clone()),
                Some(old) if old != value => diff.changed.push(name.clone()),
                Some(_) => {}
            }
        }
        diff
    }

    /// Render a value for display, looking through object handles.
    pub fn render(&self, value: &Value) -> String {
        match value {
            Value::Semaphore(id) => match self.objects.semaphore(*id) {
                Some(sem) => sem.value().to_string(),
                None => value.to_string(),
            },
            Value::Lightswitch(id) => match self.objects.lightswitch(*id) {
                Some(ls) => format!("Lightswitch(counter={})", ls.counter()),
                None => value.to_string(),
            },
            other => other.to_string(),
        }
    }

    /// Render the binding for `name`, if present.
    pub fn render_var(&self, name: &str) -> Option<String> {
        self.vars.get(name).map(|v| self.render(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_reports_defined_and_changed() {
        let mut env = Environment::new();
        env.set("a", Value::Int(1));
        env.set("b", Value::Int(2));
        let before = env.snapshot();

        env.set("b", Value::Int(3));
        env.set("c", Value::Str("x".into()));
        env.set("a", Value::Int(1));

        let diff = env.diff(&before);
        assert_eq!(diff.defined, vec!["c".to_string()]);
        assert_eq!(diff.changed, vec!["b".to_string()]);
    }

    #[test]
    fn test_in_place_semaphore_mutation_is_not_a_change() {
        use crate::control::testing::RecordingControl;

        let mut env = Environment::new();
        let id = env.objects_mut().add_semaphore(1, QueueDiscipline::Fifo);
        env.set("mutex", Value::Semaphore(id));
        let before = env.snapshot();

        let mut control = RecordingControl::with_threads(&["A"]);
        env.objects_mut()
            .semaphore_mut(id)
            .expect("semaphore exists")
            .wait(ThreadId::from_raw(0), &mut control);

        assert!(env.diff(&before).is_empty());
        assert_eq!(env.render_var("mutex").as_deref(), Some("0"));
    }

    #[test]
    fn test_reset_clears_bindings_and_objects() {
        let mut env = Environment::new();
        let id = env.objects_mut().add_semaphore(0, QueueDiscipline::Fifo);
        env.set("s", Value::Semaphore(id));
        env.reset();
        assert!(env.is_empty());
        assert!(env.objects().semaphore(id).is_none());
    }
}
