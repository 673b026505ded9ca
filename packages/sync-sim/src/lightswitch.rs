//! The lightswitch idiom: first one in locks, last one out unlocks.

use rand::Rng;

use crate::control::ThreadControl;
use crate::ids::ThreadId;
use crate::semaphore::Semaphore;

#[derive(Clone, Debug)]
pub struct Lightswitch {
    counter: u32,
    mutex: Semaphore,
}

impl Default for Lightswitch {
    fn default() -> Self {
        Lightswitch::new()
    }
}

impl Lightswitch {
    pub fn new() -> Self {
        Lightswitch {
            counter: 0,
            mutex: Semaphore::new(1),
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn mutex(&self) -> &Semaphore {
        &self.mutex
    }

    /// Enter the room. The first thread in waits on `semaphore`.
    pub fn lock<R: Rng + ?Sized>(
        &mut self,
        semaphore: &mut Semaphore,
        caller: ThreadId,
        control: &mut dyn ThreadControl,
        rng: &mut R,
    ) {
        self.mutex.wait(caller, control);
        self.counter += 1;
        if self.counter == 1 {
            semaphore.wait(caller, control);
        }
        self.mutex.signal(1, control, rng);
    }

    /// Leave the room. The last thread out signals `semaphore`.
    pub fn unlock<R: Rng + ?Sized>(
        &mut self,
        semaphore: &mut Semaphore,
        caller: ThreadId,
        control: &mut dyn ThreadControl,
        rng: &mut R,
    ) {
        self.mutex.wait(caller, control);
        self.counter = self.counter.saturating_sub(1);
        if self.counter == 0 {
            semaphore.signal(1, control, rng);
        }
        self.mutex.signal(1, control, rng);
    }
}
