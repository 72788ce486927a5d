use std::cell::Cell;
use std::rc::Rc;

use foundation::time::Millis;

/// Source of "now" for a viewer session.
pub trait Clock {
    fn now(&self) -> Millis;
}

/// Wall clock in epoch milliseconds.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Millis {
        #[cfg(target_arch = "wasm32")]
        {
            Millis(js_sys::Date::now().max(0.0) as u64)
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            let ms = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);
            Millis(ms)
        }
    }
}

/// Hand-driven clock. Clones share the same time, so a test can keep one
/// handle and advance the clock a session owns.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: Rc::new(Cell::new(start.0)),
        }
    }

    pub fn set(&self, t: Millis) {
        self.now.set(t.0);
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        Millis(self.now.get())
    }
}
