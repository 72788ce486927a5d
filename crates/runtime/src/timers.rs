use foundation::time::Millis;

/// Named one-shot timers for a single-threaded event loop.
///
/// Each slot key holds at most one pending deadline:
/// - `arm` on an armed key replaces its deadline (no duplicate timers).
/// - `cancel` is idempotent.
/// - `poll` fires due slots in `(deadline, key)` order and disarms them.
///
/// Nothing here reads a clock; the host passes `now` in, which keeps the
/// behavior replayable in tests.
#[derive(Debug, Clone)]
pub struct TimerSlots<K> {
    slots: Vec<(K, Millis)>,
}

impl<K> Default for TimerSlots<K> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<K: Copy + Ord> TimerSlots<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `key` to fire at `deadline`.
    ///
    /// Returns `true` if an existing deadline for `key` was replaced.
    pub fn arm(&mut self, key: K, deadline: Millis) -> bool {
        if let Some(slot) = self.slots.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = deadline;
            return true;
        }
        self.slots.push((key, deadline));
        false
    }

    pub fn cancel(&mut self, key: K) -> bool {
        let before = self.slots.len();
        self.slots.retain(|(k, _)| *k != key);
        self.slots.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.slots.clear();
    }

    pub fn is_armed(&self, key: K) -> bool {
        self.slots.iter().any(|(k, _)| *k == key)
    }

    pub fn deadline(&self, key: K) -> Option<Millis> {
        self.slots.iter().find(|(k, _)| *k == key).map(|(_, d)| *d)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Removes and returns every slot due at or before `now`.
    pub fn poll(&mut self, now: Millis) -> Vec<K> {
        let mut due: Vec<(K, Millis)> = Vec::new();
        self.slots.retain(|(k, d)| {
            if *d <= now {
                due.push((*k, *d));
                false
            } else {
                true
            }
        });
        due.sort_by(|(ka, da), (kb, db)| da.cmp(db).then_with(|| ka.cmp(kb)));
        due.into_iter().map(|(k, _)| k).collect()
    }

    /// Pops the earliest due slot, if any.
    ///
    /// Handlers that arm new timers while draining should loop on this rather
    /// than `poll`, so freshly armed deadlines that are already due still fire.
    pub fn pop_due(&mut self, now: Millis) -> Option<K> {
        let mut best: Option<usize> = None;
        for (idx, (k, d)) in self.slots.iter().enumerate() {
            if *d > now {
                continue;
            }
            match best {
                None => best = Some(idx),
                Some(b) => {
                    let (bk, bd) = self.slots[b];
                    if d.cmp(&bd).then_with(|| k.cmp(&bk)).is_lt() {
                        best = Some(idx);
                    }
                }
            }
        }
        let idx = best?;
        Some(self.slots.swap_remove(idx).0)
    }
}
