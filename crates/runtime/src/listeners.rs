/// Handle returned by [`Listeners::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// Observer registry for one event type.
///
/// Listeners run in subscription order. Everything is single-threaded, so
/// callbacks are plain `FnMut` without `Send` bounds.
pub struct Listeners<E> {
    next_id: u64,
    entries: Vec<(ListenerId, Box<dyn FnMut(&E)>)>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<E> std::fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(lid, _)| *lid != id);
        self.entries.len() != before
    }

    /// Drops every listener. Call on teardown so repeated scene setups don't leak.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.entries {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Listeners;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn emits_in_subscription_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut l: Listeners<u32> = Listeners::new();

        let s1 = Rc::clone(&seen);
        l.subscribe(move |e| s1.borrow_mut().push(("a", *e)));
        let s2 = Rc::clone(&seen);
        l.subscribe(move |e| s2.borrow_mut().push(("b", *e)));

        l.emit(&7);
        assert_eq!(*seen.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn unsubscribe_and_clear() {
        let count = Rc::new(RefCell::new(0));
        let mut l: Listeners<()> = Listeners::new();
        let c = Rc::clone(&count);
        let id = l.subscribe(move |_| *c.borrow_mut() += 1);

        assert!(l.unsubscribe(id));
        assert!(!l.unsubscribe(id));
        l.emit(&());
        assert_eq!(*count.borrow(), 0);

        l.subscribe(|_| {});
        l.clear();
        assert!(l.is_empty());
    }
}
