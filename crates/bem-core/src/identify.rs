//! Identity Registry
//!
//! Hands out stable unique keys for shared objects (handlers, contexts)
//! that have no natural hashable identity. Keys are derived from the
//! `Rc` allocation and stay valid while the allocation is alive.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Unique key, rendered as `uniq<N>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniqId(u64);

impl UniqId {
    /// Raw counter value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UniqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uniq{}", self.0)
    }
}

struct Entry {
    id: UniqId,
    alive: Box<dyn Fn() -> bool>,
}

/// Registry mapping live allocations to their keys
pub struct Identity {
    counter: u64,
    entries: HashMap<usize, Entry>,
}

impl Identity {
    pub fn new() -> Self {
        Self {
            counter: 0,
            entries: HashMap::new(),
        }
    }

    /// Generate a fresh key not bound to any object
    pub fn next(&mut self) -> UniqId {
        self.counter += 1;
        UniqId(self.counter)
    }

    /// Key for `obj`, assigned on first request
    pub fn identify<T: ?Sized + 'static>(&mut self, obj: &Rc<T>) -> UniqId {
        let addr = address(obj);
        if let Some(entry) = self.entries.get(&addr) {
            if (entry.alive)() {
                return entry.id;
            }
        }

        // Address reuse after a drop must not inherit the old key
        self.prune();
        let id = self.next();
        let weak = Rc::downgrade(obj);
        self.entries.insert(
            addr,
            Entry {
                id,
                alive: Box::new(move || weak.strong_count() > 0),
            },
        );
        id
    }

    /// Key for `obj` only if one was assigned before
    pub fn get<T: ?Sized + 'static>(&self, obj: &Rc<T>) -> Option<UniqId> {
        self.entries
            .get(&address(obj))
            .filter(|entry| (entry.alive)())
            .map(|entry| entry.id)
    }

    /// Drop the key of `obj`
    pub fn forget<T: ?Sized + 'static>(&mut self, obj: &Rc<T>) {
        self.entries.remove(&address(obj));
    }

    /// Number of tracked objects
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn prune(&mut self) {
        self.entries.retain(|_, entry| (entry.alive)());
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}

fn address<T: ?Sized>(obj: &Rc<T>) -> usize {
    Rc::as_ptr(obj).cast::<()>() as usize
}

thread_local! {
    static IDENTITY: RefCell<Identity> = RefCell::new(Identity::new());
}

/// Key for `obj` from the thread's shared registry
pub fn identify<T: ?Sized + 'static>(obj: &Rc<T>) -> UniqId {
    IDENTITY.with(|identity| identity.borrow_mut().identify(obj))
}

/// Existing key for `obj`, never assigns a new one
pub fn identify_existing<T: ?Sized + 'static>(obj: &Rc<T>) -> Option<UniqId> {
    IDENTITY.with(|identity| identity.borrow().get(obj))
}

/// Fresh key from the thread's shared counter
pub fn next_uniq() -> UniqId {
    IDENTITY.with(|identity| identity.borrow_mut().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_is_stable() {
        let mut identity = Identity::new();
        let a = Rc::new(1);
        let first = identity.identify(&a);
        assert_eq!(identity.identify(&a), first);
        assert_eq!(identity.get(&a), Some(first));
    }

    #[test]
    fn test_distinct_objects_get_distinct_keys() {
        let mut identity = Identity::new();
        let a = Rc::new("a");
        let b = Rc::new("b");
        assert_ne!(identity.identify(&a), identity.identify(&b));
    }

    #[test]
    fn test_clones_share_key() {
        let mut identity = Identity::new();
        let a = Rc::new(5u8);
        let a2 = Rc::clone(&a);
        assert_eq!(identity.identify(&a), identity.identify(&a2));
    }

    #[test]
    fn test_get_without_assignment() {
        let identity = Identity::new();
        let a = Rc::new(());
        assert_eq!(identity.get(&a), None);
    }

    #[test]
    fn test_display() {
        let mut identity = Identity::new();
        let id = identity.next();
        assert_eq!(id.to_string(), "uniq1");
    }

    #[test]
    fn test_dead_entries_are_not_reported() {
        let mut identity = Identity::new();
        let a = Rc::new(String::from("temp"));
        identity.identify(&a);
        let probe = Rc::clone(&a);
        drop(a);
        assert!(identity.get(&probe).is_some());
        let addr_holder: Rc<dyn Fn()> = Rc::new(|| {});
        identity.identify(&addr_holder);
        drop(probe);
        identity.prune();
        assert_eq!(identity.len(), 1);
    }

    #[test]
    fn test_unsized_handlers() {
        let f: Rc<dyn Fn() -> u8> = Rc::new(|| 1);
        let id = identify(&f);
        assert_eq!(identify_existing(&f), Some(id));
    }
}
