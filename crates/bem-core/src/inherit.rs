//! Class Composer
//!
//! Builds types out of a primary ancestor, optional mixins and tables of
//! instance and static members. A member that overrides another keeps a
//! link to the implementation it replaced; that link is what a `base`
//! call resolves to.
//!
//! Lookups walk the parent chain at call time, so members added to an
//! ancestor later are visible to its descendants. The same holds for
//! `base`: an override of an inherited member asks the parent again on
//! every call. Only amendments of one type link to each other directly.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::error::{BemError, BemResult};

/// Key type of a member table
pub trait MemberName: Clone + Eq + Hash + fmt::Debug {
    /// Key under which a type keeps its constructor
    fn constructor() -> Self;
}

type Resolver<M> = Rc<dyn Fn() -> Option<Rc<Slot<M>>>>;

/// Where an override finds the implementation it replaced
enum Base<M> {
    None,
    /// An earlier amendment of the same type
    Own(Rc<Slot<M>>),
    /// The parent's member under the same key, looked up on demand
    Inherited(Resolver<M>),
}

/// A defined member and the implementation it overrides
pub struct Slot<M> {
    value: M,
    base: Base<M>,
}

impl<M> Slot<M> {
    pub fn value(&self) -> &M {
        &self.value
    }

    /// The overridden implementation as it resolves right now
    pub fn base(&self) -> Option<Rc<Slot<M>>> {
        match &self.base {
            Base::None => None,
            Base::Own(slot) => Some(Rc::clone(slot)),
            Base::Inherited(resolve) => resolve(),
        }
    }

    /// This slot followed by every slot it overrides
    pub fn chain(self: &Rc<Self>) -> SlotChain<M> {
        SlotChain {
            next: Some(Rc::clone(self)),
        }
    }
}

pub struct SlotChain<M> {
    next: Option<Rc<Slot<M>>>,
}

impl<M> Iterator for SlotChain<M> {
    type Item = Rc<Slot<M>>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.base();
        Some(current)
    }
}

type Table<K, M> = RefCell<HashMap<K, Rc<Slot<M>>>>;

/// A composed type
pub struct Class<K, M, X = ()> {
    name: String,
    parent: Option<Rc<Class<K, M, X>>>,
    members: Table<K, M>,
    statics: Table<K, M>,
    ext: X,
}

impl<K: MemberName + 'static, M: Clone + 'static, X: 'static> Class<K, M, X> {
    /// A type without ancestors
    pub fn root(name: impl Into<String>, ext: X) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            parent: None,
            members: RefCell::new(HashMap::new()),
            statics: RefCell::new(HashMap::new()),
            ext,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Rc<Self>> {
        self.parent.as_ref()
    }

    /// Extra data carried by the type
    pub fn ext(&self) -> &X {
        &self.ext
    }

    /// Instance member, own or inherited
    pub fn lookup(&self, key: &K) -> Option<Rc<Slot<M>>> {
        if let Some(slot) = self.members.borrow().get(key) {
            return Some(Rc::clone(slot));
        }
        self.parent.as_ref().and_then(|p| p.lookup(key))
    }

    /// Static member, own or inherited
    pub fn lookup_static(&self, key: &K) -> Option<Rc<Slot<M>>> {
        if let Some(slot) = self.statics.borrow().get(key) {
            return Some(Rc::clone(slot));
        }
        self.parent.as_ref().and_then(|p| p.lookup_static(key))
    }

    pub fn has_own(&self, key: &K) -> bool {
        self.members.borrow().contains_key(key)
    }

    pub fn own_keys(&self) -> Vec<K> {
        self.members.borrow().keys().cloned().collect()
    }

    pub fn own_static_keys(&self) -> Vec<K> {
        self.statics.borrow().keys().cloned().collect()
    }

    /// Constructor, own or inherited; `None` means a no-op
    pub fn constructor(&self) -> Option<Rc<Slot<M>>> {
        self.lookup(&K::constructor())
    }

    /// True when `name` is this type or one of its ancestors
    pub fn is_a(&self, name: &str) -> bool {
        self.name == name || self.parent.as_ref().is_some_and(|p| p.is_a(name))
    }

    /// This type followed by its ancestors
    pub fn lineage(self: &Rc<Self>) -> Vec<Rc<Self>> {
        let mut out = vec![Rc::clone(self)];
        let mut current = self.parent.clone();
        while let Some(class) = current {
            current = class.parent.clone();
            out.push(class);
        }
        out
    }

    fn define(&self, key: K, value: M) {
        let base = self.base_for(&key, false);
        self.members.borrow_mut().insert(key, Rc::new(Slot { value, base }));
    }

    fn define_static(&self, key: K, value: M) {
        let base = self.base_for(&key, true);
        self.statics.borrow_mut().insert(key, Rc::new(Slot { value, base }));
    }

    fn base_for(&self, key: &K, statics: bool) -> Base<M> {
        let table = if statics { &self.statics } else { &self.members };
        if let Some(own) = table.borrow().get(key) {
            return Base::Own(Rc::clone(own));
        }
        let Some(parent) = self.parent.clone() else {
            return Base::None;
        };
        let key = key.clone();
        Base::Inherited(Rc::new(move || {
            if statics {
                parent.lookup_static(&key)
            } else {
                parent.lookup(&key)
            }
        }))
    }

    /// Copy the own members of `other` into this type
    fn absorb(&self, other: &Self) {
        let members: Vec<(K, M)> = other
            .members
            .borrow()
            .iter()
            .map(|(k, slot)| (k.clone(), slot.value.clone()))
            .collect();
        let statics: Vec<(K, M)> = other
            .statics
            .borrow()
            .iter()
            .map(|(k, slot)| (k.clone(), slot.value.clone()))
            .collect();
        self.amend(members, statics);
    }

    /// Override members in place
    ///
    /// A new member's base is the previous own member under its key,
    /// or else whatever the parent resolves the key to when called.
    pub fn amend(&self, members: Vec<(K, M)>, statics: Vec<(K, M)>) {
        for (key, value) in members {
            self.define(key, value);
        }
        for (key, value) in statics {
            self.define_static(key, value);
        }
    }
}

impl<K, M, X> fmt::Debug for Class<K, M, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.clone()))
            .finish()
    }
}

/// Compose a new type
///
/// The first base is the primary ancestor; later bases are mixins whose
/// own members are layered on top of it, in order, before `members`.
pub fn compose<K, M, X>(
    name: impl Into<String>,
    bases: &[Rc<Class<K, M, X>>],
    members: Vec<(K, M)>,
    statics: Vec<(K, M)>,
    ext: X,
) -> Rc<Class<K, M, X>>
where
    K: MemberName + 'static,
    M: Clone + 'static,
    X: Default + 'static,
{
    let parent = match bases {
        [] => None,
        [primary] => Some(Rc::clone(primary)),
        [primary, mixins @ ..] => Some(mixed(primary, mixins)),
    };
    let class = Rc::new(Class {
        name: name.into(),
        parent,
        members: RefCell::new(HashMap::new()),
        statics: RefCell::new(HashMap::new()),
        ext,
    });
    class.amend(members, statics);
    class
}

/// Amend an existing type in place, mixins first
pub fn compose_self<K, M, X>(
    class: &Rc<Class<K, M, X>>,
    mixins: &[Rc<Class<K, M, X>>],
    members: Vec<(K, M)>,
    statics: Vec<(K, M)>,
) where
    K: MemberName + 'static,
    M: Clone + 'static,
    X: 'static,
{
    for mixin in mixins {
        class.absorb(mixin);
    }
    class.amend(members, statics);
}

fn mixed<K, M, X>(primary: &Rc<Class<K, M, X>>, mixins: &[Rc<Class<K, M, X>>]) -> Rc<Class<K, M, X>>
where
    K: MemberName + 'static,
    M: Clone + 'static,
    X: Default + 'static,
{
    let layer = Rc::new(Class {
        name: primary.name.clone(),
        parent: Some(Rc::clone(primary)),
        members: RefCell::new(HashMap::new()),
        statics: RefCell::new(HashMap::new()),
        ext: X::default(),
    });
    for mixin in mixins {
        layer.absorb(mixin);
    }
    layer
}

/// Name-indexed set of types
pub struct ClassTable<K, M, X = ()> {
    classes: HashMap<String, Rc<Class<K, M, X>>>,
}

impl<K: MemberName + 'static, M: Clone + 'static, X: 'static> ClassTable<K, M, X> {
    pub fn new() -> Self {
        Self {
            classes: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Rc<Class<K, M, X>>> {
        self.classes.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn insert(&mut self, class: Rc<Class<K, M, X>>) -> Option<Rc<Class<K, M, X>>> {
        self.classes.insert(class.name().to_string(), class)
    }

    /// Look up an ancestor required by `requested_by`
    pub fn resolve(&self, name: &str, requested_by: &str) -> BemResult<Rc<Class<K, M, X>>> {
        self.get(name).ok_or_else(|| BemError::TypeResolution {
            ancestor: name.to_string(),
            requested_by: requested_by.to_string(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl<K: MemberName + 'static, M: Clone + 'static, X: 'static> Default for ClassTable<K, M, X> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl MemberName for &'static str {
        fn constructor() -> Self {
            "__constructor"
        }
    }

    type TestClass = Class<&'static str, i32>;

    fn values(slot: &Rc<Slot<i32>>) -> Vec<i32> {
        slot.chain().map(|s| *s.value()).collect()
    }

    #[test]
    fn test_override_links_to_base() {
        let a = TestClass::root("a", ());
        a.amend(vec![("f", 1)], vec![]);
        let b = compose("b", &[Rc::clone(&a)], vec![("f", 2)], vec![], ());
        let slot = b.lookup(&"f").unwrap();
        assert_eq!(values(&slot), vec![2, 1]);
        assert_eq!(b.parent().unwrap().name(), "a");
    }

    #[test]
    fn test_inherited_member_without_override() {
        let a = TestClass::root("a", ());
        a.amend(vec![("g", 7)], vec![("s", 9)]);
        let b = compose("b", &[Rc::clone(&a)], vec![], vec![], ());
        assert_eq!(*b.lookup(&"g").unwrap().value(), 7);
        assert_eq!(*b.lookup_static(&"s").unwrap().value(), 9);
        assert!(!b.has_own(&"g"));
    }

    #[test]
    fn test_mixins_layer_in_order() {
        let base = TestClass::root("base", ());
        base.amend(vec![("f", 1)], vec![]);
        let m1 = TestClass::root("m1", ());
        m1.amend(vec![("f", 10)], vec![]);
        let m2 = TestClass::root("m2", ());
        m2.amend(vec![("f", 20), ("h", 5)], vec![]);

        let c = compose("c", &[base, m1, m2], vec![("f", 100)], vec![], ());
        let slot = c.lookup(&"f").unwrap();
        assert_eq!(values(&slot), vec![100, 20, 10, 1]);
        assert_eq!(*c.lookup(&"h").unwrap().value(), 5);
        assert!(c.is_a("base"));
    }

    #[test]
    fn test_amend_in_place_chains() {
        let a = TestClass::root("a", ());
        a.amend(vec![("f", 1)], vec![]);
        compose_self(&a, &[], vec![("f", 2)], vec![]);
        compose_self(&a, &[], vec![("f", 3)], vec![]);
        assert_eq!(values(&a.lookup(&"f").unwrap()), vec![3, 2, 1]);
    }

    #[test]
    fn test_inherited_base_follows_parent_amendment() {
        let a = TestClass::root("a", ());
        a.amend(vec![("f", 1)], vec![("s", 1)]);
        let b = compose("b", &[Rc::clone(&a)], vec![("f", 10)], vec![("s", 10)], ());
        compose_self(&a, &[], vec![("f", 2)], vec![("s", 2)]);
        assert_eq!(values(&b.lookup(&"f").unwrap()), vec![10, 2, 1]);
        assert_eq!(values(&b.lookup_static(&"s").unwrap()), vec![10, 2, 1]);
    }

    #[test]
    fn test_base_appears_when_parent_gains_member() {
        let a = TestClass::root("a", ());
        let b = compose("b", &[Rc::clone(&a)], vec![("f", 10)], vec![], ());
        assert!(b.lookup(&"f").unwrap().base().is_none());
        a.amend(vec![("f", 1)], vec![]);
        assert_eq!(values(&b.lookup(&"f").unwrap()), vec![10, 1]);
    }

    #[test]
    fn test_constructor_inherited() {
        let a = TestClass::root("a", ());
        assert!(a.constructor().is_none());
        a.amend(vec![("__constructor", 1)], vec![]);
        let b = compose("b", &[Rc::clone(&a)], vec![], vec![], ());
        assert_eq!(*b.constructor().unwrap().value(), 1);
    }

    #[test]
    fn test_table_resolve() {
        let mut table: ClassTable<&'static str, i32> = ClassTable::new();
        table.insert(TestClass::root("a", ()));
        assert!(table.resolve("a", "b").is_ok());
        let err = table.resolve("missing", "b").unwrap_err();
        assert!(matches!(err, BemError::TypeResolution { ref ancestor, .. } if ancestor == "missing"));
    }

    #[test]
    fn test_lineage() {
        let a = TestClass::root("a", ());
        let b = compose("b", &[Rc::clone(&a)], vec![], vec![], ());
        let c = compose("c", &[Rc::clone(&b)], vec![], vec![], ());
        let names: Vec<String> = c.lineage().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }
}
