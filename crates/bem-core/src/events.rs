//! Event Emitter
//!
//! Named handler lists with deduplication, one-shot handlers and a `*`
//! wildcard that receives every event. The emitter is generic over the
//! handler type; callers decide how a handler is invoked so handlers can
//! receive borrowed context that the emitter itself cannot hold.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde_json::Value;

use crate::identify::{identify, UniqId};

/// Event name matched by every emission
pub const WILDCARD: &str = "*";

/// Handler verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Continue,
    /// Prevent default, stop propagation and skip remaining handlers
    Stop,
}

impl Flow {
    #[inline]
    pub fn is_stop(self) -> bool {
        self == Flow::Stop
    }
}

impl From<bool> for Flow {
    fn from(proceed: bool) -> Self {
        if proceed { Flow::Continue } else { Flow::Stop }
    }
}

impl From<()> for Flow {
    fn from(_: ()) -> Self {
        Flow::Continue
    }
}

/// Event record passed to handlers
#[derive(Debug, Clone)]
pub struct Event<T = ()> {
    kind: String,
    /// Emitting object
    pub target: Option<T>,
    /// Data bound when the current handler was registered
    pub data: Option<Value>,
    /// Value left by a handler for the emitter
    pub result: Option<Value>,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl<T> Event<T> {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            target: None,
            data: None,
            result: None,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn with_target(kind: impl Into<String>, target: T) -> Self {
        let mut event = Self::new(kind);
        event.target = Some(target);
        event
    }

    /// Event name (`type`)
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Identity of a registration: handler plus optional context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    pub handler: UniqId,
    pub ctx: Option<UniqId>,
}

/// A registered handler
pub struct Listener<F: ?Sized> {
    kind: String,
    key: ListenerKey,
    handler: Rc<F>,
    data: Option<Value>,
    once: bool,
}

impl<F: ?Sized> Listener<F> {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn key(&self) -> ListenerKey {
        self.key
    }

    pub fn handler(&self) -> &Rc<F> {
        &self.handler
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn is_once(&self) -> bool {
        self.once
    }
}

impl<F: ?Sized> Clone for Listener<F> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            key: self.key,
            handler: Rc::clone(&self.handler),
            data: self.data.clone(),
            once: self.once,
        }
    }
}

struct Storage<F: ?Sized> {
    keys: HashSet<ListenerKey>,
    list: Vec<Listener<F>>,
}

impl<F: ?Sized> Default for Storage<F> {
    fn default() -> Self {
        Self {
            keys: HashSet::new(),
            list: Vec::new(),
        }
    }
}

/// Registration options
#[derive(Debug, Clone, Default)]
pub struct Subscribe {
    pub data: Option<Value>,
    pub ctx: Option<UniqId>,
    pub once: bool,
}

impl Subscribe {
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn ctx(mut self, ctx: UniqId) -> Self {
        self.ctx = Some(ctx);
        self
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }
}

/// Event emitter over handlers of type `F`
pub struct Emitter<F: ?Sized> {
    storage: HashMap<String, Storage<F>>,
}

impl<F: ?Sized + 'static> Emitter<F> {
    pub fn new() -> Self {
        Self {
            storage: HashMap::new(),
        }
    }

    /// Subscribe to one or more space-separated events
    pub fn on(&mut self, events: &str, handler: Rc<F>) -> &mut Self {
        self.subscribe(events, handler, Subscribe::default())
    }

    /// Subscribe for a single delivery
    pub fn once(&mut self, events: &str, handler: Rc<F>) -> &mut Self {
        self.subscribe(events, handler, Subscribe::default().once())
    }

    /// Subscribe a map of event name to handler
    pub fn on_map<'a, I>(&mut self, map: I) -> &mut Self
    where
        I: IntoIterator<Item = (&'a str, Rc<F>)>,
    {
        for (events, handler) in map {
            self.on(events, handler);
        }
        self
    }

    /// Subscribe with bound data, context and once flag
    ///
    /// A handler already registered with the same context is not added
    /// again.
    pub fn subscribe(&mut self, events: &str, handler: Rc<F>, opts: Subscribe) -> &mut Self {
        let key = ListenerKey {
            handler: identify(&handler),
            ctx: opts.ctx,
        };
        for kind in events.split_whitespace() {
            let storage = self.storage.entry(kind.to_string()).or_default();
            if storage.keys.insert(key) {
                storage.list.push(Listener {
                    kind: kind.to_string(),
                    key,
                    handler: Rc::clone(&handler),
                    data: opts.data.clone(),
                    once: opts.once,
                });
            }
        }
        self
    }

    /// Unsubscribe
    ///
    /// Without `events` everything is removed. Without `handler` every
    /// handler of the named events is removed. Otherwise only the
    /// registration matching handler and context goes.
    pub fn un(&mut self, events: Option<&str>, handler: Option<&Rc<F>>, ctx: Option<UniqId>) -> &mut Self {
        let Some(events) = events else {
            self.storage.clear();
            return self;
        };
        for kind in events.split_whitespace() {
            match handler {
                None => {
                    self.storage.remove(kind);
                }
                Some(handler) => {
                    let key = ListenerKey {
                        handler: identify(handler),
                        ctx,
                    };
                    self.remove_key(kind, key);
                }
            }
        }
        self
    }

    /// Remove every handler
    pub fn clear(&mut self) {
        self.storage.clear();
    }

    pub fn has_listeners(&self, kind: &str) -> bool {
        [kind, WILDCARD]
            .iter()
            .any(|k| self.storage.get(*k).is_some_and(|s| !s.list.is_empty()))
    }

    /// Number of handlers registered for exactly `kind`
    pub fn count(&self, kind: &str) -> usize {
        self.storage.get(kind).map_or(0, |s| s.list.len())
    }

    /// Handlers for `kind` followed by wildcard handlers
    pub fn listeners(&self, kind: &str) -> Vec<Listener<F>> {
        let mut out = Vec::new();
        let mut kinds = vec![kind];
        if kind != WILDCARD {
            kinds.push(WILDCARD);
        }
        for k in kinds {
            if let Some(storage) = self.storage.get(k) {
                out.extend(storage.list.iter().cloned());
            }
        }
        out
    }

    /// Drop one-shot handlers that already fired
    pub fn forget(&mut self, fired: &[Listener<F>]) {
        for listener in fired {
            self.remove_key(&listener.kind, listener.key);
        }
    }

    fn remove_key(&mut self, kind: &str, key: ListenerKey) {
        if let Some(storage) = self.storage.get_mut(kind) {
            if storage.keys.remove(&key) {
                storage.list.retain(|l| l.key != key);
            }
            if storage.list.is_empty() {
                self.storage.remove(kind);
            }
        }
    }

    /// Emit by name; the event record is created only when someone listens
    pub fn emit<T, P: ?Sized>(
        &mut self,
        kind: &str,
        payload: &P,
        invoke: impl FnMut(&F, &mut Event<T>, &P) -> Flow,
    ) -> Option<Event<T>> {
        if !self.has_listeners(kind) {
            return None;
        }
        Some(self.emit_event(Event::new(kind), payload, invoke))
    }

    /// Emit a prepared event record
    pub fn emit_event<T, P: ?Sized>(
        &mut self,
        mut event: Event<T>,
        payload: &P,
        invoke: impl FnMut(&F, &mut Event<T>, &P) -> Flow,
    ) -> Event<T> {
        let listeners = self.listeners(event.kind());
        let fired = dispatch(&listeners, &mut event, payload, invoke);
        self.forget(&fired);
        event
    }
}

impl<F: ?Sized + 'static> Default for Emitter<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a snapshot of listeners against an event
///
/// Returns the one-shot listeners that fired so the owner can drop them.
/// A [`Flow::Stop`] marks the event and ends the dispatch.
pub fn dispatch<F: ?Sized, T, P: ?Sized>(
    listeners: &[Listener<F>],
    event: &mut Event<T>,
    payload: &P,
    mut invoke: impl FnMut(&F, &mut Event<T>, &P) -> Flow,
) -> Vec<Listener<F>> {
    let mut fired = Vec::new();
    for listener in listeners {
        event.data = listener.data.clone();
        let flow = invoke(&*listener.handler, event, payload);
        if listener.once {
            fired.push(listener.clone());
        }
        if flow.is_stop() {
            event.prevent_default();
            event.stop_propagation();
            break;
        }
    }
    fired
}

/// Plain callback for standalone emitters
pub type Callback = dyn Fn(&mut Event, &Value) -> Flow;

/// Wrap a closure as a [`Callback`]
pub fn callback<F>(f: F) -> Rc<Callback>
where
    F: Fn(&mut Event, &Value) -> Flow + 'static,
{
    Rc::new(f)
}

impl Emitter<Callback> {
    /// Emit to plain callbacks
    pub fn fire(&mut self, kind: &str, payload: &Value) -> Option<Event> {
        self.emit(kind, payload, |handler, event, payload| handler(event, payload))
    }
}
