//! Live bindings
//!
//! Delegated handlers keyed by event type and class. They run at the
//! scope node for events bubbling up from below it, walking from the
//! event target upwards and matching the innermost class first. The
//! first delegated event on a lazily initialized block constructs its
//! instance.
//!
//! Context subscriptions live here too: type-level listeners that only
//! hear instances whose nodes sit inside given context nodes.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use bem_core::modifier::mod_event_name;
use bem_core::naming::build_class;
use bem_core::{
    identify, listener, BlockEvent, BlockHost, BlockId, Ctx, Flow, Host, ListenerFn, ModPattern, ModVal,
    Payload, UniqId,
};
use bem_dom::{DomEvent, NodeId, Selector};

use crate::find::{BlockQuery, Direction};
use crate::{BemDom, DomHandler, NodeSet, RuntimeResult};

/// What a live binding listens on: the block itself or some of its
/// elements, optionally narrowed to a modifier value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveTarget {
    pub elems: Vec<String>,
    pub modifier: Option<(String, ModVal)>,
}

impl LiveTarget {
    /// The block's own nodes
    pub fn block() -> Self {
        Self::default()
    }

    /// Elements `names`, space separated
    pub fn elem(names: &str) -> Self {
        Self {
            elems: names.split_whitespace().map(str::to_string).collect(),
            modifier: None,
        }
    }

    pub fn with_mod(mut self, name: impl Into<String>, val: impl Into<ModVal>) -> Self {
        self.modifier = Some((name.into(), val.into()));
        self
    }

    fn classes(&self, block: &str) -> Vec<String> {
        let modifier = self.modifier.as_ref().map(|(n, v)| (n.as_str(), v));
        if self.elems.is_empty() {
            return vec![build_class(block, None, modifier)];
        }
        self.elems
            .iter()
            .map(|elem| build_class(block, Some(elem), modifier))
            .collect()
    }
}

/// Element names; an empty string targets the block itself
impl From<&str> for LiveTarget {
    fn from(names: &str) -> Self {
        LiveTarget::elem(names)
    }
}

#[derive(Clone)]
pub(crate) struct LiveEntry {
    block: String,
    key: Option<UniqId>,
    handler: Option<Rc<DomHandler>>,
    invoke_on_init: bool,
}

type ClassEntries = Vec<(String, Vec<LiveEntry>)>;

/// Event type to class to entries, both in registration order
#[derive(Default)]
pub(crate) struct LiveTable {
    events: HashMap<String, ClassEntries>,
}

impl LiveTable {
    fn has(&self, kind: &str) -> bool {
        self.events.contains_key(kind)
    }

    fn add(&mut self, kind: &str, class: &str, entry: LiveEntry) -> bool {
        let classes = self.events.entry(kind.to_string()).or_default();
        let i = match classes.iter().position(|(c, _)| c == class) {
            Some(i) => i,
            None => {
                classes.push((class.to_string(), Vec::new()));
                classes.len() - 1
            }
        };
        let entries = &mut classes[i].1;
        if entries
            .iter()
            .any(|e| e.block == entry.block && e.key == entry.key && e.invoke_on_init == entry.invoke_on_init)
        {
            return false;
        }
        entries.push(entry);
        true
    }

    fn remove(&mut self, kind: &str, class: &str, block: &str, key: Option<UniqId>) -> usize {
        let Some(classes) = self.events.get_mut(kind) else {
            return 0;
        };
        let mut removed = 0;
        for (c, entries) in classes.iter_mut().filter(|(c, _)| c == class) {
            let before = entries.len();
            entries.retain(|e| !(e.block == block && key.is_none_or(|k| e.key == Some(k))));
            removed += before - entries.len();
            tracing::trace!(class = %c, removed, "live entries removed");
        }
        classes.retain(|(_, entries)| !entries.is_empty());
        if classes.is_empty() {
            self.events.remove(kind);
        }
        removed
    }

    fn snapshot(&self, kind: &str) -> ClassEntries {
        self.events.get(kind).cloned().unwrap_or_default()
    }
}

type CtxHandlers = Vec<(UniqId, Rc<ListenerFn<BemDom>>)>;

/// `block:event` to context node to handlers
#[derive(Default)]
pub(crate) struct CtxTable {
    events: HashMap<String, Vec<(NodeId, CtxHandlers)>>,
}

impl BemDom {
    // ------------------------------------------------------------------
    // Delegated DOM events
    // ------------------------------------------------------------------

    /// Delegate `events` on `to` to every instance of `block`
    ///
    /// The instance under the event is constructed if needed and
    /// initialized before `handler` runs on it.
    pub fn live_bind_to(
        &mut self,
        block: &str,
        to: impl Into<LiveTarget>,
        events: &str,
        handler: Rc<DomHandler>,
    ) -> &mut Self {
        self.live_class_bind(block, &to.into(), events, Some(handler), false)
    }

    /// Construct instances of `block` on the first of `events`; `handler`
    /// runs only for the event that constructed the instance
    pub fn live_init_on_event(
        &mut self,
        block: &str,
        to: impl Into<LiveTarget>,
        events: &str,
        handler: Option<Rc<DomHandler>>,
    ) -> &mut Self {
        self.live_class_bind(block, &to.into(), events, handler, true)
    }

    fn live_class_bind(
        &mut self,
        block: &str,
        to: &LiveTarget,
        events: &str,
        handler: Option<Rc<DomHandler>>,
        invoke_on_init: bool,
    ) -> &mut Self {
        let key = handler.as_ref().map(|h| identify(h));
        for kind in events.split_whitespace() {
            if !self.live.has(kind) {
                tracing::debug!(event = kind, scope = %self.scope(), "delegating event at scope");
            }
            for class in to.classes(block) {
                let added = self.live.add(
                    kind,
                    &class,
                    LiveEntry {
                        block: block.to_string(),
                        key,
                        handler: handler.clone(),
                        invoke_on_init,
                    },
                );
                tracing::trace!(%block, event = kind, %class, added, "live binding");
            }
        }
        self
    }

    /// Remove delegated handlers of `block`; all of them for the events
    /// when `handler` is `None`
    pub fn live_unbind_from(
        &mut self,
        block: &str,
        to: impl Into<LiveTarget>,
        events: &str,
        handler: Option<&Rc<DomHandler>>,
    ) -> &mut Self {
        let key = handler.map(|h| identify(h));
        let to = to.into();
        let mut removed = 0;
        for kind in events.split_whitespace() {
            for class in to.classes(block) {
                removed += self.live.remove(kind, &class, block, key);
            }
        }
        tracing::debug!(%block, events, removed, "live bindings removed");
        self
    }

    /// Whether anything is delegated for `kind`
    pub fn has_live(&self, kind: &str) -> bool {
        self.live.has(kind)
    }

    /// Run delegated handlers for an event that reached the scope
    pub(crate) fn live_trigger(&mut self, event: &mut DomEvent) {
        let mut pending = self.live.snapshot(&event.kind);
        if pending.is_empty() {
            return;
        }
        let saved = event.current_target;
        let prevented_before = event.is_default_prevented();
        let mut cursor = Some(event.target);

        while let Some(node) = cursor {
            if pending.is_empty() {
                break;
            }
            let mut i = 0;
            while i < pending.len() {
                if !self.tree.has_class(node, &pending[i].0) {
                    i += 1;
                    continue;
                }
                let (class, entries) = pending.remove(i);
                event.current_target = node;

                let mut stop = false;
                for entry in &entries {
                    stop |= self.run_live_entry(entry, node, event).is_stop();
                }
                tracing::trace!(%class, %node, handlers = entries.len(), stop, "live class matched");
                if stop {
                    event.prevent_default();
                }
                // A handler that suppressed the default ends the walk too
                let suppressed = !prevented_before && event.is_default_prevented();
                if stop || suppressed || event.is_propagation_stopped() {
                    event.current_target = saved;
                    return;
                }
            }
            cursor = self.tree.parent(node);
        }
        event.current_target = saved;
    }

    fn run_live_entry(&mut self, entry: &LiveEntry, node: NodeId, event: &mut DomEvent) -> Flow {
        let Some(block_node) = Selector::class(&entry.block).closest(&self.tree, node) else {
            return Flow::Continue;
        };
        let (id, created) = match self.ensure_block(&entry.block, block_node, None, true) {
            Ok(Some(found)) => found,
            Ok(None) => return Flow::Continue,
            Err(err) => {
                tracing::warn!(node = %block_node, block = %entry.block, error = %err, "live initialization failed");
                return Flow::Continue;
            }
        };
        if entry.invoke_on_init {
            if !created {
                return Flow::Continue;
            }
        } else {
            self.ensure_inited(id);
        }
        match &entry.handler {
            Some(handler) => {
                let handler = Rc::clone(handler);
                handler(&mut self.block(id), event)
            }
            None => Flow::Continue,
        }
    }

    // ------------------------------------------------------------------
    // Lazy initialization on other blocks' events
    // ------------------------------------------------------------------

    /// Construct instances of `block` sharing nodes with an instance of
    /// `other` when it emits one of `events`
    pub fn live_init_on_block_event(
        &mut self,
        block: &str,
        events: &str,
        other: &str,
        handler: Option<Rc<ListenerFn<BemDom>>>,
    ) -> RuntimeResult<()> {
        self.live_block_event(block, events, other, handler, Direction::On)
    }

    /// Construct instances of `block` around an instance of `other` when
    /// it emits one of `events`
    pub fn live_init_on_block_inside_event(
        &mut self,
        block: &str,
        events: &str,
        other: &str,
        handler: Option<Rc<ListenerFn<BemDom>>>,
    ) -> RuntimeResult<()> {
        self.live_block_event(block, events, other, handler, Direction::Outside)
    }

    fn live_block_event(
        &mut self,
        block: &str,
        events: &str,
        other: &str,
        handler: Option<Rc<ListenerFn<BemDom>>>,
        direction: Direction,
    ) -> RuntimeResult<()> {
        let query = BlockQuery::new(block);
        let relay = listener(
            move |ctx: &mut Ctx<'_, BemDom>, event: &mut BlockEvent, payload: &Payload<NodeSet>| {
                let source = ctx.id();
                let found = ctx.host().find_blocks(source, None, &query, direction, false);
                if let Some(handler) = &handler {
                    for id in found {
                        if handler(&mut ctx.host().block(id), event, payload).is_stop() {
                            return Flow::Stop;
                        }
                    }
                }
                Flow::Continue
            },
        );
        self.on_type(other, events, relay)?;
        tracing::debug!(%block, %other, events, ?direction, "lazy initialization on block event");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Context subscriptions
    // ------------------------------------------------------------------

    /// Hear `events` of any `block` instance inside one of `ctx`
    pub fn on_ctx(&mut self, block: &str, ctx: &NodeSet, events: &str, handler: Rc<ListenerFn<BemDom>>) -> &mut Self {
        let key = identify(&handler);
        for kind in events.split_whitespace() {
            let contexts = self.ctx_events.events.entry(format!("{block}:{kind}")).or_default();
            for node in ctx {
                match contexts.iter_mut().find(|(n, _)| *n == node) {
                    Some((_, handlers)) => {
                        if !handlers.iter().any(|(k, _)| *k == key) {
                            handlers.push((key, Rc::clone(&handler)));
                        }
                    }
                    None => contexts.push((node, vec![(key, Rc::clone(&handler))])),
                }
            }
        }
        tracing::trace!(%block, events, contexts = ctx.len(), "context subscription");
        self
    }

    /// [`BemDom::on_ctx`] for a block modifier change
    pub fn on_ctx_mod(
        &mut self,
        block: &str,
        ctx: &NodeSet,
        mod_name: &str,
        val: impl Into<ModPattern>,
        handler: Rc<ListenerFn<BemDom>>,
    ) -> &mut Self {
        let event = mod_event_name(None, mod_name, &val.into());
        self.on_ctx(block, ctx, &event, handler)
    }

    /// Drop context subscriptions; all handlers for the events when
    /// `handler` is `None`
    pub fn un_ctx(
        &mut self,
        block: &str,
        ctx: &NodeSet,
        events: &str,
        handler: Option<&Rc<ListenerFn<BemDom>>>,
    ) -> &mut Self {
        let key = handler.map(|h| identify(h));
        for kind in events.split_whitespace() {
            let name = format!("{block}:{kind}");
            let Some(contexts) = self.ctx_events.events.get_mut(&name) else {
                continue;
            };
            for (node, handlers) in contexts.iter_mut() {
                if ctx.contains(*node) {
                    handlers.retain(|(k, _)| key.is_some_and(|key| key != *k));
                }
            }
            contexts.retain(|(_, handlers)| !handlers.is_empty());
            if contexts.is_empty() {
                self.ctx_events.events.remove(&name);
            }
        }
        self
    }

    /// Deliver an instance event to context subscribers whose context
    /// node contains the instance
    pub(crate) fn ctx_emit(&mut self, id: BlockId, event: &mut BlockEvent, payload: &Payload<NodeSet>) {
        let Some(inst) = self.registry().instance(id) else {
            return;
        };
        let name = format!("{}:{}", inst.name(), event.kind());
        let Some(contexts) = self.ctx_events.events.get(&name) else {
            return;
        };
        let contexts = contexts.clone();
        let nodes = inst.ext.nodes.clone();

        let mut remaining = contexts.len();
        let mut seen = HashSet::new();
        let mut handlers = Vec::new();
        for start in &nodes {
            let mut cursor = Some(start);
            while let Some(node) = cursor {
                if remaining == 0 || !seen.insert(node) {
                    break;
                }
                if let Some((_, found)) = contexts.iter().find(|(n, _)| *n == node) {
                    handlers.extend(found.iter().map(|(_, h)| Rc::clone(h)));
                    remaining -= 1;
                }
                cursor = self
                    .tree
                    .parent(node)
                    .or_else(|| self.node_parents.get(&node).copied());
            }
        }

        for handler in handlers {
            if handler(&mut self.block(id), event, payload).is_stop() {
                event.prevent_default();
                event.stop_propagation();
            }
            if event.is_propagation_stopped() {
                break;
            }
        }
    }
}
