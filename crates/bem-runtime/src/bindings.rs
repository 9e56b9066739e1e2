//! Direct bindings
//!
//! Handlers a block binds to its own nodes, its elements, the document
//! or the window, and the dispatcher that bubbles an event through them.

use std::rc::Rc;

use bem_core::{identify, BlockHost, BlockId, Ctx, Flow, UniqId};
use bem_dom::{DomEvent, NodeId};

use crate::BemDom;

/// DOM event handler, runs on the owning block
pub type DomHandler = dyn for<'a, 'b> Fn(&'a mut Ctx<'b, BemDom>, &mut DomEvent) -> Flow;

/// Wrap a closure as a DOM event handler
pub fn dom_handler<F>(f: F) -> Rc<DomHandler>
where
    F: Fn(&mut Ctx<'_, BemDom>, &mut DomEvent) -> Flow + 'static,
{
    Rc::new(f)
}

/// Where a handler is bound; the document is `Node(NodeId::ROOT)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Node(NodeId),
    Window,
}

impl Target {
    pub fn document() -> Self {
        Target::Node(NodeId::ROOT)
    }
}

impl From<NodeId> for Target {
    fn from(node: NodeId) -> Self {
        Target::Node(node)
    }
}

pub(crate) struct Binding {
    pub(crate) target: Target,
    pub(crate) kind: String,
    pub(crate) owner: BlockId,
    key: UniqId,
    handler: Rc<DomHandler>,
}

impl BemDom {
    /// Bind `handler` for each event in `events` on every target
    pub fn bind(&mut self, owner: BlockId, targets: &[Target], events: &str, handler: Rc<DomHandler>) {
        let key = identify(&handler);
        for &target in targets {
            for kind in events.split_whitespace() {
                self.bindings.push(Binding {
                    target,
                    kind: kind.to_string(),
                    owner,
                    key,
                    handler: Rc::clone(&handler),
                });
            }
        }
        tracing::trace!(%owner, targets = targets.len(), events, "bound handlers");
    }

    /// Remove handlers `owner` bound; every handler for the events when
    /// `handler` is `None`
    pub fn unbind(&mut self, owner: BlockId, targets: &[Target], events: &str, handler: Option<&Rc<DomHandler>>) {
        let key = handler.map(|h| identify(h));
        let kinds: Vec<&str> = events.split_whitespace().collect();
        let before = self.bindings.len();
        self.bindings.retain(|b| {
            !(b.owner == owner
                && targets.contains(&b.target)
                && kinds.contains(&b.kind.as_str())
                && key.is_none_or(|k| k == b.key))
        });
        tracing::trace!(%owner, removed = before - self.bindings.len(), events, "unbound handlers");
    }

    /// Number of direct handlers for `kind` on `target`
    pub fn bound_count(&self, target: Target, kind: &str) -> usize {
        self.bindings
            .iter()
            .filter(|b| b.target == target && b.kind == kind)
            .count()
    }

    /// Dispatch a bubbling event of `kind` at `target`
    pub fn dispatch(&mut self, target: NodeId, kind: &str) -> DomEvent {
        self.dispatch_event(DomEvent::new(kind, target))
    }

    /// Run an event from its target up to the window
    ///
    /// Direct handlers run per node in binding order. Delegated handlers
    /// run at the scope node, after its direct ones. A handler returning
    /// [`Flow::Stop`] prevents the default action and stops propagation
    /// once the current node is done.
    pub fn dispatch_event(&mut self, mut event: DomEvent) -> DomEvent {
        let mut path: Vec<Target> = vec![Target::Node(event.target)];
        if event.bubbles {
            path.extend(self.tree.ancestors(event.target).map(Target::Node));
            if self.tree.is_connected(event.target) {
                path.push(Target::Window);
            }
        }
        tracing::trace!(kind = %event.kind, target = %event.target, depth = path.len(), "dispatching");

        for target in path {
            if let Target::Node(node) = target {
                event.current_target = node;
            }
            self.run_direct(target, &mut event);
            if target == Target::Node(self.scope()) {
                self.live_trigger(&mut event);
            }
            if event.is_propagation_stopped() {
                break;
            }
        }
        event
    }

    fn run_direct(&mut self, target: Target, event: &mut DomEvent) {
        let handlers: Vec<(BlockId, Rc<DomHandler>)> = self
            .bindings
            .iter()
            .filter(|b| b.target == target && b.kind == event.kind)
            .map(|b| (b.owner, Rc::clone(&b.handler)))
            .collect();

        for (owner, handler) in handlers {
            if !self.is_alive(owner) {
                continue;
            }
            if handler(&mut self.block(owner), event).is_stop() {
                event.prevent_default();
                event.stop_propagation();
            }
        }
    }
}
