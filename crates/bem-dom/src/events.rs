//! DOM Events
//!
//! Events dispatched through the tree: they start at a target node and
//! bubble towards the document.

use serde_json::Value;

use crate::NodeId;

/// DOM event
#[derive(Debug, Clone)]
pub struct DomEvent {
    /// Event type, e.g. `click`
    pub kind: String,
    pub target: NodeId,
    /// Node whose listeners are running
    pub current_target: NodeId,
    pub bubbles: bool,
    pub cancelable: bool,
    /// Extra data supplied by the dispatcher
    pub detail: Value,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl DomEvent {
    /// Create a bubbling, cancelable event
    pub fn new(kind: impl Into<String>, target: NodeId) -> Self {
        Self {
            kind: kind.into(),
            target,
            current_target: target,
            bubbles: true,
            cancelable: true,
            detail: Value::Null,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }

    /// Event that only reaches its target
    pub fn non_bubbling(mut self) -> Self {
        self.bubbles = false;
        self
    }

    /// Prevent default action
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Stop propagation
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Check if default was prevented
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_event() {
        let event = DomEvent::new("click", NodeId(5)).with_detail(json!({"x": 1}));

        assert_eq!(event.kind, "click");
        assert_eq!(event.target, NodeId(5));
        assert_eq!(event.current_target, NodeId(5));
        assert!(event.bubbles);
        assert_eq!(event.detail["x"], 1);
    }

    #[test]
    fn test_cancel_and_stop() {
        let mut event = DomEvent::new("submit", NodeId(1));
        event.prevent_default();
        event.stop_propagation();
        assert!(event.is_default_prevented());
        assert!(event.is_propagation_stopped());

        let mut quiet = DomEvent::new("focus", NodeId(1)).non_bubbling();
        quiet.cancelable = false;
        quiet.prevent_default();
        assert!(!quiet.is_default_prevented());
        assert!(!quiet.bubbles);
    }
}
