//! Edge case tests for bem-dom
//!
//! Rejected mutations and what they leave behind.

use std::io;
use std::sync::{Arc, Mutex};

use bem_dom::{DomError, DomTree, NodeId};

/// Log sink shared with the subscriber
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn with_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let captured = Captured::default();
    let sink = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || sink.clone())
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, captured.text())
}

// ============================================================================
// REJECTED MUTATIONS
// ============================================================================

#[test]
fn test_rejected_insert_is_logged_and_harmless() {
    let mut tree = DomTree::new();
    let outer = tree.create_element("div");
    let inner = tree.create_element("span");
    tree.append_child(NodeId::ROOT, outer).unwrap();
    tree.append_child(outer, inner).unwrap();

    let (result, logs) = with_logs(|| tree.append_child(inner, outer));
    assert_eq!(result, Err(DomError::HierarchyRequest { parent: inner, child: outer }));
    assert!(logs.contains("rejected insertion"));
    assert_eq!(tree.parent(inner), Some(outer));
    assert_eq!(tree.parent(outer), Some(NodeId::ROOT));
}

#[test]
fn test_detach_is_logged_once() {
    let mut tree = DomTree::new();
    let div = tree.create_element("div");
    tree.append_child(NodeId::ROOT, div).unwrap();

    let ((), logs) = with_logs(|| {
        tree.detach(div);
        tree.detach(div);
    });
    assert_eq!(logs.matches("detached").count(), 1);
    assert_eq!(tree.parent(div), None);
}
