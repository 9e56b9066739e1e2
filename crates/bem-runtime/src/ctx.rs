//! DOM methods on a block context
//!
//! [`DomCtx`] gives a handler or method running on a DOM-bound instance
//! direct access to its nodes, elements, related blocks and bindings.

use std::rc::Rc;

use bem_core::{BlockId, Ctx, ModVal};
use bem_dom::NodeId;
use serde_json::{Map, Value};

use crate::{BemDom, BlockQuery, DomHandler, NodeSet, Target};

pub trait DomCtx {
    /// Nodes the instance is bound to
    fn dom_elem(&self) -> NodeSet;
    fn uniq_id(&self) -> Option<String>;

    fn find_elem(&mut self, names: &str) -> NodeSet;
    fn find_elem_mod(&mut self, names: &str, mod_name: &str, mod_val: impl Into<ModVal>) -> NodeSet;
    /// Lookup under `ctx`; `strict` skips nested blocks of the same type
    fn find_elem_in(&mut self, ctx: &NodeSet, names: &str, strict: bool) -> NodeSet;
    fn elem(&mut self, names: &str) -> NodeSet;
    fn elem_mod(&mut self, names: &str, mod_name: &str, mod_val: impl Into<ModVal>) -> NodeSet;
    fn closest_elem(&self, node: NodeId, name: &str) -> Option<NodeId>;
    fn elem_params(&mut self, elem: &NodeSet) -> Map<String, Value>;
    fn drop_elem_cache(&mut self, names: Option<&str>) -> &mut Self;
    fn contains_node(&self, node: NodeId) -> bool;

    fn find_blocks_inside(&mut self, elem: Option<&str>, query: impl Into<BlockQuery>) -> Vec<BlockId>;
    fn find_block_inside(&mut self, elem: Option<&str>, query: impl Into<BlockQuery>) -> Option<BlockId>;
    fn find_blocks_outside(&mut self, elem: Option<&str>, query: impl Into<BlockQuery>) -> Vec<BlockId>;
    fn find_block_outside(&mut self, elem: Option<&str>, query: impl Into<BlockQuery>) -> Option<BlockId>;
    fn find_blocks_on(&mut self, elem: Option<&str>, query: impl Into<BlockQuery>) -> Vec<BlockId>;
    fn find_block_on(&mut self, elem: Option<&str>, query: impl Into<BlockQuery>) -> Option<BlockId>;

    /// Bind to the instance's own nodes
    fn bind_to(&mut self, events: &str, handler: Rc<DomHandler>) -> &mut Self;
    fn bind_to_elem(&mut self, elem: &str, events: &str, handler: Rc<DomHandler>) -> &mut Self;
    fn bind_to_nodes(&mut self, nodes: &NodeSet, events: &str, handler: Rc<DomHandler>) -> &mut Self;
    fn bind_to_doc(&mut self, events: &str, handler: Rc<DomHandler>) -> &mut Self;
    fn bind_to_win(&mut self, events: &str, handler: Rc<DomHandler>) -> &mut Self;
    fn unbind_from(&mut self, events: &str, handler: Option<&Rc<DomHandler>>) -> &mut Self;
    fn unbind_from_elem(&mut self, elem: &str, events: &str, handler: Option<&Rc<DomHandler>>) -> &mut Self;
    fn unbind_from_nodes(&mut self, nodes: &NodeSet, events: &str, handler: Option<&Rc<DomHandler>>) -> &mut Self;
    fn unbind_from_doc(&mut self, events: &str, handler: Option<&Rc<DomHandler>>) -> &mut Self;
    fn unbind_from_win(&mut self, events: &str, handler: Option<&Rc<DomHandler>>) -> &mut Self;
}

fn targets(nodes: &NodeSet) -> Vec<Target> {
    nodes.iter().map(Target::Node).collect()
}

impl DomCtx for Ctx<'_, BemDom> {
    fn dom_elem(&self) -> NodeSet {
        self.host_ref().block_nodes(self.id())
    }

    fn uniq_id(&self) -> Option<String> {
        self.ext().map(|ext| ext.uniq_id().to_string())
    }

    fn find_elem(&mut self, names: &str) -> NodeSet {
        let id = self.id();
        self.host().find_elem(id, names)
    }

    fn find_elem_mod(&mut self, names: &str, mod_name: &str, mod_val: impl Into<ModVal>) -> NodeSet {
        let id = self.id();
        let val = mod_val.into();
        self.host().find_elem_in(id, None, names, Some((mod_name, &val)), false)
    }

    fn find_elem_in(&mut self, ctx: &NodeSet, names: &str, strict: bool) -> NodeSet {
        let id = self.id();
        self.host().find_elem_in(id, Some(ctx), names, None, strict)
    }

    fn elem(&mut self, names: &str) -> NodeSet {
        let id = self.id();
        self.host().elem(id, names)
    }

    fn elem_mod(&mut self, names: &str, mod_name: &str, mod_val: impl Into<ModVal>) -> NodeSet {
        let id = self.id();
        let val = mod_val.into();
        self.host().elem_with_mod(id, names, Some((mod_name, &val)))
    }

    fn closest_elem(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.host_ref().closest_elem(self.id(), node, name)
    }

    fn elem_params(&mut self, elem: &NodeSet) -> Map<String, Value> {
        let id = self.id();
        self.host().elem_params(id, elem)
    }

    fn drop_elem_cache(&mut self, names: Option<&str>) -> &mut Self {
        let id = self.id();
        self.host().drop_elem_cache(id, names, None);
        self
    }

    fn contains_node(&self, node: NodeId) -> bool {
        self.host_ref().contains_node(self.id(), node)
    }

    fn find_blocks_inside(&mut self, elem: Option<&str>, query: impl Into<BlockQuery>) -> Vec<BlockId> {
        let id = self.id();
        self.host().find_blocks_inside(id, elem, query)
    }

    fn find_block_inside(&mut self, elem: Option<&str>, query: impl Into<BlockQuery>) -> Option<BlockId> {
        let id = self.id();
        self.host().find_block_inside(id, elem, query)
    }

    fn find_blocks_outside(&mut self, elem: Option<&str>, query: impl Into<BlockQuery>) -> Vec<BlockId> {
        let id = self.id();
        self.host().find_blocks_outside(id, elem, query)
    }

    fn find_block_outside(&mut self, elem: Option<&str>, query: impl Into<BlockQuery>) -> Option<BlockId> {
        let id = self.id();
        self.host().find_block_outside(id, elem, query)
    }

    fn find_blocks_on(&mut self, elem: Option<&str>, query: impl Into<BlockQuery>) -> Vec<BlockId> {
        let id = self.id();
        self.host().find_blocks_on(id, elem, query)
    }

    fn find_block_on(&mut self, elem: Option<&str>, query: impl Into<BlockQuery>) -> Option<BlockId> {
        let id = self.id();
        self.host().find_block_on(id, elem, query)
    }

    fn bind_to(&mut self, events: &str, handler: Rc<DomHandler>) -> &mut Self {
        let nodes = self.dom_elem();
        self.bind_to_nodes(&nodes, events, handler)
    }

    fn bind_to_elem(&mut self, elem: &str, events: &str, handler: Rc<DomHandler>) -> &mut Self {
        let nodes = self.elem(elem);
        self.bind_to_nodes(&nodes, events, handler)
    }

    fn bind_to_nodes(&mut self, nodes: &NodeSet, events: &str, handler: Rc<DomHandler>) -> &mut Self {
        let id = self.id();
        self.host().bind(id, &targets(nodes), events, handler);
        self
    }

    fn bind_to_doc(&mut self, events: &str, handler: Rc<DomHandler>) -> &mut Self {
        let id = self.id();
        if let Some(ext) = self.ext_mut() {
            ext.need_special_unbind = true;
        }
        self.host().bind(id, &[Target::document()], events, handler);
        self
    }

    fn bind_to_win(&mut self, events: &str, handler: Rc<DomHandler>) -> &mut Self {
        let id = self.id();
        if let Some(ext) = self.ext_mut() {
            ext.need_special_unbind = true;
        }
        self.host().bind(id, &[Target::Window], events, handler);
        self
    }

    fn unbind_from(&mut self, events: &str, handler: Option<&Rc<DomHandler>>) -> &mut Self {
        let nodes = self.dom_elem();
        self.unbind_from_nodes(&nodes, events, handler)
    }

    fn unbind_from_elem(&mut self, elem: &str, events: &str, handler: Option<&Rc<DomHandler>>) -> &mut Self {
        let nodes = self.elem(elem);
        self.unbind_from_nodes(&nodes, events, handler)
    }

    fn unbind_from_nodes(&mut self, nodes: &NodeSet, events: &str, handler: Option<&Rc<DomHandler>>) -> &mut Self {
        let id = self.id();
        self.host().unbind(id, &targets(nodes), events, handler);
        self
    }

    fn unbind_from_doc(&mut self, events: &str, handler: Option<&Rc<DomHandler>>) -> &mut Self {
        let id = self.id();
        self.host().unbind(id, &[Target::document()], events, handler);
        self
    }

    fn unbind_from_win(&mut self, events: &str, handler: Option<&Rc<DomHandler>>) -> &mut Self {
        let id = self.id();
        self.host().unbind(id, &[Target::Window], events, handler);
        self
    }
}
