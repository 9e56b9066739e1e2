//! Elements
//!
//! Element lookup inside a block's nodes with a per-instance cache.
//! Cache entries are keyed by element name plus an optional modifier
//! postfix, so `item` and `item_state_on` are cached separately; a
//! modifier change on an element drops the entries it affects.

use bem_core::naming::{build_class, build_mod_postfix, extract_elem_name};
use bem_core::{BlockId, Host, ModVal};
use bem_dom::{NodeId, Selector};
use serde_json::{Map, Value};

use crate::params::parse_node_params;
use crate::{BemDom, NodeSet};

/// Cache key of an element lookup
pub fn elem_cache_key(name: &str, modifier: Option<(&str, &ModVal)>) -> String {
    match modifier {
        Some((mod_name, val)) => format!("{name}{}", build_mod_postfix(mod_name, val)),
        None => name.to_string(),
    }
}

impl BemDom {
    /// Elements `names` (space separated) inside the block's nodes
    pub fn find_elem(&mut self, id: BlockId, names: &str) -> NodeSet {
        self.find_elem_in(id, None, names, None, false)
    }

    /// Element lookup with every option
    ///
    /// `ctx` defaults to the block's nodes and is searched inclusively.
    /// Results are cached only when searching the block's own nodes.
    /// `strict` drops elements that belong to a nested block of the same
    /// type.
    pub fn find_elem_in(
        &mut self,
        id: BlockId,
        ctx: Option<&NodeSet>,
        names: &str,
        modifier: Option<(&str, &ModVal)>,
        strict: bool,
    ) -> NodeSet {
        let Some(inst) = self.registry().instance(id) else {
            return NodeSet::new();
        };
        let block = inst.name().to_string();
        let own = inst.ext.nodes.clone();
        let ctx_nodes = ctx.cloned().unwrap_or_else(|| own.clone());

        let names: Vec<&str> = names.split_whitespace().collect();
        let selectors: Vec<Selector> = names
            .iter()
            .map(|name| Selector::class(&build_class(&block, Some(*name), modifier)))
            .collect();

        let mut found = Vec::new();
        for root in &ctx_nodes {
            for node in std::iter::once(root).chain(self.tree.descendants(root)) {
                if selectors.iter().any(|s| s.matches(&self.tree, node)) && !found.contains(&node) {
                    found.push(node);
                }
            }
        }
        self.tree.sort_document_order(&mut found);
        let single = names.len() == 1;
        let mut res = NodeSet::from(found);
        if single {
            res = res.named(names[0]);
        }

        if ctx_nodes.nodes() == own.nodes() {
            let entries: Vec<(String, NodeSet)> = names
                .iter()
                .zip(&selectors)
                .map(|(name, selector)| {
                    let part = if single {
                        res.clone()
                    } else {
                        res.filter(|n| selector.matches(&self.tree, n)).named(*name)
                    };
                    (elem_cache_key(name, modifier), part)
                })
                .collect();
            if let Some(inst) = self.registry_mut().instance_mut(id) {
                inst.ext.elem_cache.extend(entries);
            }
        }

        if strict { self.filter_own(&block, &own, res) } else { res }
    }

    /// Nodes whose nearest block node of type `block` is one of `own`
    fn filter_own(&self, block: &str, own: &NodeSet, nodes: NodeSet) -> NodeSet {
        let selector = Selector::class(block);
        nodes.filter(|node| {
            selector
                .closest(&self.tree, node)
                .is_some_and(|owner| own.contains(owner))
        })
    }

    /// Elements `names`, served from the cache when possible
    pub fn elem(&mut self, id: BlockId, names: &str) -> NodeSet {
        self.elem_with_mod(id, names, None)
    }

    /// Elements `names` carrying a modifier value
    pub fn elem_with_mod(&mut self, id: BlockId, names: &str, modifier: Option<(&str, &ModVal)>) -> NodeSet {
        let list: Vec<&str> = names.split_whitespace().collect();
        let mut out = NodeSet::new();
        for name in &list {
            let key = elem_cache_key(name, modifier);
            let cached = self
                .registry()
                .instance(id)
                .and_then(|inst| inst.ext.elem_cache.get(&key).cloned());
            let part = match cached {
                Some(part) => part,
                None => self.find_elem_in(id, None, name, modifier, false),
            };
            out.union(&part);
        }
        if list.len() == 1 {
            out = out.named(list[0]);
        }
        out
    }

    /// Nearest inclusive ancestor of `node` that is element `name`
    pub fn closest_elem(&self, id: BlockId, node: NodeId, name: &str) -> Option<NodeId> {
        let block = self.block_name(id)?;
        Selector::class(&build_class(&block, Some(name), None)).closest(&self.tree, node)
    }

    /// Parameters of an element, read from its parameter attribute under
    /// the `block__elem` key
    pub fn elem_params(&mut self, id: BlockId, elem: &NodeSet) -> Map<String, Value> {
        let Some(block) = self.block_name(id) else {
            return Map::new();
        };
        let Some(node) = elem.first() else {
            return Map::new();
        };
        let name = match elem.elem_name() {
            Some(name) => Some(name.to_string()),
            None => self
                .tree
                .attr(node, "class")
                .and_then(|class| extract_elem_name(class, &block)),
        };
        let Some(name) = name else {
            return Map::new();
        };

        let attr = self.tree.attr(node, &self.config().params_attr);
        let mut params = match parse_node_params(node, attr) {
            Ok(params) => params,
            Err(err) => {
                tracing::warn!(%node, error = %err, "ignoring malformed element parameters");
                return Map::new();
            }
        };
        match params.remove(&build_class(&block, Some(name.as_str()), None)) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Drop cached lookups for `names`, or the whole cache
    pub fn drop_elem_cache(&mut self, id: BlockId, names: Option<&str>, modifier: Option<(&str, &ModVal)>) {
        let Some(inst) = self.registry_mut().instance_mut(id) else {
            return;
        };
        match names {
            Some(names) => {
                for name in names.split_whitespace() {
                    inst.ext.elem_cache.remove(&elem_cache_key(name, modifier));
                }
            }
            None => inst.ext.elem_cache.clear(),
        }
    }

    /// Whether `node` lies inside one of the block's nodes
    pub fn contains_node(&self, id: BlockId, node: NodeId) -> bool {
        self.registry()
            .instance(id)
            .is_some_and(|inst| inst.ext.nodes.iter().any(|own| self.tree.contains(own, node)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key() {
        assert_eq!(elem_cache_key("item", None), "item");
        let on = ModVal::from("on");
        assert_eq!(elem_cache_key("item", Some(("state", &on))), "item_state_on");
        assert_eq!(elem_cache_key("item", Some(("hidden", &ModVal::Present))), "item_hidden");
    }
}
