//! DOM Runtime
//!
//! [`BemDom`] owns a document and binds block instances to its nodes.
//! Nodes carrying the marker class declare blocks through their
//! parameter attribute; a scan constructs the instances eagerly, or
//! leaves them to the first delegated event when the type is live.
//! Modifiers are stored in node classes, not only in the instance.

use std::collections::HashMap;

use bem_core::naming::{extract_elem_name, extract_mod_val, extract_mods, replace_mod_class};
use bem_core::{
    emit_to_type, mods, BemError, BlockDecl, BlockEvent, BlockHost, BlockId, Host, ModChange, ModMap,
    ModVal, Payload, Registry, INITED, JS_MOD,
};
use bem_dom::{DomTree, NodeId};
use bem_html::HtmlParser;
use serde_json::{Map, Value};

use crate::bindings::Binding;
use crate::elems::elem_cache_key;
use crate::live::{CtxTable, LiveTable};
use crate::params::{assign_uniq_id, generate_id, parse_node_params, uniq_id_of, UNIQ_ID};
use crate::{Config, NodeSet, RuntimeError, RuntimeResult};

/// Base type of every DOM-bound block
pub const DOM_BLOCK: &str = "i-bem__dom";

/// Host data of a DOM-bound instance
#[derive(Debug, Clone)]
pub struct DomBlock {
    pub(crate) nodes: NodeSet,
    pub(crate) elem_cache: HashMap<String, NodeSet>,
    pub(crate) uniq_id: String,
    pub(crate) need_special_unbind: bool,
}

impl DomBlock {
    fn new(uniq_id: String, nodes: NodeSet) -> Self {
        Self {
            nodes,
            elem_cache: HashMap::new(),
            uniq_id,
            need_special_unbind: false,
        }
    }

    /// Nodes the instance is bound to, in document order
    pub fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    pub fn uniq_id(&self) -> &str {
        &self.uniq_id
    }

    /// Whether the instance bound handlers to the document or window
    pub fn needs_special_unbind(&self) -> bool {
        self.need_special_unbind
    }
}

/// Outcome of a scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Instances found or constructed, in scan order
    pub blocks: Vec<BlockId>,
    /// Declarations left for lazy initialization
    pub deferred: usize,
    /// Nodes skipped because their parameters did not parse
    pub malformed: Vec<NodeId>,
}

/// Blocks bound to a document
pub struct BemDom {
    config: Config,
    pub(crate) tree: DomTree,
    registry: Registry<BemDom>,
    scope: NodeId,
    /// Unique id to constructed instance
    pub(crate) blocks: HashMap<String, BlockId>,
    /// Unique id to nodes collected before construction
    pub(crate) pending: HashMap<String, NodeSet>,
    /// Parsed parameter attribute per node
    pub(crate) node_params: HashMap<NodeId, Map<String, Value>>,
    /// Parents of nodes taken out of the tree by a teardown
    pub(crate) node_parents: HashMap<NodeId, NodeId>,
    pub(crate) bindings: Vec<Binding>,
    pub(crate) live: LiveTable,
    pub(crate) ctx_events: CtxTable,
}

impl BemDom {
    /// Runtime over an empty document
    pub fn new(config: Config) -> Self {
        Self::from_tree(skeleton(), config)
    }

    /// Runtime over an existing tree; nothing is scanned
    pub fn from_tree(tree: DomTree, config: Config) -> Self {
        let scope = tree
            .body()
            .or_else(|| tree.document_element())
            .unwrap_or(NodeId::ROOT);
        tracing::debug!(nodes = tree.len(), %scope, "BEM DOM runtime created");
        Self {
            config,
            tree,
            registry: Registry::with_roots(&[DOM_BLOCK]),
            scope,
            blocks: HashMap::new(),
            pending: HashMap::new(),
            node_params: HashMap::new(),
            node_parents: HashMap::new(),
            bindings: Vec::new(),
            live: LiveTable::default(),
            ctx_events: CtxTable::default(),
        }
    }

    /// Parse a document; the scope is scanned when the configuration
    /// asks for it
    pub fn with_markup(html: &str, config: Config) -> RuntimeResult<Self> {
        let tree = HtmlParser::new().parse(html)?;
        let auto_init = config.auto_init_scope;
        let mut dom = Self::from_tree(tree, config);
        if auto_init {
            dom.init_scope();
        }
        Ok(dom)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Direct tree access; block bookkeeping is not updated
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// Delegation root and default scan root
    pub fn scope(&self) -> NodeId {
        self.scope
    }

    pub fn instance_count(&self) -> usize {
        self.registry.instance_count()
    }

    pub fn block_by_uniq_id(&self, uniq_id: &str) -> Option<BlockId> {
        self.blocks.get(uniq_id).copied()
    }

    /// Nodes of an instance, empty once it is gone
    pub fn block_nodes(&self, id: BlockId) -> NodeSet {
        self.registry
            .instance(id)
            .map(|inst| inst.ext.nodes.clone())
            .unwrap_or_default()
    }

    /// Live instances bound to `node`
    pub fn blocks_on(&self, node: NodeId) -> Vec<BlockId> {
        let Some(params) = self.node_params.get(&node) else {
            return Vec::new();
        };
        params
            .values()
            .filter_map(uniq_id_of)
            .filter_map(|uniq| self.blocks.get(uniq).copied())
            .filter(|&id| self.is_alive(id))
            .collect()
    }

    pub(crate) fn block_name(&self, id: BlockId) -> Option<String> {
        self.registry.instance(id).map(|inst| inst.name().to_string())
    }

    pub(crate) fn check_node(&self, node: NodeId) -> RuntimeResult<()> {
        self.tree
            .get(node)
            .map(|_| ())
            .ok_or(RuntimeError::NodeNotFound(node))
    }

    // ------------------------------------------------------------------
    // Parameters
    // ------------------------------------------------------------------

    /// Parameters of every block on a node, parsed once
    pub(crate) fn params_of(&mut self, node: NodeId) -> RuntimeResult<&mut Map<String, Value>> {
        if !self.node_params.contains_key(&node) {
            let parsed = parse_node_params(node, self.tree.attr(node, &self.config.params_attr))?;
            self.node_params.insert(node, parsed);
        }
        self.node_params
            .get_mut(&node)
            .ok_or(RuntimeError::NodeNotFound(node))
    }

    /// One block's parameters on a node, with its unique id assigned
    fn block_params(&mut self, node: NodeId, name: &str, wave: Option<&str>) -> RuntimeResult<Map<String, Value>> {
        let prefix = self.config.uniq_id_prefix.clone();
        let params = self.params_of(node)?;
        let entry = params
            .entry(name.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        match entry {
            Value::Object(map) => {
                assign_uniq_id(map, name, &prefix, wave);
                Ok(map.clone())
            }
            _ => Err(RuntimeError::MalformedParams {
                node,
                reason: format!("parameters of \"{name}\" are not an object"),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Initialization
    // ------------------------------------------------------------------

    /// Scan the scope
    pub fn init_scope(&mut self) -> ScanReport {
        let scope = self.scope;
        self.init(scope)
    }

    /// Scan `root` and its descendants for blocks
    pub fn init(&mut self, root: NodeId) -> ScanReport {
        self.init_nodes(&[root])
    }

    /// Scan several roots as one initialization wave
    ///
    /// Instances are constructed in document order and initialized
    /// together once the whole scan finished.
    pub fn init_nodes(&mut self, roots: &[NodeId]) -> ScanReport {
        let wave = generate_id(&self.config.uniq_id_prefix);
        let candidates = self.marked_nodes(roots);
        tracing::debug!(roots = roots.len(), candidates = candidates.len(), %wave, "init scan");

        let mut report = ScanReport::default();
        for node in candidates {
            self.init_blocks(node, &wave, &mut report);
        }
        let inited = self.run_init_fns();

        tracing::debug!(
            blocks = report.blocks.len(),
            deferred = report.deferred,
            malformed = report.malformed.len(),
            inited,
            "init scan finished"
        );
        report
    }

    fn init_blocks(&mut self, node: NodeId, wave: &str, report: &mut ScanReport) {
        let names: Vec<String> = match self.params_of(node) {
            Ok(params) => params.keys().cloned().collect(),
            Err(err) => {
                tracing::warn!(%node, error = %err, "skipping node with malformed block parameters");
                report.malformed.push(node);
                return;
            }
        };
        for name in names {
            let result = self
                .block_params(node, &name, Some(wave))
                .and_then(|params| self.ensure_block(&name, node, Some(params), false));
            match result {
                Ok(Some((id, _))) => {
                    if !report.blocks.contains(&id) {
                        report.blocks.push(id);
                    }
                }
                Ok(None) => report.deferred += 1,
                Err(err) => {
                    tracing::warn!(%node, block = %name, error = %err, "block initialization failed");
                }
            }
        }
    }

    /// Marked nodes under the roots, roots included, in document order
    pub(crate) fn marked_nodes(&self, roots: &[NodeId]) -> Vec<NodeId> {
        let marker = self.config.marker_class.as_str();
        let mut found = NodeSet::new();
        for &root in roots {
            if self.tree.has_class(root, marker) {
                found.push(root);
            }
            for node in self.tree.descendants(root) {
                if self.tree.has_class(node, marker) {
                    found.push(node);
                }
            }
        }
        found.into_vec()
    }

    /// Bind block `name` on `node`
    ///
    /// Returns the existing instance for the node's unique id, or a new
    /// one unless the type is live. `force` constructs live types too
    /// and initializes the new instance right away.
    pub fn init_block(&mut self, name: &str, node: NodeId, force: bool) -> RuntimeResult<Option<BlockId>> {
        Ok(self.ensure_block(name, node, None, force)?.map(|(id, _)| id))
    }

    /// The instance for `params` on `node` and whether it was just
    /// constructed
    pub(crate) fn ensure_block(
        &mut self,
        name: &str,
        node: NodeId,
        params: Option<Map<String, Value>>,
        force: bool,
    ) -> RuntimeResult<Option<(BlockId, bool)>> {
        let params = match params {
            Some(params) => params,
            None => self.block_params(node, name, None)?,
        };
        let uniq = match params.get(UNIQ_ID).and_then(Value::as_str) {
            Some(uniq) => uniq.to_string(),
            None => generate_id(&self.config.uniq_id_prefix),
        };

        if let Some(id) = self.blocks.get(&uniq).copied() {
            let tree = &self.tree;
            if let Some(inst) = self.registry.instance_mut(id) {
                if !inst.ext.nodes.contains(node) {
                    let mut nodes = inst.ext.nodes.nodes().to_vec();
                    nodes.push(node);
                    tree.sort_document_order(&mut nodes);
                    inst.ext.nodes = NodeSet::from(nodes);
                    inst.params_mut().extend(params);
                    tracing::trace!(block = %name, %id, %node, "node joined instance");
                }
                return Ok(Some((id, false)));
            }
            self.blocks.remove(&uniq);
        }

        {
            let tree = &self.tree;
            let pending = self.pending.entry(uniq.clone()).or_default();
            if !pending.contains(node) {
                let mut nodes = pending.nodes().to_vec();
                nodes.push(node);
                tree.sort_document_order(&mut nodes);
                *pending = NodeSet::from(nodes);
            }
        }

        if !self.is_declared(name) {
            tracing::debug!(block = %name, "declaring undeclared block as live");
            self.decl(BlockDecl::new(name).live(true))?;
        }
        let live = self.process_live(name);
        let opted_out = params.get("live") == Some(&Value::Bool(false));
        if live && !force && !opted_out {
            tracing::trace!(block = %name, %node, "deferred to live initialization");
            return Ok(None);
        }

        if force {
            let marker = self.config.marker_class.clone();
            self.tree.add_class(node, &marker);
        }
        let nodes = self.pending.remove(&uniq).unwrap_or_default();
        // The js modifier is never removed from classes, so it is not
        // read back from them
        let id = self.construct(
            name,
            mods([(JS_MOD, ModVal::Absent)]),
            params,
            DomBlock::new(uniq, nodes),
            force,
        )?;
        Ok(Some((id, true)))
    }

    /// Initialize an instance whose initialization is still pending
    pub(crate) fn ensure_inited(&mut self, id: BlockId) {
        let mut ctx = self.block(id);
        if ctx.is_alive() && !ctx.is_inited() {
            ctx.set_mod(JS_MOD, INITED);
        }
    }

    /// Instance of `name` on `node`, constructed and initialized if needed
    pub fn block_on(&mut self, node: NodeId, name: &str) -> RuntimeResult<BlockId> {
        self.check_node(node)?;
        let (id, _) = self
            .ensure_block(name, node, None, true)?
            .ok_or_else(|| BemError::UnknownBlock(name.to_string()))?;
        self.ensure_inited(id);
        Ok(id)
    }

    /// Create an instance on a new detached node
    pub fn create(&mut self, name: &str, params: Value) -> RuntimeResult<BlockId> {
        let params = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                tracing::warn!(block = %name, params = %other, "ignoring non-object params");
                Map::new()
            }
        };
        let mut blob = Map::new();
        blob.insert(name.to_string(), Value::Object(params));

        let node = self.tree.create_element("div");
        let class = format!("{name} {}", self.config.marker_class);
        self.tree.set_attr(node, "class", class)?;
        let attr = self.config.params_attr.clone();
        self.tree.set_attr(node, &attr, Value::Object(blob).to_string())?;
        self.block_on(node, name)
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Destroy the blocks under `root` and remove the subtree; with
    /// `exclude_self` only the children of `root` go
    pub fn destruct(&mut self, root: NodeId, exclude_self: bool) {
        self.teardown(root, exclude_self, true);
    }

    /// Destroy the blocks under `root` and leave the nodes in place
    pub fn detach(&mut self, root: NodeId, exclude_self: bool) {
        self.teardown(root, exclude_self, false);
    }

    fn teardown(&mut self, root: NodeId, exclude_self: bool, remove_dom: bool) {
        let tops = if exclude_self {
            self.tree.element_children(root)
        } else {
            vec![root]
        };
        for &top in &tops {
            if let Some(parent) = self.tree.parent(top) {
                self.node_parents.insert(top, parent);
            }
        }
        if remove_dom {
            if exclude_self {
                self.tree.remove_children(root);
            } else {
                self.tree.detach(root);
            }
        }

        let before = self.instance_count();
        let marked = self.marked_nodes(&tops);
        for node in marked.iter().rev().copied() {
            let Some(params) = self.node_params.remove(&node) else {
                continue;
            };
            for block_params in params.values() {
                let Some(uniq) = uniq_id_of(block_params) else {
                    continue;
                };
                match self.blocks.get(uniq).copied() {
                    Some(id) => self.remove_node_from_block(id, node),
                    None => {
                        self.pending.remove(uniq);
                    }
                }
            }
        }
        tracing::debug!(
            %root,
            nodes = marked.len(),
            destructed = before.saturating_sub(self.instance_count()),
            remove_dom,
            "teardown"
        );
    }

    /// Unbind a node from an instance, destroying it with its last node
    fn remove_node_from_block(&mut self, id: BlockId, node: NodeId) {
        let last = match self.registry.instance(id) {
            Some(inst) => inst.ext.nodes.len() <= 1,
            None => return,
        };
        if last {
            self.destruct_block(id);
        } else if let Some(inst) = self.registry.instance_mut(id) {
            inst.ext.nodes.remove(node);
        }
    }
}

impl Default for BemDom {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Document with empty head and body
fn skeleton() -> DomTree {
    let mut tree = DomTree::new();
    let html = tree.create_element("html");
    let head = tree.create_element("head");
    let body = tree.create_element("body");
    let linked = tree
        .append_child(NodeId::ROOT, html)
        .and_then(|_| tree.append_child(html, head))
        .and_then(|_| tree.append_child(html, body));
    if let Err(err) = linked {
        tracing::warn!(error = %err, "could not build document skeleton");
    }
    tree
}

impl Host for BemDom {
    type Elem = NodeSet;
    type Ext = DomBlock;

    fn registry(&self) -> &Registry<Self> {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut Registry<Self> {
        &mut self.registry
    }

    fn elem_key(&self, elem: &NodeSet) -> String {
        elem.to_string()
    }

    fn elem_name(&self, block: BlockId, elem: &NodeSet) -> Option<String> {
        if let Some(name) = elem.elem_name() {
            return Some(name.to_string());
        }
        let block_name = self.block_name(block)?;
        let class = self.tree.attr(elem.first()?, "class")?;
        extract_elem_name(class, &block_name)
    }

    fn split_elem(&self, elem: &NodeSet) -> Vec<NodeSet> {
        if elem.len() > 1 { elem.split() } else { vec![elem.clone()] }
    }

    fn read_mod(&self, block: BlockId, elem: Option<&NodeSet>, elem_name: Option<&str>, name: &str) -> ModVal {
        let Some(inst) = self.registry.instance(block) else {
            return ModVal::Absent;
        };
        let node = match elem {
            Some(elem) => elem.first(),
            None => inst.ext.nodes.first(),
        };
        let Some(node) = node else {
            return ModVal::Absent;
        };
        let class = self.tree.attr(node, "class").unwrap_or_default();
        extract_mod_val(class, inst.name(), elem_name, name)
    }

    fn read_mods(&self, block: BlockId, elem: Option<&NodeSet>, names: &[&str]) -> Option<ModMap> {
        let inst = self.registry.instance(block)?;
        let node = match elem {
            Some(elem) => elem.first(),
            None => inst.ext.nodes.first(),
        }?;
        let class = self.tree.attr(node, "class").unwrap_or_default();
        let elem_name = elem.and_then(|e| self.elem_name(block, e));
        let all = extract_mods(class, inst.name(), elem_name.as_deref());
        if names.is_empty() {
            return Some(all);
        }
        Some(
            names
                .iter()
                .map(|n| (n.to_string(), all.get(*n).cloned().unwrap_or_default()))
                .collect(),
        )
    }

    fn write_mod(&mut self, block: BlockId, change: &ModChange<NodeSet>) {
        if change.name == JS_MOD && !change.val.is_set() {
            return;
        }
        let Some(inst) = self.registry.instance(block) else {
            return;
        };
        let block_name = inst.name().to_string();
        let nodes = match &change.elem {
            Some(elem) => elem.clone(),
            None => inst.ext.nodes.clone(),
        };
        let elem_name = change.elem_name.as_deref();

        for node in &nodes {
            let class = self.tree.attr(node, "class").unwrap_or_default();
            let updated = replace_mod_class(class, &block_name, elem_name, &change.name, &change.val);
            if let Err(err) = self.tree.set_attr(node, "class", updated) {
                tracing::warn!(%node, error = %err, "could not write modifier class");
            }
        }

        if let Some(elem_name) = elem_name {
            if let Some(inst) = self.registry.instance_mut(block) {
                for val in [&change.old_val, &change.val] {
                    if val.is_set() {
                        inst.ext
                            .elem_cache
                            .remove(&elem_cache_key(elem_name, Some((&change.name, val))));
                    }
                }
            }
        }
    }

    fn on_construct(&mut self, block: BlockId) {
        if let Some(inst) = self.registry.instance(block) {
            let uniq = inst.ext.uniq_id.clone();
            self.blocks.insert(uniq, block);
        }
    }

    fn on_destruct(&mut self, block: BlockId) {
        let Some(inst) = self.registry.instance(block) else {
            return;
        };
        let uniq = inst.ext.uniq_id.clone();
        let special = inst.ext.need_special_unbind;

        let before = self.bindings.len();
        self.bindings.retain(|b| b.owner != block);
        tracing::trace!(
            %block,
            unbound = before - self.bindings.len(),
            special,
            "released direct bindings"
        );
        if self.blocks.get(&uniq) == Some(&block) {
            self.blocks.remove(&uniq);
        }
    }

    fn relay_emit(&mut self, block: BlockId, event: &mut BlockEvent, payload: &Payload<NodeSet>) {
        emit_to_type(self, block, event, payload);
        self.ctx_emit(block, event, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bem_dom::ElementQuery;

    fn dom(body: &str) -> BemDom {
        let config = Config {
            auto_init_scope: false,
            ..Config::default()
        };
        BemDom::with_markup(&format!("<body>{body}</body>"), config).unwrap()
    }

    #[test]
    fn test_skeleton_scope_is_body() {
        let dom = BemDom::default();
        assert_eq!(dom.tree().body(), Some(dom.scope()));
    }

    #[test]
    fn test_eager_block_constructed_and_inited() {
        let mut dom = dom(r#"<div class="b i-bem b_size_m" data-bem='{"b":{}}'></div>"#);
        dom.decl(BlockDecl::new("b")).unwrap();
        let report = dom.init_scope();

        assert_eq!(report.blocks.len(), 1);
        let id = report.blocks[0];
        let mut ctx = dom.block(id);
        assert!(ctx.is_inited());
        assert_eq!(ctx.get_mod("size"), ModVal::from("m"));
        let node = dom.tree().query_selector(dom.scope(), ".b").unwrap().unwrap();
        assert!(dom.tree().has_class(node, "b_js_inited"));
        assert_eq!(dom.blocks_on(node), vec![id]);
    }

    #[test]
    fn test_undeclared_block_is_deferred() {
        let mut dom = dom(r#"<div class="x i-bem" data-bem='{"x":{}}'></div>"#);
        let report = dom.init_scope();
        assert_eq!(report.deferred, 1);
        assert!(report.blocks.is_empty());
        assert!(dom.is_declared("x"));
        assert_eq!(dom.instance_count(), 0);
    }

    #[test]
    fn test_live_opt_out_param() {
        let mut dom = dom(r#"<div class="x i-bem" data-bem='{"x":{"live":false}}'></div>"#);
        dom.decl(BlockDecl::new("x").live(true)).unwrap();
        assert_eq!(dom.init_scope().blocks.len(), 1);
    }

    #[test]
    fn test_block_modifier_rewrites_class() {
        let mut dom = dom(r#"<div class="b i-bem b_theme_light" data-bem='{"b":{}}'></div>"#);
        dom.decl(BlockDecl::new("b")).unwrap();
        let id = dom.init_scope().blocks[0];
        let node = dom.block_nodes(id).first().unwrap();

        dom.block(id).set_mod("theme", "dark");
        assert_eq!(dom.tree().attr(node, "class"), Some("b i-bem b_theme_dark b_js_inited"));
        dom.block(id).del_mod("theme");
        assert_eq!(dom.tree().attr(node, "class"), Some("b i-bem b_js_inited"));
    }

    #[test]
    fn test_destruct_keeps_js_class() {
        let mut dom = dom(r#"<div class="b i-bem" data-bem='{"b":{}}'></div>"#);
        dom.decl(BlockDecl::new("b")).unwrap();
        let id = dom.init_scope().blocks[0];
        let node = dom.block_nodes(id).first().unwrap();

        dom.detach(node, false);
        assert!(!dom.is_alive(id));
        assert!(dom.tree().has_class(node, "b_js_inited"));
        assert!(dom.tree().is_connected(node));

        let again = dom.init(node);
        assert_eq!(again.blocks.len(), 1);
        assert!(dom.block(again.blocks[0]).is_inited());
    }

    #[test]
    fn test_create_detached_block() {
        let mut dom = BemDom::default();
        dom.decl(BlockDecl::new("popup")).unwrap();
        let id = dom.create("popup", serde_json::json!({"id": "p"})).unwrap();

        let node = dom.block_nodes(id).first().unwrap();
        assert!(!dom.tree().is_connected(node));
        assert!(dom.block(id).is_inited());
        assert_eq!(dom.block(id).param("id"), Some(Value::from("p")));
    }
}
