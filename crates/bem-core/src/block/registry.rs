//! Block registry
//!
//! Declared types, live instances, deferred initialization and the
//! next-tick queue.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use serde_json::{Map, Value};

use super::member::{ListenerFn, Member, MemberKey, Super};
use super::{BlockClass, BlockEvent, BlockId, Ctx, Host, Payload, ROOT_BLOCK};
use crate::error::BemResult;
use crate::events::{dispatch, Emitter};
use crate::inherit::{compose, Class, ClassTable};
use crate::modifier::{ModMap, ModVal};

/// Per-type data
pub struct BlockMeta<H: Host> {
    live: Cell<Option<bool>>,
    /// Type-level listeners
    pub(crate) emitter: RefCell<Emitter<ListenerFn<H>>>,
}

impl<H: Host> BlockMeta<H> {
    /// Result of the lazy-initialization predicate, once it ran
    pub fn live_state(&self) -> Option<bool> {
        self.live.get()
    }

    pub(crate) fn reset_live(&self) {
        self.live.set(None);
    }
}

impl<H: Host> Default for BlockMeta<H> {
    fn default() -> Self {
        Self {
            live: Cell::new(None),
            emitter: RefCell::new(Emitter::new()),
        }
    }
}

/// A block instance
pub struct Instance<H: Host> {
    id: BlockId,
    class: Rc<BlockClass<H>>,
    pub(crate) mods: HashMap<String, ModVal>,
    pub(crate) processing: HashSet<String>,
    pub(crate) params: Map<String, Value>,
    pub(crate) props: Map<String, Value>,
    pub(crate) emitter: Emitter<ListenerFn<H>>,
    pub(crate) state: HashMap<TypeId, Box<dyn Any>>,
    /// Host data
    pub ext: H::Ext,
}

impl<H: Host> Instance<H> {
    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn class(&self) -> &Rc<BlockClass<H>> {
        &self.class
    }

    pub fn name(&self) -> &str {
        self.class.name()
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.params
    }

    /// Cached modifier values
    pub fn cached_mods(&self) -> &HashMap<String, ModVal> {
        &self.mods
    }
}

type Tick<H> = Box<dyn FnOnce(&mut H)>;

/// Types and instances of one host
pub struct Registry<H: Host> {
    root: Rc<BlockClass<H>>,
    classes: ClassTable<MemberKey, Member<H>, BlockMeta<H>>,
    instances: HashMap<BlockId, Instance<H>>,
    pending_init: Vec<BlockId>,
    ticks: VecDeque<Tick<H>>,
}

impl<H: Host> Registry<H> {
    /// Registry whose root type is `i-bem`
    pub fn new() -> Self {
        Self::with_roots(&[])
    }

    /// Registry with extra root layers on top of `i-bem`; blocks declared
    /// without a base extend the last layer
    pub fn with_roots(layers: &[&str]) -> Self {
        let mut classes = ClassTable::new();
        let mut root: Rc<BlockClass<H>> = Class::root(ROOT_BLOCK, BlockMeta::default());
        classes.insert(Rc::clone(&root));
        for layer in layers {
            root = compose(*layer, &[root], Vec::new(), Vec::new(), BlockMeta::default());
            classes.insert(Rc::clone(&root));
        }
        Self {
            root,
            classes,
            instances: HashMap::new(),
            pending_init: Vec::new(),
            ticks: VecDeque::new(),
        }
    }

    /// Default base of new declarations
    pub fn root(&self) -> Rc<BlockClass<H>> {
        Rc::clone(&self.root)
    }

    pub fn class(&self, name: &str) -> Option<Rc<BlockClass<H>>> {
        self.classes.get(name)
    }

    pub fn resolve(&self, name: &str, requested_by: &str) -> BemResult<Rc<BlockClass<H>>> {
        self.classes.resolve(name, requested_by)
    }

    pub(crate) fn insert_class(&mut self, class: Rc<BlockClass<H>>) {
        self.classes.insert(class);
    }

    pub fn instance(&self, id: BlockId) -> Option<&Instance<H>> {
        self.instances.get(&id)
    }

    pub fn instance_mut(&mut self, id: BlockId) -> Option<&mut Instance<H>> {
        self.instances.get_mut(&id)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn instances_of(&self, name: &str) -> Vec<BlockId> {
        let mut ids: Vec<BlockId> = self
            .instances
            .values()
            .filter(|inst| inst.class.is_a(name))
            .map(|inst| inst.id)
            .collect();
        ids.sort();
        ids
    }

    pub(crate) fn remove_instance(&mut self, id: BlockId) -> Option<Instance<H>> {
        self.instances.remove(&id)
    }

    pub(crate) fn push_tick(&mut self, tick: Tick<H>) {
        self.ticks.push_back(tick);
    }

    pub fn pending_ticks(&self) -> usize {
        self.ticks.len()
    }

    pub fn pending_inits(&self) -> usize {
        self.pending_init.len()
    }
}

impl<H: Host> Default for Registry<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Defaults along the override chain, oldest first
fn default_params<H: Host>(class: &BlockClass<H>) -> Map<String, Value> {
    let mut out = Map::new();
    if let Some(slot) = class.lookup(&MemberKey::DefaultParams) {
        let layers: Vec<_> = slot.chain().collect();
        for layer in layers.into_iter().rev() {
            if let Member::Value(Value::Object(map)) = layer.value() {
                out.extend(map.clone());
            }
        }
    }
    out
}

pub(crate) fn construct<H: Host>(
    host: &mut H,
    class: Rc<BlockClass<H>>,
    mods: ModMap,
    params: Map<String, Value>,
    ext: H::Ext,
    init_now: bool,
) -> BlockId {
    let id = BlockId::next();
    let mut merged = default_params(&class);
    merged.extend(params);

    let instance = Instance {
        id,
        class: Rc::clone(&class),
        mods: mods.into_iter().collect(),
        processing: HashSet::new(),
        params: merged,
        props: Map::new(),
        emitter: Emitter::new(),
        state: HashMap::new(),
        ext,
    };
    host.registry_mut().instances.insert(id, instance);
    tracing::debug!(block = %class.name(), %id, "constructed");

    host.on_construct(id);

    if let Some(slot) = class.constructor() {
        let mut ctx = Ctx::new(host, id);
        let params = Value::Object(ctx.params());
        Super::of(slot).call(&mut ctx, &[params]);
    }

    if init_now {
        init(host, id);
    } else {
        host.registry_mut().pending_init.push(id);
    }
    id
}

pub(crate) fn init<H: Host>(host: &mut H, id: BlockId) {
    Ctx::new(host, id).set_mod("js", "inited");
}

pub(crate) fn run_init_fns<H: Host>(host: &mut H) -> usize {
    let pending = std::mem::take(&mut host.registry_mut().pending_init);
    let count = pending.len();
    for id in pending {
        init(host, id);
    }
    count
}

pub(crate) fn run_ticks<H: Host>(host: &mut H) -> usize {
    let ticks = std::mem::take(&mut host.registry_mut().ticks);
    let count = ticks.len();
    for tick in ticks {
        tick(host);
    }
    count
}

pub(crate) fn process_live<H: Host>(host: &mut H, class: &Rc<BlockClass<H>>) -> bool {
    if let Some(live) = class.ext().live_state() {
        return live;
    }
    let live = match class.lookup_static(&MemberKey::Live) {
        Some(slot) => match slot.value() {
            Member::Live(f) => {
                let f = Rc::clone(f);
                f(host, class.name())
            }
            _ => false,
        },
        None => false,
    };
    class.ext().live.set(Some(live));
    tracing::debug!(block = %class.name(), live, "processed live declaration");
    live
}

/// Deliver an instance event to type-level listeners, nearest type first
pub fn emit_to_type<H: Host>(
    host: &mut H,
    id: BlockId,
    event: &mut BlockEvent,
    payload: &Payload<H::Elem>,
) {
    let Some(class) = host.registry().instance(id).map(|inst| Rc::clone(inst.class())) else {
        return;
    };
    for class in class.lineage() {
        let listeners = class.ext().emitter.borrow().listeners(event.kind());
        if listeners.is_empty() {
            continue;
        }
        let fired = dispatch(&listeners, event, payload, |f, e, p| f(&mut Ctx::new(host, id), e, p));
        class.ext().emitter.borrow_mut().forget(&fired);
        if event.is_propagation_stopped() {
            break;
        }
    }
}
