//! Blocks
//!
//! Block types, instances and the modifier state machine. A [`Host`]
//! owns the [`Registry`] and supplies the side effects of modifier
//! changes (for example rewriting DOM classes); everything else lives
//! here and is shared by every host.

mod ctx;
mod decl;
mod member;
mod registry;

use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

pub use ctx::{Ctx, INITED, JS_MOD};
pub use decl::{BlockDecl, ModCondition};
pub use member::{
    HookFn, HookKey, ListenerFn, LiveFn, Member, MemberKey, MethodFn, StaticFn, Super,
};
pub use registry::{emit_to_type, BlockMeta, Instance, Registry};

use crate::error::{BemError, BemResult};
use crate::events::{Event, Flow, Subscribe};
use crate::identify::{next_uniq, UniqId};
use crate::inherit::Class;
use crate::modifier::{mod_event_name, ModChange, ModMap, ModPattern, ModVal};

/// Name of the root block type
pub const ROOT_BLOCK: &str = "i-bem";

/// Block type
pub type BlockClass<H> = Class<MemberKey, Member<H>, BlockMeta<H>>;

/// Event emitted by a block
pub type BlockEvent = Event<BlockId>;

/// Block instance handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(UniqId);

impl BlockId {
    pub(crate) fn next() -> Self {
        BlockId(next_uniq())
    }

    /// Identity used as a handler context key
    pub fn uniq(self) -> UniqId {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block:{}", self.0)
    }
}

/// Data delivered with a block event
#[derive(Debug, Clone)]
pub enum Payload<E> {
    None,
    Data(Value),
    Mod(ModChange<E>),
}

impl<E> Payload<E> {
    pub fn data(&self) -> Option<&Value> {
        match self {
            Payload::Data(v) => Some(v),
            _ => None,
        }
    }

    pub fn mod_change(&self) -> Option<&ModChange<E>> {
        match self {
            Payload::Mod(change) => Some(change),
            _ => None,
        }
    }
}

/// Environment a block lives in
pub trait Host: Sized + 'static {
    /// Handle to a nested element
    type Elem: Clone + fmt::Debug + 'static;
    /// Host data attached to each instance
    type Ext: 'static;

    fn registry(&self) -> &Registry<Self>;
    fn registry_mut(&mut self) -> &mut Registry<Self>;

    /// Stable key of an element handle, guards re-entrant changes
    fn elem_key(&self, elem: &Self::Elem) -> String;

    /// Element name of a handle
    fn elem_name(&self, block: BlockId, elem: &Self::Elem) -> Option<String>;

    /// Split a handle covering several nodes into one handle per node
    fn split_elem(&self, elem: &Self::Elem) -> Vec<Self::Elem> {
        vec![elem.clone()]
    }

    /// Read a modifier from the host's backing store
    fn read_mod(&self, _block: BlockId, _elem: Option<&Self::Elem>, _elem_name: Option<&str>, _name: &str) -> ModVal {
        ModVal::Absent
    }

    /// Read several modifiers; `None` when the host keeps no backing store
    fn read_mods(&self, _block: BlockId, _elem: Option<&Self::Elem>, _names: &[&str]) -> Option<ModMap> {
        None
    }

    /// Apply an accepted modifier change
    fn write_mod(&mut self, _block: BlockId, _change: &ModChange<Self::Elem>) {}

    /// Called after an instance is registered, before it initializes
    fn on_construct(&mut self, _block: BlockId) {}

    /// Called while an instance is being destroyed
    fn on_destruct(&mut self, _block: BlockId) {}

    /// Forward an instance event beyond the instance's own listeners
    fn relay_emit(&mut self, block: BlockId, event: &mut BlockEvent, payload: &Payload<Self::Elem>) {
        registry::emit_to_type(self, block, event, payload);
    }
}

/// Block operations available on every host
pub trait BlockHost: Host {
    /// Declare or amend a block type
    fn decl(&mut self, decl: BlockDecl<Self>) -> BemResult<Rc<BlockClass<Self>>> {
        decl::declare(self, decl)
    }

    /// Context for an instance
    fn block(&mut self, id: BlockId) -> Ctx<'_, Self> {
        Ctx::new(self, id)
    }

    fn class(&self, name: &str) -> Option<Rc<BlockClass<Self>>> {
        self.registry().class(name)
    }

    fn is_declared(&self, name: &str) -> bool {
        self.registry().class(name).is_some()
    }

    fn is_alive(&self, id: BlockId) -> bool {
        self.registry().instance(id).is_some()
    }

    /// Construct an instance of a declared type
    fn construct(
        &mut self,
        name: &str,
        mods: ModMap,
        params: Map<String, Value>,
        ext: Self::Ext,
        init_now: bool,
    ) -> BemResult<BlockId> {
        let class = self
            .class(name)
            .ok_or_else(|| BemError::UnknownBlock(name.to_string()))?;
        Ok(registry::construct(self, class, mods, params, ext, init_now))
    }

    /// Initialize instances whose initialization was deferred
    fn run_init_fns(&mut self) -> usize {
        registry::run_init_fns(self)
    }

    /// Run callbacks queued with [`Ctx::next_tick`]
    fn run_ticks(&mut self) -> usize {
        registry::run_ticks(self)
    }

    fn destruct_block(&mut self, id: BlockId) {
        Ctx::new(self, id).destruct();
    }

    /// Decide once whether a type initializes lazily
    fn process_live(&mut self, name: &str) -> bool {
        match self.class(name) {
            Some(class) => registry::process_live(self, &class),
            None => false,
        }
    }

    /// Type-level subscription, delivered for every instance of the type
    fn on_type(&mut self, name: &str, events: &str, handler: Rc<ListenerFn<Self>>) -> BemResult<()> {
        self.on_type_with(name, events, handler, Subscribe::default())
    }

    fn on_type_with(
        &mut self,
        name: &str,
        events: &str,
        handler: Rc<ListenerFn<Self>>,
        opts: Subscribe,
    ) -> BemResult<()> {
        let class = self
            .class(name)
            .ok_or_else(|| BemError::UnknownBlock(name.to_string()))?;
        class.ext().emitter.borrow_mut().subscribe(events, handler, opts);
        Ok(())
    }

    /// Type-level subscription to a modifier change
    fn on_type_mod(
        &mut self,
        name: &str,
        mod_name: &str,
        val: ModPattern,
        handler: Rc<ListenerFn<Self>>,
    ) -> BemResult<()> {
        self.on_type(name, &mod_event_name(None, mod_name, &val), handler)
    }

    fn un_type(&mut self, name: &str, events: Option<&str>, handler: Option<&Rc<ListenerFn<Self>>>) -> BemResult<()> {
        let class = self
            .class(name)
            .ok_or_else(|| BemError::UnknownBlock(name.to_string()))?;
        class.ext().emitter.borrow_mut().un(events, handler, None);
        Ok(())
    }

    /// Call a static method
    fn call_static(&mut self, name: &str, method: &str, args: &[Value]) -> BemResult<Value> {
        let class = self
            .class(name)
            .ok_or_else(|| BemError::UnknownBlock(name.to_string()))?;
        let slot = class
            .lookup_static(&MemberKey::Prop(method.to_string()))
            .ok_or_else(|| BemError::UnknownMethod {
                block: name.to_string(),
                method: method.to_string(),
            })?;
        Ok(Super::of(slot).call_static(self, name, args))
    }

    /// Instances of a type, including descendants of the type
    fn instances_of(&self, name: &str) -> Vec<BlockId> {
        self.registry().instances_of(name)
    }
}

impl<H: Host> BlockHost for H {}

/// Wrap a closure as a block listener
pub fn listener<H, F>(f: F) -> Rc<ListenerFn<H>>
where
    H: Host,
    F: Fn(&mut Ctx<'_, H>, &mut BlockEvent, &Payload<H::Elem>) -> Flow + 'static,
{
    Rc::new(f)
}
