//! Block context
//!
//! [`Ctx`] pairs a host with one instance and carries the instance API:
//! modifiers, events, methods and per-instance state.

use std::any::{Any, TypeId};
use std::rc::Rc;

use serde_json::{Map, Value};

use super::member::{HookKey, ListenerFn, MemberKey, Super};
use super::registry::Instance;
use super::{BlockClass, BlockEvent, BlockId, Host, Payload};
use crate::error::{BemError, BemResult};
use crate::events::{dispatch, Subscribe};
use crate::modifier::{mod_event_name, ModChange, ModMap, ModPattern, ModVal};

/// Modifier reserved for the initialization lifecycle
pub const JS_MOD: &str = "js";
/// Value of [`JS_MOD`] while an instance is initialized
pub const INITED: &str = "inited";

/// A host borrowed together with the instance being operated on
pub struct Ctx<'a, H: Host> {
    host: &'a mut H,
    id: BlockId,
}

impl<'a, H: Host> Ctx<'a, H> {
    pub fn new(host: &'a mut H, id: BlockId) -> Self {
        Self { host, id }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn host(&mut self) -> &mut H {
        &mut *self.host
    }

    pub fn host_ref(&self) -> &H {
        &*self.host
    }

    /// Context for another instance on the same host
    pub fn at(&mut self, id: BlockId) -> Ctx<'_, H> {
        Ctx::new(&mut *self.host, id)
    }

    pub fn is_alive(&self) -> bool {
        self.instance().is_some()
    }

    pub fn instance(&self) -> Option<&Instance<H>> {
        self.host.registry().instance(self.id)
    }

    pub fn instance_mut(&mut self) -> Option<&mut Instance<H>> {
        self.host.registry_mut().instance_mut(self.id)
    }

    pub fn class(&self) -> Option<Rc<BlockClass<H>>> {
        self.instance().map(|inst| Rc::clone(inst.class()))
    }

    /// Type name, empty once destroyed
    pub fn name(&self) -> String {
        self.instance().map(|inst| inst.name().to_string()).unwrap_or_default()
    }

    pub fn ext(&self) -> Option<&H::Ext> {
        self.instance().map(|inst| &inst.ext)
    }

    pub fn ext_mut(&mut self) -> Option<&mut H::Ext> {
        self.instance_mut().map(|inst| &mut inst.ext)
    }

    // ------------------------------------------------------------------
    // Parameters, properties and state
    // ------------------------------------------------------------------

    /// Parameters merged over the type defaults
    pub fn params(&self) -> Map<String, Value> {
        self.instance().map(|inst| inst.params.clone()).unwrap_or_default()
    }

    pub fn param(&self, key: &str) -> Option<Value> {
        self.instance().and_then(|inst| inst.params.get(key).cloned())
    }

    /// Instance property, falling back to a value declared on the type
    pub fn prop(&self, name: &str) -> Option<Value> {
        let inst = self.instance()?;
        if let Some(v) = inst.props.get(name) {
            return Some(v.clone());
        }
        match inst.class().lookup(&MemberKey::Prop(name.to_string()))?.value() {
            super::Member::Value(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn set_prop(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        if let Some(inst) = self.instance_mut() {
            inst.props.insert(name.into(), value);
        }
        self
    }

    /// Typed per-instance state
    pub fn state<T: Any>(&self) -> Option<&T> {
        self.instance()?
            .state
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref::<T>())
    }

    pub fn state_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.instance_mut()?
            .state
            .get_mut(&TypeId::of::<T>())
            .and_then(|b| b.downcast_mut::<T>())
    }

    pub fn set_state<T: Any>(&mut self, value: T) -> &mut Self {
        if let Some(inst) = self.instance_mut() {
            inst.state.insert(TypeId::of::<T>(), Box::new(value));
        }
        self
    }

    // ------------------------------------------------------------------
    // Modifiers
    // ------------------------------------------------------------------

    /// Block modifier, read from the host once and cached
    pub fn get_mod(&mut self, name: &str) -> ModVal {
        let id = self.id;
        let Some(inst) = self.host.registry().instance(id) else {
            return ModVal::Absent;
        };
        if let Some(val) = inst.mods.get(name) {
            return val.clone();
        }
        let val = self.host.read_mod(id, None, None, name);
        if let Some(inst) = self.instance_mut() {
            inst.mods.insert(name.to_string(), val.clone());
        }
        val
    }

    /// Element modifier, always read from the host
    pub fn get_elem_mod(&mut self, elem: &H::Elem, name: &str) -> ModVal {
        let elem_name = self.host.elem_name(self.id, elem);
        self.host.read_mod(self.id, Some(elem), elem_name.as_deref(), name)
    }

    /// Block modifiers; an empty `names` means all of them
    pub fn get_mods(&mut self, names: &[&str]) -> ModMap {
        let id = self.id;
        match self.host.read_mods(id, None, names) {
            Some(fresh) => {
                if let Some(inst) = self.instance_mut() {
                    if names.is_empty() {
                        inst.mods = fresh.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                    } else {
                        for (k, v) in &fresh {
                            inst.mods.insert(k.clone(), v.clone());
                        }
                    }
                }
                fresh
            }
            None => {
                let Some(inst) = self.instance() else {
                    return ModMap::new();
                };
                if names.is_empty() {
                    inst.mods
                        .iter()
                        .filter(|(_, v)| v.is_set())
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                } else {
                    names
                        .iter()
                        .map(|n| (n.to_string(), inst.mods.get(*n).cloned().unwrap_or_default()))
                        .collect()
                }
            }
        }
    }

    pub fn get_elem_mods(&mut self, elem: &H::Elem, names: &[&str]) -> ModMap {
        self.host
            .read_mods(self.id, Some(elem), names)
            .unwrap_or_default()
    }

    pub fn has_mod(&mut self, name: &str) -> bool {
        self.get_mod(name).is_set()
    }

    pub fn has_mod_val(&mut self, name: &str, val: impl Into<ModVal>) -> bool {
        self.get_mod(name) == val.into()
    }

    pub fn elem_has_mod(&mut self, elem: &H::Elem, name: &str) -> bool {
        self.get_elem_mod(elem, name).is_set()
    }

    pub fn elem_has_mod_val(&mut self, elem: &H::Elem, name: &str, val: impl Into<ModVal>) -> bool {
        self.get_elem_mod(elem, name) == val.into()
    }

    pub fn is_inited(&mut self) -> bool {
        self.has_mod_val(JS_MOD, INITED)
    }

    pub fn set_mod(&mut self, name: &str, val: impl Into<ModVal>) -> &mut Self {
        self.change_mod(None, name, val.into());
        self
    }

    pub fn set_elem_mod(&mut self, elem: &H::Elem, name: &str, val: impl Into<ModVal>) -> &mut Self {
        self.change_mod(Some(elem), name, val.into());
        self
    }

    pub fn del_mod(&mut self, name: &str) -> &mut Self {
        self.change_mod(None, name, ModVal::Absent);
        self
    }

    pub fn del_elem_mod(&mut self, elem: &H::Elem, name: &str) -> &mut Self {
        self.change_mod(Some(elem), name, ModVal::Absent);
        self
    }

    /// Flip between two values; does nothing when the current value is
    /// neither
    pub fn toggle_mod(&mut self, name: &str, v1: impl Into<ModVal>, v2: impl Into<ModVal>) -> &mut Self {
        self.toggle(None, name, v1.into(), v2.into(), None);
        self
    }

    /// Flip a boolean modifier
    pub fn toggle_flag(&mut self, name: &str) -> &mut Self {
        self.toggle(None, name, ModVal::Present, ModVal::Absent, None);
        self
    }

    /// Set `v1` when `condition` holds, else `v2`, if currently either
    pub fn toggle_mod_if(
        &mut self,
        name: &str,
        v1: impl Into<ModVal>,
        v2: impl Into<ModVal>,
        condition: bool,
    ) -> &mut Self {
        self.toggle(None, name, v1.into(), v2.into(), Some(condition));
        self
    }

    pub fn toggle_elem_mod(
        &mut self,
        elem: &H::Elem,
        name: &str,
        v1: impl Into<ModVal>,
        v2: impl Into<ModVal>,
        condition: Option<bool>,
    ) -> &mut Self {
        self.toggle(Some(elem), name, v1.into(), v2.into(), condition);
        self
    }

    fn toggle(&mut self, elem: Option<&H::Elem>, name: &str, v1: ModVal, v2: ModVal, condition: Option<bool>) {
        let current = match elem {
            Some(elem) => self.get_elem_mod(elem, name),
            None => self.get_mod(name),
        };
        if current != v1 && current != v2 {
            return;
        }
        let next = match condition {
            Some(true) => v1,
            Some(false) => v2,
            None if current == v1 => v2,
            None => v1,
        };
        self.change_mod(elem, name, next);
    }

    fn change_mod(&mut self, elem: Option<&H::Elem>, name: &str, val: ModVal) {
        if let Some(elem) = elem {
            let parts = self.host.split_elem(elem);
            if parts.len() != 1 {
                for part in &parts {
                    self.change_mod(Some(part), name, val.clone());
                }
                return;
            }
        }

        let id = self.id;
        let guard = match elem {
            Some(elem) => format!("{}_{name}", self.host.elem_key(elem)),
            None => format!("_{name}"),
        };
        match self.instance() {
            None => return,
            Some(inst) if inst.processing.contains(&guard) => {
                tracing::trace!(%id, modifier = %name, "ignored re-entrant modifier change");
                return;
            }
            Some(_) => {}
        }

        let elem_name = elem.and_then(|e| self.host.elem_name(id, e));
        let old_val = match elem {
            Some(elem) => self.host.read_mod(id, Some(elem), elem_name.as_deref(), name),
            None => self.get_mod(name),
        };
        if old_val == val {
            return;
        }

        let Some(class) = self.class() else {
            return;
        };
        if let Some(inst) = self.instance_mut() {
            inst.processing.insert(guard.clone());
        }

        let change = ModChange {
            elem: elem.cloned(),
            elem_name,
            name: name.to_string(),
            val,
            old_val,
        };

        let mut proceed = self.run_hooks(&class, true, &change);
        if proceed {
            if change.elem.is_none() {
                if let Some(inst) = self.instance_mut() {
                    inst.mods.insert(change.name.clone(), change.val.clone());
                }
            }
            self.host.write_mod(id, &change);
            proceed = self.run_hooks(&class, false, &change);
        }

        if let Some(inst) = self.instance_mut() {
            inst.processing.remove(&guard);
        }

        tracing::trace!(
            %id,
            elem = ?change.elem_name,
            modifier = %change.name,
            from = %change.old_val,
            to = %change.val,
            proceed,
            "modifier change"
        );

        if proceed {
            self.emit_mod_change(change);
        }
    }

    fn run_hooks(&mut self, class: &Rc<BlockClass<H>>, before: bool, change: &ModChange<H::Elem>) -> bool {
        for key in HookKey::candidates(change.elem_name.as_deref(), &change.name, &change.val) {
            let key = if before { MemberKey::BeforeSetMod(key) } else { MemberKey::OnSetMod(key) };
            if let Some(slot) = class.lookup(&key) {
                if !Super::of(slot).hook(self, change) {
                    return false;
                }
            }
        }
        true
    }

    fn emit_mod_change(&mut self, change: ModChange<H::Elem>) {
        let elem = change.elem_name.clone();
        let any = mod_event_name(elem.as_deref(), &change.name, &ModPattern::Any);
        let exact = mod_event_name(elem.as_deref(), &change.name, &ModPattern::Exact(change.val.clone()));
        let is_js = change.name == JS_MOD;
        let payload = Payload::Mod(change);
        self.deliver(&any, &payload, is_js);
        self.deliver(&exact, &payload, is_js);
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn on(&mut self, events: &str, handler: Rc<ListenerFn<H>>) -> &mut Self {
        self.on_with(events, handler, Subscribe::default())
    }

    pub fn once(&mut self, events: &str, handler: Rc<ListenerFn<H>>) -> &mut Self {
        self.on_with(events, handler, Subscribe::default().once())
    }

    pub fn on_with(&mut self, events: &str, handler: Rc<ListenerFn<H>>, opts: Subscribe) -> &mut Self {
        if let Some(inst) = self.instance_mut() {
            inst.emitter.subscribe(events, handler, opts);
        }
        self
    }

    /// Subscribe to a block modifier change; `*` matches any value
    pub fn on_mod(&mut self, name: &str, val: impl Into<ModPattern>, handler: Rc<ListenerFn<H>>) -> &mut Self {
        let event = mod_event_name(None, name, &val.into());
        self.on(&event, handler)
    }

    pub fn on_elem_mod(
        &mut self,
        elem: &str,
        name: &str,
        val: impl Into<ModPattern>,
        handler: Rc<ListenerFn<H>>,
    ) -> &mut Self {
        let event = mod_event_name(Some(elem), name, &val.into());
        self.on(&event, handler)
    }

    pub fn un(&mut self, events: Option<&str>, handler: Option<&Rc<ListenerFn<H>>>) -> &mut Self {
        if let Some(inst) = self.instance_mut() {
            inst.emitter.un(events, handler, None);
        }
        self
    }

    pub fn un_mod(&mut self, name: &str, val: impl Into<ModPattern>, handler: Option<&Rc<ListenerFn<H>>>) -> &mut Self {
        let event = mod_event_name(None, name, &val.into());
        self.un(Some(&event), handler)
    }

    /// Emit to instance then type-level listeners; ignored until initialized
    pub fn emit(&mut self, kind: &str, data: Value) -> &mut Self {
        let payload = if data.is_null() { Payload::None } else { Payload::Data(data) };
        self.deliver(kind, &payload, false);
        self
    }

    fn deliver(&mut self, kind: &str, payload: &Payload<H::Elem>, force: bool) {
        if !self.is_alive() || !(force || self.is_inited()) {
            return;
        }
        let id = self.id;
        let mut event = BlockEvent::with_target(kind, id);
        let listeners = match self.instance() {
            Some(inst) => inst.emitter.listeners(kind),
            None => return,
        };
        if !listeners.is_empty() {
            let fired = dispatch(&listeners, &mut event, payload, |f, e, p| f(&mut self.at(id), e, p));
            if let Some(inst) = self.instance_mut() {
                inst.emitter.forget(&fired);
            }
        }
        self.host.relay_emit(id, &mut event, payload);
    }

    // ------------------------------------------------------------------
    // Methods and lifecycle
    // ------------------------------------------------------------------

    /// Call a method declared on the type
    pub fn call(&mut self, method: &str, args: &[Value]) -> BemResult<Value> {
        let class = self.class().ok_or(BemError::Destructed(self.id))?;
        let slot = class
            .lookup(&MemberKey::Prop(method.to_string()))
            .ok_or_else(|| BemError::UnknownMethod {
                block: class.name().to_string(),
                method: method.to_string(),
            })?;
        Ok(Super::of(slot).call(self, args))
    }

    /// Queue `f` for the next tick; skipped if the instance is no longer
    /// initialized by then
    pub fn next_tick<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut Ctx<'_, H>) + 'static,
    {
        let id = self.id;
        self.host.registry_mut().push_tick(Box::new(move |host: &mut H| {
            let mut ctx = Ctx::new(host, id);
            if ctx.is_alive() && ctx.is_inited() {
                f(&mut ctx);
            }
        }));
        self
    }

    /// Destroy the instance
    pub fn destruct(&mut self) {
        if !self.is_alive() {
            return;
        }
        let id = self.id;
        tracing::debug!(block = %self.name(), %id, "destructing");
        self.del_mod(JS_MOD);
        self.host.on_destruct(id);
        if let Some(mut inst) = self.host.registry_mut().remove_instance(id) {
            inst.emitter.clear();
        }
    }
}
