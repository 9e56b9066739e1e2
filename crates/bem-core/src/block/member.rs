//! Block members
//!
//! Keys and values stored in block type tables, and [`Super`], the
//! handle through which an override reaches the implementation it
//! replaced.

use std::rc::Rc;

use serde_json::Value;

use super::{BlockEvent, Ctx, Host, Payload};
use crate::events::Flow;
use crate::inherit::{MemberName, Slot};
use crate::modifier::{ModChange, ModPattern, ModVal};

/// Instance method
pub type MethodFn<H> = dyn for<'a, 'b, 'c> Fn(&'a mut Ctx<'b, H>, &'c Super<H>, &[Value]) -> Value;

/// Modifier hook; `false` cancels (before) or stops (after)
pub type HookFn<H> =
    dyn for<'a, 'b, 'c> Fn(&'a mut Ctx<'b, H>, &'c Super<H>, &ModChange<<H as Host>::Elem>) -> bool;

/// Static method, receives the name of the type it was called on
pub type StaticFn<H> = dyn for<'a> Fn(&'a mut H, &str, &Super<H>, &[Value]) -> Value;

/// Lazy-initialization predicate, run once per type
pub type LiveFn<H> = dyn for<'a> Fn(&'a mut H, &str) -> bool;

/// Block event listener
pub type ListenerFn<H> =
    dyn for<'a, 'b> Fn(&'a mut Ctx<'b, H>, &mut BlockEvent, &Payload<<H as Host>::Elem>) -> Flow;

/// Modifier hook key, `*` stands for any name or value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HookKey {
    pub elem: Option<String>,
    pub name: String,
    pub val: String,
}

impl HookKey {
    pub fn new(elem: Option<&str>, name: &str, val: &ModPattern) -> Self {
        Self {
            elem: elem.map(str::to_string),
            name: name.to_string(),
            val: val.key().to_string(),
        }
    }

    /// Keys consulted for a change, least specific first
    pub fn candidates(elem: Option<&str>, name: &str, val: &ModVal) -> [HookKey; 3] {
        [
            HookKey::new(elem, "*", &ModPattern::Any),
            HookKey::new(elem, name, &ModPattern::Any),
            HookKey::new(elem, name, &ModPattern::Exact(val.clone())),
        ]
    }
}

/// Member table key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberKey {
    Constructor,
    /// Named method or property
    Prop(String),
    /// Default parameters, merged along the override chain
    DefaultParams,
    /// Static lazy-initialization predicate
    Live,
    BeforeSetMod(HookKey),
    OnSetMod(HookKey),
}

impl MemberName for MemberKey {
    fn constructor() -> Self {
        MemberKey::Constructor
    }
}

/// Member value
pub enum Member<H: Host> {
    Value(Value),
    Method(Rc<MethodFn<H>>),
    Hook(Rc<HookFn<H>>),
    Static(Rc<StaticFn<H>>),
    Live(Rc<LiveFn<H>>),
}

impl<H: Host> Clone for Member<H> {
    fn clone(&self) -> Self {
        match self {
            Member::Value(v) => Member::Value(v.clone()),
            Member::Method(f) => Member::Method(Rc::clone(f)),
            Member::Hook(f) => Member::Hook(Rc::clone(f)),
            Member::Static(f) => Member::Static(Rc::clone(f)),
            Member::Live(f) => Member::Live(Rc::clone(f)),
        }
    }
}

impl<H: Host> std::fmt::Debug for Member<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Member::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Member::Method(_) => f.write_str("Method"),
            Member::Hook(_) => f.write_str("Hook"),
            Member::Static(_) => f.write_str("Static"),
            Member::Live(_) => f.write_str("Live"),
        }
    }
}

/// Handle to an implementation in an override chain
pub struct Super<H: Host> {
    slot: Option<Rc<Slot<Member<H>>>>,
}

impl<H: Host> Super<H> {
    /// Handle that does nothing when called
    pub fn none() -> Self {
        Self { slot: None }
    }

    /// Handle to `slot` itself
    pub fn of(slot: Rc<Slot<Member<H>>>) -> Self {
        Self { slot: Some(slot) }
    }

    fn next(slot: &Slot<Member<H>>) -> Self {
        Self {
            slot: slot.base(),
        }
    }

    pub fn exists(&self) -> bool {
        self.slot.is_some()
    }

    /// Call as a method; values are returned as-is, nothing gives null
    pub fn call(&self, ctx: &mut Ctx<'_, H>, args: &[Value]) -> Value {
        let Some(slot) = &self.slot else {
            return Value::Null;
        };
        match slot.value() {
            Member::Method(f) => f(ctx, &Self::next(slot), args),
            Member::Value(v) => v.clone(),
            _ => Value::Null,
        }
    }

    /// Call as a hook; nothing counts as approval
    pub fn hook(&self, ctx: &mut Ctx<'_, H>, change: &ModChange<H::Elem>) -> bool {
        let Some(slot) = &self.slot else {
            return true;
        };
        match slot.value() {
            Member::Hook(f) => f(ctx, &Self::next(slot), change),
            _ => true,
        }
    }

    /// Call as a static method
    pub fn call_static(&self, host: &mut H, class: &str, args: &[Value]) -> Value {
        let Some(slot) = &self.slot else {
            return Value::Null;
        };
        match slot.value() {
            Member::Static(f) => f(host, class, &Self::next(slot), args),
            Member::Value(v) => v.clone(),
            _ => Value::Null,
        }
    }
}

pub(crate) fn method_fn<H, F>(f: F) -> Rc<MethodFn<H>>
where
    H: Host,
    F: Fn(&mut Ctx<'_, H>, &Super<H>, &[Value]) -> Value + 'static,
{
    Rc::new(f)
}

pub(crate) fn hook_fn<H, F>(f: F) -> Rc<HookFn<H>>
where
    H: Host,
    F: Fn(&mut Ctx<'_, H>, &Super<H>, &ModChange<H::Elem>) -> bool + 'static,
{
    Rc::new(f)
}
