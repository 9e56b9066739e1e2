//! Block declarations

use std::rc::Rc;

use serde_json::Value;

use super::member::{hook_fn, method_fn, HookKey, Member, MemberKey, Super};
use super::registry::{process_live, BlockMeta};
use super::{BlockClass, Ctx, Host};
use crate::error::{BemError, BemResult};
use crate::inherit::{compose, compose_self, Class};
use crate::modifier::{ModChange, ModPattern, ModVal};

/// Condition under which a modifier-scoped declaration applies
#[derive(Debug, Clone)]
pub struct ModCondition {
    pub name: String,
    /// Accepted values; empty means any set value
    pub vals: Vec<ModVal>,
}

impl ModCondition {
    pub fn check<H: Host>(&self, ctx: &mut Ctx<'_, H>) -> bool {
        let current = ctx.get_mod(&self.name);
        if self.vals.is_empty() {
            current.is_set()
        } else {
            self.vals.contains(&current)
        }
    }

    /// Run `member` only while the condition holds, else fall through to
    /// the overridden implementation
    fn guard<H: Host>(&self, member: Member<H>) -> Member<H> {
        match member {
            Member::Method(f) => {
                let cond = self.clone();
                Member::Method(method_fn(move |ctx, base, args| {
                    if cond.check(ctx) { f(ctx, base, args) } else { base.call(ctx, args) }
                }))
            }
            Member::Hook(f) => {
                let cond = self.clone();
                Member::Hook(hook_fn(move |ctx, base, change| {
                    if cond.check(ctx) { f(ctx, base, change) } else { base.hook(ctx, change) }
                }))
            }
            other => other,
        }
    }
}

/// Declaration of a block type
///
/// Without an explicit base the type extends the block already declared
/// under the same name (amending it in place) or the host's root type.
pub struct BlockDecl<H: Host> {
    name: String,
    base: Option<String>,
    mixes: Vec<String>,
    mixin: bool,
    condition: Option<ModCondition>,
    members: Vec<(MemberKey, Member<H>)>,
    statics: Vec<(MemberKey, Member<H>)>,
}

impl<H: Host> BlockDecl<H> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            mixes: Vec::new(),
            mixin: false,
            condition: None,
            members: Vec::new(),
            statics: Vec::new(),
        }
    }

    /// A standalone member table meant to be mixed into other types
    pub fn mixin(name: impl Into<String>) -> Self {
        let mut decl = Self::new(name);
        decl.mixin = true;
        decl
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn mix(mut self, name: impl Into<String>) -> Self {
        self.mixes.push(name.into());
        self
    }

    /// Apply the declared methods and hooks only while `name` is `val`
    pub fn when_mod(self, name: impl Into<String>, val: impl Into<ModVal>) -> Self {
        self.when_mod_any(name, [val.into()])
    }

    /// Apply while `name` has any of `vals`
    pub fn when_mod_any<I>(mut self, name: impl Into<String>, vals: I) -> Self
    where
        I: IntoIterator<Item = ModVal>,
    {
        self.condition = Some(ModCondition {
            name: name.into(),
            vals: vals.into_iter().collect(),
        });
        self
    }

    /// Apply while `name` is set to anything
    pub fn when_has_mod(mut self, name: impl Into<String>) -> Self {
        self.condition = Some(ModCondition {
            name: name.into(),
            vals: Vec::new(),
        });
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut Ctx<'_, H>, &Super<H>, &[Value]) -> Value + 'static,
    {
        self.members.push((MemberKey::Prop(name.into()), Member::Method(Rc::new(f))));
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: Value) -> Self {
        self.members.push((MemberKey::Prop(name.into()), Member::Value(value)));
        self
    }

    /// Runs at construction with the merged parameters as the only argument
    pub fn constructor<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Ctx<'_, H>, &Super<H>, &[Value]) -> Value + 'static,
    {
        self.members.push((MemberKey::Constructor, Member::Method(Rc::new(f))));
        self
    }

    /// Defaults merged under the parameters given at construction
    pub fn default_params(mut self, params: Value) -> Self {
        self.members.push((MemberKey::DefaultParams, Member::Value(params)));
        self
    }

    pub fn before_set_mod<F>(self, name: &str, val: impl Into<ModPattern>, f: F) -> Self
    where
        F: Fn(&mut Ctx<'_, H>, &Super<H>, &ModChange<H::Elem>) -> bool + 'static,
    {
        self.hook(true, None, name, val.into(), f)
    }

    pub fn on_set_mod<F>(self, name: &str, val: impl Into<ModPattern>, f: F) -> Self
    where
        F: Fn(&mut Ctx<'_, H>, &Super<H>, &ModChange<H::Elem>) -> bool + 'static,
    {
        self.hook(false, None, name, val.into(), f)
    }

    pub fn before_elem_set_mod<F>(self, elem: &str, name: &str, val: impl Into<ModPattern>, f: F) -> Self
    where
        F: Fn(&mut Ctx<'_, H>, &Super<H>, &ModChange<H::Elem>) -> bool + 'static,
    {
        self.hook(true, Some(elem), name, val.into(), f)
    }

    pub fn on_elem_set_mod<F>(self, elem: &str, name: &str, val: impl Into<ModPattern>, f: F) -> Self
    where
        F: Fn(&mut Ctx<'_, H>, &Super<H>, &ModChange<H::Elem>) -> bool + 'static,
    {
        self.hook(false, Some(elem), name, val.into(), f)
    }

    fn hook<F>(mut self, before: bool, elem: Option<&str>, name: &str, val: ModPattern, f: F) -> Self
    where
        F: Fn(&mut Ctx<'_, H>, &Super<H>, &ModChange<H::Elem>) -> bool + 'static,
    {
        let key = HookKey::new(elem, name, &val);
        let key = if before { MemberKey::BeforeSetMod(key) } else { MemberKey::OnSetMod(key) };
        self.members.push((key, Member::Hook(Rc::new(f))));
        self
    }

    pub fn static_prop(mut self, name: impl Into<String>, value: Value) -> Self {
        self.statics.push((MemberKey::Prop(name.into()), Member::Value(value)));
        self
    }

    pub fn static_method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut H, &str, &Super<H>, &[Value]) -> Value + 'static,
    {
        self.statics.push((MemberKey::Prop(name.into()), Member::Static(Rc::new(f))));
        self
    }

    /// Lazy initialization on or off
    pub fn live(self, live: bool) -> Self {
        self.live_with(move |_, _| live)
    }

    /// Lazy-initialization predicate; it may register delegated bindings
    /// and runs once, the first time the type is needed
    pub fn live_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut H, &str) -> bool + 'static,
    {
        self.statics.retain(|(key, _)| *key != MemberKey::Live);
        self.statics.push((MemberKey::Live, Member::Live(Rc::new(f))));
        self
    }
}

pub(crate) fn declare<H: Host>(host: &mut H, decl: BlockDecl<H>) -> BemResult<Rc<BlockClass<H>>> {
    let BlockDecl {
        name,
        base,
        mixes,
        mixin,
        condition,
        mut members,
        statics,
    } = decl;

    if name.is_empty() {
        return Err(BemError::InvalidName(name));
    }

    if let Some(cond) = &condition {
        members = members
            .into_iter()
            .map(|(key, member)| (key, cond.guard(member)))
            .collect();
    }

    if mixin {
        let class: Rc<BlockClass<H>> = Class::root(name.clone(), BlockMeta::default());
        class.amend(members, statics);
        host.registry_mut().insert_class(Rc::clone(&class));
        tracing::debug!(block = %name, "declared mixin");
        return Ok(class);
    }

    let registry = host.registry();
    let base = match &base {
        None => registry.class(&name).unwrap_or_else(|| registry.root()),
        Some(base) => registry.resolve(base, &name)?,
    };
    let mixins = mixes
        .iter()
        .map(|mix| registry.resolve(mix, &name))
        .collect::<BemResult<Vec<_>>>()?;
    let redefines_live = statics.iter().any(|(key, _)| *key == MemberKey::Live);

    if base.name() == name {
        compose_self(&base, &mixins, members, statics);
        tracing::debug!(block = %name, "amended declaration");
        // A replaced predicate runs again if the old one already ran
        if redefines_live && base.ext().live_state().is_some() {
            base.ext().reset_live();
            process_live(host, &base);
        }
        return Ok(base);
    }

    let mut bases = vec![base];
    bases.extend(mixins);
    let class = compose(name.clone(), &bases, members, statics, BlockMeta::default());
    tracing::debug!(block = %name, base = %bases[0].name(), mixins = bases.len() - 1, "declared");
    host.registry_mut().insert_class(Rc::clone(&class));
    Ok(class)
}
