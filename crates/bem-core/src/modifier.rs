//! Modifier values
//!
//! Canonical representation of a modifier value plus the patterns and
//! change records used by hooks and modifier events.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Canonical modifier value
///
/// Boolean `true` and the string `"true"` are the same value, and so
/// are `false`, `null` and the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ModVal {
    /// Not set
    #[default]
    Absent,
    /// Boolean modifier, class carries no value segment
    Present,
    /// Keyed value
    Value(String),
}

impl ModVal {
    /// Normalize a textual value
    pub fn parse(s: &str) -> Self {
        match s {
            "" => ModVal::Absent,
            "true" => ModVal::Present,
            v => ModVal::Value(v.to_string()),
        }
    }

    /// Normalize a JSON value
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null | Value::Bool(false) => ModVal::Absent,
            Value::Bool(true) => ModVal::Present,
            Value::String(s) => ModVal::parse(s),
            other => ModVal::parse(&other.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ModVal::Absent => Value::String(String::new()),
            ModVal::Present => Value::Bool(true),
            ModVal::Value(v) => Value::String(v.clone()),
        }
    }

    /// Textual form, `""` for absent and `"true"` for present
    pub fn as_str(&self) -> &str {
        match self {
            ModVal::Absent => "",
            ModVal::Present => "true",
            ModVal::Value(v) => v,
        }
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        !matches!(self, ModVal::Absent)
    }
}

impl fmt::Display for ModVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ModVal {
    fn from(s: &str) -> Self {
        ModVal::parse(s)
    }
}

impl From<String> for ModVal {
    fn from(s: String) -> Self {
        ModVal::parse(&s)
    }
}

impl From<&String> for ModVal {
    fn from(s: &String) -> Self {
        ModVal::parse(s)
    }
}

impl From<bool> for ModVal {
    fn from(b: bool) -> Self {
        if b { ModVal::Present } else { ModVal::Absent }
    }
}

impl From<&ModVal> for ModVal {
    fn from(v: &ModVal) -> Self {
        v.clone()
    }
}

macro_rules! mod_val_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ModVal {
                fn from(n: $t) -> Self {
                    ModVal::Value(n.to_string())
                }
            }
        )*
    };
}

mod_val_from_int!(i32, i64, u32, u64, usize);

impl Serialize for ModVal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ModVal::Absent => serializer.serialize_str(""),
            ModVal::Present => serializer.serialize_bool(true),
            ModVal::Value(v) => serializer.serialize_str(v),
        }
    }
}

impl<'de> Deserialize<'de> for ModVal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(ModVal::from_json(&value))
    }
}

/// Modifier name to value
pub type ModMap = BTreeMap<String, ModVal>;

/// Build a [`ModMap`] from pairs
pub fn mods<K, V, I>(pairs: I) -> ModMap
where
    K: Into<String>,
    V: Into<ModVal>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// Value pattern for hooks and modifier events
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModPattern {
    /// Matches every value, written `*`
    Any,
    Exact(ModVal),
}

impl ModPattern {
    pub fn matches(&self, val: &ModVal) -> bool {
        match self {
            ModPattern::Any => true,
            ModPattern::Exact(v) => v == val,
        }
    }

    /// Key segment used in event names and hook tables
    pub fn key(&self) -> &str {
        match self {
            ModPattern::Any => "*",
            ModPattern::Exact(v) => v.as_str(),
        }
    }
}

impl From<&str> for ModPattern {
    fn from(s: &str) -> Self {
        if s == "*" { ModPattern::Any } else { ModPattern::Exact(ModVal::parse(s)) }
    }
}

impl From<bool> for ModPattern {
    fn from(b: bool) -> Self {
        ModPattern::Exact(b.into())
    }
}

impl From<ModVal> for ModPattern {
    fn from(v: ModVal) -> Self {
        ModPattern::Exact(v)
    }
}

/// A single modifier transition
#[derive(Debug, Clone)]
pub struct ModChange<E> {
    /// Element handle when the modifier belongs to an element
    pub elem: Option<E>,
    pub elem_name: Option<String>,
    pub name: String,
    pub val: ModVal,
    pub old_val: ModVal,
}

impl<E> ModChange<E> {
    pub fn is_elem(&self) -> bool {
        self.elem.is_some()
    }
}

/// Event name for a modifier change, `[__elem]_name_val`
pub fn mod_event_name(elem: Option<&str>, name: &str, val: &ModPattern) -> String {
    let mut out = String::new();
    if let Some(elem) = elem {
        out.push_str("__");
        out.push_str(elem);
    }
    out.push('_');
    out.push_str(name);
    out.push('_');
    out.push_str(val.key());
    out
}
