//! Naming contract
//!
//! Builds and parses class names of the form
//! `block[__elem][_mod[_val]]`. Names match `[a-zA-Z0-9-]+`.

use crate::modifier::{ModMap, ModVal};

/// Delimiter before a modifier name and value
pub const MOD_DELIM: &str = "_";
/// Delimiter before an element name
pub const ELEM_DELIM: &str = "__";

/// Check a block, element or modifier name
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// `_name[_val]`, empty for an absent value
pub fn build_mod_postfix(mod_name: &str, val: &ModVal) -> String {
    match val {
        ModVal::Absent => String::new(),
        ModVal::Present => format!("{MOD_DELIM}{mod_name}"),
        ModVal::Value(v) => format!("{MOD_DELIM}{mod_name}{MOD_DELIM}{v}"),
    }
}

/// `block` or `block__elem`
pub fn build_entity(block: &str, elem: Option<&str>) -> String {
    match elem {
        Some(elem) => format!("{block}{ELEM_DELIM}{elem}"),
        None => block.to_string(),
    }
}

/// Class for a block or element, optionally with one modifier
pub fn build_class(block: &str, elem: Option<&str>, modifier: Option<(&str, &ModVal)>) -> String {
    let mut class = build_entity(block, elem);
    if let Some((name, val)) = modifier {
        class.push_str(&build_mod_postfix(name, val));
    }
    class
}

/// Entity class followed by one class per set modifier
pub fn build_classes(block: &str, elem: Option<&str>, mods: &ModMap) -> String {
    let base = build_entity(block, elem);
    let mut out = base.clone();
    for (name, val) in mods {
        if val.is_set() {
            out.push(' ');
            out.push_str(&base);
            out.push_str(&build_mod_postfix(name, val));
        }
    }
    out
}

/// Class selector, `.class`
pub fn build_selector(block: &str, elem: Option<&str>, modifier: Option<(&str, &ModVal)>) -> String {
    format!(".{}", build_class(block, elem, modifier))
}

/// Class prefix shared by every value of one modifier
pub fn build_mod_class_prefix(block: &str, elem: Option<&str>, mod_name: &str) -> String {
    format!("{}{MOD_DELIM}{mod_name}", build_entity(block, elem))
}

/// Value encoded by a class token for the given prefix
fn token_value(token: &str, prefix: &str) -> Option<ModVal> {
    let rest = token.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some(ModVal::Present);
    }
    let val = rest.strip_prefix(MOD_DELIM)?;
    is_valid_name(val).then(|| ModVal::Value(val.to_string()))
}

/// Value of one modifier encoded in a class attribute
pub fn extract_mod_val(class_attr: &str, block: &str, elem: Option<&str>, mod_name: &str) -> ModVal {
    let prefix = build_mod_class_prefix(block, elem, mod_name);
    class_attr
        .split_whitespace()
        .find_map(|token| token_value(token, &prefix))
        .unwrap_or_default()
}

/// Every modifier encoded in a class attribute
pub fn extract_mods(class_attr: &str, block: &str, elem: Option<&str>) -> ModMap {
    let base = format!("{}{MOD_DELIM}", build_entity(block, elem));
    let mut out = ModMap::new();
    for token in class_attr.split_whitespace() {
        let Some(rest) = token.strip_prefix(&base) else {
            continue;
        };
        let (name, val) = match rest.split_once(MOD_DELIM) {
            Some((name, val)) if is_valid_name(val) => (name, ModVal::Value(val.to_string())),
            Some(_) => continue,
            None => (rest, ModVal::Present),
        };
        if is_valid_name(name) {
            out.entry(name.to_string()).or_insert(val);
        }
    }
    out
}

/// Element name of the first `block__elem` class in the attribute
pub fn extract_elem_name(class_attr: &str, block: &str) -> Option<String> {
    let prefix = format!("{block}{ELEM_DELIM}");
    class_attr.split_whitespace().find_map(|token| {
        let name = token.strip_prefix(&prefix)?;
        is_valid_name(name).then(|| name.to_string())
    })
}

/// Rewrite a class attribute so it encodes `new_val` for one modifier
///
/// The first token carrying the modifier is replaced in place, or
/// removed for an absent value. A missing token is appended.
pub fn replace_mod_class(
    class_attr: &str,
    block: &str,
    elem: Option<&str>,
    mod_name: &str,
    new_val: &ModVal,
) -> String {
    let prefix = build_mod_class_prefix(block, elem, mod_name);
    let new_token = match new_val {
        ModVal::Absent => None,
        val => Some(format!("{}{}", build_entity(block, elem), build_mod_postfix(mod_name, val))),
    };

    let mut tokens: Vec<&str> = class_attr.split_whitespace().collect();
    let pos = tokens.iter().position(|t| token_value(t, &prefix).is_some());
    match (pos, new_token.as_deref()) {
        (Some(i), Some(token)) => tokens[i] = token,
        (Some(i), None) => {
            tokens.remove(i);
        }
        (None, Some(token)) => {
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        (None, None) => {}
    }
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::mods;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("todo-list"));
        assert!(is_valid_name("b1"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("a_b"));
        assert!(!is_valid_name("a b"));
    }

    #[test]
    fn test_build_class() {
        assert_eq!(build_class("button", None, None), "button");
        assert_eq!(build_class("button", None, Some(("disabled", &ModVal::Present))), "button_disabled");
        assert_eq!(build_class("button", None, Some(("size", &"m".into()))), "button_size_m");
        assert_eq!(build_class("todo", Some("item"), Some(("done", &ModVal::Present))), "todo__item_done");
        assert_eq!(build_class("todo", Some("item"), Some(("done", &ModVal::Absent))), "todo__item");
    }

    #[test]
    fn test_build_classes() {
        let m = mods([("done", ModVal::Present), ("hidden", ModVal::Absent), ("size", "l".into())]);
        assert_eq!(build_classes("todo", Some("item"), &m), "todo__item todo__item_done todo__item_size_l");
    }

    #[test]
    fn test_build_selector() {
        assert_eq!(build_selector("b", Some("e"), None), ".b__e");
    }

    #[test]
    fn test_extract_mod_val() {
        let class = "counter counter_count_3 i-bem counter_js_inited";
        assert_eq!(extract_mod_val(class, "counter", None, "count"), "3".into());
        assert_eq!(extract_mod_val(class, "counter", None, "js"), "inited".into());
        assert_eq!(extract_mod_val(class, "counter", None, "missing"), ModVal::Absent);
        assert_eq!(extract_mod_val("b b_on", "b", None, "on"), ModVal::Present);
    }

    #[test]
    fn test_extract_ignores_other_entities() {
        let class = "b__e b__e_on b_size_s";
        assert_eq!(extract_mod_val(class, "b", None, "on"), ModVal::Absent);
        assert_eq!(extract_mod_val(class, "b", Some("e"), "on"), ModVal::Present);
        assert_eq!(extract_mod_val("b_sizes_x", "b", None, "size"), ModVal::Absent);
    }

    #[test]
    fn test_extract_mods() {
        let all = extract_mods("b b_a b_c_d b__e_x", "b", None);
        assert_eq!(all.len(), 2);
        assert_eq!(all["a"], ModVal::Present);
        assert_eq!(all["c"], "d".into());
    }

    #[test]
    fn test_extract_elem_name() {
        assert_eq!(extract_elem_name("x todo__item todo__item_done", "todo"), Some("item".into()));
        assert_eq!(extract_elem_name("todo", "todo"), None);
    }

    #[test]
    fn test_replace_mod_class() {
        assert_eq!(replace_mod_class("b", "b", None, "on", &ModVal::Present), "b b_on");
        assert_eq!(replace_mod_class("b b_on x", "b", None, "on", &"yes".into()), "b b_on_yes x");
        assert_eq!(replace_mod_class("b b_on_yes x", "b", None, "on", &ModVal::Absent), "b x");
        assert_eq!(replace_mod_class("b", "b", None, "on", &ModVal::Absent), "b");
        assert_eq!(
            replace_mod_class("b__e", "b", Some("e"), "done", &ModVal::Present),
            "b__e b__e_done"
        );
    }
}
