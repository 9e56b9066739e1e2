//! Block parameters
//!
//! The parameter attribute of a node holds one JSON object keyed by
//! block name. Each block's parameters get a unique id that ties every
//! node of one instance together: an explicit `id` shared by several
//! nodes within one initialization wave yields the same unique id.

use bem_core::next_uniq;
use bem_dom::NodeId;
use serde_json::{Map, Value};

use crate::{RuntimeError, RuntimeResult};

/// Parameter key holding the derived unique id
pub const UNIQ_ID: &str = "uniqId";

/// Parse the parameter attribute of a node; a missing or empty
/// attribute declares no blocks
pub fn parse_node_params(node: NodeId, attr: Option<&str>) -> RuntimeResult<Map<String, Value>> {
    let raw = match attr {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(Map::new()),
    };
    let malformed = |reason: String| RuntimeError::MalformedParams { node, reason };

    match serde_json::from_str::<Value>(raw).map_err(|e| malformed(e.to_string()))? {
        Value::Object(map) => {
            if let Some((name, _)) = map.iter().find(|(_, params)| !params.is_object()) {
                return Err(malformed(format!("parameters of \"{name}\" are not an object")));
            }
            Ok(map)
        }
        other => Err(malformed(format!("expected an object, got {other}"))),
    }
}

/// Fresh id with the configured prefix
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}{}", next_uniq().get())
}

/// Unique id of a block's parameters, derived and stored on first use
pub fn assign_uniq_id(params: &mut Map<String, Value>, block: &str, prefix: &str, wave: Option<&str>) -> String {
    if let Some(Value::String(uniq)) = params.get(UNIQ_ID) {
        return uniq.clone();
    }
    let base = match params.get("id") {
        Some(Value::String(id)) => format!("{block}-id-{id}"),
        Some(Value::Number(id)) => format!("{block}-id-{id}"),
        _ => generate_id(prefix),
    };
    let wave = match wave {
        Some(wave) => wave.to_string(),
        None => generate_id(prefix),
    };
    let uniq = format!("{base}{wave}");
    params.insert(UNIQ_ID.to_string(), Value::String(uniq.clone()));
    uniq
}

/// Unique id already stored in parameters
pub fn uniq_id_of(params: &Value) -> Option<&str> {
    params.get(UNIQ_ID).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NODE: NodeId = NodeId::ROOT;

    #[test]
    fn test_parse_blocks() {
        let map = parse_node_params(NODE, Some(r#"{"button":{"id":"b"},"link":{}}"#)).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["button"]["id"], "b");
        assert!(parse_node_params(NODE, None).unwrap().is_empty());
        assert!(parse_node_params(NODE, Some("  ")).unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            parse_node_params(NODE, Some("{button:")),
            Err(RuntimeError::MalformedParams { .. })
        ));
        assert!(parse_node_params(NODE, Some("[1]")).is_err());
        assert!(parse_node_params(NODE, Some(r#"{"b":3}"#)).is_err());
    }

    #[test]
    fn test_shared_id_in_one_wave() {
        let mut a = Map::new();
        a.insert("id".into(), json!("x"));
        let mut b = a.clone();

        let ua = assign_uniq_id(&mut a, "menu", "uniq", Some("w1"));
        let ub = assign_uniq_id(&mut b, "menu", "uniq", Some("w1"));
        assert_eq!(ua, "menu-id-xw1");
        assert_eq!(ua, ub);
        assert_eq!(assign_uniq_id(&mut a, "menu", "uniq", Some("w2")), ua);
    }

    #[test]
    fn test_generated_ids_differ() {
        let mut a = Map::new();
        let mut b = Map::new();
        let ua = assign_uniq_id(&mut a, "b", "uniq", Some("w"));
        let ub = assign_uniq_id(&mut b, "b", "uniq", Some("w"));
        assert_ne!(ua, ub);
        assert!(ua.starts_with("uniq"));
        assert_eq!(uniq_id_of(&Value::Object(a)), Some(ua.as_str()));
    }
}
