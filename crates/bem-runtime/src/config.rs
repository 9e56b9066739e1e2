//! Runtime Configuration

use serde::Deserialize;

/// Runtime configuration options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Attribute holding the JSON parameters of the blocks on a node
    pub params_attr: String,

    /// Class marking nodes that carry blocks
    pub marker_class: String,

    /// Scan the scope right after loading markup
    pub auto_init_scope: bool,

    /// Prefix of generated unique ids
    pub uniq_id_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            params_attr: "data-bem".to_string(),
            marker_class: "i-bem".to_string(),
            auto_init_scope: true,
            uniq_id_prefix: "uniq".to_string(),
        }
    }
}

impl Config {
    /// Load from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Selector matching block-bearing nodes
    pub fn marker_selector(&self) -> String {
        format!(".{}", self.marker_class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.params_attr, "data-bem");
        assert_eq!(config.marker_selector(), ".i-bem");
        assert!(config.auto_init_scope);
    }

    #[test]
    fn test_partial_json() {
        let config = Config::from_json(r#"{"params_attr": "data-block", "auto_init_scope": false}"#).unwrap();
        assert_eq!(config.params_attr, "data-block");
        assert!(!config.auto_init_scope);
        assert_eq!(config.marker_class, "i-bem");
    }
}
