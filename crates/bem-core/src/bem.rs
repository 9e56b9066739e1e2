//! Standalone host
//!
//! Blocks without a DOM: modifiers live only in the instance cache.

use serde_json::{Map, Value};

use crate::block::{BlockHost, BlockId, Host, Registry};
use crate::error::{BemError, BemResult};
use crate::modifier::ModMap;

/// Element handle of a host without elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoElem {}

/// Host for blocks that are not bound to any markup
pub struct Bem {
    registry: Registry<Bem>,
}

impl Bem {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    /// Construct and initialize an instance of a declared type
    pub fn create(&mut self, name: &str, mods: ModMap, params: Value) -> BemResult<BlockId> {
        let params = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                tracing::warn!(block = %name, params = %other, "ignoring non-object params");
                Map::new()
            }
        };
        if !self.is_declared(name) {
            return Err(BemError::UnknownBlock(name.to_string()));
        }
        self.construct(name, mods, params, (), true)
    }

    pub fn instance_count(&self) -> usize {
        self.registry.instance_count()
    }
}

impl Default for Bem {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for Bem {
    type Elem = NoElem;
    type Ext = ();

    fn registry(&self) -> &Registry<Self> {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut Registry<Self> {
        &mut self.registry
    }

    fn elem_key(&self, elem: &NoElem) -> String {
        match *elem {}
    }

    fn elem_name(&self, _block: BlockId, elem: &NoElem) -> Option<String> {
        match *elem {}
    }
}
