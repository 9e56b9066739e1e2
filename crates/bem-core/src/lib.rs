//! BEM Core
//!
//! Type composition, events and the block modifier state machine,
//! independent of any document model.

pub mod bem;
pub mod block;
pub mod error;
pub mod events;
pub mod identify;
pub mod inherit;
pub mod modifier;
pub mod naming;

pub use bem::{Bem, NoElem};
pub use block::{
    emit_to_type, listener, BlockClass, BlockDecl, BlockEvent, BlockHost, BlockId, Ctx, Host, ListenerFn, Payload,
    Registry, Super, INITED, JS_MOD,
};
pub use error::{BemError, BemResult};
pub use events::{callback, Callback, Emitter, Event, Flow, Subscribe, WILDCARD};
pub use identify::{identify, next_uniq, UniqId};
pub use modifier::{mods, ModChange, ModMap, ModPattern, ModVal};

/// Version of the runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
