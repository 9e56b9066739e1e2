//! BEM Runtime
//!
//! Blocks bound to a parsed document. Nodes marked with the marker class
//! declare blocks through a JSON parameter attribute; the runtime
//! constructs their instances, keeps their modifiers in node classes and
//! routes DOM events to them, either through direct bindings or through
//! delegation at the scope node.
//!
//! ```no_run
//! use bem_core::{BlockDecl, BlockHost, Flow};
//! use bem_runtime::{dom_handler, BemDom, Config};
//!
//! let mut dom = BemDom::with_markup(
//!     r#"<body><div class="counter i-bem" data-bem='{"counter":{}}'>
//!         <button class="counter__btn">+</button>
//!     </div></body>"#,
//!     Config { auto_init_scope: false, ..Config::default() },
//! )?;
//! dom.decl(BlockDecl::new("counter").live_with(|dom: &mut BemDom, name: &str| {
//!     dom.live_bind_to(name, "btn", "click", dom_handler(|ctx, _event| {
//!         let n: u32 = ctx.get_mod("count").as_str().parse().unwrap_or(0);
//!         ctx.set_mod("count", n + 1);
//!         Flow::Continue
//!     }));
//!     true
//! }))?;
//! dom.init_scope();
//! # Ok::<(), bem_runtime::RuntimeError>(())
//! ```

mod bindings;
mod config;
mod ctx;
mod elems;
mod error;
mod find;
mod live;
mod mutate;
mod nodes;
pub mod params;
mod runtime;

pub use bindings::{dom_handler, DomHandler, Target};
pub use config::Config;
pub use ctx::DomCtx;
pub use elems::elem_cache_key;
pub use error::{RuntimeError, RuntimeResult};
pub use find::BlockQuery;
pub use live::LiveTarget;
pub use mutate::Content;
pub use nodes::NodeSet;
pub use runtime::{BemDom, DomBlock, ScanReport, DOM_BLOCK};
