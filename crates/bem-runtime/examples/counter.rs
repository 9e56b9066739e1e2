//! Example: a lazily initialized counter block

use bem_core::{BlockDecl, BlockHost, Flow};
use bem_dom::ElementQuery;
use bem_runtime::{dom_handler, BemDom, Config, RuntimeError};

fn main() -> Result<(), RuntimeError> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = Config {
        auto_init_scope: false,
        ..Config::default()
    };
    let mut dom = BemDom::with_markup(
        r#"<body>
             <div class="counter i-bem" data-bem='{"counter":{}}'>
               <button class="counter__btn">+</button>
             </div>
           </body>"#,
        config,
    )?;

    dom.decl(BlockDecl::new("counter").live_with(|dom: &mut BemDom, name: &str| {
        dom.live_bind_to(
            name,
            "btn",
            "click",
            dom_handler(|ctx, _event| {
                let n: u32 = ctx.get_mod("count").as_str().parse().unwrap_or(0);
                ctx.set_mod("count", n + 1);
                Flow::Continue
            }),
        );
        true
    }))?;

    let report = dom.init_scope();
    println!("constructed {}, deferred {}", report.blocks.len(), report.deferred);

    let Some(btn) = dom.tree().get_elements_by_class_name(dom.scope(), "counter__btn").first().copied() else {
        return Ok(());
    };
    for _ in 0..3 {
        dom.dispatch(btn, "click");
    }

    let counter = dom.tree().query_selector(dom.scope(), ".counter")?;
    if let Some(counter) = counter {
        println!("class: {}", dom.tree().attr(counter, "class").unwrap_or_default());
    }
    Ok(())
}
