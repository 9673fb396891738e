use std::cell::Cell;
use std::rc::Rc;

use trellis_core::prelude::*;
use trellis_devtools::Inspector;
use trellis_dom::Document;

fn panel(title: &str) -> Component {
    Component::builder(title)
        .layout(format!(
            r#"<article class="panel"><h2 data-ref="title">{title}</h2></article>"#
        ))
        .on_connected(|c| {
            log::info!("{} is on screen", c.name());
            Ok(())
        })
        .build()
}

fn app() -> Component {
    let switcher = Component::builder("switcher")
        .layout(
            r#"<main>
                 <button data-ref="toggle">Toggle</button>
                 <section data-slot="a"></section>
                 <section data-slot="b"></section>
               </main>"#,
        )
        .refs(RefAnnotation::new().require("toggle", RefType::Caps(ElementCaps::ACTIVATABLE)))
        .slots(["a", "b"])
        .build();

    // Which slot is showing; "a" first.
    let showing_a = Rc::new(Cell::new(true));
    switcher.on_connected(move |c| {
        c.unmount_slot_components("b");
        let showing_a = showing_a.clone();
        showing_a.set(true);
        let this = c.clone();
        c.on(&c.get_ref("toggle")?, "click", move |_| {
            let (show, hide) = if showing_a.get() { ("b", "a") } else { ("a", "b") };
            if let Err(err) = this.mount_slot_components(show) {
                log::error!("could not show slot {show}: {err}");
                return;
            }
            this.unmount_slot_components(hide);
            showing_a.set(!showing_a.get());
        })?;
        Ok(())
    });
    switcher
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let doc = Document::new();
    let switcher = app();
    let first = panel("first");
    let second = panel("second");
    switcher.add_child_component("a", [&first])?;
    switcher.add_child_component("b", [&second])?;
    switcher.mount(&doc.body(), MountMode::Replace)?;

    let mut inspector = Inspector::new();
    inspector.hud.toggle();

    let toggle = switcher.get_ref("toggle")?;
    for round in 0..3 {
        println!("round {round}: {}", doc.body().inner_html());
        println!("{}", inspector.inspect(&switcher).render());
        if let Some(line) = inspector.hud.status_line() {
            println!("{line}");
        }
        toggle.dispatch("click");
    }

    switcher.unmount();
    println!("after unmount: {:?}", doc.body().inner_html());
    Ok(())
}
