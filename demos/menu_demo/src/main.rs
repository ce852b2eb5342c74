use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{Context as _, bail};
use trellis_core::{Host, HostConfig};
use trellis_ui::*;

type Views = Rc<RefCell<BTreeMap<usize, MenuItemView>>>;

fn app(views: &Views) -> impl Fn() + 'static {
    let sink = views.clone();
    let props = MenuProps::new(vec![
        MenuEntry::item("Home"),
        MenuEntry::item("Messages"),
        MenuEntry::Divider,
        MenuEntry::submenu("More"),
    ])
    .default_active_index(0)
    .on_item_click(|index| log::info!("clicked item {index}"))
    .on_render_item(move |view| {
        log::debug!("rendered {view:?}");
        sink.borrow_mut().insert(view.index, view.clone());
    });

    move || Menu("menu", props.clone())
}

fn print_menu(views: &Views) {
    let line: Vec<String> = views
        .borrow()
        .values()
        .map(|v| {
            let mark = if v.active { "*" } else { " " };
            let open = if v.menu_open { " [open]" } else { "" };
            format!("{mark}{}{open}", v.label)
        })
        .collect();
    println!("{}", line.join(" | "));
}

fn click(host: &Host, views: &Views, index: usize) -> anyhow::Result<()> {
    let view = views
        .borrow()
        .get(&index)
        .cloned()
        .with_context(|| format!("no menu item at {index}"))?;
    view.click();
    host.flush()?;
    print_menu(views);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = HostConfig::from_env();
    log::info!("starting menu demo in {:?} mode", config.mode);

    let host = Host::new(config);
    let views: Views = Rc::default();
    host.render(app(&views))?;
    print_menu(&views);

    click(&host, &views, 1)?;
    click(&host, &views, 3)?;
    click(&host, &views, 3)?;

    if views.borrow().len() != 3 {
        bail!("expected three menu items, got {}", views.borrow().len());
    }
    Ok(())
}
