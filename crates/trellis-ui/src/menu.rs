//! Headless menu.
//!
//! `Menu` owns the active index through a menu manager and publishes it
//! through a selector context. Each `MenuItem` selects only whether it is
//! the active one, so moving the selection re-renders the two items whose
//! flag flipped and nothing else.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use trellis_core::{
    Context, Same, StateManagerOptions, child, child_always, create_named_context, remember,
    use_context_selector, use_state_manager,
};
use trellis_state::{
    MenuActions, MenuItemActions, MenuItemState, MenuState, create_menu_item_manager,
    create_menu_manager,
};

#[derive(Clone, Debug, PartialEq)]
pub enum MenuEntry {
    Item(MenuItemProps),
    Divider,
}

impl MenuEntry {
    pub fn item(label: impl Into<String>) -> Self {
        MenuEntry::Item(MenuItemProps::new(label))
    }

    /// An item that opens a submenu.
    pub fn submenu(label: impl Into<String>) -> Self {
        MenuEntry::Item(MenuItemProps::new(label).has_menu(true))
    }
}

impl From<MenuItemProps> for MenuEntry {
    fn from(props: MenuItemProps) -> Self {
        MenuEntry::Item(props)
    }
}

/// One item of a menu. Callbacks compare by identity.
#[derive(Clone, Default)]
pub struct MenuItemProps {
    pub label: String,
    pub has_menu: bool,
    /// Controlled submenu state; wins over clicks and keyboard actions.
    pub menu_open: Option<bool>,
    pub default_menu_open: Option<bool>,
    /// Receives every requested submenu state, controlled or not.
    pub on_menu_open_change: Option<Rc<dyn Fn(bool)>>,
    /// Called when the item asks to become the active one without a click.
    pub on_active_changed: Option<Rc<dyn Fn(bool)>>,
    pub on_click: Option<Rc<dyn Fn()>>,
    /// Receives whether focus came from the keyboard.
    pub on_focus: Option<Rc<dyn Fn(bool)>>,
    pub on_blur: Option<Rc<dyn Fn()>>,
}

impl MenuItemProps {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn has_menu(mut self, has_menu: bool) -> Self {
        self.has_menu = has_menu;
        self
    }

    pub fn menu_open(mut self, open: bool) -> Self {
        self.menu_open = Some(open);
        self
    }

    pub fn default_menu_open(mut self, open: bool) -> Self {
        self.default_menu_open = Some(open);
        self
    }

    pub fn on_menu_open_change(mut self, f: impl Fn(bool) + 'static) -> Self {
        self.on_menu_open_change = Some(Rc::new(f));
        self
    }

    pub fn on_active_changed(mut self, f: impl Fn(bool) + 'static) -> Self {
        self.on_active_changed = Some(Rc::new(f));
        self
    }

    pub fn on_click(mut self, f: impl Fn() + 'static) -> Self {
        self.on_click = Some(Rc::new(f));
        self
    }

    pub fn on_focus(mut self, f: impl Fn(bool) + 'static) -> Self {
        self.on_focus = Some(Rc::new(f));
        self
    }

    pub fn on_blur(mut self, f: impl Fn() + 'static) -> Self {
        self.on_blur = Some(Rc::new(f));
        self
    }
}

impl PartialEq for MenuItemProps {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
            && self.has_menu == other.has_menu
            && self.menu_open == other.menu_open
            && self.default_menu_open == other.default_menu_open
            && self.on_menu_open_change.same(&other.on_menu_open_change)
            && self.on_active_changed.same(&other.on_active_changed)
            && self.on_click.same(&other.on_click)
            && self.on_focus.same(&other.on_focus)
            && self.on_blur.same(&other.on_blur)
    }
}

impl fmt::Debug for MenuItemProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItemProps")
            .field("label", &self.label)
            .field("has_menu", &self.has_menu)
            .field("menu_open", &self.menu_open)
            .field("default_menu_open", &self.default_menu_open)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Default)]
pub struct MenuProps {
    pub items: Vec<MenuEntry>,
    /// Controlled active index; always wins over internal state.
    pub active_index: Option<usize>,
    /// Active index used when the menu is first rendered.
    pub default_active_index: Option<usize>,
    pub vertical: bool,
    pub on_item_click: Option<Rc<dyn Fn(usize)>>,
    /// Receives every rendered item.
    pub on_render_item: Option<Rc<dyn Fn(&MenuItemView)>>,
}

impl MenuProps {
    pub fn new(items: Vec<MenuEntry>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn active_index(mut self, index: usize) -> Self {
        self.active_index = Some(index);
        self
    }

    pub fn default_active_index(mut self, index: usize) -> Self {
        self.default_active_index = Some(index);
        self
    }

    pub fn vertical(mut self, vertical: bool) -> Self {
        self.vertical = vertical;
        self
    }

    pub fn on_item_click(mut self, f: impl Fn(usize) + 'static) -> Self {
        self.on_item_click = Some(Rc::new(f));
        self
    }

    pub fn on_render_item(mut self, f: impl Fn(&MenuItemView) + 'static) -> Self {
        self.on_render_item = Some(Rc::new(f));
        self
    }
}

/// Stable link from items back to their menu. Always points at the
/// actions and callbacks of the menu's latest render.
#[derive(Default)]
pub struct MenuHandle {
    actions: RefCell<Option<Rc<MenuActions>>>,
    on_item_click: RefCell<Option<Rc<dyn Fn(usize)>>>,
    on_render_item: RefCell<Option<Rc<dyn Fn(&MenuItemView)>>>,
}

impl MenuHandle {
    fn update(&self, actions: Rc<MenuActions>, props: &MenuProps) {
        *self.actions.borrow_mut() = Some(actions);
        *self.on_item_click.borrow_mut() = props.on_item_click.clone();
        *self.on_render_item.borrow_mut() = props.on_render_item.clone();
    }

    /// Makes the item at `index` the active one.
    pub fn select(&self, index: usize) {
        let actions = self.actions.borrow().clone();
        if let Some(actions) = actions {
            actions.select(index);
        }
    }

    fn item_clicked(&self, index: usize) {
        self.select(index);
        let on_item_click = self.on_item_click.borrow().clone();
        if let Some(on_item_click) = on_item_click {
            on_item_click(index);
        }
    }

    fn report(&self, view: &MenuItemView) {
        let on_render_item = self.on_render_item.borrow().clone();
        if let Some(on_render_item) = on_render_item {
            on_render_item(view);
        }
    }
}

/// What a menu publishes to its items.
#[derive(Default)]
pub struct MenuContextValue {
    pub active_index: Option<usize>,
    pub vertical: bool,
    pub handle: Option<Rc<MenuHandle>>,
}

thread_local! {
    static MENU_CONTEXT: Context<Rc<MenuContextValue>> =
        create_named_context("MenuContext", Rc::new(MenuContextValue::default()));
}

pub fn menu_context() -> Context<Rc<MenuContextValue>> {
    MENU_CONTEXT.with(Context::clone)
}

pub fn Menu(key: impl Into<String>, props: MenuProps) {
    child_always(key, props, render_menu);
}

fn render_menu(props: &MenuProps) {
    let (default_active_index, active_index) = (props.default_active_index, props.active_index);
    let menu = use_state_manager(
        create_menu_manager,
        StateManagerOptions::new()
            .initial_state(move || MenuState {
                active_index: default_active_index,
            })
            .state(move || MenuState { active_index }),
    );

    let handle = remember(MenuHandle::default);
    handle.update(menu.actions.clone(), props);

    let value = Rc::new(MenuContextValue {
        active_index: menu.state.active_index,
        vertical: props.vertical,
        handle: Some(handle),
    });

    let items = props.items.clone();
    let vertical = props.vertical;
    menu_context().provider("items", value, move || {
        let items_count = items
            .iter()
            .filter(|entry| matches!(entry, MenuEntry::Item(_)))
            .count();
        let mut item_position = 0;

        for (index, entry) in items.iter().enumerate() {
            let MenuEntry::Item(item) = entry else {
                continue;
            };
            item_position += 1;
            child(
                format!("item-{index}"),
                ItemSlot {
                    index,
                    item_position,
                    items_count,
                    vertical,
                    item: Rc::new(item.clone()),
                },
                render_menu_item,
            );
        }
    });
}

/// An item together with where the menu placed it.
#[derive(PartialEq)]
struct ItemSlot {
    index: usize,
    item_position: usize,
    items_count: usize,
    vertical: bool,
    item: Rc<MenuItemProps>,
}

fn render_menu_item(slot: &ItemSlot) {
    let context = menu_context();
    let index = slot.index;
    let active = use_context_selector(&context, move |menu: &Rc<MenuContextValue>| {
        menu.active_index == Some(index)
    });
    let handle = use_context_selector(&context, |menu: &Rc<MenuContextValue>| {
        menu.handle.clone()
    });
    let (default_menu_open, menu_open) = (slot.item.default_menu_open, slot.item.menu_open);
    let state = use_state_manager(
        create_menu_item_manager,
        StateManagerOptions::new()
            .initial_state(move || MenuItemState {
                menu_open: default_menu_open,
                ..Default::default()
            })
            .state(move || MenuItemState {
                menu_open,
                ..Default::default()
            }),
    );

    let view = MenuItemView {
        index,
        label: slot.item.label.clone(),
        item_position: slot.item_position,
        items_count: slot.items_count,
        active,
        vertical: slot.vertical,
        has_menu: slot.item.has_menu,
        menu_open: slot.item.has_menu && state.state.is_menu_open(),
        from_keyboard: state.state.is_from_keyboard.unwrap_or(false),
        menu: handle.as_ref().map(Rc::downgrade).unwrap_or_default(),
        actions: state.actions.clone(),
        item: slot.item.clone(),
    };

    match handle {
        Some(handle) => handle.report(&view),
        None => log::debug!("menu item {index} rendered without a menu"),
    }
}

/// A rendered menu item and the interactions it supports.
#[derive(Clone)]
pub struct MenuItemView {
    pub index: usize,
    pub label: String,
    /// 1-based position among items, dividers excluded.
    pub item_position: usize,
    pub items_count: usize,
    pub active: bool,
    pub vertical: bool,
    pub has_menu: bool,
    pub menu_open: bool,
    pub from_keyboard: bool,
    menu: Weak<MenuHandle>,
    actions: Rc<MenuItemActions>,
    item: Rc<MenuItemProps>,
}

impl MenuItemView {
    /// Opens the submenu (or toggles it, on the active item), then selects
    /// the item.
    pub fn click(&self) {
        if self.has_menu {
            self.set_menu_open(if self.active { !self.menu_open } else { true });
        }
        if let Some(menu) = self.menu.upgrade() {
            menu.item_clicked(self.index);
        }
        if let Some(on_click) = &self.item.on_click {
            on_click();
        }
    }

    /// Keyboard open: opens a closed submenu and makes the item active.
    pub fn open_menu(&self) {
        if !self.has_menu || self.menu_open {
            return;
        }
        self.set_menu_open(true);
        if let Some(menu) = self.menu.upgrade() {
            menu.select(self.index);
        }
        if let Some(on_active_changed) = &self.item.on_active_changed {
            on_active_changed(true);
        }
    }

    pub fn close_menu(&self) {
        if self.has_menu && self.menu_open {
            self.set_menu_open(false);
        }
    }

    pub fn focus(&self, from_keyboard: bool) {
        self.actions.set_from_keyboard(from_keyboard);
        if let Some(on_focus) = &self.item.on_focus {
            on_focus(from_keyboard);
        }
    }

    pub fn blur(&self) {
        self.actions.set_from_keyboard(false);
        if let Some(on_blur) = &self.item.on_blur {
            on_blur();
        }
    }

    fn set_menu_open(&self, open: bool) {
        if open {
            self.actions.open_menu();
        } else {
            self.actions.close_menu();
        }
        if let Some(on_menu_open_change) = &self.item.on_menu_open_change {
            on_menu_open_change(open);
        }
    }
}

impl fmt::Debug for MenuItemView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItemView")
            .field("index", &self.index)
            .field("label", &self.label)
            .field("item_position", &self.item_position)
            .field("items_count", &self.items_count)
            .field("active", &self.active)
            .field("menu_open", &self.menu_open)
            .field("from_keyboard", &self.from_keyboard)
            .finish()
    }
}
