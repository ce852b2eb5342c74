use crate::{Manager, ManagerConfig, Store, create_manager, partial_state};

partial_state! {
    /// State of a single menu item with an optional submenu.
    pub struct MenuItemState {
        pub menu_open: bool,
        /// Whether focus last arrived through the keyboard.
        pub is_from_keyboard: bool,
    }
}

impl MenuItemState {
    pub fn is_menu_open(&self) -> bool {
        self.menu_open.unwrap_or(false)
    }
}

#[derive(Clone)]
pub struct MenuItemActions {
    store: Store<MenuItemState>,
}

impl MenuItemActions {
    pub fn open_menu(&self) {
        self.set_menu_open("open_menu", true);
    }

    pub fn close_menu(&self) {
        self.set_menu_open("close_menu", false);
    }

    pub fn toggle_menu(&self) {
        self.store.dispatch("toggle_menu", |s| {
            Some(MenuItemState {
                menu_open: Some(!s.is_menu_open()),
                ..Default::default()
            })
        });
    }

    pub fn set_from_keyboard(&self, from_keyboard: bool) {
        self.store.dispatch("set_from_keyboard", |_| {
            Some(MenuItemState {
                is_from_keyboard: Some(from_keyboard),
                ..Default::default()
            })
        });
    }

    fn set_menu_open(&self, action: &str, open: bool) {
        self.store.dispatch(action, |_| {
            Some(MenuItemState {
                menu_open: Some(open),
                ..Default::default()
            })
        });
    }
}

pub fn create_menu_item_manager(
    config: ManagerConfig<MenuItemState>,
) -> Manager<MenuItemState, MenuItemActions> {
    create_manager(config, |store| MenuItemActions {
        store: store.clone(),
    })
}
