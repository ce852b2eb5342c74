use crate::{Manager, ManagerConfig, Store, create_manager, partial_state};

partial_state! {
    /// State of a menu: which item is active.
    pub struct MenuState {
        pub active_index: usize,
    }
}

#[derive(Clone)]
pub struct MenuActions {
    store: Store<MenuState>,
}

impl MenuActions {
    /// Makes the item at `index` the active one.
    pub fn select(&self, index: usize) {
        self.store.dispatch("select", |_| {
            Some(MenuState {
                active_index: Some(index),
            })
        });
    }
}

pub fn create_menu_manager(config: ManagerConfig<MenuState>) -> Manager<MenuState, MenuActions> {
    create_manager(config, |store| MenuActions {
        store: store.clone(),
    })
}
