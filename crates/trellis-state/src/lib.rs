//! # Managers
//!
//! A manager is a small state container that knows nothing about rendering.
//! It owns an immutable snapshot (`Rc<S>`), a set of typed actions that
//! compute the next snapshot, and a list of side effects that run after each
//! transition.
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use trellis_state::*;
//!
//! let seen = Rc::new(Cell::new(None));
//! let manager = create_menu_manager(
//!     ManagerConfig::new(MenuState { active_index: Some(0) }).side_effect({
//!         let seen = seen.clone();
//!         move |s: &Rc<MenuState>| seen.set(s.active_index)
//!     }),
//! );
//!
//! manager.actions().select(2);
//! assert_eq!(manager.state().active_index, Some(2));
//! assert_eq!(seen.get(), Some(2));
//! ```
//!
//! State types implement [`PartialState`]: every field may be absent, and
//! merging two states keeps the defined fields of the top layer. The
//! [`partial_state!`] macro generates such structs.

pub mod manager;
pub mod menu;
pub mod menu_item;
pub mod partial;

pub use manager::*;
pub use menu::*;
pub use menu_item::*;
pub use partial::*;
