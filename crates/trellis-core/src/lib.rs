//! # Hosts, contexts and managers
//!
//! Trellis components are plain closures rendered by a [`Host`]. While a
//! body runs it may call hooks, which are tied to the rendering instance
//! by call order:
//!
//! - [`remember`]: a persistent per-instance slot.
//! - [`use_force_update`]: a stable handle that schedules a re-render.
//! - [`use_layout_effect`]: code that runs after commit, with cleanup.
//! - [`use_context_selector`]: a slice of a provider's value; the
//!   component re-renders only when the slice changes.
//! - [`use_state_manager`]: binds a `trellis_state` manager to the
//!   instance and re-renders it after every action.
//!
//! Children are rendered with [`child`], which skips the subtree when
//! its props are unchanged, or [`child_always`].
//!
//! ```rust
//! use std::rc::Rc;
//! use trellis_core::*;
//! use trellis_state::{MenuState, create_menu_manager};
//!
//! let host = Host::new(HostConfig::development());
//! let actions = Rc::new(std::cell::RefCell::new(None));
//! let seen = Rc::new(std::cell::Cell::new(None));
//!
//! host.render({
//!     let (actions, seen) = (actions.clone(), seen.clone());
//!     move || {
//!         let menu = use_state_manager(
//!             create_menu_manager,
//!             StateManagerOptions::new().initial_state(|| MenuState { active_index: Some(0) }),
//!         );
//!         seen.set(menu.state.active_index);
//!         *actions.borrow_mut() = Some(menu.actions.clone());
//!     }
//! })
//! .unwrap();
//! assert_eq!(seen.get(), Some(0));
//!
//! actions.borrow().as_ref().unwrap().select(3);
//! host.flush().unwrap();
//! assert_eq!(seen.get(), Some(3));
//! ```
//!
//! Development and production behaviour differ only where [`BuildMode`]
//! says so.

pub mod context;
pub mod effects;
pub mod error;
pub mod locals;
pub mod policy;
pub mod prelude;
pub mod runtime;
pub mod same;
pub mod scope;
pub mod selector;
pub mod state_manager;
mod tests;

pub use context::*;
pub use effects::*;
pub use error::*;
pub use locals::{ContextId, Locals};
pub use policy::*;
pub use runtime::*;
pub use same::Same;
pub use scope::Scope;
pub use selector::*;
pub use state_manager::*;
