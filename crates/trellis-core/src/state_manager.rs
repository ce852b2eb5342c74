use std::cell::RefCell;
use std::rc::Rc;

use trellis_state::{Manager, ManagerConfig, PartialState, SideEffect};

use crate::runtime::{current_config, remember, use_force_update};

/// How [`use_state_manager`] derives a manager's state from props.
pub struct StateManagerOptions<S: PartialState> {
    map_props_to_initial_state: Option<Box<dyn FnOnce() -> S>>,
    map_props_to_state: Option<Box<dyn FnOnce() -> S>>,
    side_effects: Vec<SideEffect<S>>,
}

impl<S: PartialState> Default for StateManagerOptions<S> {
    fn default() -> Self {
        Self {
            map_props_to_initial_state: None,
            map_props_to_state: None,
            side_effects: Vec::new(),
        }
    }
}

impl<S: PartialState> StateManagerOptions<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Baseline state, used only when the first manager is constructed.
    pub fn initial_state(mut self, f: impl FnOnce() -> S + 'static) -> Self {
        self.map_props_to_initial_state = Some(Box::new(f));
        self
    }

    /// Overlay applied on every render ("controlled" props). Its defined
    /// fields win over the manager's current state.
    pub fn state(mut self, f: impl FnOnce() -> S + 'static) -> Self {
        self.map_props_to_state = Some(Box::new(f));
        self
    }

    /// Runs after every transition, before the re-render trigger.
    pub fn side_effect(mut self, f: impl Fn(&Rc<S>) + 'static) -> Self {
        self.side_effects.push(Rc::new(f));
        self
    }
}

/// Read-only view of the manager bound to the rendering instance.
pub struct StateManagerResult<S, A> {
    pub state: Rc<S>,
    pub actions: Rc<A>,
}

impl<S, A> Clone for StateManagerResult<S, A> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            actions: self.actions.clone(),
        }
    }
}

/// Binds one manager to the rendering instance.
///
/// A fresh manager is built on every render, seeded with the previous
/// manager's state (or, the first time, with the defined fields of
/// `initial_state`), with the defined fields of `state` layered on top.
/// Every action therefore updates the manager synchronously and then
/// forces a re-render of this instance, after the external side effects.
pub fn use_state_manager<S: PartialState, A: 'static>(
    factory: impl FnOnce(ManagerConfig<S>) -> Manager<S, A>,
    options: StateManagerOptions<S>,
) -> StateManagerResult<S, A> {
    let latest = remember(|| RefCell::new(None::<Manager<S, A>>));
    let force_update = use_force_update();
    let mode = current_config().mode;

    let previous = latest.borrow().as_ref().map(|manager| manager.state());
    let initial = match previous {
        Some(state) => (*state).clone(),
        None => {
            let initial = options.map_props_to_initial_state.map(|f| f()).unwrap_or_default();
            S::default().overlay(&initial)
        }
    };
    let overlay = options.map_props_to_state.map(|f| f()).unwrap_or_default();
    let state = initial.overlay(&overlay);

    let mut side_effects = options.side_effects;
    side_effects.push(Rc::new(move |_: &Rc<S>| force_update.call()));

    let manager = factory(ManagerConfig {
        state: state.clone(),
        side_effects,
        middleware: Vec::new(),
        debug: mode.guards_snapshots(),
    });

    if mode.guards_snapshots() && *manager.state() != state {
        log::warn!(
            "manager factory did not adopt the state it was given: expected {state:?}, got {:?}",
            manager.state()
        );
    }

    *latest.borrow_mut() = Some(manager.clone());

    StateManagerResult {
        state: manager.state(),
        actions: manager.actions(),
    }
}
