use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::PartialState;

/// Runs after every state transition, receiving the new snapshot.
pub type SideEffect<S> = Rc<dyn Fn(&Rc<S>)>;

/// Runs after an action's update has been merged, with `(prev, next)`.
/// Returning `Some(partial)` layers one more update on top of `next`.
pub type Middleware<S> = Rc<dyn Fn(&S, &S) -> Option<S>>;

/// Everything a manager factory needs to wire a manager.
pub struct ManagerConfig<S: PartialState> {
    pub state: S,
    pub side_effects: Vec<SideEffect<S>>,
    pub middleware: Vec<Middleware<S>>,
    /// Log every transition at `debug` level.
    pub debug: bool,
}

impl<S: PartialState> ManagerConfig<S> {
    pub fn new(state: S) -> Self {
        Self {
            state,
            side_effects: Vec::new(),
            middleware: Vec::new(),
            debug: false,
        }
    }

    pub fn side_effect(mut self, f: impl Fn(&Rc<S>) + 'static) -> Self {
        self.side_effects.push(Rc::new(f));
        self
    }

    pub fn middleware(mut self, f: impl Fn(&S, &S) -> Option<S> + 'static) -> Self {
        self.middleware.push(Rc::new(f));
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl<S: PartialState> Default for ManagerConfig<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

struct StoreInner<S> {
    state: RefCell<Rc<S>>,
    side_effects: SmallVec<[SideEffect<S>; 2]>,
    middleware: Vec<Middleware<S>>,
    debug: bool,
    transitions: Cell<u64>,
}

/// Shared cell holding the current snapshot of a manager.
///
/// The snapshot is never mutated in place: a transition builds a new
/// `Rc<S>` and swaps it in, and only when at least one field differs.
pub struct Store<S: PartialState> {
    inner: Rc<StoreInner<S>>,
}

impl<S: PartialState> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: PartialState> Store<S> {
    pub fn new(config: ManagerConfig<S>) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(Rc::new(config.state)),
                side_effects: config.side_effects.into_iter().collect(),
                middleware: config.middleware,
                debug: config.debug,
                transitions: Cell::new(0),
            }),
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> Rc<S> {
        self.inner.state.borrow().clone()
    }

    /// Number of transitions that replaced the snapshot.
    pub fn transitions(&self) -> u64 {
        self.inner.transitions.get()
    }

    /// Computes a partial update from the current snapshot and applies it.
    ///
    /// Returns `true` when the snapshot was replaced. Side effects run
    /// synchronously, in registration order, after the swap; no borrow is
    /// held while they run, so they may dispatch again.
    pub fn dispatch(&self, action: &str, update: impl FnOnce(&S) -> Option<S>) -> bool {
        let prev = self.state();
        let Some(partial) = update(prev.as_ref()) else {
            return false;
        };

        let mut next = prev.overlay(&partial);
        for middleware in &self.inner.middleware {
            if let Some(extra) = middleware(prev.as_ref(), &next) {
                next = next.overlay(&extra);
            }
        }

        if next == *prev {
            if self.inner.debug {
                log::debug!("{action}: state unchanged");
            }
            return false;
        }

        if self.inner.debug {
            log::debug!("{action}: {prev:?} -> {next:?}");
        }

        let next = Rc::new(next);
        *self.inner.state.borrow_mut() = next.clone();
        self.inner.transitions.set(self.inner.transitions.get() + 1);

        for effect in &self.inner.side_effects {
            effect(&next);
        }
        true
    }
}

impl<S: PartialState> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.inner.state.borrow())
            .field("side_effects", &self.inner.side_effects.len())
            .field("transitions", &self.inner.transitions.get())
            .finish()
    }
}

/// A store paired with the actions bound to it.
pub struct Manager<S: PartialState, A> {
    store: Store<S>,
    actions: Rc<A>,
}

impl<S: PartialState, A> Clone for Manager<S, A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            actions: self.actions.clone(),
        }
    }
}

impl<S: PartialState, A> Manager<S, A> {
    pub fn state(&self) -> Rc<S> {
        self.store.state()
    }

    pub fn actions(&self) -> Rc<A> {
        self.actions.clone()
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }
}

/// Builds a store from `config` and binds actions to it.
pub fn create_manager<S: PartialState, A>(
    config: ManagerConfig<S>,
    bind: impl FnOnce(&Store<S>) -> A,
) -> Manager<S, A> {
    let store = Store::new(config);
    let actions = Rc::new(bind(&store));
    Manager { store, actions }
}
