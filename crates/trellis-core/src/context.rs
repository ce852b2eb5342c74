//! Selective-subscription contexts.
//!
//! A provider publishes its value through the context channel, which never
//! re-renders anything by itself, and through a listener registry that it
//! sweeps synchronously on every render. Consumers use
//! [`use_context_selector`](crate::use_context_selector) to subscribe to the
//! registry and re-render only when the slice they select changes.
//!
//! ```rust
//! use std::rc::Rc;
//! use trellis_core::*;
//!
//! struct Person {
//!     first_name: &'static str,
//!     age: u32,
//! }
//!
//! let person = create_context(Rc::new(Person { first_name: "Ada", age: 36 }));
//! let host = Host::new(HostConfig::development());
//!
//! let ctx = person.clone();
//! host.render(move || {
//!     let ctx2 = ctx.clone();
//!     ctx.provider("person", Rc::new(Person { first_name: "Ada", age: 37 }), move || {
//!         let ctx = ctx2.clone();
//!         child("name", (), move |_| {
//!             let name = use_context_selector(&ctx, |p| p.first_name);
//!             assert_eq!(name, "Ada");
//!         });
//!     });
//! })
//! .unwrap();
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::effects::Dispose;
use crate::locals::ContextId;
use crate::runtime::{child_always, current_locals, remember, set_current_locals};
use crate::same::Same;

/// Callback receiving every value a provider publishes.
pub type ContextListener<V> = Rc<dyn Fn(&V)>;

struct ListenerEntry<V> {
    id: u64,
    listener: ContextListener<V>,
}

/// Ordered listeners of one provider instance.
///
/// Mutated only by appending (subscribe) and removing one entry by its
/// subscription id (unsubscribe).
pub struct ListenerRegistry<V> {
    next_id: Cell<u64>,
    listeners: RefCell<SmallVec<[ListenerEntry<V>; 4]>>,
}

impl<V> ListenerRegistry<V> {
    fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            listeners: RefCell::new(SmallVec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls every listener registered so far, in subscription order.
    ///
    /// Iterates a snapshot: listeners added while the sweep runs wait for
    /// the next publish.
    pub fn notify(&self, value: &V) {
        let snapshot: SmallVec<[ContextListener<V>; 4]> = self
            .listeners
            .borrow()
            .iter()
            .map(|entry| entry.listener.clone())
            .collect();
        log::trace!("notifying {} context listeners", snapshot.len());
        for listener in snapshot {
            listener(value);
        }
    }

    fn remove(&self, id: u64) {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(index) = listeners.iter().position(|entry| entry.id == id) {
            listeners.remove(index);
        }
    }
}

/// Registration handle of a provider. The same registry backs it for the
/// provider's whole lifetime, so it compares equal across renders.
pub struct Subscribe<V>(Rc<ListenerRegistry<V>>);

impl<V> Clone for Subscribe<V> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<V> PartialEq for Subscribe<V> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<V: 'static> Default for Subscribe<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: 'static> Subscribe<V> {
    /// A registry with no listeners, detached from any provider.
    pub fn new() -> Self {
        Self(Rc::new(ListenerRegistry::new()))
    }

    /// Sweeps the listeners with `value`.
    pub fn publish(&self, value: &V) {
        self.0.notify(value);
    }

    pub fn subscribe(&self, listener: impl Fn(&V) + 'static) -> Unsubscribe {
        let id = self.0.next_id.get();
        self.0.next_id.set(id + 1);
        self.0.listeners.borrow_mut().push(ListenerEntry {
            id,
            listener: Rc::new(listener),
        });

        let registry: Weak<ListenerRegistry<V>> = Rc::downgrade(&self.0);
        Unsubscribe(Dispose::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove(id);
            }
        }))
    }

    pub fn registry(&self) -> &ListenerRegistry<V> {
        &self.0
    }
}

/// Removes one subscription. Running it again is a no-op.
#[derive(Clone)]
pub struct Unsubscribe(Dispose);

impl Unsubscribe {
    pub fn run(&self) {
        self.0.run();
    }

    pub fn into_dispose(self) -> Dispose {
        self.0
    }
}

/// What a provider publishes: the raw value and the way to subscribe to
/// its future values. Outside any provider `subscribe` is `None`.
pub struct ContextValue<V> {
    pub value: V,
    pub subscribe: Option<Subscribe<V>>,
}

impl<V: Clone> Clone for ContextValue<V> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            subscribe: self.subscribe.clone(),
        }
    }
}

struct ContextInner<V> {
    id: ContextId,
    name: &'static str,
    default: V,
}

/// A context created by [`create_context`]. Cloning is cheap and yields the
/// same context.
///
/// Values are read only through the selector hooks.
pub struct Context<V> {
    inner: Rc<ContextInner<V>>,
}

impl<V> Clone for Context<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> fmt::Debug for Context<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

pub fn create_context<V: Same + Clone + 'static>(default: V) -> Context<V> {
    create_named_context(std::any::type_name::<V>(), default)
}

/// Like [`create_context`], with a name used in error messages.
pub fn create_named_context<V: Same + Clone + 'static>(name: &'static str, default: V) -> Context<V> {
    Context {
        inner: Rc::new(ContextInner {
            id: ContextId::next(),
            name,
            default,
        }),
    }
}

struct ProviderProps<V> {
    value: V,
    children: Rc<dyn Fn()>,
}

impl<V: Same + Clone + 'static> Context<V> {
    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn default_value(&self) -> &V {
        &self.inner.default
    }

    /// Renders a provider publishing `value` to everything `children`
    /// renders.
    ///
    /// The provider re-renders whenever its parent does and sweeps its
    /// listeners with `value` during that render, before anything is
    /// committed. Its descendants are not re-rendered by the publish.
    pub fn provider(&self, key: impl Into<String>, value: V, children: impl Fn() + 'static) {
        let context = self.clone();
        child_always(
            key,
            ProviderProps {
                value,
                children: Rc::new(children),
            },
            move |props: &ProviderProps<V>| context.render_provider(props),
        );
    }

    fn render_provider(&self, props: &ProviderProps<V>) {
        let subscribe = (*remember(Subscribe::<V>::new)).clone();
        subscribe.publish(&props.value);

        let cell = remember(|| {
            RefCell::new(ContextValue {
                value: props.value.clone(),
                subscribe: Some(subscribe.clone()),
            })
        });
        *cell.borrow_mut() = ContextValue {
            value: props.value.clone(),
            subscribe: Some(subscribe),
        };

        set_current_locals(current_locals().with(self.inner.id, cell));
        (props.children)();
    }

    /// The raw published value visible from the rendering instance.
    pub(crate) fn read(&self) -> ContextValue<V> {
        let published = current_locals().get(self.inner.id);
        match published
            .as_deref()
            .and_then(|cell| cell.downcast_ref::<RefCell<ContextValue<V>>>())
        {
            Some(cell) => cell.borrow().clone(),
            None => ContextValue {
                value: self.inner.default.clone(),
                subscribe: None,
            },
        }
    }
}
