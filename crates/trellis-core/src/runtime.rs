use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use slotmap::{SlotMap, new_key_type};

use crate::error::HostError;
use crate::locals::Locals;
use crate::policy::HostConfig;
use crate::scope::Scope;

new_key_type! {
    pub struct InstanceId;
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct InstanceFlags: u8 {
        const MOUNTED = 1 << 0;
        /// Needs a render before the next commit.
        const DIRTY = 1 << 1;
        /// Never bails out when the parent renders (providers, roots).
        const ALWAYS = 1 << 2;
    }
}

type Body = Rc<dyn Fn(&dyn Any)>;
type PropsEq = fn(&dyn Any, &dyn Any) -> bool;
type PendingEffect = Box<dyn FnOnce()>;

struct Instance {
    key: String,
    parent: Option<InstanceId>,
    depth: usize,
    flags: InstanceFlags,
    props: Rc<dyn Any>,
    body: Body,
    locals: Locals,
    slots: Vec<Rc<dyn Any>>,
    cursor: usize,
    children: HashMap<String, InstanceId>,
    seen: HashSet<String>,
    effects: Vec<PendingEffect>,
    scope: Scope,
    renders: u64,
}

pub(crate) struct HostInner {
    config: HostConfig,
    instances: RefCell<SlotMap<InstanceId, Instance>>,
    root: Cell<Option<InstanceId>>,
    commit_queue: RefCell<Vec<InstanceId>>,
    /// Instances whose render started since the last successful pass.
    in_flight: RefCell<Vec<InstanceId>>,
    panicked_in: RefCell<Option<String>>,
}

struct Frame {
    host: Rc<HostInner>,
    id: InstanceId,
    locals: Locals,
    /// First of the two strict-mode passes; children are not rendered.
    rehearsal: bool,
}

thread_local! {
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Pops the render frame, also on unwind, remembering where a panic started.
struct FrameGuard;

impl FrameGuard {
    fn push(frame: Frame) -> Self {
        FRAMES.with(|f| f.borrow_mut().push(frame));
        FrameGuard
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        let frame = FRAMES.with(|f| f.borrow_mut().pop());
        if std::thread::panicking()
            && let Some(frame) = frame
        {
            let mut panicked_in = frame.host.panicked_in.borrow_mut();
            if panicked_in.is_none() {
                *panicked_in = Some(frame.host.path(frame.id));
            }
        }
    }
}

fn with_frame<R>(f: impl FnOnce(&mut Frame) -> R) -> R {
    FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        match frames.last_mut() {
            Some(frame) => f(frame),
            None => panic!("{}", HostError::OutsideRender),
        }
    })
}

fn current() -> (Rc<HostInner>, InstanceId) {
    with_frame(|frame| (frame.host.clone(), frame.id))
}

pub(crate) fn current_config() -> HostConfig {
    with_frame(|frame| frame.host.config)
}

pub(crate) fn current_locals() -> Locals {
    with_frame(|frame| frame.locals.clone())
}

/// Replaces the locals handed to children created later in this render.
pub(crate) fn set_current_locals(locals: Locals) {
    with_frame(|frame| frame.locals = locals);
}

pub(crate) fn current_scope() -> Scope {
    let (host, id) = current();
    let scope = host.instances.borrow().get(id).map(|i| i.scope.clone());
    scope.unwrap_or_default()
}

pub(crate) fn queue_effect(effect: PendingEffect) {
    let (host, id) = current();
    if let Some(instance) = host.instances.borrow_mut().get_mut(id) {
        instance.effects.push(effect);
    }
}

/// Slot-based remember, scoped to the rendering instance.
///
/// The Nth call during a render always refers to the Nth slot of the
/// instance; the value survives re-renders until the instance unmounts.
pub fn remember<T: 'static>(init: impl FnOnce() -> T) -> Rc<T> {
    let (host, id) = current();
    let claimed = host.instances.borrow_mut().get_mut(id).map(|instance| {
        let cursor = instance.cursor;
        instance.cursor += 1;
        (cursor, instance.slots.get(cursor).cloned())
    });
    let Some((cursor, existing)) = claimed else {
        return Rc::new(init());
    };

    if let Some(slot) = existing {
        match slot.downcast::<T>() {
            Ok(rc) => return rc,
            Err(_) => log::warn!(
                "remember: slot {cursor} type changed; replacing. \
                 Hooks must be called in the same order on every render."
            ),
        }
    }

    let rc = Rc::new(init());
    if let Some(instance) = host.instances.borrow_mut().get_mut(id) {
        let erased: Rc<dyn Any> = rc.clone();
        if cursor < instance.slots.len() {
            instance.slots[cursor] = erased;
        } else {
            instance.slots.push(erased);
        }
    }
    rc
}

/// Stable handle forcing a re-render of the instance that created it.
///
/// Calling it bumps a per-instance counter and marks the instance dirty;
/// the counter carries no meaning beyond "something changed".
#[derive(Clone)]
pub struct ForceUpdate {
    host: Weak<HostInner>,
    id: InstanceId,
    counter: Rc<Cell<u64>>,
}

impl ForceUpdate {
    pub fn call(&self) {
        self.counter.set(self.counter.get() + 1);
        if let Some(host) = self.host.upgrade() {
            log::trace!("force update of {:?}", self.id);
            host.mark_dirty(self.id);
        }
    }

    /// Number of calls so far.
    pub fn count(&self) -> u64 {
        self.counter.get()
    }
}

impl PartialEq for ForceUpdate {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.counter, &other.counter)
    }
}

pub fn use_force_update() -> ForceUpdate {
    let counter = remember(|| Cell::new(0u64));
    let (host, id) = current();
    ForceUpdate {
        host: Rc::downgrade(&host),
        id,
        counter,
    }
}

fn props_eq<P: PartialEq + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<P>(), b.downcast_ref::<P>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn erase_body<P: 'static>(body: impl Fn(&P) + 'static) -> Body {
    Rc::new(move |props: &dyn Any| match props.downcast_ref::<P>() {
        Some(props) => body(props),
        None => log::warn!("render body received props of an unexpected type"),
    })
}

/// Renders a keyed child of the current instance.
///
/// When the child already exists, is not dirty and `props` compares equal
/// to the previous props, the child (and its whole subtree) is skipped.
pub fn child<P: PartialEq + 'static>(
    key: impl Into<String>,
    props: P,
    body: impl Fn(&P) + 'static,
) {
    render_child(
        key.into(),
        Rc::new(props),
        Some(props_eq::<P>),
        erase_body(body),
    );
}

/// Renders a keyed child that re-renders every time its parent does.
pub fn child_always<P: 'static>(key: impl Into<String>, props: P, body: impl Fn(&P) + 'static) {
    render_child(key.into(), Rc::new(props), None, erase_body(body));
}

fn render_child(key: String, props: Rc<dyn Any>, eq: Option<PropsEq>, body: Body) {
    if with_frame(|frame| frame.rehearsal) {
        return;
    }
    let (host, parent) = current();
    let locals = current_locals();

    let (existing, depth) = {
        let mut instances = host.instances.borrow_mut();
        let Some(parent_instance) = instances.get_mut(parent) else {
            return;
        };
        parent_instance.seen.insert(key.clone());
        let existing = parent_instance.children.get(&key).copied();
        (existing, parent_instance.depth + 1)
    };

    let id = match existing {
        Some(id) => {
            let mut instances = host.instances.borrow_mut();
            let Some(instance) = instances.get_mut(id) else {
                return;
            };
            instance.body = body;
            instance.locals = locals;
            let unchanged = !instance.flags.contains(InstanceFlags::ALWAYS)
                && eq.is_some_and(|eq| eq(&*instance.props, &*props));
            if unchanged && !instance.flags.contains(InstanceFlags::DIRTY) {
                log::trace!("{key}: props unchanged, skipping");
                return;
            }
            instance.props = props;
            instance.flags.set(InstanceFlags::ALWAYS, eq.is_none());
            id
        }
        None => {
            let mut flags = InstanceFlags::MOUNTED;
            if eq.is_none() {
                flags |= InstanceFlags::ALWAYS;
            }
            let mut instances = host.instances.borrow_mut();
            let id = instances.insert(Instance::new(
                key.clone(),
                Some(parent),
                depth,
                flags,
                props,
                body,
                locals,
            ));
            if let Some(parent_instance) = instances.get_mut(parent) {
                parent_instance.children.insert(key, id);
            }
            id
        }
    };

    host.render_instance(id);
}

impl Instance {
    fn new(
        key: String,
        parent: Option<InstanceId>,
        depth: usize,
        flags: InstanceFlags,
        props: Rc<dyn Any>,
        body: Body,
        locals: Locals,
    ) -> Self {
        Self {
            key,
            parent,
            depth,
            flags,
            props,
            body,
            locals,
            slots: Vec::new(),
            cursor: 0,
            children: HashMap::new(),
            seen: HashSet::new(),
            effects: Vec::new(),
            scope: Scope::new(),
            renders: 0,
        }
    }
}

impl HostInner {
    /// Slash-separated keys from the root down to `id`.
    fn path(&self, id: InstanceId) -> String {
        let Ok(instances) = self.instances.try_borrow() else {
            return String::new();
        };
        let mut keys = Vec::new();
        let mut next = Some(id);
        while let Some(id) = next {
            let Some(instance) = instances.get(id) else {
                break;
            };
            keys.push(instance.key.as_str());
            next = instance.parent;
        }
        keys.reverse();
        keys.join("/")
    }

    fn mark_dirty(&self, id: InstanceId) {
        if let Some(instance) = self.instances.borrow_mut().get_mut(id)
            && instance.flags.contains(InstanceFlags::MOUNTED)
        {
            instance.flags.insert(InstanceFlags::DIRTY);
        }
    }

    fn render_instance(self: &Rc<Self>, id: InstanceId) {
        // Cleared up front: an update requested while rendering must survive.
        match self.instances.borrow_mut().get_mut(id) {
            Some(instance) => instance.flags.remove(InstanceFlags::DIRTY),
            None => return,
        }
        self.in_flight.borrow_mut().push(id);

        let passes = if self.config.strict { 2 } else { 1 };
        for pass in 0..passes {
            let prepared = self.instances.borrow_mut().get_mut(id).map(|instance| {
                instance.cursor = 0;
                instance.effects.clear();
                instance.seen.clear();
                (instance.body.clone(), instance.props.clone(), instance.locals.clone())
            });
            let Some((body, props, locals)) = prepared else {
                return;
            };

            let _frame = FrameGuard::push(Frame {
                host: self.clone(),
                id,
                locals,
                rehearsal: pass + 1 < passes,
            });
            body(&*props);
        }

        let stale: Vec<InstanceId> = {
            let mut instances = self.instances.borrow_mut();
            let Some(instance) = instances.get_mut(id) else {
                return;
            };
            instance.renders += 1;
            let seen = std::mem::take(&mut instance.seen);
            let mut stale = Vec::new();
            instance.children.retain(|key, child| {
                let keep = seen.contains(key);
                if !keep {
                    stale.push(*child);
                }
                keep
            });
            stale
        };
        for child in stale {
            self.unmount_instance(child);
        }

        self.commit_queue.borrow_mut().push(id);
    }

    fn unmount_instance(&self, id: InstanceId) {
        let Some(instance) = self.instances.borrow_mut().remove(id) else {
            return;
        };
        log::trace!("unmounting {}", instance.key);
        for child in instance.children.values() {
            self.unmount_instance(*child);
        }
        instance.scope.dispose();
    }

    fn commit(&self) {
        let queue = std::mem::take(&mut *self.commit_queue.borrow_mut());
        for id in queue {
            let effects = self
                .instances
                .borrow_mut()
                .get_mut(id)
                .map(|instance| std::mem::take(&mut instance.effects))
                .unwrap_or_default();
            for effect in effects {
                effect();
            }
        }
        self.in_flight.borrow_mut().clear();
    }

    /// Drops the uncommitted work of a render that panicked. Every instance
    /// that started rendering stays dirty, so the next pass renders it
    /// again and queues its effects anew.
    fn abandon_render(&self) {
        let interrupted = std::mem::take(&mut *self.in_flight.borrow_mut());
        self.commit_queue.borrow_mut().clear();
        let mut instances = self.instances.borrow_mut();
        for id in interrupted {
            if let Some(instance) = instances.get_mut(id) {
                instance.effects.clear();
                if instance.flags.contains(InstanceFlags::MOUNTED) {
                    instance.flags.insert(InstanceFlags::DIRTY);
                }
            }
        }
    }

    fn dirty_instances(&self) -> Vec<InstanceId> {
        let instances = self.instances.borrow();
        let mut dirty: Vec<(usize, InstanceId)> = instances
            .iter()
            .filter(|(_, i)| i.flags.contains(InstanceFlags::MOUNTED | InstanceFlags::DIRTY))
            .map(|(id, i)| (i.depth, id))
            .collect();
        dirty.sort_by_key(|(depth, _)| *depth);
        dirty.into_iter().map(|(_, id)| id).collect()
    }

    fn is_dirty(&self, id: InstanceId) -> bool {
        self.instances
            .borrow()
            .get(id)
            .is_some_and(|i| i.flags.contains(InstanceFlags::DIRTY))
    }
}

/// A single-threaded host driving render and commit for one tree.
///
/// Rendering is synchronous: [`render`](Host::render) renders the root,
/// then keeps rendering dirty instances (shallowest first) and committing
/// their layout effects until the tree settles.
pub struct Host {
    inner: Rc<HostInner>,
}

impl Host {
    pub fn new(config: HostConfig) -> Self {
        Self {
            inner: Rc::new(HostInner {
                config,
                instances: RefCell::new(SlotMap::with_key()),
                root: Cell::new(None),
                commit_queue: RefCell::new(Vec::new()),
                in_flight: RefCell::new(Vec::new()),
                panicked_in: RefCell::new(None),
            }),
        }
    }

    pub fn config(&self) -> HostConfig {
        self.inner.config
    }

    /// Renders `body` as the root of the tree, replacing the previous root
    /// body, then flushes.
    pub fn render(&self, body: impl Fn() + 'static) -> Result<(), HostError> {
        let body: Body = Rc::new(move |_: &dyn Any| body());
        let existing = self
            .inner
            .root
            .get()
            .filter(|id| self.inner.instances.borrow().contains_key(*id));

        let root = match existing {
            Some(id) => {
                if let Some(instance) = self.inner.instances.borrow_mut().get_mut(id) {
                    instance.body = body;
                }
                id
            }
            None => {
                let props: Rc<dyn Any> = Rc::new(());
                let id = self.inner.instances.borrow_mut().insert(Instance::new(
                    "root".to_string(),
                    None,
                    0,
                    InstanceFlags::MOUNTED | InstanceFlags::ALWAYS,
                    props,
                    body,
                    Locals::default(),
                ));
                self.inner.root.set(Some(id));
                id
            }
        };

        self.guarded(|| self.inner.render_instance(root))?;
        self.flush()
    }

    /// Renders every dirty instance and commits, repeating until no
    /// instance is dirty.
    pub fn flush(&self) -> Result<(), HostError> {
        let mut passes = 0;
        loop {
            self.guarded(|| {
                for id in self.inner.dirty_instances() {
                    // An ancestor rendered earlier in this pass may have cleaned it.
                    if self.inner.is_dirty(id) {
                        self.inner.render_instance(id);
                    }
                }
                self.inner.commit();
            })?;

            if self.inner.dirty_instances().is_empty() {
                return Ok(());
            }
            passes += 1;
            if passes >= self.inner.config.max_flush_passes {
                return Err(HostError::RenderLoop { passes });
            }
        }
    }

    /// Tears the whole tree down, running every cleanup.
    pub fn unmount(&self) {
        if let Some(root) = self.inner.root.take() {
            self.inner.unmount_instance(root);
        }
        self.inner.commit_queue.borrow_mut().clear();
        self.inner.in_flight.borrow_mut().clear();
    }

    /// Whether any instance is waiting for a render.
    pub fn has_pending_updates(&self) -> bool {
        !self.inner.dirty_instances().is_empty()
    }

    pub fn instance_count(&self) -> usize {
        self.inner.instances.borrow().len()
    }

    /// Committed renders of the instance at `path` (child keys from the root).
    pub fn render_count(&self, path: &[&str]) -> Option<u64> {
        let instances = self.inner.instances.borrow();
        let mut id = self.inner.root.get()?;
        for key in path {
            id = *instances.get(id)?.children.get(*key)?;
        }
        instances.get(id).map(|i| i.renders)
    }

    fn guarded<R>(&self, f: impl FnOnce() -> R) -> Result<R, HostError> {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(r) => Ok(r),
            Err(err) => {
                let message = if let Some(s) = err.downcast_ref::<String>() {
                    s.clone()
                } else if let Some(s) = err.downcast_ref::<&str>() {
                    s.to_string()
                } else {
                    "Unknown panic".to_string()
                };
                let component = self
                    .inner
                    .panicked_in
                    .borrow_mut()
                    .take()
                    .unwrap_or_else(|| "Unknown".to_string());
                self.inner.abandon_render();
                log::warn!("render of `{component}` panicked: {message}");
                Err(HostError::RenderPanicked { component, message })
            }
        }
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new(HostConfig::default())
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.unmount();
    }
}
