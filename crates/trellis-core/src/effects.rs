use std::cell::RefCell;
use std::rc::Rc;

use crate::runtime::{current_scope, queue_effect};
use crate::remember;

#[derive(Clone)]
pub struct Dispose(Rc<RefCell<Option<Box<dyn FnOnce()>>>>);

impl Dispose {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RefCell::new(Some(Box::new(f)))))
    }

    /// Runs at most once (safe to call multiple times).
    pub fn run(&self) {
        let f = self.0.borrow_mut().take();
        if let Some(f) = f {
            f()
        }
    }

    pub fn has_run(&self) -> bool {
        self.0.borrow().is_none()
    }
}

/// Helper to build an effect cleanup.
pub fn on_unmount(f: impl FnOnce() + 'static) -> Dispose {
    Dispose::new(f)
}

struct EffectSlot<D> {
    deps: Option<D>,
    ran: bool,
    cleanup: Option<Dispose>,
    installed: bool,
}

/// Runs `effect` after the current render is committed.
///
/// With `deps == None` the effect runs after every commit of this
/// instance; with `Some(deps)` it runs on the first commit and whenever
/// `deps` differs from the value seen at the previous run. The previous
/// cleanup runs right before the next run, and on unmount.
///
/// Layout effects of children run before those of their parent.
pub fn use_layout_effect<D: PartialEq + 'static>(
    deps: Option<D>,
    effect: impl FnOnce() -> Option<Dispose> + 'static,
) {
    let slot = remember(|| {
        RefCell::new(EffectSlot::<D> {
            deps: None,
            ran: false,
            cleanup: None,
            installed: false,
        })
    });

    // One unmount disposer per call site.
    if !slot.borrow().installed {
        slot.borrow_mut().installed = true;
        let slot = slot.clone();
        current_scope().add_disposer(move || {
            let cleanup = slot.borrow_mut().cleanup.take();
            if let Some(d) = cleanup {
                d.run();
            }
        });
    }

    let should_run = {
        let s = slot.borrow();
        match &deps {
            None => true,
            Some(d) => !s.ran || s.deps.as_ref() != Some(d),
        }
    };
    if !should_run {
        return;
    }

    queue_effect(Box::new(move || {
        let previous = slot.borrow_mut().cleanup.take();
        if let Some(d) = previous {
            d.run();
        }
        let cleanup = effect();
        let mut s = slot.borrow_mut();
        s.cleanup = cleanup;
        s.deps = deps;
        s.ran = true;
    }));
}
