use std::cell::RefCell;
use std::rc::Rc;

/// Cleanup list owned by one component instance; disposed on unmount.
#[derive(Clone, Default)]
pub struct Scope {
    disposers: Rc<RefCell<Vec<Box<dyn FnOnce()>>>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_disposer(&self, disposer: impl FnOnce() + 'static) {
        self.disposers.borrow_mut().push(Box::new(disposer));
    }

    pub fn len(&self) -> usize {
        self.disposers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every disposer in registration order.
    pub fn dispose(&self) {
        let disposers = std::mem::take(&mut *self.disposers.borrow_mut());
        for disposer in disposers {
            disposer();
        }
    }
}
