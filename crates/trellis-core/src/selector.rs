use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use crate::context::Context;
use crate::effects::use_layout_effect;
use crate::error::ContextError;
use crate::runtime::{current_config, remember, use_force_update};
use crate::same::Same;

/// What a consumer selected at its last commit.
struct SelectorBinding<V, S> {
    selector: Rc<dyn Fn(&V) -> S>,
    value: V,
    selected: S,
}

type BindingSlot<V, S> = RefCell<Option<SelectorBinding<V, S>>>;

/// Whether `next` would change what the last committed render selected.
///
/// A selector that panics on `next` (usually because it assumed a shape the
/// value no longer has) counts as a change; the re-render then evaluates
/// it again on the regular render path.
fn selection_changed<V: Same, S: Same>(slot: &BindingSlot<V, S>, next: &V) -> bool {
    let binding = slot.borrow();
    let Some(binding) = binding.as_ref() else {
        return true;
    };
    if binding.value.same(next) {
        return false;
    }
    match catch_unwind(AssertUnwindSafe(|| (binding.selector)(next))) {
        Ok(selected) => !binding.selected.same(&selected),
        Err(_) => {
            log::debug!("selector panicked on a newer context value; forcing a re-render");
            true
        }
    }
}

/// Returns `selector` applied to the nearest provider's value and
/// re-renders the calling component only when that selection changes
/// (compared with [`Same`]).
///
/// Without a provider this fails with [`ContextError::MissingProvider`] in
/// development and selects from the context's default value in production.
///
/// When a newer value arrives, the selector of the last commit is applied
/// to it outside of render. If that panics (say, an index past the end of
/// a shrunk list) the panic is caught and the component re-renders, but
/// the process panic hook still runs and prints the message. Selectors
/// that may not fit every value should return an `Option` instead.
pub fn try_use_context_selector<V, S>(
    context: &Context<V>,
    selector: impl Fn(&V) -> S + 'static,
) -> Result<S, ContextError>
where
    V: Same + Clone + 'static,
    S: Same + Clone + 'static,
{
    let published = context.read();
    if published.subscribe.is_none() && current_config().mode.reports_missing_provider() {
        return Err(ContextError::MissingProvider {
            context: context.name(),
        });
    }

    let selector: Rc<dyn Fn(&V) -> S> = Rc::new(selector);
    let selected = selector(&published.value);

    let force_update = use_force_update();
    let binding: Rc<BindingSlot<V, S>> = remember(|| RefCell::new(None));

    use_layout_effect(None::<()>, {
        let binding = binding.clone();
        let value = published.value.clone();
        let selected = selected.clone();
        move || {
            *binding.borrow_mut() = Some(SelectorBinding {
                selector,
                value,
                selected,
            });
            None
        }
    });

    let subscribe = published.subscribe;
    use_layout_effect(Some(subscribe.clone()), move || {
        let subscribe = subscribe?;
        let unsubscribe = subscribe.subscribe(move |next: &V| {
            if selection_changed(&binding, next) {
                force_update.call();
            }
        });
        Some(unsubscribe.into_dispose())
    });

    Ok(selected)
}

/// Like [`try_use_context_selector`], but a missing provider in
/// development panics, which the host reports as a failed render.
pub fn use_context_selector<V, S>(context: &Context<V>, selector: impl Fn(&V) -> S + 'static) -> S
where
    V: Same + Clone + 'static,
    S: Same + Clone + 'static,
{
    match try_use_context_selector(context, selector) {
        Ok(selected) => selected,
        Err(err) => panic!("{err}"),
    }
}

/// Selects the whole raw value.
pub fn use_context_value<V: Same + Clone + 'static>(context: &Context<V>) -> V {
    use_context_selector(context, V::clone)
}
