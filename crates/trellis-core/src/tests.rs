#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use trellis_state::{
        Manager, ManagerConfig, MenuActions, MenuState, create_manager, create_menu_manager,
        partial_state,
    };

    use crate::*;

    #[derive(Debug)]
    struct Counter {
        count: u32,
    }

    fn counter(count: u32) -> Rc<Counter> {
        Rc::new(Counter { count })
    }

    fn dev_host() -> Host {
        Host::new(HostConfig::development())
    }

    /// Root -> provider -> (middle ->) consumer selecting `count`.
    fn counter_app(
        ctx: &Context<Rc<Counter>>,
        value: Rc<Counter>,
        through_middle: bool,
        seen: &Rc<RefCell<Vec<u32>>>,
    ) -> impl Fn() + 'static {
        let ctx = ctx.clone();
        let seen = seen.clone();
        move || {
            let (inner_ctx, seen) = (ctx.clone(), seen.clone());
            ctx.provider("provider", value.clone(), move || {
                let consumer = {
                    let (ctx, seen) = (inner_ctx.clone(), seen.clone());
                    move |_: &()| {
                        let count = use_context_selector(&ctx, |v: &Rc<Counter>| v.count);
                        seen.borrow_mut().push(count);
                    }
                };
                if through_middle {
                    child("middle", (), move |_| child("consumer", (), consumer.clone()));
                } else {
                    child("consumer", (), consumer);
                }
            });
        }
    }

    #[test]
    fn test_same_follows_object_is() {
        let a = Rc::new(1);
        let b = Rc::new(1);
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
        assert!(f64::NAN.same(&f64::NAN));
        assert!(!0.0f64.same(&-0.0f64));
        assert!(Some(3u8).same(&Some(3)));
        assert!(!(1u8, "a").same(&(1u8, "b")));
    }

    #[test]
    fn test_unchanged_selection_skips_consumer() {
        let host = dev_host();
        let ctx = create_context(counter(0));
        let seen = Rc::new(RefCell::new(Vec::new()));

        host.render(counter_app(&ctx, counter(1), false, &seen)).unwrap();
        assert_eq!(*seen.borrow(), vec![1]);

        // New allocation, same selected field.
        host.render(counter_app(&ctx, counter(1), false, &seen)).unwrap();
        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(host.render_count(&["provider"]), Some(2));
        assert_eq!(host.render_count(&["provider", "consumer"]), Some(1));

        host.render(counter_app(&ctx, counter(2), false, &seen)).unwrap();
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_consumer_behind_memoized_parent_rerenders_alone() {
        let host = dev_host();
        let ctx = create_context(counter(0));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let values = [1, 1, 2, 2, 2, 5, 1];
        for v in values {
            host.render(counter_app(&ctx, counter(v), true, &seen)).unwrap();
        }

        // Re-rendered exactly where the selection changed.
        assert_eq!(*seen.borrow(), vec![1, 2, 5, 1]);
        assert_eq!(host.render_count(&["provider", "middle"]), Some(1));
        assert_eq!(host.render_count(&["provider", "middle", "consumer"]), Some(4));
        assert!(!host.has_pending_updates());
    }

    #[test]
    fn test_same_raw_value_short_circuits() {
        let host = dev_host();
        let ctx = create_context(counter(0));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let shared = counter(7);

        host.render(counter_app(&ctx, shared.clone(), false, &seen)).unwrap();
        host.render(counter_app(&ctx, shared.clone(), false, &seen)).unwrap();
        assert_eq!(*seen.borrow(), vec![7]);
    }

    #[test]
    fn test_whole_value_consumer_follows_identity() {
        let host = dev_host();
        let ctx = create_context(counter(0));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let app = |value: Rc<Counter>| {
            let (ctx, seen) = (ctx.clone(), seen.clone());
            move || {
                let (inner, seen) = (ctx.clone(), seen.clone());
                ctx.provider("provider", value.clone(), move || {
                    let (ctx, seen) = (inner.clone(), seen.clone());
                    child("consumer", (), move |_| {
                        seen.borrow_mut().push(use_context_value(&ctx).count);
                    });
                });
            }
        };

        let shared = counter(1);
        host.render(app(shared.clone())).unwrap();
        host.render(app(shared)).unwrap();
        // Equal contents, new allocation.
        host.render(app(counter(1))).unwrap();
        assert_eq!(*seen.borrow(), vec![1, 1]);
    }

    #[test]
    fn test_listeners_fire_in_subscription_order() {
        let subscribe: Subscribe<u32> = Subscribe::new();
        let calls = Rc::new(RefCell::new(Vec::new()));

        let mut handles = Vec::new();
        for name in ["l1", "l2", "l3"] {
            let calls = calls.clone();
            handles.push(subscribe.subscribe(move |v| calls.borrow_mut().push((name, *v))));
        }

        subscribe.publish(&1);
        handles[1].run();
        subscribe.publish(&2);

        assert_eq!(
            *calls.borrow(),
            vec![("l1", 1), ("l2", 1), ("l3", 1), ("l1", 2), ("l3", 2)]
        );
    }

    #[test]
    fn test_unsubscribe_twice_is_noop() {
        let subscribe: Subscribe<u32> = Subscribe::new();
        let first = subscribe.subscribe(|_| {});
        let _second = subscribe.subscribe(|_| {});
        assert_eq!(subscribe.registry().len(), 2);

        first.run();
        first.run();
        assert_eq!(subscribe.registry().len(), 1);
    }

    #[test]
    fn test_listener_added_during_publish_waits_for_next() {
        let subscribe: Subscribe<u32> = Subscribe::new();
        let late_calls = Rc::new(RefCell::new(Vec::new()));
        let added = Rc::new(Cell::new(false));

        let _outer = subscribe.subscribe({
            let subscribe = subscribe.clone();
            let late_calls = late_calls.clone();
            let added = added.clone();
            move |_| {
                if !added.replace(true) {
                    let late_calls = late_calls.clone();
                    // Kept alive by the registry; never unsubscribed here.
                    let _ = subscribe.subscribe(move |v| late_calls.borrow_mut().push(*v));
                }
            }
        });

        subscribe.publish(&1);
        assert!(late_calls.borrow().is_empty());
        subscribe.publish(&2);
        assert_eq!(*late_calls.borrow(), vec![2]);
    }

    #[test]
    fn test_unmounted_consumer_unsubscribes() {
        let host = dev_host();
        let ctx = create_context(counter(0));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let show = Rc::new(Cell::new(true));

        let app = {
            let (ctx, seen, show) = (ctx.clone(), seen.clone(), show.clone());
            move |value: u32| {
                let (ctx, seen, show) = (ctx.clone(), seen.clone(), show.clone());
                move || {
                    let (inner, seen, show) = (ctx.clone(), seen.clone(), show.clone());
                    ctx.provider("provider", counter(value), move || {
                        if show.get() {
                            let (ctx, seen) = (inner.clone(), seen.clone());
                            child("consumer", (), move |_| {
                                seen.borrow_mut()
                                    .push(use_context_selector(&ctx, |v: &Rc<Counter>| v.count));
                            });
                        }
                    });
                }
            }
        };

        host.render(app(1)).unwrap();
        let mounted = host.instance_count();
        show.set(false);
        host.render(app(2)).unwrap();
        assert_eq!(host.instance_count(), mounted - 1);

        host.render(app(3)).unwrap();
        assert_eq!(*seen.borrow(), vec![1]);
        assert!(!host.has_pending_updates());
    }

    #[test]
    fn test_missing_provider_fails_loudly_in_development() {
        let host = dev_host();
        let ctx = create_named_context("Counter", counter(4));

        let result = host.render(move || {
            let ctx = ctx.clone();
            child("orphan", (), move |_| {
                use_context_selector(&ctx, |v: &Rc<Counter>| v.count);
            });
        });

        match result {
            Err(HostError::RenderPanicked { component, message }) => {
                assert_eq!(component, "root/orphan");
                assert!(message.contains("without an enclosing provider"));
            }
            other => panic!("expected a render failure, got {other:?}"),
        }
    }

    #[test]
    fn test_try_selector_reports_missing_provider() {
        let host = dev_host();
        let ctx = create_named_context("Counter", counter(4));
        let outcome = Rc::new(RefCell::new(None));

        host.render({
            let outcome = outcome.clone();
            move || {
                *outcome.borrow_mut() =
                    Some(try_use_context_selector(&ctx, |v: &Rc<Counter>| v.count));
            }
        })
        .unwrap();

        assert_eq!(
            *outcome.borrow(),
            Some(Err(ContextError::MissingProvider { context: "Counter" }))
        );
    }

    #[test]
    fn test_missing_provider_uses_default_in_production() {
        let host = Host::new(HostConfig::production());
        let ctx = create_context(counter(4));
        let seen = Rc::new(Cell::new(0));

        host.render({
            let seen = seen.clone();
            move || seen.set(use_context_selector(&ctx, |v: &Rc<Counter>| v.count))
        })
        .unwrap();

        assert_eq!(seen.get(), 4);
    }

    #[test]
    fn test_stale_selector_panic_forces_rerender() {
        let host = dev_host();
        let ctx = create_context(Rc::new(vec![0u32]));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let app = |list: Vec<u32>, index: usize| {
            let (ctx, seen) = (ctx.clone(), seen.clone());
            let list = Rc::new(list);
            move || {
                let (inner, seen) = (ctx.clone(), seen.clone());
                ctx.provider("provider", list.clone(), move || {
                    let (ctx, seen) = (inner.clone(), seen.clone());
                    child("item", index, move |&index: &usize| {
                        let v = use_context_selector(&ctx, move |l: &Rc<Vec<u32>>| l[index]);
                        seen.borrow_mut().push(v);
                    });
                });
            }
        };

        host.render(app(vec![10, 20, 30], 2)).unwrap();
        // The committed selector indexes 2 into a two-element list.
        host.render(app(vec![40, 50], 0)).unwrap();

        assert_eq!(*seen.borrow(), vec![30, 40]);
        assert_eq!(host.render_count(&["provider", "item"]), Some(2));
    }

    #[test]
    fn test_optional_selection_survives_shrinking_list() {
        let host = dev_host();
        let ctx = create_context(Rc::new(vec![0u32]));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let app = |list: Vec<u32>| {
            let (ctx, seen) = (ctx.clone(), seen.clone());
            let list = Rc::new(list);
            move || {
                let (inner, seen) = (ctx.clone(), seen.clone());
                ctx.provider("provider", list.clone(), move || {
                    let (ctx, seen) = (inner.clone(), seen.clone());
                    child("item", (), move |_| {
                        let v = use_context_selector(&ctx, |l: &Rc<Vec<u32>>| l.get(2).copied());
                        seen.borrow_mut().push(v);
                    });
                });
            }
        };

        host.render(app(vec![10, 20, 30])).unwrap();
        host.render(app(vec![40, 50])).unwrap();
        host.render(app(vec![60])).unwrap();

        assert_eq!(*seen.borrow(), vec![Some(30), None]);
    }

    #[test]
    fn test_consumer_recovers_after_sibling_panics() {
        let host = dev_host();
        let ctx = create_context(counter(0));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let broken = Rc::new(Cell::new(true));

        let app = |count: u32| {
            let (ctx, seen, broken) = (ctx.clone(), seen.clone(), broken.clone());
            move || {
                let (inner, seen, broken) = (ctx.clone(), seen.clone(), broken.clone());
                ctx.provider("provider", counter(count), move || {
                    let (ctx, seen) = (inner.clone(), seen.clone());
                    child("a", (), move |_| {
                        let count = use_context_selector(&ctx, |v: &Rc<Counter>| v.count);
                        seen.borrow_mut().push(count);
                    });
                    let broken = broken.clone();
                    child("b", (), move |_| {
                        if broken.get() {
                            panic!("b is not ready");
                        }
                    });
                });
            }
        };

        let failed = host.render(app(1));
        assert!(matches!(
            failed,
            Err(HostError::RenderPanicked { ref component, .. }) if component == "root/provider/b"
        ));
        assert!(host.has_pending_updates());

        broken.set(false);
        host.render(app(1)).unwrap();
        host.render(app(2)).unwrap();
        host.render(app(3)).unwrap();

        assert_eq!(*seen.borrow(), vec![1, 1, 2, 3]);
        assert_eq!(host.render_count(&["provider", "a"]), Some(4));
        assert!(!host.has_pending_updates());
    }

    #[test]
    fn test_strict_mode_runs_each_body_twice_at_any_depth() {
        let host = Host::new(HostConfig::development().strict(true));
        let leaf_runs = Rc::new(Cell::new(0));

        let runs = leaf_runs.clone();
        host.render(move || {
            let runs = runs.clone();
            child_always("a", (), move |_| {
                let runs = runs.clone();
                child_always("b", (), move |_| {
                    let runs = runs.clone();
                    child_always("c", (), move |_| runs.set(runs.get() + 1));
                });
            });
        })
        .unwrap();

        assert_eq!(leaf_runs.get(), 2);
        assert_eq!(host.render_count(&["a", "b", "c"]), Some(1));
    }

    #[test]
    fn test_strict_mode_keeps_selection_semantics() {
        let host = Host::new(HostConfig::development().strict(true));
        let ctx = create_context(counter(0));
        let seen = Rc::new(RefCell::new(Vec::new()));

        host.render(counter_app(&ctx, counter(1), true, &seen)).unwrap();
        let after_mount = host.render_count(&["provider", "middle", "consumer"]);

        host.render(counter_app(&ctx, counter(1), true, &seen)).unwrap();
        assert_eq!(
            host.render_count(&["provider", "middle", "consumer"]),
            after_mount
        );

        host.render(counter_app(&ctx, counter(3), true, &seen)).unwrap();
        assert_eq!(seen.borrow().last(), Some(&3));
        assert!(!host.has_pending_updates());
    }

    #[test]
    fn test_layout_effects_run_children_first_and_clean_up() {
        let host = dev_host();
        let log = Rc::new(RefCell::new(Vec::new()));

        let app = |dep: u32| {
            let log = log.clone();
            move || {
                let outer = log.clone();
                let inner = log.clone();
                child("leaf", dep, move |&dep: &u32| {
                    let log = inner.clone();
                    use_layout_effect(Some(dep), move || {
                        log.borrow_mut().push(format!("leaf {dep}"));
                        Some(on_unmount(move || log.borrow_mut().push(format!("leaf cleanup {dep}"))))
                    });
                });
                let log = outer.clone();
                use_layout_effect(Some(()), move || {
                    log.borrow_mut().push("root".to_string());
                    None
                });
            }
        };

        host.render(app(1)).unwrap();
        host.render(app(1)).unwrap();
        host.render(app(2)).unwrap();
        host.unmount();

        assert_eq!(
            *log.borrow(),
            vec!["leaf 1", "root", "leaf cleanup 1", "leaf 2", "leaf cleanup 2"]
        );
    }

    #[test]
    fn test_remember_survives_rerenders() {
        let host = dev_host();
        let first = Rc::new(RefCell::new(None::<Rc<Cell<u32>>>));
        let same = Rc::new(Cell::new(false));

        let app = {
            let (first, same) = (first.clone(), same.clone());
            move || {
                let slot = remember(|| Cell::new(0u32));
                slot.set(slot.get() + 1);
                let existing = first.borrow().clone();
                match existing {
                    Some(prev) => same.set(Rc::ptr_eq(&prev, &slot)),
                    None => *first.borrow_mut() = Some(slot),
                }
            }
        };

        host.render(app.clone()).unwrap();
        host.render(app).unwrap();
        assert!(same.get());
        assert_eq!(first.borrow().as_ref().map(|c| c.get()), Some(2));
    }

    #[test]
    fn test_effect_that_always_updates_is_a_render_loop() {
        let host = dev_host();
        let result = host.render(|| {
            let force = use_force_update();
            use_layout_effect(None::<()>, move || {
                force.call();
                None
            });
        });
        assert!(matches!(result, Err(HostError::RenderLoop { .. })));
    }

    #[test]
    fn test_force_update_is_stable_across_renders() {
        let host = dev_host();
        let handles = Rc::new(RefCell::new(Vec::new()));
        let app = {
            let handles = handles.clone();
            move || handles.borrow_mut().push(use_force_update())
        };
        host.render(app.clone()).unwrap();
        host.render(app).unwrap();

        let handles = handles.borrow();
        assert!(handles[0] == handles[1]);
        handles[0].call();
        assert_eq!(handles[1].count(), 1);
        assert!(host.has_pending_updates());
    }

    partial_state! {
        struct Abc {
            a: u32,
            b: u32,
            c: u32,
        }
    }

    fn create_abc_manager(config: ManagerConfig<Abc>) -> Manager<Abc, ()> {
        create_manager(config, |_| ())
    }

    #[test]
    fn test_overlay_never_writes_undefined() {
        let host = dev_host();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let app = |overlay: Abc| {
            let seen = seen.clone();
            move || {
                let overlay = overlay.clone();
                let result = use_state_manager(
                    create_abc_manager,
                    StateManagerOptions::new()
                        .initial_state(|| Abc {
                            a: Some(1),
                            b: Some(2),
                            c: None,
                        })
                        .state(move || overlay),
                );
                seen.borrow_mut().push((*result.state).clone());
            }
        };

        host.render(app(Abc::default())).unwrap();
        host.render(app(Abc {
            a: None,
            b: None,
            c: Some(3),
        }))
        .unwrap();

        assert_eq!(
            seen.borrow().last(),
            Some(&Abc {
                a: Some(1),
                b: Some(2),
                c: Some(3)
            })
        );
    }

    #[test]
    fn test_controlled_overlay_wins_over_initial() {
        let host = dev_host();
        let seen = Rc::new(Cell::new(None));

        host.render({
            let seen = seen.clone();
            move || {
                let menu = use_state_manager(
                    create_menu_manager,
                    StateManagerOptions::new()
                        .initial_state(|| MenuState { active_index: None })
                        .state(|| MenuState {
                            active_index: Some(3),
                        }),
                );
                seen.set(menu.state.active_index);
            }
        })
        .unwrap();

        assert_eq!(seen.get(), Some(3));
    }

    struct MenuProbe {
        actions: RefCell<Option<Rc<MenuActions>>>,
        states: RefCell<Vec<Rc<MenuState>>>,
        initial_calls: Cell<u32>,
        external_effects: Cell<u32>,
    }

    fn menu_probe() -> Rc<MenuProbe> {
        Rc::new(MenuProbe {
            actions: RefCell::new(None),
            states: RefCell::new(Vec::new()),
            initial_calls: Cell::new(0),
            external_effects: Cell::new(0),
        })
    }

    fn uncontrolled_menu(probe: &Rc<MenuProbe>) -> impl Fn() + Clone + 'static {
        let probe = probe.clone();
        move || {
            let (initial, effect) = (probe.clone(), probe.clone());
            let menu = use_state_manager(
                create_menu_manager,
                StateManagerOptions::new()
                    .initial_state(move || {
                        initial.initial_calls.set(initial.initial_calls.get() + 1);
                        MenuState {
                            active_index: Some(0),
                        }
                    })
                    .side_effect(move |_| effect.external_effects.set(effect.external_effects.get() + 1)),
            );
            *probe.actions.borrow_mut() = Some(menu.actions.clone());
            probe.states.borrow_mut().push(menu.state.clone());
        }
    }

    #[test]
    fn test_action_updates_state_and_rerenders_once() {
        let host = dev_host();
        let probe = menu_probe();
        host.render(uncontrolled_menu(&probe)).unwrap();
        assert_eq!(host.render_count(&[]), Some(1));

        let actions = probe.actions.borrow().clone().unwrap();
        actions.select(2);
        assert!(host.has_pending_updates());
        host.flush().unwrap();

        assert_eq!(host.render_count(&[]), Some(2));
        assert_eq!(probe.states.borrow().last().unwrap().active_index, Some(2));
        assert_eq!(probe.external_effects.get(), 1);
    }

    #[test]
    fn test_state_carries_over_without_actions() {
        let host = dev_host();
        let probe = menu_probe();
        let app = uncontrolled_menu(&probe);

        host.render(app.clone()).unwrap();
        host.render(app.clone()).unwrap();
        host.render(app).unwrap();

        let states = probe.states.borrow();
        assert_eq!(states.len(), 3);
        assert!(states.iter().all(|s| **s == *states[0]));
        assert_eq!(probe.initial_calls.get(), 1);
    }

    #[test]
    fn test_controlled_prop_overrides_action_result() {
        let host = dev_host();
        let actions = Rc::new(RefCell::new(None::<Rc<MenuActions>>));
        let seen = Rc::new(RefCell::new(Vec::new()));

        host.render({
            let (actions, seen) = (actions.clone(), seen.clone());
            move || {
                let menu = use_state_manager(
                    create_menu_manager,
                    StateManagerOptions::new().state(|| MenuState {
                        active_index: Some(1),
                    }),
                );
                *actions.borrow_mut() = Some(menu.actions.clone());
                seen.borrow_mut().push(menu.state.active_index);
            }
        })
        .unwrap();

        actions.borrow().clone().unwrap().select(2);
        host.flush().unwrap();

        assert_eq!(*seen.borrow(), vec![Some(1), Some(1)]);
    }

    #[test]
    fn test_config_parses_build_modes() {
        assert_eq!(BuildMode::parse("Production"), Some(BuildMode::Production));
        assert_eq!(BuildMode::parse(" dev "), Some(BuildMode::Development));
        assert_eq!(BuildMode::parse("staging"), None);
        assert!(BuildMode::Development.reports_missing_provider());
        assert!(!BuildMode::Production.guards_snapshots());
    }
}
