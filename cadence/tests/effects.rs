// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for the `cadence` crate: registering, matching, and stopping
//! effects.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use cadence::{
    Becomes, Check, Effect, EffectContext, ItemChange, ItemEffect, ItemTypeDef, Mutate, NewItem,
    Phase, Schema, Store, StoreConfig, Value,
};

fn schema() -> Schema {
    Schema::builder()
        .item_type(ItemTypeDef::new("doors").prop("open", false).prop("color", "red"))
        .item_type(ItemTypeDef::new("lamps").prop("lit", false))
        .build()
        .unwrap()
}

fn store() -> Store {
    let mut store = Store::new(schema());
    store.add_item(NewItem::new("doors", "front"));
    store.add_item(NewItem::new("doors", "back"));
    store.add_item(NewItem::new("lamps", "hall"));
    store
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

type Log = Rc<RefCell<Vec<String>>>;

fn logger(log: &Log, entry: &'static str) -> impl FnMut(&mut EffectContext<'_>) + 'static {
    let log = log.clone();
    move |_ctx: &mut EffectContext<'_>| log.borrow_mut().push(entry.to_string())
}

#[test]
fn effects_get_counted_ids() {
    let mut store = store();
    let first = store.start_effect(Effect::new(|_ctx| {}));
    let second = store.start_effect(Effect::new(|_ctx| {}));
    let named = store.start_effect(Effect::new(|_ctx| {}).id("named"));
    assert_eq!(first.as_str(), "effect_1");
    assert_eq!(second.as_str(), "effect_2");
    assert_eq!(named.as_str(), "named");

    store.tick(ms(0));
    assert_eq!(store.effect_ids(), [first, second, named]);
}

#[test]
fn restarting_an_id_replaces_the_effect() {
    let log = Log::default();
    let mut store = store();
    let check = Check::new().item_type("lamps");
    store.start_effect(Effect::new(logger(&log, "old")).id("watch").check(check.clone()));
    store.tick(ms(0));
    store.start_effect(Effect::new(logger(&log, "new")).id("watch").check(check));
    store.set_state("lamps.lit", true, "hall");
    store.tick(ms(16));
    assert_eq!(*log.borrow(), ["new"]);
    assert_eq!(store.effect_ids().len(), 1);
}

#[test]
fn stopping_before_the_frame_drops_the_pending_start() {
    let log = Log::default();
    let mut store = store();
    let id = store.start_effect(Effect::new(logger(&log, "ran")).run_at_start());
    store.stop_effect(id.as_str());
    store.tick(ms(0));
    assert!(!store.has_effect(id.as_str()));
    assert!(log.borrow().is_empty());
}

#[test]
fn an_effect_can_stop_itself() {
    let runs = Rc::new(Cell::new(0));
    let counter = runs.clone();
    let mut store = store();
    store.start_effect(
        Effect::new(move |ctx| {
            counter.set(counter.get() + 1);
            let id = ctx.effect_id().clone();
            ctx.stop_effect(id.as_str());
        })
        .id("once")
        .check(Check::new().item_type("lamps")),
    );
    store.tick(ms(0));

    store.set_state("lamps.lit", true, "hall");
    store.tick(ms(16));
    store.set_state("lamps.lit", false, "hall");
    store.tick(ms(32));
    assert_eq!(runs.get(), 1);
    assert!(!store.has_effect("once"));
}

#[test]
fn one_effect_can_stop_another_mid_frame() {
    let log = Log::default();
    let mut store = store();
    let check = Check::new().item_type("lamps");
    store.start_effect(
        Effect::new(|ctx| ctx.stop_effect("second"))
            .id("first")
            .check(check.clone()),
    );
    store.start_effect(Effect::new(logger(&log, "second")).id("second").check(check));
    store.tick(ms(0));

    store.set_state("lamps.lit", true, "hall");
    store.tick(ms(16));
    assert!(log.borrow().is_empty());
    assert_eq!(store.effect_ids().len(), 1);
}

#[test]
fn run_at_start_effects_run_once_then_react() {
    let starts = Rc::new(Cell::new(0));
    let reactions = Rc::new(Cell::new(0));
    let (s, r) = (starts.clone(), reactions.clone());
    let mut store = store();
    store.start_effect(
        Effect::new(move |ctx| {
            if ctx.started() {
                s.set(s.get() + 1);
            } else {
                r.set(r.get() + 1);
            }
        })
        .check(Check::new().item_type("lamps"))
        .run_at_start(),
    );
    assert!(store.has_pending_work());
    store.tick(ms(0));
    assert_eq!((starts.get(), reactions.get()), (1, 0));

    store.set_state("lamps.lit", true, "hall");
    store.tick(ms(16));
    assert_eq!((starts.get(), reactions.get()), (1, 1));
}

#[test]
fn a_start_run_that_stops_itself_never_registers() {
    let mut store = store();
    let id = store.start_effect(
        Effect::new(|ctx| {
            let id = ctx.effect_id().clone();
            ctx.stop_effect(id.as_str());
        })
        .run_at_start(),
    );
    store.tick(ms(0));
    assert!(!store.has_effect(id.as_str()));
}

#[test]
fn a_start_run_can_stop_a_later_start() {
    let log = Log::default();
    let first = log.clone();
    let mut store = store();
    store.start_effect(
        Effect::new(move |ctx| {
            first.borrow_mut().push("a".to_string());
            ctx.stop_effect("b");
        })
        .id("a")
        .check(Check::new().item_type("lamps"))
        .run_at_start(),
    );
    store.start_effect(Effect::new(logger(&log, "b")).id("b").run_at_start());
    store.tick(ms(0));

    assert_eq!(*log.borrow(), ["a"]);
    assert!(store.has_effect("a"));
    assert!(!store.has_effect("b"));
}

#[test]
fn checks_filter_by_id_and_prop() {
    let log = Log::default();
    let mut store = store();
    store.start_effect(
        Effect::new(logger(&log, "front color"))
            .check(Check::new().item_type("doors").id("front").prop("color")),
    );
    store.start_effect(
        Effect::new(logger(&log, "lifecycle"))
            .check(Check::new().item_type("doors").added_or_removed()),
    );
    store.tick(ms(0));

    store.set_state("doors.color", "blue", "back");
    store.set_state("doors.open", true, "front");
    store.tick(ms(16));
    assert!(log.borrow().is_empty());

    store.set_state("doors.color", "blue", "front");
    store.tick(ms(32));
    assert_eq!(*log.borrow(), ["front color"]);

    store.add_item(NewItem::new("doors", "side"));
    store.tick(ms(48));
    assert_eq!(*log.borrow(), ["front color", "lifecycle"]);
}

#[test]
fn any_clause_can_wake_an_effect() {
    let log = Log::default();
    let mut store = store();
    store.start_effect(
        Effect::new(logger(&log, "either"))
            .check(Check::new().item_type("doors").prop("open"))
            .check(Check::new().item_type("lamps")),
    );
    store.tick(ms(0));
    store.set_state("lamps.lit", true, "hall");
    store.tick(ms(16));
    store.set_state("doors.open", true, "back");
    store.tick(ms(32));
    assert_eq!(*log.borrow(), ["either", "either"]);
}

#[test]
fn steps_and_phases_run_in_order() {
    let config = StoreConfig::builder().steps(["physics", "render"]).build();
    let mut store = Store::with_config(schema(), config);
    store.add_item(NewItem::new("doors", "front"));
    store.add_item(NewItem::new("lamps", "hall"));
    let log = Log::default();

    // A physics-step derivation lights the lamp whenever a door opens.
    let derive = log.clone();
    store.start_effect(
        Effect::new(move |ctx| {
            derive.borrow_mut().push("derive".to_string());
            let open = ctx.get_value("doors.open", "front").cloned();
            ctx.set_state("lamps.lit", open.unwrap_or_default(), "hall");
        })
        .check(Check::new().item_type("doors").prop("open"))
        .phase(Phase::DuringStep)
        .step("physics"),
    );
    store.start_effect(
        Effect::new(logger(&log, "physics end"))
            .check(Check::new().item_type("lamps"))
            .phase(Phase::EndOfStep)
            .step("physics"),
    );
    store.start_effect(
        Effect::new(logger(&log, "render end"))
            .check(Check::new().item_type("lamps"))
            .phase(Phase::EndOfStep)
            .step("render"),
    );
    store.tick(ms(0));

    store.set_state("doors.open", true, "front");
    store.tick(ms(16));
    assert_eq!(store.get_value("lamps.lit", "hall"), Some(&Value::from(true)));
    assert_eq!(*log.borrow(), ["derive", "physics end", "render end"]);
}

#[test]
fn unknown_steps_are_not_registered() {
    let mut store = store();
    let id = store.start_effect(Effect::new(|_ctx| {}).step("nowhere"));
    store.tick(ms(0));
    assert!(!store.has_effect(id.as_str()));
}

#[test]
fn item_effects_fan_out_per_change() {
    let changes: Rc<RefCell<Vec<ItemChange>>> = Rc::default();
    let sink = changes.clone();
    let mut store = store();
    store.start_item_effect(ItemEffect::new("doors", move |change, _ctx| {
        sink.borrow_mut().push(change.clone());
    }));
    store.tick(ms(0));

    store.set_state("doors.open", true, "front");
    store.set_state("doors.color", "green", "back");
    store.set_state("lamps.lit", true, "hall");
    store.tick(ms(16));

    let changes = changes.borrow();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].id.as_str(), "front");
    assert_eq!(changes[0].prop, "open");
    assert_eq!(changes[0].prev, Value::from(false));
    assert_eq!(changes[0].new, Value::from(true));
    assert_eq!(changes[1].id.as_str(), "back");
    assert_eq!(changes[1].prop, "color");
    assert_eq!(changes[1].new, Value::from("green"));
}

#[test]
fn item_effects_can_gate_on_the_new_value() {
    let opened = Rc::new(RefCell::new(Vec::new()));
    let sink = opened.clone();
    let mut store = store();
    store.start_item_effect(
        ItemEffect::new("doors", move |change, _ctx| {
            sink.borrow_mut().push(change.id.to_string());
        })
        .prop("open")
        .becomes(Becomes::Equals(Value::from(true))),
    );
    store.tick(ms(0));

    store.set_state("doors.open", true, "front");
    store.tick(ms(16));
    store.set_state("doors.open", false, "front");
    store.set_state("doors.open", true, "back");
    store.tick(ms(32));
    assert_eq!(*opened.borrow(), ["front", "back"]);
}

#[test]
fn item_effects_can_watch_one_item_with_a_predicate() {
    let rises = Rc::new(Cell::new(0));
    let counter = rises.clone();
    let mut store = store();
    store.start_item_effect(
        ItemEffect::new("doors", move |_change, _ctx| counter.set(counter.get() + 1))
            .item("back")
            .becomes(Becomes::When(Box::new(|new: &Value, prev: &Value| {
                new.as_bool() == Some(true) && prev.as_bool() == Some(false)
            }))),
    );
    store.tick(ms(0));

    store.set_state("doors.open", true, "front");
    store.set_state("doors.open", true, "back");
    store.tick(ms(16));
    store.set_state("doors.open", false, "back");
    store.tick(ms(32));
    assert_eq!(rises.get(), 1);
}

#[test]
fn item_effects_at_start_see_every_item() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let mut store = store();
    store.start_item_effect(
        ItemEffect::new("doors", move |change, _ctx| {
            sink.borrow_mut().push(change.id.to_string());
        })
        .prop("open")
        .run_at_start(),
    );
    store.tick(ms(0));
    assert_eq!(*seen.borrow(), ["front", "back"]);
}

#[test]
fn registered_effects_can_run_on_demand() {
    let log = Log::default();
    let mut store = store();
    store.start_effect(
        Effect::new(logger(&log, "manual"))
            .id("manual")
            .check(Check::new().item_type("lamps")),
    );
    store.run_effect_now("manual");
    assert!(log.borrow().is_empty(), "not registered until the next frame");

    store.tick(ms(0));
    store.run_effect_now("manual");
    store.run_effect_now("missing");
    assert_eq!(*log.borrow(), ["manual"]);
}

#[test]
fn effects_can_run_other_effects_now() {
    let log = Log::default();
    let mut store = store();
    store.start_effect(
        Effect::new(logger(&log, "helper"))
            .id("helper")
            .check(Check::new().item_type("doors")),
    );
    store.start_effect(
        Effect::new(|ctx| {
            ctx.run_effect_now("helper");
            ctx.run_effect_now("caller");
        })
        .id("caller")
        .check(Check::new().item_type("lamps")),
    );
    store.tick(ms(0));

    store.set_state("lamps.lit", true, "hall");
    store.tick(ms(16));
    assert_eq!(*log.borrow(), ["helper"]);
    assert!(store.has_effect("caller"));
}

#[test]
fn effects_queue_work_for_later_passes() {
    let mut store = store();
    store.start_effect(
        Effect::new(|ctx| {
            if ctx.get_state("lamps", "porch").is_none() {
                ctx.add_item(NewItem::new("lamps", "porch").prop("lit", true));
            }
        })
        .check(Check::new().item_type("doors"))
        .phase(Phase::DuringStep),
    );
    store.tick(ms(0));
    store.set_state("doors.open", true, "front");
    let report = store.tick(ms(16));
    assert_eq!(store.get_value("lamps.lit", "porch"), Some(&Value::from(true)));
    assert!(!report.runaway);
}
