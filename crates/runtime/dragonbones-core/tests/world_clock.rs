use std::cell::RefCell;
use std::rc::Rc;

use dragonbones_core::{Animatable, Armature, ClockId, Factory, SharedAnimatable, WorldClock};
use dragonbones_test_fixtures::skeletons;

fn approx(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

fn mk_hero() -> Rc<RefCell<Armature>> {
    let mut factory: Factory = Factory::default();
    let raw = skeletons::json("hero").expect("hero fixture");
    factory
        .parse_dragonbones_data(&raw, None, 1.0)
        .expect("hero parses");
    let hero = factory
        .build_armature("hero", None, None, None)
        .expect("hero builds");
    Rc::new(RefCell::new(hero))
}

/// Records every tick it receives.
#[derive(Default)]
struct Recorder {
    ticks: Vec<f32>,
    clock: Option<ClockId>,
}

impl Animatable for Recorder {
    fn advance_time(&mut self, passed: f32) {
        self.ticks.push(passed);
    }

    fn clock(&self) -> Option<ClockId> {
        self.clock
    }

    fn set_clock(&mut self, clock: Option<ClockId>) {
        self.clock = clock;
    }
}

/// Removes `target` from `clock` the first time it is advanced.
struct Remover {
    clock: Rc<WorldClock>,
    target: SharedAnimatable,
    id: Option<ClockId>,
}

impl Animatable for Remover {
    fn advance_time(&mut self, _passed: f32) {
        self.clock.remove(&self.target);
    }

    fn clock(&self) -> Option<ClockId> {
        self.id
    }

    fn set_clock(&mut self, clock: Option<ClockId>) {
        self.id = clock;
    }
}

/// Logs its tag each time it is advanced.
struct Tagged {
    tag: usize,
    log: Rc<RefCell<Vec<usize>>>,
    clock: Option<ClockId>,
}

impl Animatable for Tagged {
    fn advance_time(&mut self, _passed: f32) {
        self.log.borrow_mut().push(self.tag);
    }

    fn clock(&self) -> Option<ClockId> {
        self.clock
    }

    fn set_clock(&mut self, clock: Option<ClockId>) {
        self.clock = clock;
    }
}

fn mk_recorder() -> (Rc<RefCell<Recorder>>, SharedAnimatable) {
    let recorder = Rc::new(RefCell::new(Recorder::default()));
    let shared: SharedAnimatable = recorder.clone();
    (recorder, shared)
}

/// it should drive registered armatures with the scaled delta
#[test]
fn clock_advances_armatures() {
    let clock = WorldClock::new(0.0);
    let hero = mk_hero();
    let shared: SharedAnimatable = hero.clone();
    assert!(clock.add(&shared));
    assert_eq!(hero.borrow().clock(), Some(clock.id()));

    hero.borrow_mut().animation_mut().play(Some("walk"), -1);
    clock.set_time_scale(0.5);
    clock.advance_time(0.4);

    let hero = hero.borrow();
    let id = hero.animation().last_state().unwrap();
    assert!(approx(hero.animation().state(id).unwrap().current_time(), 0.2, 1e-4));
    assert!(approx(clock.time(), 0.2, 1e-6));
}

/// it should pass negative deltas through scaled and ignore NaN
#[test]
fn delta_sanitizing() {
    let clock = WorldClock::new(1.0);
    let (recorder, shared) = mk_recorder();
    clock.add(&shared);
    clock.advance_time(-0.25);
    assert!(approx(clock.time(), 0.75, 1e-6));
    clock.set_time_scale(2.0);
    clock.advance_time(-0.25);
    assert!(approx(clock.time(), 0.25, 1e-6));
    clock.advance_time(f32::NAN);
    assert_eq!(recorder.borrow().ticks, vec![-0.25, -0.5]);
}

/// it should reclaim removed slots on the next pass and keep registration order
#[test]
fn removal_is_compacted_on_next_pass() {
    let clock = WorldClock::new(0.0);
    let log: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
    let entries: Vec<SharedAnimatable> = (0..12)
        .map(|tag| {
            let entry: SharedAnimatable = Rc::new(RefCell::new(Tagged {
                tag,
                log: log.clone(),
                clock: None,
            }));
            clock.add(&entry);
            entry
        })
        .collect();

    for entry in entries.iter().step_by(3) {
        assert!(clock.remove(entry));
    }
    assert_eq!(clock.len(), 8);
    assert_eq!(clock.slot_count(), 12);

    clock.advance_time(0.1);
    assert_eq!(clock.slot_count(), 8);
    assert_eq!(*log.borrow(), vec![1, 2, 4, 5, 7, 8, 10, 11]);

    log.borrow_mut().clear();
    clock.advance_time(0.1);
    assert_eq!(*log.borrow(), vec![1, 2, 4, 5, 7, 8, 10, 11]);
}

/// it should skip an entry removed earlier in the same pass
#[test]
fn removal_during_pass_skips_target() {
    let clock = Rc::new(WorldClock::new(0.0));
    let (first, first_shared) = mk_recorder();
    let (target, target_shared) = mk_recorder();
    let remover: SharedAnimatable = Rc::new(RefCell::new(Remover {
        clock: clock.clone(),
        target: target_shared.clone(),
        id: None,
    }));

    clock.add(&first_shared);
    clock.add(&remover);
    clock.add(&target_shared);
    clock.advance_time(0.1);

    assert_eq!(first.borrow().ticks.len(), 1);
    assert!(target.borrow().ticks.is_empty());
    assert!(target.borrow().clock.is_none());
    assert!(!clock.contains(&target_shared));
    assert_eq!(clock.len(), 2);

    clock.advance_time(0.1);
    assert_eq!(first.borrow().ticks.len(), 2);
    assert!(target.borrow().ticks.is_empty());
}

/// it should nest: a clock registered in another clock receives the outer delta
#[test]
fn nested_clocks() {
    let outer = WorldClock::new(0.0);
    let inner = Rc::new(RefCell::new(WorldClock::new(0.0)));
    let (recorder, shared) = mk_recorder();
    inner.borrow().add(&shared);
    inner.borrow().set_time_scale(2.0);

    let inner_shared: SharedAnimatable = inner.clone();
    outer.add(&inner_shared);
    assert_eq!(inner.borrow().clock(), Some(outer.id()));

    outer.advance_time(0.1);
    assert_eq!(recorder.borrow().ticks.len(), 1);
    assert!(approx(recorder.borrow().ticks[0], 0.2, 1e-6));
}

/// it should detach on remove and accept the animatable again afterwards
#[test]
fn remove_then_add_again() {
    let clock = WorldClock::new(0.0);
    let (recorder, shared) = mk_recorder();
    clock.add(&shared);
    assert!(clock.remove(&shared));
    assert!(!clock.remove(&shared));
    assert!(recorder.borrow().clock.is_none());
    assert!(clock.is_empty());

    assert!(clock.add(&shared));
    clock.advance_time(0.1);
    assert_eq!(recorder.borrow().ticks.len(), 1);
}
