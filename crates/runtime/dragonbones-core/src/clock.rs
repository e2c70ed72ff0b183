//! World clock: fans one host tick out to every registered animatable.
//!
//! Entries are shared (`Rc<RefCell<dyn Animatable>>`) so a host can keep its own
//! handle to each armature. Removal only nulls the entry; the list is compacted
//! during the next pass, so an animatable may remove itself or any other entry
//! while it is being advanced.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Anything a [`WorldClock`] can drive.
pub trait Animatable {
    fn advance_time(&mut self, passed: f32);

    /// Stopped animatables stay registered but are skipped.
    fn is_stopped(&self) -> bool {
        false
    }

    fn clock(&self) -> Option<ClockId>;
    fn set_clock(&mut self, clock: Option<ClockId>);
}

pub type SharedAnimatable = Rc<RefCell<dyn Animatable>>;

/// Identity of a clock, stored by animatables as their back-reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClockId(u64);

impl ClockId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ClockId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

pub struct WorldClock {
    id: ClockId,
    time: Cell<f32>,
    time_scale: Cell<f32>,
    entries: RefCell<Vec<Option<SharedAnimatable>>>,
    ticking: Cell<bool>,
    clock: Cell<Option<ClockId>>,
}

impl Default for WorldClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl fmt::Debug for WorldClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldClock")
            .field("id", &self.id)
            .field("time", &self.time.get())
            .field("time_scale", &self.time_scale.get())
            .field("entries", &self.len())
            .finish()
    }
}

#[inline]
fn same(a: &SharedAnimatable, b: &SharedAnimatable) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

impl WorldClock {
    /// Clock starting at `time` seconds.
    pub fn new(time: f32) -> Self {
        Self {
            id: ClockId::next(),
            time: Cell::new(time),
            time_scale: Cell::new(1.0),
            entries: RefCell::new(Vec::new()),
            ticking: Cell::new(false),
            clock: Cell::new(None),
        }
    }

    pub fn id(&self) -> ClockId {
        self.id
    }

    pub fn time(&self) -> f32 {
        self.time.get()
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale.get()
    }

    pub fn set_time_scale(&self, time_scale: f32) {
        self.time_scale.set(time_scale);
    }

    /// Registered animatables, not counting ones removed this pass.
    pub fn len(&self) -> usize {
        self.entries.borrow().iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advance every registered animatable by `passed * time_scale`, in registration order.
    ///
    /// Entries removed since the last pass are compacted out while iterating: survivors
    /// shift down over the holes and the tail is truncated once the pass ends.
    pub fn advance_time(&self, passed: f32) {
        let mut passed = if passed.is_nan() { 0.0 } else { passed };
        if passed == 0.0 {
            return;
        }
        if self.ticking.get() {
            log::warn!("world clock advanced while already ticking; ignored");
            return;
        }
        passed *= self.time_scale.get();
        self.time.set(self.time.get() + passed);
        self.ticking.set(true);

        let count = self.entries.borrow().len();
        let mut holes = 0;
        for i in 0..count {
            let entry = self.entries.borrow().get(i).cloned().flatten();
            let Some(entry) = entry else {
                holes += 1;
                continue;
            };
            if holes > 0 {
                let mut entries = self.entries.borrow_mut();
                entries[i - holes] = entries[i].take();
            }
            match entry.try_borrow_mut() {
                Ok(mut animatable) => {
                    if !animatable.is_stopped() {
                        animatable.advance_time(passed);
                    }
                }
                Err(_) => log::warn!("world clock entry {i} is borrowed; skipped this tick"),
            };
        }

        self.ticking.set(false);
        if holes > 0 {
            let mut entries = self.entries.borrow_mut();
            // entries added during the pass
            for i in count..entries.len() {
                if entries[i].is_some() {
                    entries[i - holes] = entries[i].take();
                } else {
                    holes += 1;
                }
            }
            let len = entries.len() - holes;
            entries.truncate(len);
        }
    }

    /// Slots held by the entry list, holes from pending removals included.
    pub fn slot_count(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Register `animatable` once and point its clock back-reference here.
    /// Returns false when it is already registered.
    pub fn add(&self, animatable: &SharedAnimatable) -> bool {
        if self.contains(animatable) {
            return false;
        }
        self.entries.borrow_mut().push(Some(animatable.clone()));
        match animatable.try_borrow_mut() {
            Ok(mut a) => a.set_clock(Some(self.id)),
            Err(_) => log::warn!("clock {:?}: added animatable is borrowed; clock not set", self.id),
        }
        true
    }

    /// Deregister `animatable`. It is not advanced again, even later in the current pass.
    /// The emptied slot is reclaimed by the next [`advance_time`](Self::advance_time).
    pub fn remove(&self, animatable: &SharedAnimatable) -> bool {
        let found = {
            let mut entries = self.entries.borrow_mut();
            let slot = entries
                .iter_mut()
                .find(|e| e.as_ref().is_some_and(|e| same(e, animatable)));
            slot.map(|slot| slot.take()).is_some()
        };
        if !found {
            return false;
        }
        if let Ok(mut a) = animatable.try_borrow_mut() {
            if a.clock() == Some(self.id) {
                a.set_clock(None);
            }
        }
        true
    }

    pub fn contains(&self, animatable: &SharedAnimatable) -> bool {
        self.entries
            .borrow()
            .iter()
            .flatten()
            .any(|e| same(e, animatable))
    }

    /// Deregister everything and clear every back-reference.
    pub fn clear(&self) {
        let cleared: Vec<SharedAnimatable> = self
            .entries
            .borrow_mut()
            .iter_mut()
            .filter_map(Option::take)
            .collect();
        for entry in &cleared {
            if let Ok(mut a) = entry.try_borrow_mut() {
                a.set_clock(None);
            }
        }
    }
}

impl Animatable for WorldClock {
    fn advance_time(&mut self, passed: f32) {
        WorldClock::advance_time(self, passed);
    }

    fn clock(&self) -> Option<ClockId> {
        self.clock.get()
    }

    fn set_clock(&mut self, clock: Option<ClockId>) {
        self.clock.set(clock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        ticks: u32,
        total: f32,
        stopped: bool,
        clock: Option<ClockId>,
    }

    impl Animatable for Counter {
        fn advance_time(&mut self, passed: f32) {
            self.ticks += 1;
            self.total += passed;
        }

        fn is_stopped(&self) -> bool {
            self.stopped
        }

        fn clock(&self) -> Option<ClockId> {
            self.clock
        }

        fn set_clock(&mut self, clock: Option<ClockId>) {
            self.clock = clock;
        }
    }

    fn mk_counter() -> (Rc<RefCell<Counter>>, SharedAnimatable) {
        let counter = Rc::new(RefCell::new(Counter::default()));
        let shared: SharedAnimatable = counter.clone();
        (counter, shared)
    }

    /// it should register an animatable once and set its clock
    #[test]
    fn add_is_idempotent() {
        let clock = WorldClock::new(0.0);
        let (counter, shared) = mk_counter();
        assert!(clock.add(&shared));
        assert!(!clock.add(&shared));
        assert_eq!(clock.len(), 1);
        assert_eq!(counter.borrow().clock, Some(clock.id()));
        clock.advance_time(0.1);
        assert_eq!(counter.borrow().ticks, 1);
    }

    /// it should ignore a zero delta and scale the rest
    #[test]
    fn zero_delta_and_time_scale() {
        let clock = WorldClock::new(1.0);
        let (counter, shared) = mk_counter();
        clock.add(&shared);
        clock.advance_time(0.0);
        assert_eq!(counter.borrow().ticks, 0);
        assert_eq!(clock.time(), 1.0);
        clock.set_time_scale(2.0);
        clock.advance_time(0.25);
        assert_eq!(counter.borrow().total, 0.5);
        assert_eq!(clock.time(), 1.5);
    }

    /// it should skip stopped animatables without deregistering them
    #[test]
    fn stopped_entries_are_skipped() {
        let clock = WorldClock::new(0.0);
        let (counter, shared) = mk_counter();
        clock.add(&shared);
        counter.borrow_mut().stopped = true;
        clock.advance_time(0.1);
        assert_eq!(counter.borrow().ticks, 0);
        assert!(clock.contains(&shared));
    }

    /// it should clear back-references on clear
    #[test]
    fn clear_detaches_everything() {
        let clock = WorldClock::new(0.0);
        let (a, sa) = mk_counter();
        let (b, sb) = mk_counter();
        clock.add(&sa);
        clock.add(&sb);
        clock.clear();
        assert!(clock.is_empty());
        assert!(a.borrow().clock.is_none());
        assert!(b.borrow().clock.is_none());
        clock.advance_time(0.1);
        assert_eq!(a.borrow().ticks, 0);
    }
}
