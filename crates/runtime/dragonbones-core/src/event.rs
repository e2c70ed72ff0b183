//! Animation events: kinds, pooled event objects, listener registry and the
//! per-armature buffer that queues events during a tick and flushes them after it.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::animation::StateId;
use crate::model::{ActionData, UserData};
use crate::pool::{ObjectPool, Poolable};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    #[default]
    Start,
    LoopComplete,
    Complete,
    FadeIn,
    FadeInComplete,
    FadeOut,
    FadeOutComplete,
    /// Custom keyframe event.
    Frame,
    Sound,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::Start,
        EventKind::LoopComplete,
        EventKind::Complete,
        EventKind::FadeIn,
        EventKind::FadeInComplete,
        EventKind::FadeOut,
        EventKind::FadeOutComplete,
        EventKind::Frame,
        EventKind::Sound,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::LoopComplete => "loopComplete",
            EventKind::Complete => "complete",
            EventKind::FadeIn => "fadeIn",
            EventKind::FadeInComplete => "fadeInComplete",
            EventKind::FadeOut => "fadeOut",
            EventKind::FadeOutComplete => "fadeOutComplete",
            EventKind::Frame => "frameEvent",
            EventKind::Sound => "soundEvent",
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Payload delivered to listeners.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventObject {
    pub kind: EventKind,
    /// Animation time at which the event fired, in seconds.
    pub time: f32,
    /// Frame and sound events carry the keyframe action name.
    pub name: String,
    pub armature: String,
    pub animation: String,
    pub state: Option<StateId>,
    pub bone: Option<String>,
    pub slot: Option<String>,
    pub action: Option<ActionData>,
    pub data: Option<UserData>,
}

impl Poolable for EventObject {
    fn clear(&mut self) {
        self.kind = EventKind::Start;
        self.time = 0.0;
        self.name.clear();
        self.armature.clear();
        self.animation.clear();
        self.state = None;
        self.bone = None;
        self.slot = None;
        self.action = None;
        self.data = None;
    }
}

pub type Listener = Box<dyn FnMut(&EventObject)>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

/// Host-facing event sink attached to an armature.
pub trait EventDispatcher {
    fn has_listener(&self, kind: EventKind) -> bool;
    fn dispatch(&mut self, event: &EventObject);
    fn add_listener(&mut self, kind: EventKind, listener: Listener) -> ListenerId;
    /// Returns false when `id` is not registered for `kind`.
    fn remove_listener(&mut self, kind: EventKind, id: ListenerId) -> bool;
}

/// Default dispatcher: closures keyed by event kind, called in registration order.
#[derive(Default)]
pub struct EventHub {
    listeners: HashMap<EventKind, Vec<(ListenerId, Listener)>>,
    next_id: u32,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("kinds", &self.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EventDispatcher for EventHub {
    fn has_listener(&self, kind: EventKind) -> bool {
        self.listener_count(kind) > 0
    }

    fn dispatch(&mut self, event: &EventObject) {
        if let Some(list) = self.listeners.get_mut(&event.kind) {
            for (_, listener) in list.iter_mut() {
                listener(event);
            }
        }
    }

    fn add_listener(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.listeners.entry(kind).or_default().push((id, listener));
        id
    }

    fn remove_listener(&mut self, kind: EventKind, id: ListenerId) -> bool {
        let Some(list) = self.listeners.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        before != list.len()
    }
}

/// Events and actions raised during one armature tick.
#[derive(Debug)]
pub(crate) struct EventBuffer {
    queue: Vec<EventObject>,
    pool: ObjectPool<EventObject>,
    listening: [bool; 9],
    max_events: usize,
    dropped: usize,
    /// `Play` actions crossed this tick, run by the armature after the pose update.
    pub actions: Vec<ActionData>,
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new(16, 1024)
    }
}

impl EventBuffer {
    pub fn new(pool_capacity: usize, max_events: usize) -> Self {
        Self {
            queue: Vec::new(),
            pool: ObjectPool::with_capacity(pool_capacity),
            listening: [false; 9],
            max_events,
            dropped: 0,
            actions: Vec::new(),
        }
    }

    /// Snapshot which kinds have listeners; events of other kinds are not buffered this tick.
    pub fn refresh(&mut self, dispatcher: &dyn EventDispatcher) {
        for kind in EventKind::ALL {
            self.listening[kind.index()] = dispatcher.has_listener(kind);
        }
    }

    #[inline]
    pub fn wants(&self, kind: EventKind) -> bool {
        self.listening[kind.index()]
    }

    pub fn borrow_event(&mut self, kind: EventKind) -> EventObject {
        let mut event = self.pool.borrow_object();
        event.kind = kind;
        event
    }

    pub fn push(&mut self, event: EventObject) {
        if self.queue.len() >= self.max_events {
            self.dropped += 1;
            self.pool.return_object(event);
            return;
        }
        self.queue.push(event);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Deliver queued events in order and return them to the pool.
    pub fn flush(&mut self, dispatcher: &mut dyn EventDispatcher) {
        if self.dropped > 0 {
            log::warn!(
                "{} events dropped this tick (limit {})",
                self.dropped,
                self.max_events
            );
            self.dropped = 0;
        }
        let mut queue = std::mem::take(&mut self.queue);
        for event in queue.drain(..) {
            dispatcher.dispatch(&event);
            self.pool.return_object(event);
        }
        self.queue = queue;
    }

    /// Drop everything without dispatching.
    pub fn discard(&mut self) {
        for event in self.queue.drain(..) {
            self.pool.return_object(event);
        }
        self.actions.clear();
        self.dropped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// it should call listeners of the matching kind in registration order
    #[test]
    fn hub_dispatches_by_kind() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut hub = EventHub::new();
        let a = seen.clone();
        hub.add_listener(EventKind::Complete, Box::new(move |e| a.borrow_mut().push(("a", e.kind))));
        let b = seen.clone();
        hub.add_listener(EventKind::Complete, Box::new(move |e| b.borrow_mut().push(("b", e.kind))));

        let start = EventObject {
            kind: EventKind::Start,
            ..Default::default()
        };
        hub.dispatch(&start);
        assert!(seen.borrow().is_empty());

        let complete = EventObject {
            kind: EventKind::Complete,
            ..Default::default()
        };
        hub.dispatch(&complete);
        assert_eq!(
            *seen.borrow(),
            vec![("a", EventKind::Complete), ("b", EventKind::Complete)]
        );
    }

    /// it should stop delivering after a listener is removed
    #[test]
    fn remove_listener_detaches() {
        let count = Rc::new(RefCell::new(0));
        let mut hub = EventHub::new();
        let c = count.clone();
        let id = hub.add_listener(EventKind::Frame, Box::new(move |_| *c.borrow_mut() += 1));
        assert!(hub.has_listener(EventKind::Frame));
        assert!(hub.remove_listener(EventKind::Frame, id));
        assert!(!hub.remove_listener(EventKind::Frame, id));
        assert!(!hub.has_listener(EventKind::Frame));
        hub.dispatch(&EventObject {
            kind: EventKind::Frame,
            ..Default::default()
        });
        assert_eq!(*count.borrow(), 0);
    }

    /// it should cap buffered events per tick and recycle objects on flush
    #[test]
    fn buffer_caps_and_flushes() {
        let mut hub = EventHub::new();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        hub.add_listener(EventKind::Sound, Box::new(move |_| *c.borrow_mut() += 1));

        let mut buffer = EventBuffer::new(4, 2);
        buffer.refresh(&hub);
        assert!(buffer.wants(EventKind::Sound));
        assert!(!buffer.wants(EventKind::Start));
        for _ in 0..3 {
            let e = buffer.borrow_event(EventKind::Sound);
            buffer.push(e);
        }
        assert_eq!(buffer.len(), 2);
        buffer.flush(&mut hub);
        assert_eq!(*count.borrow(), 2);
        assert!(buffer.is_empty());
    }
}
