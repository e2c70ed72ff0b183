//! Runtime armature: the pose graph of one skeleton plus its animation driver,
//! event plumbing and the child armatures hosted by its slots.
//!
//! Tick (`advance_time`):
//! 1. snapshot which event kinds have listeners
//! 2. advance animation states, blending into bones and slots
//! 3. resolve bones, constraints and slots
//! 4. advance child armatures shown by slots
//! 5. dispatch buffered events, then run buffered play actions

mod bone;
mod constraint;
mod pose;
mod proxy;
mod slot;

use std::fmt;
use std::rc::Rc;

pub use bone::{Bone, OffsetMode};
pub use constraint::{Constraint, IkConstraint, PathConstraint};
pub(crate) use pose::Pose;
pub use proxy::{DisplayRef, NullProxy, RenderProxy};
pub use slot::{DisplayFrame, Slot};

use crate::animation::{Animation, AnimationFadeOutMode, AnimationMut};
use crate::clock::{Animatable, ClockId};
use crate::config::RuntimeConfig;
use crate::event::{EventBuffer, EventDispatcher, EventHub, EventKind, Listener, ListenerId};
use crate::model::{ActionData, ActionKind, ArmatureData};
use crate::pool::Poolable;

pub struct Armature {
    name: String,
    pose: Pose,
    animation: Animation,
    events: EventBuffer,
    dispatcher: Box<dyn EventDispatcher>,
    proxy: Box<dyn RenderProxy>,
    /// Follow the parent armature's animations and time scale when hosted by a slot.
    pub inherit_animation: bool,
    clock: Option<ClockId>,
}

impl Default for Armature {
    fn default() -> Self {
        Self {
            name: String::new(),
            pose: Pose::default(),
            animation: Animation::default(),
            events: EventBuffer::default(),
            dispatcher: Box::new(EventHub::new()),
            proxy: Box::new(NullProxy),
            inherit_animation: true,
            clock: None,
        }
    }
}

impl fmt::Debug for Armature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Armature")
            .field("name", &self.name)
            .field("bones", &self.pose.bones.len())
            .field("slots", &self.pose.slots.len())
            .field("states", &self.animation.state_ids().len())
            .finish()
    }
}

impl Poolable for Armature {
    fn clear(&mut self) {
        self.dispose();
        self.name.clear();
        self.pose = Pose::default();
        self.animation.unbind();
        self.dispatcher = Box::new(EventHub::new());
        self.proxy = Box::new(NullProxy);
        self.inherit_animation = true;
        self.clock = None;
    }
}

impl Armature {
    pub fn new(
        data: Rc<ArmatureData>,
        bones: Vec<Bone>,
        slots: Vec<Slot>,
        constraints: Vec<Constraint>,
        proxy: Box<dyn RenderProxy>,
        config: &RuntimeConfig,
    ) -> Self {
        let mut armature = Self {
            animation: Animation::new(config.state_pool_capacity),
            events: EventBuffer::new(config.event_pool_capacity, config.max_events_per_tick),
            ..Self::default()
        };
        armature.init(data, bones, slots, constraints, proxy);
        armature
    }

    /// Rebind a cleared (possibly recycled) armature to new data.
    pub(crate) fn init(
        &mut self,
        data: Rc<ArmatureData>,
        bones: Vec<Bone>,
        slots: Vec<Slot>,
        constraints: Vec<Constraint>,
        proxy: Box<dyn RenderProxy>,
    ) {
        self.name.clear();
        self.name.push_str(&data.name);
        self.animation.init(&data);
        self.pose = Pose::new(data, bones, slots, constraints);
        self.proxy = proxy;
        log::debug!(
            "armature {} bound: {} bones, {} slots",
            self.name,
            self.pose.bones.len(),
            self.pose.slots.len()
        );
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn armature_data(&self) -> &Rc<ArmatureData> {
        &self.pose.data
    }

    pub fn advance_time(&mut self, passed: f32) {
        self.advance(passed, None);
    }

    /// `parent_scale` is the inherited time scale of the hosting armature, if this one follows it.
    pub(crate) fn advance(&mut self, passed: f32, parent_scale: Option<f32>) {
        self.events.refresh(self.dispatcher.as_ref());

        let Self {
            name,
            pose,
            animation,
            events,
            ..
        } = self;
        animation.advance_time(passed, parent_scale, pose, events, name);
        pose.update();

        let scale = animation.inherit_time_scale();
        for slot in &mut pose.slots {
            if let Some(child) = slot.child_armature_mut() {
                let inherited = child.inherit_animation.then_some(scale);
                child.advance(passed, inherited);
            }
        }

        if !self.events.is_empty() {
            self.events.flush(self.dispatcher.as_mut());
        }
        if !self.events.actions.is_empty() {
            let mut actions = std::mem::take(&mut self.events.actions);
            for action in &actions {
                self.run_action(action);
            }
            actions.clear();
            self.events.actions = actions;
        }
    }

    /// Queue an action to run after the next pose update.
    pub fn buffer_action(&mut self, action: ActionData) {
        self.events.actions.push(action);
    }

    fn run_action(&mut self, action: &ActionData) {
        if action.kind != ActionKind::Play {
            return;
        }
        if let Some(slot) = action.slot.as_deref() {
            if let Some(child) = self.get_slot_mut(slot).and_then(Slot::child_armature_mut) {
                fade_in_action(child, &action.name);
            }
        } else if let Some(bone) = action.bone.as_deref() {
            let Some(bone) = self.pose.data.get_bone_index(bone) else {
                log::warn!("action {}: unknown bone {bone}", action.name);
                return;
            };
            for slot in self.pose.slots.iter_mut().filter(|s| s.parent == bone) {
                if let Some(child) = slot.child_armature_mut() {
                    fade_in_action(child, &action.name);
                }
            }
        } else {
            fade_in_action(self, &action.name);
        }
    }

    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    pub fn animation_mut(&mut self) -> AnimationMut<'_> {
        AnimationMut::new(&mut self.animation, &mut self.pose)
    }

    pub fn get_bone(&self, name: &str) -> Option<&Bone> {
        self.pose.bones.iter().find(|b| b.name == name)
    }

    pub fn get_bone_mut(&mut self, name: &str) -> Option<&mut Bone> {
        self.pose.bones.iter_mut().find(|b| b.name == name)
    }

    /// Bones, parents first.
    pub fn get_bones(&self) -> &[Bone] {
        &self.pose.bones
    }

    pub fn get_slot(&self, name: &str) -> Option<&Slot> {
        self.pose.slots.iter().find(|s| s.name == name)
    }

    pub fn get_slot_mut(&mut self, name: &str) -> Option<&mut Slot> {
        self.pose.slots.iter_mut().find(|s| s.name == name)
    }

    /// Slots in data order; see [`Armature::draw_order`] for the order they are drawn in.
    pub fn get_slots(&self) -> &[Slot] {
        &self.pose.slots
    }

    pub fn get_slots_mut(&mut self) -> &mut [Slot] {
        &mut self.pose.slots
    }

    pub fn get_constraints(&self) -> &[Constraint] {
        &self.pose.constraints
    }

    /// Slot indices, back to front.
    pub fn draw_order(&self) -> &[usize] {
        &self.pose.draw_order
    }

    /// True when bone `child` lies below bone `ancestor`.
    pub fn bone_contains(&self, ancestor: &str, child: &str) -> bool {
        let index = |name: &str| self.pose.bones.iter().position(|b| b.name == name);
        match (index(ancestor), index(child)) {
            (Some(a), Some(c)) => self.pose.contains(a, c),
            _ => false,
        }
    }

    /// Force a recompute of `bone` (or every bone), and of its slots when `update_slot` is set.
    pub fn invalidate_update(&mut self, bone: Option<&str>, update_slot: bool) {
        match bone {
            Some(name) => match self.pose.bones.iter().position(|b| b.name == name) {
                Some(index) => self.pose.invalidate_update(Some(index), update_slot),
                None => log::warn!("armature {}: unknown bone {name}", self.name),
            },
            None => self.pose.invalidate_update(None, update_slot),
        }
    }

    pub fn flip_x(&self) -> bool {
        self.pose.flip_x
    }

    pub fn set_flip_x(&mut self, flip: bool) {
        if self.pose.flip_x != flip {
            self.pose.flip_x = flip;
            self.pose.invalidate_update(None, false);
        }
    }

    pub fn flip_y(&self) -> bool {
        self.pose.flip_y
    }

    pub fn set_flip_y(&mut self, flip: bool) {
        if self.pose.flip_y != flip {
            self.pose.flip_y = flip;
            self.pose.invalidate_update(None, false);
        }
    }

    pub fn cache_frame_rate(&self) -> f32 {
        self.pose.data.cache_frame_rate()
    }

    /// Enable cache frames for this armature's data and every hosted child armature.
    /// The first positive rate set on a data instance sticks.
    pub fn set_cache_frame_rate(&mut self, frame_rate: f32) {
        if self.pose.data.cache_frame_rate() == frame_rate {
            return;
        }
        self.pose.data.cache_frames(frame_rate);
        self.animation.mark_dirty();
        for slot in &mut self.pose.slots {
            for child in slot.child_armatures_mut() {
                child.set_cache_frame_rate(frame_rate);
            }
        }
    }

    pub fn event_dispatcher(&self) -> &dyn EventDispatcher {
        self.dispatcher.as_ref()
    }

    pub fn event_dispatcher_mut(&mut self) -> &mut dyn EventDispatcher {
        self.dispatcher.as_mut()
    }

    pub fn set_event_dispatcher(&mut self, dispatcher: Box<dyn EventDispatcher>) {
        self.dispatcher = dispatcher;
    }

    pub fn add_event_listener(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        self.dispatcher.add_listener(kind, listener)
    }

    pub fn remove_event_listener(&mut self, kind: EventKind, id: ListenerId) -> bool {
        self.dispatcher.remove_listener(kind, id)
    }

    /// Override the draw order (`order[i]` is the slot drawn at `i`); `None` restores the data order.
    pub fn sort_z_order(&mut self, order: Option<&[usize]>) {
        self.pose.set_z_order(order);
    }

    pub fn proxy(&self) -> &dyn RenderProxy {
        self.proxy.as_ref()
    }

    pub fn proxy_mut(&mut self) -> &mut dyn RenderProxy {
        self.proxy.as_mut()
    }

    pub fn clock(&self) -> Option<ClockId> {
        self.clock
    }

    /// Stop every state, drop pending events and release the render proxies of
    /// this armature and its child armatures.
    pub fn dispose(&mut self) {
        self.animation.reset();
        self.events.discard();
        for slot in &mut self.pose.slots {
            for child in slot.child_armatures_mut() {
                child.dispose();
            }
            slot.destroy();
        }
        self.proxy.destroy();
    }
}

fn fade_in_action(target: &mut Armature, name: &str) {
    target.animation_mut().fade_in(
        name,
        -1.0,
        -1,
        0,
        None,
        AnimationFadeOutMode::SameLayerAndGroup,
    );
}

impl Animatable for Armature {
    fn advance_time(&mut self, passed: f32) {
        Armature::advance_time(self, passed);
    }

    fn clock(&self) -> Option<ClockId> {
        self.clock
    }

    fn set_clock(&mut self, clock: Option<ClockId>) {
        self.clock = clock;
    }
}
