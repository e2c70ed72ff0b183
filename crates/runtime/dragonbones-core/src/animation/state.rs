//! One playing instance of an animation: fade envelope, play head, event
//! emission, and the sampling that blends its timelines into the pose.
//!
//! Per tick (`advance`):
//! 1. fade envelope and fade events
//! 2. local time, weight result
//! 3. play head: start / loop / complete events and crossed action frames
//! 4. cache-frame gate
//! 5. z-order, bone, slot and child-animation timelines

use std::rc::Rc;

use dragonbones_geom::{ColorTransform, Transform};

use super::blend::{BlendKind, BlendTable};
use super::config::{add_to_mask, remove_from_mask, AnimationConfig};
use super::player::TickContext;
use super::StateId;
use crate::armature::Pose;
use crate::event::EventKind;
use crate::model::{ActionFrame, ActionKind, AnimationData, AnimationTimelineKind, ArmatureData};
use crate::pool::Poolable;
use crate::tween::{find_frame, sample};

const TIME_EPSILON: f32 = 0.000001;

/// Bone driven by this state. `timeline: None` pulls the bone back to setup while fading in.
#[derive(Copy, Clone, Debug, PartialEq)]
struct BoneTarget {
    timeline: Option<usize>,
    bone: usize,
    blend: usize,
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct SlotTarget {
    timeline: Option<usize>,
    slot: usize,
    color_blend: Option<usize>,
    z_blend: Option<usize>,
    last_display_frame: Option<usize>,
}

/// Sub-state driven by this state's animation timelines.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct ChildLink {
    pub state: StateId,
    progress: Option<usize>,
    weight: Option<usize>,
}

/// Values sampled for a child state this tick, applied by the owning `Animation`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct ChildUpdate {
    pub state: StateId,
    pub progress: Option<f32>,
    pub weight: Option<f32>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct PlayHead {
    /// -1 not started, 0 playing, 1 complete.
    play_state: i8,
    current_play_times: u32,
    /// Includes the state's start position.
    current_time: f32,
}

impl Default for PlayHead {
    fn default() -> Self {
        Self {
            play_state: -1,
            current_play_times: 0,
            current_time: 0.0,
        }
    }
}

#[derive(Debug)]
pub struct AnimationState {
    pub action_enabled: bool,
    pub additive: bool,
    /// Drive slot displays and draw order.
    pub display_control: bool,
    pub reset_to_pose: bool,
    /// 0 loops forever.
    pub play_times: u32,
    pub layer: i32,
    pub time_scale: f32,
    pub fade_total_time: f32,
    /// Negative: keep the state after it completes.
    pub auto_fade_out_time: f32,
    pub name: String,
    pub group: String,
    weight: f32,
    /// -1 fading in, 0 faded in, 1 fading out.
    pub(crate) fade_state: i8,
    /// -1 fade not begun, 0 fading, 1 fade done.
    pub(crate) sub_fade_state: i8,
    /// Bit 0: fade-in finished (or not paused). Bit 1: playing.
    playhead_state: u8,
    position: f32,
    duration: f32,
    time: f32,
    fade_time: f32,
    fade_progress: f32,
    weight_result: f32,
    bone_mask: Vec<String>,
    data: Option<Rc<AnimationData>>,
    pub(crate) parent: Option<StateId>,
    pub(crate) children: Vec<ChildLink>,
    head: PlayHead,
    bone_targets: Vec<BoneTarget>,
    slot_targets: Vec<SlotTarget>,
    z_order_frame: Option<usize>,
    /// Pose slot for each slot index used by z-order frames; `None` when both orders match.
    z_order_slots: Option<Vec<Option<usize>>>,
    timelines_dirty: bool,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            action_enabled: false,
            additive: false,
            display_control: false,
            reset_to_pose: false,
            play_times: 1,
            layer: 0,
            time_scale: 1.0,
            fade_total_time: 0.0,
            auto_fade_out_time: -1.0,
            name: String::new(),
            group: String::new(),
            weight: 1.0,
            fade_state: -1,
            sub_fade_state: -1,
            playhead_state: 0,
            position: 0.0,
            duration: 0.0,
            time: 0.0,
            fade_time: 0.0,
            fade_progress: 0.0,
            weight_result: 0.0,
            bone_mask: Vec::new(),
            data: None,
            parent: None,
            children: Vec::new(),
            head: PlayHead::default(),
            bone_targets: Vec::new(),
            slot_targets: Vec::new(),
            z_order_frame: None,
            z_order_slots: None,
            timelines_dirty: true,
        }
    }
}

impl Poolable for AnimationState {
    fn clear(&mut self) {
        let mut name = std::mem::take(&mut self.name);
        let mut group = std::mem::take(&mut self.group);
        let mut bone_mask = std::mem::take(&mut self.bone_mask);
        let mut children = std::mem::take(&mut self.children);
        let mut bone_targets = std::mem::take(&mut self.bone_targets);
        let mut slot_targets = std::mem::take(&mut self.slot_targets);
        name.clear();
        group.clear();
        bone_mask.clear();
        children.clear();
        bone_targets.clear();
        slot_targets.clear();
        *self = Self {
            name,
            group,
            bone_mask,
            children,
            bone_targets,
            slot_targets,
            ..Self::default()
        };
    }
}

impl AnimationState {
    /// Configure a freshly acquired state. `config` is already resolved by the player.
    pub(crate) fn init(&mut self, config: &AnimationConfig, data: Rc<AnimationData>) {
        self.action_enabled = config.action_enabled;
        self.additive = config.additive;
        self.display_control = config.display_control;
        self.reset_to_pose = config.reset_to_pose;
        self.play_times = config.play_times.max(0) as u32;
        self.layer = config.layer;
        self.time_scale = config.time_scale;
        self.fade_total_time = config.fade_in_time;
        self.auto_fade_out_time = config.auto_fade_out_time;
        self.name.clear();
        self.name.push_str(if config.name.is_empty() {
            &config.animation
        } else {
            &config.name
        });
        self.group.clear();
        self.group.push_str(&config.group);
        self.weight = config.weight;
        self.playhead_state = if config.pause_fade_in { 2 } else { 3 };

        if config.duration < 0.0 {
            self.position = 0.0;
            self.duration = data.duration;
            self.time = if config.position == 0.0 {
                0.0
            } else if self.time_scale >= 0.0 {
                config.position
            } else {
                config.position - self.duration
            };
        } else {
            self.position = config.position;
            self.duration = config.duration;
            self.time = 0.0;
        }
        if self.time_scale < 0.0 && self.time == 0.0 {
            self.time = -TIME_EPSILON;
        }
        if self.fade_total_time <= 0.0 {
            self.fade_progress = 0.999999;
        }

        self.bone_mask.clear();
        self.bone_mask.extend(config.bone_mask.iter().cloned());

        self.head = PlayHead::default();
        self.head.current_time = self.position
            + if self.time < 0.0 {
                self.duration + self.time
            } else {
                self.time
            };
        self.data = Some(data);
        self.timelines_dirty = true;
    }

    /// Attach `child` as a blend node driven by this state's animation timelines named `child_name`.
    pub(crate) fn link_child(&mut self, child: StateId, child_name: &str) {
        let Some(data) = self.data.as_ref() else {
            return;
        };
        let find = |kind: AnimationTimelineKind| {
            data.animation_timelines
                .iter()
                .position(|t| t.kind == kind && t.name == child_name)
        };
        let link = ChildLink {
            state: child,
            progress: find(AnimationTimelineKind::Progress),
            weight: find(AnimationTimelineKind::Weight),
        };
        self.children.push(link);
    }

    fn bind_timelines(&mut self, data: &AnimationData, pose: &Pose, blends: &mut BlendTable) {
        self.timelines_dirty = false;
        self.bone_targets.clear();
        self.slot_targets.clear();
        self.z_order_slots = None;
        if !data.z_order.is_empty() {
            let same_order = data.slots.len() == pose.slots.len()
                && data.slots.iter().zip(&pose.slots).all(|(name, s)| *name == s.name);
            if !same_order {
                let slots = data
                    .slots
                    .iter()
                    .map(|name| pose.slots.iter().position(|s| s.name == *name))
                    .collect();
                self.z_order_slots = Some(slots);
            }
        }
        let pose_targets = self.reset_to_pose && self.fade_state < 0;

        for (index, bone) in pose.bones.iter().enumerate() {
            if !self.contains_bone_mask(&bone.name) {
                continue;
            }
            let timeline = data
                .bone_timelines
                .iter()
                .position(|t| t.bone == bone.name && !t.is_empty());
            if timeline.is_none() && !pose_targets {
                continue;
            }
            let blend = blends.slot_for(BlendKind::BoneTransform, &bone.name, index);
            self.bone_targets.push(BoneTarget {
                timeline,
                bone: index,
                blend,
            });
        }

        for (index, slot) in pose.slots.iter().enumerate() {
            let masked = pose
                .bones
                .get(slot.parent)
                .is_some_and(|b| self.contains_bone_mask(&b.name));
            if !masked {
                continue;
            }
            match data.slot_timelines.iter().position(|t| t.slot == slot.name) {
                Some(ti) => {
                    let timeline = &data.slot_timelines[ti];
                    let color_blend = (!timeline.color.is_empty())
                        .then(|| blends.slot_for(BlendKind::SlotColor, &slot.name, index));
                    let z_blend = (!timeline.z_index.is_empty())
                        .then(|| blends.slot_for(BlendKind::SlotZIndex, &slot.name, index));
                    self.slot_targets.push(SlotTarget {
                        timeline: Some(ti),
                        slot: index,
                        color_blend,
                        z_blend,
                        last_display_frame: None,
                    });
                }
                None if pose_targets => self.slot_targets.push(SlotTarget {
                    timeline: None,
                    slot: index,
                    color_blend: None,
                    z_blend: None,
                    last_display_frame: None,
                }),
                None => {}
            }
        }
    }

    pub(crate) fn advance(
        &mut self,
        id: StateId,
        passed: f32,
        cache_frame_rate: f32,
        ctx: &mut TickContext<'_>,
    ) {
        let Some(data) = self.data.clone() else {
            return;
        };

        if self.fade_state != 0 || self.sub_fade_state != 0 {
            self.advance_fade(id, passed, ctx);
        }

        if self.playhead_state == 3 {
            self.time += passed * self.time_scale;
        }

        if self.timelines_dirty {
            self.bind_timelines(&data, ctx.pose, ctx.blends);
        }

        let cache_enabled = self.fade_state == 0 && cache_frame_rate > 0.0;
        self.weight_result = self.weight * self.fade_progress * ctx.parent_weight;

        if self.head.play_state <= 0 {
            self.update_play_head(id, &data, ctx);
        }

        if self.weight_result == 0.0 {
            self.finish_fade_in();
            return;
        }

        if cache_enabled {
            let interval = cache_frame_rate * 2.0;
            self.head.current_time = (self.head.current_time * interval).floor() / interval;
        }

        let time = self.head.current_time;
        if self.display_control && !data.z_order.is_empty() {
            if let Some(frame) = find_frame(&data.z_order, time) {
                if self.z_order_frame != Some(frame) {
                    self.z_order_frame = Some(frame);
                    let order = data.z_order[frame].value.as_deref();
                    match (self.z_order_slots.as_deref(), order) {
                        (Some(slots), Some(order)) => {
                            let order: Vec<usize> = order
                                .iter()
                                .filter_map(|&i| slots.get(i).copied().flatten())
                                .collect();
                            ctx.pose.set_z_order(Some(&order));
                        }
                        _ => ctx.pose.set_z_order(order),
                    }
                }
            }
        }

        let mut update_timelines = true;
        let mut update_bones = true;
        if cache_enabled {
            let frame = (time * cache_frame_rate).floor() as i32;
            if ctx.pose.cache_frame_index == frame {
                update_timelines = false;
                update_bones = false;
            } else {
                ctx.pose.cache_frame_index = frame;
                let frame = frame.max(0) as usize;
                if data.cache.is_sampled(frame) {
                    update_bones = false;
                } else {
                    data.cache.mark_sampled(frame);
                }
            }
        }

        if update_timelines {
            let wrap = self.play_times == 0 || self.head.current_play_times + 1 < self.play_times;
            if update_bones {
                self.blend_bones(&data, time, wrap, ctx);
            }
            self.blend_slots(&data, time, wrap, ctx);
            for link in &self.children {
                let value = |i: Option<usize>| {
                    i.and_then(|i| sample(&data.animation_timelines[i].frames, time, wrap))
                };
                let update = ChildUpdate {
                    state: link.state,
                    progress: value(link.progress),
                    weight: value(link.weight),
                };
                if update.progress.is_some() || update.weight.is_some() {
                    ctx.child_updates.push(update);
                }
            }
        }

        self.finish_fade_in();
    }

    fn finish_fade_in(&mut self) {
        if self.fade_state != 0 {
            return;
        }
        if self.sub_fade_state > 0 {
            self.sub_fade_state = 0;
            self.bone_targets.retain(|t| t.timeline.is_some());
            self.slot_targets.retain(|t| t.timeline.is_some());
        }
        if self.head.play_state > 0 && self.auto_fade_out_time >= 0.0 {
            self.fade_out(self.auto_fade_out_time, true);
        }
    }

    fn blend_bones(&self, data: &AnimationData, time: f32, wrap: bool, ctx: &mut TickContext<'_>) {
        for target in &self.bone_targets {
            let mut delta = Transform::IDENTITY;
            if let Some(timeline) = target.timeline.map(|i| &data.bone_timelines[i]) {
                if let Some([x, y]) = sample(&timeline.translate, time, wrap) {
                    delta.x = x;
                    delta.y = y;
                }
                if let Some([rotation, skew]) = sample(&timeline.rotate, time, wrap) {
                    delta.rotation = rotation;
                    delta.skew = skew;
                }
                if let Some([sx, sy]) = sample(&timeline.scale, time, wrap) {
                    delta.scale_x = sx;
                    delta.scale_y = sy;
                }
            }
            let Some(weight) = self.claim_weight(ctx.blends, target.blend) else {
                continue;
            };
            let bone = &mut ctx.pose.bones[target.bone];
            if ctx.blends.state_mut(target.blend).dirty == 1 {
                bone.reset_animation_pose();
            }
            bone.blend_pose(&delta, weight);
        }
    }

    fn blend_slots(&mut self, data: &AnimationData, time: f32, wrap: bool, ctx: &mut TickContext<'_>) {
        let mut targets = std::mem::take(&mut self.slot_targets);
        for target in &mut targets {
            let controlled = self.display_control
                && ctx.pose.slots[target.slot].accepts_controller(&self.name, &self.group);
            let Some(timeline) = target.timeline.map(|i| &data.slot_timelines[i]) else {
                if controlled {
                    ctx.pose.reset_slot(target.slot);
                }
                continue;
            };

            if controlled {
                if let Some(frame) = find_frame(&timeline.display, time) {
                    if target.last_display_frame != Some(frame) {
                        target.last_display_frame = Some(frame);
                        ctx.pose.slots[target.slot].set_display_index(timeline.display[frame].value);
                    }
                }
            }

            if let Some(blend) = target.color_blend {
                if let Some(color) = sample(&timeline.color, time, wrap) {
                    if let Some(weight) = self.claim_weight(ctx.blends, blend) {
                        let slot = &mut ctx.pose.slots[target.slot];
                        let base = if ctx.blends.state_mut(blend).dirty == 1 {
                            ColorTransform::IDENTITY
                        } else {
                            *slot.color()
                        };
                        slot.set_color(blend_color(&base, &color, weight));
                    }
                }
            }

            if let Some(blend) = target.z_blend {
                if let Some(z) = sample(&timeline.z_index, time, wrap) {
                    if self.claim_weight(ctx.blends, blend).is_some()
                        && ctx.blends.state_mut(blend).dirty == 1
                    {
                        ctx.pose.set_slot_z_index(target.slot, z.round() as i32);
                    }
                }
            }
        }
        self.slot_targets = targets;
    }

    /// Weight this state may contribute to blend state `index`, or `None` when
    /// higher layers already used it up. Additive states never consume weight.
    fn claim_weight(&self, blends: &mut BlendTable, index: usize) -> Option<f32> {
        let blend = blends.state_mut(index);
        if self.additive {
            blend.dirty += 1;
            return Some(self.weight_result);
        }
        blend
            .update(self.weight_result, self.layer)
            .then_some(blend.blend_weight)
    }

    fn advance_fade(&mut self, id: StateId, passed: f32, ctx: &mut TickContext<'_>) {
        let fading_out = self.fade_state > 0;
        let events_on = self.parent.is_none() && self.action_enabled;

        if self.sub_fade_state < 0 {
            self.sub_fade_state = 0;
            if events_on {
                let kind = if fading_out {
                    EventKind::FadeOut
                } else {
                    EventKind::FadeIn
                };
                self.buffer_event(id, kind, ctx);
            }
        }

        self.fade_time += passed.abs();
        if self.fade_time >= self.fade_total_time {
            self.sub_fade_state = 1;
            self.fade_progress = if fading_out { 0.0 } else { 1.0 };
        } else if self.fade_time > 0.0 {
            let ratio = self.fade_time / self.fade_total_time;
            self.fade_progress = if fading_out { 1.0 - ratio } else { ratio };
        } else {
            self.fade_progress = if fading_out { 1.0 } else { 0.0 };
        }

        if self.sub_fade_state > 0 {
            if !fading_out {
                self.playhead_state |= 1;
                self.fade_state = 0;
            }
            if events_on {
                let kind = if fading_out {
                    EventKind::FadeOutComplete
                } else {
                    EventKind::FadeInComplete
                };
                self.buffer_event(id, kind, ctx);
            }
        }
    }

    /// Move the play head to local `passed` time. Returns whether anything changed.
    fn set_head_time(&mut self, passed: f32) -> bool {
        let prev = self.head;
        let duration = self.duration;
        let total = self.play_times as f32 * duration;

        if self.play_times > 0 && (passed >= total || passed <= -total) {
            if self.head.play_state <= 0 && self.playhead_state == 3 {
                self.head.play_state = 1;
            }
            self.head.current_play_times = self.play_times;
            self.head.current_time = if passed < 0.0 {
                0.0
            } else if self.head.play_state == 1 {
                duration + TIME_EPSILON
            } else {
                duration
            };
        } else {
            if self.head.play_state != 0 && self.playhead_state == 3 {
                self.head.play_state = 0;
            }
            if duration > 0.0 {
                let abs = passed.abs();
                self.head.current_play_times = (abs / duration) as u32;
                self.head.current_time = if passed < 0.0 {
                    duration - abs % duration
                } else {
                    passed % duration
                };
            } else {
                self.head.current_play_times = 0;
                self.head.current_time = 0.0;
            }
        }
        self.head.current_time += self.position;
        self.head != prev
    }

    fn update_play_head(&mut self, id: StateId, data: &AnimationData, ctx: &mut TickContext<'_>) {
        let prev_state = self.head.play_state;
        let mut prev_play_times = self.head.current_play_times;
        let prev_time = self.head.current_time;
        if !self.set_head_time(self.time) {
            return;
        }

        let events_on = self.parent.is_none() && self.action_enabled;
        let mut started = false;
        if prev_state < 0 {
            if self.head.play_state == prev_state {
                return;
            }
            started = true;
            prev_play_times = self.head.current_play_times;
            if self.display_control && self.reset_to_pose {
                ctx.pose.set_z_order(None);
            }
            if events_on {
                self.buffer_event(id, EventKind::Start, ctx);
            }
        }

        let looped = self.head.current_play_times != prev_play_times;
        let mut loop_pending = events_on && looped;
        let complete_pending = events_on && looped && self.head.play_state > 0;

        if self.action_enabled && !data.action_frames.is_empty() {
            self.cross_action_frames(id, &data.action_frames, prev_time, started, looped, &mut loop_pending, ctx);
        }
        if loop_pending {
            self.buffer_event(id, EventKind::LoopComplete, ctx);
        }
        if complete_pending {
            self.buffer_event(id, EventKind::Complete, ctx);
        }
    }

    /// Fire action frames between the previous and current play head. Only the
    /// last cycle is replayed when a tick spans several loops.
    #[allow(clippy::too_many_arguments)]
    fn cross_action_frames(
        &self,
        id: StateId,
        frames: &[ActionFrame],
        prev_time: f32,
        started: bool,
        looped: bool,
        loop_pending: &mut bool,
        ctx: &mut TickContext<'_>,
    ) {
        let current = self.head.current_time;
        let start = self.position;
        let end = self.position + self.duration;
        let completed = self.head.play_state > 0;
        let in_window = |p: f32| start <= p && p <= end;

        if self.time_scale >= 0.0 {
            if started || !looped {
                for frame in frames.iter().filter(|f| in_window(f.position)) {
                    let p = frame.position;
                    if (p > prev_time || (started && p >= prev_time)) && p <= current {
                        self.fire_frame(id, frame, ctx);
                    }
                }
                return;
            }
            for frame in frames.iter().filter(|f| in_window(f.position)) {
                if frame.position > prev_time {
                    self.fire_frame(id, frame, ctx);
                }
            }
            if *loop_pending {
                *loop_pending = false;
                self.buffer_event(id, EventKind::LoopComplete, ctx);
            }
            if !completed {
                for frame in frames.iter().filter(|f| in_window(f.position)) {
                    if frame.position <= current {
                        self.fire_frame(id, frame, ctx);
                    }
                }
            }
        } else {
            if started || !looped {
                for frame in frames.iter().rev().filter(|f| in_window(f.position)) {
                    let p = frame.position;
                    if (p < prev_time || (started && p <= prev_time)) && p >= current {
                        self.fire_frame(id, frame, ctx);
                    }
                }
                return;
            }
            for frame in frames.iter().rev().filter(|f| in_window(f.position)) {
                if frame.position < prev_time {
                    self.fire_frame(id, frame, ctx);
                }
            }
            if *loop_pending {
                *loop_pending = false;
                self.buffer_event(id, EventKind::LoopComplete, ctx);
            }
            if !completed {
                for frame in frames.iter().rev().filter(|f| in_window(f.position)) {
                    if frame.position >= current {
                        self.fire_frame(id, frame, ctx);
                    }
                }
            }
        }
    }

    fn fire_frame(&self, id: StateId, frame: &ActionFrame, ctx: &mut TickContext<'_>) {
        for action in &frame.actions {
            let kind = match action.kind {
                ActionKind::Play => {
                    ctx.events.actions.push(action.clone());
                    continue;
                }
                ActionKind::Frame => EventKind::Frame,
                ActionKind::Sound => EventKind::Sound,
            };
            if !ctx.events.wants(kind) {
                continue;
            }
            let mut event = ctx.events.borrow_event(kind);
            event.time = frame.position;
            event.name.push_str(&action.name);
            event.armature.push_str(ctx.armature_name);
            event.animation.push_str(&self.name);
            event.state = Some(id);
            event.bone = action.bone.clone();
            event.slot = action.slot.clone();
            event.data = action.data.clone();
            event.action = Some(action.clone());
            ctx.events.push(event);
        }
    }

    fn buffer_event(&self, id: StateId, kind: EventKind, ctx: &mut TickContext<'_>) {
        if !ctx.events.wants(kind) {
            return;
        }
        let mut event = ctx.events.borrow_event(kind);
        event.time = self.head.current_time;
        event.armature.push_str(ctx.armature_name);
        event.animation.push_str(&self.name);
        event.state = Some(id);
        ctx.events.push(event);
    }

    /// Start fading out over `fade_out_time` seconds, optionally freezing the play head.
    pub fn fade_out(&mut self, fade_out_time: f32, pause_playhead: bool) {
        let fade_out_time = fade_out_time.max(0.0);
        if pause_playhead {
            self.playhead_state &= 2;
        }
        if self.fade_state > 0 {
            if fade_out_time > self.fade_total_time - self.fade_time {
                return;
            }
        } else {
            self.fade_state = 1;
            self.sub_fade_state = -1;
            if fade_out_time <= 0.0 || self.fade_progress <= 0.0 {
                self.fade_progress = TIME_EPSILON;
            }
        }
        self.display_control = false;
        self.fade_total_time = if self.fade_progress > TIME_EPSILON {
            fade_out_time / self.fade_progress
        } else {
            0.0
        };
        self.fade_time = self.fade_total_time * (1.0 - self.fade_progress);
    }

    /// Mark as finished immediately; the player drops it on the next tick.
    pub(crate) fn abort(&mut self) {
        self.fade_state = 1;
        self.sub_fade_state = 1;
        self.parent = None;
    }

    pub fn play(&mut self) {
        self.playhead_state = 3;
    }

    pub fn stop(&mut self) {
        self.playhead_state &= 1;
    }

    pub fn is_playing(&self) -> bool {
        (self.playhead_state & 2) != 0 && self.head.play_state <= 0
    }

    pub fn is_completed(&self) -> bool {
        self.head.play_state > 0
    }

    pub fn is_fade_in(&self) -> bool {
        self.fade_state < 0
    }

    pub fn is_fade_out(&self) -> bool {
        self.fade_state > 0
    }

    pub fn is_fade_complete(&self) -> bool {
        self.fade_state == 0
    }

    /// Current fade envelope in [0, 1].
    pub fn fade_progress(&self) -> f32 {
        self.fade_progress
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight;
    }

    /// Weight applied this tick after fading and parent weights.
    pub fn weight_result(&self) -> f32 {
        self.weight_result
    }

    /// Play head time in seconds, including the start position.
    pub fn current_time(&self) -> f32 {
        self.head.current_time
    }

    /// Seek. Values outside `[0, duration]` wrap into the current loop.
    pub fn set_current_time(&mut self, value: f32) {
        let finished_loops = self
            .head
            .current_play_times
            .saturating_sub(u32::from(self.head.play_state > 0));
        let duration = self.duration;
        let mut value = value;
        if duration > 0.0 && (value < 0.0 || duration < value) {
            value = value % duration + finished_loops as f32 * duration;
            if value < 0.0 {
                value += duration;
            }
        } else if self.play_times > 0
            && finished_loops + 1 == self.play_times
            && value == duration
            && self.parent.is_none()
        {
            value = duration - TIME_EPSILON;
        }
        if self.time == value {
            return;
        }
        self.time = value;
        self.set_head_time(value);
        self.z_order_frame = None;
        for target in &mut self.slot_targets {
            target.last_display_frame = None;
        }
    }

    pub fn total_time(&self) -> f32 {
        self.duration
    }

    pub fn current_play_times(&self) -> u32 {
        self.head.current_play_times
    }

    pub fn animation_data(&self) -> Option<&Rc<AnimationData>> {
        self.data.as_ref()
    }

    pub fn animation_name(&self) -> &str {
        self.data.as_ref().map_or("", |d| d.name.as_str())
    }

    pub fn parent(&self) -> Option<StateId> {
        self.parent
    }

    pub fn contains_bone_mask(&self, name: &str) -> bool {
        self.bone_mask.is_empty() || self.bone_mask.iter().any(|n| n == name)
    }

    pub fn bone_mask(&self) -> &[String] {
        &self.bone_mask
    }

    pub fn add_bone_mask(&mut self, armature: &ArmatureData, name: &str, recursive: bool) {
        add_to_mask(&mut self.bone_mask, armature, name, recursive);
        self.timelines_dirty = true;
    }

    pub fn remove_bone_mask(&mut self, armature: &ArmatureData, name: &str, recursive: bool) {
        remove_from_mask(&mut self.bone_mask, armature, name, recursive);
        self.timelines_dirty = true;
    }

    pub fn remove_all_bone_mask(&mut self) {
        self.bone_mask.clear();
        self.timelines_dirty = true;
    }
}

/// `base` plus the weighted departure of `color` from identity.
fn blend_color(base: &ColorTransform, color: &ColorTransform, weight: f32) -> ColorTransform {
    let mul = |b: f32, c: f32| b + (c - 1.0) * weight;
    let off = |b: i32, c: i32| b + (c as f32 * weight).round() as i32;
    ColorTransform {
        alpha_multiplier: mul(base.alpha_multiplier, color.alpha_multiplier),
        red_multiplier: mul(base.red_multiplier, color.red_multiplier),
        green_multiplier: mul(base.green_multiplier, color.green_multiplier),
        blue_multiplier: mul(base.blue_multiplier, color.blue_multiplier),
        alpha_offset: off(base.alpha_offset, color.alpha_offset),
        red_offset: off(base.red_offset, color.red_offset),
        green_offset: off(base.green_offset, color.green_offset),
        blue_offset: off(base.blue_offset, color.blue_offset),
    }
}
