//! Per-armature animation driver. Owns the state list, resolves play requests
//! and advances every state once per tick.
//!
//! The state list is ordered by layer, highest first. Blend-node children sit
//! after their parent so the parent's weight and progress are known when the
//! child is sampled.

use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use hashbrown::HashMap;

use super::blend::{BlendKind, BlendState, BlendTable};
use super::config::{AnimationConfig, AnimationFadeOutMode};
use super::state::{AnimationState, ChildUpdate};
use super::StateId;
use crate::armature::Pose;
use crate::event::EventBuffer;
use crate::model::{AnimationData, ArmatureData};
use crate::pool::Pool;

const TIME_EPSILON: f32 = 0.000001;

/// Everything a state touches while it is sampled.
pub(crate) struct TickContext<'a> {
    pub pose: &'a mut Pose,
    pub blends: &'a mut BlendTable,
    pub events: &'a mut EventBuffer,
    pub child_updates: &'a mut Vec<ChildUpdate>,
    pub armature_name: &'a str,
    /// Weight result of the parent state, 1 for top-level states.
    pub parent_weight: f32,
}

#[derive(Debug)]
pub struct Animation {
    /// Multiplies the passed time of every tick.
    pub time_scale: f32,
    inherit_time_scale: f32,
    animation_dirty: bool,
    bound: bool,
    animation_names: Vec<String>,
    animations: HashMap<String, Rc<AnimationData>>,
    default_animation: Option<String>,
    pool: Pool<AnimationState>,
    states: Vec<StateId>,
    blends: BlendTable,
    last_state: Option<StateId>,
    child_updates: Vec<ChildUpdate>,
    /// Scratch request reused by the play helpers.
    config: AnimationConfig,
}

impl Default for Animation {
    fn default() -> Self {
        Self::new(8)
    }
}

impl Animation {
    pub fn new(state_capacity: usize) -> Self {
        Self {
            time_scale: 1.0,
            inherit_time_scale: 1.0,
            animation_dirty: false,
            bound: false,
            animation_names: Vec::new(),
            animations: HashMap::new(),
            default_animation: None,
            pool: Pool::with_capacity(state_capacity),
            states: Vec::with_capacity(state_capacity),
            blends: BlendTable::default(),
            last_state: None,
            child_updates: Vec::new(),
            config: AnimationConfig::default(),
        }
    }

    /// Bind the animations of `data`. Only the first call takes effect.
    pub fn init(&mut self, data: &ArmatureData) {
        if self.bound {
            return;
        }
        self.bound = true;
        self.set_animations(
            data.animation_names()
                .iter()
                .filter_map(|name| data.get_animation(name).cloned()),
        );
        self.default_animation = data.default_animation().map(|a| a.name.clone());
    }

    /// Drop every state and the bound animations so `init` can bind again.
    pub(crate) fn unbind(&mut self) {
        self.reset();
        self.blends.clear();
        self.animation_names.clear();
        self.animations.clear();
        self.default_animation = None;
        self.time_scale = 1.0;
        self.inherit_time_scale = 1.0;
        self.bound = false;
    }

    /// Force the cache-frame indices to be rebound on the next single-state tick.
    pub(crate) fn mark_dirty(&mut self) {
        self.animation_dirty = true;
    }

    pub(crate) fn advance_time(
        &mut self,
        passed: f32,
        parent_scale: Option<f32>,
        pose: &mut Pose,
        events: &mut EventBuffer,
        armature_name: &str,
    ) {
        let mut passed = passed.abs();
        self.inherit_time_scale = parent_scale.map_or(self.time_scale, |p| p * self.time_scale);
        if self.inherit_time_scale != 1.0 {
            passed *= self.inherit_time_scale;
        }
        self.blends.reset_all();
        self.child_updates.clear();

        if self.states.is_empty() {
            pose.cache_frame_index = -1;
            return;
        }

        let Self {
            pool,
            states,
            blends,
            child_updates,
            animation_dirty,
            last_state,
            ..
        } = self;
        let mut ctx = TickContext {
            pose,
            blends,
            events,
            child_updates,
            armature_name,
            parent_weight: 1.0,
        };

        if states.len() == 1 {
            let id = states[0];
            let Some(state) = pool.get(id) else {
                states.clear();
                return;
            };
            let data = state.animation_data().cloned();
            let fade_complete = state.is_fade_complete();
            let cache_rate = data.as_ref().map_or(0.0, |d| d.cache.frame_rate());
            if *animation_dirty && cache_rate > 0.0 {
                *animation_dirty = false;
                if let Some(data) = data.as_ref() {
                    ctx.pose.bind_cache(data);
                }
            }
            if !fade_complete || cache_rate <= 0.0 {
                ctx.pose.cache_frame_index = -1;
            }
            if advance_state(pool, id, passed, cache_rate, &mut ctx) {
                release_state(pool, id);
                states.clear();
                *last_state = None;
            }
            return;
        }

        let mut kept = 0;
        for i in 0..states.len() {
            let id = states[i];
            if advance_state(pool, id, passed, 0.0, &mut ctx) {
                release_state(pool, id);
                *animation_dirty = true;
                if *last_state == Some(id) {
                    *last_state = None;
                }
            } else {
                states[kept] = id;
                kept += 1;
            }
        }
        states.truncate(kept);
        if last_state.is_none() {
            *last_state = states.last().copied();
        }
        ctx.pose.cache_frame_index = -1;
    }

    /// Start a state described by `config`. Unknown animations are logged and ignored.
    pub(crate) fn play_config(&mut self, pose: &mut Pose, config: &AnimationConfig) -> Option<StateId> {
        let Some(data) = self.animations.get(&config.animation).cloned() else {
            log::warn!(
                "Non-existent animation. armature: {} animation: {}",
                pose.data.name,
                config.animation
            );
            return None;
        };

        if config.fade_out_mode == AnimationFadeOutMode::Single {
            let existing = self.states.iter().copied().find(|&id| {
                self.pool.get(id).is_some_and(|s| {
                    s.fade_state < 1
                        && s.layer == config.layer
                        && s.animation_data().is_some_and(|d| Rc::ptr_eq(d, &data))
                })
            });
            if existing.is_some() {
                return existing;
            }
        }

        let mut config = config.clone();
        self.resolve_config(&mut config, &data);
        self.fade_out_existing(&config);

        let id = self.pool.acquire();
        if let Some(state) = self.pool.get_mut(id) {
            state.init(&config, data.clone());
        }
        self.animation_dirty = true;
        let insert_at = self
            .states
            .iter()
            .position(|&s| self.pool.get(s).is_some_and(|s| config.layer > s.layer))
            .unwrap_or(self.states.len());
        self.states.insert(insert_at, id);

        for slot in &mut pose.slots {
            let Some(child) = slot.child_armature_mut() else {
                continue;
            };
            if child.inherit_animation
                && child.animation().has_animation(&config.animation)
                && child.animation().get_state(&config.animation, -1).is_none()
            {
                child.animation_mut().fade_in(
                    &config.animation,
                    -1.0,
                    -1,
                    0,
                    None,
                    AnimationFadeOutMode::SameLayerAndGroup,
                );
            }
        }

        for name in data.child_animation_names() {
            let Some(child) = self.fade_in(
                pose,
                name,
                0.0,
                1,
                config.layer,
                None,
                AnimationFadeOutMode::Single,
            ) else {
                continue;
            };
            if child == id {
                continue;
            }
            if let Some(state) = self.pool.get_mut(child) {
                state.action_enabled = false;
                state.reset_to_pose = false;
                state.stop();
                state.parent = Some(id);
            }
            if let Some(state) = self.pool.get_mut(id) {
                state.link_child(child, name);
            }
            let index = self.states.iter().position(|&s| s == id);
            let child_index = self.states.iter().position(|&s| s == child);
            if let (Some(index), Some(child_index)) = (index, child_index) {
                if child_index < index {
                    self.states.remove(index);
                    self.states.insert(child_index, id);
                }
            }
        }

        self.last_state = Some(id);
        Some(id)
    }

    fn resolve_config(&self, config: &mut AnimationConfig, data: &AnimationData) {
        if self.states.is_empty() {
            config.fade_in_time = 0.0;
        } else if config.fade_in_time < 0.0 {
            config.fade_in_time = data.fade_in_time;
        }
        if config.fade_out_time < 0.0 {
            config.fade_out_time = config.fade_in_time;
        }
        if config.time_scale <= -100.0 {
            config.time_scale = 1.0 / data.scale;
        }

        if data.frame_count > 0 {
            let duration = data.duration;
            if config.position < 0.0 {
                config.position = duration + config.position % duration;
            }
            if config.position == duration {
                config.position -= TIME_EPSILON;
            } else if config.position > duration {
                config.position %= duration;
            }
            if config.duration > 0.0 && config.position + config.duration > duration {
                config.duration = duration - config.position;
            }
            if config.play_times < 0 {
                config.play_times = data.play_times as i32;
            }
        } else {
            config.play_times = 1;
            config.position = 0.0;
            if config.duration > 0.0 {
                config.duration = 0.0;
            }
        }
        if config.duration == 0.0 {
            config.duration = -1.0;
        }
    }

    fn fade_out_existing(&mut self, config: &AnimationConfig) {
        for &id in &self.states {
            let Some(state) = self.pool.get_mut(id) else {
                continue;
            };
            if state.parent.is_some() {
                continue;
            }
            let hit = match config.fade_out_mode {
                AnimationFadeOutMode::SameLayer => state.layer == config.layer,
                AnimationFadeOutMode::SameGroup => state.group == config.group,
                AnimationFadeOutMode::SameLayerAndGroup => {
                    state.layer == config.layer && state.group == config.group
                }
                AnimationFadeOutMode::All => true,
                AnimationFadeOutMode::None | AnimationFadeOutMode::Single => false,
            };
            if hit {
                state.fade_out(config.fade_out_time, config.pause_fade_out);
            }
        }
    }

    /// Run `fill` on the cleared scratch request, then play it.
    fn play_scratch(
        &mut self,
        pose: &mut Pose,
        fill: impl FnOnce(&mut AnimationConfig),
    ) -> Option<StateId> {
        let mut config = std::mem::take(&mut self.config);
        config.clear();
        fill(&mut config);
        let state = self.play_config(pose, &config);
        self.config = config;
        state
    }

    pub(crate) fn play(&mut self, pose: &mut Pose, name: Option<&str>, play_times: i32) -> Option<StateId> {
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            return self.play_scratch(pose, |c| {
                c.reset_to_pose = true;
                c.play_times = play_times;
                c.fade_in_time = 0.0;
                c.animation.push_str(name);
            });
        }

        let last = self.last_state.filter(|&id| self.pool.contains(id));
        let replay = match last.and_then(|id| self.pool.get_mut(id)) {
            None => self.default_animation.clone(),
            Some(state) if !state.is_completed() => {
                if !state.is_playing() {
                    state.play();
                }
                return last;
            }
            Some(state) => Some(state.animation_name().to_string()),
        };
        let name = replay?;
        self.play_scratch(pose, |c| {
            c.reset_to_pose = true;
            c.play_times = play_times;
            c.fade_in_time = 0.0;
            c.animation = name;
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn fade_in(
        &mut self,
        pose: &mut Pose,
        name: &str,
        fade_in_time: f32,
        play_times: i32,
        layer: i32,
        group: Option<&str>,
        fade_out_mode: AnimationFadeOutMode,
    ) -> Option<StateId> {
        self.play_scratch(pose, |c| {
            c.fade_out_mode = fade_out_mode;
            c.play_times = play_times;
            c.layer = layer;
            c.fade_in_time = fade_in_time;
            c.animation.push_str(name);
            if let Some(group) = group {
                c.group.push_str(group);
            }
        })
    }

    pub(crate) fn goto_and_play_by_time(
        &mut self,
        pose: &mut Pose,
        name: &str,
        time: f32,
        play_times: i32,
    ) -> Option<StateId> {
        self.play_scratch(pose, |c| {
            c.reset_to_pose = true;
            c.play_times = play_times;
            c.position = time;
            c.fade_in_time = 0.0;
            c.animation.push_str(name);
        })
    }

    pub(crate) fn goto_and_play_by_frame(
        &mut self,
        pose: &mut Pose,
        name: &str,
        frame: u32,
        play_times: i32,
    ) -> Option<StateId> {
        let position = self.animations.get(name).map_or(0.0, |data| {
            if data.frame_count > 0 {
                data.duration * frame as f32 / data.frame_count as f32
            } else {
                0.0
            }
        });
        self.goto_and_play_by_time(pose, name, position, play_times)
    }

    pub(crate) fn goto_and_play_by_progress(
        &mut self,
        pose: &mut Pose,
        name: &str,
        progress: f32,
        play_times: i32,
    ) -> Option<StateId> {
        let position = self
            .animations
            .get(name)
            .map_or(0.0, |data| data.duration * progress.max(0.0));
        self.goto_and_play_by_time(pose, name, position, play_times)
    }

    fn stop_state(&mut self, state: Option<StateId>) -> Option<StateId> {
        let id = state?;
        if let Some(state) = self.pool.get_mut(id) {
            state.stop();
        }
        Some(id)
    }

    /// Stop one named state, or every state when `name` is `None`. Stopped states keep their pose.
    pub fn stop(&mut self, name: Option<&str>) {
        match name {
            Some(name) => {
                if let Some(id) = self.get_state(name, -1) {
                    self.stop_state(Some(id));
                }
            }
            None => {
                for &id in &self.states {
                    if let Some(state) = self.pool.get_mut(id) {
                        state.stop();
                    }
                }
            }
        }
    }

    /// Return every state to the pool.
    pub fn reset(&mut self) {
        self.pool.release_all();
        self.states.clear();
        self.child_updates.clear();
        self.animation_dirty = false;
        self.config.clear();
        self.last_state = None;
    }

    /// Most recently added state called `name`. A negative `layer` matches any layer.
    pub fn get_state(&self, name: &str, layer: i32) -> Option<StateId> {
        self.states.iter().rev().copied().find(|&id| {
            self.pool
                .get(id)
                .is_some_and(|s| s.name == name && (layer < 0 || s.layer == layer))
        })
    }

    pub fn state(&self, id: StateId) -> Option<&AnimationState> {
        self.pool.get(id)
    }

    pub fn state_mut(&mut self, id: StateId) -> Option<&mut AnimationState> {
        self.pool.get_mut(id)
    }

    /// Active states, highest layer first.
    pub fn state_ids(&self) -> &[StateId] {
        &self.states
    }

    pub fn states(&self) -> impl Iterator<Item = (StateId, &AnimationState)> + '_ {
        self.states
            .iter()
            .filter_map(move |&id| self.pool.get(id).map(|s| (id, s)))
    }

    pub fn has_animation(&self, name: &str) -> bool {
        self.animations.contains_key(name)
    }

    pub fn is_playing(&self) -> bool {
        self.states().any(|(_, s)| s.is_playing())
    }

    pub fn is_completed(&self) -> bool {
        !self.states.is_empty() && self.states().all(|(_, s)| s.is_completed())
    }

    pub fn last_state(&self) -> Option<StateId> {
        self.last_state.filter(|&id| self.pool.contains(id))
    }

    pub fn last_animation_name(&self) -> Option<&str> {
        self.last_state()
            .and_then(|id| self.pool.get(id))
            .map(AnimationState::animation_name)
    }

    pub fn animation_names(&self) -> &[String] {
        &self.animation_names
    }

    pub fn animations(&self) -> &HashMap<String, Rc<AnimationData>> {
        &self.animations
    }

    /// Replace the playable animations. Running states keep their data.
    pub fn set_animations(&mut self, animations: impl IntoIterator<Item = Rc<AnimationData>>) {
        self.animation_names.clear();
        self.animations.clear();
        for animation in animations {
            if self.animations.contains_key(&animation.name) {
                continue;
            }
            self.animation_names.push(animation.name.clone());
            self.animations.insert(animation.name.clone(), animation);
        }
        let default_gone = self
            .default_animation
            .as_ref()
            .map_or(true, |name| !self.animations.contains_key(name));
        if default_gone {
            self.default_animation = self.animation_names.first().cloned();
        }
    }

    pub fn get_blend_state(&self, kind: BlendKind, name: &str) -> Option<&BlendState> {
        self.blends.get(kind, name)
    }

    /// Time scale applied last tick, including every inheriting parent armature.
    pub fn inherit_time_scale(&self) -> f32 {
        self.inherit_time_scale
    }
}

/// Apply pending blend-node values to `id`, sample it, and report whether its fade-out finished.
fn advance_state(
    pool: &mut Pool<AnimationState>,
    id: StateId,
    passed: f32,
    cache_frame_rate: f32,
    ctx: &mut TickContext<'_>,
) -> bool {
    let parent_weight = pool
        .get(id)
        .and_then(|s| s.parent)
        .and_then(|p| pool.get(p))
        .map_or(1.0, AnimationState::weight_result);
    let Some(state) = pool.get_mut(id) else {
        return true;
    };

    ctx.child_updates.retain(|update| {
        if update.state != id {
            return true;
        }
        if let Some(weight) = update.weight {
            state.set_weight(weight);
        }
        if let Some(progress) = update.progress {
            let total = state.total_time();
            state.set_current_time(progress * total);
        }
        false
    });

    ctx.parent_weight = parent_weight;
    state.advance(id, passed, cache_frame_rate, ctx);
    state.fade_state > 0 && state.sub_fade_state > 0
}

/// Release `id` and detach its blend-node children so they drop on their next tick.
fn release_state(pool: &mut Pool<AnimationState>, id: StateId) {
    let children: Vec<StateId> = pool
        .get(id)
        .map(|s| s.children.iter().map(|c| c.state).collect())
        .unwrap_or_default();
    pool.release(id);
    for child in children {
        if let Some(state) = pool.get_mut(child) {
            if state.parent == Some(id) {
                state.abort();
            }
        }
    }
}

/// [`Animation`] paired with the pose it drives, as handed out by `Armature::animation_mut`.
pub struct AnimationMut<'a> {
    animation: &'a mut Animation,
    pose: &'a mut Pose,
}

impl<'a> AnimationMut<'a> {
    pub(crate) fn new(animation: &'a mut Animation, pose: &'a mut Pose) -> Self {
        Self { animation, pose }
    }

    pub fn play_config(&mut self, config: &AnimationConfig) -> Option<StateId> {
        self.animation.play_config(self.pose, config)
    }

    /// Play `name`, or with `None` resume the last state (or the default animation).
    /// Negative `play_times` uses the animation's own count.
    pub fn play(&mut self, name: Option<&str>, play_times: i32) -> Option<StateId> {
        self.animation.play(self.pose, name, play_times)
    }

    pub fn fade_in(
        &mut self,
        name: &str,
        fade_in_time: f32,
        play_times: i32,
        layer: i32,
        group: Option<&str>,
        fade_out_mode: AnimationFadeOutMode,
    ) -> Option<StateId> {
        self.animation
            .fade_in(self.pose, name, fade_in_time, play_times, layer, group, fade_out_mode)
    }

    pub fn goto_and_play_by_time(&mut self, name: &str, time: f32, play_times: i32) -> Option<StateId> {
        self.animation
            .goto_and_play_by_time(self.pose, name, time, play_times)
    }

    pub fn goto_and_play_by_frame(&mut self, name: &str, frame: u32, play_times: i32) -> Option<StateId> {
        self.animation
            .goto_and_play_by_frame(self.pose, name, frame, play_times)
    }

    pub fn goto_and_play_by_progress(
        &mut self,
        name: &str,
        progress: f32,
        play_times: i32,
    ) -> Option<StateId> {
        self.animation
            .goto_and_play_by_progress(self.pose, name, progress, play_times)
    }

    pub fn goto_and_stop_by_time(&mut self, name: &str, time: f32) -> Option<StateId> {
        let state = self.animation.goto_and_play_by_time(self.pose, name, time, 1);
        self.animation.stop_state(state)
    }

    pub fn goto_and_stop_by_frame(&mut self, name: &str, frame: u32) -> Option<StateId> {
        let state = self.animation.goto_and_play_by_frame(self.pose, name, frame, 1);
        self.animation.stop_state(state)
    }

    pub fn goto_and_stop_by_progress(&mut self, name: &str, progress: f32) -> Option<StateId> {
        let state = self
            .animation
            .goto_and_play_by_progress(self.pose, name, progress, 1);
        self.animation.stop_state(state)
    }

    /// Restrict state `id` to `bone` (and its descendants with `recursive`).
    pub fn add_bone_mask(&mut self, id: StateId, bone: &str, recursive: bool) {
        let data = self.pose.data.clone();
        if let Some(state) = self.animation.state_mut(id) {
            state.add_bone_mask(&data, bone, recursive);
        }
    }

    pub fn remove_bone_mask(&mut self, id: StateId, bone: &str, recursive: bool) {
        let data = self.pose.data.clone();
        if let Some(state) = self.animation.state_mut(id) {
            state.remove_bone_mask(&data, bone, recursive);
        }
    }
}

impl Deref for AnimationMut<'_> {
    type Target = Animation;

    fn deref(&self) -> &Animation {
        self.animation
    }
}

impl DerefMut for AnimationMut<'_> {
    fn deref_mut(&mut self) -> &mut Animation {
        self.animation
    }
}
