//! Live pose of one armature: bones, slots, constraints and draw order.
//!
//! Update order per tick:
//! 1. draw order, when z-order or a z-index changed
//! 2. bones, parents first, reading cache frames where allowed
//! 3. constraints, then the bones hanging below constrained bones
//! 4. slots

use std::rc::Rc;

use super::bone::Bone;
use super::constraint::Constraint;
use super::slot::Slot;
use crate::model::{AnimationData, ArmatureData};

#[derive(Debug)]
pub(crate) struct Pose {
    pub data: Rc<ArmatureData>,
    pub bones: Vec<Bone>,
    pub slots: Vec<Slot>,
    pub constraints: Vec<Constraint>,
    /// Draw position -> slot index.
    pub draw_order: Vec<usize>,
    /// Per slot: position in the base order, as set by z-order keyframes.
    z_order: Vec<usize>,
    /// Cache frame sampled this tick, -1 when cache frames are off.
    pub cache_frame_index: i32,
    cache_source: Option<Rc<AnimationData>>,
    draw_dirty: bool,
    z_order_overridden: bool,
    pub flip_x: bool,
    pub flip_y: bool,
    /// Bones written by a constraint.
    driven: Vec<usize>,
    /// Bones below a driven bone, recomputed after the constraints ran.
    refresh: Vec<usize>,
    /// Per bone: driven or below a driven bone. These never use cache frames.
    constrained: Vec<bool>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(
            Rc::new(ArmatureData::new("")),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )
    }
}

impl Pose {
    pub fn new(
        data: Rc<ArmatureData>,
        bones: Vec<Bone>,
        slots: Vec<Slot>,
        constraints: Vec<Constraint>,
    ) -> Self {
        let mut driven: Vec<usize> = constraints.iter().flat_map(Constraint::driven_bones).collect();
        driven.sort_unstable();
        driven.dedup();

        let mut constrained = vec![false; bones.len()];
        let mut refresh = Vec::new();
        for (i, bone) in bones.iter().enumerate() {
            let is_driven = driven.binary_search(&i).is_ok();
            let below = bone
                .parent
                .is_some_and(|p| constrained.get(p).copied().unwrap_or(false));
            constrained[i] = is_driven || below;
            if below && !is_driven {
                refresh.push(i);
            }
        }

        let slot_count = slots.len();
        Self {
            data,
            bones,
            slots,
            constraints,
            draw_order: (0..slot_count).collect(),
            z_order: (0..slot_count).collect(),
            cache_frame_index: -1,
            cache_source: None,
            draw_dirty: true,
            z_order_overridden: false,
            flip_x: false,
            flip_y: false,
            driven,
            refresh,
            constrained,
        }
    }

    /// Apply a z-order keyframe. `None` restores the data order.
    pub fn set_z_order(&mut self, order: Option<&[usize]>) {
        match order {
            Some(order) if order.len() == self.slots.len() => {
                for (position, &slot) in order.iter().enumerate() {
                    if let Some(z) = self.z_order.get_mut(slot) {
                        *z = position;
                    }
                }
                self.z_order_overridden = true;
            }
            Some(order) => {
                log::warn!(
                    "z-order of {} slots ignored by armature {} with {} slots",
                    order.len(),
                    self.data.name,
                    self.slots.len()
                );
                return;
            }
            None => {
                if !self.z_order_overridden {
                    return;
                }
                for (i, z) in self.z_order.iter_mut().enumerate() {
                    *z = i;
                }
                self.z_order_overridden = false;
            }
        }
        self.draw_dirty = true;
    }

    pub fn set_slot_z_index(&mut self, slot: usize, z_index: i32) {
        if let Some(slot) = self.slots.get_mut(slot) {
            if slot.z_index != z_index {
                slot.z_index = z_index;
                self.draw_dirty = true;
            }
        }
    }

    /// Return a slot to its setup display, color and z-index.
    pub fn reset_slot(&mut self, slot: usize) {
        if let Some(slot) = self.slots.get_mut(slot) {
            let z_index = slot.z_index;
            slot.reset_to_setup();
            if slot.z_index != z_index {
                self.draw_dirty = true;
            }
        }
    }

    /// Read and fill cache frames of `data` from now on. Bones and slots find their
    /// cache rows by name; slots only use the cache while their first display comes
    /// from the default skin.
    pub fn bind_cache(&mut self, data: &Rc<AnimationData>) {
        self.cache_source = Some(data.clone());
        for bone in &mut self.bones {
            bone.cached_record = -1;
            bone.cache_index = data.bone_index(&bone.name);
        }
        for slot in &mut self.slots {
            let default_display = slot
                .display_frames
                .first()
                .is_some_and(|f| f.raw.is_some() && f.from_default_skin);
            slot.cache_index = if default_display {
                data.slot_index(&slot.name)
            } else {
                None
            };
        }
    }

    pub fn invalidate_update(&mut self, bone: Option<usize>, update_slot: bool) {
        match bone {
            Some(index) => {
                if let Some(bone) = self.bones.get_mut(index) {
                    bone.invalidate_update();
                }
                if update_slot {
                    for slot in self.slots.iter_mut().filter(|s| s.parent == index) {
                        slot.invalidate_update();
                    }
                }
            }
            None => {
                for bone in &mut self.bones {
                    bone.invalidate_update();
                }
                if update_slot {
                    for slot in &mut self.slots {
                        slot.invalidate_update();
                    }
                }
            }
        }
    }

    /// True when `bone` lies strictly below `ancestor`.
    pub fn contains(&self, ancestor: usize, bone: usize) -> bool {
        let mut current = self.bones.get(bone).and_then(|b| b.parent);
        while let Some(index) = current {
            if index == ancestor {
                return true;
            }
            current = self.bones.get(index).and_then(|b| b.parent);
        }
        false
    }

    pub fn mark_draw_dirty(&mut self) {
        self.draw_dirty = true;
    }

    fn sort_draw_order(&mut self) {
        let mut order: Vec<usize> = (0..self.slots.len()).collect();
        order.sort_by_key(|&i| (self.slots[i].z_index, self.z_order[i]));
        for (position, &slot) in order.iter().enumerate() {
            if self.draw_order.get(position) != Some(&slot) {
                self.slots[slot].notify_z_order(position);
            }
        }
        self.draw_order = order;
    }

    pub fn update(&mut self) {
        if self.draw_dirty {
            self.draw_dirty = false;
            self.sort_draw_order();
        }

        for &i in &self.driven {
            self.bones[i].transform_dirty = true;
        }

        let frame = self.cache_frame_index;
        let cache = self
            .cache_source
            .as_deref()
            .filter(|_| frame >= 0)
            .map(|data| (&data.cache, frame as usize));
        let (flip_x, flip_y) = (self.flip_x, self.flip_y);

        for i in 0..self.bones.len() {
            if self.refresh.binary_search(&i).is_ok() {
                continue;
            }
            let (before, rest) = self.bones.split_at_mut(i);
            let bone = &mut rest[0];
            let parent = bone.parent.and_then(|p| before.get(p));
            let cache = cache.filter(|_| !self.constrained[i]);
            bone.update(parent, flip_x, flip_y, cache);
        }

        for constraint in &mut self.constraints {
            constraint.apply(&mut self.bones);
        }
        for &i in &self.refresh {
            let (before, rest) = self.bones.split_at_mut(i);
            let bone = &mut rest[0];
            let parent = bone.parent.and_then(|p| before.get(p));
            bone.compute_global(parent, flip_x, flip_y);
        }

        for slot in &mut self.slots {
            let Some(bone) = self.bones.get(slot.parent) else {
                continue;
            };
            let cache = cache.filter(|_| !self.constrained[slot.parent]);
            slot.update(bone, cache);
        }
    }
}
