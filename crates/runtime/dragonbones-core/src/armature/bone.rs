//! Runtime bone: setup pose, user offset, blended animation delta and the
//! resolved global transform.

use std::f32::consts::PI;

use dragonbones_geom::{Matrix, Transform};

use crate::model::{BoneData, FrameCache};

/// How the user `offset` combines with the animated pose.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OffsetMode {
    /// Offset ignored.
    #[default]
    None,
    /// origin + offset + animation.
    Additive,
    /// Offset replaces the local pose and parent inheritance.
    Override,
}

#[derive(Clone, Debug)]
pub struct Bone {
    pub(crate) index: usize,
    pub(crate) name: String,
    pub(crate) parent: Option<usize>,
    pub(crate) length: f32,
    inherit_translation: bool,
    inherit_rotation: bool,
    inherit_scale: bool,
    inherit_reflection: bool,
    /// Setup pose.
    pub(crate) origin: Transform,
    pub(crate) offset: Transform,
    pub(crate) offset_mode: OffsetMode,
    /// Blended animation delta for this tick.
    pub(crate) animation_pose: Transform,
    pub(crate) global: Transform,
    pub(crate) global_matrix: Matrix,
    pub(crate) transform_dirty: bool,
    /// Global pose changed this tick; children and slots must follow.
    pub(crate) children_dirty: bool,
    pub(crate) cached_record: i32,
    /// Row of this bone in the bound animation's cache tables.
    pub(crate) cache_index: Option<usize>,
    pub(crate) visible: bool,
}

impl Bone {
    pub(crate) fn new(index: usize, data: &BoneData) -> Self {
        Self {
            index,
            name: data.name.clone(),
            parent: data.parent,
            length: data.length,
            inherit_translation: data.inherit_translation,
            inherit_rotation: data.inherit_rotation,
            inherit_scale: data.inherit_scale,
            inherit_reflection: data.inherit_reflection,
            origin: data.transform,
            offset: Transform::IDENTITY,
            offset_mode: OffsetMode::None,
            animation_pose: Transform::IDENTITY,
            global: data.transform,
            global_matrix: data.transform.matrix(),
            transform_dirty: true,
            children_dirty: false,
            cached_record: -1,
            cache_index: None,
            visible: true,
        }
    }

    /// Position of this bone in the armature's bone list.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn origin(&self) -> &Transform {
        &self.origin
    }

    pub fn offset(&self) -> &Transform {
        &self.offset
    }

    pub fn offset_mode(&self) -> OffsetMode {
        self.offset_mode
    }

    /// Replace the user offset and mark the bone for recompute.
    pub fn set_offset(&mut self, offset: Transform, mode: OffsetMode) {
        self.offset = offset;
        self.offset_mode = mode;
        self.transform_dirty = true;
    }

    pub fn animation_pose(&self) -> &Transform {
        &self.animation_pose
    }

    pub fn global(&self) -> &Transform {
        &self.global
    }

    pub fn global_matrix(&self) -> &Matrix {
        &self.global_matrix
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    #[inline]
    pub fn invalidate_update(&mut self) {
        self.transform_dirty = true;
    }

    pub(crate) fn reset_animation_pose(&mut self) {
        self.animation_pose = Transform::IDENTITY;
    }

    /// Accumulate a weighted delta into the animation pose. Scale blends around 1.
    pub(crate) fn blend_pose(&mut self, delta: &Transform, weight: f32) {
        let pose = &mut self.animation_pose;
        pose.x += delta.x * weight;
        pose.y += delta.y * weight;
        pose.rotation += delta.rotation * weight;
        pose.skew += delta.skew * weight;
        pose.scale_x += (delta.scale_x - 1.0) * weight;
        pose.scale_y += (delta.scale_y - 1.0) * weight;
        self.transform_dirty = true;
    }

    /// Resolve the global pose, reading or filling `cache` when a cache frame is active.
    pub(crate) fn update(
        &mut self,
        parent: Option<&Bone>,
        flip_x: bool,
        flip_y: bool,
        cache: Option<(&FrameCache, usize)>,
    ) {
        let parent_dirty = parent.is_some_and(|p| p.children_dirty);
        self.children_dirty = false;

        let cache = cache.zip(self.cache_index);
        let Some(((cache, frame), row)) = cache else {
            self.cached_record = -1;
            if self.transform_dirty || parent_dirty {
                self.compute_global(parent, flip_x, flip_y);
            }
            return;
        };

        let record = cache.bone_record(row, frame);
        if record >= 0 {
            if self.cached_record != record {
                self.cached_record = record;
                cache.read(record, &mut self.global_matrix, &mut self.global);
                self.children_dirty = true;
            }
            self.transform_dirty = false;
            return;
        }

        if self.transform_dirty || parent_dirty || self.cached_record < 0 {
            self.compute_global(parent, flip_x, flip_y);
            self.cached_record = cache.store_bone(row, frame, &self.global_matrix, &self.global);
        } else {
            cache.link_bone(row, frame, self.cached_record);
        }
    }

    pub(crate) fn compute_global(&mut self, parent: Option<&Bone>, flip_x: bool, flip_y: bool) {
        let origin = &self.origin;
        let pose = &self.animation_pose;
        let mut global = match self.offset_mode {
            OffsetMode::None => {
                let mut g = *origin;
                g.add(pose);
                g
            }
            OffsetMode::Additive => {
                let mut g = *origin;
                g.add(&self.offset).add(pose);
                g
            }
            OffsetMode::Override => self.offset,
        };
        let parent = parent.filter(|_| self.offset_mode != OffsetMode::Override);

        match parent {
            Some(parent) => {
                let pm = &parent.global_matrix;
                if self.inherit_scale {
                    if !self.inherit_rotation {
                        let mut parent_rotation = parent.global.rotation;
                        if parent.global.scale_x < 0.0 {
                            parent_rotation += PI;
                        }
                        global.rotation -= parent_rotation;
                    }
                    global.to_matrix(&mut self.global_matrix);
                    self.global_matrix.concat(pm);
                    if self.inherit_translation {
                        global.x = self.global_matrix.tx;
                        global.y = self.global_matrix.ty;
                    } else {
                        self.global_matrix.tx = global.x;
                        self.global_matrix.ty = global.y;
                    }
                    global.from_matrix(&self.global_matrix);
                } else {
                    if self.inherit_translation {
                        let (x, y) = (global.x, global.y);
                        global.x = pm.a * x + pm.c * y + pm.tx;
                        global.y = pm.b * x + pm.d * y + pm.ty;
                    } else {
                        if flip_x {
                            global.x = -global.x;
                        }
                        if flip_y {
                            global.y = -global.y;
                        }
                    }

                    if self.inherit_rotation {
                        let mut rotation = parent.global.rotation;
                        if parent.global.scale_x < 0.0 {
                            rotation += PI;
                        }
                        if pm.determinant() < 0.0 {
                            rotation -= global.rotation * 2.0;
                            if flip_x != flip_y || self.inherit_reflection {
                                global.skew += PI;
                            }
                        }
                        global.rotation += rotation;
                    } else {
                        apply_flip_rotation(&mut global, flip_x, flip_y);
                    }
                    global.to_matrix(&mut self.global_matrix);
                }
            }
            None => {
                if flip_x {
                    global.x = -global.x;
                }
                if flip_y {
                    global.y = -global.y;
                }
                apply_flip_rotation(&mut global, flip_x, flip_y);
                global.to_matrix(&mut self.global_matrix);
            }
        }

        self.global = global;
        self.transform_dirty = false;
        self.children_dirty = true;
    }
}

fn apply_flip_rotation(global: &mut Transform, flip_x: bool, flip_y: bool) {
    match (flip_x, flip_y) {
        (false, false) => {}
        (true, true) => global.rotation += PI,
        (true, false) => {
            global.rotation = PI - global.rotation;
            global.skew += PI;
        }
        (false, true) => {
            global.rotation = -global.rotation;
            global.skew += PI;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32, eps: f32) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    fn mk_bone(index: usize, parent: Option<usize>, x: f32, rotation: f32) -> Bone {
        let mut data = BoneData::new(format!("b{index}"));
        data.parent = parent;
        data.transform.x = x;
        data.transform.rotation = rotation;
        Bone::new(index, &data)
    }

    /// it should place a child along its rotated parent
    #[test]
    fn child_inherits_parent_rotation() {
        let mut root = mk_bone(0, None, 10.0, std::f32::consts::FRAC_PI_2);
        root.update(None, false, false, None);
        let mut child = mk_bone(1, Some(0), 5.0, 0.0);
        child.update(Some(&root), false, false, None);
        approx(child.global.x, 10.0, 1e-4);
        approx(child.global.y, 5.0, 1e-4);
        approx(child.global.rotation, std::f32::consts::FRAC_PI_2, 1e-4);
    }

    /// it should skip recompute when neither the bone nor its parent changed
    #[test]
    fn clean_bone_is_not_recomputed() {
        let mut root = mk_bone(0, None, 1.0, 0.0);
        root.update(None, false, false, None);
        assert!(root.children_dirty);
        root.update(None, false, false, None);
        assert!(!root.children_dirty);
    }

    /// it should blend scale around one and offset additively
    #[test]
    fn blend_pose_weights_scale_around_one() {
        let mut bone = mk_bone(0, None, 0.0, 0.0);
        let delta = Transform {
            x: 10.0,
            scale_x: 2.0,
            ..Transform::IDENTITY
        };
        bone.blend_pose(&delta, 0.5);
        approx(bone.animation_pose.x, 5.0, 1e-6);
        approx(bone.animation_pose.scale_x, 1.5, 1e-6);
        approx(bone.animation_pose.scale_y, 1.0, 1e-6);
    }

    /// it should mirror a root bone when the armature flips on x
    #[test]
    fn flip_x_mirrors_root() {
        let mut root = mk_bone(0, None, 4.0, 0.0);
        root.update(None, true, false, None);
        approx(root.global.x, -4.0, 1e-6);
        approx(root.global_matrix.a, -1.0, 1e-5);
    }

    /// it should ignore animation and parent in override mode
    #[test]
    fn override_offset_replaces_pose() {
        let mut root = mk_bone(0, None, 50.0, 0.0);
        root.update(None, false, false, None);
        let mut child = mk_bone(1, Some(0), 5.0, 0.0);
        child.set_offset(
            Transform {
                x: 1.0,
                y: 2.0,
                ..Transform::IDENTITY
            },
            OffsetMode::Override,
        );
        child.update(Some(&root), false, false, None);
        approx(child.global.x, 1.0, 1e-6);
        approx(child.global.y, 2.0, 1e-6);
    }
}
