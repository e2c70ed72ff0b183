//! Armature template: bones, slots, constraints, skins and animations.

use std::cell::Cell;
use std::rc::Rc;

use dragonbones_geom::{ColorTransform, Rectangle, Transform};
use hashbrown::HashMap;

use crate::error::ParseError;
use crate::model::animation::AnimationData;
use crate::model::constraint::ConstraintData;
use crate::model::display::DisplayData;
use crate::model::skin::SkinData;
use crate::model::user_data::{ActionData, UserData};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ArmatureKind {
    #[default]
    Armature,
    MovieClip,
    Stage,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    Normal,
    Add,
    Alpha,
    Darken,
    Difference,
    Erase,
    HardLight,
    Invert,
    Layer,
    Lighten,
    Multiply,
    Overlay,
    Screen,
    Subtract,
}

impl BlendMode {
    pub fn parse(value: &str) -> Self {
        match value {
            "add" => BlendMode::Add,
            "alpha" => BlendMode::Alpha,
            "darken" => BlendMode::Darken,
            "difference" => BlendMode::Difference,
            "erase" => BlendMode::Erase,
            "hardlight" => BlendMode::HardLight,
            "invert" => BlendMode::Invert,
            "layer" => BlendMode::Layer,
            "lighten" => BlendMode::Lighten,
            "multiply" => BlendMode::Multiply,
            "overlay" => BlendMode::Overlay,
            "screen" => BlendMode::Screen,
            "subtract" => BlendMode::Subtract,
            _ => BlendMode::Normal,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoneData {
    pub name: String,
    /// Index into the owning armature's bone list.
    pub parent: Option<usize>,
    pub length: f32,
    /// Setup pose relative to the parent.
    pub transform: Transform,
    pub inherit_translation: bool,
    pub inherit_rotation: bool,
    pub inherit_scale: bool,
    pub inherit_reflection: bool,
    pub user_data: Option<UserData>,
}

impl BoneData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            length: 0.0,
            transform: Transform::IDENTITY,
            inherit_translation: true,
            inherit_rotation: true,
            inherit_scale: true,
            inherit_reflection: true,
            user_data: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SlotData {
    pub name: String,
    /// Index of the bone carrying this slot.
    pub parent: usize,
    /// -1 shows nothing.
    pub display_index: i32,
    pub z_order: usize,
    pub z_index: i32,
    pub blend_mode: BlendMode,
    pub color: ColorTransform,
    pub user_data: Option<UserData>,
}

impl SlotData {
    pub fn new(name: impl Into<String>, parent: usize) -> Self {
        Self {
            name: name.into(),
            parent,
            display_index: 0,
            z_order: 0,
            z_index: 0,
            blend_mode: BlendMode::Normal,
            color: ColorTransform::IDENTITY,
            user_data: None,
        }
    }
}

#[derive(Debug)]
pub struct ArmatureData {
    pub kind: ArmatureKind,
    pub name: String,
    /// Name of the owning `DragonBonesData`.
    pub parent_name: String,
    pub frame_rate: f32,
    pub scale: f32,
    pub aabb: Rectangle,
    /// Parents first, constraint targets before constraint roots once `sort_bones` ran.
    pub bones: Vec<BoneData>,
    /// In setup draw order.
    pub slots: Vec<SlotData>,
    pub constraints: Vec<ConstraintData>,
    pub default_actions: Vec<ActionData>,
    pub actions: Vec<ActionData>,
    pub user_data: Option<UserData>,
    cache_frame_rate: Cell<f32>,
    bone_map: HashMap<String, usize>,
    slot_map: HashMap<String, usize>,
    skins: HashMap<String, Rc<SkinData>>,
    skin_names: Vec<String>,
    default_skin: Option<Rc<SkinData>>,
    animations: HashMap<String, Rc<AnimationData>>,
    animation_names: Vec<String>,
    default_animation: Option<Rc<AnimationData>>,
}

impl ArmatureData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            kind: ArmatureKind::Armature,
            name: name.into(),
            parent_name: String::new(),
            frame_rate: 24.0,
            scale: 1.0,
            aabb: Rectangle::default(),
            bones: Vec::new(),
            slots: Vec::new(),
            constraints: Vec::new(),
            default_actions: Vec::new(),
            actions: Vec::new(),
            user_data: None,
            cache_frame_rate: Cell::new(0.0),
            bone_map: HashMap::new(),
            slot_map: HashMap::new(),
            skins: HashMap::new(),
            skin_names: Vec::new(),
            default_skin: None,
            animations: HashMap::new(),
            animation_names: Vec::new(),
            default_animation: None,
        }
    }

    /// Returns the new bone's index, or `None` when the name is taken.
    pub fn add_bone(&mut self, bone: BoneData) -> Option<usize> {
        if self.bone_map.contains_key(&bone.name) {
            log::warn!("Same bone: {}", bone.name);
            return None;
        }
        let index = self.bones.len();
        self.bone_map.insert(bone.name.clone(), index);
        self.bones.push(bone);
        Some(index)
    }

    pub fn add_slot(&mut self, mut slot: SlotData) -> Option<usize> {
        if self.slot_map.contains_key(&slot.name) {
            log::warn!("Same slot: {}", slot.name);
            return None;
        }
        let index = self.slots.len();
        slot.z_order = index;
        self.slot_map.insert(slot.name.clone(), index);
        self.slots.push(slot);
        Some(index)
    }

    pub fn add_constraint(&mut self, constraint: ConstraintData) {
        if self.get_constraint(constraint.name()).is_some() {
            log::warn!("Same constraint: {}", constraint.name());
            return;
        }
        self.constraints.push(constraint);
    }

    /// The skin named "default" (or the first skin added) becomes the default skin.
    pub fn add_skin(&mut self, skin: SkinData) {
        if self.skins.contains_key(&skin.name) {
            log::warn!("Same skin: {}", skin.name);
            return;
        }
        let skin = Rc::new(skin);
        if self.default_skin.is_none() || skin.name == "default" {
            self.default_skin = Some(skin.clone());
        }
        self.skin_names.push(skin.name.clone());
        self.skins.insert(skin.name.clone(), skin);
    }

    /// The first animation added becomes the default animation.
    pub fn add_animation(&mut self, animation: AnimationData) {
        if self.animations.contains_key(&animation.name) {
            log::warn!("Same animation: {}", animation.name);
            return;
        }
        let animation = Rc::new(animation);
        if self.default_animation.is_none() {
            self.default_animation = Some(animation.clone());
        }
        self.animation_names.push(animation.name.clone());
        self.animations.insert(animation.name.clone(), animation);
    }

    pub fn add_action(&mut self, action: ActionData, is_default: bool) {
        if is_default {
            self.default_actions.push(action);
        } else {
            self.actions.push(action);
        }
    }

    /// Reorder bones so each comes after its parent and after the target of any
    /// constraint it roots. Rewrites every bone index held by slots and constraints.
    pub fn sort_bones(&mut self) -> Result<(), ParseError> {
        let total = self.bones.len();
        if total == 0 {
            return Ok(());
        }

        let mut sorted: Vec<usize> = Vec::with_capacity(total);
        let mut placed = vec![false; total];
        while sorted.len() < total {
            let before = sorted.len();
            for index in 0..total {
                if placed[index] {
                    continue;
                }
                let waits_for_target = self
                    .constraints
                    .iter()
                    .any(|c| c.root() == index && !placed[c.target_bone()]);
                if waits_for_target {
                    continue;
                }
                if let Some(parent) = self.bones[index].parent {
                    if !placed[parent] {
                        continue;
                    }
                }
                placed[index] = true;
                sorted.push(index);
            }
            if sorted.len() == before {
                return Err(ParseError::InvalidValue {
                    field: "bone",
                    reason: format!("cyclic bone hierarchy in armature {}", self.name),
                });
            }
        }

        let mut map = vec![0usize; total];
        for (new_index, &old_index) in sorted.iter().enumerate() {
            map[old_index] = new_index;
        }

        let mut old: Vec<Option<BoneData>> = self.bones.drain(..).map(Some).collect();
        for &old_index in &sorted {
            if let Some(mut bone) = old[old_index].take() {
                bone.parent = bone.parent.map(|p| map[p]);
                self.bones.push(bone);
            }
        }
        for slot in &mut self.slots {
            slot.parent = map[slot.parent];
        }
        for constraint in &mut self.constraints {
            constraint.remap_bones(&map);
        }
        for index in self.bone_map.values_mut() {
            *index = map[*index];
        }
        Ok(())
    }

    /// Enable cache frames for every animation. Only the first call takes effect.
    pub fn cache_frames(&self, frame_rate: f32) {
        if self.cache_frame_rate.get() > 0.0 || frame_rate <= 0.0 {
            return;
        }
        self.cache_frame_rate.set(frame_rate);
        for animation in self.animations.values() {
            animation.cache_frames(frame_rate);
        }
    }

    #[inline]
    pub fn cache_frame_rate(&self) -> f32 {
        self.cache_frame_rate.get()
    }

    pub fn get_bone(&self, name: &str) -> Option<&BoneData> {
        self.bone_map.get(name).map(|&i| &self.bones[i])
    }

    pub fn get_bone_index(&self, name: &str) -> Option<usize> {
        self.bone_map.get(name).copied()
    }

    pub fn get_slot(&self, name: &str) -> Option<&SlotData> {
        self.slot_map.get(name).map(|&i| &self.slots[i])
    }

    pub fn get_slot_index(&self, name: &str) -> Option<usize> {
        self.slot_map.get(name).copied()
    }

    pub fn get_constraint(&self, name: &str) -> Option<&ConstraintData> {
        self.constraints.iter().find(|c| c.name() == name)
    }

    pub fn get_skin(&self, name: &str) -> Option<&Rc<SkinData>> {
        self.skins.get(name)
    }

    pub fn default_skin(&self) -> Option<&Rc<SkinData>> {
        self.default_skin.as_ref()
    }

    pub fn skin_names(&self) -> &[String] {
        &self.skin_names
    }

    /// Mesh display `mesh_name` of `slot_name` in `skin_name`.
    pub fn get_mesh(&self, skin_name: &str, slot_name: &str, mesh_name: &str) -> Option<&Rc<DisplayData>> {
        let display = self.get_skin(skin_name)?.get_display(slot_name, mesh_name)?;
        matches!(display.kind, crate::model::DisplayKind::Mesh { .. }).then_some(display)
    }

    pub fn get_animation(&self, name: &str) -> Option<&Rc<AnimationData>> {
        self.animations.get(name)
    }

    pub fn animations(&self) -> &HashMap<String, Rc<AnimationData>> {
        &self.animations
    }

    pub fn animation_names(&self) -> &[String] {
        &self.animation_names
    }

    pub fn default_animation(&self) -> Option<&Rc<AnimationData>> {
        self.default_animation.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::constraint::IkConstraintData;

    fn bone(name: &str, parent: Option<usize>) -> BoneData {
        let mut b = BoneData::new(name);
        b.parent = parent;
        b
    }

    #[test]
    fn sort_places_parents_and_ik_targets_first() {
        let mut data = ArmatureData::new("rig");
        // 0: arm (parent root), 1: root, 2: target (parent root)
        data.add_bone(bone("arm", Some(1)));
        data.add_bone(bone("root", None));
        data.add_bone(bone("target", Some(1)));
        data.add_slot(SlotData::new("arm_slot", 0));
        data.add_constraint(ConstraintData::Ik(IkConstraintData {
            name: "ik".into(),
            order: 0,
            target: 2,
            bone: 0,
            root: 0,
            bend_positive: true,
            scale_enabled: false,
            weight: 1.0,
        }));
        data.sort_bones().unwrap();

        let names: Vec<&str> = data.bones.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["root", "target", "arm"]);
        assert_eq!(data.get_bone("arm").unwrap().parent, Some(0));
        assert_eq!(data.slots[0].parent, 2);
        match &data.constraints[0] {
            ConstraintData::Ik(ik) => {
                assert_eq!(ik.target, 1);
                assert_eq!(ik.root, 2);
            }
            other => panic!("unexpected constraint {other:?}"),
        }
    }

    #[test]
    fn duplicate_bone_keeps_first() {
        let mut data = ArmatureData::new("rig");
        let mut first = BoneData::new("root");
        first.length = 10.0;
        assert_eq!(data.add_bone(first), Some(0));
        assert_eq!(data.add_bone(BoneData::new("root")), None);
        assert_eq!(data.bones.len(), 1);
        assert_eq!(data.get_bone("root").unwrap().length, 10.0);
    }

    #[test]
    fn cycle_is_rejected() {
        let mut data = ArmatureData::new("rig");
        data.add_bone(bone("a", Some(1)));
        data.add_bone(bone("b", Some(0)));
        assert!(data.sort_bones().is_err());
    }

    #[test]
    fn default_skin_prefers_named_default() {
        let mut data = ArmatureData::new("rig");
        data.add_skin(SkinData::new("alt"));
        data.add_skin(SkinData::new("default"));
        assert_eq!(data.default_skin().unwrap().name, "default");
        assert_eq!(data.skin_names(), ["alt", "default"]);
    }
}
