//! Play descriptor consumed by `Animation::play_config`.

use serde::{Deserialize, Serialize};

use crate::model::ArmatureData;

/// Which existing states a new state fades out.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationFadeOutMode {
    /// Leave existing states alone.
    None,
    SameLayer,
    SameGroup,
    SameLayerAndGroup,
    #[default]
    All,
    /// Reuse a live state of the same layer playing the same animation.
    Single,
}

/// Every knob of a play request. Negative numbers are "use the default" sentinels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub pause_fade_out: bool,
    pub fade_out_mode: AnimationFadeOutMode,
    /// Negative: same as the fade-in time.
    pub fade_out_time: f32,
    pub action_enabled: bool,
    pub additive: bool,
    pub display_control: bool,
    pub pause_fade_in: bool,
    pub reset_to_pose: bool,
    /// Negative: the animation's own play times. 0 loops forever.
    pub play_times: i32,
    pub layer: i32,
    /// Start offset in seconds.
    pub position: f32,
    /// Negative or zero: play to the natural end.
    pub duration: f32,
    /// `<= -100`: the inverse of the animation's scale.
    pub time_scale: f32,
    pub weight: f32,
    /// Negative: the animation's own fade-in time.
    pub fade_in_time: f32,
    /// Negative: never fade out automatically.
    pub auto_fade_out_time: f32,
    /// State name; empty uses the animation name.
    pub name: String,
    pub animation: String,
    pub group: String,
    pub bone_mask: Vec<String>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            pause_fade_out: true,
            fade_out_mode: AnimationFadeOutMode::All,
            fade_out_time: -1.0,
            action_enabled: true,
            additive: false,
            display_control: true,
            pause_fade_in: true,
            reset_to_pose: true,
            play_times: -1,
            layer: 0,
            position: 0.0,
            duration: -1.0,
            time_scale: -100.0,
            weight: 1.0,
            fade_in_time: -1.0,
            auto_fade_out_time: -1.0,
            name: String::new(),
            animation: String::new(),
            group: String::new(),
            bone_mask: Vec::new(),
        }
    }
}

impl AnimationConfig {
    pub fn new(animation: impl Into<String>) -> Self {
        Self {
            animation: animation.into(),
            ..Self::default()
        }
    }

    /// Restore every default, keeping the bone-mask allocation.
    pub fn clear(&mut self) {
        let mut mask = std::mem::take(&mut self.bone_mask);
        mask.clear();
        *self = Self {
            bone_mask: mask,
            ..Self::default()
        };
    }

    pub fn copy_from(&mut self, other: &AnimationConfig) {
        self.clone_from(other);
    }

    /// Add `bone` (and, with `recursive`, every descendant) to the mask.
    pub fn add_bone_mask(&mut self, armature: &ArmatureData, bone: &str, recursive: bool) {
        add_to_mask(&mut self.bone_mask, armature, bone, recursive);
    }

    /// Remove `bone` (and, with `recursive`, every descendant) from the mask.
    pub fn remove_bone_mask(&mut self, armature: &ArmatureData, bone: &str, recursive: bool) {
        remove_from_mask(&mut self.bone_mask, armature, bone, recursive);
    }
}

pub(crate) fn add_to_mask(mask: &mut Vec<String>, armature: &ArmatureData, bone: &str, recursive: bool) {
    let Some(index) = armature.get_bone_index(bone) else {
        log::warn!("bone mask: unknown bone {bone}");
        return;
    };
    push_unique(mask, bone);
    if recursive {
        for (i, data) in armature.bones.iter().enumerate() {
            if is_descendant(armature, i, index) {
                push_unique(mask, &data.name);
            }
        }
    }
}

pub(crate) fn remove_from_mask(
    mask: &mut Vec<String>,
    armature: &ArmatureData,
    bone: &str,
    recursive: bool,
) {
    mask.retain(|name| name != bone);
    if !recursive {
        return;
    }
    let Some(index) = armature.get_bone_index(bone) else {
        return;
    };
    mask.retain(|name| {
        armature
            .get_bone_index(name)
            .map_or(true, |i| !is_descendant(armature, i, index))
    });
}

fn push_unique(mask: &mut Vec<String>, name: &str) {
    if !mask.iter().any(|n| n == name) {
        mask.push(name.to_string());
    }
}

/// True when `bone` lies strictly below `ancestor` in the hierarchy.
pub(crate) fn is_descendant(armature: &ArmatureData, bone: usize, ancestor: usize) -> bool {
    let mut current = armature.bones.get(bone).and_then(|b| b.parent);
    while let Some(parent) = current {
        if parent == ancestor {
            return true;
        }
        current = armature.bones.get(parent).and_then(|b| b.parent);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoneData;

    fn mk_rig() -> ArmatureData {
        let mut data = ArmatureData::new("rig");
        data.add_bone(BoneData::new("root"));
        let mut arm = BoneData::new("arm");
        arm.parent = Some(0);
        data.add_bone(arm);
        let mut hand = BoneData::new("hand");
        hand.parent = Some(1);
        data.add_bone(hand);
        data
    }

    /// it should add descendants when the mask is recursive
    #[test]
    fn recursive_mask_covers_subtree() {
        let rig = mk_rig();
        let mut cfg = AnimationConfig::new("walk");
        cfg.add_bone_mask(&rig, "arm", true);
        assert_eq!(cfg.bone_mask, vec!["arm".to_string(), "hand".to_string()]);
        cfg.remove_bone_mask(&rig, "arm", true);
        assert!(cfg.bone_mask.is_empty());
    }

    /// it should restore defaults on clear
    #[test]
    fn clear_restores_defaults() {
        let mut cfg = AnimationConfig::new("walk");
        cfg.layer = 3;
        cfg.bone_mask.push("arm".into());
        cfg.clear();
        assert_eq!(cfg, AnimationConfig::default());
    }

    /// it should fill missing fields from defaults when deserialized
    #[test]
    fn partial_json_preset() {
        let cfg: AnimationConfig =
            serde_json::from_str(r#"{ "animation": "walk", "fade_in_time": 0.2 }"#).unwrap();
        assert_eq!(cfg.animation, "walk");
        assert_eq!(cfg.play_times, -1);
        assert_eq!(cfg.fade_out_mode, AnimationFadeOutMode::All);
    }
}
