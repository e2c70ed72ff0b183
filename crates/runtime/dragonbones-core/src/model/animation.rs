//! Timelines of one named animation. Positions and durations are in seconds.

use dragonbones_geom::ColorTransform;

use crate::model::frame_cache::FrameCache;
use crate::model::user_data::ActionData;
use crate::tween::Frame;

/// Actions fired when the playhead crosses `position`.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionFrame {
    pub position: f32,
    pub actions: Vec<ActionData>,
}

/// Draw order for a z-order keyframe; `None` restores the data order.
pub type ZOrderFrame = Frame<Option<Vec<usize>>>;

/// Per-bone channels, stored as deltas from the bone's setup pose.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoneTimeline {
    pub bone: String,
    /// `[x, y]` offsets.
    pub translate: Vec<Frame<[f32; 2]>>,
    /// `[rotation, skew]` offsets in radians, already unwrapped for tweening.
    pub rotate: Vec<Frame<[f32; 2]>>,
    /// `[scale_x, scale_y]` factors.
    pub scale: Vec<Frame<[f32; 2]>>,
}

impl BoneTimeline {
    pub fn is_empty(&self) -> bool {
        self.translate.is_empty() && self.rotate.is_empty() && self.scale.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SlotTimeline {
    pub slot: String,
    pub display: Vec<Frame<i32>>,
    pub color: Vec<Frame<ColorTransform>>,
    pub z_index: Vec<Frame<f32>>,
}

impl SlotTimeline {
    pub fn is_empty(&self) -> bool {
        self.display.is_empty() && self.color.is_empty() && self.z_index.is_empty()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AnimationTimelineKind {
    /// Drives the child state's normalized time.
    Progress,
    /// Drives the child state's weight.
    Weight,
}

/// Blend-node channel targeting another animation of the same armature.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationTimeline {
    pub name: String,
    pub kind: AnimationTimelineKind,
    pub frames: Vec<Frame<f32>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationData {
    pub name: String,
    pub frame_rate: f32,
    pub frame_count: u32,
    pub duration: f32,
    /// 0 loops forever.
    pub play_times: u32,
    pub fade_in_time: f32,
    pub scale: f32,
    pub action_frames: Vec<ActionFrame>,
    /// Bone names of the owning armature in data order. Cache tables index into these.
    pub bones: Vec<String>,
    /// Slot names of the owning armature in data order. Cache tables and z-order
    /// frames index into these.
    pub slots: Vec<String>,
    pub z_order: Vec<ZOrderFrame>,
    pub bone_timelines: Vec<BoneTimeline>,
    pub slot_timelines: Vec<SlotTimeline>,
    pub animation_timelines: Vec<AnimationTimeline>,
    pub cache: FrameCache,
}

impl Default for AnimationData {
    fn default() -> Self {
        Self {
            name: String::new(),
            frame_rate: 24.0,
            frame_count: 0,
            duration: 0.0,
            play_times: 1,
            fade_in_time: 0.0,
            scale: 1.0,
            action_frames: Vec::new(),
            bones: Vec::new(),
            slots: Vec::new(),
            z_order: Vec::new(),
            bone_timelines: Vec::new(),
            slot_timelines: Vec::new(),
            animation_timelines: Vec::new(),
            cache: FrameCache::default(),
        }
    }
}

impl AnimationData {
    pub fn get_bone_timeline(&self, bone: &str) -> Option<&BoneTimeline> {
        self.bone_timelines.iter().find(|t| t.bone == bone)
    }

    pub fn get_slot_timeline(&self, slot: &str) -> Option<&SlotTimeline> {
        self.slot_timelines.iter().find(|t| t.slot == slot)
    }

    /// Index of `bone` in the owning armature's data order.
    pub fn bone_index(&self, bone: &str) -> Option<usize> {
        self.bones.iter().position(|b| b == bone)
    }

    pub fn slot_index(&self, slot: &str) -> Option<usize> {
        self.slots.iter().position(|s| s == slot)
    }

    /// Names of animations this one composes as blend nodes, in first-use order.
    pub fn child_animation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for t in &self.animation_timelines {
            if !names.contains(&t.name.as_str()) {
                names.push(&t.name);
            }
        }
        names
    }

    pub fn cache_frames(&self, frame_rate: f32) {
        self.cache
            .enable(frame_rate, self.duration, self.bones.len(), self.slots.len());
    }
}
