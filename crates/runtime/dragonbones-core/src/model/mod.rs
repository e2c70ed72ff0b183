//! Immutable asset description, parsed once and shared by every armature built from it.
//!
//! Ownership: `DragonBonesData` owns `Rc<ArmatureData>`; armature data owns its
//! skins and `Rc<AnimationData>`. Runtime objects hold `Rc` clones and never
//! mutate the model, except for the cache-frame memo inside [`FrameCache`].

pub mod animation;
pub mod armature;
pub mod constraint;
pub mod display;
pub mod dragonbones;
pub mod frame_cache;
pub mod skin;
pub mod texture;
pub mod user_data;

pub use animation::{
    ActionFrame, AnimationData, AnimationTimeline, AnimationTimelineKind, BoneTimeline,
    SlotTimeline, ZOrderFrame,
};
pub use armature::{ArmatureData, ArmatureKind, BlendMode, BoneData, SlotData};
pub use constraint::{
    ConstraintData, IkConstraintData, PathConstraintData, PositionMode, RotateMode, SpacingMode,
};
pub use display::{BoundingBoxKind, DisplayData, DisplayKind};
pub use dragonbones::DragonBonesData;
pub use frame_cache::{FrameCache, CACHE_RECORD_LEN};
pub use skin::SkinData;
pub use texture::{TextureAtlasData, TextureData};
pub use user_data::{ActionData, ActionKind, UserData};
