//! DragonBones 5.x skeleton JSON.
//!
//! Notes:
//! - Durations in the payload are frame counts; the model stores seconds
//!   (`frames / frame_rate`, using the armature frame rate).
//! - Angles are degrees in the payload and radians in the model.
//! - Color multipliers are percentages (`aM: 50` is half alpha).
//! - Rotation keyframes are unwrapped here so runtime tweening is a plain lerp.
//! - Raw serde structs live at the bottom of the file and never leak out.

use dragonbones_geom::{normalize_radian, ColorTransform, Point, Rectangle, Transform, DEG_RAD, PI_D};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::ParseError;
use crate::model::{
    ActionData, ActionFrame, ActionKind, AnimationData, AnimationTimeline, AnimationTimelineKind,
    ArmatureData, ArmatureKind, BlendMode, BoneData, BoneTimeline, BoundingBoxKind,
    ConstraintData, DisplayData, DisplayKind, DragonBonesData, IkConstraintData,
    PathConstraintData, PositionMode, RotateMode, SkinData, SlotData, SlotTimeline,
    TextureAtlasData, UserData, ZOrderFrame,
};
use crate::parser::{atlas, DataParser};
use crate::tween::{Frame, Tween};

const TIMELINE_ANIMATION_PROGRESS: i32 = 40;
const TIMELINE_ANIMATION_WEIGHT: i32 = 41;

/// Parser for the structured-object (JSON) asset format.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonDataParser;

impl JsonDataParser {
    pub fn new() -> Self {
        Self
    }
}

impl DataParser for JsonDataParser {
    fn parse_dragonbones_data(&self, raw: &str, scale: f32) -> Result<DragonBonesData, ParseError> {
        let raw: RawDragonBones = serde_json::from_str(raw)?;
        parse_dragonbones(raw, if scale > 0.0 { scale } else { 1.0 })
    }

    fn parse_texture_atlas_data(
        &self,
        raw: &str,
        target: &mut TextureAtlasData,
        scale: f32,
    ) -> Result<(), ParseError> {
        atlas::parse_texture_atlas_json(raw, target, scale)
    }
}

fn parse_dragonbones(raw: RawDragonBones, scale: f32) -> Result<DragonBonesData, ParseError> {
    let mut data = DragonBonesData::new(raw.name);
    data.version = raw.version;
    data.compatible_version = raw.compatible_version;
    data.frame_rate = if raw.frame_rate > 0.0 { raw.frame_rate } else { 24.0 };
    data.user_data = raw.user_data.map(RawUserData::into_user_data);

    for raw_armature in raw.armature {
        let armature = parse_armature(raw_armature, data.frame_rate, scale)?;
        data.add_armature(armature);
    }
    Ok(data)
}

fn parse_armature(
    raw: RawArmature,
    default_frame_rate: f32,
    scale: f32,
) -> Result<ArmatureData, ParseError> {
    let mut armature = ArmatureData::new(raw.name);
    armature.kind = match raw.kind.as_str() {
        "MovieClip" => ArmatureKind::MovieClip,
        "Stage" => ArmatureKind::Stage,
        _ => ArmatureKind::Armature,
    };
    armature.frame_rate = raw.frame_rate.filter(|r| *r > 0.0).unwrap_or(default_frame_rate);
    armature.scale = scale;
    armature.user_data = raw.user_data.map(RawUserData::into_user_data);
    if let Some(aabb) = raw.aabb {
        armature.aabb = Rectangle::new(
            aabb.x * scale,
            aabb.y * scale,
            aabb.width * scale,
            aabb.height * scale,
        );
    }

    // Bones: register all names first so parents may appear after children.
    let mut parents: Vec<(usize, String)> = Vec::new();
    for rb in raw.bone {
        let mut bone = BoneData::new(rb.name);
        bone.length = rb.length * scale;
        bone.transform = rb.transform.to_transform(scale);
        bone.inherit_translation = rb.inherit_translation;
        bone.inherit_rotation = rb.inherit_rotation;
        bone.inherit_scale = rb.inherit_scale;
        bone.inherit_reflection = rb.inherit_reflection;
        bone.user_data = rb.user_data.map(RawUserData::into_user_data);
        if let Some(index) = armature.add_bone(bone) {
            if let Some(parent) = rb.parent.filter(|p| !p.is_empty()) {
                parents.push((index, parent));
            }
        }
    }
    for (index, parent_name) in parents {
        let parent = armature.get_bone_index(&parent_name).ok_or_else(|| {
            ParseError::UnknownReference {
                kind: "bone",
                name: parent_name.clone(),
                owner: armature.bones[index].name.clone(),
            }
        })?;
        armature.bones[index].parent = Some(parent);
    }

    for rs in raw.slot {
        let parent = armature
            .get_bone_index(&rs.parent)
            .ok_or_else(|| ParseError::UnknownReference {
                kind: "bone",
                name: rs.parent.clone(),
                owner: rs.name.clone(),
            })?;
        let mut slot = SlotData::new(rs.name, parent);
        slot.display_index = rs.display_index;
        slot.z_index = rs.z_index;
        slot.blend_mode = rs
            .blend_mode
            .as_deref()
            .map(BlendMode::parse)
            .unwrap_or_default();
        slot.color = rs.color.map(|c| c.to_color()).unwrap_or_default();
        slot.user_data = rs.user_data.map(RawUserData::into_user_data);
        armature.add_slot(slot);
    }

    let mut order = 0;
    for ik in raw.ik {
        let constraint = parse_ik(&armature, ik, order)?;
        armature.add_constraint(constraint);
        order += 1;
    }
    for path in raw.path {
        let constraint = parse_path_constraint(&armature, path, order)?;
        armature.add_constraint(constraint);
        order += 1;
    }

    armature.sort_bones()?;

    for rs in raw.skin {
        let skin = parse_skin(rs, scale);
        armature.add_skin(skin);
    }

    for ra in raw.animation {
        let animation = parse_animation(&armature, ra, scale)?;
        armature.add_animation(animation);
    }

    for action in raw.default_actions {
        if let Some(action) = action.into_action(ActionKind::Play) {
            armature.add_action(action, true);
        }
    }
    for action in raw.actions {
        if let Some(action) = action.into_action(ActionKind::Play) {
            armature.add_action(action, false);
        }
    }

    Ok(armature)
}

fn parse_ik(armature: &ArmatureData, raw: RawIk, order: usize) -> Result<ConstraintData, ParseError> {
    let lookup = |name: &str| {
        armature
            .get_bone_index(name)
            .ok_or_else(|| ParseError::UnknownReference {
                kind: "bone",
                name: name.to_string(),
                owner: raw.name.clone(),
            })
    };
    let bone = lookup(&raw.bone)?;
    let target = lookup(&raw.target)?;
    let root = if raw.chain > 0 {
        armature.bones[bone]
            .parent
            .ok_or_else(|| ParseError::InvalidValue {
                field: "ik.chain",
                reason: format!("bone {} has no parent for a two-bone chain", raw.bone),
            })?
    } else {
        bone
    };
    Ok(ConstraintData::Ik(IkConstraintData {
        name: raw.name.clone(),
        order,
        target,
        bone,
        root,
        bend_positive: raw.bend_positive,
        scale_enabled: raw.scale,
        weight: raw.weight,
    }))
}

fn parse_path_constraint(
    armature: &ArmatureData,
    raw: RawPathConstraint,
    order: usize,
) -> Result<ConstraintData, ParseError> {
    let target = armature
        .get_slot_index(&raw.target)
        .ok_or_else(|| ParseError::UnknownReference {
            kind: "slot",
            name: raw.target.clone(),
            owner: raw.name.clone(),
        })?;
    let mut bones = Vec::with_capacity(raw.bones.len());
    for name in &raw.bones {
        let index = armature
            .get_bone_index(name)
            .ok_or_else(|| ParseError::UnknownReference {
                kind: "bone",
                name: name.clone(),
                owner: raw.name.clone(),
            })?;
        bones.push(index);
    }
    let root = *bones.first().ok_or(ParseError::MissingField {
        context: "path constraint",
        field: "bones",
    })?;
    Ok(ConstraintData::Path(PathConstraintData {
        name: raw.name,
        order,
        target,
        target_bone: armature.slots[target].parent,
        path_display: raw.target_display,
        bones,
        root,
        position_mode: match raw.position_mode.as_str() {
            "fixed" => PositionMode::Fixed,
            _ => PositionMode::Percent,
        },
        spacing_mode: match raw.spacing_mode.as_str() {
            "fixed" => crate::model::SpacingMode::Fixed,
            "percent" => crate::model::SpacingMode::Percent,
            _ => crate::model::SpacingMode::Length,
        },
        rotate_mode: match raw.rotate_mode.as_str() {
            "chain" => RotateMode::Chain,
            "chainScale" => RotateMode::ChainScale,
            _ => RotateMode::Tangent,
        },
        position: raw.position,
        spacing: raw.spacing,
        rotate_offset: raw.rotate_offset * DEG_RAD,
        rotate_mix: raw.rotate_mix,
        translate_mix: raw.translate_mix,
    }))
}

fn parse_skin(raw: RawSkin, scale: f32) -> SkinData {
    let name = if raw.name.is_empty() {
        "default".to_string()
    } else {
        raw.name
    };
    let mut skin = SkinData::new(name);
    for slot in raw.slot {
        for display in slot.display {
            skin.add_display(&slot.name, display.map(|d| d.into_display(scale)));
        }
    }
    skin
}

fn parse_animation(
    armature: &ArmatureData,
    raw: RawAnimation,
    scale: f32,
) -> Result<AnimationData, ParseError> {
    let frame_rate = armature.frame_rate;
    let to_seconds = |frames: f32| frames / frame_rate;

    let mut animation = AnimationData {
        name: raw.name,
        frame_rate,
        frame_count: raw.duration,
        duration: to_seconds(raw.duration as f32),
        play_times: raw.play_times,
        fade_in_time: raw.fade_in_time,
        scale: if raw.scale > 0.0 { raw.scale } else { 1.0 },
        bones: armature.bones.iter().map(|b| b.name.clone()).collect(),
        slots: armature.slots.iter().map(|s| s.name.clone()).collect(),
        ..AnimationData::default()
    };

    let mut position = 0u32;
    for frame in raw.frame {
        let duration = frame.duration;
        let actions = frame.into_actions();
        if !actions.is_empty() {
            animation.action_frames.push(ActionFrame {
                position: to_seconds(position as f32),
                actions,
            });
        }
        position += duration;
    }

    if let Some(z_order) = raw.z_order {
        let mut position = 0u32;
        let slot_count = armature.slots.len();
        let mut frames: Vec<ZOrderFrame> = Vec::with_capacity(z_order.frame.len());
        for frame in z_order.frame {
            let order = frame
                .z_order
                .as_deref()
                .filter(|o| !o.is_empty())
                .map(|o| resolve_z_order(o, slot_count));
            frames.push(Frame::new(
                to_seconds(position as f32),
                to_seconds(frame.duration as f32),
                Tween::None,
                order,
            ));
            position += frame.duration;
        }
        animation.z_order = frames;
    }

    for rb in raw.bone {
        if armature.get_bone_index(&rb.name).is_none() {
            log::warn!("Animation {} references unknown bone {}", animation.name, rb.name);
            continue;
        }
        let mut timeline = BoneTimeline {
            bone: rb.name.clone(),
            ..BoneTimeline::default()
        };

        let mut position = 0u32;
        for f in rb.translate_frame {
            timeline.translate.push(Frame::new(
                to_seconds(position as f32),
                to_seconds(f.tween.duration as f32),
                f.tween.tween(),
                [f.x * scale, f.y * scale],
            ));
            position += f.tween.duration;
        }

        let mut position = 0u32;
        let mut prev_rotation = 0.0f32;
        let mut prev_clockwise = 0i32;
        for (i, f) in rb.rotate_frame.into_iter().enumerate() {
            let mut rotation = f.rotate * DEG_RAD;
            if i > 0 {
                if prev_clockwise == 0 {
                    rotation = prev_rotation + normalize_radian(rotation - prev_rotation);
                } else {
                    let passed = if prev_clockwise > 0 {
                        rotation >= prev_rotation
                    } else {
                        rotation <= prev_rotation
                    };
                    if passed {
                        prev_clockwise += if prev_clockwise > 0 { -1 } else { 1 };
                    }
                    rotation += PI_D * prev_clockwise as f32;
                }
            }
            prev_clockwise = f.clockwise;
            prev_rotation = rotation;
            timeline.rotate.push(Frame::new(
                to_seconds(position as f32),
                to_seconds(f.tween.duration as f32),
                f.tween.tween(),
                [rotation, normalize_radian(f.skew * DEG_RAD)],
            ));
            position += f.tween.duration;
        }

        let mut position = 0u32;
        for f in rb.scale_frame {
            timeline.scale.push(Frame::new(
                to_seconds(position as f32),
                to_seconds(f.tween.duration as f32),
                f.tween.tween(),
                [f.x, f.y],
            ));
            position += f.tween.duration;
        }

        if !timeline.is_empty() {
            animation.bone_timelines.push(timeline);
        }
    }

    for rs in raw.slot {
        if armature.get_slot_index(&rs.name).is_none() {
            log::warn!("Animation {} references unknown slot {}", animation.name, rs.name);
            continue;
        }
        let mut timeline = SlotTimeline {
            slot: rs.name.clone(),
            ..SlotTimeline::default()
        };

        let mut position = 0u32;
        for f in rs.display_frame {
            timeline.display.push(Frame::new(
                to_seconds(position as f32),
                to_seconds(f.duration as f32),
                Tween::None,
                f.value,
            ));
            position += f.duration;
        }

        let mut position = 0u32;
        for f in rs.color_frame {
            timeline.color.push(Frame::new(
                to_seconds(position as f32),
                to_seconds(f.tween.duration as f32),
                f.tween.tween(),
                f.value.to_color(),
            ));
            position += f.tween.duration;
        }

        let mut position = 0u32;
        for f in rs.z_index_frame {
            timeline.z_index.push(Frame::new(
                to_seconds(position as f32),
                to_seconds(f.tween.duration as f32),
                f.tween.tween(),
                f.value,
            ));
            position += f.tween.duration;
        }

        if !timeline.is_empty() {
            animation.slot_timelines.push(timeline);
        }
    }

    for rt in raw.timeline {
        let kind = match rt.kind {
            TIMELINE_ANIMATION_PROGRESS => AnimationTimelineKind::Progress,
            TIMELINE_ANIMATION_WEIGHT => AnimationTimelineKind::Weight,
            other => {
                log::warn!("Unsupported timeline type {other} in animation {}", animation.name);
                continue;
            }
        };
        let mut position = 0u32;
        let mut frames = Vec::with_capacity(rt.frame.len());
        for f in rt.frame {
            frames.push(Frame::new(
                to_seconds(position as f32),
                to_seconds(f.tween.duration as f32),
                f.tween.tween(),
                f.value,
            ));
            position += f.tween.duration;
        }
        animation.animation_timelines.push(AnimationTimeline {
            name: rt.name,
            kind,
            frames,
        });
    }

    Ok(animation)
}

/// Expand `[slot, offset, slot, offset, ...]` into a full draw order (`order[i]` is the slot drawn at `i`).
pub(crate) fn resolve_z_order(offsets: &[i32], slot_count: usize) -> Vec<usize> {
    let mut order: Vec<Option<usize>> = vec![None; slot_count];
    let mut unchanged: Vec<usize> = Vec::with_capacity(slot_count);
    let mut original = 0usize;

    for pair in offsets.chunks_exact(2) {
        let slot = pair[0].max(0) as usize;
        let offset = pair[1];
        if slot >= slot_count {
            continue;
        }
        while original < slot {
            unchanged.push(original);
            original += 1;
        }
        let target = original as i64 + offset as i64;
        if let Ok(target) = usize::try_from(target) {
            if target < slot_count && order[target].is_none() {
                order[target] = Some(original);
            } else {
                unchanged.push(original);
            }
        } else {
            unchanged.push(original);
        }
        original += 1;
    }
    while original < slot_count {
        unchanged.push(original);
        original += 1;
    }

    let mut rest = unchanged.into_iter().rev();
    let mut result = vec![0usize; slot_count];
    for i in (0..slot_count).rev() {
        result[i] = match order[i] {
            Some(slot) => slot,
            None => rest.next().unwrap_or(i),
        };
    }
    result
}

// ----- JSON schema (serde) -----

fn one() -> f32 {
    1.0
}

fn one_u32() -> u32 {
    1
}

fn yes() -> bool {
    true
}

fn hundred() -> f32 {
    100.0
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDragonBones {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    compatible_version: String,
    #[serde(default)]
    frame_rate: f32,
    #[serde(default)]
    armature: Vec<RawArmature>,
    #[serde(default)]
    user_data: Option<RawUserData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArmature {
    #[serde(default, rename = "type")]
    kind: String,
    name: String,
    #[serde(default)]
    frame_rate: Option<f32>,
    #[serde(default)]
    aabb: Option<RawRectangle>,
    #[serde(default)]
    bone: Vec<RawBone>,
    #[serde(default)]
    slot: Vec<RawSlot>,
    #[serde(default)]
    ik: Vec<RawIk>,
    #[serde(default)]
    path: Vec<RawPathConstraint>,
    #[serde(default)]
    skin: Vec<RawSkin>,
    #[serde(default)]
    animation: Vec<RawAnimation>,
    #[serde(default)]
    default_actions: Vec<RawAction>,
    #[serde(default)]
    actions: Vec<RawAction>,
    #[serde(default)]
    user_data: Option<RawUserData>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRectangle {
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
}

#[derive(Debug, Deserialize)]
struct RawTransform {
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default, rename = "skX")]
    sk_x: Option<f32>,
    #[serde(default, rename = "skY")]
    sk_y: Option<f32>,
    #[serde(default)]
    rotate: Option<f32>,
    #[serde(default)]
    skew: Option<f32>,
    #[serde(default = "one", rename = "scX")]
    sc_x: f32,
    #[serde(default = "one", rename = "scY")]
    sc_y: f32,
}

impl Default for RawTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            sk_x: None,
            sk_y: None,
            rotate: None,
            skew: None,
            sc_x: 1.0,
            sc_y: 1.0,
        }
    }
}

impl RawTransform {
    fn to_transform(&self, scale: f32) -> Transform {
        let (rotation, skew) = if self.rotate.is_some() || self.skew.is_some() {
            (
                normalize_radian(self.rotate.unwrap_or(0.0) * DEG_RAD),
                normalize_radian(self.skew.unwrap_or(0.0) * DEG_RAD),
            )
        } else {
            let rotation = normalize_radian(self.sk_y.unwrap_or(0.0) * DEG_RAD);
            let skew = normalize_radian(self.sk_x.unwrap_or(0.0) * DEG_RAD) - rotation;
            (rotation, skew)
        };
        Transform {
            x: self.x * scale,
            y: self.y * scale,
            skew,
            rotation,
            scale_x: self.sc_x,
            scale_y: self.sc_y,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBone {
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    length: f32,
    #[serde(default)]
    transform: RawTransform,
    #[serde(default = "yes")]
    inherit_translation: bool,
    #[serde(default = "yes")]
    inherit_rotation: bool,
    #[serde(default = "yes")]
    inherit_scale: bool,
    #[serde(default = "yes")]
    inherit_reflection: bool,
    #[serde(default)]
    user_data: Option<RawUserData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSlot {
    name: String,
    parent: String,
    #[serde(default)]
    display_index: i32,
    #[serde(default)]
    z_index: i32,
    #[serde(default)]
    blend_mode: Option<String>,
    #[serde(default)]
    color: Option<RawColor>,
    #[serde(default)]
    user_data: Option<RawUserData>,
}

#[derive(Debug, Deserialize)]
struct RawColor {
    #[serde(default = "hundred", rename = "aM")]
    a_m: f32,
    #[serde(default = "hundred", rename = "rM")]
    r_m: f32,
    #[serde(default = "hundred", rename = "gM")]
    g_m: f32,
    #[serde(default = "hundred", rename = "bM")]
    b_m: f32,
    #[serde(default, rename = "aO")]
    a_o: i32,
    #[serde(default, rename = "rO")]
    r_o: i32,
    #[serde(default, rename = "gO")]
    g_o: i32,
    #[serde(default, rename = "bO")]
    b_o: i32,
}

impl Default for RawColor {
    fn default() -> Self {
        Self {
            a_m: 100.0,
            r_m: 100.0,
            g_m: 100.0,
            b_m: 100.0,
            a_o: 0,
            r_o: 0,
            g_o: 0,
            b_o: 0,
        }
    }
}

impl RawColor {
    fn to_color(&self) -> ColorTransform {
        ColorTransform {
            alpha_multiplier: self.a_m * 0.01,
            red_multiplier: self.r_m * 0.01,
            green_multiplier: self.g_m * 0.01,
            blue_multiplier: self.b_m * 0.01,
            alpha_offset: self.a_o,
            red_offset: self.r_o,
            green_offset: self.g_o,
            blue_offset: self.b_o,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIk {
    name: String,
    bone: String,
    target: String,
    #[serde(default = "yes")]
    bend_positive: bool,
    #[serde(default)]
    chain: u32,
    #[serde(default = "one")]
    weight: f32,
    #[serde(default)]
    scale: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPathConstraint {
    name: String,
    target: String,
    #[serde(default)]
    target_display: String,
    #[serde(default)]
    bones: Vec<String>,
    #[serde(default)]
    position_mode: String,
    #[serde(default)]
    spacing_mode: String,
    #[serde(default)]
    rotate_mode: String,
    #[serde(default)]
    position: f32,
    #[serde(default)]
    spacing: f32,
    #[serde(default)]
    rotate_offset: f32,
    #[serde(default = "one")]
    rotate_mix: f32,
    #[serde(default = "one")]
    translate_mix: f32,
}

#[derive(Debug, Deserialize)]
struct RawSkin {
    #[serde(default)]
    name: String,
    #[serde(default)]
    slot: Vec<RawSkinSlot>,
}

#[derive(Debug, Deserialize)]
struct RawSkinSlot {
    name: String,
    #[serde(default)]
    display: Vec<Option<RawDisplay>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDisplay {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    transform: RawTransform,
    #[serde(default)]
    pivot: Option<RawPoint>,
    #[serde(default)]
    vertices: Vec<f32>,
    #[serde(default)]
    uvs: Vec<f32>,
    #[serde(default)]
    triangles: Vec<u16>,
    #[serde(default = "yes")]
    inherit_animation: bool,
    #[serde(default)]
    actions: Vec<RawAction>,
    #[serde(default)]
    sub_type: Option<String>,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    closed: bool,
    #[serde(default)]
    constant_speed: bool,
    #[serde(default)]
    lengths: Vec<f32>,
}

impl RawDisplay {
    fn into_display(self, scale: f32) -> DisplayData {
        let scaled = |v: Vec<f32>| v.into_iter().map(|x| x * scale).collect::<Vec<f32>>();
        let kind = match self.kind.as_str() {
            "mesh" => DisplayKind::Mesh {
                vertices: scaled(self.vertices),
                uvs: self.uvs,
                triangles: self.triangles,
            },
            "armature" => DisplayKind::Armature {
                inherit_animation: self.inherit_animation,
                actions: self
                    .actions
                    .into_iter()
                    .filter_map(|a| a.into_action(ActionKind::Play))
                    .collect(),
            },
            "boundingBox" => DisplayKind::BoundingBox {
                shape: match self.sub_type.as_deref() {
                    Some("ellipse") => BoundingBoxKind::Ellipse,
                    Some("polygon") => BoundingBoxKind::Polygon,
                    _ => BoundingBoxKind::Rectangle,
                },
                width: self.width * scale,
                height: self.height * scale,
                vertices: scaled(self.vertices),
            },
            "path" => DisplayKind::Path {
                vertices: scaled(self.vertices),
                closed: self.closed,
                constant_speed: self.constant_speed,
                lengths: scaled(self.lengths),
            },
            _ => DisplayKind::Image {
                pivot: self
                    .pivot
                    .map(|p| Point::new(p.x, p.y))
                    .unwrap_or(Point::new(0.5, 0.5)),
            },
        };
        DisplayData {
            path: self.path.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            transform: self.transform.to_transform(scale),
            kind,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPoint {
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
}

#[derive(Debug, Default, Deserialize)]
struct RawUserData {
    #[serde(default)]
    ints: Vec<i32>,
    #[serde(default)]
    floats: Vec<f32>,
    #[serde(default)]
    strings: Vec<String>,
}

impl RawUserData {
    fn into_user_data(self) -> UserData {
        UserData {
            ints: self.ints,
            floats: self.floats,
            strings: self.strings,
        }
    }
}

/// Action, event, or legacy `gotoAndPlay` entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAction {
    #[serde(default, rename = "type")]
    kind: Option<JsonValue>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    goto_and_play: Option<String>,
    #[serde(default)]
    bone: Option<String>,
    #[serde(default)]
    slot: Option<String>,
    #[serde(default)]
    ints: Vec<i32>,
    #[serde(default)]
    floats: Vec<f32>,
    #[serde(default)]
    strings: Vec<String>,
}

impl RawAction {
    fn into_action(self, default_kind: ActionKind) -> Option<ActionData> {
        let kind = match &self.kind {
            Some(JsonValue::String(s)) => match s.as_str() {
                "play" => ActionKind::Play,
                "frame" => ActionKind::Frame,
                "sound" => ActionKind::Sound,
                _ => default_kind,
            },
            Some(JsonValue::Number(n)) => match n.as_i64() {
                Some(0) => ActionKind::Play,
                Some(10) => ActionKind::Frame,
                Some(11) => ActionKind::Sound,
                _ => default_kind,
            },
            _ if self.goto_and_play.is_some() => ActionKind::Play,
            _ => default_kind,
        };
        let name = self.goto_and_play.or(self.name)?;
        let data = UserData {
            ints: self.ints,
            floats: self.floats,
            strings: self.strings,
        };
        Some(ActionData {
            kind,
            name,
            bone: self.bone,
            slot: self.slot,
            data: (!data.is_empty()).then_some(data),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnimation {
    name: String,
    #[serde(default = "one_u32")]
    duration: u32,
    #[serde(default = "one_u32")]
    play_times: u32,
    #[serde(default)]
    fade_in_time: f32,
    #[serde(default = "one")]
    scale: f32,
    #[serde(default)]
    frame: Vec<RawActionFrame>,
    #[serde(default)]
    z_order: Option<RawZOrderTimeline>,
    #[serde(default)]
    bone: Vec<RawBoneTimeline>,
    #[serde(default)]
    slot: Vec<RawSlotTimeline>,
    #[serde(default)]
    timeline: Vec<RawAnimationTimeline>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawActionFrame {
    #[serde(default)]
    duration: u32,
    #[serde(default)]
    events: Vec<RawAction>,
    #[serde(default)]
    actions: Vec<RawAction>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    sound: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    bone: Option<String>,
    #[serde(default)]
    slot: Option<String>,
}

impl RawActionFrame {
    fn into_actions(self) -> Vec<ActionData> {
        let legacy = |kind: ActionKind, name: String| ActionData {
            kind,
            name,
            bone: self.bone.clone(),
            slot: self.slot.clone(),
            data: None,
        };
        let mut out = Vec::new();
        if let Some(name) = self.action.clone() {
            out.push(legacy(ActionKind::Play, name));
        }
        if let Some(name) = self.event.clone() {
            out.push(legacy(ActionKind::Frame, name));
        }
        if let Some(name) = self.sound.clone() {
            out.push(legacy(ActionKind::Sound, name));
        }
        out.extend(
            self.events
                .into_iter()
                .filter_map(|e| e.into_action(ActionKind::Frame)),
        );
        out.extend(
            self.actions
                .into_iter()
                .filter_map(|a| a.into_action(ActionKind::Play)),
        );
        out
    }
}

#[derive(Debug, Deserialize)]
struct RawZOrderTimeline {
    #[serde(default)]
    frame: Vec<RawZOrderFrame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawZOrderFrame {
    #[serde(default)]
    duration: u32,
    #[serde(default)]
    z_order: Option<Vec<i32>>,
}

/// Shared keyframe header: frame duration plus easing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTween {
    #[serde(default)]
    duration: u32,
    #[serde(default)]
    tween_easing: Option<f32>,
    #[serde(default)]
    curve: Option<Vec<f32>>,
}

impl RawTween {
    /// `curve` wins over `tweenEasing`; a missing or null easing holds the frame.
    fn tween(&self) -> Tween {
        if let Some(curve) = self.curve.as_ref().filter(|c| c.len() >= 4) {
            return Tween::Curve(curve.clone());
        }
        match self.tween_easing {
            None => Tween::None,
            Some(e) if e.is_nan() => Tween::None,
            Some(e) if e == 0.0 => Tween::Line,
            Some(e) if e < 0.0 => Tween::QuadIn(-e),
            Some(e) if e <= 1.0 => Tween::QuadOut(e),
            Some(e) => Tween::QuadInOut(e - 1.0),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBoneTimeline {
    name: String,
    #[serde(default)]
    translate_frame: Vec<RawTranslateFrame>,
    #[serde(default)]
    rotate_frame: Vec<RawRotateFrame>,
    #[serde(default)]
    scale_frame: Vec<RawScaleFrame>,
}

#[derive(Debug, Deserialize)]
struct RawTranslateFrame {
    #[serde(flatten)]
    tween: RawTween,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
}

#[derive(Debug, Deserialize)]
struct RawRotateFrame {
    #[serde(flatten)]
    tween: RawTween,
    #[serde(default)]
    rotate: f32,
    #[serde(default)]
    skew: f32,
    #[serde(default)]
    clockwise: i32,
}

#[derive(Debug, Deserialize)]
struct RawScaleFrame {
    #[serde(flatten)]
    tween: RawTween,
    #[serde(default = "one")]
    x: f32,
    #[serde(default = "one")]
    y: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSlotTimeline {
    name: String,
    #[serde(default)]
    display_frame: Vec<RawDisplayFrame>,
    #[serde(default)]
    color_frame: Vec<RawColorFrame>,
    #[serde(default)]
    z_index_frame: Vec<RawValueFrame>,
}

#[derive(Debug, Deserialize)]
struct RawDisplayFrame {
    #[serde(default)]
    duration: u32,
    #[serde(default)]
    value: i32,
}

#[derive(Debug, Deserialize)]
struct RawColorFrame {
    #[serde(flatten)]
    tween: RawTween,
    #[serde(default)]
    value: RawColor,
}

#[derive(Debug, Deserialize)]
struct RawValueFrame {
    #[serde(flatten)]
    tween: RawTween,
    #[serde(default, alias = "x")]
    value: f32,
}

#[derive(Debug, Deserialize)]
struct RawAnimationTimeline {
    name: String,
    #[serde(rename = "type")]
    kind: i32,
    #[serde(default)]
    frame: Vec<RawValueFrame>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_order_offsets_move_slots() {
        // slot 0 moves two places forward among four slots
        assert_eq!(resolve_z_order(&[0, 2], 4), vec![1, 2, 0, 3]);
        // slot 3 moves to the back
        assert_eq!(resolve_z_order(&[3, -3], 4), vec![3, 0, 1, 2]);
    }

    #[test]
    fn tween_easing_maps_to_kinds() {
        let t = |e: Option<f32>| RawTween {
            duration: 1,
            tween_easing: e,
            curve: None,
        }
        .tween();
        assert_eq!(t(None), Tween::None);
        assert_eq!(t(Some(0.0)), Tween::Line);
        assert_eq!(t(Some(-0.5)), Tween::QuadIn(0.5));
        assert_eq!(t(Some(1.0)), Tween::QuadOut(1.0));
        assert_eq!(t(Some(2.0)), Tween::QuadInOut(1.0));
    }
}
