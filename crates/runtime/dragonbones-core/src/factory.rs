//! Asset registry and armature builder.
//!
//! A [`Factory`] is an explicit context object: it owns the parsed skeleton and
//! atlas data, builds armatures from them and keeps recycled armatures for reuse.
//! Rendering stays outside; a [`DisplayBackend`] hands out the proxies slots and
//! armatures push their state to.

use std::rc::Rc;

use hashbrown::HashMap;

use crate::animation::AnimationFadeOutMode;
use crate::armature::{Armature, Bone, Constraint, DisplayFrame, NullProxy, RenderProxy, Slot};
use crate::config::RuntimeConfig;
use crate::error::ParseError;
use crate::model::{
    ActionData, ActionKind, ArmatureData, ConstraintData, DisplayData, DisplayKind,
    DragonBonesData, SkinData, SlotData, TextureAtlasData, TextureData,
};
use crate::parser::{DataParser, JsonDataParser};
use crate::pool::ObjectPool;

/// Producer of render proxies for newly built armatures and slots.
pub trait DisplayBackend {
    fn armature_proxy(&mut self, armature: &ArmatureData) -> Box<dyn RenderProxy>;
    fn slot_proxy(&mut self, armature: &ArmatureData, slot: &SlotData) -> Box<dyn RenderProxy>;
}

/// Backend for headless use: every proxy is a [`NullProxy`].
#[derive(Copy, Clone, Debug, Default)]
pub struct NullBackend;

impl DisplayBackend for NullBackend {
    fn armature_proxy(&mut self, _armature: &ArmatureData) -> Box<dyn RenderProxy> {
        Box::new(NullProxy)
    }

    fn slot_proxy(&mut self, _armature: &ArmatureData, _slot: &SlotData) -> Box<dyn RenderProxy> {
        Box::new(NullProxy)
    }
}

/// Everything resolved before an armature is built.
#[derive(Clone, Debug)]
struct BuildPackage {
    data_name: String,
    texture_atlas_name: String,
    armature: Rc<ArmatureData>,
    skin: Option<Rc<SkinData>>,
}

pub struct Factory<P: DataParser = JsonDataParser> {
    parser: P,
    backend: Box<dyn DisplayBackend>,
    config: RuntimeConfig,
    /// Search every registered data set when the named one lacks an armature or skin.
    pub auto_search: bool,
    data_names: Vec<String>,
    dragonbones: HashMap<String, Rc<DragonBonesData>>,
    atlas_names: Vec<String>,
    atlases: HashMap<String, Vec<Rc<TextureAtlasData>>>,
    armature_pool: ObjectPool<Armature>,
}

impl Default for Factory<JsonDataParser> {
    fn default() -> Self {
        Self::new(JsonDataParser::new())
    }
}

impl<P: DataParser> Factory<P> {
    pub fn new(parser: P) -> Self {
        Self::with_config(parser, RuntimeConfig::default())
    }

    pub fn with_config(parser: P, config: RuntimeConfig) -> Self {
        Self {
            parser,
            backend: Box::new(NullBackend),
            auto_search: config.auto_search,
            config,
            data_names: Vec::new(),
            dragonbones: HashMap::new(),
            atlas_names: Vec::new(),
            atlases: HashMap::new(),
            armature_pool: ObjectPool::new(),
        }
    }

    pub fn set_backend(&mut self, backend: Box<dyn DisplayBackend>) {
        self.backend = backend;
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Parse a skeleton payload and register it under `name` (or the name it declares).
    pub fn parse_dragonbones_data(
        &mut self,
        raw: &str,
        name: Option<&str>,
        scale: f32,
    ) -> Result<Rc<DragonBonesData>, ParseError> {
        let data = Rc::new(self.parser.parse_dragonbones_data(raw, scale)?);
        let name = name.map_or_else(|| data.name.clone(), str::to_string);
        self.add_dragonbones_data(data.clone(), Some(&name));
        Ok(data)
    }

    /// Parse an atlas description and register it under `name` (or the name it declares).
    pub fn parse_texture_atlas_data(
        &mut self,
        raw: &str,
        name: Option<&str>,
        scale: f32,
    ) -> Result<Rc<TextureAtlasData>, ParseError> {
        let mut atlas = TextureAtlasData::new(name.unwrap_or_default(), "");
        self.parser.parse_texture_atlas_data(raw, &mut atlas, scale)?;
        let atlas = Rc::new(atlas);
        let name = name.map_or_else(|| atlas.name.clone(), str::to_string);
        self.add_texture_atlas_data(atlas.clone(), Some(&name));
        Ok(atlas)
    }

    /// Register `data`. A different data set already registered under the name wins.
    pub fn add_dragonbones_data(&mut self, data: Rc<DragonBonesData>, name: Option<&str>) -> bool {
        let name = name.unwrap_or(&data.name).to_string();
        if let Some(existing) = self.dragonbones.get(&name) {
            if !Rc::ptr_eq(existing, &data) {
                log::warn!("Can not add same name data: {name}");
            }
            return false;
        }
        self.data_names.push(name.clone());
        self.dragonbones.insert(name, data);
        true
    }

    pub fn get_dragonbones_data(&self, name: &str) -> Option<&Rc<DragonBonesData>> {
        self.dragonbones.get(name)
    }

    pub fn remove_dragonbones_data(&mut self, name: &str) -> Option<Rc<DragonBonesData>> {
        let removed = self.dragonbones.remove(name)?;
        self.data_names.retain(|n| n != name);
        Some(removed)
    }

    /// Atlases accumulate per name; the same atlas is only added once.
    pub fn add_texture_atlas_data(&mut self, atlas: Rc<TextureAtlasData>, name: Option<&str>) {
        let name = name.unwrap_or(&atlas.name).to_string();
        let list = self.atlases.entry(name.clone()).or_default();
        if list.iter().any(|a| Rc::ptr_eq(a, &atlas)) {
            return;
        }
        if list.is_empty() {
            self.atlas_names.push(name);
        }
        list.push(atlas);
    }

    pub fn get_texture_atlas_data(&self, name: &str) -> Option<&[Rc<TextureAtlasData>]> {
        self.atlases.get(name).map(Vec::as_slice)
    }

    pub fn remove_texture_atlas_data(&mut self, name: &str) -> Option<Vec<Rc<TextureAtlasData>>> {
        let removed = self.atlases.remove(name)?;
        self.atlas_names.retain(|n| n != name);
        Some(removed)
    }

    /// Drop every registered data set, atlas and recycled armature.
    pub fn clear(&mut self) {
        self.data_names.clear();
        self.dragonbones.clear();
        self.atlas_names.clear();
        self.atlases.clear();
        self.armature_pool.clear();
    }

    pub fn get_armature_data(&self, name: &str, data_name: Option<&str>) -> Option<Rc<ArmatureData>> {
        self.fill_build_package(name, data_name.unwrap_or(""), "", "")
            .map(|p| p.armature)
    }

    fn fill_build_package(
        &self,
        armature_name: &str,
        data_name: &str,
        skin_name: &str,
        atlas_name: &str,
    ) -> Option<BuildPackage> {
        let mut found: Option<(String, Rc<ArmatureData>)> = None;
        if !data_name.is_empty() {
            if let Some(data) = self.dragonbones.get(data_name) {
                found = data
                    .get_armature(armature_name)
                    .map(|a| (data_name.to_string(), a.clone()));
            }
        }
        if found.is_none() && (data_name.is_empty() || self.auto_search) {
            found = self.data_names.iter().find_map(|name| {
                let data = self.dragonbones.get(name)?;
                if !data_name.is_empty() && !data.auto_search {
                    return None;
                }
                data.get_armature(armature_name).map(|a| (name.clone(), a.clone()))
            });
        }
        let (data_name, armature) = found?;

        let mut skin = None;
        if !skin_name.is_empty() {
            skin = armature.get_skin(skin_name).cloned();
            if skin.is_none() && self.auto_search {
                skin = self.data_names.iter().find_map(|name| {
                    self.dragonbones
                        .get(name)?
                        .get_armature(skin_name)?
                        .default_skin()
                        .cloned()
                });
            }
        }
        if skin.is_none() {
            skin = armature.default_skin().cloned();
        }

        Some(BuildPackage {
            data_name,
            texture_atlas_name: atlas_name.to_string(),
            armature,
            skin,
        })
    }

    /// Texture `name` from atlas `atlas_name`; with auto-search (or no atlas name) every atlas is scanned.
    pub fn get_texture_data(&self, atlas_name: &str, name: &str) -> Option<Rc<TextureData>> {
        if let Some(list) = self.atlases.get(atlas_name) {
            if let Some(texture) = list.iter().find_map(|a| a.get_texture(name)) {
                return Some(texture.clone());
            }
        }
        if atlas_name.is_empty() || self.auto_search {
            return self
                .atlas_names
                .iter()
                .filter_map(|n| self.atlases.get(n))
                .flatten()
                .find_map(|a| a.get_texture(name))
                .cloned();
        }
        None
    }

    /// Build armature `name`. Returns `None` (and logs) when no registered data has it.
    pub fn build_armature(
        &mut self,
        name: &str,
        data_name: Option<&str>,
        skin_name: Option<&str>,
        atlas_name: Option<&str>,
    ) -> Option<Armature> {
        let package = self.fill_build_package(
            name,
            data_name.unwrap_or(""),
            skin_name.unwrap_or(""),
            atlas_name.unwrap_or(""),
        );
        let Some(package) = package else {
            log::warn!(
                "No armature data: {name}, {}",
                data_name.unwrap_or("")
            );
            return None;
        };
        let mut armature = self.build_from_package(&package);
        for action in &package.armature.default_actions {
            armature.buffer_action(action.clone());
        }
        armature.advance_time(0.0);
        Some(armature)
    }

    fn build_from_package(&mut self, package: &BuildPackage) -> Armature {
        let data = package.armature.clone();
        let bones = data
            .bones
            .iter()
            .enumerate()
            .map(|(i, b)| Bone::new(i, b))
            .collect();
        let slots = self.build_slots(package);
        let constraints = self.build_constraints(package);
        let proxy = self.backend.armature_proxy(&data);

        let mut armature = if self.armature_pool.idle_count() > 0 {
            let mut recycled = self.armature_pool.borrow_object();
            recycled.init(data, bones, slots, constraints, proxy);
            recycled
        } else {
            Armature::new(data, bones, slots, constraints, proxy, &self.config)
        };
        if self.config.default_cache_frame_rate > 0.0 {
            armature.set_cache_frame_rate(self.config.default_cache_frame_rate);
        }
        armature.invalidate_update(None, true);
        armature
    }

    fn build_slots(&mut self, package: &BuildPackage) -> Vec<Slot> {
        let data = &package.armature;
        let default_skin = data.default_skin();
        let skin = package.skin.as_ref();
        let mut slots = Vec::with_capacity(data.slots.len());

        for (index, slot_data) in data.slots.iter().enumerate() {
            let from_skin = skin
                .filter(|s| default_skin.map_or(true, |d| !Rc::ptr_eq(*s, d)))
                .and_then(|s| s.get_displays(&slot_data.name));
            let (displays, from_default_skin) = match from_skin {
                Some(displays) => (Some(displays), false),
                None => (
                    default_skin.and_then(|s| s.get_displays(&slot_data.name)),
                    true,
                ),
            };

            let mut frames = Vec::new();
            for display in displays.unwrap_or_default() {
                let mut frame = DisplayFrame::new(display.clone(), from_default_skin);
                if let Some(display) = display {
                    frame.texture = self.display_texture(package, display);
                    if display.is_armature() {
                        frame.armature = self
                            .build_child_armature(&package.data_name, display)
                            .map(Box::new);
                        if let Some(child) = frame.armature.as_deref_mut() {
                            start_child_armature(child, display);
                        }
                    }
                }
                frames.push(frame);
            }

            let proxy = self.backend.slot_proxy(data, slot_data);
            slots.push(Slot::new(index, slot_data, frames, proxy));
        }
        slots
    }

    fn display_texture(&self, package: &BuildPackage, display: &DisplayData) -> Option<Rc<TextureData>> {
        if !display.needs_texture() {
            return None;
        }
        let atlas = if package.texture_atlas_name.is_empty() {
            package.data_name.as_str()
        } else {
            package.texture_atlas_name.as_str()
        };
        self.get_texture_data(atlas, &display.path)
    }

    /// Build the armature named by an armature display, without running its default actions.
    fn build_child_armature(&mut self, data_name: &str, display: &DisplayData) -> Option<Armature> {
        let package = self.fill_build_package(&display.path, data_name, "", "")?;
        let mut child = self.build_from_package(&package);
        if let DisplayKind::Armature {
            inherit_animation, ..
        } = display.kind
        {
            child.inherit_animation = inherit_animation;
        }
        child.advance_time(0.0);
        Some(child)
    }

    fn build_constraints(&self, package: &BuildPackage) -> Vec<Constraint> {
        let data = &package.armature;
        let mut constraints = Vec::with_capacity(data.constraints.len());
        let mut ordered: Vec<&ConstraintData> = data.constraints.iter().collect();
        ordered.sort_by_key(|c| c.order());
        for constraint in ordered {
            let path_display = match constraint {
                ConstraintData::Path(path) => data.slots.get(path.target).and_then(|slot| {
                    package
                        .skin
                        .as_ref()
                        .and_then(|s| s.get_display(&slot.name, &path.path_display))
                        .or_else(|| {
                            data.default_skin()
                                .and_then(|s| s.get_display(&slot.name, &path.path_display))
                        })
                }),
                ConstraintData::Ik(_) => None,
            };
            if let Some(c) = Constraint::from_data(constraint, path_display.map(|d| &d.kind)) {
                constraints.push(c);
            }
        }
        constraints
    }

    /// Show `display` in `slot` at `index` (negative: the current display index, or 0).
    /// Armature displays get a freshly built child armature.
    pub fn replace_display(&mut self, slot: &mut Slot, display: Option<Rc<DisplayData>>, index: i32) {
        let index = (if index >= 0 {
            index
        } else {
            slot.display_index().max(0)
        }) as usize;

        let texture = display
            .as_deref()
            .filter(|d| d.needs_texture())
            .and_then(|d| self.get_texture_data("", &d.path));
        let child = display
            .as_deref()
            .filter(|d| d.is_armature())
            .and_then(|d| self.build_child_armature("", d));

        slot.replace_display_data(display.clone(), index);
        slot.replace_texture_data(texture, index);
        let old = slot.replace_child_armature(child.map(Box::new), index);
        if let Some(mut old) = old {
            old.dispose();
        }
        if let (Some(display), Some(child)) = (
            display,
            slot.display_frames
                .get_mut(index)
                .and_then(|f| f.armature.as_deref_mut()),
        ) {
            start_child_armature(child, &display);
        }
    }

    /// Show display `display_name` of `slot_name` from the default skin of `armature_name`.
    pub fn replace_slot_display(
        &mut self,
        data_name: Option<&str>,
        armature_name: &str,
        slot_name: &str,
        display_name: &str,
        slot: &mut Slot,
        index: i32,
    ) -> bool {
        let Some(armature) = self.get_armature_data(armature_name, data_name) else {
            return false;
        };
        let Some(skin) = armature.default_skin() else {
            return false;
        };
        let display = skin.get_display(slot_name, display_name).cloned();
        self.replace_display(slot, display, index);
        true
    }

    /// Replace every display of `slot` with the list of `slot_name` in the default skin of `armature_name`.
    pub fn replace_slot_display_list(
        &mut self,
        data_name: Option<&str>,
        armature_name: &str,
        slot_name: &str,
        slot: &mut Slot,
    ) -> bool {
        let Some(armature) = self.get_armature_data(armature_name, data_name) else {
            return false;
        };
        let Some(displays) = armature
            .default_skin()
            .and_then(|s| s.get_displays(slot_name))
            .map(<[_]>::to_vec)
        else {
            return false;
        };
        for (i, display) in displays.into_iter().enumerate() {
            self.replace_display(slot, display, i as i32);
        }
        true
    }

    /// Swap the skin displays of every slot not in `exclude`. Slots the skin does not
    /// cover fall back to the armature's default skin; slots neither covers are
    /// emptied when `is_override` is set.
    pub fn replace_skin(
        &mut self,
        armature: &mut Armature,
        skin: &SkinData,
        is_override: bool,
        exclude: &[&str],
    ) -> bool {
        let data = armature.armature_data().clone();
        let default_skin = data.default_skin().cloned();
        let is_default = default_skin.as_deref().is_some_and(|d| d.name == skin.name);
        let mut success = false;

        for slot in armature.get_slots_mut() {
            if exclude.contains(&slot.name()) {
                continue;
            }
            let (displays, from_default) = match skin.get_displays(slot.name()) {
                Some(d) => (d.to_vec(), is_default),
                None => {
                    let fallback = default_skin
                        .as_ref()
                        .filter(|_| !is_default)
                        .and_then(|d| d.get_displays(slot.name()));
                    match fallback {
                        Some(d) => (d.to_vec(), true),
                        None => {
                            if is_override {
                                for old in slot.set_display_frames(Vec::new()) {
                                    dispose_frame(old);
                                }
                            }
                            continue;
                        }
                    }
                }
            };

            let mut frames = Vec::with_capacity(displays.len());
            for display in &displays {
                let mut frame = DisplayFrame::new(display.clone(), from_default);
                if let Some(display) = display {
                    if display.needs_texture() {
                        frame.texture = self.get_texture_data(&data.parent_name, &display.path);
                    }
                    if display.is_armature() {
                        frame.armature = self
                            .build_child_armature(&data.parent_name, display)
                            .map(Box::new);
                        if let Some(child) = frame.armature.as_deref_mut() {
                            start_child_armature(child, display);
                        }
                    }
                }
                frames.push(frame);
            }
            for old in slot.set_display_frames(frames) {
                dispose_frame(old);
            }
            success = true;
        }
        success
    }

    /// Give `armature` the animations of `source`: merged over its own, or replacing them with `is_override`.
    /// Child armatures shown by the default skin follow recursively.
    pub fn replace_animation(
        &self,
        armature: &mut Armature,
        source: &ArmatureData,
        is_override: bool,
    ) -> bool {
        let Some(skin) = source.default_skin().cloned() else {
            return false;
        };
        let incoming = source
            .animation_names()
            .iter()
            .filter_map(|n| source.get_animation(n).cloned());
        {
            let mut animation = armature.animation_mut();
            if is_override {
                animation.set_animations(incoming);
            } else {
                let mut merged: Vec<_> = animation
                    .animation_names()
                    .iter()
                    .filter(|n| source.get_animation(n).is_none())
                    .filter_map(|n| animation.animations().get(n).cloned())
                    .collect();
                merged.extend(incoming);
                animation.set_animations(merged);
            }
        }

        for slot in armature.get_slots_mut() {
            let Some(displays) = skin.get_displays(slot.name()) else {
                continue;
            };
            for (i, frame) in slot.display_frames.iter_mut().enumerate() {
                let Some(child) = frame.armature.as_deref_mut() else {
                    continue;
                };
                let Some(Some(display)) = displays.get(i) else {
                    continue;
                };
                if !display.is_armature() {
                    continue;
                }
                if let Some(child_data) = self.get_armature_data(&display.path, Some(&source.parent_name)) {
                    self.replace_animation(child, &child_data, is_override);
                }
            }
        }
        true
    }

    /// Hand an armature back for reuse by later builds.
    pub fn recycle_armature(&mut self, armature: Armature) {
        log::debug!("armature {} recycled", armature.name());
        self.armature_pool.return_object(armature);
    }

    /// Recycled armatures waiting for reuse.
    pub fn recycled_count(&self) -> usize {
        self.armature_pool.idle_count()
    }
}

/// Start a child armature that does not follow its parent: the display's actions,
/// else its own default actions, else its default animation.
fn start_child_armature(child: &mut Armature, display: &DisplayData) {
    if child.inherit_animation {
        return;
    }
    let display_actions: &[ActionData] = match &display.kind {
        DisplayKind::Armature { actions, .. } => actions,
        _ => &[],
    };
    let data = child.armature_data().clone();
    let actions = if display_actions.is_empty() {
        data.default_actions.as_slice()
    } else {
        display_actions
    };
    let mut animation = child.animation_mut();
    if actions.is_empty() {
        animation.play(None, -1);
        return;
    }
    for action in actions.iter().filter(|a| a.kind == ActionKind::Play) {
        animation.fade_in(
            &action.name,
            -1.0,
            -1,
            0,
            None,
            AnimationFadeOutMode::SameLayerAndGroup,
        );
    }
}

fn dispose_frame(mut frame: DisplayFrame) {
    if let Some(mut child) = frame.take_armature() {
        child.dispose();
    }
}
