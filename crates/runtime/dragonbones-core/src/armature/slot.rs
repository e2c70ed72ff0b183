//! Runtime slot: display list, color, z-index and the proxy it drives.

use std::fmt;
use std::rc::Rc;

use dragonbones_geom::{ColorTransform, Matrix, Transform};

use super::bone::Bone;
use super::proxy::{DisplayRef, RenderProxy};
use super::Armature;
use crate::model::{BlendMode, DisplayData, FrameCache, SlotData, TextureData};

/// One entry of a slot's display list.
#[derive(Default)]
pub struct DisplayFrame {
    /// Display from the skin the slot was built with.
    pub(crate) raw: Option<Rc<DisplayData>>,
    /// User replacement shown instead of `raw`.
    pub(crate) replaced: Option<Rc<DisplayData>>,
    pub(crate) texture: Option<Rc<TextureData>>,
    pub(crate) armature: Option<Box<Armature>>,
    pub(crate) from_default_skin: bool,
}

impl DisplayFrame {
    pub(crate) fn new(raw: Option<Rc<DisplayData>>, from_default_skin: bool) -> Self {
        Self {
            raw,
            from_default_skin,
            ..Default::default()
        }
    }

    /// The display actually shown.
    pub fn display(&self) -> Option<&Rc<DisplayData>> {
        self.replaced.as_ref().or(self.raw.as_ref())
    }

    pub fn raw_display(&self) -> Option<&Rc<DisplayData>> {
        self.raw.as_ref()
    }

    pub fn texture(&self) -> Option<&Rc<TextureData>> {
        self.texture.as_ref()
    }

    pub fn armature(&self) -> Option<&Armature> {
        self.armature.as_deref()
    }

    /// Release any child armature and return it to the caller.
    pub(crate) fn take_armature(&mut self) -> Option<Box<Armature>> {
        self.armature.take()
    }
}

impl fmt::Debug for DisplayFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayFrame")
            .field("display", &self.display().map(|d| d.name.as_str()))
            .field("texture", &self.texture.as_ref().map(|t| t.name.as_str()))
            .field("armature", &self.armature.as_ref().map(|a| a.name()))
            .finish()
    }
}

pub struct Slot {
    pub(crate) index: usize,
    pub(crate) name: String,
    /// Bone carrying this slot.
    pub(crate) parent: usize,
    pub(crate) setup: SlotData,
    pub(crate) display_index: i32,
    pub(crate) display_frames: Vec<DisplayFrame>,
    pub(crate) color: ColorTransform,
    pub(crate) blend_mode: BlendMode,
    pub(crate) z_index: i32,
    pub(crate) visible: bool,
    /// Animation state name or group allowed to drive this slot; `None` lets any state.
    pub(crate) display_controller: Option<String>,
    pub(crate) global_matrix: Matrix,
    local_matrix: Matrix,
    pub(crate) display_dirty: bool,
    pub(crate) color_dirty: bool,
    pub(crate) transform_dirty: bool,
    visible_dirty: bool,
    blend_dirty: bool,
    /// Row of this slot in the bound animation's cache tables.
    pub(crate) cache_index: Option<usize>,
    cached_record: i32,
    proxy: Box<dyn RenderProxy>,
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("display_index", &self.display_index)
            .field("display_frames", &self.display_frames)
            .field("z_index", &self.z_index)
            .finish()
    }
}

impl Slot {
    pub(crate) fn new(
        index: usize,
        data: &SlotData,
        display_frames: Vec<DisplayFrame>,
        proxy: Box<dyn RenderProxy>,
    ) -> Self {
        Self {
            index,
            name: data.name.clone(),
            parent: data.parent,
            setup: data.clone(),
            display_index: data.display_index,
            display_frames,
            color: data.color,
            blend_mode: data.blend_mode,
            z_index: data.z_index,
            visible: true,
            display_controller: None,
            global_matrix: Matrix::IDENTITY,
            local_matrix: Matrix::IDENTITY,
            display_dirty: true,
            color_dirty: true,
            transform_dirty: true,
            visible_dirty: true,
            blend_dirty: true,
            cache_index: None,
            cached_record: -1,
            proxy,
        }
    }

    /// Position of this slot in the armature's slot list.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> usize {
        self.parent
    }

    pub fn display_index(&self) -> i32 {
        self.display_index
    }

    /// Show display `index`; -1 hides the slot. Out-of-range indices are ignored.
    pub fn set_display_index(&mut self, index: i32) {
        if index >= self.display_frames.len() as i32 || index < -1 {
            log::warn!("slot {}: display index {index} out of range", self.name);
            return;
        }
        if self.display_index != index {
            self.display_index = index;
            self.display_dirty = true;
        }
    }

    pub fn display_frames(&self) -> &[DisplayFrame] {
        &self.display_frames
    }

    pub fn display_frame_count(&self) -> usize {
        self.display_frames.len()
    }

    pub(crate) fn current_frame(&self) -> Option<&DisplayFrame> {
        usize::try_from(self.display_index)
            .ok()
            .and_then(|i| self.display_frames.get(i))
    }

    fn current_frame_mut(&mut self) -> Option<&mut DisplayFrame> {
        usize::try_from(self.display_index)
            .ok()
            .and_then(|i| self.display_frames.get_mut(i))
    }

    /// Display currently shown.
    pub fn display(&self) -> Option<&Rc<DisplayData>> {
        self.current_frame().and_then(DisplayFrame::display)
    }

    /// Child armature hosted by the current display.
    pub fn child_armature(&self) -> Option<&Armature> {
        self.current_frame().and_then(DisplayFrame::armature)
    }

    pub fn child_armature_mut(&mut self) -> Option<&mut Armature> {
        self.current_frame_mut().and_then(|f| f.armature.as_deref_mut())
    }

    /// Every child armature in the display list, shown or not.
    pub(crate) fn child_armatures_mut(&mut self) -> impl Iterator<Item = &mut Armature> {
        self.display_frames
            .iter_mut()
            .filter_map(|f| f.armature.as_deref_mut())
    }

    /// Show `display` instead of the skin display at `index`. `None` restores the skin display.
    pub fn replace_display_data(&mut self, display: Option<Rc<DisplayData>>, index: usize) {
        if index >= self.display_frames.len() {
            self.display_frames.resize_with(index + 1, DisplayFrame::default);
        }
        let frame = &mut self.display_frames[index];
        frame.replaced = display;
        if index as i32 == self.display_index {
            self.display_dirty = true;
        }
    }

    pub fn replace_texture_data(&mut self, texture: Option<Rc<TextureData>>, index: usize) {
        if index >= self.display_frames.len() {
            self.display_frames.resize_with(index + 1, DisplayFrame::default);
        }
        self.display_frames[index].texture = texture;
        if index as i32 == self.display_index {
            self.display_dirty = true;
        }
    }

    /// Host `armature` in display frame `index`. Returns the armature it replaced.
    pub(crate) fn replace_child_armature(
        &mut self,
        armature: Option<Box<Armature>>,
        index: usize,
    ) -> Option<Box<Armature>> {
        if index >= self.display_frames.len() {
            self.display_frames.resize_with(index + 1, DisplayFrame::default);
        }
        if index as i32 == self.display_index {
            self.display_dirty = true;
        }
        std::mem::replace(&mut self.display_frames[index].armature, armature)
    }

    /// Replace the whole display list. Returns the previous frames.
    pub(crate) fn set_display_frames(&mut self, frames: Vec<DisplayFrame>) -> Vec<DisplayFrame> {
        self.display_dirty = true;
        if self.display_index >= frames.len() as i32 {
            self.display_index = frames.len() as i32 - 1;
        }
        std::mem::replace(&mut self.display_frames, frames)
    }

    pub fn color(&self) -> &ColorTransform {
        &self.color
    }

    pub fn set_color(&mut self, color: ColorTransform) {
        if self.color != color {
            self.color = color;
            self.color_dirty = true;
        }
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        if self.blend_mode != mode {
            self.blend_mode = mode;
            self.blend_dirty = true;
        }
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            self.visible_dirty = true;
        }
    }

    pub fn display_controller(&self) -> Option<&str> {
        self.display_controller.as_deref()
    }

    pub fn set_display_controller(&mut self, controller: Option<String>) {
        self.display_controller = controller;
    }

    pub fn global_matrix(&self) -> &Matrix {
        &self.global_matrix
    }

    pub fn proxy(&self) -> &dyn RenderProxy {
        self.proxy.as_ref()
    }

    pub fn proxy_mut(&mut self) -> &mut dyn RenderProxy {
        self.proxy.as_mut()
    }

    pub fn invalidate_update(&mut self) {
        self.display_dirty = true;
        self.color_dirty = true;
        self.transform_dirty = true;
    }

    /// Whether an animation state with `name` and `group` may drive this slot's display.
    pub(crate) fn accepts_controller(&self, name: &str, group: &str) -> bool {
        match self.display_controller.as_deref() {
            None => true,
            Some(c) => c == name || (!group.is_empty() && c == group),
        }
    }

    /// Restore setup display, color and z-index.
    pub(crate) fn reset_to_setup(&mut self) {
        self.set_display_index(self.setup.display_index.min(self.display_frames.len() as i32 - 1));
        self.set_color(self.setup.color);
        self.z_index = self.setup.z_index;
    }

    pub(crate) fn notify_z_order(&mut self, draw_index: usize) {
        self.proxy.update_z_order(draw_index);
    }

    pub(crate) fn destroy(&mut self) {
        self.proxy.destroy();
    }

    pub(crate) fn update(&mut self, bone: &Bone, cache: Option<(&FrameCache, usize)>) {
        if self.display_dirty {
            self.display_dirty = false;
            self.refresh_display();
        }
        if self.blend_dirty {
            self.blend_dirty = false;
            self.proxy.update_blend_mode(self.blend_mode);
        }
        if self.color_dirty {
            self.color_dirty = false;
            self.proxy.update_color(&self.color);
        }
        if self.visible_dirty {
            self.visible_dirty = false;
            self.proxy.update_visible(self.visible && bone.visible);
        }

        let cache = cache.zip(self.cache_index);
        if let Some(((cache, frame), row)) = cache {
            let record = cache.slot_record(row, frame);
            if record >= 0 {
                if self.cached_record != record {
                    self.cached_record = record;
                    let mut scratch = Transform::IDENTITY;
                    cache.read(record, &mut self.global_matrix, &mut scratch);
                    self.proxy.update_transform(&self.global_matrix);
                }
                self.transform_dirty = false;
                return;
            }
        } else {
            self.cached_record = -1;
        }

        if self.transform_dirty || bone.children_dirty {
            self.transform_dirty = false;
            self.global_matrix = self.local_matrix;
            self.global_matrix.concat(&bone.global_matrix);
            if let Some(((cache, frame), row)) = cache {
                self.cached_record =
                    cache.store_slot(row, frame, &self.global_matrix, &Transform::IDENTITY);
            }
            self.proxy.update_transform(&self.global_matrix);
        } else if let Some(((cache, frame), row)) = cache {
            if self.cached_record >= 0 {
                cache.link_slot(row, frame, self.cached_record);
            }
        }
    }

    fn refresh_display(&mut self) {
        let index = self.display_index;
        let frame = usize::try_from(index)
            .ok()
            .and_then(|i| self.display_frames.get(i));
        let display = frame.and_then(DisplayFrame::display).cloned();
        let texture = frame.and_then(|f| f.texture.clone());
        let is_armature = frame.is_some_and(|f| f.armature.is_some());

        self.local_matrix = display
            .as_ref()
            .map(|d| d.transform.matrix())
            .unwrap_or(Matrix::IDENTITY);
        self.proxy.update_display(DisplayRef {
            index,
            display: display.as_deref(),
            texture: texture.as_deref(),
            is_armature,
        });
        self.transform_dirty = true;
        self.cached_record = -1;
    }
}
