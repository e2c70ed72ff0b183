//! Render seam. Slots and armatures push state changes to a host-supplied proxy;
//! the core never touches a renderer directly.

use dragonbones_geom::{ColorTransform, Matrix};

use crate::model::{BlendMode, DisplayData, TextureData};

/// The display a slot currently shows, as handed to its proxy.
#[derive(Copy, Clone, Debug)]
pub struct DisplayRef<'a> {
    /// -1 when the slot shows nothing.
    pub index: i32,
    pub display: Option<&'a DisplayData>,
    pub texture: Option<&'a TextureData>,
    /// True when the display is a child armature.
    pub is_armature: bool,
}

pub trait RenderProxy {
    fn update_transform(&mut self, matrix: &Matrix);
    fn update_color(&mut self, color: &ColorTransform);
    fn update_display(&mut self, display: DisplayRef<'_>);
    fn destroy(&mut self);

    fn update_visible(&mut self, _visible: bool) {}
    /// New position of the slot in draw order.
    fn update_z_order(&mut self, _draw_index: usize) {}
    fn update_blend_mode(&mut self, _mode: BlendMode) {}
}

/// Proxy that discards everything; used for headless armatures.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullProxy;

impl RenderProxy for NullProxy {
    fn update_transform(&mut self, _matrix: &Matrix) {}
    fn update_color(&mut self, _color: &ColorTransform) {}
    fn update_display(&mut self, _display: DisplayRef<'_>) {}
    fn destroy(&mut self) {}
}
