use dragonbones_geom::{Point, Transform};

use crate::model::user_data::ActionData;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BoundingBoxKind {
    Rectangle,
    Ellipse,
    Polygon,
}

/// Variant payload of a display entry.
#[derive(Clone, Debug, PartialEq)]
pub enum DisplayKind {
    Image {
        /// Normalized pivot inside the texture frame.
        pivot: Point,
    },
    Mesh {
        /// Interleaved x,y in slot space.
        vertices: Vec<f32>,
        uvs: Vec<f32>,
        triangles: Vec<u16>,
    },
    Armature {
        inherit_animation: bool,
        actions: Vec<ActionData>,
    },
    BoundingBox {
        shape: BoundingBoxKind,
        width: f32,
        height: f32,
        vertices: Vec<f32>,
    },
    Path {
        /// Interleaved x,y bezier control points: anchor, out, in, anchor, ...
        vertices: Vec<f32>,
        closed: bool,
        constant_speed: bool,
        /// Cumulative curve lengths.
        lengths: Vec<f32>,
    },
}

/// One attachable display. `path` names the texture (images, meshes) or the armature (armature displays).
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayData {
    pub name: String,
    pub path: String,
    pub transform: Transform,
    pub kind: DisplayKind,
}

impl DisplayData {
    pub fn image(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            name,
            transform: Transform::IDENTITY,
            kind: DisplayKind::Image {
                pivot: Point::new(0.5, 0.5),
            },
        }
    }

    #[inline]
    pub fn is_armature(&self) -> bool {
        matches!(self.kind, DisplayKind::Armature { .. })
    }

    /// True for displays that need a texture region.
    #[inline]
    pub fn needs_texture(&self) -> bool {
        matches!(self.kind, DisplayKind::Image { .. } | DisplayKind::Mesh { .. })
    }
}
