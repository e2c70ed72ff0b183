//! Texture atlas JSON (`{ imagePath, width, height, SubTexture: [...] }`).

use dragonbones_geom::Rectangle;
use serde::Deserialize;

use crate::error::ParseError;
use crate::model::{TextureAtlasData, TextureData};

pub fn parse_texture_atlas_json(
    raw: &str,
    target: &mut TextureAtlasData,
    scale: f32,
) -> Result<(), ParseError> {
    let atlas: RawAtlas = serde_json::from_str(raw)?;
    if target.name.is_empty() {
        target.name = atlas.name;
    }
    if target.image_path.is_empty() {
        target.image_path = atlas.image_path;
    }
    target.width = atlas.width;
    target.height = atlas.height;
    target.scale = if scale > 0.0 {
        scale
    } else if atlas.scale > 0.0 {
        1.0 / atlas.scale
    } else {
        1.0
    };

    for sub in atlas.sub_texture {
        let frame = match (sub.frame_width, sub.frame_height) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Some(Rectangle::new(
                sub.frame_x.unwrap_or(0.0),
                sub.frame_y.unwrap_or(0.0),
                w,
                h,
            )),
            _ => None,
        };
        target.add_texture(TextureData {
            name: sub.name,
            rotated: sub.rotated,
            region: Rectangle::new(sub.x, sub.y, sub.width, sub.height),
            frame,
            atlas: String::new(),
        });
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAtlas {
    #[serde(default)]
    name: String,
    #[serde(default)]
    image_path: String,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default = "one")]
    scale: f32,
    #[serde(default, rename = "SubTexture")]
    sub_texture: Vec<RawSubTexture>,
}

fn one() -> f32 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubTexture {
    name: String,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    frame_x: Option<f32>,
    #[serde(default)]
    frame_y: Option<f32>,
    #[serde(default)]
    frame_width: Option<f32>,
    #[serde(default)]
    frame_height: Option<f32>,
    #[serde(default)]
    rotated: bool,
}
