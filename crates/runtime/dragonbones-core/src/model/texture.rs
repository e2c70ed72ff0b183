use std::rc::Rc;

use dragonbones_geom::Rectangle;
use hashbrown::HashMap;

/// One packed region of an atlas image.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextureData {
    pub name: String,
    pub rotated: bool,
    pub region: Rectangle,
    /// Untrimmed frame, when the region was trimmed by the packer.
    pub frame: Option<Rectangle>,
    /// Name of the owning atlas.
    pub atlas: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextureAtlasData {
    pub name: String,
    pub image_path: String,
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    textures: HashMap<String, Rc<TextureData>>,
}

impl TextureAtlasData {
    pub fn new(name: impl Into<String>, image_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_path: image_path.into(),
            width: 0.0,
            height: 0.0,
            scale: 1.0,
            textures: HashMap::new(),
        }
    }

    /// First registration wins.
    pub fn add_texture(&mut self, mut texture: TextureData) {
        if self.textures.contains_key(&texture.name) {
            log::warn!("Same texture: {}", texture.name);
            return;
        }
        texture.atlas = self.name.clone();
        self.textures.insert(texture.name.clone(), Rc::new(texture));
    }

    pub fn get_texture(&self, name: &str) -> Option<&Rc<TextureData>> {
        self.textures.get(name)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }
}
