//! Asset decoders producing the immutable model.

pub mod atlas;
pub mod json;

use crate::error::ParseError;
use crate::model::{DragonBonesData, TextureAtlasData};

pub use json::JsonDataParser;

/// Producer of model data from raw asset payloads.
pub trait DataParser {
    /// Decode a skeleton payload. `scale` multiplies every length and translation.
    fn parse_dragonbones_data(&self, raw: &str, scale: f32) -> Result<DragonBonesData, ParseError>;

    /// Fill `target` from an atlas description. `scale <= 0` uses the scale declared by the payload.
    fn parse_texture_atlas_data(
        &self,
        raw: &str,
        target: &mut TextureAtlasData,
        scale: f32,
    ) -> Result<(), ParseError>;

    /// Packed binary skeletons (`DBDT` layout).
    fn parse_dragonbones_binary(
        &self,
        _raw: &[u8],
        _scale: f32,
    ) -> Result<DragonBonesData, ParseError> {
        Err(ParseError::UnsupportedFormat(
            "binary skeleton payloads".to_string(),
        ))
    }
}
