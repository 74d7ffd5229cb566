use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, GrayImage, ImageFormat, RgbaImage};
use log::warn;

/// PNG bytes for any image buffer the `image` crate can write.
fn encode_png(image: DynamicImage) -> Result<String, image::ImageError> {
    let mut png_bytes: Vec<u8> = Vec::new();
    image.write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)?;
    Ok(general_purpose::STANDARD.encode(&png_bytes))
}

fn decode_png(text: &str) -> Option<DynamicImage> {
    if text.is_empty() {
        return None;
    }
    let bytes = match general_purpose::STANDARD.decode(text) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Discarding malformed base64 image data: {e}");
            return None;
        }
    };
    match image::load_from_memory(&bytes) {
        Ok(image) => Some(image),
        Err(e) => {
            warn!("Discarding undecodable image data: {e}");
            None
        }
    }
}

/// `RgbaImage` as a base64 PNG string. An empty buffer is `""`; undecodable
/// data loads as an empty buffer instead of failing the document.
pub mod png_base64 {
    use super::*;
    use serde::{Deserialize, Deserializer, Serializer, ser::Error as _};

    pub fn serialize<S: Serializer>(pixels: &RgbaImage, serializer: S) -> Result<S::Ok, S::Error> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return serializer.serialize_str("");
        }
        let text = encode_png(DynamicImage::ImageRgba8(pixels.clone())).map_err(S::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RgbaImage, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(decode_png(&text)
            .map(|image| image.to_rgba8())
            .unwrap_or_else(|| RgbaImage::new(0, 0)))
    }
}

/// Optional single-channel erase mask as a base64 PNG string.
pub mod mask_base64 {
    use super::*;
    use serde::{Deserialize, Deserializer, Serializer, ser::Error as _};

    pub fn serialize<S: Serializer>(
        mask: &Option<GrayImage>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match mask {
            Some(mask) => {
                let text =
                    encode_png(DynamicImage::ImageLuma8(mask.clone())).map_err(S::Error::custom)?;
                serializer.serialize_some(&text)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<GrayImage>, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        Ok(text
            .as_deref()
            .and_then(decode_png)
            .map(|image| image.to_luma8()))
    }
}
