use std::cell::Cell;
use std::fmt;

use egui::{Pos2, Rect};
use image::{GrayImage, Luma, Rgba, RgbaImage, imageops};
use serde::{Deserialize, Serialize};

use super::common::ObjectBase;
use super::{Element, ElementKind};
use crate::color::Color;
use crate::geometry::unrotate_point;
use crate::id_generator::ObjectId;
use crate::persistence::codec::{mask_base64, png_base64};
use crate::surface::Surface;

/// Rec. 709 luma weights used by the grayscale filter
const LUMA_R: f32 = 0.2126;
const LUMA_G: f32 = 0.7152;
const LUMA_B: f32 = 0.0722;

/// Mask value for untouched pixels
const MASK_OPAQUE: u8 = 255;

/// Sub-rectangle of the source pixels that is shown in the display box.
/// A non-positive width or height means the full frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CropRect {
    #[serde(rename = "cropX")]
    pub x: f32,
    #[serde(rename = "cropY")]
    pub y: f32,
    #[serde(rename = "cropWidth")]
    pub width: f32,
    #[serde(rename = "cropHeight")]
    pub height: f32,
}

impl CropRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    pub fn is_unset(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Integer window inside a `width` x `height` source: `(x, y, w, h)`.
    pub fn pixel_bounds(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        if self.is_unset() || width == 0 || height == 0 {
            return (0, 0, width, height);
        }
        let x = (self.x.round().max(0.0) as u32).min(width - 1);
        let y = (self.y.round().max(0.0) as u32).min(height - 1);
        let w = (self.width.round().max(1.0) as u32).min(width - x);
        let h = (self.height.round().max(1.0) as u32).min(height - y);
        (x, y, w, h)
    }

    /// Clamp into a `width` x `height` source, keeping at least one pixel.
    pub fn clamped(self, width: u32, height: u32) -> CropRect {
        let (w, h) = (width as f32, height as f32);
        let x = self.x.clamp(0.0, (w - 1.0).max(0.0));
        let y = self.y.clamp(0.0, (h - 1.0).max(0.0));
        CropRect::new(
            x,
            y,
            self.width.clamp(1.0, (w - x).max(1.0)),
            self.height.clamp(1.0, (h - y).max(1.0)),
        )
    }
}

/// 4x5 color matrix in row-major order, applied to straight RGBA in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorFilter {
    matrix: [f32; 20],
}

impl ColorFilter {
    pub const IDENTITY: ColorFilter = ColorFilter {
        matrix: [
            1.0, 0.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, 0.0,
        ],
    };

    /// Opacity and grayscale folded into one matrix.
    pub fn new(opacity: f32, grayscale: bool) -> Self {
        let mut matrix = Self::IDENTITY.matrix;
        if grayscale {
            for row in 0..3 {
                matrix[row * 5] = LUMA_R;
                matrix[row * 5 + 1] = LUMA_G;
                matrix[row * 5 + 2] = LUMA_B;
            }
        }
        matrix[18] = opacity.clamp(0.0, 1.0);
        Self { matrix }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn apply(&self, pixel: Rgba<u8>) -> Rgba<u8> {
        let input = pixel.0.map(f32::from);
        let mut out = [0u8; 4];
        for (row, value) in out.iter_mut().enumerate() {
            let m = &self.matrix[row * 5..row * 5 + 5];
            let v = m[0] * input[0]
                + m[1] * input[1]
                + m[2] * input[2]
                + m[3] * input[3]
                + m[4] * 255.0;
            *value = v.round().clamp(0.0, 255.0) as u8;
        }
        Rgba(out)
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedFilter {
    opacity_bits: u32,
    grayscale: bool,
    filter: ColorFilter,
}

/// Identifies one rendered appearance of an image for texture caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderKey {
    pub id: ObjectId,
    pub version: u64,
    pub opacity_bits: u32,
    pub grayscale: bool,
}

/// Everything a crop touches, captured for undo.
#[derive(Clone, PartialEq)]
pub struct ImageState {
    pub pixels: RgbaImage,
    pub mask: Option<GrayImage>,
    pub rect: Rect,
    pub crop: CropRect,
}

impl ImageState {
    /// The state after physically cropping to `crop`: the cropped pixels and
    /// mask, shown in `rect`, with the crop window reset to the new full frame.
    pub fn cropped(&self, crop: CropRect, rect: Rect) -> ImageState {
        let (width, height) = self.pixels.dimensions();
        let (x, y, w, h) = crop.pixel_bounds(width, height);
        let pixels = imageops::crop_imm(&self.pixels, x, y, w, h).to_image();
        let mask = self
            .mask
            .as_ref()
            .map(|mask| imageops::crop_imm(mask, x, y, w, h).to_image());
        ImageState {
            crop: CropRect::full(pixels.width(), pixels.height()),
            pixels,
            mask,
            rect,
        }
    }
}

impl fmt::Debug for ImageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageState")
            .field("pixels", &self.pixels.dimensions())
            .field("mask", &self.mask.is_some())
            .field("rect", &self.rect)
            .field("crop", &self.crop)
            .finish()
    }
}

/// Raster image with a display box, crop window and optional erase mask.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageObject {
    #[serde(flatten)]
    pub base: ObjectBase,
    #[serde(rename = "imageData", with = "png_base64", default)]
    pixels: RgbaImage,
    #[serde(flatten)]
    crop: CropRect,
    #[serde(
        rename = "eraseMask",
        with = "mask_base64",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    erase_mask: Option<GrayImage>,
    #[serde(default, rename = "isGrayscale")]
    grayscale: bool,
    #[serde(skip)]
    version: u64,
    #[serde(skip)]
    filter_cache: Cell<Option<CachedFilter>>,
}

impl fmt::Debug for ImageObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageObject")
            .field("base", &self.base)
            .field("pixels", &self.pixels.dimensions())
            .field("crop", &self.crop)
            .field("erase_mask", &self.erase_mask.is_some())
            .field("grayscale", &self.grayscale)
            .field("version", &self.version)
            .finish()
    }
}

// Version and filter cache are derived state.
impl PartialEq for ImageObject {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
            && self.crop == other.crop
            && self.grayscale == other.grayscale
            && self.erase_mask == other.erase_mask
            && self.pixels == other.pixels
    }
}

impl Default for ImageObject {
    fn default() -> Self {
        Self::new(RgbaImage::new(0, 0), Pos2::ZERO)
    }
}

impl ImageObject {
    pub fn new(pixels: RgbaImage, at: Pos2) -> Self {
        let mut image = Self {
            base: ObjectBase {
                x: at.x,
                y: at.y,
                fill: Color::TRANSPARENT,
                stroke: Color::TRANSPARENT,
                stroke_width: 0.0,
                ..ObjectBase::default()
            },
            pixels: RgbaImage::new(0, 0),
            crop: CropRect::default(),
            erase_mask: None,
            grayscale: false,
            version: 0,
            filter_cache: Cell::new(None),
        };
        image.set_pixels(pixels);
        image
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Replace the source pixels. The display box takes the buffer's size,
    /// the crop window resets to the full frame and any erase mask is dropped.
    pub fn set_pixels(&mut self, pixels: RgbaImage) {
        self.base.width = pixels.width() as f32;
        self.base.height = pixels.height() as f32;
        self.crop = CropRect::full(pixels.width(), pixels.height());
        self.pixels = pixels;
        self.erase_mask = None;
        self.touch();
    }

    pub fn source_size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// The crop window, with an unset window resolved to the full frame.
    pub fn crop(&self) -> CropRect {
        if self.crop.is_unset() {
            let (w, h) = self.source_size();
            CropRect::full(w, h)
        } else {
            self.crop
        }
    }

    pub fn set_crop(&mut self, crop: CropRect) {
        if self.crop != crop {
            self.crop = crop;
            self.touch();
        }
    }

    pub fn erase_mask(&self) -> Option<&GrayImage> {
        self.erase_mask.as_ref()
    }

    pub fn set_erase_mask(&mut self, mask: Option<GrayImage>) {
        self.erase_mask = mask;
        self.touch();
    }

    pub fn grayscale(&self) -> bool {
        self.grayscale
    }

    pub fn set_grayscale(&mut self, grayscale: bool) {
        self.grayscale = grayscale;
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn render_key(&self) -> RenderKey {
        RenderKey {
            id: self.base.id,
            version: self.version,
            opacity_bits: self.base.opacity.to_bits(),
            grayscale: self.grayscale,
        }
    }

    fn touch(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Source pixels per display pixel along each axis.
    pub fn crop_to_display_ratio(&self) -> (f32, f32) {
        let crop = self.crop();
        let rx = if self.base.width > 0.0 {
            crop.width / self.base.width
        } else {
            1.0
        };
        let ry = if self.base.height > 0.0 {
            crop.height / self.base.height
        } else {
            1.0
        };
        (rx, ry)
    }

    /// Opacity/grayscale filter, rebuilt only when either input changed.
    pub fn color_filter(&self) -> ColorFilter {
        let opacity_bits = self.base.opacity.to_bits();
        if let Some(cached) = self.filter_cache.get() {
            if cached.opacity_bits == opacity_bits && cached.grayscale == self.grayscale {
                return cached.filter;
            }
        }
        let filter = ColorFilter::new(self.base.opacity, self.grayscale);
        self.filter_cache.set(Some(CachedFilter {
            opacity_bits,
            grayscale: self.grayscale,
            filter,
        }));
        filter
    }

    /// The crop window with the erase mask applied destination-in and the
    /// color filter on top.
    pub fn rendered_pixels(&self) -> RgbaImage {
        let (width, height) = self.source_size();
        let (x, y, w, h) = self.crop.pixel_bounds(width, height);
        let mut out = imageops::crop_imm(&self.pixels, x, y, w, h).to_image();

        if let Some(mask) = &self.erase_mask {
            for (px, py, pixel) in out.enumerate_pixels_mut() {
                let coverage = mask
                    .get_pixel_checked(x + px, y + py)
                    .map_or(MASK_OPAQUE, |m| m.0[0]);
                pixel.0[3] = (u16::from(pixel.0[3]) * u16::from(coverage) / 255) as u8;
            }
        }

        let filter = self.color_filter();
        if !filter.is_identity() {
            for pixel in out.pixels_mut() {
                *pixel = filter.apply(*pixel);
            }
        }
        out
    }

    /// Physically cropped copy of the source pixels.
    pub fn cropped_pixels(&self, crop: CropRect) -> RgbaImage {
        let (width, height) = self.source_size();
        let (x, y, w, h) = crop.pixel_bounds(width, height);
        imageops::crop_imm(&self.pixels, x, y, w, h).to_image()
    }

    pub fn cropped_mask(&self, crop: CropRect) -> Option<GrayImage> {
        let (width, height) = self.source_size();
        let (x, y, w, h) = crop.pixel_bounds(width, height);
        self.erase_mask
            .as_ref()
            .map(|mask| imageops::crop_imm(mask, x, y, w, h).to_image())
    }

    /// Source-pixel coordinates of a point given in document space.
    pub fn to_source_space(&self, point: Pos2) -> Pos2 {
        let local = unrotate_point(point, self.center(), self.base.rotation);
        let crop = self.crop();
        let (rx, ry) = self.crop_to_display_ratio();
        Pos2::new(
            crop.x + (local.x - self.base.x) * rx,
            crop.y + (local.y - self.base.y) * ry,
        )
    }

    /// Stamp a fully transparent disc into the erase mask. `radius` is in
    /// display pixels and scaled into source space. Returns whether any mask
    /// pixel changed.
    pub fn erase_at(&mut self, point: Pos2, radius: f32) -> bool {
        let (width, height) = self.source_size();
        if width == 0 || height == 0 || radius <= 0.0 {
            return false;
        }
        let center = self.to_source_space(point);
        let (rx, ry) = self.crop_to_display_ratio();
        let r = radius * (rx + ry) / 2.0;

        let min_x = (center.x - r).floor().max(0.0);
        let min_y = (center.y - r).floor().max(0.0);
        let max_x = (center.x + r).ceil().min(width as f32 - 1.0);
        let max_y = (center.y + r).ceil().min(height as f32 - 1.0);
        if min_x > max_x || min_y > max_y {
            return false;
        }

        let mask = self
            .erase_mask
            .get_or_insert_with(|| GrayImage::from_pixel(width, height, Luma([MASK_OPAQUE])));
        let r_sq = r * r;
        let mut changed = false;
        for py in min_y as u32..=max_y as u32 {
            for px in min_x as u32..=max_x as u32 {
                let dx = px as f32 + 0.5 - center.x;
                let dy = py as f32 + 0.5 - center.y;
                if dx * dx + dy * dy > r_sq {
                    continue;
                }
                if let Some(value) = mask.get_pixel_mut_checked(px, py) {
                    if value.0[0] != 0 {
                        value.0[0] = 0;
                        changed = true;
                    }
                }
            }
        }
        if changed {
            self.touch();
        }
        changed
    }

    pub fn capture_state(&self) -> ImageState {
        ImageState {
            pixels: self.pixels.clone(),
            mask: self.erase_mask.clone(),
            rect: self.base.rect(),
            crop: self.crop,
        }
    }

    pub fn restore_state(&mut self, state: &ImageState) {
        self.pixels = state.pixels.clone();
        self.erase_mask = state.mask.clone();
        self.base.set_rect(state.rect);
        self.crop = state.crop;
        self.touch();
    }
}

impl Element for ImageObject {
    fn element_type(&self) -> ElementKind {
        ElementKind::Image
    }

    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn draw_local(&self, surface: &mut dyn Surface, layer_opacity: f32) {
        surface.draw_image(self, self.base.rect(), layer_opacity);
    }
}
