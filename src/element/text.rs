use egui::Pos2;
use serde::{Deserialize, Serialize};

use super::common::ObjectBase;
use super::{Element, ElementKind};
use crate::color::Color;
use crate::surface::Surface;

pub const DEFAULT_TEXT: &str = "Text";
pub const DEFAULT_FONT_FAMILY: &str = "Arial";
pub const DEFAULT_FONT_SIZE: f32 = 24.0;

/// Average glyph advance relative to the font size, used for box estimates
const CHAR_WIDTH_FACTOR: f32 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextObject {
    #[serde(flatten)]
    pub base: ObjectBase,
    #[serde(default = "default_text")]
    pub text: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
}

fn default_text() -> String {
    DEFAULT_TEXT.to_string()
}

fn default_font_family() -> String {
    DEFAULT_FONT_FAMILY.to_string()
}

fn default_font_size() -> f32 {
    DEFAULT_FONT_SIZE
}

impl Default for TextObject {
    fn default() -> Self {
        Self::new(Pos2::ZERO, DEFAULT_TEXT)
    }
}

impl TextObject {
    pub fn new(at: Pos2, text: impl Into<String>) -> Self {
        let mut object = Self {
            base: ObjectBase {
                x: at.x,
                y: at.y,
                fill: Color::BLACK,
                stroke: Color::TRANSPARENT,
                stroke_width: 0.0,
                ..ObjectBase::default()
            },
            text: text.into(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_size: DEFAULT_FONT_SIZE,
        };
        object.fit_to_text();
        object
    }

    /// Estimated box for the current text: 0.6 em per character on the
    /// longest line, one em per line.
    pub fn measure(&self) -> (f32, f32) {
        let longest = self
            .text
            .lines()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        let lines = self.text.lines().count().max(1);
        (
            longest as f32 * self.font_size * CHAR_WIDTH_FACTOR,
            lines as f32 * self.font_size,
        )
    }

    pub fn fit_to_text(&mut self) {
        let (width, height) = self.measure();
        self.base.width = width;
        self.base.height = height;
    }
}

impl Element for TextObject {
    fn element_type(&self) -> ElementKind {
        ElementKind::Text
    }

    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn draw_local(&self, surface: &mut dyn Surface, layer_opacity: f32) {
        surface.draw_text(
            self.base.position(),
            &self.text,
            &self.font_family,
            self.font_size,
            self.base.fill_color32(layer_opacity),
        );
    }
}
