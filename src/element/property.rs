use egui::{Rect, vec2};
use thiserror::Error;

use super::{Element, ElementKind, GraphicObject};
use crate::color::Color;
use crate::id_generator::ObjectId;

/// Every property the editor can set generically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    X,
    Y,
    Width,
    Height,
    Rotation,
    StrokeWidth,
    Opacity,
    FillColor,
    StrokeColor,
    Text,
    FontFamily,
    FontSize,
    ArrowStart,
    ArrowEnd,
    Grayscale,
}

impl PropertyKey {
    /// Property panel order
    pub const ALL: [PropertyKey; 15] = [
        PropertyKey::X,
        PropertyKey::Y,
        PropertyKey::Width,
        PropertyKey::Height,
        PropertyKey::Rotation,
        PropertyKey::StrokeWidth,
        PropertyKey::Opacity,
        PropertyKey::FillColor,
        PropertyKey::StrokeColor,
        PropertyKey::Text,
        PropertyKey::FontFamily,
        PropertyKey::FontSize,
        PropertyKey::ArrowStart,
        PropertyKey::ArrowEnd,
        PropertyKey::Grayscale,
    ];

    /// Whether a direct edit of this property becomes an undo step.
    ///
    /// Geometry is excluded: drags and resizes already record dedicated
    /// move/resize commands for it.
    pub fn is_recorded(self) -> bool {
        !matches!(
            self,
            PropertyKey::X | PropertyKey::Y | PropertyKey::Width | PropertyKey::Height
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            PropertyKey::X => "X",
            PropertyKey::Y => "Y",
            PropertyKey::Width => "Width",
            PropertyKey::Height => "Height",
            PropertyKey::Rotation => "Rotation",
            PropertyKey::StrokeWidth => "StrokeWidth",
            PropertyKey::Opacity => "Opacity",
            PropertyKey::FillColor => "FillColor",
            PropertyKey::StrokeColor => "StrokeColor",
            PropertyKey::Text => "Text",
            PropertyKey::FontFamily => "FontFamily",
            PropertyKey::FontSize => "FontSize",
            PropertyKey::ArrowStart => "HasArrowStart",
            PropertyKey::ArrowEnd => "HasArrowEnd",
            PropertyKey::Grayscale => "IsGrayscale",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Number(f32),
    Color(Color),
    Text(String),
    Flag(bool),
}

impl PropertyValue {
    fn kind_name(&self) -> &'static str {
        match self {
            PropertyValue::Number(_) => "number",
            PropertyValue::Color(_) => "color",
            PropertyValue::Text(_) => "text",
            PropertyValue::Flag(_) => "flag",
        }
    }
}

/// State a setter overwrites besides the property itself. Captured before an
/// edit so that undo can put it back.
#[derive(Debug, Clone, PartialEq)]
pub enum DependentState {
    /// Text box size before a text or font edit refits it
    TextBox { width: f32, height: f32 },
    /// Grayscale flags of a group and all its descendant images and groups
    Grayscale(Vec<(ObjectId, bool)>),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    #[error("object {0} not found")]
    ObjectNotFound(ObjectId),
    #[error("{key:?} is not a property of {kind:?} objects")]
    Unsupported { key: PropertyKey, kind: ElementKind },
    #[error("{key:?} expects a {expected} value, got {actual}")]
    TypeMismatch {
        key: PropertyKey,
        expected: &'static str,
        actual: &'static str,
    },
}

fn number(key: PropertyKey, value: &PropertyValue) -> Result<f32, PropertyError> {
    match value {
        PropertyValue::Number(n) => Ok(*n),
        other => Err(mismatch(key, "number", other)),
    }
}

fn color(key: PropertyKey, value: &PropertyValue) -> Result<Color, PropertyError> {
    match value {
        PropertyValue::Color(c) => Ok(*c),
        other => Err(mismatch(key, "color", other)),
    }
}

fn text(key: PropertyKey, value: &PropertyValue) -> Result<String, PropertyError> {
    match value {
        PropertyValue::Text(t) => Ok(t.clone()),
        other => Err(mismatch(key, "text", other)),
    }
}

fn flag(key: PropertyKey, value: &PropertyValue) -> Result<bool, PropertyError> {
    match value {
        PropertyValue::Flag(f) => Ok(*f),
        other => Err(mismatch(key, "flag", other)),
    }
}

fn mismatch(key: PropertyKey, expected: &'static str, actual: &PropertyValue) -> PropertyError {
    PropertyError::TypeMismatch {
        key,
        expected,
        actual: actual.kind_name(),
    }
}

impl GraphicObject {
    fn unsupported(&self, key: PropertyKey) -> PropertyError {
        PropertyError::Unsupported {
            key,
            kind: self.element_type(),
        }
    }

    pub fn get_property(&self, key: PropertyKey) -> Result<PropertyValue, PropertyError> {
        let base = self.base();
        let value = match (key, self) {
            (PropertyKey::X, _) => PropertyValue::Number(self.position().x),
            (PropertyKey::Y, _) => PropertyValue::Number(self.position().y),
            (PropertyKey::Width, _) => PropertyValue::Number(self.bounds().width()),
            (PropertyKey::Height, _) => PropertyValue::Number(self.bounds().height()),
            (PropertyKey::Rotation, _) => PropertyValue::Number(base.rotation),
            (PropertyKey::StrokeWidth, _) => PropertyValue::Number(base.stroke_width),
            (PropertyKey::Opacity, _) => PropertyValue::Number(base.opacity),
            (PropertyKey::FillColor, _) => PropertyValue::Color(base.fill),
            (PropertyKey::StrokeColor, _) => PropertyValue::Color(base.stroke),
            (PropertyKey::Text, GraphicObject::Text(t)) => PropertyValue::Text(t.text.clone()),
            (PropertyKey::FontFamily, GraphicObject::Text(t)) => {
                PropertyValue::Text(t.font_family.clone())
            }
            (PropertyKey::FontSize, GraphicObject::Text(t)) => PropertyValue::Number(t.font_size),
            (PropertyKey::ArrowStart, GraphicObject::Line(l)) => PropertyValue::Flag(l.arrow_start),
            (PropertyKey::ArrowEnd, GraphicObject::Line(l)) => PropertyValue::Flag(l.arrow_end),
            (PropertyKey::Grayscale, GraphicObject::Image(i)) => PropertyValue::Flag(i.grayscale()),
            (PropertyKey::Grayscale, GraphicObject::Group(g)) => PropertyValue::Flag(g.grayscale),
            _ => return Err(self.unsupported(key)),
        };
        Ok(value)
    }

    /// Snapshot of what setting `key` overwrites beyond the key's own value.
    pub fn capture_dependents(&self, key: PropertyKey) -> Option<DependentState> {
        match (key, self) {
            (
                PropertyKey::Text | PropertyKey::FontFamily | PropertyKey::FontSize,
                GraphicObject::Text(t),
            ) => Some(DependentState::TextBox {
                width: t.base.width,
                height: t.base.height,
            }),
            (PropertyKey::Grayscale, GraphicObject::Group(_)) => {
                let mut flags = Vec::new();
                self.collect_grayscale(&mut flags);
                Some(DependentState::Grayscale(flags))
            }
            _ => None,
        }
    }

    pub fn restore_dependents(&mut self, state: &DependentState) {
        match (state, self) {
            (DependentState::TextBox { width, height }, GraphicObject::Text(t)) => {
                t.base.width = *width;
                t.base.height = *height;
            }
            (DependentState::Grayscale(flags), object) => object.restore_grayscale(flags),
            _ => {}
        }
    }

    fn collect_grayscale(&self, flags: &mut Vec<(ObjectId, bool)>) {
        match self {
            GraphicObject::Image(i) => flags.push((i.id(), i.grayscale())),
            GraphicObject::Group(g) => {
                flags.push((g.id(), g.grayscale));
                for child in &g.children {
                    child.collect_grayscale(flags);
                }
            }
            _ => {}
        }
    }

    fn restore_grayscale(&mut self, flags: &[(ObjectId, bool)]) {
        let id = self.id();
        let saved = flags.iter().find(|(f, _)| *f == id).map(|(_, g)| *g);
        match self {
            GraphicObject::Image(i) => {
                if let Some(grayscale) = saved {
                    i.set_grayscale(grayscale);
                }
            }
            GraphicObject::Group(g) => {
                if let Some(grayscale) = saved {
                    g.grayscale = grayscale;
                }
                for child in &mut g.children {
                    child.restore_grayscale(flags);
                }
            }
            _ => {}
        }
    }

    /// Assign a property and return its previous value.
    ///
    /// Opacity is clamped to `0..=1`, sizes and widths to non-negative, font
    /// size to at least one point. Text edits refit the text box.
    pub fn set_property(
        &mut self,
        key: PropertyKey,
        value: &PropertyValue,
    ) -> Result<PropertyValue, PropertyError> {
        let old = self.get_property(key)?;
        let unsupported = PropertyError::Unsupported {
            key,
            kind: self.element_type(),
        };
        match key {
            PropertyKey::X => {
                let x = number(key, value)?;
                self.translate(vec2(x - self.position().x, 0.0));
            }
            PropertyKey::Y => {
                let y = number(key, value)?;
                self.translate(vec2(0.0, y - self.position().y));
            }
            PropertyKey::Width | PropertyKey::Height => {
                let size = number(key, value)?.max(0.0);
                let bounds = self.bounds();
                let new = if key == PropertyKey::Width {
                    Rect::from_min_size(bounds.min, vec2(size, bounds.height()))
                } else {
                    Rect::from_min_size(bounds.min, vec2(bounds.width(), size))
                };
                self.set_bounds(new);
            }
            PropertyKey::Rotation => self.base_mut().rotation = number(key, value)?,
            PropertyKey::StrokeWidth => self.base_mut().stroke_width = number(key, value)?.max(0.0),
            PropertyKey::Opacity => self.base_mut().opacity = number(key, value)?.clamp(0.0, 1.0),
            PropertyKey::FillColor => self.base_mut().fill = color(key, value)?,
            PropertyKey::StrokeColor => self.base_mut().stroke = color(key, value)?,
            PropertyKey::Text | PropertyKey::FontFamily | PropertyKey::FontSize => {
                let GraphicObject::Text(t) = self else {
                    return Err(unsupported);
                };
                match key {
                    PropertyKey::Text => t.text = text(key, value)?,
                    PropertyKey::FontFamily => t.font_family = text(key, value)?,
                    _ => t.font_size = number(key, value)?.max(1.0),
                }
                t.fit_to_text();
            }
            PropertyKey::ArrowStart | PropertyKey::ArrowEnd => {
                let GraphicObject::Line(l) = self else {
                    return Err(unsupported);
                };
                if key == PropertyKey::ArrowStart {
                    l.arrow_start = flag(key, value)?;
                } else {
                    l.arrow_end = flag(key, value)?;
                }
            }
            PropertyKey::Grayscale => {
                let grayscale = flag(key, value)?;
                match self {
                    GraphicObject::Image(i) => i.set_grayscale(grayscale),
                    GraphicObject::Group(g) => g.set_grayscale(grayscale),
                    _ => return Err(unsupported),
                }
            }
        }
        Ok(old)
    }
}
