//! Project files: a JSON document with the page size and the layer stack.

pub mod codec;

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{DEFAULT_HEIGHT_MM, DEFAULT_TITLE, DEFAULT_WIDTH_MM, Document};
use crate::element::GraphicObject;
use crate::layer::{DEFAULT_LAYER_NAME, Layer};

/// Errors that can occur while saving or loading a project
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to serialize project: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to write project: {0}")]
    WriteError(#[from] std::io::Error),

    #[error("Failed to read project file: {0}")]
    ReadError(String),
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// On-disk shape of a project.
///
/// Version 1 files stored a flat `graphicObjects` list instead of layers;
/// [`ProjectData::ensure_layer_compatibility`] moves it into a single layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectData {
    pub title: String,
    pub width_mm: f32,
    pub height_mm: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graphic_objects: Option<Vec<GraphicObject>>,
    pub layers: Vec<Layer>,
}

impl Default for ProjectData {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            width_mm: DEFAULT_WIDTH_MM,
            height_mm: DEFAULT_HEIGHT_MM,
            graphic_objects: None,
            layers: Vec::new(),
        }
    }
}

impl ProjectData {
    pub fn from_document(doc: &Document) -> Self {
        let mut layers = doc.layers.clone();
        for object in layers.iter_mut().flat_map(|l| l.objects.iter_mut()) {
            object.set_selected(false);
        }
        Self {
            title: doc.title.clone(),
            width_mm: doc.width_mm(),
            height_mm: doc.height_mm(),
            graphic_objects: None,
            layers,
        }
    }

    /// Move a legacy flat object list into one default layer. Runs right
    /// after loading; the legacy list is always cleared.
    pub fn ensure_layer_compatibility(&mut self) {
        let legacy = self.graphic_objects.take();
        if !self.layers.is_empty() {
            return;
        }
        let mut layer = Layer::new(DEFAULT_LAYER_NAME);
        layer.objects = legacy.unwrap_or_default();
        self.layers.push(layer);
    }

    pub fn into_document(mut self) -> Document {
        self.ensure_layer_compatibility();
        Document::from_parts(&self.title, self.width_mm, self.height_mm, self.layers)
    }
}

pub fn to_json(doc: &Document) -> PersistenceResult<String> {
    Ok(serde_json::to_string_pretty(&ProjectData::from_document(doc))?)
}

pub fn from_json(json: &str) -> PersistenceResult<Document> {
    let data: ProjectData = serde_json::from_str(json)?;
    Ok(data.into_document())
}

pub fn save_project(path: &Path, doc: &Document) -> PersistenceResult<()> {
    let json = to_json(doc)?;
    fs::write(path, json)?;
    info!("Saved '{}' to {}", doc.title, path.display());
    Ok(())
}

pub fn load_project(path: &Path) -> PersistenceResult<Document> {
    let json = fs::read_to_string(path)
        .map_err(|e| PersistenceError::ReadError(format!("{}: {e}", path.display())))?;
    let doc = from_json(&json)?;
    info!(
        "Loaded '{}' from {} ({} layers)",
        doc.title,
        path.display(),
        doc.layers.len()
    );
    Ok(doc)
}
