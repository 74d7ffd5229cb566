use log::info;
use uuid::Uuid;

use crate::config::EditorConfig;
use crate::document::{DEFAULT_TITLE, Document};
use crate::editor::Editor;

/// The open documents, in tab order, and which one is active
#[derive(Debug)]
pub struct Workspace {
    editors: Vec<Editor>,
    active: Option<Uuid>,
    config: EditorConfig,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Workspace {
    /// Workspace with one fresh document
    pub fn new(config: EditorConfig) -> Self {
        let mut workspace = Self {
            editors: Vec::new(),
            active: None,
            config,
        };
        workspace.new_document();
        workspace
    }

    pub fn len(&self) -> usize {
        self.editors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.editors.is_empty()
    }

    pub fn editors(&self) -> &[Editor] {
        &self.editors
    }

    /// Open an "Untitled N" document and make it active.
    pub fn new_document(&mut self) -> Uuid {
        let title = format!("{} {}", DEFAULT_TITLE, self.editors.len() + 1);
        self.open(Document::new(&title))
    }

    /// Add a document, e.g. a loaded project, and make it active.
    pub fn open(&mut self, document: Document) -> Uuid {
        let id = document.id;
        info!("Opened '{}'", document.title);
        self.editors.push(Editor::with_config(document, self.config.clone()));
        self.active = Some(id);
        id
    }

    /// Close a document. When it was active, the first remaining one
    /// becomes active.
    pub fn close_document(&mut self, id: Uuid) -> Option<Editor> {
        let index = self.index_of(id)?;
        let closed = self.editors.remove(index);
        if self.active == Some(id) {
            self.active = self.editors.first().map(|e| e.document().id);
        }
        Some(closed)
    }

    pub fn set_active(&mut self, id: Uuid) -> bool {
        if self.index_of(id).is_none() {
            return false;
        }
        self.active = Some(id);
        true
    }

    pub fn active_id(&self) -> Option<Uuid> {
        self.active
    }

    pub fn active(&self) -> Option<&Editor> {
        let id = self.active?;
        self.editors.iter().find(|e| e.document().id == id)
    }

    pub fn active_mut(&mut self) -> Option<&mut Editor> {
        let id = self.active?;
        self.editors.iter_mut().find(|e| e.document().id == id)
    }

    pub fn get(&self, id: Uuid) -> Option<&Editor> {
        self.editors.iter().find(|e| e.document().id == id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Editor> {
        self.editors.iter_mut().find(|e| e.document().id == id)
    }

    fn index_of(&self, id: Uuid) -> Option<usize> {
        self.editors.iter().position(|e| e.document().id == id)
    }
}
