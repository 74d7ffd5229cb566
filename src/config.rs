use serde::{Deserialize, Serialize};

use crate::document::DPI;
use crate::event::DEFAULT_REDRAW_INTERVAL_MS;

/// Editor tunables. Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Offset of each paste from the previously pasted instance
    pub paste_offset: f32,
    pub handle_radius: f32,
    /// Eraser radius in screen pixels
    pub erase_radius: f32,
    /// `None` keeps every undo step
    pub history_limit: Option<usize>,
    pub redraw_interval_ms: u64,
    pub dpi: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            paste_offset: 10.0,
            handle_radius: 6.0,
            erase_radius: 10.0,
            history_limit: None,
            redraw_interval_ms: DEFAULT_REDRAW_INTERVAL_MS,
            dpi: DPI,
        }
    }
}
