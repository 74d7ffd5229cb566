#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod arrange;
pub mod color;
pub mod command;
pub mod config;
pub mod document;
pub mod editor;
pub mod element;
pub mod event;
pub mod export;
pub mod geometry;
pub mod id_generator;
pub mod import;
pub mod interaction;
pub mod layer;
pub mod persistence;
pub mod selection;
pub mod surface;
pub mod util;
pub mod workspace;

pub use app::FigcraftApp;
pub use arrange::Alignment;
pub use color::Color;
pub use command::{Command, CommandError, CommandHistory, CommandResult};
pub use config::EditorConfig;
pub use document::Document;
pub use editor::Editor;
pub use element::{Element, ElementKind, GraphicObject, PropertyKey, PropertyValue};
pub use id_generator::ObjectId;
pub use interaction::{InteractionController, Modifiers, PointerEvent, Tool};
pub use layer::{Layer, LayerId};
pub use selection::Selection;
pub use workspace::Workspace;
