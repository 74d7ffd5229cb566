mod commands;
mod history;

use thiserror::Error;

use crate::element::PropertyError;
use crate::id_generator::ObjectId;
use crate::layer::LayerId;

pub use commands::{Command, ObjectMove, RemovedEntry, UngroupEntry};
pub use history::CommandHistory;

/// Result type for command operations
pub type CommandResult = Result<(), CommandError>;

/// Errors that can occur during command execution
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("layer {0} not found")]
    LayerNotFound(LayerId),

    #[error("object {0} not found")]
    ObjectNotFound(ObjectId),

    #[error("object {0} is not {1}")]
    WrongKind(ObjectId, &'static str),

    #[error("index {0} is out of range")]
    IndexOutOfRange(usize),

    /// The command no longer holds the object it has to put back
    #[error("command has no stored state for object {0}")]
    MissingState(ObjectId),

    #[error(transparent)]
    Property(#[from] PropertyError),
}
