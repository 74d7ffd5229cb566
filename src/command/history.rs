use std::collections::VecDeque;

use log::debug;

use super::{Command, CommandResult};
use crate::document::Document;

/// Linear undo/redo history.
///
/// Pushing a new command clears the redo stack. While a command is applied or
/// reverted the document is flagged as replaying history, so observed property
/// changes made by the command are not recorded again.
#[derive(Debug, Default)]
pub struct CommandHistory {
    undo_stack: VecDeque<Command>,
    redo_stack: Vec<Command>,
    executing: bool,
    limit: Option<usize>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// History keeping at most `limit` undo steps; the oldest are dropped.
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Apply `command` and push it. A failed command is not pushed and
    /// leaves the redo stack intact.
    pub fn execute(&mut self, mut command: Command, doc: &mut Document) -> CommandResult {
        self.run(doc, |doc| command.apply(doc))?;
        debug!("Executed '{}'", command.label());
        self.push(command);
        Ok(())
    }

    /// Push a command whose effect is already in the document, such as a
    /// finished drag.
    pub fn record(&mut self, command: Command) {
        debug!("Recorded '{}'", command.label());
        self.push(command);
    }

    /// Revert the newest command. `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self, doc: &mut Document) -> Result<bool, super::CommandError> {
        let Some(mut command) = self.undo_stack.pop_back() else {
            return Ok(false);
        };
        if let Err(e) = self.run(doc, |doc| command.revert(doc)) {
            self.undo_stack.push_back(command);
            return Err(e);
        }
        debug!("Undid '{}'", command.label());
        self.redo_stack.push(command);
        Ok(true)
    }

    /// Re-apply the newest undone command. `Ok(false)` when there is none.
    pub fn redo(&mut self, doc: &mut Document) -> Result<bool, super::CommandError> {
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(e) = self.run(doc, |doc| command.apply(doc)) {
            self.redo_stack.push(command);
            return Err(e);
        }
        debug!("Redid '{}'", command.label());
        self.undo_stack.push_back(command);
        Ok(true)
    }

    /// True while a command is being applied or reverted
    pub fn is_executing(&self) -> bool {
        self.executing
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_label(&self) -> Option<String> {
        self.undo_stack.back().map(Command::label)
    }

    pub fn redo_label(&self) -> Option<String> {
        self.redo_stack.last().map(Command::label)
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn push(&mut self, command: Command) {
        self.undo_stack.push_back(command);
        self.redo_stack.clear();
        if let Some(limit) = self.limit {
            while self.undo_stack.len() > limit {
                self.undo_stack.pop_front();
            }
        }
    }

    fn run(
        &mut self,
        doc: &mut Document,
        step: impl FnOnce(&mut Document) -> CommandResult,
    ) -> CommandResult {
        self.executing = true;
        doc.begin_history_replay();
        let result = step(doc);
        doc.end_history_replay();
        self.executing = false;
        result
    }
}
