//! The undo/redo engine.
//!
//! Two ordered histories of executed commands: undo and redo. The engine
//! owns every command once it has executed successfully, and it is the only
//! code that ever calls `Command::undo`, which keeps the execute/undo
//! pairing a structural guarantee rather than a runtime check.
//!
//! Invariants: the histories are disjoint; a fresh execute empties the redo
//! history; the number of live commands equals `undo_len() + redo_len()`.

use thiserror::Error;

use crate::command::{Command, CommandError};
use crate::stack::OperandStack;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
    #[error("redo replay failed: {0}")]
    Replay(#[from] CommandError),
}

#[derive(Default)]
pub struct UndoRedoEngine {
    undo: Vec<Box<dyn Command>>,
    redo: Vec<Box<dyn Command>>,
}

impl UndoRedoEngine {
    pub fn new() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    /// Run a command forward. On success it joins the undo history and the
    /// redo history is discarded. On failure the command is dropped and the
    /// stack is untouched (commands are all-or-nothing).
    pub fn execute(
        &mut self,
        mut command: Box<dyn Command>,
        stack: &mut OperandStack,
    ) -> Result<(), CommandError> {
        command.execute(stack)?;
        self.redo.clear();
        self.undo.push(command);
        Ok(())
    }

    /// Reverse the most recent command and move it to the redo history.
    pub fn undo(&mut self, stack: &mut OperandStack) -> Result<(), HistoryError> {
        let mut command = self.undo.pop().ok_or(HistoryError::NothingToUndo)?;
        command.undo(stack);
        self.redo.push(command);
        Ok(())
    }

    /// Re-run the most recently undone command and move it back to the undo
    /// history. A replay failure evicts the command; this can only happen
    /// for plugin commands whose runtime misbehaves.
    pub fn redo(&mut self, stack: &mut OperandStack) -> Result<(), HistoryError> {
        let mut command = self.redo.pop().ok_or(HistoryError::NothingToRedo)?;
        command.execute(stack)?;
        self.undo.push(command);
        Ok(())
    }

    /// Evict every command supplied by the named plugin from both
    /// histories, preserving the relative order of the rest.
    pub fn purge_plugin(&mut self, plugin: &str) {
        self.undo.retain(|c| c.provenance() != Some(plugin));
        self.redo.retain(|c| c.provenance() != Some(plugin));
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl std::fmt::Debug for UndoRedoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoRedoEngine")
            .field("undo", &self.undo.len())
            .field("redo", &self.redo.len())
            .finish()
    }
}
