//! Error types for block commands.
//!
//! None of these abort an interaction: they are reported to the user and the
//! handler carries on with its cleanup.

use thiserror::Error;

use crate::editor::block::{BlockCommand, BlockState};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    /// Placement requested while no outline renderer is installed.
    #[error("block place: mouse capture is not active")]
    CaptureNotActive,

    /// Placement requested with nothing picked.
    #[error("block place: no items to place (cmd {command:?}, state {state:?})")]
    EmptySelection {
        command: BlockCommand,
        state: BlockState,
    },

    /// Items were still picked after a placement finished.
    #[error("block place: {count} items left in buffer")]
    ResidualSelection { count: usize },

    #[error("No struct to paste")]
    EmptyPasteBuffer,

    /// A block handler ran without any command set.
    #[error("block end: no active block command")]
    NoActiveCommand,
}

/// Result type alias for block operations
pub type BlockResult<T> = Result<T, BlockError>;
