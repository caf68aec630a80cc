//! Block editing for the schematic canvas.
//!
//! This module implements the rubber-band block commands of the editor:
//!
//! - **Move / Drag / Copy**: pick items with a rectangle, let them follow the
//!   cursor, and commit them with a click
//! - **Delete / Rotate / Mirror**: applied as soon as the rectangle is released
//! - **Save / Paste**: keep deep copies in a snapshot buffer and drop copies of
//!   them anywhere, as often as needed
//! - **Zoom**: fit the view to the rectangle
//! - **Context menu**: convert a pending move into another command
//! - **Undo/Redo**: every committed command records a reversible entry

pub mod block;
pub mod canvas;
pub mod commands;
pub mod operations;
pub mod state;

pub use block::{BlockCommand, BlockSelector, BlockState, KeyChord, command_for_key};
pub use canvas::{Canvas, Color, DrawMode, NullCanvas, PixelCanvas};
pub use operations::{
    ItemPicker, PickedRef, UndoCommand, UndoHistory, UndoRole, delete_items, duplicate_items,
    mirror_x_items, mirror_y_items, move_items, rotate_items,
};
pub use state::{CursorShape, EditorSession, MessageLevel, MouseCapture, SnapshotBuffer, UserMessage};
