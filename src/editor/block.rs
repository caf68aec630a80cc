//! Block commands, states and the live selection region.
//!
//! A block interaction starts when the user presses a mouse button on an empty
//! spot and drags out a rectangle. The modifier keys held at that moment pick
//! the [`BlockCommand`]; the [`BlockSelector`] then walks through its
//! [`BlockState`]s while the rectangle is sized, while the picked items follow
//! the cursor, and when they are finally placed.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::canvas::{Canvas, Color, DrawMode};
use super::operations::ItemPicker;
use crate::model::{Point, Rect};

/// The operation applied to the current block selection.
///
/// Discriminants are stable command codes; see [`BlockCommand::from_code`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BlockCommand {
    #[default]
    Idle = 0,
    Move = 1,
    Copy = 2,
    Save = 3,
    Delete = 4,
    Paste = 5,
    Drag = 6,
    Rotate = 7,
    Flip = 8,
    Zoom = 9,
    Abort = 10,
    /// Move of items picked before the block was drawn.
    PresetMove = 11,
    SelectOnly = 12,
    MirrorX = 13,
    MirrorY = 14,
}

impl BlockCommand {
    pub const ALL: [BlockCommand; 15] = [
        BlockCommand::Idle,
        BlockCommand::Move,
        BlockCommand::Copy,
        BlockCommand::Save,
        BlockCommand::Delete,
        BlockCommand::Paste,
        BlockCommand::Drag,
        BlockCommand::Rotate,
        BlockCommand::Flip,
        BlockCommand::Zoom,
        BlockCommand::Abort,
        BlockCommand::PresetMove,
        BlockCommand::SelectOnly,
        BlockCommand::MirrorX,
        BlockCommand::MirrorY,
    ];

    /// Command for a raw command code. Unknown codes map to [`BlockCommand::Idle`].
    pub fn from_code(code: u8) -> BlockCommand {
        Self::ALL
            .into_iter()
            .find(|c| *c as u8 == code)
            .unwrap_or(BlockCommand::Idle)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Status-bar text for the command.
    pub fn label(self) -> &'static str {
        match self {
            BlockCommand::Idle => "",
            BlockCommand::Move | BlockCommand::PresetMove => "Block Move",
            BlockCommand::Copy => "Block Copy",
            BlockCommand::Save => "Save Block",
            BlockCommand::Delete => "Block Delete",
            BlockCommand::Paste => "Block Paste",
            BlockCommand::Drag => "Block Drag",
            BlockCommand::Rotate => "Block Rotate",
            BlockCommand::Flip => "Block Flip",
            BlockCommand::Zoom => "Win Zoom",
            BlockCommand::Abort => "Block Abort",
            BlockCommand::SelectOnly => "Select Items",
            BlockCommand::MirrorX => "Block Mirror X",
            BlockCommand::MirrorY => "Block Mirror Y",
        }
    }
}

impl fmt::Display for BlockCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Phase of a block interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockState {
    #[default]
    NoBlock,
    /// The rectangle is being dragged out.
    Sizing,
    /// Picked items follow the cursor awaiting placement.
    Move,
    /// Placement is being committed.
    Stop,
}

/// Modifier chord held when a block starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyChord {
    None,
    Alt,
    Shift,
    Ctrl,
    ShiftCtrl,
    MiddleButton,
    /// Anything else; the low byte is taken as a command code.
    Raw(u32),
}

/// Map the modifier chord held at block start to a command.
pub fn command_for_key(key: KeyChord) -> BlockCommand {
    match key {
        KeyChord::None => BlockCommand::Move,
        KeyChord::Alt | KeyChord::Shift => BlockCommand::Copy,
        KeyChord::Ctrl => BlockCommand::Drag,
        KeyChord::ShiftCtrl => BlockCommand::Delete,
        KeyChord::MiddleButton => BlockCommand::Zoom,
        KeyChord::Raw(key) => BlockCommand::from_code((key & 0xFF) as u8),
    }
}

/// The live selection region.
///
/// Invariant: `items` is only non-empty while `state != NoBlock`, and it is
/// emptied before command and state are reset.
#[derive(Debug, Clone)]
pub struct BlockSelector {
    pub command: BlockCommand,
    pub state: BlockState,
    /// Rectangle as dragged: origin where the button went down, end at the cursor.
    pub rect: Rect,
    /// Cursor delta since `last_cursor_position`.
    pub move_vector: Point,
    /// Anchor the move vector is measured from.
    pub last_cursor_position: Point,
    pub items: Vec<ItemPicker>,
    pub color: Color,
    /// Status text shown while the block is active.
    pub message: String,
}

impl BlockSelector {
    pub fn new(color: Color) -> Self {
        Self {
            command: BlockCommand::Idle,
            state: BlockState::NoBlock,
            rect: Rect::default(),
            move_vector: Point::default(),
            last_cursor_position: Point::default(),
            items: Vec::new(),
            color,
            message: String::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear_items(&mut self) {
        self.items.clear();
    }

    pub fn origin(&self) -> Point {
        self.rect.origin
    }

    pub fn end(&self) -> Point {
        self.rect.end
    }

    pub fn set_end(&mut self, end: Point) {
        self.rect.end = end;
    }

    pub fn centre(&self) -> Point {
        self.rect.centre()
    }

    /// Start a new block of `command` anchored at `position`.
    pub fn begin(&mut self, command: BlockCommand, position: Point) {
        self.clear_items();
        self.command = command;
        self.state = BlockState::Sizing;
        self.rect = Rect::new(position, position);
        self.move_vector = Point::default();
        self.last_cursor_position = position;
        self.set_message();
    }

    /// Drop the picks, then return to `Idle`/`NoBlock`.
    pub fn reset(&mut self) {
        self.clear_items();
        self.state = BlockState::NoBlock;
        self.command = BlockCommand::Idle;
    }

    /// Full reset, geometry and status included.
    pub fn clear(&mut self) {
        self.reset();
        self.rect = Rect::default();
        self.move_vector = Point::default();
        self.last_cursor_position = Point::default();
        self.message.clear();
    }

    pub fn set_message(&mut self) {
        self.message = self.command.label().to_string();
    }

    /// Draw the rectangle translated by `offset`.
    pub fn draw(&self, canvas: &mut dyn Canvas, offset: Point, mode: DrawMode, color: Color) {
        canvas.draw_rect(self.rect.translated(offset), mode, color);
    }
}

impl Default for BlockSelector {
    fn default() -> Self {
        Self::new(Color::BROWN)
    }
}
