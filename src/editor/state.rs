//! Editor session state.
//!
//! [`EditorSession`] is the context every block handler works on: the
//! document, the live block selection, the snapshot (paste) buffer, the undo
//! history and the interaction state of the canvas. Handlers live in
//! [`super::commands`].

use serde::Serialize;

use super::block::BlockSelector;
use super::operations::UndoHistory;
use crate::config::EditorConfig;
use crate::error::BlockError;
use crate::model::{Point, Rect, SchItem, Schematic};

// ────────────────────────────────────────────────────────────────────────────
// Interaction state
// ────────────────────────────────────────────────────────────────────────────

/// Which outline renderer follows the mouse.
///
/// Exactly one can be installed; phases swap it rather than stack handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MouseCapture {
    #[default]
    None,
    /// The block rectangle follows the cursor while being dragged out.
    SizingBlock,
    /// The block and the ghosts of its items follow the cursor before placement.
    MovingBlock,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CursorShape {
    #[default]
    Default,
    Crosshair,
    Move,
}

/// Visible window over the document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub centre: Point,
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            centre: Point::default(),
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
    Info,
    Error,
}

/// A message surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserMessage {
    pub level: MessageLevel,
    pub text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Snapshot buffer
// ────────────────────────────────────────────────────────────────────────────

/// Save/paste buffer.
///
/// Owns deep copies of the saved items, normalised so the block anchor sits at
/// the origin. Nothing in the document aliases these items; pasting copies
/// them again.
#[derive(Debug, Clone, Default)]
pub struct SnapshotBuffer {
    items: Vec<SchItem>,
}

impl SnapshotBuffer {
    pub fn items(&self) -> &[SchItem] {
        &self.items
    }

    pub(crate) fn items_mut(&mut self) -> &mut [SchItem] {
        &mut self.items
    }

    /// Drop the previous contents and take `items`.
    pub fn replace(&mut self, items: Vec<SchItem>) {
        self.items = items;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Editor session
// ────────────────────────────────────────────────────────────────────────────

/// The complete block-editing state of one editor window.
///
/// # Example
///
/// ```rust,ignore
/// use schblock::editor::{EditorSession, BlockCommand, canvas::NullCanvas};
///
/// let mut session = EditorSession::new(schematic, EditorConfig::default());
/// let mut canvas = NullCanvas;
/// session.handle_block_begin(&mut canvas, BlockCommand::Move, Point::new(0, 0));
/// session.on_mouse_move(&mut canvas, Point::new(100, 80));
/// if session.handle_block_end(&mut canvas) {
///     session.on_mouse_move(&mut canvas, Point::new(140, 80));
///     session.handle_block_place(&mut canvas);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct EditorSession {
    pub schematic: Schematic,
    pub block: BlockSelector,
    pub snapshot: SnapshotBuffer,
    pub history: UndoHistory,
    pub capture: MouseCapture,
    /// Snapped cursor position in document coordinates.
    pub crosshair: Point,
    pub cursor: CursorShape,
    pub viewport: Viewport,
    pub messages: Vec<UserMessage>,
    /// Set when the whole canvas must be redrawn.
    pub repaint_requested: bool,
    pub config: EditorConfig,
}

impl EditorSession {
    pub fn new(schematic: Schematic, config: EditorConfig) -> Self {
        Self {
            schematic,
            block: BlockSelector::new(config.block_color),
            snapshot: SnapshotBuffer::default(),
            history: UndoHistory::new(config.undo_depth),
            capture: MouseCapture::None,
            crosshair: Point::default(),
            cursor: CursorShape::Default,
            viewport: Viewport::default(),
            messages: Vec::new(),
            repaint_requested: false,
            config,
        }
    }

    pub fn is_mouse_captured(&self) -> bool {
        self.capture != MouseCapture::None
    }

    pub fn set_mouse_capture(&mut self, capture: MouseCapture) {
        tracing::trace!(from = ?self.capture, to = ?capture, "mouse capture");
        self.capture = capture;
    }

    /// Release the capture and put the default tool cursor back.
    pub fn release_mouse_capture(&mut self) {
        self.set_mouse_capture(MouseCapture::None);
        self.cursor = CursorShape::Default;
    }

    /// Surface a non-fatal error to the user.
    pub fn report(&mut self, err: BlockError) {
        tracing::error!("{}", err);
        self.messages.push(UserMessage {
            level: MessageLevel::Error,
            text: err.to_string(),
        });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!("{}", text);
        self.messages.push(UserMessage {
            level: MessageLevel::Info,
            text,
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .filter(|m| m.level == MessageLevel::Error)
            .map(|m| m.text.as_str())
    }

    pub fn take_messages(&mut self) -> Vec<UserMessage> {
        std::mem::take(&mut self.messages)
    }

    pub fn mark_modified(&mut self) {
        self.schematic.modified = true;
    }

    pub fn request_repaint(&mut self) {
        self.repaint_requested = true;
    }

    /// Centre the view on `rect` and scale it to fill the viewport.
    pub fn window_zoom(&mut self, rect: Rect) {
        let w = rect.width().max(1) as f64;
        let h = rect.height().max(1) as f64;
        let scale_x = self.config.viewport_width as f64 / w;
        let scale_y = self.config.viewport_height as f64 / h;
        self.viewport = Viewport {
            centre: rect.centre(),
            scale: scale_x.min(scale_y),
        };
        tracing::debug!(viewport = ?self.viewport, "window zoom");
        self.request_repaint();
    }

    /// Undo the last block edit.
    pub fn undo(&mut self) -> bool {
        let done = self.history.undo(&mut self.schematic);
        if done {
            self.after_history_step();
        }
        done
    }

    /// Redo the last undone block edit.
    pub fn redo(&mut self) -> bool {
        let done = self.history.redo(&mut self.schematic);
        if done {
            self.after_history_step();
        }
        done
    }

    fn after_history_step(&mut self) {
        self.mark_modified();
        self.schematic.test_dangling_ends();
        self.request_repaint();
    }
}
