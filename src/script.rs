//! Scripted interaction replay.
//!
//! A script is a JSON array of [`Action`]s, one per input event:
//!
//! ```json
//! [
//!   { "action": "begin", "key": "none", "at": { "x": 0, "y": 0 } },
//!   { "action": "move", "to": { "x": 120, "y": 80 } },
//!   { "action": "end" },
//!   { "action": "move", "to": { "x": 160, "y": 80 } },
//!   { "action": "place" }
//! ]
//! ```

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::editor::block::{BlockCommand, KeyChord, command_for_key};
use crate::editor::canvas::Canvas;
use crate::editor::state::EditorSession;
use crate::model::{ItemId, Point};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Button down. `command` wins over `key`; with neither, a move starts.
    Begin {
        #[serde(default)]
        key: Option<KeyChord>,
        #[serde(default)]
        command: Option<BlockCommand>,
        at: Point,
    },
    Move {
        to: Point,
    },
    End,
    Place,
    Popup {
        command: BlockCommand,
    },
    Preselect {
        ids: Vec<ItemId>,
    },
    Abort,
    Undo,
    Redo,
}

impl Action {
    fn begin_command(key: Option<KeyChord>, command: Option<BlockCommand>) -> BlockCommand {
        command
            .or_else(|| key.map(command_for_key))
            .unwrap_or(BlockCommand::Move)
    }
}

pub fn parse_script(json: &str) -> Result<Vec<Action>> {
    serde_json::from_str(json).context("parse interaction script")
}

pub fn load_script(path: &Utf8Path) -> Result<Vec<Action>> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Open {}", path))?;
    parse_script(&json).with_context(|| format!("Failed to parse {}", path))
}

/// Feed `actions` to the session in order.
pub fn replay(session: &mut EditorSession, canvas: &mut dyn Canvas, actions: &[Action]) {
    for (step, action) in actions.iter().enumerate() {
        tracing::debug!(step, ?action, "replay");
        match action {
            Action::Begin { key, command, at } => {
                let command = Action::begin_command(*key, *command);
                session.handle_block_begin(canvas, command, *at);
            }
            Action::Move { to } => session.on_mouse_move(canvas, *to),
            Action::End => {
                let pending = session.handle_block_end(canvas);
                tracing::debug!(step, pending, "block end");
            }
            Action::Place => session.handle_block_place(canvas),
            Action::Popup { command } => session.handle_block_end_by_popup(canvas, *command),
            Action::Preselect { ids } => {
                session.preselect(canvas, ids);
            }
            Action::Abort => session.abort_block_command(canvas),
            Action::Undo => {
                if !session.undo() {
                    session.info("Nothing to undo");
                }
            }
            Action::Redo => {
                if !session.redo() {
                    session.info("Nothing to redo");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let actions = parse_script(
            r#"[
                { "action": "begin", "key": "ctrl", "at": { "x": 1, "y": 2 } },
                { "action": "begin", "command": "paste", "at": { "x": 0, "y": 0 } },
                { "action": "begin", "key": { "raw": 7 }, "at": { "x": 0, "y": 0 } },
                { "action": "popup", "command": "mirror_x" },
                { "action": "undo" }
            ]"#,
        )
        .unwrap();
        assert_eq!(actions.len(), 5);
        let Action::Begin { key, command, at } = &actions[0] else {
            panic!("expected begin");
        };
        assert_eq!(Action::begin_command(*key, *command), BlockCommand::Drag);
        assert_eq!(*at, Point::new(1, 2));
        let Action::Begin { key, command, .. } = &actions[2] else {
            panic!("expected begin");
        };
        assert_eq!(Action::begin_command(*key, *command), BlockCommand::Rotate);
        assert_eq!(
            actions[3],
            Action::Popup {
                command: BlockCommand::MirrorX
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_action() {
        assert!(parse_script(r#"[{ "action": "fly" }]"#).is_err());
    }
}
