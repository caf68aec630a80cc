//! Block selection editing for schematic canvases.
//!
//! This crate provides the block-command state machine of a schematic editor:
//! a rubber-band rectangle picks items, which are then moved, dragged, copied,
//! deleted, rotated, mirrored, saved to a paste buffer or used as a zoom
//! target. See [`editor::EditorSession`] for the entry points.
//!
//! The binary `schblock` replays a JSON script of interaction events against a
//! schematic file and prints the resulting document.

pub mod config;
pub mod editor;
pub mod error;
pub mod logger;
pub mod model;
pub mod script;
