//! Block command handlers.
//!
//! The interaction runs in up to three steps, each driven by the input layer:
//!
//! 1. [`EditorSession::handle_block_begin`] when the button goes down,
//! 2. [`EditorSession::handle_block_end`] when the rectangle is released,
//! 3. [`EditorSession::handle_block_place`] when the floating items are dropped.
//!
//! In between, [`EditorSession::on_mouse_move`] runs whichever outline renderer
//! the current [`MouseCapture`] names. Both renderers draw in XOR mode: drawing
//! the same outline twice cancels it, so "erase" is just a repeat of the last
//! draw.

use std::collections::HashSet;

use super::block::{BlockCommand, BlockState};
use super::canvas::{Canvas, DrawMode};
use super::operations::{self, ItemPicker, PickedRef, UndoCommand, UndoRole};
use super::state::{CursorShape, EditorSession, MouseCapture};
use crate::error::{BlockError, BlockResult};
use crate::model::{Endpoints, ItemFlags, ItemId, ItemKind, Point, SchItem};

/// Undo role recorded for items picked by `command`.
fn role_for(command: BlockCommand) -> UndoRole {
    match command {
        BlockCommand::Move | BlockCommand::Drag => UndoRole::Moved,
        BlockCommand::Copy | BlockCommand::Paste => UndoRole::New,
        BlockCommand::Delete | BlockCommand::Save => UndoRole::Deleted,
        BlockCommand::Rotate => UndoRole::Rotated,
        BlockCommand::MirrorX => UndoRole::MirroredX,
        BlockCommand::MirrorY => UndoRole::MirroredY,
        _ => UndoRole::Changed,
    }
}

impl EditorSession {
    // ────────────────────────────────────────────────────────────────────────
    // Outline renderers
    // ────────────────────────────────────────────────────────────────────────

    /// Run the installed outline renderer.
    pub fn redraw_capture(&mut self, canvas: &mut dyn Canvas, erase: bool) {
        match self.capture {
            MouseCapture::None => {}
            MouseCapture::SizingBlock => self.draw_sizing_block_outlines(canvas, erase),
            MouseCapture::MovingBlock => self.draw_moving_block_outlines(canvas, erase),
        }
    }

    /// Cursor moved to `position`: update the crosshair and the outline.
    pub fn on_mouse_move(&mut self, canvas: &mut dyn Canvas, position: Point) {
        self.crosshair = position;
        self.redraw_capture(canvas, true);
    }

    /// Rubber band: the block end follows the cursor.
    pub fn draw_sizing_block_outlines(&mut self, canvas: &mut dyn Canvas, erase: bool) {
        let color = self.block.color;
        self.block.move_vector = Point::default();
        if erase {
            self.block.draw(canvas, Point::default(), DrawMode::Xor, color);
        }
        self.block.last_cursor_position = self.crosshair;
        self.block.set_end(self.crosshair);
        self.block.draw(canvas, Point::default(), DrawMode::Xor, color);
    }

    /// The block and the ghosts of its items follow the cursor.
    pub fn draw_moving_block_outlines(&mut self, canvas: &mut dyn Canvas, erase: bool) {
        if erase {
            self.draw_block_ghost(canvas);
        }
        self.block.move_vector = self.crosshair - self.block.last_cursor_position;
        self.draw_block_ghost(canvas);
    }

    fn draw_block_ghost(&self, canvas: &mut dyn Canvas) {
        let offset = self.block.move_vector;
        let ghost = self.config.ghost_color;
        self.block.draw(canvas, offset, DrawMode::Xor, self.block.color);
        for picker in &self.block.items {
            let item = match picker.item {
                PickedRef::Live(id) => self.schematic.get(id),
                PickedRef::Buffered(index) => self.snapshot.items().get(index),
            };
            let Some(item) = item else { continue };
            match Endpoints::from_flags(item.flags) {
                Endpoints::Both => item.draw(canvas, offset, DrawMode::Xor, ghost),
                ends => {
                    // Dragged wire: draw it stretched, not translated.
                    let mut stretched = item.clone();
                    stretched.move_endpoints(offset, ends);
                    stretched.draw(canvas, Point::default(), DrawMode::Xor, ghost);
                }
            }
        }
    }

    /// Repeat the last outline draw, removing it from the canvas.
    fn erase_ghost(&mut self, canvas: &mut dyn Canvas) {
        if self.is_mouse_captured() {
            self.redraw_capture(canvas, false);
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Begin / abort
    // ────────────────────────────────────────────────────────────────────────

    /// Start a block command at `position`.
    ///
    /// Paste skips the rectangle: the buffer contents follow the cursor right
    /// away. Returns false if nothing was started.
    pub fn handle_block_begin(
        &mut self,
        canvas: &mut dyn Canvas,
        command: BlockCommand,
        position: Point,
    ) -> bool {
        if self.block.state != BlockState::NoBlock {
            tracing::warn!(active = ?self.block.command, requested = ?command, "block command already in progress");
            return false;
        }
        if command == BlockCommand::Idle {
            return false;
        }
        tracing::debug!(?command, ?position, "block begin");

        self.block.begin(command, position);
        self.crosshair = position;

        if command == BlockCommand::Paste {
            // Buffer items are stored relative to the origin.
            self.block.last_cursor_position = Point::default();
            self.init_block_paste_infos();
            if self.block.is_empty() {
                self.report(BlockError::EmptyPasteBuffer);
                self.block.clear();
                return false;
            }
            self.block.state = BlockState::Move;
            self.set_mouse_capture(MouseCapture::MovingBlock);
            self.cursor = CursorShape::Move;
        } else {
            self.set_mouse_capture(MouseCapture::SizingBlock);
            self.cursor = CursorShape::Crosshair;
        }
        self.redraw_capture(canvas, false);
        true
    }

    /// Load the snapshot buffer into the selection as paste candidates.
    fn init_block_paste_infos(&mut self) {
        self.block.items = (0..self.snapshot.len())
            .map(|index| ItemPicker {
                item: PickedRef::Buffered(index),
                role: UndoRole::New,
            })
            .collect();
        if let Some(bbox) = self
            .snapshot
            .items()
            .iter()
            .map(SchItem::bounding_box)
            .reduce(|a, b| a.union(&b))
        {
            self.block.rect = bbox;
        }
    }

    /// Start a [`BlockCommand::PresetMove`] of items picked beforehand.
    ///
    /// The block rectangle is the bounding box of the items. Returns true when
    /// the items now follow the cursor.
    pub fn preselect(&mut self, canvas: &mut dyn Canvas, ids: &[ItemId]) -> bool {
        if self.block.state != BlockState::NoBlock {
            return false;
        }
        let present: Vec<ItemId> = ids
            .iter()
            .copied()
            .filter(|id| self.schematic.get(*id).is_some())
            .collect();
        let Some(rect) = present
            .iter()
            .filter_map(|id| self.schematic.get(*id))
            .map(SchItem::bounding_box)
            .reduce(|a, b| a.union(&b))
        else {
            return false;
        };

        self.block.begin(BlockCommand::PresetMove, rect.end);
        self.block.rect = rect;
        let role = role_for(BlockCommand::PresetMove);
        self.block.items = present
            .into_iter()
            .map(|id| ItemPicker::live(id, role))
            .collect();
        self.crosshair = rect.end;
        self.set_mouse_capture(MouseCapture::SizingBlock);
        self.redraw_capture(canvas, false);
        self.handle_block_end(canvas)
    }

    /// Cancel the current block command without mutating the document.
    pub fn abort_block_command(&mut self, canvas: &mut dyn Canvas) {
        tracing::debug!(command = ?self.block.command, "block abort");
        self.erase_ghost(canvas);
        self.schematic.clear_drawing_state();
        self.block.clear();
        self.schematic.current_item = None;
        self.release_mouse_capture();
        self.request_repaint();
    }

    // ────────────────────────────────────────────────────────────────────────
    // Block end
    // ────────────────────────────────────────────────────────────────────────

    /// The rectangle has been released.
    ///
    /// Depending on the command this either completes it here or arms
    /// placement. Returns true if [`EditorSession::handle_block_place`] must
    /// follow.
    pub fn handle_block_end(&mut self, canvas: &mut dyn Canvas) -> bool {
        let mut pending = false;
        let mut zoom = false;

        if !self.block.is_empty() && self.block.state == BlockState::Sizing {
            // Preselected items: restart from the block end with the rubber band.
            self.set_mouse_capture(MouseCapture::SizingBlock);
            self.crosshair = self.block.end();
        }

        let command = self.block.command;
        tracing::debug!(?command, picked = self.block.count(), "block end");

        if self.is_mouse_captured() {
            match command {
                BlockCommand::Idle => self.report(BlockError::NoActiveCommand),
                BlockCommand::Drag => {
                    self.schematic.break_segments_on_junctions();
                    self.update_pick_list();
                    pending = self.follow_cursor(canvas);
                }
                BlockCommand::Move | BlockCommand::Copy => {
                    self.update_pick_list();
                    pending = self.follow_cursor(canvas);
                }
                BlockCommand::PresetMove => pending = self.follow_cursor(canvas),
                BlockCommand::Rotate | BlockCommand::MirrorX | BlockCommand::MirrorY => {
                    self.update_pick_list();
                    self.draw_sizing_block_outlines(canvas, false);
                    self.transform_picked(command);
                    self.block.clear_items();
                    self.schematic.test_dangling_ends();
                    self.request_repaint();
                }
                BlockCommand::Delete => {
                    self.update_pick_list();
                    self.draw_sizing_block_outlines(canvas, false);
                    self.delete_picked();
                }
                BlockCommand::Save => {
                    self.update_pick_list();
                    self.draw_sizing_block_outlines(canvas, false);
                    self.save_picked();
                }
                BlockCommand::Paste => {
                    self.block.state = BlockState::Move;
                    pending = !self.block.is_empty();
                }
                BlockCommand::Zoom => zoom = true,
                BlockCommand::Flip | BlockCommand::SelectOnly | BlockCommand::Abort => {}
            }
        }

        if command == BlockCommand::Abort {
            self.schematic.clear_drawing_state();
            self.request_repaint();
        }

        if !pending {
            self.end_block_command();
        }

        if zoom {
            self.window_zoom(self.block.rect);
        }

        pending
    }

    /// Back to `Idle`/`NoBlock` with nothing picked and no capture.
    fn end_block_command(&mut self) {
        self.schematic.clear_drawing_state();
        self.block.reset();
        self.schematic.current_item = None;
        self.release_mouse_capture();
    }

    /// Pick every item touched by the block rectangle.
    fn update_pick_list(&mut self) {
        let role = role_for(self.block.command);
        self.block.items = self
            .schematic
            .items_in_rect(&self.block.rect)
            .into_iter()
            .map(|id| ItemPicker::live(id, role))
            .collect();
    }

    /// Switch from the rubber band to the moving outline if anything was picked.
    fn follow_cursor(&mut self, canvas: &mut dyn Canvas) -> bool {
        if self.block.is_empty() {
            self.redraw_capture(canvas, false);
            self.set_mouse_capture(MouseCapture::None);
            return false;
        }
        self.select_block_items();
        self.redraw_capture(canvas, false);
        self.set_mouse_capture(MouseCapture::MovingBlock);
        self.cursor = CursorShape::Move;
        self.redraw_capture(canvas, false);
        self.block.state = BlockState::Move;
        true
    }

    /// Flag picked items as selected.
    ///
    /// For a drag, wires crossing the block without an end inside it are
    /// dropped, wires with one end inside only move that end, and wires
    /// hanging off picked symbol pins are added so they stretch.
    fn select_block_items(&mut self) {
        let rect = self.block.rect;
        let drag = self.block.command == BlockCommand::Drag;

        let mut kept = Vec::with_capacity(self.block.items.len());
        for picker in std::mem::take(&mut self.block.items) {
            let Some(id) = picker.live_id() else {
                kept.push(picker);
                continue;
            };
            let Some(item) = self.schematic.get_mut(id) else {
                continue;
            };
            if drag {
                let ends = match &item.kind {
                    ItemKind::Line(l) => Some((rect.contains(l.start), rect.contains(l.end))),
                    _ => None,
                };
                match ends {
                    Some((false, false)) => continue,
                    Some((true, false)) => item.flags.insert(ItemFlags::STARTPOINT),
                    Some((false, true)) => item.flags.insert(ItemFlags::ENDPOINT),
                    _ => {}
                }
            }
            item.flags.insert(ItemFlags::SELECTED);
            kept.push(picker);
        }
        self.block.items = kept;

        if drag {
            self.pick_wires_on_pins();
        }
    }

    fn pick_wires_on_pins(&mut self) {
        let picked: HashSet<ItemId> = self
            .block
            .items
            .iter()
            .filter_map(ItemPicker::live_id)
            .collect();
        let anchors: HashSet<Point> = picked
            .iter()
            .filter_map(|id| self.schematic.get(*id))
            .filter(|item| item.as_line().is_none())
            .flat_map(SchItem::connection_points)
            .collect();
        if anchors.is_empty() {
            return;
        }

        for item in &mut self.schematic.items {
            let ItemKind::Line(line) = &item.kind else { continue };
            if !line.is_connectable() {
                continue;
            }
            let start = anchors.contains(&line.start);
            let end = anchors.contains(&line.end);
            if picked.contains(&item.id) {
                // An outside end sitting on a moving pin moves too.
                let moves_start = item.flags.contains(ItemFlags::STARTPOINT) || start;
                let moves_end = item.flags.contains(ItemFlags::ENDPOINT) || end;
                if moves_start && moves_end {
                    item.flags.remove(ItemFlags::STARTPOINT);
                    item.flags.remove(ItemFlags::ENDPOINT);
                }
                continue;
            }
            match (start, end) {
                (false, false) => continue,
                (true, false) => item.flags.insert(ItemFlags::STARTPOINT),
                (false, true) => item.flags.insert(ItemFlags::ENDPOINT),
                (true, true) => {}
            }
            item.flags.insert(ItemFlags::SELECTED);
            self.block.items.push(ItemPicker::live(item.id, UndoRole::Moved));
        }
    }

    /// Rotate or mirror the picked items around the block centre.
    fn transform_picked(&mut self, command: BlockCommand) {
        if self.block.is_empty() {
            return;
        }
        let centre = self.block.centre();
        self.crosshair = centre;
        let role = role_for(command);
        self.history
            .save_copy(&self.schematic, &self.block.items, role, centre);
        match command {
            BlockCommand::Rotate => {
                operations::rotate_items(&mut self.schematic, &self.block.items, centre)
            }
            BlockCommand::MirrorX => {
                operations::mirror_x_items(&mut self.schematic, &self.block.items, centre)
            }
            _ => operations::mirror_y_items(&mut self.schematic, &self.block.items, centre),
        }
        self.mark_modified();
    }

    /// Delete the picked items, then refresh connectivity.
    fn delete_picked(&mut self) {
        if !self.block.is_empty() {
            self.history.save_copy(
                &self.schematic,
                &self.block.items,
                UndoRole::Deleted,
                Point::default(),
            );
            operations::delete_items(&mut self.schematic, &self.block.items);
            self.mark_modified();
        }
        self.block.clear_items();
        self.schematic.test_dangling_ends();
        self.request_repaint();
    }

    /// Copy the picked items into the snapshot buffer, anchored at the origin.
    fn save_picked(&mut self) {
        if !self.block.is_empty() {
            let move_vector = -self.block.last_cursor_position;
            self.copy_block_items();
            operations::move_owned_items(self.snapshot.items_mut(), move_vector);
        }
        self.block.clear_items();
    }

    /// Replace the snapshot buffer with deep copies of the picked items.
    fn copy_block_items(&mut self) {
        let mut copies = Vec::with_capacity(self.block.count());
        for id in self.block.items.iter().filter_map(ItemPicker::live_id) {
            if let Some(item) = self.schematic.get_mut(id) {
                item.flags = ItemFlags::empty();
                copies.push(item.duplicate(item.id));
            }
        }
        tracing::debug!(count = copies.len(), "block saved");
        self.snapshot.replace(copies);
    }

    // ────────────────────────────────────────────────────────────────────────
    // Block place
    // ────────────────────────────────────────────────────────────────────────

    /// Commit the floating items at the current move vector.
    pub fn handle_block_place(&mut self, canvas: &mut dyn Canvas) {
        if !self.is_mouse_captured() {
            self.report(BlockError::CaptureNotActive);
        }
        if self.block.is_empty() {
            let err = BlockError::EmptySelection {
                command: self.block.command,
                state: self.block.state,
            };
            self.report(err);
        }

        self.block.state = BlockState::Stop;
        let command = self.block.command;
        tracing::debug!(?command, vector = ?self.block.move_vector, "block place");

        match command {
            BlockCommand::Idle => {}
            BlockCommand::Rotate
            | BlockCommand::MirrorX
            | BlockCommand::MirrorY
            | BlockCommand::Drag
            | BlockCommand::Move => {
                self.erase_ghost(canvas);
                let vector = self.block.move_vector;
                self.history
                    .save_copy(&self.schematic, &self.block.items, UndoRole::Moved, vector);
                operations::move_items(&mut self.schematic, &self.block.items, vector);
                self.block.clear_items();
            }
            BlockCommand::Copy | BlockCommand::PresetMove => {
                self.erase_ghost(canvas);
                let created = operations::duplicate_items(
                    &mut self.schematic,
                    &self.block.items,
                    self.block.move_vector,
                );
                if command == BlockCommand::PresetMove {
                    // The duplicates had no prior state: undo removes them.
                    self.history.push(UndoCommand::Changed {
                        images: created
                            .iter()
                            .filter_map(ItemPicker::live_id)
                            .map(|id| (id, None))
                            .collect(),
                    });
                } else {
                    self.history
                        .save_copy(&self.schematic, &created, UndoRole::New, Point::default());
                }
                self.block.clear_items();
            }
            BlockCommand::Paste => {
                self.erase_ghost(canvas);
                if let Err(err) = self.paste_from_buffer(canvas) {
                    self.report(err);
                }
                self.block.clear_items();
            }
            BlockCommand::Zoom
            | BlockCommand::Delete
            | BlockCommand::Save
            | BlockCommand::Flip
            | BlockCommand::Abort
            | BlockCommand::SelectOnly => {}
        }

        self.mark_modified();
        self.schematic.clear_drawing_state();

        if !self.block.is_empty() {
            let count = self.block.count();
            self.report(BlockError::ResidualSelection { count });
            self.block.clear_items();
        }

        self.block.reset();
        self.schematic.current_item = None;
        self.schematic.test_dangling_ends();
        self.release_mouse_capture();
        self.request_repaint();
    }

    /// Insert fresh copies of the snapshot buffer into the document at the
    /// current move vector. The buffer is left as it was.
    ///
    /// Pasted symbols get a new timestamp and lose their reference number.
    pub fn paste_from_buffer(&mut self, canvas: &mut dyn Canvas) -> BlockResult<Vec<ItemId>> {
        if self.snapshot.is_empty() {
            return Err(BlockError::EmptyPasteBuffer);
        }

        let mut pickers = Vec::with_capacity(self.snapshot.len());
        for buffered in self.snapshot.items().to_vec() {
            let id = self.schematic.alloc_id();
            let mut item = buffered.duplicate(id);
            if let ItemKind::Component(component) = &mut item.kind {
                component.timestamp = self.schematic.new_timestamp();
                component.clear_annotation();
            }
            item.draw(canvas, Point::default(), DrawMode::Copy, self.config.item_color);
            self.schematic.push_front(item);
            pickers.push(ItemPicker::live(id, UndoRole::New));
        }

        self.history
            .save_copy(&self.schematic, &pickers, UndoRole::New, Point::default());
        operations::move_items(&mut self.schematic, &pickers, self.block.move_vector);
        self.schematic.clear_drawing_state();
        self.mark_modified();

        tracing::debug!(count = pickers.len(), "pasted block");
        Ok(pickers.iter().filter_map(ItemPicker::live_id).collect())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Popup conversion
    // ────────────────────────────────────────────────────────────────────────

    /// Turn a pending block move into `command`, chosen from the context menu.
    ///
    /// Only a [`BlockCommand::Move`] whose items already follow the cursor can
    /// be converted, and converting to move does nothing. Copy and drag keep
    /// the items following the cursor; every other command completes here.
    pub fn handle_block_end_by_popup(&mut self, canvas: &mut dyn Canvas, command: BlockCommand) {
        if self.block.command != BlockCommand::Move
            || self.block.state != BlockState::Move
            || command == BlockCommand::Move
        {
            return;
        }
        tracing::debug!(?command, "block move converted");

        self.block.command = command;
        self.block.set_message();
        let mut finished = true;

        match command {
            BlockCommand::Copy => {
                for picker in &mut self.block.items {
                    picker.role = UndoRole::New;
                }
                self.block.state = BlockState::Move;
                finished = false;
            }
            BlockCommand::Drag => {
                self.erase_ghost(canvas);
                // Rebuild the pick list with the items to drag.
                self.block.clear_items();
                self.schematic.clear_drawing_state();
                self.schematic.break_segments_on_junctions();
                self.update_pick_list();
                if !self.block.is_empty() {
                    finished = false;
                    self.select_block_items();
                    if self.is_mouse_captured() {
                        self.redraw_capture(canvas, false);
                    }
                    self.block.state = BlockState::Move;
                }
            }
            BlockCommand::Delete => {
                self.erase_ghost(canvas);
                for picker in &mut self.block.items {
                    picker.role = UndoRole::Deleted;
                }
                self.delete_picked();
            }
            BlockCommand::Save => {
                self.erase_ghost(canvas);
                self.save_picked();
            }
            BlockCommand::Zoom => {
                self.erase_ghost(canvas);
                self.cursor = CursorShape::Default;
                self.window_zoom(self.block.rect);
            }
            BlockCommand::Rotate | BlockCommand::MirrorX | BlockCommand::MirrorY => {
                self.erase_ghost(canvas);
                self.transform_picked(command);
                self.schematic.test_dangling_ends();
                self.request_repaint();
            }
            _ => self.erase_ghost(canvas),
        }

        if finished {
            self.schematic.clear_drawing_state();
            self.block.clear();
            self.schematic.current_item = None;
            self.release_mouse_capture();
        }
    }
}
