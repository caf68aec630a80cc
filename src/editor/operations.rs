//! Editing operations over picked items.
//!
//! This module provides the mutation primitives the block commands sequence
//! (move, rotate, mirror, duplicate, delete) and the undo/redo list they record
//! into.
//!
//! # Design
//!
//! A picked item is an [`ItemPicker`]: a reference to an item plus the
//! [`UndoRole`] that will be recorded when the command commits. References are
//! either live document items or entries of the snapshot (paste) buffer, which
//! owns its items outright. Every [`UndoCommand`] knows how to apply its own
//! inverse, so [`UndoHistory`] only shuffles commands between two stacks.

use crate::model::{Endpoints, ItemFlags, ItemId, Point, SchItem, Schematic};

// ────────────────────────────────────────────────────────────────────────────
// Pickers
// ────────────────────────────────────────────────────────────────────────────

/// What an undo entry records about its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoRole {
    New,
    Deleted,
    Changed,
    Moved,
    Rotated,
    MirroredX,
    MirroredY,
}

/// Where a picked item lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickedRef {
    /// An item of the live document.
    Live(ItemId),
    /// Index into the snapshot buffer, which owns the item.
    Buffered(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemPicker {
    pub item: PickedRef,
    pub role: UndoRole,
}

impl ItemPicker {
    pub fn live(id: ItemId, role: UndoRole) -> Self {
        Self {
            item: PickedRef::Live(id),
            role,
        }
    }

    pub fn live_id(&self) -> Option<ItemId> {
        match self.item {
            PickedRef::Live(id) => Some(id),
            PickedRef::Buffered(_) => None,
        }
    }
}

fn live_ids(pickers: &[ItemPicker]) -> Vec<ItemId> {
    pickers.iter().filter_map(ItemPicker::live_id).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Mutation primitives
// ────────────────────────────────────────────────────────────────────────────

/// Translate every picked live item, honouring line endpoint flags.
pub fn move_items(schematic: &mut Schematic, pickers: &[ItemPicker], vector: Point) {
    for id in live_ids(pickers) {
        if let Some(item) = schematic.get_mut(id) {
            let ends = Endpoints::from_flags(item.flags);
            item.move_endpoints(vector, ends);
        }
    }
}

/// Translate owned items (the snapshot buffer) in place.
pub fn move_owned_items(items: &mut [SchItem], vector: Point) {
    for item in items {
        item.move_by(vector);
    }
}

pub fn rotate_items(schematic: &mut Schematic, pickers: &[ItemPicker], centre: Point) {
    for id in live_ids(pickers) {
        if let Some(item) = schematic.get_mut(id) {
            item.rotate(centre);
        }
    }
}

pub fn mirror_x_items(schematic: &mut Schematic, pickers: &[ItemPicker], centre: Point) {
    for id in live_ids(pickers) {
        if let Some(item) = schematic.get_mut(id) {
            item.mirror_x(centre.y);
        }
    }
}

pub fn mirror_y_items(schematic: &mut Schematic, pickers: &[ItemPicker], centre: Point) {
    for id in live_ids(pickers) {
        if let Some(item) = schematic.get_mut(id) {
            item.mirror_y(centre.x);
        }
    }
}

/// Duplicate every picked item at `vector` from the original and insert the
/// copies into the document. Originals are untouched.
///
/// Returns pickers for the new items, tagged [`UndoRole::New`].
pub fn duplicate_items(
    schematic: &mut Schematic,
    pickers: &[ItemPicker],
    vector: Point,
) -> Vec<ItemPicker> {
    let mut created = Vec::with_capacity(pickers.len());
    for id in live_ids(pickers) {
        let Some(original) = schematic.get(id).cloned() else {
            continue;
        };
        let new_id = schematic.alloc_id();
        let mut copy = original.duplicate(new_id);
        copy.move_by(vector);
        copy.flags.insert(ItemFlags::IS_NEW);
        schematic.push_front(copy);
        created.push(ItemPicker::live(new_id, UndoRole::New));
    }
    created
}

/// Remove every picked item from the document.
///
/// Returns `(chain index, item)` pairs in removal order.
pub fn delete_items(schematic: &mut Schematic, pickers: &[ItemPicker]) -> Vec<(usize, SchItem)> {
    live_ids(pickers)
        .into_iter()
        .filter_map(|id| schematic.remove(id))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Undo command (undo/redo unit)
// ────────────────────────────────────────────────────────────────────────────

/// A single reversible block edit.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoCommand {
    /// Items were moved by `vector`; lines remember which ends moved.
    Moved {
        items: Vec<(ItemId, Endpoints)>,
        vector: Point,
    },
    /// Items were rotated a quarter turn around `centre`.
    Rotated { ids: Vec<ItemId>, centre: Point },
    MirroredX { ids: Vec<ItemId>, centre: Point },
    MirroredY { ids: Vec<ItemId>, centre: Point },
    /// Items were created; undo removes them.
    New { ids: Vec<ItemId> },
    /// Items were removed; holds `(chain index, item)` in removal order.
    Deleted { removed: Vec<(usize, SchItem)> },
    /// Items were replaced. Holds the image to restore per item, `None`
    /// meaning the item did not exist.
    Changed { images: Vec<(ItemId, Option<SchItem>)> },
    /// Reverse of [`UndoCommand::Rotated`].
    RotatedBack { ids: Vec<ItemId>, centre: Point },
}

impl UndoCommand {
    pub fn role(&self) -> UndoRole {
        match self {
            UndoCommand::Moved { .. } => UndoRole::Moved,
            UndoCommand::Rotated { .. } | UndoCommand::RotatedBack { .. } => UndoRole::Rotated,
            UndoCommand::MirroredX { .. } => UndoRole::MirroredX,
            UndoCommand::MirroredY { .. } => UndoRole::MirroredY,
            UndoCommand::New { .. } => UndoRole::New,
            UndoCommand::Deleted { .. } => UndoRole::Deleted,
            UndoCommand::Changed { .. } => UndoRole::Changed,
        }
    }

    /// Number of items the entry covers.
    pub fn len(&self) -> usize {
        match self {
            UndoCommand::Moved { items, .. } => items.len(),
            UndoCommand::Rotated { ids, .. }
            | UndoCommand::RotatedBack { ids, .. }
            | UndoCommand::MirroredX { ids, .. }
            | UndoCommand::MirroredY { ids, .. }
            | UndoCommand::New { ids } => ids.len(),
            UndoCommand::Deleted { removed } => removed.len(),
            UndoCommand::Changed { images } => images.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build the entry recorded for `pickers` under `role`.
    ///
    /// `anchor` is the move vector for [`UndoRole::Moved`] and the rotation or
    /// mirror centre for the transforms. For [`UndoRole::Changed`] the current
    /// item images are captured.
    pub fn from_pickers(
        schematic: &Schematic,
        pickers: &[ItemPicker],
        role: UndoRole,
        anchor: Point,
    ) -> UndoCommand {
        let ids = live_ids(pickers);
        match role {
            UndoRole::Moved => UndoCommand::Moved {
                items: ids
                    .into_iter()
                    .map(|id| {
                        let ends = schematic
                            .get(id)
                            .map(|i| Endpoints::from_flags(i.flags))
                            .unwrap_or_default();
                        (id, ends)
                    })
                    .collect(),
                vector: anchor,
            },
            UndoRole::Rotated => UndoCommand::Rotated { ids, centre: anchor },
            UndoRole::MirroredX => UndoCommand::MirroredX { ids, centre: anchor },
            UndoRole::MirroredY => UndoCommand::MirroredY { ids, centre: anchor },
            UndoRole::New => UndoCommand::New { ids },
            UndoRole::Deleted => {
                // Indices as `delete_items` will see them, one removal at a time.
                let mut taken: Vec<usize> = Vec::new();
                let mut removed = Vec::new();
                for id in ids {
                    let Some(index) = schematic.index_of(id) else {
                        continue;
                    };
                    let shift = taken.iter().filter(|&&t| t < index).count();
                    taken.push(index);
                    removed.push((index - shift, schematic.items[index].clone()));
                }
                UndoCommand::Deleted { removed }
            }
            UndoRole::Changed => UndoCommand::Changed {
                images: ids
                    .into_iter()
                    .map(|id| (id, schematic.get(id).cloned()))
                    .collect(),
            },
        }
    }

    /// Apply the inverse of this command, returning the command that redoes it.
    fn apply_inverse(&self, schematic: &mut Schematic) -> UndoCommand {
        match self {
            UndoCommand::Moved { items, vector } => {
                for &(id, ends) in items {
                    if let Some(item) = schematic.get_mut(id) {
                        item.move_endpoints(-*vector, ends);
                    }
                }
                UndoCommand::Moved {
                    items: items.clone(),
                    vector: -*vector,
                }
            }
            UndoCommand::Rotated { ids, centre } => {
                for &id in ids {
                    if let Some(item) = schematic.get_mut(id) {
                        // Three quarter turns undo one.
                        for _ in 0..3 {
                            item.rotate(*centre);
                        }
                    }
                }
                UndoCommand::RotatedBack {
                    ids: ids.clone(),
                    centre: *centre,
                }
            }
            UndoCommand::RotatedBack { ids, centre } => {
                for &id in ids {
                    if let Some(item) = schematic.get_mut(id) {
                        item.rotate(*centre);
                    }
                }
                UndoCommand::Rotated {
                    ids: ids.clone(),
                    centre: *centre,
                }
            }
            UndoCommand::MirroredX { ids, centre } => {
                for &id in ids {
                    if let Some(item) = schematic.get_mut(id) {
                        item.mirror_x(centre.y);
                    }
                }
                self.clone()
            }
            UndoCommand::MirroredY { ids, centre } => {
                for &id in ids {
                    if let Some(item) = schematic.get_mut(id) {
                        item.mirror_y(centre.x);
                    }
                }
                self.clone()
            }
            UndoCommand::New { ids } => {
                let removed = ids.iter().filter_map(|&id| schematic.remove(id)).collect();
                UndoCommand::Deleted { removed }
            }
            UndoCommand::Deleted { removed } => {
                // Re-insert in reverse removal order so recorded indices line up.
                for (index, item) in removed.iter().rev() {
                    schematic.insert_at(*index, item.clone());
                }
                UndoCommand::New {
                    ids: removed.iter().map(|(_, item)| item.id).collect(),
                }
            }
            UndoCommand::Changed { images } => {
                let mut current = Vec::with_capacity(images.len());
                for (id, image) in images {
                    current.push((*id, schematic.get(*id).cloned()));
                    match image {
                        Some(image) => match schematic.get_mut(*id) {
                            Some(item) => *item = image.clone(),
                            None => schematic.push_front(image.clone()),
                        },
                        None => {
                            schematic.remove(*id);
                        }
                    }
                }
                UndoCommand::Changed { images: current }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Undo history (undo / redo stack)
// ────────────────────────────────────────────────────────────────────────────

/// Undo/redo history for block edits.
///
/// # Example
///
/// ```rust,ignore
/// let mut history = UndoHistory::new(100);
/// history.save_copy(&schematic, &pickers, UndoRole::Moved, vector);
/// move_items(&mut schematic, &pickers, vector);
/// history.undo(&mut schematic); // reverts the move
/// history.redo(&mut schematic); // re-applies the move
/// ```
#[derive(Debug, Clone)]
pub struct UndoHistory {
    undo_stack: Vec<UndoCommand>,
    redo_stack: Vec<UndoCommand>,
    max_size: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(200)
    }
}

impl UndoHistory {
    /// Create a new history with the given maximum undo depth.
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size,
        }
    }

    /// Push a command onto the undo stack and clear the redo stack.
    pub fn push(&mut self, cmd: UndoCommand) {
        if cmd.is_empty() {
            return;
        }
        self.undo_stack.push(cmd);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.max_size {
            self.undo_stack.remove(0);
        }
    }

    /// Record `pickers` under `role`, see [`UndoCommand::from_pickers`].
    ///
    /// Must be called before the mutation for [`UndoRole::Deleted`] and
    /// [`UndoRole::Changed`], since those capture item images.
    pub fn save_copy(
        &mut self,
        schematic: &Schematic,
        pickers: &[ItemPicker],
        role: UndoRole,
        anchor: Point,
    ) {
        tracing::debug!(?role, count = pickers.len(), "save copy in undo list");
        self.push(UndoCommand::from_pickers(schematic, pickers, role, anchor));
    }

    /// Undo the last command, returning true if an undo was performed.
    pub fn undo(&mut self, schematic: &mut Schematic) -> bool {
        if let Some(cmd) = self.undo_stack.pop() {
            let redo = cmd.apply_inverse(schematic);
            self.redo_stack.push(redo);
            true
        } else {
            false
        }
    }

    /// Redo the last undone command, returning true if a redo was performed.
    pub fn redo(&mut self, schematic: &mut Schematic) -> bool {
        if let Some(cmd) = self.redo_stack.pop() {
            let undo = cmd.apply_inverse(schematic);
            self.undo_stack.push(undo);
            true
        } else {
            false
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// The most recent undoable entry.
    pub fn last(&self) -> Option<&UndoCommand> {
        self.undo_stack.last()
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }
}
