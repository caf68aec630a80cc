//! Schematic document model.
//!
//! A [`Schematic`] is an ordered chain of [`SchItem`]s. Each item wraps a closed
//! [`ItemKind`] variant (wire, junction, label, symbol instance, ...) and exposes
//! the capabilities the block editor sequences: draw, duplicate, move, rotate
//! and mirror. Geometry is integer, y grows downwards (screen convention).

use std::ops::{Add, AddAssign, Neg, Sub};
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::editor::canvas::{Canvas, Color, DrawMode};

/// Half size of the filled square drawn for a junction.
pub const JUNCTION_HALF_SIZE: i32 = 2;
/// Half size of the cross drawn for a no-connect flag.
pub const NO_CONNECT_HALF_SIZE: i32 = 3;
/// Approximate glyph advance used to size label boxes.
pub const LABEL_CHAR_WIDTH: i32 = 6;
/// Label box height.
pub const LABEL_HEIGHT: i32 = 8;

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Rotate 90° counter-clockwise (as displayed) around `centre`.
    pub fn rotated(self, centre: Point) -> Point {
        let d = self - centre;
        centre + Point::new(d.y, -d.x)
    }

    /// Mirror across the horizontal line `y = axis_y`.
    pub fn mirrored_x(self, axis_y: i32) -> Point {
        Point::new(self.x, 2 * axis_y - self.y)
    }

    /// Mirror across the vertical line `x = axis_x`.
    pub fn mirrored_y(self, axis_x: i32) -> Point {
        Point::new(2 * axis_x - self.x, self.y)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// An axis-aligned rectangle given by two corners.
///
/// The corners are stored as entered (the block origin is where the user
/// pressed the button, the end follows the cursor); queries normalise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub end: Point,
}

impl Rect {
    pub const fn new(origin: Point, end: Point) -> Self {
        Self { origin, end }
    }

    /// Rectangle spanning `centre ± half` on both axes.
    pub fn around(centre: Point, half: i32) -> Self {
        Self::new(
            Point::new(centre.x - half, centre.y - half),
            Point::new(centre.x + half, centre.y + half),
        )
    }

    /// Get the normalized (min, max) corners.
    pub fn normalized(&self) -> (Point, Point) {
        (
            Point::new(self.origin.x.min(self.end.x), self.origin.y.min(self.end.y)),
            Point::new(self.origin.x.max(self.end.x), self.origin.y.max(self.end.y)),
        )
    }

    pub fn width(&self) -> i32 {
        (self.end.x - self.origin.x).abs()
    }

    pub fn height(&self) -> i32 {
        (self.end.y - self.origin.y).abs()
    }

    pub fn centre(&self) -> Point {
        let (min, max) = self.normalized();
        Point::new((min.x + max.x) / 2, (min.y + max.y) / 2)
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: Point) -> bool {
        let (min, max) = self.normalized();
        p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
    }

    /// Inclusive overlap test (touching edges count).
    pub fn intersects(&self, other: &Rect) -> bool {
        let (a0, a1) = self.normalized();
        let (b0, b1) = other.normalized();
        a0.x <= b1.x && a1.x >= b0.x && a0.y <= b1.y && a1.y >= b0.y
    }

    pub fn translated(&self, v: Point) -> Rect {
        Rect::new(self.origin + v, self.end + v)
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let (a0, a1) = self.normalized();
        let (b0, b1) = other.normalized();
        Rect::new(
            Point::new(a0.x.min(b0.x), a0.y.min(b0.y)),
            Point::new(a1.x.max(b1.x), a1.y.max(b1.y)),
        )
    }

    /// True if the segment `a`-`b` touches this rectangle.
    pub fn intersects_segment(&self, a: Point, b: Point) -> bool {
        if self.contains(a) || self.contains(b) {
            return true;
        }
        let (min, max) = self.normalized();
        let corners = [
            min,
            Point::new(max.x, min.y),
            max,
            Point::new(min.x, max.y),
        ];
        (0..4).any(|i| segments_intersect(a, b, corners[i], corners[(i + 1) % 4]))
    }
}

fn cross(o: Point, a: Point, b: Point) -> i64 {
    (a.x - o.x) as i64 * (b.y - o.y) as i64 - (a.y - o.y) as i64 * (b.x - o.x) as i64
}

fn within_box(p: Point, a: Point, b: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);
    if ((d1 > 0 && d2 < 0) || (d1 < 0 && d2 > 0)) && ((d3 > 0 && d4 < 0) || (d3 < 0 && d4 > 0)) {
        return true;
    }
    (d1 == 0 && within_box(p1, q1, q2))
        || (d2 == 0 && within_box(p2, q1, q2))
        || (d3 == 0 && within_box(q1, p1, p2))
        || (d4 == 0 && within_box(q2, p1, p2))
}

/// True if `p` lies on segment `a`-`b`, endpoints included.
pub fn point_on_segment(p: Point, a: Point, b: Point) -> bool {
    cross(a, b, p) == 0 && within_box(p, a, b)
}

/// True if `p` lies on segment `a`-`b` but is neither endpoint.
pub fn point_inside_segment(p: Point, a: Point, b: Point) -> bool {
    p != a && p != b && point_on_segment(p, a, b)
}

/// 2×2 integer orientation matrix applied to symbol-relative coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transform(pub [[i32; 2]; 2]);

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform([[1, 0], [0, 1]]);
    const ROTATE: Transform = Transform([[0, 1], [-1, 0]]);
    const FLIP_Y: Transform = Transform([[1, 0], [0, -1]]);
    const FLIP_X: Transform = Transform([[-1, 0], [0, 1]]);

    pub fn apply(&self, p: Point) -> Point {
        let m = &self.0;
        Point::new(m[0][0] * p.x + m[0][1] * p.y, m[1][0] * p.x + m[1][1] * p.y)
    }

    /// `self` applied after `other`.
    fn compose(&self, other: &Transform) -> Transform {
        let a = &self.0;
        let b = &other.0;
        let mut out = [[0; 2]; 2];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = a[i][0] * b[0][j] + a[i][1] * b[1][j];
            }
        }
        Transform(out)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Items
// ────────────────────────────────────────────────────────────────────────────

/// Stable identity of an item inside one [`Schematic`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

/// Transient per-item editing flags. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemFlags(u32);

impl ItemFlags {
    pub const SELECTED: ItemFlags = ItemFlags(1 << 0);
    /// Only the start point of a line follows a move.
    pub const STARTPOINT: ItemFlags = ItemFlags(1 << 1);
    /// Only the end point of a line follows a move.
    pub const ENDPOINT: ItemFlags = ItemFlags(1 << 2);
    pub const IS_NEW: ItemFlags = ItemFlags(1 << 3);

    pub const fn empty() -> Self {
        ItemFlags(0)
    }

    pub fn contains(self, other: ItemFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: ItemFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: ItemFlags) {
        self.0 &= !other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Which ends of a line follow a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endpoints {
    #[default]
    Both,
    Start,
    End,
}

impl Endpoints {
    pub fn from_flags(flags: ItemFlags) -> Self {
        match (
            flags.contains(ItemFlags::STARTPOINT),
            flags.contains(ItemFlags::ENDPOINT),
        ) {
            (true, false) => Endpoints::Start,
            (false, true) => Endpoints::End,
            _ => Endpoints::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineLayer {
    #[default]
    Wire,
    Bus,
    Notes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchLine {
    pub start: Point,
    pub end: Point,
    #[serde(default)]
    pub layer: LineLayer,
    #[serde(default)]
    pub start_dangling: bool,
    #[serde(default)]
    pub end_dangling: bool,
}

impl SchLine {
    pub fn wire(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            layer: LineLayer::Wire,
            start_dangling: false,
            end_dangling: false,
        }
    }

    /// Wires and buses carry connectivity; graphic notes do not.
    pub fn is_connectable(&self) -> bool {
        self.layer != LineLayer::Notes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub name: String,
    /// Offset from the symbol anchor before the orientation is applied.
    pub offset: Point,
}

/// A placed symbol instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchComponent {
    pub lib_name: String,
    /// Reference designator prefix, e.g. `R` or `U`.
    pub prefix: String,
    /// Full reference designator, e.g. `R12` or `R?` when unannotated.
    pub reference: String,
    pub position: Point,
    #[serde(default)]
    pub transform: Transform,
    /// Symbol body relative to `position`, before `transform`.
    pub body: Rect,
    #[serde(default)]
    pub pins: Vec<Pin>,
    #[serde(default)]
    pub timestamp: u32,
    #[serde(default)]
    pub fields: IndexMap<String, String>,
}

impl SchComponent {
    pub fn is_annotated(&self) -> bool {
        !self.reference.ends_with('?')
    }

    /// Drop the reference number so the symbol can be re-annotated.
    pub fn clear_annotation(&mut self) {
        self.reference = format!("{}?", self.prefix);
    }

    pub fn pin_positions(&self) -> impl Iterator<Item = Point> + '_ {
        self.pins
            .iter()
            .map(|pin| self.position + self.transform.apply(pin.offset))
    }

    pub fn body_rect(&self) -> Rect {
        let a = self.position + self.transform.apply(self.body.origin);
        let b = self.position + self.transform.apply(self.body.end);
        let (min, max) = Rect::new(a, b).normalized();
        Rect::new(min, max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchLabel {
    pub position: Point,
    pub text: String,
    /// Quarter turns, 0 = text runs to the right.
    #[serde(default)]
    pub orientation: u8,
    #[serde(default)]
    pub dangling: bool,
}

impl SchLabel {
    pub fn bounding_box(&self) -> Rect {
        let len = self.text.chars().count().max(1) as i32 * LABEL_CHAR_WIDTH;
        let p = self.position;
        match self.orientation % 4 {
            0 => Rect::new(Point::new(p.x, p.y - LABEL_HEIGHT), Point::new(p.x + len, p.y)),
            1 => Rect::new(Point::new(p.x - LABEL_HEIGHT, p.y - len), Point::new(p.x, p.y)),
            2 => Rect::new(Point::new(p.x - len, p.y - LABEL_HEIGHT), Point::new(p.x, p.y)),
            _ => Rect::new(Point::new(p.x - LABEL_HEIGHT, p.y), Point::new(p.x, p.y + len)),
        }
    }
}

/// The closed set of schematic item kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    Line(SchLine),
    Junction { position: Point },
    NoConnect { position: Point },
    Label(SchLabel),
    Component(SchComponent),
    BusEntry { position: Point, size: Point },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchItem {
    pub id: ItemId,
    #[serde(skip)]
    pub flags: ItemFlags,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl SchItem {
    pub fn new(id: ItemId, kind: ItemKind) -> Self {
        Self {
            id,
            flags: ItemFlags::empty(),
            kind,
        }
    }

    /// Deep copy carrying a new identity and no transient flags.
    pub fn duplicate(&self, id: ItemId) -> SchItem {
        SchItem::new(id, self.kind.clone())
    }

    pub fn as_line(&self) -> Option<&SchLine> {
        match &self.kind {
            ItemKind::Line(line) => Some(line),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<&SchComponent> {
        match &self.kind {
            ItemKind::Component(c) => Some(c),
            _ => None,
        }
    }

    /// Reference position of the item (line start, symbol anchor, ...).
    pub fn position(&self) -> Point {
        match &self.kind {
            ItemKind::Line(l) => l.start,
            ItemKind::Junction { position }
            | ItemKind::NoConnect { position }
            | ItemKind::BusEntry { position, .. } => *position,
            ItemKind::Label(l) => l.position,
            ItemKind::Component(c) => c.position,
        }
    }

    pub fn bounding_box(&self) -> Rect {
        match &self.kind {
            ItemKind::Line(l) => Rect::new(l.start, l.end),
            ItemKind::Junction { position } => Rect::around(*position, JUNCTION_HALF_SIZE),
            ItemKind::NoConnect { position } => Rect::around(*position, NO_CONNECT_HALF_SIZE),
            ItemKind::Label(l) => l.bounding_box(),
            ItemKind::Component(c) => c
                .pin_positions()
                .fold(c.body_rect(), |r, p| r.union(&Rect::new(p, p))),
            ItemKind::BusEntry { position, size } => Rect::new(*position, *position + *size),
        }
    }

    /// True if the item is touched by the block rectangle.
    pub fn hit_test_rect(&self, rect: &Rect) -> bool {
        match &self.kind {
            ItemKind::Line(l) => rect.intersects_segment(l.start, l.end),
            ItemKind::BusEntry { position, size } => {
                rect.intersects_segment(*position, *position + *size)
            }
            _ => rect.intersects(&self.bounding_box()),
        }
    }

    /// Points other items can connect to.
    pub fn connection_points(&self) -> Vec<Point> {
        match &self.kind {
            ItemKind::Line(l) if l.is_connectable() => vec![l.start, l.end],
            ItemKind::Line(_) => Vec::new(),
            ItemKind::Junction { position } | ItemKind::NoConnect { position } => vec![*position],
            ItemKind::Label(l) => vec![l.position],
            ItemKind::Component(c) => c.pin_positions().collect(),
            ItemKind::BusEntry { position, size } => vec![*position, *position + *size],
        }
    }

    pub fn move_by(&mut self, v: Point) {
        self.move_endpoints(v, Endpoints::Both);
    }

    /// Translate the item; for lines only the requested ends follow.
    pub fn move_endpoints(&mut self, v: Point, ends: Endpoints) {
        match &mut self.kind {
            ItemKind::Line(l) => match ends {
                Endpoints::Both => {
                    l.start += v;
                    l.end += v;
                }
                Endpoints::Start => l.start += v,
                Endpoints::End => l.end += v,
            },
            ItemKind::Junction { position }
            | ItemKind::NoConnect { position }
            | ItemKind::BusEntry { position, .. } => *position += v,
            ItemKind::Label(l) => l.position += v,
            ItemKind::Component(c) => c.position += v,
        }
    }

    pub fn rotate(&mut self, centre: Point) {
        match &mut self.kind {
            ItemKind::Line(l) => {
                l.start = l.start.rotated(centre);
                l.end = l.end.rotated(centre);
            }
            ItemKind::Junction { position } | ItemKind::NoConnect { position } => {
                *position = position.rotated(centre);
            }
            ItemKind::BusEntry { position, size } => {
                *position = position.rotated(centre);
                *size = Point::new(size.y, -size.x);
            }
            ItemKind::Label(l) => {
                l.position = l.position.rotated(centre);
                l.orientation = (l.orientation + 1) % 4;
            }
            ItemKind::Component(c) => {
                c.position = c.position.rotated(centre);
                c.transform = Transform::ROTATE.compose(&c.transform);
            }
        }
    }

    /// Mirror across the horizontal line `y = axis_y` (top and bottom swap).
    pub fn mirror_x(&mut self, axis_y: i32) {
        match &mut self.kind {
            ItemKind::Line(l) => {
                l.start = l.start.mirrored_x(axis_y);
                l.end = l.end.mirrored_x(axis_y);
            }
            ItemKind::Junction { position } | ItemKind::NoConnect { position } => {
                *position = position.mirrored_x(axis_y);
            }
            ItemKind::BusEntry { position, size } => {
                *position = position.mirrored_x(axis_y);
                size.y = -size.y;
            }
            ItemKind::Label(l) => {
                l.position = l.position.mirrored_x(axis_y);
                l.orientation = match l.orientation % 4 {
                    1 => 3,
                    3 => 1,
                    o => o,
                };
            }
            ItemKind::Component(c) => {
                c.position = c.position.mirrored_x(axis_y);
                c.transform = Transform::FLIP_Y.compose(&c.transform);
            }
        }
    }

    /// Mirror across the vertical line `x = axis_x` (left and right swap).
    pub fn mirror_y(&mut self, axis_x: i32) {
        match &mut self.kind {
            ItemKind::Line(l) => {
                l.start = l.start.mirrored_y(axis_x);
                l.end = l.end.mirrored_y(axis_x);
            }
            ItemKind::Junction { position } | ItemKind::NoConnect { position } => {
                *position = position.mirrored_y(axis_x);
            }
            ItemKind::BusEntry { position, size } => {
                *position = position.mirrored_y(axis_x);
                size.x = -size.x;
            }
            ItemKind::Label(l) => {
                l.position = l.position.mirrored_y(axis_x);
                l.orientation = match l.orientation % 4 {
                    0 => 2,
                    2 => 0,
                    o => o,
                };
            }
            ItemKind::Component(c) => {
                c.position = c.position.mirrored_y(axis_x);
                c.transform = Transform::FLIP_X.compose(&c.transform);
            }
        }
    }

    /// Render the item translated by `offset`.
    ///
    /// Drawing the same item twice with [`DrawMode::Xor`] and the same
    /// arguments restores the canvas.
    pub fn draw(&self, canvas: &mut dyn Canvas, offset: Point, mode: DrawMode, color: Color) {
        match &self.kind {
            ItemKind::Line(l) => canvas.draw_line(l.start + offset, l.end + offset, mode, color),
            ItemKind::Junction { position } => canvas.fill_rect(
                Rect::around(*position + offset, JUNCTION_HALF_SIZE),
                mode,
                color,
            ),
            ItemKind::NoConnect { position } => {
                let p = *position + offset;
                let h = NO_CONNECT_HALF_SIZE;
                canvas.draw_line(p + Point::new(-h, -h), p + Point::new(h, h), mode, color);
                canvas.draw_line(p + Point::new(-h, h), p + Point::new(h, -h), mode, color);
            }
            ItemKind::Label(l) => canvas.draw_rect(l.bounding_box().translated(offset), mode, color),
            ItemKind::Component(c) => {
                canvas.draw_rect(c.body_rect().translated(offset), mode, color);
                for pin in c.pin_positions() {
                    canvas.fill_rect(Rect::around(pin + offset, 1), mode, color);
                }
            }
            ItemKind::BusEntry { position, size } => {
                let p = *position + offset;
                canvas.draw_line(p, p + *size, mode, color);
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Schematic document
// ────────────────────────────────────────────────────────────────────────────

/// One schematic sheet: the ordered item chain plus editing bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schematic {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub items: Vec<SchItem>,
    /// Set whenever an edit changes the document.
    #[serde(skip)]
    pub modified: bool,
    /// Item under the editing cursor, if any.
    #[serde(skip)]
    pub current_item: Option<ItemId>,
    #[serde(skip)]
    next_id: u64,
    #[serde(skip)]
    last_timestamp: u32,
}

impl Schematic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Allocate an identity never used in this document.
    pub fn alloc_id(&mut self) -> ItemId {
        let max_existing = self.items.iter().map(|i| i.id.0 + 1).max().unwrap_or(1);
        self.next_id = self.next_id.max(max_existing).max(1);
        let id = ItemId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Create an item from `kind` and put it at the head of the chain.
    pub fn add(&mut self, kind: ItemKind) -> ItemId {
        let id = self.alloc_id();
        self.items.insert(0, SchItem::new(id, kind));
        id
    }

    /// Put an existing item at the head of the chain.
    pub fn push_front(&mut self, item: SchItem) {
        self.items.insert(0, item);
    }

    /// Re-insert an item at a chain position, clamped to the chain length.
    pub fn insert_at(&mut self, index: usize, item: SchItem) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }

    pub fn get(&self, id: ItemId) -> Option<&SchItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut SchItem> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    pub fn remove(&mut self, id: ItemId) -> Option<(usize, SchItem)> {
        let index = self.index_of(id)?;
        Some((index, self.items.remove(index)))
    }

    /// Identities of every item touched by `rect`, in chain order.
    pub fn items_in_rect(&self, rect: &Rect) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|i| i.hit_test_rect(rect))
            .map(|i| i.id)
            .collect()
    }

    /// Clear transient flags on every item.
    pub fn clear_drawing_state(&mut self) {
        for item in &mut self.items {
            item.flags = ItemFlags::empty();
        }
    }

    /// A timestamp usable as a fresh symbol identity.
    ///
    /// Based on wall-clock seconds but strictly increasing and never equal to a
    /// timestamp already carried by a symbol in this document.
    pub fn new_timestamp(&mut self) -> u32 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let mut ts = now.max(self.last_timestamp.wrapping_add(1));
        while self
            .items
            .iter()
            .filter_map(SchItem::as_component)
            .any(|c| c.timestamp == ts)
        {
            ts = ts.wrapping_add(1);
        }
        self.last_timestamp = ts;
        ts
    }

    /// Split every wire or bus whose interior passes through a junction.
    ///
    /// Returns the number of splits performed.
    pub fn break_segments_on_junctions(&mut self) -> usize {
        let junctions: Vec<Point> = self
            .items
            .iter()
            .filter_map(|i| match i.kind {
                ItemKind::Junction { position } => Some(position),
                _ => None,
            })
            .collect();

        let mut splits = 0;
        for junction in junctions {
            while let Some(index) = self.items.iter().position(|i| match &i.kind {
                ItemKind::Line(l) => l.is_connectable() && point_inside_segment(junction, l.start, l.end),
                _ => false,
            }) {
                let id = self.alloc_id();
                let ItemKind::Line(line) = &mut self.items[index].kind else {
                    break;
                };
                let mut tail = line.clone();
                tail.start = junction;
                line.end = junction;
                self.items.insert(index + 1, SchItem::new(id, ItemKind::Line(tail)));
                splits += 1;
            }
        }
        if splits > 0 {
            tracing::debug!(splits, "broke segments on junctions");
        }
        splits
    }

    fn is_connected(&self, p: Point, own: ItemId) -> bool {
        self.items.iter().filter(|i| i.id != own).any(|other| {
            if other.connection_points().contains(&p) {
                return true;
            }
            match &other.kind {
                ItemKind::Line(l) => l.is_connectable() && point_on_segment(p, l.start, l.end),
                _ => false,
            }
        })
    }

    /// Recompute the dangling markers of wire ends and labels.
    ///
    /// Returns the number of dangling ends found.
    pub fn test_dangling_ends(&mut self) -> usize {
        let mut results = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let state = match &item.kind {
                ItemKind::Line(l) if l.is_connectable() => Some((
                    !self.is_connected(l.start, item.id),
                    !self.is_connected(l.end, item.id),
                )),
                ItemKind::Label(l) => {
                    let dangling = !self.is_connected(l.position, item.id);
                    Some((dangling, false))
                }
                _ => None,
            };
            results.push(state);
        }

        let mut count = 0;
        for (item, state) in self.items.iter_mut().zip(results) {
            let Some((a, b)) = state else { continue };
            match &mut item.kind {
                ItemKind::Line(l) => {
                    l.start_dangling = a;
                    l.end_dangling = b;
                    count += a as usize + b as usize;
                }
                ItemKind::Label(l) => {
                    l.dangling = a;
                    count += a as usize;
                }
                _ => {}
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resistor(at: Point) -> ItemKind {
        ItemKind::Component(SchComponent {
            lib_name: "Device:R".to_string(),
            prefix: "R".to_string(),
            reference: "R1".to_string(),
            position: at,
            transform: Transform::IDENTITY,
            body: Rect::new(Point::new(-2, -5), Point::new(2, 5)),
            pins: vec![
                Pin { name: "1".to_string(), offset: Point::new(0, -10) },
                Pin { name: "2".to_string(), offset: Point::new(0, 10) },
            ],
            timestamp: 7,
            fields: IndexMap::new(),
        })
    }

    #[test]
    fn test_rect_queries() {
        let r = Rect::new(Point::new(10, 10), Point::new(0, 0));
        assert!(r.contains(Point::new(5, 5)));
        assert!(r.contains(Point::new(0, 10)));
        assert!(!r.contains(Point::new(11, 5)));
        assert_eq!(r.centre(), Point::new(5, 5));
        assert!(r.intersects_segment(Point::new(-5, 5), Point::new(20, 5)));
        assert!(!r.intersects_segment(Point::new(-5, 20), Point::new(20, 20)));
    }

    #[test]
    fn test_rotate_four_times_is_identity() {
        let mut sch = Schematic::new();
        let id = sch.add(resistor(Point::new(30, 40)));
        let before = sch.get(id).unwrap().clone();
        for _ in 0..4 {
            sch.get_mut(id).unwrap().rotate(Point::new(3, 9));
        }
        assert_eq!(sch.get(id).unwrap(), &before);
    }

    #[test]
    fn test_rotate_component_moves_pins() {
        let mut item = SchItem::new(ItemId(1), resistor(Point::new(0, 0)));
        item.rotate(Point::new(0, 0));
        let pins: Vec<Point> = item.as_component().unwrap().pin_positions().collect();
        assert_eq!(pins, vec![Point::new(-10, 0), Point::new(10, 0)]);
    }

    #[test]
    fn test_mirror_is_self_inverse() {
        let mut item = SchItem::new(
            ItemId(1),
            ItemKind::Label(SchLabel {
                position: Point::new(4, 9),
                text: "CLK".to_string(),
                orientation: 0,
                dangling: false,
            }),
        );
        let before = item.clone();
        item.mirror_y(20);
        assert_eq!(item.position(), Point::new(36, 9));
        item.mirror_y(20);
        assert_eq!(item, before);
        item.mirror_x(0);
        item.mirror_x(0);
        assert_eq!(item, before);
    }

    #[test]
    fn test_move_single_endpoint() {
        let mut item = SchItem::new(
            ItemId(1),
            ItemKind::Line(SchLine::wire(Point::new(0, 0), Point::new(10, 0))),
        );
        item.move_endpoints(Point::new(0, 5), Endpoints::End);
        let line = item.as_line().unwrap();
        assert_eq!(line.start, Point::new(0, 0));
        assert_eq!(line.end, Point::new(10, 5));
    }

    #[test]
    fn test_alloc_id_after_deserialize() {
        let mut sch = Schematic::new();
        sch.add(ItemKind::Junction { position: Point::new(1, 1) });
        sch.add(ItemKind::Junction { position: Point::new(2, 2) });
        let json = serde_json::to_string(&sch).unwrap();
        let mut loaded: Schematic = serde_json::from_str(&json).unwrap();
        let id = loaded.alloc_id();
        assert!(loaded.items.iter().all(|i| i.id != id));
    }

    #[test]
    fn test_break_segments_on_junctions() {
        let mut sch = Schematic::new();
        sch.add(ItemKind::Line(SchLine::wire(Point::new(0, 0), Point::new(100, 0))));
        sch.add(ItemKind::Junction { position: Point::new(40, 0) });
        assert_eq!(sch.break_segments_on_junctions(), 1);
        let mut ends: Vec<(Point, Point)> = sch
            .items
            .iter()
            .filter_map(SchItem::as_line)
            .map(|l| (l.start, l.end))
            .collect();
        ends.sort_by_key(|(s, _)| s.x);
        assert_eq!(
            ends,
            vec![
                (Point::new(0, 0), Point::new(40, 0)),
                (Point::new(40, 0), Point::new(100, 0)),
            ]
        );
        // A second pass finds nothing left to split.
        assert_eq!(sch.break_segments_on_junctions(), 0);
    }

    #[test]
    fn test_dangling_ends() {
        let mut sch = Schematic::new();
        sch.add(resistor(Point::new(0, 0)));
        let wire = sch.add(ItemKind::Line(SchLine::wire(Point::new(0, 10), Point::new(50, 10))));
        assert_eq!(sch.test_dangling_ends(), 1);
        let line = sch.get(wire).unwrap().as_line().unwrap();
        assert!(!line.start_dangling);
        assert!(line.end_dangling);
    }

    #[test]
    fn test_new_timestamp_is_unique() {
        let mut sch = Schematic::new();
        let a = sch.new_timestamp();
        let b = sch.new_timestamp();
        assert_ne!(a, b);
    }

    #[test]
    fn test_clear_annotation() {
        let item = SchItem::new(ItemId(1), resistor(Point::new(0, 0)));
        let mut c = item.as_component().unwrap().clone();
        assert!(c.is_annotated());
        c.clear_annotation();
        assert_eq!(c.reference, "R?");
        assert!(!c.is_annotated());
    }
}
