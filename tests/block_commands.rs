use indexmap::IndexMap;
use schblock::config::EditorConfig;
use schblock::editor::{
    BlockCommand, BlockState, Color, EditorSession, MouseCapture, PixelCanvas, UndoCommand,
    UndoRole,
};
use schblock::model::{
    ItemId, ItemKind, Pin, Point, Rect, SchComponent, SchLabel, SchLine, Schematic, Transform,
};

struct Fixture {
    session: EditorSession,
    junction: ItemId,
    label: ItemId,
    wire: ItemId,
    outside: ItemId,
}

/// Three items inside (0,0)-(100,100), one far outside.
fn fixture() -> Fixture {
    let mut sch = Schematic::new();
    let junction = sch.add(ItemKind::Junction { position: Point::new(20, 20) });
    let label = sch.add(ItemKind::Label(SchLabel {
        position: Point::new(40, 60),
        text: "IN".to_string(),
        orientation: 0,
        dangling: false,
    }));
    let wire = sch.add(ItemKind::Line(SchLine::wire(Point::new(10, 80), Point::new(90, 80))));
    let outside = sch.add(ItemKind::Junction { position: Point::new(500, 400) });
    Fixture {
        session: EditorSession::new(sch, EditorConfig::default()),
        junction,
        label,
        wire,
        outside,
    }
}

fn canvas() -> PixelCanvas {
    PixelCanvas::new(640, 480, Color::BLACK)
}

fn drag_block(s: &mut EditorSession, c: &mut PixelCanvas, cmd: BlockCommand, from: Point, to: Point) -> bool {
    assert!(s.handle_block_begin(c, cmd, from));
    s.on_mouse_move(c, to);
    s.handle_block_end(c)
}

fn position(s: &EditorSession, id: ItemId) -> Point {
    s.schematic.get(id).expect("item exists").position()
}

fn assert_idle(s: &EditorSession) {
    assert_eq!(s.block.count(), 0);
    assert_eq!(s.block.command, BlockCommand::Idle);
    assert_eq!(s.block.state, BlockState::NoBlock);
    assert_eq!(s.capture, MouseCapture::None);
}

#[test]
fn move_three_items_then_place() {
    let Fixture { mut session, junction, label, wire, outside } = fixture();
    let mut c = canvas();

    assert!(drag_block(&mut session, &mut c, BlockCommand::Move, Point::new(0, 0), Point::new(100, 100)));
    assert_eq!(session.block.state, BlockState::Move);
    assert_eq!(session.block.count(), 3);
    assert_eq!(session.capture, MouseCapture::MovingBlock);

    session.on_mouse_move(&mut c, Point::new(130, 110));
    assert_eq!(session.block.move_vector, Point::new(30, 10));
    session.handle_block_place(&mut c);

    assert_idle(&session);
    assert_eq!(position(&session, junction), Point::new(50, 30));
    assert_eq!(position(&session, label), Point::new(70, 70));
    assert_eq!(position(&session, wire), Point::new(40, 90));
    assert_eq!(position(&session, outside), Point::new(500, 400));
    assert!(session.schematic.modified);
    assert_eq!(session.errors().count(), 0);

    match session.history.last() {
        Some(UndoCommand::Moved { items, vector }) => {
            assert_eq!(*vector, Point::new(30, 10));
            assert_eq!(items.len(), 3);
        }
        other => panic!("expected a moved entry, got {:?}", other),
    }
    assert_eq!(session.history.last().unwrap().role(), UndoRole::Moved);

    // Every outline was drawn in XOR and erased again.
    assert_eq!(c.count_not(Color::BLACK), 0);
}

#[test]
fn undo_move_restores_positions() {
    let Fixture { mut session, junction, .. } = fixture();
    let mut c = canvas();
    drag_block(&mut session, &mut c, BlockCommand::Move, Point::new(0, 0), Point::new(100, 100));
    session.on_mouse_move(&mut c, Point::new(90, 100));
    session.handle_block_place(&mut c);
    assert_eq!(position(&session, junction), Point::new(10, 20));

    assert!(session.undo());
    assert_eq!(position(&session, junction), Point::new(20, 20));
    assert!(session.redo());
    assert_eq!(position(&session, junction), Point::new(10, 20));
}

#[test]
fn copy_leaves_originals_and_records_new() {
    let Fixture { mut session, junction, .. } = fixture();
    let mut c = canvas();
    assert!(drag_block(&mut session, &mut c, BlockCommand::Copy, Point::new(0, 0), Point::new(100, 100)));
    session.on_mouse_move(&mut c, Point::new(100, 300));
    session.handle_block_place(&mut c);

    assert_idle(&session);
    assert_eq!(session.schematic.len(), 7);
    assert_eq!(position(&session, junction), Point::new(20, 20));
    assert!(session.schematic.items.iter().any(|i| i.position() == Point::new(20, 220)));
    assert_eq!(session.history.last().map(|e| e.role()), Some(UndoRole::New));

    session.undo();
    assert_eq!(session.schematic.len(), 4);
}

#[test]
fn immediate_commands_finish_in_block_end() {
    for cmd in [
        BlockCommand::Delete,
        BlockCommand::Save,
        BlockCommand::Rotate,
        BlockCommand::MirrorX,
        BlockCommand::MirrorY,
        BlockCommand::Abort,
    ] {
        let Fixture { mut session, .. } = fixture();
        let mut c = canvas();
        let pending = drag_block(&mut session, &mut c, cmd, Point::new(0, 0), Point::new(100, 100));
        assert!(!pending, "{:?} should complete immediately", cmd);
        assert_idle(&session);
        if cmd == BlockCommand::Abort {
            // Abort leaves the outline to the full repaint.
            assert!(session.repaint_requested);
        } else {
            assert_eq!(c.count_not(Color::BLACK), 0, "{:?} left an outline", cmd);
        }
    }
}

#[test]
fn delete_removes_picked_and_undo_restores() {
    let Fixture { mut session, outside, .. } = fixture();
    let before = session.schematic.items.clone();
    let mut c = canvas();
    drag_block(&mut session, &mut c, BlockCommand::Delete, Point::new(0, 0), Point::new(100, 100));

    assert_eq!(session.schematic.len(), 1);
    assert!(session.schematic.get(outside).is_some());
    assert!(session.schematic.modified);
    assert!(session.repaint_requested);

    session.undo();
    assert_eq!(session.schematic.items.len(), before.len());
    for (a, b) in session.schematic.items.iter().zip(&before) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.position(), b.position());
    }
}

#[test]
fn rotate_turns_around_block_centre() {
    let Fixture { mut session, junction, .. } = fixture();
    let mut c = canvas();
    drag_block(&mut session, &mut c, BlockCommand::Rotate, Point::new(0, 0), Point::new(100, 100));
    assert_eq!(position(&session, junction), Point::new(20, 80));
    assert_eq!(session.crosshair, Point::new(50, 50));
    assert_eq!(session.history.last().map(|e| e.role()), Some(UndoRole::Rotated));
    session.undo();
    assert_eq!(position(&session, junction), Point::new(20, 20));
}

#[test]
fn mirror_flips_around_block_centre() {
    let Fixture { mut session, junction, .. } = fixture();
    let mut c = canvas();
    drag_block(&mut session, &mut c, BlockCommand::MirrorY, Point::new(0, 0), Point::new(100, 100));
    assert_eq!(position(&session, junction), Point::new(80, 20));
    drag_block(&mut session, &mut c, BlockCommand::MirrorX, Point::new(0, 0), Point::new(100, 100));
    assert_eq!(position(&session, junction), Point::new(80, 80));
}

#[test]
fn empty_block_releases_capture() {
    let Fixture { mut session, .. } = fixture();
    let mut c = canvas();
    let pending = drag_block(&mut session, &mut c, BlockCommand::Move, Point::new(200, 200), Point::new(300, 300));
    assert!(!pending);
    assert_idle(&session);
    assert_eq!(c.count_not(Color::BLACK), 0);
    assert!(!session.schematic.modified);
}

#[test]
fn zoom_fits_block() {
    let Fixture { mut session, .. } = fixture();
    let mut c = canvas();
    let pending = drag_block(&mut session, &mut c, BlockCommand::Zoom, Point::new(0, 0), Point::new(100, 50));
    assert!(!pending);
    assert_eq!(session.viewport.centre, Point::new(50, 25));
    assert!(session.viewport.scale > 1.0);
}

#[test]
fn begin_is_ignored_while_block_active() {
    let Fixture { mut session, .. } = fixture();
    let mut c = canvas();
    assert!(session.handle_block_begin(&mut c, BlockCommand::Move, Point::new(0, 0)));
    assert!(!session.handle_block_begin(&mut c, BlockCommand::Copy, Point::new(5, 5)));
    assert_eq!(session.block.command, BlockCommand::Move);
}

#[test]
fn abort_restores_canvas_without_mutation() {
    let Fixture { mut session, junction, .. } = fixture();
    let mut c = canvas();
    drag_block(&mut session, &mut c, BlockCommand::Move, Point::new(0, 0), Point::new(100, 100));
    session.on_mouse_move(&mut c, Point::new(150, 150));
    session.abort_block_command(&mut c);

    assert_idle(&session);
    assert_eq!(position(&session, junction), Point::new(20, 20));
    assert!(!session.history.can_undo());
    assert_eq!(c.count_not(Color::BLACK), 0);
}

#[test]
fn place_without_capture_reports_but_cleans_up() {
    let Fixture { mut session, .. } = fixture();
    let mut c = canvas();
    session.handle_block_place(&mut c);
    let errors: Vec<&str> = session.errors().collect();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].contains("mouse capture"));
    assert!(errors[1].contains("no items to place"));
    assert_idle(&session);
}

#[test]
fn place_reports_and_drops_leftover_items() {
    let Fixture { mut session, junction, .. } = fixture();
    let mut c = canvas();
    assert!(drag_block(&mut session, &mut c, BlockCommand::Move, Point::new(0, 0), Point::new(100, 100)));
    // A command the place handler does not consume leaves the picks behind.
    session.block.command = BlockCommand::Zoom;
    session.on_mouse_move(&mut c, Point::new(150, 150));
    session.handle_block_place(&mut c);

    assert_eq!(session.errors().collect::<Vec<_>>(), vec!["block place: 3 items left in buffer"]);
    assert_idle(&session);
    assert_eq!(position(&session, junction), Point::new(20, 20));
    assert!(session.schematic.items.iter().all(|i| i.flags.is_empty()));
}

#[test]
fn drag_splits_at_junction_and_stretches_wires() {
    let mut sch = Schematic::new();
    sch.add(ItemKind::Line(SchLine::wire(Point::new(-100, 50), Point::new(200, 50))));
    sch.add(ItemKind::Junction { position: Point::new(50, 50) });
    // Crosses the block without an end inside: stays put.
    let crossing = sch.add(ItemKind::Line(SchLine::wire(Point::new(-20, 20), Point::new(300, 20))));
    let mut session = EditorSession::new(sch, EditorConfig::default());
    let mut c = canvas();

    assert!(drag_block(&mut session, &mut c, BlockCommand::Drag, Point::new(0, 0), Point::new(100, 100)));
    assert_eq!(session.block.count(), 3);
    session.on_mouse_move(&mut c, Point::new(100, 130));
    session.handle_block_place(&mut c);

    let mut wires: Vec<(Point, Point)> = session
        .schematic
        .items
        .iter()
        .filter(|i| i.id != crossing)
        .filter_map(|i| i.as_line())
        .map(|l| (l.start, l.end))
        .collect();
    wires.sort_by_key(|(s, _)| s.x);
    assert_eq!(
        wires,
        vec![
            (Point::new(-100, 50), Point::new(50, 80)),
            (Point::new(50, 80), Point::new(200, 50)),
        ]
    );
    let crossing = session.schematic.get(crossing).unwrap().as_line().unwrap();
    assert_eq!((crossing.start, crossing.end), (Point::new(-20, 20), Point::new(300, 20)));
    assert_eq!(c.count_not(Color::BLACK), 0);

    // Undo brings the endpoints back.
    session.undo();
    assert!(session
        .schematic
        .items
        .iter()
        .filter_map(|i| i.as_line())
        .all(|l| l.start.y != 80 && l.end.y != 80));
}

#[test]
fn drag_stretches_wire_on_symbol_pin() {
    let mut sch = Schematic::new();
    sch.add(ItemKind::Component(SchComponent {
        lib_name: "Device:R".to_string(),
        prefix: "R".to_string(),
        reference: "R1".to_string(),
        position: Point::new(50, 50),
        transform: Transform::IDENTITY,
        body: Rect::new(Point::new(-2, -5), Point::new(2, 5)),
        pins: vec![
            Pin { name: "1".to_string(), offset: Point::new(0, -10) },
            Pin { name: "2".to_string(), offset: Point::new(0, 10) },
        ],
        timestamp: 1,
        fields: IndexMap::new(),
    }));
    let wire = sch.add(ItemKind::Line(SchLine::wire(Point::new(50, 60), Point::new(50, 150))));
    let mut session = EditorSession::new(sch, EditorConfig::default());
    let mut c = canvas();

    assert!(drag_block(&mut session, &mut c, BlockCommand::Drag, Point::new(0, 45), Point::new(100, 55)));
    assert_eq!(session.block.count(), 2);
    session.on_mouse_move(&mut c, Point::new(120, 55));
    session.handle_block_place(&mut c);

    let line = session.schematic.get(wire).unwrap().as_line().unwrap();
    assert_eq!(line.start, Point::new(70, 60));
    assert_eq!(line.end, Point::new(50, 150));
    assert!(!line.start_dangling);
}

#[test]
fn preselected_items_follow_cursor_and_duplicate() {
    let Fixture { mut session, junction, label, .. } = fixture();
    let mut c = canvas();
    assert!(session.preselect(&mut c, &[junction, label]));
    assert_eq!(session.block.command, BlockCommand::PresetMove);
    assert_eq!(session.block.state, BlockState::Move);

    let anchor = session.block.last_cursor_position;
    session.on_mouse_move(&mut c, anchor + Point::new(0, 200));
    session.handle_block_place(&mut c);

    assert_eq!(session.schematic.len(), 6);
    assert!(session.schematic.items.iter().any(|i| i.position() == Point::new(20, 220)));
    assert_eq!(session.history.last().map(|e| e.role()), Some(UndoRole::Changed));
    session.undo();
    assert_eq!(session.schematic.len(), 4);
    assert_eq!(c.count_not(Color::BLACK), 0);
}
