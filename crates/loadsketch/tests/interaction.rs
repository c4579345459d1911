//! Pointer and keyboard gestures driven through an editor session

use loadsketch::prelude::*;
use loadsketch::{InputEvent, InteractionState, Key, Modifiers, PointerTarget};

fn press(session: &mut EditorSession, point: Point, target: PointerTarget, modifiers: Modifiers) {
    session.input(InputEvent::PointerDown {
        point,
        target,
        modifiers,
    });
}

fn click_node(session: &mut EditorSession, id: ElementId, modifiers: Modifiers) {
    let origin = session.store().get_node(id).unwrap().origin();
    let point = Point::new(origin.x + 10.0, origin.y + 10.0);
    press(session, point, PointerTarget::Node(id), modifiers);
    session.input(InputEvent::PointerUp);
}

fn move_to(session: &mut EditorSession, x: f64, y: f64) {
    session.input(InputEvent::PointerMove {
        point: Point::new(x, y),
    });
}

fn ctrl() -> Modifiers {
    Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    }
}

fn shift() -> Modifiers {
    Modifiers {
        shift: true,
        ..Modifiers::NONE
    }
}

/// Three nodes in a row at x = 0, 200, 400
fn row() -> (EditorSession, Vec<ElementId>) {
    let mut session = EditorSession::default();
    let ids = (0..3)
        .map(|i| session.add_node_at(NodeKind::AppServer, Point::new(200.0 * i as f64, 0.0)))
        .collect();
    (session, ids)
}

#[test]
fn rect_select_uses_strict_overlap() {
    let (mut session, ids) = row();

    // touches the right border of the first node (x = 120) without entering it
    press(&mut session, Point::new(120.0, 0.0), PointerTarget::Canvas, Modifiers::NONE);
    move_to(&mut session, 250.0, 50.0);
    assert!(session.is_pointer_captured());
    session.input(InputEvent::PointerUp);

    assert_eq!(session.selection().node_ids(), vec![ids[1]]);
    assert!(!session.is_pointer_captured());
}

#[test]
fn rect_select_drawn_backwards() {
    let (mut session, ids) = row();

    press(&mut session, Point::new(700.0, 300.0), PointerTarget::Canvas, Modifiers::NONE);
    move_to(&mut session, 150.0, 40.0);
    session.input(InputEvent::PointerUp);

    assert_eq!(session.selection().node_ids(), vec![ids[1], ids[2]]);
}

#[test]
fn ctrl_click_adds_and_shift_click_toggles() {
    let (mut session, ids) = row();

    click_node(&mut session, ids[0], Modifiers::NONE);
    click_node(&mut session, ids[1], ctrl());
    click_node(&mut session, ids[2], shift());
    assert_eq!(session.selection().node_ids(), ids);

    click_node(&mut session, ids[1], shift());
    assert_eq!(session.selection().node_ids(), vec![ids[0], ids[2]]);

    // ctrl never removes
    click_node(&mut session, ids[0], ctrl());
    assert!(session.selection().contains_node(ids[0]));
}

#[test]
fn modifier_press_does_not_drag() {
    let (mut session, ids) = row();

    press(&mut session, Point::new(210.0, 10.0), PointerTarget::Node(ids[1]), ctrl());
    assert_eq!(session.state(), &InteractionState::Idle);
    move_to(&mut session, 400.0, 400.0);
    session.input(InputEvent::PointerUp);

    assert_eq!(session.store().get_node(ids[1]).unwrap().x, 200.0);
}

#[test]
fn plain_press_on_selected_node_drags_the_group() {
    let (mut session, ids) = row();
    click_node(&mut session, ids[0], Modifiers::NONE);
    click_node(&mut session, ids[1], ctrl());
    let entries = session.history().len();

    press(&mut session, Point::new(10.0, 10.0), PointerTarget::Node(ids[0]), Modifiers::NONE);
    assert_eq!(session.selection().node_ids(), vec![ids[0], ids[1]]);
    move_to(&mut session, 20.0, 60.0);
    move_to(&mut session, 30.0, 110.0);
    session.input(InputEvent::PointerUp);

    let store = session.store();
    assert_eq!(store.get_node(ids[0]).unwrap().origin(), Point::new(20.0, 100.0));
    assert_eq!(store.get_node(ids[1]).unwrap().origin(), Point::new(220.0, 100.0));
    assert_eq!(store.get_node(ids[2]).unwrap().origin(), Point::new(400.0, 0.0));

    // a whole drag is a single history entry
    assert_eq!(session.history().len(), entries + 1);
    assert!(session.undo());
    assert_eq!(session.store().get_node(ids[0]).unwrap().origin(), Point::new(0.0, 0.0));
}

#[test]
fn plain_press_on_unselected_node_replaces_selection() {
    let (mut session, ids) = row();
    click_node(&mut session, ids[0], Modifiers::NONE);
    click_node(&mut session, ids[1], ctrl());

    click_node(&mut session, ids[2], Modifiers::NONE);
    assert_eq!(session.selection().node_ids(), vec![ids[2]]);
}

#[test]
fn drag_stays_on_canvas() {
    let (mut session, ids) = row();

    press(&mut session, Point::new(410.0, 10.0), PointerTarget::Node(ids[2]), Modifiers::NONE);
    move_to(&mut session, 5000.0, 5000.0);
    session.input(InputEvent::PointerUp);

    let canvas = session.store().canvas();
    let node = session.store().get_node(ids[2]).unwrap();
    assert_eq!(node.x + node.width, canvas.width);
    assert_eq!(node.y + node.height, canvas.height);
}

#[test]
fn pointer_leave_ends_drag() {
    let (mut session, ids) = row();
    let entries = session.history().len();

    press(&mut session, Point::new(10.0, 10.0), PointerTarget::Node(ids[0]), Modifiers::NONE);
    move_to(&mut session, 60.0, 10.0);
    session.input(InputEvent::PointerLeave);

    assert_eq!(session.state(), &InteractionState::Idle);
    assert!(!session.is_pointer_captured());
    assert_eq!(session.history().len(), entries + 1);

    // moves after the release change nothing
    move_to(&mut session, 300.0, 300.0);
    assert_eq!(session.store().get_node(ids[0]).unwrap().x, 50.0);
}

#[test]
fn delete_key_removes_nodes_and_their_edges() {
    let (mut session, ids) = row();
    let e01 = session.connect(ids[0], ids[1]).unwrap();
    let e12 = session.connect(ids[1], ids[2]).unwrap();
    let e02 = session.connect(ids[0], ids[2]).unwrap();

    click_node(&mut session, ids[1], Modifiers::NONE);
    session.input(InputEvent::KeyDown { key: Key::Backspace });

    let store = session.store();
    assert!(!store.has_node(ids[1]));
    assert!(store.get_edge(e01).is_none());
    assert!(store.get_edge(e12).is_none());
    assert!(store.get_edge(e02).is_some());
    assert!(session.selection().is_empty());
}

#[test]
fn delete_selected_edge_only() {
    let (mut session, ids) = row();
    let edge = session.connect(ids[0], ids[1]).unwrap();

    press(&mut session, Point::new(150.0, 40.0), PointerTarget::Edge(edge), Modifiers::NONE);
    assert_eq!(session.selection().edge_id(), Some(edge));
    session.delete_selected();

    assert_eq!(session.store().edge_count(), 0);
    assert_eq!(session.store().node_count(), 3);
}

#[test]
fn other_keys_are_ignored() {
    let (mut session, ids) = row();
    click_node(&mut session, ids[0], Modifiers::NONE);
    session.input(InputEvent::KeyDown {
        key: Key::Other("Escape".to_string()),
    });
    assert_eq!(session.store().node_count(), 3);
}

#[test]
fn connect_mode_links_two_picks_and_exits() {
    let (mut session, ids) = row();

    session.toggle_connect_mode();
    assert!(session.is_connect_mode());
    press(&mut session, Point::default(), PointerTarget::Node(ids[0]), Modifiers::NONE);
    assert_eq!(
        session.state(),
        &InteractionState::ConnectingAwaitingSecond { first: ids[0] }
    );
    press(&mut session, Point::default(), PointerTarget::Node(ids[2]), Modifiers::NONE);

    assert!(!session.is_connect_mode());
    let edge = session.store().edges().next().unwrap();
    assert_eq!((edge.from, edge.to), (ids[0], ids[2]));
    assert_eq!(session.store().connection_label(edge), "App Server → App Server");
}

#[test]
fn undo_clears_selection() {
    let (mut session, ids) = row();
    click_node(&mut session, ids[0], Modifiers::NONE);
    session.rename_node(ids[0], "Checkout");

    assert!(session.undo());
    assert!(session.selection().is_empty());
    assert_eq!(session.state(), &InteractionState::Idle);
    assert!(session.redo());
    assert_eq!(session.store().get_node(ids[0]).unwrap().label, "Checkout");
}

#[test]
fn client_events_go_through_viewport() {
    let (mut session, ids) = row();
    session.set_viewport(Viewport::new(Point::new(100.0, 100.0), 2.0));

    let down: EditorEvent = serde_json::from_str(&format!(
        r#"{{"type": "pointerDown", "point": {{"x": 120, "y": 120}}, "target": {{"node": {}}}}}"#,
        ids[0]
    ))
    .unwrap();
    session.handle(down).unwrap();
    session
        .handle(EditorEvent::PointerMove {
            point: Point::new(220.0, 120.0),
        })
        .unwrap();
    session.handle(EditorEvent::PointerUp).unwrap();

    // 100 client pixels at zoom 2 is 50 canvas units
    assert_eq!(session.store().get_node(ids[0]).unwrap().x, 50.0);
}
