use chartscribe::coords::{CoordinateMapper, LinearViewport};
use chartscribe::interaction::{InputEvent, InteractionController, InteractionState};
use chartscribe::model::{AnchorPoint, Drawing, DrawingKind, DrawingStyle};
use chartscribe::store::DrawingStore;
use eframe::egui::{Key, Modifiers, pos2};

/// x is the timestamp, y is `200 - price`.
fn viewport() -> LinearViewport {
    LinearViewport::new(0, 1000, 0.0, 200.0).with_size(1000.0, 200.0)
}

fn key(key: Key) -> InputEvent {
    InputEvent::Key {
        key,
        modifiers: Modifiers::NONE,
        text_focus: false,
    }
}

fn shift(key: Key) -> InputEvent {
    InputEvent::Key {
        key,
        modifiers: Modifiers::SHIFT,
        text_focus: false,
    }
}

struct Harness {
    viewport: LinearViewport,
    store: DrawingStore,
    controller: InteractionController,
}

impl Harness {
    fn new() -> Self {
        Self {
            viewport: viewport(),
            store: DrawingStore::new(),
            controller: InteractionController::default(),
        }
    }

    fn send(&mut self, event: InputEvent) -> chartscribe::interaction::Outcome {
        let mapper = CoordinateMapper::new(&self.viewport);
        self.controller.handle(event, &mut self.store, &mapper)
    }

    fn click(&mut self, x: f32, y: f32) -> chartscribe::interaction::Outcome {
        let out = self.send(InputEvent::PointerDown(pos2(x, y)));
        self.send(InputEvent::PointerUp(pos2(x, y)));
        out
    }

    fn add_hline(&mut self, time: i64, price: f64) -> String {
        self.store
            .add(Drawing::new(
                DrawingKind::HorizontalLine,
                vec![AnchorPoint::new(time, price)],
                DrawingStyle::default(),
            ))
            .unwrap()
    }
}

#[test]
fn horizontal_line_needs_one_click() {
    let mut h = Harness::new();
    h.send(key(Key::H));
    assert_eq!(h.controller.active_tool(), Some(DrawingKind::HorizontalLine));

    let out = h.click(500.0, 100.0);
    let id = out.committed.expect("committed");
    assert!(out.changed);
    assert!(h.controller.is_idle());
    assert!(!h.controller.capture().is_held());

    let d = h.store.get(&id).unwrap();
    assert_eq!(d.points, vec![AnchorPoint::new(500, 100.0)]);
    assert!(d.selected);
}

#[test]
fn escape_after_first_trend_line_click_discards_the_draft() {
    let mut h = Harness::new();
    h.send(key(Key::T));
    h.click(100.0, 100.0);
    assert!(matches!(
        h.controller.state(),
        InteractionState::Collecting { .. }
    ));
    assert!(h.controller.capture().is_held());

    let out = h.send(key(Key::Escape));
    assert!(out.repaint);
    assert!(h.controller.is_idle());
    assert!(h.store.is_empty());
    assert!(!h.controller.capture().is_held());
}

#[test]
fn trend_line_commits_on_second_click() {
    let mut h = Harness::new();
    h.send(key(Key::T));
    assert!(h.click(100.0, 150.0).committed.is_none());
    h.send(InputEvent::PointerMove(pos2(300.0, 40.0)));
    let draft = h.controller.draft().unwrap();
    assert_eq!(draft.hover, Some(AnchorPoint::new(300, 160.0)));
    assert!(draft.preview_drawing(DrawingStyle::default()).is_some());

    let id = h.click(300.0, 40.0).committed.unwrap();
    let d = h.store.get(&id).unwrap();
    assert_eq!(d.kind, DrawingKind::TrendLine);
    assert_eq!(
        d.points,
        vec![AnchorPoint::new(100, 50.0), AnchorPoint::new(300, 160.0)]
    );
    assert!(!h.controller.capture().is_held());
}

#[test]
fn channel_reports_its_second_line_phase() {
    let mut h = Harness::new();
    h.send(key(Key::C));
    h.click(100.0, 100.0);
    assert_eq!(h.controller.draft().unwrap().phase, 0);
    h.click(300.0, 80.0);
    assert_eq!(h.controller.draft().unwrap().phase, 1);
    h.click(100.0, 140.0);
    let id = h.click(300.0, 120.0).committed.unwrap();
    assert_eq!(h.store.get(&id).unwrap().points.len(), 4);
}

#[test]
fn dragging_a_handle_moves_only_that_drawing() {
    let mut h = Harness::new();
    let target = h.add_hline(500, 100.0);
    let other = h.add_hline(200, 50.0);

    // Select the first line by clicking its body, away from any handle.
    h.click(800.0, 100.0);
    assert_eq!(h.store.selected_id(), Some(target.clone()));
    let revision = h.store.revision();

    h.send(InputEvent::PointerDown(pos2(500.0, 100.0)));
    assert!(matches!(
        h.controller.state(),
        InteractionState::HandleEditing { .. }
    ));
    h.send(InputEvent::PointerMove(pos2(520.0, 120.0)));
    h.send(InputEvent::PointerMove(pos2(500.0, 140.0)));
    assert_eq!(h.store.revision(), revision, "no writes while dragging");
    let out = h.send(InputEvent::PointerUp(pos2(500.0, 140.0)));

    assert!(out.changed);
    assert_eq!(h.store.revision(), revision + 1);
    assert_eq!(h.store.get(&target).unwrap().points[0], AnchorPoint::new(500, 60.0));
    assert_eq!(h.store.get(&other).unwrap().points[0], AnchorPoint::new(200, 50.0));
    assert_eq!(h.store.selected_id(), Some(target));
    assert!(h.controller.is_idle());
    assert!(!h.controller.capture().is_held());
}

#[test]
fn escape_during_drag_restores_the_anchor() {
    let mut h = Harness::new();
    let id = h.add_hline(500, 100.0);
    let revision = h.store.revision();
    h.send(InputEvent::PointerDown(pos2(500.0, 100.0)));
    h.send(InputEvent::PointerMove(pos2(500.0, 10.0)));
    assert!(h.controller.edit_preview().is_some());
    h.send(key(Key::Escape));
    h.send(InputEvent::PointerUp(pos2(500.0, 10.0)));

    assert_eq!(h.store.get(&id).unwrap().points[0].price, 100.0);
    assert_eq!(h.store.revision(), revision);
    assert!(h.controller.is_idle());
}

#[test]
fn hovering_a_handle_is_pointer_feedback_only() {
    let mut h = Harness::new();
    h.add_hline(500, 100.0);
    let revision = h.store.revision();

    let out = h.send(InputEvent::PointerMove(pos2(502.0, 101.0)));
    assert!(out.hover && out.repaint && !out.changed);
    assert_eq!(h.controller.hovered_handle(), Some(0));

    let out = h.send(InputEvent::PointerMove(pos2(503.0, 101.0)));
    assert_eq!(out, Default::default());
    let out = h.send(InputEvent::PointerMove(pos2(800.0, 20.0)));
    assert!(out.hover);
    assert_eq!(h.controller.hovered_handle(), None);
    assert_eq!(h.store.revision(), revision);
}

#[test]
fn inspector_edits_wait_for_the_capture() {
    let mut h = Harness::new();
    let id = h.add_hline(500, 100.0);

    h.send(key(Key::T));
    h.click(100.0, 100.0);
    assert!(h.controller.capture().is_held());
    let refused = h
        .controller
        .edit_store(&mut h.store, |store| store.remove(&id));
    assert!(refused.is_none());
    assert!(h.store.get(&id).is_some());

    h.send(key(Key::Escape));
    h.send(InputEvent::PointerDown(pos2(500.0, 100.0)));
    assert!(matches!(
        h.controller.state(),
        InteractionState::HandleEditing { .. }
    ));
    let refused = h
        .controller
        .edit_store(&mut h.store, |store| store.set_locked(&id, true));
    assert!(refused.is_none());
    assert!(!h.store.get(&id).unwrap().locked);

    h.send(InputEvent::PointerUp(pos2(500.0, 100.0)));
    assert!(!h.controller.capture().is_held());
    let removed = h
        .controller
        .edit_store(&mut h.store, |store| store.remove(&id));
    assert!(removed.flatten().is_some());
    assert!(h.store.is_empty());
}

#[test]
fn locked_drawings_cannot_be_dragged() {
    let mut h = Harness::new();
    let id = h.add_hline(500, 100.0);
    h.send(shift(Key::L));
    assert!(h.store.get(&id).unwrap().locked);

    h.send(InputEvent::PointerDown(pos2(500.0, 100.0)));
    assert!(h.controller.is_idle());
    h.send(InputEvent::PointerMove(pos2(500.0, 150.0)));
    h.send(InputEvent::PointerUp(pos2(500.0, 150.0)));
    assert_eq!(h.store.get(&id).unwrap().points[0].price, 100.0);
}

#[test]
fn hidden_selection_exposes_no_handles() {
    let mut h = Harness::new();
    let id = h.add_hline(500, 100.0);
    h.send(shift(Key::H));
    assert!(h.store.get(&id).unwrap().hidden);
    assert_eq!(h.store.selected_id(), Some(id));

    h.send(InputEvent::PointerDown(pos2(500.0, 100.0)));
    assert!(h.controller.is_idle());
}

#[test]
fn delete_removes_the_selection() {
    let mut h = Harness::new();
    let id = h.add_hline(500, 100.0);
    let out = h.send(key(Key::Delete));
    assert_eq!(out.removed, Some(id));
    assert!(h.store.is_empty());
    assert!(h.send(key(Key::Backspace)).removed.is_none());
}

#[test]
fn clicking_empty_space_clears_the_selection() {
    let mut h = Harness::new();
    h.add_hline(500, 100.0);
    h.click(300.0, 20.0);
    assert_eq!(h.store.selected_id(), None);
    h.add_hline(500, 150.0);
    h.send(key(Key::Escape));
    assert_eq!(h.store.selected_id(), None);
}

#[test]
fn hotkeys_are_ignored_while_typing() {
    let mut h = Harness::new();
    h.send(InputEvent::Key {
        key: Key::H,
        modifiers: Modifiers::NONE,
        text_focus: true,
    });
    assert!(h.controller.is_idle());

    let id = h.add_hline(500, 100.0);
    h.send(InputEvent::Key {
        key: Key::Delete,
        modifiers: Modifiers::NONE,
        text_focus: true,
    });
    assert!(h.store.get(&id).is_some());
}

#[test]
fn collecting_ignores_other_tool_hotkeys() {
    let mut h = Harness::new();
    h.send(key(Key::T));
    h.click(100.0, 100.0);
    h.send(key(Key::R));
    assert_eq!(h.controller.active_tool(), Some(DrawingKind::TrendLine));
}

#[test]
fn focus_loss_cancels_creation() {
    let mut h = Harness::new();
    h.send(key(Key::Z));
    h.click(100.0, 100.0);
    h.click(200.0, 50.0);
    h.send(InputEvent::FocusLost);
    assert!(h.controller.is_idle());
    assert!(h.store.is_empty());
    assert!(!h.controller.capture().is_held());
}

#[test]
fn clicks_outside_the_laid_out_pane_are_ignored() {
    let mut h = Harness::new();
    h.viewport = LinearViewport::new(0, 1000, 0.0, 200.0);
    h.send(key(Key::H));
    let out = h.click(500.0, 100.0);
    assert!(out.committed.is_none());
    assert_eq!(h.controller.active_tool(), Some(DrawingKind::HorizontalLine));
    assert!(h.store.is_empty());
}

#[test]
fn toolbar_tool_then_select_button() {
    let mut h = Harness::new();
    h.send(InputEvent::ArmTool(DrawingKind::Rectangle));
    assert_eq!(h.controller.active_tool(), Some(DrawingKind::Rectangle));
    h.send(InputEvent::Cancel);
    assert!(h.controller.is_idle());
    assert_eq!(h.controller.status(), "Select");
}
