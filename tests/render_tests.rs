use chartscribe::coords::{CoordinateMapper, LinearViewport};
use chartscribe::geometry::bands::BarTimeline;
use chartscribe::interaction::{InputEvent, InteractionController};
use chartscribe::model::{
    AnchorPoint, BandFill, Drawing, DrawingKind, DrawingStyle, LineSeries, Rgba, SeriesValue,
};
use chartscribe::render::{
    CanvasSize, DisplayList, OverlayLine, PaintCmd, Renderer, RepaintReason, Scene,
    build_display_list,
};
use chartscribe::store::DrawingStore;
use eframe::egui::{Key, Modifiers, pos2};

fn viewport() -> LinearViewport {
    LinearViewport::new(0, 1000, 0.0, 200.0).with_size(1000.0, 200.0)
}

fn overlay(id: &str, value: f64) -> OverlayLine {
    OverlayLine {
        series: LineSeries::new(
            id,
            (0..10)
                .map(|i| SeriesValue {
                    time: i * 100,
                    value: Some(value),
                })
                .collect(),
        ),
        color: Rgba::rgb(200, 200, 200),
        width: 1.0,
    }
}

fn rectangle(store: &mut DrawingStore) -> String {
    store
        .add(
            Drawing::new(
                DrawingKind::Rectangle,
                vec![AnchorPoint::new(100, 150.0), AnchorPoint::new(400, 50.0)],
                DrawingStyle::default(),
            )
            .with_fill(Rgba::rgb(0, 200, 0), 0.3),
        )
        .unwrap()
}

fn list_for(store: &DrawingStore, controller: &InteractionController, vp: &LinearViewport) -> DisplayList {
    let overlays = [overlay("upper", 180.0), overlay("lower", 20.0)];
    let bands = [BandFill {
        upper: "upper".into(),
        lower: "lower".into(),
        color: Rgba::rgb(0, 0, 255),
    }];
    build_display_list(&Scene {
        store,
        controller,
        mapper: CoordinateMapper::new(vp),
        overlays: &overlays,
        bands: &bands,
        timeline: BarTimeline::Inferred,
    })
}

fn handle_count(list: &DisplayList) -> usize {
    list.handles
        .iter()
        .filter(|c| matches!(c, PaintCmd::Handle { .. }))
        .count()
}

#[test]
fn layers_are_fills_then_lines_then_handles() {
    let vp = viewport();
    let mut store = DrawingStore::new();
    rectangle(&mut store);
    let controller = InteractionController::default();
    let list = list_for(&store, &controller, &vp);

    // Nine band quads plus the rectangle fill.
    assert_eq!(list.fills.len(), 10);
    assert!(list.fills.iter().all(|c| matches!(c, PaintCmd::Polygon { .. })));
    assert!(list.lines.iter().any(|c| matches!(c, PaintCmd::Path { .. })));
    assert!(list.lines.iter().any(|c| matches!(c, PaintCmd::Line { .. })));
    assert_eq!(handle_count(&list), 2);

    let order: Vec<u8> = list
        .iter()
        .map(|c| match c {
            PaintCmd::Polygon { .. } => 0,
            PaintCmd::Handle { .. } => 2,
            _ => 1,
        })
        .collect();
    assert!(order.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn hidden_drawings_paint_nothing_and_keep_no_handles() {
    let vp = viewport();
    let mut store = DrawingStore::new();
    let id = rectangle(&mut store);
    store.set_hidden(&id, true);
    let controller = InteractionController::default();
    let list = list_for(&store, &controller, &vp);

    assert_eq!(store.selected_id(), Some(id));
    assert_eq!(list.fills.len(), 9);
    assert!(!list.lines.iter().any(|c| matches!(c, PaintCmd::Line { .. })));
    assert_eq!(handle_count(&list), 0);
}

#[test]
fn draft_preview_and_its_handles_are_painted() {
    let vp = viewport();
    let mut store = DrawingStore::new();
    let mut controller = InteractionController::default();
    let mapper = CoordinateMapper::new(&vp);
    for event in [
        InputEvent::Key {
            key: Key::T,
            modifiers: Modifiers::NONE,
            text_focus: false,
        },
        InputEvent::PointerDown(pos2(100.0, 100.0)),
        InputEvent::PointerMove(pos2(300.0, 60.0)),
    ] {
        controller.handle(event, &mut store, &mapper);
    }
    let list = list_for(&store, &controller, &vp);
    assert!(list.lines.iter().any(|c| matches!(
        c,
        PaintCmd::Line { a, b, .. } if *a == pos2(100.0, 100.0) && *b == pos2(300.0, 60.0)
    )));
    assert_eq!(handle_count(&list), 1);
    assert!(store.is_empty());
}

#[test]
fn renderer_coalesces_requests_into_one_paint() {
    let vp = viewport();
    let store = DrawingStore::new();
    let controller = InteractionController::default();
    let scene = Scene {
        store: &store,
        controller: &controller,
        mapper: CoordinateMapper::new(&vp),
        overlays: &[],
        bands: &[],
        timeline: BarTimeline::Inferred,
    };

    let mut renderer = Renderer::new(CanvasSize::new(1000.0, 200.0, 2.0));
    assert!(renderer.run_frame(&scene));
    assert!(!renderer.run_frame(&scene));

    for _ in 0..20 {
        renderer.request(RepaintReason::Hover);
    }
    renderer.request(RepaintReason::Data);
    let pending = renderer.scheduler().pending().unwrap();
    assert!(pending.reasons.contains(RepaintReason::Hover));
    assert!(pending.reasons.contains(RepaintReason::Data));
    assert!(renderer.run_frame(&scene));
    assert!(!renderer.run_frame(&scene));
    assert_eq!(renderer.paint_count(), 2);
}

#[test]
fn resize_uses_the_device_pixel_ratio() {
    let mut renderer = Renderer::new(CanvasSize::new(800.0, 600.0, 1.0));
    assert!(!renderer.resize(CanvasSize::new(800.0, 600.0, 1.0)));
    assert!(renderer.resize(CanvasSize::new(800.0, 600.0, 1.5)));
    assert_eq!(renderer.canvas().physical(), [1200, 900]);
    assert!(renderer.scheduler().is_pending());
    assert_eq!(CanvasSize::new(10.0, 10.0, -3.0).physical(), [10, 10]);
}
