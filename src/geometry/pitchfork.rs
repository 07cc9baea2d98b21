use crate::coords::CoordinateMapper;
use crate::model::Drawing;
use eframe::egui;

use super::{Geometry, KindHandler, anchor_handles, extend_line, pane_rect, project_all};

pub(super) static PITCHFORK: KindHandler = KindHandler {
    labels: &["pivot", "upper", "lower"],
    phases: &[],
    fill: false,
    handles: anchor_handles,
    build: andrews,
    validate: None,
};

pub(super) static SCHIFF_PITCHFORK: KindHandler = KindHandler {
    labels: &["pivot", "upper", "lower"],
    phases: &[],
    fill: false,
    handles: anchor_handles,
    build: schiff,
    validate: None,
};

pub(super) static MODIFIED_SCHIFF_PITCHFORK: KindHandler = KindHandler {
    labels: &["pivot", "upper", "lower"],
    phases: &[],
    fill: false,
    handles: anchor_handles,
    build: modified_schiff,
    validate: None,
};

#[derive(Clone, Copy)]
enum Origin {
    Pivot,
    Schiff,
    ModifiedSchiff,
}

fn andrews(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    pitchfork(drawing, mapper, Origin::Pivot)
}

fn schiff(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    pitchfork(drawing, mapper, Origin::Schiff)
}

fn modified_schiff(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    pitchfork(drawing, mapper, Origin::ModifiedSchiff)
}

fn pitchfork(drawing: &Drawing, mapper: &CoordinateMapper, origin: Origin) -> Option<Geometry> {
    let [pivot, upper, lower] = project_all::<3>(mapper, &drawing.points)?;
    let bounds = pane_rect(mapper)?;
    let start = match origin {
        Origin::Pivot => pivot,
        Origin::Schiff => egui::pos2(pivot.x, (pivot.y + upper.y) * 0.5),
        Origin::ModifiedSchiff => pivot.lerp(upper, 0.5),
    };
    let mid = lower.lerp(upper, 0.5);
    let dir = mid - start;

    let mut g = Geometry::default();
    g.dashed(upper, lower);
    if start != pivot {
        g.dashed(pivot, start);
    }
    // A degenerate median (origin on the midpoint) leaves only the reaction line.
    if dir.length_sq() <= f32::EPSILON {
        return Some(g);
    }
    for from in [start, upper, lower] {
        if let Some((a, b)) = extend_line(from, from + dir, bounds, false) {
            g.line(a, b);
        }
    }
    Some(g)
}
