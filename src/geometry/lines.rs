use crate::coords::CoordinateMapper;
use crate::model::Drawing;
use eframe::egui;

use super::{
    Geometry, Handle, KindHandler, anchor_handles, extend_line, pane_rect, price_text, project,
    project_all,
};

pub(super) static HORIZONTAL_LINE: KindHandler = KindHandler {
    labels: &["price"],
    phases: &[],
    fill: false,
    handles: horizontal_handles,
    build: horizontal_line,
    validate: None,
};

pub(super) static HORIZONTAL_RAY: KindHandler = KindHandler {
    labels: &["start"],
    phases: &[],
    fill: false,
    handles: anchor_handles,
    build: horizontal_ray,
    validate: None,
};

pub(super) static VERTICAL_LINE: KindHandler = KindHandler {
    labels: &["time"],
    phases: &[],
    fill: false,
    handles: vertical_handles,
    build: vertical_line,
    validate: None,
};

pub(super) static CROSS_LINE: KindHandler = KindHandler {
    labels: &["center"],
    phases: &[],
    fill: false,
    handles: anchor_handles,
    build: cross_line,
    validate: None,
};

pub(super) static TREND_LINE: KindHandler = KindHandler {
    labels: &["start", "end"],
    phases: &[],
    fill: false,
    handles: anchor_handles,
    build: trend_line,
    validate: None,
};

pub(super) static RAY: KindHandler = KindHandler {
    labels: &["start", "through"],
    phases: &[],
    fill: false,
    handles: anchor_handles,
    build: ray,
    validate: None,
};

pub(super) static EXTENDED_LINE: KindHandler = KindHandler {
    labels: &["a", "b"],
    phases: &[],
    fill: false,
    handles: anchor_handles,
    build: extended_line,
    validate: None,
};

pub(super) static CHANNEL: KindHandler = KindHandler {
    labels: &["line 1 start", "line 1 end", "line 2 start", "line 2 end"],
    phases: &[2, 2],
    fill: true,
    handles: anchor_handles,
    build: channel,
    validate: None,
};

pub(super) static PARALLEL_CHANNEL: KindHandler = KindHandler {
    labels: &["start", "end", "offset"],
    phases: &[],
    fill: true,
    handles: anchor_handles,
    build: parallel_channel,
    validate: None,
};

/// A horizontal line only needs its price; the handle sits on the anchor's
/// time when visible, otherwise mid-pane.
fn horizontal_handles(drawing: &Drawing, mapper: &CoordinateMapper) -> Vec<Handle> {
    let Some(p) = drawing.points.first() else {
        return Vec::new();
    };
    let (Some(pane), Some(y)) = (mapper.pane(), mapper.price_to_y(p.price)) else {
        return Vec::new();
    };
    let x = mapper
        .time_to_x(p.time_ms)
        .filter(|x| (0.0..=pane.x).contains(x))
        .unwrap_or(pane.x * 0.5);
    vec![Handle {
        label: "price",
        index: 0,
        pos: egui::pos2(x, y),
    }]
}

fn vertical_handles(drawing: &Drawing, mapper: &CoordinateMapper) -> Vec<Handle> {
    let Some(p) = drawing.points.first() else {
        return Vec::new();
    };
    let (Some(pane), Some(x)) = (mapper.pane(), mapper.time_to_x(p.time_ms)) else {
        return Vec::new();
    };
    let y = mapper
        .price_to_y(p.price)
        .filter(|y| (0.0..=pane.y).contains(y))
        .unwrap_or(pane.y * 0.5);
    vec![Handle {
        label: "time",
        index: 0,
        pos: egui::pos2(x, y),
    }]
}

fn horizontal_line(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let p = drawing.points.first()?;
    let pane = mapper.pane()?;
    let y = mapper.price_to_y(p.price)?;
    let mut g = Geometry::default();
    g.line(egui::pos2(0.0, y), egui::pos2(pane.x, y));
    g.text(egui::pos2((pane.x - 64.0).max(0.0), y - 16.0), price_text(p.price));
    Some(g)
}

fn horizontal_ray(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let p = drawing.points.first()?;
    let pane = mapper.pane()?;
    let a = project(mapper, *p)?;
    let mut g = Geometry::default();
    if a.x < pane.x {
        g.line(a, egui::pos2(pane.x, a.y));
    }
    g.text(a + egui::vec2(4.0, -16.0), price_text(p.price));
    Some(g)
}

fn vertical_line(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let p = drawing.points.first()?;
    let pane = mapper.pane()?;
    let x = mapper.time_to_x(p.time_ms)?;
    let mut g = Geometry::default();
    g.line(egui::pos2(x, 0.0), egui::pos2(x, pane.y));
    Some(g)
}

fn cross_line(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let [c] = project_all::<1>(mapper, &drawing.points)?;
    let pane = mapper.pane()?;
    let mut g = Geometry::default();
    g.line(egui::pos2(0.0, c.y), egui::pos2(pane.x, c.y));
    g.line(egui::pos2(c.x, 0.0), egui::pos2(c.x, pane.y));
    Some(g)
}

fn trend_line(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let [a, b] = project_all::<2>(mapper, &drawing.points)?;
    let mut g = Geometry::default();
    g.line(a, b);
    Some(g)
}

fn ray(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let [a, b] = project_all::<2>(mapper, &drawing.points)?;
    let (from, to) = extend_line(a, b, pane_rect(mapper)?, false)?;
    let mut g = Geometry::default();
    g.line(from, to);
    Some(g)
}

fn extended_line(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let [a, b] = project_all::<2>(mapper, &drawing.points)?;
    let (from, to) = extend_line(a, b, pane_rect(mapper)?, true)?;
    let mut g = Geometry::default();
    g.line(from, to);
    Some(g)
}

fn channel(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let [a1, b1, a2, b2] = project_all::<4>(mapper, &drawing.points)?;
    let mut g = Geometry::default();
    g.fill(vec![a1, b1, b2, a2], drawing.fill());
    g.line(a1, b1);
    g.line(a2, b2);
    Some(g)
}

fn parallel_channel(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let [a, b, c] = project_all::<3>(mapper, &drawing.points)?;
    let dx = b.x - a.x;
    let t = if dx.abs() > f32::EPSILON {
        (c.x - a.x) / dx
    } else {
        0.0
    };
    let on_base = a.y + t * (b.y - a.y);
    let offset = egui::vec2(0.0, c.y - on_base);
    let mut g = Geometry::default();
    g.fill(vec![a, b, b + offset, a + offset], drawing.fill());
    g.line(a, b);
    g.line(a + offset, b + offset);
    g.dashed(a + offset * 0.5, b + offset * 0.5);
    Some(g)
}
