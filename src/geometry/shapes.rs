use crate::coords::CoordinateMapper;
use crate::model::Drawing;
use eframe::egui;

use super::{Geometry, KindHandler, anchor_handles, project_all};

const ELLIPSE_STEPS: usize = 48;

pub(super) static RECTANGLE: KindHandler = KindHandler {
    labels: &["corner", "opposite"],
    phases: &[],
    fill: true,
    handles: anchor_handles,
    build: rectangle,
    validate: None,
};

pub(super) static ELLIPSE: KindHandler = KindHandler {
    labels: &["corner", "opposite"],
    phases: &[],
    fill: true,
    handles: anchor_handles,
    build: ellipse,
    validate: None,
};

pub(super) static TRIANGLE: KindHandler = KindHandler {
    labels: &["a", "b", "c"],
    phases: &[],
    fill: true,
    handles: anchor_handles,
    build: triangle,
    validate: None,
};

pub(super) static TEXT: KindHandler = KindHandler {
    labels: &["anchor"],
    phases: &[],
    fill: false,
    handles: anchor_handles,
    build: text,
    validate: None,
};

pub(super) static CALLOUT: KindHandler = KindHandler {
    labels: &["target", "box"],
    phases: &[],
    fill: false,
    handles: anchor_handles,
    build: callout,
    validate: None,
};

pub(super) static PRICE_RANGE: KindHandler = KindHandler {
    labels: &["start", "end"],
    phases: &[],
    fill: true,
    handles: anchor_handles,
    build: price_range,
    validate: None,
};

fn corners(a: egui::Pos2, b: egui::Pos2) -> [egui::Pos2; 4] {
    let r = egui::Rect::from_two_pos(a, b);
    [r.left_top(), r.right_top(), r.right_bottom(), r.left_bottom()]
}

fn rectangle(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let [a, b] = project_all::<2>(mapper, &drawing.points)?;
    let pts = corners(a, b);
    let mut g = Geometry::default();
    g.fill(pts.to_vec(), drawing.fill());
    g.closed(&pts);
    Some(g)
}

fn ellipse_points(rect: egui::Rect) -> Vec<egui::Pos2> {
    let center = rect.center();
    let rx = rect.width() * 0.5;
    let ry = rect.height() * 0.5;
    (0..ELLIPSE_STEPS)
        .map(|i| {
            let t = (i as f32) / (ELLIPSE_STEPS as f32) * std::f32::consts::TAU;
            center + egui::vec2(t.cos() * rx, t.sin() * ry)
        })
        .collect()
}

fn ellipse(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let [a, b] = project_all::<2>(mapper, &drawing.points)?;
    let rect = egui::Rect::from_two_pos(a, b);
    if rect.width() <= f32::EPSILON || rect.height() <= f32::EPSILON {
        let mut g = Geometry::default();
        g.line(a, b);
        return Some(g);
    }
    let pts = ellipse_points(rect);
    let mut g = Geometry::default();
    g.fill(pts.clone(), drawing.fill());
    g.closed(&pts);
    Some(g)
}

fn triangle(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let pts = project_all::<3>(mapper, &drawing.points)?;
    let mut g = Geometry::default();
    g.fill(pts.to_vec(), drawing.fill());
    g.closed(&pts);
    Some(g)
}

fn text(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let [a] = project_all::<1>(mapper, &drawing.points)?;
    let mut g = Geometry::default();
    g.text(a, drawing.label.clone().unwrap_or_else(|| "Text".to_string()));
    Some(g)
}

fn callout(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let [target, label_at] = project_all::<2>(mapper, &drawing.points)?;
    let mut g = Geometry::default();
    g.line(target, label_at);
    g.text(
        label_at + egui::vec2(4.0, -4.0),
        drawing.label.clone().unwrap_or_else(|| "Callout".to_string()),
    );
    Some(g)
}

fn price_range(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let [a, b] = project_all::<2>(mapper, &drawing.points)?;
    let (start, end) = (drawing.points[0].price, drawing.points[1].price);
    let delta = end - start;
    let caption = if start.abs() > f64::EPSILON {
        format!("{delta:+.2} ({:+.2}%)", delta / start * 100.0)
    } else {
        format!("{delta:+.2}")
    };
    let pts = corners(a, b);
    let mid_x = (a.x + b.x) * 0.5;
    let mut g = Geometry::default();
    g.fill(pts.to_vec(), drawing.fill());
    g.dashed(pts[0], pts[1]);
    g.dashed(pts[3], pts[2]);
    g.line(egui::pos2(mid_x, a.y), egui::pos2(mid_x, b.y));
    g.text(egui::pos2(mid_x + 4.0, b.y.min(a.y) - 16.0), caption);
    Some(g)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::LinearViewport;
    use crate::model::{AnchorPoint, DrawingKind, DrawingStyle, Rgba};

    #[test]
    fn rectangle_fills_only_with_fill_color() {
        let vp = LinearViewport::new(0, 100, 0.0, 100.0).with_size(100.0, 100.0);
        let mapper = CoordinateMapper::new(&vp);
        let points = vec![AnchorPoint::new(10, 80.0), AnchorPoint::new(40, 20.0)];
        let plain = Drawing::new(DrawingKind::Rectangle, points.clone(), DrawingStyle::default());
        let g = rectangle(&plain, &mapper).unwrap();
        assert_eq!(g.segments.len(), 4);
        assert!(g.fills.is_empty());

        let filled = plain.with_fill(Rgba::rgb(10, 20, 30), 0.5);
        let g = rectangle(&filled, &mapper).unwrap();
        assert_eq!(g.fills.len(), 1);
        assert_eq!(g.fills[0].color.a, 128);
    }

    #[test]
    fn price_range_reports_percent_change() {
        let vp = LinearViewport::new(0, 100, 0.0, 200.0).with_size(100.0, 100.0);
        let mapper = CoordinateMapper::new(&vp);
        let d = Drawing::new(
            DrawingKind::PriceRange,
            vec![AnchorPoint::new(10, 100.0), AnchorPoint::new(50, 110.0)],
            DrawingStyle::default(),
        );
        let g = price_range(&d, &mapper).unwrap();
        assert_eq!(g.texts[0].text, "+10.00 (+10.00%)");
    }
}
