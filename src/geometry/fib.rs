use crate::coords::CoordinateMapper;
use crate::model::Drawing;
use eframe::egui;

use super::{Geometry, KindHandler, anchor_handles, price_text, project_all};

const RETRACEMENT_LEVELS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];
const EXTENSION_LEVELS: [f64; 5] = [0.0, 0.618, 1.0, 1.618, 2.618];
const TIME_ZONE_STEPS: [i64; 11] = [0, 1, 2, 3, 5, 8, 13, 21, 34, 55, 89];

pub(super) static FIB_RETRACEMENT: KindHandler = KindHandler {
    labels: &["start", "end"],
    phases: &[],
    fill: false,
    handles: anchor_handles,
    build: retracement,
    validate: None,
};

pub(super) static FIB_EXTENSION: KindHandler = KindHandler {
    labels: &["start", "end", "retrace"],
    phases: &[],
    fill: false,
    handles: anchor_handles,
    build: extension,
    validate: None,
};

pub(super) static FIB_TIME_ZONES: KindHandler = KindHandler {
    labels: &["start", "unit"],
    phases: &[],
    fill: false,
    handles: anchor_handles,
    build: time_zones,
    validate: None,
};

/// Price of a retracement level: level 0 sits on `end`, level 1 on `start`.
pub fn retracement_price(start: f64, end: f64, level: f64) -> f64 {
    end + (start - end) * level
}

pub fn extension_price(start: f64, end: f64, retrace: f64, level: f64) -> f64 {
    retrace + (end - start) * level
}

fn level_lines(
    g: &mut Geometry,
    mapper: &CoordinateMapper,
    x0: f32,
    x1: f32,
    levels: impl Iterator<Item = (f64, f64)>,
) {
    for (level, price) in levels {
        let Some(y) = mapper.price_to_y(price) else {
            continue;
        };
        g.line(egui::pos2(x0, y), egui::pos2(x1, y));
        g.text(
            egui::pos2(x0 + 2.0, y - 16.0),
            format!("{level} ({})", price_text(price)),
        );
    }
}

fn retracement(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let [a, b] = project_all::<2>(mapper, &drawing.points)?;
    let (start, end) = (drawing.points[0].price, drawing.points[1].price);
    let mut g = Geometry::default();
    g.dashed(a, b);
    level_lines(
        &mut g,
        mapper,
        a.x.min(b.x),
        a.x.max(b.x),
        RETRACEMENT_LEVELS
            .iter()
            .map(|level| (*level, retracement_price(start, end, *level))),
    );
    Some(g)
}

fn extension(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let [a, b, c] = project_all::<3>(mapper, &drawing.points)?;
    let [start, end, retrace] = [
        drawing.points[0].price,
        drawing.points[1].price,
        drawing.points[2].price,
    ];
    let x1 = a.x.max(b.x).max(c.x);
    let mut g = Geometry::default();
    g.dashed(a, b);
    g.dashed(b, c);
    level_lines(
        &mut g,
        mapper,
        c.x.min(x1),
        x1.max(c.x + 1.0),
        EXTENSION_LEVELS
            .iter()
            .map(|level| (*level, extension_price(start, end, retrace, *level))),
    );
    Some(g)
}

fn time_zones(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let pane = mapper.pane()?;
    let t0 = drawing.points[0].time_ms;
    let unit = drawing.points[1].time_ms.checked_sub(t0)?;
    let mut g = Geometry::default();
    let mut last = None;
    for step in TIME_ZONE_STEPS {
        let Some(t) = unit.checked_mul(step).and_then(|d| t0.checked_add(d)) else {
            break;
        };
        if last == Some(t) {
            continue;
        }
        last = Some(t);
        let Some(x) = mapper.time_to_x(t) else {
            continue;
        };
        g.line(egui::pos2(x, 0.0), egui::pos2(x, pane.y));
        g.text(egui::pos2(x + 2.0, 2.0), step.to_string());
    }
    Some(g)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::LinearViewport;
    use crate::model::{AnchorPoint, DrawingKind, DrawingStyle};

    #[test]
    fn retracement_levels_run_from_end_to_start() {
        assert_eq!(retracement_price(100.0, 200.0, 0.0), 200.0);
        assert_eq!(retracement_price(100.0, 200.0, 1.0), 100.0);
        assert_eq!(retracement_price(100.0, 200.0, 0.5), 150.0);
    }

    #[test]
    fn time_zones_follow_fibonacci_steps() {
        let vp = LinearViewport::new(0, 10_000, 0.0, 100.0).with_size(1_000.0, 100.0);
        let mapper = CoordinateMapper::new(&vp);
        let d = Drawing::new(
            DrawingKind::FibTimeZones,
            vec![AnchorPoint::new(0, 50.0), AnchorPoint::new(100, 50.0)],
            DrawingStyle::default(),
        );
        let g = time_zones(&d, &mapper).unwrap();
        let xs: Vec<f32> = g.segments.iter().map(|s| s.a.x).collect();
        assert_eq!(xs[..5], [0.0, 10.0, 20.0, 30.0, 50.0]);
        assert_eq!(g.segments.len(), TIME_ZONE_STEPS.len());
    }

    #[test]
    fn zero_unit_time_zones_draw_one_line() {
        let vp = LinearViewport::new(0, 10_000, 0.0, 100.0).with_size(1_000.0, 100.0);
        let mapper = CoordinateMapper::new(&vp);
        let d = Drawing::new(
            DrawingKind::FibTimeZones,
            vec![AnchorPoint::new(500, 50.0), AnchorPoint::new(500, 60.0)],
            DrawingStyle::default(),
        );
        assert_eq!(time_zones(&d, &mapper).unwrap().segments.len(), 1);
    }
}
