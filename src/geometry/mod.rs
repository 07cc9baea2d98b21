//! Pixel-space geometry derived from drawings each paint.
//!
//! Every [`DrawingKind`] has a [`KindHandler`] in the handler table returned by
//! [`handler`]: anchor labels (hence point count), collection phases, fill
//! capability, a handle builder, a geometry builder and an optional rule
//! validator. Builders return `None` when the viewport cannot place the
//! drawing this frame; callers skip it.

use crate::coords::CoordinateMapper;
use crate::model::{AnchorPoint, Drawing, DrawingKind, Rgba};
use eframe::egui;

pub mod bands;
mod fib;
mod lines;
pub mod patterns;
mod pitchfork;
mod positions;
mod shapes;

pub use patterns::{Direction, PatternAnalysis, Rule, RuleViolation};
pub use positions::risk_reward;

/// Approximate caption metrics used for hit testing captions.
pub const TEXT_SIZE: f32 = 12.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Handle {
    pub label: &'static str,
    pub index: usize,
    pub pos: egui::Pos2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub a: egui::Pos2,
    pub b: egui::Pos2,
    /// Construction lines (connectors, midlines, necklines) drawn dashed and fainter.
    pub secondary: bool,
}

impl Segment {
    pub fn new(a: egui::Pos2, b: egui::Pos2) -> Self {
        Self {
            a,
            b,
            secondary: false,
        }
    }

    pub fn secondary(a: egui::Pos2, b: egui::Pos2) -> Self {
        Self {
            a,
            b,
            secondary: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FillPolygon {
    pub points: Vec<egui::Pos2>,
    pub color: Rgba,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextMark {
    /// Left-top corner of the caption.
    pub pos: egui::Pos2,
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub segments: Vec<Segment>,
    pub fills: Vec<FillPolygon>,
    pub texts: Vec<TextMark>,
}

impl Geometry {
    fn line(&mut self, a: egui::Pos2, b: egui::Pos2) {
        self.segments.push(Segment::new(a, b));
    }

    fn dashed(&mut self, a: egui::Pos2, b: egui::Pos2) {
        self.segments.push(Segment::secondary(a, b));
    }

    fn polyline(&mut self, points: &[egui::Pos2]) {
        for pair in points.windows(2) {
            self.line(pair[0], pair[1]);
        }
    }

    fn closed(&mut self, points: &[egui::Pos2]) {
        self.polyline(points);
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            if points.len() > 2 {
                self.line(*last, *first);
            }
        }
    }

    fn fill(&mut self, points: Vec<egui::Pos2>, color: Option<Rgba>) {
        if let Some(color) = color {
            if points.len() >= 3 {
                self.fills.push(FillPolygon { points, color });
            }
        }
    }

    fn text(&mut self, pos: egui::Pos2, text: impl Into<String>) {
        self.texts.push(TextMark {
            pos,
            text: text.into(),
        });
    }
}

pub type HandleFn = fn(&Drawing, &CoordinateMapper) -> Vec<Handle>;
pub type BuildFn = fn(&Drawing, &CoordinateMapper) -> Option<Geometry>;
pub type ValidateFn = fn(&[AnchorPoint]) -> Vec<RuleViolation>;

pub struct KindHandler {
    pub labels: &'static [&'static str],
    /// Point counts of nested collection phases; empty means one phase.
    pub phases: &'static [usize],
    pub fill: bool,
    pub handles: HandleFn,
    pub build: BuildFn,
    pub validate: Option<ValidateFn>,
}

impl KindHandler {
    /// Zero-based phase that the next collected point belongs to.
    pub fn phase_for(&self, collected: usize) -> usize {
        let mut end = 0;
        for (i, len) in self.phases.iter().enumerate() {
            end += len;
            if collected < end {
                return i;
            }
        }
        self.phases.len().saturating_sub(1)
    }
}

pub fn handler(kind: DrawingKind) -> &'static KindHandler {
    match kind {
        DrawingKind::HorizontalLine => &lines::HORIZONTAL_LINE,
        DrawingKind::HorizontalRay => &lines::HORIZONTAL_RAY,
        DrawingKind::VerticalLine => &lines::VERTICAL_LINE,
        DrawingKind::CrossLine => &lines::CROSS_LINE,
        DrawingKind::TrendLine => &lines::TREND_LINE,
        DrawingKind::Ray => &lines::RAY,
        DrawingKind::ExtendedLine => &lines::EXTENDED_LINE,
        DrawingKind::Channel => &lines::CHANNEL,
        DrawingKind::ParallelChannel => &lines::PARALLEL_CHANNEL,
        DrawingKind::Rectangle => &shapes::RECTANGLE,
        DrawingKind::Ellipse => &shapes::ELLIPSE,
        DrawingKind::Triangle => &shapes::TRIANGLE,
        DrawingKind::Text => &shapes::TEXT,
        DrawingKind::Callout => &shapes::CALLOUT,
        DrawingKind::PriceRange => &shapes::PRICE_RANGE,
        DrawingKind::FibRetracement => &fib::FIB_RETRACEMENT,
        DrawingKind::FibExtension => &fib::FIB_EXTENSION,
        DrawingKind::FibTimeZones => &fib::FIB_TIME_ZONES,
        DrawingKind::Pitchfork => &pitchfork::PITCHFORK,
        DrawingKind::SchiffPitchfork => &pitchfork::SCHIFF_PITCHFORK,
        DrawingKind::ModifiedSchiffPitchfork => &pitchfork::MODIFIED_SCHIFF_PITCHFORK,
        DrawingKind::ElliottWave => &patterns::ELLIOTT_WAVE,
        DrawingKind::HeadAndShoulders => &patterns::HEAD_AND_SHOULDERS,
        DrawingKind::LongPosition => &positions::LONG_POSITION,
        DrawingKind::ShortPosition => &positions::SHORT_POSITION,
    }
}

/// Handles for every anchor the viewport can currently place.
pub fn handles_for(drawing: &Drawing, mapper: &CoordinateMapper) -> Vec<Handle> {
    if drawing.points.len() != drawing.kind.point_count() {
        return Vec::new();
    }
    (handler(drawing.kind).handles)(drawing, mapper)
}

pub fn geometry_for(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    if !drawing.is_well_formed() {
        return None;
    }
    (handler(drawing.kind).build)(drawing, mapper)
}

pub fn violations_for(drawing: &Drawing) -> Vec<RuleViolation> {
    match handler(drawing.kind).validate {
        Some(validate) if drawing.is_well_formed() => validate(&drawing.points),
        _ => Vec::new(),
    }
}

pub(crate) fn anchor_handles(drawing: &Drawing, mapper: &CoordinateMapper) -> Vec<Handle> {
    let labels = handler(drawing.kind).labels;
    drawing
        .points
        .iter()
        .zip(labels)
        .enumerate()
        .filter_map(|(index, (p, label))| {
            Some(Handle {
                label: *label,
                index,
                pos: project(mapper, *p)?,
            })
        })
        .collect()
}

pub(crate) fn project(mapper: &CoordinateMapper, p: AnchorPoint) -> Option<egui::Pos2> {
    mapper.to_screen(p.time_ms, p.price)
}

/// Projects every point or none.
pub(crate) fn project_all<const N: usize>(
    mapper: &CoordinateMapper,
    points: &[AnchorPoint],
) -> Option<[egui::Pos2; N]> {
    if points.len() != N {
        return None;
    }
    let mut out = [egui::Pos2::ZERO; N];
    for (slot, p) in out.iter_mut().zip(points) {
        *slot = project(mapper, *p)?;
    }
    Some(out)
}

pub(crate) fn pane_rect(mapper: &CoordinateMapper) -> Option<egui::Rect> {
    mapper
        .pane()
        .map(|size| egui::Rect::from_min_size(egui::Pos2::ZERO, size))
}

pub(crate) fn price_text(price: f64) -> String {
    format!("{price:.2}")
}

/// Clips the line through `a` and `b` to `bounds`. With `both_ways` false the
/// line is a ray starting at `a`.
pub(crate) fn extend_line(
    a: egui::Pos2,
    b: egui::Pos2,
    bounds: egui::Rect,
    both_ways: bool,
) -> Option<(egui::Pos2, egui::Pos2)> {
    let d = b - a;
    let start = if both_ways { f32::NEG_INFINITY } else { 0.0 };
    let (t0, t1) = clip_range(a, d, bounds, start, f32::INFINITY)?;
    if !t0.is_finite() || !t1.is_finite() {
        return None;
    }
    Some((a + d * t0, a + d * t1))
}

/// The part of segment `a`-`b` inside `bounds`, as parameters along it
/// (`0` is `a`, `1` is `b`).
pub fn clip_segment(a: egui::Pos2, b: egui::Pos2, bounds: egui::Rect) -> Option<(f32, f32)> {
    clip_range(a, b - a, bounds, 0.0, 1.0).filter(|(t0, t1)| t0 < t1)
}

/// Liang-Barsky narrowing of `[t0, t1]` along `a + d * t`.
fn clip_range(
    a: egui::Pos2,
    d: egui::Vec2,
    bounds: egui::Rect,
    mut t0: f32,
    mut t1: f32,
) -> Option<(f32, f32)> {
    if d.length_sq() <= f32::EPSILON {
        return None;
    }
    let checks = [
        (-d.x, a.x - bounds.min.x),
        (d.x, bounds.max.x - a.x),
        (-d.y, a.y - bounds.min.y),
        (d.y, bounds.max.y - a.y),
    ];
    for (p, q) in checks {
        if p.abs() <= f32::EPSILON {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    Some((t0, t1))
}

pub fn distance_to_segment(p: egui::Pos2, a: egui::Pos2, b: egui::Pos2) -> f32 {
    let ab = b - a;
    let ap = p - a;
    let ab_len2 = ab.x * ab.x + ab.y * ab.y;
    if ab_len2 <= f32::EPSILON {
        return (p - a).length();
    }
    let t = (ap.x * ab.x + ap.y * ab.y) / ab_len2;
    let t = t.clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p - closest).length()
}

pub fn polygon_contains(points: &[egui::Pos2], p: egui::Pos2) -> bool {
    if points.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (pi, pj) = (points[i], points[j]);
        if (pi.y > p.y) != (pj.y > p.y) {
            let x = pj.x + (p.y - pj.y) / (pi.y - pj.y) * (pi.x - pj.x);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

pub fn text_bounds(mark: &TextMark) -> egui::Rect {
    let w = (mark.text.chars().count() as f32).max(1.0) * TEXT_SIZE * 0.6;
    let h = TEXT_SIZE * 1.2;
    egui::Rect::from_min_size(mark.pos, egui::vec2(w, h))
}

pub fn hit_test(geometry: &Geometry, p: egui::Pos2, tolerance: f32) -> bool {
    geometry
        .segments
        .iter()
        .any(|s| distance_to_segment(p, s.a, s.b) <= tolerance)
        || geometry.fills.iter().any(|f| polygon_contains(&f.points, p))
        || geometry
            .texts
            .iter()
            .any(|t| text_bounds(t).expand(tolerance).contains(p))
}

/// Nearest handle within `radius` of `p`.
pub fn hit_handle(handles: &[Handle], p: egui::Pos2, radius: f32) -> Option<Handle> {
    handles
        .iter()
        .map(|h| (h, (h.pos - p).length()))
        .filter(|(_, d)| *d <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(h, _)| *h)
}
