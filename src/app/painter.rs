use crate::geometry;
use crate::model::LineStyle;
use crate::render::{DisplayList, PaintCmd};
use eframe::egui;

/// Paints a display list whose coordinates are relative to `origin`.
pub(super) fn paint_display_list(painter: &egui::Painter, origin: egui::Pos2, list: &DisplayList) {
    let at = |p: egui::Pos2| origin + p.to_vec2();
    for cmd in list.iter() {
        match cmd {
            PaintCmd::Polygon { points, color } => {
                painter.add(egui::Shape::convex_polygon(
                    points.iter().map(|p| at(*p)).collect(),
                    color.to_color32(),
                    egui::Stroke::NONE,
                ));
            }
            PaintCmd::Line {
                a,
                b,
                color,
                width,
                dash,
            } => {
                let stroke = egui::Stroke::new(*width, color.to_color32());
                draw_styled_line(painter, at(*a), at(*b), stroke, *dash);
            }
            PaintCmd::Path {
                points,
                color,
                width,
            } => {
                painter.add(egui::Shape::line(
                    points.iter().map(|p| at(*p)).collect(),
                    egui::Stroke::new(*width, color.to_color32()),
                ));
            }
            PaintCmd::Text { pos, text, color } => {
                painter.text(
                    at(*pos),
                    egui::Align2::LEFT_TOP,
                    text,
                    egui::FontId::proportional(geometry::TEXT_SIZE),
                    color.to_color32(),
                );
            }
            PaintCmd::Handle {
                pos,
                radius,
                active,
                color,
            } => {
                let color = color.to_color32();
                let fill = if *active { color } else { egui::Color32::WHITE };
                painter.circle(at(*pos), *radius, fill, egui::Stroke::new(1.5, color));
            }
        }
    }
}

fn draw_styled_line(
    painter: &egui::Painter,
    a: egui::Pos2,
    b: egui::Pos2,
    stroke: egui::Stroke,
    line_style: LineStyle,
) {
    let bounds = painter.clip_rect().expand(stroke.width);
    match line_style {
        LineStyle::Solid => {
            if let Some((t0, t1)) = geometry::clip_segment(a, b, bounds) {
                painter.line_segment([a.lerp(b, t0), a.lerp(b, t1)], stroke);
            }
        }
        LineStyle::Dashed => draw_dashed_line(painter, a, b, stroke, 10.0, 5.0),
        LineStyle::Dotted => draw_dashed_line(painter, a, b, stroke, 2.0, 4.0),
    }
}

fn draw_dashed_line(
    painter: &egui::Painter,
    a: egui::Pos2,
    b: egui::Pos2,
    stroke: egui::Stroke,
    dash_len: f32,
    gap_len: f32,
) {
    let bounds = painter.clip_rect().expand(stroke.width);
    for dash in visible_dashes(a, b, bounds, dash_len, gap_len) {
        painter.line_segment(dash, stroke);
    }
}

/// Dashes of `a`-`b` that touch `bounds`. The pattern stays anchored at `a`
/// so scrolling does not make it crawl.
fn visible_dashes(
    a: egui::Pos2,
    b: egui::Pos2,
    bounds: egui::Rect,
    dash_len: f32,
    gap_len: f32,
) -> Vec<[egui::Pos2; 2]> {
    let v = b - a;
    let len = v.length();
    let period = dash_len + gap_len;
    if len <= f32::EPSILON || period <= 0.0 {
        return Vec::new();
    }
    let Some((t0, t1)) = geometry::clip_segment(a, b, bounds) else {
        return Vec::new();
    };
    let dir = v / len;
    let end = t1 * len;
    let mut pos = (t0 * len / period).floor() * period;
    let mut out = Vec::new();
    while pos < end {
        out.push([a + dir * pos, a + dir * (pos + dash_len).min(len)]);
        pos += period;
    }
    out
}

/// Price labels on the right edge and a crosshair under the pointer.
pub(super) fn paint_crosshair(
    painter: &egui::Painter,
    rect: egui::Rect,
    pointer: egui::Pos2,
    caption: &str,
) {
    let stroke = egui::Stroke::new(1.0, egui::Color32::from_gray(110));
    draw_dashed_line(
        painter,
        egui::pos2(rect.left(), pointer.y),
        egui::pos2(rect.right(), pointer.y),
        stroke,
        2.0,
        4.0,
    );
    draw_dashed_line(
        painter,
        egui::pos2(pointer.x, rect.top()),
        egui::pos2(pointer.x, rect.bottom()),
        stroke,
        2.0,
        4.0,
    );
    painter.text(
        egui::pos2(rect.right() - 4.0, pointer.y - 2.0),
        egui::Align2::RIGHT_BOTTOM,
        caption,
        egui::FontId::monospace(11.0),
        egui::Color32::from_gray(200),
    );
}
