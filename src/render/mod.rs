//! Turns the store, the interaction state and the indicator overlays into a
//! layered display list, painted at most once per frame.

mod scheduler;

pub use scheduler::{CanvasSize, FrameScheduler, FrameTicket, Reasons, RepaintReason};

use crate::coords::CoordinateMapper;
use crate::geometry::bands::{self, BarTimeline};
use crate::geometry::{self, Geometry, Handle};
use crate::interaction::InteractionController;
use crate::model::{BandFill, Drawing, DrawingStyle, LineSeries, LineStyle, Rgba};
use crate::store::DrawingStore;
use eframe::egui;
use tracing::trace;

pub const HANDLE_RADIUS: f32 = 5.0;
const WARNING_COLOR: Rgba = Rgba::rgb(242, 54, 69);
const SECONDARY_OPACITY: f32 = 0.6;

#[derive(Clone, Debug, PartialEq)]
pub enum PaintCmd {
    Polygon {
        points: Vec<egui::Pos2>,
        color: Rgba,
    },
    Line {
        a: egui::Pos2,
        b: egui::Pos2,
        color: Rgba,
        width: f32,
        dash: LineStyle,
    },
    Path {
        points: Vec<egui::Pos2>,
        color: Rgba,
        width: f32,
    },
    Text {
        pos: egui::Pos2,
        text: String,
        color: Rgba,
    },
    Handle {
        pos: egui::Pos2,
        radius: f32,
        active: bool,
        color: Rgba,
    },
}

/// Paint commands grouped by layer; painted fills, then lines, then handles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayList {
    pub fills: Vec<PaintCmd>,
    pub lines: Vec<PaintCmd>,
    pub handles: Vec<PaintCmd>,
}

impl DisplayList {
    pub fn iter(&self) -> impl Iterator<Item = &PaintCmd> {
        self.fills.iter().chain(&self.lines).chain(&self.handles)
    }

    pub fn len(&self) -> usize {
        self.fills.len() + self.lines.len() + self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push_geometry(&mut self, geometry: Geometry, style: &DrawingStyle) {
        let color = style.stroke_color();
        for fill in geometry.fills {
            self.fills.push(PaintCmd::Polygon {
                points: fill.points,
                color: fill.color,
            });
        }
        for seg in geometry.segments {
            let (color, width, dash) = if seg.secondary {
                (
                    color.with_opacity(style.opacity * SECONDARY_OPACITY),
                    (style.width * 0.5).max(1.0),
                    LineStyle::Dashed,
                )
            } else {
                (color, style.width, style.dash)
            };
            self.lines.push(PaintCmd::Line {
                a: seg.a,
                b: seg.b,
                color,
                width,
                dash,
            });
        }
        for mark in geometry.texts {
            self.lines.push(PaintCmd::Text {
                pos: mark.pos,
                text: mark.text,
                color,
            });
        }
    }

    fn push_handles(&mut self, handles: &[Handle], active: Option<usize>, color: Rgba) {
        for h in handles {
            self.handles.push(PaintCmd::Handle {
                pos: h.pos,
                radius: HANDLE_RADIUS,
                active: active == Some(h.index),
                color,
            });
        }
    }
}

/// An indicator line drawn under the drawings.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayLine {
    pub series: LineSeries,
    pub color: Rgba,
    pub width: f32,
}

/// Everything one paint reads.
pub struct Scene<'a> {
    pub store: &'a DrawingStore,
    pub controller: &'a InteractionController,
    pub mapper: CoordinateMapper<'a>,
    pub overlays: &'a [OverlayLine],
    pub bands: &'a [BandFill],
    pub timeline: BarTimeline<'a>,
}

/// The drawing as it should look this frame, with an in-flight handle drag applied.
fn effective<'d>(drawing: &'d Drawing, controller: &InteractionController) -> std::borrow::Cow<'d, Drawing> {
    match controller.edit_preview() {
        Some((id, index, point)) if id == drawing.id && index < drawing.points.len() => {
            let mut moved = drawing.clone();
            moved.points[index] = point;
            std::borrow::Cow::Owned(moved)
        }
        _ => std::borrow::Cow::Borrowed(drawing),
    }
}

pub fn build_display_list(scene: &Scene) -> DisplayList {
    let mapper = &scene.mapper;
    let mut list = DisplayList::default();
    if mapper.pane().is_none() {
        return list;
    }

    let series: Vec<&LineSeries> = scene.overlays.iter().map(|o| &o.series).collect();
    for polygon in bands::band_polygons(scene.bands, &series, scene.timeline, mapper) {
        for points in band_strips(&polygon.points) {
            list.fills.push(PaintCmd::Polygon {
                points,
                color: polygon.color,
            });
        }
    }

    for overlay in scene.overlays {
        for points in overlay_runs(&overlay.series, mapper) {
            list.lines.push(PaintCmd::Path {
                points,
                color: overlay.color,
                width: overlay.width,
            });
        }
    }

    for drawing in scene.store.sorted_by_z() {
        if drawing.hidden {
            continue;
        }
        let drawing = effective(drawing, scene.controller);
        let Some(geometry) = geometry::geometry_for(&drawing, mapper) else {
            continue;
        };
        list.push_geometry(geometry, &drawing.style);
        push_violations(&mut list, &drawing, mapper);
    }

    let style = scene.controller.options().style;
    if let Some(draft) = scene.controller.draft() {
        match draft
            .preview_drawing(style)
            .and_then(|d| geometry::geometry_for(&d, mapper))
        {
            Some(geometry) => list.push_geometry(geometry, &style),
            None => {
                let points: Vec<_> = draft
                    .points
                    .iter()
                    .chain(draft.hover.as_ref())
                    .filter_map(|p| mapper.to_screen(p.time_ms, p.price))
                    .collect();
                if points.len() >= 2 {
                    list.lines.push(PaintCmd::Path {
                        points,
                        color: style.stroke_color(),
                        width: style.width,
                    });
                }
            }
        }
        let handles: Vec<Handle> = draft
            .points
            .iter()
            .enumerate()
            .filter_map(|(index, p)| {
                Some(Handle {
                    label: "",
                    index,
                    pos: mapper.to_screen(p.time_ms, p.price)?,
                })
            })
            .collect();
        list.push_handles(&handles, None, style.color);
    }

    if let Some(selected) = scene.store.selected() {
        // Hidden selections keep their handles in the model but get none on screen.
        if !selected.hidden {
            let drawing = effective(selected, scene.controller);
            let handles = geometry::handles_for(&drawing, mapper);
            let active = scene
                .controller
                .editing_handle()
                .or(scene.controller.hovered_handle());
            list.push_handles(&handles, active, drawing.style.color);
        }
    }
    list
}

fn push_violations(list: &mut DisplayList, drawing: &Drawing, mapper: &CoordinateMapper) {
    let violations = geometry::violations_for(drawing);
    let Some(anchor) = drawing
        .points
        .last()
        .and_then(|p| mapper.to_screen(p.time_ms, p.price))
    else {
        return;
    };
    for (i, v) in violations.iter().enumerate() {
        list.lines.push(PaintCmd::Text {
            pos: anchor + egui::vec2(8.0, 8.0 + i as f32 * geometry::TEXT_SIZE * 1.2),
            text: format!("! {}", v.message),
            color: WARNING_COLOR,
        });
    }
}

/// Splits a band polygon (upper left to right, then lower right to left) into
/// one quad per bar so every painted polygon is convex.
fn band_strips(points: &[egui::Pos2]) -> Vec<Vec<egui::Pos2>> {
    let n = points.len() / 2;
    if n < 2 || points.len() % 2 != 0 {
        return vec![points.to_vec()];
    }
    let lower = |i: usize| points[points.len() - 1 - i];
    (0..n - 1)
        .map(|i| vec![points[i], points[i + 1], lower(i + 1), lower(i)])
        .collect()
}

/// Screen-space runs of an indicator line, broken where values are undefined
/// or cannot be placed.
fn overlay_runs(series: &LineSeries, mapper: &CoordinateMapper) -> Vec<Vec<egui::Pos2>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for v in &series.values {
        match v.value.and_then(|value| mapper.to_screen(v.time, value)) {
            Some(p) => current.push(p),
            None => {
                if current.len() >= 2 {
                    runs.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
        }
    }
    if current.len() >= 2 {
        runs.push(current);
    }
    runs
}

/// Owns the frame scheduler, the canvas and the last painted display list.
#[derive(Debug, Default)]
pub struct Renderer {
    scheduler: FrameScheduler,
    canvas: CanvasSize,
    display: DisplayList,
    frame: u64,
    paints: u64,
}

impl Renderer {
    pub fn new(canvas: CanvasSize) -> Self {
        let mut renderer = Self {
            canvas,
            ..Self::default()
        };
        renderer.request(RepaintReason::Resize);
        renderer
    }

    pub fn request(&mut self, reason: RepaintReason) {
        self.scheduler.request(reason);
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    /// Applies a new canvas size; a change schedules a paint.
    pub fn resize(&mut self, canvas: CanvasSize) -> bool {
        if canvas == self.canvas {
            return false;
        }
        self.canvas = canvas;
        self.request(RepaintReason::Resize);
        true
    }

    pub fn display_list(&self) -> &DisplayList {
        &self.display
    }

    pub fn paint_count(&self) -> u64 {
        self.paints
    }

    /// Advances one frame and rebuilds the display list if a paint is due.
    pub fn run_frame(&mut self, scene: &Scene) -> bool {
        self.frame += 1;
        let Some(ticket) = self.scheduler.begin_frame(self.frame) else {
            return false;
        };
        self.display = build_display_list(scene);
        self.paints += 1;
        trace!(frame = self.frame, ticket = ticket.id, reasons = ?ticket.reasons, commands = self.display.len(), "paint");
        true
    }
}
