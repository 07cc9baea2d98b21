//! Pointer and keyboard state machine for creating and editing drawings.
//!
//! ```text
//! Idle ──hotkey/tool──▶ ToolArmed ──click──▶ Collecting ──last click──▶ (commit) ─▶ Idle
//!  │                        │                    │
//!  │                        └──────Escape────────┴──────────────▶ Idle
//!  └──pointer-down on handle──▶ HandleEditing ──pointer-up──▶ (commit) ─▶ Idle
//! ```
//!
//! `Collecting` and `HandleEditing` own a [`CaptureGuard`]; leaving those
//! states by any path drops the guard and releases input capture.

use crate::coords::CoordinateMapper;
use crate::geometry::{self, Handle};
use crate::model::{AnchorPoint, Drawing, DrawingKind, DrawingStyle, Rgba};
use crate::store::DrawingStore;
use eframe::egui;
use std::cell::Cell;
use std::rc::Rc;
use tracing::debug;

/// Single-letter tool hotkeys.
pub const TOOL_HOTKEYS: &[(egui::Key, DrawingKind)] = &[
    (egui::Key::H, DrawingKind::HorizontalLine),
    (egui::Key::V, DrawingKind::VerticalLine),
    (egui::Key::T, DrawingKind::TrendLine),
    (egui::Key::Y, DrawingKind::Ray),
    (egui::Key::X, DrawingKind::ExtendedLine),
    (egui::Key::C, DrawingKind::Channel),
    (egui::Key::R, DrawingKind::Rectangle),
    (egui::Key::E, DrawingKind::Ellipse),
    (egui::Key::N, DrawingKind::Text),
    (egui::Key::F, DrawingKind::FibRetracement),
    (egui::Key::P, DrawingKind::Pitchfork),
    (egui::Key::Q, DrawingKind::HeadAndShoulders),
    (egui::Key::Z, DrawingKind::ElliottWave),
    (egui::Key::L, DrawingKind::LongPosition),
    (egui::Key::S, DrawingKind::ShortPosition),
];

pub fn tool_for_key(key: egui::Key) -> Option<DrawingKind> {
    TOOL_HOTKEYS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, kind)| *kind)
}

/// Exclusive routing of pointer and keyboard input. At most one guard exists
/// at a time.
#[derive(Clone, Debug, Default)]
pub struct InputCapture {
    held: Rc<Cell<bool>>,
}

impl InputCapture {
    pub fn try_acquire(&self) -> Option<CaptureGuard> {
        if self.held.get() {
            return None;
        }
        self.held.set(true);
        Some(CaptureGuard {
            held: Rc::clone(&self.held),
        })
    }

    pub fn is_held(&self) -> bool {
        self.held.get()
    }
}

#[derive(Debug)]
pub struct CaptureGuard {
    held: Rc<Cell<bool>>,
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.held.set(false);
    }
}

#[derive(Debug)]
pub enum InteractionState {
    Idle,
    ToolArmed(DrawingKind),
    Collecting {
        kind: DrawingKind,
        points: Vec<AnchorPoint>,
        hover: Option<AnchorPoint>,
        _capture: CaptureGuard,
    },
    HandleEditing {
        drawing_id: String,
        handle: &'static str,
        index: usize,
        preview: Option<AnchorPoint>,
        _capture: CaptureGuard,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    /// A toolbar control picked a tool.
    ArmTool(DrawingKind),
    /// A toolbar control picked the selection tool.
    Cancel,
    Key {
        key: egui::Key,
        modifiers: egui::Modifiers,
        /// A text-entry control currently owns the keyboard.
        text_focus: bool,
    },
    PointerDown(egui::Pos2),
    PointerMove(egui::Pos2),
    PointerUp(egui::Pos2),
    /// The window lost focus.
    FocusLost,
}

/// What a handled event did, so the host can schedule paints.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outcome {
    pub repaint: bool,
    /// Only pointer feedback moved (hovered handle, draft rubber band).
    pub hover: bool,
    /// The store was mutated (persisted fields).
    pub changed: bool,
    pub committed: Option<String>,
    pub removed: Option<String>,
}

impl Outcome {
    fn repaint() -> Self {
        Self {
            repaint: true,
            ..Self::default()
        }
    }

    fn hover() -> Self {
        Self {
            repaint: true,
            hover: true,
            ..Self::default()
        }
    }

    fn changed() -> Self {
        Self {
            repaint: true,
            changed: true,
            ..Self::default()
        }
    }
}

/// An in-progress creation, for preview rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct Draft {
    pub kind: DrawingKind,
    pub points: Vec<AnchorPoint>,
    pub hover: Option<AnchorPoint>,
    pub phase: usize,
}

impl Draft {
    /// Collected points plus the hover point, when that completes the kind.
    pub fn preview_drawing(&self, style: DrawingStyle) -> Option<Drawing> {
        let mut points = self.points.clone();
        points.push(self.hover?);
        (points.len() == self.kind.point_count()).then(|| Drawing::new(self.kind, points, style))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InteractionOptions {
    pub handle_radius: f32,
    pub hit_tolerance: f32,
    pub style: DrawingStyle,
    pub fill: Option<(Rgba, f32)>,
}

impl Default for InteractionOptions {
    fn default() -> Self {
        Self {
            handle_radius: 8.0,
            hit_tolerance: 6.0,
            style: DrawingStyle::default(),
            fill: Some((Rgba::rgb(41, 98, 255), 0.15)),
        }
    }
}

#[derive(Debug)]
pub struct InteractionController {
    state: InteractionState,
    capture: InputCapture,
    options: InteractionOptions,
    hovered_handle: Option<usize>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(InteractionOptions::default())
    }
}

impl InteractionController {
    pub fn new(options: InteractionOptions) -> Self {
        Self {
            state: InteractionState::Idle,
            capture: InputCapture::default(),
            options,
            hovered_handle: None,
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn options(&self) -> &InteractionOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: InteractionOptions) {
        self.options = options;
    }

    pub fn capture(&self) -> &InputCapture {
        &self.capture
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, InteractionState::Idle)
    }

    /// Runs a store edit that did not come through [`Self::handle`], such as
    /// an inspector control. Refused while a draft or handle drag holds the
    /// input capture.
    pub fn edit_store<R>(
        &self,
        store: &mut DrawingStore,
        edit: impl FnOnce(&mut DrawingStore) -> R,
    ) -> Option<R> {
        if self.capture.is_held() {
            debug!("store edit refused while input is captured");
            return None;
        }
        Some(edit(store))
    }

    /// The armed or collecting tool; `None` means the select tool.
    pub fn active_tool(&self) -> Option<DrawingKind> {
        match &self.state {
            InteractionState::ToolArmed(kind) | InteractionState::Collecting { kind, .. } => {
                Some(*kind)
            }
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<Draft> {
        match &self.state {
            InteractionState::Collecting {
                kind,
                points,
                hover,
                ..
            } => Some(Draft {
                kind: *kind,
                points: points.clone(),
                hover: *hover,
                phase: geometry::handler(*kind).phase_for(points.len()),
            }),
            _ => None,
        }
    }

    /// Uncommitted anchor position of a handle drag.
    pub fn edit_preview(&self) -> Option<(&str, usize, AnchorPoint)> {
        match &self.state {
            InteractionState::HandleEditing {
                drawing_id,
                index,
                preview: Some(p),
                ..
            } => Some((drawing_id.as_str(), *index, *p)),
            _ => None,
        }
    }

    pub fn editing_handle(&self) -> Option<usize> {
        match &self.state {
            InteractionState::HandleEditing { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn hovered_handle(&self) -> Option<usize> {
        self.hovered_handle
    }

    pub fn status(&self) -> String {
        match &self.state {
            InteractionState::Idle => "Select".to_string(),
            InteractionState::ToolArmed(kind) => {
                let handler = geometry::handler(*kind);
                format!(
                    "{}: click {} (1/{})",
                    kind.display_name(),
                    handler.labels.first().copied().unwrap_or(""),
                    handler.labels.len()
                )
            }
            InteractionState::Collecting { kind, points, .. } => {
                let handler = geometry::handler(*kind);
                let next = handler.labels.get(points.len()).copied().unwrap_or("");
                let phase = if handler.phases.len() > 1 {
                    format!(" [line {}]", handler.phase_for(points.len()) + 1)
                } else {
                    String::new()
                };
                format!(
                    "{}{}: click {} ({}/{})",
                    kind.display_name(),
                    phase,
                    next,
                    points.len() + 1,
                    handler.labels.len()
                )
            }
            InteractionState::HandleEditing { handle, .. } => format!("Dragging {handle}"),
        }
    }

    pub fn handle(
        &mut self,
        event: InputEvent,
        store: &mut DrawingStore,
        mapper: &CoordinateMapper,
    ) -> Outcome {
        match event {
            InputEvent::ArmTool(kind) => self.arm(kind),
            InputEvent::Cancel => self.cancel(),
            InputEvent::Key {
                key,
                modifiers,
                text_focus,
            } => {
                if text_focus {
                    return Outcome::default();
                }
                self.key(key, modifiers, store)
            }
            InputEvent::PointerDown(pos) => self.pointer_down(pos, store, mapper),
            InputEvent::PointerMove(pos) => self.pointer_move(pos, store, mapper),
            InputEvent::PointerUp(_) => self.pointer_up(store),
            InputEvent::FocusLost => match self.state {
                InteractionState::Collecting { .. } | InteractionState::HandleEditing { .. } => {
                    debug!("focus lost, abandoning interaction");
                    self.cancel()
                }
                _ => Outcome::default(),
            },
        }
    }

    fn arm(&mut self, kind: DrawingKind) -> Outcome {
        match self.state {
            InteractionState::Idle | InteractionState::ToolArmed(_) => {
                debug!(?kind, "tool armed");
                self.state = InteractionState::ToolArmed(kind);
                self.hovered_handle = None;
                Outcome::repaint()
            }
            _ => Outcome::default(),
        }
    }

    /// Drops any draft or drag without touching the store.
    fn cancel(&mut self) -> Outcome {
        if self.is_idle() {
            return Outcome::default();
        }
        debug!(status = %self.status(), "interaction cancelled");
        self.state = InteractionState::Idle;
        Outcome::repaint()
    }

    fn key(&mut self, key: egui::Key, modifiers: egui::Modifiers, store: &mut DrawingStore) -> Outcome {
        if key == egui::Key::Escape {
            if self.is_idle() {
                if store.selected().is_some() {
                    store.select(None);
                    return Outcome::repaint();
                }
                return Outcome::default();
            }
            return self.cancel();
        }

        // Only the select and armed states take commands; collecting and
        // dragging own the keyboard until they finish.
        if !matches!(
            self.state,
            InteractionState::Idle | InteractionState::ToolArmed(_)
        ) {
            return Outcome::default();
        }

        if matches!(key, egui::Key::Delete | egui::Key::Backspace) && modifiers.is_none() {
            let Some(id) = store.selected_id() else {
                return Outcome::default();
            };
            store.remove(&id);
            self.state = InteractionState::Idle;
            return Outcome {
                removed: Some(id),
                ..Outcome::changed()
            };
        }

        if modifiers.matches_exact(egui::Modifiers::SHIFT) {
            let Some(id) = store.selected_id() else {
                return Outcome::default();
            };
            return match key {
                egui::Key::L => {
                    store.toggle_locked(&id);
                    Outcome::changed()
                }
                egui::Key::H => {
                    store.toggle_hidden(&id);
                    Outcome::changed()
                }
                _ => Outcome::default(),
            };
        }

        if modifiers.is_none() {
            if let Some(kind) = tool_for_key(key) {
                return self.arm(kind);
            }
        }
        Outcome::default()
    }

    fn pointer_down(
        &mut self,
        pos: egui::Pos2,
        store: &mut DrawingStore,
        mapper: &CoordinateMapper,
    ) -> Outcome {
        match &mut self.state {
            InteractionState::Idle => self.press_idle(pos, store, mapper),
            InteractionState::ToolArmed(kind) => {
                let kind = *kind;
                let Some(point) = mapper.to_domain(pos) else {
                    return Outcome::default();
                };
                if kind.point_count() == 1 {
                    return self.commit(kind, vec![point], store);
                }
                let Some(capture) = self.capture.try_acquire() else {
                    return Outcome::default();
                };
                debug!(?kind, "collecting points");
                self.state = InteractionState::Collecting {
                    kind,
                    points: vec![point],
                    hover: Some(point),
                    _capture: capture,
                };
                Outcome::repaint()
            }
            InteractionState::Collecting { kind, points, .. } => {
                let Some(point) = mapper.to_domain(pos) else {
                    return Outcome::default();
                };
                points.push(point);
                if points.len() < kind.point_count() {
                    return Outcome::repaint();
                }
                let kind = *kind;
                let points = std::mem::take(points);
                self.commit(kind, points, store)
            }
            InteractionState::HandleEditing { .. } => Outcome::default(),
        }
    }

    fn press_idle(
        &mut self,
        pos: egui::Pos2,
        store: &mut DrawingStore,
        mapper: &CoordinateMapper,
    ) -> Outcome {
        if let Some(selected) = store.selected() {
            if !selected.locked && !selected.hidden {
                let handles = geometry::handles_for(selected, mapper);
                if let Some(handle) = geometry::hit_handle(&handles, pos, self.options.handle_radius) {
                    return self.begin_edit(selected.id.clone(), handle);
                }
            }
        }

        let hit = topmost_hit(store, mapper, pos, self.options.hit_tolerance);
        let current = store.selected_id();
        if hit == current {
            return Outcome::default();
        }
        store.select(hit.as_deref());
        Outcome::repaint()
    }

    fn begin_edit(&mut self, drawing_id: String, handle: Handle) -> Outcome {
        let Some(capture) = self.capture.try_acquire() else {
            return Outcome::default();
        };
        debug!(%drawing_id, handle = handle.label, "handle drag started");
        self.state = InteractionState::HandleEditing {
            drawing_id,
            handle: handle.label,
            index: handle.index,
            preview: None,
            _capture: capture,
        };
        Outcome::repaint()
    }

    fn pointer_move(
        &mut self,
        pos: egui::Pos2,
        store: &mut DrawingStore,
        mapper: &CoordinateMapper,
    ) -> Outcome {
        match &mut self.state {
            InteractionState::Idle => {
                let hovered = store
                    .selected()
                    .filter(|d| !d.hidden)
                    .and_then(|d| {
                        geometry::hit_handle(
                            &geometry::handles_for(d, mapper),
                            pos,
                            self.options.handle_radius,
                        )
                    })
                    .map(|h| h.index);
                if hovered == self.hovered_handle {
                    return Outcome::default();
                }
                self.hovered_handle = hovered;
                Outcome::hover()
            }
            InteractionState::ToolArmed(_) => Outcome::default(),
            InteractionState::Collecting { hover, .. } => {
                let next = mapper.to_domain(pos);
                if next.is_none() || *hover == next {
                    return Outcome::default();
                }
                *hover = next;
                Outcome::hover()
            }
            InteractionState::HandleEditing {
                drawing_id,
                index,
                preview,
                ..
            } => {
                let Some(drawing) = store.get(drawing_id) else {
                    self.state = InteractionState::Idle;
                    return Outcome::repaint();
                };
                let Some(original) = drawing.points.get(*index).copied() else {
                    return Outcome::default();
                };
                let time = mapper.x_to_time(pos.x);
                let price = mapper.y_to_price(pos.y);
                if time.is_none() && price.is_none() {
                    return Outcome::default();
                }
                let mut next = AnchorPoint::new(
                    time.unwrap_or(original.time_ms),
                    price.unwrap_or(original.price),
                );
                match drawing.kind {
                    DrawingKind::HorizontalLine => next.time_ms = original.time_ms,
                    DrawingKind::VerticalLine => next.price = original.price,
                    _ => {}
                }
                *preview = Some(next);
                Outcome::repaint()
            }
        }
    }

    fn pointer_up(&mut self, store: &mut DrawingStore) -> Outcome {
        let InteractionState::HandleEditing {
            drawing_id,
            index,
            preview,
            ..
        } = &self.state
        else {
            return Outcome::default();
        };
        let outcome = match preview {
            Some(point) if store.get(drawing_id).is_some() => {
                store.set_point(drawing_id, *index, *point);
                debug!(%drawing_id, index, "handle drag committed");
                Outcome::changed()
            }
            _ => Outcome::repaint(),
        };
        self.state = InteractionState::Idle;
        outcome
    }

    fn commit(&mut self, kind: DrawingKind, points: Vec<AnchorPoint>, store: &mut DrawingStore) -> Outcome {
        let mut drawing = Drawing::new(kind, points, self.options.style);
        if let (true, Some((color, opacity))) = (kind.has_fill(), self.options.fill) {
            drawing = drawing.with_fill(color, opacity);
        }
        self.state = InteractionState::Idle;
        match store.add(drawing) {
            Some(id) => {
                debug!(%id, ?kind, "drawing committed");
                Outcome {
                    committed: Some(id),
                    ..Outcome::changed()
                }
            }
            None => Outcome::repaint(),
        }
    }
}

/// Topmost visible drawing under `pos`, by z.
pub fn topmost_hit(
    store: &DrawingStore,
    mapper: &CoordinateMapper,
    pos: egui::Pos2,
    tolerance: f32,
) -> Option<String> {
    store
        .sorted_by_z()
        .into_iter()
        .rev()
        .filter(|d| !d.hidden)
        .find(|d| {
            geometry::geometry_for(d, mapper)
                .is_some_and(|g| geometry::hit_test(&g, pos, tolerance))
        })
        .map(|d| d.id.clone())
}
