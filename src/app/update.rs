use crate::coords::CoordinateMapper;
use crate::geometry::bands::BarTimeline;
use crate::interaction::InputEvent;
use crate::model::ChartKey;
use crate::persist::SyncEvent;
use crate::render::{CanvasSize, RepaintReason, Scene};
use eframe::egui;
use std::time::Instant;

use super::ChartApp;
use super::help::draw_help_window;
use super::painter::{paint_crosshair, paint_display_list};

impl eframe::App for ChartApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let text_focus = ctx.wants_keyboard_input();
        let events: Vec<egui::Event> = ctx.input(|i| i.events.clone());
        for event in &events {
            match event {
                egui::Event::Key {
                    key: egui::Key::F1,
                    pressed: true,
                    ..
                } => self.show_help = true,
                egui::Event::Key {
                    key,
                    pressed: true,
                    modifiers,
                    ..
                } => {
                    let mapper = CoordinateMapper::new(&self.viewport);
                    let outcome = self.controller.handle(
                        InputEvent::Key {
                            key: *key,
                            modifiers: *modifiers,
                            text_focus,
                        },
                        &mut self.store,
                        &mapper,
                    );
                    self.absorb(&outcome);
                }
                egui::Event::WindowFocused(false) => {
                    let mapper = CoordinateMapper::new(&self.viewport);
                    let outcome =
                        self.controller
                            .handle(InputEvent::FocusLost, &mut self.store, &mapper);
                    self.absorb(&outcome);
                    self.pointer_down = false;
                }
                _ => {}
            }
        }

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Symbol:");
                ui.add(egui::TextEdit::singleline(&mut self.symbol_input).desired_width(90.0));
                ui.label("Timeframe:");
                ui.add(egui::TextEdit::singleline(&mut self.timeframe_input).desired_width(50.0));
                if ui.button("Open").clicked() {
                    let symbol = self.symbol_input.trim().to_string();
                    let timeframe = self.timeframe_input.trim().to_string();
                    if !symbol.is_empty() && !timeframe.is_empty() {
                        self.open_chart(ChartKey::new(symbol, timeframe));
                        self.persist_settings();
                    }
                }
                ui.separator();
                if ui.button("Fit").clicked() {
                    self.fit();
                }
                if ui.button("Help (F1)").clicked() {
                    self.show_help = true;
                }
            });
        });

        egui::SidePanel::right("right_panel")
            .default_width(280.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.tools_ui(ui);
                    ui.separator();
                    self.selection_ui(ui);
                    ui.separator();
                    self.drawings_ui(ui);
                    ui.separator();
                    ui.collapsing("Settings", |ui| self.settings_ui(ui));
                });
            });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(self.controller.status());
                if let Some(status) = &self.status {
                    ui.separator();
                    ui.label(status);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    match self.sync.key() {
                        Some(key) => ui.label(key.to_string()),
                        None => ui.label("not saving"),
                    };
                    ui.separator();
                    if let Some(err) = self.sync.last_error() {
                        ui.colored_label(egui::Color32::from_rgb(242, 54, 69), err);
                    } else if self.sync.is_dirty() {
                        ui.label("Unsaved");
                    } else {
                        ui.label("Saved");
                    }
                    ui.separator();
                    ui.label(format!("Drawings: {}", self.store.len()));
                });
            });
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.chart_ui(ctx, ui));

        if self.show_help {
            let mut open = self.show_help;
            draw_help_window(ctx, &mut open);
            self.show_help = open;
        }

        match self.sync.poll(Instant::now(), &self.store) {
            SyncEvent::Saved => self.status = Some("Drawings saved".to_string()),
            SyncEvent::Failed => {
                self.status = self.sync.last_error().map(|e| format!("Save failed: {e}"));
            }
            SyncEvent::Scheduled | SyncEvent::Nothing => {}
        }
        if self.sync.is_dirty() {
            ctx.request_repaint_after(self.sync.options().debounce);
        }
        if self.renderer.scheduler().is_pending() {
            ctx.request_repaint();
        }
    }
}

impl ChartApp {
    fn chart_ui(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        let origin = rect.min;

        if self.viewport.set_size(rect.size()) {
            self.renderer.request(RepaintReason::Viewport);
        }
        self.renderer.resize(CanvasSize::new(
            rect.width(),
            rect.height(),
            ctx.pixels_per_point(),
        ));

        let hover = ctx.input(|i| i.pointer.hover_pos());
        let scroll_delta = ctx.input(|i| i.raw_scroll_delta.y);
        if scroll_delta.abs() > 0.0 {
            if let Some(hover_pos) = hover.filter(|p| rect.contains(*p)) {
                let zoom_delta = (1.0 + scroll_delta * 0.001).clamp(0.8, 1.25);
                let local = hover_pos - origin;
                if ctx.input(|i| i.modifiers.command) {
                    self.viewport.zoom_price_about(local.y, zoom_delta);
                } else {
                    self.viewport.zoom_time_about(local.x, zoom_delta);
                }
                self.renderer.request(RepaintReason::Viewport);
            }
        }
        if response.dragged_by(egui::PointerButton::Secondary) {
            self.viewport.pan_by(response.drag_delta());
            self.renderer.request(RepaintReason::Viewport);
        }

        let events: Vec<egui::Event> = ctx.input(|i| i.events.clone());
        for event in events {
            let input = match event {
                egui::Event::PointerButton {
                    pos,
                    button: egui::PointerButton::Primary,
                    pressed: true,
                    ..
                } if rect.contains(pos) => {
                    self.pointer_down = true;
                    InputEvent::PointerDown((pos - origin).to_pos2())
                }
                egui::Event::PointerButton {
                    pos,
                    button: egui::PointerButton::Primary,
                    pressed: false,
                    ..
                } if self.pointer_down => {
                    self.pointer_down = false;
                    InputEvent::PointerUp((pos - origin).to_pos2())
                }
                egui::Event::PointerMoved(pos) if rect.contains(pos) || self.pointer_down => {
                    InputEvent::PointerMove((pos - origin).to_pos2())
                }
                _ => continue,
            };
            let mapper = CoordinateMapper::new(&self.viewport);
            let outcome = self.controller.handle(input, &mut self.store, &mapper);
            self.absorb(&outcome);
        }

        let mapper = CoordinateMapper::new(&self.viewport);
        let scene = Scene {
            store: &self.store,
            controller: &self.controller,
            mapper,
            overlays: &self.market.overlays,
            bands: &self.settings.bands,
            timeline: BarTimeline::Bars(&self.market.bars),
        };
        self.renderer.run_frame(&scene);

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, ctx.style().visuals.extreme_bg_color);
        paint_display_list(&painter, origin, self.renderer.display_list());

        if let Some(p) = hover.filter(|p| rect.contains(*p)) {
            if let Some(point) = mapper.to_domain((p - origin).to_pos2()) {
                let time = chrono::DateTime::from_timestamp_millis(point.time_ms)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                paint_crosshair(&painter, rect, p, &format!("{:.2}  {time}", point.price));
            }
        }
    }
}
